use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// Polymorphic object-store capability set. Two implementations share this
/// trait: the real OCI client and, in tests, an in-memory mock.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Starts a multipart upload session, returning its `upload_id`.
    async fn initiate(&self) -> anyhow::Result<String>;

    /// Uploads one part, returning its etag. Implementations retry
    /// transient failures internally (3 attempts, 1s/2s/4s backoff) and
    /// must observe `cancel` during network I/O.
    async fn upload_part(
        &self,
        upload_id: &str,
        part_number: u64,
        bytes: Vec<u8>,
        cancel: &CancellationToken,
    ) -> anyhow::Result<String>;

    /// Completes a multipart upload given the full `{part_number: etag}` map.
    async fn complete(&self, upload_id: &str, etags: &BTreeMap<u64, String>) -> anyhow::Result<()>;

    /// Aborts a multipart upload. Idempotent, best-effort.
    async fn abort(&self, upload_id: &str) -> anyhow::Result<()>;

    /// Single-shot upload for payloads that never needed multipart.
    async fn put_object(&self, bytes: Vec<u8>) -> anyhow::Result<()>;
}

#[cfg(test)]
pub mod mock {
    use super::{async_trait, BTreeMap, CancellationToken, ObjectStore};
    use std::sync::Mutex;

    /// Deterministic in-memory `ObjectStore` for coordinator tests. Mirrors
    /// the shape of a trivial mock uploader: records calls, optionally
    /// fails a specific part number persistently, and never talks to a
    /// network.
    #[derive(Default)]
    pub struct MockStore {
        pub state: Mutex<MockState>,
        pub fail_part: Option<u64>,
        pub fail_initiate: bool,
        pub fail_complete: bool,
    }

    #[derive(Default, Debug)]
    pub struct MockState {
        pub initiated: bool,
        pub initiate_calls: u32,
        pub completed: bool,
        pub aborted: bool,
        pub complete_calls: u32,
        pub abort_calls: u32,
        pub put_object_calls: u32,
        pub uploaded_parts: Vec<u64>,
        pub etags: BTreeMap<u64, String>,
        pub put_object_bytes: Option<Vec<u8>>,
    }

    #[async_trait]
    impl ObjectStore for MockStore {
        async fn initiate(&self) -> anyhow::Result<String> {
            let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            state.initiate_calls += 1;
            if self.fail_initiate {
                anyhow::bail!("mock initiate failure");
            }
            state.initiated = true;
            Ok("mock-upload-id".to_string())
        }

        async fn upload_part(
            &self,
            _upload_id: &str,
            part_number: u64,
            bytes: Vec<u8>,
            _cancel: &CancellationToken,
        ) -> anyhow::Result<String> {
            if self.fail_part == Some(part_number) {
                anyhow::bail!("mock upload_part failure for part {part_number}");
            }
            let etag = format!("etag-{part_number}-{}", bytes.len());
            let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            state.uploaded_parts.push(part_number);
            state.etags.insert(part_number, etag.clone());
            Ok(etag)
        }

        async fn complete(&self, _upload_id: &str, etags: &BTreeMap<u64, String>) -> anyhow::Result<()> {
            let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            state.complete_calls += 1;
            if self.fail_complete {
                anyhow::bail!("mock complete failure");
            }
            state.completed = true;
            state.etags = etags.clone();
            Ok(())
        }

        async fn abort(&self, _upload_id: &str) -> anyhow::Result<()> {
            let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            state.abort_calls += 1;
            state.aborted = true;
            Ok(())
        }

        async fn put_object(&self, bytes: Vec<u8>) -> anyhow::Result<()> {
            let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            state.put_object_calls += 1;
            state.put_object_bytes = Some(bytes);
            Ok(())
        }
    }
}
