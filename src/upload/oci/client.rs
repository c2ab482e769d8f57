use crate::upload::oci::auth::OciAuthProvider;
use crate::upload::oci::signature::Signer;
use crate::upload::store::ObjectStore;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const MAX_ATTEMPTS: u32 = 3;

/// OCI Object Storage client implementing the five-operation
/// `ObjectStore` capability set over the REST API, signed per OCI's
/// "Signing Requests" scheme.
pub struct OciStore {
    client: Client,
    signer: Signer,
    region: String,
    namespace: String,
    bucket: String,
    object: String,
}

impl OciStore {
    /// # Errors
    /// Returns `AppError::AuthFailed` if the configured auth provider
    /// can't resolve an identity.
    pub fn new(
        auth: &dyn OciAuthProvider,
        namespace: String,
        bucket: String,
        object: String,
    ) -> anyhow::Result<Self> {
        let identity = auth.identity()?;
        let region = identity.region.clone();
        Ok(Self {
            client: Client::new(),
            signer: Signer::new(identity),
            region,
            namespace,
            bucket,
            object,
        })
    }

    fn host(&self) -> String {
        format!("objectstorage.{}.oraclecloud.com", self.region)
    }

    fn base_url(&self) -> String {
        format!("https://{}", self.host())
    }

    fn object_path(&self) -> String {
        format!("/n/{}/b/{}/o/{}", self.namespace, self.bucket, self.object)
    }

    fn multipart_base_path(&self) -> String {
        format!("/n/{}/b/{}/u", self.namespace, self.bucket)
    }

    async fn send_signed(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        content_type: &str,
    ) -> anyhow::Result<reqwest::Response> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let host = self.host();
        let signed = self
            .signer
            .sign(method.as_str(), path, &host, &date, body.as_deref())?;

        let url = format!("{}{path}", self.base_url());
        let mut request = self
            .client
            .request(method, url)
            .header("date", &signed.date)
            .header("authorization", &signed.authorization);

        if let Some(sha) = &signed.x_content_sha256 {
            request = request.header("x-content-sha256", sha);
        }
        if let Some(body) = body {
            request = request.header("content-type", content_type).body(body);
        } else {
            request = request.header("content-length", "0");
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("oci request failed: {status}: {text}");
        }
        Ok(response)
    }
}

#[derive(Deserialize)]
struct CreateMultipartUploadResponse {
    #[serde(rename = "uploadId")]
    upload_id: String,
}

#[derive(Serialize)]
struct CreateMultipartUploadRequest<'a> {
    object: &'a str,
}

#[derive(Serialize)]
struct CommitPart {
    #[serde(rename = "partNum")]
    part_num: u64,
    etag: String,
}

#[derive(Serialize)]
struct CommitMultipartUploadRequest {
    #[serde(rename = "partsToCommit")]
    parts_to_commit: Vec<CommitPart>,
}

#[async_trait]
impl ObjectStore for OciStore {
    async fn initiate(&self) -> anyhow::Result<String> {
        let body = serde_json::to_vec(&CreateMultipartUploadRequest { object: &self.object })?;
        let response = self
            .send_signed(Method::POST, &self.multipart_base_path(), Some(body), "application/json")
            .await?;
        let parsed: CreateMultipartUploadResponse = response.json().await?;
        Ok(parsed.upload_id)
    }

    async fn upload_part(
        &self,
        upload_id: &str,
        part_number: u64,
        bytes: Vec<u8>,
        cancel: &CancellationToken,
    ) -> anyhow::Result<String> {
        let path = format!(
            "{}/{}/id/{upload_id}/{part_number}",
            self.multipart_base_path(),
            self.object
        );

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = tokio::select! {
                () = cancel.cancelled() => {
                    anyhow::bail!("upload of part {part_number} cancelled");
                }
                result = self.send_signed(Method::PUT, &path, Some(bytes.clone()), "application/octet-stream") => result,
            };

            match result {
                Ok(response) => {
                    let etag = response
                        .headers()
                        .get("etag")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string)
                        .ok_or_else(|| anyhow::anyhow!("upload part {part_number} response missing etag"))?;
                    return Ok(etag);
                }
                Err(err) if attempt < MAX_ATTEMPTS => {
                    let backoff = Duration::from_secs(1u64 << (attempt - 1));
                    log::warn!("upload part {part_number} attempt {attempt} failed: {err}, retrying in {backoff:?}");
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn complete(&self, upload_id: &str, etags: &BTreeMap<u64, String>) -> anyhow::Result<()> {
        let path = format!("{}/{}/id/{upload_id}", self.multipart_base_path(), self.object);
        let body = serde_json::to_vec(&CommitMultipartUploadRequest {
            parts_to_commit: etags
                .iter()
                .map(|(number, etag)| CommitPart { part_num: *number, etag: etag.clone() })
                .collect(),
        })?;
        self.send_signed(Method::POST, &path, Some(body), "application/json").await?;
        Ok(())
    }

    async fn abort(&self, upload_id: &str) -> anyhow::Result<()> {
        let path = format!("{}/{}/id/{upload_id}", self.multipart_base_path(), self.object);
        self.send_signed(Method::DELETE, &path, None, "application/json").await?;
        Ok(())
    }

    async fn put_object(&self, bytes: Vec<u8>) -> anyhow::Result<()> {
        self.send_signed(Method::PUT, &self.object_path(), Some(bytes), "application/octet-stream")
            .await?;
        Ok(())
    }
}
