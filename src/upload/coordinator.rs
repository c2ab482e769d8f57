use crate::error::AppError;
use crate::stream::Part;
use crate::upload::store::ObjectStore;
use crossbeam_channel::Receiver;
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Drives the upload-coordinator state machine from spec: dequeue the
/// first two parts to pick single-shot vs. multipart, then either
/// `PutObject` a single buffer or run a concurrency-gated multipart
/// upload with first-error-wins abort semantics.
///
/// `concurrency` doubles as the channel-adjacent worker cap (`C`), reused
/// from `max_parts_in_memory` so resident memory stays bounded.
/// `cancel` is shared by the driver and the coordinator: cancelling it
/// from outside is observed the same way an internal first error is.
pub async fn run(
    store: Arc<dyn ObjectStore>,
    rx: Receiver<Part>,
    concurrency: usize,
    cancel: CancellationToken,
) -> Result<(), AppError> {
    let Some(first) = recv_part(rx.clone()).await else {
        debug!("no parts produced, uploading empty payload");
        return put_object(&store, Vec::new()).await;
    };

    let Some(second) = recv_part(rx.clone()).await else {
        debug!("single part observed ({} bytes), using PutObject", first.len());
        return put_object(&store, first.into_bytes()).await;
    };

    info!("multipart upload: at least two parts observed, calling Initiate");
    let upload_id = store
        .initiate()
        .await
        .map_err(|e| AppError::UploadFailed(format!("initiate failed: {e}")))?;
    info!("initiated multipart upload {upload_id}");

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let etags: Arc<Mutex<BTreeMap<u64, String>>> = Arc::new(Mutex::new(BTreeMap::new()));
    let first_error: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let mut workers = JoinSet::new();

    for part in [first, second] {
        spawn_worker(
            &mut workers,
            Arc::clone(&store),
            upload_id.clone(),
            part,
            Arc::clone(&semaphore),
            Arc::clone(&etags),
            Arc::clone(&first_error),
            cancel.clone(),
        )
        .await;
    }

    while let Some(part) = recv_part(rx.clone()).await {
        spawn_worker(
            &mut workers,
            Arc::clone(&store),
            upload_id.clone(),
            part,
            Arc::clone(&semaphore),
            Arc::clone(&etags),
            Arc::clone(&first_error),
            cancel.clone(),
        )
        .await;
    }

    while workers.join_next().await.is_some() {}

    // A worker observing `cancel` mid-flight records `first_error` itself,
    // but a part that finished uploading before an external cancel (e.g.
    // the producer failing after every part sent so far already
    // succeeded) never revisits that check. Consulting `cancel` directly
    // here closes that gap: an externally cancelled run always aborts,
    // even when no individual worker ever saw the flag.
    let recorded_error = first_error.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone();
    let recorded_error = recorded_error.or_else(|| {
        cancel
            .is_cancelled()
            .then(|| "upload cancelled before completion".to_string())
    });
    if let Some(err) = recorded_error {
        warn!("aborting multipart upload {upload_id} after error: {err}");
        if let Err(abort_err) = store.abort(&upload_id).await {
            error!("abort of {upload_id} also failed: {abort_err}");
        }
        return Err(AppError::UploadFailed(err));
    }

    let final_etags = etags.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone();
    store
        .complete(&upload_id, &final_etags)
        .await
        .map_err(|e| AppError::UploadFailed(format!("complete failed: {e}")))?;
    info!("completed multipart upload {upload_id} with {} parts", final_etags.len());
    Ok(())
}

async fn put_object(store: &Arc<dyn ObjectStore>, bytes: Vec<u8>) -> Result<(), AppError> {
    store
        .put_object(bytes)
        .await
        .map_err(|e| AppError::UploadFailed(format!("put_object failed: {e}")))
}

/// Bridges the synchronous `crossbeam_channel::Receiver` (fed by the
/// blocking archiver thread) into the async coordinator.
async fn recv_part(rx: Receiver<Part>) -> Option<Part> {
    tokio::task::spawn_blocking(move || rx.recv().ok())
        .await
        .unwrap_or(None)
}

#[allow(clippy::too_many_arguments)]
async fn spawn_worker(
    workers: &mut JoinSet<()>,
    store: Arc<dyn ObjectStore>,
    upload_id: String,
    part: Part,
    semaphore: Arc<Semaphore>,
    etags: Arc<Mutex<BTreeMap<u64, String>>>,
    first_error: Arc<Mutex<Option<String>>>,
    cancel: CancellationToken,
) {
    // Acquired here, before spawning the task that will hold it: this is
    // the scheduling point that blocks once `concurrency` workers are
    // already in flight, which is what propagates backpressure up to the
    // channel and the archiver.
    let Ok(permit) = semaphore.acquire_owned().await else {
        return;
    };

    let number = part.number();
    workers.spawn(async move {
        let _permit = permit;

        if cancel.is_cancelled() {
            record_first_error(&first_error, number, "cancelled before upload".to_string());
            return;
        }

        match store
            .upload_part(&upload_id, number, part.into_bytes(), &cancel)
            .await
        {
            Ok(etag) => {
                let mut etags = etags.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                if etags.contains_key(&number) {
                    drop(etags);
                    record_first_error(&first_error, number, format!("duplicate part number {number}"));
                    cancel.cancel();
                } else {
                    etags.insert(number, etag);
                }
            }
            Err(err) => {
                record_first_error(&first_error, number, err.to_string());
                cancel.cancel();
            }
        }
    });
}

fn record_first_error(slot: &Arc<Mutex<Option<String>>>, part_number: u64, message: String) {
    let mut guard = slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    if guard.is_none() {
        *guard = Some(format!("part {part_number}: {message}"));
    }
}
