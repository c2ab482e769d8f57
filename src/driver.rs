use crate::archive;
use crate::archive::walk::total_size_bytes;
use crate::cli::config::Config;
use crate::cli::progressbar::Bar;
use crate::destination::Destination;
use crate::error::AppError;
use crate::ignore::IgnoreMatcher;
use crate::stream::PartChannelWriter;
use crate::upload;
use crossbeam_channel::bounded;
use log::info;
use std::fs::{self, File};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Wires the ignore matcher, archiver, part-channel writer and upload
/// coordinator together, choosing the file-sink path or the
/// object-store path based on the configured destination.
///
/// # Errors
/// Propagates whatever `AppError` the failing stage recorded.
pub async fn run(config: Config) -> Result<(), AppError> {
    let ignore = IgnoreMatcher::compile(config.ignore_file.as_deref())?;

    match &config.destination {
        Destination::File { path } => run_to_file(&config, &ignore, path),
        Destination::Oci { .. } => run_to_upload(config, ignore).await,
    }
}

fn run_to_file(config: &Config, ignore: &IgnoreMatcher, path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Internal(format!("failed to create {}: {e}", parent.display())))?;
        }
    }

    let file = File::create(path)
        .map_err(|e| AppError::Internal(format!("failed to create {}: {e}", path.display())))?;

    let total = total_size_bytes(&config.source_dir).unwrap_or(0);
    let bar = Bar::new(total, config.quiet);
    let on_file_written = |written: u64| bar.inc(written);

    archive::write_archive(
        &config.source_dir,
        file,
        ignore,
        config.compression_level,
        config.password.as_ref(),
        config.encryption_method,
        Some(&on_file_written),
    )
    .map_err(|e| AppError::ArchiveFailed(e.to_string()))?;

    bar.finish();
    info!("wrote archive to {}", path.display());
    Ok(())
}

async fn run_to_upload(config: Config, ignore: IgnoreMatcher) -> Result<(), AppError> {
    let store = upload::build_store(&config.destination, config.auth_type.as_deref().unwrap_or(""))?;

    let (tx, rx) = bounded(config.max_parts_in_memory);
    let cancel = CancellationToken::new();
    let min_part_size = usize::try_from(config.min_part_size_bytes).unwrap_or(usize::MAX);
    let source_dir = config.source_dir.clone();
    let compression_level = config.compression_level;
    let password = config.password.clone();
    let encryption_method = config.encryption_method;
    let total = total_size_bytes(&config.source_dir).unwrap_or(0);
    let bar = Bar::new(total, config.quiet);

    // The archiver is a blocking `Write` loop (it drives a possibly-
    // blocking channel send); running it on a blocking-pool thread keeps
    // it from starving the coordinator's async runtime.
    let producer_cancel = cancel.clone();
    let producer = tokio::task::spawn_blocking(move || {
        let mut writer = PartChannelWriter::new(tx, min_part_size);
        let on_file_written = |written: u64| bar.inc(written);
        let archive_result = archive::write_archive(
            &source_dir,
            &mut writer,
            &ignore,
            compression_level,
            password.as_ref(),
            encryption_method,
            Some(&on_file_written),
        );
        // Closing must happen on every path, including a failed archive,
        // so the coordinator always observes channel end-of-input. A
        // failed archive still needs to cancel the coordinator explicitly
        // though: a clean channel close alone reads as a normal end-of-
        // input, which would make the coordinator complete the upload
        // with only the partial data produced so far.
        if archive_result.is_err() {
            producer_cancel.cancel();
        }
        let close_result = writer.close();
        bar.finish();
        archive_result.map_err(|e| AppError::ArchiveFailed(e.to_string()))?;
        close_result.map_err(|e| AppError::Internal(e.to_string()))
    });

    let coordinator_cancel = cancel.clone();
    let max_parts_in_memory = config.max_parts_in_memory;
    let coordinator = tokio::spawn(async move {
        upload::coordinator::run(store, rx, max_parts_in_memory, coordinator_cancel).await
    });

    let producer_result = producer
        .await
        .map_err(|e| AppError::Internal(format!("producer task panicked: {e}")))?;
    let coordinator_result = coordinator
        .await
        .map_err(|e| AppError::Internal(format!("coordinator task panicked: {e}")))?;

    producer_result?;
    coordinator_result
}
