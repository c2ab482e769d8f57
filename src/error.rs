use thiserror::Error;

/// Typed errors at the process boundary, each carrying the exit code the
/// driver reports to the shell.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("auth failed: {0}")]
    AuthFailed(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("uploader init failed: {0}")]
    UploaderInitFailed(String),

    #[error("archive creation failed: {0}")]
    ArchiveFailed(String),
}

impl AppError {
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidParameters(_) => 400,
            Self::AuthFailed(_) => 401,
            Self::Internal(_) => 500,
            Self::UploadFailed(_) => 502,
            Self::UploaderInitFailed(_) => 503,
            Self::ArchiveFailed(_) => 504,
        }
    }

    /// Pulls a typed `AppError` out of an `anyhow::Error` chain if one was
    /// recorded, otherwise classifies it as an internal error.
    #[must_use]
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        match err.downcast::<Self>() {
            Ok(app_err) => app_err,
            Err(err) => Self::Internal(err.to_string()),
        }
    }
}
