use crate::error::AppError;
use std::path::PathBuf;
use url::Url;

/// Parsed `-d` destination, one of the two URL forms in the CLI contract.
#[derive(Debug, Clone)]
pub enum Destination {
    File { path: PathBuf },
    Oci { namespace: String, bucket: String, key: String },
}

impl Destination {
    /// Parses `file:///path` or `oci://<namespace>@<bucket>/<key>`.
    ///
    /// # Errors
    /// Returns `AppError::InvalidParameters` for any other scheme, a
    /// malformed URL, or a missing OCI namespace/bucket.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let url = Url::parse(raw)
            .map_err(|e| AppError::InvalidParameters(format!("invalid destination url: {e}")))?;

        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|()| AppError::InvalidParameters(format!("invalid file url: {raw}")))?;
                Ok(Self::File { path })
            }
            "oci" => {
                let namespace = url.username();
                if namespace.is_empty() {
                    return Err(AppError::InvalidParameters(
                        "oci:// destination is missing a namespace (oci://namespace@bucket/key)"
                            .to_string(),
                    ));
                }
                let bucket = url
                    .host_str()
                    .ok_or_else(|| {
                        AppError::InvalidParameters(format!("oci:// destination is missing a bucket: {raw}"))
                    })?
                    .to_string();
                let key = url.path().trim_start_matches('/').to_string();
                if key.is_empty() {
                    return Err(AppError::InvalidParameters(format!(
                        "oci:// destination is missing an object key: {raw}"
                    )));
                }
                Ok(Self::Oci {
                    namespace: namespace.to_string(),
                    bucket,
                    key,
                })
            }
            other => Err(AppError::InvalidParameters(format!(
                "unsupported destination scheme: {other}"
            ))),
        }
    }
}
