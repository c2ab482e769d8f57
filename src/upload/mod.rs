pub mod coordinator;
pub mod oci;
pub mod store;

use crate::destination::Destination;
use crate::error::AppError;
use std::sync::Arc;
use store::ObjectStore;

/// Constructs the right `ObjectStore` for a destination, keyed on URL
/// scheme. `file://` destinations never reach here (the driver handles
/// them directly); this factory only ever sees object-store destinations.
///
/// # Errors
/// Returns `AppError::UploaderInitFailed` if the provider can't be
/// constructed (e.g. auth resolution failure).
pub fn build_store(destination: &Destination, auth_type: &str) -> Result<Arc<dyn ObjectStore>, AppError> {
    match destination {
        Destination::Oci { namespace, bucket, key } => {
            let provider = oci::build_provider(auth_type)?;
            let store = oci::OciStore::new(provider.as_ref(), namespace.clone(), bucket.clone(), key.clone())
                .map_err(AppError::from_anyhow)?;
            Ok(Arc::new(store))
        }
        Destination::File { path } => Err(AppError::InvalidParameters(format!(
            "{} is a local destination, not an object store",
            path.display()
        ))),
    }
}
