pub mod auth;
pub mod client;
pub mod signature;

pub use auth::{build_provider, OciAuthProvider, OciIdentity};
pub use client::OciStore;
