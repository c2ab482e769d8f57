use crate::error::AppError;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// The identity material needed to sign an OCI request: the three OCID
/// components of the `keyId` plus the RSA key that signs the string.
#[derive(Clone)]
pub struct OciIdentity {
    pub tenancy_ocid: String,
    pub user_ocid: String,
    pub fingerprint: String,
    pub region: String,
    pub private_key: Arc<RsaPrivateKey>,
}

impl OciIdentity {
    #[must_use]
    pub fn key_id(&self) -> String {
        format!("{}/{}/{}", self.tenancy_ocid, self.user_ocid, self.fingerprint)
    }
}

/// Resolves credentials for one of the `-auth-type` values. Only
/// `OCI_CONFIG_FILE[PROFILE]` is fully implemented; the workload/instance
/// federation types are out of scope for this design (spec.md places SDK
/// authentication details outside the core) and fail fast with a clear
/// message instead of silently no-op'ing.
pub trait OciAuthProvider: Send + Sync {
    fn identity(&self) -> Result<OciIdentity, AppError>;
}

pub struct ConfigFileAuth {
    config_path: PathBuf,
    profile: String,
}

impl ConfigFileAuth {
    /// # Errors
    /// Returns `AppError::AuthFailed` if the home directory can't be
    /// resolved.
    pub fn new(profile: Option<&str>) -> Result<Self, AppError> {
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::AuthFailed("cannot determine home directory".to_string()))?;
        Ok(Self {
            config_path: home.join(".oci").join("config"),
            profile: profile.unwrap_or("DEFAULT").to_string(),
        })
    }
}

impl OciAuthProvider for ConfigFileAuth {
    fn identity(&self) -> Result<OciIdentity, AppError> {
        let contents = fs::read_to_string(&self.config_path).map_err(|e| {
            AppError::AuthFailed(format!(
                "failed to read OCI config file {}: {e}",
                self.config_path.display()
            ))
        })?;

        let section = parse_ini_section(&contents, &self.profile).ok_or_else(|| {
            AppError::AuthFailed(format!(
                "profile [{}] not found in {}",
                self.profile,
                self.config_path.display()
            ))
        })?;

        let get = |key: &str| -> Result<String, AppError> {
            section.get(key).cloned().ok_or_else(|| {
                AppError::AuthFailed(format!(
                    "missing '{key}' in OCI config profile [{}]",
                    self.profile
                ))
            })
        };

        let key_file = get("key_file")?;
        let key_path = expand_home(&key_file);
        let key_pem = fs::read_to_string(&key_path)
            .map_err(|e| AppError::AuthFailed(format!("failed to read key_file {}: {e}", key_path.display())))?;
        let private_key = load_private_key(&key_pem)?;

        Ok(OciIdentity {
            tenancy_ocid: get("tenancy")?,
            user_ocid: get("user")?,
            fingerprint: get("fingerprint")?,
            region: get("region")?,
            private_key: Arc::new(private_key),
        })
    }
}

/// Stands in for the two federation-based auth types. Both derive a
/// short-lived security token from ambient infrastructure (the OKE
/// service account token, or the instance metadata service) rather than
/// from a file on disk; wiring either up is an integration detail this
/// design's core does not need to resolve (spec.md §1).
pub struct FederatedAuth {
    kind: String,
}

impl FederatedAuth {
    #[must_use]
    pub fn new(kind: &str) -> Self {
        Self { kind: kind.to_string() }
    }
}

impl OciAuthProvider for FederatedAuth {
    fn identity(&self) -> Result<OciIdentity, AppError> {
        Err(AppError::AuthFailed(format!(
            "{} authentication is not implemented; configure OCI_CONFIG_FILE instead",
            self.kind
        )))
    }
}

/// Builds the provider named by `-auth-type`: `OCI_CONFIG_FILE`,
/// `OCI_CONFIG_FILE[PROFILE]`, `OKE_WORKLOAD_IDENTITY`, or
/// `INSTANCE_PRINCIPAL`.
///
/// # Errors
/// Returns `AppError::InvalidParameters` for any other value.
pub fn build_provider(auth_type: &str) -> Result<Box<dyn OciAuthProvider>, AppError> {
    if auth_type == "OCI_CONFIG_FILE" {
        return Ok(Box::new(ConfigFileAuth::new(None)?));
    }
    if let Some(profile) = auth_type
        .strip_prefix("OCI_CONFIG_FILE[")
        .and_then(|s| s.strip_suffix(']'))
    {
        return Ok(Box::new(ConfigFileAuth::new(Some(profile))?));
    }
    match auth_type {
        "OKE_WORKLOAD_IDENTITY" | "INSTANCE_PRINCIPAL" => Ok(Box::new(FederatedAuth::new(auth_type))),
        other => Err(AppError::InvalidParameters(format!("unsupported auth-type: {other}"))),
    }
}

fn expand_home(path: &str) -> PathBuf {
    path.strip_prefix("~/").map_or_else(
        || PathBuf::from(path),
        |rest| dirs::home_dir().unwrap_or_default().join(rest),
    )
}

fn load_private_key(pem_str: &str) -> Result<RsaPrivateKey, AppError> {
    let parsed = pem::parse(pem_str).map_err(|e| AppError::AuthFailed(format!("invalid PEM key: {e}")))?;
    RsaPrivateKey::from_pkcs8_der(parsed.contents())
        .or_else(|_| RsaPrivateKey::from_pkcs1_der(parsed.contents()))
        .map_err(|e| AppError::AuthFailed(format!("invalid OCI private key: {e}")))
}

fn parse_ini_section(contents: &str, profile: &str) -> Option<HashMap<String, String>> {
    let mut current: Option<String> = None;
    let mut section: HashMap<String, String> = HashMap::new();
    let mut found = false;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            if found {
                break;
            }
            current = Some(name.to_string());
            if name == profile {
                found = true;
                section.clear();
            }
            continue;
        }
        if current.as_deref() != Some(profile) {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            section.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    found.then_some(section)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CONF: &str = r"[DEFAULT]
user=ocid1.user.oc1..aaaa
fingerprint=aa:bb:cc
tenancy=ocid1.tenancy.oc1..bbbb
region=us-ashburn-1
key_file=~/.oci/oci_api_key.pem

[INTEG]
user=ocid1.user.oc1..cccc
fingerprint=dd:ee:ff
tenancy=ocid1.tenancy.oc1..dddd
region=eu-frankfurt-1
key_file=/abs/path/key.pem
";

    #[test]
    fn parses_default_section() {
        let section = parse_ini_section(CONF, "DEFAULT").unwrap();
        assert_eq!(section.get("user").unwrap(), "ocid1.user.oc1..aaaa");
        assert_eq!(section.get("region").unwrap(), "us-ashburn-1");
    }

    #[test]
    fn parses_named_profile() {
        let section = parse_ini_section(CONF, "INTEG").unwrap();
        assert_eq!(section.get("region").unwrap(), "eu-frankfurt-1");
        assert_eq!(section.get("key_file").unwrap(), "/abs/path/key.pem");
    }

    #[test]
    fn missing_profile_returns_none() {
        assert!(parse_ini_section(CONF, "NOPE").is_none());
    }

    #[test]
    fn build_provider_rejects_unknown_auth_type() {
        let err = build_provider("NOT_A_REAL_TYPE").unwrap_err();
        assert_eq!(err.exit_code(), 400);
    }

    #[test]
    fn build_provider_accepts_profile_syntax() {
        let provider = build_provider("OCI_CONFIG_FILE[INTEG]");
        assert!(provider.is_ok());
    }

    #[test]
    fn federated_auth_fails_clearly() {
        let provider = build_provider("INSTANCE_PRINCIPAL").unwrap();
        let err = provider.identity().unwrap_err();
        assert_eq!(err.exit_code(), 401);
    }
}
