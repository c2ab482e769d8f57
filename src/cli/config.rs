use crate::archive::EncryptionMethod;
use crate::cli::args::Args;
use crate::destination::Destination;
use crate::error::AppError;
use secrecy::SecretString;
use std::path::PathBuf;

/// Validated, immutable configuration for one run. Constructed only
/// through [`Config::from_args`], which replicates every validation
/// branch the original flag parser performs.
#[derive(Debug)]
pub struct Config {
    pub source_dir: PathBuf,
    pub destination: Destination,
    pub auth_type: Option<String>,
    pub max_parts_in_memory: usize,
    pub min_part_size_bytes: u64,
    pub compression_level: i64,
    pub password: Option<SecretString>,
    pub encryption_method: EncryptionMethod,
    pub ignore_file: Option<PathBuf>,
    pub quiet: bool,
    pub verbose: u8,
}

impl Config {
    /// # Errors
    /// Returns `AppError::InvalidParameters` for any failed validation
    /// branch below, mirroring the original flag parser's checks.
    pub fn from_args(args: Args) -> Result<Self, AppError> {
        if args.max_parts_in_memory == 0 {
            return Err(AppError::InvalidParameters(
                "max-parts-in-memory must be greater than 0".to_string(),
            ));
        }

        if args.min_part_size_mb < 5 {
            return Err(AppError::InvalidParameters(
                "min-part-size-mb must be greater than 5".to_string(),
            ));
        }

        let destination = Destination::parse(&args.destination)?;

        if matches!(destination, Destination::Oci { .. }) {
            let auth_type = args.auth_type.as_deref().unwrap_or("");
            if !is_valid_auth_type(auth_type) {
                return Err(AppError::InvalidParameters(format!(
                    "unsupported auth-type for oci: {auth_type}"
                )));
            }
        }

        let encryption_method = EncryptionMethod::parse(&args.encryption_type)
            .map_err(|e| AppError::InvalidParameters(e.to_string()))?;

        // `EncryptionMethod::parse` above already rejects any value
        // outside {zipcrypto, aes128, aes192, aes256}, so the original
        // parser's "password set but encryption-type unsupported" branch
        // can never trigger here — it's covered earlier, with the same
        // user-facing message.
        let has_password = args.password.is_some();
        if !has_password && encryption_method != EncryptionMethod::ZipCrypto {
            return Err(AppError::InvalidParameters(
                "password is required when encryption-type is specified".to_string(),
            ));
        }

        Ok(Self {
            source_dir: args.source,
            destination,
            auth_type: args.auth_type,
            max_parts_in_memory: args.max_parts_in_memory,
            min_part_size_bytes: args.min_part_size_mb * 1024 * 1024,
            compression_level: args.compression_level,
            password: args.password,
            encryption_method,
            ignore_file: args.ignore_file,
            quiet: args.quiet,
            verbose: args.verbose,
        })
    }
}

/// Matches `OCI_CONFIG_FILE`, `OCI_CONFIG_FILE[PROFILE]`,
/// `OKE_WORKLOAD_IDENTITY`, or `INSTANCE_PRINCIPAL`.
fn is_valid_auth_type(auth_type: &str) -> bool {
    if let Some(rest) = auth_type.strip_prefix("OCI_CONFIG_FILE") {
        return rest.is_empty() || (rest.starts_with('[') && rest.ends_with(']'));
    }
    matches!(auth_type, "OKE_WORKLOAD_IDENTITY" | "INSTANCE_PRINCIPAL")
}
