use clap::Parser;
use secrecy::SecretString;
use std::path::PathBuf;

/// Package a source directory into a ZIP archive and stream it to a
/// local file or an OCI Object Storage multipart upload.
#[derive(Parser, Debug, Clone)]
#[command(name = "zipshuttle", version, about)]
pub struct Args {
    /// Source directory to archive
    #[arg(short = 's', long = "source")]
    pub source: PathBuf,

    /// Destination: file:///path or oci://namespace@bucket/key
    #[arg(short = 'd', long = "destination")]
    pub destination: String,

    /// DEFLATE compression level, 0-9
    #[arg(long = "compression-level", default_value_t = 6)]
    pub compression_level: i64,

    /// OCI authentication type, required when destination uses oci://
    #[arg(long = "auth-type", env = "ZIPSHUTTLE_AUTH_TYPE")]
    pub auth_type: Option<String>,

    /// Bounded channel capacity and upload worker cap
    #[arg(long = "max-parts-in-memory", default_value_t = 10)]
    pub max_parts_in_memory: usize,

    /// Minimum part size, in MB
    #[arg(long = "min-part-size-mb", default_value_t = 10)]
    pub min_part_size_mb: u64,

    /// Password; when set, enables archive encryption
    #[arg(long = "password", env = "ZIPSHUTTLE_PASSWORD", value_parser = parse_secret)]
    pub password: Option<SecretString>,

    /// zipcrypto, aes128, aes192, or aes256
    #[arg(long = "encryption-type", default_value = "zipcrypto")]
    pub encryption_type: String,

    /// .gitignore-style pattern file
    #[arg(long = "ignore-file")]
    pub ignore_file: Option<PathBuf>,

    /// Increase log verbosity; repeatable
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress the progress bar
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

fn parse_secret(value: &str) -> Result<SecretString, std::convert::Infallible> {
    Ok(SecretString::new(value.to_string().into()))
}
