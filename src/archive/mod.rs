pub mod walk;

use crate::ignore::IgnoreMatcher;
use log::{debug, trace};
use secrecy::{ExposeSecret, SecretString};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{AesMode, CompressionMethod, ZipWriter};

/// The `-encryption-type` values from spec.md §6, mapped to the ZIP
/// encryption scheme the archiver emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionMethod {
    ZipCrypto,
    Aes128,
    Aes192,
    Aes256,
}

impl EncryptionMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ZipCrypto => "zipcrypto",
            Self::Aes128 => "aes128",
            Self::Aes192 => "aes192",
            Self::Aes256 => "aes256",
        }
    }

    /// # Errors
    /// Returns an error for any value other than the four recognized ones.
    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value {
            "zipcrypto" => Ok(Self::ZipCrypto),
            "aes128" => Ok(Self::Aes128),
            "aes192" => Ok(Self::Aes192),
            "aes256" => Ok(Self::Aes256),
            other => anyhow::bail!("unsupported encryption-type: {other}"),
        }
    }
}

/// Walks `source_dir`, applies the ignore matcher, and streams a ZIP
/// archive into `sink`: one local file header plus compressed (and
/// optionally encrypted) payload per included regular file, written in a
/// single forward pass with no seeks. `on_file_written`, when given, is
/// called with each included file's uncompressed length as it finishes,
/// letting the caller drive a progress bar without this function knowing
/// anything about one.
///
/// # Errors
/// Any I/O or ZIP-encoding error is terminal; the first one is returned.
pub fn write_archive<W: Write>(
    source_dir: &Path,
    sink: W,
    ignore: &IgnoreMatcher,
    compression_level: i64,
    password: Option<&SecretString>,
    encryption_method: EncryptionMethod,
    on_file_written: Option<&dyn Fn(u64)>,
) -> anyhow::Result<()> {
    let mut zip = ZipWriter::new_stream(sink);

    for path in walk::collect_regular_files(source_dir)? {
        let relative = path.strip_prefix(source_dir)?;
        if ignore.matches(relative) {
            debug!("skipping ignored path: {}", relative.display());
            continue;
        }

        let name = relative.to_string_lossy().replace('\\', "/");
        trace!("adding entry: {name}");

        let options = build_options(compression_level, password, encryption_method);
        zip.start_file(&name, options)?;

        let mut file = File::open(&path)?;
        let written = io::copy(&mut file, &mut zip)?;
        if let Some(callback) = on_file_written {
            callback(written);
        }
    }

    zip.finish()?;
    Ok(())
}

fn build_options(
    compression_level: i64,
    password: Option<&SecretString>,
    encryption_method: EncryptionMethod,
) -> SimpleFileOptions {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(compression_level));

    let Some(password) = password else {
        return options;
    };

    match encryption_method {
        EncryptionMethod::ZipCrypto => options.with_deprecated_encryption(password.expose_secret().as_bytes()),
        EncryptionMethod::Aes128 => options.with_aes_encryption(AesMode::Aes128, password.expose_secret()),
        EncryptionMethod::Aes192 => options.with_aes_encryption(AesMode::Aes192, password.expose_secret()),
        EncryptionMethod::Aes256 => options.with_aes_encryption(AesMode::Aes256, password.expose_secret()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::{Cursor, Read};
    use tempfile::Builder;
    use zip::ZipArchive;

    fn sample_tree() -> tempfile::TempDir {
        let dir = Builder::new().prefix("zipshuttle-archive-").tempdir().unwrap();
        fs::write(dir.path().join("hello.txt"), b"hello world").unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/inner.txt"), b"inner contents").unwrap();
        dir
    }

    #[test]
    fn round_trips_plain_archive() {
        let dir = sample_tree();
        let ignore = IgnoreMatcher::compile(None).unwrap();
        let mut buf = Vec::new();
        write_archive(dir.path(), &mut buf, &ignore, 6, None, EncryptionMethod::ZipCrypto, None).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(buf)).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["hello.txt", "nested/inner.txt"]);

        let mut contents = String::new();
        archive.by_name("hello.txt").unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "hello world");
    }

    #[test]
    fn empty_directory_produces_valid_empty_archive() {
        let dir = Builder::new().prefix("zipshuttle-archive-").tempdir().unwrap();
        let ignore = IgnoreMatcher::compile(None).unwrap();
        let mut buf = Vec::new();
        write_archive(dir.path(), &mut buf, &ignore, 6, None, EncryptionMethod::ZipCrypto, None).unwrap();

        let archive = ZipArchive::new(Cursor::new(buf)).unwrap();
        assert_eq!(archive.len(), 0);
    }

    #[test]
    fn aes256_round_trips_with_correct_password() {
        let dir = sample_tree();
        let ignore = IgnoreMatcher::compile(None).unwrap();
        let password = SecretString::new("correct horse".to_string().into());
        let mut buf = Vec::new();
        write_archive(dir.path(), &mut buf, &ignore, 6, Some(&password), EncryptionMethod::Aes256, None).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(buf)).unwrap();
        let mut entry = archive.by_name_decrypt("hello.txt", b"correct horse").unwrap();
        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "hello world");
    }

    #[test]
    fn ignored_files_are_excluded() {
        let dir = sample_tree();
        fs::write(dir.path().join("skip.log"), b"noisy").unwrap();
        fs::write(dir.path().join(".ignore"), b"*.log\n").unwrap();

        let ignore = IgnoreMatcher::compile(Some(&dir.path().join(".ignore"))).unwrap();
        let mut buf = Vec::new();
        write_archive(dir.path(), &mut buf, &ignore, 6, None, EncryptionMethod::ZipCrypto, None).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(buf)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(!names.iter().any(|n| n.ends_with("skip.log")));
        assert!(names.iter().any(|n| n == "hello.txt"));
    }
}
