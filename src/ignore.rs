use crate::error::AppError;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Path, PathBuf};

/// Compiled ignore-pattern matcher. Absent when no ignore file was
/// configured, in which case nothing is ever skipped.
pub struct IgnoreMatcher {
    inner: Option<Gitignore>,
}

impl IgnoreMatcher {
    /// Compiles the matcher once from the given pattern file.
    ///
    /// # Errors
    /// Returns `AppError::InvalidParameters` if the file can't be read or
    /// contains a pattern the gitignore engine rejects.
    pub fn compile(ignore_file: Option<&Path>) -> Result<Self, AppError> {
        let Some(path) = ignore_file else {
            return Ok(Self { inner: None });
        };

        let mut builder = GitignoreBuilder::new(root_for(path));
        if let Some(err) = builder.add(path) {
            return Err(AppError::InvalidParameters(format!(
                "failed to read ignore file {}: {err}",
                path.display()
            )));
        }
        let gitignore = builder
            .build()
            .map_err(|e| AppError::InvalidParameters(format!("invalid ignore patterns: {e}")))?;

        Ok(Self { inner: Some(gitignore) })
    }

    /// Returns `true` when `relative_path` should be skipped.
    #[must_use]
    pub fn matches(&self, relative_path: &Path) -> bool {
        let Some(gitignore) = &self.inner else {
            return false;
        };
        gitignore.matched(relative_path, false).is_ignore()
    }
}

fn root_for(ignore_file: &Path) -> PathBuf {
    ignore_file
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn no_ignore_file_matches_nothing() {
        let matcher = IgnoreMatcher::compile(None).unwrap();
        assert!(!matcher.matches(Path::new("anything.log")));
    }

    #[test]
    fn matches_simple_glob() {
        let dir = Builder::new().prefix("zipshuttle-ignore-").tempdir().unwrap();
        let ignore_path = dir.path().join(".ignore");
        let mut f = fs::File::create(&ignore_path).unwrap();
        writeln!(f, "*.log").unwrap();

        let matcher = IgnoreMatcher::compile(Some(&ignore_path)).unwrap();
        assert!(matcher.matches(Path::new("a.log")));
        assert!(!matcher.matches(Path::new("b.txt")));
    }

    #[test]
    fn negation_pattern_unignores() {
        let dir = Builder::new().prefix("zipshuttle-ignore-").tempdir().unwrap();
        let ignore_path = dir.path().join(".ignore");
        let mut f = fs::File::create(&ignore_path).unwrap();
        writeln!(f, "*.log").unwrap();
        writeln!(f, "!keep.log").unwrap();

        let matcher = IgnoreMatcher::compile(Some(&ignore_path)).unwrap();
        assert!(matcher.matches(Path::new("a.log")));
        assert!(!matcher.matches(Path::new("keep.log")));
    }
}
