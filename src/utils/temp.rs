//! Scoped temporary files for external-tool handoff.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A uniquely named path under the system temp directory, removed when the
/// guard goes out of scope. Removal happens on every exit path, including
/// errors and cancellation, because cleanup lives in `Drop`.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    pub fn new(prefix: &str, suffix: &str) -> Self {
        let path = env::temp_dir().join(format!("{}_{}{}", prefix, Uuid::new_v4(), suffix));
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!("failed to remove temp file {}: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_file_removed_on_drop() {
        let path = {
            let tmp = TempFile::new("repquast_test", ".txt");
            fs::write(tmp.path(), "data").unwrap();
            assert!(tmp.path().exists());
            tmp.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_tolerates_missing_file() {
        let tmp = TempFile::new("repquast_test", ".txt");
        // never created on disk; drop must not panic
        drop(tmp);
    }

    #[test]
    fn test_unique_names() {
        let a = TempFile::new("repquast_test", ".txt");
        let b = TempFile::new("repquast_test", ".txt");
        assert_ne!(a.path(), b.path());
    }
}
