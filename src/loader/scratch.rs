//! Per-process scratch directory that removes itself on drop.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::PackageError;

pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Directory name used under the temp root for this process.
    pub fn name_for(pid: u32) -> String {
        format!("temp_cx_run_{pid}")
    }

    /// Create `<root>/temp_cx_run_<pid>`, replacing a stale one left by a
    /// crashed run with the same pid.
    pub fn create(root: &Path) -> Result<Self, PackageError> {
        let root = std::path::absolute(root)
            .map_err(|e| PackageError::io("Cannot resolve scratch root", e))?;
        let path = root.join(Self::name_for(std::process::id()));

        if path.exists() {
            debug!("removing stale scratch dir {}", path.display());
            fs::remove_dir_all(&path)
                .map_err(|e| PackageError::io("Cannot clear stale scratch directory", e))?;
        }
        fs::create_dir_all(&path)
            .map_err(|e| PackageError::io("Cannot create scratch directory", e))?;
        debug!("scratch dir {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            warn!("Cannot remove {}: {e}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_is_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let scratch = ScratchDir::create(root.path()).unwrap();
            fs::write(scratch.path().join("f.txt"), "x").unwrap();
            fs::create_dir_all(scratch.path().join("a/b")).unwrap();
            assert!(scratch.path().is_dir());
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
        assert!(path.ends_with(ScratchDir::name_for(std::process::id())));
    }

    #[test]
    fn test_stale_scratch_is_replaced() {
        let root = tempfile::tempdir().unwrap();
        let stale = root.path().join(ScratchDir::name_for(std::process::id()));
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("old.txt"), "old").unwrap();

        let scratch = ScratchDir::create(root.path()).unwrap();
        assert!(!scratch.path().join("old.txt").exists());
    }
}
