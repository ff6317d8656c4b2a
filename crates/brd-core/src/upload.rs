//! Optional post-processing stage: mirror completed artifacts to a remote
//! store, skipping anything the store already holds. Independent of the
//! download core; a failed upload never affects a run's results.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::ARTIFACT_EXT;

/// Remote storage capability. Kept behind a trait so the mechanics of a real
/// service stay out of the core; the provided implementation mirrors to a
/// directory (e.g. a mounted share).
pub trait RemoteStore {
    fn exists(&self, name: &str) -> Result<bool>;
    fn upload(&self, name: &str, path: &Path) -> Result<()>;
}

/// Filesystem-backed remote store.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl RemoteStore for DirStore {
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.root.join(name).exists())
    }

    fn upload(&self, name: &str, path: &Path) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        std::fs::copy(path, self.root.join(name))
            .with_context(|| format!("failed to upload {name}"))?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Upload every completed artifact in `dest_dir`, skipping names the store
/// already has (idempotent re-runs). Per-file errors are logged and counted,
/// never fatal.
pub fn upload_artifacts(store: &dyn RemoteStore, dest_dir: &Path) -> Result<UploadSummary> {
    let entries = std::fs::read_dir(dest_dir)
        .with_context(|| format!("failed to read {}", dest_dir.display()))?;

    let mut summary = UploadSummary::default();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(ARTIFACT_EXT) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };

        match store.exists(&name) {
            Ok(true) => {
                tracing::debug!(%name, "already uploaded; skipping");
                summary.skipped += 1;
                continue;
            }
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(%name, "existence check failed: {err:#}");
                summary.failed += 1;
                continue;
            }
        }

        match store.upload(&name, &path) {
            Ok(()) => {
                tracing::info!(%name, "uploaded");
                summary.uploaded += 1;
            }
            Err(err) => {
                tracing::warn!(%name, "upload failed: {err:#}");
                summary.failed += 1;
            }
        }
    }

    tracing::info!(?summary, "upload stage finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn uploads_pdfs_and_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("downloads");
        let remote = dir.path().join("remote");
        fs::create_dir_all(&dest).unwrap();
        fs::create_dir_all(&remote).unwrap();

        fs::write(dest.join("X1.pdf"), b"one").unwrap();
        fs::write(dest.join("X2.pdf"), b"two").unwrap();
        fs::write(dest.join("X2.pdf.part"), b"partial").unwrap();
        fs::write(remote.join("X1.pdf"), b"one").unwrap();

        let store = DirStore::new(&remote);
        let summary = upload_artifacts(&store, &dest).unwrap();
        assert_eq!(summary.uploaded, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(fs::read(remote.join("X2.pdf")).unwrap(), b"two");
        assert!(!remote.join("X2.pdf.part").exists());
    }

    #[test]
    fn rerun_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("downloads");
        let remote = dir.path().join("remote");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("X1.pdf"), b"one").unwrap();

        let store = DirStore::new(&remote);
        let first = upload_artifacts(&store, &dest).unwrap();
        let second = upload_artifacts(&store, &dest).unwrap();
        assert_eq!(first.uploaded, 1);
        assert_eq!(second.uploaded, 0);
        assert_eq!(second.skipped, 1);
    }

    #[test]
    fn per_file_failures_are_counted_not_fatal() {
        struct FailingStore;
        impl RemoteStore for FailingStore {
            fn exists(&self, _name: &str) -> Result<bool> {
                Ok(false)
            }
            fn upload(&self, name: &str, _path: &Path) -> Result<()> {
                anyhow::bail!("quota exceeded for {name}")
            }
        }

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("X1.pdf"), b"one").unwrap();
        let summary = upload_artifacts(&FailingStore, dir.path()).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.uploaded, 0);
    }
}
