use anyhow::Result;
use std::path::{Path, PathBuf};

use brd_core::config::BrdConfig;
use brd_core::upload::{upload_artifacts, DirStore};

pub fn run_upload(cfg: &BrdConfig, remote: &Path, dest: Option<PathBuf>) -> Result<()> {
    let dest = dest.unwrap_or_else(|| cfg.download_dir.clone());
    let store = DirStore::new(remote);
    let summary = upload_artifacts(&store, &dest)?;
    println!(
        "uploaded {}, skipped {} already present, {} failed",
        summary.uploaded, summary.skipped, summary.failed
    );
    Ok(())
}
