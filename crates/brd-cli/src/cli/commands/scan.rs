use anyhow::Result;
use std::path::PathBuf;

use brd_core::config::BrdConfig;
use brd_core::scan::scan_existing;

pub fn run_scan(cfg: &BrdConfig, dest: Option<PathBuf>) -> Result<()> {
    let dest = dest.unwrap_or_else(|| cfg.download_dir.clone());
    let mut ids: Vec<String> = scan_existing(&dest).into_iter().collect();
    ids.sort();

    if ids.is_empty() {
        println!("no completed artifacts in {}", dest.display());
        return Ok(());
    }
    for id in &ids {
        println!("{id}");
    }
    println!("{} completed artifacts", ids.len());
    Ok(())
}
