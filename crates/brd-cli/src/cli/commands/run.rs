use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use brd_core::config::BrdConfig;
use brd_core::fetch::CurlFetcher;
use brd_core::run::run_batch;

pub async fn run_batch_command(
    mut cfg: BrdConfig,
    source: Option<PathBuf>,
    dest: Option<PathBuf>,
    limit: Option<usize>,
    jobs: Option<usize>,
) -> Result<()> {
    if let Some(source) = source {
        cfg.reports_path = source;
    }
    if let Some(dest) = dest {
        cfg.download_dir = dest;
    }
    if let Some(limit) = limit {
        cfg.max_downloads = limit;
    }
    if let Some(jobs) = jobs {
        cfg.max_concurrent = jobs;
    }

    let fetcher = Arc::new(CurlFetcher::new(Duration::from_secs(cfg.fetch_timeout_secs)));
    let summary = run_batch(&cfg, fetcher).await?;

    println!(
        "{} considered: {} downloaded ({} already present), {} failed",
        summary.considered, summary.downloaded, summary.skipped_existing, summary.failed
    );
    println!(
        "status report: {}",
        cfg.output_dir.join(brd_core::run::STATUS_REPORT_FILE).display()
    );
    Ok(())
}
