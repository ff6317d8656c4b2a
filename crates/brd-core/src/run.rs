//! One full batch run: read the source table, skip what exists, dispatch the
//! rest under the concurrency cap, then project the outcomes into the status
//! report and the metadata ledger.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::BrdConfig;
use crate::dispatch::run_dispatch;
use crate::fetch::Fetcher;
use crate::metadata;
use crate::outcome::OutcomeLedger;
use crate::report::{build_status, persist_status, DownloadStatus};
use crate::scan::scan_existing;
use crate::table::{SourceTable, WorkItem};

/// Name of the per-run status report inside the output directory.
pub const STATUS_REPORT_FILE: &str = "download_status.csv";

/// Counts reported after a run, for the CLI and for logs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Items covered by this run's status report.
    pub considered: usize,
    /// Items dispatched to a fetch worker.
    pub attempted: usize,
    /// Items skipped because their artifact already existed.
    pub skipped_existing: usize,
    /// Considered items that ended up downloaded.
    pub downloaded: usize,
    /// Considered items that ended up failed.
    pub failed: usize,
}

/// Execute one run end to end. Per-item failures never abort the run; only
/// file-level preconditions (bad config, unreadable source table) do.
pub async fn run_batch(cfg: &BrdConfig, fetcher: Arc<dyn Fetcher>) -> Result<RunSummary> {
    cfg.validate()?;

    std::fs::create_dir_all(&cfg.download_dir).with_context(|| {
        format!("failed to create download dir {}", cfg.download_dir.display())
    })?;
    std::fs::create_dir_all(&cfg.output_dir)
        .with_context(|| format!("failed to create output dir {}", cfg.output_dir.display()))?;

    let source = SourceTable::read(&cfg.reports_path, &cfg.id_column)?;
    tracing::info!(rows = source.len(), "read source table {}", cfg.reports_path.display());

    let all_items = source.work_items(&cfg.url_columns);
    tracing::info!(with_urls = all_items.len(), "rows with a usable candidate URL");

    let existing = scan_existing(&cfg.download_dir);
    let (present, needed): (Vec<WorkItem>, Vec<WorkItem>) = all_items
        .into_iter()
        .partition(|item| existing.contains(&item.id));

    let mut queue = needed;
    if queue.len() > cfg.max_downloads {
        tracing::info!(
            queued = cfg.max_downloads,
            available = queue.len(),
            "capping downloads for this run"
        );
        queue.truncate(cfg.max_downloads);
    }

    // Considered = dispatched items plus the ones satisfied by a prior run.
    // Items beyond the cap are left for a future run and stay out of the
    // report entirely.
    let mut considered = queue.clone();
    considered.extend(present.iter().cloned());

    let attempted = queue.len();
    let outcomes = run_dispatch(
        Arc::clone(&fetcher),
        queue,
        &cfg.download_dir,
        cfg.max_concurrent,
    )
    .await?;

    let mut ledger = OutcomeLedger::from_outcomes(outcomes);
    for item in &present {
        ledger.record_present(&item.id);
    }

    // Recomputed after the dispatcher so fresh downloads count everywhere.
    let scanned = scan_existing(&cfg.download_dir);

    let records = build_status(&considered, &scanned, &ledger);
    let downloaded = records
        .iter()
        .filter(|r| r.status == DownloadStatus::Downloaded)
        .count();
    let failed = records.len() - downloaded;

    let report_path = cfg.output_dir.join(STATUS_REPORT_FILE);
    persist_status(records, &report_path)?;

    if let Err(err) = metadata::reconcile(
        &considered,
        &source,
        &scanned,
        &cfg.metadata_path,
        &cfg.output_dir,
        &cfg.id_column,
    ) {
        // A damaged ledger file must not take the whole run down; the status
        // report and the artifacts themselves are already persisted.
        tracing::warn!("metadata reconciliation failed: {err:#}");
    }

    let summary = RunSummary {
        considered: considered.len(),
        attempted,
        skipped_existing: present.len(),
        downloaded,
        failed,
    };
    tracing::info!(?summary, "run complete");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use crate::metadata::MetadataLedger;
    use std::collections::HashMap;
    use std::io::Write;
    use std::path::Path;

    /// Fetcher scripted per URL: body to serve, or a transport failure for
    /// anything not in the script.
    struct ScriptedFetcher(HashMap<String, Result<Vec<u8>, String>>);

    impl Fetcher for ScriptedFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            match self.0.get(url) {
                Some(Ok(body)) => Ok(body.clone()),
                // CURLE_COULDNT_CONNECT
                Some(Err(_)) | None => Err(FetchError::Transport(curl::Error::new(7))),
            }
        }
    }

    fn cfg_in(dir: &Path) -> BrdConfig {
        BrdConfig {
            reports_path: dir.join("reports.csv"),
            metadata_path: dir.join("metadata.csv"),
            download_dir: dir.join("downloads"),
            output_dir: dir.join("output"),
            ..BrdConfig::default()
        }
    }

    fn write_file(path: &Path, content: &str) {
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    fn read_status(cfg: &BrdConfig) -> Vec<(String, String, String)> {
        let mut reader =
            csv::Reader::from_path(cfg.output_dir.join(STATUS_REPORT_FILE)).unwrap();
        reader
            .records()
            .map(|r| {
                let r = r.unwrap();
                (r[0].to_string(), r[1].to_string(), r[2].to_string())
            })
            .collect()
    }

    #[tokio::test]
    async fn full_run_covers_success_fallback_failure_and_existing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = cfg_in(dir.path());
        write_file(
            &cfg.reports_path,
            "BRnum,Pdf_URL,Report Html Address\n\
             X1,http://a/x1.pdf,\n\
             X2,,http://a/x2.html\n\
             X3,http://a/x3.pdf,\n\
             X4,http://a/x4.pdf,\n",
        );
        std::fs::create_dir_all(&cfg.download_dir).unwrap();
        write_file(&cfg.download_dir.join("X4.pdf"), "already here");

        let mut script = HashMap::new();
        script.insert("http://a/x1.pdf".to_string(), Ok(b"pdf one".to_vec()));
        script.insert("http://a/x2.html".to_string(), Ok(b"pdf two".to_vec()));
        script.insert(
            "http://a/x3.pdf".to_string(),
            Err("connection refused".to_string()),
        );
        let fetcher = Arc::new(ScriptedFetcher(script));

        let summary = run_batch(&cfg, fetcher).await.unwrap();
        assert_eq!(summary.considered, 4);
        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.skipped_existing, 1);
        assert_eq!(summary.downloaded, 3);
        assert_eq!(summary.failed, 1);

        // Primary and fallback URLs both end as artifacts under final names.
        assert!(cfg.download_dir.join("X1.pdf").exists());
        assert!(cfg.download_dir.join("X2.pdf").exists());
        // A failed fetch creates nothing.
        assert!(!cfg.download_dir.join("X3.pdf").exists());

        let status: HashMap<String, (String, String)> = read_status(&cfg)
            .into_iter()
            .map(|(id, s, e)| (id, (s, e)))
            .collect();
        assert_eq!(status["X1"], ("Downloaded".to_string(), String::new()));
        assert_eq!(status["X2"], ("Downloaded".to_string(), String::new()));
        assert_eq!(status["X3"].0, "Failed");
        assert!(
            status["X3"].1.starts_with("network error:"),
            "{}",
            status["X3"].1
        );
        // Pre-existing artifact is reported downloaded without a fetch.
        assert_eq!(status["X4"], ("Downloaded".to_string(), String::new()));

        // Ledger flags reflect the scan taken after the downloads.
        let ledger = MetadataLedger::load_or_empty(&cfg.metadata_path, "BRnum");
        assert_eq!(ledger.flag_of("X1"), Some("Yes"));
        assert_eq!(ledger.flag_of("X3"), Some("No"));
        assert_eq!(ledger.flag_of("X4"), Some("Yes"));
    }

    #[tokio::test]
    async fn prior_ledger_row_flips_without_duplication() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = cfg_in(dir.path());
        write_file(&cfg.reports_path, "BRnum,Pdf_URL\nX1,http://a/x1.pdf\n");
        write_file(&cfg.metadata_path, "BRnum,pdf_downloaded\nX1,No\n");

        let mut script = HashMap::new();
        script.insert("http://a/x1.pdf".to_string(), Ok(b"pdf".to_vec()));
        run_batch(&cfg, Arc::new(ScriptedFetcher(script)))
            .await
            .unwrap();

        let ledger = MetadataLedger::load_or_empty(&cfg.metadata_path, "BRnum");
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.flag_of("X1"), Some("Yes"));
    }

    #[tokio::test]
    async fn cap_limits_attempts_but_not_existing_items() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = cfg_in(dir.path());
        cfg.max_downloads = 1;
        write_file(
            &cfg.reports_path,
            "BRnum,Pdf_URL\nX1,http://a/x1.pdf\nX2,http://a/x2.pdf\nX3,http://a/x3.pdf\n",
        );
        std::fs::create_dir_all(&cfg.download_dir).unwrap();
        write_file(&cfg.download_dir.join("X3.pdf"), "done earlier");

        let mut script = HashMap::new();
        script.insert("http://a/x1.pdf".to_string(), Ok(b"pdf".to_vec()));
        script.insert("http://a/x2.pdf".to_string(), Ok(b"pdf".to_vec()));
        let summary = run_batch(&cfg, Arc::new(ScriptedFetcher(script)))
            .await
            .unwrap();

        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.skipped_existing, 1);
        // The over-cap item is deferred, not reported as failed.
        assert_eq!(summary.considered, 2);
        let status = read_status(&cfg);
        assert!(status.iter().all(|(_, s, _)| s == "Downloaded"));
    }

    #[tokio::test]
    async fn unreadable_source_table_aborts_before_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = cfg_in(dir.path());
        let fetcher = Arc::new(ScriptedFetcher(HashMap::new()));
        assert!(run_batch(&cfg, fetcher).await.is_err());
        assert!(!cfg.output_dir.join(STATUS_REPORT_FILE).exists());
    }

    #[tokio::test]
    async fn invalid_concurrency_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = cfg_in(dir.path());
        cfg.max_concurrent = 0;
        write_file(&cfg.reports_path, "BRnum,Pdf_URL\nX1,http://a/x1.pdf\n");
        let fetcher = Arc::new(ScriptedFetcher(HashMap::new()));
        assert!(run_batch(&cfg, fetcher).await.is_err());
    }

    #[test]
    fn run_summary_default_is_zeroed() {
        assert_eq!(RunSummary::default().considered, 0);
    }
}
