//! Bounded fan-out of fetch work.
//!
//! Keeps up to `max_concurrent` fetch workers running at once; when one
//! finishes, the next queued item is admitted until the queue is empty.
//! Returns only after every admitted worker has completed (full drain).

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::fetch::{fetch_item, Fetcher};
use crate::outcome::ItemOutcome;
use crate::table::WorkItem;

/// Runs every item through a fetch worker with at most `max_concurrent` in
/// flight, blocking on completions rather than polling. Produces exactly one
/// outcome per item; order is not significant.
///
/// `max_concurrent == 0` is a configuration error, never an unbounded run.
pub async fn run_dispatch(
    fetcher: Arc<dyn Fetcher>,
    items: Vec<WorkItem>,
    dest_dir: &Path,
    max_concurrent: usize,
) -> Result<Vec<ItemOutcome>> {
    if max_concurrent == 0 {
        anyhow::bail!("max_concurrent must be at least 1");
    }
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let total = items.len();
    tracing::info!(total, max_concurrent, "starting downloads");

    let mut outcomes = Vec::with_capacity(total);
    let mut queue = items.into_iter();
    let mut join_set = tokio::task::JoinSet::new();

    loop {
        while join_set.len() < max_concurrent {
            let Some(item) = queue.next() else {
                break;
            };
            let fetcher = Arc::clone(&fetcher);
            let dest_dir = dest_dir.to_path_buf();
            // The fetch is blocking (curl easy + file write); give it a
            // blocking thread so the admission loop stays responsive.
            join_set.spawn_blocking(move || fetch_item(fetcher.as_ref(), &item, &dest_dir));
        }

        if join_set.is_empty() {
            break;
        }

        let Some(res) = join_set.join_next().await else {
            break;
        };
        let outcome = res.map_err(|e| anyhow::anyhow!("fetch task join: {}", e))?;
        outcomes.push(outcome);
    }

    tracing::info!(
        completed = outcomes.len(),
        failed = outcomes.iter().filter(|o| !o.outcome.is_success()).count(),
        "all downloads finished"
    );
    Ok(outcomes)
}
