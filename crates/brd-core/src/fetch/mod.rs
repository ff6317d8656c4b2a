//! Fetch worker: one attempt against the first usable candidate, with an
//! atomic temp-write-then-rename so the scanner never mistakes a partial
//! file for a completed artifact.

mod client;

pub use client::CurlFetcher;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::outcome::ItemOutcome;
use crate::table::WorkItem;
use crate::ARTIFACT_EXT;

/// Error from a single fetch attempt. The variants keep transport, protocol,
/// and local I/O failures distinguishable in the reported reason.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Transport(#[from] curl::Error),
    #[error("HTTP {0}")]
    Http(u32),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte-transfer capability behind the fetch worker. The production
/// implementation is [`CurlFetcher`]; tests substitute scripted fakes.
pub trait Fetcher: Send + Sync {
    /// Fetch `url` fully into memory. Only 2xx responses succeed.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Final artifact path for an identifier.
pub fn artifact_path(dest_dir: &Path, id: &str) -> PathBuf {
    dest_dir.join(format!("{id}.{ARTIFACT_EXT}"))
}

fn temp_path(dest_dir: &Path, id: &str) -> PathBuf {
    dest_dir.join(format!("{id}.{ARTIFACT_EXT}.part"))
}

fn try_fetch(
    fetcher: &dyn Fetcher,
    url: &str,
    dest_dir: &Path,
    id: &str,
) -> Result<(), FetchError> {
    let body = fetcher.fetch(url)?;

    let tmp = temp_path(dest_dir, id);
    let write: std::io::Result<()> = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&body)?;
        file.sync_all()?;
        fs::rename(&tmp, artifact_path(dest_dir, id))
    })();
    if write.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    Ok(write?)
}

/// Perform exactly one download attempt for `item`, reporting the outcome.
///
/// The first present candidate is used; no retries and no fallback to later
/// candidates after a failed attempt (retry policy belongs to a future run).
pub fn fetch_item(fetcher: &dyn Fetcher, item: &WorkItem, dest_dir: &Path) -> ItemOutcome {
    let Some(url) = item.candidates.first() else {
        // Upstream filtering guarantees at least one candidate.
        debug_assert!(false, "work item with no candidates reached the fetch worker");
        return ItemOutcome::failure(item.id.as_str(), "no candidate URL");
    };

    match try_fetch(fetcher, url, dest_dir, &item.id) {
        Ok(()) => {
            tracing::info!(id = %item.id, %url, "downloaded");
            ItemOutcome::success(item.id.as_str())
        }
        Err(err) => {
            let reason = err.to_string();
            tracing::warn!(id = %item.id, %url, "download failed: {reason}");
            ItemOutcome::failure(item.id.as_str(), reason)
        }
    }
}
