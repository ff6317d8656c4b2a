//! Per-run status report: one record per considered item, merged into any
//! prior report by identifier with the newest record winning.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::outcome::{Outcome, OutcomeLedger};
use crate::table::WorkItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloadStatus {
    Downloaded,
    Failed,
}

/// One row of the status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub id: String,
    pub status: DownloadStatus,
    /// Empty when downloaded.
    pub error: String,
}

/// Project scan results and outcomes into one record per considered item.
///
/// Downloaded when the artifact exists (pre-existing or fresh) or the outcome
/// is a success; otherwise Failed with the recorded reason. An item with no
/// outcome at all gets "File not found" so a dispatcher bug degrades to a
/// visible failure instead of a crash.
pub fn build_status(
    considered: &[WorkItem],
    scanned: &HashSet<String>,
    outcomes: &OutcomeLedger,
) -> Vec<StatusRecord> {
    considered
        .iter()
        .map(|item| {
            let downloaded = scanned.contains(&item.id)
                || matches!(outcomes.lookup(&item.id), Some(Outcome::Success));
            if downloaded {
                return StatusRecord {
                    id: item.id.clone(),
                    status: DownloadStatus::Downloaded,
                    error: String::new(),
                };
            }
            let error = match outcomes.lookup(&item.id) {
                Some(Outcome::Failure(reason)) => reason.clone(),
                _ => "File not found".to_string(),
            };
            StatusRecord {
                id: item.id.clone(),
                status: DownloadStatus::Failed,
                error,
            }
        })
        .collect()
}

fn read_report(path: &Path) -> Result<Vec<StatusRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open status report: {}", path.display()))?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record.context("failed to parse status record")?);
    }
    Ok(records)
}

fn write_atomic(records: &[StatusRecord], path: &Path) -> Result<()> {
    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)
            .with_context(|| format!("failed to create {}", tmp.display()))?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

/// Merge `records` into the report at `path` and persist. For an identifier
/// present in both, the new record wins; prior order is preserved and new
/// identifiers are appended. An unreadable prior report is logged and the
/// new records become the whole report (recoverable, not fatal).
pub fn persist_status(records: Vec<StatusRecord>, path: &Path) -> Result<()> {
    let mut merged: Vec<StatusRecord> = Vec::new();
    if path.exists() {
        match read_report(path) {
            Ok(existing) => merged = existing,
            Err(err) => {
                tracing::warn!("discarding unreadable prior report: {err:#}");
            }
        }
    }

    let mut index: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id.clone(), i))
        .collect();
    for record in records {
        match index.get(&record.id) {
            Some(&i) => merged[i] = record,
            None => {
                index.insert(record.id.clone(), merged.len());
                merged.push(record);
            }
        }
    }

    write_atomic(&merged, path)?;
    tracing::info!(rows = merged.len(), "status report saved to {}", path.display());
    Ok(())
}
