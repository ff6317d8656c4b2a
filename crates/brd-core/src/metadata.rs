//! Cumulative metadata ledger: one row per identifier across all runs, with
//! a download flag and whatever pass-through columns the ledger already
//! carries. Backed up before every merge.

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::table::{SourceTable, WorkItem};

/// Column recording whether the artifact was downloaded ("Yes" / "No").
pub const DOWNLOAD_FLAG_COLUMN: &str = "pdf_downloaded";

/// In-memory ledger. Column 0 is the identifier, column 1 the download flag;
/// anything after that is pass-through. The schema is additive-only: a
/// reconciliation never introduces a column the ledger didn't already have.
#[derive(Debug)]
pub struct MetadataLedger {
    pub columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl MetadataLedger {
    fn empty(id_column: &str) -> Self {
        Self {
            columns: vec![id_column.to_string(), DOWNLOAD_FLAG_COLUMN.to_string()],
            rows: Vec::new(),
        }
    }

    /// Load the ledger, or start empty when it is absent or unreadable.
    /// A corrupt prior ledger is a recoverable condition: the run continues
    /// from what can be read, it is not aborted.
    pub fn load_or_empty(path: &Path, id_column: &str) -> Self {
        if !path.exists() {
            tracing::info!("no metadata ledger at {}; starting empty", path.display());
            return Self::empty(id_column);
        }
        match Self::read(path, id_column) {
            Ok(ledger) => ledger,
            Err(err) => {
                tracing::warn!("cannot read metadata ledger: {err:#}; starting empty");
                Self::empty(id_column)
            }
        }
    }

    fn read(path: &Path, id_column: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let columns: Vec<String> = reader
            .headers()
            .context("failed to read ledger header")?
            .iter()
            .map(str::to_string)
            .collect();
        if columns.first().map(String::as_str) != Some(id_column) {
            anyhow::bail!(
                "ledger {} does not start with the '{}' column",
                path.display(),
                id_column
            );
        }
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.context("failed to read ledger row")?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(columns.len(), String::new());
            rows.push(row);
        }
        Ok(Self { columns, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row for `id`, if present (first match).
    pub fn get(&self, id: &str) -> Option<&[String]> {
        self.rows.iter().find(|r| r[0] == id).map(Vec::as_slice)
    }

    /// Download flag for `id`, if present.
    pub fn flag_of(&self, id: &str) -> Option<&str> {
        self.get(id).and_then(|r| r.get(1)).map(String::as_str)
    }

    fn append(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Keep only the most recently appended row per identifier.
    fn dedup_by_id(&mut self) {
        let mut latest: HashMap<String, usize> = HashMap::new();
        for (i, row) in self.rows.iter().enumerate() {
            latest.insert(row[0].clone(), i);
        }
        let rows = std::mem::take(&mut self.rows);
        self.rows = rows
            .into_iter()
            .enumerate()
            .filter(|(i, row)| latest[&row[0]] == *i)
            .map(|(_, row)| row)
            .collect();
    }

    /// Persist via temp-write-then-rename so a crash never leaves a torn
    /// ledger behind.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp)
                .with_context(|| format!("failed to create {}", tmp.display()))?;
            writer.write_record(&self.columns)?;
            for row in &self.rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }
        std::fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }
}

fn backup_path(output_dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    output_dir.join(format!("metadata_backup_{stamp}.csv"))
}

/// Merge one run's results into the cumulative ledger at `ledger_path`.
///
/// For every considered item a fresh row is appended with the download flag
/// set from the post-run scan, carrying over source-table values only for
/// columns the ledger already defines. Appending is followed by
/// de-duplication on identifier keeping the newest row, so the ledger never
/// shrinks except through identifiers that were already duplicated.
pub fn reconcile(
    considered: &[WorkItem],
    source: &SourceTable,
    scanned: &HashSet<String>,
    ledger_path: &Path,
    output_dir: &Path,
    id_column: &str,
) -> Result<usize> {
    let backup = backup_path(output_dir);
    let mut ledger = if ledger_path.exists() {
        match MetadataLedger::read(ledger_path, id_column) {
            Ok(ledger) => {
                ledger
                    .write_to(&backup)
                    .context("failed to back up metadata ledger")?;
                ledger
            }
            Err(err) => {
                tracing::warn!("cannot read metadata ledger: {err:#}; starting empty");
                // The unreadable file is the only copy of the history; keep
                // its raw bytes in the backup before it gets overwritten.
                std::fs::copy(ledger_path, &backup)
                    .context("failed to preserve unreadable metadata ledger")?;
                MetadataLedger::empty(id_column)
            }
        }
    } else {
        tracing::info!("no metadata ledger at {}; starting empty", ledger_path.display());
        let ledger = MetadataLedger::empty(id_column);
        ledger
            .write_to(&backup)
            .context("failed to back up metadata ledger")?;
        ledger
    };
    let rows_before = ledger.len();
    tracing::info!("metadata backup saved to {}", backup.display());

    for item in considered {
        let flag = if scanned.contains(&item.id) { "Yes" } else { "No" };
        let row: Vec<String> = ledger
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| match i {
                0 => item.id.clone(),
                1 => flag.to_string(),
                _ => source
                    .get(&item.id)
                    .and_then(|r| r.get(col))
                    .unwrap_or("")
                    .to_string(),
            })
            .collect();
        ledger.append(row);
    }

    ledger.dedup_by_id();
    ledger.write_to(ledger_path)?;
    tracing::info!(
        rows_before,
        rows_after = ledger.len(),
        "metadata ledger updated at {}",
        ledger_path.display()
    );
    Ok(ledger.len())
}
