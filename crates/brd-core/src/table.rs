//! Source-table ingestion: id-keyed rows with an open column set.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// One unit of download work: an identifier plus its candidate URLs in
/// priority order. Guaranteed non-empty candidates; rows without any usable
/// URL never become work items.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: String,
    pub candidates: Vec<String>,
}

/// One row of the source table, keyed by identifier.
#[derive(Debug, Clone)]
pub struct SourceRow {
    pub id: String,
    values: HashMap<String, String>,
}

impl SourceRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }
}

/// Fully materialized source table. Loaded once before a run; an unreadable
/// table or a missing id column is fatal (precondition violation).
#[derive(Debug)]
pub struct SourceTable {
    pub id_column: String,
    pub columns: Vec<String>,
    rows: Vec<SourceRow>,
    index: HashMap<String, usize>,
}

impl SourceTable {
    pub fn read(path: &Path, id_column: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open source table: {}", path.display()))?;
        let columns: Vec<String> = reader
            .headers()
            .context("failed to read source table header")?
            .iter()
            .map(str::to_string)
            .collect();
        let id_pos = columns
            .iter()
            .position(|c| c == id_column)
            .with_context(|| {
                format!(
                    "source table {} has no '{}' column",
                    path.display(),
                    id_column
                )
            })?;

        let mut rows = Vec::new();
        let mut index = HashMap::new();
        for record in reader.records() {
            let record = record.context("failed to read source table row")?;
            let id = record.get(id_pos).unwrap_or("").trim().to_string();
            if id.is_empty() {
                tracing::warn!("skipping source row with empty identifier");
                continue;
            }
            if index.contains_key(&id) {
                tracing::warn!(%id, "duplicate identifier in source table; keeping first row");
                continue;
            }
            let values = columns
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect();
            index.insert(id.clone(), rows.len());
            rows.push(SourceRow { id, values });
        }

        Ok(Self {
            id_column: id_column.to_string(),
            columns,
            rows,
            index,
        })
    }

    pub fn get(&self, id: &str) -> Option<&SourceRow> {
        self.index.get(id).map(|&i| &self.rows[i])
    }

    pub fn rows(&self) -> impl Iterator<Item = &SourceRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Project the table into work items: for each row, the non-empty values
    /// of `url_columns` in order. Rows with no usable candidate are dropped
    /// here, upholding the non-empty-candidates invariant for the core.
    pub fn work_items(&self, url_columns: &[String]) -> Vec<WorkItem> {
        self.rows
            .iter()
            .filter_map(|row| {
                let candidates: Vec<String> = url_columns
                    .iter()
                    .filter_map(|col| row.get(col))
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect();
                if candidates.is_empty() {
                    tracing::debug!(id = %row.id, "no candidate URL; row excluded from queue");
                    return None;
                }
                Some(WorkItem {
                    id: row.id.clone(),
                    candidates,
                })
            })
            .collect()
    }
}
