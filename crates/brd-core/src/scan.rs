//! Existing-artifact scanner for the destination directory.

use std::collections::HashSet;
use std::path::Path;

use crate::ARTIFACT_EXT;

/// Identifiers that already have a completed artifact under `dest_dir`,
/// derived from `{id}.pdf` filenames.
///
/// An unreadable destination yields an empty set rather than an error: at
/// this layer "cannot tell" means "nothing done yet". The run creates the
/// directory before dispatching, so nothing is silently lost.
pub fn scan_existing(dest_dir: &Path) -> HashSet<String> {
    let entries = match std::fs::read_dir(dest_dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(
                "cannot scan {}: {err}; treating as empty",
                dest_dir.display()
            );
            return HashSet::new();
        }
    };

    let mut ids = HashSet::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(ARTIFACT_EXT) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            ids.insert(stem.to_string());
        }
    }
    ids
}
