use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Global configuration loaded from `~/.config/brd/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrdConfig {
    /// Name of the source-table column holding the unique report identifier.
    pub id_column: String,
    /// Candidate URL columns, tried in order; the first non-empty one is fetched.
    pub url_columns: Vec<String>,
    /// Maximum number of downloads attempted in a single run.
    pub max_downloads: usize,
    /// Maximum number of fetches in flight at once.
    pub max_concurrent: usize,
    /// Timeout for a single fetch attempt, in seconds.
    pub fetch_timeout_secs: u64,
    /// Source table listing report identifiers and candidate URLs.
    pub reports_path: PathBuf,
    /// Cumulative metadata ledger, updated after every run.
    pub metadata_path: PathBuf,
    /// Destination directory for completed artifacts.
    pub download_dir: PathBuf,
    /// Directory for the status report and ledger backups.
    pub output_dir: PathBuf,
}

impl Default for BrdConfig {
    fn default() -> Self {
        Self {
            id_column: "BRnum".to_string(),
            url_columns: vec![
                "Pdf_URL".to_string(),
                "Report Html Address".to_string(),
            ],
            max_downloads: 10,
            max_concurrent: 5,
            fetch_timeout_secs: 30,
            reports_path: PathBuf::from("data/reports.csv"),
            metadata_path: PathBuf::from("data/metadata.csv"),
            download_dir: PathBuf::from("data/downloads"),
            output_dir: PathBuf::from("data/output"),
        }
    }
}

impl BrdConfig {
    /// Reject settings the run cannot proceed with. Called before any download
    /// is attempted; a bad limit here is fatal, never silently clamped.
    pub fn validate(&self) -> Result<()> {
        if self.id_column.trim().is_empty() {
            anyhow::bail!("id_column must not be empty");
        }
        if self.url_columns.is_empty() {
            anyhow::bail!("url_columns must name at least one column");
        }
        if self.max_concurrent == 0 {
            anyhow::bail!("max_concurrent must be at least 1");
        }
        if self.fetch_timeout_secs == 0 {
            anyhow::bail!("fetch_timeout_secs must be at least 1");
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("brd")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BrdConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BrdConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: BrdConfig = toml::from_str(&data)?;
    cfg.validate()?;
    Ok(cfg)
}
