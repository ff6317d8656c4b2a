pub mod config;
pub mod logging;

pub mod dispatch;
pub mod fetch;
pub mod metadata;
pub mod outcome;
pub mod report;
pub mod run;
pub mod scan;
pub mod table;
pub mod upload;

/// Extension of a completed artifact at the destination directory.
pub const ARTIFACT_EXT: &str = "pdf";
