mod run;
mod scan;
mod upload;

pub use run::run_batch_command;
pub use scan::run_scan;
pub use upload::run_upload;
