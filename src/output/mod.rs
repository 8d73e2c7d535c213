//! Output formatting module
//!
//! Renders and exports run results and execution plans.

mod export;
mod formatter;

pub use export::{export_run, ExportFormat};
pub use formatter::{OutputFormat, ResultFormatter};
