//! One batch job per subcommand. Each runner loads its input, does its
//! work, and writes CSV, JSON chart data and text reports.

pub mod embed;
pub mod fix_dates;
pub mod hybrid;
pub mod lda;
pub mod preprocess;

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::error;

use crate::error::PipelineError;
use crate::models::read_records;

pub fn progress_bar(len: usize, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
            .unwrap()
            .progress_chars("█▓░"),
    );
    pb.set_message(msg.to_string());
    pb
}

/// Logs a missing input and tells the caller to stop quietly.
pub(crate) fn input_missing(path: &Path) -> bool {
    if path.exists() {
        return false;
    }
    error!("{}", PipelineError::MissingInput(path.to_path_buf()));
    true
}

/// Non-empty values of `column`, in file order.
pub(crate) fn read_text_column(path: &Path, column: &str) -> anyhow::Result<Vec<String>> {
    let (headers, records) = read_records(path)?;
    let index = headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| PipelineError::Config(format!("{} has no '{column}' column", path.display())))?;
    Ok(records
        .iter()
        .filter_map(|r| r.get(index))
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
        .collect())
}
