use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

const FILE_PREFIX: &str = "trailstat";
const FILE_SUFFIX: &str = "log";

/// Daily `trailstat.<date>.log` files in `dir`. At each rollover only the
/// newest `max_files` are kept.
pub fn file_appender(dir: &Path, max_files: usize) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(FILE_PREFIX)
        .filename_suffix(FILE_SUFFIX)
        .max_log_files(max_files)
        .build(dir)
        .with_context(|| format!("failed to open log directory {}", dir.display()))
}
