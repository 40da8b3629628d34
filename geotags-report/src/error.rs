//! Errors raised while building or writing the summary report.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors from [`crate::SummaryStatistics::compute`] and [`crate::write_report`].
#[derive(Debug, Error)]
pub enum ReportError {
    /// The boundary has no area to centre the projection on.
    #[error("boundary {name:?} has no polygons to measure against")]
    EmptyBoundary {
        /// Boundary display name.
        name: String,
    },
    /// Writing the report file failed.
    #[error("failed to write report {path}: {source}")]
    Write {
        /// Report path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
}
