//! Error types emitted by the geotags CLI.
//!
//! Every variant is fatal for a run. Category failures are not errors at
//! this level; they travel in the run report and end up in the summary.

use std::sync::Arc;

use camino::Utf8PathBuf;
use geotags_core::BoundaryError;
use geotags_data::{ConfigLoadError, ExportError, ProviderBuildError};
use geotags_report::ReportError;
use thiserror::Error;

/// Errors emitted by the geotags CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The output directory exists but is not a directory.
    #[error("output directory {path:?} is not a directory")]
    OutputDirectoryNotDirectory { path: Utf8PathBuf },
    /// The output directory could not be created.
    #[error("failed to create output directory {path:?}: {source}")]
    CreateOutputDirectory {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The pipeline configuration file could not be loaded or failed validation.
    #[error(transparent)]
    PipelineConfig(#[from] ConfigLoadError),
    /// Constructing the map-data provider failed.
    #[error("failed to build map-data provider: {0}")]
    BuildProvider(#[from] ProviderBuildError),
    /// The city boundary could not be resolved.
    #[error(transparent)]
    Boundary(#[from] BoundaryError),
    /// Writing an export artefact failed.
    #[error(transparent)]
    Export(#[from] ExportError),
    /// Computing or writing the summary report failed.
    #[error(transparent)]
    Report(#[from] ReportError),
}
