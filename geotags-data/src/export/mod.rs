//! Writers for pipeline artefacts.
//!
//! Every writer goes through [`geotags_fs::write_atomic`]: readers of the
//! output directory see either the previous file or the complete new one.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

mod geojson;
mod postgis;

pub use self::geojson::{
    boundary_collection, feature_collection, write_boundary, write_feature_collection,
};
pub use self::postgis::{PostgisBundle, postgis_script, write_postgis_bundle};

/// Errors raised while writing artefacts.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Writing or replacing an output file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Target file.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
}

impl ExportError {
    pub(crate) fn write(path: &Utf8Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::Write {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// File names of one run's artefacts inside an output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    dir: Utf8PathBuf,
    slug: String,
}

impl OutputPaths {
    /// Paths for `slug` (see [`geotags_core::PipelineConfig::slug`]) in `dir`.
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>, slug: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            slug: slug.into(),
        }
    }

    /// Output directory.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// `<slug>_geotags.geojson`.
    #[must_use]
    pub fn features(&self) -> Utf8PathBuf {
        self.file("geotags.geojson")
    }

    /// `<slug>_boundary.geojson`.
    #[must_use]
    pub fn boundary(&self) -> Utf8PathBuf {
        self.file("boundary.geojson")
    }

    /// `<slug>_summary_report.html`.
    #[must_use]
    pub fn report(&self) -> Utf8PathBuf {
        self.file("summary_report.html")
    }

    /// `<slug>_geotags.csv`, the PostGIS records.
    #[must_use]
    pub fn postgis_csv(&self) -> Utf8PathBuf {
        self.file("geotags.csv")
    }

    /// `<slug>_geotags.sql`, the PostGIS load script.
    #[must_use]
    pub fn postgis_sql(&self) -> Utf8PathBuf {
        self.file("geotags.sql")
    }

    fn file(&self, suffix: &str) -> Utf8PathBuf {
        self.dir.join(format!("{}_{suffix}", self.slug))
    }
}
