//! Core domain types for the geotags pipeline.
//!
//! The pipeline runs in fixed stages: a validated [`PipelineConfig`] names
//! the categories to collect, [`resolve_boundary`] finds the city outline,
//! [`extract_features`] queries a [`MapDataProvider`] per category, and
//! [`normalize`] coerces each feature into its category's geometry class.
//! Exporting and reporting live in `geotags-data` and `geotags-report`.
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod boundary;
mod category;
mod config;
mod extract;
mod feature;
mod normalize;
mod outcome;
mod provider;
#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use boundary::{Boundary, BoundaryError, resolve_boundary};
pub use category::{
    Category, GeometryClass, ParseGeometryClassError, TagFilter, TagFilterError, Tags,
};
pub use config::{
    CategorySpec, CategoryTable, ConfigError, Crs, DEFAULT_CRS, DEFAULT_TABLE, ExportOptions,
    PipelineConfig, PipelineDocument, TagFilterSpec,
};
pub use extract::{Extraction, extract_features};
pub use feature::{
    ElementId, ElementKind, ExtractedFeature, Feature, FeatureGeometry, ParseElementIdError,
    RawFeature, RawGeometry,
};
pub use normalize::{Normalized, normalize};
pub use outcome::{
    CategoryOutcome, CategoryResult, ExtractionError, RunReport, SkipReason, SkippedFeature,
};
pub use provider::{MapDataProvider, PlaceQuery, ProviderError};
