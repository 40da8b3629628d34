//! Facade crate for the geotags OpenStreetMap extraction pipeline.
//!
//! This crate re-exports the core domain types and exposes the HTTP provider,
//! exporters and report renderer behind feature flags.

#![forbid(unsafe_code)]

pub use geotags_core::{
    Boundary, BoundaryError, Category, CategoryOutcome, CategoryResult, ConfigError, Crs,
    ElementId, ElementKind, ExportOptions, ExtractionError, Feature, FeatureGeometry,
    GeometryClass, MapDataProvider, PipelineConfig, ProviderError, RunReport, SkipReason,
    SkippedFeature, TagFilter, extract_features, normalize, resolve_boundary,
};

#[cfg(feature = "data")]
pub use geotags_data::{
    ConfigLoadError, ExportError, HttpMapDataProvider, HttpMapDataProviderConfig, OutputPaths,
    load_config, write_boundary, write_feature_collection, write_postgis_bundle,
};

#[cfg(feature = "report")]
pub use geotags_report::{ReportContext, ReportError, SummaryStatistics, render_html, write_report};
