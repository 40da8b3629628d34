//! Adapters connecting the geotags pipeline to the outside world.
//!
//! Responsibilities:
//! - Read pipeline configuration files ([`config_file`]).
//! - Talk to Nominatim and Overpass over HTTP ([`provider`]).
//! - Write GeoJSON and PostGIS artefacts atomically ([`export`]).
//!
//! Boundaries:
//! - Domain rules such as de-duplication and geometry coercion live in
//!   `geotags-core`; this crate only moves data in and out.
//!
//! Invariants:
//! - Output files are replaced atomically or not at all.
//! - No global mutable state.
#![forbid(unsafe_code)]

pub mod config_file;
pub mod export;
pub mod provider;

pub use config_file::{ConfigFormat, ConfigLoadError, load_config, parse_config, render_config};
pub use export::{
    ExportError, OutputPaths, PostgisBundle, write_boundary, write_feature_collection,
    write_postgis_bundle,
};
pub use provider::{HttpMapDataProvider, HttpMapDataProviderConfig, ProviderBuildError};
