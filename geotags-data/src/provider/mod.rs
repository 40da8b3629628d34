//! HTTP map-data provider for OpenStreetMap services.
//!
//! [`HttpMapDataProvider`] implements [`geotags_core::MapDataProvider`] on top
//! of two public APIs: Nominatim resolves the city boundary and Overpass
//! returns the tagged nodes, ways and relations inside its bounding box.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use geotags_core::{MapDataProvider, PlaceQuery, TagFilter};
//! use geotags_data::provider::{HttpMapDataProvider, HttpMapDataProviderConfig};
//!
//! let config = HttpMapDataProviderConfig::default()
//!     .with_timeout(Duration::from_secs(60))
//!     .with_user_agent("my-survey/1.0");
//! let provider = HttpMapDataProvider::with_config(config)?;
//!
//! if let Some(boundary) = provider.resolve_place(&PlaceQuery::new("Ghent", "Belgium"))? {
//!     let parks = provider.query_features(&boundary, &TagFilter::exact("leisure", "park"))?;
//!     println!("{} parks", parks.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod http;
mod nominatim;
mod overpass;

pub use http::{
    DEFAULT_NOMINATIM_URL, DEFAULT_OVERPASS_URL, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
    HttpMapDataProvider, HttpMapDataProviderConfig, ProviderBuildError, is_retryable,
};
