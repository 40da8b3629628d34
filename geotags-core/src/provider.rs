//! Map-data provider seam.
//!
//! The pipeline reaches OpenStreetMap only through [`MapDataProvider`]. The
//! HTTP implementation lives in `geotags-data`; tests use the stub in
//! `test_support` (behind the `test-support` feature).

use thiserror::Error;

use crate::{Boundary, RawFeature, TagFilter};

/// A geocoding request for a named place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceQuery {
    /// City or locality name.
    pub city: String,
    /// Country name.
    pub country: String,
}

impl PlaceQuery {
    /// Build a query for `city` in `country`.
    #[must_use]
    pub fn new(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            country: country.into(),
        }
    }

    /// Free-form search text, `"{city}, {country}"`.
    #[must_use]
    pub fn search_text(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }
}

/// Errors reported by a [`MapDataProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Timeout applied to the request.
        timeout_secs: u64,
    },
    /// The service answered with a non-success HTTP status.
    #[error("request to {url} failed with HTTP {status}: {message}")]
    HttpStatus {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Status text or body excerpt.
        message: String,
    },
    /// The request could not be sent or the connection failed.
    #[error("network error contacting {url}: {message}")]
    Network {
        /// Requested URL.
        url: String,
        /// Underlying error text.
        message: String,
    },
    /// The response body could not be decoded.
    #[error("failed to decode response from {url}: {message}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Decoder error text.
        message: String,
    },
    /// The service reported a runtime error inside an otherwise valid response.
    #[error("service error from {service}: {message}")]
    Service {
        /// Service name, e.g. `overpass`.
        service: String,
        /// Error text reported by the service.
        message: String,
    },
}

/// Source of boundaries and OSM features.
///
/// Implementations are synchronous. Callers run stages sequentially and block
/// on each request.
///
/// # Examples
///
/// ```
/// use geotags_core::{Boundary, MapDataProvider, PlaceQuery, ProviderError, RawFeature, TagFilter};
///
/// struct EmptyWorld;
///
/// impl MapDataProvider for EmptyWorld {
///     fn resolve_place(&self, _query: &PlaceQuery) -> Result<Option<Boundary>, ProviderError> {
///         Ok(None)
///     }
///
///     fn query_features(
///         &self,
///         _boundary: &Boundary,
///         _filter: &TagFilter,
///     ) -> Result<Vec<RawFeature>, ProviderError> {
///         Ok(Vec::new())
///     }
/// }
///
/// let found = EmptyWorld.resolve_place(&PlaceQuery::new("Atlantis", "Nowhere"))?;
/// assert!(found.is_none());
/// # Ok::<(), ProviderError>(())
/// ```
pub trait MapDataProvider {
    /// Look up the administrative boundary for a place.
    ///
    /// Returns `Ok(None)` when no polygonal match exists.
    fn resolve_place(&self, query: &PlaceQuery) -> Result<Option<Boundary>, ProviderError>;

    /// Fetch every feature matching `filter` near `boundary`.
    ///
    /// Implementations may over-fetch (for example by querying the bounding
    /// box); the extractor clips results to the boundary polygon.
    fn query_features(
        &self,
        boundary: &Boundary,
        filter: &TagFilter,
    ) -> Result<Vec<RawFeature>, ProviderError>;
}

impl<P: MapDataProvider + ?Sized> MapDataProvider for &P {
    fn resolve_place(&self, query: &PlaceQuery) -> Result<Option<Boundary>, ProviderError> {
        (**self).resolve_place(query)
    }

    fn query_features(
        &self,
        boundary: &Boundary,
        filter: &TagFilter,
    ) -> Result<Vec<RawFeature>, ProviderError> {
        (**self).query_features(boundary, filter)
    }
}

impl<P: MapDataProvider + ?Sized> MapDataProvider for Box<P> {
    fn resolve_place(&self, query: &PlaceQuery) -> Result<Option<Boundary>, ProviderError> {
        (**self).resolve_place(query)
    }

    fn query_features(
        &self,
        boundary: &Boundary,
        filter: &TagFilter,
    ) -> Result<Vec<RawFeature>, ProviderError> {
        (**self).query_features(boundary, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn search_text_joins_city_and_country() {
        let query = PlaceQuery::new("Ghent", "Belgium");
        assert_eq!(query.search_text(), "Ghent, Belgium");
    }

    #[rstest]
    fn provider_errors_render_context() {
        let err = ProviderError::HttpStatus {
            url: "https://overpass.example/api/interpreter".into(),
            status: 504,
            message: "Gateway Timeout".into(),
        };
        let text = err.to_string();
        assert!(text.contains("504"));
        assert!(text.contains("overpass.example"));
    }
}
