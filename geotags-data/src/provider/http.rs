//! HTTP-based `MapDataProvider` backed by Nominatim and Overpass.
//!
//! [`HttpMapDataProvider`] resolves places through the Nominatim search API
//! and fetches tagged elements through the Overpass API. The
//! [`MapDataProvider`] trait is synchronous, so the provider blocks on an
//! internal Tokio runtime for every request.
//!
//! # Example
//!
//! ```no_run
//! use geotags_core::{MapDataProvider, PlaceQuery};
//! use geotags_data::provider::{HttpMapDataProvider, HttpMapDataProviderConfig};
//!
//! let config = HttpMapDataProviderConfig::default().with_user_agent("my-survey/1.0");
//! let provider = HttpMapDataProvider::with_config(config)?;
//! let _boundary = provider.resolve_place(&PlaceQuery::new("Ghent", "Belgium"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::future::Future;
use std::time::Duration;

use geotags_core::{Boundary, MapDataProvider, PlaceQuery, ProviderError, RawFeature, TagFilter};
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use url::Url;

use super::nominatim::{Place, select_boundary};
use super::overpass::{OverpassResponse, build_query};

/// Error type for [`HttpMapDataProvider`] construction failures.
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// A service URL could not be parsed.
    #[error("invalid {service} URL {url:?}: {source}")]
    InvalidUrl {
        /// Service the URL belongs to.
        service: &'static str,
        /// Rejected URL text.
        url: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
}

/// Default user agent. Nominatim's usage policy requires an identifying one.
pub const DEFAULT_USER_AGENT: &str = concat!("geotags/", env!("CARGO_PKG_VERSION"));

/// Public Nominatim instance.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Public Overpass interpreter endpoint.
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Default request timeout in seconds. Overpass queries for large cities are slow.
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);
const NOMINATIM_RESULT_LIMIT: &str = "10";

/// Configuration for [`HttpMapDataProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpMapDataProviderConfig {
    /// Base URL of the Nominatim service.
    pub nominatim_url: String,
    /// Full URL of the Overpass interpreter.
    pub overpass_url: String,
    /// Per-request timeout, also sent to Overpass as the query timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Extra attempts after a retryable failure.
    pub max_retries: u32,
    /// Base delay between attempts; attempt `n` waits `n * retry_delay`.
    pub retry_delay: Duration,
}

impl Default for HttpMapDataProviderConfig {
    fn default() -> Self {
        Self {
            nominatim_url: DEFAULT_NOMINATIM_URL.to_owned(),
            overpass_url: DEFAULT_OVERPASS_URL.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl HttpMapDataProviderConfig {
    /// Configuration pointing at the given services, other fields defaulted.
    #[must_use]
    pub fn new(nominatim_url: impl Into<String>, overpass_url: impl Into<String>) -> Self {
        Self {
            nominatim_url: nominatim_url.into(),
            overpass_url: overpass_url.into(),
            ..Self::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the retry budget and base backoff.
    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }
}

/// Whether a failed request is worth repeating.
///
/// Timeouts, rate limiting and gateway errors are transient on the public
/// OSM services; everything else is returned immediately.
#[must_use]
pub fn is_retryable(error: &ProviderError) -> bool {
    match error {
        ProviderError::Timeout { .. } => true,
        ProviderError::HttpStatus { status, .. } => matches!(*status, 429 | 502 | 503 | 504),
        ProviderError::Network { .. }
        | ProviderError::Decode { .. }
        | ProviderError::Service { .. } => false,
    }
}

/// Map-data provider speaking to Nominatim and Overpass over HTTP.
///
/// # Runtime behaviour
///
/// Outside any Tokio runtime the provider blocks on its own current-thread
/// runtime. Inside a multi-threaded runtime it uses that runtime's handle
/// with [`tokio::task::block_in_place`]. Inside a `current_thread` runtime it
/// falls back to its own runtime, which can deadlock if the caller's runtime
/// drives IO this request depends on.
pub struct HttpMapDataProvider {
    client: Client,
    config: HttpMapDataProviderConfig,
    search_url: Url,
    overpass_url: Url,
    runtime: Runtime,
}

impl std::fmt::Debug for HttpMapDataProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMapDataProvider")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish_non_exhaustive()
    }
}

impl HttpMapDataProvider {
    /// Create a provider for the public services with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn new() -> Result<Self, ProviderBuildError> {
        Self::with_config(HttpMapDataProviderConfig::default())
    }

    /// Create a provider with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if either URL is invalid, or if the HTTP client or
    /// Tokio runtime fails to build.
    pub fn with_config(config: HttpMapDataProviderConfig) -> Result<Self, ProviderBuildError> {
        let search_url = search_endpoint(&config.nominatim_url)?;
        let overpass_url =
            Url::parse(&config.overpass_url).map_err(|source| ProviderBuildError::InvalidUrl {
                service: "overpass",
                url: config.overpass_url.clone(),
                source,
            })?;
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(ProviderBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ProviderBuildError::Runtime)?;
        Ok(Self {
            client,
            config,
            search_url,
            overpass_url,
            runtime,
        })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &HttpMapDataProviderConfig {
        &self.config
    }

    fn search_request_url(&self, query: &PlaceQuery) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("q", &query.search_text())
            .append_pair("format", "jsonv2")
            .append_pair("polygon_geojson", "1")
            .append_pair("limit", NOMINATIM_RESULT_LIMIT);
        url
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }

    /// Run `attempt` until it succeeds, fails permanently or exhausts retries.
    async fn with_retries<T, F, Fut>(&self, url: &str, mut attempt: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut tries = 0;
        loop {
            match attempt().await {
                Err(err) if tries < self.config.max_retries && is_retryable(&err) => {
                    tries += 1;
                    let delay = self.config.retry_delay * tries;
                    warn!(
                        "{err}; retrying {url} in {:.1}s ({tries}/{})",
                        delay.as_secs_f64(),
                        self.config.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    async fn search_async(&self, query: &PlaceQuery) -> Result<Vec<Place>, ProviderError> {
        let url = self.search_request_url(query);
        let label = url.to_string();
        debug!("querying Nominatim: {label}");
        self.with_retries(&label, || self.fetch_json(self.client.get(url.clone()), &label))
            .await
    }

    async fn overpass_async(&self, query: &str) -> Result<OverpassResponse, ProviderError> {
        let label = self.overpass_url.to_string();
        debug!("querying Overpass: {query}");
        let decoded: OverpassResponse = self
            .with_retries(&label, || {
                let request = self
                    .client
                    .post(self.overpass_url.clone())
                    .form(&[("data", query)]);
                self.fetch_json(request, &label)
            })
            .await?;
        match decoded.remark {
            Some(remark) if remark.contains("error") => Err(ProviderError::Service {
                service: "overpass".to_owned(),
                message: remark,
            }),
            _ => Ok(decoded),
        }
    }

    /// Send `request` and decode a JSON body of type `T`.
    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> Result<T, ProviderError> {
        let sent = request
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        let response = check_status(sent, url).await?;
        response.json::<T>().await.map_err(|err| ProviderError::Decode {
            url: url.to_owned(),
            message: err.to_string(),
        })
    }

    /// Convert a reqwest error to a `ProviderError`.
    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> ProviderError {
        if error.is_timeout() {
            return ProviderError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }

        if let Some(status) = error.status() {
            return ProviderError::HttpStatus {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }

        ProviderError::Network {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

fn search_endpoint(base: &str) -> Result<Url, ProviderBuildError> {
    let invalid = |source| ProviderBuildError::InvalidUrl {
        service: "nominatim",
        url: base.to_owned(),
        source,
    };
    let base = Url::parse(&format!("{}/", base.trim_end_matches('/'))).map_err(invalid)?;
    base.join("search").map_err(invalid)
}

/// Turn non-success responses into [`ProviderError::HttpStatus`] with a
/// short excerpt of the body.
async fn check_status(response: Response, url: &str) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::HttpStatus {
        url: url.to_owned(),
        status: status.as_u16(),
        message: status_message(status, &body),
    })
}

fn status_message(status: StatusCode, body: &str) -> String {
    const EXCERPT_CHARS: usize = 200;
    let reason = status.canonical_reason().unwrap_or("unexpected status");
    let excerpt: String = body.trim().chars().take(EXCERPT_CHARS).collect();
    if excerpt.is_empty() {
        reason.to_owned()
    } else {
        format!("{reason}: {excerpt}")
    }
}

impl MapDataProvider for HttpMapDataProvider {
    fn resolve_place(&self, query: &PlaceQuery) -> Result<Option<Boundary>, ProviderError> {
        let places = self.block_on(self.search_async(query))?;
        debug!("Nominatim returned {} candidate(s)", places.len());
        Ok(select_boundary(places, &query.search_text()))
    }

    fn query_features(
        &self,
        boundary: &Boundary,
        filter: &TagFilter,
    ) -> Result<Vec<RawFeature>, ProviderError> {
        let Some(bbox) = boundary.bounding_rect() else {
            return Ok(Vec::new());
        };
        let query = build_query(filter, bbox, self.config.timeout.as_secs());
        let response = self.block_on(self.overpass_async(&query))?;
        Ok(response.into_features())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn provider() -> HttpMapDataProvider {
        let config = HttpMapDataProviderConfig::new(
            "https://nominatim.example.org/",
            "https://overpass.example.org/api/interpreter",
        );
        HttpMapDataProvider::with_config(config).expect("provider should build")
    }

    #[rstest]
    fn search_url_encodes_query(provider: HttpMapDataProvider) {
        let url = provider.search_request_url(&PlaceQuery::new("Saint-Étienne", "France"));
        assert_eq!(url.path(), "/search");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(pairs[0], ("q".into(), "Saint-Étienne, France".into()));
        assert!(pairs.contains(&("format".into(), "jsonv2".into())));
        assert!(pairs.contains(&("polygon_geojson".into(), "1".into())));
    }

    #[rstest]
    #[case("https://nominatim.example.org", "https://nominatim.example.org/search")]
    #[case("https://example.org/nominatim/", "https://example.org/nominatim/search")]
    fn search_endpoint_keeps_base_path(#[case] base: &str, #[case] expected: &str) {
        let url = search_endpoint(base).expect("valid base");
        assert_eq!(url.as_str(), expected);
    }

    #[rstest]
    fn invalid_urls_fail_construction() {
        let config = HttpMapDataProviderConfig::new("not a url", DEFAULT_OVERPASS_URL);
        let err = HttpMapDataProvider::with_config(config).expect_err("invalid URL");
        assert!(matches!(
            err,
            ProviderBuildError::InvalidUrl { service: "nominatim", .. }
        ));
    }

    #[rstest]
    #[case(ProviderError::Timeout { url: "u".into(), timeout_secs: 1 }, true)]
    #[case(ProviderError::HttpStatus { url: "u".into(), status: 429, message: String::new() }, true)]
    #[case(ProviderError::HttpStatus { url: "u".into(), status: 504, message: String::new() }, true)]
    #[case(ProviderError::HttpStatus { url: "u".into(), status: 400, message: String::new() }, false)]
    #[case(ProviderError::Network { url: "u".into(), message: String::new() }, false)]
    #[case(ProviderError::Service { service: "overpass".into(), message: String::new() }, false)]
    fn classifies_retryable_errors(#[case] error: ProviderError, #[case] expected: bool) {
        assert_eq!(is_retryable(&error), expected);
    }

    #[rstest]
    fn status_message_truncates_body() {
        let body = "x".repeat(500);
        let message = status_message(StatusCode::TOO_MANY_REQUESTS, &body);
        assert!(message.starts_with("Too Many Requests: "));
        assert_eq!(message.len(), "Too Many Requests: ".len() + 200);
        assert_eq!(status_message(StatusCode::BAD_GATEWAY, "  "), "Bad Gateway");
    }

    #[rstest]
    fn config_builder_pattern() {
        let config = HttpMapDataProviderConfig::default()
            .with_timeout(Duration::from_secs(60))
            .with_user_agent("test-agent/1.0")
            .with_retries(0, Duration::ZERO);

        assert_eq!(config.nominatim_url, DEFAULT_NOMINATIM_URL);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.user_agent, "test-agent/1.0");
        assert_eq!(config.max_retries, 0);
    }

    #[rstest]
    fn retries_stop_after_budget(provider: HttpMapDataProvider) {
        let provider = HttpMapDataProvider {
            config: provider.config.clone().with_retries(2, Duration::ZERO),
            ..provider
        };
        let calls = std::cell::Cell::new(0);
        let result: Result<(), ProviderError> = provider.block_on(provider.with_retries("u", || {
            calls.set(calls.get() + 1);
            async {
                Err(ProviderError::HttpStatus {
                    url: "u".into(),
                    status: 503,
                    message: String::new(),
                })
            }
        }));
        assert!(result.is_err());
        assert_eq!(calls.get(), 3);
    }

    #[rstest]
    fn permanent_errors_are_not_retried(provider: HttpMapDataProvider) {
        let calls = std::cell::Cell::new(0);
        let result: Result<(), ProviderError> = provider.block_on(provider.with_retries("u", || {
            calls.set(calls.get() + 1);
            async {
                Err(ProviderError::Network {
                    url: "u".into(),
                    message: "refused".into(),
                })
            }
        }));
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
