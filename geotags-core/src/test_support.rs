//! Deterministic test doubles and geometry builders.
//!
//! [`StubProvider`] answers from pre-configured responses without network
//! access. The builders keep fixtures in unit, behaviour and CLI tests short.

use std::cell::RefCell;
use std::collections::HashMap;

use geo::{Coord, LineString, MultiPolygon, Polygon};

use crate::{
    Boundary, ElementId, ElementKind, ExtractedFeature, GeometryClass, MapDataProvider,
    PlaceQuery, ProviderError, RawFeature, RawGeometry, TagFilter, Tags,
};

/// Stub [`MapDataProvider`] returning canned boundaries and features.
///
/// Filters without a configured response yield no features.
///
/// # Example
/// ```
/// use geotags_core::test_support::{StubProvider, node, square_boundary};
/// use geotags_core::{MapDataProvider, TagFilter};
///
/// let park = TagFilter::exact("leisure", "park");
/// let boundary = square_boundary("Unit", 0.0, 0.0, 1.0);
/// let provider = StubProvider::with_boundary(boundary.clone())
///     .with_features(&park, vec![node(1, 0.5, 0.5, &[("leisure", "park")])]);
///
/// let found = provider.query_features(&boundary, &park).expect("stubbed response");
/// assert_eq!(found.len(), 1);
/// assert_eq!(provider.queries(), vec![park]);
/// ```
#[derive(Debug, Default)]
pub struct StubProvider {
    place: Option<Result<Boundary, ProviderError>>,
    responses: HashMap<TagFilter, Result<Vec<RawFeature>, ProviderError>>,
    queries: RefCell<Vec<TagFilter>>,
}

impl StubProvider {
    /// Create a provider resolving every place to `boundary`.
    #[must_use]
    pub fn with_boundary(boundary: Boundary) -> Self {
        Self {
            place: Some(Ok(boundary)),
            ..Self::default()
        }
    }

    /// Fail every place lookup with `error`.
    #[must_use]
    pub fn with_place_error(mut self, error: ProviderError) -> Self {
        self.place = Some(Err(error));
        self
    }

    /// Answer queries for `filter` with `features`.
    #[must_use]
    pub fn with_features(mut self, filter: &TagFilter, features: Vec<RawFeature>) -> Self {
        self.responses.insert(filter.clone(), Ok(features));
        self
    }

    /// Fail queries for `filter` with `error`.
    #[must_use]
    pub fn with_filter_error(mut self, filter: &TagFilter, error: ProviderError) -> Self {
        self.responses.insert(filter.clone(), Err(error));
        self
    }

    /// Filters queried so far, in call order.
    #[must_use]
    pub fn queries(&self) -> Vec<TagFilter> {
        self.queries.borrow().clone()
    }
}

impl MapDataProvider for StubProvider {
    fn resolve_place(&self, _query: &PlaceQuery) -> Result<Option<Boundary>, ProviderError> {
        match &self.place {
            None => Ok(None),
            Some(Ok(boundary)) => Ok(Some(boundary.clone())),
            Some(Err(error)) => Err(error.clone()),
        }
    }

    fn query_features(
        &self,
        _boundary: &Boundary,
        filter: &TagFilter,
    ) -> Result<Vec<RawFeature>, ProviderError> {
        self.queries.borrow_mut().push(filter.clone());
        self.responses
            .get(filter)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect()
}

fn line(coords: &[(f64, f64)]) -> LineString {
    LineString::new(coords.iter().map(|&(x, y)| Coord { x, y }).collect())
}

/// A square boundary with its south-west corner at `(x, y)`.
#[must_use]
pub fn square_boundary(name: &str, x: f64, y: f64, size: f64) -> Boundary {
    let ring = line(&[
        (x, y),
        (x + size, y),
        (x + size, y + size),
        (x, y + size),
        (x, y),
    ]);
    Boundary::new(
        name,
        MultiPolygon::new(vec![Polygon::new(ring, Vec::new())]),
        Some(ElementId::new(ElementKind::Relation, 1)),
    )
}

/// A node feature.
#[must_use]
pub fn node(id: i64, x: f64, y: f64, pairs: &[(&str, &str)]) -> RawFeature {
    RawFeature {
        id: ElementId::new(ElementKind::Node, id),
        tags: tags(pairs),
        geometry: RawGeometry::Point(Coord { x, y }),
    }
}

/// A way feature; closed when the first and last coordinates match.
#[must_use]
pub fn way(id: i64, coords: &[(f64, f64)], pairs: &[(&str, &str)]) -> RawFeature {
    RawFeature {
        id: ElementId::new(ElementKind::Way, id),
        tags: tags(pairs),
        geometry: RawGeometry::Way(line(coords)),
    }
}

/// A multipolygon relation built from outer and inner segments.
#[must_use]
pub fn area(
    id: i64,
    outer: &[Vec<(f64, f64)>],
    inner: &[Vec<(f64, f64)>],
    pairs: &[(&str, &str)],
) -> RawFeature {
    RawFeature {
        id: ElementId::new(ElementKind::Relation, id),
        tags: tags(pairs),
        geometry: RawGeometry::Area {
            outer: outer.iter().map(|c| line(c)).collect(),
            inner: inner.iter().map(|c| line(c)).collect(),
        },
    }
}

/// Wrap `raw` as if a `test` category of `class` had selected it.
///
/// The filter is the feature's first non-`name` tag.
#[must_use]
pub fn extracted(raw: RawFeature, class: GeometryClass) -> ExtractedFeature {
    let (key, value) = raw
        .tags
        .iter()
        .find(|(key, _)| key.as_str() != "name")
        .map_or(("unknown", "unknown"), |(k, v)| (k.as_str(), v.as_str()));
    let filter = TagFilter::exact(key, value);
    let osm_tag = filter.to_string();
    ExtractedFeature {
        raw,
        category: "test".to_owned(),
        class,
        filter,
        osm_tag,
    }
}
