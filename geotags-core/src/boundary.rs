//! Administrative boundaries and their resolution.

use geo::{BoundingRect, Intersects, LineString, MultiLineString, MultiPolygon, Point, Polygon, Rect};
use log::{debug, info};
use thiserror::Error;

use crate::normalize::rings::build_polygons;
use crate::{ElementId, GeometryClass, MapDataProvider, PlaceQuery, ProviderError, RawGeometry};

/// The polygonal area a run is clipped to.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    /// Display name reported by the geocoder.
    pub name: String,
    /// Boundary polygons in WGS84 (`x = longitude`, `y = latitude`).
    pub geometry: MultiPolygon,
    /// OSM element the boundary was built from, when known.
    pub element: Option<ElementId>,
}

impl Boundary {
    /// Construct a boundary.
    #[must_use]
    pub fn new(name: impl Into<String>, geometry: MultiPolygon, element: Option<ElementId>) -> Self {
        Self {
            name: name.into(),
            geometry,
            element,
        }
    }

    /// Axis-aligned extent of the boundary, `None` when it has no coordinates.
    #[must_use]
    pub fn bounding_rect(&self) -> Option<Rect> {
        self.geometry.bounding_rect()
    }

    /// Whether any part of `raw` lies within or on the boundary.
    ///
    /// Closed ways and multipolygon relations are tested as filled areas, so
    /// an area enclosing the whole boundary is kept. Segments that close no
    /// ring are still tested as lines.
    #[must_use]
    pub fn intersects_raw(&self, raw: &RawGeometry) -> bool {
        match raw {
            RawGeometry::Point(coord) => self.geometry.intersects(&Point::from(*coord)),
            RawGeometry::Way(line) if raw.native_class() == GeometryClass::Polygon => self
                .geometry
                .intersects(&Polygon::new(line.clone(), Vec::new())),
            RawGeometry::Way(line) => self.geometry.intersects(line),
            RawGeometry::Area { outer, inner } => {
                let segments: Vec<LineString> = outer.iter().chain(inner).cloned().collect();
                if self.geometry.intersects(&MultiLineString::new(segments)) {
                    return true;
                }
                let polygons = build_polygons(outer, inner);
                !polygons.0.is_empty() && self.geometry.intersects(&polygons)
            }
            RawGeometry::Lines(lines) => {
                self.geometry.intersects(&MultiLineString::new(lines.clone()))
            }
        }
    }
}

/// Errors from [`resolve_boundary`]. Both variants are fatal for a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoundaryError {
    /// No polygonal administrative area matched the query.
    #[error("no administrative boundary found for {query:?}")]
    NotFound {
        /// Search text sent to the provider.
        query: String,
    },
    /// The provider could not be reached or failed.
    #[error("boundary lookup failed: {0}")]
    ProviderUnavailable(#[source] ProviderError),
}

/// Resolve the administrative boundary of `city` in `country`.
///
/// No retry happens here; retries belong to the provider's client.
///
/// # Examples
/// ```
/// use geotags_core::{
///     resolve_boundary, Boundary, BoundaryError, MapDataProvider, PlaceQuery, ProviderError,
///     RawFeature, TagFilter,
/// };
///
/// struct Unmapped;
///
/// impl MapDataProvider for Unmapped {
///     fn resolve_place(&self, _: &PlaceQuery) -> Result<Option<Boundary>, ProviderError> {
///         Ok(None)
///     }
///
///     fn query_features(&self, _: &Boundary, _: &TagFilter) -> Result<Vec<RawFeature>, ProviderError> {
///         Ok(Vec::new())
///     }
/// }
///
/// let err = resolve_boundary(&Unmapped, "Atlantis", "Nowhere").expect_err("no boundary");
/// assert!(matches!(err, BoundaryError::NotFound { .. }));
/// ```
pub fn resolve_boundary<P>(provider: &P, city: &str, country: &str) -> Result<Boundary, BoundaryError>
where
    P: MapDataProvider + ?Sized,
{
    let query = PlaceQuery::new(city, country);
    debug!("resolving boundary for {:?}", query.search_text());
    let boundary = provider
        .resolve_place(&query)
        .map_err(BoundaryError::ProviderUnavailable)?
        .filter(|b| !b.geometry.0.is_empty())
        .ok_or_else(|| BoundaryError::NotFound {
            query: query.search_text(),
        })?;
    info!(
        "resolved boundary {:?} with {} polygon(s)",
        boundary.name,
        boundary.geometry.0.len()
    );
    Ok(boundary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubProvider, square_boundary};
    use geo::coord;
    use geo::line_string;
    use rstest::rstest;

    #[rstest]
    fn returns_boundary_from_provider() {
        let provider = StubProvider::with_boundary(square_boundary("Ghent", 0.0, 0.0, 1.0));
        let boundary = resolve_boundary(&provider, "Ghent", "Belgium").expect("boundary");
        assert_eq!(boundary.name, "Ghent");
    }

    #[rstest]
    fn missing_place_is_not_found() {
        let provider = StubProvider::default();
        let err = resolve_boundary(&provider, "Ghent", "Belgium").expect_err("no boundary");
        assert_eq!(
            err,
            BoundaryError::NotFound {
                query: "Ghent, Belgium".into()
            }
        );
    }

    #[rstest]
    fn empty_geometry_is_not_found() {
        let provider = StubProvider::with_boundary(Boundary::new(
            "Ghent",
            MultiPolygon::new(Vec::new()),
            None,
        ));
        let err = resolve_boundary(&provider, "Ghent", "Belgium").expect_err("empty boundary");
        assert!(matches!(err, BoundaryError::NotFound { .. }));
    }

    #[rstest]
    fn provider_failure_is_unavailable() {
        let provider = StubProvider::default().with_place_error(ProviderError::Network {
            url: "https://nominatim.example/search".into(),
            message: "connection refused".into(),
        });
        let err = resolve_boundary(&provider, "Ghent", "Belgium").expect_err("provider down");
        assert!(matches!(err, BoundaryError::ProviderUnavailable(_)));
    }

    #[rstest]
    #[case(RawGeometry::Point(coord! { x: 0.5, y: 0.5 }), true)]
    #[case(RawGeometry::Point(coord! { x: 2.5, y: 0.5 }), false)]
    #[case(
        RawGeometry::Way(geo::line_string![(x: -1.0, y: 0.5), (x: 0.5, y: 0.5)]),
        true
    )]
    #[case(
        RawGeometry::Lines(vec![geo::line_string![(x: 3.0, y: 3.0), (x: 4.0, y: 4.0)]]),
        false
    )]
    #[case(
        RawGeometry::Way(geo::line_string![
            (x: -1.0, y: -1.0), (x: 2.0, y: -1.0), (x: 2.0, y: 2.0), (x: -1.0, y: 2.0), (x: -1.0, y: -1.0)
        ]),
        true
    )]
    #[case(
        RawGeometry::Area {
            outer: vec![
                geo::line_string![(x: -1.0, y: -1.0), (x: 2.0, y: -1.0), (x: 2.0, y: 2.0)],
                geo::line_string![(x: 2.0, y: 2.0), (x: -1.0, y: 2.0), (x: -1.0, y: -1.0)],
            ],
            inner: Vec::new(),
        },
        true
    )]
    #[case(
        RawGeometry::Area {
            outer: vec![geo::line_string![
                (x: -5.0, y: -5.0), (x: 6.0, y: -5.0), (x: 6.0, y: 6.0), (x: -5.0, y: 6.0), (x: -5.0, y: -5.0)
            ]],
            inner: vec![geo::line_string![
                (x: -2.0, y: -2.0), (x: 3.0, y: -2.0), (x: 3.0, y: 3.0), (x: -2.0, y: 3.0), (x: -2.0, y: -2.0)
            ]],
        },
        false
    )]
    fn clips_raw_geometry(#[case] raw: RawGeometry, #[case] expected: bool) {
        let boundary = square_boundary("Unit", 0.0, 0.0, 1.0);
        assert_eq!(boundary.intersects_raw(&raw), expected);
    }
}
