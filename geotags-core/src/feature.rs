//! Feature representations at each pipeline stage.
//!
//! Provider output arrives as [`RawFeature`] values whose geometry is not
//! trusted. The extractor wraps them into [`ExtractedFeature`] values and the
//! normalizer turns those into [`Feature`] values with a
//! [`FeatureGeometry`] matching the category's class.

use std::fmt;
use std::str::FromStr;

use geo::{Coord, LineString, MultiLineString, MultiPolygon, Point};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{GeometryClass, TagFilter, Tags};

/// OSM element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// A single node.
    Node,
    /// An ordered list of nodes.
    Way,
    /// A group of members, typically a multipolygon.
    Relation,
}

impl ElementKind {
    /// Lowercase OSM name of the element type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an OSM element, used for de-duplication.
///
/// # Examples
/// ```
/// use geotags_core::{ElementId, ElementKind};
///
/// let id: ElementId = "way/42".parse().expect("valid id");
/// assert_eq!(id, ElementId::new(ElementKind::Way, 42));
/// assert_eq!(id.to_string(), "way/42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    /// Element type.
    pub kind: ElementKind,
    /// OSM identifier, unique within `kind`.
    pub id: i64,
}

impl ElementId {
    /// Construct an element id.
    #[must_use]
    pub const fn new(kind: ElementKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// Error returned when an element id string is not `kind/number`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid OSM element id {0:?} (expected node/N, way/N or relation/N)")]
pub struct ParseElementIdError(pub String);

impl FromStr for ElementId {
    type Err = ParseElementIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseElementIdError(s.to_owned());
        let (kind, id) = s.split_once('/').ok_or_else(err)?;
        let kind = match kind {
            "node" => ElementKind::Node,
            "way" => ElementKind::Way,
            "relation" => ElementKind::Relation,
            _ => return Err(err()),
        };
        let id = id.parse().map_err(|_| err())?;
        Ok(Self::new(kind, id))
    }
}

/// Geometry exactly as reported by the provider.
///
/// Rings may be split across several segments or left open; the normalizer
/// decides what can be salvaged.
#[derive(Debug, Clone, PartialEq)]
pub enum RawGeometry {
    /// A node location.
    Point(Coord),
    /// A single way, closed when its first and last coordinates coincide.
    Way(LineString),
    /// A multipolygon relation's member ways, split by role.
    Area {
        /// Segments with the `outer` role.
        outer: Vec<LineString>,
        /// Segments with the `inner` role.
        inner: Vec<LineString>,
    },
    /// Member ways of a non-area relation such as a route.
    Lines(Vec<LineString>),
}

impl RawGeometry {
    /// Class the geometry has before any conversion.
    #[must_use]
    pub fn native_class(&self) -> GeometryClass {
        match self {
            Self::Point(_) => GeometryClass::Point,
            Self::Way(line) if line.is_closed() && line.0.len() >= 4 => GeometryClass::Polygon,
            Self::Area { .. } => GeometryClass::Polygon,
            Self::Way(_) | Self::Lines(_) => GeometryClass::Line,
        }
    }

    /// Every coordinate of the geometry, in reporting order.
    pub fn coords(&self) -> Box<dyn Iterator<Item = Coord> + '_> {
        match self {
            Self::Point(coord) => Box::new(std::iter::once(*coord)),
            Self::Way(line) => Box::new(line.coords().copied()),
            Self::Area { outer, inner } => {
                Box::new(outer.iter().chain(inner).flat_map(|l| l.coords().copied()))
            }
            Self::Lines(lines) => Box::new(lines.iter().flat_map(|l| l.coords().copied())),
        }
    }
}

/// A feature returned by a [`crate::MapDataProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeature {
    /// Element identity.
    pub id: ElementId,
    /// OSM attributes.
    pub tags: Tags,
    /// Untrusted geometry.
    pub geometry: RawGeometry,
}

/// A raw feature annotated with the category and filter that selected it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFeature {
    /// The provider feature.
    pub raw: RawFeature,
    /// Name of the owning category.
    pub category: String,
    /// Geometry class declared by the owning category.
    pub class: GeometryClass,
    /// Filter that matched the feature.
    pub filter: TagFilter,
    /// Concrete `key=value` tag the feature carries for `filter`.
    pub osm_tag: String,
}

/// Normalized geometry. The variant is the geometry class.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureGeometry {
    /// Point-class geometry.
    Point(Point),
    /// Line-class geometry.
    Line(MultiLineString),
    /// Polygon-class geometry.
    Polygon(MultiPolygon),
}

impl FeatureGeometry {
    /// Geometry class of the variant.
    #[must_use]
    pub const fn class(&self) -> GeometryClass {
        match self {
            Self::Point(_) => GeometryClass::Point,
            Self::Line(_) => GeometryClass::Line,
            Self::Polygon(_) => GeometryClass::Polygon,
        }
    }

    /// GeoJSON-style type name of the stored geometry.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::Line(_) => "MultiLineString",
            Self::Polygon(_) => "MultiPolygon",
        }
    }

    /// Convert into a plain `geo` geometry.
    #[must_use]
    pub fn to_geometry(&self) -> geo::Geometry {
        match self {
            Self::Point(point) => geo::Geometry::Point(*point),
            Self::Line(lines) => geo::Geometry::MultiLineString(lines.clone()),
            Self::Polygon(polygons) => geo::Geometry::MultiPolygon(polygons.clone()),
        }
    }
}

/// A normalized feature ready for export.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Element identity.
    pub id: ElementId,
    /// Owning category name.
    pub category: String,
    /// Filter that selected the feature.
    pub filter: TagFilter,
    /// Concrete `key=value` tag.
    pub osm_tag: String,
    /// Value of the `name` tag, when present.
    pub name: Option<String>,
    /// Geometry matching the category's class.
    pub geometry: FeatureGeometry,
    /// OSM attributes.
    pub tags: Tags,
    /// Original class when the normalizer converted the geometry.
    pub converted_from: Option<GeometryClass>,
}

impl Feature {
    /// Geometry class of the feature.
    #[must_use]
    pub const fn class(&self) -> GeometryClass {
        self.geometry.class()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, line_string};
    use rstest::rstest;

    #[rstest]
    #[case("node/1", ElementKind::Node, 1)]
    #[case("way/-7", ElementKind::Way, -7)]
    #[case("relation/123456789", ElementKind::Relation, 123_456_789)]
    fn parses_element_ids(#[case] raw: &str, #[case] kind: ElementKind, #[case] id: i64) {
        let parsed: ElementId = raw.parse().expect("valid element id");
        assert_eq!(parsed, ElementId::new(kind, id));
        assert_eq!(parsed.to_string(), raw);
    }

    #[rstest]
    #[case("way")]
    #[case("area/1")]
    #[case("node/abc")]
    fn rejects_malformed_element_ids(#[case] raw: &str) {
        assert!(raw.parse::<ElementId>().is_err());
    }

    #[rstest]
    fn closed_way_is_natively_polygonal() {
        let ring = line_string![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ];
        assert_eq!(
            RawGeometry::Way(ring).native_class(),
            GeometryClass::Polygon
        );
    }

    #[rstest]
    fn open_way_is_natively_linear() {
        let path = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)];
        assert_eq!(RawGeometry::Way(path).native_class(), GeometryClass::Line);
        assert_eq!(
            RawGeometry::Point(coord! { x: 0.0, y: 0.0 }).native_class(),
            GeometryClass::Point
        );
    }

    #[rstest]
    fn area_coords_cover_inner_and_outer_segments() {
        let geometry = RawGeometry::Area {
            outer: vec![line_string![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0)]],
            inner: vec![line_string![(x: 1.0, y: 1.0), (x: 2.0, y: 1.0)]],
        };
        assert_eq!(geometry.coords().count(), 4);
    }
}
