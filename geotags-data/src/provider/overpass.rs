//! Overpass API query building and response decoding.

use geo::{Coord, LineString, Rect};
use geotags_core::{ElementId, ElementKind, RawFeature, RawGeometry, TagFilter, Tags};
use log::debug;
use serde::Deserialize;

/// Build an Overpass QL query for `filter` over `bbox`.
///
/// Nodes, ways and relations are requested together with their full
/// geometry (`out geom`), so no second round trip is needed to resolve node
/// locations.
pub(crate) fn build_query(filter: &TagFilter, bbox: Rect, timeout_secs: u64) -> String {
    let selector = match filter.value() {
        Some(value) => format!("[\"{}\"=\"{}\"]", escape(filter.key()), escape(value)),
        None => format!("[\"{}\"]", escape(filter.key())),
    };
    let (min, max) = (bbox.min(), bbox.max());
    format!(
        "[out:json][timeout:{timeout_secs}];nwr{selector}({},{},{},{});out geom;",
        min.y, min.x, max.y, max.x
    )
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Body of an `[out:json]` Overpass response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OverpassResponse {
    #[serde(default)]
    pub(crate) elements: Vec<Element>,
    /// Runtime errors such as timeouts are reported here with HTTP 200.
    #[serde(default)]
    pub(crate) remark: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct LatLon {
    lat: f64,
    lon: f64,
}

impl From<LatLon> for Coord {
    fn from(point: LatLon) -> Self {
        Self {
            x: point.lon,
            y: point.lat,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Member {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    role: String,
    /// `out geom` emits `null` for member nodes it could not resolve.
    #[serde(default)]
    geometry: Vec<Option<LatLon>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub(crate) enum Element {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
        #[serde(default)]
        tags: Tags,
    },
    Way {
        id: i64,
        #[serde(default)]
        geometry: Vec<Option<LatLon>>,
        #[serde(default)]
        tags: Tags,
    },
    Relation {
        id: i64,
        #[serde(default)]
        members: Vec<Member>,
        #[serde(default)]
        tags: Tags,
    },
}

fn line(points: &[Option<LatLon>]) -> LineString {
    points.iter().flatten().map(|&p| Coord::from(p)).collect()
}

fn is_area_relation(tags: &Tags) -> bool {
    matches!(
        tags.get("type").map(String::as_str),
        Some("multipolygon" | "boundary")
    )
}

impl Element {
    /// Convert into a provider feature. Relations tagged as multipolygons or
    /// boundaries become areas; other relations become plain line sets.
    pub(crate) fn into_raw_feature(self) -> RawFeature {
        match self {
            Self::Node { id, lat, lon, tags } => RawFeature {
                id: ElementId::new(ElementKind::Node, id),
                tags,
                geometry: RawGeometry::Point(Coord { x: lon, y: lat }),
            },
            Self::Way { id, geometry, tags } => RawFeature {
                id: ElementId::new(ElementKind::Way, id),
                tags,
                geometry: RawGeometry::Way(line(&geometry)),
            },
            Self::Relation { id, members, tags } => {
                let ways = members.iter().filter(|m| m.kind == "way");
                let geometry = if is_area_relation(&tags) {
                    let (inner, outer): (Vec<_>, Vec<_>) =
                        ways.partition(|member| member.role == "inner");
                    RawGeometry::Area {
                        outer: outer.iter().map(|m| line(&m.geometry)).collect(),
                        inner: inner.iter().map(|m| line(&m.geometry)).collect(),
                    }
                } else {
                    RawGeometry::Lines(ways.map(|m| line(&m.geometry)).collect())
                };
                RawFeature {
                    id: ElementId::new(ElementKind::Relation, id),
                    tags,
                    geometry,
                }
            }
        }
    }
}

impl OverpassResponse {
    /// Provider features in response order.
    pub(crate) fn into_features(self) -> Vec<RawFeature> {
        let features: Vec<_> = self
            .elements
            .into_iter()
            .map(Element::into_raw_feature)
            .collect();
        debug!("decoded {} Overpass element(s)", features.len());
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn bbox() -> Rect {
        Rect::new(Coord { x: 3.6, y: 51.0 }, Coord { x: 3.8, y: 51.1 })
    }

    #[rstest]
    fn builds_exact_query() {
        let query = build_query(&TagFilter::exact("leisure", "park"), bbox(), 180);
        assert_eq!(
            query,
            "[out:json][timeout:180];nwr[\"leisure\"=\"park\"](51,3.6,51.1,3.8);out geom;"
        );
    }

    #[rstest]
    fn builds_wildcard_query_with_escaping() {
        let query = build_query(&TagFilter::any_value("name:\"nl\""), bbox(), 25);
        assert!(query.contains("nwr[\"name:\\\"nl\\\"\"]("), "{query}");
    }

    #[rstest]
    fn decodes_every_element_type() {
        let json = r#"{
            "elements": [
                {"type": "node", "id": 1, "lat": 51.05, "lon": 3.7, "tags": {"amenity": "bench"}},
                {"type": "way", "id": 2, "geometry": [{"lat": 51.0, "lon": 3.6}, {"lat": 51.0, "lon": 3.7}, null], "tags": {"highway": "path"}},
                {"type": "relation", "id": 3, "tags": {"type": "multipolygon", "leisure": "park"}, "members": [
                    {"type": "way", "ref": 10, "role": "outer", "geometry": [{"lat": 0.0, "lon": 0.0}, {"lat": 0.0, "lon": 1.0}]},
                    {"type": "way", "ref": 11, "role": "inner", "geometry": [{"lat": 0.2, "lon": 0.2}, {"lat": 0.2, "lon": 0.4}]},
                    {"type": "node", "ref": 12, "role": "label", "lat": 0.5, "lon": 0.5}
                ]},
                {"type": "relation", "id": 4, "tags": {"type": "route", "route": "bus"}, "members": [
                    {"type": "way", "ref": 20, "role": "", "geometry": [{"lat": 1.0, "lon": 1.0}, {"lat": 1.0, "lon": 2.0}]}
                ]}
            ]
        }"#;
        let response: OverpassResponse = serde_json::from_str(json).expect("valid response");
        assert!(response.remark.is_none());
        let features = response.into_features();
        assert_eq!(features.len(), 4);

        assert_eq!(
            features[0].geometry,
            RawGeometry::Point(Coord { x: 3.7, y: 51.05 })
        );
        match &features[1].geometry {
            RawGeometry::Way(line) => assert_eq!(line.0.len(), 2),
            other => panic!("expected way, got {other:?}"),
        }
        match &features[2].geometry {
            RawGeometry::Area { outer, inner } => {
                assert_eq!(outer.len(), 1);
                assert_eq!(inner.len(), 1);
            }
            other => panic!("expected area, got {other:?}"),
        }
        assert!(matches!(&features[3].geometry, RawGeometry::Lines(lines) if lines.len() == 1));
        assert_eq!(features[3].id.to_string(), "relation/4");
    }

    #[rstest]
    fn keeps_remarks() {
        let json = r#"{"elements": [], "remark": "runtime error: Query timed out in \"query\" at line 1 after 181 seconds."}"#;
        let response: OverpassResponse = serde_json::from_str(json).expect("valid response");
        assert!(response.remark.is_some_and(|r| r.contains("timed out")));
    }
}
