//! Geometry normalization.
//!
//! Coerces each extracted feature into the geometry class its category
//! declares:
//!
//! | category | point          | line                     | polygon                  |
//! |----------|----------------|--------------------------|--------------------------|
//! | point    | kept           | centroid                 | centroid                 |
//! | line     | skipped        | kept (closed ways too)   | outer rings as lines     |
//! | polygon  | skipped        | rings if segments close  | kept if a ring closes    |
//!
//! Every skip is logged as a warning and returned in [`Normalized::skipped`].

pub(crate) mod rings;

use geo::{Centroid, LineString, MultiLineString, MultiPolygon, Point};
use log::{info, warn};

use crate::{
    ExtractedFeature, Feature, FeatureGeometry, GeometryClass, RawGeometry, SkipReason,
    SkippedFeature,
};

/// Normalizer output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    /// Features whose class matches their category.
    pub features: Vec<Feature>,
    /// Features that could not be coerced.
    pub skipped: Vec<SkippedFeature>,
}

type Coerced = (FeatureGeometry, Option<GeometryClass>);

/// Coerce every feature into its category's class, preserving input order.
///
/// Deterministic for identical input.
pub fn normalize(features: Vec<ExtractedFeature>) -> Normalized {
    let mut normalized = Normalized::default();
    for extracted in features {
        match coerce(&extracted.raw.geometry, extracted.class) {
            Ok((geometry, converted_from)) => {
                let mut tags = extracted.raw.tags;
                let name = tags.get("name").filter(|name| !name.is_empty()).cloned();
                tags.retain(|_, value| !value.is_empty());
                normalized.features.push(Feature {
                    id: extracted.raw.id,
                    category: extracted.category,
                    filter: extracted.filter,
                    osm_tag: extracted.osm_tag,
                    name,
                    geometry,
                    tags,
                    converted_from,
                });
            }
            Err(reason) => {
                let skipped = SkippedFeature {
                    id: extracted.raw.id,
                    category: extracted.category,
                    osm_tag: extracted.osm_tag,
                    reason,
                };
                warn!("{skipped}");
                normalized.skipped.push(skipped);
            }
        }
    }
    info!(
        "normalized {} feature(s), skipped {}",
        normalized.features.len(),
        normalized.skipped.len()
    );
    normalized
}

fn coerce(raw: &RawGeometry, class: GeometryClass) -> Result<Coerced, SkipReason> {
    if raw.coords().next().is_none() {
        return Err(SkipReason::EmptyGeometry);
    }
    match class {
        GeometryClass::Point => to_point(raw),
        GeometryClass::Line => to_line(raw),
        GeometryClass::Polygon => to_polygon(raw),
    }
}

fn to_point(raw: &RawGeometry) -> Result<Coerced, SkipReason> {
    if let RawGeometry::Point(coord) = raw {
        return Ok((FeatureGeometry::Point(Point::from(*coord)), None));
    }
    let native = raw.native_class();
    let polygon_centroid = || polygons_of(raw).and_then(|polygons| polygons.centroid());
    let centroid = match native {
        GeometryClass::Polygon => polygon_centroid().or_else(|| segments_of(raw).centroid()),
        _ => segments_of(raw).centroid(),
    };
    centroid
        .map(|point| (FeatureGeometry::Point(point), Some(native)))
        .ok_or(SkipReason::EmptyGeometry)
}

fn to_line(raw: &RawGeometry) -> Result<Coerced, SkipReason> {
    let (lines, converted_from) = match raw {
        RawGeometry::Point(_) => return Err(SkipReason::PointInLineCategory),
        RawGeometry::Way(_) | RawGeometry::Lines(_) => (segments_of(raw), None),
        RawGeometry::Area { outer, .. } => {
            let assembled = rings::assemble(outer);
            let mut lines = assembled.rings;
            lines.extend(assembled.open);
            (MultiLineString::new(lines), Some(GeometryClass::Polygon))
        }
    };
    if lines.0.is_empty() {
        return Err(SkipReason::EmptyGeometry);
    }
    Ok((FeatureGeometry::Line(lines), converted_from))
}

fn to_polygon(raw: &RawGeometry) -> Result<Coerced, SkipReason> {
    if matches!(raw, RawGeometry::Point(_)) {
        return Err(SkipReason::PointInPolygonCategory);
    }
    let polygons = polygons_of(raw).ok_or(SkipReason::DegenerateRing)?;
    let converted_from = matches!(raw, RawGeometry::Lines(_)).then_some(GeometryClass::Line);
    Ok((FeatureGeometry::Polygon(polygons), converted_from))
}

/// Polygons the geometry can form, `None` when no ring closes.
fn polygons_of(raw: &RawGeometry) -> Option<MultiPolygon> {
    let polygons = match raw {
        RawGeometry::Point(_) => return None,
        RawGeometry::Way(line) => rings::build_polygons(std::slice::from_ref(line), &[]),
        RawGeometry::Area { outer, inner } => rings::build_polygons(outer, inner),
        RawGeometry::Lines(lines) => rings::build_polygons(lines, &[]),
    };
    (!polygons.0.is_empty()).then_some(polygons)
}

/// The geometry's segments with at least two coordinates.
fn segments_of(raw: &RawGeometry) -> MultiLineString {
    let usable = |line: &&LineString| line.0.len() >= 2;
    let lines: Vec<LineString> = match raw {
        RawGeometry::Point(_) => Vec::new(),
        RawGeometry::Way(line) => std::iter::once(line).filter(usable).cloned().collect(),
        RawGeometry::Area { outer, .. } => outer.iter().filter(usable).cloned().collect(),
        RawGeometry::Lines(lines) => lines.iter().filter(usable).cloned().collect(),
    };
    MultiLineString::new(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{area, extracted, node, way};
    use rstest::rstest;

    fn square(x: f64, y: f64, size: f64) -> Vec<(f64, f64)> {
        vec![
            (x, y),
            (x + size, y),
            (x + size, y + size),
            (x, y + size),
            (x, y),
        ]
    }

    fn open_path() -> Vec<(f64, f64)> {
        vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]
    }

    fn normalize_one(feature: ExtractedFeature) -> Normalized {
        normalize(vec![feature])
    }

    #[rstest]
    fn point_category_keeps_nodes() {
        let out = normalize_one(extracted(
            node(1, 2.0, 3.0, &[("amenity", "bench")]),
            GeometryClass::Point,
        ));
        assert_eq!(
            out.features[0].geometry,
            FeatureGeometry::Point(Point::new(2.0, 3.0))
        );
        assert_eq!(out.features[0].converted_from, None);
    }

    #[rstest]
    fn point_category_collapses_polygons_to_centroids() {
        let out = normalize_one(extracted(
            way(1, &square(0.0, 0.0, 2.0), &[("amenity", "school")]),
            GeometryClass::Point,
        ));
        let feature = &out.features[0];
        assert_eq!(feature.geometry, FeatureGeometry::Point(Point::new(1.0, 1.0)));
        assert_eq!(feature.converted_from, Some(GeometryClass::Polygon));
    }

    #[rstest]
    fn point_category_collapses_lines_to_centroids() {
        let out = normalize_one(extracted(
            way(1, &[(0.0, 0.0), (4.0, 0.0)], &[("highway", "path")]),
            GeometryClass::Point,
        ));
        assert_eq!(
            out.features[0].geometry,
            FeatureGeometry::Point(Point::new(2.0, 0.0))
        );
        assert_eq!(out.features[0].converted_from, Some(GeometryClass::Line));
    }

    #[rstest]
    fn line_category_keeps_closed_ways_as_loops() {
        let out = normalize_one(extracted(
            way(1, &square(0.0, 0.0, 1.0), &[("highway", "footway")]),
            GeometryClass::Line,
        ));
        assert!(matches!(out.features[0].geometry, FeatureGeometry::Line(_)));
        assert_eq!(out.features[0].converted_from, None);
    }

    #[rstest]
    fn line_category_converts_areas_to_outer_rings() {
        let out = normalize_one(extracted(
            area(1, &[square(0.0, 0.0, 4.0)], &[square(1.0, 1.0, 1.0)], &[("waterway", "riverbank")]),
            GeometryClass::Line,
        ));
        match &out.features[0].geometry {
            FeatureGeometry::Line(lines) => assert_eq!(lines.0.len(), 1),
            other => panic!("expected lines, got {other:?}"),
        }
        assert_eq!(out.features[0].converted_from, Some(GeometryClass::Polygon));
    }

    #[rstest]
    #[case(GeometryClass::Line, SkipReason::PointInLineCategory)]
    #[case(GeometryClass::Polygon, SkipReason::PointInPolygonCategory)]
    fn nodes_are_skipped_outside_point_categories(
        #[case] class: GeometryClass,
        #[case] reason: SkipReason,
    ) {
        let out = normalize_one(extracted(node(7, 0.0, 0.0, &[("leisure", "park")]), class));
        assert!(out.features.is_empty());
        assert_eq!(out.skipped[0].reason, reason);
        assert_eq!(out.skipped[0].id.to_string(), "node/7");
    }

    #[rstest]
    fn polygon_category_skips_open_rings() {
        let out = normalize_one(extracted(
            way(1, &open_path(), &[("leisure", "park")]),
            GeometryClass::Polygon,
        ));
        assert!(out.features.is_empty());
        assert_eq!(out.skipped[0].reason, SkipReason::DegenerateRing);
    }

    #[rstest]
    fn polygon_category_assembles_split_relations() {
        let outer = vec![
            vec![(0.0, 0.0), (3.0, 0.0), (3.0, 3.0)],
            vec![(0.0, 0.0), (0.0, 3.0), (3.0, 3.0)],
        ];
        let out = normalize_one(extracted(
            area(1, &outer, &[square(1.0, 1.0, 1.0)], &[("leisure", "park")]),
            GeometryClass::Polygon,
        ));
        match &out.features[0].geometry {
            FeatureGeometry::Polygon(polygons) => {
                assert_eq!(polygons.0.len(), 1);
                assert_eq!(polygons.0[0].interiors().len(), 1);
            }
            other => panic!("expected polygon, got {other:?}"),
        }
        assert_eq!(out.features[0].converted_from, None);
    }

    #[rstest]
    fn name_tag_is_lifted() {
        let out = normalize_one(extracted(
            node(1, 0.0, 0.0, &[("amenity", "cafe"), ("name", "Het Kaffee")]),
            GeometryClass::Point,
        ));
        assert_eq!(out.features[0].name.as_deref(), Some("Het Kaffee"));
    }

    #[rstest]
    fn blank_name_tag_is_not_lifted() {
        let out = normalize_one(extracted(
            node(1, 0.0, 0.0, &[("amenity", "cafe"), ("name", "")]),
            GeometryClass::Point,
        ));
        assert_eq!(out.features[0].name, None);
        assert!(!out.features[0].tags.contains_key("name"));
    }

    #[rstest]
    fn empty_geometry_is_skipped() {
        let mut feature = extracted(node(1, 0.0, 0.0, &[("route", "bus")]), GeometryClass::Line);
        feature.raw.geometry = RawGeometry::Lines(Vec::new());
        let out = normalize_one(feature);
        assert_eq!(out.skipped[0].reason, SkipReason::EmptyGeometry);
    }
}
