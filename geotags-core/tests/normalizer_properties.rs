//! Property-based tests for the geometry normalizer and extractor.
//!
//! # Invariants tested
//!
//! - **Class agreement:** every output feature has its category's class.
//! - **Conservation:** every input feature is either kept or skipped.
//! - **Determinism:** identical input yields identical output.
//! - **De-duplication:** an element returned by several filters of one
//!   category is extracted once.

use std::collections::HashSet;

use geo::{Coord, LineString};
use geotags_core::test_support::{StubProvider, extracted, square_boundary};
use geotags_core::{
    Category, ElementId, ElementKind, GeometryClass, RawFeature, RawGeometry, TagFilter, Tags,
    extract_features, normalize,
};
use proptest::prelude::*;

fn coord_strategy() -> impl Strategy<Value = Coord> {
    (-5.0_f64..5.0, -5.0_f64..5.0).prop_map(|(x, y)| Coord { x, y })
}

fn line_strategy() -> impl Strategy<Value = LineString> {
    proptest::collection::vec(coord_strategy(), 0..6).prop_map(LineString::new)
}

fn ring_strategy() -> impl Strategy<Value = LineString> {
    (coord_strategy(), 0.01_f64..2.0).prop_map(|(origin, size)| {
        LineString::new(vec![
            origin,
            Coord { x: origin.x + size, y: origin.y },
            Coord { x: origin.x + size, y: origin.y + size },
            Coord { x: origin.x, y: origin.y + size },
            origin,
        ])
    })
}

/// Any raw geometry the provider might plausibly return, including broken ones.
fn raw_geometry_strategy() -> impl Strategy<Value = RawGeometry> {
    prop_oneof![
        coord_strategy().prop_map(RawGeometry::Point),
        line_strategy().prop_map(RawGeometry::Way),
        ring_strategy().prop_map(RawGeometry::Way),
        (
            proptest::collection::vec(prop_oneof![ring_strategy(), line_strategy()], 0..3),
            proptest::collection::vec(ring_strategy(), 0..2),
        )
            .prop_map(|(outer, inner)| RawGeometry::Area { outer, inner }),
        proptest::collection::vec(line_strategy(), 0..4).prop_map(RawGeometry::Lines),
    ]
}

fn class_strategy() -> impl Strategy<Value = GeometryClass> {
    prop_oneof![
        Just(GeometryClass::Point),
        Just(GeometryClass::Line),
        Just(GeometryClass::Polygon),
    ]
}

fn raw_feature(id: i64, geometry: RawGeometry) -> RawFeature {
    let tags: Tags = [("leisure".to_owned(), "park".to_owned())]
        .into_iter()
        .collect();
    RawFeature {
        id: ElementId::new(ElementKind::Way, id),
        tags,
        geometry,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn output_class_matches_category(
        inputs in proptest::collection::vec((raw_geometry_strategy(), class_strategy()), 0..12),
    ) {
        let features: Vec<_> = inputs
            .into_iter()
            .enumerate()
            .map(|(index, (geometry, class))| {
                let id = i64::try_from(index).unwrap_or(i64::MAX);
                extracted(raw_feature(id, geometry), class)
            })
            .collect();
        let classes: Vec<_> = features.iter().map(|f| (f.raw.id, f.class)).collect();
        let total = features.len();

        let out = normalize(features);

        prop_assert_eq!(out.features.len() + out.skipped.len(), total);
        for feature in &out.features {
            let expected = classes
                .iter()
                .find(|(id, _)| *id == feature.id)
                .map(|(_, class)| *class);
            prop_assert_eq!(Some(feature.class()), expected);
        }
    }

    #[test]
    fn normalization_is_deterministic(
        inputs in proptest::collection::vec((raw_geometry_strategy(), class_strategy()), 0..8),
    ) {
        let features: Vec<_> = inputs
            .into_iter()
            .enumerate()
            .map(|(index, (geometry, class))| {
                let id = i64::try_from(index).unwrap_or(i64::MAX);
                extracted(raw_feature(id, geometry), class)
            })
            .collect();
        prop_assert_eq!(normalize(features.clone()), normalize(features));
    }

    #[test]
    fn overlapping_filters_extract_each_element_once(
        ids in proptest::collection::vec(1_i64..20, 0..15),
        more in proptest::collection::vec(1_i64..20, 0..15),
    ) {
        let boundary = square_boundary("Unit", -10.0, -10.0, 20.0);
        let park = TagFilter::exact("leisure", "park");
        let green = TagFilter::any_value("leisure");
        let as_features = |ids: &[i64]| {
            ids.iter()
                .map(|&id| raw_feature(id, RawGeometry::Point(Coord { x: 0.0, y: 0.0 })))
                .collect::<Vec<_>>()
        };
        let provider = StubProvider::with_boundary(boundary.clone())
            .with_features(&park, as_features(&ids))
            .with_features(&green, as_features(&more));
        let categories = [Category::new(
            "green",
            GeometryClass::Point,
            vec![park, green],
        )];

        let extraction = extract_features(&provider, &boundary, &categories);

        let unique: HashSet<_> = ids.iter().chain(&more).collect();
        prop_assert_eq!(extraction.features.len(), unique.len());
        let mut seen = HashSet::new();
        for feature in &extraction.features {
            prop_assert!(seen.insert(feature.raw.id), "duplicate {}", feature.raw.id);
        }
    }
}
