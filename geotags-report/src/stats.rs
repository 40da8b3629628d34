//! Summary statistics computed once per run.

use std::collections::BTreeMap;

use geo::{MapCoords, MultiLineString};
use geotags_core::{Boundary, CategoryResult, Feature, FeatureGeometry, RunReport, SkipReason, SkippedFeature};
use log::debug;

use crate::{LocalProjection, ReportError};

/// Number of features carrying one `key=value` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCount {
    /// The `key=value` tag.
    pub osm_tag: String,
    /// Feature count.
    pub count: usize,
}

/// Per-category figures.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    /// Category name.
    pub name: String,
    /// Features exported for the category.
    pub count: usize,
    /// Features the extractor returned before normalization, when it succeeded.
    pub extracted: Option<usize>,
    /// Total polygon area in square metres.
    pub area_m2: f64,
    /// Total line length in metres.
    pub length_m: f64,
    /// Exported features per tag, most frequent first.
    pub tags: Vec<TagCount>,
    /// Failure message when the category's extraction failed.
    pub failure: Option<String>,
}

/// Everything the HTML report shows.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStatistics {
    /// Boundary display name.
    pub boundary_name: String,
    /// Boundary area in square metres.
    pub boundary_area_m2: f64,
    /// Boundary exterior rings in projected metres.
    pub boundary_outline: MultiLineString,
    /// Categories in configuration order.
    pub categories: Vec<CategorySummary>,
    /// Exported features per tag across all categories, most frequent first.
    pub tag_counts: Vec<TagCount>,
    /// Exported features per geometry type name, e.g. `MultiPolygon`.
    pub geometry_counts: Vec<(&'static str, usize)>,
    /// Exported feature count.
    pub total_features: usize,
    /// Features dropped by the normalizer.
    pub skipped: Vec<SkippedFeature>,
    /// Dropped features per reason.
    pub skipped_by_reason: Vec<(SkipReason, usize)>,
}

fn tag_counts<'a>(tags: impl Iterator<Item = &'a str>) -> Vec<TagCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for tag in tags {
        *counts.entry(tag).or_default() += 1;
    }
    let mut sorted: Vec<TagCount> = counts
        .into_iter()
        .map(|(osm_tag, count)| TagCount {
            osm_tag: osm_tag.to_owned(),
            count,
        })
        .collect();
    // Stable sort keeps equal counts in tag order.
    sorted.sort_by(|a, b| b.count.cmp(&a.count));
    sorted
}

impl CategorySummary {
    fn empty(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            count: 0,
            extracted: None,
            area_m2: 0.0,
            length_m: 0.0,
            tags: Vec::new(),
            failure: None,
        }
    }
}

impl SummaryStatistics {
    /// Measure `features` against `boundary` and fold in the run's outcomes.
    ///
    /// Categories appear in the order of `run.outcomes`; a feature whose
    /// category has no outcome is appended after them.
    ///
    /// # Errors
    /// [`ReportError::EmptyBoundary`] when the boundary has no centroid.
    #[expect(
        clippy::float_arithmetic,
        reason = "per-category area and length are accumulated sums"
    )]
    pub fn compute(
        features: &[Feature],
        boundary: &Boundary,
        run: &RunReport,
    ) -> Result<Self, ReportError> {
        let projection =
            LocalProjection::centred_on(&boundary.geometry).ok_or_else(|| {
                ReportError::EmptyBoundary {
                    name: boundary.name.clone(),
                }
            })?;

        let mut categories: Vec<CategorySummary> = run
            .outcomes
            .iter()
            .map(|outcome| {
                let mut summary = CategorySummary::empty(&outcome.category);
                match &outcome.result {
                    CategoryResult::Success { features } => summary.extracted = Some(*features),
                    CategoryResult::Failure { reason } => summary.failure = Some(reason.to_string()),
                }
                summary
            })
            .collect();

        let mut geometry_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for feature in features {
            *geometry_counts.entry(feature.geometry.type_name()).or_default() += 1;
            let index = categories
                .iter()
                .position(|c| c.name == feature.category)
                .unwrap_or_else(|| {
                    categories.push(CategorySummary::empty(&feature.category));
                    categories.len() - 1
                });
            let Some(summary) = categories.get_mut(index) else {
                continue;
            };
            summary.count += 1;
            match &feature.geometry {
                FeatureGeometry::Polygon(polygons) => summary.area_m2 += projection.area_m2(polygons),
                FeatureGeometry::Line(lines) => summary.length_m += projection.total_length_m(lines),
                FeatureGeometry::Point(_) => {}
            }
        }
        for summary in &mut categories {
            summary.tags = tag_counts(
                features
                    .iter()
                    .filter(|f| f.category == summary.name)
                    .map(|f| f.osm_tag.as_str()),
            );
        }

        let mut skipped_by_reason: BTreeMap<SkipReason, usize> = BTreeMap::new();
        for skipped in &run.skipped {
            *skipped_by_reason.entry(skipped.reason).or_default() += 1;
        }

        let boundary_outline = boundary
            .geometry
            .iter()
            .map(|polygon| polygon.exterior().map_coords(|c| projection.project(c)))
            .collect();

        let stats = Self {
            boundary_name: boundary.name.clone(),
            boundary_area_m2: projection.area_m2(&boundary.geometry),
            boundary_outline,
            categories,
            tag_counts: tag_counts(features.iter().map(|f| f.osm_tag.as_str())),
            geometry_counts: geometry_counts.into_iter().collect(),
            total_features: features.len(),
            skipped: run.skipped.clone(),
            skipped_by_reason: skipped_by_reason.into_iter().collect(),
        };
        debug!(
            "computed statistics for {} categories over {} features",
            stats.categories.len(),
            stats.total_features
        );
        Ok(stats)
    }

    /// Categories whose extraction failed.
    #[must_use]
    pub fn failed_categories(&self) -> impl Iterator<Item = &CategorySummary> + '_ {
        self.categories.iter().filter(|c| c.failure.is_some())
    }

    /// Sum of polygon areas across categories, in square metres.
    #[must_use]
    pub fn total_area_m2(&self) -> f64 {
        self.categories.iter().map(|c| c.area_m2).sum()
    }

    /// Sum of line lengths across categories, in metres.
    #[must_use]
    pub fn total_length_m(&self) -> f64 {
        self.categories.iter().map(|c| c.length_m).sum()
    }
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    clippy::float_arithmetic,
    clippy::indexing_slicing,
    reason = "tests fail fast, build fixtures with float maths and index into known category order"
)]
mod tests {
    use super::*;
    use geo::{LineString, MultiLineString, MultiPolygon, Point, polygon};
    use geotags_core::test_support::square_boundary;
    use geotags_core::{
        CategoryOutcome, ElementId, ElementKind, ExtractionError, ProviderError, TagFilter, Tags,
    };
    use rstest::{fixture, rstest};

    fn feature(id: i64, category: &str, osm_tag: &str, geometry: FeatureGeometry) -> Feature {
        let (key, value) = osm_tag.split_once('=').expect("key=value tag");
        Feature {
            id: ElementId::new(ElementKind::Way, id),
            category: category.into(),
            filter: TagFilter::exact(key, value),
            osm_tag: osm_tag.into(),
            name: None,
            geometry,
            tags: Tags::new(),
            converted_from: None,
        }
    }

    fn square(x: f64, y: f64, size: f64) -> FeatureGeometry {
        FeatureGeometry::Polygon(MultiPolygon::new(vec![polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
            (x: x, y: y),
        ]]))
    }

    #[fixture]
    fn boundary() -> Boundary {
        square_boundary("Ghent", 3.6, 51.0, 0.2)
    }

    #[fixture]
    fn run() -> RunReport {
        RunReport::new(
            vec![
                CategoryOutcome {
                    category: "parks".into(),
                    result: CategoryResult::Success { features: 3 },
                },
                CategoryOutcome {
                    category: "schools".into(),
                    result: CategoryResult::Failure {
                        reason: ExtractionError {
                            category: "schools".into(),
                            filter: TagFilter::exact("amenity", "school"),
                            source: ProviderError::Timeout {
                                url: "https://overpass.example/api/interpreter".into(),
                                timeout_secs: 30,
                            },
                        },
                    },
                },
                CategoryOutcome {
                    category: "rivers".into(),
                    result: CategoryResult::Success { features: 1 },
                },
            ],
            vec![SkippedFeature {
                id: ElementId::new(ElementKind::Way, 9),
                category: "parks".into(),
                osm_tag: "leisure=park".into(),
                reason: SkipReason::DegenerateRing,
            }],
        )
    }

    #[fixture]
    fn features() -> Vec<Feature> {
        vec![
            feature(1, "parks", "leisure=park", square(3.65, 51.05, 0.01)),
            feature(2, "parks", "leisure=garden", square(3.70, 51.05, 0.01)),
            feature(
                3,
                "rivers",
                "waterway=river",
                FeatureGeometry::Line(MultiLineString::new(vec![LineString::from(vec![
                    (3.7, 51.0),
                    (3.7, 51.1),
                ])])),
            ),
        ]
    }

    #[rstest]
    fn counts_and_measures_by_category(
        features: Vec<Feature>,
        boundary: Boundary,
        run: RunReport,
    ) {
        let stats = SummaryStatistics::compute(&features, &boundary, &run).expect("stats");
        let names: Vec<_> = stats.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["parks", "schools", "rivers"]);

        let parks = &stats.categories[0];
        assert_eq!(parks.count, 2);
        assert_eq!(parks.extracted, Some(3));
        // Two cells of 0.01 degrees at 51 N are roughly 0.77 km² each.
        assert!((1.4e6..1.7e6).contains(&parks.area_m2), "{}", parks.area_m2);
        assert_eq!(parks.length_m, 0.0);

        let rivers = &stats.categories[2];
        // 0.1 degrees of latitude is about 11.1 km.
        assert!((rivers.length_m - 11_119.5).abs() < 5.0, "{}", rivers.length_m);

        assert_eq!(stats.total_features, 3);
        assert_eq!(
            stats.geometry_counts,
            [("MultiLineString", 1), ("MultiPolygon", 2)]
        );
        assert!(stats.boundary_area_m2 > stats.total_area_m2());
        assert_eq!(stats.boundary_outline.0.len(), 1);
    }

    #[rstest]
    fn records_failures_and_skips(features: Vec<Feature>, boundary: Boundary, run: RunReport) {
        let stats = SummaryStatistics::compute(&features, &boundary, &run).expect("stats");
        let failed: Vec<_> = stats.failed_categories().map(|c| c.name.as_str()).collect();
        assert_eq!(failed, ["schools"]);
        let message = stats.categories[1].failure.as_deref().expect("failure");
        assert!(message.contains("timed out"), "{message}");
        assert_eq!(stats.skipped_by_reason, [(SkipReason::DegenerateRing, 1)]);
    }

    #[rstest]
    fn tag_counts_sort_by_frequency_then_tag(boundary: Boundary) {
        let point = || FeatureGeometry::Point(Point::new(3.7, 51.05));
        let features = vec![
            feature(1, "stops", "highway=bus_stop", point()),
            feature(2, "stops", "railway=tram_stop", point()),
            feature(3, "stops", "railway=tram_stop", point()),
            feature(4, "stops", "amenity=bus_station", point()),
        ];
        let stats =
            SummaryStatistics::compute(&features, &boundary, &RunReport::default()).expect("stats");
        let order: Vec<_> = stats
            .tag_counts
            .iter()
            .map(|t| (t.osm_tag.as_str(), t.count))
            .collect();
        assert_eq!(
            order,
            [
                ("railway=tram_stop", 2),
                ("amenity=bus_station", 1),
                ("highway=bus_stop", 1)
            ]
        );
        // Categories without an outcome are still listed.
        assert_eq!(stats.categories[0].name, "stops");
        assert_eq!(stats.categories[0].extracted, None);
    }

    #[rstest]
    fn empty_boundary_is_rejected(features: Vec<Feature>, run: RunReport) {
        let boundary = Boundary::new("Nowhere", MultiPolygon::new(Vec::new()), None);
        let err = SummaryStatistics::compute(&features, &boundary, &run).expect_err("empty");
        assert!(matches!(err, ReportError::EmptyBoundary { .. }));
    }
}
