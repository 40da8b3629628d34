#![expect(
    clippy::expect_used,
    clippy::float_arithmetic,
    reason = "tests fail fast and build fixture geometry with float maths"
)]

//! Behavioural tests for the summary report.

use std::cell::RefCell;
use std::fs;

use camino::Utf8PathBuf;
use chrono::NaiveDate;
use geo::{MultiPolygon, polygon};
use geotags_core::test_support::square_boundary;
use geotags_core::{
    Boundary, CategoryOutcome, CategoryResult, ElementId, ElementKind, ExtractionError, Feature,
    FeatureGeometry, ProviderError, RunReport, TagFilter, Tags,
};
use geotags_report::{ReportContext, ReportError, SummaryStatistics, write_report};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

#[derive(Debug, Default)]
struct ReportWorld {
    boundary: RefCell<Option<Boundary>>,
    features: RefCell<Vec<Feature>>,
    run: RefCell<RunReport>,
    sandbox: RefCell<Option<TempDir>>,
    html: RefCell<Option<Result<String, ReportError>>>,
}

impl ReportWorld {
    fn html(&self) -> String {
        match self.html.borrow().as_ref() {
            Some(Ok(html)) => html.clone(),
            other => panic!("report should have been written, got {other:?}"),
        }
    }
}

#[fixture]
fn world() -> ReportWorld {
    ReportWorld::default()
}

fn park(id: i64, x: f64) -> Feature {
    Feature {
        id: ElementId::new(ElementKind::Way, id),
        category: "parks".into(),
        filter: TagFilter::exact("leisure", "park"),
        osm_tag: "leisure=park".into(),
        name: None,
        geometry: FeatureGeometry::Polygon(MultiPolygon::new(vec![polygon![
            (x: x, y: 51.05),
            (x: x + 0.01, y: 51.05),
            (x: x + 0.01, y: 51.06),
            (x: x, y: 51.05),
        ]])),
        tags: Tags::new(),
        converted_from: None,
    }
}

fn success(category: &str, features: usize) -> CategoryOutcome {
    CategoryOutcome {
        category: category.into(),
        result: CategoryResult::Success { features },
    }
}

#[given("a boundary around Ghent")]
fn given_boundary(world: &ReportWorld) {
    world
        .boundary
        .replace(Some(square_boundary("Gent", 3.6, 51.0, 0.2)));
}

#[given("two exported parks")]
fn given_parks(world: &ReportWorld) {
    world.features.replace(vec![park(1, 3.65), park(2, 3.70)]);
}

#[given("a run where the schools category timed out")]
fn given_partial_failure(world: &ReportWorld) {
    let failure = CategoryOutcome {
        category: "schools".into(),
        result: CategoryResult::Failure {
            reason: ExtractionError {
                category: "schools".into(),
                filter: TagFilter::exact("amenity", "school"),
                source: ProviderError::Timeout {
                    url: "https://overpass.example/api/interpreter".into(),
                    timeout_secs: 180,
                },
            },
        },
    };
    world
        .run
        .replace(RunReport::new(vec![success("parks", 2), failure], Vec::new()));
}

#[given("a run with no categories")]
fn given_empty_run(world: &ReportWorld) {
    world.run.replace(RunReport::default());
}

#[when("the summary report is written")]
fn when_written(world: &ReportWorld) {
    let dir = TempDir::new().expect("tempdir");
    let path = Utf8PathBuf::from_path_buf(dir.path().join("gent_summary_report.html"))
        .expect("utf-8 tempdir");
    let boundary = world.boundary.borrow().clone().expect("boundary given");
    let context = ReportContext {
        city: "Gent".into(),
        country: "Belgium".into(),
        crs: "EPSG:4326".into(),
        extraction_date: NaiveDate::from_ymd_opt(2026, 10, 17).expect("valid date"),
        artefacts: vec!["gent_geotags.geojson".into()],
    };
    let outcome = SummaryStatistics::compute(&world.features.borrow(), &boundary, &world.run.borrow())
        .and_then(|stats| write_report(&path, &stats, &context))
        .map(|()| fs::read_to_string(&path).expect("report readable"));
    world.html.replace(Some(outcome));
    world.sandbox.replace(Some(dir));
}

#[then("the report lists 2 parks")]
fn then_two_parks(world: &ReportWorld) {
    let html = world.html();
    assert!(
        html.contains("<tr><td>parks</td><td class=\"num\">2</td><td class=\"num\">2</td>"),
        "{html}"
    );
}

#[then("the report names schools as a failed category")]
fn then_schools_failed(world: &ReportWorld) {
    let html = world.html();
    assert!(html.contains("id=\"failed-categories\""));
    assert!(html.contains("<li><strong>schools</strong>"));
    assert!(html.contains("timed out after 180s"));
}

#[then("the report credits OpenStreetMap contributors")]
fn then_attribution(world: &ReportWorld) {
    assert!(world.html().contains("Data © OpenStreetMap contributors"));
}

#[then("the report states that no features were exported")]
fn then_no_features(world: &ReportWorld) {
    assert!(world.html().contains("No features were exported."));
}

#[then("the report has no failed categories section")]
fn then_no_failures(world: &ReportWorld) {
    assert!(!world.html().contains("id=\"failed-categories\""));
}

#[scenario(path = "tests/features/report.feature", index = 0)]
fn partial_failure_report(world: ReportWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/report.feature", index = 1)]
fn empty_run_report(world: ReportWorld) {
    let _ = world;
}
