//! Test helpers: sandboxed configuration files and a stub provider builder.

use std::cell::RefCell;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use geotags_core::test_support::{StubProvider, node, square_boundary, way};
use geotags_core::{MapDataProvider, ProviderError, TagFilter};
use tempfile::TempDir;

use crate::run::{ProviderBuilder, RunArgs, RunConfig};
use crate::CliError;

pub(super) const PARKS_CONFIG: &str = r#"
city_name = "Ghent"
country = "Belgium"

[osm_tags]
parks = ["leisure=park"]
"#;

pub(super) const PARKS_AND_SCHOOLS_CONFIG: &str = r#"
city_name = "Ghent"
country = "Belgium"

[osm_tags]
parks = ["leisure=park"]
schools = { geometry = "point", tags = ["amenity=school"] }

[export]
postgis = true
table = "gis.ghent_features"
"#;

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    fs::write(path, contents).expect("write fixture file");
}

/// A temporary workspace holding a pipeline configuration file.
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn write_config(&self, contents: &str) -> Utf8PathBuf {
        let path = self.root.join("ghent.toml");
        write_utf8(&path, contents.as_bytes());
        path
    }

    pub(super) fn output_dir(&self) -> Utf8PathBuf {
        self.root.join("output")
    }

    pub(super) fn args(&self, config_file: Utf8PathBuf) -> RunArgs {
        RunArgs {
            config_file: Some(config_file),
            output_dir: Some(self.output_dir()),
            ..RunArgs::default()
        }
    }
}

/// Hands a pre-built [`StubProvider`] to the pipeline exactly once.
pub(super) struct StubProviderBuilder {
    provider: RefCell<Option<StubProvider>>,
}

impl StubProviderBuilder {
    pub(super) fn new(provider: StubProvider) -> Self {
        Self {
            provider: RefCell::new(Some(provider)),
        }
    }
}

impl ProviderBuilder for StubProviderBuilder {
    fn build(&self, _config: &RunConfig) -> Result<Box<dyn MapDataProvider>, CliError> {
        let provider = self
            .provider
            .borrow_mut()
            .take()
            .expect("provider should be built once per run");
        Ok(Box::new(provider))
    }
}

fn park_ring(x: f64, y: f64) -> Vec<(f64, f64)> {
    vec![
        (x, y),
        (x + 0.01, y),
        (x + 0.01, y + 0.01),
        (x, y + 0.01),
        (x, y),
    ]
}

/// Ghent with three parks, the last of which never closes its ring.
pub(super) fn ghent_parks() -> StubProvider {
    let tags = [("leisure", "park")];
    let open = vec![(3.75, 51.05), (3.76, 51.05), (3.76, 51.06)];
    StubProvider::with_boundary(square_boundary("Gent", 3.6, 51.0, 0.2)).with_features(
        &TagFilter::exact("leisure", "park"),
        vec![
            way(1, &park_ring(3.65, 51.05), &[("leisure", "park"), ("name", "Citadelpark")]),
            way(2, &park_ring(3.70, 51.10), &tags),
            way(3, &open, &tags),
        ],
    )
}

/// [`ghent_parks`] plus a schools query that times out.
pub(super) fn ghent_with_failing_schools() -> StubProvider {
    ghent_parks().with_filter_error(
        &TagFilter::exact("amenity", "school"),
        ProviderError::Timeout {
            url: "https://overpass.example/api/interpreter".into(),
            timeout_secs: 180,
        },
    )
}

/// [`ghent_parks`] plus one school node.
pub(super) fn ghent_with_school() -> StubProvider {
    ghent_parks().with_features(
        &TagFilter::exact("amenity", "school"),
        vec![node(10, 3.68, 51.07, &[("amenity", "school")])],
    )
}
