//! PostGIS import bundle: a CSV of records plus a `psql` load script.
//!
//! No database connection is opened. The script creates the target table,
//! stages the CSV with `\copy` and converts the GeoJSON geometry column with
//! `ST_GeomFromGeoJSON`.

use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use geotags_core::{ExportOptions, Feature};
use log::info;

use super::ExportError;

const COLUMNS: [&str; 8] = [
    "osm_element",
    "osm_id",
    "category",
    "osm_tag",
    "name",
    "converted_from",
    "tags",
    "geometry",
];

/// Files written by [`write_postgis_bundle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgisBundle {
    /// CSV records.
    pub csv: Utf8PathBuf,
    /// `psql` script loading the CSV.
    pub sql: Utf8PathBuf,
    /// Number of data rows.
    pub rows: usize,
}

fn geometry_json(feature: &Feature) -> io::Result<String> {
    let geometry = geojson::Geometry::new((&feature.geometry.to_geometry()).into());
    serde_json::to_string(&geometry).map_err(io::Error::from)
}

fn write_records(
    writer: &mut dyn Write,
    features: &[Feature],
    options: &ExportOptions,
) -> io::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(COLUMNS)?;
    for feature in features {
        let tags = if options.include_tags {
            serde_json::to_string(&feature.tags)?
        } else {
            String::new()
        };
        let osm_id = feature.id.id.to_string();
        csv.write_record([
            feature.id.kind.as_str(),
            osm_id.as_str(),
            feature.category.as_str(),
            feature.osm_tag.as_str(),
            feature.name.as_deref().unwrap_or_default(),
            feature.converted_from.map_or("", |class| class.as_str()),
            tags.as_str(),
            geometry_json(feature)?.as_str(),
        ])?;
    }
    csv.flush()
}

fn sql_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Render the `psql` script loading `csv_file` into `table`.
///
/// `csv_file` is resolved by `psql` relative to its working directory, so the
/// script is meant to be run from the output directory. Empty CSV fields load
/// as `NULL`.
#[must_use]
pub fn postgis_script(table: &str, csv_file: &str) -> String {
    let unqualified = table.rsplit('.').next().unwrap_or(table);
    let index = format!("{unqualified}_geometry_idx");
    let columns = COLUMNS.join(", ");
    let attributes = COLUMNS
        .iter()
        .copied()
        .filter(|column| *column != "geometry")
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "\
-- Load OpenStreetMap features exported by geotags.
-- Run from the directory containing {csv_file}:
--   psql -d <database> -f <this file>
\\set ON_ERROR_STOP on
BEGIN;
CREATE EXTENSION IF NOT EXISTS postgis;
CREATE TABLE IF NOT EXISTS {table} (
    id bigserial PRIMARY KEY,
    osm_element text NOT NULL,
    osm_id bigint NOT NULL,
    category text NOT NULL,
    osm_tag text NOT NULL,
    name text,
    converted_from text,
    tags jsonb,
    geometry geometry(Geometry, 4326) NOT NULL
);
CREATE INDEX IF NOT EXISTS {index} ON {table} USING GIST (geometry);
CREATE TEMP TABLE geotags_staging (
    osm_element text,
    osm_id bigint,
    category text,
    osm_tag text,
    name text,
    converted_from text,
    tags jsonb,
    geometry text
) ON COMMIT DROP;
\\copy geotags_staging ({columns}) FROM {csv} WITH (FORMAT csv, HEADER true)
INSERT INTO {table} ({columns})
SELECT {attributes}, ST_SetSRID(ST_GeomFromGeoJSON(geometry), 4326)
FROM geotags_staging;
COMMIT;
",
        csv = sql_literal(csv_file),
    )
}

/// Write the PostGIS CSV and SQL files, each atomically.
///
/// # Errors
/// [`ExportError::Write`] naming the file that failed. The CSV is written
/// first; a failure on the script leaves the new CSV in place.
pub fn write_postgis_bundle(
    csv_path: &Utf8Path,
    sql_path: &Utf8Path,
    features: &[Feature],
    options: &ExportOptions,
) -> Result<PostgisBundle, ExportError> {
    geotags_fs::write_atomic(csv_path, |writer| write_records(writer, features, options))
        .map_err(ExportError::write(csv_path))?;

    let csv_file = csv_path.file_name().unwrap_or(csv_path.as_str());
    let script = postgis_script(&options.table, csv_file);
    geotags_fs::write_atomic(sql_path, |writer| writer.write_all(script.as_bytes()))
        .map_err(ExportError::write(sql_path))?;

    info!(
        "wrote PostGIS bundle for table {} ({} row(s)) to {csv_path} and {sql_path}",
        options.table,
        features.len()
    );
    Ok(PostgisBundle {
        csv: csv_path.to_path_buf(),
        sql: sql_path.to_path_buf(),
        rows: features.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, MultiLineString};
    use geotags_core::{ElementId, ElementKind, FeatureGeometry, GeometryClass, TagFilter, Tags};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn canal() -> Feature {
        let mut tags = Tags::new();
        tags.insert("waterway".into(), "canal".into());
        tags.insert("name".into(), "Coupure, \"oud\"".into());
        Feature {
            id: ElementId::new(ElementKind::Relation, 99),
            category: "waterways".into(),
            filter: TagFilter::any_value("waterway"),
            osm_tag: "waterway=canal".into(),
            name: Some("Coupure, \"oud\"".into()),
            geometry: FeatureGeometry::Line(MultiLineString::new(vec![LineString::from(vec![
                (3.70, 51.05),
                (3.71, 51.06),
            ])])),
            tags,
            converted_from: Some(GeometryClass::Polygon),
        }
    }

    #[rstest]
    fn script_targets_configured_table() {
        let script = postgis_script("gis.ghent_features", "ghent_geotags.csv");
        assert!(script.contains("CREATE TABLE IF NOT EXISTS gis.ghent_features ("));
        assert!(script.contains("geometry geometry(Geometry, 4326) NOT NULL"));
        assert!(script.contains(
            "CREATE INDEX IF NOT EXISTS ghent_features_geometry_idx ON gis.ghent_features USING GIST (geometry);"
        ));
        assert!(script.contains("FROM 'ghent_geotags.csv' WITH (FORMAT csv, HEADER true)"));
        assert!(script.contains("ST_SetSRID(ST_GeomFromGeoJSON(geometry), 4326)"));
    }

    #[rstest]
    fn csv_literals_are_quoted() {
        assert_eq!(sql_literal("o'brien.csv"), "'o''brien.csv'");
    }

    #[rstest]
    fn writes_csv_and_script(canal: Feature) {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        let csv_path = root.join("ghent_geotags.csv");
        let sql_path = root.join("ghent_geotags.sql");

        let bundle = write_postgis_bundle(&csv_path, &sql_path, &[canal], &ExportOptions::default())
            .expect("bundle");
        assert_eq!(bundle.rows, 1);

        let mut reader = csv::Reader::from_path(&csv_path).expect("open csv");
        let headers = reader.headers().expect("headers").clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), COLUMNS);
        let row = reader
            .records()
            .next()
            .expect("one row")
            .expect("valid row");
        assert_eq!(&row[0], "relation");
        assert_eq!(&row[1], "99");
        assert_eq!(&row[4], "Coupure, \"oud\"");
        assert_eq!(&row[5], "polygon");
        let tags: serde_json::Value = serde_json::from_str(&row[6]).expect("tags json");
        assert_eq!(tags["waterway"], "canal");
        let geometry: geojson::Geometry = serde_json::from_str(&row[7]).expect("geometry json");
        assert!(matches!(geometry.value, geojson::Value::MultiLineString(_)));

        let script = std::fs::read_to_string(&sql_path).expect("script");
        assert!(script.contains("FROM 'ghent_geotags.csv'"));
    }

    #[rstest]
    fn tags_column_empty_when_disabled(canal: Feature) {
        let options = ExportOptions {
            include_tags: false,
            ..ExportOptions::default()
        };
        let mut buffer = Vec::new();
        write_records(&mut buffer, &[canal], &options).expect("records");
        let text = String::from_utf8(buffer).expect("utf-8");
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let row = reader.records().next().expect("row").expect("valid");
        assert_eq!(&row[6], "");
    }
}
