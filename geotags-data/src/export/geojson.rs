//! GeoJSON FeatureCollection export.

use std::io::{self, Write};

use camino::Utf8Path;
use geojson::{Feature as GeoJsonFeature, FeatureCollection, Geometry, JsonObject, JsonValue};
use geojson::feature::Id;
use geotags_core::{Boundary, ExportOptions, Feature};
use log::info;

use super::ExportError;

/// Property names written for every feature. OSM tags never overwrite them.
const RESERVED: [&str; 6] = [
    "element",
    "osm_id",
    "category",
    "osm_tag",
    "name",
    "converted_from",
];

fn properties(feature: &Feature, options: &ExportOptions) -> JsonObject {
    let mut props = JsonObject::new();
    props.insert("element".into(), feature.id.kind.as_str().into());
    props.insert("osm_id".into(), feature.id.id.into());
    props.insert("category".into(), feature.category.clone().into());
    props.insert("osm_tag".into(), feature.osm_tag.clone().into());
    props.insert(
        "name".into(),
        feature.name.clone().map_or(JsonValue::Null, JsonValue::from),
    );
    if let Some(class) = feature.converted_from {
        props.insert("converted_from".into(), class.as_str().into());
    }
    if options.include_tags {
        for (key, value) in &feature.tags {
            if RESERVED.contains(&key.as_str()) {
                continue;
            }
            props
                .entry(key.clone())
                .or_insert_with(|| value.clone().into());
        }
    }
    props
}

fn to_geojson(feature: &Feature, options: &ExportOptions) -> GeoJsonFeature {
    GeoJsonFeature {
        bbox: None,
        geometry: Some(Geometry::new((&feature.geometry.to_geometry()).into())),
        id: Some(Id::String(feature.id.to_string())),
        properties: Some(properties(feature, options)),
        foreign_members: None,
    }
}

/// Build the FeatureCollection for normalized features, in input order.
#[must_use]
pub fn feature_collection(features: &[Feature], options: &ExportOptions) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: features.iter().map(|f| to_geojson(f, options)).collect(),
        foreign_members: None,
    }
}

/// Build the single-feature collection describing `boundary`.
#[must_use]
pub fn boundary_collection(boundary: &Boundary) -> FeatureCollection {
    let mut props = JsonObject::new();
    props.insert("name".into(), boundary.name.clone().into());
    let (element, osm_id) = boundary.element.map_or((JsonValue::Null, JsonValue::Null), |id| {
        (id.kind.as_str().into(), id.id.into())
    });
    props.insert("element".into(), element);
    props.insert("osm_id".into(), osm_id);
    let feature = GeoJsonFeature {
        bbox: None,
        geometry: Some(Geometry::new((&boundary.geometry).into())),
        id: boundary.element.map(|id| Id::String(id.to_string())),
        properties: Some(props),
        foreign_members: None,
    };
    FeatureCollection {
        bbox: None,
        features: vec![feature],
        foreign_members: None,
    }
}

fn write_collection(path: &Utf8Path, collection: &FeatureCollection) -> Result<(), ExportError> {
    geotags_fs::write_atomic(path, |writer| {
        serde_json::to_writer(&mut *writer, collection).map_err(io::Error::from)?;
        writer.write_all(b"\n")
    })
    .map_err(ExportError::write(path))
}

/// Write `features` to `path` as a GeoJSON FeatureCollection, atomically.
///
/// # Errors
/// [`ExportError::Write`] when the file cannot be staged or replaced. An
/// existing file at `path` survives any failure.
pub fn write_feature_collection(
    path: &Utf8Path,
    features: &[Feature],
    options: &ExportOptions,
) -> Result<(), ExportError> {
    write_collection(path, &feature_collection(features, options))?;
    info!("wrote {} feature(s) to {path}", features.len());
    Ok(())
}

/// Write the boundary polygon to `path`, atomically.
///
/// # Errors
/// [`ExportError::Write`] when the file cannot be staged or replaced.
pub fn write_boundary(path: &Utf8Path, boundary: &Boundary) -> Result<(), ExportError> {
    write_collection(path, &boundary_collection(boundary))?;
    info!("wrote boundary of {} to {path}", boundary.name);
    Ok(())
}
