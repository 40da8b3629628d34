//! Pipeline configuration schema and validation.
//!
//! Configuration files deserialize into a [`PipelineDocument`], which mirrors
//! the file layout. [`PipelineConfig::try_from`] validates the document and
//! produces the typed, ordered category list the rest of the pipeline uses.
//! Reading files is left to `geotags-data`; this module has no side effects.

use std::collections::HashSet;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::{Category, GeometryClass, TagFilter};

/// Identifier used when a configuration omits `crs`.
pub const DEFAULT_CRS: &str = "EPSG:4326";

/// PostGIS table name used when a configuration omits `export.table`.
pub const DEFAULT_TABLE: &str = "osm_features";

const MAX_IDENTIFIER_LEN: usize = 63;

/// Validation failures for a [`PipelineDocument`]. All are fatal before
/// extraction starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required text field was empty or whitespace.
    #[error("{field} must not be blank")]
    BlankField {
        /// Offending key.
        field: &'static str,
    },
    /// `osm_tags` contained no categories.
    #[error("osm_tags must define at least one category")]
    NoCategories,
    /// A category name was empty or whitespace.
    #[error("category names must not be blank")]
    BlankCategoryName,
    /// Two categories share a name.
    #[error("category {name:?} is defined more than once")]
    DuplicateCategory {
        /// Repeated name.
        name: String,
    },
    /// A category had no tag filters.
    #[error("category {category:?} must list at least one tag filter")]
    EmptyCategory {
        /// Category name.
        category: String,
    },
    /// A tag filter key was empty or whitespace.
    #[error("category {category:?} has a tag filter with a blank key")]
    BlankTagKey {
        /// Category name.
        category: String,
    },
    /// `crs` is not an `AUTHORITY:CODE` identifier.
    #[error("crs {value:?} is not a valid identifier (expected e.g. EPSG:4326)")]
    MalformedCrs {
        /// Raw value.
        value: String,
    },
    /// `crs` is well formed but not geographic WGS84.
    #[error("crs {value:?} is not supported; GeoJSON output requires EPSG:4326 or OGC:CRS84")]
    UnsupportedCrs {
        /// Raw value.
        value: String,
    },
    /// `export.table` is not a plain SQL identifier.
    #[error("export table {table:?} must be a plain SQL identifier, optionally schema-qualified")]
    InvalidTableName {
        /// Raw value.
        table: String,
    },
}

/// Coordinate reference system of the outputs.
///
/// Only geographic WGS84 is representable because GeoJSON coordinates are
/// WGS84 longitude/latitude by definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Crs {
    /// `EPSG:4326`.
    #[default]
    Epsg4326,
    /// `OGC:CRS84`, WGS84 with longitude-first axis order.
    Crs84,
}

impl Crs {
    /// Canonical identifier.
    #[must_use]
    pub const fn identifier(self) -> &'static str {
        match self {
            Self::Epsg4326 => "EPSG:4326",
            Self::Crs84 => "OGC:CRS84",
        }
    }

    /// Parse a configured identifier.
    ///
    /// # Errors
    /// [`ConfigError::MalformedCrs`] for text that is not an identifier and
    /// [`ConfigError::UnsupportedCrs`] for any non-WGS84 system.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let normalized = value.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "EPSG:4326" => return Ok(Self::Epsg4326),
            "OGC:CRS84" | "CRS84" => return Ok(Self::Crs84),
            _ => {}
        }
        let well_formed = normalized.split_once(':').is_some_and(|(authority, code)| {
            !authority.is_empty()
                && authority.chars().all(|c| c.is_ascii_alphabetic())
                && !code.is_empty()
                && code.chars().all(|c| c.is_ascii_alphanumeric())
        });
        if well_formed {
            Err(ConfigError::UnsupportedCrs {
                value: value.to_owned(),
            })
        } else {
            Err(ConfigError::MalformedCrs {
                value: value.to_owned(),
            })
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Options controlling the exporters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Emit the PostGIS CSV + SQL bundle.
    pub postgis: bool,
    /// Target table of the PostGIS bundle.
    pub table: String,
    /// Copy OSM attributes into exported properties.
    pub include_tags: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            postgis: false,
            table: DEFAULT_TABLE.to_owned(),
            include_tags: true,
        }
    }
}

/// A tag filter as written in a configuration file.
///
/// Either the shorthand `"key=value"` or a `{ key, value }` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagFilterSpec {
    /// `"leisure=park"`, `"amenity=*"` or a bare `"amenity"`.
    Shorthand(String),
    /// `{ key = "leisure", value = "park" }`; a missing value or `*` matches any value.
    Table {
        /// Tag key.
        key: String,
        /// Tag value.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
}

impl From<&TagFilter> for TagFilterSpec {
    fn from(filter: &TagFilter) -> Self {
        Self::Table {
            key: filter.key().to_owned(),
            value: filter.value().map(str::to_owned),
        }
    }
}

fn default_geometry() -> GeometryClass {
    GeometryClass::Polygon
}

/// One entry of the `osm_tags` mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategorySpec {
    /// `{ geometry = "line", tags = [...] }`.
    Detailed {
        /// Declared geometry class, `polygon` when omitted.
        #[serde(default = "default_geometry")]
        geometry: GeometryClass,
        /// Tag filters.
        tags: Vec<TagFilterSpec>,
    },
    /// A bare list of filters; the class defaults to `polygon`.
    Bare(Vec<TagFilterSpec>),
}

impl CategorySpec {
    fn into_parts(self) -> (GeometryClass, Vec<TagFilterSpec>) {
        match self {
            Self::Detailed { geometry, tags } => (geometry, tags),
            Self::Bare(tags) => (default_geometry(), tags),
        }
    }
}

/// The `osm_tags` mapping with document order preserved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CategoryTable(pub Vec<(String, CategorySpec)>);

impl Serialize for CategoryTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, spec) in &self.0 {
            map.serialize_entry(name, spec)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CategoryTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = CategoryTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of category names to tag filters")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry::<String, CategorySpec>()? {
                    entries.push(entry);
                }
                Ok(CategoryTable(entries))
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// A configuration file as written on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDocument {
    /// City to extract.
    pub city_name: String,
    /// Country containing the city.
    pub country: String,
    /// Output coordinate reference system, `EPSG:4326` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
    /// Category name to tag filters, in document order.
    pub osm_tags: CategoryTable,
    /// Exporter options.
    #[serde(default)]
    pub export: ExportOptions,
}

/// A validated pipeline configuration.
///
/// # Examples
/// ```
/// use geotags_core::{CategorySpec, CategoryTable, GeometryClass, PipelineConfig, PipelineDocument};
///
/// let document = PipelineDocument {
///     city_name: "Ghent".into(),
///     country: "Belgium".into(),
///     crs: None,
///     osm_tags: CategoryTable(vec![(
///         "parks".into(),
///         CategorySpec::Bare(vec![geotags_core::TagFilterSpec::Shorthand("leisure=park".into())]),
///     )]),
///     export: Default::default(),
/// };
/// let config = PipelineConfig::try_from(document)?;
/// assert_eq!(config.categories[0].geometry, GeometryClass::Polygon);
/// assert_eq!(config.slug(), "ghent");
/// # Ok::<(), geotags_core::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// City to extract.
    pub city_name: String,
    /// Country containing the city.
    pub country: String,
    /// Output coordinate reference system.
    pub crs: Crs,
    /// Categories in configuration order.
    pub categories: Vec<Category>,
    /// Exporter options.
    pub export: ExportOptions,
}

impl PipelineConfig {
    /// File-name stem derived from the city name: lowercase alphanumeric
    /// runs joined by single underscores.
    #[must_use]
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.city_name.len());
        let mut pending_separator = false;
        for ch in self.city_name.chars() {
            if ch.is_alphanumeric() {
                if pending_separator && !slug.is_empty() {
                    slug.push('_');
                }
                pending_separator = false;
                slug.extend(ch.to_lowercase());
            } else {
                pending_separator = true;
            }
        }
        if slug.is_empty() {
            slug.push_str("city");
        }
        slug
    }

    /// Look up a category by name.
    #[must_use]
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Convert back into the on-disk layout.
    ///
    /// Filters are written in table form and every category states its
    /// geometry, so re-parsing the serialized document yields an equal config.
    #[must_use]
    pub fn to_document(&self) -> PipelineDocument {
        let osm_tags = self
            .categories
            .iter()
            .map(|category| {
                (
                    category.name.clone(),
                    CategorySpec::Detailed {
                        geometry: category.geometry,
                        tags: category.filters.iter().map(TagFilterSpec::from).collect(),
                    },
                )
            })
            .collect();
        PipelineDocument {
            city_name: self.city_name.clone(),
            country: self.country.clone(),
            crs: Some(self.crs.identifier().to_owned()),
            osm_tags: CategoryTable(osm_tags),
            export: self.export.clone(),
        }
    }
}

impl TryFrom<PipelineDocument> for PipelineConfig {
    type Error = ConfigError;

    fn try_from(document: PipelineDocument) -> Result<Self, Self::Error> {
        let city_name = require_text(document.city_name, "city_name")?;
        let country = require_text(document.country, "country")?;
        let crs = document
            .crs
            .as_deref()
            .map_or(Ok(Crs::default()), Crs::parse)?;
        if !is_table_identifier(&document.export.table) {
            return Err(ConfigError::InvalidTableName {
                table: document.export.table,
            });
        }
        let categories = build_categories(document.osm_tags)?;
        Ok(Self {
            city_name,
            country,
            crs,
            categories,
            export: document.export,
        })
    }
}

fn require_text(value: String, field: &'static str) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::BlankField { field });
    }
    Ok(trimmed.to_owned())
}

fn build_categories(table: CategoryTable) -> Result<Vec<Category>, ConfigError> {
    if table.0.is_empty() {
        return Err(ConfigError::NoCategories);
    }
    let mut seen = HashSet::with_capacity(table.0.len());
    let mut categories = Vec::with_capacity(table.0.len());
    for (raw_name, spec) in table.0 {
        let name = raw_name.trim().to_owned();
        if name.is_empty() {
            return Err(ConfigError::BlankCategoryName);
        }
        if !seen.insert(name.clone()) {
            return Err(ConfigError::DuplicateCategory { name });
        }
        let (geometry, specs) = spec.into_parts();
        if specs.is_empty() {
            return Err(ConfigError::EmptyCategory { category: name });
        }
        let filters = specs
            .into_iter()
            .map(|spec| build_filter(spec, &name))
            .collect::<Result<Vec<_>, _>>()?;
        categories.push(Category::new(name, geometry, filters));
    }
    Ok(categories)
}

fn build_filter(spec: TagFilterSpec, category: &str) -> Result<TagFilter, ConfigError> {
    let built = match spec {
        TagFilterSpec::Shorthand(text) => text.parse(),
        TagFilterSpec::Table { key, value } => TagFilter::new(key, value),
    };
    built.map_err(|_| ConfigError::BlankTagKey {
        category: category.to_owned(),
    })
}

fn is_table_identifier(table: &str) -> bool {
    let mut parts = table.split('.');
    let valid_part = |part: &str| {
        let mut chars = part.chars();
        part.len() <= MAX_IDENTIFIER_LEN
            && chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    match (parts.next(), parts.next(), parts.next()) {
        (Some(name), None, None) => valid_part(name),
        (Some(schema), Some(name), None) => valid_part(schema) && valid_part(name),
        _ => false,
    }
}
