//! Categories and the tag filters that select their features.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Geometry class a category promises to emit.
///
/// Serialized in lowercase. `area` is accepted as an alias for `polygon`.
///
/// # Examples
/// ```
/// use geotags_core::GeometryClass;
///
/// assert_eq!("area".parse::<GeometryClass>(), Ok(GeometryClass::Polygon));
/// assert_eq!(GeometryClass::Line.to_string(), "line");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryClass {
    /// Single locations.
    Point,
    /// Linear features such as paths and rivers.
    Line,
    /// Areas bounded by closed rings.
    #[serde(alias = "area")]
    Polygon,
}

impl GeometryClass {
    /// Lowercase name used in configuration files and exported properties.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Line => "line",
            Self::Polygon => "polygon",
        }
    }
}

impl fmt::Display for GeometryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown geometry class name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown geometry class {0:?} (expected point, line or polygon)")]
pub struct ParseGeometryClassError(pub String);

impl FromStr for GeometryClass {
    type Err = ParseGeometryClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "point" => Ok(Self::Point),
            "line" => Ok(Self::Line),
            "polygon" | "area" => Ok(Self::Polygon),
            _ => Err(ParseGeometryClassError(s.to_owned())),
        }
    }
}

/// OpenStreetMap attribute map. Ordered so exports are deterministic.
pub type Tags = BTreeMap<String, String>;

/// A `key=value` predicate over OSM tags.
///
/// A filter without a value matches any feature carrying the key and renders
/// as `key=*`.
///
/// # Examples
/// ```
/// use geotags_core::{TagFilter, Tags};
///
/// let filter: TagFilter = "leisure=park".parse().expect("valid filter");
/// let tags = Tags::from([("leisure".into(), "park".into())]);
/// assert_eq!(filter.matching_tag(&tags).as_deref(), Some("leisure=park"));
///
/// let wildcard = TagFilter::any_value("amenity");
/// assert_eq!(wildcard.to_string(), "amenity=*");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagFilter {
    key: String,
    value: Option<String>,
}

/// Errors raised while building a [`TagFilter`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagFilterError {
    /// The key was empty or whitespace.
    #[error("tag filter key must not be blank")]
    BlankKey,
}

impl TagFilter {
    /// Build a filter matching `key=value`. A value of `*` matches any value.
    pub fn new(key: impl Into<String>, value: Option<String>) -> Result<Self, TagFilterError> {
        let key = key.into().trim().to_owned();
        if key.is_empty() {
            return Err(TagFilterError::BlankKey);
        }
        let value = value
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty() && v != "*");
        Ok(Self { key, value })
    }

    /// Build a filter matching `key=value` from trusted literals.
    #[must_use]
    pub fn exact(key: &str, value: &str) -> Self {
        Self {
            key: key.to_owned(),
            value: Some(value.to_owned()),
        }
    }

    /// Build a filter matching any value of `key`.
    #[must_use]
    pub fn any_value(key: &str) -> Self {
        Self {
            key: key.to_owned(),
            value: None,
        }
    }

    /// The tag key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The required value, or `None` for a key wildcard.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Return the concrete `key=value` tag when `tags` satisfies the filter.
    ///
    /// For wildcard filters the value is taken from `tags`, so the result
    /// names what the feature actually carries.
    #[must_use]
    pub fn matching_tag(&self, tags: &Tags) -> Option<String> {
        let actual = tags.get(&self.key)?;
        match &self.value {
            Some(expected) if expected != actual => None,
            _ => Some(format!("{}={actual}", self.key)),
        }
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={value}", self.key),
            None => write!(f, "{}=*", self.key),
        }
    }
}

impl FromStr for TagFilter {
    type Err = TagFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, value)) => Self::new(key, Some(value.to_owned())),
            None => Self::new(s, None),
        }
    }
}

/// A named group of tag filters sharing one geometry class.
///
/// Categories are validated by [`crate::PipelineConfig`] and stay immutable
/// for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Display name, unique within a configuration.
    pub name: String,
    /// Geometry class every exported feature of this category must have.
    pub geometry: GeometryClass,
    /// Ordered, non-empty list of filters.
    pub filters: Vec<TagFilter>,
}

impl Category {
    /// Construct a category without validation.
    #[must_use]
    pub fn new(name: impl Into<String>, geometry: GeometryClass, filters: Vec<TagFilter>) -> Self {
        Self {
            name: name.into(),
            geometry,
            filters,
        }
    }
}
