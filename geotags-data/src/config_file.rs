//! Reading pipeline configuration files.
//!
//! The format follows the file extension: `.toml`, `.yaml`/`.yml` or `.json`.
//! Parsing yields a [`PipelineDocument`] which is then validated into a
//! [`PipelineConfig`].

use std::io::Read;

use camino::{Utf8Path, Utf8PathBuf};
use geotags_core::{ConfigError, PipelineConfig, PipelineDocument};
use log::debug;
use thiserror::Error;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML.
    Toml,
    /// YAML.
    Yaml,
    /// JSON.
    Json,
}

impl ConfigFormat {
    /// Choose a format from the file extension, case-insensitively.
    #[must_use]
    pub fn from_path(path: &Utf8Path) -> Option<Self> {
        match path.extension()?.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    /// The extension names no supported format.
    #[error("unsupported configuration format for {path:?} (expected .toml, .yaml, .yml or .json)")]
    UnsupportedFormat {
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// The file could not be read.
    #[error("failed to read configuration {path:?}: {source}")]
    Read {
        /// Configuration path.
        path: Utf8PathBuf,
        /// IO failure.
        #[source]
        source: std::io::Error,
    },
    /// TOML syntax or schema error.
    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
    /// YAML syntax or schema error.
    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// JSON syntax or schema error.
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// Serializing a configuration back to TOML failed.
    #[error("failed to render TOML configuration: {0}")]
    RenderToml(#[from] toml::ser::Error),
    /// The document parsed but failed validation.
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Load and validate the configuration at `path`.
///
/// # Errors
/// See [`ConfigLoadError`]. Nothing besides reading the file happens.
pub fn load_config(path: &Utf8Path) -> Result<PipelineConfig, ConfigLoadError> {
    let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigLoadError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let read_error = |source| ConfigLoadError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut file = geotags_fs::open_utf8_file(path).map_err(read_error)?;
    let mut text = String::new();
    file.read_to_string(&mut text).map_err(read_error)?;
    debug!("loaded {} bytes of {format:?} configuration from {path}", text.len());
    parse_config(&text, format)
}

/// Parse and validate configuration text.
///
/// # Errors
/// Syntax errors in `format` or [`ConfigError`] validation failures.
pub fn parse_config(text: &str, format: ConfigFormat) -> Result<PipelineConfig, ConfigLoadError> {
    let document: PipelineDocument = match format {
        ConfigFormat::Toml => toml::from_str(text)?,
        ConfigFormat::Yaml => serde_yaml::from_str(text)?,
        ConfigFormat::Json => serde_json::from_str(text)?,
    };
    Ok(PipelineConfig::try_from(document)?)
}

/// Serialize `config` in `format`. Parsing the result yields an equal config.
///
/// # Errors
/// Serializer failures.
pub fn render_config(config: &PipelineConfig, format: ConfigFormat) -> Result<String, ConfigLoadError> {
    let document = config.to_document();
    Ok(match format {
        ConfigFormat::Toml => toml::to_string(&document)?,
        ConfigFormat::Yaml => serde_yaml::to_string(&document)?,
        ConfigFormat::Json => serde_json::to_string_pretty(&document)?,
    })
}
