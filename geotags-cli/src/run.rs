//! `run` command: the end-to-end extraction pipeline.
//!
//! Stages run strictly in order: load the pipeline configuration, resolve
//! the boundary, extract every category, normalize geometries, export and
//! report. Only the boundary lookup and file writes can abort a run; a
//! failing category is recorded and the remaining categories continue.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Local;
use clap::Parser;
use geotags_core::{
    Boundary, Feature, MapDataProvider, PipelineConfig, RunReport, extract_features, normalize,
    resolve_boundary,
};
use geotags_data::provider::{
    DEFAULT_NOMINATIM_URL, DEFAULT_OVERPASS_URL, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
use geotags_data::{
    HttpMapDataProvider, HttpMapDataProviderConfig, OutputPaths, PostgisBundle, load_config,
    write_boundary, write_feature_collection, write_postgis_bundle,
};
use geotags_report::{ReportContext, SummaryStatistics, write_report};
use log::{info, warn};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_RUN_CONFIG, ARG_RUN_MAX_RETRIES, ARG_RUN_NOMINATIM_URL, ARG_RUN_OUTPUT_DIR,
    ARG_RUN_OVERPASS_URL, ARG_RUN_TIMEOUT_SECS, ARG_RUN_USER_AGENT, CliError, ENV_RUN_CONFIG,
};

const DEFAULT_OUTPUT_DIR: &str = "output";

/// CLI arguments for the `run` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Resolve the configured city's boundary with Nominatim, query \
                 Overpass for every category's tag filters, normalize the \
                 geometries and write GeoJSON, optional PostGIS import files \
                 and an HTML summary report to the output directory.",
    about = "Extract, normalize and export the configured categories"
)]
#[ortho_config(prefix = "GEOTAGS")]
pub(crate) struct RunArgs {
    /// Pipeline configuration file (.toml, .yaml, .yml or .json).
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) config_file: Option<Utf8PathBuf>,
    /// Directory receiving the artefacts (default: `output`).
    #[arg(long = ARG_RUN_OUTPUT_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) output_dir: Option<Utf8PathBuf>,
    /// Base URL of the Nominatim service.
    #[arg(long = ARG_RUN_NOMINATIM_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) nominatim_url: Option<String>,
    /// Overpass interpreter endpoint.
    #[arg(long = ARG_RUN_OVERPASS_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) overpass_url: Option<String>,
    /// User agent sent with every request.
    #[arg(long = ARG_RUN_USER_AGENT, value_name = "agent")]
    #[serde(default)]
    pub(crate) user_agent: Option<String>,
    /// Per-request timeout in seconds.
    #[arg(long = ARG_RUN_TIMEOUT_SECS, value_name = "seconds")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// Extra attempts after a rate-limited or timed-out request.
    #[arg(long = ARG_RUN_MAX_RETRIES, value_name = "count")]
    #[serde(default)]
    pub(crate) max_retries: Option<u32>,
}

impl RunArgs {
    pub(crate) fn into_config(self) -> Result<RunConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        RunConfig::try_from(merged)
    }
}

/// Resolved `run` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunConfig {
    /// Pipeline configuration file.
    pub(crate) config_file: Utf8PathBuf,
    /// Artefact directory; created when missing.
    pub(crate) output_dir: Utf8PathBuf,
    /// Settings for the HTTP provider.
    pub(crate) provider: HttpMapDataProviderConfig,
}

impl RunConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        Self::require_existing(&self.config_file, ARG_RUN_CONFIG)?;
        match geotags_fs::file_is_file(&self.output_dir) {
            Ok(true) => Err(CliError::OutputDirectoryNotDirectory {
                path: self.output_dir.clone(),
            }),
            Ok(false) => Ok(()),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CliError::InspectSourcePath {
                field: ARG_RUN_OUTPUT_DIR,
                path: self.output_dir.clone(),
                source,
            }),
        }
    }

    fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
        match geotags_fs::file_is_file(path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CliError::SourcePathNotFile {
                field,
                path: path.to_path_buf(),
            }),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(CliError::MissingSourceFile {
                    field,
                    path: path.to_path_buf(),
                })
            }
            Err(source) => Err(CliError::InspectSourcePath {
                field,
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl TryFrom<RunArgs> for RunConfig {
    type Error = CliError;

    fn try_from(args: RunArgs) -> Result<Self, Self::Error> {
        let config_file = args.config_file.ok_or(CliError::MissingArgument {
            field: ARG_RUN_CONFIG,
            env: ENV_RUN_CONFIG,
        })?;
        let output_dir = args
            .output_dir
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_OUTPUT_DIR));

        let defaults = HttpMapDataProviderConfig::default();
        let provider = HttpMapDataProviderConfig::new(
            args.nominatim_url
                .unwrap_or_else(|| DEFAULT_NOMINATIM_URL.to_owned()),
            args.overpass_url
                .unwrap_or_else(|| DEFAULT_OVERPASS_URL.to_owned()),
        )
        .with_timeout(Duration::from_secs(
            args.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        ))
        .with_user_agent(
            args.user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
        )
        .with_retries(
            args.max_retries.unwrap_or(defaults.max_retries),
            defaults.retry_delay,
        );

        Ok(Self {
            config_file,
            output_dir,
            provider,
        })
    }
}

/// Builds the map-data provider for the current run.
pub(crate) trait ProviderBuilder {
    fn build(&self, config: &RunConfig) -> Result<Box<dyn MapDataProvider>, CliError>;
}

pub(crate) struct HttpProviderBuilder;

impl ProviderBuilder for HttpProviderBuilder {
    fn build(&self, config: &RunConfig) -> Result<Box<dyn MapDataProvider>, CliError> {
        let provider = HttpMapDataProvider::with_config(config.provider.clone())?;
        Ok(Box::new(provider))
    }
}

/// Files written by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunArtefacts {
    pub(crate) features: Utf8PathBuf,
    pub(crate) boundary: Utf8PathBuf,
    pub(crate) report: Utf8PathBuf,
    pub(crate) postgis: Option<PostgisBundle>,
}

impl RunArtefacts {
    fn file_names(&self) -> Vec<String> {
        let mut paths = vec![&self.features, &self.boundary];
        if let Some(bundle) = &self.postgis {
            paths.push(&bundle.csv);
            paths.push(&bundle.sql);
        }
        paths
            .into_iter()
            .filter_map(|path| path.file_name())
            .map(str::to_owned)
            .collect()
    }
}

/// Result of a completed run.
#[derive(Debug)]
pub(crate) struct RunOutcome {
    pub(crate) artefacts: RunArtefacts,
    pub(crate) features: Vec<Feature>,
    pub(crate) report: RunReport,
    pub(crate) statistics: SummaryStatistics,
}

pub(super) fn run_pipeline(args: RunArgs) -> Result<RunOutcome, CliError> {
    run_pipeline_with(args, &HttpProviderBuilder)
}

pub(super) fn run_pipeline_with(
    args: RunArgs,
    builder: &dyn ProviderBuilder,
) -> Result<RunOutcome, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    let pipeline = load_config(&config.config_file)?;
    info!(
        "loaded {} categor(y/ies) for {}, {} from {}",
        pipeline.categories.len(),
        pipeline.city_name,
        pipeline.country,
        config.config_file
    );

    let provider = builder.build(&config)?;
    let boundary = resolve_boundary(provider.as_ref(), &pipeline.city_name, &pipeline.country)?;
    let extraction = extract_features(provider.as_ref(), &boundary, &pipeline.categories);
    let normalized = normalize(extraction.features);
    let report = RunReport::new(extraction.outcomes, normalized.skipped);
    if report.all_failed() {
        warn!("every category failed; the export will be empty");
    }

    let artefacts = export(&config.output_dir, &pipeline, &boundary, &normalized.features)?;
    let statistics = SummaryStatistics::compute(&normalized.features, &boundary, &report)?;
    let context = ReportContext {
        city: pipeline.city_name.clone(),
        country: pipeline.country.clone(),
        crs: pipeline.crs.identifier().to_owned(),
        extraction_date: Local::now().date_naive(),
        artefacts: artefacts.file_names(),
    };
    write_report(&artefacts.report, &statistics, &context)?;

    Ok(RunOutcome {
        artefacts,
        features: normalized.features,
        report,
        statistics,
    })
}

fn export(
    output_dir: &Utf8Path,
    pipeline: &PipelineConfig,
    boundary: &Boundary,
    features: &[Feature],
) -> Result<RunArtefacts, CliError> {
    geotags_fs::ensure_dir(output_dir).map_err(|source| CliError::CreateOutputDirectory {
        path: output_dir.to_path_buf(),
        source,
    })?;
    let paths = OutputPaths::new(output_dir, pipeline.slug());
    write_feature_collection(&paths.features(), features, &pipeline.export)?;
    write_boundary(&paths.boundary(), boundary)?;
    let postgis = if pipeline.export.postgis {
        Some(write_postgis_bundle(
            &paths.postgis_csv(),
            &paths.postgis_sql(),
            features,
            &pipeline.export,
        )?)
    } else {
        None
    };
    Ok(RunArtefacts {
        features: paths.features(),
        boundary: paths.boundary(),
        report: paths.report(),
        postgis,
    })
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<RunConfig, CliError> {
    let merged = RunArgs::merge_from_layers(layers).map_err(CliError::from)?;
    RunConfig::try_from(merged)
}
