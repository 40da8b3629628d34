//! Command-line interface for the geotags OSM extraction pipeline.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use log::info;

mod error;
mod run;

pub use error::CliError;

use run::RunArgs;

pub(crate) const ARG_RUN_CONFIG: &str = "config";
pub(crate) const ARG_RUN_OUTPUT_DIR: &str = "output-dir";
pub(crate) const ARG_RUN_NOMINATIM_URL: &str = "nominatim-url";
pub(crate) const ARG_RUN_OVERPASS_URL: &str = "overpass-url";
pub(crate) const ARG_RUN_USER_AGENT: &str = "user-agent";
pub(crate) const ARG_RUN_TIMEOUT_SECS: &str = "timeout-secs";
pub(crate) const ARG_RUN_MAX_RETRIES: &str = "max-retries";
pub(crate) const ENV_RUN_CONFIG: &str = "GEOTAGS_CMDS_RUN_CONFIG_FILE";

/// Run the geotags CLI with the current process arguments and environment.
///
/// # Errors
/// Any [`CliError`]; partial category failures are not errors and are
/// only logged and reported.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Run(args) => {
            let outcome = run::run_pipeline(args)?;
            info!(
                "exported {} feature(s) covering {:.2} km²; {} skipped, {} categor(y/ies) failed",
                outcome.features.len(),
                outcome.statistics.total_area_m2() / 1_000_000.0,
                outcome.report.skipped.len(),
                outcome.report.failures().count()
            );
            info!("summary report written to {}", outcome.artefacts.report);
        }
    }
    Ok(())
}

#[derive(Debug, Parser)]
#[command(
    name = "geotags",
    about = "Extract categorized OpenStreetMap features for a city",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve the city, extract every category and write the artefacts.
    Run(RunArgs),
}

#[cfg(test)]
mod tests;
