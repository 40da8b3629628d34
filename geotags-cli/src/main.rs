//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use geotags_cli::CliError;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match geotags_cli::run() {
        Ok(()) => {}
        // Help and version requests are reported by clap itself.
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("geotags: {err}");
            std::process::exit(1);
        }
    }
}
