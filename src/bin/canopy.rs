//! Canopy CLI Binary
//!
//! Command-line entry point for exporting a repository tree to disk.

use canopy::logging::init_logging;
use canopy::tooling::cli::{Cli, CliContext};
use clap::Parser;
use std::process;

fn main() {
    let cli = Cli::parse();

    let context = match CliContext::new(cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    // CLI flags win over file and env settings
    let logging = context.config().logging.clone().with_overrides(
        cli.log_level.as_deref(),
        cli.log_format.as_deref(),
        cli.log_output.as_deref(),
        cli.log_file.clone(),
    );
    if let Err(e) = init_logging(Some(&logging)) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    match context.execute(&cli.command) {
        Ok(output) => {
            println!("{}", output.text);
            process::exit(output.exit_code);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
