//! Welzijn CLI - Corona & Welzijn survey preparation.

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Recode {
            file,
            output,
            codebook,
            config,
        } => commands::recode::run(file, output, codebook, config, cli.verbose),

        Commands::Report {
            file,
            json,
            output,
            codebook,
            config,
        } => commands::report::run(file, json, output, codebook, config),

        Commands::Codebook { output } => commands::codebook::run(output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
