//! tilectl: boot and inspect a tilerun tile topology

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};
use console::style;

fn fail(err: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", style("error:").red().bold(), err);
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    let config = commands::load_config(cli.config.as_deref()).unwrap_or_else(|e| fail(e));

    // Only `run` writes to the configured log file; inspection commands
    // log to the terminal.
    let log_path = match cli.command {
        Commands::Run => config.log.path.as_deref(),
        _ => None,
    };
    let log_fd = logging::init_logger(cli.verbose, &config.log.level, log_path)
        .unwrap_or_else(|e| fail(e));

    match cli.command {
        Commands::Run => {
            if let Err(e) = commands::run(&config, log_fd) {
                fail(e);
            }
        }
        Commands::Check => {
            if !commands::check(&config) {
                std::process::exit(1);
            }
        }
        Commands::Topology { json } => {
            if let Err(e) = commands::print_topology(&config, json) {
                fail(e);
            }
        }
    }
}
