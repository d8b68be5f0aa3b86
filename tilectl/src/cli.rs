use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tilectl")]
#[command(version, about = "Boot and inspect a fail-fast tile topology", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Boot the pipeline described by a config file
    sudo tilectl --config tilerun.toml run

    # Check permissions and kernel features without booting
    tilectl --config tilerun.toml check

    # Show which tile lands on which cpu
    tilectl --config tilerun.toml topology
    tilectl --config tilerun.toml topology --json
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML); built-in defaults when omitted
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Boot every tile and supervise until one of them exits
    Run,

    /// Check capabilities and resource limits a run needs
    Check,

    /// Print the spawn order with cpu placement
    Topology {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["tilectl", "topology", "--json", "-c", "x.toml", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Commands::Topology { json: true }));
    }
}
