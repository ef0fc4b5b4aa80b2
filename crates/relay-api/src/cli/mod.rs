//! CLI command definitions for the `relayd` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod history;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Realtime message relay with persistent history.
#[derive(Parser)]
#[command(name = "relayd", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (defaults to `config.toml` in the data directory).
    #[arg(long, global = true, env = "RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Export trace spans to stdout via OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the relay server.
    Serve {
        /// Address to bind (overrides `server.host`).
        #[arg(long, env = "RELAY_HOST")]
        host: Option<String>,

        /// Port to listen on (overrides `server.port`).
        #[arg(long, env = "RELAY_PORT")]
        port: Option<u16>,
    },

    /// Print every stored message.
    History,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_with_overrides() {
        let cli = Cli::try_parse_from(["relayd", "-vv", "serve", "--host", "127.0.0.1", "--port", "9000"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host.as_deref(), Some("127.0.0.1"));
                assert_eq!(port, Some(9000));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["relayd", "history", "--json", "--config", "/etc/relay.toml"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/relay.toml")));
        assert!(matches!(cli.command, Commands::History));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(Cli::try_parse_from(["relayd", "serve", "--port", "99999"]).is_err());
    }
}
