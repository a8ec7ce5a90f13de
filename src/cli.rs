//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

/// G-Node - device-management REST backend for the IoT gateway
#[derive(Parser, Debug)]
#[command(name = "gnode")]
#[command(version)]
#[command(about = "Device-management REST backend for the G-Node gateway", long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(long, short = 'c', global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Print or write a sample configuration
    ConfigGen {
        /// Write to this file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<String>,
    },
}

impl Cli {
    /// The command to run, `serve` when none is given
    pub fn command(&self) -> &Commands {
        self.command.as_ref().unwrap_or(&Commands::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_serve() {
        let cli = Cli::parse_from(["gnode"]);
        assert_eq!(cli.config, DEFAULT_CONFIG_PATH);
        assert_eq!(cli.command(), &Commands::Serve);
    }

    #[test]
    fn test_config_gen_with_output() {
        let cli = Cli::parse_from(["gnode", "-c", "/etc/gnode.toml", "config-gen", "-o", "out.toml"]);
        assert_eq!(cli.config, "/etc/gnode.toml");
        assert_eq!(
            cli.command(),
            &Commands::ConfigGen {
                output: Some("out.toml".to_string())
            }
        );
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::parse_from(["gnode", "serve", "--config", "x.toml"]);
        assert_eq!(cli.config, "x.toml");
    }
}
