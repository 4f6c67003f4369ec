//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for storyteller.

use clap::{Parser, Subcommand};

/// storyteller - Given/When/Then narration and dispatch for acceptance tests
///
/// Runs the bundled customer-registration walkthrough against a chosen layer,
/// lists the layers it has performers for, and manages configuration files.
#[derive(Parser, Debug)]
#[command(name = "storyteller")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the walkthrough story
    Run {
        /// Path to configuration file
        #[arg(short, long, env = "STORYTELLER_CONFIG")]
        config: Option<String>,

        /// Layer whose performers play the personas (e.g. presentation, rest_api)
        #[arg(short, long)]
        layer: Option<String>,

        /// Write the HTML document (true/false)
        #[arg(long)]
        document: Option<bool>,

        /// Directory for HTML documents
        #[arg(short, long)]
        output_dir: Option<String>,
    },

    /// List the layers the walkthrough has performers for
    Layers,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::parse_from(["storyteller", "run"]);
        match cli.command {
            Commands::Run { config, layer, document, output_dir } => {
                assert!(config.is_none());
                assert!(layer.is_none());
                assert!(document.is_none());
                assert!(output_dir.is_none());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_with_options() {
        let cli = Cli::parse_from([
            "storyteller",
            "run",
            "--layer",
            "rest_api",
            "--document",
            "false",
            "--output-dir",
            "/tmp/stories",
        ]);
        match cli.command {
            Commands::Run { layer, document, output_dir, .. } => {
                assert_eq!(layer, Some("rest_api".to_string()));
                assert_eq!(document, Some(false));
                assert_eq!(output_dir, Some("/tmp/stories".to_string()));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_with_config() {
        let cli = Cli::parse_from(["storyteller", "run", "--config", "/path/to/storyteller.toml"]);
        match cli.command {
            Commands::Run { config, .. } => {
                assert_eq!(config, Some("/path/to/storyteller.toml".to_string()));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_layers_command() {
        let cli = Cli::parse_from(["storyteller", "layers"]);
        assert!(matches!(cli.command, Commands::Layers));
    }

    #[test]
    fn test_verbose_flags() {
        let cli = Cli::parse_from(["storyteller", "-vv", "layers"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_quiet_flag() {
        let cli = Cli::parse_from(["storyteller", "--quiet", "layers"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_config_show() {
        let cli = Cli::parse_from(["storyteller", "config", "show"]);
        match cli.command {
            Commands::Config { subcommand: ConfigSubcommand::Show { config } } => {
                assert!(config.is_none());
            }
            _ => panic!("Expected Config Show command"),
        }
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["storyteller", "config", "init", "--force"]);
        match cli.command {
            Commands::Config { subcommand: ConfigSubcommand::Init { path, force } } => {
                assert!(path.is_none());
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }
}
