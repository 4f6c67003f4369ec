//! storyteller - Given/When/Then narration and dispatch
//!
//! Entry point for the storyteller binary. Runs the bundled walkthrough
//! stories against a configured layer and manages configuration files.

use clap::Parser;
use tracing::{debug, info};

use storyteller::cli::{Cli, Commands, ConfigSubcommand};
use storyteller::config::{self, StoryConfig};
use storyteller::logging::{self, LogGuards};
use storyteller::{demo, naming, Result};

fn main() {
    if let Err(e) = run() {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    match cli.command {
        Commands::Config { subcommand } => {
            // Config commands use minimal logging
            logging::init_simple(tracing::Level::WARN);
            handle_config_command(subcommand)
        }
        Commands::Layers => {
            logging::init_simple(tracing::Level::WARN);
            list_layers();
            Ok(())
        }
        Commands::Run {
            config,
            layer,
            document,
            output_dir,
        } => {
            let mut config = StoryConfig::load(config.as_deref())?;
            apply_cli_overrides(&mut config, layer, document, output_dir)?;

            // The guards must be kept alive until the stories are written
            let _log_guards = init_logging_from_config(&config, cli.verbose, cli.quiet)?;
            info!(
                version = env!("CARGO_PKG_VERSION"),
                layer = ?config.story.layer,
                "Starting storyteller"
            );
            run_walkthrough(config)
        }
    }
}

/// CLI flags win over file and environment settings.
fn apply_cli_overrides(
    config: &mut StoryConfig,
    layer: Option<String>,
    document: Option<bool>,
    output_dir: Option<String>,
) -> Result<()> {
    if let Some(layer) = layer {
        config.story.layer = Some(layer);
    }
    if let Some(enabled) = document {
        config.document.enabled = enabled;
    }
    if let Some(dir) = output_dir {
        config.document.output_dir = dir;
    }
    config.validate()
}

fn init_logging_from_config(config: &StoryConfig, verbose: u8, quiet: bool) -> Result<LogGuards> {
    logging::init_logging(&config.logging, verbose, quiet)
}

/// Tell both walkthrough stories, then list the documents written.
fn run_walkthrough(config: StoryConfig) -> Result<()> {
    let feature = demo::feature(config);
    let locations = demo::run(&feature)?;
    debug!(documents = locations.len(), "Walkthrough finished");

    for location in locations {
        println!("Story written to {}", location);
    }
    Ok(())
}

fn list_layers() {
    for registration in demo::registry().registrations() {
        println!(
            "{:<12} {:<14} {}",
            naming::short_type_name(registration.persona),
            registration.layer.as_deref().unwrap_or("(default)"),
            naming::short_type_name(registration.performer)
        );
    }
}

fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = StoryConfig::load(config.as_deref())?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration written to {}", written.display());
        }
        ConfigSubcommand::Validate { config } => match StoryConfig::load(config.as_deref()) {
            Ok(_) => {
                println!("Configuration is valid.");
            }
            Err(e) => {
                eprint!("{}", e.format_for_terminal());
                std::process::exit(e.exit_code());
            }
        },
    }

    Ok(())
}
