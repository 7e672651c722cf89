//! harmonia CLI - Bayesian network structure learning by harmony search
//!
//! Samples observations from a ground-truth network, learns a structure
//! from them and compares the result with the truth.

mod cli;
mod config;
mod learn;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use harmonia_bn::logging::init_tracing;

use cli::{Cli, Commands, ConfigCommand};
use config::RunConfig;
use output::{enable_colors, print_error, print_info, print_success};

fn main() {
    if let Err(e) = run() {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    enable_colors(!cli.no_color);

    if let Some(Commands::Config { command }) = &cli.command {
        return handle_config_command(command, &cli);
    }

    let config = load_config(&cli)?;
    enable_colors(config.colored);
    init_tracing(cli.log_format.into(), cli.log_level()).context("Failed to initialize logging")?;

    let report = learn::execute(&config)?;
    learn::print_report(&report, cli.quiet);
    Ok(())
}

/// Load configuration and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<RunConfig> {
    let mut config = RunConfig::resolve(cli.config.as_deref())?;
    apply_overrides(cli, &mut config);
    if cli.no_color {
        config.colored = false;
    }
    Ok(config)
}

fn apply_overrides(cli: &Cli, config: &mut RunConfig) {
    if let Some(seed) = cli.seed {
        config.search.seed = Some(seed);
    }
    if let Some(seed) = cli.data_seed {
        config.data.seed = Some(seed);
    }
    if let Some(rows) = cli.rows {
        config.data.rows = rows;
    }
    if let Some(iters) = cli.iters {
        config.search.max_iters = iters;
    }
    if let Some(hms) = cli.hms {
        config.search.hms = hms;
    }
    if let Some(period) = cli.amnesia {
        config.search.amnesia = Some(period);
    }
    if let Some(target) = cli.target {
        config.search.target_quality = Some(target);
    }
}

fn handle_config_command(command: &ConfigCommand, cli: &Cli) -> Result<()> {
    let path = cli.config.clone().unwrap_or_else(RunConfig::config_path);

    match command {
        ConfigCommand::Show => {
            let config = load_config(cli)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
        }
        ConfigCommand::Path => {
            println!("{}", path.display());
            if !path.exists() {
                print_info("File does not exist; built-in defaults are used");
            }
        }
        ConfigCommand::Init => {
            RunConfig::create_default(&path)?;
            print_success(&format!("Created config file: {}", path.display()));
        }
    }

    Ok(())
}
