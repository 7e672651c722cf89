//! CLI argument definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use harmonia_bn::logging::{LogFormat, LogLevel};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "harmonia")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Run configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Seed for the search RNG
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Seed for the synthetic data (network CPTs and samples)
    #[arg(long)]
    pub data_seed: Option<u64>,

    /// Number of sampled observations
    #[arg(short, long)]
    pub rows: Option<usize>,

    /// Number of improvisations
    #[arg(short, long)]
    pub iters: Option<usize>,

    /// Harmony memory size
    #[arg(long)]
    pub hms: Option<usize>,

    /// Inject a random network every N iterations
    #[arg(long, value_name = "N")]
    pub amnesia: Option<usize>,

    /// Stop once the best log-likelihood reaches this value
    #[arg(long, allow_hyphen_values = true)]
    pub target: Option<f64>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only, no summary header)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "compact", global = true)]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn log_level(&self) -> LogLevel {
        if self.quiet {
            return LogLevel::Error;
        }
        match self.verbose {
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configuration file management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Show the configuration file path
    Path,
    /// Write the default configuration file
    Init,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    /// Multi-line with colors
    Pretty,
    /// Single line
    Compact,
    /// Newline-delimited JSON
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}
