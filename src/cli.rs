//! CLI argument parsing and command definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// A slim CLI for Oekofen pellet heating controllers
#[derive(Debug, Parser)]
#[command(
    name = "oekofen",
    author,
    version,
    about = "A slim CLI for Oekofen pellet heating controllers",
    propagate_version = true,
    after_help = "Use 'oekofen <command> --help' for more information about a command."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,
    #[command(subcommand)]
    pub command: Command,
}

/// Global options available to all commands
#[derive(Debug, Clone, Args)]
pub struct GlobalOpts {
    /// Output format (json, yaml, table, auto)
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        global = true,
        conflicts_with = "json"
    )]
    pub output_format: Option<OutputFormat>,

    /// Output as JSON (shorthand for -o json)
    #[arg(long, global = true)]
    pub json: bool,

    /// Controller host name or IP address
    #[arg(short = 'H', long, env = "OEKOFEN_HOST", global = true)]
    pub host: Option<String>,

    /// JSON interface port
    #[arg(long, env = "OEKOFEN_PORT", global = true)]
    pub port: Option<u16>,

    /// JSON interface password
    #[arg(long, env = "OEKOFEN_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Do not retry failed requests
    #[arg(long, global = true)]
    pub no_retry: bool,

    /// Override config file path
    #[arg(long, value_name = "PATH", env = "OEKOFEN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Reduce output to only errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase logging verbosity (stackable: -v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Enable debug logging (equivalent to -vv)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Enable trace logging
    #[arg(long, global = true)]
    pub trace: bool,

    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Hide table headers
    #[arg(long, global = true)]
    pub no_headers: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[non_exhaustive]
pub enum OutputFormat {
    Json,
    Yaml,
    Table,
    Auto,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show boiler, heating circuit and weather summary
    Status,

    /// List flattened values with optional filter
    List {
        /// Filter by key (fuzzy match), e.g. "hk1 temp"
        filter: Option<String>,
    },

    /// Show one attribute with unit, bounds and choices
    Get {
        /// Attribute key (e.g., hk1.temp_heat)
        key: String,
    },

    /// Write a controllable attribute
    Set {
        /// Attribute key (e.g., hk1.temp_heat)
        key: String,

        /// New value in human units (e.g., 21.5 or a choice label)
        value: String,

        /// Value is already in device units (e.g., 215 for 21.5 °C)
        #[arg(long)]
        raw: bool,
    },

    /// Print the complete flattened data
    Dump,

    /// Show the newest sample of the CSV log
    Log,

    /// Show the JSON interface version
    Version,

    /// Inspect and manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show effective configuration
    Show,

    /// Print config file path
    Path,

    /// Get a specific configuration value
    Get {
        /// Configuration key (dot-separated path)
        key: Option<String>,
    },

    /// Reset configuration to defaults
    Reset,
}
