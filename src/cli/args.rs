// CLI argument definitions using Clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format of the `list` command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Inspect Allure result directories
#[derive(Parser, Debug)]
#[command(name = "allure-lifecycle")]
#[command(author = "allure-lifecycle contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect test results recorded in Allure format", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose debug output
    #[arg(short = 'v', long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Show current configuration and exit
    #[arg(long, default_value_t = false)]
    pub config: bool,

    /// Create default configuration file
    #[arg(long, value_name = "CONFIG_FILE")]
    pub init_config: Option<PathBuf>,

    /// Print shell completion (bash, zsh, fish, powershell)
    #[arg(long, value_name = "SHELL_TYPE", value_parser = ["bash", "zsh", "fish", "powershell"])]
    pub completion: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List test results of a results directory
    List(ListArgs),

    /// Count results by status; fails when any test failed or broke
    Summary(SummaryArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Results directory (defaults to the configured one)
    #[arg(required = false)]
    pub path: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct SummaryArgs {
    /// Results directory (defaults to the configured one)
    #[arg(required = false)]
    pub path: Option<PathBuf>,
}
