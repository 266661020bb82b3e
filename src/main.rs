// Main entry point for allure-lifecycle

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use allure_lifecycle::cli::{Cli, Commands};
use allure_lifecycle::commands::{handle_completion, handle_list, handle_summary};
use allure_lifecycle::config::{self, Config};
use allure_lifecycle::logging;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if cli.verbose {
        info!("Starting allure-lifecycle v{}", env!("CARGO_PKG_VERSION"));
    }

    let loaded = Config::load();

    if cli.config {
        print_config(loaded.as_ref());
        return Ok(());
    }

    if let Some(config_file) = cli.init_config {
        let toml_content = Config::default().to_toml();
        std::fs::write(&config_file, toml_content)
            .with_context(|| format!("Failed to write {}", config_file.display()))?;
        println!("Configuration file created: {}", config_file.display());
        return Ok(());
    }

    if let Some(shell_type) = cli.completion {
        return handle_completion(&shell_type);
    }

    let config = loaded.unwrap_or_else(Config::load_or_default);
    match &cli.command {
        Some(Commands::List(args)) => handle_list(args, &config),
        Some(Commands::Summary(args)) => {
            if !handle_summary(args, &config)? {
                std::process::exit(1);
            }
            Ok(())
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

fn print_config(loaded: Option<&Config>) {
    println!("Current configuration:");
    match loaded {
        Some(cfg) => {
            println!("\n  Configuration file loaded:");
            print!("{}", indent(&cfg.to_toml()));
        }
        None => {
            println!("\n  No configuration file loaded");
            println!(
                "  Create one with: allure-lifecycle --init-config {}",
                config::CONFIG_FILE_NAME
            );
        }
    }

    println!("\n  Environment variables:");
    match std::env::var(config::ENV_RESULTS_DIRECTORY) {
        Ok(dir) => println!("    {}: {}", config::ENV_RESULTS_DIRECTORY, dir),
        Err(_) => println!(
            "    {}: not set (default: {})",
            config::ENV_RESULTS_DIRECTORY,
            config::default_directory().display()
        ),
    }

    println!("\nConfiguration precedence:");
    println!("  1. Environment variables (highest)");
    println!("  2. Configuration file");
    println!("  3. Built-in defaults (lowest)");
}

fn indent(text: &str) -> String {
    text.lines().map(|l| format!("    {}\n", l)).collect()
}
