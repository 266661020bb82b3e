// Commands module - handles CLI command execution

use anyhow::Result;
use std::path::{Path, PathBuf};

pub mod list;
pub mod summary;

pub use list::handle_list;
pub use summary::handle_summary;

use crate::config::Config;

/// Handle shell completion
pub fn handle_completion(shell_type: &str) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{Shell, generate};

    let shell = match shell_type.to_lowercase().as_str() {
        "bash" => Shell::Bash,
        "zsh" => Shell::Zsh,
        "fish" => Shell::Fish,
        "powershell" => Shell::PowerShell,
        _ => {
            anyhow::bail!(
                "Unsupported shell: {}. Supported: bash, zsh, fish, powershell",
                shell_type
            );
        }
    };

    let mut cmd = crate::cli::Cli::command();
    let name = cmd.get_name().to_string();
    let mut stdout = std::io::stdout();

    generate(shell, &mut cmd, name, &mut stdout);

    Ok(())
}

/// Explicit path, or the configured results directory
pub fn results_dir(path: Option<&Path>, config: &Config) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| config.results.directory.clone())
}

/// Truncate string to max length with ellipsis
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("a long test name", 9), "a long...");
    }

    #[test]
    fn test_results_dir_prefers_explicit_path() {
        let config = Config::default();
        assert_eq!(results_dir(Some(Path::new("out")), &config), PathBuf::from("out"));
        assert_eq!(results_dir(None, &config), config.results.directory);
    }
}
