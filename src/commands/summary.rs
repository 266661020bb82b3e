// Summary command - count results by status

use anyhow::{Context, Result};
use console::Style;
use std::collections::BTreeMap;

use super::results_dir;
use crate::cli::args::SummaryArgs;
use crate::config::Config;
use crate::model::{Status, TestResult};
use crate::report::FileSystemResultsReader;

/// Result counts of a results directory
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub by_status: BTreeMap<&'static str, usize>,
    pub containers: usize,
    pub unsuccessful: usize,
}

impl Summary {
    pub fn from_results(results: &[TestResult], containers: usize) -> Self {
        let mut summary = Summary {
            total: results.len(),
            containers,
            ..Self::default()
        };
        for result in results {
            let status = result.status.unwrap_or(Status::Unknown);
            *summary.by_status.entry(status.as_str()).or_default() += 1;
            if status.is_unsuccessful() {
                summary.unsuccessful += 1;
            }
        }
        summary
    }

    pub fn is_successful(&self) -> bool {
        self.unsuccessful == 0
    }
}

fn style_for(status: &str) -> Style {
    match status {
        "passed" => Style::new().green(),
        "failed" => Style::new().red(),
        "broken" => Style::new().yellow(),
        "skipped" => Style::new().dim(),
        _ => Style::new(),
    }
}

/// Print the summary; returns whether every result succeeded
pub fn handle_summary(args: &SummaryArgs, config: &Config) -> Result<bool> {
    let dir = results_dir(args.path.as_deref(), config);
    let reader = FileSystemResultsReader::new(&dir);
    let results = reader
        .read_test_results()
        .with_context(|| format!("Failed to read results from {}", dir.display()))?;
    let containers = reader
        .read_containers()
        .with_context(|| format!("Failed to read containers from {}", dir.display()))?;

    let summary = Summary::from_results(&results, containers.len());

    println!("Results in {}", dir.display());
    for (status, count) in &summary.by_status {
        println!("  {:<8} {}", style_for(status).apply_to(status), count);
    }
    println!("  {:<8} {}", "total", summary.total);
    println!("  {:<8} {}", "containers", summary.containers);

    Ok(summary.is_successful())
}
