// List command - print the test results of a results directory

use anyhow::{Context, Result};

use super::{results_dir, truncate_str};
use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::Config;
use crate::model::TestResult;
use crate::report::FileSystemResultsReader;

const NAME_WIDTH: usize = 60;

pub fn handle_list(args: &ListArgs, config: &Config) -> Result<()> {
    let dir = results_dir(args.path.as_deref(), config);
    let mut results = FileSystemResultsReader::new(&dir)
        .read_test_results()
        .with_context(|| format!("Failed to read results from {}", dir.display()))?;
    results.sort_by_key(|r| r.start);

    match args.format {
        OutputFormat::Json => {
            let tests: Vec<serde_json::Value> = results.iter().map(to_json).collect();
            println!("{}", serde_json::to_string_pretty(&tests)?);
        }
        OutputFormat::Text => {
            for result in &results {
                println!("{}", format_line(result));
            }
        }
    }

    Ok(())
}

fn display_name(result: &TestResult) -> &str {
    result
        .name
        .as_deref()
        .or(result.full_name.as_deref())
        .unwrap_or("<unnamed>")
}

fn format_line(result: &TestResult) -> String {
    let status = result.status.map(|s| s.as_str()).unwrap_or("unknown");
    format!(
        "{:<8} {:<width$} {}",
        status,
        truncate_str(display_name(result), NAME_WIDTH),
        result.uuid,
        width = NAME_WIDTH
    )
}

fn to_json(result: &TestResult) -> serde_json::Value {
    serde_json::json!({
        "uuid": result.uuid,
        "name": result.name,
        "fullName": result.full_name,
        "historyId": result.history_id,
        "status": result.status,
        "stage": result.stage,
        "start": result.start,
        "stop": result.stop,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;

    #[test]
    fn test_format_line() {
        let mut result = TestResult::new("u1").with_name("login works");
        result.status = Some(Status::Passed);
        let line = format_line(&result);
        assert!(line.starts_with("passed "));
        assert!(line.contains("login works"));
        assert!(line.ends_with("u1"));
    }

    #[test]
    fn test_json_uses_wire_names() {
        let result = TestResult::new("u1").with_full_name("suite.login");
        let json = to_json(&result);
        assert_eq!(json["fullName"], "suite.login");
        assert_eq!(json["stage"], "scheduled");
        assert!(json["status"].is_null());
    }
}
