// Log output for the CLI: emoji level prefix and local wall-clock time

use chrono::Local;
use tracing::{Event, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

pub struct CustomFormatter;

fn level_prefix(level: &tracing::Level) -> (&'static str, &'static str) {
    match *level {
        tracing::Level::TRACE => ("🔬", "TRACE"),
        tracing::Level::DEBUG => ("🐛", "DEBUG"),
        tracing::Level::INFO => ("ℹ️ ", "INFO"),
        tracing::Level::WARN => ("⚠️ ", "WARN"),
        tracing::Level::ERROR => ("❌", "ERROR"),
    }
}

impl<S, N> FormatEvent<S, N> for CustomFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let (emoji, level) = level_prefix(metadata.level());
        let timestamp = Local::now().format("%H:%M:%S");

        write!(writer, "{} {} [{}] {}: ", emoji, level, timestamp, metadata.target())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Default filter; `RUST_LOG` takes precedence
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "allure_lifecycle=debug,warn"
    } else {
        "allure_lifecycle=warn"
    }
}

/// Install the global subscriber writing to stderr
pub fn init(verbose: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    // A subscriber installed earlier (tests, embedding adapters) wins
    let _ = tracing_subscriber::fmt()
        .event_format(CustomFormatter)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert!(default_filter(true).contains("allure_lifecycle=debug"));
        assert_eq!(default_filter(false), "allure_lifecycle=warn");
    }

    #[test]
    fn test_level_prefix() {
        assert_eq!(level_prefix(&tracing::Level::ERROR), ("❌", "ERROR"));
        assert_eq!(level_prefix(&tracing::Level::DEBUG).1, "DEBUG");
    }
}
