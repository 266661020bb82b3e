// Helpers for building labels, links and status details

use crate::config::Config;
use crate::model::{Label, Link, Status, StatusDetails, label_names};
use std::any::Any;
use std::error::Error as StdError;
use std::fmt::Write as _;

pub const ENV_HOST_NAME: &str = "ALLURE_HOST_NAME";
pub const ENV_THREAD_NAME: &str = "ALLURE_THREAD_NAME";

/// First value that is present and not empty
pub fn first_non_empty<'a>(items: impl IntoIterator<Item = Option<&'a str>>) -> Option<&'a str> {
    items.into_iter().flatten().find(|s| !s.is_empty())
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

pub fn host_name(config: &Config) -> String {
    config
        .labels
        .host
        .clone()
        .or_else(|| env_non_empty(ENV_HOST_NAME))
        .or_else(|| env_non_empty("HOSTNAME"))
        .unwrap_or_else(|| "default".to_string())
}

pub fn thread_name(config: &Config) -> String {
    config
        .labels
        .thread
        .clone()
        .or_else(|| env_non_empty(ENV_THREAD_NAME))
        .unwrap_or_else(|| {
            let current = std::thread::current();
            format!(
                "{}.{}({:?})",
                std::process::id(),
                current.name().unwrap_or("unnamed"),
                current.id()
            )
        })
}

pub fn host_label(config: &Config) -> Label {
    Label::new(label_names::HOST, host_name(config))
}

pub fn thread_label(config: &Config) -> Label {
    Label::new(label_names::THREAD, thread_name(config))
}

/// Build a link, resolving its url from the configured pattern for `link_type`
pub fn create_link(
    value: Option<&str>,
    name: Option<&str>,
    url: Option<&str>,
    link_type: Option<&str>,
    config: &Config,
) -> Link {
    let resolved_name = first_non_empty([value, name]).map(str::to_string);
    let resolved_url = first_non_empty([url]).map(str::to_string).or_else(|| {
        let pattern = config.link_pattern(link_type?)?;
        Some(pattern.replace("{}", resolved_name.as_deref().unwrap_or("")))
    });
    Link {
        name: resolved_name,
        url: resolved_url,
        link_type: link_type.map(str::to_string),
    }
}

/// Details from an error: message from `Display`, trace from the source chain
pub fn status_details_from_error(error: &(dyn StdError + 'static)) -> StatusDetails {
    let mut trace = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(trace, "\nCaused by: {}", cause);
        source = cause.source();
    }
    StatusDetails::default()
        .with_message(error.to_string())
        .with_trace(trace)
}

/// Message carried by a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

/// A panic inside test code is an assertion failure
pub fn status_from_panic(payload: &(dyn Any + Send)) -> (Status, StatusDetails) {
    (
        Status::Failed,
        StatusDetails::default().with_message(panic_message(payload)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl std::fmt::Display for Outer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("request failed")
        }
    }

    impl StdError for Outer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_first_non_empty() {
        assert_eq!(first_non_empty([None, Some(""), Some("x")]), Some("x"));
        assert_eq!(first_non_empty([None, Some("")]), None);
    }

    #[test]
    fn test_create_link_from_pattern() {
        let config = Config::parse("[links]\nissue = \"https://jira/browse/{}\"\n").unwrap();
        let link = create_link(Some("ABC-1"), None, None, Some("issue"), &config);

        assert_eq!(link.name.as_deref(), Some("ABC-1"));
        assert_eq!(link.url.as_deref(), Some("https://jira/browse/ABC-1"));
        assert_eq!(link.link_type.as_deref(), Some("issue"));
    }

    #[test]
    fn test_create_link_explicit_url_wins() {
        let config = Config::parse("[links]\nissue = \"https://jira/browse/{}\"\n").unwrap();
        let link = create_link(
            None,
            Some("docs"),
            Some("https://example.com"),
            Some("issue"),
            &config,
        );
        assert_eq!(link.name.as_deref(), Some("docs"));
        assert_eq!(link.url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_create_link_without_pattern() {
        let link = create_link(Some("T-9"), None, None, Some("tms"), &Config::default());
        assert!(link.url.is_none());
    }

    #[test]
    fn test_status_details_include_cause_chain() {
        let error = Outer(std::io::Error::other("connection reset"));
        let details = status_details_from_error(&error);

        assert_eq!(details.message.as_deref(), Some("request failed"));
        let trace = details.trace.unwrap();
        assert!(trace.contains("Caused by: connection reset"));
    }

    #[test]
    fn test_status_from_panic_payloads() {
        let (status, details) = status_from_panic(&"assertion failed");
        assert_eq!(status, Status::Failed);
        assert_eq!(details.message.as_deref(), Some("assertion failed"));

        let owned: Box<dyn Any + Send> = Box::new(String::from("left != right"));
        assert_eq!(panic_message(owned.as_ref()), "left != right");
        assert_eq!(panic_message(&42_u8), "panic with a non-string payload");
    }

    #[test]
    fn test_configured_host_label() {
        let config = Config::parse("[labels]\nhost = \"builder\"\n").unwrap();
        assert_eq!(host_label(&config), Label::new("host", "builder"));
    }
}
