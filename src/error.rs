use thiserror::Error;
use time::Date;

/// Failures reported by a browser driver.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("network error: {0}")]
    Network(String),

    #[error("navigation to {url} timed out after {ms}ms")]
    Timeout { url: String, ms: u64 },

    #[error("robots.txt disallows {0}")]
    RobotsDisallowed(String),

    #[error("control {0} has no navigable target")]
    NotNavigable(String),

    #[error("no page loaded")]
    NoPage,

    #[error("browser error: {0}")]
    Browser(String),
}

impl From<reqwest::Error> for DriverError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DriverError::Timeout {
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
                ms: 0,
            }
        } else {
            DriverError::Network(err.to_string())
        }
    }
}

/// A source profile that cannot be compiled into an adapter.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },

    #[error("{0} needs at least one strategy")]
    EmptyPlan(&'static str),

    #[error("invalid url template {template:?}: {reason}")]
    Template { template: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("start date {start} is after end date {end}")]
    Inverted { start: Date, end: Date },

    #[error("dates must be in YYYY-MM-DD format, got {0:?}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: {value:?}")]
    Env { var: &'static str, value: String },

    #[error(transparent)]
    Profile(#[from] ProfileError),
}
