use std::path::PathBuf;
use thiserror::Error;

use crate::api::ApiError;
use crate::cdp::CdpError;
use crate::gcp::GcpError;
use crate::report::ReportError;

/// Top-level error for every `cdp-ctl` command
#[derive(Error, Debug)]
pub enum InsightsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("CDP CLI error: {0}")]
    Cdp(#[from] CdpError),

    #[error("{service} error: {source}")]
    Api {
        service: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("Google Cloud error: {0}")]
    Gcp(#[from] GcpError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Aborted(String),
}

impl InsightsError {
    /// Attach the name of the remote service to a REST failure
    pub fn api(service: &'static str) -> impl FnOnce(ApiError) -> Self {
        move |source| InsightsError::Api { service, source }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {reason}", path.display())]
    ParseError { path: PathBuf, reason: String },

    #[error("Failed to serialize configuration: {0}")]
    ParsingFailed(String),

    #[error("Missing setting `{0}` (set it in the config file or environment)")]
    MissingValue(String),

    #[error("Invalid setting `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },
}

pub type Result<T> = std::result::Result<T, InsightsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_carries_service_name() {
        let err = InsightsError::api("Kibana")(ApiError::Unauthorized);
        let text = err.to_string();
        assert!(text.starts_with("Kibana error"));
        assert!(text.contains("Not authenticated"));
    }

    #[test]
    fn test_missing_value_message() {
        let err: InsightsError = ConfigError::MissingValue("jira.url".into()).into();
        assert!(err.to_string().contains("jira.url"));
    }
}
