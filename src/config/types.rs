use crate::cdp::MAX_HISTORY_DAYS;
use crate::error::ConfigError;
use crate::usage::forecast::{ForecastMethod, MAX_HORIZON_DAYS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
///
/// Every section has defaults so a partial file (or none at all) is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cdp: CdpConfig,
    pub elasticsearch: ElasticsearchConfig,
    pub kibana: KibanaConfig,
    pub indices: IndexConfig,
    pub forecast: ForecastConfig,
    pub gcp: GcpConfig,
    pub jira: JiraConfig,
    pub confluence: ConfluenceConfig,
    pub report: ReportConfig,
}

/// CDP CLI invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CdpConfig {
    /// Path to the `cdp` executable
    pub cli_path: String,
    /// Records requested per page
    pub page_size: u32,
    /// Hard cap on pages fetched per run
    pub max_pages: u32,
    /// Trailing window of usage to collect
    pub history_days: i64,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            cli_path: "cdp".to_string(),
            page_size: 1000,
            max_pages: 100,
            history_days: 30,
        }
    }
}

/// Elasticsearch connection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticsearchConfig {
    pub url: String,
    pub username: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
}

/// Kibana connection. Credentials fall back to the Elasticsearch ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KibanaConfig {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Index name prefixes; the ingestion date is appended as `-YYYY.MM.DD`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub records: String,
    pub summary: String,
    pub forecast: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            records: "cdp-consumption-records".to_string(),
            summary: "cdp-consumption-summary".to_string(),
            forecast: "cdp-consumption-forecast".to_string(),
        }
    }
}

/// Forecast settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Days to predict
    pub days: usize,
    /// Days of history required before forecasting
    pub min_history: usize,
    /// Relative half-width of the linear confidence band
    pub confidence_interval: f64,
    /// Model used when the command line does not choose one
    pub method: ForecastMethod,
    /// Clusters that get an individual forecast next to the total
    pub top_clusters: Vec<String>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            days: 7,
            min_history: 7,
            confidence_interval: 0.1,
            method: ForecastMethod::Linear,
            top_clusters: Vec::new(),
        }
    }
}

/// Google Cloud settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GcpConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Restrict instance listings to zones of this region
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Static access token; otherwise `gcloud auth print-access-token` is used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub gcloud_path: String,
}

impl Default for GcpConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            region: None,
            access_token: None,
            gcloud_path: "gcloud".to_string(),
        }
    }
}

/// Jira Cloud settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JiraConfig {
    pub url: String,
    pub username: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_token: String,
}

/// Confluence Cloud settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfluenceConfig {
    /// Base URL including `/wiki`
    pub url: String,
    pub username: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_token: String,
    pub space_key: String,
    /// Parent page for published reports, by id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_page_id: Option<String>,
    /// Parent page for published reports, by title (used when no id is set)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_page_title: Option<String>,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            api_token: String::new(),
            space_key: "CDP".to_string(),
            parent_page_id: None,
            parent_page_title: None,
        }
    }
}

/// HTML report settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Logo embedded in the report header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_path: Option<PathBuf>,
    pub cdp_output: PathBuf,
    pub gcp_output: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            logo_path: None,
            cdp_output: PathBuf::from("cdp_dashboard.html"),
            gcp_output: PathBuf::from("gcp_dashboard.html"),
        }
    }
}

impl Config {
    /// Apply credential overrides from the environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply credential overrides from an arbitrary lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CDP_INSIGHTS_ES_URL") {
            self.elasticsearch.url = v;
        }
        if let Some(v) = lookup("CDP_INSIGHTS_ES_USERNAME") {
            self.elasticsearch.username = v;
        }
        if let Some(v) = lookup("CDP_INSIGHTS_ES_PASSWORD") {
            self.elasticsearch.password = v;
        }
        if let Some(v) = lookup("CDP_INSIGHTS_KIBANA_URL") {
            self.kibana.url = v;
        }
        if let Some(v) = lookup("CDP_INSIGHTS_JIRA_TOKEN") {
            self.jira.api_token = v;
        }
        if let Some(v) = lookup("CDP_INSIGHTS_CONFLUENCE_TOKEN") {
            self.confluence.api_token = v;
        }
        if let Some(v) = lookup("CDP_INSIGHTS_GCP_TOKEN") {
            self.gcp.access_token = Some(v);
        }
        if let Some(v) = lookup("CDP_INSIGHTS_CDP_CLI") {
            self.cdp.cli_path = v;
        }
    }

    /// Reject values the collectors cannot turn into a query window
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_HISTORY_DAYS).contains(&self.cdp.history_days) {
            return Err(ConfigError::InvalidValue {
                key: "cdp.history_days".to_string(),
                reason: format!("must be between 1 and {}", MAX_HISTORY_DAYS),
            });
        }
        if !(1..=MAX_HORIZON_DAYS).contains(&self.forecast.days) {
            return Err(ConfigError::InvalidValue {
                key: "forecast.days".to_string(),
                reason: format!("must be between 1 and {}", MAX_HORIZON_DAYS),
            });
        }
        Ok(())
    }

    /// Kibana credentials, falling back to the Elasticsearch user
    pub fn kibana_credentials(&self) -> (String, String) {
        let username = self
            .kibana
            .username
            .clone()
            .unwrap_or_else(|| self.elasticsearch.username.clone());
        let password = self
            .kibana
            .password
            .clone()
            .unwrap_or_else(|| self.elasticsearch.password.clone());
        (username, password)
    }

    /// Copy of the configuration with secrets masked, for display
    pub fn redacted(&self) -> Config {
        fn mask(secret: &str) -> String {
            if secret.is_empty() {
                String::new()
            } else {
                "********".to_string()
            }
        }

        let mut copy = self.clone();
        copy.elasticsearch.password = mask(&copy.elasticsearch.password);
        copy.kibana.password = copy.kibana.password.as_deref().map(mask);
        copy.jira.api_token = mask(&copy.jira.api_token);
        copy.confluence.api_token = mask(&copy.confluence.api_token);
        copy.gcp.access_token = copy.gcp.access_token.as_deref().map(mask);
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_ingestion_conventions() {
        let config = Config::default();
        assert_eq!(config.cdp.page_size, 1000);
        assert_eq!(config.cdp.max_pages, 100);
        assert_eq!(config.cdp.history_days, 30);
        assert_eq!(config.indices.records, "cdp-consumption-records");
        assert_eq!(config.forecast.days, 7);
        assert!((config.forecast.confidence_interval - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [elasticsearch]
            url = "https://es.example.com"
            username = "infra"

            [forecast]
            method = "seasonal"
            top_clusters = ["prod-datahub"]
            "#,
        )
        .unwrap();

        assert_eq!(config.elasticsearch.url, "https://es.example.com");
        assert_eq!(config.forecast.method, ForecastMethod::Seasonal);
        assert_eq!(config.forecast.days, 7);
        assert_eq!(config.forecast.top_clusters, vec!["prod-datahub"]);
        assert_eq!(config.cdp.cli_path, "cdp");
    }

    #[test]
    fn test_validate_day_counts() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.cdp.history_days = -5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cdp.history_days"));

        let mut config = Config::default();
        config.forecast.days = 0;
        assert!(config.validate().is_err());
        config.forecast.days = MAX_HORIZON_DAYS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CDP_INSIGHTS_ES_PASSWORD", "s3cret"),
            ("CDP_INSIGHTS_GCP_TOKEN", "ya29.token"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.elasticsearch.password, "s3cret");
        assert_eq!(config.gcp.access_token.as_deref(), Some("ya29.token"));
        assert!(config.jira.api_token.is_empty());
    }

    #[test]
    fn test_kibana_credentials_fall_back_to_elasticsearch() {
        let mut config = Config::default();
        config.elasticsearch.username = "infra".into();
        config.elasticsearch.password = "pw".into();
        assert_eq!(config.kibana_credentials(), ("infra".into(), "pw".into()));

        config.kibana.username = Some("kb".into());
        assert_eq!(config.kibana_credentials(), ("kb".into(), "pw".into()));
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let mut config = Config::default();
        config.elasticsearch.password = "pw".into();
        config.jira.api_token = "tok".into();
        let redacted = config.redacted();
        assert_eq!(redacted.elasticsearch.password, "********");
        assert_eq!(redacted.jira.api_token, "********");
        assert!(redacted.confluence.api_token.is_empty());
    }
}
