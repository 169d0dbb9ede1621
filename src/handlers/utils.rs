use crate::cdp::{CdpCli, CdpSnapshot, UsagePeriod, load_records_file};
use crate::common::progress::spinner;
use crate::config::{Config, require};
use crate::elastic::ElasticClient;
use crate::error::{InsightsError, Result};
use crate::kibana::KibanaClient;
use crate::usage::UsageRecord;
use prettytable::{Table, format};
use serde::Serialize;
use std::path::Path;

pub const ELASTICSEARCH: &str = "Elasticsearch";
pub const KIBANA: &str = "Kibana";
pub const JIRA: &str = "Jira";
pub const CONFLUENCE: &str = "Confluence";

/// Usage records from a saved dump, or fresh from the `cdp` CLI
pub fn load_usage_records(
    config: &Config,
    input: Option<&Path>,
    days: i64,
    quiet: bool,
) -> Result<Vec<UsageRecord>> {
    if let Some(path) = input {
        log::info!("Reading usage records from {}", path.display());
        return Ok(load_records_file(path)?);
    }

    let progress = spinner(&format!("Collecting {} days of CDP usage...", days), quiet);
    let result = CdpCli::from_config(&config.cdp).collect_usage(days);
    progress.finish_and_clear();
    Ok(result?.records)
}

/// Inventory and usage for reports. Offline input skips the live
/// inventory calls entirely.
pub fn load_snapshot(
    config: &Config,
    input: Option<&Path>,
    days: i64,
    quiet: bool,
) -> Result<CdpSnapshot> {
    if input.is_some() {
        return Ok(CdpSnapshot {
            usage: UsagePeriod {
                records: load_usage_records(config, input, days, quiet)?,
                ..Default::default()
            },
            ..Default::default()
        });
    }

    let progress = spinner("Collecting inventory and usage from CDP...", quiet);
    let snapshot = CdpCli::from_config(&config.cdp).collect_snapshot(days);
    progress.finish_and_clear();
    Ok(snapshot)
}

pub fn elastic_client(config: &Config) -> Result<ElasticClient> {
    require(&config.elasticsearch.url, "elasticsearch.url")?;
    ElasticClient::new(&config.elasticsearch).map_err(InsightsError::api(ELASTICSEARCH))
}

pub fn kibana_client(config: &Config) -> Result<KibanaClient> {
    require(&config.kibana.url, "kibana.url")?;
    let (username, password) = config.kibana_credentials();
    KibanaClient::new(&config.kibana.url, &username, &password).map_err(InsightsError::api(KIBANA))
}

/// Days as the period length used in cost projections
pub fn period_days(days: i64) -> u32 {
    u32::try_from(days.max(1)).unwrap_or(u32::MAX)
}

/// Table with a title row and no separators between data rows
pub fn new_table() -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Shorten long free text for table cells
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_days_is_positive() {
        assert_eq!(period_days(30), 30);
        assert_eq!(period_days(0), 1);
        assert_eq!(period_days(-5), 1);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer summary", 8), "a longe…");
    }

    #[test]
    fn test_missing_elasticsearch_url() {
        let err = elastic_client(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("elasticsearch.url"));
    }
}
