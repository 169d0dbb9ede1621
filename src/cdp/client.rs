use super::CdpError;
use super::types::*;
use crate::common::command_utils::{execute_command, stderr_text, stdout_text};
use crate::config::types::CdpConfig;
use crate::usage::record::UsageRecord;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Thin wrapper over the `cdp` executable; every call is one subprocess
#[derive(Debug, Clone)]
pub struct CdpCli {
    path: String,
    page_size: u32,
    max_pages: u32,
}

impl CdpCli {
    pub fn new(path: impl Into<String>) -> Self {
        let defaults = CdpConfig::default();
        Self {
            path: path.into(),
            page_size: defaults.page_size,
            max_pages: defaults.max_pages,
        }
    }

    pub fn from_config(config: &CdpConfig) -> Self {
        Self {
            path: config.cli_path.clone(),
            page_size: config.page_size.max(1),
            max_pages: config.max_pages.max(1),
        }
    }

    /// Run a CLI command and parse its stdout as JSON.
    ///
    /// Empty output yields `Value::Null`.
    pub fn run_json<S: AsRef<str>>(&self, args: &[S]) -> Result<Value, CdpError> {
        let command = args
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(" ");
        let output = execute_command(&self.path, args).map_err(|source| CdpError::Io {
            path: self.path.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(CdpError::CommandFailed {
                command,
                code: output.status.code(),
                stderr: stderr_text(&output),
            });
        }

        let stdout = stdout_text(&output);
        if stdout.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&stdout).map_err(|source| CdpError::Parse { command, source })
    }

    fn run_typed<T, S>(&self, args: &[S]) -> Result<T, CdpError>
    where
        T: DeserializeOwned + Default,
        S: AsRef<str>,
    {
        let command = args
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(" ");
        match self.run_json(args)? {
            Value::Null => Ok(T::default()),
            value => {
                serde_json::from_value(value).map_err(|source| CdpError::Parse { command, source })
            }
        }
    }

    pub fn get_user(&self) -> Result<CdpUser, CdpError> {
        self.run_typed::<UserResponse, _>(&["iam", "get-user"])
            .map(|r| r.user)
    }

    pub fn list_datalakes(&self) -> Result<Vec<Datalake>, CdpError> {
        self.run_typed::<DatalakesResponse, _>(&["datalake", "list-datalakes"])
            .map(|r| r.datalakes)
    }

    pub fn list_datahubs(&self) -> Result<Vec<DataHubCluster>, CdpError> {
        self.run_typed::<ClustersResponse, _>(&["datahub", "list-clusters"])
            .map(|r| r.clusters)
    }

    pub fn list_environments(&self) -> Result<Vec<Environment>, CdpError> {
        self.run_typed::<EnvironmentsResponse, _>(&["environments", "list-environments"])
            .map(|r| r.environments)
    }

    /// Fetch every usage record between two CLI timestamps, following
    /// `nextToken` until it runs out or the page cap is hit.
    pub fn list_compute_usage_records(&self, from: &str, to: &str) -> Result<UsagePeriod, CdpError> {
        let page_size = self.page_size.to_string();
        let mut records = Vec::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0;
        let mut truncated = false;

        loop {
            let mut args = vec![
                "consumption",
                "list-compute-usage-records",
                "--from-timestamp",
                from,
                "--to-timestamp",
                to,
                "--page-size",
                page_size.as_str(),
            ];
            if let Some(token) = next_token.as_deref() {
                args.push("--starting-token");
                args.push(token);
            }

            let page: UsagePage = self.run_typed(args.as_slice())?;
            pages += 1;
            log::debug!("Usage page {}: {} records", pages, page.records.len());
            records.extend(page.records);

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
            if pages >= self.max_pages {
                truncated = true;
                log::warn!(
                    "Stopped after {} pages of usage records; later records were not fetched",
                    self.max_pages
                );
                break;
            }
        }

        Ok(UsagePeriod {
            records,
            from: from.to_string(),
            to: to.to_string(),
            truncated,
        })
    }

    /// Usage for the trailing `days` ending today
    pub fn collect_usage(&self, days: i64) -> Result<UsagePeriod, CdpError> {
        let (from, to) = usage_window(days, Utc::now());
        self.list_compute_usage_records(&from, &to)
    }

    /// Collect inventory and usage for a report.
    ///
    /// Each call that fails is logged and leaves its part of the snapshot
    /// empty, so one broken listing does not lose the rest.
    pub fn collect_snapshot(&self, days: i64) -> CdpSnapshot {
        fn tolerate<T: Default>(what: &str, result: Result<T, CdpError>) -> T {
            result.unwrap_or_else(|e| {
                log::warn!("Could not fetch {}: {}", what, e);
                T::default()
            })
        }

        let (from, to) = usage_window(days, Utc::now());
        CdpSnapshot {
            user: self
                .get_user()
                .map_err(|e| log::warn!("Could not fetch user: {}", e))
                .ok(),
            datalakes: tolerate("data lakes", self.list_datalakes()),
            clusters: tolerate("Data Hub clusters", self.list_datahubs()),
            environments: tolerate("environments", self.list_environments()),
            usage: self
                .list_compute_usage_records(&from, &to)
                .unwrap_or_else(|e| {
                    log::warn!("Could not fetch usage records: {}", e);
                    UsagePeriod {
                        records: Vec::new(),
                        from,
                        to,
                        truncated: false,
                    }
                }),
        }
    }
}

/// Longest trailing window any command collects (about ten years)
pub const MAX_HISTORY_DAYS: i64 = 3650;

/// Day count forced into `1..=MAX_HISTORY_DAYS`
pub fn clamp_history_days(days: i64) -> i64 {
    days.clamp(1, MAX_HISTORY_DAYS)
}

/// CLI timestamps covering whole days: `days` ago at midnight through the
/// last second of `now`'s day (UTC)
pub fn usage_window(days: i64, now: DateTime<Utc>) -> (String, String) {
    let from = now - Duration::days(clamp_history_days(days));
    (
        from.format("%Y-%m-%dT00:00:00Z").to_string(),
        now.format("%Y-%m-%dT23:59:59Z").to_string(),
    )
}

/// Read usage records saved from the CLI: either the raw command output
/// (`{"records": [...]}`) or a bare array of records
pub fn load_records_file(path: &Path) -> Result<Vec<UsageRecord>, CdpError> {
    let content = fs::read_to_string(path).map_err(|source| CdpError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let command = format!("read {}", path.display());
    let value: Value = serde_json::from_str(&content).map_err(|source| CdpError::Parse {
        command: command.clone(),
        source,
    })?;

    let records = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => map.remove("records").unwrap_or(Value::Array(Vec::new())),
        _ => Value::Array(Vec::new()),
    };
    serde_json::from_value(records).map_err(|source| CdpError::Parse { command, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_usage_window_covers_whole_days() {
        let now = Utc.with_ymd_and_hms(2025, 3, 31, 14, 27, 3).unwrap();
        let (from, to) = usage_window(30, now);
        assert_eq!(from, "2025-03-01T00:00:00Z");
        assert_eq!(to, "2025-03-31T23:59:59Z");
    }

    #[test]
    fn test_usage_window_out_of_range_days() {
        let now = Utc.with_ymd_and_hms(2025, 3, 31, 14, 27, 3).unwrap();
        let (from, to) = usage_window(-5, now);
        assert_eq!(from, "2025-03-30T00:00:00Z");
        assert!(from < to);

        let (from, _) = usage_window(10_000_000_000_000, now);
        assert_eq!(from, usage_window(MAX_HISTORY_DAYS, now).0);
    }

    #[test]
    fn test_load_records_file_accepts_both_shapes() {
        let dir = TempDir::new().unwrap();

        let wrapped = dir.path().join("wrapped.json");
        fs::write(
            &wrapped,
            r#"{"records": [{"clusterName": "a", "grossCharge": 1.5}], "nextToken": null}"#,
        )
        .unwrap();
        let records = load_records_file(&wrapped).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].credits(), 1.5);

        let bare = dir.path().join("bare.json");
        fs::write(&bare, r#"[{"clusterName": "a"}, {"clusterName": "b"}]"#).unwrap();
        assert_eq!(load_records_file(&bare).unwrap().len(), 2);

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{not json").unwrap();
        assert!(matches!(
            load_records_file(&broken),
            Err(CdpError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_binary_is_io_error() {
        let cli = CdpCli::new("definitely-not-the-cdp-cli");
        assert!(matches!(cli.get_user(), Err(CdpError::Io { .. })));
    }

    #[cfg(unix)]
    fn fake_cli(dir: &TempDir, script: &str) -> CdpCli {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("cdp");
        fs::write(&path, format!("#!/bin/sh\n{}", script)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        CdpCli::new(path.display().to_string())
    }

    #[cfg(unix)]
    #[test]
    fn test_pagination_follows_next_token() {
        let dir = TempDir::new().unwrap();
        let cli = fake_cli(
            &dir,
            r#"case "$*" in
  *--starting-token*) echo '{"records": [{"clusterName": "b"}]}' ;;
  *) echo '{"records": [{"clusterName": "a"}], "nextToken": "page2"}' ;;
esac"#,
        );

        let period = cli
            .list_compute_usage_records("2025-01-01T00:00:00Z", "2025-01-31T23:59:59Z")
            .unwrap();
        let names: Vec<&str> = period.records.iter().map(|r| r.cluster()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(period.from, "2025-01-01T00:00:00Z");
        assert!(!period.truncated);
    }

    #[cfg(unix)]
    #[test]
    fn test_pagination_stops_at_page_cap() {
        let dir = TempDir::new().unwrap();
        let mut cli = fake_cli(
            &dir,
            r#"echo '{"records": [{"clusterName": "x"}], "nextToken": "again"}'"#,
        );
        cli.max_pages = 3;

        let period = cli.list_compute_usage_records("a", "b").unwrap();
        assert_eq!(period.records.len(), 3);
        assert!(period.truncated);
    }

    #[cfg(unix)]
    #[test]
    fn test_last_allowed_page_without_token_is_complete() {
        let dir = TempDir::new().unwrap();
        let mut cli = fake_cli(
            &dir,
            r#"case "$*" in
  *--starting-token*) echo '{"records": [{"clusterName": "b"}]}' ;;
  *) echo '{"records": [{"clusterName": "a"}], "nextToken": "page2"}' ;;
esac"#,
        );
        cli.max_pages = 2;

        let period = cli.list_compute_usage_records("a", "b").unwrap();
        assert_eq!(period.records.len(), 2);
        assert!(!period.truncated);
    }

    #[cfg(unix)]
    #[test]
    fn test_failures_are_typed() {
        let dir = TempDir::new().unwrap();
        let cli = fake_cli(&dir, "echo 'token expired' >&2\nexit 2");
        match cli.list_datahubs() {
            Err(CdpError::CommandFailed { code, stderr, .. }) => {
                assert_eq!(code, Some(2));
                assert_eq!(stderr, "token expired");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let dir = TempDir::new().unwrap();
        let cli = fake_cli(&dir, "echo 'not json'");
        assert!(matches!(cli.list_datahubs(), Err(CdpError::Parse { .. })));

        let dir = TempDir::new().unwrap();
        let cli = fake_cli(&dir, "true");
        assert!(cli.list_datahubs().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_snapshot_tolerates_failures() {
        let dir = TempDir::new().unwrap();
        let cli = fake_cli(
            &dir,
            r#"case "$1" in
  datahub) echo '{"clusters": [{"clusterName": "etl", "status": "AVAILABLE"}]}' ;;
  *) exit 1 ;;
esac"#,
        );
        let snapshot = cli.collect_snapshot(30);
        assert!(snapshot.user.is_none());
        assert_eq!(snapshot.clusters.len(), 1);
        assert!(snapshot.usage.records.is_empty());
        assert!(snapshot.usage.to.ends_with("T23:59:59Z"));
    }
}
