use super::GcpError;
use crate::api::{ApiAuth, RestClient, encode};
use crate::common::command_utils::{execute_command, stderr_text, stdout_text};
use crate::config::types::GcpConfig;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Pages followed for paged listings
const MAX_PAGES: usize = 100;
const BUCKET_BYTES_METRIC: &str = "storage.googleapis.com/storage/total_bytes";

/// Base URLs of the Google APIs used
#[derive(Debug, Clone)]
pub struct GcpEndpoints {
    pub compute: String,
    pub storage: String,
    pub monitoring: String,
}

impl Default for GcpEndpoints {
    fn default() -> Self {
        Self {
            compute: "https://compute.googleapis.com/compute/v1".to_string(),
            storage: "https://storage.googleapis.com/storage/v1".to_string(),
            monitoring: "https://monitoring.googleapis.com/v3".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Instance {
    pub name: String,
    /// Full URL; the machine type is the last path segment
    pub machine_type: String,
    pub status: String,
    pub zone: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Disk {
    pub name: String,
    /// int64 encoded as a string
    pub size_gb: Option<String>,
    #[serde(rename = "type")]
    pub disk_type: String,
    pub zone: String,
}

impl Disk {
    pub fn size_gb(&self) -> f64 {
        self.size_gb
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Bucket {
    pub name: String,
    pub location: String,
    pub storage_class: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregatedList {
    #[serde(default)]
    items: BTreeMap<String, Value>,
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BucketList {
    #[serde(default)]
    items: Vec<Bucket>,
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeSeriesList {
    #[serde(default)]
    time_series: Vec<TimeSeries>,
}

#[derive(Debug, Deserialize)]
struct TimeSeries {
    #[serde(default)]
    points: Vec<Point>,
}

#[derive(Debug, Deserialize)]
struct Point {
    value: TypedValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypedValue {
    double_value: Option<f64>,
    int64_value: Option<String>,
}

impl TypedValue {
    fn as_f64(&self) -> Option<f64> {
        self.double_value
            .or_else(|| self.int64_value.as_deref().and_then(|v| v.parse().ok()))
    }
}

fn gcloud(config: &GcpConfig, args: &[&str]) -> Result<String, GcpError> {
    let command = format!("{} {}", config.gcloud_path, args.join(" "));
    let output = execute_command(&config.gcloud_path, args).map_err(|e| GcpError::Token {
        command: command.clone(),
        message: e.to_string(),
    })?;
    if !output.status.success() {
        return Err(GcpError::Token {
            command,
            message: stderr_text(&output),
        });
    }
    Ok(stdout_text(&output).trim().to_string())
}

/// Configured token, else `gcloud auth print-access-token`
pub fn access_token(config: &GcpConfig) -> Result<String, GcpError> {
    if let Some(token) = config.access_token.as_deref().filter(|t| !t.is_empty()) {
        return Ok(token.to_string());
    }
    let token = gcloud(config, &["auth", "print-access-token"])?;
    if token.is_empty() {
        return Err(GcpError::Token {
            command: format!("{} auth print-access-token", config.gcloud_path),
            message: "empty output".to_string(),
        });
    }
    Ok(token)
}

/// Configured project, else the active `gcloud` project
pub fn resolve_project(config: &GcpConfig) -> Result<String, GcpError> {
    if let Some(project) = config.project_id.as_deref().filter(|p| !p.is_empty()) {
        return Ok(project.to_string());
    }
    match gcloud(config, &["config", "get-value", "project"]) {
        Ok(project) if !project.is_empty() && project != "(unset)" => Ok(project),
        _ => Err(GcpError::MissingProject),
    }
}

/// Read-only client for one project
#[derive(Debug, Clone)]
pub struct GcpClient {
    project_id: String,
    region: Option<String>,
    compute: RestClient,
    storage: RestClient,
    monitoring: RestClient,
}

impl GcpClient {
    pub fn new(
        project_id: &str,
        token: &str,
        region: Option<String>,
        endpoints: &GcpEndpoints,
    ) -> Result<Self, GcpError> {
        let auth = ApiAuth::Bearer(token.to_string());
        Ok(Self {
            project_id: project_id.to_string(),
            region,
            compute: RestClient::new(&endpoints.compute, auth.clone())?,
            storage: RestClient::new(&endpoints.storage, auth.clone())?,
            monitoring: RestClient::new(&endpoints.monitoring, auth)?,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Follow an aggregated listing and collect the `key` arrays of every zone
    async fn aggregated<T: serde::de::DeserializeOwned>(
        &self,
        resource: &str,
        key: &str,
    ) -> Result<Vec<T>, GcpError> {
        let mut results = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut path = format!(
                "/projects/{}/aggregated/{}?maxResults=500",
                encode(&self.project_id),
                resource
            );
            if let Some(token) = &page_token {
                path.push_str(&format!("&pageToken={}", encode(token)));
            }
            let page: AggregatedList = self.compute.get(&path).await?;

            for (scope, mut entry) in page.items {
                if !self.in_region(&scope) {
                    continue;
                }
                if let Some(items) = entry.get_mut(key).map(Value::take) {
                    match serde_json::from_value::<Vec<T>>(items) {
                        Ok(parsed) => results.extend(parsed),
                        Err(e) => log::warn!("Skipping unparsable {} in {}: {}", resource, scope, e),
                    }
                }
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(results),
            }
        }
        log::warn!("Stopped listing {} after {} pages", resource, MAX_PAGES);
        Ok(results)
    }

    /// `zones/europe-west1-b` belongs to region `europe-west1`
    fn in_region(&self, scope: &str) -> bool {
        match &self.region {
            Some(region) => scope
                .strip_prefix("zones/")
                .is_some_and(|zone| zone.starts_with(&format!("{}-", region))),
            None => true,
        }
    }

    pub async fn list_instances(&self) -> Result<Vec<Instance>, GcpError> {
        self.aggregated("instances", "instances").await
    }

    pub async fn list_disks(&self) -> Result<Vec<Disk>, GcpError> {
        self.aggregated("disks", "disks").await
    }

    pub async fn list_buckets(&self) -> Result<Vec<Bucket>, GcpError> {
        let mut buckets = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut path = format!("/b?project={}", encode(&self.project_id));
            if let Some(token) = &page_token {
                path.push_str(&format!("&pageToken={}", encode(token)));
            }
            let page: BucketList = self.storage.get(&path).await?;
            buckets.extend(page.items);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(buckets),
            }
        }
        log::warn!("Stopped listing buckets after {} pages", MAX_PAGES);
        Ok(buckets)
    }

    /// Latest `total_bytes` sample of a bucket over the last day
    pub async fn bucket_size_bytes(
        &self,
        bucket: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<f64>, GcpError> {
        let filter = format!(
            "metric.type=\"{}\" AND resource.labels.bucket_name=\"{}\"",
            BUCKET_BYTES_METRIC, bucket
        );
        let start = (now - Duration::hours(24)).to_rfc3339_opts(SecondsFormat::Secs, true);
        let end = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        let path = format!(
            "/projects/{}/timeSeries?filter={}&interval.startTime={}&interval.endTime={}&view=FULL",
            encode(&self.project_id),
            encode(&filter),
            encode(&start),
            encode(&end)
        );
        let series: TimeSeriesList = self.monitoring.get(&path).await?;
        Ok(series
            .time_series
            .iter()
            .find_map(|s| s.points.first())
            .and_then(|p| p.value.as_f64()))
    }
}
