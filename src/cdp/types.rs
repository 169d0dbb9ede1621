use crate::usage::record::{UNKNOWN, UsageRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STATUS_AVAILABLE: &str = "AVAILABLE";
pub const STATUS_STOPPED: &str = "STOPPED";
pub const STATUS_RUNNING: &str = "RUNNING";

/// One page of `consumption list-compute-usage-records`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsagePage {
    pub records: Vec<UsageRecord>,
    pub next_token: Option<String>,
}

/// Usage records of one collection window
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsagePeriod {
    pub records: Vec<UsageRecord>,
    /// Window start as passed to the CLI (`YYYY-MM-DDT00:00:00Z`)
    pub from: String,
    /// Window end as passed to the CLI (`YYYY-MM-DDT23:59:59Z`)
    pub to: String,
    /// The page cap was reached with more records still pending
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CdpUser {
    pub user_id: Option<String>,
    pub crn: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub workload_username: Option<String>,
    pub account_admin: Option<bool>,
}

impl CdpUser {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            _ => self
                .email
                .clone()
                .or_else(|| self.workload_username.clone())
                .unwrap_or_else(|| UNKNOWN.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct UserResponse {
    pub user: CdpUser,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataHubCluster {
    pub cluster_name: Option<String>,
    pub crn: Option<String>,
    pub status: Option<String>,
    pub environment_name: Option<String>,
    pub environment_crn: Option<String>,
    pub workload_type: Option<String>,
    pub cloud_platform: Option<String>,
    pub node_count: Option<u32>,
    pub creation_date: Option<String>,
}

impl DataHubCluster {
    pub fn name(&self) -> &str {
        self.cluster_name.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or("UNKNOWN")
    }

    pub fn environment(&self) -> &str {
        self.environment_name.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn workload_type(&self) -> &str {
        self.workload_type.as_deref().unwrap_or(UNKNOWN)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ClustersResponse {
    pub clusters: Vec<DataHubCluster>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Datalake {
    pub datalake_name: Option<String>,
    pub crn: Option<String>,
    pub status: Option<String>,
    pub environment_crn: Option<String>,
    pub creation_date: Option<String>,
}

impl Datalake {
    pub fn name(&self) -> &str {
        self.datalake_name.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or("UNKNOWN")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct DatalakesResponse {
    pub datalakes: Vec<Datalake>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Environment {
    pub environment_name: Option<String>,
    pub crn: Option<String>,
    pub status: Option<String>,
    pub region: Option<String>,
    pub cloud_platform: Option<String>,
    pub credential_name: Option<String>,
}

impl Environment {
    pub fn name(&self) -> &str {
        self.environment_name.as_deref().unwrap_or(UNKNOWN)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct EnvironmentsResponse {
    pub environments: Vec<Environment>,
}

/// Everything a report collection pass gathers from the CLI
#[derive(Debug, Clone, Default, Serialize)]
pub struct CdpSnapshot {
    pub user: Option<CdpUser>,
    pub datalakes: Vec<Datalake>,
    pub clusters: Vec<DataHubCluster>,
    pub environments: Vec<Environment>,
    pub usage: UsagePeriod,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnvironmentClusterCounts {
    pub total: usize,
    pub active: usize,
    /// Everything not AVAILABLE
    pub stopped: usize,
}

/// Inventory counts shown on the dashboard cards
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventorySummary {
    pub total_clusters: usize,
    pub active_clusters: usize,
    pub stopped_clusters: usize,
    pub total_nodes: u32,
    pub active_nodes: u32,
    pub total_datalakes: usize,
    pub running_datalakes: usize,
    pub clusters_by_env: BTreeMap<String, EnvironmentClusterCounts>,
    pub clusters_by_type: BTreeMap<String, usize>,
}

impl InventorySummary {
    pub fn from_inventory(clusters: &[DataHubCluster], datalakes: &[Datalake]) -> Self {
        let mut summary = InventorySummary {
            total_clusters: clusters.len(),
            total_datalakes: datalakes.len(),
            running_datalakes: datalakes
                .iter()
                .filter(|d| d.status() == STATUS_RUNNING)
                .count(),
            ..Default::default()
        };

        for cluster in clusters {
            let nodes = cluster.node_count.unwrap_or(0);
            let active = cluster.status() == STATUS_AVAILABLE;
            summary.total_nodes += nodes;

            if active {
                summary.active_clusters += 1;
                summary.active_nodes += nodes;
            } else if cluster.status() == STATUS_STOPPED {
                summary.stopped_clusters += 1;
            }

            let env = summary
                .clusters_by_env
                .entry(cluster.environment().to_string())
                .or_default();
            env.total += 1;
            if active {
                env.active += 1;
            } else {
                env.stopped += 1;
            }

            *summary
                .clusters_by_type
                .entry(cluster.workload_type().to_string())
                .or_default() += 1;
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_cli_listings() {
        let clusters: ClustersResponse = serde_json::from_str(
            r#"{"clusters": [
                {"clusterName": "etl", "status": "AVAILABLE", "nodeCount": 5,
                 "environmentName": "prod", "workloadType": "Data Engineering"},
                {"clusterName": "adhoc", "status": "STOPPED", "nodeCount": 3,
                 "environmentName": "prod"},
                {"clusterName": "dev", "status": "CREATE_IN_PROGRESS"}
            ]}"#,
        )
        .unwrap();
        let datalakes: DatalakesResponse = serde_json::from_str(
            r#"{"datalakes": [{"datalakeName": "dl", "status": "RUNNING"},
                              {"datalakeName": "dl2", "status": "STOPPED"}]}"#,
        )
        .unwrap();

        let summary = InventorySummary::from_inventory(&clusters.clusters, &datalakes.datalakes);
        assert_eq!(summary.total_clusters, 3);
        assert_eq!(summary.active_clusters, 1);
        assert_eq!(summary.stopped_clusters, 1);
        assert_eq!(summary.total_nodes, 8);
        assert_eq!(summary.active_nodes, 5);
        assert_eq!(summary.total_datalakes, 2);
        assert_eq!(summary.running_datalakes, 1);
        assert_eq!(
            summary.clusters_by_env["prod"],
            EnvironmentClusterCounts {
                total: 2,
                active: 1,
                stopped: 1
            }
        );
        assert_eq!(summary.clusters_by_env["Unknown"].stopped, 1);
        assert_eq!(summary.clusters_by_type["Unknown"], 2);
    }

    #[test]
    fn test_user_display_name() {
        let user: UserResponse = serde_json::from_str(
            r#"{"user": {"email": "ops@example.com", "firstName": "Ana"}}"#,
        )
        .unwrap();
        assert_eq!(user.user.display_name(), "ops@example.com");
    }
}
