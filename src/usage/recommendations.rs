//! Savings recommendations derived from consumption and the Data Hub inventory

use super::aggregator::UsageSummary;
use crate::cdp::types::{DataHubCluster, InventorySummary, STATUS_AVAILABLE, STATUS_STOPPED};
use serde::Serialize;
use std::fmt;

/// Hours in an average month
pub const HOURS_PER_MONTH: f64 = 730.0;
/// Credits per node-hour used when no consumption data exists
const FALLBACK_CREDITS_PER_NODE_HOUR: f64 = 0.5;
/// Monthly storage credits assumed per stopped cluster (per hour)
const STOPPED_CLUSTER_CREDITS_PER_HOUR: f64 = 5.0;
const HIGH_SHARE_THRESHOLD: f64 = 0.2;
const LOW_UTILIZATION_PERCENT: f64 = 30.0;
const AUTOSCALING_CLUSTER_THRESHOLD: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub title: String,
    pub severity: Severity,
    /// Estimated monthly credits saved
    pub savings: f64,
    pub description: String,
    /// Clusters or instance types the recommendation is about
    pub targets: Vec<String>,
    pub action: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CostSource {
    /// Projected from real consumption records
    Consumption,
    /// Estimated from the active node count
    NodeEstimate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostEstimate {
    pub monthly_credits: f64,
    pub source: CostSource,
}

/// Monthly cost, projected from consumption when there is any
pub fn estimate_monthly_cost(
    summary: &UsageSummary,
    inventory: &InventorySummary,
    period_days: u32,
) -> CostEstimate {
    if summary.is_empty() {
        CostEstimate {
            monthly_credits: inventory.active_nodes as f64
                * FALLBACK_CREDITS_PER_NODE_HOUR
                * HOURS_PER_MONTH,
            source: CostSource::NodeEstimate,
        }
    } else {
        CostEstimate {
            monthly_credits: summary.monthly_projection(period_days),
            source: CostSource::Consumption,
        }
    }
}

/// Build recommendations, highest estimated savings first
pub fn recommend(
    summary: &UsageSummary,
    clusters: &[DataHubCluster],
    inventory: &InventorySummary,
    monthly_estimate: f64,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    let stopped: Vec<String> = clusters
        .iter()
        .filter(|c| c.status() == STATUS_STOPPED)
        .map(|c| c.name().to_string())
        .collect();
    if !stopped.is_empty() {
        recommendations.push(Recommendation {
            title: "Stopped clusters".to_string(),
            severity: Severity::Medium,
            savings: stopped.len() as f64 * STOPPED_CLUSTER_CREDITS_PER_HOUR * HOURS_PER_MONTH,
            description: format!(
                "{} cluster(s) are stopped. Delete the ones no longer needed to avoid storage charges.",
                stopped.len()
            ),
            targets: stopped,
            action: "Review and delete clusters that are no longer needed".to_string(),
        });
    }

    if !summary.is_empty() {
        let total = summary.total.credits;

        let heavy: Vec<(&str, f64)> = summary
            .by_cluster
            .iter()
            .filter(|(_, usage)| usage.totals.credits > total * HIGH_SHARE_THRESHOLD)
            .map(|(name, usage)| (name.as_str(), usage.totals.credits))
            .collect();
        if !heavy.is_empty() {
            let heavy_credits: f64 = heavy.iter().map(|(_, c)| c).sum();
            recommendations.push(Recommendation {
                title: "High-consumption clusters".to_string(),
                severity: Severity::High,
                savings: heavy_credits * 0.15,
                description: format!(
                    "{} cluster(s) each account for more than 20% of total consumption.",
                    heavy.len()
                ),
                targets: heavy.iter().map(|(n, _)| n.to_string()).collect(),
                action: "Review instance sizing, consider autoscaling or fewer nodes".to_string(),
            });
        }

        let expensive: Vec<(&str, f64)> = summary
            .instance_types_by_credits()
            .into_iter()
            .take(3)
            .map(|(name, usage)| (name, usage.totals.credits))
            .collect();
        if !expensive.is_empty() {
            let expensive_credits: f64 = expensive.iter().map(|(_, c)| c).sum();
            let share = if total > 0.0 {
                expensive_credits / total * 100.0
            } else {
                0.0
            };
            recommendations.push(Recommendation {
                title: "Expensive instance types".to_string(),
                severity: Severity::Medium,
                savings: expensive_credits * 0.20,
                description: format!(
                    "The {} most expensive instance types account for {:.1}% of spend.",
                    expensive.len(),
                    share
                ),
                targets: expensive.iter().map(|(n, _)| n.to_string()).collect(),
                action: "Evaluate cheaper instance types that keep performance acceptable"
                    .to_string(),
            });
        }

        for (name, usage) in &summary.by_cluster {
            let Some(cluster) = clusters.iter().find(|c| c.name() == name) else {
                continue;
            };
            if cluster.status() != STATUS_AVAILABLE {
                continue;
            }
            let potential_hours = 30.0 * 24.0 * f64::from(cluster.node_count.unwrap_or(1));
            if potential_hours <= 0.0 {
                continue;
            }
            let utilization = usage.totals.hours / potential_hours * 100.0;
            if utilization < LOW_UTILIZATION_PERCENT {
                recommendations.push(Recommendation {
                    title: format!("Low utilization: {}", name),
                    severity: Severity::Low,
                    savings: usage.totals.credits * 0.5,
                    description: format!(
                        "Estimated utilization is {:.1}%. The cluster is underused.",
                        utilization
                    ),
                    targets: vec![name.clone()],
                    action: "Stop the cluster outside working hours or remove nodes".to_string(),
                });
            }
        }
    }

    if inventory.active_clusters > AUTOSCALING_CLUSTER_THRESHOLD {
        recommendations.push(Recommendation {
            title: "Consider autoscaling".to_string(),
            severity: Severity::Low,
            savings: monthly_estimate * 0.10,
            description: format!(
                "{} clusters are active. Autoscaling can match capacity to demand.",
                inventory.active_clusters
            ),
            targets: Vec::new(),
            action: "Introduce autoscaling policies".to_string(),
        });
    }

    recommendations.sort_by(|a, b| b.savings.total_cmp(&a.savings));
    recommendations
}

/// Sum of estimated savings across recommendations
pub fn total_savings(recommendations: &[Recommendation]) -> f64 {
    recommendations.iter().map(|r| r.savings).sum()
}
