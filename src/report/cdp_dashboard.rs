//! CDP consumption dashboard

use super::{ReportError, format_number, render, write_report};
use crate::cdp::types::{
    CdpUser, DataHubCluster, Datalake, InventorySummary, STATUS_AVAILABLE, STATUS_RUNNING,
};
use crate::usage::recommendations::{CostEstimate, CostSource, total_savings};
use crate::usage::record::DAY_NAMES;
use crate::usage::{Forecast, Recommendation, UsageSummary};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::path::Path;
use tera::Context;

const TEMPLATE: &str = include_str!("../../templates/cdp_dashboard.html.tera");
const TREND_CLUSTERS: usize = 5;
const TOP_INSTANCE_TYPES: usize = 10;

/// Everything the CDP dashboard shows
pub struct CdpReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub user: Option<&'a CdpUser>,
    pub clusters: &'a [DataHubCluster],
    pub datalakes: &'a [Datalake],
    pub inventory: &'a InventorySummary,
    pub summary: &'a UsageSummary,
    pub period_days: u32,
    pub estimate: CostEstimate,
    pub recommendations: &'a [Recommendation],
    pub forecast: Option<&'a Forecast>,
    pub logo: Option<String>,
}

#[derive(Serialize)]
struct ClusterRow {
    name: String,
    status: String,
    available: bool,
    workload_type: String,
    environment: String,
    nodes: u32,
    platform: String,
    created: String,
}

#[derive(Serialize)]
struct DatalakeRow {
    name: String,
    status: String,
    running: bool,
    environment: String,
    created: String,
}

#[derive(Serialize)]
struct ConsumptionRow {
    name: String,
    credits: String,
    hours: String,
    credits_per_hour: String,
    share: String,
}

#[derive(Serialize)]
struct EnvironmentRow {
    name: String,
    total: usize,
    active: usize,
    percent: f64,
}

#[derive(Serialize)]
struct RecommendationView {
    title: String,
    severity: String,
    savings: String,
    description: String,
    targets: String,
    action: String,
}

#[derive(Serialize)]
struct ForecastRow {
    date: String,
    predicted: String,
    lower: String,
    upper: String,
}

fn short_date(raw: Option<&str>) -> String {
    raw.map(|d| d.chars().take(10).collect())
        .unwrap_or_else(|| "N/A".to_string())
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

/// Serialize for a `<script>` block; `</` would end the block early
fn script_json(value: &Value) -> String {
    value.to_string().replace("</", "<\\/")
}

impl CdpReport<'_> {
    fn cluster_rows(&self) -> Vec<ClusterRow> {
        let mut clusters: Vec<&DataHubCluster> = self.clusters.iter().collect();
        clusters.sort_by(|a, b| {
            (a.status() != STATUS_AVAILABLE, a.name()).cmp(&(b.status() != STATUS_AVAILABLE, b.name()))
        });
        clusters
            .into_iter()
            .map(|c| ClusterRow {
                name: c.name().to_string(),
                status: c.status().to_string(),
                available: c.status() == STATUS_AVAILABLE,
                workload_type: c.workload_type().to_string(),
                environment: c.environment().to_string(),
                nodes: c.node_count.unwrap_or(0),
                platform: c.cloud_platform.clone().unwrap_or_else(|| "N/A".to_string()),
                created: short_date(c.creation_date.as_deref()),
            })
            .collect()
    }

    fn datalake_rows(&self) -> Vec<DatalakeRow> {
        self.datalakes
            .iter()
            .map(|d| DatalakeRow {
                name: d.name().to_string(),
                status: d.status().to_string(),
                running: d.status() == STATUS_RUNNING,
                environment: d
                    .environment_crn
                    .as_deref()
                    .and_then(|crn| crn.rsplit('/').next())
                    .unwrap_or("N/A")
                    .to_string(),
                created: short_date(d.creation_date.as_deref()),
            })
            .collect()
    }

    fn consumption_rows(&self) -> Vec<ConsumptionRow> {
        let total = self.summary.total.credits;
        self.summary
            .top_clusters(self.summary.by_cluster.len())
            .into_iter()
            .map(|(name, usage)| ConsumptionRow {
                name: name.to_string(),
                credits: format_number(usage.totals.credits, 2),
                hours: format_number(usage.totals.hours, 1),
                credits_per_hour: format!("{:.3}", usage.totals.credits_per_hour()),
                share: format!("{:.1}%", percent(usage.totals.credits, total)),
            })
            .collect()
    }

    fn environment_rows(&self) -> Vec<EnvironmentRow> {
        let total = self.inventory.total_clusters as f64;
        self.inventory
            .clusters_by_env
            .iter()
            .map(|(name, counts)| EnvironmentRow {
                name: name.clone(),
                total: counts.total,
                active: counts.active,
                percent: percent(counts.total as f64, total),
            })
            .collect()
    }

    /// Data behind the Chart.js charts
    fn chart_data(&self) -> Value {
        let dates: Vec<String> = self.summary.by_date.keys().map(|d| d.to_string()).collect();
        let daily_credits: Vec<f64> = self.summary.by_date.values().map(|t| t.credits).collect();
        let daily_hours: Vec<f64> = self.summary.by_date.values().map(|t| t.hours).collect();

        let stacked: Vec<Value> = self
            .summary
            .top_clusters(TREND_CLUSTERS)
            .into_iter()
            .map(|(name, _)| {
                let by_date = self.summary.by_cluster_and_date.get(name);
                let values: Vec<f64> = self
                    .summary
                    .by_date
                    .keys()
                    .map(|d| by_date.and_then(|m| m.get(d)).copied().unwrap_or(0.0))
                    .collect();
                json!({"label": name, "data": values})
            })
            .collect();

        let hourly: Vec<f64> = (0..24)
            .map(|h| self.summary.by_hour.get(&h).map_or(0.0, |t| t.credits))
            .collect();
        let weekday: Vec<f64> = (0..7)
            .map(|d| self.summary.by_weekday.get(&d).map_or(0.0, |t| t.credits))
            .collect();

        let instance_types = self.summary.instance_types_by_credits();
        let instance_types = &instance_types[..instance_types.len().min(TOP_INSTANCE_TYPES)];

        json!({
            "dates": dates,
            "dailyCredits": daily_credits,
            "dailyHours": daily_hours,
            "clusterSeries": stacked,
            "hourly": hourly,
            "weekdayLabels": DAY_NAMES,
            "weekday": weekday,
            "instanceTypes": instance_types.iter().map(|(n, _)| *n).collect::<Vec<_>>(),
            "instanceCredits": instance_types.iter().map(|(_, u)| u.totals.credits).collect::<Vec<_>>(),
            "environments": self.summary.by_environment.keys().collect::<Vec<_>>(),
            "environmentCredits": self.summary.by_environment.values().map(|t| t.credits).collect::<Vec<_>>(),
        })
    }

    fn context(&self) -> Context {
        let mut context = Context::new();
        context.insert("generated_at", &self.generated_at.format("%Y-%m-%d %H:%M UTC").to_string());
        context.insert("user", &self.user.map(CdpUser::display_name));
        context.insert("logo", &self.logo);
        context.insert("inventory", self.inventory);
        context.insert("clusters", &self.cluster_rows());
        context.insert("datalakes", &self.datalake_rows());
        context.insert("environments", &self.environment_rows());

        context.insert("has_consumption", &!self.summary.is_empty());
        context.insert("period_days", &self.period_days);
        context.insert("record_count", &self.summary.record_count);
        context.insert("total_credits", &format_number(self.summary.total.credits, 2));
        context.insert("total_hours", &format_number(self.summary.total.hours, 1));
        context.insert("consumption", &self.consumption_rows());
        context.insert("chart_data", &script_json(&self.chart_data()));

        context.insert("monthly_estimate", &format_number(self.estimate.monthly_credits, 2));
        context.insert(
            "estimate_from_consumption",
            &(self.estimate.source == CostSource::Consumption),
        );
        context.insert(
            "node_utilization",
            &format!(
                "{:.1}",
                percent(self.inventory.active_nodes as f64, self.inventory.total_nodes as f64)
            ),
        );

        let recommendations: Vec<RecommendationView> = self
            .recommendations
            .iter()
            .map(|r| RecommendationView {
                title: r.title.clone(),
                severity: r.severity.to_string(),
                savings: format_number(r.savings, 2),
                description: r.description.clone(),
                targets: r.targets.join(", "),
                action: r.action.clone(),
            })
            .collect();
        context.insert("recommendations", &recommendations);
        context.insert("total_savings", &format_number(total_savings(self.recommendations), 2));

        let forecast: Vec<ForecastRow> = self
            .forecast
            .map(|f| {
                f.points
                    .iter()
                    .map(|p| ForecastRow {
                        date: p.date.to_string(),
                        predicted: format_number(p.predicted, 2),
                        lower: format_number(p.lower, 2),
                        upper: format_number(p.upper, 2),
                    })
                    .collect()
            })
            .unwrap_or_default();
        context.insert("forecast", &forecast);
        context.insert(
            "forecast_method",
            &self.forecast.map(|f| f.method_used.to_string()),
        );
        context
    }

    pub fn render(&self) -> Result<String, ReportError> {
        render("cdp_dashboard.html", TEMPLATE, &self.context())
    }

    pub fn write(&self, path: &Path) -> Result<(), ReportError> {
        let html = self.render()?;
        write_report(path, &html)?;
        log::info!("CDP dashboard written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::recommendations::{estimate_monthly_cost, recommend};
    use crate::usage::{UsageRecord, aggregate};
    use crate::usage::{ForecastMethod, Forecaster};

    fn record(cluster: &str, start: &str, credits: f64) -> UsageRecord {
        UsageRecord {
            cluster_name: Some(cluster.to_string()),
            environment_name: Some("prod".to_string()),
            instance_type: Some("n2-standard-8".to_string()),
            usage_start_timestamp: Some(start.to_string()),
            quantity: Some(2.0),
            gross_charge: Some(credits),
            ..Default::default()
        }
    }

    fn cluster(name: &str, status: &str) -> DataHubCluster {
        DataHubCluster {
            cluster_name: Some(name.to_string()),
            status: Some(status.to_string()),
            environment_name: Some("prod".to_string()),
            node_count: Some(4),
            creation_date: Some("2024-03-01T10:00:00Z".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_renders_consumption_and_inventory() {
        let records = vec![
            record("etl</script>", "2024-05-01T10:00:00Z", 10.0),
            record("analytics", "2024-05-02T22:00:00Z", 20.0),
        ];
        let summary = aggregate(&records);
        let clusters = vec![cluster("etl", STATUS_AVAILABLE), cluster("old", "STOPPED")];
        let inventory = InventorySummary::from_inventory(&clusters, &[]);
        let estimate = estimate_monthly_cost(&summary, &inventory, 30);
        let recommendations = recommend(&summary, &clusters, &inventory, estimate.monthly_credits);

        let report = CdpReport {
            generated_at: Utc::now(),
            user: None,
            clusters: &clusters,
            datalakes: &[],
            inventory: &inventory,
            summary: &summary,
            period_days: 30,
            estimate,
            recommendations: &recommendations,
            forecast: None,
            logo: None,
        };
        let html = report.render().unwrap();

        assert!(html.contains("30.00"));
        assert!(html.contains("analytics"));
        assert!(html.contains("old"));
        assert!(html.contains("chart.js"));
        assert!(!html.contains("etl</script>"));
    }

    #[test]
    fn test_renders_without_consumption() {
        let summary = UsageSummary::default();
        let inventory = InventorySummary::default();
        let series: Vec<(chrono::NaiveDate, f64)> = (1..=10)
            .map(|d| (chrono::NaiveDate::from_ymd_opt(2024, 5, d).unwrap(), d as f64))
            .collect();
        let forecast = Forecaster::new(ForecastMethod::Linear).forecast(&series);

        let report = CdpReport {
            generated_at: Utc::now(),
            user: None,
            clusters: &[],
            datalakes: &[],
            inventory: &inventory,
            summary: &summary,
            period_days: 30,
            estimate: CostEstimate {
                monthly_credits: 0.0,
                source: CostSource::NodeEstimate,
            },
            recommendations: &[],
            forecast: Some(&forecast),
            logo: Some("data:image/png;base64,AAAA".to_string()),
        };
        let html = report.render().unwrap();
        assert!(html.contains("No consumption data"));
        assert!(html.contains("data:image/png;base64,AAAA"));
        assert!(html.contains("2024-05-11"));
    }
}
