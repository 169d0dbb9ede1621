//! Confluence page summarising CDP consumption

use crate::cdp::types::InventorySummary;
use crate::report::format_number;
use crate::usage::recommendations::{CostEstimate, Recommendation, total_savings};
use crate::usage::{Forecast, UsageSummary};
use chrono::{DateTime, Utc};
use std::fmt::Write;

const TOP_CLUSTERS: usize = 10;

pub struct ConsumptionPage<'a> {
    pub generated_at: DateTime<Utc>,
    pub period_days: u32,
    pub summary: &'a UsageSummary,
    pub inventory: &'a InventorySummary,
    pub estimate: CostEstimate,
    pub recommendations: &'a [Recommendation],
    pub forecast: Option<&'a Forecast>,
    pub dashboard_url: Option<String>,
}

impl ConsumptionPage<'_> {
    pub fn title(&self) -> String {
        format!("CDP consumption - {}", self.generated_at.format("%Y-%m"))
    }

    /// Page body as Markdown
    pub fn markdown(&self) -> String {
        let mut md = String::new();
        let s = self.summary;
        // Writing to a String cannot fail
        let _ = writeln!(md, "# CDP consumption report\n");
        let _ = writeln!(
            md,
            "Generated {} for the last {} days.\n",
            self.generated_at.format("%Y-%m-%d %H:%M UTC"),
            self.period_days
        );

        let _ = writeln!(md, "## Overview\n");
        let _ = writeln!(md, "| Metric | Value |\n|---|---|");
        let _ = writeln!(md, "| Credits | {} |", format_number(s.total.credits, 2));
        let _ = writeln!(md, "| Billable hours | {} |", format_number(s.total.hours, 1));
        let _ = writeln!(md, "| Records | {} |", s.record_count);
        let _ = writeln!(
            md,
            "| Data Hub clusters | {} ({} available, {} stopped) |",
            self.inventory.total_clusters, self.inventory.active_clusters, self.inventory.stopped_clusters
        );
        let _ = writeln!(
            md,
            "| Monthly estimate | {} credits |\n",
            format_number(self.estimate.monthly_credits, 2)
        );

        if !s.is_empty() {
            let _ = writeln!(md, "## Top clusters\n");
            let _ = writeln!(md, "| Cluster | Environment | Credits | Hours | Share |\n|---|---|---|---|---|");
            for (name, usage) in s.top_clusters(TOP_CLUSTERS) {
                let share = if s.total.credits > 0.0 {
                    usage.totals.credits / s.total.credits * 100.0
                } else {
                    0.0
                };
                let _ = writeln!(
                    md,
                    "| {} | {} | {} | {} | {:.1}% |",
                    name,
                    usage.environment,
                    format_number(usage.totals.credits, 2),
                    format_number(usage.totals.hours, 1),
                    share
                );
            }
            md.push('\n');
        }

        if let Some(forecast) = self.forecast.filter(|f| !f.is_empty()) {
            let _ = writeln!(md, "## Forecast ({})\n", forecast.method_used);
            let _ = writeln!(md, "| Date | Predicted | Range |\n|---|---|---|");
            for p in &forecast.points {
                let _ = writeln!(
                    md,
                    "| {} | {} | {} - {} |",
                    p.date,
                    format_number(p.predicted, 2),
                    format_number(p.lower, 2),
                    format_number(p.upper, 2)
                );
            }
            let _ = writeln!(
                md,
                "\nPredicted total: **{}** credits.\n",
                format_number(forecast.total_predicted(), 2)
            );
        }

        if !self.recommendations.is_empty() {
            let _ = writeln!(md, "## Recommendations\n");
            for r in self.recommendations {
                let _ = writeln!(
                    md,
                    "- **{}** ({}, ~{} credits/month): {} *{}*",
                    r.title,
                    r.severity,
                    format_number(r.savings, 2),
                    r.description,
                    r.action
                );
            }
            let _ = writeln!(
                md,
                "\nTotal potential savings: **{}** credits/month.\n",
                format_number(total_savings(self.recommendations), 2)
            );
        }

        if let Some(url) = &self.dashboard_url {
            let _ = writeln!(md, "Live dashboard: [Kibana]({})", url);
        }
        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::recommendations::CostSource;
    use crate::usage::{UsageRecord, aggregate};
    use chrono::TimeZone;

    #[test]
    fn test_markdown_lists_clusters_and_link() {
        let records = vec![UsageRecord {
            cluster_name: Some("etl-prod".into()),
            environment_name: Some("prod".into()),
            usage_start_timestamp: Some("2024-05-01T10:00:00Z".into()),
            gross_charge: Some(12.5),
            quantity: Some(3.0),
            ..Default::default()
        }];
        let summary = aggregate(&records);
        let inventory = InventorySummary::default();
        let page = ConsumptionPage {
            generated_at: Utc.with_ymd_and_hms(2024, 5, 31, 8, 0, 0).unwrap(),
            period_days: 30,
            summary: &summary,
            inventory: &inventory,
            estimate: CostEstimate {
                monthly_credits: 12.5,
                source: CostSource::Consumption,
            },
            recommendations: &[],
            forecast: None,
            dashboard_url: Some("https://kibana/app/dashboards#/view/dashboard-cdp-main".into()),
        };

        assert_eq!(page.title(), "CDP consumption - 2024-05");
        let md = page.markdown();
        assert!(md.contains("| etl-prod | prod | 12.50 | 3.0 | 100.0% |"));
        assert!(md.contains("[Kibana](https://kibana/app/dashboards#/view/dashboard-cdp-main)"));
        assert!(!md.contains("## Recommendations"));
    }
}
