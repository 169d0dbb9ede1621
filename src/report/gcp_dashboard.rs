//! Google Cloud resource and cost dashboard

use super::{ReportError, format_number, render, write_report};
use crate::gcp::inventory::GcpInventory;
use crate::gcp::pricing::{CostBreakdown, STORAGE_GB_MONTH, format_size};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use tera::Context;

const TEMPLATE: &str = include_str!("../../templates/gcp_dashboard.html.tera");

pub struct GcpReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub inventory: &'a GcpInventory,
    pub costs: CostBreakdown,
    pub logo: Option<String>,
}

#[derive(Serialize)]
struct BucketRow {
    name: String,
    location: String,
    storage_class: String,
    size: String,
    monthly_cost: String,
}

impl GcpReport<'_> {
    fn context(&self) -> Context {
        let inventory = self.inventory;
        let mut context = Context::new();
        context.insert("generated_at", &self.generated_at.format("%Y-%m-%d %H:%M UTC").to_string());
        context.insert("project_id", &inventory.project_id);
        context.insert("logo", &self.logo);
        context.insert("instance_count", &inventory.instance_count());
        context.insert("running", &inventory.running);
        context.insert("stopped", &inventory.stopped);
        context.insert("machine_types", &inventory.machine_types);
        context.insert("regions", &inventory.regions);
        context.insert("disk_count", &inventory.disk_count);
        context.insert("disk_total_gb", &format_number(inventory.disk_total_gb, 0));
        context.insert("disk_types", &inventory.disk_types);

        let buckets: Vec<BucketRow> = inventory
            .buckets
            .iter()
            .map(|b| BucketRow {
                name: b.name.clone(),
                location: b.location.clone(),
                storage_class: b.storage_class.clone(),
                size: b
                    .size_bytes
                    .map_or_else(|| "n/a".to_string(), format_size),
                monthly_cost: format_number(b.size_gb() * STORAGE_GB_MONTH, 2),
            })
            .collect();
        context.insert("buckets", &buckets);
        context.insert("storage_total_gb", &format_number(inventory.storage_total_gb(), 2));

        context.insert("cost_compute", &format_number(self.costs.compute, 2));
        context.insert("cost_disks", &format_number(self.costs.disks, 2));
        context.insert("cost_storage", &format_number(self.costs.storage, 2));
        context.insert("cost_total", &format_number(self.costs.total(), 2));

        let chart_data = json!({
            "machineTypes": inventory.machine_types.keys().collect::<Vec<_>>(),
            "machineCounts": inventory.machine_types.values().map(|m| m.count).collect::<Vec<_>>(),
            "costLabels": ["Compute", "Disks", "Storage"],
            "costValues": [self.costs.compute, self.costs.disks, self.costs.storage],
        });
        context.insert("chart_data", &chart_data.to_string().replace("</", "<\\/"));
        context
    }

    pub fn render(&self) -> Result<String, ReportError> {
        render("gcp_dashboard.html", TEMPLATE, &self.context())
    }

    pub fn write(&self, path: &Path) -> Result<(), ReportError> {
        let html = self.render()?;
        write_report(path, &html)?;
        log::info!("GCP dashboard written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcp::client::{Bucket, Instance};
    use crate::gcp::inventory::BucketUsage;
    use crate::gcp::pricing::estimate_costs;

    #[test]
    fn test_render_gcp_dashboard() {
        let instances = vec![Instance {
            name: "worker-1".into(),
            machine_type: "x/machineTypes/n2-standard-8".into(),
            status: "RUNNING".into(),
            zone: "x/zones/europe-west1-b".into(),
        }];
        let buckets = vec![BucketUsage::from_bucket(
            Bucket {
                name: "raw-data".into(),
                location: "EU".into(),
                storage_class: "STANDARD".into(),
            },
            Some(5.0 * 1024.0 * 1024.0 * 1024.0),
        )];
        let inventory = GcpInventory::build("analytics-prod", &instances, &[], buckets);
        let report = GcpReport {
            generated_at: Utc::now(),
            inventory: &inventory,
            costs: estimate_costs(&inventory),
            logo: None,
        };

        let html = report.render().unwrap();
        assert!(html.contains("analytics-prod"));
        assert!(html.contains("worker-1"));
        assert!(html.contains("5.00 GB"));
        // 0.388 * 730 + 5 * 0.02
        assert!(html.contains("283.34"));
    }
}
