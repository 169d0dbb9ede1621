use super::client::{Bucket, Disk, Instance};
use serde::Serialize;
use std::collections::BTreeMap;

const STATUS_RUNNING: &str = "RUNNING";

/// Last path segment of a resource URL
pub fn last_segment(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// `europe-west1-b` -> `europe-west1`
pub fn region_of_zone(zone: &str) -> &str {
    zone.rsplit_once('-').map_or(zone, |(region, _)| region)
}

#[derive(Debug, Clone, Serialize)]
pub struct InstanceSummary {
    pub name: String,
    pub machine_type: String,
    pub zone: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MachineTypeCount {
    pub count: usize,
    pub running: usize,
    pub stopped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DiskTypeTotal {
    pub count: usize,
    pub total_gb: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegionCounts {
    pub instances: usize,
    pub disks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketUsage {
    pub name: String,
    pub location: String,
    pub storage_class: String,
    /// `None` when Cloud Monitoring had no sample
    pub size_bytes: Option<f64>,
}

impl BucketUsage {
    pub fn from_bucket(bucket: Bucket, size_bytes: Option<f64>) -> Self {
        Self {
            name: bucket.name,
            location: bucket.location,
            storage_class: bucket.storage_class,
            size_bytes,
        }
    }

    pub fn size_gb(&self) -> f64 {
        self.size_bytes.unwrap_or(0.0) / (1024.0 * 1024.0 * 1024.0)
    }
}

/// Aggregated view of one project's resources
#[derive(Debug, Clone, Default, Serialize)]
pub struct GcpInventory {
    pub project_id: String,
    pub running: Vec<InstanceSummary>,
    pub stopped: Vec<InstanceSummary>,
    pub machine_types: BTreeMap<String, MachineTypeCount>,
    pub disk_count: usize,
    pub disk_total_gb: f64,
    pub disk_types: BTreeMap<String, DiskTypeTotal>,
    pub regions: BTreeMap<String, RegionCounts>,
    pub buckets: Vec<BucketUsage>,
}

impl GcpInventory {
    pub fn build(
        project_id: &str,
        instances: &[Instance],
        disks: &[Disk],
        buckets: Vec<BucketUsage>,
    ) -> Self {
        let mut inventory = GcpInventory {
            project_id: project_id.to_string(),
            ..Default::default()
        };

        for instance in instances {
            let zone = last_segment(&instance.zone).to_string();
            let machine_type = last_segment(&instance.machine_type).to_string();
            inventory
                .regions
                .entry(region_of_zone(&zone).to_string())
                .or_default()
                .instances += 1;

            let counts = inventory.machine_types.entry(machine_type.clone()).or_default();
            counts.count += 1;
            let running = instance.status == STATUS_RUNNING;
            if running {
                counts.running += 1;
            } else {
                counts.stopped += 1;
            }

            let summary = InstanceSummary {
                name: instance.name.clone(),
                machine_type,
                zone,
                status: instance.status.clone(),
            };
            if running {
                inventory.running.push(summary);
            } else {
                inventory.stopped.push(summary);
            }
        }

        for disk in disks {
            let size = disk.size_gb();
            inventory.disk_count += 1;
            inventory.disk_total_gb += size;
            let disk_type = if disk.disk_type.is_empty() {
                "unknown"
            } else {
                last_segment(&disk.disk_type)
            };
            let total = inventory.disk_types.entry(disk_type.to_string()).or_default();
            total.count += 1;
            total.total_gb += size;
            let zone = last_segment(&disk.zone);
            inventory
                .regions
                .entry(region_of_zone(zone).to_string())
                .or_default()
                .disks += 1;
        }

        inventory.buckets = buckets;
        inventory
            .buckets
            .sort_by(|a, b| b.size_bytes.unwrap_or(0.0).total_cmp(&a.size_bytes.unwrap_or(0.0)));
        inventory
    }

    pub fn instance_count(&self) -> usize {
        self.running.len() + self.stopped.len()
    }

    pub fn storage_total_gb(&self) -> f64 {
        self.buckets.iter().map(BucketUsage::size_gb).sum()
    }
}
