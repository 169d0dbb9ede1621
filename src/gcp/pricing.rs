//! Approximate list prices (USD, Europe regions)

use super::inventory::GcpInventory;
use crate::usage::recommendations::HOURS_PER_MONTH;
use serde::Serialize;

/// Hourly on-demand price used for machine types missing from the table
pub const DEFAULT_HOURLY_PRICE: f64 = 0.1;
/// Standard persistent disk, per GB-month
pub const DISK_GB_MONTH: f64 = 0.040;
/// Standard Cloud Storage, per GB-month
pub const STORAGE_GB_MONTH: f64 = 0.020;

const MACHINE_HOURLY_PRICES: &[(&str, f64)] = &[
    ("e2-standard-2", 0.067),
    ("e2-standard-4", 0.134),
    ("e2-standard-8", 0.268),
    ("n1-standard-1", 0.0475),
    ("n1-standard-2", 0.095),
    ("n1-standard-4", 0.19),
    ("n1-standard-8", 0.38),
    ("n2-standard-2", 0.097),
    ("n2-standard-4", 0.194),
    ("n2-standard-8", 0.388),
    ("n2-highmem-4", 0.260),
    ("n2-highmem-8", 0.520),
];

pub fn hourly_price(machine_type: &str) -> f64 {
    MACHINE_HOURLY_PRICES
        .iter()
        .find(|(name, _)| *name == machine_type)
        .map_or(DEFAULT_HOURLY_PRICE, |(_, price)| *price)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CostBreakdown {
    /// Running instances
    pub compute: f64,
    pub disks: f64,
    pub storage: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.compute + self.disks + self.storage
    }
}

/// Monthly cost: running instances around the clock, disks and buckets
pub fn estimate_costs(inventory: &GcpInventory) -> CostBreakdown {
    let compute: f64 = inventory
        .machine_types
        .iter()
        .map(|(machine_type, counts)| {
            counts.running as f64 * hourly_price(machine_type) * HOURS_PER_MONTH
        })
        .sum();
    CostBreakdown {
        compute,
        disks: inventory.disk_total_gb * DISK_GB_MONTH,
        storage: inventory.storage_total_gb() * STORAGE_GB_MONTH,
    }
}

/// Human-readable byte size with two decimals (`1.50 KB`)
pub fn format_size(bytes: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{:.2} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.2} PB", size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcp::inventory::MachineTypeCount;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0.0), "0.00 B");
        assert_eq!(format_size(1536.0), "1.50 KB");
        assert_eq!(format_size(1024.0 * 1024.0 * 1024.0), "1.00 GB");
        assert_eq!(format_size(1024f64.powi(5) * 3.0), "3.00 PB");
    }

    #[test]
    fn test_estimate_uses_table_and_default() {
        let mut inventory = GcpInventory::default();
        inventory.machine_types.insert(
            "n2-standard-4".into(),
            MachineTypeCount { count: 3, running: 2, stopped: 1 },
        );
        inventory.machine_types.insert(
            "custom-8-32768".into(),
            MachineTypeCount { count: 1, running: 1, stopped: 0 },
        );
        inventory.disk_total_gb = 100.0;

        let costs = estimate_costs(&inventory);
        let expected_compute = (2.0 * 0.194 + 0.1) * 730.0;
        assert!((costs.compute - expected_compute).abs() < 1e-9);
        assert!((costs.disks - 4.0).abs() < 1e-9);
        assert_eq!(costs.storage, 0.0);
        assert!((costs.total() - (expected_compute + 4.0)).abs() < 1e-9);
    }
}
