//! CDP compute usage records
//!
//! Mirrors one entry of `cdp consumption list-compute-usage-records`. The
//! billing API omits fields freely, so everything is optional on the wire.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder for a missing cluster, environment or instance type
pub const UNKNOWN: &str = "Unknown";

/// Day names, Monday first (matches `day_of_week`)
pub const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// One compute usage record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageRecord {
    pub usage_start_timestamp: Option<String>,
    pub usage_end_timestamp: Option<String>,
    pub cluster_name: Option<String>,
    pub cluster_crn: Option<String>,
    pub environment_name: Option<String>,
    pub cloud_provider: Option<String>,
    pub instance_type: Option<String>,
    pub instance_count: Option<u32>,
    /// Per-instance hours
    pub hours: Option<f64>,
    /// Billable instance-hours (hours x instance count)
    pub quantity: Option<f64>,
    /// Credits charged
    pub gross_charge: Option<f64>,
    pub list_rate: Option<f64>,
    pub cluster_type: Option<String>,
    pub cluster_template: Option<String>,
}

/// Calendar attributes of a record's usage start
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeAttributes {
    pub hour_of_day: u32,
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: u32,
    pub day_name: &'static str,
    pub is_weekend: bool,
    pub is_night: bool,
    /// Four-hour block, e.g. `"08:00-12:00"`
    pub time_block: String,
}

impl TimeAttributes {
    /// Derive the attributes from a UTC instant
    pub fn from_datetime(ts: &DateTime<Utc>) -> Self {
        let hour_of_day = ts.hour();
        let day_of_week = ts.weekday().num_days_from_monday();
        let block_start = (hour_of_day / 4) * 4;

        Self {
            hour_of_day,
            day_of_week,
            day_name: DAY_NAMES[day_of_week as usize],
            is_weekend: day_of_week >= 5,
            is_night: hour_of_day >= 20 || hour_of_day <= 6,
            time_block: format!("{:02}:00-{:02}:00", block_start, block_start + 4),
        }
    }

    pub fn weekend_label(&self) -> &'static str {
        if self.is_weekend { "Weekend" } else { "Weekday" }
    }

    pub fn time_of_day_label(&self) -> &'static str {
        if self.is_night { "Night" } else { "Day" }
    }
}

impl UsageRecord {
    /// Credits charged, zero when absent
    pub fn credits(&self) -> f64 {
        self.gross_charge.unwrap_or(0.0)
    }

    /// Billable instance-hours, zero when absent
    pub fn billable_hours(&self) -> f64 {
        self.quantity.unwrap_or(0.0)
    }

    /// Per-instance hours, zero when absent
    pub fn instance_hours(&self) -> f64 {
        self.hours.unwrap_or(0.0)
    }

    pub fn cluster(&self) -> &str {
        non_empty(self.cluster_name.as_deref())
    }

    pub fn environment(&self) -> &str {
        non_empty(self.environment_name.as_deref())
    }

    pub fn instance_type(&self) -> &str {
        non_empty(self.instance_type.as_deref())
    }

    /// Usage start as a UTC instant; `None` when missing or unparsable
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.usage_start_timestamp.as_deref()?)
    }

    /// Calendar date of the usage start
    pub fn date_key(&self) -> Option<NaiveDate> {
        self.started_at().map(|ts| ts.date_naive())
    }

    pub fn time_attributes(&self) -> Option<TimeAttributes> {
        self.started_at().map(|ts| TimeAttributes::from_datetime(&ts))
    }
}

fn non_empty(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => UNKNOWN,
    }
}

/// Parse an RFC 3339 timestamp (`Z` or numeric offset) into UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_at(ts: &str) -> UsageRecord {
        UsageRecord {
            usage_start_timestamp: Some(ts.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_deserializes_billing_payload() {
        let json = r#"{
            "usageStartTimestamp": "2025-01-06T09:00:00Z",
            "usageEndTimestamp": "2025-01-06T10:00:00Z",
            "clusterName": "prod-datahub",
            "clusterCrn": "crn:cdp:datahub:eu-1:abc:cluster:1",
            "environmentName": "prod-env",
            "cloudProvider": "GCP",
            "instanceType": "n2-highmem-8",
            "instanceCount": 3,
            "hours": 1.0,
            "quantity": 3.0,
            "grossCharge": 4.5,
            "listRate": 1.5,
            "someFutureField": "ignored"
        }"#;

        let record: UsageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.cluster(), "prod-datahub");
        assert_eq!(record.instance_count, Some(3));
        assert_eq!(record.billable_hours(), 3.0);
        assert_eq!(record.instance_hours(), 1.0);
        assert_eq!(record.credits(), 4.5);
    }

    #[test]
    fn test_missing_fields_default() {
        let record: UsageRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record.credits(), 0.0);
        assert_eq!(record.billable_hours(), 0.0);
        assert_eq!(record.cluster(), UNKNOWN);
        assert_eq!(record.environment(), UNKNOWN);
        assert_eq!(record.instance_type(), UNKNOWN);
        assert!(record.started_at().is_none());
    }

    #[test]
    fn test_blank_names_are_unknown() {
        let record = UsageRecord {
            cluster_name: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(record.cluster(), UNKNOWN);
    }

    #[test]
    fn test_timestamp_parsing() {
        assert!(record_at("2025-01-01T00:00:00Z").started_at().is_some());
        assert!(record_at("2025-01-01T01:00:00+01:00").started_at().is_some());
        assert!(record_at("not a date").started_at().is_none());
        assert!(record_at("").started_at().is_none());

        let shifted = record_at("2025-01-01T00:30:00+01:00");
        assert_eq!(
            shifted.date_key(),
            NaiveDate::from_ymd_opt(2024, 12, 31)
        );
    }

    #[test]
    fn test_time_attributes() {
        // 2025-01-04 is a Saturday
        let attrs = record_at("2025-01-04T22:15:00Z").time_attributes().unwrap();
        assert_eq!(attrs.hour_of_day, 22);
        assert_eq!(attrs.day_of_week, 5);
        assert_eq!(attrs.day_name, "Saturday");
        assert!(attrs.is_weekend);
        assert!(attrs.is_night);
        assert_eq!(attrs.time_block, "20:00-24:00");
        assert_eq!(attrs.weekend_label(), "Weekend");

        // 2025-01-06 is a Monday
        let attrs = record_at("2025-01-06T09:00:00Z").time_attributes().unwrap();
        assert_eq!(attrs.day_of_week, 0);
        assert!(!attrs.is_weekend);
        assert!(!attrs.is_night);
        assert_eq!(attrs.time_block, "08:00-12:00");
        assert_eq!(attrs.time_of_day_label(), "Day");
    }

    #[test]
    fn test_night_boundaries() {
        assert!(record_at("2025-01-06T06:59:00Z").time_attributes().unwrap().is_night);
        assert!(!record_at("2025-01-06T07:00:00Z").time_attributes().unwrap().is_night);
        assert!(!record_at("2025-01-06T19:59:00Z").time_attributes().unwrap().is_night);
        assert!(record_at("2025-01-06T20:00:00Z").time_attributes().unwrap().is_night);
    }
}
