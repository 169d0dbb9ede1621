//! Documents written to the consumption indices

use crate::usage::aggregator::DailyClusterSummary;
use crate::usage::forecast::ForecastPoint;
use crate::usage::record::UsageRecord;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;

/// Cluster name used for forecasts over all clusters
pub const TOTAL_SERIES: &str = "Total";

/// `<base>-YYYY.MM.DD` for the given ingestion day
pub fn daily_index_name(base: &str, day: DateTime<Utc>) -> String {
    format!("{}-{}", base, day.format("%Y.%m.%d"))
}

/// Wildcard pattern matching every daily index of `base`
pub fn index_pattern(base: &str) -> String {
    format!("{}-*", base)
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn start_of_day(date: NaiveDate) -> String {
    format!("{}T00:00:00Z", date.format("%Y-%m-%d"))
}

/// A raw usage record plus its calendar attributes
#[derive(Debug, Clone, Serialize)]
pub struct RecordDocument {
    #[serde(rename = "@timestamp")]
    pub timestamp: String,
    pub ingestion_time: String,
    pub usage_start: Option<String>,
    pub usage_end: Option<String>,
    pub cluster_name: Option<String>,
    pub cluster_crn: Option<String>,
    pub environment_name: Option<String>,
    pub cloud_provider: Option<String>,
    pub instance_type: Option<String>,
    pub instance_count: Option<u32>,
    pub hours: Option<f64>,
    pub quantity: Option<f64>,
    pub credits: Option<f64>,
    pub list_rate: Option<f64>,
    pub cluster_type: Option<String>,
    pub cluster_template: Option<String>,
    pub hour_of_day: Option<u32>,
    pub day_of_week: Option<u32>,
    pub day_of_week_name: Option<&'static str>,
    pub is_weekend: Option<bool>,
    pub is_night: Option<bool>,
    pub weekend_label: Option<&'static str>,
    pub time_of_day_label: Option<&'static str>,
    pub time_block: Option<String>,
}

impl RecordDocument {
    /// `@timestamp` is the usage start, or the ingestion time when the record
    /// has no usable start
    pub fn from_record(record: &UsageRecord, ingested_at: DateTime<Utc>) -> Self {
        let started = record.started_at();
        let attrs = record.time_attributes();

        Self {
            timestamp: rfc3339(started.unwrap_or(ingested_at)),
            ingestion_time: rfc3339(ingested_at),
            usage_start: record.usage_start_timestamp.clone(),
            usage_end: record.usage_end_timestamp.clone(),
            cluster_name: record.cluster_name.clone(),
            cluster_crn: record.cluster_crn.clone(),
            environment_name: record.environment_name.clone(),
            cloud_provider: record.cloud_provider.clone(),
            instance_type: record.instance_type.clone(),
            instance_count: record.instance_count,
            hours: record.hours,
            quantity: record.quantity,
            credits: record.gross_charge,
            list_rate: record.list_rate,
            cluster_type: record.cluster_type.clone(),
            cluster_template: record.cluster_template.clone(),
            hour_of_day: attrs.as_ref().map(|a| a.hour_of_day),
            day_of_week: attrs.as_ref().map(|a| a.day_of_week),
            day_of_week_name: attrs.as_ref().map(|a| a.day_name),
            is_weekend: attrs.as_ref().map(|a| a.is_weekend),
            is_night: attrs.as_ref().map(|a| a.is_night),
            weekend_label: attrs.as_ref().map(|a| a.weekend_label()),
            time_of_day_label: attrs.as_ref().map(|a| a.time_of_day_label()),
            time_block: attrs.map(|a| a.time_block),
        }
    }
}

/// One (date, cluster, environment) row of the summary index
#[derive(Debug, Clone, Serialize)]
pub struct SummaryDocument {
    #[serde(rename = "@timestamp")]
    pub timestamp: String,
    pub date: NaiveDate,
    pub cluster_name: String,
    pub environment_name: String,
    pub total_credits: f64,
    pub total_hours: f64,
    pub total_quantity: f64,
    pub instance_types: Vec<String>,
    pub avg_credits_per_hour: f64,
}

impl From<&DailyClusterSummary> for SummaryDocument {
    fn from(row: &DailyClusterSummary) -> Self {
        Self {
            timestamp: start_of_day(row.date),
            date: row.date,
            cluster_name: row.cluster_name.clone(),
            environment_name: row.environment_name.clone(),
            total_credits: row.total_credits,
            total_hours: row.total_hours,
            total_quantity: row.total_quantity,
            instance_types: row.instance_types.clone(),
            avg_credits_per_hour: row.avg_credits_per_hour,
        }
    }
}

/// One predicted day
#[derive(Debug, Clone, Serialize)]
pub struct ForecastDocument {
    #[serde(rename = "@timestamp")]
    pub timestamp: String,
    pub forecast_date: String,
    pub predicted_credits: f64,
    pub predicted_credits_lower: f64,
    pub predicted_credits_upper: f64,
    /// Cluster name, or `Total` for the all-cluster series
    pub cluster_name: String,
    pub forecast_created: String,
    pub forecast_method: String,
    pub is_forecast: bool,
}

impl ForecastDocument {
    pub fn from_point(
        point: &ForecastPoint,
        cluster: Option<&str>,
        method: &str,
        created: DateTime<Utc>,
    ) -> Self {
        let day = start_of_day(point.date);
        Self {
            timestamp: day.clone(),
            forecast_date: day,
            predicted_credits: point.predicted,
            predicted_credits_lower: point.lower,
            predicted_credits_upper: point.upper,
            cluster_name: cluster.unwrap_or(TOTAL_SERIES).to_string(),
            forecast_created: rfc3339(created),
            forecast_method: method.to_string(),
            is_forecast: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ingest_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 3, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_daily_index_name() {
        assert_eq!(
            daily_index_name("cdp-consumption-records", ingest_time()),
            "cdp-consumption-records-2025.02.03"
        );
        assert_eq!(index_pattern("cdp-consumption-summary"), "cdp-consumption-summary-*");
    }

    #[test]
    fn test_record_document_fields() {
        let record = UsageRecord {
            usage_start_timestamp: Some("2025-02-01T21:00:00Z".into()),
            cluster_name: Some("etl".into()),
            gross_charge: Some(3.5),
            quantity: Some(2.0),
            ..Default::default()
        };
        let doc = serde_json::to_value(RecordDocument::from_record(&record, ingest_time())).unwrap();

        assert_eq!(doc["@timestamp"], "2025-02-01T21:00:00Z");
        assert_eq!(doc["ingestion_time"], "2025-02-03T12:00:00Z");
        assert_eq!(doc["credits"], 3.5);
        assert_eq!(doc["day_of_week_name"], "Saturday");
        assert_eq!(doc["is_weekend"], true);
        assert_eq!(doc["time_of_day_label"], "Night");
        assert_eq!(doc["time_block"], "20:00-24:00");
    }

    #[test]
    fn test_undated_record_uses_ingestion_time() {
        let doc = RecordDocument::from_record(&UsageRecord::default(), ingest_time());
        assert_eq!(doc.timestamp, "2025-02-03T12:00:00Z");
        assert!(doc.hour_of_day.is_none());
        assert!(doc.time_block.is_none());
    }

    #[test]
    fn test_forecast_document_defaults_to_total() {
        let point = ForecastPoint {
            date: NaiveDate::from_ymd_opt(2025, 2, 4).unwrap(),
            predicted: 10.0,
            lower: 9.0,
            upper: 11.0,
        };
        let doc = ForecastDocument::from_point(&point, None, "linear", ingest_time());
        assert_eq!(doc.cluster_name, "Total");
        assert_eq!(doc.timestamp, "2025-02-04T00:00:00Z");
        assert!(doc.is_forecast);

        let doc = ForecastDocument::from_point(&point, Some("etl"), "linear", ingest_time());
        assert_eq!(doc.cluster_name, "etl");
    }
}
