//! Grouped sums over compute usage records.
//!
//! One pass over the records fills every bucket family at once. Records
//! without a usable start timestamp still count toward the overall total and
//! the cluster, environment and instance-type families, but cannot be placed
//! on a calendar.

use super::record::{TimeAttributes, UsageRecord};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Credits and billable hours accumulated together
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub credits: f64,
    pub hours: f64,
}

impl Totals {
    pub fn add(&mut self, credits: f64, hours: f64) {
        self.credits += credits;
        self.hours += hours;
    }

    /// Credits per billable hour, zero when no hours were recorded
    pub fn credits_per_hour(&self) -> f64 {
        if self.hours > 0.0 {
            self.credits / self.hours
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClusterUsage {
    pub totals: Totals,
    pub environment: String,
    pub instance_types: BTreeSet<String>,
    /// Credits by hour of day, dated records only
    pub by_hour: BTreeMap<u32, f64>,
    /// Credits by day of week (0 = Monday), dated records only
    pub by_weekday: BTreeMap<u32, f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InstanceTypeUsage {
    pub totals: Totals,
    pub records: usize,
}

/// Result of one aggregation pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct UsageSummary {
    pub record_count: usize,
    pub total: Totals,
    pub by_cluster: BTreeMap<String, ClusterUsage>,
    pub by_environment: BTreeMap<String, Totals>,
    pub by_instance_type: BTreeMap<String, InstanceTypeUsage>,
    pub by_date: BTreeMap<NaiveDate, Totals>,
    pub by_cluster_and_date: BTreeMap<String, BTreeMap<NaiveDate, f64>>,
    pub by_hour: BTreeMap<u32, Totals>,
    pub by_weekday: BTreeMap<u32, Totals>,
    /// Records whose start timestamp was missing or unparsable
    pub undated_records: usize,
}

/// Streaming aggregator; feed records with `add` and call `finish`
#[derive(Debug, Default)]
pub struct UsageAggregator {
    summary: UsageSummary,
}

impl UsageAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: &UsageRecord) {
        let credits = record.credits();
        let hours = record.billable_hours();
        let s = &mut self.summary;

        s.record_count += 1;
        s.total.add(credits, hours);

        let cluster = s.by_cluster.entry(record.cluster().to_string()).or_default();
        cluster.totals.add(credits, hours);
        if cluster.environment.is_empty() {
            cluster.environment = record.environment().to_string();
        }
        cluster
            .instance_types
            .insert(record.instance_type().to_string());

        s.by_environment
            .entry(record.environment().to_string())
            .or_default()
            .add(credits, hours);

        let itype = s
            .by_instance_type
            .entry(record.instance_type().to_string())
            .or_default();
        itype.totals.add(credits, hours);
        itype.records += 1;

        let Some(started) = record.started_at() else {
            s.undated_records += 1;
            return;
        };
        let date = started.date_naive();
        let attrs = TimeAttributes::from_datetime(&started);

        s.by_date.entry(date).or_default().add(credits, hours);
        *s.by_cluster_and_date
            .entry(record.cluster().to_string())
            .or_default()
            .entry(date)
            .or_default() += credits;
        s.by_hour
            .entry(attrs.hour_of_day)
            .or_default()
            .add(credits, hours);
        s.by_weekday
            .entry(attrs.day_of_week)
            .or_default()
            .add(credits, hours);

        let cluster = cluster_entry(s, record);
        *cluster.by_hour.entry(attrs.hour_of_day).or_default() += credits;
        *cluster.by_weekday.entry(attrs.day_of_week).or_default() += credits;
    }

    pub fn extend<'a, I>(&mut self, records: I)
    where
        I: IntoIterator<Item = &'a UsageRecord>,
    {
        for record in records {
            self.add(record);
        }
    }

    pub fn finish(self) -> UsageSummary {
        self.summary
    }
}

fn cluster_entry<'s>(summary: &'s mut UsageSummary, record: &UsageRecord) -> &'s mut ClusterUsage {
    summary
        .by_cluster
        .entry(record.cluster().to_string())
        .or_default()
}

/// Aggregate a slice of records in one pass
pub fn aggregate(records: &[UsageRecord]) -> UsageSummary {
    let mut aggregator = UsageAggregator::new();
    aggregator.extend(records);
    aggregator.finish()
}

impl UsageSummary {
    /// Daily credit totals in date order, the forecaster's input
    pub fn daily_series(&self) -> Vec<(NaiveDate, f64)> {
        self.by_date.iter().map(|(d, t)| (*d, t.credits)).collect()
    }

    /// Daily credit totals of one cluster in date order
    pub fn cluster_daily_series(&self, cluster: &str) -> Vec<(NaiveDate, f64)> {
        self.by_cluster_and_date
            .get(cluster)
            .map(|days| days.iter().map(|(d, c)| (*d, *c)).collect())
            .unwrap_or_default()
    }

    /// The `n` clusters with the highest credits, highest first
    pub fn top_clusters(&self, n: usize) -> Vec<(&str, &ClusterUsage)> {
        let mut clusters: Vec<_> = self
            .by_cluster
            .iter()
            .map(|(name, usage)| (name.as_str(), usage))
            .collect();
        clusters.sort_by(|a, b| b.1.totals.credits.total_cmp(&a.1.totals.credits));
        clusters.truncate(n);
        clusters
    }

    /// Instance types by credits, highest first
    pub fn instance_types_by_credits(&self) -> Vec<(&str, &InstanceTypeUsage)> {
        let mut types: Vec<_> = self
            .by_instance_type
            .iter()
            .map(|(name, usage)| (name.as_str(), usage))
            .collect();
        types.sort_by(|a, b| b.1.totals.credits.total_cmp(&a.1.totals.credits));
        types
    }

    /// Credits extrapolated to a 30-day month
    pub fn monthly_projection(&self, period_days: u32) -> f64 {
        if period_days == 0 {
            return 0.0;
        }
        self.total.credits / f64::from(period_days) * 30.0
    }

    /// First and last dated day, if any record carried a date
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.by_date.keys().next()?;
        let last = self.by_date.keys().next_back()?;
        Some((*first, *last))
    }

    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }
}

/// One row per (date, cluster, environment)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyClusterSummary {
    pub date: NaiveDate,
    pub cluster_name: String,
    pub environment_name: String,
    pub total_credits: f64,
    /// Sum of per-instance hours
    pub total_hours: f64,
    /// Sum of billable instance-hours
    pub total_quantity: f64,
    pub instance_types: Vec<String>,
    pub avg_credits_per_hour: f64,
}

#[derive(Default)]
struct DailyAccumulator {
    credits: f64,
    hours: f64,
    quantity: f64,
    instance_types: BTreeSet<String>,
}

/// Per-day, per-cluster rows for the summary index. Undated records are skipped.
pub fn daily_cluster_summaries(records: &[UsageRecord]) -> Vec<DailyClusterSummary> {
    let mut groups: BTreeMap<(NaiveDate, String, String), DailyAccumulator> = BTreeMap::new();

    for record in records {
        let Some(date) = record.date_key() else {
            continue;
        };
        let acc = groups
            .entry((
                date,
                record.cluster().to_string(),
                record.environment().to_string(),
            ))
            .or_default();
        acc.credits += record.credits();
        acc.hours += record.instance_hours();
        acc.quantity += record.billable_hours();
        acc.instance_types.insert(record.instance_type().to_string());
    }

    groups
        .into_iter()
        .map(|((date, cluster_name, environment_name), acc)| DailyClusterSummary {
            date,
            cluster_name,
            environment_name,
            total_credits: acc.credits,
            total_hours: acc.hours,
            total_quantity: acc.quantity,
            instance_types: acc.instance_types.into_iter().collect(),
            avg_credits_per_hour: if acc.hours > 0.0 {
                acc.credits / acc.hours
            } else {
                0.0
            },
        })
        .collect()
}
