//! Usage analytics: record model, aggregation, forecasting and recommendations.

pub mod aggregator;
pub mod forecast;
pub mod recommendations;
pub mod record;

pub use aggregator::{
    DailyClusterSummary, Totals, UsageAggregator, UsageSummary, aggregate,
    daily_cluster_summaries,
};
pub use forecast::{Forecast, ForecastError, ForecastMethod, ForecastPoint, Forecaster};
pub use recommendations::{CostEstimate, CostSource, Recommendation, Severity};
pub use record::{TimeAttributes, UsageRecord};
