//! Kibana publishing: data views, Lens visualizations and dashboards.

pub mod catalog;
pub mod client;
pub mod dashboard;
pub mod lens;

pub use catalog::DataViewSpec;
pub use client::{KibanaClient, SaveOutcome, SavedObjectSummary};
pub use dashboard::{Dashboard, PanelLayout};
pub use lens::{Bucket, Chart, Lens, Measure, SeriesType};
