// Handler modules
pub mod config;
pub mod confluence;
pub mod forecast;
pub mod gcp;
pub mod ingest;
pub mod jira;
pub mod kibana;
pub mod report;
pub mod stats;
pub mod utils;

// Re-export all handler functions
pub use config::handle_config;
pub use confluence::handle_confluence;
pub use forecast::{ForecastOptions, handle_forecast};
pub use gcp::handle_gcp;
pub use ingest::handle_ingest;
pub use jira::handle_jira;
pub use kibana::handle_kibana;
pub use report::{ReportOptions, handle_report};
pub use stats::handle_stats;
