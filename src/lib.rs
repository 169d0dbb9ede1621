//! # CDP Insights
//!
//! A Rust-based command-line application that collects Cloudera CDP consumption
//! and inventory data, forecasts credit spend, loads everything into
//! Elasticsearch and publishes Kibana dashboards, HTML reports and
//! Confluence/Jira updates.
//!
//! ## Features
//!
//! - **Collection**: Usage records and inventory from the `cdp` CLI, with page caps
//! - **Aggregation**: Totals by cluster, environment, instance type, day, hour and weekday
//! - **Forecasting**: Linear trend and weekday-seasonal models with confidence bands
//! - **Elasticsearch**: Daily indices, templates and bulk loading with item accounting
//! - **Kibana**: Lens visualizations and dashboards created through saved objects
//! - **Reports**: Standalone HTML dashboards for CDP and Google Cloud
//! - **Atlassian**: Jira search/export and Confluence publishing
//!
//! ## Example
//!
//! ```rust,no_run
//! use cdp_insights::usage::{aggregate, Forecaster, ForecastMethod};
//! use cdp_insights::cdp::load_records_file;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let records = load_records_file(Path::new("usage.json"))?;
//! let summary = aggregate(&records);
//! let forecast = Forecaster::new(ForecastMethod::Linear).forecast(&summary.daily_series());
//! println!("{:.2} credits predicted", forecast.total_predicted());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod atlassian;
pub mod cdp;
pub mod cli;
pub mod common;
pub mod config;
pub mod elastic;
pub mod error;
pub mod gcp;
pub mod handlers;
pub mod kibana;
pub mod report;
pub mod usage;

// Re-export commonly used types and functions
pub use config::Config;
pub use error::{InsightsError, Result};
pub use usage::{Forecaster, UsageRecord, UsageSummary, aggregate};
use cli::Commands;

/// The current version of the CLI tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn run_command(command: Commands, config: &Config, quiet: bool) -> Result<()> {
    match command {
        Commands::Report {
            output,
            days,
            input,
            method,
            no_forecast,
            logo,
        } => {
            let options = handlers::ReportOptions {
                output,
                days,
                input,
                method,
                no_forecast,
                logo,
            };
            handlers::handle_report(options, config, quiet).await
        }
        Commands::Ingest {
            days,
            input,
            keep_old,
            dry_run,
        } => handlers::handle_ingest(days, input, keep_old, dry_run, config, quiet).await,
        Commands::Forecast {
            horizon,
            method,
            clusters,
            history_days,
            input,
            index,
            format,
        } => {
            let options = handlers::ForecastOptions {
                horizon,
                method,
                clusters,
                history_days,
                input,
                index,
                format,
            };
            handlers::handle_forecast(options, config, quiet).await
        }
        Commands::Kibana { command } => handlers::handle_kibana(command, config, quiet).await,
        Commands::Stats { command } => handlers::handle_stats(command, config, quiet).await,
        Commands::Gcp { command } => handlers::handle_gcp(command, config, quiet).await,
        Commands::Jira { command } => handlers::handle_jira(command, config, quiet).await,
        Commands::Confluence { command } => {
            handlers::handle_confluence(command, config, quiet).await
        }
        Commands::Config { command } => handlers::handle_config(command, config),
    }
}
