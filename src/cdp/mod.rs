//! Cloudera CDP access through the `cdp` command-line client.

pub mod client;
pub mod types;

pub use client::{CdpCli, MAX_HISTORY_DAYS, clamp_history_days, load_records_file, usage_window};
pub use types::{
    CdpSnapshot, CdpUser, DataHubCluster, Datalake, Environment, InventorySummary, UsagePeriod,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CdpError {
    #[error("Failed to run {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`cdp {command}` failed (exit code {}): {stderr}", .code.map_or("none".to_string(), |c| c.to_string()))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Invalid JSON from `{command}`: {source}")]
    Parse {
        command: String,
        #[source]
        source: serde_json::Error,
    },
}
