//! Google Cloud inventory: Compute Engine instances and disks, Cloud Storage
//! buckets with their sizes, and a monthly cost estimate.

pub mod client;
pub mod inventory;
pub mod pricing;

use crate::api::ApiError;
use thiserror::Error;

pub use client::{Bucket, Disk, GcpClient, GcpEndpoints, Instance, access_token, resolve_project};
pub use inventory::{BucketUsage, GcpInventory};
pub use pricing::{CostBreakdown, estimate_costs, format_size};

#[derive(Error, Debug)]
pub enum GcpError {
    #[error("No Google Cloud project configured (set gcp.project_id or run `gcloud config set project`)")]
    MissingProject,

    #[error("Could not obtain an access token from `{command}`: {message}")]
    Token { command: String, message: String },

    #[error(transparent)]
    Api(#[from] ApiError),
}
