//! REST plumbing shared by every HTTP integration
//!
//! Provides a base-URL bound client with credential handling and a single
//! error taxonomy for Elasticsearch, Kibana, Jira, Confluence and Google Cloud.

pub mod client;
pub mod error;

pub use client::{ApiAuth, RestClient, USER_AGENT, encode, extract_error_message};
pub use error::{ApiError, Result};
