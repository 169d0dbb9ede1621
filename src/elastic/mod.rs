//! Elasticsearch access: REST client, index templates and document shapes.

pub mod client;
pub mod documents;
pub mod templates;

pub use client::{
    BULK_CHUNK_SIZE, BulkSummary, ClusterCredits, ClusterInfo, ElasticClient, IndexInfo,
    QuantityTotal,
};
pub use documents::{
    ForecastDocument, RecordDocument, SummaryDocument, TOTAL_SERIES, daily_index_name,
    index_pattern,
};
