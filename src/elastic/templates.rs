//! Index templates for the three consumption index families

use serde_json::{Value, json};

/// Template name for an index base name
pub fn template_name(base: &str) -> String {
    format!("{}-template", base)
}

fn template(base: &str, settings: Value, properties: Value) -> Value {
    json!({
        "index_patterns": [format!("{}-*", base)],
        "template": {
            "settings": settings,
            "mappings": { "properties": properties }
        }
    })
}

pub fn records_template(base: &str) -> Value {
    template(
        base,
        json!({
            "number_of_shards": 1,
            "number_of_replicas": 1,
            "index.codec": "best_compression"
        }),
        json!({
            "@timestamp": {"type": "date"},
            "ingestion_time": {"type": "date"},
            "usage_start": {"type": "date"},
            "usage_end": {"type": "date"},
            "cluster_name": {"type": "keyword"},
            "cluster_crn": {"type": "keyword"},
            "environment_name": {"type": "keyword"},
            "cloud_provider": {"type": "keyword"},
            "instance_type": {"type": "keyword"},
            "instance_count": {"type": "integer"},
            "hours": {"type": "float"},
            "quantity": {"type": "float"},
            "credits": {"type": "float"},
            "list_rate": {"type": "float"},
            "cluster_type": {"type": "keyword"},
            "cluster_template": {"type": "keyword"},
            "hour_of_day": {"type": "integer"},
            "day_of_week": {"type": "integer"},
            "day_of_week_name": {"type": "keyword"},
            "is_weekend": {"type": "boolean"},
            "is_night": {"type": "boolean"},
            "weekend_label": {"type": "keyword"},
            "time_of_day_label": {"type": "keyword"},
            "time_block": {"type": "keyword"}
        }),
    )
}

pub fn summary_template(base: &str) -> Value {
    template(
        base,
        json!({"number_of_shards": 1, "number_of_replicas": 1}),
        json!({
            "@timestamp": {"type": "date"},
            "date": {"type": "date"},
            "cluster_name": {"type": "keyword"},
            "environment_name": {"type": "keyword"},
            "total_credits": {"type": "float"},
            "total_hours": {"type": "float"},
            "total_quantity": {"type": "float"},
            "instance_types": {"type": "keyword"},
            "avg_credits_per_hour": {"type": "float"}
        }),
    )
}

pub fn forecast_template(base: &str) -> Value {
    template(
        base,
        json!({"number_of_shards": 1, "number_of_replicas": 1}),
        json!({
            "@timestamp": {"type": "date"},
            "forecast_date": {"type": "date"},
            "predicted_credits": {"type": "float"},
            "predicted_credits_lower": {"type": "float"},
            "predicted_credits_upper": {"type": "float"},
            "cluster_name": {"type": "keyword"},
            "forecast_created": {"type": "date"},
            "forecast_method": {"type": "keyword"},
            "is_forecast": {"type": "boolean"}
        }),
    )
}
