use super::templates::template_name;
use crate::api::{ApiAuth, ApiError, RestClient, Result, encode};
use crate::cdp::clamp_history_days;
use crate::config::types::ElasticsearchConfig;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Documents per `_bulk` request
pub const BULK_CHUNK_SIZE: usize = 500;

/// Elasticsearch REST client
#[derive(Debug, Clone)]
pub struct ElasticClient {
    api: RestClient,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterInfo {
    pub cluster_name: String,
    pub version: VersionInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    pub number: String,
}

/// Row of `_cat/indices?format=json`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexInfo {
    pub index: String,
    #[serde(default)]
    pub health: Option<String>,
    #[serde(rename = "docs.count", default)]
    pub docs_count: Option<String>,
    #[serde(rename = "store.size", default)]
    pub store_size: Option<String>,
}

/// Item-level outcome of a bulk load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkSummary {
    pub indexed: usize,
    pub failed: usize,
}

impl BulkSummary {
    fn merge(&mut self, other: BulkSummary) {
        self.indexed += other.indexed;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterCredits {
    pub cluster_name: String,
    pub credits: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuantityTotal {
    pub quantity: f64,
    pub records: u64,
}

/// Prefix a bare host with `https://`
pub fn normalize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

impl ElasticClient {
    pub fn new(config: &ElasticsearchConfig) -> Result<Self> {
        let auth = if config.username.is_empty() {
            ApiAuth::None
        } else {
            ApiAuth::Basic {
                username: config.username.clone(),
                password: config.password.clone(),
            }
        };
        Ok(Self {
            api: RestClient::new(&normalize_url(&config.url), auth)?,
        })
    }

    /// Cluster name and version; doubles as a connection check
    pub async fn info(&self) -> Result<ClusterInfo> {
        self.api.get("/").await
    }

    pub async fn put_index_template(&self, name: &str, body: &Value) -> Result<()> {
        let _: Value = self
            .api
            .put(&format!("/_index_template/{}", encode(name)), body)
            .await?;
        Ok(())
    }

    /// Delete a template; a missing one is not an error
    pub async fn delete_index_template(&self, name: &str) -> Result<()> {
        match self
            .api
            .delete(&format!("/_index_template/{}", encode(name)))
            .await
        {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }

    /// Replace the template for `base` (delete, then create)
    pub async fn replace_template(&self, base: &str, body: &Value) -> Result<()> {
        let name = template_name(base);
        self.delete_index_template(&name).await?;
        self.put_index_template(&name, body).await
    }

    /// Indices matching a pattern; none matching is an empty list
    pub async fn cat_indices(&self, pattern: &str) -> Result<Vec<IndexInfo>> {
        let path = format!("/_cat/indices/{}?format=json", encode(pattern));
        Ok(self.api.get_optional(&path).await?.unwrap_or_default())
    }

    pub async fn delete_index(&self, index: &str) -> Result<()> {
        self.api.delete(&format!("/{}", encode(index))).await
    }

    pub async fn refresh(&self, index: &str) -> Result<()> {
        let _: Value = self
            .api
            .post(&format!("/{}/_refresh", encode(index)), &json!({}))
            .await?;
        Ok(())
    }

    pub async fn search(&self, index: &str, body: &Value) -> Result<Value> {
        self.api
            .post(&format!("/{}/_search", encode(index)), body)
            .await
    }

    /// Index documents through `_bulk` in chunks, counting item results.
    ///
    /// Item-level failures are counted, not raised; a failed request still
    /// aborts with an error.
    pub async fn bulk_index<T: Serialize>(&self, index: &str, docs: &[T]) -> Result<BulkSummary> {
        let mut summary = BulkSummary::default();
        for chunk in docs.chunks(BULK_CHUNK_SIZE) {
            let body = bulk_body(index, chunk)?;
            let request = self
                .api
                .request(Method::POST, "/_bulk")
                .header("Content-Type", "application/x-ndjson")
                .body(body);
            let response: Value = self.api.send(request).await?;
            summary.merge(count_bulk_items(&response));
        }
        Ok(summary)
    }

    /// Top clusters by summed credits
    pub async fn top_clusters(&self, index_pattern: &str, size: usize) -> Result<Vec<ClusterCredits>> {
        let response = self.search(index_pattern, &top_clusters_query(size)).await?;
        Ok(parse_top_clusters(&response))
    }

    /// Summed billable quantity of records whose usage started in the window
    pub async fn total_quantity(
        &self,
        index_pattern: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<QuantityTotal> {
        let body = json!({
            "size": 0,
            "track_total_hits": true,
            "query": {"range": {"usage_start": {"gte": from.to_rfc3339(), "lte": to.to_rfc3339()}}},
            "aggs": {"total_quantity": {"sum": {"field": "quantity"}}}
        });
        let response = self.search(index_pattern, &body).await?;
        Ok(QuantityTotal {
            quantity: response["aggregations"]["total_quantity"]["value"]
                .as_f64()
                .unwrap_or(0.0),
            records: response["hits"]["total"]["value"].as_u64().unwrap_or(0),
        })
    }

    /// Daily credit totals for the trailing `days`, optionally one cluster
    pub async fn daily_credits(
        &self,
        index_pattern: &str,
        cluster: Option<&str>,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<(NaiveDate, f64)>> {
        let response = self
            .search(index_pattern, &daily_credits_query(cluster, days, now))
            .await?;
        parse_daily_credits(&response)
    }
}

fn bulk_body<T: Serialize>(index: &str, docs: &[T]) -> Result<String> {
    let action = serde_json::to_string(&json!({"index": {"_index": index}}))
        .map_err(|e| ApiError::ParseError(e.to_string()))?;
    let mut body = String::new();
    for doc in docs {
        let source =
            serde_json::to_string(doc).map_err(|e| ApiError::ParseError(e.to_string()))?;
        body.push_str(&action);
        body.push('\n');
        body.push_str(&source);
        body.push('\n');
    }
    Ok(body)
}

fn count_bulk_items(response: &Value) -> BulkSummary {
    let mut summary = BulkSummary::default();
    let Some(items) = response["items"].as_array() else {
        return summary;
    };
    for item in items {
        let result = item
            .as_object()
            .and_then(|o| o.values().next())
            .cloned()
            .unwrap_or(Value::Null);
        let status = result["status"].as_u64().unwrap_or(0);
        if result.get("error").is_some() || !(200..300).contains(&status) {
            summary.failed += 1;
        } else {
            summary.indexed += 1;
        }
    }
    summary
}

fn top_clusters_query(size: usize) -> Value {
    json!({
        "size": 0,
        "aggs": {
            "top_clusters": {
                "terms": {
                    "field": "cluster_name",
                    "size": size,
                    "order": {"total_credits": "desc"}
                },
                "aggs": {"total_credits": {"sum": {"field": "credits"}}}
            }
        }
    })
}

fn parse_top_clusters(response: &Value) -> Vec<ClusterCredits> {
    response["aggregations"]["top_clusters"]["buckets"]
        .as_array()
        .map(|buckets| {
            buckets
                .iter()
                .filter_map(|b| {
                    Some(ClusterCredits {
                        cluster_name: b["key"].as_str()?.to_string(),
                        credits: b["total_credits"]["value"].as_f64().unwrap_or(0.0),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn daily_credits_query(cluster: Option<&str>, days: i64, now: DateTime<Utc>) -> Value {
    let from = now - chrono::Duration::days(clamp_history_days(days));
    let mut filters = vec![json!({
        "range": {"@timestamp": {"gte": from.to_rfc3339(), "lte": now.to_rfc3339()}}
    })];
    if let Some(cluster) = cluster {
        filters.push(json!({"term": {"cluster_name": cluster}}));
    }

    json!({
        "size": 0,
        "query": {"bool": {"filter": filters}},
        "aggs": {
            "per_day": {
                "date_histogram": {
                    "field": "@timestamp",
                    "calendar_interval": "day",
                    "min_doc_count": 1
                },
                "aggs": {"credits": {"sum": {"field": "credits"}}}
            }
        }
    })
}

fn parse_daily_credits(response: &Value) -> Result<Vec<(NaiveDate, f64)>> {
    let Some(buckets) = response["aggregations"]["per_day"]["buckets"].as_array() else {
        return Ok(Vec::new());
    };
    // Days without documents are not history, even if a bucket comes back
    buckets
        .iter()
        .filter(|b| b["doc_count"].as_u64() != Some(0))
        .map(|b| {
            let key = b["key_as_string"].as_str().unwrap_or_default();
            let date = key
                .get(..10)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
                .ok_or_else(|| ApiError::ParseError(format!("unexpected bucket key '{}'", key)))?;
            Ok((date, b["credits"]["value"].as_f64().unwrap_or(0.0)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::{ForecastMethod, Forecaster};
    use chrono::TimeZone;
    use mockito::{Matcher, Server};

    fn client_for(server: &Server) -> ElasticClient {
        ElasticClient::new(&ElasticsearchConfig {
            url: server.url(),
            username: "infra".into(),
            password: "pw".into(),
        })
        .unwrap()
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("es.example.com"), "https://es.example.com");
        assert_eq!(normalize_url("http://localhost:9200"), "http://localhost:9200");
    }

    #[test]
    fn test_bulk_body_is_ndjson() {
        let body = bulk_body("idx", &[json!({"a": 1}), json!({"a": 2})]).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], r#"{"index":{"_index":"idx"}}"#);
        assert_eq!(lines[1], r#"{"a":1}"#);
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn test_count_bulk_items_partial_failure() {
        let response = json!({
            "errors": true,
            "items": [
                {"index": {"status": 201}},
                {"index": {"status": 400, "error": {"reason": "mapper_parsing_exception"}}},
                {"index": {"status": 201}}
            ]
        });
        assert_eq!(
            count_bulk_items(&response),
            BulkSummary {
                indexed: 2,
                failed: 1
            }
        );
    }

    #[test]
    fn test_parse_responses() {
        let top = parse_top_clusters(&json!({
            "aggregations": {"top_clusters": {"buckets": [
                {"key": "etl", "doc_count": 3, "total_credits": {"value": 42.5}},
                {"key": "adhoc", "doc_count": 1, "total_credits": {"value": 1.0}}
            ]}}
        }));
        assert_eq!(top[0].cluster_name, "etl");
        assert_eq!(top[0].credits, 42.5);

        let daily = parse_daily_credits(&json!({
            "aggregations": {"per_day": {"buckets": [
                {"key_as_string": "2025-01-01T00:00:00.000Z", "credits": {"value": 3.0}},
                {"key_as_string": "2025-01-02T00:00:00.000Z", "credits": {"value": 4.0}}
            ]}}
        }))
        .unwrap();
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[1], (NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(), 4.0));
        assert!(parse_daily_credits(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn test_daily_credits_query_filters_cluster() {
        let now = Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap();
        let q = daily_credits_query(Some("etl"), 30, now);
        assert_eq!(q["query"]["bool"]["filter"][1]["term"]["cluster_name"], "etl");
        let q = daily_credits_query(None, 30, now);
        assert_eq!(q["query"]["bool"]["filter"].as_array().unwrap().len(), 1);
        assert_eq!(q["aggs"]["per_day"]["date_histogram"]["min_doc_count"], 1);
    }

    #[tokio::test]
    async fn test_daily_credits_skips_empty_days() {
        let mut server = Server::new_async().await;
        let mut buckets = Vec::new();
        for day in 1..=7 {
            let docs = if day == 1 || day == 7 { 4 } else { 0 };
            buckets.push(json!({
                "key_as_string": format!("2025-01-{:02}T00:00:00.000Z", day),
                "doc_count": docs,
                "credits": {"value": if docs > 0 { 20.0 } else { 0.0 }}
            }));
        }
        server
            .mock("POST", Matcher::Regex(r"^/.*/_search$".to_string()))
            .with_status(200)
            .with_body(json!({"aggregations": {"per_day": {"buckets": buckets}}}).to_string())
            .create_async()
            .await;

        let now = Utc.with_ymd_and_hms(2025, 1, 8, 0, 0, 0).unwrap();
        let history = client_for(&server)
            .daily_credits("cdp-consumption-records-*", Some("etl"), 30, now)
            .await
            .unwrap();
        assert_eq!(
            history,
            vec![
                (NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), 20.0),
                (NaiveDate::from_ymd_opt(2025, 1, 7).unwrap(), 20.0),
            ]
        );

        // Two real days are too short to forecast from
        let forecast = Forecaster::new(ForecastMethod::Linear).forecast(&history);
        assert!(forecast.is_empty());
    }

    #[tokio::test]
    async fn test_info() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header("authorization", "Basic aW5mcmE6cHc=")
            .with_status(200)
            .with_body(r#"{"cluster_name": "gea", "version": {"number": "8.15.0"}}"#)
            .create_async()
            .await;

        let info = client_for(&server).info().await.unwrap();
        assert_eq!(info.cluster_name, "gea");
        assert_eq!(info.version.number, "8.15.0");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_bulk_index_chunks_requests() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/_bulk")
            .match_header("content-type", "application/x-ndjson")
            .with_status(200)
            .with_body(r#"{"errors": false, "items": [{"index": {"status": 201}}]}"#)
            .expect(2)
            .create_async()
            .await;

        let docs: Vec<Value> = (0..BULK_CHUNK_SIZE + 1).map(|i| json!({"n": i})).collect();
        let summary = client_for(&server).bulk_index("idx", &docs).await.unwrap();

        assert_eq!(summary.indexed, 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_missing_template_is_ok() {
        let mut server = Server::new_async().await;
        server
            .mock("DELETE", "/_index_template/t-template")
            .with_status(404)
            .with_body(r#"{"error": {"reason": "index_template [t-template] missing"}}"#)
            .create_async()
            .await;

        assert!(
            client_for(&server)
                .delete_index_template("t-template")
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_cat_indices_missing_pattern_is_empty() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(r"^/_cat/indices/.*".to_string()))
            .with_status(404)
            .with_body(r#"{"error": {"reason": "no such index"}}"#)
            .create_async()
            .await;

        let indices = client_for(&server).cat_indices("nothing-*").await.unwrap();
        assert!(indices.is_empty());
    }
}
