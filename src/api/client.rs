//! Shared REST client
//!
//! Thin wrapper over `reqwest` that carries a base URL, credentials and
//! fixed headers, and maps HTTP failures onto [`ApiError`].

use super::error::{ApiError, Result};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// User agent for API requests
pub const USER_AGENT: &str = concat!("cdp-insights/", env!("CARGO_PKG_VERSION"));

/// Default request timeout
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Longest error body echoed back in an error message
const MAX_ERROR_BODY: usize = 500;

/// Authentication method for a REST endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ApiAuth {
    /// No authentication
    #[default]
    None,
    /// HTTP basic auth (Elastic Cloud, Atlassian API tokens)
    Basic { username: String, password: String },
    /// Bearer token (Google Cloud access tokens)
    Bearer(String),
}

/// REST client bound to one base URL
#[derive(Debug, Clone)]
pub struct RestClient {
    http_client: Client,
    base_url: String,
    auth: ApiAuth,
    headers: Vec<(&'static str, String)>,
}

impl RestClient {
    /// Create a client for `base_url` with the given credentials
    pub fn new(base_url: &str, auth: ApiAuth) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ApiError::InvalidUrl(format!(
                "{} (URL must start with http:// or https://)",
                base_url
            )));
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(ApiError::HttpError)?;

        Ok(Self {
            http_client,
            base_url,
            auth,
            headers: vec![("Accept", "application/json".to_string())],
        })
    }

    /// Add a header sent with every request
    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Get the configured base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Start a request with credentials and fixed headers applied
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self.http_client.request(method, self.url(path));
        for (name, value) in &self.headers {
            req = req.header(*name, value);
        }
        match &self.auth {
            ApiAuth::None => req,
            ApiAuth::Basic { username, password } => req.basic_auth(username, Some(password)),
            ApiAuth::Bearer(token) => req.bearer_auth(token),
        }
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(Method::GET, path).send().await?;
        Self::handle_response(response).await
    }

    /// Make a GET request that returns `None` for 404 responses
    pub async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        match self.get(path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Make a POST request with a JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.request(Method::POST, path).json(body).send().await?;
        Self::handle_response(response).await
    }

    /// Make a PUT request with a JSON body
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.request(Method::PUT, path).json(body).send().await?;
        Self::handle_response(response).await
    }

    /// Make a DELETE request, discarding the body
    pub async fn delete(&self, path: &str) -> Result<()> {
        let response = self.request(Method::DELETE, path).send().await?;
        let _: Value = Self::handle_response(response).await?;
        Ok(())
    }

    /// Send a prepared request (for non-JSON bodies such as NDJSON)
    pub async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Handle the HTTP response, converting errors appropriately
    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            // Some endpoints answer 200/204 with no body at all
            let body = if body.trim().is_empty() { "null" } else { body.as_str() };
            serde_json::from_str::<T>(body).map_err(|e| ApiError::ParseError(e.to_string()))
        } else {
            Err(ApiError::from_status(
                status.as_u16(),
                extract_error_message(&body),
            ))
        }
    }
}

/// Pull a human readable message out of an error body.
///
/// Understands the shapes returned by Elasticsearch (`error.reason`),
/// Kibana (`message`), Jira (`errorMessages`) and Google (`error.message`).
pub fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
        if let Some(error) = value.get("error") {
            if let Some(reason) = error.get("reason").and_then(Value::as_str) {
                return reason.to_string();
            }
            if let Some(message) = error.get("message").and_then(Value::as_str) {
                return message.to_string();
            }
            if let Some(text) = error.as_str() {
                return text.to_string();
            }
        }
        if let Some(messages) = value.get("errorMessages").and_then(Value::as_array) {
            let joined: Vec<&str> = messages.iter().filter_map(Value::as_str).collect();
            if !joined.is_empty() {
                return joined.join("; ");
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Unknown error".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_BODY).collect()
    }
}

/// Encode a value for use inside a query string
pub fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_construction() {
        let client = RestClient::new("https://example.com/", ApiAuth::None).unwrap();
        assert_eq!(client.base_url(), "https://example.com");
    }

    #[test]
    fn test_rejects_url_without_scheme() {
        let result = RestClient::new("example.com", ApiAuth::None);
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn test_url_building() {
        let client = RestClient::new("https://api.example.com", ApiAuth::None).unwrap();
        assert_eq!(client.url("/_bulk"), "https://api.example.com/_bulk");
        assert_eq!(client.url("_cat/indices"), "https://api.example.com/_cat/indices");
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            ApiError::from_status(401, String::new()),
            ApiError::Unauthorized
        ));
        assert!(ApiError::from_status(404, "gone".into()).is_not_found());
        assert!(ApiError::from_status(409, "exists".into()).is_conflict());
        assert!(matches!(
            ApiError::from_status(503, "down".into()),
            ApiError::ServerError { status: 503, .. }
        ));
        assert!(matches!(
            ApiError::from_status(400, "bad".into()),
            ApiError::ApiError { status: 400, .. }
        ));
    }

    #[test]
    fn test_extract_error_message_shapes() {
        assert_eq!(
            extract_error_message(r#"{"statusCode":409,"error":"Conflict","message":"already exists"}"#),
            "already exists"
        );
        assert_eq!(
            extract_error_message(r#"{"error":{"type":"x","reason":"index missing"},"status":404}"#),
            "index missing"
        );
        assert_eq!(
            extract_error_message(r#"{"errorMessages":["bad jql","try again"],"errors":{}}"#),
            "bad jql; try again"
        );
        assert_eq!(extract_error_message("plain text"), "plain text");
        assert_eq!(extract_error_message(""), "Unknown error");
    }

    #[test]
    fn test_user_agent() {
        assert!(USER_AGENT.starts_with("cdp-insights/"));
    }

    #[test]
    fn test_http_error_conversion() {
        let _: fn(reqwest::Error) -> ApiError = ApiError::from;
    }

    #[tokio::test]
    async fn test_get_applies_basic_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header("authorization", "Basic dXNlcjpwYXNz")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let client = RestClient::new(
            &server.url(),
            ApiAuth::Basic {
                username: "user".into(),
                password: "pass".into(),
            },
        )
        .unwrap();
        let value: Value = client.get("/").await.unwrap();
        assert_eq!(value["ok"], true);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_body_parses_as_null() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("DELETE", "/idx")
            .with_status(200)
            .create_async()
            .await;

        let client = RestClient::new(&server.url(), ApiAuth::None).unwrap();
        assert!(client.delete("/idx").await.is_ok());
    }

    #[tokio::test]
    async fn test_get_optional_returns_none_on_404() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body(r#"{"message":"nope"}"#)
            .create_async()
            .await;

        let client = RestClient::new(&server.url(), ApiAuth::None).unwrap();
        let value: Option<Value> = client.get_optional("/missing").await.unwrap();
        assert!(value.is_none());
    }
}
