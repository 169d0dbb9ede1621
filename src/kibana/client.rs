use crate::api::{ApiAuth, RestClient, Result, encode};
use crate::elastic::client::normalize_url;
use serde::Deserialize;
use serde_json::{Value, json};

/// Kibana REST client. Every request carries `kbn-xsrf`.
#[derive(Debug, Clone)]
pub struct KibanaClient {
    api: RestClient,
}

/// How a saved object ended up in Kibana
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
}

/// Entry of a `_find` listing
#[derive(Debug, Clone, Deserialize)]
pub struct SavedObjectSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Value,
}

impl SavedObjectSummary {
    pub fn title(&self) -> &str {
        self.attributes["title"].as_str().unwrap_or("")
    }
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    #[serde(default)]
    saved_objects: Vec<SavedObjectSummary>,
}

impl KibanaClient {
    pub fn new(url: &str, username: &str, password: &str) -> Result<Self> {
        let auth = if username.is_empty() {
            ApiAuth::None
        } else {
            ApiAuth::Basic {
                username: username.to_string(),
                password: password.to_string(),
            }
        };
        let api = RestClient::new(&normalize_url(url), auth)?.with_header("kbn-xsrf", "true");
        Ok(Self { api })
    }

    /// Create a data view; one that already exists is left alone
    pub async fn create_data_view(&self, id: &str, title: &str, time_field: &str) -> Result<bool> {
        let body = json!({
            "data_view": {
                "id": id,
                "title": title,
                "timeFieldName": time_field
            }
        });
        match self.api.post::<Value, _>("/api/data_views/data_view", &body).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_conflict() => {
                log::debug!("Data view {} already exists", id);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Data view by id, `None` when missing
    pub async fn get_data_view(&self, id: &str) -> Result<Option<Value>> {
        let path = format!("/api/data_views/data_view/{}", encode(id));
        let response: Option<Value> = self.api.get_optional(&path).await?;
        Ok(response.map(|mut v| v["data_view"].take()))
    }

    /// Create a saved object, overwriting it when the id is taken
    pub async fn save_object(&self, kind: &str, id: &str, body: &Value) -> Result<SaveOutcome> {
        let path = format!("/api/saved_objects/{}/{}", encode(kind), encode(id));
        match self.api.post::<Value, _>(&path, body).await {
            Ok(_) => Ok(SaveOutcome::Created),
            Err(e) if e.is_conflict() => {
                log::debug!("{} {} exists, updating", kind, id);
                // PUT accepts attributes and references only
                let update = json!({
                    "attributes": body["attributes"],
                    "references": body["references"]
                });
                let _: Value = self.api.put(&path, &update).await?;
                Ok(SaveOutcome::Updated)
            }
            Err(e) => Err(e),
        }
    }

    /// Saved objects of one type (first 100)
    pub async fn find_objects(&self, kind: &str) -> Result<Vec<SavedObjectSummary>> {
        let path = format!("/api/saved_objects/_find?type={}&per_page=100", encode(kind));
        let response: FindResponse = self.api.get(&path).await?;
        Ok(response.saved_objects)
    }

    pub fn base_url(&self) -> &str {
        self.api.base_url()
    }

    pub fn dashboard_url(&self, id: &str) -> String {
        format!("{}/app/dashboards#/view/{}", self.api.base_url(), id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_data_view_conflict_is_ok() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/data_views/data_view")
            .match_header("kbn-xsrf", "true")
            .with_status(409)
            .with_body(r#"{"message":"Duplicate data view"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = KibanaClient::new(&server.url(), "elastic", "pw").unwrap();
        let created = client
            .create_data_view("cdp-records-dataview", "cdp-consumption-records-*", "@timestamp")
            .await
            .unwrap();
        assert!(!created);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_save_object_falls_back_to_update() {
        let mut server = mockito::Server::new_async().await;
        let post = server
            .mock("POST", "/api/saved_objects/lens/lens-total-credits")
            .with_status(409)
            .with_body(r#"{"message":"conflict"}"#)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/api/saved_objects/lens/lens-total-credits")
            .match_body(Matcher::PartialJson(json!({"attributes": {"title": "Total"}})))
            .with_status(200)
            .with_body(r#"{"id":"lens-total-credits"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = KibanaClient::new(&server.url(), "", "").unwrap();
        let body = json!({"attributes": {"title": "Total"}, "references": []});
        let outcome = client
            .save_object("lens", "lens-total-credits", &body)
            .await
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Updated);
        post.assert_async().await;
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_save_object_propagates_other_errors() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/api/saved_objects/dashboard/d")
            .with_status(400)
            .with_body(r#"{"message":"bad panels"}"#)
            .create_async()
            .await;

        let client = KibanaClient::new(&server.url(), "", "").unwrap();
        let err = client
            .save_object("dashboard", "d", &json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bad panels"));
    }

    #[tokio::test]
    async fn test_find_objects() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/saved_objects/_find")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("type".into(), "dashboard".into()),
                Matcher::UrlEncoded("per_page".into(), "100".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"saved_objects":[{"id":"dashboard-cdp-main","type":"dashboard","attributes":{"title":"Main"}}]}"#,
            )
            .create_async()
            .await;

        let client = KibanaClient::new(&server.url(), "", "").unwrap();
        let objects = client.find_objects("dashboard").await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].title(), "Main");
        assert_eq!(
            client.dashboard_url("dashboard-cdp-main"),
            format!("{}/app/dashboards#/view/dashboard-cdp-main", server.url())
        );
    }
}
