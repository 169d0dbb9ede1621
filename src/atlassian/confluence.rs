use crate::api::{ApiAuth, RestClient, Result, encode};
use crate::config::types::ConfluenceConfig;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Space {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Version {
    pub number: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Storage {
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Body {
    pub storage: Storage,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Page {
    pub id: String,
    pub title: String,
    pub version: Option<Version>,
    pub body: Option<Body>,
}

impl Page {
    pub fn version_number(&self) -> u32 {
        self.version.map_or(1, |v| v.number)
    }

    pub fn storage(&self) -> &str {
        self.body.as_ref().map_or("", |b| b.storage.value.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct Results<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub content: Option<Page>,
    #[serde(default)]
    pub title: String,
}

/// Whether `create_or_update_page` created or edited the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAction {
    Created,
    Updated,
}

/// Confluence Cloud REST client (`/wiki/rest/api`)
#[derive(Debug, Clone)]
pub struct ConfluenceClient {
    api: RestClient,
    site_url: String,
}

impl ConfluenceClient {
    pub fn new(config: &ConfluenceConfig) -> Result<Self> {
        let trimmed = config.url.trim_end_matches('/');
        let site_url = trimmed.strip_suffix("/wiki").unwrap_or(trimmed).to_string();
        let api = RestClient::new(
            &format!("{}/wiki/rest/api", site_url),
            ApiAuth::Basic {
                username: config.username.clone(),
                password: config.api_token.clone(),
            },
        )?;
        Ok(Self { api, site_url })
    }

    pub async fn spaces(&self) -> Result<Vec<Space>> {
        let response: Results<Space> = self.api.get("/space?limit=100").await?;
        Ok(response.results)
    }

    /// Page with body and version, `None` when no page has that title
    pub async fn page_by_title(&self, space_key: &str, title: &str) -> Result<Option<Page>> {
        let path = format!(
            "/content?spaceKey={}&title={}&expand=body.storage,version",
            encode(space_key),
            encode(title)
        );
        let response: Results<Page> = self.api.get(&path).await?;
        Ok(response.results.into_iter().next())
    }

    pub async fn page(&self, page_id: &str) -> Result<Page> {
        self.api
            .get(&format!("/content/{}?expand=body.storage,version", encode(page_id)))
            .await
    }

    /// Full-text CQL search, optionally within one space
    pub async fn search(&self, text: &str, space_key: Option<&str>) -> Result<Vec<SearchHit>> {
        let mut cql = format!("text ~ \"{}\"", text.replace('"', "\\\""));
        if let Some(space) = space_key {
            cql.push_str(&format!(" and space = {}", space));
        }
        let path = format!("/search?cql={}&limit=25", encode(&cql));
        let response: Results<SearchHit> = self.api.get(&path).await?;
        Ok(response.results)
    }

    pub async fn create_page(
        &self,
        space_key: &str,
        title: &str,
        storage: &str,
        parent_id: Option<&str>,
    ) -> Result<Page> {
        let mut body = json!({
            "type": "page",
            "title": title,
            "space": {"key": space_key},
            "body": {"storage": {"value": storage, "representation": "storage"}}
        });
        if let Some(parent) = parent_id {
            body["ancestors"] = json!([{"id": parent}]);
        }
        self.api.post("/content", &body).await
    }

    /// Replace the page body; `current_version` is bumped by one
    pub async fn update_page(
        &self,
        page_id: &str,
        title: &str,
        storage: &str,
        current_version: u32,
    ) -> Result<Page> {
        let body = json!({
            "id": page_id,
            "type": "page",
            "title": title,
            "version": {"number": current_version + 1},
            "body": {"storage": {"value": storage, "representation": "storage"}}
        });
        self.api
            .put(&format!("/content/{}", encode(page_id)), &body)
            .await
    }

    pub async fn create_or_update_page(
        &self,
        space_key: &str,
        title: &str,
        storage: &str,
        parent_id: Option<&str>,
    ) -> Result<(Page, PageAction)> {
        match self.page_by_title(space_key, title).await? {
            Some(existing) => {
                let page = self
                    .update_page(&existing.id, title, storage, existing.version_number())
                    .await?;
                Ok((page, PageAction::Updated))
            }
            None => {
                let page = self.create_page(space_key, title, storage, parent_id).await?;
                Ok((page, PageAction::Created))
            }
        }
    }

    /// Re-parent a page, keeping its title and body
    pub async fn move_page(&self, page_id: &str, new_parent_id: &str) -> Result<Page> {
        let page = self.page(page_id).await?;
        let body = json!({
            "id": page_id,
            "type": "page",
            "title": page.title,
            "version": {"number": page.version_number() + 1},
            "ancestors": [{"id": new_parent_id}],
            "body": {"storage": {"value": page.storage(), "representation": "storage"}}
        });
        self.api
            .put(&format!("/content/{}", encode(page_id)), &body)
            .await
    }

    pub fn page_url(&self, page_id: &str) -> String {
        format!("{}/wiki/pages/viewpage.action?pageId={}", self.site_url, page_id)
    }
}
