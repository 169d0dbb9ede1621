use super::adf_document;
use crate::api::{ApiAuth, RestClient, Result, encode};
use crate::config::types::JiraConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Issues assigned to the caller that are still open, most urgent first
pub const ASSIGNED_UNRESOLVED_JQL: &str =
    "assignee = currentUser() AND resolution = Unresolved ORDER BY priority DESC, created DESC";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JiraUser {
    pub account_id: String,
    pub display_name: String,
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Project {
    pub id: String,
    pub key: String,
    pub name: String,
}

/// `{"name": ...}` objects such as status, priority and issue type
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Named {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectRef {
    pub key: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct IssueFields {
    pub summary: String,
    pub status: Option<Named>,
    pub priority: Option<Named>,
    pub issuetype: Option<Named>,
    pub project: Option<ProjectRef>,
    pub assignee: Option<JiraUser>,
    pub reporter: Option<JiraUser>,
    pub created: Option<String>,
    pub updated: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Issue {
    pub id: String,
    /// Empty when the search returned ids only
    pub key: String,
    pub fields: IssueFields,
}

impl Issue {
    pub fn status(&self) -> &str {
        self.fields.status.as_ref().map_or("", |s| s.name.as_str())
    }

    pub fn priority(&self) -> &str {
        self.fields.priority.as_ref().map_or("", |p| p.name.as_str())
    }

    pub fn reporter(&self) -> &str {
        self.fields
            .reporter
            .as_ref()
            .map_or("N/A", |u| u.display_name.as_str())
    }

    pub fn assignee(&self) -> &str {
        self.fields
            .assignee
            .as_ref()
            .map_or("Unassigned", |u| u.display_name.as_str())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
    issues: Vec<Issue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    pub key: String,
}

/// Jira Cloud REST v3 client
#[derive(Debug, Clone)]
pub struct JiraClient {
    api: RestClient,
    site_url: String,
}

impl JiraClient {
    pub fn new(config: &JiraConfig) -> Result<Self> {
        let site_url = config.url.trim_end_matches('/').to_string();
        let api = RestClient::new(
            &format!("{}/rest/api/3", site_url),
            ApiAuth::Basic {
                username: config.username.clone(),
                password: config.api_token.clone(),
            },
        )?;
        Ok(Self { api, site_url })
    }

    /// The authenticated user; doubles as a connection check
    pub async fn myself(&self) -> Result<JiraUser> {
        self.api.get("/myself").await
    }

    pub async fn projects(&self) -> Result<Vec<Project>> {
        self.api.get("/project").await
    }

    /// Run a JQL search.
    ///
    /// `search/jql` may answer with bare ids; those are fetched one by one.
    pub async fn search_issues(&self, jql: &str, max_results: u32) -> Result<Vec<Issue>> {
        let body = json!({
            "jql": jql,
            "maxResults": max_results,
            "fields": ["*all"]
        });
        let response: SearchResponse = self.api.post("/search/jql", &body).await?;

        let mut issues = Vec::with_capacity(response.issues.len());
        for issue in response.issues {
            if issue.key.is_empty() {
                match self.get_issue(&issue.id).await {
                    Ok(full) => issues.push(full),
                    Err(e) => log::warn!("Could not load issue {}: {}", issue.id, e),
                }
            } else {
                issues.push(issue);
            }
        }
        Ok(issues)
    }

    /// Issue by key or numeric id
    pub async fn get_issue(&self, key_or_id: &str) -> Result<Issue> {
        self.api.get(&format!("/issue/{}", encode(key_or_id))).await
    }

    pub async fn create_issue(
        &self,
        project_key: &str,
        summary: &str,
        description: &str,
        issue_type: &str,
    ) -> Result<CreatedIssue> {
        let body = json!({
            "fields": {
                "project": {"key": project_key},
                "summary": summary,
                "description": adf_document(description),
                "issuetype": {"name": issue_type}
            }
        });
        self.api.post("/issue", &body).await
    }

    pub async fn add_comment(&self, issue_key: &str, text: &str) -> Result<()> {
        let body = json!({"body": adf_document(text)});
        let _: Value = self
            .api
            .post(&format!("/issue/{}/comment", encode(issue_key)), &body)
            .await?;
        Ok(())
    }

    pub fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.site_url, key)
    }
}
