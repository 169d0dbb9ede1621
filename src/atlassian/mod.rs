//! Jira and Confluence Cloud integrations

pub mod confluence;
pub mod export;
pub mod jira;
pub mod markdown;
pub mod publish;

use serde_json::{Value, json};

pub use confluence::{ConfluenceClient, Page, PageAction};
pub use export::export_issues_csv;
pub use jira::{ASSIGNED_UNRESOLVED_JQL, Issue, JiraClient};
pub use markdown::markdown_to_storage;
pub use publish::ConsumptionPage;

/// Plain text as an Atlassian Document Format document, one paragraph per line
pub fn adf_document(text: &str) -> Value {
    let paragraphs: Vec<Value> = text
        .lines()
        .map(|line| {
            if line.is_empty() {
                json!({"type": "paragraph", "content": []})
            } else {
                json!({"type": "paragraph", "content": [{"type": "text", "text": line}]})
            }
        })
        .collect();
    json!({"type": "doc", "version": 1, "content": paragraphs})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adf_document() {
        let doc = adf_document("first\n\nsecond");
        assert_eq!(doc["type"], "doc");
        assert_eq!(doc["content"].as_array().unwrap().len(), 3);
        assert_eq!(doc["content"][2]["content"][0]["text"], "second");
    }
}
