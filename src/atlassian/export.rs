//! CSV export of Jira issues

use super::jira::Issue;
use std::io::Write;

const HEADERS: [&str; 11] = [
    "Key", "Project", "Type", "Summary", "Status", "Priority", "Assignee", "Reporter", "Created",
    "Updated", "Link",
];

fn day(timestamp: Option<&str>) -> String {
    timestamp.map(|t| t.chars().take(10).collect()).unwrap_or_default()
}

/// Write one row per issue; `browse_url` turns a key into its link.
///
/// Returns the number of rows written.
pub fn export_issues_csv<W, F>(issues: &[Issue], browse_url: F, writer: W) -> Result<usize, csv::Error>
where
    W: Write,
    F: Fn(&str) -> String,
{
    let mut csv = csv::WriterBuilder::new().has_headers(true).from_writer(writer);
    csv.write_record(HEADERS)?;

    for issue in issues {
        let fields = &issue.fields;
        csv.write_record([
            issue.key.clone(),
            fields.project.as_ref().map(|p| p.key.clone()).unwrap_or_default(),
            fields.issuetype.as_ref().map(|t| t.name.clone()).unwrap_or_default(),
            fields.summary.clone(),
            issue.status().to_string(),
            issue.priority().to_string(),
            issue.assignee().to_string(),
            issue.reporter().to_string(),
            day(fields.created.as_deref()),
            day(fields.updated.as_deref()),
            browse_url(&issue.key),
        ])?;
    }

    csv.flush()?;
    Ok(issues.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlassian::jira::{IssueFields, Named};

    #[test]
    fn test_export_quotes_and_links() {
        let issues = vec![Issue {
            id: "1".into(),
            key: "OPS-1".into(),
            fields: IssueFields {
                summary: "Resize \"etl\", then stop".into(),
                status: Some(Named { name: "In Progress".into() }),
                created: Some("2024-05-01T10:00:00.000+0200".into()),
                ..Default::default()
            },
        }];

        let mut out = Vec::new();
        let rows = export_issues_csv(&issues, |k| format!("https://jira/browse/{}", k), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(rows, 1);
        assert!(lines[0].starts_with("Key,Project,Type,Summary"));
        assert!(lines[1].starts_with("OPS-1,,,\"Resize \"\"etl\"\", then stop\",In Progress,"));
        assert!(lines[1].contains(",Unassigned,N/A,2024-05-01,,"));
        assert!(lines[1].ends_with("https://jira/browse/OPS-1"));
    }
}
