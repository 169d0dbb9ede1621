use super::utils::{JIRA, new_table, print_json, truncate};
use crate::atlassian::{ASSIGNED_UNRESOLVED_JQL, JiraClient, export_issues_csv};
use crate::cli::{JiraCommand, OutputFormat};
use crate::common::progress::spinner;
use crate::config::{Config, require};
use crate::error::InsightsError;
use colored::Colorize;
use prettytable::row;
use std::fs::File;
use std::io::BufWriter;

pub async fn handle_jira(command: JiraCommand, config: &Config, quiet: bool) -> crate::Result<()> {
    require(&config.jira.url, "jira.url")?;
    require(&config.jira.username, "jira.username")?;
    require(&config.jira.api_token, "jira.api_token")?;
    let jira = JiraClient::new(&config.jira).map_err(InsightsError::api(JIRA))?;

    match command {
        JiraCommand::Projects => {
            let me = jira.myself().await.map_err(InsightsError::api(JIRA))?;
            let projects = jira.projects().await.map_err(InsightsError::api(JIRA))?;
            if quiet {
                return Ok(());
            }
            println!("👤 Signed in as {}\n", me.display_name.bold());
            let mut table = new_table();
            table.set_titles(row!["Key", "Name"]);
            for project in &projects {
                table.add_row(row![project.key, project.name]);
            }
            table.printstd();
            println!("\n📁 {} projects", projects.len());
            Ok(())
        }
        JiraCommand::Search { jql, max, format } => {
            let jql = jql.unwrap_or_else(|| ASSIGNED_UNRESOLVED_JQL.to_string());
            let issues = jira
                .search_issues(&jql, max)
                .await
                .map_err(InsightsError::api(JIRA))?;

            if format == OutputFormat::Json {
                return print_json(&issues);
            }
            if quiet {
                return Ok(());
            }
            if issues.is_empty() {
                println!("No issues match {}", jql.dimmed());
                return Ok(());
            }
            let mut table = new_table();
            table.set_titles(row!["Key", "Status", "Priority", "Assignee", "Summary"]);
            for issue in &issues {
                table.add_row(row![
                    issue.key,
                    issue.status(),
                    issue.priority(),
                    issue.assignee(),
                    truncate(&issue.fields.summary, 60)
                ]);
            }
            table.printstd();
            println!("\n🎫 {} issues", issues.len());
            Ok(())
        }
        JiraCommand::Export { output, jql, max } => {
            let jql = jql.unwrap_or_else(|| ASSIGNED_UNRESOLVED_JQL.to_string());
            let progress = spinner("Fetching issues from Jira...", quiet);
            let issues = jira.search_issues(&jql, max).await;
            progress.finish_and_clear();
            let issues = issues.map_err(InsightsError::api(JIRA))?;

            let file = File::create(&output)?;
            let rows = export_issues_csv(&issues, |key| jira.browse_url(key), BufWriter::new(file))?;
            if !quiet {
                println!(
                    "{} Exported {} issues to {}",
                    "✅".green(),
                    rows,
                    output.display().to_string().cyan()
                );
            }
            Ok(())
        }
        JiraCommand::Create {
            project,
            summary,
            description,
            issue_type,
        } => {
            let created = jira
                .create_issue(&project, &summary, &description, &issue_type)
                .await
                .map_err(InsightsError::api(JIRA))?;
            if !quiet {
                println!(
                    "{} Created {}: {}",
                    "✅".green(),
                    created.key.bold(),
                    jira.browse_url(&created.key).cyan()
                );
            }
            Ok(())
        }
        JiraCommand::Comment { key, body } => {
            jira.add_comment(&key, &body)
                .await
                .map_err(InsightsError::api(JIRA))?;
            if !quiet {
                println!("{} Comment added to {}", "✅".green(), key.bold());
            }
            Ok(())
        }
    }
}
