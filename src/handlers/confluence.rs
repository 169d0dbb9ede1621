use super::utils::{CONFLUENCE, kibana_client, load_snapshot, new_table, period_days};
use crate::atlassian::{ConfluenceClient, ConsumptionPage, PageAction, markdown_to_storage};
use crate::cdp::InventorySummary;
use crate::cli::ConfluenceCommand;
use crate::config::{Config, require};
use crate::error::InsightsError;
use crate::kibana::catalog::MAIN_DASHBOARD;
use crate::usage::recommendations::{estimate_monthly_cost, recommend};
use crate::usage::{Forecaster, aggregate};
use chrono::Utc;
use colored::Colorize;
use prettytable::row;
use std::path::PathBuf;

pub async fn handle_confluence(
    command: ConfluenceCommand,
    config: &Config,
    quiet: bool,
) -> crate::Result<()> {
    match command {
        ConfluenceCommand::Spaces => {
            let confluence = client(config)?;
            let spaces = confluence
                .spaces()
                .await
                .map_err(InsightsError::api(CONFLUENCE))?;
            if !quiet {
                let mut table = new_table();
                table.set_titles(row!["Key", "Name"]);
                for space in &spaces {
                    table.add_row(row![space.key, space.name]);
                }
                table.printstd();
            }
            Ok(())
        }
        ConfluenceCommand::Search { text, space } => {
            let confluence = client(config)?;
            let hits = confluence
                .search(&text, space.as_deref())
                .await
                .map_err(InsightsError::api(CONFLUENCE))?;
            if quiet {
                return Ok(());
            }
            if hits.is_empty() {
                println!("Nothing found for \"{}\"", text);
                return Ok(());
            }
            let mut table = new_table();
            table.set_titles(row!["Id", "Title", "Link"]);
            for hit in &hits {
                match &hit.content {
                    Some(page) => {
                        table.add_row(row![page.id, page.title, confluence.page_url(&page.id)])
                    }
                    None => table.add_row(row!["-", hit.title, ""]),
                };
            }
            table.printstd();
            Ok(())
        }
        ConfluenceCommand::Publish {
            days,
            input,
            space,
            dry_run,
        } => handle_publish(config, days, input, space, dry_run, quiet).await,
        ConfluenceCommand::Move { page, parent } => {
            let confluence = client(config)?;
            let moved = confluence
                .move_page(&page, &parent)
                .await
                .map_err(InsightsError::api(CONFLUENCE))?;
            if !quiet {
                println!(
                    "{} Moved \"{}\" under page {}",
                    "✅".green(),
                    moved.title.bold(),
                    parent
                );
            }
            Ok(())
        }
    }
}

fn client(config: &Config) -> crate::Result<ConfluenceClient> {
    require(&config.confluence.url, "confluence.url")?;
    require(&config.confluence.username, "confluence.username")?;
    require(&config.confluence.api_token, "confluence.api_token")?;
    ConfluenceClient::new(&config.confluence).map_err(InsightsError::api(CONFLUENCE))
}

async fn handle_publish(
    config: &Config,
    days: Option<i64>,
    input: Option<PathBuf>,
    space: Option<String>,
    dry_run: bool,
    quiet: bool,
) -> crate::Result<()> {
    let days = days.unwrap_or(config.cdp.history_days);
    let snapshot = load_snapshot(config, input.as_deref(), days, quiet)?;

    let summary = aggregate(&snapshot.usage.records);
    let inventory = InventorySummary::from_inventory(&snapshot.clusters, &snapshot.datalakes);
    let period = period_days(days);
    let estimate = estimate_monthly_cost(&summary, &inventory, period);
    let recommendations = recommend(
        &summary,
        &snapshot.clusters,
        &inventory,
        estimate.monthly_credits,
    );
    let forecast = Forecaster::new(config.forecast.method)
        .with_horizon(config.forecast.days)
        .with_min_history(config.forecast.min_history)
        .with_band(config.forecast.confidence_interval)
        .forecast(&summary.daily_series());
    let dashboard_url = if config.kibana.url.is_empty() {
        None
    } else {
        Some(kibana_client(config)?.dashboard_url(MAIN_DASHBOARD))
    };

    let page = ConsumptionPage {
        generated_at: Utc::now(),
        period_days: period,
        summary: &summary,
        inventory: &inventory,
        estimate,
        recommendations: &recommendations,
        forecast: Some(&forecast),
        dashboard_url,
    };
    let title = page.title();
    let markdown = page.markdown();

    if dry_run {
        println!("{}\n", title.bold());
        println!("{}", markdown);
        return Ok(());
    }

    let space_key = space.unwrap_or_else(|| config.confluence.space_key.clone());
    require(&space_key, "confluence.space_key")?;
    let confluence = client(config)?;
    let parent_id = match (
        &config.confluence.parent_page_id,
        &config.confluence.parent_page_title,
    ) {
        (Some(id), _) => Some(id.clone()),
        (None, Some(parent_title)) => {
            let parent = confluence
                .page_by_title(&space_key, parent_title)
                .await
                .map_err(InsightsError::api(CONFLUENCE))?;
            if parent.is_none() {
                log::warn!(
                    "Parent page \"{}\" not found in {}; publishing at the space root",
                    parent_title,
                    space_key
                );
            }
            parent.map(|p| p.id)
        }
        (None, None) => None,
    };

    let (published, action) = confluence
        .create_or_update_page(
            &space_key,
            &title,
            &markdown_to_storage(&markdown),
            parent_id.as_deref(),
        )
        .await
        .map_err(InsightsError::api(CONFLUENCE))?;

    if !quiet {
        let verb = match action {
            PageAction::Created => "Created",
            PageAction::Updated => "Updated",
        };
        println!(
            "{} {} \"{}\" (version {}): {}",
            "✅".green(),
            verb,
            published.title.bold(),
            published.version_number(),
            confluence.page_url(&published.id).cyan()
        );
    }
    Ok(())
}
