use super::utils::{ELASTICSEARCH, elastic_client, load_usage_records, new_table, print_json};
use crate::cdp::clamp_history_days;
use crate::cli::{OutputFormat, StatsCommand};
use crate::config::Config;
use crate::elastic::index_pattern;
use crate::error::InsightsError;
use crate::report::format_number;
use chrono::{Duration, Utc};
use colored::Colorize;
use prettytable::row;
use std::path::PathBuf;

/// Relative difference under which both sides are considered equal
const QUANTITY_TOLERANCE: f64 = 0.001;

pub async fn handle_stats(command: StatsCommand, config: &Config, quiet: bool) -> crate::Result<()> {
    match command {
        StatsCommand::Indices { pattern, format } => handle_indices(config, &pattern, format, quiet).await,
        StatsCommand::TopClusters { size, format } => {
            handle_top_clusters(config, size, format, quiet).await
        }
        StatsCommand::Compare { days, input } => handle_compare(config, days, input, quiet).await,
    }
}

async fn handle_indices(
    config: &Config,
    pattern: &str,
    format: OutputFormat,
    quiet: bool,
) -> crate::Result<()> {
    let es = elastic_client(config)?;
    let mut indices = es
        .cat_indices(pattern)
        .await
        .map_err(InsightsError::api(ELASTICSEARCH))?;
    indices.sort_by(|a, b| a.index.cmp(&b.index));

    if format == OutputFormat::Json {
        return print_json(&indices);
    }
    if quiet {
        return Ok(());
    }
    if indices.is_empty() {
        println!("No indices match {}", pattern.cyan());
        return Ok(());
    }

    let mut table = new_table();
    table.set_titles(row!["Index", "Health", "Docs", "Size"]);
    for info in &indices {
        table.add_row(row![
            info.index,
            info.health.as_deref().unwrap_or("-"),
            r->info.docs_count.as_deref().unwrap_or("0"),
            r->info.store_size.as_deref().unwrap_or("-")
        ]);
    }
    table.printstd();
    println!("\n📦 {} indices", indices.len());
    Ok(())
}

async fn handle_top_clusters(
    config: &Config,
    size: usize,
    format: OutputFormat,
    quiet: bool,
) -> crate::Result<()> {
    let es = elastic_client(config)?;
    let clusters = es
        .top_clusters(&index_pattern(&config.indices.records), size)
        .await
        .map_err(InsightsError::api(ELASTICSEARCH))?;

    if format == OutputFormat::Json {
        return print_json(&clusters);
    }
    if quiet {
        return Ok(());
    }

    let total: f64 = clusters.iter().map(|c| c.credits).sum();
    let mut table = new_table();
    table.set_titles(row!["#", "Cluster", "Credits", "Share"]);
    for (rank, cluster) in clusters.iter().enumerate() {
        let share = if total > 0.0 { cluster.credits / total * 100.0 } else { 0.0 };
        table.add_row(row![
            r->rank + 1,
            cluster.cluster_name,
            r->format_number(cluster.credits, 2),
            r->format!("{:.1}%", share)
        ]);
    }
    table.printstd();
    Ok(())
}

/// Billable quantity seen by the CDP CLI against what landed in the index
async fn handle_compare(
    config: &Config,
    days: Option<i64>,
    input: Option<PathBuf>,
    quiet: bool,
) -> crate::Result<()> {
    let days = clamp_history_days(days.unwrap_or(config.cdp.history_days));
    let records = load_usage_records(config, input.as_deref(), days, quiet)?;
    let cdp_quantity: f64 = records.iter().filter_map(|r| r.quantity).sum();

    let es = elastic_client(config)?;
    let now = Utc::now();
    let es_total = es
        .total_quantity(
            &index_pattern(&config.indices.records),
            now - Duration::days(days),
            now,
        )
        .await
        .map_err(InsightsError::api(ELASTICSEARCH))?;

    let difference = es_total.quantity - cdp_quantity;
    let relative = if cdp_quantity.abs() > f64::EPSILON {
        difference / cdp_quantity
    } else if es_total.quantity.abs() > f64::EPSILON {
        1.0
    } else {
        0.0
    };

    if quiet {
        return Ok(());
    }

    println!("{}", format!("🔎 Billable quantity, last {} days", days).bold());
    println!(
        "  CDP CLI:        {} ({} records)",
        format_number(cdp_quantity, 2),
        records.len()
    );
    println!(
        "  Elasticsearch:  {} ({} records)",
        format_number(es_total.quantity, 2),
        es_total.records
    );
    println!(
        "  Difference:     {} ({:+.2}%)",
        format_number(difference, 2),
        relative * 100.0
    );

    if relative.abs() <= QUANTITY_TOLERANCE {
        println!("\n{} Quantities match", "✅".green());
    } else if difference > 0.0 {
        println!(
            "\n{} Elasticsearch holds more than CDP reports; old indices may hold duplicates",
            "⚠️".yellow()
        );
        println!("   Re-run `cdp-ctl ingest` without --keep-old to rebuild them");
    } else {
        println!(
            "\n{} Elasticsearch is missing usage; run `cdp-ctl ingest`",
            "⚠️".yellow()
        );
    }
    Ok(())
}
