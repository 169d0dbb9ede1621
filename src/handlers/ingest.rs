use super::utils::{ELASTICSEARCH, elastic_client, load_usage_records};
use crate::common::progress::spinner;
use crate::config::Config;
use crate::elastic::templates::{forecast_template, records_template, summary_template};
use crate::elastic::{
    BulkSummary, ElasticClient, RecordDocument, SummaryDocument, daily_index_name, index_pattern,
};
use crate::error::InsightsError;
use crate::usage::daily_cluster_summaries;
use chrono::Utc;
use colored::Colorize;
use std::path::PathBuf;

pub async fn handle_ingest(
    days: Option<i64>,
    input: Option<PathBuf>,
    keep_old: bool,
    dry_run: bool,
    config: &Config,
    quiet: bool,
) -> crate::Result<()> {
    let days = days.unwrap_or(config.cdp.history_days);
    let indices = &config.indices;

    if !quiet {
        println!("{}", "📥 CDP to Elasticsearch ingestion".bright_blue().bold());
    }

    let records = load_usage_records(config, input.as_deref(), days, quiet)?;
    if records.is_empty() {
        return Err(InsightsError::Aborted(
            "No usage records returned by CDP; nothing to ingest".to_string(),
        ));
    }

    let now = Utc::now();
    let record_docs: Vec<RecordDocument> = records
        .iter()
        .map(|r| RecordDocument::from_record(r, now))
        .collect();
    let summary_docs: Vec<SummaryDocument> = daily_cluster_summaries(&records)
        .iter()
        .map(SummaryDocument::from)
        .collect();
    let records_index = daily_index_name(&indices.records, now);
    let summary_index = daily_index_name(&indices.summary, now);

    if dry_run {
        if !quiet {
            println!("  Records:   {} → {}", record_docs.len(), records_index);
            println!("  Summaries: {} → {}", summary_docs.len(), summary_index);
            println!("\n{} Dry run, nothing written", "ℹ️".blue());
        }
        return Ok(());
    }

    let es = elastic_client(config)?;
    let info = es.info().await.map_err(InsightsError::api(ELASTICSEARCH))?;
    log::info!(
        "Connected to {} (Elasticsearch {})",
        info.cluster_name,
        info.version.number
    );

    if !keep_old {
        let deleted = delete_old_indices(&es, &[&indices.records, &indices.summary]).await?;
        if !quiet {
            println!("  Removed {} previously ingested indices", deleted);
        }
    }

    for (base, template) in [
        (&indices.records, records_template(&indices.records)),
        (&indices.summary, summary_template(&indices.summary)),
        (&indices.forecast, forecast_template(&indices.forecast)),
    ] {
        es.replace_template(base, &template)
            .await
            .map_err(InsightsError::api(ELASTICSEARCH))?;
    }
    log::info!("Index templates updated");

    let progress = spinner(&format!("Indexing {} records...", record_docs.len()), quiet);
    let loaded = es
        .bulk_index(&records_index, &record_docs)
        .await
        .map_err(InsightsError::api(ELASTICSEARCH));
    progress.finish_and_clear();
    report_bulk("records", &records_index, loaded?, quiet);

    let loaded = es
        .bulk_index(&summary_index, &summary_docs)
        .await
        .map_err(InsightsError::api(ELASTICSEARCH))?;
    report_bulk("daily summaries", &summary_index, loaded, quiet);

    for index in [&records_index, &summary_index] {
        es.refresh(index)
            .await
            .map_err(InsightsError::api(ELASTICSEARCH))?;
    }

    if !quiet {
        println!("\n{} Ingestion complete", "✅".green());
        println!("  {} (individual records)", index_pattern(&indices.records).cyan());
        println!("  {} (daily cluster totals)", index_pattern(&indices.summary).cyan());
    }
    Ok(())
}

/// Delete every daily index of the given bases so a re-run does not
/// duplicate records. Returns how many were removed.
async fn delete_old_indices(es: &ElasticClient, bases: &[&String]) -> crate::Result<usize> {
    let mut deleted = 0;
    for base in bases {
        let existing = es
            .cat_indices(&index_pattern(base))
            .await
            .map_err(InsightsError::api(ELASTICSEARCH))?;
        for index in existing {
            log::info!("Deleting index {}", index.index);
            es.delete_index(&index.index)
                .await
                .map_err(InsightsError::api(ELASTICSEARCH))?;
            deleted += 1;
        }
    }
    Ok(deleted)
}

fn report_bulk(what: &str, index: &str, summary: BulkSummary, quiet: bool) {
    if summary.failed > 0 {
        log::warn!("{} {} failed to index into {}", summary.failed, what, index);
    }
    if quiet {
        return;
    }
    let mark = if summary.failed == 0 { "✅".green() } else { "⚠️".yellow() };
    println!(
        "  {} {} {} indexed into {} ({} failed)",
        mark,
        summary.indexed,
        what,
        index.cyan(),
        summary.failed
    );
}
