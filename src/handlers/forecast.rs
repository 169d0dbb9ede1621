use super::utils::{ELASTICSEARCH, elastic_client, load_usage_records, new_table, print_json};
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::elastic::templates::forecast_template;
use crate::elastic::{ForecastDocument, TOTAL_SERIES, daily_index_name, index_pattern};
use crate::error::InsightsError;
use crate::report::format_number;
use crate::usage::{Forecast, ForecastMethod, Forecaster, aggregate};
use chrono::{NaiveDate, Utc};
use colored::Colorize;
use prettytable::row;
use serde::Serialize;
use std::path::PathBuf;

pub struct ForecastOptions {
    pub horizon: Option<usize>,
    pub method: Option<ForecastMethod>,
    pub clusters: Vec<String>,
    pub history_days: i64,
    pub input: Option<PathBuf>,
    pub index: bool,
    pub format: OutputFormat,
}

/// One forecast series; `cluster` is `None` for the total
#[derive(Serialize)]
struct Series {
    cluster: Option<String>,
    history_days: usize,
    forecast: Forecast,
}

impl Series {
    fn label(&self) -> &str {
        self.cluster.as_deref().unwrap_or(TOTAL_SERIES)
    }
}

pub async fn handle_forecast(
    options: ForecastOptions,
    config: &Config,
    quiet: bool,
) -> crate::Result<()> {
    let method = options.method.unwrap_or(config.forecast.method);
    let clusters = if options.clusters.is_empty() {
        config.forecast.top_clusters.clone()
    } else {
        options.clusters
    };
    let forecaster = Forecaster::new(method)
        .with_horizon(options.horizon.unwrap_or(config.forecast.days))
        .with_min_history(config.forecast.min_history)
        .with_band(config.forecast.confidence_interval);

    let histories = load_histories(config, options.input, options.history_days, &clusters, quiet)
        .await?;
    let series: Vec<Series> = histories
        .into_iter()
        .map(|(cluster, history)| Series {
            history_days: history.len(),
            forecast: forecaster.forecast(&history),
            cluster,
        })
        .collect();

    match options.format {
        OutputFormat::Json => print_json(&series)?,
        OutputFormat::Table if !quiet => print_series(&series),
        OutputFormat::Table => {}
    }

    if options.index {
        index_forecasts(config, &series, quiet).await?;
    }
    Ok(())
}

/// Daily credit history for the total and each requested cluster
async fn load_histories(
    config: &Config,
    input: Option<PathBuf>,
    history_days: i64,
    clusters: &[String],
    quiet: bool,
) -> crate::Result<Vec<(Option<String>, Vec<(NaiveDate, f64)>)>> {
    let mut histories = Vec::with_capacity(clusters.len() + 1);

    if let Some(path) = input {
        let records = load_usage_records(config, Some(&path), history_days, quiet)?;
        let summary = aggregate(&records);
        histories.push((None, summary.daily_series()));
        for cluster in clusters {
            histories.push((Some(cluster.clone()), summary.cluster_daily_series(cluster)));
        }
        return Ok(histories);
    }

    let es = elastic_client(config)?;
    let pattern = index_pattern(&config.indices.records);
    let now = Utc::now();
    histories.push((
        None,
        es.daily_credits(&pattern, None, history_days, now)
            .await
            .map_err(InsightsError::api(ELASTICSEARCH))?,
    ));
    for cluster in clusters {
        let history = es
            .daily_credits(&pattern, Some(cluster), history_days, now)
            .await
            .map_err(InsightsError::api(ELASTICSEARCH))?;
        histories.push((Some(cluster.clone()), history));
    }
    Ok(histories)
}

fn print_series(series: &[Series]) {
    for s in series {
        println!(
            "\n{} {} ({} days of history)",
            "📈".cyan(),
            s.label().bold(),
            s.history_days
        );
        if s.forecast.is_empty() {
            println!("   {}", "Not enough history to forecast".yellow());
            continue;
        }

        let mut table = new_table();
        table.set_titles(row!["Date", "Predicted", "Lower", "Upper"]);
        for p in &s.forecast.points {
            table.add_row(row![
                p.date,
                r->format_number(p.predicted, 2),
                r->format_number(p.lower, 2),
                r->format_number(p.upper, 2)
            ]);
        }
        table.printstd();
        println!(
            "   Method: {}  R²: {:.3}  Total: {} credits",
            s.forecast.method_used,
            s.forecast.r_squared,
            format_number(s.forecast.total_predicted(), 2).green()
        );
    }
}

async fn index_forecasts(config: &Config, series: &[Series], quiet: bool) -> crate::Result<()> {
    let now = Utc::now();
    let docs: Vec<ForecastDocument> = series
        .iter()
        .flat_map(|s| {
            let method = s.forecast.method_used.to_string();
            s.forecast
                .points
                .iter()
                .map(move |p| ForecastDocument::from_point(p, s.cluster.as_deref(), &method, now))
        })
        .collect();
    if docs.is_empty() {
        log::warn!("No forecast points to index");
        return Ok(());
    }

    let es = elastic_client(config)?;
    let base = &config.indices.forecast;
    es.replace_template(base, &forecast_template(base))
        .await
        .map_err(InsightsError::api(ELASTICSEARCH))?;
    let index = daily_index_name(base, now);
    let summary = es
        .bulk_index(&index, &docs)
        .await
        .map_err(InsightsError::api(ELASTICSEARCH))?;
    es.refresh(&index)
        .await
        .map_err(InsightsError::api(ELASTICSEARCH))?;

    if summary.failed > 0 {
        log::warn!("{} forecast points failed to index", summary.failed);
    }
    if !quiet {
        println!(
            "\n{} {} forecast points indexed into {}",
            "✅".green(),
            summary.indexed,
            index.cyan()
        );
    }
    Ok(())
}
