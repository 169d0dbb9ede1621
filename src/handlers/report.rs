use super::utils::{load_snapshot, period_days};
use crate::cdp::InventorySummary;
use crate::config::Config;
use crate::report::{CdpReport, format_number, logo_data_uri};
use crate::usage::recommendations::{estimate_monthly_cost, recommend, total_savings};
use crate::usage::{ForecastMethod, Forecaster, aggregate};
use chrono::Utc;
use colored::Colorize;
use std::path::PathBuf;

pub struct ReportOptions {
    pub output: Option<PathBuf>,
    pub days: Option<i64>,
    pub input: Option<PathBuf>,
    pub method: Option<ForecastMethod>,
    pub no_forecast: bool,
    pub logo: Option<PathBuf>,
}

pub async fn handle_report(
    options: ReportOptions,
    config: &Config,
    quiet: bool,
) -> crate::Result<()> {
    let days = options.days.unwrap_or(config.cdp.history_days);
    let output = options.output.unwrap_or_else(|| config.report.cdp_output.clone());

    if !quiet {
        println!("{}", "📊 Building CDP consumption report".bright_blue().bold());
    }

    let snapshot = load_snapshot(config, options.input.as_deref(), days, quiet)?;
    let records = &snapshot.usage.records;
    let summary = aggregate(records);
    let inventory = InventorySummary::from_inventory(&snapshot.clusters, &snapshot.datalakes);
    let period = period_days(days);
    let estimate = estimate_monthly_cost(&summary, &inventory, period);
    let recommendations = recommend(
        &summary,
        &snapshot.clusters,
        &inventory,
        estimate.monthly_credits,
    );

    let forecast = if options.no_forecast {
        None
    } else {
        let method = options.method.unwrap_or(config.forecast.method);
        let forecast = Forecaster::new(method)
            .with_horizon(config.forecast.days)
            .with_min_history(config.forecast.min_history)
            .with_band(config.forecast.confidence_interval)
            .forecast(&summary.daily_series());
        Some(forecast)
    };

    let logo = options
        .logo
        .or_else(|| config.report.logo_path.clone())
        .and_then(|path| logo_data_uri(&path));

    let report = CdpReport {
        generated_at: Utc::now(),
        user: snapshot.user.as_ref(),
        clusters: &snapshot.clusters,
        datalakes: &snapshot.datalakes,
        inventory: &inventory,
        summary: &summary,
        period_days: period,
        estimate,
        recommendations: &recommendations,
        forecast: forecast.as_ref(),
        logo,
    };
    report.write(&output)?;

    if quiet {
        return Ok(());
    }

    println!("\n{}", "📋 Summary".bold());
    println!("  Records:          {}", summary.record_count);
    if let Some((first, last)) = summary.date_range() {
        println!("  Period:           {} to {}", first, last);
    }
    println!("  Clusters:         {}", summary.by_cluster.len());
    println!("  Credits:          {}", format_number(summary.total.credits, 2));
    println!("  Billable hours:   {}", format_number(summary.total.hours, 1));
    println!(
        "  Monthly estimate: {} credits",
        format_number(estimate.monthly_credits, 2)
    );
    if summary.undated_records > 0 {
        println!(
            "  {} {} records without a usable timestamp",
            "⚠️".yellow(),
            summary.undated_records
        );
    }
    if let Some(forecast) = forecast.as_ref().filter(|f| !f.is_empty()) {
        println!(
            "  Forecast ({}):    {} credits over {} days",
            forecast.method_used,
            format_number(forecast.total_predicted(), 2),
            forecast.points.len()
        );
    }
    if !recommendations.is_empty() {
        println!(
            "  Recommendations:  {} (~{} credits/month)",
            recommendations.len(),
            format_number(total_savings(&recommendations), 2)
        );
    }

    println!(
        "\n{} Report written to {}",
        "✅".green(),
        output.display().to_string().cyan()
    );
    Ok(())
}
