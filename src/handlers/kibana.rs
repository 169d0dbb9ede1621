use super::utils::{
    ELASTICSEARCH, KIBANA, elastic_client, kibana_client, new_table, print_json,
};
use crate::cli::{KibanaCommand, OutputFormat};
use crate::common::progress::spinner;
use crate::config::Config;
use crate::elastic::index_pattern;
use crate::error::InsightsError;
use crate::kibana::catalog::{
    self, FORECAST_DASHBOARD, FORECAST_DATA_VIEW, HOURS_TRENDS_DASHBOARD, MAIN_DASHBOARD,
};
use crate::kibana::{Dashboard, DataViewSpec, KibanaClient, Lens, SaveOutcome};
use colored::Colorize;
use prettytable::row;
use serde::Serialize;

pub async fn handle_kibana(command: KibanaCommand, config: &Config, quiet: bool) -> crate::Result<()> {
    let kibana = kibana_client(config)?;
    match command {
        KibanaCommand::Setup => handle_setup(&kibana, config, quiet).await,
        KibanaCommand::Forecast { clusters } => {
            let clusters = if clusters.is_empty() {
                config.forecast.top_clusters.clone()
            } else {
                clusters
            };
            handle_forecast_dashboard(&kibana, config, &clusters, quiet).await
        }
        KibanaCommand::Hours { clusters, top } => {
            let clusters = if clusters.is_empty() {
                top_cluster_names(config, top).await?
            } else {
                clusters
            };
            handle_hours_dashboard(&kibana, &clusters, quiet).await
        }
        KibanaCommand::Verify { format } => handle_verify(&kibana, config, format, quiet).await,
    }
}

/// Created/updated counts of one publishing pass
#[derive(Debug, Default)]
struct Tally {
    created: usize,
    updated: usize,
}

impl Tally {
    fn record(&mut self, outcome: SaveOutcome) {
        match outcome {
            SaveOutcome::Created => self.created += 1,
            SaveOutcome::Updated => self.updated += 1,
        }
    }
}

async fn ensure_data_views(
    kibana: &KibanaClient,
    specs: &[DataViewSpec],
    quiet: bool,
) -> crate::Result<()> {
    for spec in specs {
        let created = kibana
            .create_data_view(spec.id, &spec.title, spec.time_field)
            .await
            .map_err(InsightsError::api(KIBANA))?;
        if !quiet {
            let state = if created { "created" } else { "already exists" };
            println!("  📁 Data view {} ({}) {}", spec.id.cyan(), spec.title, state);
        }
    }
    Ok(())
}

async fn save_lenses(kibana: &KibanaClient, lenses: &[Lens], quiet: bool) -> crate::Result<Tally> {
    let progress = spinner(&format!("Saving {} visualizations...", lenses.len()), quiet);
    let mut tally = Tally::default();
    for lens in lenses {
        progress.set_message(format!("Saving {}", lens.title));
        let outcome = kibana
            .save_object("lens", &lens.id, &lens.to_saved_object())
            .await
            .map_err(InsightsError::api(KIBANA));
        match outcome {
            Ok(outcome) => tally.record(outcome),
            Err(e) => {
                progress.finish_and_clear();
                return Err(e);
            }
        }
    }
    progress.finish_and_clear();
    if !quiet {
        println!(
            "  📈 Visualizations: {} created, {} updated",
            tally.created, tally.updated
        );
    }
    Ok(tally)
}

async fn save_dashboards(
    kibana: &KibanaClient,
    dashboards: &[Dashboard],
    quiet: bool,
) -> crate::Result<()> {
    for dashboard in dashboards {
        let outcome = kibana
            .save_object("dashboard", &dashboard.id, &dashboard.to_saved_object())
            .await
            .map_err(InsightsError::api(KIBANA))?;
        if !quiet {
            let state = match outcome {
                SaveOutcome::Created => "created",
                SaveOutcome::Updated => "updated",
            };
            println!(
                "  📊 {} ({} panels) {}",
                dashboard.title.bold(),
                dashboard.len(),
                state
            );
        }
    }
    Ok(())
}

async fn handle_setup(kibana: &KibanaClient, config: &Config, quiet: bool) -> crate::Result<()> {
    if !quiet {
        println!("{}", "🛠️  Setting up Kibana consumption dashboards".bright_blue().bold());
    }

    ensure_data_views(kibana, &catalog::data_views(&config.indices), quiet).await?;
    save_lenses(kibana, &catalog::consumption_visualizations(), quiet).await?;
    save_dashboards(kibana, &catalog::consumption_dashboards(), quiet).await?;

    if !quiet {
        println!(
            "\n{} Main dashboard: {}",
            "✅".green(),
            kibana.dashboard_url(MAIN_DASHBOARD).cyan()
        );
    }
    Ok(())
}

async fn handle_forecast_dashboard(
    kibana: &KibanaClient,
    config: &Config,
    clusters: &[String],
    quiet: bool,
) -> crate::Result<()> {
    if !quiet {
        println!("{}", "🔮 Setting up the forecast dashboard".bright_blue().bold());
    }

    let forecast_view: Vec<DataViewSpec> = catalog::data_views(&config.indices)
        .into_iter()
        .filter(|spec| spec.id == FORECAST_DATA_VIEW)
        .collect();
    ensure_data_views(kibana, &forecast_view, quiet).await?;
    save_lenses(kibana, &catalog::forecast_visualizations(clusters), quiet).await?;
    save_dashboards(kibana, &[catalog::forecast_dashboard(clusters)], quiet).await?;

    if !quiet {
        println!(
            "\n{} Forecast dashboard: {}",
            "✅".green(),
            kibana.dashboard_url(FORECAST_DASHBOARD).cyan()
        );
        println!("   Run `cdp-ctl forecast --index` to fill it with predictions");
    }
    Ok(())
}

async fn top_cluster_names(config: &Config, top: usize) -> crate::Result<Vec<String>> {
    let es = elastic_client(config)?;
    let clusters = es
        .top_clusters(&index_pattern(&config.indices.records), top)
        .await
        .map_err(InsightsError::api(ELASTICSEARCH))?;
    Ok(clusters.into_iter().map(|c| c.cluster_name).collect())
}

async fn handle_hours_dashboard(
    kibana: &KibanaClient,
    clusters: &[String],
    quiet: bool,
) -> crate::Result<()> {
    if clusters.is_empty() {
        return Err(InsightsError::Aborted(
            "No clusters to chart; ingest usage first or pass --cluster".to_string(),
        ));
    }
    if !quiet {
        println!(
            "{}",
            format!("⏱️  Charting billable hours for {} clusters", clusters.len())
                .bright_blue()
                .bold()
        );
    }

    save_lenses(kibana, &catalog::cluster_hours_visualizations(clusters), quiet).await?;
    save_dashboards(kibana, &[catalog::hours_trends_dashboard(clusters)], quiet).await?;

    if !quiet {
        println!(
            "\n{} Hours dashboard: {}",
            "✅".green(),
            kibana.dashboard_url(HOURS_TRENDS_DASHBOARD).cyan()
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct SavedObjectRow {
    kind: String,
    id: String,
    title: String,
}

async fn handle_verify(
    kibana: &KibanaClient,
    config: &Config,
    format: OutputFormat,
    quiet: bool,
) -> crate::Result<()> {
    let mut rows = Vec::new();
    for kind in ["index-pattern", "lens", "dashboard"] {
        let objects = kibana
            .find_objects(kind)
            .await
            .map_err(InsightsError::api(KIBANA))?;
        rows.extend(objects.into_iter().map(|o| SavedObjectRow {
            title: o.title().to_string(),
            kind: o.kind,
            id: o.id,
        }));
    }

    let mut missing = Vec::new();
    for spec in catalog::data_views(&config.indices) {
        let found = kibana
            .get_data_view(spec.id)
            .await
            .map_err(InsightsError::api(KIBANA))?;
        if found.is_none() {
            missing.push(spec.id.to_string());
        }
    }
    for dashboard in catalog::consumption_dashboards() {
        if !rows.iter().any(|r| r.kind == "dashboard" && r.id == dashboard.id) {
            missing.push(dashboard.id);
        }
    }

    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({"objects": rows, "missing": missing}));
    }
    if quiet {
        return Ok(());
    }

    let mut table = new_table();
    table.set_titles(row!["Type", "Id", "Title"]);
    for r in &rows {
        table.add_row(row![r.kind, r.id, r.title]);
    }
    table.printstd();

    if missing.is_empty() {
        println!("\n{} All expected data views and dashboards are present", "✅".green());
    } else {
        println!("\n{} Missing:", "❌".red());
        for id in &missing {
            println!("  - {}", id);
        }
        println!("   Run `cdp-ctl kibana setup` to create them");
    }
    Ok(())
}
