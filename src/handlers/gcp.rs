use super::utils::{new_table, print_json};
use crate::cli::{GcpCommand, OutputFormat};
use crate::common::progress::{progress_bar, spinner};
use crate::config::Config;
use crate::gcp::{
    BucketUsage, GcpClient, GcpEndpoints, GcpInventory, access_token, estimate_costs,
    format_size, resolve_project,
};
use crate::report::{GcpReport, format_number, logo_data_uri};
use chrono::Utc;
use colored::Colorize;
use prettytable::row;
use std::path::PathBuf;

pub async fn handle_gcp(command: GcpCommand, config: &Config, quiet: bool) -> crate::Result<()> {
    match command {
        GcpCommand::Report {
            output,
            project,
            skip_bucket_sizes,
        } => {
            let inventory = collect_inventory(config, project, !skip_bucket_sizes, quiet).await?;
            write_report(config, &inventory, output, quiet)
        }
        GcpCommand::Inventory { project, format } => {
            let inventory = collect_inventory(config, project, true, quiet).await?;
            match format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "inventory": inventory,
                    "costs": estimate_costs(&inventory),
                })),
                OutputFormat::Table if !quiet => {
                    print_inventory(&inventory);
                    Ok(())
                }
                OutputFormat::Table => Ok(()),
            }
        }
    }
}

async fn collect_inventory(
    config: &Config,
    project: Option<String>,
    with_bucket_sizes: bool,
    quiet: bool,
) -> crate::Result<GcpInventory> {
    let mut gcp_config = config.gcp.clone();
    if project.is_some() {
        gcp_config.project_id = project;
    }
    let project_id = resolve_project(&gcp_config)?;
    let token = access_token(&gcp_config)?;
    let client = GcpClient::new(
        &project_id,
        &token,
        gcp_config.region.clone(),
        &GcpEndpoints::default(),
    )?;

    if !quiet {
        println!(
            "{} {}",
            "☁️  Collecting Google Cloud inventory for".bright_blue().bold(),
            project_id.cyan()
        );
    }

    let progress = spinner("Listing instances, disks and buckets...", quiet);
    let listed = async {
        let instances = client.list_instances().await?;
        let disks = client.list_disks().await?;
        let buckets = client.list_buckets().await?;
        Ok::<_, crate::gcp::GcpError>((instances, disks, buckets))
    }
    .await;
    progress.finish_and_clear();
    let (instances, disks, buckets) = listed?;

    let mut usages = Vec::with_capacity(buckets.len());
    if with_bucket_sizes && !buckets.is_empty() {
        let bar = progress_bar(buckets.len() as u64, "bucket sizes", quiet);
        let now = Utc::now();
        for bucket in buckets {
            bar.set_message(bucket.name.clone());
            // One bucket without metrics should not sink the report
            let size = client
                .bucket_size_bytes(&bucket.name, now)
                .await
                .unwrap_or_else(|e| {
                    log::warn!("No size for bucket {}: {}", bucket.name, e);
                    None
                });
            usages.push(BucketUsage::from_bucket(bucket, size));
            bar.inc(1);
        }
        bar.finish_and_clear();
    } else {
        usages.extend(buckets.into_iter().map(|b| BucketUsage::from_bucket(b, None)));
    }

    Ok(GcpInventory::build(&project_id, &instances, &disks, usages))
}

fn write_report(
    config: &Config,
    inventory: &GcpInventory,
    output: Option<PathBuf>,
    quiet: bool,
) -> crate::Result<()> {
    let output = output.unwrap_or_else(|| config.report.gcp_output.clone());
    let costs = estimate_costs(inventory);
    let report = GcpReport {
        generated_at: Utc::now(),
        inventory,
        costs,
        logo: config.report.logo_path.as_deref().and_then(logo_data_uri),
    };
    report.write(&output)?;

    if !quiet {
        println!(
            "  {} instances, {} disks, {} buckets",
            inventory.instance_count(),
            inventory.disk_count,
            inventory.buckets.len()
        );
        println!("  Estimated monthly cost: ${}", format_number(costs.total(), 2));
        println!(
            "\n{} Report written to {}",
            "✅".green(),
            output.display().to_string().cyan()
        );
    }
    Ok(())
}

fn print_inventory(inventory: &GcpInventory) {
    let costs = estimate_costs(inventory);

    println!("\n{}", "🖥️  Instances".bold());
    println!(
        "  {} running, {} stopped",
        inventory.running.len().to_string().green(),
        inventory.stopped.len().to_string().yellow()
    );
    if !inventory.machine_types.is_empty() {
        let mut table = new_table();
        table.set_titles(row!["Machine type", "Total", "Running", "Stopped"]);
        for (machine_type, count) in &inventory.machine_types {
            table.add_row(row![machine_type, r->count.count, r->count.running, r->count.stopped]);
        }
        table.printstd();
    }

    println!("\n{}", "💽 Disks".bold());
    println!(
        "  {} disks, {} GB",
        inventory.disk_count,
        format_number(inventory.disk_total_gb, 0)
    );

    println!("\n{}", "🪣 Buckets".bold());
    if inventory.buckets.is_empty() {
        println!("  none");
    } else {
        let mut table = new_table();
        table.set_titles(row!["Bucket", "Location", "Class", "Size"]);
        for bucket in &inventory.buckets {
            let size = bucket
                .size_bytes
                .map(format_size)
                .unwrap_or_else(|| "-".to_string());
            table.add_row(row![bucket.name, bucket.location, bucket.storage_class, r->size]);
        }
        table.printstd();
    }

    println!("\n{}", "💰 Estimated monthly cost".bold());
    println!("  Compute: ${}", format_number(costs.compute, 2));
    println!("  Disks:   ${}", format_number(costs.disks, 2));
    println!("  Storage: ${}", format_number(costs.storage, 2));
    println!("  Total:   ${}", format_number(costs.total(), 2).green());
}
