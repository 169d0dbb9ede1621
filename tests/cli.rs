use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Two clusters over fourteen days in the shape `cdp consumption
/// list-compute-usage-records` prints
fn write_usage_dump(dir: &Path) -> PathBuf {
    let mut records = Vec::new();
    for day in 1..=14 {
        records.push(json!({
            "usageStartTimestamp": format!("2024-05-{:02}T09:00:00Z", day),
            "usageEndTimestamp": format!("2024-05-{:02}T10:00:00Z", day),
            "clusterName": "etl-prod",
            "environmentName": "prod",
            "cloudProvider": "AWS",
            "instanceType": "m5.2xlarge",
            "instanceCount": 4,
            "hours": 1.0,
            "quantity": 4.0,
            "grossCharge": 10.0 + day as f64,
            "listRate": 0.5
        }));
        records.push(json!({
            "usageStartTimestamp": format!("2024-05-{:02}T22:00:00Z", day),
            "clusterName": "ml-dev",
            "environmentName": "dev",
            "instanceType": "r5.xlarge",
            "instanceCount": 1,
            "hours": 2.0,
            "quantity": 2.0,
            "grossCharge": 3.0
        }));
    }
    let path = dir.join("usage.json");
    fs::write(&path, json!({"records": records}).to_string()).unwrap();
    path
}

/// Empty config file so the developer's own settings are never picked up
fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("cdp-insights.toml");
    fs::write(&path, body).unwrap();
    path
}

fn cdp_ctl(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cdp-ctl").unwrap();
    cmd.arg("--config").arg(config);
    cmd.env_remove("CDP_INSIGHTS_ES_URL");
    cmd.env_remove("CDP_INSIGHTS_KIBANA_URL");
    cmd
}

#[test]
fn test_report_from_saved_records() {
    let dir = TempDir::new().unwrap();
    let input = write_usage_dump(dir.path());
    let config = write_config(dir.path(), "");
    let output = dir.path().join("dashboard.html");

    cdp_ctl(&config)
        .arg("report")
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .arg("--days")
        .arg("14")
        .assert()
        .success()
        .stdout(predicate::str::contains("Report written to"));

    let html = fs::read_to_string(&output).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("etl-prod"));
    assert!(html.contains("ml-dev"));
    assert!(html.contains("chart.js"));
}

#[test]
fn test_forecast_json_from_saved_records() {
    let dir = TempDir::new().unwrap();
    let input = write_usage_dump(dir.path());
    let config = write_config(dir.path(), "[forecast]\ndays = 5\n");

    let output = cdp_ctl(&config)
        .args(["--quiet", "forecast", "--format", "json", "--cluster", "etl-prod", "--input"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let series: Value = serde_json::from_slice(&output.stdout).unwrap();
    let series = series.as_array().unwrap();
    assert_eq!(series.len(), 2);
    assert!(series[0]["cluster"].is_null());
    assert_eq!(series[1]["cluster"], "etl-prod");
    assert_eq!(series[0]["history_days"], 14);

    let points = series[0]["forecast"]["points"].as_array().unwrap();
    assert_eq!(points.len(), 5);
    assert_eq!(points[0]["date"], "2024-05-15");
    // Daily totals grow by one credit a day, so the trend keeps rising
    let first = points[0]["predicted"].as_f64().unwrap();
    let last = points[4]["predicted"].as_f64().unwrap();
    assert!(last > first);
}

#[test]
fn test_ingest_dry_run_needs_no_elasticsearch() {
    let dir = TempDir::new().unwrap();
    let input = write_usage_dump(dir.path());
    let config = write_config(dir.path(), "");

    cdp_ctl(&config)
        .args(["ingest", "--dry-run", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Records:   28"))
        .stdout(predicate::str::contains("Summaries: 28"))
        .stdout(predicate::str::contains("Dry run"));
}

#[test]
fn test_confluence_publish_dry_run_prints_markdown() {
    let dir = TempDir::new().unwrap();
    let input = write_usage_dump(dir.path());
    let config = write_config(dir.path(), "");

    cdp_ctl(&config)
        .args(["confluence", "publish", "--dry-run", "--days", "14", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("CDP consumption - "))
        .stdout(predicate::str::contains("## Top clusters"))
        .stdout(predicate::str::contains("| etl-prod | prod |"));
}

#[test]
fn test_negative_days_are_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write_usage_dump(dir.path());
    let config = write_config(dir.path(), "");

    cdp_ctl(&config)
        .args(["report", "--days=-5", "--input"])
        .arg(&input)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("1..=3650"));

    cdp_ctl(&config)
        .args(["forecast", "--horizon", "100000", "--input"])
        .arg(&input)
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_out_of_range_history_in_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let input = write_usage_dump(dir.path());
    let config = write_config(dir.path(), "[cdp]\nhistory_days = -5\n");

    cdp_ctl(&config)
        .args(["ingest", "--dry-run", "--input"])
        .arg(&input)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("cdp.history_days"));
}

#[test]
fn test_missing_elasticsearch_url_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "");

    cdp_ctl(&config)
        .args(["stats", "indices"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("elasticsearch.url"));
}

#[test]
fn test_explicit_missing_config_fails() {
    Command::cargo_bin("cdp-ctl")
        .unwrap()
        .args(["--config", "/nonexistent/cdp-insights.toml", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_config_show_masks_secrets() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        "[elasticsearch]\nurl = \"https://es.example.com\"\nusername = \"infra\"\npassword = \"hunter2\"\n",
    );

    cdp_ctl(&config)
        .env_remove("CDP_INSIGHTS_ES_PASSWORD")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://es.example.com"))
        .stdout(predicate::str::contains("********"))
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "");
    let target = dir.path().join("new.toml");

    cdp_ctl(&config)
        .args(["config", "init", "--path"])
        .arg(&target)
        .assert()
        .success();
    let written = fs::read_to_string(&target).unwrap();
    assert!(written.contains("[indices]"));
    assert!(written.contains("cdp-consumption-records"));

    cdp_ctl(&config)
        .args(["config", "init", "--path"])
        .arg(&target)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}
