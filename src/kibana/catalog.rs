//! The consumption visualizations and dashboards published to Kibana

use super::dashboard::{Dashboard, PanelLayout as P};
use super::lens::{Bucket, Chart, Lens, Measure, SeriesType};
use crate::config::types::IndexConfig;
use crate::elastic::documents::index_pattern;

pub const RECORDS_DATA_VIEW: &str = "cdp-records-dataview";
pub const SUMMARY_DATA_VIEW: &str = "cdp-summary-dataview";
pub const FORECAST_DATA_VIEW: &str = "cdp-forecast-dataview";

pub const MAIN_DASHBOARD: &str = "dashboard-cdp-main";
pub const FORECAST_DASHBOARD: &str = "dashboard-cdp-forecast";
pub const HOURS_TRENDS_DASHBOARD: &str = "dashboard-cdp-hours-trends";

/// A data view to create before any visualization that uses it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataViewSpec {
    pub id: &'static str,
    pub title: String,
    pub time_field: &'static str,
}

pub fn data_views(indices: &IndexConfig) -> Vec<DataViewSpec> {
    vec![
        DataViewSpec {
            id: RECORDS_DATA_VIEW,
            title: index_pattern(&indices.records),
            time_field: "@timestamp",
        },
        DataViewSpec {
            id: SUMMARY_DATA_VIEW,
            title: index_pattern(&indices.summary),
            time_field: "@timestamp",
        },
        DataViewSpec {
            id: FORECAST_DATA_VIEW,
            title: index_pattern(&indices.forecast),
            time_field: "@timestamp",
        },
    ]
}

/// Visualizations over the raw records index
pub fn consumption_visualizations() -> Vec<Lens> {
    let dv = RECORDS_DATA_VIEW;
    let credits = || Measure::sum("credits");
    let hours = || Measure::sum("quantity");

    vec![
        Lens::metric("lens-total-credits", "Total credits", dv, credits())
            .describe("Sum of credits consumed"),
        Lens::metric("lens-total-hours", "Total hours", dv, hours())
            .describe("Sum of billable instance-hours"),
        Lens::metric("lens-total-records", "Total records", dv, Measure::Count)
            .describe("Number of usage records"),
        Lens::metric("lens-avg-credits", "Average credits per record", dv, Measure::average("credits")),
        Lens::metric("lens-avg-hours", "Average hours per record", dv, Measure::average("quantity")),
        Lens::metric(
            "lens-avg-instances",
            "Average instances",
            dv,
            Measure::average("instance_count"),
        )
        .describe("Average instance count per record"),
        Lens::donut(
            "lens-credits-by-cluster",
            "Credits by cluster",
            dv,
            ("Cluster", "cluster_name"),
            10,
            ("Credits", credits()),
        ),
        Lens::donut(
            "lens-credits-by-env",
            "Credits by environment",
            dv,
            ("Environment", "environment_name"),
            10,
            ("Credits", credits()),
        ),
        Lens::donut(
            "lens-weekend-comparison",
            "Weekend vs weekday",
            dv,
            ("Period", "weekend_label"),
            5,
            ("Credits", credits()),
        ),
        Lens::donut(
            "lens-night-comparison",
            "Night vs day",
            dv,
            ("Time of day", "time_of_day_label"),
            5,
            ("Credits", credits()),
        )
        .describe("Night is 20:00-06:00"),
        Lens::donut(
            "lens-cloud-provider",
            "Credits by cloud provider",
            dv,
            ("Provider", "cloud_provider"),
            5,
            ("Credits", credits()),
        ),
        Lens::donut(
            "lens-cluster-type",
            "Credits by cluster type",
            dv,
            ("Cluster type", "cluster_type"),
            10,
            ("Credits", credits()),
        ),
        Lens::new("lens-consumption-trend", "Consumption trend", dv, Chart::Xy(SeriesType::Line))
            .describe("Credits over time for the top clusters")
            .bucket("@timestamp", Bucket::auto_dates())
            .measure("Credits", credits())
            .split_by("Cluster", Bucket::terms("cluster_name", 5)),
        Lens::new("lens-hours-trend", "Hours trend", dv, Chart::Xy(SeriesType::Area))
            .describe("Billable hours over time for the top clusters")
            .bucket("@timestamp", Bucket::auto_dates())
            .measure("Hours", hours())
            .split_by("Cluster", Bucket::terms("cluster_name", 5)),
        Lens::new("lens-daily-consumption", "Daily consumption", dv, Chart::Xy(SeriesType::Bar))
            .bucket("Day", Bucket::by_day())
            .measure("Credits", credits()),
        Lens::new(
            "lens-top-days",
            "Top days by consumption",
            dv,
            Chart::Xy(SeriesType::BarHorizontal),
        )
        .bucket("Day", Bucket::by_day())
        .measure("Credits", credits()),
        Lens::new("lens-time-blocks", "Consumption by time block", dv, Chart::Xy(SeriesType::Bar))
            .describe("Credits per four-hour block")
            .bucket("Time block", Bucket::categories("time_block", 10))
            .measure("Credits", credits()),
        Lens::new("lens-day-of-week", "Consumption by day of week", dv, Chart::Xy(SeriesType::Bar))
            .bucket("Day", Bucket::categories("day_of_week_name", 10))
            .measure("Credits", credits()),
        Lens::new(
            "lens-instance-types",
            "Top instance types",
            dv,
            Chart::Xy(SeriesType::BarHorizontal),
        )
        .bucket("Instance type", Bucket::terms("instance_type", 10))
        .measure("Credits", credits()),
        Lens::new("lens-hours-by-env", "Hours by environment", dv, Chart::Xy(SeriesType::Bar))
            .bucket("Environment", Bucket::terms("environment_name", 10))
            .measure("Hours", hours()),
        Lens::new(
            "lens-instances-by-cluster",
            "Instances by cluster",
            dv,
            Chart::Xy(SeriesType::BarHorizontal),
        )
        .bucket("Cluster", Bucket::terms("cluster_name", 10))
        .measure("Instances", Measure::sum("instance_count")),
        Lens::new("lens-table-top-clusters", "Top clusters", dv, Chart::Table)
            .describe("Most expensive clusters in detail")
            .bucket("Cluster", Bucket::terms("cluster_name", 15))
            .measure("Credits", credits())
            .measure("Hours", hours())
            .measure("Average instances", Measure::average("instance_count"))
            .measure("Records", Measure::Count),
    ]
}

pub fn main_dashboard() -> Dashboard {
    Dashboard::new(MAIN_DASHBOARD, "CDP - Consumption analysis", "CDP consumption overview")
        .with_layout(&[
            ("lens-total-credits", P::new(0, 0, 16, 8)),
            ("lens-total-hours", P::new(16, 0, 16, 8)),
            ("lens-total-records", P::new(32, 0, 16, 8)),
            ("lens-avg-credits", P::new(0, 8, 16, 8)),
            ("lens-avg-hours", P::new(16, 8, 16, 8)),
            ("lens-avg-instances", P::new(32, 8, 16, 8)),
            ("lens-consumption-trend", P::new(0, 16, 24, 15)),
            ("lens-hours-trend", P::new(24, 16, 24, 15)),
            ("lens-daily-consumption", P::new(0, 31, 32, 12)),
            ("lens-top-days", P::new(32, 31, 16, 12)),
            ("lens-credits-by-cluster", P::new(0, 43, 12, 12)),
            ("lens-credits-by-env", P::new(12, 43, 12, 12)),
            ("lens-cloud-provider", P::new(24, 43, 12, 12)),
            ("lens-cluster-type", P::new(36, 43, 12, 12)),
            ("lens-weekend-comparison", P::new(0, 55, 12, 10)),
            ("lens-night-comparison", P::new(12, 55, 12, 10)),
            ("lens-time-blocks", P::new(24, 55, 24, 12)),
            ("lens-day-of-week", P::new(0, 67, 24, 12)),
            ("lens-hours-by-env", P::new(24, 67, 24, 12)),
            ("lens-instance-types", P::new(0, 79, 24, 12)),
            ("lens-instances-by-cluster", P::new(24, 79, 24, 12)),
            ("lens-table-top-clusters", P::new(0, 91, 48, 15)),
        ])
}

pub fn executive_dashboard() -> Dashboard {
    Dashboard::new(
        "dashboard-cdp-executive",
        "CDP - Executive view",
        "Key consumption KPIs",
    )
    .with_layout(&[
        ("lens-total-credits", P::new(0, 0, 16, 10)),
        ("lens-total-hours", P::new(16, 0, 16, 10)),
        ("lens-total-records", P::new(32, 0, 16, 10)),
        ("lens-consumption-trend", P::new(0, 10, 48, 15)),
        ("lens-credits-by-cluster", P::new(0, 25, 24, 15)),
        ("lens-credits-by-env", P::new(24, 25, 24, 15)),
        ("lens-table-top-clusters", P::new(0, 40, 48, 15)),
    ])
}

pub fn temporal_dashboard() -> Dashboard {
    Dashboard::new(
        "dashboard-cdp-temporal",
        "CDP - Temporal analysis",
        "Consumption trends and time patterns",
    )
    .with_layout(&[
        ("lens-consumption-trend", P::new(0, 0, 24, 15)),
        ("lens-hours-trend", P::new(24, 0, 24, 15)),
        ("lens-daily-consumption", P::new(0, 15, 32, 15)),
        ("lens-top-days", P::new(32, 15, 16, 15)),
        ("lens-day-of-week", P::new(0, 30, 24, 15)),
        ("lens-time-blocks", P::new(24, 30, 24, 15)),
    ])
}

pub fn cost_dashboard() -> Dashboard {
    Dashboard::new(
        "dashboard-cdp-costs",
        "CDP - Cost analysis",
        "Credit spend in detail",
    )
    .with_layout(&[
        ("lens-total-credits", P::new(0, 0, 16, 8)),
        ("lens-avg-credits", P::new(16, 0, 16, 8)),
        ("lens-consumption-trend", P::new(32, 0, 16, 16)),
        ("lens-credits-by-cluster", P::new(0, 8, 16, 12)),
        ("lens-credits-by-env", P::new(16, 8, 16, 12)),
        ("lens-cloud-provider", P::new(0, 20, 12, 12)),
        ("lens-cluster-type", P::new(12, 20, 12, 12)),
        ("lens-instance-types", P::new(24, 20, 24, 12)),
        ("lens-table-top-clusters", P::new(0, 32, 48, 15)),
    ])
}

pub fn distribution_dashboard() -> Dashboard {
    Dashboard::new(
        "dashboard-cdp-distribution",
        "CDP - Distributions",
        "Resource distribution across dimensions",
    )
    .with_layout(&[
        ("lens-credits-by-cluster", P::new(0, 0, 12, 15)),
        ("lens-credits-by-env", P::new(12, 0, 12, 15)),
        ("lens-cloud-provider", P::new(24, 0, 12, 15)),
        ("lens-cluster-type", P::new(36, 0, 12, 15)),
        ("lens-instance-types", P::new(0, 15, 24, 15)),
        ("lens-instances-by-cluster", P::new(24, 15, 24, 15)),
        ("lens-hours-by-env", P::new(0, 30, 48, 12)),
    ])
}

pub fn efficiency_dashboard() -> Dashboard {
    Dashboard::new(
        "dashboard-cdp-efficiency",
        "CDP - Efficiency and patterns",
        "Usage patterns and optimization opportunities",
    )
    .with_layout(&[
        ("lens-weekend-comparison", P::new(0, 0, 12, 12)),
        ("lens-night-comparison", P::new(12, 0, 12, 12)),
        ("lens-avg-credits", P::new(24, 0, 8, 12)),
        ("lens-avg-hours", P::new(32, 0, 8, 12)),
        ("lens-avg-instances", P::new(40, 0, 8, 12)),
        ("lens-time-blocks", P::new(0, 12, 24, 15)),
        ("lens-day-of-week", P::new(24, 12, 24, 15)),
        ("lens-hours-trend", P::new(0, 27, 48, 15)),
    ])
}

/// The six consumption dashboards
pub fn consumption_dashboards() -> Vec<Dashboard> {
    vec![
        main_dashboard(),
        executive_dashboard(),
        temporal_dashboard(),
        cost_dashboard(),
        distribution_dashboard(),
        efficiency_dashboard(),
    ]
}

/// Visualization id derived from a cluster name
pub fn cluster_slug(cluster: &str) -> String {
    cluster
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// Forecast tiles, the all-cluster prediction chart, a table and one chart
/// per listed cluster
pub fn forecast_visualizations(clusters: &[String]) -> Vec<Lens> {
    let dv = FORECAST_DATA_VIEW;
    let mut visualizations = vec![
        Lens::metric(
            "lens-forecast-total-metric",
            "Total predicted",
            dv,
            Measure::sum("predicted_credits"),
        )
        .query("cluster_name: \"Total\""),
        Lens::metric(
            "lens-forecast-avg-metric",
            "Average predicted per day",
            dv,
            Measure::average("predicted_credits"),
        )
        .query("cluster_name: \"Total\""),
        Lens::metric(
            "lens-forecast-min-metric",
            "Lowest predicted",
            dv,
            Measure::Min("predicted_credits_lower".to_string()),
        )
        .query("cluster_name: \"Total\""),
        Lens::metric(
            "lens-forecast-max-metric",
            "Highest predicted",
            dv,
            Measure::Max("predicted_credits_upper".to_string()),
        )
        .query("cluster_name: \"Total\""),
        forecast_band("lens-forecast-total", "Prediction - all clusters", "Total"),
        Lens::new("lens-forecast-table", "Predictions by day", dv, Chart::Table)
            .bucket("Day", Bucket::by_day())
            .measure("Predicted", Measure::average("predicted_credits"))
            .measure("Lower", Measure::average("predicted_credits_lower"))
            .measure("Upper", Measure::average("predicted_credits_upper"))
            .split_by("Cluster", Bucket::terms("cluster_name", 10)),
    ];

    for cluster in clusters {
        visualizations.push(forecast_band(
            &format!("lens-forecast-{}", cluster_slug(cluster)),
            &format!("Prediction - {}", cluster),
            cluster,
        ));
    }
    visualizations
}

fn forecast_band(id: &str, title: &str, cluster: &str) -> Lens {
    Lens::new(id, title, FORECAST_DATA_VIEW, Chart::Xy(SeriesType::Area))
        .bucket("Day", Bucket::by_day())
        .measure("Prediction", Measure::average("predicted_credits"))
        .measure("Lower", Measure::average("predicted_credits_lower"))
        .measure("Upper", Measure::average("predicted_credits_upper"))
        .query(&format!("cluster_name: \"{}\"", cluster.replace('"', "\\\"")))
}

pub fn forecast_dashboard(clusters: &[String]) -> Dashboard {
    let mut dashboard = Dashboard::new(
        FORECAST_DASHBOARD,
        "CDP - Consumption forecast",
        "Predicted daily credits with confidence bands",
    )
    .with_layout(&[
        ("lens-forecast-total-metric", P::new(0, 0, 12, 8)),
        ("lens-forecast-avg-metric", P::new(12, 0, 12, 8)),
        ("lens-forecast-min-metric", P::new(24, 0, 12, 8)),
        ("lens-forecast-max-metric", P::new(36, 0, 12, 8)),
    ])
    .titled_panel("lens-consumption-trend", P::new(0, 8, 48, 15), "Historical consumption")
    .panel("lens-forecast-total", P::new(0, 23, 48, 15));

    let mut y = 38;
    for (i, cluster) in clusters.iter().enumerate() {
        let x = if i % 2 == 0 { 0 } else { 24 };
        dashboard = dashboard.panel(
            &format!("lens-forecast-{}", cluster_slug(cluster)),
            P::new(x, y, 24, 12),
        );
        if i % 2 == 1 {
            y += 12;
        }
    }
    if clusters.len() % 2 == 1 {
        y += 12;
    }

    dashboard
        .panel("lens-forecast-table", P::new(0, y, 48, 15))
        .time_range("now-30d", "now+7d")
}

/// One billable-hours trend per listed cluster
pub fn cluster_hours_visualizations(clusters: &[String]) -> Vec<Lens> {
    clusters
        .iter()
        .map(|cluster| {
            Lens::new(
                &format!("lens-hours-{}", cluster_slug(cluster)),
                &format!("Hours - {}", cluster),
                RECORDS_DATA_VIEW,
                Chart::Xy(SeriesType::Area),
            )
            .describe(&format!("Billable hours of {}", cluster))
            .bucket("@timestamp", Bucket::auto_dates())
            .measure("Hours", Measure::sum("quantity"))
            .filter_phrase("cluster_name", cluster)
        })
        .collect()
}

pub fn hours_trends_dashboard(clusters: &[String]) -> Dashboard {
    let mut dashboard = Dashboard::new(
        HOURS_TRENDS_DASHBOARD,
        "CDP - Hours by cluster",
        "Billable hours over time, overall and per cluster",
    )
    .panel("lens-hours-trend", P::new(0, 0, 48, 15));

    for (i, cluster) in clusters.iter().enumerate() {
        let y = 15 + (i as u32 / 2) * 12;
        let x = if i % 2 == 0 { 0 } else { 24 };
        dashboard = dashboard.panel(
            &format!("lens-hours-{}", cluster_slug(cluster)),
            P::new(x, y, 24, 12),
        );
    }
    dashboard
}
