use crate::cdp::MAX_HISTORY_DAYS;
use crate::usage::ForecastMethod;
use crate::usage::forecast::MAX_HORIZON_DAYS;
use clap::builder::{RangedI64ValueParser, RangedU64ValueParser};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cdp-ctl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Collect CDP consumption, forecast spend and publish dashboards")]
#[command(long_about = "Pulls consumption and inventory data from the Cloudera CDP CLI, loads it into Elasticsearch, builds Kibana dashboards, renders standalone HTML reports and publishes summaries to Jira and Confluence.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render the CDP consumption dashboard as a standalone HTML file
    Report {
        /// Output HTML file (defaults to report.cdp_output)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Days of usage to collect
        #[arg(long, value_name = "DAYS", value_parser = history_days_parser())]
        days: Option<i64>,

        /// Read usage records from a saved CLI dump instead of calling `cdp`
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Forecast model for the outlook table
        #[arg(long, value_enum)]
        method: Option<ForecastMethod>,

        /// Skip the forecast section
        #[arg(long)]
        no_forecast: bool,

        /// Logo embedded in the header (defaults to report.logo_path)
        #[arg(long, value_name = "FILE")]
        logo: Option<PathBuf>,
    },

    /// Load usage records and daily summaries into Elasticsearch
    Ingest {
        /// Days of usage to collect
        #[arg(long, value_name = "DAYS", value_parser = history_days_parser())]
        days: Option<i64>,

        /// Read usage records from a saved CLI dump instead of calling `cdp`
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Keep previously ingested indices instead of replacing them
        #[arg(long)]
        keep_old: bool,

        /// Collect and transform, but do not write anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Forecast daily credit consumption
    Forecast {
        /// Days to predict (defaults to forecast.days)
        #[arg(long, value_name = "DAYS", value_parser = horizon_parser())]
        horizon: Option<usize>,

        /// Forecast model (defaults to forecast.method)
        #[arg(long, value_enum)]
        method: Option<ForecastMethod>,

        /// Also forecast these clusters (defaults to forecast.top_clusters)
        #[arg(long = "cluster", value_name = "NAME")]
        clusters: Vec<String>,

        /// Days of history to fit on
        #[arg(long, value_name = "DAYS", default_value_t = 30, value_parser = history_days_parser())]
        history_days: i64,

        /// Read history from a saved CLI dump instead of Elasticsearch
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Write the forecast to the forecast index
        #[arg(long)]
        index: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Create Kibana data views, visualizations and dashboards
    Kibana {
        #[command(subcommand)]
        command: KibanaCommand,
    },

    /// Inspect what is stored in Elasticsearch
    Stats {
        #[command(subcommand)]
        command: StatsCommand,
    },

    /// Google Cloud inventory and cost report
    Gcp {
        #[command(subcommand)]
        command: GcpCommand,
    },

    /// Jira issues
    Jira {
        #[command(subcommand)]
        command: JiraCommand,
    },

    /// Confluence pages
    Confluence {
        #[command(subcommand)]
        command: ConfluenceCommand,
    },

    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum KibanaCommand {
    /// Create data views, consumption visualizations and the six dashboards
    Setup,

    /// Create the forecast data view, visualizations and dashboard
    Forecast {
        /// Clusters with their own panel (defaults to forecast.top_clusters)
        #[arg(long = "cluster", value_name = "NAME")]
        clusters: Vec<String>,
    },

    /// Create the per-cluster billable hours dashboard
    Hours {
        /// Clusters to chart (defaults to the top clusters by credits)
        #[arg(long = "cluster", value_name = "NAME")]
        clusters: Vec<String>,

        /// Number of top clusters when none are given
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// List data views, visualizations and dashboards
    Verify {
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
pub enum StatsCommand {
    /// List consumption indices with document counts and sizes
    Indices {
        /// Index pattern
        #[arg(long, default_value = "cdp-consumption-*")]
        pattern: String,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Clusters with the most credits
    TopClusters {
        /// Number of clusters
        #[arg(long, default_value_t = 10)]
        size: usize,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Compare billable quantity reported by `cdp` against Elasticsearch
    Compare {
        /// Days to compare
        #[arg(long, value_name = "DAYS", value_parser = history_days_parser())]
        days: Option<i64>,

        /// Read the CDP side from a saved CLI dump
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum GcpCommand {
    /// Render the GCP inventory dashboard as a standalone HTML file
    Report {
        /// Output HTML file (defaults to report.gcp_output)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Project to inspect (defaults to gcp.project_id, then gcloud)
        #[arg(long)]
        project: Option<String>,

        /// Do not query Cloud Monitoring for bucket sizes
        #[arg(long)]
        skip_bucket_sizes: bool,
    },

    /// Print the inventory and estimated monthly cost
    Inventory {
        /// Project to inspect (defaults to gcp.project_id, then gcloud)
        #[arg(long)]
        project: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
pub enum JiraCommand {
    /// List visible projects
    Projects,

    /// Search issues with JQL
    Search {
        /// JQL query (defaults to issues assigned to you and unresolved)
        #[arg(long)]
        jql: Option<String>,

        /// Maximum issues returned
        #[arg(long, default_value_t = 50)]
        max: u32,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Export issues to CSV
    Export {
        /// Output CSV file
        #[arg(short, long, value_name = "FILE", default_value = "jira_issues.csv")]
        output: PathBuf,

        /// JQL query (defaults to issues assigned to you and unresolved)
        #[arg(long)]
        jql: Option<String>,

        /// Maximum issues exported
        #[arg(long, default_value_t = 500)]
        max: u32,
    },

    /// Create an issue
    Create {
        /// Project key
        #[arg(long)]
        project: String,

        /// Issue summary
        #[arg(long)]
        summary: String,

        /// Issue description
        #[arg(long, default_value = "")]
        description: String,

        /// Issue type
        #[arg(long, default_value = "Task")]
        issue_type: String,
    },

    /// Comment on an issue
    Comment {
        /// Issue key
        #[arg(value_name = "KEY")]
        key: String,

        /// Comment text
        #[arg(long)]
        body: String,
    },
}

#[derive(Subcommand)]
pub enum ConfluenceCommand {
    /// List spaces
    Spaces,

    /// Full-text search
    Search {
        /// Text to search for
        #[arg(value_name = "TEXT")]
        text: String,

        /// Restrict to one space
        #[arg(long)]
        space: Option<String>,
    },

    /// Publish the monthly CDP consumption page
    Publish {
        /// Days of usage to summarise
        #[arg(long, value_name = "DAYS", value_parser = history_days_parser())]
        days: Option<i64>,

        /// Read usage records from a saved CLI dump instead of calling `cdp`
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Space key (defaults to confluence.space_key)
        #[arg(long)]
        space: Option<String>,

        /// Print the page body instead of publishing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Move a page under a new parent
    Move {
        /// Page id
        #[arg(value_name = "PAGE_ID")]
        page: String,

        /// New parent page id
        #[arg(long, value_name = "PAGE_ID")]
        parent: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration with secrets masked
    Show,

    /// Write a configuration file with default values
    Init {
        /// File to write (defaults to ~/.cdp-insights.toml)
        #[arg(long, value_name = "FILE")]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

fn history_days_parser() -> RangedI64ValueParser<i64> {
    RangedI64ValueParser::new().range(1..=MAX_HISTORY_DAYS)
}

fn horizon_parser() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::new().range(1..=MAX_HORIZON_DAYS as u64)
}

impl Cli {
    /// Initialize logging based on verbosity level
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_forecast_arguments() {
        let cli = Cli::try_parse_from([
            "cdp-ctl", "-vv", "forecast", "--method", "seasonal", "--cluster", "etl", "--cluster",
            "ml", "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Forecast {
                method,
                clusters,
                format,
                history_days,
                ..
            } => {
                assert_eq!(method, Some(ForecastMethod::Seasonal));
                assert_eq!(clusters, vec!["etl", "ml"]);
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(history_days, 30);
            }
            _ => panic!("expected forecast"),
        }
    }

    #[test]
    fn test_day_counts_are_bounded() {
        let rejected: [&[&str]; 6] = [
            &["cdp-ctl", "report", "--days=-5"],
            &["cdp-ctl", "ingest", "--days", "0"],
            &["cdp-ctl", "stats", "compare", "--days", "100000"],
            &["cdp-ctl", "forecast", "--history-days", "0"],
            &["cdp-ctl", "forecast", "--horizon", "100000"],
            &["cdp-ctl", "confluence", "publish", "--days=-1"],
        ];
        for args in rejected {
            assert!(
                Cli::try_parse_from(args.iter().copied()).is_err(),
                "{:?} should be rejected",
                args
            );
        }

        let cli = Cli::try_parse_from(["cdp-ctl", "report", "--days", "3650"]).unwrap();
        assert!(matches!(cli.command, Commands::Report { days: Some(3650), .. }));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["cdp-ctl", "stats", "indices", "--quiet", "-c", "x.toml"])
            .unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
    }
}
