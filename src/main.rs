use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use feedwatch::config::{Config, Overrides, DEFAULT_CONFIG_FILE};
use feedwatch::diff::MissingDatePolicy;
use feedwatch::feed::{build_client, Fetcher};
use feedwatch::pipeline::{self, Outcome, RunOptions};
use feedwatch::report::{render, OutputFormat, NO_CHANGES};
use feedwatch::storage::FileSnapshotStore;

#[derive(Parser, Debug)]
#[command(
    name = "feedwatch",
    version,
    about = "Report new and updated entries of an RSS feed since the last run"
)]
struct Args {
    /// Config file (TOML)
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// RSS feed url
    #[arg(long)]
    url: Option<String>,

    /// Path to local feed snapshot to diff against
    #[arg(long, value_name = "FILE")]
    path: Option<PathBuf>,

    /// Extra PEM certificate authority to trust
    #[arg(long, value_name = "FILE")]
    ca_cert: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Only report entries whose link ends with this suffix (e.g. ".csv")
    #[arg(long, value_name = "SUFFIX")]
    link_suffix: Option<String>,

    /// How to treat a matching entry without a publish date
    #[arg(long, value_enum)]
    missing_dates: Option<MissingDatePolicy>,
}

impl From<Args> for Overrides {
    fn from(args: Args) -> Self {
        Overrides {
            url: args.url,
            path: args.path,
            ca_cert: args.ca_cert,
            format: args.format,
            output: args.output,
            link_suffix: args.link_suffix,
            missing_dates: args.missing_dates,
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        tracing::error!(error = %format!("{:#}", e), "feedwatch failed");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config '{}'", args.config.display()))?;
    config.apply(args.into());
    config.validate()?;

    let client = build_client(&config.trust()).context("Failed to set up HTTP transport")?;
    let fetcher = Fetcher::new(client, config.url.clone()).with_max_bytes(config.max_feed_bytes);
    let store = FileSnapshotStore::new(config.path.clone());
    let options = RunOptions {
        missing_dates: config.missing_dates,
        report: config.report.clone(),
    };

    let summary = pipeline::run(&store, &fetcher, &options)
        .await
        .map_err(|e| {
            let stage = e.stage();
            anyhow::Error::new(e).context(format!("{} stage failed", stage))
        })?;

    let text = match &summary.outcome {
        Outcome::NoChanges => {
            tracing::info!("No changes found");
            NO_CHANGES.to_string()
        }
        Outcome::Report(report) => render(report, config.format)?,
    };

    match &config.output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", text))
                .with_context(|| format!("Failed to write report to '{}'", path.display()))?;
            tracing::info!(path = %path.display(), "Report written");
        }
        None => println!("{}", text),
    }

    Ok(())
}
