//! faultline-loadgen: sends a burst of requests at the Faultline demo service.
//!
//! Each request hits a random demo path so that the service produces a mix
//! of successful and failed spans.

mod load;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;

/// Load generator for the Faultline demo service.
#[derive(Parser)]
#[command(name = "faultline-loadgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the service
    #[arg(short, long, env = "FAULTLINE_URL", default_value = "http://localhost:8080")]
    url: String,

    /// Number of requests to send
    #[arg(short = 'n', long, default_value_t = 20)]
    count: u32,

    /// Delay between requests in milliseconds
    #[arg(short, long, default_value_t = 100)]
    delay_ms: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,

    /// Paths to pick from
    #[arg(long, value_delimiter = ',', default_value = "/,/user,/product")]
    paths: Vec<String>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    output: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let plan = load::LoadPlan {
        base_url: cli.url,
        paths: cli.paths,
        count: cli.count,
        delay: Duration::from_millis(cli.delay_ms),
        timeout: Duration::from_secs(cli.timeout_secs),
    };

    let summary = load::run(&plan).await?;
    load::print_summary(&summary, cli.output)?;

    Ok(())
}
