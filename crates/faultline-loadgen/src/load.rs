//! Request loop and summary.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use rand::seq::IndexedRandom;
use serde::Serialize;

use crate::OutputFormat;

/// What to send and how fast.
#[derive(Clone, Debug)]
pub struct LoadPlan {
    pub base_url: String,
    pub paths: Vec<String>,
    pub count: u32,
    pub delay: Duration,
    pub timeout: Duration,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct Summary {
    pub sent: u32,
    pub succeeded: u32,
    pub server_errors: u32,
    pub other_status: u32,
    pub transport_errors: u32,
    pub total_ms: u128,
}

impl Summary {
    fn record(&mut self, status: Option<u16>) {
        self.sent += 1;
        match status {
            Some(s) if (200..300).contains(&s) => self.succeeded += 1,
            Some(s) if s >= 500 => self.server_errors += 1,
            Some(_) => self.other_status += 1,
            None => self.transport_errors += 1,
        }
    }
}

/// Join a base URL and a path without doubling or dropping the slash.
pub fn request_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

/// Pick a random path from `paths`.
pub fn pick_path<'a, R: rand::Rng + ?Sized>(paths: &'a [String], rng: &mut R) -> Option<&'a str> {
    paths.choose(rng).map(String::as_str)
}

/// Send `plan.count` GET requests, one after another.
///
/// Failed requests are logged and counted; they do not stop the run.
pub async fn run(plan: &LoadPlan) -> Result<Summary> {
    if plan.paths.is_empty() {
        return Err(anyhow!("at least one path is required"));
    }

    let client = reqwest::Client::builder()
        .timeout(plan.timeout)
        .build()
        .context("failed to build HTTP client")?;

    tracing::info!(
        url = %plan.base_url,
        count = plan.count,
        delay_ms = plan.delay.as_millis() as u64,
        "Starting load generation"
    );

    let mut summary = Summary::default();
    let started = Instant::now();

    for i in 0..plan.count {
        let path = pick_path(&plan.paths, &mut rand::rng()).unwrap_or("/");
        let url = request_url(&plan.base_url, path);

        let sent_at = Instant::now();
        let status = match client.get(&url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                tracing::info!(
                    request = i + 1,
                    url = %url,
                    status,
                    duration_ms = sent_at.elapsed().as_millis() as u64,
                    "Request completed"
                );
                Some(status)
            }
            Err(e) => {
                tracing::warn!(
                    request = i + 1,
                    url = %url,
                    error = %e,
                    duration_ms = sent_at.elapsed().as_millis() as u64,
                    "Request failed"
                );
                None
            }
        };
        summary.record(status);

        if i + 1 < plan.count && !plan.delay.is_zero() {
            tokio::time::sleep(plan.delay).await;
        }
    }

    summary.total_ms = started.elapsed().as_millis();
    Ok(summary)
}

pub fn print_summary(summary: &Summary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("Sent {} requests in {} ms", summary.sent, summary.total_ms);
            println!("  Succeeded:        {}", summary.succeeded);
            println!("  Server errors:    {}", summary.server_errors);
            println!("  Other status:     {}", summary.other_status);
            println!("  Transport errors: {}", summary.transport_errors);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
    }
    Ok(())
}
