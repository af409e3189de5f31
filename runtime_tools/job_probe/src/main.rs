//! Submit a job to a running jobhub backend and watch its status change.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(name = "jobhub-probe", about = "Submit a job and poll its status")]
struct Args {
    /// Base URL of the backend.
    #[arg(long, default_value = "http://localhost:3000")]
    base_url: String,

    /// Job type to submit.
    #[arg(long = "type", default_value = "email1")]
    job_type: String,

    /// JSON payload attached to the job.
    #[arg(long, default_value = r#"{"to":"test1@example.com"}"#)]
    payload: String,

    /// Seconds to wait before each status check, comma separated.
    #[arg(long, value_delimiter = ',', default_value = "0.3,6,36")]
    delays: Vec<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let payload: Value =
        serde_json::from_str(&args.payload).context("--payload must be valid JSON")?;
    let delays = parse_delays(&args.delays)?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("failed to create HTTP client")?;
    let base = args.base_url.trim_end_matches('/');

    let created = submit(&client, base, &args.job_type, payload).await?;
    let id = created["id"]
        .as_str()
        .context("response is missing the job id")?
        .to_owned();
    println!("submitted {id} status={}", created["status"]);

    for delay in delays {
        tokio::time::sleep(delay).await;
        let job = fetch(&client, base, &id).await?;
        let status = job["status"].as_str().unwrap_or("unknown");
        println!(
            "after {:.1}s: status={status} updatedAt={}",
            delay.as_secs_f64(),
            job["updatedAt"]
        );
        if is_terminal(status) {
            break;
        }
    }

    Ok(())
}

fn parse_delays(raw: &[f64]) -> Result<Vec<Duration>> {
    raw.iter()
        .map(|&secs| {
            Duration::try_from_secs_f64(secs).with_context(|| {
                format!("invalid delay {secs}; delays must be non-negative seconds")
            })
        })
        .collect()
}

fn is_terminal(status: &str) -> bool {
    matches!(status, "completed" | "failed")
}

async fn submit(
    client: &reqwest::Client,
    base: &str,
    job_type: &str,
    payload: Value,
) -> Result<Value> {
    let response = client
        .post(format!("{base}/api/jobs"))
        .json(&serde_json::json!({ "type": job_type, "payload": payload }))
        .send()
        .await
        .context("failed to send submit request")?;
    read_json(response).await
}

async fn fetch(client: &reqwest::Client, base: &str, id: &str) -> Result<Value> {
    let response = client
        .get(format!("{base}/api/jobs/{id}"))
        .send()
        .await
        .context("failed to send status request")?;
    read_json(response).await
}

async fn read_json(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    if status.is_success() {
        response.json().await.context("failed to parse response")
    } else {
        let body = response.text().await.unwrap_or_default();
        bail!("API error ({status}): {body}")
    }
}
