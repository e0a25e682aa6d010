use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use lb_proxy::admin::SystemStatus;
use lb_proxy::TargetSnapshot;

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Management CLI for the load-balancing proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "LB_PROXY_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check proxy status
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Show per-target state and request distribution
    Targets {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );
    let client = reqwest::Client::builder().default_headers(headers).build()?;

    match cli.command {
        Commands::Status { json } => {
            let res = client.get(format!("{}/admin/status", cli.url)).send().await?;
            let res = check(res).await?;
            let status: SystemStatus = res.json().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("version:  {}", status.version);
                println!("status:   {}", status.status);
                println!("uptime:   {}s", status.uptime_secs);
                println!("eligible: {}/{}", status.eligible_targets, status.total_targets);
            }
        }
        Commands::Targets { json } => {
            let res = client.get(format!("{}/admin/targets", cli.url)).send().await?;
            let res = check(res).await?;
            let targets: Vec<TargetSnapshot> = res.json().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&targets)?);
            } else {
                print_table(&targets);
            }
        }
    }

    Ok(())
}

async fn check(res: reqwest::Response) -> Result<reqwest::Response, Box<dyn std::error::Error>> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    if let Ok(text) = res.text().await {
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
    }
    Err(format!("admin API returned status {status}").into())
}

fn print_table(targets: &[TargetSnapshot]) {
    println!(
        "{:<24} {:<12} {:>10} {:>10} {:>9} {:>10} {:>12}",
        "TARGET", "STATE", "SELECTED", "SUCCESS", "TIMEOUT", "CONN_FAIL", "RELEASE_IN"
    );
    for t in targets {
        let release = t
            .quarantine_remaining_ms
            .map(|ms| format!("{:.1}s", ms as f64 / 1000.0))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<24} {:<12} {:>10} {:>10} {:>9} {:>10} {:>12}",
            t.id,
            t.state.as_str(),
            t.selections,
            t.successes,
            t.timeouts,
            t.connection_failures,
            release
        );
    }
}
