use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use lb_proxy::config::{read_config, validate_config, ProxyConfig};
use lb_proxy::lifecycle::{signals, startup, Shutdown};
use lb_proxy::observability::logging;

/// Round-robin HTTP load balancer with passive health checking.
#[derive(Parser, Debug)]
#[command(name = "lb-proxy", version)]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Target `host:port`; repeat to list several. Replaces the configured targets.
    #[arg(short, long = "target")]
    targets: Vec<String>,
}

impl Args {
    fn apply(self, mut config: ProxyConfig) -> ProxyConfig {
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if !self.targets.is_empty() {
            config.pool.targets = self.targets;
        }
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let mut args = Args::parse();

    let config = match args.config.take() {
        Some(path) => match read_config(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {}: {e}", path.display());
                return ExitCode::from(2);
            }
        },
        None => ProxyConfig::default(),
    };
    let config = args.apply(config);

    if let Err(errors) = validate_config(&config) {
        eprintln!("error: invalid configuration");
        for error in &errors {
            eprintln!("  - {error}");
        }
        return ExitCode::from(2);
    }

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        targets = ?config.pool.targets,
        failure_threshold = config.pool.failure_threshold,
        quarantine_period_ms = config.pool.quarantine_period_ms,
        max_retries = config.pool.max_retries,
        "lb-proxy starting"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    match startup::run(config, shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Proxy failed");
            ExitCode::FAILURE
        }
    }
}
