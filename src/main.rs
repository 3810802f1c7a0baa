//! tiergate: gateway entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Build gateway (registry, backend warm-up, dispatchers)
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Spawn readiness probe (if configured)
//!   8. Serve HTTP until shutdown

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use tiergate::error::AppError;
use tiergate::gateway::{self, Gateway};
use tiergate::{config, http, logger};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();
    let config = config::load(args.config_path.as_deref())?;

    let effective_log_level = args.log_level.unwrap_or(config.gateway.log_level.as_str());
    logger::init(effective_log_level)?;

    info!(
        name = %config.gateway.name,
        bind = %config.gateway.bind,
        classifier = %config.classification.backend,
        keywords = config.conversation.keywords.len(),
        "config loaded"
    );

    let gateway = Arc::new(Gateway::start(&config).await?);
    let health = gateway.health().await;
    info!(status = ?health.overall, services = ?health.service_names(), "gateway ready");

    let shutdown = CancellationToken::new();

    // Ctrl-C cancels the token so all tasks shut down.
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received; initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    let probe = (config.gateway.probe_interval_seconds > 0).then(|| {
        gateway::spawn_probe(
            gateway.clone(),
            Duration::from_secs(config.gateway.probe_interval_seconds),
            shutdown.clone(),
        )
    });

    let served = http::run(&config.gateway.bind, gateway, shutdown.clone()).await;

    shutdown.cancel();
    if let Some(handle) = probe {
        let _ = handle.await;
    }

    served
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: tiergate [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    //   -v → warn, -vv → info, -vvv → debug, -vvvv+ → trace
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs { log_level, config_path }
}
