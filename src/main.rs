//! Headless daemon entry point (spec §6 "Exit codes"). No UI: logging goes
//! to stdout via `tracing-subscriber`, same as the teacher's `bin/server.rs`.

use clap::Parser;
use sentinel::config::Config;
use sentinel::container::Container;
use tracing::{error, info, Level};
use tracing_subscriber::prelude::*;

/// Overrides the handful of settings an operator is most likely to want to
/// flip at the command line without editing the environment.
#[derive(Parser, Debug)]
#[command(version, about = "Sentinel portfolio daemon")]
struct Cli {
    /// Overrides SENTINEL_HTTP_PORT.
    #[arg(long)]
    port: Option<u16>,
    /// Overrides SENTINEL_DATA_DIR.
    #[arg(long)]
    data_dir: Option<String>,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Sentinel {} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(err) => {
            error!(error = %err, "configuration error");
            return std::process::ExitCode::from(2);
        }
    };
    if let Some(port) = cli.port {
        config.http.port = port;
    }
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir.into();
    }

    let container = match Container::build(config.clone()).await {
        Ok(c) => c,
        Err(err) => {
            error!(error = %err, "unrecoverable startup failure (storage corruption or init error)");
            return std::process::ExitCode::from(1);
        }
    };

    let _background = match container.start().await {
        Ok(handles) => handles,
        Err(err) => {
            error!(error = %err, "failed to start background tasks");
            return std::process::ExitCode::from(1);
        }
    };

    let bind_addr = format!("{}:{}", config.http.bind_address, config.http.port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(err) => {
            error!(addr = %bind_addr, error = %err, "failed to bind HTTP listener (port in use?)");
            return std::process::ExitCode::from(3);
        }
    };

    info!(addr = %bind_addr, "HTTP server listening");
    let app = sentinel::api::router(container);

    tokio::select! {
        result = axum::serve(listener, app).into_future() => {
            if let Err(err) = result {
                error!(error = %err, "HTTP server exited with error");
                return std::process::ExitCode::FAILURE;
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received, exiting");
        }
    }

    std::process::ExitCode::SUCCESS
}
