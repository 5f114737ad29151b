//! Holdfast CLI - repository access coordination and sync daemon control.
//!
//! Binary name: `holdfast`

use std::process;

use clap::Parser;
use holdfast_core::{signal_channels, Config, ShutdownCoordinator};

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Error: {e}");
            }
            #[allow(clippy::exit)]
            process::exit(1);
        }
    };

    let shutdown = ShutdownCoordinator::new(config.shutdown_timeout());

    let (mut sigint, mut sigterm) = match signal_channels().await {
        Ok(channels) => channels,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Error: failed to setup signal handlers: {e}");
            }
            #[allow(clippy::exit)]
            process::exit(1);
        }
    };

    let result = tokio::select! {
        result = cli::handlers::run(args.command, &config) => result,
        _ = sigint.recv() => {
            tracing::info!("received SIGINT, initiating shutdown");
            let _ = shutdown.shutdown().await;
            Err(anyhow::anyhow!("interrupted"))
        }
        _ = sigterm.recv() => {
            tracing::info!("received SIGTERM, initiating shutdown");
            let _ = shutdown.shutdown().await;
            Err(anyhow::anyhow!("terminated"))
        }
    };

    if let Err(e) = result {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("Error: {e:#}");
        }
        #[allow(clippy::exit)]
        process::exit(1);
    }
}
