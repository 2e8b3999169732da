mod adapter;
mod cli;
mod client;
mod context;
mod dom;
mod engine;
mod host;
mod ipc;
mod lifecycle;
mod page;
mod runtime;
mod toggle;

use clap::Parser;
use cli::{Cli, Command};
use context::EngineConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Host {
            hostname,
            asset_base,
        } => {
            if let Err(e) = host::run(hostname, EngineConfig::new(&asset_base)).await {
                tracing::error!(error = %e, "host failed");
                eprintln!("piptool host: {e}");
                std::process::exit(1);
            }
        }
        Command::Client { action } => {
            if let Err(e) = client::run(action).await {
                tracing::error!(error = %e, "client failed");
                eprintln!("piptool client: {e}");
                std::process::exit(1);
            }
        }
        Command::Adapters { id } => {
            if let Err(e) = client::adapters(id.as_deref()) {
                eprintln!("piptool adapters: {e}");
                std::process::exit(1);
            }
        }
        Command::Resolve { hostname } => {
            if let Err(e) = client::resolve(&hostname) {
                eprintln!("piptool resolve: {e}");
                std::process::exit(1);
            }
        }
    }
}
