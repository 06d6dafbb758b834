//! browsermux - a multi-tenant headless browser service.
//!
//! Main entry point: logging, configuration, server startup.

mod cli;
mod server;

use clap::Parser;
use tracing::error;

use browsermux_config::Config;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    server::init_tracing()?;

    let cli = Cli::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("failed to load configuration: {err}");
            return Err(err.into());
        }
    };

    match cli.command {
        None => server::run_server(config).await,
        Some(Commands::Run { port, max_browsers }) => {
            // CLI flags override environment values.
            if let Some(port) = port {
                config.server_port = port;
            }
            if let Some(max_browsers) = max_browsers {
                config.max_browsers = max_browsers;
            }
            server::run_server(config).await
        }
    }
}
