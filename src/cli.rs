//! Command-line interface definitions.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "browsermux",
    about = "Multi-tenant headless browser service",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service (also the default when no command is given).
    Run {
        /// HTTP listen port, overrides SERVER_PORT.
        #[arg(long)]
        port: Option<u16>,

        /// Browser pool capacity, overrides MAX_BROWSERS.
        #[arg(long)]
        max_browsers: Option<usize>,
    },
}
