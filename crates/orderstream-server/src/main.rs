//! `orderstream-server` binary entrypoint.
//!
//! Loads configuration from environment variables and serves until
//! shutdown or relay failure. Relay failure exits nonzero so a
//! supervisor restarts the process and clients re-bootstrap.

#![forbid(unsafe_code)]

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use orderstream_server::{Server, ServerConfig};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = ServerConfig::from_env()?;
    let server = Server::new(config);
    server.serve().await?;
    Ok(())
}
