//! The `serve` subcommand.

use clap::Args;
use medscan_core::config::AppConfig;

use crate::prelude::*;
use crate::server;

#[derive(Debug, Args)]
pub struct ServeOpts {
    /// Address to bind (overrides `server.host`).
    #[clap(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides `server.port`).
    #[clap(short, long)]
    pub port: Option<u16>,
}

#[instrument(level = "debug", skip_all)]
pub async fn cmd_serve(mut config: AppConfig, opts: &ServeOpts) -> Result<()> {
    if let Some(host) = &opts.host {
        config.server.host = host.clone();
    }
    if let Some(port) = opts.port {
        config.server.port = port;
    }
    server::run(config).await
}
