use clap::{Parser, Subcommand};
use medscan_core::config::AppConfig;
use medscan_core::logging::init_tracing;

use self::prelude::*;

mod cmd;
mod prelude;
mod server;

/// Identify medications from packaging photos.
#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    after_help = r#"
Configuration:
  Read from config/default.toml, config/$ENVIRONMENT.toml and
  config/local.toml, then from MEDSCAN__<SECTION>__<KEY> environment
  variables (for example MEDSCAN__CACHE__PATH or MEDSCAN__CHATPDF__API_KEY).

  These variables may be set in a standard `.env` file.
"#
)]
struct Opts {
    #[clap(subcommand)]
    subcmd: Cmd,
}

/// The subcommands we support.
#[derive(Debug, Subcommand)]
enum Cmd {
    /// Run the HTTP service.
    Serve(cmd::serve::ServeOpts),
    /// Identify the medication in a photo.
    Identify(cmd::identify::IdentifyOpts),
    /// Resolve a national code (cache first, then the registry).
    Lookup(cmd::registry::LookupOpts),
    /// Search cached medications by partial name.
    Search(cmd::registry::SearchOpts),
    /// Drop a national code from the cache.
    Invalidate(cmd::registry::InvalidateOpts),
    /// Ask questions about a data sheet or leaflet PDF.
    Chat(cmd::chat::ChatOpts),
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Opts::parse();
    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging)?;
    debug!("Parsed options: {:?}", opts);

    match &opts.subcmd {
        Cmd::Serve(serve_opts) => cmd::serve::cmd_serve(config, serve_opts).await,
        Cmd::Identify(identify_opts) => cmd::identify::cmd_identify(&config, identify_opts).await,
        Cmd::Lookup(lookup_opts) => cmd::registry::cmd_lookup(&config, lookup_opts).await,
        Cmd::Search(search_opts) => cmd::registry::cmd_search(&config, search_opts),
        Cmd::Invalidate(invalidate_opts) => {
            cmd::registry::cmd_invalidate(&config, invalidate_opts)
        }
        Cmd::Chat(chat_opts) => cmd::chat::cmd_chat(&config, chat_opts).await,
    }
}
