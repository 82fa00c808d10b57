//! Cache and registry subcommands: `lookup`, `search`, `invalidate`.

use clap::Args;
use medscan_core::config::AppConfig;
use medscan_core::models::is_valid_national_code;
use medscan_core::registry::search_by_partial_name;

use super::print_json;
use crate::prelude::*;

#[derive(Debug, Args)]
pub struct LookupOpts {
    /// National code, 6 to 8 digits.
    pub code: String,
}

#[derive(Debug, Args)]
pub struct SearchOpts {
    /// Part of the medication name.
    pub text: String,
}

#[derive(Debug, Args)]
pub struct InvalidateOpts {
    /// National code to drop from the cache.
    pub code: String,
}

#[instrument(level = "debug", skip_all, fields(code = %opts.code))]
pub async fn cmd_lookup(config: &AppConfig, opts: &LookupOpts) -> Result<()> {
    if !is_valid_national_code(&opts.code) {
        anyhow::bail!("{:?} no es un código nacional (de 6 a 8 dígitos)", opts.code);
    }

    let resolver = config.registry_resolver().context("failed to build resolver")?;
    let mut cache = config.open_cache().context("failed to open medication cache")?;

    let resolution = resolver.resolve_by_code(&opts.code, &mut cache).await;
    print_json(&resolution)
}

pub fn cmd_search(config: &AppConfig, opts: &SearchOpts) -> Result<()> {
    let cache = config.open_cache().context("failed to open medication cache")?;
    let matches = search_by_partial_name(&opts.text, &cache);
    print_json(&matches)
}

pub fn cmd_invalidate(config: &AppConfig, opts: &InvalidateOpts) -> Result<()> {
    let mut cache = config.open_cache().context("failed to open medication cache")?;
    let removed = cache
        .invalidate(&opts.code)
        .context("failed to persist medication cache")?;

    if removed {
        info!(code = %opts.code, "cache entry removed");
        println!("{} eliminado de la caché", opts.code);
    } else {
        println!("{} no estaba en la caché", opts.code);
    }
    Ok(())
}
