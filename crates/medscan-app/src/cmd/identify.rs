//! The `identify` subcommand.

use clap::Args;
use medscan_core::config::AppConfig;
use medscan_core::models::ScanImage;

use super::print_json;
use crate::prelude::*;

#[derive(Debug, Args)]
pub struct IdentifyOpts {
    /// Photo of the medication box.
    pub image: PathBuf,
}

#[instrument(level = "debug", skip_all, fields(image = %opts.image.display()))]
pub async fn cmd_identify(config: &AppConfig, opts: &IdentifyOpts) -> Result<()> {
    let bytes = tokio::fs::read(&opts.image)
        .await
        .with_context(|| format!("failed to read {}", opts.image.display()))?;
    if bytes.is_empty() {
        anyhow::bail!("{} is empty", opts.image.display());
    }

    let file_name = opts
        .image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let image = ScanImage::new(file_name, bytes);

    let identifier = config.identifier().context("failed to build pipeline")?;
    let mut cache = config.open_cache().context("failed to open medication cache")?;

    let identification = identifier.identify(&image, &mut cache).await;
    print_json(&identification)
}
