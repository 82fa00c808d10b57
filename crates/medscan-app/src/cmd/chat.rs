//! The `chat` subcommand: interactive questions over one PDF.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use medscan_core::config::AppConfig;
use medscan_qa::prompts::is_exit_command;
use medscan_qa::{DocumentAssistant, GeminiClient, TextChunker};
use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader};

use crate::prelude::*;

#[derive(Debug, Args)]
pub struct ChatOpts {
    /// Data sheet or leaflet PDF.
    pub pdf: PathBuf,

    /// Chunks placed in each prompt.
    #[clap(short = 'k', long, default_value = "5")]
    pub top_k: usize,
}

#[instrument(level = "debug", skip_all, fields(pdf = %opts.pdf.display()))]
pub async fn cmd_chat(config: &AppConfig, opts: &ChatOpts) -> Result<()> {
    let api_key = config
        .gemini
        .api_key
        .clone()
        .context("no hay clave de API de Gemini configurada (define MEDSCAN__GEMINI__API_KEY)")?;
    let model = GeminiClient::new(
        config.gemini.api_url.clone(),
        api_key,
        config.gemini.model.clone(),
        config.gemini.temperature,
        Duration::from_secs(config.gemini.timeout_seconds),
    )?;

    let assistant = DocumentAssistant::from_pdf(&opts.pdf, &TextChunker::default(), Arc::new(model))
        .await
        .with_context(|| format!("failed to index {}", opts.pdf.display()))?
        .with_top_k(opts.top_k);

    println!(
        "{} fragmentos cargados. Modelo: {}. Escribe 'salir' para terminar.",
        assistant.chunk_count(),
        assistant.model_name()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"\nPregunta: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if is_exit_command(&line) {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        match assistant.ask(&line).await {
            Ok(answer) => println!("{}", answer.text),
            Err(e) => {
                warn!(error = %e, "question failed");
                println!("Error: {e}");
            }
        }
    }

    println!("¡Adiós!");
    Ok(())
}
