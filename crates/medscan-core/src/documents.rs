//! Document retriever: downloads registry documents to deterministic paths.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use reqwest::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{DocumentKind, DocumentRef};

/// Default download timeout.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest medication name kept in a file name.
const MAX_NAME_CHARS: usize = 40;

/// Used when a name sanitizes to nothing.
const FALLBACK_NAME: &str = "medicamento";

/// Download failures. Callers keep the document as known-but-not-fetched.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0}")]
    Status(u16),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Keep alphanumeric characters only, at most 40 of them.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_alphanumeric())
        .take(MAX_NAME_CHARS)
        .collect();
    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned
    }
}

/// `Prospecto_IBUPROFENO_654321_20240131.pdf`
pub fn document_file_name(kind: DocumentKind, name: &str, code: &str, date: NaiveDate) -> String {
    format!(
        "{}_{}_{}_{}.pdf",
        kind.file_prefix(),
        sanitize_name(name),
        code,
        date.format("%Y%m%d")
    )
}

/// Downloads documents into a single directory.
pub struct DocumentRetriever {
    client: Client,
    dir: PathBuf,
}

impl DocumentRetriever {
    pub fn new<P: AsRef<Path>>(dir: P, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            dir: dir.as_ref().to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a document for this medication would be stored at today.
    pub fn target_path(&self, kind: DocumentKind, name: &str, code: &str) -> PathBuf {
        self.dir
            .join(document_file_name(kind, name, code, Utc::now().date_naive()))
    }

    /// Download `url`. Same drug, kind and day always land on the same file.
    pub async fn fetch(
        &self,
        url: &str,
        kind: DocumentKind,
        name: &str,
        code: &str,
    ) -> Result<DocumentRef, FetchError> {
        debug!(url, ?kind, "downloading document");
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        let bytes = response.bytes().await?;

        let path = self.target_path(kind, name, code);
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, &bytes).await?;
        info!(path = %path.display(), size = bytes.len(), "document saved");

        Ok(DocumentRef {
            source_url: url.to_string(),
            local_path: Some(path.display().to_string()),
            size_bytes: Some(bytes.len() as u64),
            downloaded_at: Some(Utc::now()),
            sha256: Some(hex::encode(Sha256::digest(&bytes))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("IBUPROFENO"), "IBUPROFENO");
        assert_eq!(sanitize_name("IBUPROFENO (ARGININA)"), "IBUPROFENOARGININA");
        assert_eq!(sanitize_name("../../etc"), "etc");
        assert_eq!(sanitize_name("()"), "medicamento");
        assert_eq!(sanitize_name(&"A".repeat(60)).len(), 40);
    }

    #[test]
    fn test_document_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(
            document_file_name(DocumentKind::Leaflet, "IBUPROFENO", "654321", date),
            "Prospecto_IBUPROFENO_654321_20240131.pdf"
        );
        assert_eq!(
            document_file_name(DocumentKind::DataSheet, "IBUPROFENO", "654321", date),
            "Ficha_IBUPROFENO_654321_20240131.pdf"
        );
    }

    #[tokio::test]
    async fn test_unreachable_url_fails() {
        let dir = tempdir().unwrap();
        let retriever = DocumentRetriever::new(dir.path(), Duration::from_secs(2)).unwrap();

        let result = retriever
            .fetch("http://127.0.0.1:9/p.pdf", DocumentKind::Leaflet, "IBUPROFENO", "654321")
            .await;

        assert!(matches!(result, Err(FetchError::Transport(_))));
        assert!(!retriever.target_path(DocumentKind::Leaflet, "IBUPROFENO", "654321").exists());
    }
}
