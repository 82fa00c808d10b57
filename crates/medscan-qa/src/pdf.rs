//! PDF text loading.

use std::path::Path;

use tracing::{debug, info};

use crate::{QaError, QaResult};

/// Extract the text layer of an in-memory PDF.
pub fn extract_text(bytes: &[u8]) -> QaResult<String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| QaError::Pdf(e.to_string()))
}

/// Read and extract a PDF file. Scanned PDFs without a text layer are an error.
pub async fn load_text(path: &Path) -> QaResult<String> {
    debug!(path = %path.display(), "loading PDF");
    let bytes = tokio::fs::read(path).await?;

    // pdf-extract is CPU bound
    let text = tokio::task::spawn_blocking(move || extract_text(&bytes))
        .await
        .map_err(|e| QaError::Pdf(e.to_string()))??;

    if text.trim().is_empty() {
        return Err(QaError::EmptyDocument(path.display().to_string()));
    }
    info!(path = %path.display(), chars = text.chars().count(), "PDF text loaded");
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_garbage_is_a_pdf_error() {
        assert!(matches!(extract_text(b"not a pdf"), Err(QaError::Pdf(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = load_text(&dir.path().join("Ficha_X.pdf")).await;
        assert!(matches!(result, Err(QaError::Io(_))));
    }
}
