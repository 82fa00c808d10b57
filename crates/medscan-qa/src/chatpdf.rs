//! ChatPDF client.
//!
//! Each PDF is uploaded once and identified by a `sourceId`. Questions go to
//! the first source with a preamble telling the service how many were loaded.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::prompts::make_multi_document_question;
use crate::{QaError, QaResult};

pub const DEFAULT_CHATPDF_URL: &str = "https://api.chatpdf.com/v1";

pub struct ChatPdfClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddFileResponse {
    source_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageRequest<'a> {
    source_id: &'a str,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct MessageResponse {
    content: Option<String>,
}

impl ChatPdfClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> QaResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(QaError::Config("ChatPDF API key is empty".into()));
        }
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Upload one PDF, returning its source id.
    pub async fn add_file(&self, path: &Path) -> QaResult<String> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "documento.pdf".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str("application/pdf")?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/sources/add-file", self.base_url))
            .header("x-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QaError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: AddFileResponse = response
            .json()
            .await
            .map_err(|e| QaError::InvalidResponse(e.to_string()))?;
        let source_id = body
            .source_id
            .ok_or_else(|| QaError::InvalidResponse("missing sourceId".into()))?;

        info!(file = %file_name, source_id = %source_id, "PDF uploaded to ChatPDF");
        Ok(source_id)
    }

    /// Upload every file, skipping the ones that fail.
    pub async fn upload_all(&self, paths: &[PathBuf]) -> Vec<String> {
        let mut source_ids = Vec::with_capacity(paths.len());
        for path in paths {
            match self.add_file(path).await {
                Ok(id) => source_ids.push(id),
                Err(e) => warn!(path = %path.display(), error = %e, "ChatPDF upload failed"),
            }
        }
        source_ids
    }

    /// Ask a question over previously uploaded sources.
    pub async fn ask(&self, source_ids: &[String], question: &str) -> QaResult<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QaError::EmptyQuestion);
        }
        let first = source_ids.first().ok_or(QaError::NoSources)?;

        let request = MessageRequest {
            source_id: first,
            messages: vec![Message {
                role: "user",
                content: make_multi_document_question(source_ids.len(), question),
            }],
        };

        let response = self
            .client
            .post(format!("{}/chats/message", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QaError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: MessageResponse = response
            .json()
            .await
            .map_err(|e| QaError::InvalidResponse(e.to_string()))?;
        body.content
            .ok_or_else(|| QaError::InvalidResponse("missing content".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ChatPdfClient {
        ChatPdfClient::new("http://127.0.0.1:9/v1/", "sec_test", Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_base_url_trimmed() {
        assert_eq!(client().base_url, "http://127.0.0.1:9/v1");
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = ChatPdfClient::new(DEFAULT_CHATPDF_URL, "", Duration::from_secs(2));
        assert!(matches!(result, Err(QaError::Config(_))));
    }

    #[tokio::test]
    async fn test_no_sources() {
        let result = client().ask(&[], "¿Dosis?").await;
        assert!(matches!(result, Err(QaError::NoSources)));
    }

    #[tokio::test]
    async fn test_empty_question_checked_first() {
        let result = client().ask(&[], "  ").await;
        assert!(matches!(result, Err(QaError::EmptyQuestion)));
    }

    #[tokio::test]
    async fn test_upload_all_skips_failures() {
        let ids = client()
            .upload_all(&[PathBuf::from("/nonexistent/Ficha_X.pdf")])
            .await;
        assert!(ids.is_empty());
    }

    #[test]
    fn test_message_request_shape() {
        let request = MessageRequest {
            source_id: "src_1",
            messages: vec![Message {
                role: "user",
                content: "hola".into(),
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["sourceId"], "src_1");
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
