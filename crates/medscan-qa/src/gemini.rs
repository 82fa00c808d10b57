//! Generative chat backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{QaError, QaResult};

pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// A model that completes a single prompt.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> QaResult<String>;

    /// Model identifier for logs.
    fn model_name(&self) -> &str;
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        timeout: Duration,
    ) -> QaResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(QaError::Config("Gemini API key is empty".into()));
        }
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn complete(&self, prompt: &str) -> QaResult<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "calling Gemini");
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
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

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| QaError::InvalidResponse(e.to_string()))?;
        candidate_text(body)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn candidate_text(response: GenerateResponse) -> QaResult<String> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
        .ok_or_else(|| QaError::InvalidResponse("no candidates in response".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: "hola" }],
            }],
            generation_config: GenerationConfig { temperature: 0.0 },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hola");
        assert_eq!(json["generationConfig"]["temperature"], 0.0);
    }

    #[test]
    fn test_candidate_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"No "},{"text":"lo sé"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(candidate_text(response).unwrap(), "No lo sé");
    }

    #[test]
    fn test_no_candidates_is_invalid() {
        let response: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(matches!(candidate_text(response), Err(QaError::InvalidResponse(_))));
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = GeminiClient::new(
            DEFAULT_GEMINI_URL,
            " ",
            DEFAULT_GEMINI_MODEL,
            0.0,
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(QaError::Config(_))));
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new(
            "https://example.org/v1beta/",
            "key",
            "gemini-1.5-flash",
            0.0,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "https://example.org/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}
