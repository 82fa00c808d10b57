//! OCR collaborator.
//!
//! The OCR step walks a fixed table of engine/scale configurations and keeps
//! the first useful text. It never fails: an empty string means nothing worked.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{RawScanText, ScanImage};

pub const DEFAULT_OCR_URL: &str = "https://api.ocr.space/parse/image";

/// Public test key accepted by OCR.space.
pub const DEFAULT_OCR_API_KEY: &str = "helloworld";

pub const DEFAULT_OCR_LANGUAGE: &str = "spa";

pub const DEFAULT_OCR_TIMEOUT: Duration = Duration::from_secs(20);

/// Fewer non-whitespace characters than this counts as a failed attempt.
const MIN_USEFUL_CHARS: usize = 5;

/// One OCR configuration to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OcrAttempt {
    pub engine: u8,
    pub scale: bool,
}

/// Attempt order: engine 2 upscaled, engine 1 upscaled, engine 2 as-is.
pub const DEFAULT_ATTEMPTS: [OcrAttempt; 3] = [
    OcrAttempt { engine: 2, scale: true },
    OcrAttempt { engine: 1, scale: true },
    OcrAttempt { engine: 2, scale: false },
];

/// OCR errors, confined to a single attempt.
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("OCR service returned HTTP {0}")]
    Status(u16),

    #[error("OCR processing failed: {0}")]
    Processing(String),
}

/// An OCR backend.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(
        &self,
        image: &ScanImage,
        language: &str,
        attempt: OcrAttempt,
    ) -> Result<String, OcrError>;
}

/// OCR.space response, trimmed to what we read.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrSpaceResponse {
    #[serde(default)]
    parsed_results: Vec<OcrSpaceResult>,
    #[serde(default)]
    is_errored_on_processing: bool,
    #[serde(default)]
    error_message: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrSpaceResult {
    #[serde(default)]
    parsed_text: String,
}

/// OCR.space HTTP client.
pub struct OcrSpaceClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl OcrSpaceClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, OcrError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl OcrEngine for OcrSpaceClient {
    async fn recognize(
        &self,
        image: &ScanImage,
        language: &str,
        attempt: OcrAttempt,
    ) -> Result<String, OcrError> {
        let file = Part::bytes(image.bytes.clone()).file_name(image.file_name.clone());
        let form = Form::new()
            .part("file", file)
            .text("apikey", self.api_key.clone())
            .text("language", language.to_string())
            .text("isOverlayRequired", "false")
            .text("OCREngine", attempt.engine.to_string())
            .text("scale", attempt.scale.to_string());

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OcrError::Status(response.status().as_u16()));
        }

        let body: OcrSpaceResponse = response.json().await?;
        if body.is_errored_on_processing {
            let message = body
                .error_message
                .map(|m| m.to_string())
                .unwrap_or_else(|| "unknown error".into());
            return Err(OcrError::Processing(message));
        }

        Ok(body
            .parsed_results
            .into_iter()
            .next()
            .map(|r| r.parsed_text)
            .unwrap_or_default())
    }
}

/// Runs the attempt table against an engine.
pub struct OcrService {
    engine: Arc<dyn OcrEngine>,
    language: String,
    attempts: Vec<OcrAttempt>,
}

impl OcrService {
    pub fn new(engine: Arc<dyn OcrEngine>, language: impl Into<String>) -> Self {
        Self {
            engine,
            language: language.into(),
            attempts: DEFAULT_ATTEMPTS.to_vec(),
        }
    }

    pub fn with_attempts(mut self, attempts: Vec<OcrAttempt>) -> Self {
        self.attempts = attempts;
        self
    }

    /// Best-effort text for `image`.
    ///
    /// Returns the first useful attempt, else the longest text seen, else "".
    pub async fn read_text(&self, image: &ScanImage) -> RawScanText {
        let mut best = String::new();

        for attempt in &self.attempts {
            match self.engine.recognize(image, &self.language, *attempt).await {
                Ok(text) => {
                    let useful = useful_chars(&text);
                    debug!(?attempt, chars = useful, "OCR attempt finished");
                    if useful >= MIN_USEFUL_CHARS {
                        info!(image = %image.id, ?attempt, "OCR succeeded");
                        return RawScanText::new(image.id, text);
                    }
                    if useful > useful_chars(&best) {
                        best = text;
                    }
                }
                Err(e) => warn!(image = %image.id, ?attempt, error = %e, "OCR attempt failed"),
            }
        }

        warn!(image = %image.id, "no OCR attempt produced useful text");
        RawScanText::new(image.id, best)
    }
}

fn useful_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replays canned results and records the attempts it saw.
    struct ScriptedEngine {
        results: Mutex<Vec<Result<String, OcrError>>>,
        seen: Mutex<Vec<OcrAttempt>>,
    }

    impl ScriptedEngine {
        fn new(results: Vec<Result<String, OcrError>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into_iter().rev().collect()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl OcrEngine for ScriptedEngine {
        async fn recognize(
            &self,
            _image: &ScanImage,
            _language: &str,
            attempt: OcrAttempt,
        ) -> Result<String, OcrError> {
            self.seen.lock().unwrap().push(attempt);
            self.results
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    fn image() -> ScanImage {
        ScanImage::new("box.jpg", vec![0xff, 0xd8])
    }

    #[tokio::test]
    async fn test_first_useful_attempt_wins() {
        let engine = ScriptedEngine::new(vec![
            Err(OcrError::Status(500)),
            Ok("IBUPROFENO 600 mg".into()),
            Ok("never asked".into()),
        ]);
        let service = OcrService::new(engine.clone(), "spa");

        let text = service.read_text(&image()).await;

        assert_eq!(text.text, "IBUPROFENO 600 mg");
        assert_eq!(engine.seen.lock().unwrap().as_slice(), &DEFAULT_ATTEMPTS[..2]);
    }

    #[tokio::test]
    async fn test_trivial_results_keep_longest() {
        let engine = ScriptedEngine::new(vec![
            Ok("ab".into()),
            Ok("abcd".into()),
            Err(OcrError::Processing("timeout".into())),
        ]);
        let service = OcrService::new(engine.clone(), "spa");

        let text = service.read_text(&image()).await;

        assert_eq!(text.text, "abcd");
        assert_eq!(engine.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_all_failures_yield_empty_text() {
        let engine = ScriptedEngine::new(vec![
            Err(OcrError::Status(503)),
            Err(OcrError::Status(503)),
            Err(OcrError::Status(503)),
        ]);
        let service = OcrService::new(engine, "spa");
        let img = image();

        let text = service.read_text(&img).await;

        assert!(text.is_blank());
        assert_eq!(text.image_id, img.id);
    }

    #[test]
    fn test_ocr_space_response_parsing() {
        let body = r#"{"ParsedResults":[{"ParsedText":"Nº 654321.5\r\nIBUPROFENO"}],"OCRExitCode":1,"IsErroredOnProcessing":false}"#;
        let parsed: OcrSpaceResponse = serde_json::from_str(body).unwrap();
        assert!(!parsed.is_errored_on_processing);
        assert_eq!(parsed.parsed_results[0].parsed_text, "Nº 654321.5\r\nIBUPROFENO");

        let errored = r#"{"IsErroredOnProcessing":true,"ErrorMessage":["File failed validation"]}"#;
        let parsed: OcrSpaceResponse = serde_json::from_str(errored).unwrap();
        assert!(parsed.is_errored_on_processing);
        assert!(parsed.error_message.is_some());
    }
}
