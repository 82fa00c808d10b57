//! Application configuration.
//!
//! Layered: built-in defaults → `config/default` → `config/{ENVIRONMENT}` →
//! `config/local` → `MEDSCAN__*` environment variables.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheResult, JsonFileStore, MedicationCache, SqliteStore};
use crate::documents::{DocumentRetriever, FetchError};
use crate::extractor::FieldExtractor;
use crate::identify::Identifier;
use crate::ocr::{
    OcrError, OcrService, OcrSpaceClient, DEFAULT_OCR_API_KEY, DEFAULT_OCR_LANGUAGE,
    DEFAULT_OCR_URL,
};
use crate::registry::{CimaClient, RegistryError, RegistryResolver, DEFAULT_CIMA_URL};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub ocr: OcrConfig,
    pub registry: RegistryConfig,
    pub documents: DocumentsConfig,
    pub cache: CacheConfig,
    pub chatpdf: ChatPdfConfig,
    pub gemini: GeminiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub api_url: String,
    pub api_key: String,
    pub language: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    pub dir: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatPdfConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "json", "compact" or "pretty"
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 16 * 1024 * 1024, // 16MB
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_OCR_URL.to_string(),
            api_key: DEFAULT_OCR_API_KEY.to_string(),
            language: DEFAULT_OCR_LANGUAGE.to_string(),
            timeout_seconds: 20,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CIMA_URL.to_string(),
            timeout_seconds: 10,
        }
    }
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            dir: "data".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Json,
            path: "medication_cache.json".to_string(),
        }
    }
}

impl Default for ChatPdfConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.chatpdf.com/v1".to_string(),
            api_key: None,
            timeout_seconds: 60,
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: None,
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.0,
            timeout_seconds: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Failures while wiring components from configuration.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("OCR client: {0}")]
    Ocr(#[from] OcrError),

    #[error("Registry client: {0}")]
    Registry(#[from] RegistryError),

    #[error("Document retriever: {0}")]
    Documents(#[from] FetchError),
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                File::with_name(&format!(
                    "config/{}",
                    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into())
                ))
                .required(false),
            )
            // Add local config (gitignored)
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("MEDSCAN").separator("__"));

        config.build()?.try_deserialize()
    }

    /// Open the medication cache with the configured backend.
    pub fn open_cache(&self) -> CacheResult<MedicationCache> {
        let cache = match self.cache.backend {
            CacheBackend::Json => {
                MedicationCache::open(Box::new(JsonFileStore::new(&self.cache.path)))
            }
            CacheBackend::Sqlite => {
                MedicationCache::open(Box::new(SqliteStore::open(&self.cache.path)?))
            }
        };
        Ok(cache)
    }

    pub fn registry_resolver(&self) -> Result<RegistryResolver, SetupError> {
        let registry = CimaClient::new(
            self.registry.base_url.clone(),
            Duration::from_secs(self.registry.timeout_seconds),
        )?;
        let retriever = DocumentRetriever::new(
            &self.documents.dir,
            Duration::from_secs(self.documents.timeout_seconds),
        )?;
        Ok(RegistryResolver::new(Arc::new(registry), retriever))
    }

    pub fn ocr_service(&self) -> Result<OcrService, SetupError> {
        let engine = OcrSpaceClient::new(
            self.ocr.api_url.clone(),
            self.ocr.api_key.clone(),
            Duration::from_secs(self.ocr.timeout_seconds),
        )?;
        Ok(OcrService::new(Arc::new(engine), self.ocr.language.clone()))
    }

    /// Full identification pipeline.
    pub fn identifier(&self) -> Result<Identifier, SetupError> {
        Ok(Identifier::new(
            self.ocr_service()?,
            FieldExtractor::new(),
            self.registry_resolver()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.ocr.language, "spa");
        assert_eq!(config.documents.timeout_seconds, 30);
        assert_eq!(config.cache.backend, CacheBackend::Json);
        assert!(config.chatpdf.api_key.is_none());
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"cache": {"backend": "sqlite"}}"#).unwrap();
        assert_eq!(config.cache.backend, CacheBackend::Sqlite);
        assert_eq!(config.cache.path, "medication_cache.json");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_builds_pipeline_from_defaults() {
        assert!(AppConfig::default().identifier().is_ok());
    }
}
