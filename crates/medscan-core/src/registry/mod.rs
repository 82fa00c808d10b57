//! Registry resolution: national code → medication record.
//!
//! Pipeline: cache lookup → registry fetch → document download → cache insert

mod cima;

pub use cima::*;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::MedicationCache;
use crate::documents::DocumentRetriever;
use crate::models::{
    is_valid_national_code, DocumentKind, DocumentRef, MatchConfidence, MedicationRecord,
    NameMatch,
};

/// Most results returned by a partial-name search.
pub const MAX_NAME_MATCHES: usize = 5;

/// Queries longer than this many characters are high confidence.
const HIGH_CONFIDENCE_QUERY_LEN: usize = 5;

/// Display name used when the registry sends an empty name.
const FALLBACK_NAME: &str = "medicamento";

/// Registry transport errors. "Not found" is not an error.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Registry transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid registry payload: {0}")]
    Decode(String),
}

/// A document link as tagged by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryDocument {
    pub kind_code: i64,
    pub url: String,
}

/// Registry metadata for one national code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub code: String,
    /// Full registry name
    pub name: String,
    pub manufacturer: Option<String>,
    pub active_ingredients: Option<String>,
    pub registration_number: Option<String>,
    pub documents: Vec<RegistryDocument>,
}

impl Presentation {
    /// First document link of the given kind.
    pub fn document_url(&self, kind: DocumentKind) -> Option<&str> {
        self.documents
            .iter()
            .find(|d| d.kind_code == kind.registry_code())
            .map(|d| d.url.as_str())
    }

    /// Only the first whitespace-delimited token of the registry name.
    pub fn display_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(FALLBACK_NAME)
    }
}

/// External drug registry.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// `Ok(None)` when the registry does not know the code.
    async fn presentation(&self, code: &str) -> Result<Option<Presentation>, RegistryError>;
}

/// Outcome of resolving a national code.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    /// Served from the cache without touching the network
    Cached { record: MedicationRecord },
    /// Fetched from the registry and inserted into the cache
    Fetched { record: MedicationRecord },
    /// The registry does not know this code
    NotFound { code: String },
    /// The registry could not be reached or answered garbage
    Unavailable { code: String, reason: String },
}

impl Resolution {
    pub fn record(&self) -> Option<&MedicationRecord> {
        match self {
            Self::Cached { record } | Self::Fetched { record } => Some(record),
            Self::NotFound { .. } | Self::Unavailable { .. } => None,
        }
    }

    pub fn into_record(self) -> Option<MedicationRecord> {
        match self {
            Self::Cached { record } | Self::Fetched { record } => Some(record),
            Self::NotFound { .. } | Self::Unavailable { .. } => None,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached { .. })
    }
}

/// Resolves national codes against the cache first, then the registry.
pub struct RegistryResolver {
    registry: Arc<dyn RegistryClient>,
    retriever: DocumentRetriever,
}

impl RegistryResolver {
    pub fn new(registry: Arc<dyn RegistryClient>, retriever: DocumentRetriever) -> Self {
        Self {
            registry,
            retriever,
        }
    }

    /// Resolve a code. A cache hit short-circuits all network access.
    pub async fn resolve_by_code(&self, code: &str, cache: &mut MedicationCache) -> Resolution {
        if let Some(record) = cache.get(code) {
            debug!(code, "cache hit");
            return Resolution::Cached {
                record: record.clone(),
            };
        }

        if !is_valid_national_code(code) {
            warn!(code, "refusing to query registry with malformed code");
            return Resolution::NotFound {
                code: code.to_string(),
            };
        }

        let presentation = match self.registry.presentation(code).await {
            Ok(Some(presentation)) => presentation,
            Ok(None) => {
                info!(code, "code not found in registry");
                return Resolution::NotFound {
                    code: code.to_string(),
                };
            }
            Err(e) => {
                warn!(code, error = %e, "registry unavailable");
                return Resolution::Unavailable {
                    code: code.to_string(),
                    reason: e.to_string(),
                };
            }
        };

        let record = self.build_record(&presentation).await;
        info!(code, name = %record.name, "medication resolved from registry");

        if let Err(e) = cache.put_async(record.clone()).await {
            warn!(code, error = %e, "failed to persist medication cache");
        }

        Resolution::Fetched { record }
    }

    /// Case-insensitive substring search over cached names, insertion order, at most 5.
    pub fn search_by_partial_name(&self, text: &str, cache: &MedicationCache) -> Vec<NameMatch> {
        search_by_partial_name(text, cache)
    }

    async fn build_record(&self, presentation: &Presentation) -> MedicationRecord {
        let name = presentation.display_name().to_string();

        let data_sheet = self
            .fetch_document(presentation, DocumentKind::DataSheet, &name)
            .await;
        let leaflet = self
            .fetch_document(presentation, DocumentKind::Leaflet, &name)
            .await;

        MedicationRecord {
            code: presentation.code.clone(),
            name,
            presentation: Some(presentation.name.clone()).filter(|n| !n.trim().is_empty()),
            manufacturer: presentation.manufacturer.clone(),
            data_sheet,
            leaflet,
            resolved_at: Utc::now(),
        }
    }

    /// Download one document kind. A failed download keeps the link only.
    async fn fetch_document(
        &self,
        presentation: &Presentation,
        kind: DocumentKind,
        name: &str,
    ) -> Option<DocumentRef> {
        let url = presentation.document_url(kind)?;
        match self
            .retriever
            .fetch(url, kind, name, &presentation.code)
            .await
        {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(code = %presentation.code, ?kind, error = %e, "document download failed");
                Some(DocumentRef::remote(url))
            }
        }
    }
}

/// Partial-name search over the cache, tagged with a length-based confidence.
pub fn search_by_partial_name(text: &str, cache: &MedicationCache) -> Vec<NameMatch> {
    let query = text.trim();
    let confidence = if query.chars().count() > HIGH_CONFIDENCE_QUERY_LEN {
        MatchConfidence::High
    } else {
        MatchConfidence::Medium
    };

    cache
        .search_by_name(query, MAX_NAME_MATCHES)
        .into_iter()
        .map(|record| NameMatch {
            code: record.code.clone(),
            name: record.name.clone(),
            confidence,
        })
        .collect()
}
