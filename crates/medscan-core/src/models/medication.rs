//! Medication models: resolved registry entries and their documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Regulatory document kinds as tagged by the registry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// Technical data sheet (registry kind 1)
    DataSheet,
    /// Patient leaflet (registry kind 2)
    Leaflet,
}

impl DocumentKind {
    /// Map a registry kind code to a document kind.
    pub fn from_registry_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::DataSheet),
            2 => Some(Self::Leaflet),
            _ => None,
        }
    }

    /// Registry kind code.
    pub fn registry_code(self) -> i64 {
        match self {
            Self::DataSheet => 1,
            Self::Leaflet => 2,
        }
    }

    /// File name prefix for downloaded copies.
    pub fn file_prefix(self) -> &'static str {
        match self {
            Self::DataSheet => "Ficha",
            Self::Leaflet => "Prospecto",
        }
    }
}

/// A document linked from a registry entry.
///
/// A document with no `local_path` is known but not fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentRef {
    pub source_url: String,
    pub local_path: Option<String>,
    pub size_bytes: Option<u64>,
    pub downloaded_at: Option<DateTime<Utc>>,
    /// SHA-256 of the downloaded bytes, hex encoded
    pub sha256: Option<String>,
}

impl DocumentRef {
    /// A document that has not been downloaded.
    pub fn remote(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            local_path: None,
            size_bytes: None,
            downloaded_at: None,
            sha256: None,
        }
    }

    pub fn is_fetched(&self) -> bool {
        self.local_path.is_some()
    }
}

/// Canonical entry keyed by national code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MedicationRecord {
    /// National code - unique identifier, 6 to 8 digits
    pub code: String,
    /// Short display name (first token of the registry name)
    pub name: String,
    /// Full registry presentation name
    pub presentation: Option<String>,
    /// Marketing authorisation holder
    pub manufacturer: Option<String>,
    pub data_sheet: Option<DocumentRef>,
    pub leaflet: Option<DocumentRef>,
    pub resolved_at: DateTime<Utc>,
}

impl MedicationRecord {
    /// Create a record with required fields, resolved now.
    pub fn new(code: String, name: String) -> Self {
        Self {
            code,
            name,
            presentation: None,
            manufacturer: None,
            data_sheet: None,
            leaflet: None,
            resolved_at: Utc::now(),
        }
    }

    /// Document of the given kind, if the registry linked one.
    pub fn document(&self, kind: DocumentKind) -> Option<&DocumentRef> {
        match kind {
            DocumentKind::DataSheet => self.data_sheet.as_ref(),
            DocumentKind::Leaflet => self.leaflet.as_ref(),
        }
    }

    /// Local paths of every downloaded document, data sheet first.
    pub fn local_documents(&self) -> Vec<&str> {
        [self.data_sheet.as_ref(), self.leaflet.as_ref()]
            .into_iter()
            .flatten()
            .filter_map(|d| d.local_path.as_deref())
            .collect()
    }
}

/// Whether a string is a well-formed national code.
pub fn is_valid_national_code(code: &str) -> bool {
    (6..=8).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_digit())
}

/// Confidence attached to a partial-name match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchConfidence {
    High,
    Medium,
}

/// A cached medication matching a partial name query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NameMatch {
    pub code: String,
    pub name: String,
    pub confidence: MatchConfidence,
}
