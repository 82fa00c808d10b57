//! Medscan Core Library
//!
//! Identifies a pharmaceutical product from a photograph of its packaging.
//!
//! # Architecture
//!
//! ```text
//! Photo → OCR → Normalizer → Field Extractor
//!                                  │
//!                    ┌─────────────┴─────────────┐
//!                    │ national code             │ name only
//!                    ▼                           ▼
//!            Registry Resolver           Cache name search
//!             │          │
//!      cache hit     registry fetch ──→ Document Retriever
//!             │          │
//!             └────┬─────┘
//!                  ▼
//!          Medication Cache (persisted on every mutation)
//! ```
//!
//! # Modules
//!
//! - [`models`]: Domain types (ScanImage, ExtractedFields, MedicationRecord, DocumentRef)
//! - [`extractor`]: Normalizer and ordered extraction rules
//! - [`cache`]: Medication cache with JSON and SQLite stores
//! - [`registry`]: Registry resolver and CIMA client
//! - [`documents`]: Document retriever
//! - [`ocr`]: OCR collaborator with a fixed attempt table
//! - [`identify`]: The end-to-end pipeline
//! - [`config`]: Layered configuration

pub mod cache;
pub mod config;
pub mod documents;
pub mod extractor;
pub mod identify;
pub mod logging;
pub mod models;
pub mod ocr;
pub mod registry;

// Re-export commonly used types
pub use cache::{CacheStore, JsonFileStore, MedicationCache, SqliteStore};
pub use config::AppConfig;
pub use documents::DocumentRetriever;
pub use extractor::FieldExtractor;
pub use identify::{Identification, IdentificationOutcome, Identifier};
pub use models::{
    DocumentKind, DocumentRef, ExtractedFields, MatchConfidence, MedicationRecord, NameMatch,
    RawScanText, ScanImage,
};
pub use registry::{RegistryClient, RegistryResolver, Resolution};
