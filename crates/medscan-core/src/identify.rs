//! Identification pipeline for one photograph.
//!
//! ```text
//! image → OCR → extract ─┬─ code ──→ resolve (cache / registry)
//!                        └─ name ──→ cache name search
//! ```

use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::cache::MedicationCache;
use crate::extractor::FieldExtractor;
use crate::models::{ExtractedFields, MedicationRecord, NameMatch, RawScanText, ScanImage};
use crate::ocr::OcrService;
use crate::registry::{RegistryResolver, Resolution};

/// Guidance returned when nothing usable came out of the photo.
pub const RETAKE_GUIDANCE: &str = "No se pudo identificar el medicamento automáticamente. \
     Vuelve a hacer la foto con el código nacional (C.N.) bien visible.";

/// What the pipeline concluded.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IdentificationOutcome {
    /// National code resolved to a record
    Resolved {
        record: MedicationRecord,
        from_cache: bool,
    },
    /// Code read but unknown to the registry
    NotFound {
        code: String,
        matches: Vec<NameMatch>,
    },
    /// Code read but the registry could not be asked
    Unavailable {
        code: String,
        reason: String,
        matches: Vec<NameMatch>,
    },
    /// No code; the candidate name matched cached records
    NameMatches { matches: Vec<NameMatch> },
    /// Nothing to go on
    Unidentified { message: String },
}

/// Full result for one scan.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Identification {
    pub image_id: Uuid,
    pub raw_text: String,
    pub fields: ExtractedFields,
    pub outcome: IdentificationOutcome,
}

impl Identification {
    pub fn record(&self) -> Option<&MedicationRecord> {
        match &self.outcome {
            IdentificationOutcome::Resolved { record, .. } => Some(record),
            _ => None,
        }
    }
}

/// Sequential OCR → extract → resolve pipeline.
pub struct Identifier {
    ocr: OcrService,
    extractor: FieldExtractor,
    resolver: RegistryResolver,
}

impl Identifier {
    pub fn new(ocr: OcrService, extractor: FieldExtractor, resolver: RegistryResolver) -> Self {
        Self {
            ocr,
            extractor,
            resolver,
        }
    }

    pub fn resolver(&self) -> &RegistryResolver {
        &self.resolver
    }

    pub fn extractor(&self) -> &FieldExtractor {
        &self.extractor
    }

    /// Identify the medication in a photograph.
    #[instrument(level = "info", skip_all, fields(image = %image.id))]
    pub async fn identify(&self, image: &ScanImage, cache: &mut MedicationCache) -> Identification {
        let scan = self.read_text(image).await;
        self.identify_text(scan, cache).await
    }

    /// OCR stage on its own. Needs no cache, so callers sharing one can run
    /// it before taking their lock.
    pub async fn read_text(&self, image: &ScanImage) -> RawScanText {
        self.ocr.read_text(image).await
    }

    /// Identify from text that already went through OCR.
    pub async fn identify_text(
        &self,
        scan: RawScanText,
        cache: &mut MedicationCache,
    ) -> Identification {
        let fields = self.extractor.extract(&scan.text);
        info!(
            code = ?fields.national_code,
            name = ?fields.candidate_name,
            dosage = ?fields.dosage,
            "fields extracted"
        );

        let outcome = match &fields.national_code {
            Some(code) => {
                let resolution = self.resolver.resolve_by_code(code, cache).await;
                self.outcome_for(resolution, &fields, cache)
            }
            None => self.name_outcome(&fields, cache),
        };

        Identification {
            image_id: scan.image_id,
            raw_text: scan.text,
            fields,
            outcome,
        }
    }

    fn outcome_for(
        &self,
        resolution: Resolution,
        fields: &ExtractedFields,
        cache: &MedicationCache,
    ) -> IdentificationOutcome {
        match resolution {
            Resolution::Cached { record } => IdentificationOutcome::Resolved {
                record,
                from_cache: true,
            },
            Resolution::Fetched { record } => IdentificationOutcome::Resolved {
                record,
                from_cache: false,
            },
            Resolution::NotFound { code } => IdentificationOutcome::NotFound {
                code,
                matches: self.name_matches(fields, cache),
            },
            Resolution::Unavailable { code, reason } => IdentificationOutcome::Unavailable {
                code,
                reason,
                matches: self.name_matches(fields, cache),
            },
        }
    }

    fn name_outcome(
        &self,
        fields: &ExtractedFields,
        cache: &MedicationCache,
    ) -> IdentificationOutcome {
        let matches = self.name_matches(fields, cache);
        if matches.is_empty() {
            IdentificationOutcome::Unidentified {
                message: RETAKE_GUIDANCE.to_string(),
            }
        } else {
            IdentificationOutcome::NameMatches { matches }
        }
    }

    /// Search the cache with each word of the candidate name, longest word first.
    fn name_matches(&self, fields: &ExtractedFields, cache: &MedicationCache) -> Vec<NameMatch> {
        let Some(name) = fields.candidate_name.as_deref() else {
            return Vec::new();
        };

        let mut words: Vec<&str> = name
            .split_whitespace()
            .filter(|w| w.chars().all(char::is_alphabetic) && w.chars().count() >= 3)
            .collect();
        words.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));

        words
            .into_iter()
            .map(|w| self.resolver.search_by_partial_name(w, cache))
            .find(|m| !m.is_empty())
            .unwrap_or_default()
    }
}
