//! Scan models: what comes out of the OCR step and what the extractor recovers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An uploaded packaging photograph.
#[derive(Debug, Clone)]
pub struct ScanImage {
    /// Identifier assigned on upload
    pub id: Uuid,
    /// Original file name as sent by the client
    pub file_name: String,
    /// Raw image bytes
    pub bytes: Vec<u8>,
}

impl ScanImage {
    /// Wrap uploaded bytes, assigning a fresh identifier.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Whether the upload carries any bytes at all.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// OCR output for one photograph. May be empty when every OCR attempt failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawScanText {
    /// Identifier of the originating image
    pub image_id: Uuid,
    /// Text as returned by OCR, line breaks preserved
    pub text: String,
}

impl RawScanText {
    pub fn new(image_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            image_id,
            text: text.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Fields recovered from scan text. Every field is independently optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedFields {
    /// National code, 6 to 8 digits
    pub national_code: Option<String>,
    /// Best guess at the product name line
    pub candidate_name: Option<String>,
    /// Strength, e.g. "600 mg"
    pub dosage: Option<String>,
    /// Known manufacturer, display-capitalized
    pub manufacturer: Option<String>,
}

impl ExtractedFields {
    /// True when nothing at all was recovered.
    pub fn is_empty(&self) -> bool {
        self.national_code.is_none()
            && self.candidate_name.is_none()
            && self.dosage.is_none()
            && self.manufacturer.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fields_are_empty() {
        assert!(ExtractedFields::default().is_empty());

        let fields = ExtractedFields {
            dosage: Some("600 mg".into()),
            ..Default::default()
        };
        assert!(!fields.is_empty());
    }

    #[test]
    fn test_blank_scan_text() {
        let id = Uuid::new_v4();
        assert!(RawScanText::new(id, "").is_blank());
        assert!(RawScanText::new(id, " \r\n\t").is_blank());
        assert!(!RawScanText::new(id, "IBUPROFENO").is_blank());
    }

    #[test]
    fn test_scan_image_ids_are_unique() {
        let a = ScanImage::new("a.jpg", vec![1, 2, 3]);
        let b = ScanImage::new("a.jpg", vec![1, 2, 3]);
        assert_ne!(a.id, b.id);
        assert!(!a.is_empty());
        assert!(ScanImage::new("empty.jpg", Vec::new()).is_empty());
    }
}
