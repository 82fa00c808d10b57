//! Field extraction from noisy OCR text.
//!
//! Pipeline: raw text → normalized views → ordered rules → `ExtractedFields`
//!
//! Extraction is total: every field degrades to `None` instead of failing.

mod normalizer;
mod rules;

pub use normalizer::*;
pub use rules::*;

use regex::Regex;
use tracing::debug;

use crate::models::ExtractedFields;

/// Shortest line considered as a product name.
const MIN_NAME_LEN: usize = 3;

/// Longest line considered as a product name.
const MAX_NAME_LEN: usize = 100;

/// Extractor for national code, name, dosage and manufacturer.
pub struct FieldExtractor {
    code_rules: Vec<CodeRule>,
    brand: Regex,
    dosage_form: Regex,
    dosage: Regex,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor {
    /// Create an extractor with the default rule tables.
    pub fn new() -> Self {
        Self::with_code_rules(default_code_rules())
    }

    /// Create an extractor with a custom national-code rule list.
    pub fn with_code_rules(code_rules: Vec<CodeRule>) -> Self {
        Self {
            code_rules,
            brand: brand_pattern(),
            dosage_form: dosage_form_pattern(),
            dosage: dosage_pattern(),
        }
    }

    /// Extract every field from raw scan text.
    pub fn extract(&self, raw: &str) -> ExtractedFields {
        let text = NormalizedText::new(raw);

        ExtractedFields {
            national_code: self.extract_code(&text.stripped),
            candidate_name: self.extract_name(&text),
            dosage: self.extract_dosage(raw),
            manufacturer: extract_manufacturer(raw),
        }
    }

    /// First rule that yields a valid code wins.
    pub fn extract_code(&self, stripped: &str) -> Option<String> {
        self.code_rules.iter().find_map(|rule| {
            let code = rule.apply(stripped)?;
            debug!(rule = rule.name, code = %code, "national code matched");
            Some(code)
        })
    }

    /// Scan lines top to bottom for the product name.
    ///
    /// A line qualifies if it carries ®, a brand/laboratory word, or a
    /// dosage-form word. When only the dosage form triggered, the line above
    /// is preferred since packaging prints the name over the form.
    pub fn extract_name(&self, text: &NormalizedText<'_>) -> Option<String> {
        for (idx, line) in text.lines.iter().enumerate() {
            if !is_name_length(line) {
                continue;
            }

            if line.contains('®') || self.brand.is_match(line) {
                return Some(self.strip_dosage_form(line));
            }

            if self.dosage_form.is_match(line) {
                let chosen = text
                    .previous_non_empty(idx)
                    .filter(|prev| is_name_length(prev))
                    .unwrap_or(line);
                return Some(self.strip_dosage_form(chosen));
            }
        }
        None
    }

    /// First `<number><unit>` in the text, formatted as "600 mg".
    pub fn extract_dosage(&self, raw: &str) -> Option<String> {
        let caps = self.dosage.captures(raw)?;
        Some(format!("{} {}", &caps[1], caps[2].to_lowercase()))
    }

    /// Drop a trailing dosage-form description ("... 600 mg comprimidos").
    fn strip_dosage_form(&self, line: &str) -> String {
        if let Some(m) = self.dosage_form.find(line) {
            let head = line[..m.start()]
                .trim_end_matches(|c: char| c.is_whitespace() || c == ',' || c == '-');
            if head.chars().count() >= MIN_NAME_LEN {
                return head.to_string();
            }
        }
        line.to_string()
    }
}

/// First known manufacturer found in the text, display-capitalized.
pub fn extract_manufacturer(raw: &str) -> Option<String> {
    let lower = raw.to_lowercase();
    KNOWN_MANUFACTURERS
        .iter()
        .find(|name| lower.contains(*name))
        .map(|name| display_case(name))
}

fn is_name_length(line: &str) -> bool {
    (MIN_NAME_LEN..=MAX_NAME_LEN).contains(&line.chars().count())
}
