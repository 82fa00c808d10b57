//! Ordered extraction rules.
//!
//! National-code rules are evaluated most specific first; the first rule that
//! yields a 6 to 8 digit group wins.

use regex::{Captures, Regex};

use crate::models::is_valid_national_code;

/// Laboratories printed on Spanish packaging. Lowercase, matched as substrings.
pub const KNOWN_MANUFACTURERS: &[&str] = &[
    "cinfa",
    "normon",
    "kern pharma",
    "stada",
    "teva",
    "sandoz",
    "mylan",
    "viatris",
    "ratiopharm",
    "aurobindo",
    "apotex",
    "qualigen",
    "tarbis",
    "bayer",
    "pfizer",
    "sanofi",
    "novartis",
    "almirall",
    "esteve",
    "ferrer",
    "menarini",
    "zambon",
];

/// Words that mark a line as naming a laboratory or brand.
const BRAND_WORDS: &[&str] = &["laboratorio", "laboratorios", "pharma", "farma"];

/// Dosage-form words, Spanish and English.
const DOSAGE_FORM_PATTERN: &str = r"(?i)\b(?:comprimidos?|c[aá]psulas?|sobres?|granulado|soluci[oó]n|suspensi[oó]n|jarabe|crema|pomada|gel|colirio|inyectable|supositorios?|polvo|parches?|gotas|aerosol|tablets?|capsules?|solution|cream|ointment|syrup)\b";

/// Strength: number followed by a unit.
const DOSAGE_PATTERN: &str = r"(?i)([0-9]+(?:[.,][0-9]+)?)[ \t]*(mcg|mg|ml|g)\b";

/// One national-code rule: a pattern plus how to read the code out of it.
pub struct CodeRule {
    pub name: &'static str,
    pattern: Regex,
    capture: fn(&Captures<'_>) -> Option<String>,
}

impl CodeRule {
    pub fn new(
        name: &'static str,
        pattern: &str,
        capture: fn(&Captures<'_>) -> Option<String>,
    ) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("code rule pattern is a valid regex"),
            capture,
        }
    }

    /// Apply to whitespace-stripped text.
    pub fn apply(&self, stripped: &str) -> Option<String> {
        let caps = self.pattern.captures(stripped)?;
        (self.capture)(&caps).filter(|code| is_valid_national_code(code))
    }
}

fn first_group(caps: &Captures<'_>) -> Option<String> {
    caps.get(1).map(|m| m.as_str().to_string())
}

/// National-code rules, most specific first.
pub fn default_code_rules() -> Vec<CodeRule> {
    vec![
        // "Nº123456", "código123456", "C.N.123456"
        CodeRule::new(
            "marker",
            r"(?i)(?:n[º°]|c[oó]digo(?:nacional)?|c\.n\.?)[:.]?([0-9]{6})",
            first_group,
        ),
        // "123456.7" - code followed by its check digit
        CodeRule::new("check-digit", r"(?:^|[^0-9])([0-9]{6})\.[0-9]", first_group),
        // bare run of exactly 6 to 8 digits
        CodeRule::new("bare-run", r"(?:^|[^0-9])([0-9]{6,8})(?:[^0-9]|$)", first_group),
    ]
}

/// Regex matching brand or laboratory words as whole words.
pub fn brand_pattern() -> Regex {
    let words: Vec<String> = KNOWN_MANUFACTURERS
        .iter()
        .chain(BRAND_WORDS)
        .map(|w| regex::escape(w))
        .collect();
    Regex::new(&format!(r"(?i)\b(?:{})\b", words.join("|")))
        .expect("brand pattern is a valid regex")
}

pub fn dosage_form_pattern() -> Regex {
    Regex::new(DOSAGE_FORM_PATTERN).expect("dosage form pattern is a valid regex")
}

pub fn dosage_pattern() -> Regex {
    Regex::new(DOSAGE_PATTERN).expect("dosage pattern is a valid regex")
}

/// "kern pharma" -> "Kern Pharma"
pub fn display_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str) -> CodeRule {
        default_code_rules()
            .into_iter()
            .find(|r| r.name == name)
            .unwrap()
    }

    #[test]
    fn test_rule_order() {
        let names: Vec<_> = default_code_rules().iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["marker", "check-digit", "bare-run"]);
    }

    #[test]
    fn test_marker_rule() {
        let marker = rule("marker");
        assert_eq!(marker.apply("Nº123456"), Some("123456".into()));
        assert_eq!(marker.apply("N°123456"), Some("123456".into()));
        assert_eq!(marker.apply("codigo123456"), Some("123456".into()));
        assert_eq!(marker.apply("CÓDIGONACIONAL:654321"), Some("654321".into()));
        assert_eq!(marker.apply("C.N.712345.6"), Some("712345".into()));
        assert_eq!(marker.apply("1234567"), None);
    }

    #[test]
    fn test_check_digit_rule_needs_boundary() {
        let check = rule("check-digit");
        assert_eq!(check.apply("lote654321.5"), Some("654321".into()));
        assert_eq!(check.apply("12345678.9"), None);
    }

    #[test]
    fn test_bare_run_rule_lengths() {
        let bare = rule("bare-run");
        assert_eq!(bare.apply("x123456y"), Some("123456".into()));
        assert_eq!(bare.apply("1234567"), Some("1234567".into()));
        assert_eq!(bare.apply("a12345678"), Some("12345678".into()));
        assert_eq!(bare.apply("12345"), None);
        assert_eq!(bare.apply("123456789"), None);
        // skips a short run and finds the later valid one
        assert_eq!(bare.apply("12a7654321b"), Some("7654321".into()));
    }

    #[test]
    fn test_brand_pattern_matches_whole_words() {
        let brand = brand_pattern();
        assert!(brand.is_match("IBUPROFENO CINFA 600 mg"));
        assert!(brand.is_match("Kern Pharma"));
        assert!(!brand.is_match("NORMONAL"));
    }

    #[test]
    fn test_display_case() {
        assert_eq!(display_case("cinfa"), "Cinfa");
        assert_eq!(display_case("kern pharma"), "Kern Pharma");
    }
}
