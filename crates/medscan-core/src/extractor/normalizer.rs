//! Scan text normalizer.
//!
//! Produces the two views the extractor works on:
//! - a whitespace-stripped view for national-code patterns
//! - a line-preserving view for the name and dosage heuristics

/// Characters removed before code matching.
const STRIPPED: [char; 4] = [' ', '\r', '\n', '\t'];

/// Remove spaces, tabs, carriage returns and newlines.
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(|c| !STRIPPED.contains(c)).collect()
}

/// Both views of one scan's raw text.
#[derive(Debug, Clone)]
pub struct NormalizedText<'a> {
    /// Whitespace-stripped text
    pub stripped: String,
    /// Trimmed lines, blank lines kept so line adjacency survives
    pub lines: Vec<&'a str>,
}

impl<'a> NormalizedText<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            stripped: normalize(raw),
            lines: raw.lines().map(str::trim).collect(),
        }
    }

    /// Nearest non-empty line above `idx`.
    pub fn previous_non_empty(&self, idx: usize) -> Option<&'a str> {
        self.lines[..idx].iter().rev().find(|l| !l.is_empty()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_whitespace() {
        assert_eq!(normalize("Nº 654321.5\r\nIBU PRO"), "Nº654321.5IBUPRO");
        assert_eq!(normalize("\t 12 34 \n"), "1234");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_lines_are_trimmed_and_kept() {
        let text = NormalizedText::new("  first \r\n\n second\n");
        assert_eq!(text.lines, vec!["first", "", "second"]);
    }

    #[test]
    fn test_previous_non_empty_skips_blank_lines() {
        let text = NormalizedText::new("ESPIDIFEN\n\n   \ngranulado");
        assert_eq!(text.previous_non_empty(3), Some("ESPIDIFEN"));
        assert_eq!(text.previous_non_empty(0), None);
    }
}
