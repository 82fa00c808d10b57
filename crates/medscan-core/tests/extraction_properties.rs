//! Property tests for national-code extraction.

use medscan_core::extractor::FieldExtractor;
use proptest::prelude::*;

/// Filler that can never form a code marker or a check digit.
fn filler() -> impl Strategy<Value = String> {
    "[abd-mp-z ]{0,20}"
}

proptest! {
    #[test]
    fn anchored_code_wins_over_any_bare_run(
        code in "[0-9]{6}",
        bare in "[0-9]{7}",
        marker in prop_oneof![Just("Nº"), Just("codigo")],
        before in filler(),
        after in filler(),
        marker_first in any::<bool>(),
    ) {
        let anchored = format!("{marker}{code}");
        let text = if marker_first {
            format!("{before}{anchored}\n{after}{bare}")
        } else {
            format!("{before}{bare}\n{after}{anchored}")
        };

        let fields = FieldExtractor::new().extract(&text);
        prop_assert_eq!(fields.national_code, Some(code));
    }

    #[test]
    fn single_run_of_valid_length_is_the_code(
        run in "[0-9]{6,8}",
        before in filler(),
        after in filler(),
    ) {
        let text = format!("{before}{run}{after}");
        let fields = FieldExtractor::new().extract(&text);
        prop_assert_eq!(fields.national_code, Some(run));
    }

    #[test]
    fn runs_outside_six_to_eight_are_never_codes(
        run in prop_oneof!["[0-9]{1,5}", "[0-9]{9,16}"],
        before in filler(),
        after in filler(),
    ) {
        let text = format!("{before}{run}{after}");
        let fields = FieldExtractor::new().extract(&text);
        prop_assert_eq!(fields.national_code, None);
    }

    #[test]
    fn extraction_is_total(text in any::<String>()) {
        let fields = FieldExtractor::new().extract(&text);
        if let Some(code) = fields.national_code {
            prop_assert!((6..=8).contains(&code.len()));
            prop_assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
        if let Some(name) = fields.candidate_name {
            prop_assert!(name.chars().count() <= 100);
        }
    }
}

#[test]
fn empty_text_has_no_fields() {
    let fields = FieldExtractor::new().extract("");
    assert!(fields.national_code.is_none());
    assert!(fields.candidate_name.is_none());
    assert!(fields.dosage.is_none());
    assert!(fields.manufacturer.is_none());
}
