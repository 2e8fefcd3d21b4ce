//! Cheque field extraction from OCR text.
//!
//! The OCR engine itself is a black box behind `OcrEngine`. This module only
//! pulls candidate fields out of the recognised text; every field is
//! best-effort and the operator confirms them before a cheque is recorded.

use crate::{error::LedgerResult, instrument::OcrShadow};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedText {
    pub text: String,
    /// Engine confidence, 0–100.
    pub confidence: f64,
}

pub trait OcrEngine {
    fn recognize(&self, image: &Path) -> LedgerResult<RecognizedText>;
}

/// Bank codes in lookup order. The first code found anywhere in the text wins.
const BANK_CODES: &[&str] = &[
    "HDFC", "ICICI", "SBI", "AXIS", "KOTAK", "YES", "IDBI", "PNB", "BOB", "BOI", "CANARA",
    "UNION", "INDIAN", "CENTRAL", "UCO",
];

static CHEQUE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{6,10}\b").expect("cheque number pattern"));

// Currency marker before the number, after it, or an "amount:" label.
static AMOUNT_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    const NUM: &str = r"(\d+(?:,\d{2,3})*(?:\.\d{1,2})?)";
    [
        Regex::new(&format!(r"(?i)(?:rs\.?|₹|inr)\s*{NUM}")).expect("prefix amount pattern"),
        Regex::new(&format!(r"(?i){NUM}\s*(?:rs\.?|₹|inr)")).expect("suffix amount pattern"),
        Regex::new(&format!(r"(?i)amount[:\s]*(?:rs\.?|₹)?\s*{NUM}"))
            .expect("labelled amount pattern"),
    ]
});

static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{2,4})\b").expect("date pattern")
});

/// Extract candidate cheque fields from recognised text.
pub fn parse_cheque_text(text: &str, confidence: f64) -> OcrShadow {
    OcrShadow {
        cheque_number: CHEQUE_NUMBER.find(text).map(|m| m.as_str().to_string()),
        amount: extract_amount(text),
        date: DATE.find(text).map(|m| m.as_str().to_string()),
        bank_name: extract_bank(text),
        confidence,
    }
}

/// Run the engine on an image and parse what it saw.
pub fn extract_cheque(engine: &dyn OcrEngine, image: &Path) -> LedgerResult<OcrShadow> {
    let recognized = engine.recognize(image)?;
    let shadow = parse_cheque_text(&recognized.text, recognized.confidence);
    log::debug!(
        "ocr {}: number={:?} amount={:?} confidence={:.1}",
        image.display(),
        shadow.cheque_number,
        shadow.amount,
        shadow.confidence
    );
    Ok(shadow)
}

fn extract_amount(text: &str) -> Option<String> {
    AMOUNT_PATTERNS.iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().replace(',', ""))
    })
}

fn extract_bank(text: &str) -> Option<String> {
    let upper = text.to_uppercase();
    BANK_CODES
        .iter()
        .find(|code| upper.contains(*code))
        .map(|code| format!("{code} BANK"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "HDFC Bank Ltd\nPay Acme Traders\nRupees Twenty Five Thousand Only\n\
                          Rs. 25,000.00\nDate 15/03/2024\n004512 110240002 000123";

    #[test]
    fn extracts_all_fields_from_sample() {
        let shadow = parse_cheque_text(SAMPLE, 87.5);
        assert_eq!(shadow.cheque_number.as_deref(), Some("004512"));
        assert_eq!(shadow.amount.as_deref(), Some("25000.00"));
        assert_eq!(shadow.date.as_deref(), Some("15/03/2024"));
        assert_eq!(shadow.bank_name.as_deref(), Some("HDFC BANK"));
        assert_eq!(shadow.confidence, 87.5);
    }

    #[test]
    fn amount_with_suffix_marker_and_label() {
        assert_eq!(extract_amount("1,250 INR only").as_deref(), Some("1250"));
        assert_eq!(extract_amount("Amount: 9800.50").as_deref(), Some("9800.50"));
        assert_eq!(extract_amount("₹ 2,50,000").as_deref(), Some("250000"));
        assert_eq!(extract_amount("no money here"), None);
    }

    #[test]
    fn bank_lookup_follows_code_order() {
        assert_eq!(extract_bank("state bank of india sbi").as_deref(), Some("SBI BANK"));
        // ICICI precedes AXIS in the lookup list regardless of text order.
        assert_eq!(extract_bank("AXIS ... ICICI").as_deref(), Some("ICICI BANK"));
        assert_eq!(extract_bank("unknown lender"), None);
    }

    #[test]
    fn dates_accept_dash_and_dot_separators() {
        assert_eq!(parse_cheque_text("dt 1-4-24", 0.0).date.as_deref(), Some("1-4-24"));
        assert_eq!(parse_cheque_text("31.12.2023", 0.0).date.as_deref(), Some("31.12.2023"));
    }

    #[test]
    fn blank_text_yields_empty_shadow() {
        let shadow = parse_cheque_text("", 0.0);
        assert!(shadow.cheque_number.is_none());
        assert!(shadow.amount.is_none());
        assert!(shadow.date.is_none());
        assert!(shadow.bank_name.is_none());
    }

    struct FixedEngine(&'static str);

    impl OcrEngine for FixedEngine {
        fn recognize(&self, _image: &Path) -> LedgerResult<RecognizedText> {
            Ok(RecognizedText {
                text: self.0.to_string(),
                confidence: 91.0,
            })
        }
    }

    #[test]
    fn extract_cheque_composes_engine_and_parser() {
        let shadow = extract_cheque(&FixedEngine(SAMPLE), Path::new("cheque.png")).unwrap();
        assert_eq!(shadow.bank_name.as_deref(), Some("HDFC BANK"));
        assert_eq!(shadow.confidence, 91.0);
    }
}
