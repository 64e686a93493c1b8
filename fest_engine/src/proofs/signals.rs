//! Fuzzy matching of OCR text against what the buyer declared.
//!
//! Each [`MatchSignal`] checks one declared field against the normalized screenshot text. A manual proof is only
//! accepted when every configured signal matches.
use chrono::{DateTime, NaiveDateTime, NaiveTime};

use super::ManualProof;

/// Lowercases the text and strips all whitespace, so that line breaks and spacing introduced by OCR do not matter.
pub fn normalize_text(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).flat_map(char::to_lowercase).collect()
}

pub trait MatchSignal: Send + Sync {
    fn name(&self) -> &'static str;
    /// `text` has already been through [`normalize_text`].
    fn matches(&self, text: &str, proof: &ManualProof) -> bool;
}

/// The local part (before the `@`) of the declared UPI handle must appear in the text.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpiHandleSignal;

impl MatchSignal for UpiHandleSignal {
    fn name(&self) -> &'static str {
        "upi_handle"
    }

    fn matches(&self, text: &str, proof: &ManualProof) -> bool {
        let handle = normalize_text(&proof.declared_upi_handle);
        let local = handle.split('@').next().unwrap_or_default();
        !local.is_empty() && text.contains(local)
    }
}

/// The declared transaction reference must appear in the text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxnRefSignal;

impl MatchSignal for TxnRefSignal {
    fn name(&self) -> &'static str {
        "txn_ref"
    }

    fn matches(&self, text: &str, proof: &ManualProof) -> bool {
        let reference = normalize_text(&proof.declared_txn_ref);
        !reference.is_empty() && text.contains(&reference)
    }
}

/// The `HH:MM` part of the declared payment time must appear in the text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentTimeSignal;

impl PaymentTimeSignal {
    fn declared_time(declared: &str) -> Option<NaiveTime> {
        let declared = declared.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(declared) {
            return Some(dt.time());
        }
        ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(declared, fmt).ok())
            .map(|dt| dt.time())
            .or_else(|| {
                ["%H:%M:%S", "%H:%M"].iter().find_map(|fmt| NaiveTime::parse_from_str(declared, fmt).ok())
            })
    }
}

impl MatchSignal for PaymentTimeSignal {
    fn name(&self) -> &'static str {
        "payment_time"
    }

    fn matches(&self, text: &str, proof: &ManualProof) -> bool {
        match Self::declared_time(&proof.declared_timestamp) {
            Some(time) => text.contains(&time.format("%H:%M").to_string()),
            None => false,
        }
    }
}

pub fn default_signals() -> Vec<Box<dyn MatchSignal>> {
    vec![Box::new(UpiHandleSignal), Box::new(TxnRefSignal), Box::new(PaymentTimeSignal)]
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalReport {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
}

impl SignalReport {
    pub fn all_matched(&self) -> bool {
        self.missing.is_empty() && !self.matched.is_empty()
    }
}

/// Runs every signal against the raw OCR output.
pub fn evaluate_signals(signals: &[Box<dyn MatchSignal>], ocr_text: &str, proof: &ManualProof) -> SignalReport {
    let text = normalize_text(ocr_text);
    let (matched, missing): (Vec<_>, Vec<_>) = signals.iter().partition(|s| s.matches(&text, proof));
    SignalReport {
        matched: matched.iter().map(|s| s.name().to_string()).collect(),
        missing: missing.iter().map(|s| s.name().to_string()).collect(),
    }
}
