//! # Proof of payment
//!
//! A checkout is backed by one of three kinds of proof:
//! * [`GatewayProof`]: the payment gateway's callback triple, checked with an HMAC signature.
//! * [`ManualProof`]: a screenshot of a UPI payment plus the buyer's declared details, checked by OCR and fuzzy
//!   matching.
//! * [`CounterCashProof`]: cash paid at the counter. Accepted as is, unless operators have switched the path off.
//!
//! Whatever the kind, verification ends in a [`VerificationOutcome`], and only a `Verified` outcome may go on to
//! materialize an order.
mod gateway;
mod ocr;
mod signals;
mod signature;
mod verifier;

pub use gateway::{GatewayConfig, GatewayError, HttpPaymentGateway, PaymentGateway, PaymentIntent};
pub use ocr::{AssetError, AssetStore, HttpAssetStore, HttpOcrEngine, OcrEngine, OcrError};
pub use signals::{
    default_signals,
    evaluate_signals,
    normalize_text,
    MatchSignal,
    PaymentTimeSignal,
    SignalReport,
    TxnRefSignal,
    UpiHandleSignal,
};
pub use signature::{gateway_signature, verify_gateway_signature};
pub use verifier::{ProofError, ProofVerifier, RejectionReason, StandardProofVerifier, VerificationOutcome};

use serde::{Deserialize, Serialize};

use crate::db_types::ProofKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayProof {
    pub intent_id: String,
    pub external_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualProof {
    pub declared_upi_handle: String,
    pub declared_txn_ref: String,
    /// As the buyer saw it on their payment app, e.g. `2025-01-01T14:30:00`
    pub declared_timestamp: String,
    /// Reference to the uploaded screenshot in the asset store
    pub screenshot_asset: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterCashProof {
    #[serde(default)]
    pub note: Option<String>,
}

/// The proof submitted with a checkout request.
///
/// Serialized as `{"proof_kind": "...", "proof_payload": {...}}`, so it can be flattened into request bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "proof_kind", content = "proof_payload", rename_all = "snake_case")]
pub enum PaymentProof {
    Gateway(GatewayProof),
    Manual(ManualProof),
    CounterCash(CounterCashProof),
}

impl PaymentProof {
    pub fn kind(&self) -> ProofKind {
        match self {
            PaymentProof::Gateway(_) => ProofKind::Gateway,
            PaymentProof::Manual(_) => ProofKind::Manual,
            PaymentProof::CounterCash(_) => ProofKind::CounterCash,
        }
    }

    /// The reference stored with the order: the gateway payment id, or the declared UPI transaction reference.
    pub fn reference(&self) -> String {
        match self {
            PaymentProof::Gateway(p) => p.external_payment_id.clone(),
            PaymentProof::Manual(p) => p.declared_txn_ref.trim().to_string(),
            PaymentProof::CounterCash(p) => p.note.clone().unwrap_or_else(|| "counter".to_string()),
        }
    }

    /// Checks that every field the proof kind needs is present.
    pub fn validate(&self) -> Result<(), String> {
        fn required(name: &str, value: &str) -> Result<(), String> {
            if value.trim().is_empty() {
                Err(format!("{name} is required"))
            } else {
                Ok(())
            }
        }
        match self {
            PaymentProof::Gateway(p) => {
                required("intent_id", &p.intent_id)?;
                required("external_payment_id", &p.external_payment_id)?;
                required("signature", &p.signature)
            },
            PaymentProof::Manual(p) => {
                required("declared_upi_handle", &p.declared_upi_handle)?;
                required("declared_txn_ref", &p.declared_txn_ref)?;
                required("declared_timestamp", &p.declared_timestamp)?;
                required("screenshot_asset", &p.screenshot_asset)
            },
            PaymentProof::CounterCash(_) => Ok(()),
        }
    }
}
