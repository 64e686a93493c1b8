use std::{fmt::Debug, sync::Arc, time::Duration};

use log::*;
use thiserror::Error;

use fest_common::Secret;

use super::{
    default_signals,
    evaluate_signals,
    verify_gateway_signature,
    AssetStore,
    CounterCashProof,
    GatewayProof,
    ManualProof,
    MatchSignal,
    OcrEngine,
    PaymentProof,
};
use crate::db_types::VerificationStatus;

pub const DEFAULT_OCR_TIMEOUT: Duration = Duration::from_secs(20);

/// Why a proof was examined and turned down. The buyer can fix the input and try again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionReason {
    #[error("The gateway signature does not match")]
    SignatureMismatch,
    #[error("The payment intent is unknown")]
    UnknownIntent,
    #[error("The payment intent does not belong to this checkout: {0}")]
    IntentMismatch(String),
    #[error("The screenshot does not show the declared {}", .0.join(", "))]
    SignalsMissing(Vec<String>),
    #[error("Counter cash payments are not being accepted")]
    CounterCashDisabled,
}

/// Verification could not be carried out at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofError {
    #[error("The payment screenshot is unavailable: {0}")]
    AssetUnavailable(String),
    #[error("The OCR engine failed: {0}")]
    EngineError(String),
    #[error("The OCR engine did not respond within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    Rejected(RejectionReason),
    Error(ProofError),
}

impl VerificationOutcome {
    pub fn status(&self) -> VerificationStatus {
        match self {
            VerificationOutcome::Verified => VerificationStatus::Verified,
            VerificationOutcome::Rejected(_) => VerificationStatus::Rejected,
            VerificationOutcome::Error(_) => VerificationStatus::Error,
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationOutcome::Verified)
    }
}

/// Checks a proof of payment. Implementations must not touch inventory or sequences; verification is the slow,
/// externally dependent half of a checkout and runs before any storage transaction is opened.
#[allow(async_fn_in_trait)]
pub trait ProofVerifier {
    async fn verify_gateway(&self, proof: &GatewayProof) -> VerificationOutcome;

    async fn verify_manual(&self, proof: &ManualProof) -> VerificationOutcome;

    async fn verify_counter_cash(&self, proof: &CounterCashProof) -> VerificationOutcome;

    async fn verify(&self, proof: &PaymentProof) -> VerificationOutcome {
        match proof {
            PaymentProof::Gateway(p) => self.verify_gateway(p).await,
            PaymentProof::Manual(p) => self.verify_manual(p).await,
            PaymentProof::CounterCash(p) => self.verify_counter_cash(p).await,
        }
    }
}

/// The production verifier: HMAC for gateway callbacks, OCR plus signal matching for screenshots.
#[derive(Clone)]
pub struct StandardProofVerifier<O, A> {
    gateway_secret: Secret<String>,
    ocr: O,
    assets: A,
    signals: Arc<Vec<Box<dyn MatchSignal>>>,
    ocr_timeout: Duration,
    allow_counter_cash: bool,
}

impl<O, A> Debug for StandardProofVerifier<O, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self.signals.iter().map(|s| s.name()).collect::<Vec<_>>();
        write!(
            f,
            "StandardProofVerifier(signals: {names:?}, ocr_timeout: {:?}, counter_cash: {})",
            self.ocr_timeout,
            self.allow_counter_cash
        )
    }
}

impl<O, A> StandardProofVerifier<O, A>
where
    O: OcrEngine,
    A: AssetStore,
{
    pub fn new(gateway_secret: Secret<String>, ocr: O, assets: A) -> Self {
        Self {
            gateway_secret,
            ocr,
            assets,
            signals: Arc::new(default_signals()),
            ocr_timeout: DEFAULT_OCR_TIMEOUT,
            allow_counter_cash: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.ocr_timeout = timeout;
        self
    }

    pub fn with_counter_cash(mut self, allowed: bool) -> Self {
        self.allow_counter_cash = allowed;
        self
    }

    pub fn with_signals(mut self, signals: Vec<Box<dyn MatchSignal>>) -> Self {
        self.signals = Arc::new(signals);
        self
    }

    async fn read_screenshot(&self, asset_ref: &str) -> Result<String, ProofError> {
        let image =
            self.assets.fetch_asset(asset_ref).await.map_err(|e| ProofError::AssetUnavailable(e.to_string()))?;
        self.ocr.extract_text(&image).await.map_err(|e| ProofError::EngineError(e.to_string()))
    }
}

impl<O, A> ProofVerifier for StandardProofVerifier<O, A>
where
    O: OcrEngine,
    A: AssetStore,
{
    async fn verify_gateway(&self, proof: &GatewayProof) -> VerificationOutcome {
        if verify_gateway_signature(&proof.intent_id, &proof.external_payment_id, &proof.signature, &self.gateway_secret)
        {
            debug!("🧾 Gateway signature for payment {} is valid", proof.external_payment_id);
            VerificationOutcome::Verified
        } else {
            warn!("🧾 Gateway signature for payment {} does not match", proof.external_payment_id);
            VerificationOutcome::Rejected(RejectionReason::SignatureMismatch)
        }
    }

    async fn verify_manual(&self, proof: &ManualProof) -> VerificationOutcome {
        let text = match tokio::time::timeout(self.ocr_timeout, self.read_screenshot(&proof.screenshot_asset)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("🧾 Could not read screenshot {}. {e}", proof.screenshot_asset);
                return VerificationOutcome::Error(e);
            },
            Err(_) => {
                warn!("🧾 Reading screenshot {} timed out", proof.screenshot_asset);
                return VerificationOutcome::Error(ProofError::Timeout(self.ocr_timeout));
            },
        };
        let report = evaluate_signals(&self.signals, &text, proof);
        if report.all_matched() {
            debug!("🧾 Screenshot {} matches all declared details", proof.screenshot_asset);
            VerificationOutcome::Verified
        } else {
            info!("🧾 Screenshot {} is missing {:?}", proof.screenshot_asset, report.missing);
            VerificationOutcome::Rejected(RejectionReason::SignalsMissing(report.missing))
        }
    }

    async fn verify_counter_cash(&self, _proof: &CounterCashProof) -> VerificationOutcome {
        if self.allow_counter_cash {
            VerificationOutcome::Verified
        } else {
            VerificationOutcome::Rejected(RejectionReason::CounterCashDisabled)
        }
    }
}
