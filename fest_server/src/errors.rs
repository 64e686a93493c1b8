use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use fest_engine::{
    traits::{CartError, FulfillmentError, LedgerError},
    CheckoutError,
};
use log::error;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    Checkout(#[from] CheckoutError),
}

/// What the client should do about an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    FixRequest,
    Retry,
    ResubmitProof,
    AdjustCart,
}

impl ErrorAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorAction::FixRequest => "fix_request",
            ErrorAction::Retry => "retry",
            ErrorAction::ResubmitProof => "resubmit_proof",
            ErrorAction::AdjustCart => "adjust_cart",
        }
    }
}

impl ServerError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InitializeError(_) | Self::ConfigurationError(_) | Self::IOError(_) | Self::Unspecified(_) => {
                "server"
            },
            Self::BackendError(_) => "backend",
            Self::InvalidRequestBody(_) => "validation",
            Self::AuthenticationError(_) => "authentication",
            Self::NoRecordFound(_) => "not_found",
            Self::Checkout(e) => match e {
                CheckoutError::Validation(_) => "validation",
                CheckoutError::NotFound(_) => "not_found",
                CheckoutError::GatewayUnavailable(_) => "gateway_unavailable",
                CheckoutError::Proof(_) => "verification_error",
                CheckoutError::SignatureMismatch => "signature_mismatch",
                CheckoutError::ProofRejected(_) => "proof_rejected",
                CheckoutError::OutOfStock(_) => "out_of_stock",
                CheckoutError::DatabaseError(_) => "database",
            },
        }
    }

    pub fn action(&self) -> ErrorAction {
        match self {
            Self::InvalidRequestBody(_) | Self::NoRecordFound(_) | Self::AuthenticationError(_) => {
                ErrorAction::FixRequest
            },
            Self::Checkout(e) => match e {
                CheckoutError::Validation(_) | CheckoutError::NotFound(_) => ErrorAction::FixRequest,
                CheckoutError::SignatureMismatch | CheckoutError::ProofRejected(_) => ErrorAction::ResubmitProof,
                CheckoutError::OutOfStock(_) => ErrorAction::AdjustCart,
                CheckoutError::GatewayUnavailable(_) | CheckoutError::Proof(_) | CheckoutError::DatabaseError(_) => {
                    ErrorAction::Retry
                },
            },
            _ => ErrorAction::Retry,
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingClaims => StatusCode::UNAUTHORIZED,
                AuthError::InvalidSignature => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedClaims(_) => StatusCode::BAD_REQUEST,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            },
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Checkout(e) => match e {
                CheckoutError::Validation(_) => StatusCode::BAD_REQUEST,
                CheckoutError::NotFound(_) => StatusCode::NOT_FOUND,
                CheckoutError::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                CheckoutError::Proof(_) => StatusCode::SERVICE_UNAVAILABLE,
                CheckoutError::SignatureMismatch => StatusCode::UNPROCESSABLE_ENTITY,
                CheckoutError::ProofRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CheckoutError::OutOfStock(_) => StatusCode::CONFLICT,
                CheckoutError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("💻️ {self}");
        }
        let mut body = json!({
            "error": self.to_string(),
            "kind": self.kind(),
            "action": self.action().as_str(),
        });
        if let Self::Checkout(e) = self {
            if let Some(v) = e.verification_status() {
                body["verification_status"] = json!(v);
            }
        }
        HttpResponse::build(status).insert_header(ContentType::json()).body(body.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No identity claims were supplied.")]
    MissingClaims,
    #[error("The identity claims signature is invalid.")]
    InvalidSignature,
    #[error("The identity claims are not in the correct format. {0}")]
    PoorlyFormattedClaims(String),
    #[error("Insufficient permissions. {0}")]
    InsufficientPermissions(String),
}

impl From<CartError> for ServerError {
    fn from(e: CartError) -> Self {
        Self::Checkout(e.into())
    }
}

impl From<LedgerError> for ServerError {
    fn from(e: LedgerError) -> Self {
        Self::Checkout(e.into())
    }
}

impl From<FulfillmentError> for ServerError {
    fn from(e: FulfillmentError) -> Self {
        Self::Checkout(e.into())
    }
}
