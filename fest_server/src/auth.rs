//! Caller identity.
//!
//! Users are authenticated by an external identity provider. The provider hands the client a claims header,
//! `x-fest-claims`, holding base64 encoded JSON, and signs that header value into `x-fest-claims-signature`. The
//! [`IdentityMiddlewareFactory`](crate::middleware::IdentityMiddlewareFactory) checks the signature and stores the
//! decoded [`IdentityClaims`] in the request extensions, from where handlers extract them.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use fest_engine::db_types::{MerchantId, UserId};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{AuthError, ServerError},
    helpers::calculate_hmac,
};

pub const CLAIMS_HEADER: &str = "x-fest-claims";
pub const CLAIMS_SIGNATURE_HEADER: &str = "x-fest-claims-signature";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Can manage their own carts, check out and see their own orders
    User,
    /// Works the counter for the merchants listed in the claims
    Staff,
    /// Manages merchants, catalogs, stock and token sequences
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub user_id: UserId,
    #[serde(default)]
    pub roles: Vec<Role>,
    /// The merchants a staff member works for
    #[serde(default)]
    pub merchants: Vec<MerchantId>,
}

impl IdentityClaims {
    pub fn new<U: Into<UserId>>(user_id: U, roles: Vec<Role>) -> Self {
        Self { user_id: user_id.into(), roles, merchants: vec![] }
    }

    pub fn with_merchant<M: Into<MerchantId>>(mut self, merchant: M) -> Self {
        self.merchants.push(merchant.into());
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Admins can manage any merchant. Staff only the ones listed in their claims.
    pub fn can_manage(&self, merchant: &MerchantId) -> bool {
        self.has_role(Role::Admin) || (self.has_role(Role::Staff) && self.merchants.contains(merchant))
    }

    /// Encodes the claims as the value of the claims header.
    pub fn encode(&self) -> Result<String, AuthError> {
        let json = serde_json::to_vec(self).map_err(|e| AuthError::PoorlyFormattedClaims(e.to_string()))?;
        Ok(base64::encode(json))
    }

    pub fn decode(header: &str) -> Result<Self, AuthError> {
        let json = base64::decode(header.trim()).map_err(|e| AuthError::PoorlyFormattedClaims(e.to_string()))?;
        serde_json::from_slice(&json).map_err(|e| AuthError::PoorlyFormattedClaims(e.to_string()))
    }

    /// Returns the `(claims, signature)` header value pair, as the identity provider would issue them.
    pub fn sign(&self, secret: &str) -> Result<(String, String), AuthError> {
        let header = self.encode()?;
        let signature = calculate_hmac(secret, header.as_bytes());
        Ok((header, signature))
    }
}

impl FromRequest for IdentityClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<IdentityClaims>().cloned().ok_or_else(|| {
            warn!("🔐️ No identity claims found in request extensions");
            ServerError::AuthenticationError(AuthError::MissingClaims)
        });
        ready(claims)
    }
}
