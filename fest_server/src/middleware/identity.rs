//! Identity middleware for Actix Web.
//!
//! The identity provider issues two headers:
//! * `x-fest-claims`: the caller's [`IdentityClaims`] as base64 encoded JSON,
//! * `x-fest-claims-signature`: the base64 HMAC-SHA256 of the `x-fest-claims` value, keyed with
//!   `FEST_IDENTITY_SECRET`.
//!
//! Wrap every authenticated scope with this middleware. Requests with valid claims continue with the claims stored in
//! the request extensions; all others are refused with a 401.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use fest_common::Secret;
use futures::future::LocalBoxFuture;
use log::{trace, warn};

use crate::{
    auth::{IdentityClaims, CLAIMS_HEADER, CLAIMS_SIGNATURE_HEADER},
    errors::{AuthError, ServerError},
    helpers::verify_hmac,
};

pub struct IdentityMiddlewareFactory {
    key: Secret<String>,
    // If false, the signature is not checked and the claims are taken at face value
    enabled: bool,
}

impl IdentityMiddlewareFactory {
    pub fn new(key: Secret<String>, enabled: bool) -> Self {
        IdentityMiddlewareFactory { key, enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = IdentityMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityMiddlewareService {
            key: self.key.clone(),
            enabled: self.enabled,
            service: Rc::new(service),
        }))
    }
}

pub struct IdentityMiddlewareService<S> {
    key: Secret<String>,
    enabled: bool,
    service: Rc<S>,
}

impl<S> IdentityMiddlewareService<S> {
    fn check_claims(&self, req: &ServiceRequest) -> Result<IdentityClaims, AuthError> {
        let header = req
            .headers()
            .get(CLAIMS_HEADER)
            .ok_or(AuthError::MissingClaims)?
            .to_str()
            .map_err(|e| AuthError::PoorlyFormattedClaims(e.to_string()))?;
        if self.enabled {
            let signature = req
                .headers()
                .get(CLAIMS_SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or(AuthError::InvalidSignature)?;
            if self.key.is_empty() || !verify_hmac(self.key.reveal(), header.as_bytes(), signature) {
                return Err(AuthError::InvalidSignature);
            }
        } else {
            trace!("🔐️ Identity checks are disabled. Accepting claims without a signature check.");
        }
        IdentityClaims::decode(header)
    }
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        trace!("🔐️ Checking identity claims for {}", req.path());
        let result = self.check_claims(&req);
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            match result {
                Ok(claims) => {
                    trace!("🔐️ Identity claims for {} ✅️", claims.user_id);
                    req.extensions_mut().insert(claims);
                    service.call(req).await
                },
                Err(e) => {
                    warn!("🔐️ Refusing request to {}. {e}", req.path());
                    Err(ServerError::AuthenticationError(e).into())
                },
            }
        })
    }
}
