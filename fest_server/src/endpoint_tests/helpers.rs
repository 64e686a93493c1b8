use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::{TimeZone, Utc};
use fest_common::Secret;
use fest_engine::db_types::{Amount, Cart, CartLine, ItemId, MerchantId, UserId};
use log::debug;
use serde_json::Value;

use crate::{
    auth::{IdentityClaims, Role, CLAIMS_HEADER, CLAIMS_SIGNATURE_HEADER},
    middleware::IdentityMiddlewareFactory,
    server::json_config,
};

// Only ever used to sign claims in these tests
pub const IDENTITY_SECRET: &str = "endpoint-tests-identity-secret";

pub fn user_claims(user: &str) -> IdentityClaims {
    IdentityClaims::new(user, vec![Role::User])
}

pub fn with_claims(req: TestRequest, claims: &IdentityClaims) -> TestRequest {
    let (header, signature) = claims.sign(IDENTITY_SECRET).expect("Could not sign claims");
    req.insert_header((CLAIMS_HEADER, header)).insert_header((CLAIMS_SIGNATURE_HEADER, signature))
}

/// Sends the request through the identity middleware and the routes set up by `configure`. Errors raised by
/// middleware are rendered the way the server would render them.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, Value)
where F: FnOnce(&mut ServiceConfig) {
    let _ = env_logger::try_init().ok();
    let identity = IdentityMiddlewareFactory::new(Secret::from(IDENTITY_SECRET), true);
    let app = App::new().app_data(json_config()).service(web::scope("").wrap(identity).configure(configure));
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => res.into_parts().1,
        Err(e) => e.error_response(),
    };
    let status = res.status();
    let bytes = res.into_body().try_into_bytes().unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

pub fn cart_with(user: &str, merchant: &str, lines: &[(&str, i64, i64)]) -> Cart {
    let lines = lines
        .iter()
        .map(|(item, price, qty)| CartLine {
            merchant_id: MerchantId::from(merchant),
            item_id: ItemId::from(*item),
            name: item.to_string(),
            unit_price: Amount::from(*price),
            quantity: *qty,
            updated_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
        })
        .collect();
    Cart::new(UserId::from(user), MerchantId::from(merchant), lines).unwrap()
}
