use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use fest_engine::{
    db_types::{ItemId, MerchantId, UserId},
    traits::CartError,
    CartApi,
};
use mockall::predicate::eq;
use serde_json::json;

use super::{
    helpers::{cart_with, send_request, user_claims, with_claims, IDENTITY_SECRET},
    mocks::MockCartManager,
};
use crate::{
    auth::{IdentityClaims, CLAIMS_HEADER, CLAIMS_SIGNATURE_HEADER},
    routes::{AddToCartRoute, ChangeCartQuantityRoute, ClearCartRoute, MyCartRoute, MyCartsRoute, WhoamiRoute},
};

fn configure(db: MockCartManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        cfg.service(WhoamiRoute::new())
            .service(MyCartsRoute::<MockCartManager>::new())
            .service(MyCartRoute::<MockCartManager>::new())
            .service(AddToCartRoute::<MockCartManager>::new())
            .service(ChangeCartQuantityRoute::<MockCartManager>::new())
            .service(ClearCartRoute::<MockCartManager>::new())
            .app_data(web::Data::new(CartApi::new(db)));
    }
}

#[actix_web::test]
async fn requests_without_claims_are_refused() {
    let req = TestRequest::get().uri("/cart/dosa-corner");
    let (status, body) = send_request(req, configure(MockCartManager::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "authentication");
    assert_eq!(body["error"], "Authentication Error. No identity claims were supplied.");
}

#[actix_web::test]
async fn forged_claims_are_refused() {
    let (header, signature) = user_claims("alice").sign("not-the-secret").unwrap();
    let req = TestRequest::get()
        .uri("/cart/dosa-corner")
        .insert_header((CLAIMS_HEADER, header))
        .insert_header((CLAIMS_SIGNATURE_HEADER, signature));
    let (status, _) = send_request(req, configure(MockCartManager::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Valid signature over different claims
    let (_, signature) = user_claims("alice").sign(IDENTITY_SECRET).unwrap();
    let (header, _) = user_claims("mallory").sign(IDENTITY_SECRET).unwrap();
    let req = TestRequest::get()
        .uri("/cart/dosa-corner")
        .insert_header((CLAIMS_HEADER, header))
        .insert_header((CLAIMS_SIGNATURE_HEADER, signature));
    let (status, _) = send_request(req, configure(MockCartManager::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn callers_need_a_role() {
    let claims = IdentityClaims::new("nobody", vec![]);
    let req = with_claims(TestRequest::get().uri("/cart"), &claims);
    let (status, body) = send_request(req, configure(MockCartManager::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["action"], "fix_request");

    let req = with_claims(TestRequest::get().uri("/whoami"), &user_claims("alice"));
    let (status, body) = send_request(req, configure(MockCartManager::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "alice");
}

#[actix_web::test]
async fn fetch_my_cart() {
    let mut db = MockCartManager::new();
    db.expect_fetch_cart()
        .withf(|user, merchant| user == &UserId::from("alice") && merchant == &MerchantId::from("dosa-corner"))
        .returning(|_, _| Ok(cart_with("alice", "dosa-corner", &[("masala", 100, 2), ("filter", 40, 1)])));
    let req = with_claims(TestRequest::get().uri("/cart/dosa-corner"), &user_claims("alice"));
    let (status, body) = send_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_price"], 240);
    assert_eq!(body["lines"].as_array().unwrap().len(), 2);
    assert_eq!(body["lines"][0]["item_id"], "masala");
}

#[actix_web::test]
async fn add_item_uses_the_callers_identity() {
    let mut db = MockCartManager::new();
    db.expect_add_item()
        .withf(|user, merchant, item, qty| {
            user == &UserId::from("alice") &&
                merchant == &MerchantId::from("dosa-corner") &&
                item == &ItemId::from("masala") &&
                *qty == 2
        })
        .times(1)
        .returning(|_, _, _, _| Ok(cart_with("alice", "dosa-corner", &[("masala", 100, 2)])));
    let req = with_claims(TestRequest::post().uri("/cart/dosa-corner/items"), &user_claims("alice"))
        .set_json(json!({"item_id": "masala", "quantity": 2}));
    let (status, body) = send_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "alice");
    assert_eq!(body["total_price"], 200);
}

#[actix_web::test]
async fn invalid_cart_changes() {
    // Zero quantities never reach the database
    let req = with_claims(TestRequest::post().uri("/cart/dosa-corner/items"), &user_claims("alice"))
        .set_json(json!({"item_id": "masala", "quantity": 0}));
    let (status, body) = send_request(req, configure(MockCartManager::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let req = with_claims(TestRequest::patch().uri("/cart/dosa-corner/items/masala"), &user_claims("alice"))
        .set_json(json!({"delta": 0}));
    let (status, _) = send_request(req, configure(MockCartManager::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = with_claims(TestRequest::post().uri("/cart/dosa-corner/items"), &user_claims("alice"))
        .set_json(json!({"item": "masala"}));
    let (status, body) = send_request(req, configure(MockCartManager::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["action"], "fix_request");

    let mut db = MockCartManager::new();
    db.expect_add_item().returning(|_, _, item, _| Err(CartError::NotFound(format!("Item {item}"))));
    let req = with_claims(TestRequest::post().uri("/cart/dosa-corner/items"), &user_claims("alice"))
        .set_json(json!({"item_id": "biryani", "quantity": 1}));
    let (status, body) = send_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[actix_web::test]
async fn change_and_clear() {
    let mut db = MockCartManager::new();
    db.expect_change_quantity()
        .with(eq(UserId::from("alice")), eq(MerchantId::from("dosa-corner")), eq(ItemId::from("masala")), eq(-1))
        .returning(|_, _, _, _| Ok(cart_with("alice", "dosa-corner", &[("masala", 100, 1)])));
    let req = with_claims(TestRequest::patch().uri("/cart/dosa-corner/items/masala"), &user_claims("alice"))
        .set_json(json!({"delta": -1}));
    let (status, body) = send_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_price"], 100);

    let mut db = MockCartManager::new();
    db.expect_clear_cart().times(1).returning(|_, _| Ok(()));
    let req = with_claims(TestRequest::delete().uri("/cart/dosa-corner"), &user_claims("alice"));
    let (status, body) = send_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lines"], json!([]));
    assert_eq!(body["total_price"], 0);
}

#[actix_web::test]
async fn all_my_carts() {
    let mut db = MockCartManager::new();
    db.expect_fetch_carts_for_user().with(eq(UserId::from("alice"))).returning(|_| {
        Ok(vec![
            cart_with("alice", "dosa-corner", &[("masala", 100, 1)]),
            cart_with("alice", "fest-pass", &[("day-1", 500, 2)]),
        ])
    });
    let req = with_claims(TestRequest::get().uri("/cart"), &user_claims("alice"));
    let (status, body) = send_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[1]["merchant_id"], "fest-pass");
    assert_eq!(body[1]["total_price"], 1000);
}
