use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use fest_engine::{
    db_types::{
        Amount,
        Merchant,
        MerchantId,
        MerchantKind,
        Order,
        OrderId,
        ProofKind,
        SequenceCounter,
        UserId,
        VerificationStatus,
    },
    events::EventProducers,
    traits::FulfillmentError,
    LedgerAdminApi,
    OrderQueryApi,
};
use mockall::predicate::eq;
use serde_json::json;

use super::{
    helpers::{send_request, user_claims, with_claims},
    mocks::{MockLedgerManager, MockOrderManager},
};
use crate::{
    auth::{IdentityClaims, Role},
    routes::{
        FulfilOrderRoute,
        MerchantOrdersRoute,
        MyOrderRoute,
        MyOrdersRoute,
        ResetSequenceRoute,
        RestockItemRoute,
        UpsertMerchantRoute,
    },
};

fn configure_orders(db: MockOrderManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let api = OrderQueryApi::new(db, EventProducers::default());
        cfg.service(MyOrdersRoute::<MockOrderManager>::new())
            .service(MyOrderRoute::<MockOrderManager>::new())
            .service(MerchantOrdersRoute::<MockOrderManager>::new())
            .service(FulfilOrderRoute::<MockOrderManager>::new())
            .app_data(web::Data::new(api));
    }
}

fn configure_admin(db: MockLedgerManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let api = LedgerAdminApi::new(db);
        cfg.service(UpsertMerchantRoute::<MockLedgerManager>::new())
            .service(RestockItemRoute::<MockLedgerManager>::new())
            .service(ResetSequenceRoute::<MockLedgerManager>::new())
            .app_data(web::Data::new(api));
    }
}

fn order_for(user: &str, id: i64, token: i64) -> Order {
    Order {
        id: OrderId(id),
        human_token: token,
        token_epoch: 0,
        user_id: UserId::from(user),
        merchant_id: MerchantId::from("dosa-corner"),
        total_amount: Amount::from(240),
        proof_kind: ProofKind::CounterCash,
        proof_reference: "counter".to_string(),
        verification_status: VerificationStatus::Verified,
        idempotency_key: format!("counter:{user}:{id}"),
        fulfilled: false,
        fulfilled_at: None,
        created_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
        line_items: vec![],
    }
}

fn staff_at(user: &str, merchant: &str) -> IdentityClaims {
    IdentityClaims::new(user, vec![Role::Staff]).with_merchant(merchant)
}

fn admin() -> IdentityClaims {
    IdentityClaims::new("root", vec![Role::Admin])
}

#[actix_web::test]
async fn my_orders() {
    let mut db = MockOrderManager::new();
    db.expect_search_orders()
        .withf(|q| q.user_id == Some(UserId::from("alice")) && q.merchant_id.is_none())
        .returning(|_| Ok(vec![order_for("alice", 1, 1), order_for("alice", 4, 2)]));
    let req = with_claims(TestRequest::get().uri("/orders"), &user_claims("alice"));
    let (status, body) = send_request(req, configure_orders(db)).await;
    assert_eq!(status, StatusCode::OK);
    let orders = body.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[1]["human_token"], 2);
}

#[actix_web::test]
async fn other_peoples_orders_look_missing() {
    let mut db = MockOrderManager::new();
    db.expect_fetch_order().with(eq(OrderId(4))).returning(|id| Ok(Some(order_for("bob", id.0, 3))));
    let req = with_claims(TestRequest::get().uri("/orders/4"), &user_claims("alice"));
    let (status, body) = send_request(req, configure_orders(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let mut db = MockOrderManager::new();
    db.expect_fetch_order().with(eq(OrderId(4))).returning(|id| Ok(Some(order_for("bob", id.0, 3))));
    let req = with_claims(TestRequest::get().uri("/orders/4"), &user_claims("bob"));
    let (status, body) = send_request(req, configure_orders(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 4);
    assert_eq!(body["human_token"], 3);
}

#[actix_web::test]
async fn staff_see_their_merchants_queue() {
    let mut db = MockOrderManager::new();
    db.expect_search_orders()
        .withf(|q| q.merchant_id == Some(MerchantId::from("dosa-corner")) && q.fulfilled == Some(false))
        .times(1)
        .returning(|_| Ok(vec![order_for("alice", 1, 1)]));
    let req = with_claims(
        TestRequest::get().uri("/merchant/dosa-corner/orders?fulfilled=false"),
        &staff_at("sam", "dosa-corner"),
    );
    let (status, body) = send_request(req, configure_orders(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["user_id"], "alice");
}

#[actix_web::test]
async fn staff_cannot_see_other_merchants() {
    let req = with_claims(TestRequest::get().uri("/merchant/chai-stall/orders"), &staff_at("sam", "dosa-corner"));
    let (status, body) = send_request(req, configure_orders(MockOrderManager::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "authentication");

    // Buyers never reach the merchant queue
    let req = with_claims(TestRequest::get().uri("/merchant/dosa-corner/orders"), &user_claims("alice"));
    let (status, _) = send_request(req, configure_orders(MockOrderManager::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn orders_are_fulfilled_once() {
    let mut db = MockOrderManager::new();
    db.expect_mark_fulfilled()
        .withf(|m, id| m == &MerchantId::from("dosa-corner") && *id == OrderId(1))
        .times(1)
        .returning(|_, id| {
            let mut order = order_for("alice", id.0, 1);
            order.fulfilled = true;
            order.fulfilled_at = Some(Utc.with_ymd_and_hms(2025, 1, 1, 12, 5, 0).unwrap());
            Ok(order)
        });
    let req =
        with_claims(TestRequest::post().uri("/merchant/dosa-corner/orders/1/fulfil"), &staff_at("sam", "dosa-corner"));
    let (status, body) = send_request(req, configure_orders(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fulfilled"], true);

    let mut db = MockOrderManager::new();
    db.expect_mark_fulfilled().returning(|_, id| Err(FulfillmentError::AlreadyFulfilled(id)));
    let req =
        with_claims(TestRequest::post().uri("/merchant/dosa-corner/orders/1/fulfil"), &staff_at("sam", "dosa-corner"));
    let (status, body) = send_request(req, configure_orders(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid checkout request: Order #1 has already been fulfilled");
}

#[actix_web::test]
async fn admin_routes_need_the_admin_role() {
    let body = json!({"kind": "STALL", "name": "Dosa Corner"});
    let req = with_claims(TestRequest::put().uri("/admin/merchants/dosa-corner"), &staff_at("sam", "dosa-corner"))
        .set_json(body.clone());
    let (status, _) = send_request(req, configure_admin(MockLedgerManager::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut db = MockLedgerManager::new();
    db.expect_upsert_merchant()
        .withf(|m| m.id == MerchantId::from("dosa-corner") && m.kind == MerchantKind::Stall)
        .times(1)
        .returning(|m| {
            Ok(Merchant {
                id: m.id,
                kind: m.kind,
                name: m.name,
                created_at: Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap(),
            })
        });
    let req = with_claims(TestRequest::put().uri("/admin/merchants/dosa-corner"), &admin()).set_json(body);
    let (status, body) = send_request(req, configure_admin(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Dosa Corner");
}

#[actix_web::test]
async fn restocks_must_add_stock() {
    let req = with_claims(TestRequest::post().uri("/admin/merchants/dosa-corner/items/masala/restock"), &admin())
        .set_json(json!({"quantity": 0}));
    let (status, body) = send_request(req, configure_admin(MockLedgerManager::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let mut db = MockLedgerManager::new();
    db.expect_fetch_catalog_item().returning(|_, _| Ok(None));
    let req = with_claims(TestRequest::post().uri("/admin/merchants/dosa-corner/items/ghost/restock"), &admin())
        .set_json(json!({"quantity": 5}));
    let (status, _) = send_request(req, configure_admin(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn sequence_resets_start_a_new_epoch() {
    let mut db = MockLedgerManager::new();
    db.expect_fetch_merchant().returning(|id| {
        Ok(Some(Merchant {
            id: id.clone(),
            kind: MerchantKind::Stall,
            name: "Dosa Corner".into(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap(),
        }))
    });
    db.expect_reset_sequence().times(1).returning(|id| {
        Ok(SequenceCounter {
            merchant_id: id.clone(),
            current_value: 0,
            epoch: 2,
            updated_at: Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
        })
    });
    let req = with_claims(TestRequest::post().uri("/admin/merchants/dosa-corner/sequence/reset"), &admin());
    let (status, body) = send_request(req, configure_admin(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["epoch"], 2);
    assert_eq!(body["current_value"], 0);

    let mut db = MockLedgerManager::new();
    db.expect_fetch_merchant().returning(|_| Ok(None));
    let req = with_claims(TestRequest::post().uri("/admin/merchants/nowhere/sequence/reset"), &admin());
    let (status, _) = send_request(req, configure_admin(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
