use std::time::Duration;

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use fest_engine::{
    db_types::{
        Amount,
        CheckoutState,
        ItemId,
        MerchantId,
        Order,
        OrderId,
        PaymentIntentRecord,
        ProofKind,
        UserId,
        VerificationStatus,
    },
    events::EventProducers,
    proofs::{PaymentIntent, ProofError, RejectionReason, VerificationOutcome},
    traits::FinalizeResult,
    CheckoutApi,
};
use mockall::predicate::eq;
use serde_json::{json, Value};

use super::{
    helpers::{cart_with, send_request, user_claims, with_claims},
    mocks::{MockFulfillmentDb, MockGateway, MockVerifier},
};
use crate::routes::{CheckoutRoute, CreateIntentRoute};

type TestCheckoutApi = CheckoutApi<MockFulfillmentDb, MockGateway, MockVerifier>;

fn configure(
    db: MockFulfillmentDb,
    gateway: MockGateway,
    verifier: MockVerifier,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let api: TestCheckoutApi = CheckoutApi::new(db, gateway, verifier, EventProducers::default(), "INR");
        cfg.service(CreateIntentRoute::<MockFulfillmentDb, MockGateway, MockVerifier>::new())
            .service(CheckoutRoute::<MockFulfillmentDb, MockGateway, MockVerifier>::new())
            .app_data(web::Data::new(api));
    }
}

fn order(id: i64, token: i64, key: &str, kind: ProofKind) -> Order {
    Order {
        id: OrderId(id),
        human_token: token,
        token_epoch: 0,
        user_id: UserId::from("alice"),
        merchant_id: MerchantId::from("dosa-corner"),
        total_amount: Amount::from(200),
        proof_kind: kind,
        proof_reference: "pay_1".to_string(),
        verification_status: VerificationStatus::Verified,
        idempotency_key: key.to_string(),
        fulfilled: false,
        fulfilled_at: None,
        created_at: Utc.with_ymd_and_hms(2025, 1, 1, 14, 31, 0).unwrap(),
        line_items: vec![],
    }
}

fn gateway_body() -> Value {
    json!({
        "merchant_id": "dosa-corner",
        "proof_kind": "gateway",
        "proof_payload": {"intent_id": "order_1", "external_payment_id": "pay_1", "signature": "abcd"},
        "client_total": 1
    })
}

fn manual_body() -> Value {
    json!({
        "merchant_id": "dosa-corner",
        "proof_kind": "manual",
        "proof_payload": {
            "declared_upi_handle": "alice@bank",
            "declared_txn_ref": "TXN123",
            "declared_timestamp": "2025-01-01T14:30:00",
            "screenshot_asset": "uploads/alice.png"
        }
    })
}

fn checkout_request(body: Value) -> TestRequest {
    with_claims(TestRequest::post().uri("/checkout"), &user_claims("alice")).set_json(body)
}

/// A database holding alice's cart of two masala dosas, with no prior order for the checkout.
fn db_with_cart() -> MockFulfillmentDb {
    let mut db = MockFulfillmentDb::new();
    db.expect_fetch_order_by_idempotency_key().returning(|_| Ok(None));
    db.expect_fetch_cart()
        .withf(|user, merchant| user == &UserId::from("alice") && merchant == &MerchantId::from("dosa-corner"))
        .returning(|_, _| Ok(cart_with("alice", "dosa-corner", &[("masala", 100, 2)])));
    db
}

#[actix_web::test]
async fn gateway_checkout_returns_a_token() {
    let mut db = db_with_cart();
    db.expect_fetch_payment_intent().with(eq("order_1")).returning(|_| {
        Ok(Some(PaymentIntentRecord {
            intent_id: "order_1".into(),
            user_id: UserId::from("alice"),
            merchant_id: MerchantId::from("dosa-corner"),
            amount: Amount::from(200),
            currency: "INR".into(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 14, 0, 0).unwrap(),
        }))
    });
    db.expect_finalize_order()
        .withf(|req| {
            req.idempotency_key == "gateway:pay_1" &&
                req.total_amount() == Some(Amount::from(200)) &&
                req.proof_reference == "pay_1" &&
                req.verification_status == VerificationStatus::Verified
        })
        .times(1)
        .returning(|_| Ok(FinalizeResult::Finalized(order(7, 1, "gateway:pay_1", ProofKind::Gateway))));
    db.expect_record_checkout_attempt()
        .withf(|a| a.state == CheckoutState::CartCleared && a.order_id == Some(OrderId(7)))
        .times(1)
        .returning(|_| Ok(1));
    let mut verifier = MockVerifier::new();
    verifier.expect_verify_gateway().times(1).returning(|_| VerificationOutcome::Verified);

    let (status, body) = send_request(checkout_request(gateway_body()), configure(db, MockGateway::new(), verifier)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "order_id": 7,
            "human_token": 1,
            "token_epoch": 0,
            "verification_status": "VERIFIED",
            "total_amount": 200,
            "duplicate": false
        })
    );
}

#[actix_web::test]
async fn repeated_checkouts_return_the_first_order() {
    let mut db = MockFulfillmentDb::new();
    db.expect_fetch_order_by_idempotency_key()
        .with(eq("gateway:pay_1"))
        .returning(|key| Ok(Some(order(7, 1, key, ProofKind::Gateway))));
    // The verifier and finalize must not be touched again
    let (status, body) =
        send_request(checkout_request(gateway_body()), configure(db, MockGateway::new(), MockVerifier::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order_id"], 7);
    assert_eq!(body["duplicate"], true);
}

#[actix_web::test]
async fn rejected_screenshots_ask_for_a_new_proof() {
    let mut db = db_with_cart();
    db.expect_record_checkout_attempt()
        .withf(|a| {
            a.state == CheckoutState::Rejected &&
                a.verification_status == VerificationStatus::Rejected &&
                a.idempotency_key == "manual:alice:TXN123"
        })
        .times(1)
        .returning(|_| Ok(1));
    let mut verifier = MockVerifier::new();
    verifier
        .expect_verify_manual()
        .returning(|_| VerificationOutcome::Rejected(RejectionReason::SignalsMissing(vec!["payment_time".into()])));

    let (status, body) = send_request(checkout_request(manual_body()), configure(db, MockGateway::new(), verifier)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "proof_rejected");
    assert_eq!(body["action"], "resubmit_proof");
    assert_eq!(body["verification_status"], "REJECTED");
}

#[actix_web::test]
async fn ocr_outages_can_be_retried() {
    let mut db = db_with_cart();
    db.expect_record_checkout_attempt().withf(|a| a.state == CheckoutState::Error).returning(|_| Ok(1));
    let mut verifier = MockVerifier::new();
    verifier.expect_verify_manual().returning(|_| VerificationOutcome::Error(ProofError::Timeout(Duration::from_secs(20))));

    let (status, body) = send_request(checkout_request(manual_body()), configure(db, MockGateway::new(), verifier)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["action"], "retry");
    assert_eq!(body["verification_status"], "ERROR");
}

#[actix_web::test]
async fn sold_out_items_need_a_cart_change() {
    let mut db = db_with_cart();
    db.expect_finalize_order().returning(|_| Ok(FinalizeResult::Insufficient(ItemId::from("masala"))));
    db.expect_record_checkout_attempt().returning(|_| Ok(1));
    let mut verifier = MockVerifier::new();
    verifier.expect_verify_manual().returning(|_| VerificationOutcome::Verified);

    let (status, body) = send_request(checkout_request(manual_body()), configure(db, MockGateway::new(), verifier)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "out_of_stock");
    assert_eq!(body["action"], "adjust_cart");
    assert_eq!(body["error"], "masala does not have enough stock left");
}

#[actix_web::test]
async fn counter_cash_needs_an_idempotency_key() {
    let body = json!({"merchant_id": "dosa-corner", "proof_kind": "counter_cash", "proof_payload": {}});
    let (status, body) =
        send_request(checkout_request(body), configure(MockFulfillmentDb::new(), MockGateway::new(), MockVerifier::new()))
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[actix_web::test]
async fn payment_intents_use_the_stored_cart_total() {
    let mut db = db_with_cart();
    db.expect_insert_payment_intent()
        .withf(|r| r.intent_id == "order_9" && r.amount == Amount::from(200) && r.user_id == UserId::from("alice"))
        .times(1)
        .returning(|_| Ok(()));
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_intent()
        .with(eq(Amount::from(200)), eq("INR"), eq("dosa-corner/alice"))
        .times(1)
        .returning(|amount, currency, _| {
            Ok(PaymentIntent {
                intent_id: "order_9".into(),
                client_secret: "rzp_test".into(),
                amount,
                currency: currency.to_string(),
            })
        });
    let req = with_claims(TestRequest::post().uri("/checkout/dosa-corner/intent"), &user_claims("alice"));
    let (status, body) = send_request(req, configure(db, gateway, MockVerifier::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["intent_id"], "order_9");
    assert_eq!(body["amount"], 200);
}
