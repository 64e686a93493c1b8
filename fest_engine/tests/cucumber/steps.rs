use cucumber::{then, when};
use fest_common::Amount;
use fest_engine::{
    db_types::{MerchantId, UserId},
    proofs::{CounterCashProof, ManualProof, PaymentProof},
    traits::CartManagement,
    CheckoutError,
    CheckoutRequest,
};

use crate::cucumber::FestWorld;

async fn checkout(world: &mut FestWorld, req: CheckoutRequest) {
    world.last_proof = Some(req.proof.clone());
    let result = world.system().checkout.checkout(req).await;
    world.record(result);
}

#[when(expr = "{word} adds {int} {word} from {word} to their cart")]
async fn add_to_cart(world: &mut FestWorld, user: String, qty: i64, item: String, merchant: String) {
    world.system().add_to_cart(&user, &merchant, &item, qty).await;
}

#[when(expr = "{word} pays {word} through the gateway with payment {word}")]
async fn gateway_checkout(world: &mut FestWorld, user: String, merchant: String, payment_id: String) {
    let proof = world.system().signed_gateway_proof(&user, &merchant, &payment_id).await;
    checkout(world, CheckoutRequest::new(UserId::from(user), MerchantId::from(merchant), proof)).await;
}

#[when(expr = "the gateway repeats the last callback for {word} at {word}")]
async fn repeat_callback(world: &mut FestWorld, user: String, merchant: String) {
    let proof = world.last_proof.clone().expect("No checkout has been made yet");
    checkout(world, CheckoutRequest::new(UserId::from(user), MerchantId::from(merchant), proof)).await;
}

#[when(expr = "{word} pays {word} by UPI as {word} with reference {word} at {word} and the screenshot reads {string}")]
async fn manual_checkout(
    world: &mut FestWorld,
    user: String,
    merchant: String,
    handle: String,
    reference: String,
    timestamp: String,
    screenshot_text: String,
) {
    world.system().ocr.set_text(&screenshot_text);
    let proof = PaymentProof::Manual(ManualProof {
        declared_upi_handle: handle,
        declared_txn_ref: reference,
        declared_timestamp: timestamp,
        screenshot_asset: format!("uploads/{user}.png"),
    });
    checkout(world, CheckoutRequest::new(UserId::from(user), MerchantId::from(merchant), proof)).await;
}

#[when(expr = "{word} pays {word} in cash at the counter with request {word}")]
async fn counter_checkout(world: &mut FestWorld, user: String, merchant: String, request_id: String) {
    let proof = PaymentProof::CounterCash(CounterCashProof::default());
    let req =
        CheckoutRequest::new(UserId::from(user), MerchantId::from(merchant), proof).with_idempotency_key(request_id);
    checkout(world, req).await;
}

#[when(expr = "an admin resets the tokens for {word}")]
async fn reset_tokens(world: &mut FestWorld, merchant: String) {
    world.system().admin.reset_sequence(&MerchantId::from(merchant)).await.expect("Error resetting sequence");
}

#[then(expr = "the order has token {int} and total {int}")]
async fn order_token_and_total(world: &mut FestWorld, token: i64, total: i64) {
    let receipt = world.receipt();
    assert_eq!(receipt.human_token, token, "Unexpected token");
    assert_eq!(receipt.total_amount, Amount::from(total), "Unexpected total");
}

#[then(expr = "the order has token {int} in epoch {int}")]
async fn order_token_and_epoch(world: &mut FestWorld, token: i64, epoch: i64) {
    let receipt = world.receipt();
    assert_eq!((receipt.human_token, receipt.token_epoch), (token, epoch));
}

#[then("the checkout is a duplicate")]
async fn is_duplicate(world: &mut FestWorld) {
    assert!(world.receipt().duplicate, "Expected a duplicate receipt");
}

#[then("the checkout is rejected")]
async fn is_rejected(world: &mut FestWorld) {
    match &world.last_error {
        Some(CheckoutError::ProofRejected(_) | CheckoutError::SignatureMismatch) => {},
        other => panic!("Expected a rejected proof, got {other:?}"),
    }
}

#[then(expr = "the checkout fails because {word} is out of stock")]
async fn is_out_of_stock(world: &mut FestWorld, item: String) {
    match &world.last_error {
        Some(CheckoutError::OutOfStock(id)) => assert_eq!(id.as_str(), item),
        other => panic!("Expected out of stock, got {other:?}"),
    }
}

#[then(expr = "{word} has {int} {word} left")]
async fn stock_left(world: &mut FestWorld, merchant: String, count: i64, item: String) {
    assert_eq!(world.system().available(&merchant, &item).await, count, "Unexpected stock for {item}");
}

#[then(expr = "the cart of {word} at {word} has {int} line(s)")]
async fn cart_lines(world: &mut FestWorld, user: String, merchant: String, lines: usize) {
    let cart = world
        .system()
        .db
        .fetch_cart(&UserId::from(user), &MerchantId::from(merchant))
        .await
        .expect("Error fetching cart");
    assert_eq!(cart.lines.len(), lines);
}
