#![allow(dead_code)]
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use fest_common::{Amount, Secret};
use fest_engine::{
    db_types::{ItemId, MerchantId, MerchantKind, NewCatalogItem, NewMerchant, UserId},
    events::EventProducers,
    proofs::{
        gateway_signature,
        AssetError,
        AssetStore,
        GatewayError,
        GatewayProof,
        OcrEngine,
        OcrError,
        PaymentGateway,
        PaymentIntent,
        PaymentProof,
        StandardProofVerifier,
    },
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    CartApi,
    CheckoutApi,
    LedgerAdminApi,
    SqliteDatabase,
};

pub const GATEWAY_SECRET: &str = "gateway_test_secret";

/// Hands out `intent_1`, `intent_2`, ... for whatever amount it is asked for.
#[derive(Clone, Default)]
pub struct FakeGateway {
    counter: Arc<AtomicU64>,
}

impl PaymentGateway for FakeGateway {
    async fn create_intent(
        &self,
        amount: Amount,
        currency: &str,
        _receipt: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PaymentIntent {
            intent_id: format!("intent_{n}"),
            client_secret: "rzp_test_key".into(),
            amount,
            currency: currency.to_string(),
        })
    }
}

/// Returns the same text for every screenshot, and counts how often it was asked.
#[derive(Clone, Default)]
pub struct FakeOcr {
    pub text: Arc<std::sync::Mutex<String>>,
    pub calls: Arc<AtomicU64>,
}

impl FakeOcr {
    pub fn set_text(&self, text: &str) {
        *self.text.lock().unwrap() = text.to_string();
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for FakeOcr {
    async fn extract_text(&self, _image: &[u8]) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.lock().unwrap().clone())
    }
}

#[derive(Clone, Default)]
pub struct FakeAssets;

impl AssetStore for FakeAssets {
    async fn fetch_asset(&self, _asset_ref: &str) -> Result<Vec<u8>, AssetError> {
        Ok(b"png".to_vec())
    }
}

pub type TestVerifier = StandardProofVerifier<FakeOcr, FakeAssets>;
pub type TestCheckoutApi = CheckoutApi<SqliteDatabase, FakeGateway, TestVerifier>;

pub struct TestSystem {
    pub url: String,
    pub db: SqliteDatabase,
    pub ocr: FakeOcr,
    pub carts: CartApi<SqliteDatabase>,
    pub checkout: TestCheckoutApi,
    pub admin: LedgerAdminApi<SqliteDatabase>,
}

impl TestSystem {
    pub async fn new() -> Self {
        Self::with_producers(EventProducers::default()).await
    }

    pub async fn with_producers(producers: EventProducers) -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 8).await.expect("Error creating database");
        let ocr = FakeOcr::default();
        let verifier = StandardProofVerifier::new(Secret::from(GATEWAY_SECRET), ocr.clone(), FakeAssets);
        let checkout = CheckoutApi::new(db.clone(), FakeGateway::default(), verifier, producers, "INR");
        Self {
            url,
            carts: CartApi::new(db.clone()),
            admin: LedgerAdminApi::new(db.clone()),
            db,
            ocr,
            checkout,
        }
    }

    /// Creates the merchant if needed, prices the item and puts `stock` units on the shelf.
    pub async fn stock_item(&self, merchant: &str, item: &str, price: i64, stock: i64) {
        let merchant_id = MerchantId::from(merchant);
        if !self.db_has_merchant(&merchant_id).await {
            self.admin
                .upsert_merchant(NewMerchant::new(merchant, MerchantKind::Stall, format!("Stall {merchant}")))
                .await
                .expect("Error creating merchant");
        }
        let item_id = ItemId::from(item);
        self.admin
            .upsert_catalog_item(NewCatalogItem::new(merchant, item, item.to_uppercase(), Amount::from(price)))
            .await
            .expect("Error creating catalog item");
        if stock > 0 {
            self.admin.restock(&merchant_id, &item_id, stock).await.expect("Error restocking");
        }
    }

    async fn db_has_merchant(&self, merchant: &MerchantId) -> bool {
        use fest_engine::traits::CatalogManagement;
        self.db.fetch_merchant(merchant).await.expect("Error fetching merchant").is_some()
    }

    pub async fn available(&self, merchant: &str, item: &str) -> i64 {
        self.admin
            .inventory(&MerchantId::from(merchant), &ItemId::from(item))
            .await
            .expect("Error fetching inventory")
            .map(|r| r.available_count)
            .unwrap_or_default()
    }

    pub async fn add_to_cart(&self, user: &str, merchant: &str, item: &str, qty: i64) {
        self.carts
            .add_item(&UserId::from(user), &MerchantId::from(merchant), &ItemId::from(item), qty)
            .await
            .expect("Error adding to cart");
    }

    /// Creates an intent for the user's current cart, and returns a validly signed gateway proof for it.
    pub async fn signed_gateway_proof(&self, user: &str, merchant: &str, payment_id: &str) -> PaymentProof {
        let intent = self
            .checkout
            .create_payment_intent(&UserId::from(user), &MerchantId::from(merchant))
            .await
            .expect("Error creating payment intent");
        let signature =
            gateway_signature(&intent.intent_id, payment_id, &Secret::from(GATEWAY_SECRET)).expect("Bad key");
        PaymentProof::Gateway(GatewayProof {
            intent_id: intent.intent_id,
            external_payment_id: payment_id.to_string(),
            signature,
        })
    }

    pub async fn teardown(mut self) {
        use fest_engine::traits::FulfillmentDatabase;
        let _ = self.db.close().await;
        fest_engine::test_utils::prepare_env::drop_database(&self.url).await;
    }
}
