use fest_engine::{
    db_types::{
        Amount,
        Cart,
        CatalogItem,
        CheckoutAttempt,
        InventoryRecord,
        IssuedToken,
        ItemId,
        Merchant,
        MerchantId,
        NewCatalogItem,
        NewCheckoutAttempt,
        NewMerchant,
        Order,
        OrderId,
        PaymentIntentRecord,
        SequenceCounter,
        UserId,
    },
    proofs::{
        CounterCashProof,
        GatewayError,
        GatewayProof,
        ManualProof,
        PaymentGateway,
        PaymentIntent,
        ProofVerifier,
        VerificationOutcome,
    },
    traits::{
        CartError,
        CartManagement,
        CatalogManagement,
        DecrementResult,
        FinalizeRequest,
        FinalizeResult,
        FulfillmentDatabase,
        FulfillmentError,
        InventoryLedger,
        LedgerError,
        OrderManagement,
        OrderQueryFilter,
        SequenceIssuer,
    },
};
use mockall::mock;

mock! {
    pub CartManager {}
    impl CartManagement for CartManager {
        async fn add_item(&self, user: &UserId, merchant: &MerchantId, item: &ItemId, quantity: i64) -> Result<Cart, CartError>;
        async fn change_quantity(&self, user: &UserId, merchant: &MerchantId, item: &ItemId, delta: i64) -> Result<Cart, CartError>;
        async fn remove_item(&self, user: &UserId, merchant: &MerchantId, item: &ItemId) -> Result<Cart, CartError>;
        async fn clear_cart(&self, user: &UserId, merchant: &MerchantId) -> Result<(), CartError>;
        async fn fetch_cart(&self, user: &UserId, merchant: &MerchantId) -> Result<Cart, CartError>;
        async fn fetch_carts_for_user(&self, user: &UserId) -> Result<Vec<Cart>, CartError>;
    }
}

mock! {
    pub OrderManager {}
    impl OrderManagement for OrderManager {
        async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, FulfillmentError>;
        async fn fetch_order_by_idempotency_key(&self, key: &str) -> Result<Option<Order>, FulfillmentError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, FulfillmentError>;
        async fn mark_fulfilled(&self, merchant: &MerchantId, id: OrderId) -> Result<Order, FulfillmentError>;
    }
}

mock! {
    pub LedgerManager {}
    impl CatalogManagement for LedgerManager {
        async fn upsert_merchant(&self, merchant: NewMerchant) -> Result<Merchant, LedgerError>;
        async fn fetch_merchant(&self, merchant: &MerchantId) -> Result<Option<Merchant>, LedgerError>;
        async fn upsert_catalog_item(&self, item: NewCatalogItem) -> Result<CatalogItem, LedgerError>;
        async fn fetch_catalog_item(&self, merchant: &MerchantId, item: &ItemId) -> Result<Option<CatalogItem>, LedgerError>;
    }
    impl InventoryLedger for LedgerManager {
        async fn decrement_if_available(&self, merchant: &MerchantId, item: &ItemId, quantity: i64) -> Result<DecrementResult, LedgerError>;
        async fn increase_available(&self, merchant: &MerchantId, item: &ItemId, quantity: i64) -> Result<InventoryRecord, LedgerError>;
        async fn fetch_inventory(&self, merchant: &MerchantId, item: &ItemId) -> Result<Option<InventoryRecord>, LedgerError>;
    }
    impl SequenceIssuer for LedgerManager {
        async fn next_token(&self, merchant: &MerchantId) -> Result<IssuedToken, LedgerError>;
        async fn reset_sequence(&self, merchant: &MerchantId) -> Result<SequenceCounter, LedgerError>;
        async fn fetch_sequence(&self, merchant: &MerchantId) -> Result<Option<SequenceCounter>, LedgerError>;
    }
}

mock! {
    pub FulfillmentDb {}
    impl Clone for FulfillmentDb {
        fn clone(&self) -> Self;
    }
    impl CartManagement for FulfillmentDb {
        async fn add_item(&self, user: &UserId, merchant: &MerchantId, item: &ItemId, quantity: i64) -> Result<Cart, CartError>;
        async fn change_quantity(&self, user: &UserId, merchant: &MerchantId, item: &ItemId, delta: i64) -> Result<Cart, CartError>;
        async fn remove_item(&self, user: &UserId, merchant: &MerchantId, item: &ItemId) -> Result<Cart, CartError>;
        async fn clear_cart(&self, user: &UserId, merchant: &MerchantId) -> Result<(), CartError>;
        async fn fetch_cart(&self, user: &UserId, merchant: &MerchantId) -> Result<Cart, CartError>;
        async fn fetch_carts_for_user(&self, user: &UserId) -> Result<Vec<Cart>, CartError>;
    }
    impl OrderManagement for FulfillmentDb {
        async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, FulfillmentError>;
        async fn fetch_order_by_idempotency_key(&self, key: &str) -> Result<Option<Order>, FulfillmentError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, FulfillmentError>;
        async fn mark_fulfilled(&self, merchant: &MerchantId, id: OrderId) -> Result<Order, FulfillmentError>;
    }
    impl FulfillmentDatabase for FulfillmentDb {
        fn url(&self) -> &str;
        async fn finalize_order(&self, request: FinalizeRequest) -> Result<FinalizeResult, FulfillmentError>;
        async fn record_checkout_attempt(&self, attempt: NewCheckoutAttempt) -> Result<i64, FulfillmentError>;
        async fn fetch_checkout_attempts(&self, idempotency_key: &str) -> Result<Vec<CheckoutAttempt>, FulfillmentError>;
        async fn insert_payment_intent(&self, intent: PaymentIntentRecord) -> Result<(), FulfillmentError>;
        async fn fetch_payment_intent(&self, intent_id: &str) -> Result<Option<PaymentIntentRecord>, FulfillmentError>;
        async fn close(&mut self) -> Result<(), FulfillmentError>;
    }
}

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn create_intent(&self, amount: Amount, currency: &str, receipt: &str) -> Result<PaymentIntent, GatewayError>;
    }
}

mock! {
    pub Verifier {}
    impl ProofVerifier for Verifier {
        async fn verify_gateway(&self, proof: &GatewayProof) -> VerificationOutcome;
        async fn verify_manual(&self, proof: &ManualProof) -> VerificationOutcome;
        async fn verify_counter_cash(&self, proof: &CounterCashProof) -> VerificationOutcome;
    }
}
