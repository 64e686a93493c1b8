//! `SqliteDatabase` is a concrete implementation of a fulfillment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`] module.
//!
//! [`traits`]: crate::traits
use std::fmt::Debug;

use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{attempts, carts, catalog, db_url, intents, inventory, new_pool, orders, sequences};
use crate::{
    db_types::{
        Cart,
        CartLine,
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

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using `FEST_DATABASE_URL` for the connection string.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        debug!("🗃️ Database migrations are up to date");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Called when finalize backs out without writing anything. A racing request with the same idempotency key may
    /// have committed in the meantime, in which case its order wins over the reason we backed out.
    async fn resolve_backout(
        &self,
        key: &str,
        otherwise: FinalizeResult,
    ) -> Result<FinalizeResult, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        match orders::fetch_order_by_idempotency_key(key, &mut conn).await? {
            Some(order) => {
                debug!("🗃️ Finalize for [{key}] backed out, but order {} already exists for it", order.id);
                Ok(FinalizeResult::AlreadyFinalized(order))
            },
            None => Ok(otherwise),
        }
    }
}

fn same_lines(stored: &[CartLine], verified: &[CartLine]) -> bool {
    let key = |l: &CartLine| (l.item_id.clone(), l.quantity, l.unit_price);
    let mut a = stored.iter().map(key).collect::<Vec<_>>();
    let mut b = verified.iter().map(key).collect::<Vec<_>>();
    a.sort();
    b.sort();
    a == b
}

impl FulfillmentDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn finalize_order(&self, request: FinalizeRequest) -> Result<FinalizeResult, FulfillmentError> {
        if request.lines.is_empty() {
            return Err(FulfillmentError::ValidationError("Cannot finalize an empty cart".into()));
        }
        let total = match request.total_amount() {
            Some(total) if total.is_positive() => total,
            _ => return Err(FulfillmentError::ValidationError("The order total must be a positive amount".into())),
        };
        let key = request.idempotency_key.clone();
        let mut tx = self.pool.begin().await?;
        // The decrements come first, so that this transaction takes the write lock with its very first statement.
        for line in &request.lines {
            let result =
                inventory::decrement_if_available(&request.merchant_id, &line.item_id, line.quantity, &mut tx).await?;
            if result == DecrementResult::Insufficient {
                tx.rollback().await?;
                info!("🗃️ Finalize for [{key}] backed out. {} is out of stock", line.item_id);
                return self.resolve_backout(&key, FinalizeResult::Insufficient(line.item_id.clone())).await;
            }
        }
        trace!("🗃️ Stock reserved for [{key}]");
        if let Some(order) = orders::fetch_order_by_idempotency_key(&key, &mut tx).await? {
            tx.rollback().await?;
            debug!("🗃️ Order {} already exists for [{key}]. Returning it", order.id);
            return Ok(FinalizeResult::AlreadyFinalized(order));
        }
        let stored = carts::fetch_cart_lines(&request.user_id, &request.merchant_id, &mut tx).await?;
        if !same_lines(&stored, &request.lines) {
            tx.rollback().await?;
            info!("🗃️ Finalize for [{key}] backed out. The cart changed after the proof was verified");
            return Ok(FinalizeResult::CartChanged);
        }
        let token = sequences::next_token(&request.merchant_id, &mut tx).await?;
        trace!("🗃️ Token {} issued for [{key}]", token.value);
        let id = match orders::insert_order(&request, token, total, &mut tx).await {
            Ok(id) => id,
            Err(e) => {
                tx.rollback().await?;
                warn!("🗃️ Could not write order for [{key}]. {e}");
                return match self.resolve_backout(&key, FinalizeResult::CartChanged).await? {
                    FinalizeResult::AlreadyFinalized(order) => Ok(FinalizeResult::AlreadyFinalized(order)),
                    _ => Err(e),
                };
            },
        };
        carts::clear_cart(&request.user_id, &request.merchant_id, &mut tx).await?;
        tx.commit().await?;
        info!(
            "🗃️ Order {id} finalized for {} at {} with token {} (epoch {}). Total {total}",
            request.user_id, request.merchant_id, token.value, token.epoch
        );
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(id, &mut conn).await?.ok_or(FulfillmentError::OrderNotFound(id))?;
        Ok(FinalizeResult::Finalized(order))
    }

    async fn record_checkout_attempt(&self, attempt: NewCheckoutAttempt) -> Result<i64, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let id = attempts::insert_attempt(attempt, &mut tx).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn fetch_checkout_attempts(&self, idempotency_key: &str) -> Result<Vec<CheckoutAttempt>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        attempts::fetch_attempts(idempotency_key, &mut conn).await
    }

    async fn insert_payment_intent(&self, intent: PaymentIntentRecord) -> Result<(), FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        intents::insert_payment_intent(intent, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn fetch_payment_intent(&self, intent_id: &str) -> Result<Option<PaymentIntentRecord>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        intents::fetch_payment_intent(intent_id, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), FulfillmentError> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_id(id, &mut conn).await
    }

    async fn fetch_order_by_idempotency_key(&self, key: &str) -> Result<Option<Order>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_idempotency_key(key, &mut conn).await
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        orders::search_orders(query, &mut conn).await
    }

    async fn mark_fulfilled(&self, merchant: &MerchantId, id: OrderId) -> Result<Order, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::mark_fulfilled(merchant, id, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }
}

impl CartManagement for SqliteDatabase {
    async fn add_item(
        &self,
        user: &UserId,
        merchant: &MerchantId,
        item: &ItemId,
        quantity: i64,
    ) -> Result<Cart, CartError> {
        let mut tx = self.pool.begin().await?;
        carts::add_item(user, merchant, item, quantity, &mut tx).await?;
        let cart = carts::fetch_cart(user, merchant, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn change_quantity(
        &self,
        user: &UserId,
        merchant: &MerchantId,
        item: &ItemId,
        delta: i64,
    ) -> Result<Cart, CartError> {
        let mut tx = self.pool.begin().await?;
        carts::change_quantity(user, merchant, item, delta, &mut tx).await?;
        let cart = carts::fetch_cart(user, merchant, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn remove_item(&self, user: &UserId, merchant: &MerchantId, item: &ItemId) -> Result<Cart, CartError> {
        let mut tx = self.pool.begin().await?;
        carts::remove_item(user, merchant, item, &mut tx).await?;
        let cart = carts::fetch_cart(user, merchant, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn clear_cart(&self, user: &UserId, merchant: &MerchantId) -> Result<(), CartError> {
        let mut tx = self.pool.begin().await?;
        carts::clear_cart(user, merchant, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn fetch_cart(&self, user: &UserId, merchant: &MerchantId) -> Result<Cart, CartError> {
        let mut conn = self.pool.acquire().await?;
        carts::fetch_cart(user, merchant, &mut conn).await
    }

    async fn fetch_carts_for_user(&self, user: &UserId) -> Result<Vec<Cart>, CartError> {
        let mut conn = self.pool.acquire().await?;
        carts::fetch_carts_for_user(user, &mut conn).await
    }
}

impl InventoryLedger for SqliteDatabase {
    async fn decrement_if_available(
        &self,
        merchant: &MerchantId,
        item: &ItemId,
        quantity: i64,
    ) -> Result<DecrementResult, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let result = inventory::decrement_if_available(merchant, item, quantity, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn increase_available(
        &self,
        merchant: &MerchantId,
        item: &ItemId,
        quantity: i64,
    ) -> Result<InventoryRecord, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let record = inventory::increase_available(merchant, item, quantity, &mut tx).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn fetch_inventory(
        &self,
        merchant: &MerchantId,
        item: &ItemId,
    ) -> Result<Option<InventoryRecord>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        inventory::fetch_inventory(merchant, item, &mut conn).await
    }
}

impl SequenceIssuer for SqliteDatabase {
    async fn next_token(&self, merchant: &MerchantId) -> Result<IssuedToken, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let token = sequences::next_token(merchant, &mut tx).await?;
        tx.commit().await?;
        Ok(token)
    }

    async fn reset_sequence(&self, merchant: &MerchantId) -> Result<SequenceCounter, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let counter = sequences::reset_sequence(merchant, &mut tx).await?;
        tx.commit().await?;
        Ok(counter)
    }

    async fn fetch_sequence(&self, merchant: &MerchantId) -> Result<Option<SequenceCounter>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        sequences::fetch_sequence(merchant, &mut conn).await
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn upsert_merchant(&self, merchant: NewMerchant) -> Result<Merchant, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let merchant = catalog::upsert_merchant(merchant, &mut tx).await?;
        tx.commit().await?;
        Ok(merchant)
    }

    async fn fetch_merchant(&self, merchant: &MerchantId) -> Result<Option<Merchant>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_merchant(merchant, &mut conn).await
    }

    async fn upsert_catalog_item(&self, item: NewCatalogItem) -> Result<CatalogItem, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let item = catalog::upsert_catalog_item(item, &mut tx).await?;
        tx.commit().await?;
        Ok(item)
    }

    async fn fetch_catalog_item(
        &self,
        merchant: &MerchantId,
        item: &ItemId,
    ) -> Result<Option<CatalogItem>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_catalog_item(merchant, item, &mut conn).await
    }
}
