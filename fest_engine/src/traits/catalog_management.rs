use crate::{
    db_types::{CatalogItem, ItemId, Merchant, MerchantId, NewCatalogItem, NewMerchant},
    traits::LedgerError,
};

/// Merchants and their price lists. Only what is needed to seed carts and stock is covered here.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn upsert_merchant(&self, merchant: NewMerchant) -> Result<Merchant, LedgerError>;

    async fn fetch_merchant(&self, merchant: &MerchantId) -> Result<Option<Merchant>, LedgerError>;

    /// Creates the item, or updates its name and price. Price changes do not affect lines already in carts.
    async fn upsert_catalog_item(&self, item: NewCatalogItem) -> Result<CatalogItem, LedgerError>;

    async fn fetch_catalog_item(&self, merchant: &MerchantId, item: &ItemId)
        -> Result<Option<CatalogItem>, LedgerError>;
}
