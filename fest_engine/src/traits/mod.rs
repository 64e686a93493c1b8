//! # Storage backend contracts
//!
//! The traits in this module define what a storage backend must provide for the fulfillment pipeline to run on it.
//! [`SqliteDatabase`](crate::SqliteDatabase) implements all of them.
//!
//! * [`CartManagement`] keeps the per (user, merchant) draft carts.
//! * [`InventoryLedger`] is the single source of truth for remaining stock. Decrements are atomic compare-and-decrement
//!   operations at the storage layer.
//! * [`SequenceIssuer`] mints the per-merchant human tokens.
//! * [`CatalogManagement`] holds merchants and their price lists.
//! * [`OrderManagement`] provides read access to finalized orders and the one-time fulfilment flag.
//! * [`FulfillmentDatabase`] is the highest level contract. It runs the all-or-nothing finalize transaction and keeps
//!   the checkout audit trail and payment intents.
mod cart_management;
mod catalog_management;
mod data_objects;
mod fulfillment_database;
mod inventory_ledger;
mod order_management;
mod sequence_issuer;

pub use cart_management::{CartError, CartManagement};
pub use catalog_management::CatalogManagement;
pub use data_objects::{DecrementResult, FinalizeRequest, FinalizeResult, OrderQueryFilter};
pub use fulfillment_database::{FulfillmentDatabase, FulfillmentError};
pub use inventory_ledger::{InventoryLedger, LedgerError};
pub use order_management::OrderManagement;
pub use sequence_issuer::SequenceIssuer;

/// Everything the administrative ledger operations need from a backend.
pub trait LedgerDatabase: CatalogManagement + InventoryLedger + SequenceIssuer {}

impl<T> LedgerDatabase for T where T: CatalogManagement + InventoryLedger + SequenceIssuer {}
