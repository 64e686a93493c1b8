//! # Fulfillment pipeline public API
//!
//! Each API wraps a storage backend implementing the traits it needs, so that callers can pick the pieces they want:
//!
//! * [`cart_api`] manages the per (user, merchant) draft carts.
//! * [`checkout_api`] verifies proofs of payment and turns carts into orders.
//! * [`order_query_api`] gives buyers and merchant staff read access to orders, plus the one-time fulfilment flag.
//! * [`ledger_admin_api`] is for administrators: merchants, catalog prices, restocking and token sequence resets.
//!
//! ```rust,ignore
//! use fest_engine::{CartApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/fest.db", 5).await?;
//! let api = CartApi::new(db);
//! let cart = api.add_item(&user, &merchant, &item, 2).await?;
//! ```
pub mod cart_api;
pub mod checkout_api;
pub mod checkout_objects;
pub mod errors;
pub mod ledger_admin_api;
pub mod order_query_api;
