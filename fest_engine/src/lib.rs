//! # Fest order fulfillment engine
//!
//! The engine turns a buyer's cart at a fest merchant (an event selling tickets, or a food stall) into an immutable
//! order with a small sequential token that staff can call out at the counter.
//!
//! The library is split in three:
//! 1. Storage contracts ([`mod@traits`]) and the SQLite backend ([`SqliteDatabase`]). Inventory decrements and token
//!    issuance are atomic statements in the database, so the invariants hold across any number of server workers.
//! 2. Proof of payment ([`mod@proofs`]): gateway signature checks, screenshot OCR matching and counter cash.
//! 3. The public API ([`CartApi`], [`CheckoutApi`], [`OrderQueryApi`], [`LedgerAdminApi`]).
//!
//! Finalized orders are announced through the [`mod@events`] hooks.
pub mod db_types;
pub mod events;
mod fest_api;
pub mod proofs;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use fest_api::{
    cart_api::CartApi,
    checkout_api::CheckoutApi,
    checkout_objects::{CheckoutReceipt, CheckoutRequest},
    errors::CheckoutError,
    ledger_admin_api::LedgerAdminApi,
    order_query_api::OrderQueryApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::{db::db_url, SqliteDatabase};
