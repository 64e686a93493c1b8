//! Data types shared by the storage backends and the public API.
use std::fmt::Display;

use chrono::{DateTime, Utc};
pub use fest_common::Amount;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

use crate::traits::CartError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

//--------------------------------------     Identifiers     ---------------------------------------------------------
string_id!(
    /// An event (for ticket sales) or a stall (for food sales). Every cart, inventory record and token sequence is
    /// scoped to a merchant.
    MerchantId
);
string_id!(
    /// A sellable item: a ticket tier for events, a menu item for stalls.
    ItemId
);
string_id!(
    /// The user id as asserted by the external identity provider.
    UserId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i64> for OrderId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

//--------------------------------------      Merchant       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MerchantKind {
    /// Sells ticket tiers for an event
    Event,
    /// Sells food and merchandise at a stall
    Stall,
}

impl Display for MerchantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MerchantKind::Event => write!(f, "EVENT"),
            MerchantKind::Stall => write!(f, "STALL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Merchant {
    pub id: MerchantId,
    pub kind: MerchantKind,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMerchant {
    pub id: MerchantId,
    pub kind: MerchantKind,
    pub name: String,
}

impl NewMerchant {
    pub fn new<M: Into<MerchantId>, S: Into<String>>(id: M, kind: MerchantKind, name: S) -> Self {
        Self { id: id.into(), kind, name: name.into() }
    }
}

//--------------------------------------     CatalogItem     ---------------------------------------------------------
/// The price list entry for an item. Cart lines snapshot `unit_price` when the item is first added.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CatalogItem {
    pub merchant_id: MerchantId,
    pub item_id: ItemId,
    pub name: String,
    pub unit_price: Amount,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCatalogItem {
    pub merchant_id: MerchantId,
    pub item_id: ItemId,
    pub name: String,
    pub unit_price: Amount,
}

impl NewCatalogItem {
    pub fn new<M, I, S>(merchant_id: M, item_id: I, name: S, unit_price: Amount) -> Self
    where
        M: Into<MerchantId>,
        I: Into<ItemId>,
        S: Into<String>,
    {
        Self { merchant_id: merchant_id.into(), item_id: item_id.into(), name: name.into(), unit_price }
    }
}

//--------------------------------------        Cart         ---------------------------------------------------------
/// The most units of a single item one cart line may hold.
pub const MAX_LINE_QUANTITY: i64 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CartLine {
    pub merchant_id: MerchantId,
    pub item_id: ItemId,
    pub name: String,
    pub unit_price: Amount,
    pub quantity: i64,
    pub updated_at: DateTime<Utc>,
}

impl CartLine {
    /// `None` if the line total does not fit in an [`Amount`].
    pub fn line_total(&self) -> Option<Amount> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// A user's draft order with a single merchant.
///
/// The total is derived from the line snapshots whenever a `Cart` is built, and there is no way to set it
/// independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cart {
    pub user_id: UserId,
    pub merchant_id: MerchantId,
    pub lines: Vec<CartLine>,
    total_price: Amount,
}

impl Cart {
    pub fn new(user_id: UserId, merchant_id: MerchantId, lines: Vec<CartLine>) -> Result<Self, CartError> {
        let total_price = lines_total(&lines)
            .ok_or_else(|| CartError::ValidationError(format!("The cart total at {merchant_id} is too large")))?;
        Ok(Self { user_id, merchant_id, lines, total_price })
    }

    pub fn empty(user_id: UserId, merchant_id: MerchantId) -> Self {
        Self { user_id, merchant_id, lines: vec![], total_price: Amount::default() }
    }

    pub fn total_price(&self) -> Amount {
        self.total_price
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, item_id: &ItemId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.item_id == item_id)
    }
}

/// The sum of the line totals, or `None` on overflow.
pub fn lines_total(lines: &[CartLine]) -> Option<Amount> {
    lines.iter().try_fold(Amount::default(), |total, line| total.checked_add(line.line_total()?))
}

//--------------------------------------   InventoryRecord   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub merchant_id: MerchantId,
    pub item_id: ItemId,
    pub available_count: i64,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------   SequenceCounter   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SequenceCounter {
    pub merchant_id: MerchantId,
    pub current_value: i64,
    /// Incremented on every reset, so that tokens issued before and after a reset can be told apart.
    pub epoch: i64,
    pub updated_at: DateTime<Utc>,
}

/// A freshly minted human token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct IssuedToken {
    pub value: i64,
    pub epoch: i64,
}

//--------------------------------------   Proof metadata    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum ProofKind {
    Gateway,
    Manual,
    CounterCash,
}

impl Display for ProofKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProofKind::Gateway => write!(f, "gateway"),
            ProofKind::Manual => write!(f, "manual"),
            ProofKind::CounterCash => write!(f, "counter_cash"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    /// Proof has been submitted but not yet checked
    Pending,
    /// Signature or OCR match succeeded (or counter cash was accepted)
    Verified,
    /// The proof was checked and does not hold up
    Rejected,
    /// The proof could not be checked because a collaborator failed
    Error,
}

impl Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationStatus::Pending => write!(f, "PENDING"),
            VerificationStatus::Verified => write!(f, "VERIFIED"),
            VerificationStatus::Rejected => write!(f, "REJECTED"),
            VerificationStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// The stages a checkout attempt moves through.
///
/// `Initiated → ProofSubmitted → {Verified | Rejected | Error}`, and then, for verified proofs only,
/// `InventoryReserved → TokenIssued → OrderPersisted → CartCleared`. The last four happen inside a single storage
/// transaction, so an observer only ever sees an attempt stop at `Verified` or reach `CartCleared`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutState {
    Initiated,
    ProofSubmitted,
    Verified,
    Rejected,
    Error,
    InventoryReserved,
    TokenIssued,
    OrderPersisted,
    CartCleared,
}

impl Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CheckoutState::Initiated => "INITIATED",
            CheckoutState::ProofSubmitted => "PROOF_SUBMITTED",
            CheckoutState::Verified => "VERIFIED",
            CheckoutState::Rejected => "REJECTED",
            CheckoutState::Error => "ERROR",
            CheckoutState::InventoryReserved => "INVENTORY_RESERVED",
            CheckoutState::TokenIssued => "TOKEN_ISSUED",
            CheckoutState::OrderPersisted => "ORDER_PERSISTED",
            CheckoutState::CartCleared => "CART_CLEARED",
        };
        f.write_str(s)
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderLine {
    pub item_id: ItemId,
    pub name: String,
    pub unit_price: Amount,
    pub quantity: i64,
}

impl From<CartLine> for OrderLine {
    fn from(line: CartLine) -> Self {
        Self { item_id: line.item_id, name: line.name, unit_price: line.unit_price, quantity: line.quantity }
    }
}

/// A finalized order. Orders are immutable, except for the one-time `fulfilled` flag set at the counter.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub human_token: i64,
    pub token_epoch: i64,
    pub user_id: UserId,
    pub merchant_id: MerchantId,
    pub total_amount: Amount,
    pub proof_kind: ProofKind,
    pub proof_reference: String,
    pub verification_status: VerificationStatus,
    pub idempotency_key: String,
    pub fulfilled: bool,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub line_items: Vec<OrderLine>,
}

//--------------------------------------    PaymentIntent    ---------------------------------------------------------
/// A payment intent created with the external gateway on behalf of a user.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PaymentIntentRecord {
    pub intent_id: String,
    pub user_id: UserId,
    pub merchant_id: MerchantId,
    pub amount: Amount,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   CheckoutAttempt   ---------------------------------------------------------
/// Audit record of a checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CheckoutAttempt {
    pub id: i64,
    pub idempotency_key: String,
    pub user_id: UserId,
    pub merchant_id: MerchantId,
    pub proof_kind: ProofKind,
    pub verification_status: VerificationStatus,
    pub state: CheckoutState,
    pub reason: Option<String>,
    pub total_amount: Amount,
    pub order_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCheckoutAttempt {
    pub idempotency_key: String,
    pub user_id: UserId,
    pub merchant_id: MerchantId,
    pub proof_kind: ProofKind,
    pub verification_status: VerificationStatus,
    pub state: CheckoutState,
    pub reason: Option<String>,
    pub total_amount: Amount,
    pub order_id: Option<OrderId>,
}
