use fest_engine::{
    db_types::{Amount, ItemId, MerchantId, MerchantKind, NewCatalogItem, NewMerchant, UserId},
    proofs::PaymentProof,
    CheckoutRequest,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItemRequest {
    pub item_id: ItemId,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeQuantityRequest {
    pub delta: i64,
}

/// The body of `POST /checkout`.
///
/// The proof is flattened, so the JSON reads
/// `{"merchant_id": "...", "proof_kind": "manual", "proof_payload": {...}, "idempotency_key": "...", "client_total": 200}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutBody {
    pub merchant_id: MerchantId,
    #[serde(flatten)]
    pub proof: PaymentProof,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    /// Ignored for pricing. Only logged when it disagrees with the cart.
    #[serde(default)]
    pub client_total: Option<Amount>,
}

impl CheckoutBody {
    pub fn into_request(self, user_id: UserId) -> CheckoutRequest {
        CheckoutRequest {
            user_id,
            merchant_id: self.merchant_id,
            proof: self.proof,
            idempotency_key: self.idempotency_key,
            client_total: self.client_total,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MerchantOrdersQuery {
    pub fulfilled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantUpsert {
    pub kind: MerchantKind,
    pub name: String,
}

impl MerchantUpsert {
    pub fn into_new_merchant(self, id: MerchantId) -> NewMerchant {
        NewMerchant { id, kind: self.kind, name: self.name }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItemUpsert {
    pub name: String,
    pub unit_price: Amount,
}

impl CatalogItemUpsert {
    pub fn into_new_item(self, merchant_id: MerchantId, item_id: ItemId) -> NewCatalogItem {
        NewCatalogItem { merchant_id, item_id, name: self.name, unit_price: self.unit_price }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestockRequest {
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Into<String>>(message: S) -> Self {
        Self { success: true, message: message.into() }
    }
}
