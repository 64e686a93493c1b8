//! Request handler definitions
//!
//! Define each route and its handler here. Handlers are thin: they pull the caller's claims, the path and the body
//! out of the request, call one engine API method and serialize the result. Anything longer belongs in the engine.
//!
//! Since each worker thread processes its requests sequentially, handlers must never block the current thread. Every
//! database, gateway and OCR call is asynchronous.
//!
//! | Route | Roles |
//! |---|---|
//! | `GET /whoami` | any |
//! | `GET /cart`, `GET /cart/{merchant_id}` | User |
//! | `POST /cart/{merchant_id}/items` | User |
//! | `PATCH`, `DELETE /cart/{merchant_id}/items/{item_id}` | User |
//! | `DELETE /cart/{merchant_id}` | User |
//! | `POST /checkout/{merchant_id}/intent`, `POST /checkout` | User |
//! | `GET /orders`, `GET /orders/{order_id}` | User |
//! | `GET /merchant/{merchant_id}/orders` | Staff of the merchant, Admin |
//! | `POST /merchant/{merchant_id}/orders/{order_id}/fulfil` | Staff of the merchant, Admin |
//! | `GET /merchant/{merchant_id}/items/{item_id}/inventory` | Staff of the merchant, Admin |
//! | `PUT /admin/merchants/{merchant_id}` | Admin |
//! | `PUT /admin/merchants/{merchant_id}/items/{item_id}` | Admin |
//! | `POST /admin/merchants/{merchant_id}/items/{item_id}/restock` | Admin |
//! | `POST /admin/merchants/{merchant_id}/sequence/reset` | Admin |
use actix_web::{get, web, HttpResponse, Responder};
use fest_engine::{
    db_types::{ItemId, MerchantId, OrderId},
    proofs::{PaymentGateway, ProofVerifier},
    traits::{CartManagement, FulfillmentDatabase, LedgerDatabase, OrderManagement},
    CartApi,
    CheckoutApi,
    LedgerAdminApi,
    OrderQueryApi,
};
use log::*;

use crate::{
    auth::{IdentityClaims, Role},
    data_objects::{
        AddItemRequest,
        CatalogItemUpsert,
        ChangeQuantityRequest,
        CheckoutBody,
        MerchantOrdersQuery,
        MerchantUpsert,
        RestockRequest,
    },
    errors::{AuthError, ServerError},
};

// actix-web cannot register generic handlers directly, so each route gets a small service factory from `route!`.
// Every route is wrapped in the ACL middleware; a caller needs at least one of the listed roles.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
            impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+ where requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().body("👍️\n")
}

fn ensure_can_manage(claims: &IdentityClaims, merchant: &MerchantId) -> Result<(), ServerError> {
    if claims.can_manage(merchant) {
        Ok(())
    } else {
        warn!("💻️ {} tried to act on behalf of {merchant}", claims.user_id);
        let msg = format!("{} is not staff at {merchant}", claims.user_id);
        Err(AuthError::InsufficientPermissions(msg).into())
    }
}

//----------------------------------------------   Carts  ----------------------------------------------------
route!(my_carts => Get "/cart" impl CartManagement where requires [Role::User]);
/// All of the caller's non-empty carts, one per merchant.
pub async fn my_carts<B: CartManagement>(
    claims: IdentityClaims,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET carts for {}", claims.user_id);
    let carts = api.carts(&claims.user_id).await?;
    Ok(HttpResponse::Ok().json(carts))
}

route!(my_cart => Get "/cart/{merchant_id}" impl CartManagement where requires [Role::User]);
/// The caller's cart at one merchant. A cart that was never touched comes back empty.
pub async fn my_cart<B: CartManagement>(
    claims: IdentityClaims,
    path: web::Path<MerchantId>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant = path.into_inner();
    debug!("💻️ GET cart for {} at {merchant}", claims.user_id);
    let cart = api.cart(&claims.user_id, &merchant).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(add_to_cart => Post "/cart/{merchant_id}/items" impl CartManagement where requires [Role::User]);
pub async fn add_to_cart<B: CartManagement>(
    claims: IdentityClaims,
    path: web::Path<MerchantId>,
    body: web::Json<AddItemRequest>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant = path.into_inner();
    let AddItemRequest { item_id, quantity } = body.into_inner();
    debug!("💻️ POST add {quantity} x {item_id} to cart for {} at {merchant}", claims.user_id);
    let cart = api.add_item(&claims.user_id, &merchant, &item_id, quantity).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(change_cart_quantity => Patch "/cart/{merchant_id}/items/{item_id}" impl CartManagement where requires [Role::User]);
pub async fn change_cart_quantity<B: CartManagement>(
    claims: IdentityClaims,
    path: web::Path<(MerchantId, ItemId)>,
    body: web::Json<ChangeQuantityRequest>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (merchant, item) = path.into_inner();
    let delta = body.into_inner().delta;
    debug!("💻️ PATCH {item} by {delta} in cart for {} at {merchant}", claims.user_id);
    let cart = api.change_quantity(&claims.user_id, &merchant, &item, delta).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(remove_from_cart => Delete "/cart/{merchant_id}/items/{item_id}" impl CartManagement where requires [Role::User]);
pub async fn remove_from_cart<B: CartManagement>(
    claims: IdentityClaims,
    path: web::Path<(MerchantId, ItemId)>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (merchant, item) = path.into_inner();
    debug!("💻️ DELETE {item} from cart for {} at {merchant}", claims.user_id);
    let cart = api.remove_item(&claims.user_id, &merchant, &item).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(clear_cart => Delete "/cart/{merchant_id}" impl CartManagement where requires [Role::User]);
pub async fn clear_cart<B: CartManagement>(
    claims: IdentityClaims,
    path: web::Path<MerchantId>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant = path.into_inner();
    debug!("💻️ DELETE cart for {} at {merchant}", claims.user_id);
    let cart = api.clear_cart(&claims.user_id, &merchant).await?;
    Ok(HttpResponse::Ok().json(cart))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(create_intent => Post "/checkout/{merchant_id}/intent" impl FulfillmentDatabase, PaymentGateway, ProofVerifier where requires [Role::User]);
/// Creates a gateway payment intent for the caller's current cart total at the merchant.
pub async fn create_intent<B, G, V>(
    claims: IdentityClaims,
    path: web::Path<MerchantId>,
    api: web::Data<CheckoutApi<B, G, V>>,
) -> Result<HttpResponse, ServerError>
where
    B: FulfillmentDatabase,
    G: PaymentGateway,
    V: ProofVerifier,
{
    let merchant = path.into_inner();
    debug!("💻️ POST payment intent for {} at {merchant}", claims.user_id);
    let intent = api.create_payment_intent(&claims.user_id, &merchant).await?;
    Ok(HttpResponse::Ok().json(intent))
}

route!(checkout => Post "/checkout" impl FulfillmentDatabase, PaymentGateway, ProofVerifier where requires [Role::User]);
/// Submits a payment proof for the caller's cart at a merchant.
///
/// On success the response carries the order id and the human token to show at the counter. Resubmitting the same
/// payment returns the same order with `"duplicate": true`.
pub async fn checkout<B, G, V>(
    claims: IdentityClaims,
    body: web::Json<CheckoutBody>,
    api: web::Data<CheckoutApi<B, G, V>>,
) -> Result<HttpResponse, ServerError>
where
    B: FulfillmentDatabase,
    G: PaymentGateway,
    V: ProofVerifier,
{
    let request = body.into_inner().into_request(claims.user_id);
    debug!("💻️ POST checkout for {} at {} ({})", request.user_id, request.merchant_id, request.proof.kind());
    let receipt = api.checkout(request).await?;
    Ok(HttpResponse::Ok().json(receipt))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(my_orders => Get "/orders" impl OrderManagement where requires [Role::User]);
pub async fn my_orders<B: OrderManagement>(
    claims: IdentityClaims,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders for {}", claims.user_id);
    let orders = api.orders_for_user(&claims.user_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(my_order => Get "/orders/{order_id}" impl OrderManagement where requires [Role::User]);
/// One of the caller's orders. Orders that belong to someone else are reported as not found.
pub async fn my_order<B: OrderManagement>(
    claims: IdentityClaims,
    path: web::Path<i64>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId(path.into_inner());
    debug!("💻️ GET order {id} for {}", claims.user_id);
    let order = api
        .order_for_user(&claims.user_id, id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {id}")))?;
    Ok(HttpResponse::Ok().json(order))
}

route!(merchant_orders => Get "/merchant/{merchant_id}/orders" impl OrderManagement where requires [Role::Staff, Role::Admin]);
/// Orders at a merchant, optionally filtered with `?fulfilled=true|false`.
pub async fn merchant_orders<B: OrderManagement>(
    claims: IdentityClaims,
    path: web::Path<MerchantId>,
    query: web::Query<MerchantOrdersQuery>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant = path.into_inner();
    ensure_can_manage(&claims, &merchant)?;
    debug!("💻️ GET orders at {merchant} ({query:?})");
    let orders = api.orders_for_merchant(&merchant, query.fulfilled).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(fulfil_order => Post "/merchant/{merchant_id}/orders/{order_id}/fulfil" impl OrderManagement where requires [Role::Staff, Role::Admin]);
/// Marks the order as handed over at the counter. Succeeds only once per order.
pub async fn fulfil_order<B: OrderManagement>(
    claims: IdentityClaims,
    path: web::Path<(MerchantId, i64)>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (merchant, id) = path.into_inner();
    ensure_can_manage(&claims, &merchant)?;
    let id = OrderId(id);
    info!("💻️ POST fulfil order {id} at {merchant} by {}", claims.user_id);
    let order = api.mark_fulfilled(&merchant, id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(item_inventory => Get "/merchant/{merchant_id}/items/{item_id}/inventory" impl LedgerDatabase where requires [Role::Staff, Role::Admin]);
pub async fn item_inventory<B: LedgerDatabase>(
    claims: IdentityClaims,
    path: web::Path<(MerchantId, ItemId)>,
    api: web::Data<LedgerAdminApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (merchant, item) = path.into_inner();
    ensure_can_manage(&claims, &merchant)?;
    debug!("💻️ GET inventory of {item} at {merchant}");
    let record = api
        .inventory(&merchant, &item)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Inventory for {item} at {merchant}")))?;
    Ok(HttpResponse::Ok().json(record))
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(upsert_merchant => Put "/admin/merchants/{merchant_id}" impl LedgerDatabase where requires [Role::Admin]);
pub async fn upsert_merchant<B: LedgerDatabase>(
    path: web::Path<MerchantId>,
    body: web::Json<MerchantUpsert>,
    api: web::Data<LedgerAdminApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant = body.into_inner().into_new_merchant(path.into_inner());
    info!("💻️ PUT merchant {} ({})", merchant.id, merchant.name);
    let merchant = api.upsert_merchant(merchant).await?;
    Ok(HttpResponse::Ok().json(merchant))
}

route!(upsert_catalog_item => Put "/admin/merchants/{merchant_id}/items/{item_id}" impl LedgerDatabase where requires [Role::Admin]);
pub async fn upsert_catalog_item<B: LedgerDatabase>(
    path: web::Path<(MerchantId, ItemId)>,
    body: web::Json<CatalogItemUpsert>,
    api: web::Data<LedgerAdminApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (merchant, item) = path.into_inner();
    let item = body.into_inner().into_new_item(merchant, item);
    info!("💻️ PUT catalog item {} at {} for {}", item.item_id, item.merchant_id, item.unit_price);
    let item = api.upsert_catalog_item(item).await?;
    Ok(HttpResponse::Ok().json(item))
}

route!(restock_item => Post "/admin/merchants/{merchant_id}/items/{item_id}/restock" impl LedgerDatabase where requires [Role::Admin]);
pub async fn restock_item<B: LedgerDatabase>(
    path: web::Path<(MerchantId, ItemId)>,
    body: web::Json<RestockRequest>,
    api: web::Data<LedgerAdminApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (merchant, item) = path.into_inner();
    let quantity = body.into_inner().quantity;
    info!("💻️ POST restock {item} at {merchant} by {quantity}");
    let record = api.restock(&merchant, &item, quantity).await?;
    Ok(HttpResponse::Ok().json(record))
}

route!(reset_sequence => Post "/admin/merchants/{merchant_id}/sequence/reset" impl LedgerDatabase where requires [Role::Admin]);
/// Starts a new token epoch at the merchant. Tokens count up from 1 again.
pub async fn reset_sequence<B: LedgerDatabase>(
    claims: IdentityClaims,
    path: web::Path<MerchantId>,
    api: web::Data<LedgerAdminApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let merchant = path.into_inner();
    warn!("💻️ POST reset token sequence at {merchant} by {}", claims.user_id);
    let counter = api.reset_sequence(&merchant).await?;
    Ok(HttpResponse::Ok().json(counter))
}

//----------------------------------------------   Identity  ----------------------------------------------------
route!(whoami => Get "/whoami" requires [Role::User, Role::Staff, Role::Admin]);
/// Echoes the verified claims back. Handy for checking an identity provider integration.
pub async fn whoami(claims: IdentityClaims) -> HttpResponse {
    trace!("💻️ GET whoami for {}", claims.user_id);
    HttpResponse::Ok().json(claims)
}
