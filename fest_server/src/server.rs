use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use fest_engine::{
    events::{EventHandlers, EventProducers},
    proofs::{HttpAssetStore, HttpOcrEngine, HttpPaymentGateway, StandardProofVerifier},
    CartApi,
    CheckoutApi,
    LedgerAdminApi,
    OrderQueryApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    middleware::IdentityMiddlewareFactory,
    notifier::WebhookNotifier,
    routes::{
        health,
        AddToCartRoute,
        ChangeCartQuantityRoute,
        CheckoutRoute,
        ClearCartRoute,
        CreateIntentRoute,
        FulfilOrderRoute,
        ItemInventoryRoute,
        MerchantOrdersRoute,
        MyCartRoute,
        MyCartsRoute,
        MyOrderRoute,
        MyOrdersRoute,
        RemoveFromCartRoute,
        ResetSequenceRoute,
        RestockItemRoute,
        UpsertCatalogItemRoute,
        UpsertMerchantRoute,
        WhoamiRoute,
    },
};

pub type FestVerifier = StandardProofVerifier<HttpOcrEngine, HttpAssetStore>;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Database migration failed. {e}")))?;
    let notifier = WebhookNotifier::new(config.notify_webhook_url.clone())?;
    let handlers = EventHandlers::new(config.event_buffer_size, notifier.hooks());
    let producers = handlers.producers();
    handlers.start_handlers();
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn build_verifier(config: &ServerConfig) -> Result<FestVerifier, ServerError> {
    let ocr = HttpOcrEngine::new(&config.ocr.url, &config.ocr.api_key)
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let assets = HttpAssetStore::new(&config.ocr.asset_base_url, config.ocr.timeout)
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let verifier = StandardProofVerifier::new(config.gateway.key_secret.clone(), ocr, assets)
        .with_timeout(config.ocr.timeout)
        .with_counter_cash(config.allow_counter_cash);
    debug!("🧾 Proof verifier ready: {verifier:?}");
    Ok(verifier)
}

/// Request bodies that cannot be parsed get the same structured error body as every other failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into())
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let gateway =
        HttpPaymentGateway::new(config.gateway.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let verifier = build_verifier(&config)?;
    let srv = HttpServer::new(move || {
        let cart_api = CartApi::new(db.clone());
        let checkout_api =
            CheckoutApi::new(db.clone(), gateway.clone(), verifier.clone(), producers.clone(), &config.currency);
        let orders_api = OrderQueryApi::new(db.clone(), producers.clone());
        let admin_api = LedgerAdminApi::new(db.clone());
        let identity = IdentityMiddlewareFactory::new(config.identity.secret.clone(), config.identity.checks);
        let api_scope = web::scope("/api")
            .wrap(identity)
            .service(WhoamiRoute::new())
            .service(MyCartsRoute::<SqliteDatabase>::new())
            .service(MyCartRoute::<SqliteDatabase>::new())
            .service(AddToCartRoute::<SqliteDatabase>::new())
            .service(ChangeCartQuantityRoute::<SqliteDatabase>::new())
            .service(RemoveFromCartRoute::<SqliteDatabase>::new())
            .service(ClearCartRoute::<SqliteDatabase>::new())
            .service(CreateIntentRoute::<SqliteDatabase, HttpPaymentGateway, FestVerifier>::new())
            .service(CheckoutRoute::<SqliteDatabase, HttpPaymentGateway, FestVerifier>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(MyOrderRoute::<SqliteDatabase>::new())
            .service(MerchantOrdersRoute::<SqliteDatabase>::new())
            .service(FulfilOrderRoute::<SqliteDatabase>::new())
            .service(ItemInventoryRoute::<SqliteDatabase>::new())
            .service(UpsertMerchantRoute::<SqliteDatabase>::new())
            .service(UpsertCatalogItemRoute::<SqliteDatabase>::new())
            .service(RestockItemRoute::<SqliteDatabase>::new())
            .service(ResetSequenceRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("fest::access_log"))
            .app_data(json_config())
            .app_data(web::Data::new(cart_api))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(admin_api))
            .service(health)
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
