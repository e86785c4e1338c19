use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use settlement_engine::{
    events::EventProducers,
    helpers::WebhookVerifier,
    order_flow::FeeCalculator,
    LedgerApi,
    OrderFlowApi,
    SettlementApi,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::{gateway::GatewayClient, notifications::create_notification_handlers},
    routes::{
        health,
        AcceptOrderRoute,
        CancelOrderRoute,
        ConfirmDeliveryRoute,
        ConfirmPaymentRoute,
        CreateOrderRoute,
        GatewayWebhookRoute,
        InitiateCheckoutRoute,
        LedgerEntryForOrderRoute,
        OrderByIdRoute,
        RejectOrderRoute,
        SearchOrdersRoute,
        SellerStatementRoute,
        UpdateDeliveryDateRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.webhook_secret.is_empty() {
        warn!("🚀️ No webhook secret is configured. Card payments cannot settle until MSE_WEBHOOK_SECRET is set");
    }
    let gateway =
        GatewayClient::new(config.gateway.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_notification_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, gateway, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Malformed JSON bodies are reported in the same `{"error": ...}` shape as every other error.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        debug!("💻️ Rejecting request body. {err}");
        ServerError::InvalidRequestBody(err.to_string()).into()
    })
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: GatewayClient,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let fees = FeeCalculator::new(config.platform_fee);
    let verifier = WebhookVerifier::new(config.webhook_secret.clone());
    info!("🚀️ Platform fee is {} and orders are priced in {}", fees.rate(), config.currency);
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let settlement = SettlementApi::new(db.clone(), gateway.clone(), fees, verifier.clone(), producers.clone());
        let orders_api = OrderFlowApi::new(
            db.clone(),
            db.clone(),
            settlement,
            config.rails.clone(),
            config.currency.clone(),
            producers.clone(),
        );
        let ledger_api = LedgerApi::new(db.clone(), db.clone());
        let api_scope = web::scope("/api")
            .service(CreateOrderRoute::<SqliteDatabase, SqliteDatabase, GatewayClient>::new())
            .service(SearchOrdersRoute::<SqliteDatabase, SqliteDatabase, GatewayClient>::new())
            .service(OrderByIdRoute::<SqliteDatabase, SqliteDatabase, GatewayClient>::new())
            .service(AcceptOrderRoute::<SqliteDatabase, SqliteDatabase, GatewayClient>::new())
            .service(RejectOrderRoute::<SqliteDatabase, SqliteDatabase, GatewayClient>::new())
            .service(CancelOrderRoute::<SqliteDatabase, SqliteDatabase, GatewayClient>::new())
            .service(ConfirmDeliveryRoute::<SqliteDatabase, SqliteDatabase, GatewayClient>::new())
            .service(ConfirmPaymentRoute::<SqliteDatabase, SqliteDatabase, GatewayClient>::new())
            .service(UpdateDeliveryDateRoute::<SqliteDatabase, SqliteDatabase, GatewayClient>::new())
            .service(InitiateCheckoutRoute::<SqliteDatabase, SqliteDatabase, GatewayClient>::new())
            .service(LedgerEntryForOrderRoute::<SqliteDatabase, SqliteDatabase>::new())
            .service(SellerStatementRoute::<SqliteDatabase, SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mse::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(ledger_api))
            .app_data(web::Data::new(config.options.clone()))
            .app_data(json_config())
            .service(health)
            .service(GatewayWebhookRoute::<SqliteDatabase, SqliteDatabase, GatewayClient>::new())
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
