//! Request handler definitions
//!
//! Define each route and its handler here. Handlers should do little more than pull the caller, path and body out
//! of the request and hand them to the engine. Every lifecycle rule lives in `settlement_engine`.
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use settlement_engine::{
    db_types::{OrderId, ProfileId},
    order_flow::Party,
    order_objects::{AcceptOrderRequest, OrderQueryFilter, OrderRequest, WebhookOutcome},
    LedgerApi,
    Marketplace,
    OrderFlowApi,
    PaymentGateway,
    ProfileService,
    SettlementDatabase,
};

use crate::{
    auth::Caller,
    config::ServerOptions,
    data_objects::{DeliveryDateUpdate, OrderSearchParams},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
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
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl SettlementDatabase, Marketplace, PaymentGateway);
/// Places a new order on behalf of the caller, who becomes its buyer.
///
/// Prices, the seller and the payment rail are all resolved by the engine from the catalog. The new order is returned
/// with status `CREATED`.
pub async fn create_order<B, M, G>(
    caller: Caller,
    body: web::Json<OrderRequest>,
    api: web::Data<OrderFlowApi<B, M, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    M: Marketplace,
    G: PaymentGateway,
{
    debug!("💻️ POST new order from {}", caller.profile());
    let order = api.create_order(caller.profile(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(search_orders => Get "/orders" impl SettlementDatabase, Marketplace, PaymentGateway);
/// Lists orders matching the query parameters (see [`OrderSearchParams`]).
///
/// Callers that are not admins only see their own orders, whether or not they filter on themselves.
pub async fn search_orders<B, M, G>(
    caller: Caller,
    query: web::Query<OrderSearchParams>,
    api: web::Data<OrderFlowApi<B, M, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    M: Marketplace,
    G: PaymentGateway,
{
    let filter = OrderQueryFilter::try_from(query.into_inner())?;
    debug!("💻️ GET orders for {}. {filter}", caller.profile());
    let orders = api.list_orders(caller.profile(), filter).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{order_id}" impl SettlementDatabase, Marketplace, PaymentGateway);
pub async fn order_by_id<B, M, G>(
    caller: Caller,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B, M, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    M: Marketplace,
    G: PaymentGateway,
{
    let order_id = path.into_inner();
    debug!("💻️ GET order {order_id} for {}", caller.profile());
    let order = api.fetch_order(caller.profile(), order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(accept_order => Post "/orders/{order_id}/accept" impl SettlementDatabase, Marketplace, PaymentGateway);
/// The seller accepts an order. The body may set an estimated delivery date and move the order onto another of the
/// seller's payment options. Send `{}` to accept as is.
///
/// For card payments the response is usually already `AWAITING_PAYMENT`, with a checkout URL. If the payment gateway
/// could not be reached it is `ACCEPTED`, and `POST /orders/{order_id}/checkout` will try again.
pub async fn accept_order<B, M, G>(
    caller: Caller,
    path: web::Path<OrderId>,
    body: web::Json<AcceptOrderRequest>,
    api: web::Data<OrderFlowApi<B, M, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    M: Marketplace,
    G: PaymentGateway,
{
    let order_id = path.into_inner();
    debug!("💻️ POST accept order {order_id} by {}", caller.profile());
    let order = api.accept_order(caller.profile(), order_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(reject_order => Post "/orders/{order_id}/reject" impl SettlementDatabase, Marketplace, PaymentGateway);
pub async fn reject_order<B, M, G>(
    caller: Caller,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B, M, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    M: Marketplace,
    G: PaymentGateway,
{
    let order_id = path.into_inner();
    debug!("💻️ POST reject order {order_id} by {}", caller.profile());
    let order = api.reject_order(caller.profile(), order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Post "/orders/{order_id}/cancel" impl SettlementDatabase, Marketplace, PaymentGateway);
pub async fn cancel_order<B, M, G>(
    caller: Caller,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B, M, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    M: Marketplace,
    G: PaymentGateway,
{
    let order_id = path.into_inner();
    debug!("💻️ POST cancel order {order_id} by {}", caller.profile());
    let order = api.cancel_order(caller.profile(), order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(confirm_delivery => Post "/orders/{order_id}/delivery/{party}" impl SettlementDatabase, Marketplace, PaymentGateway);
/// Records that `party` (`buyer` or `seller`) confirms the goods changed hands. The caller must be that party.
pub async fn confirm_delivery<B, M, G>(
    caller: Caller,
    path: web::Path<(OrderId, Party)>,
    api: web::Data<OrderFlowApi<B, M, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    M: Marketplace,
    G: PaymentGateway,
{
    let (order_id, party) = path.into_inner();
    debug!("💻️ POST delivery confirmation for order {order_id} as {party} by {}", caller.profile());
    let order = api.confirm_delivery(caller.profile(), order_id, party).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(confirm_payment => Post "/orders/{order_id}/payment/{party}" impl SettlementDatabase, Marketplace, PaymentGateway);
/// Records that `party` confirms the bank transfer for a manual-rail order. The second confirmation settles it.
pub async fn confirm_payment<B, M, G>(
    caller: Caller,
    path: web::Path<(OrderId, Party)>,
    api: web::Data<OrderFlowApi<B, M, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    M: Marketplace,
    G: PaymentGateway,
{
    let (order_id, party) = path.into_inner();
    debug!("💻️ POST payment confirmation for order {order_id} as {party} by {}", caller.profile());
    let order = api.confirm_payment(caller.profile(), order_id, party).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_delivery_date => Put "/orders/{order_id}/delivery_date" impl SettlementDatabase, Marketplace, PaymentGateway);
pub async fn update_delivery_date<B, M, G>(
    caller: Caller,
    path: web::Path<OrderId>,
    body: web::Json<DeliveryDateUpdate>,
    api: web::Data<OrderFlowApi<B, M, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    M: Marketplace,
    G: PaymentGateway,
{
    let order_id = path.into_inner();
    let date = body.into_inner().estimated_delivery_date;
    debug!("💻️ PUT delivery date {date} on order {order_id} by {}", caller.profile());
    let order = api.update_delivery_date(caller.profile(), order_id, date).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(initiate_checkout => Post "/orders/{order_id}/checkout" impl SettlementDatabase, Marketplace, PaymentGateway);
/// Returns the checkout session for a card-paid order, opening it first if acceptance could not.
pub async fn initiate_checkout<B, M, G>(
    caller: Caller,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B, M, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    M: Marketplace,
    G: PaymentGateway,
{
    let order_id = path.into_inner();
    debug!("💻️ POST checkout for order {order_id} by {}", caller.profile());
    let result = api.initiate_checkout(caller.profile(), order_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Ledger  ----------------------------------------------------
route!(ledger_entry_for_order => Get "/orders/{order_id}/ledger" impl SettlementDatabase, ProfileService);
pub async fn ledger_entry_for_order<B, P>(
    caller: Caller,
    path: web::Path<OrderId>,
    api: web::Data<LedgerApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    P: ProfileService,
{
    let order_id = path.into_inner();
    debug!("💻️ GET ledger entry for order {order_id} by {}", caller.profile());
    let entry = api.entry_for_order(caller.profile(), order_id).await?;
    Ok(HttpResponse::Ok().json(entry))
}

route!(seller_statement => Get "/sellers/{seller_id}/ledger" impl SettlementDatabase, ProfileService);
/// Every settlement paid out to a seller, with gross, fee and net totals.
pub async fn seller_statement<B, P>(
    caller: Caller,
    path: web::Path<ProfileId>,
    api: web::Data<LedgerApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    P: ProfileService,
{
    let seller_id = path.into_inner();
    debug!("💻️ GET ledger for {seller_id} by {}", caller.profile());
    let statement = api.statement_for_seller(caller.profile(), seller_id).await?;
    Ok(HttpResponse::Ok().json(statement))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(gateway_webhook => Post "/webhook/gateway" impl SettlementDatabase, Marketplace, PaymentGateway);
/// Receives events from the card payment gateway.
///
/// The body is handed to the engine as raw bytes, since the signature covers the exact payload. Responses:
/// * `200` when the event was applied or needed no action. The gateway should not redeliver it.
/// * `400` when the signature or payload is bad. Nothing was changed.
/// * `409` when the order was being modified at the same moment. The gateway should redeliver.
pub async fn gateway_webhook<B, M, G>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<OrderFlowApi<B, M, G>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    M: Marketplace,
    G: PaymentGateway,
{
    trace!("💻️ Received gateway webhook ({} bytes)", body.len());
    let signature = req.headers().get(options.webhook_signature_header.as_str()).and_then(|v| v.to_str().ok());
    let outcome = api.handle_gateway_webhook(&body, signature).await?;
    match &outcome {
        WebhookOutcome::Settled { order, .. } => info!("💻️ Gateway webhook settled order {}", order.id),
        WebhookOutcome::Acknowledged { reason } => debug!("💻️ Gateway webhook acknowledged. {reason}"),
    }
    Ok(HttpResponse::Ok().json(outcome))
}
