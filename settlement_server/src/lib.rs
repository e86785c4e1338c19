//! # Marketplace settlement server
//! An actix-web front end for `settlement_engine`. It is responsible for:
//! * Exposing the order lifecycle operations (placement, acceptance, payment and delivery confirmation) over HTTP.
//! * Receiving and verifying card payment webhooks from the payment gateway.
//! * Reading the settlement ledger.
//!
//! Authentication is not handled here. The server expects an upstream layer to identify the caller and pass their
//! profile id on in a header (see [`auth`]).
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `GET /health`: A health check route that returns a 200 OK response.
//! * `POST /webhook/gateway`: Payment gateway events. Must carry a valid signature.
//! * `POST /api/orders`: Place an order.
//! * `GET /api/orders`: Search orders by buyer, seller, status, paid flag and creation date.
//! * `GET /api/orders/{order_id}`: Fetch an order.
//! * `POST /api/orders/{order_id}/accept`, `/reject`, `/cancel`: Seller and buyer decisions.
//! * `POST /api/orders/{order_id}/payment/{buyer|seller}`: Bank transfer confirmations.
//! * `POST /api/orders/{order_id}/delivery/{buyer|seller}`: Delivery confirmations.
//! * `PUT /api/orders/{order_id}/delivery_date`: Change the estimated delivery date.
//! * `POST /api/orders/{order_id}/checkout`: Fetch or open the card checkout session.
//! * `GET /api/orders/{order_id}/ledger`: The ledger entry of a settled order.
//! * `GET /api/sellers/{seller_id}/ledger`: A seller's settlement statement.
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
