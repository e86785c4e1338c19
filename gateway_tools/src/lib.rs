mod api;
mod config;
mod data_objects;
mod error;

pub use api::GatewayApi;
pub use config::GatewayConfig;
pub use data_objects::{CheckoutSessionResponse, NewCheckoutSession};
pub use error::GatewayApiError;
