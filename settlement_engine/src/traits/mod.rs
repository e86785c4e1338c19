//! # Backend contracts
//!
//! The traits in this module define what the engine needs from the outside world.
//!
//! * [`SettlementDatabase`] stores orders and the settlement ledger. It is the only thing the engine writes to.
//! * [`ItemService`], [`ProfileService`] and [`LocationService`] are read-only views onto the collaborating
//!   marketplace services. [`Marketplace`] bundles them.
//! * [`PaymentGateway`] opens checkout sessions with the card processor.
//!
//! [`SqliteDatabase`](crate::SqliteDatabase) implements the database and marketplace traits.
mod marketplace;
mod payment_gateway;
mod settlement_database;

pub use marketplace::{ItemService, LocationService, Marketplace, MarketplaceError, ProfileService};
pub use payment_gateway::{CheckoutRequest, CheckoutSession, PaymentGateway, PaymentGatewayError};
pub use settlement_database::{SettlementDatabase, SettlementDbError};
