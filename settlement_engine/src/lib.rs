//! Marketplace Settlement Engine
//!
//! The engine coordinates an order between one buyer and one seller, from placement through acceptance, payment and
//! delivery, and guarantees that money moves exactly once per order. It is provider-agnostic: storage, the marketplace
//! services and the card gateway are all reached through traits.
//!
//! The library is divided into these sections:
//! 1. The lifecycle rules ([`mod@order_flow`]): fees, payment rails, two-party confirmations and the order state
//!    machine. These are pure and never touch storage.
//! 2. Backend contracts ([`mod@traits`]) and the bundled SQLite backend ([`SqliteDatabase`]). You should not need to
//!    query the database directly. The data types it stores are defined in [`mod@db_types`] and are public.
//! 3. The public API ([`OrderFlowApi`], [`SettlementApi`], [`LedgerApi`]). Each one is generic over the backends it
//!    needs.
//!
//! The engine also emits events when orders change state (see [`mod@events`]). Hooks registered there run on their
//! own tokio tasks and never hold up a transition.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod order_flow;
pub mod traits;

mod engine_api;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(all(feature = "test_utils", feature = "sqlite"))]
pub mod test_utils;

pub use engine_api::{
    errors::LifecycleError,
    ledger_api::{LedgerApi, SellerStatement},
    order_flow_api::OrderFlowApi,
    order_objects,
    settlement_api::SettlementApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    ItemService,
    LocationService,
    Marketplace,
    PaymentGateway,
    ProfileService,
    SettlementDatabase,
};
