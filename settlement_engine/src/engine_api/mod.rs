//! # Settlement engine public API
//!
//! * [`order_flow_api`] drives an order from creation to completion. It is the API most callers want.
//! * [`settlement_api`] opens checkout sessions, verifies gateway webhooks and writes ledger entries. `OrderFlowApi`
//!   embeds one, but it can be used on its own, e.g. by a dedicated webhook receiver.
//! * [`ledger_api`] reads the settlement ledger.
//!
//! Every API is generic over the backend traits it needs, so the same code runs against SQLite in production and
//! against mocks in tests:
//!
//! ```rust,ignore
//! let db = SqliteDatabase::new_with_url("sqlite://data/marketplace.db", 5).await?;
//! let settlement = SettlementApi::new(db.clone(), gateway, fees, verifier, producers.clone());
//! let api = OrderFlowApi::new(db.clone(), db, settlement, RailRegistry::default(), "EUR".into(), producers);
//! let order = api.create_order(buyer, request).await?;
//! ```
pub mod errors;
pub mod ledger_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod settlement_api;
