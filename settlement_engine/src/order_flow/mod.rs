//! Pure lifecycle logic: fees, payment rails, two-party confirmations and the order transition table.
//!
//! Nothing in here touches the database. The API layer loads an order, applies one of these transitions and writes
//! the result back under an optimistic version check.
mod confirmation;
mod fees;
mod rails;
mod state_machine;

pub use confirmation::{verify_party, ConfirmOutcome, Confirmable, ConfirmationPair, Delivery, Party, PartyClaim, Payment};
pub use fees::{AmountOverflow, FeeCalculator, FeeRate, FeeRateError, SettlementAmounts, BASIS_POINTS_PER_UNIT};
pub use rails::{PaymentRail, RailRegistry, RailRegistryError, SettlementSignal, SignalOutcome};
pub use state_machine::OrderAction;

#[cfg(test)]
pub(crate) use state_machine::test::sample_order;
