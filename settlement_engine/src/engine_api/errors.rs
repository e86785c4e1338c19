use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType},
    order_flow::{AmountOverflow, FeeRateError, OrderAction},
    traits::{MarketplaceError, PaymentGatewayError, SettlementDbError},
};

/// The error taxonomy for every lifecycle operation.
///
/// Validation and authorization errors are surfaced unchanged. State and conflict errors are retryable after
/// re-fetching the order. Only `DatabaseError` and `GatewayError` indicate infrastructure trouble.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not authorized: {0}")]
    AuthorizationError(String),
    #[error("Cannot {action} an order that is {status}")]
    InvalidStateError { status: OrderStatusType, action: OrderAction },
    #[error("Order {0} was modified concurrently. Re-fetch it and try again")]
    ConflictError(OrderId),
    #[error("Gateway event could not be verified: {0}")]
    GatewayVerificationError(String),
    #[error("Not found: {0}")]
    NotFoundError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Payment gateway error: {0}")]
    GatewayError(String),
}

impl LifecycleError {
    pub fn invalid_state(status: OrderStatusType, action: OrderAction) -> Self {
        Self::InvalidStateError { status, action }
    }

    pub fn order_not_found(id: OrderId) -> Self {
        Self::NotFoundError(format!("Order {id} does not exist"))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::InvalidStateError { .. } | Self::ConflictError(_))
    }
}

impl From<SettlementDbError> for LifecycleError {
    fn from(e: SettlementDbError) -> Self {
        match e {
            SettlementDbError::OrderNotFound(id) => Self::order_not_found(id),
            SettlementDbError::VersionConflict(id) => Self::ConflictError(id),
            // A second ledger write for the same order lost the race against the first.
            SettlementDbError::LedgerEntryExists(id) => Self::ConflictError(id),
            SettlementDbError::DatabaseError(s) => Self::DatabaseError(s),
        }
    }
}

impl From<MarketplaceError> for LifecycleError {
    fn from(e: MarketplaceError) -> Self {
        match e {
            MarketplaceError::ItemNotFound(id) => Self::ValidationError(format!("Item {id} does not exist")),
            MarketplaceError::PaymentOptionNotFound(id) => {
                Self::ValidationError(format!("Payment option {id} does not exist"))
            },
            MarketplaceError::DeliveryEventNotFound(id) => {
                Self::ValidationError(format!("Delivery event {id} does not exist"))
            },
            MarketplaceError::ShippingOptionNotFound(id) => {
                Self::ValidationError(format!("Shipping option {id} does not exist"))
            },
            MarketplaceError::ServiceUnavailable(s) => Self::DatabaseError(s),
        }
    }
}

impl From<PaymentGatewayError> for LifecycleError {
    fn from(e: PaymentGatewayError) -> Self {
        Self::GatewayError(e.to_string())
    }
}

impl From<FeeRateError> for LifecycleError {
    fn from(e: FeeRateError) -> Self {
        Self::ValidationError(e.to_string())
    }
}

impl From<AmountOverflow> for LifecycleError {
    fn from(e: AmountOverflow) -> Self {
        Self::ValidationError(e.to_string())
    }
}
