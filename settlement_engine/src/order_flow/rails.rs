use std::{collections::HashMap, fmt::Display, str::FromStr};

use log::*;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::{
    db_types::{Order, OrderStatusType},
    engine_api::errors::LifecycleError,
    order_flow::{ConfirmOutcome, OrderAction, PartyClaim},
};

/// How money reaches the seller for a given order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentRail {
    /// Settled by the card-payment gateway. Only a verified webhook can mark the order as paid.
    Automated,
    /// Bank transfer outside the platform. Settled once buyer and seller have both confirmed the transfer.
    Manual,
}

impl PaymentRail {
    pub fn requires_webhook(&self) -> bool {
        matches!(self, Self::Automated)
    }

    pub fn requires_mutual_confirmation(&self) -> bool {
        matches!(self, Self::Manual)
    }

    /// Applies a settlement signal to `order`, following the rules of this rail.
    ///
    /// When the outcome is [`SignalOutcome::Settle`], the order has been moved to `Paid` in memory and the caller must
    /// persist it together with its ledger entry. Every other outcome leaves the status alone.
    pub fn on_settlement_signal(
        &self,
        order: &mut Order,
        signal: SettlementSignal<'_>,
    ) -> Result<SignalOutcome, LifecycleError> {
        match (self, signal) {
            (Self::Automated, SettlementSignal::GatewayPayment { session_ref }) => {
                if order.checkout_session_ref.as_deref() != Some(session_ref) {
                    return Err(LifecycleError::ValidationError(format!(
                        "Session {session_ref} does not belong to order {}",
                        order.id
                    )));
                }
                match order.status {
                    s if s.is_settled() => Ok(SignalOutcome::AlreadySettled),
                    OrderStatusType::AwaitingPayment => {
                        order.mark_paid()?;
                        Ok(SignalOutcome::Settle)
                    },
                    s => {
                        info!("💸️ Ignoring payment for order {} because it is {s}", order.id);
                        Ok(SignalOutcome::Unchanged)
                    },
                }
            },
            (Self::Manual, SettlementSignal::PartyConfirmation(claim)) => {
                let mut pair = order.payment();
                if order.status.is_settled() && pair.is_confirmed_by(claim.party()) {
                    return Ok(SignalOutcome::AlreadySettled);
                }
                order.guard(OrderAction::ConfirmPayment)?;
                let outcome = pair.confirm(&claim);
                order.set_payment(pair);
                match outcome {
                    ConfirmOutcome::AlreadyConfirmed => Ok(SignalOutcome::Unchanged),
                    ConfirmOutcome::Recorded => Ok(SignalOutcome::Recorded),
                    ConfirmOutcome::Completed => {
                        order.mark_paid()?;
                        Ok(SignalOutcome::Settle)
                    },
                }
            },
            (Self::Automated, SettlementSignal::PartyConfirmation(_)) => Err(LifecycleError::ValidationError(format!(
                "Order {} is paid through the payment gateway and cannot be confirmed manually",
                order.id
            ))),
            (Self::Manual, SettlementSignal::GatewayPayment { .. }) => Err(LifecycleError::ValidationError(format!(
                "Order {} uses the manual rail and cannot be settled by the gateway",
                order.id
            ))),
        }
    }
}

impl Display for PaymentRail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentRail::Automated => write!(f, "automated"),
            PaymentRail::Manual => write!(f, "manual"),
        }
    }
}

impl FromStr for PaymentRail {
    type Err = RailRegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "automated" => Ok(Self::Automated),
            "manual" => Ok(Self::Manual),
            other => Err(RailRegistryError::UnknownRail(other.to_string())),
        }
    }
}

/// Something that may move an order to `Paid`.
#[derive(Debug, Clone, Copy)]
pub enum SettlementSignal<'a> {
    /// A verified `payment.succeeded` webhook for the given checkout session.
    GatewayPayment { session_ref: &'a str },
    /// The buyer or seller confirms that the bank transfer happened.
    PartyConfirmation(PartyClaim),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// The order just became paid. Write the ledger entry.
    Settle,
    /// A confirmation flag changed, but the order is still awaiting payment.
    Recorded,
    /// Nothing changed.
    Unchanged,
    /// The order had already been settled.
    AlreadySettled,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RailRegistryError {
    #[error("Unknown payment rail: {0}. Use 'automated' or 'manual'")]
    UnknownRail(String),
    #[error("Invalid rail mapping '{0}'. Expected kind=rail")]
    InvalidMapping(String),
}

/// Maps payment-option kinds onto payment rails.
#[derive(Debug, Clone)]
pub struct RailRegistry {
    rails: HashMap<String, PaymentRail>,
}

impl Default for RailRegistry {
    fn default() -> Self {
        let rails = [
            ("card", PaymentRail::Automated),
            ("credit_card", PaymentRail::Automated),
            ("debit_card", PaymentRail::Automated),
            ("bank_transfer", PaymentRail::Manual),
            ("iban", PaymentRail::Manual),
            ("manual", PaymentRail::Manual),
        ]
        .into_iter()
        .map(|(k, r)| (k.to_string(), r))
        .collect();
        Self { rails }
    }
}

impl RailRegistry {
    pub fn empty() -> Self {
        Self { rails: HashMap::new() }
    }

    pub fn with_mapping<S: Into<String>>(mut self, kind: S, rail: PaymentRail) -> Self {
        self.rails.insert(kind.into().to_ascii_lowercase(), rail);
        self
    }

    /// Adds the mappings from a `kind=rail,kind2=rail` string on top of the defaults.
    pub fn from_config_str(s: &str) -> Result<Self, RailRegistryError> {
        let mut registry = Self::default();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (kind, rail) = pair.split_once('=').ok_or_else(|| RailRegistryError::InvalidMapping(pair.into()))?;
            let kind = kind.trim();
            if kind.is_empty() {
                return Err(RailRegistryError::InvalidMapping(pair.into()));
            }
            let rail = rail.parse::<PaymentRail>()?;
            registry = registry.with_mapping(kind, rail);
        }
        Ok(registry)
    }

    pub fn rail_for(&self, kind: &str) -> Option<PaymentRail> {
        self.rails.get(&kind.trim().to_ascii_lowercase()).copied()
    }

    pub fn resolve(&self, kind: &str) -> Result<PaymentRail, LifecycleError> {
        self.rail_for(kind)
            .ok_or_else(|| LifecycleError::ValidationError(format!("Payment option kind '{kind}' is not supported")))
    }

    pub fn kinds(&self) -> impl Iterator<Item = (&str, PaymentRail)> {
        self.rails.iter().map(|(k, r)| (k.as_str(), *r))
    }
}
