//! The order transition table.
//!
//! ```text
//!   CREATED ──accept──► ACCEPTED ──await_payment──► AWAITING_PAYMENT ──settle──► PAID ──deliver──► COMPLETED
//!      │                   │                              │
//!      ├──reject──► REJECTED                              │
//!      └──────────cancel───┴──────────────────────────────┴──► CANCELLED
//! ```
//!
//! These methods only validate and apply a transition to an in-memory [`Order`]. Persisting the result (with the
//! optimistic version check) is the job of the API layer.
use std::fmt::Display;

use chrono::NaiveDate;
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, OrderStatusType, PaymentOptionId},
    engine_api::errors::LifecycleError,
    order_flow::{ConfirmOutcome, PartyClaim, PaymentRail, SettlementSignal, SignalOutcome},
    traits::CheckoutSession,
};

use OrderStatusType::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    Accept,
    Reject,
    Cancel,
    AwaitPayment,
    InitiateCheckout,
    ConfirmPayment,
    Settle,
    ConfirmDelivery,
    UpdateDeliveryDate,
}

impl OrderAction {
    /// The statuses from which this action may be attempted.
    pub fn allowed_from(&self) -> &'static [OrderStatusType] {
        match self {
            Self::Accept | Self::Reject => &[Created],
            Self::Cancel => &[Created, Accepted, AwaitingPayment],
            Self::AwaitPayment => &[Accepted],
            Self::InitiateCheckout => &[Accepted, AwaitingPayment],
            Self::ConfirmPayment | Self::Settle => &[AwaitingPayment],
            Self::ConfirmDelivery => &[Paid],
            Self::UpdateDeliveryDate => &[Accepted, AwaitingPayment, Paid],
        }
    }

    pub fn is_allowed_from(&self, status: OrderStatusType) -> bool {
        self.allowed_from().contains(&status)
    }
}

impl Display for OrderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
            Self::AwaitPayment => "request payment for",
            Self::InitiateCheckout => "initiate checkout for",
            Self::ConfirmPayment => "confirm payment for",
            Self::Settle => "settle",
            Self::ConfirmDelivery => "confirm delivery for",
            Self::UpdateDeliveryDate => "update the delivery date of",
        };
        f.write_str(s)
    }
}

impl Order {
    pub fn guard(&self, action: OrderAction) -> Result<(), LifecycleError> {
        if action.is_allowed_from(self.status) {
            Ok(())
        } else {
            debug!("🔄️ Refusing to {action} order {} in state {}", self.id, self.status);
            Err(LifecycleError::invalid_state(self.status, action))
        }
    }

    /// CREATED → ACCEPTED. `reassign` carries a replacement payment option and its rail, if the seller picked one.
    pub fn accept(
        &mut self,
        estimated_delivery_date: Option<NaiveDate>,
        reassign: Option<(PaymentOptionId, PaymentRail)>,
    ) -> Result<(), LifecycleError> {
        self.guard(OrderAction::Accept)?;
        if let Some((option, rail)) = reassign {
            debug!("🔄️ Order {} moves from payment option {} to {option} ({rail})", self.id, self.payment_option_id);
            self.selected_payment_option_id = Some(option);
            self.rail = rail;
        }
        if estimated_delivery_date.is_some() {
            self.estimated_delivery_date = estimated_delivery_date;
        }
        self.status = Accepted;
        Ok(())
    }

    pub fn reject(&mut self) -> Result<(), LifecycleError> {
        self.guard(OrderAction::Reject)?;
        self.status = Rejected;
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), LifecycleError> {
        self.guard(OrderAction::Cancel)?;
        self.status = Cancelled;
        Ok(())
    }

    /// ACCEPTED → AWAITING_PAYMENT. Orders on the automated rail must bring their checkout session with them.
    pub fn await_payment(&mut self, session: Option<CheckoutSession>) -> Result<(), LifecycleError> {
        self.guard(OrderAction::AwaitPayment)?;
        match (self.rail, session) {
            (PaymentRail::Automated, None) => {
                return Err(LifecycleError::ValidationError(format!(
                    "Order {} needs a checkout session before it can await payment",
                    self.id
                )));
            },
            (PaymentRail::Automated, Some(session)) => {
                self.checkout_session_ref = Some(session.session_ref);
                self.checkout_url = session.checkout_url;
            },
            (PaymentRail::Manual, _) => {},
        }
        self.status = AwaitingPayment;
        Ok(())
    }

    pub(crate) fn mark_paid(&mut self) -> Result<(), LifecycleError> {
        self.guard(OrderAction::Settle)?;
        self.status = Paid;
        self.paid = true;
        Ok(())
    }

    pub fn apply_settlement_signal(&mut self, signal: SettlementSignal<'_>) -> Result<SignalOutcome, LifecycleError> {
        let rail = self.rail;
        rail.on_settlement_signal(self, signal)
    }

    /// Records a delivery confirmation. The order completes when the second party confirms.
    pub fn confirm_delivery(&mut self, claim: &PartyClaim) -> Result<ConfirmOutcome, LifecycleError> {
        let mut pair = self.delivery();
        if self.status == Completed && pair.is_confirmed_by(claim.party()) {
            return Ok(ConfirmOutcome::AlreadyConfirmed);
        }
        self.guard(OrderAction::ConfirmDelivery)?;
        let outcome = pair.confirm(claim);
        self.set_delivery(pair);
        if outcome == ConfirmOutcome::Completed {
            self.status = Completed;
        }
        Ok(outcome)
    }

    pub fn update_delivery_date(&mut self, date: NaiveDate) -> Result<(), LifecycleError> {
        self.guard(OrderAction::UpdateDeliveryDate)?;
        self.estimated_delivery_date = Some(date);
        Ok(())
    }
}
