//! Moves accepted orders to payment and turns payment signals into ledger entries.
//!
//! Two kinds of signal can settle an order:
//! * a verified `payment.succeeded` webhook from the card gateway (automated rail), or
//! * the second of the buyer's and seller's transfer confirmations (manual rail).
//!
//! Either way, settling is one database transaction that flips the order to `PAID` under its version check and appends
//! the ledger entry. The unique ledger index on `order_id` backs this up, so a replayed or racing signal can never
//! produce a second entry.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{LedgerEntry, NewLedgerEntry, Order, OrderStatusType},
    engine_api::errors::LifecycleError,
    events::{EventProducers, OrderPaidEvent},
    helpers::{checkout_idempotency_key, WebhookVerifier},
    order_flow::{
        AmountOverflow,
        FeeCalculator,
        OrderAction,
        PartyClaim,
        PaymentRail,
        SettlementAmounts,
        SettlementSignal,
        SignalOutcome,
    },
    order_objects::{
        CheckoutResult,
        GatewayEvent,
        WebhookOutcome,
        PAYMENT_FAILED,
        PAYMENT_SUCCEEDED,
        SESSION_EXPIRED,
    },
    traits::{CheckoutRequest, CheckoutSession, PaymentGateway, SettlementDatabase},
};

pub struct SettlementApi<B, G> {
    db: B,
    gateway: G,
    fees: FeeCalculator,
    verifier: WebhookVerifier,
    producers: EventProducers,
}

impl<B, G> Debug for SettlementApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi (fee rate {})", self.fees.rate())
    }
}

impl<B: Clone, G: Clone> Clone for SettlementApi<B, G> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            gateway: self.gateway.clone(),
            fees: self.fees,
            verifier: self.verifier.clone(),
            producers: self.producers.clone(),
        }
    }
}

impl<B, G> SettlementApi<B, G> {
    pub fn new(db: B, gateway: G, fees: FeeCalculator, verifier: WebhookVerifier, producers: EventProducers) -> Self {
        Self { db, gateway, fees, verifier, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn fees(&self) -> &FeeCalculator {
        &self.fees
    }

    /// Gross, fee and net for `order`, from the prices snapshotted on its lines plus shipping.
    pub fn settlement_amounts(&self, order: &Order) -> Result<SettlementAmounts, AmountOverflow> {
        self.fees.settle(order.lines.iter().map(|l| (l.unit_price, l.quantity)), order.shipping_price)
    }
}

impl<B, G> SettlementApi<B, G>
where
    B: SettlementDatabase,
    G: PaymentGateway,
{
    /// ACCEPTED → AWAITING_PAYMENT.
    ///
    /// Manual-rail orders move straight away. Automated-rail orders first get a checkout session from the gateway. If
    /// the gateway fails, the order is left `ACCEPTED` and the error is returned so that the caller can retry through
    /// [`initiate_checkout`](Self::initiate_checkout).
    pub async fn begin_payment(&self, mut order: Order) -> Result<Order, LifecycleError> {
        order.guard(OrderAction::AwaitPayment)?;
        let session = match order.rail {
            PaymentRail::Manual => None,
            PaymentRail::Automated => Some(self.open_session(&order).await?),
        };
        order.await_payment(session)?;
        match self.db.update_order(&order).await {
            Ok(order) => {
                info!("💸️ Order {} is awaiting payment on the {} rail", order.id, order.rail);
                Ok(order)
            },
            Err(e) => {
                let e = LifecycleError::from(e);
                if matches!(e, LifecycleError::ConflictError(_)) {
                    return self.session_already_opened(&order).await;
                }
                Err(e)
            },
        }
    }

    /// Returns the checkout session for an automated-rail order, opening one first if needed.
    ///
    /// Safe to call any number of times. An order that is already `AWAITING_PAYMENT` gets its stored session back
    /// without a gateway round trip.
    pub async fn initiate_checkout(&self, order: Order) -> Result<CheckoutResult, LifecycleError> {
        if !order.rail.requires_webhook() {
            return Err(LifecycleError::ValidationError(format!(
                "Order {} is paid by bank transfer and has no checkout session",
                order.id
            )));
        }
        order.guard(OrderAction::InitiateCheckout)?;
        let order = match order.status {
            OrderStatusType::AwaitingPayment => order,
            _ => self.begin_payment(order).await?,
        };
        let session = stored_session(&order).ok_or_else(|| {
            error!("💸️ Order {} is awaiting payment on the automated rail but has no checkout session", order.id);
            LifecycleError::DatabaseError(format!("Order {} has no checkout session", order.id))
        })?;
        Ok(CheckoutResult { order, session })
    }

    async fn open_session(&self, order: &Order) -> Result<CheckoutSession, LifecycleError> {
        let amounts = self.settlement_amounts(order)?;
        let request = CheckoutRequest {
            order_id: order.id,
            amount: amounts.gross,
            currency: order.currency.clone(),
            idempotency_key: checkout_idempotency_key(order.id),
        };
        debug!("💸️ Requesting checkout session for order {} ({} {})", order.id, amounts.gross, order.currency);
        let session = self.gateway.create_checkout_session(request).await.map_err(|e| {
            warn!("💸️ Could not open a checkout session for order {}: {e}", order.id);
            LifecycleError::from(e)
        })?;
        info!("💸️ Checkout session {} opened for order {}", session.session_ref, order.id);
        Ok(session)
    }

    /// Someone else wrote the order while we were opening its session. Because the idempotency key is derived from
    /// the order id, they can only have stored the same session.
    async fn session_already_opened(&self, order: &Order) -> Result<Order, LifecycleError> {
        let current = self.db.fetch_order(order.id).await?.ok_or_else(|| LifecycleError::order_not_found(order.id))?;
        if current.status == OrderStatusType::AwaitingPayment {
            debug!("💸️ Order {} was moved to payment concurrently", current.id);
            Ok(current)
        } else {
            Err(LifecycleError::ConflictError(order.id))
        }
    }

    /// Handles a raw webhook delivery from the gateway.
    ///
    /// The signature is checked against the exact bytes received before anything is parsed. Unverified events are
    /// rejected without touching the database.
    pub async fn handle_webhook(&self, body: &[u8], signature: Option<&str>) -> Result<WebhookOutcome, LifecycleError> {
        self.verifier.verify(body, signature).map_err(|e| {
            warn!("🔐️ Rejecting gateway webhook: {e}");
            LifecycleError::GatewayVerificationError(e.to_string())
        })?;
        let event: GatewayEvent = serde_json::from_slice(body).map_err(|e| {
            warn!("💸️ Verified webhook has an unreadable body: {e}");
            LifecycleError::ValidationError(format!("Malformed webhook payload: {e}"))
        })?;
        debug!("💸️ Verified gateway event {} of type {}", event.id, event.event_type);
        match event.event_type.as_str() {
            PAYMENT_SUCCEEDED => self.process_payment_succeeded(event).await,
            PAYMENT_FAILED | SESSION_EXPIRED => {
                info!(
                    "💸️ Gateway reports {} for session {}. The order keeps waiting for payment",
                    event.event_type, event.data.session_ref
                );
                Ok(acknowledge(format!("{} noted", event.event_type)))
            },
            other => {
                debug!("💸️ Ignoring gateway event type {other}");
                Ok(acknowledge(format!("event type {other} ignored")))
            },
        }
    }

    async fn process_payment_succeeded(&self, event: GatewayEvent) -> Result<WebhookOutcome, LifecycleError> {
        let session_ref = event.data.session_ref.as_str();
        let mut order = self.db.fetch_order_by_session(session_ref).await?.ok_or_else(|| {
            warn!("💸️ Payment event {} refers to unknown checkout session {session_ref}", event.id);
            LifecycleError::NotFoundError(format!("No order has checkout session {session_ref}"))
        })?;
        if order.status != OrderStatusType::AwaitingPayment {
            info!("💸️ Payment event {} for order {} ignored. The order is {}", event.id, order.id, order.status);
            return Ok(acknowledge(format!("order {} is {}", order.id, order.status)));
        }
        let amounts = self.settlement_amounts(&order)?;
        if event.data.amount != Some(amounts.gross) {
            warn!(
                "💸️ Payment event {} for order {} carries amount {:?}, but the order total is {}",
                event.id, order.id, event.data.amount, amounts.gross
            );
            return Err(LifecycleError::ValidationError(format!(
                "Paid amount does not match the order total of {}",
                amounts.gross
            )));
        }
        let currency_matches =
            event.data.currency.as_deref().map(|c| c.eq_ignore_ascii_case(&order.currency)).unwrap_or(false);
        if !currency_matches {
            warn!("💸️ Payment event {} for order {} is in the wrong currency {:?}", event.id, order.id, event.data.currency);
            return Err(LifecycleError::ValidationError(format!("Payment must be made in {}", order.currency)));
        }
        match order.apply_settlement_signal(SettlementSignal::GatewayPayment { session_ref })? {
            SignalOutcome::Settle => match self.persist_settlement(&order).await {
                Ok((order, ledger_entry)) => Ok(WebhookOutcome::Settled { order, ledger_entry }),
                Err(LifecycleError::ConflictError(id)) => {
                    let current = self.db.fetch_order(id).await?.ok_or_else(|| LifecycleError::order_not_found(id))?;
                    if current.status.is_settled() {
                        info!("💸️ Order {id} was settled by a concurrent delivery of the same event");
                        Ok(acknowledge(format!("order {id} is already paid")))
                    } else {
                        Err(LifecycleError::ConflictError(id))
                    }
                },
                Err(e) => Err(e),
            },
            outcome => Ok(acknowledge(format!("order {} unchanged ({outcome:?})", order.id))),
        }
    }

    /// Applies a buyer or seller transfer confirmation on a manual-rail order. The second confirmation settles it.
    pub async fn confirm_manual_payment(&self, mut order: Order, claim: PartyClaim) -> Result<Order, LifecycleError> {
        match order.apply_settlement_signal(SettlementSignal::PartyConfirmation(claim))? {
            SignalOutcome::Settle => {
                let (order, _) = self.persist_settlement(&order).await?;
                Ok(order)
            },
            SignalOutcome::Recorded => {
                let order = self.db.update_order(&order).await?;
                debug!("💸️ {} confirmed the transfer for order {}", claim.party(), order.id);
                Ok(order)
            },
            SignalOutcome::Unchanged | SignalOutcome::AlreadySettled => Ok(order),
        }
    }

    /// Writes the `PAID` order and its ledger entry in one transaction, then notifies subscribers.
    async fn persist_settlement(&self, order: &Order) -> Result<(Order, LedgerEntry), LifecycleError> {
        let amounts = self.settlement_amounts(order)?;
        let entry = NewLedgerEntry {
            order_id: order.id,
            seller_id: order.seller_id,
            rail: order.rail,
            gross: amounts.gross,
            fee: amounts.fee,
            net: amounts.net,
            currency: order.currency.clone(),
        };
        let (order, ledger_entry) = self.db.settle_order(order, entry).await?;
        info!(
            "💸️ Order {} is paid. Gross {} {}, platform fee {}, seller receives {}",
            order.id, ledger_entry.gross, ledger_entry.currency, ledger_entry.fee, ledger_entry.net
        );
        let event = OrderPaidEvent { order: order.clone(), ledger_entry: ledger_entry.clone() };
        self.producers.publish_order_paid(event).await;
        Ok((order, ledger_entry))
    }
}

fn stored_session(order: &Order) -> Option<CheckoutSession> {
    order
        .checkout_session_ref
        .as_ref()
        .map(|session_ref| CheckoutSession { session_ref: session_ref.clone(), checkout_url: order.checkout_url.clone() })
}

fn acknowledge(reason: String) -> WebhookOutcome {
    WebhookOutcome::Acknowledged { reason }
}
