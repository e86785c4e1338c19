use std::{collections::BTreeMap, fmt::Debug};

use chrono::NaiveDate;
use log::*;

use crate::{
    db_types::{ItemId, NewOrder, NewOrderLine, Order, OrderId, OrderStatusType, PaymentOptionId, ProfileId, StockCheck},
    engine_api::{errors::LifecycleError, settlement_api::SettlementApi},
    events::{
        DeliveryConfirmedEvent,
        DeliveryDateChangedEvent,
        EventProducers,
        OrderAcceptedEvent,
        OrderAnnulledEvent,
        OrderCompletedEvent,
        OrderCreatedEvent,
    },
    order_flow::{verify_party, ConfirmOutcome, OrderAction, Party, PaymentRail, RailRegistry},
    order_objects::{AcceptOrderRequest, CheckoutResult, OrderQueryFilter, OrderRequest, WebhookOutcome},
    traits::{Marketplace, PaymentGateway, SettlementDatabase},
};

/// How many times a commutative operation (a confirmation) is re-read and re-applied after losing an optimistic
/// write race.
const MAX_CONFLICT_RETRIES: usize = 3;

/// `OrderFlowApi` is the entry point for every order lifecycle operation.
///
/// Each mutation loads the order, checks who is asking, applies one transition from the state machine and writes the
/// result back under the order's version. Settlement is delegated to the embedded [`SettlementApi`].
pub struct OrderFlowApi<B, M, G> {
    db: B,
    market: M,
    settlement: SettlementApi<B, G>,
    rails: RailRegistry,
    currency: String,
    producers: EventProducers,
}

impl<B, M, G> Debug for OrderFlowApi<B, M, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({})", self.currency)
    }
}

impl<B, M, G> OrderFlowApi<B, M, G> {
    pub fn new(
        db: B,
        market: M,
        settlement: SettlementApi<B, G>,
        rails: RailRegistry,
        currency: String,
        producers: EventProducers,
    ) -> Self {
        Self { db, market, settlement, rails, currency, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn market(&self) -> &M {
        &self.market
    }

    pub fn settlement(&self) -> &SettlementApi<B, G> {
        &self.settlement
    }

    pub fn rails(&self) -> &RailRegistry {
        &self.rails
    }
}

impl<B, M, G> OrderFlowApi<B, M, G>
where
    B: SettlementDatabase,
    M: Marketplace,
    G: PaymentGateway,
{
    //--------------------------------------   Authorization helpers   ------------------------------------------------
    async fn is_admin(&self, caller: ProfileId) -> Result<bool, LifecycleError> {
        Ok(self.market.is_admin(caller).await?)
    }

    /// Succeeds if `caller` is one of `parties` on the order, or an admin.
    async fn authorize(&self, caller: ProfileId, order: &Order, parties: &[Party]) -> Result<(), LifecycleError> {
        for party in parties {
            let profile = match party {
                Party::Buyer => order.buyer_id,
                Party::Seller => order.seller_id,
            };
            if self.market.is_same_profile(caller, profile).await? {
                return Ok(());
            }
        }
        if self.is_admin(caller).await? {
            debug!("🔄️ Admin {caller} acting on order {}", order.id);
            return Ok(());
        }
        warn!("🔄️ {caller} is not allowed to act on order {}", order.id);
        Err(LifecycleError::AuthorizationError(format!("{caller} may not act on order {}", order.id)))
    }

    /// Succeeds if `caller` owns every item in the order, or is an admin.
    async fn authorize_item_owner(&self, caller: ProfileId, order: &Order) -> Result<(), LifecycleError> {
        let mut owns_all = true;
        for line in &order.lines {
            let owner = self.market.owner_of(line.item_id).await?;
            if !self.market.is_same_profile(caller, owner).await? {
                owns_all = false;
                break;
            }
        }
        if owns_all || self.is_admin(caller).await? {
            Ok(())
        } else {
            warn!("🔄️ {caller} tried to accept order {} without being the seller", order.id);
            Err(LifecycleError::AuthorizationError(format!("Only the seller of order {} may accept it", order.id)))
        }
    }

    async fn load(&self, id: OrderId) -> Result<Order, LifecycleError> {
        self.db.fetch_order(id).await?.ok_or_else(|| LifecycleError::order_not_found(id))
    }

    /// Resolves a payment option for this seller's items and returns its rail.
    async fn resolve_payment_option(
        &self,
        option_id: PaymentOptionId,
        seller: ProfileId,
        accepted_by_items: &[Vec<PaymentOptionId>],
    ) -> Result<PaymentRail, LifecycleError> {
        let option = self.market.payment_option(option_id).await?;
        if !self.market.is_same_profile(option.owner_id, seller).await? {
            return Err(LifecycleError::ValidationError(format!(
                "Payment option {option_id} does not belong to the seller"
            )));
        }
        if accepted_by_items.iter().any(|accepted| !accepted.contains(&option_id)) {
            return Err(LifecycleError::ValidationError(format!(
                "Payment option {option_id} is not accepted for every item in the order"
            )));
        }
        self.rails.resolve(&option.kind)
    }

    //--------------------------------------        Operations          ----------------------------------------------
    /// Places a new order on behalf of `buyer`.
    ///
    /// Unit prices and the shipping price are snapshotted now, so later catalog changes never alter what is settled.
    pub async fn create_order(&self, buyer: ProfileId, request: OrderRequest) -> Result<Order, LifecycleError> {
        request.validate()?;
        let mut seller = None;
        let mut lines = Vec::with_capacity(request.lines.len());
        let mut accepted = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let item = self.market.item(line.item_id).await?;
            match seller {
                None => seller = Some(item.owner_id),
                Some(s) if !self.market.is_same_profile(s, item.owner_id).await? => {
                    return Err(LifecycleError::ValidationError(
                        "All items in an order must belong to the same seller".into(),
                    ));
                },
                Some(_) => {},
            }
            if !item.currency.eq_ignore_ascii_case(&self.currency) {
                return Err(LifecycleError::ValidationError(format!(
                    "Item {} is priced in {}, but the marketplace trades in {}",
                    item.id, item.currency, self.currency
                )));
            }
            lines.push(NewOrderLine { item_id: item.id, quantity: line.quantity, unit_price: item.price });
            accepted.push(item.accepted_payment_options);
        }
        let seller = seller.ok_or_else(|| LifecycleError::ValidationError("An order needs at least one line".into()))?;
        if self.market.is_same_profile(buyer, seller).await? {
            return Err(LifecycleError::ValidationError("You cannot order your own items".into()));
        }
        self.market.delivery_event(request.delivery_event_id).await?;
        let shipping_price = match request.shipping_option_id {
            Some(id) => {
                let option = self.market.shipping_option(id).await?;
                if !self.market.is_same_profile(option.owner_id, seller).await? {
                    return Err(LifecycleError::ValidationError(format!(
                        "Shipping option {id} is not offered by the seller"
                    )));
                }
                option.price
            },
            None => Default::default(),
        };
        let rail = self.resolve_payment_option(request.payment_option_id, seller, &accepted).await?;
        self.settlement.fees().settle(lines.iter().map(|l| (l.unit_price, l.quantity)), shipping_price)?;
        let new_order = NewOrder {
            buyer_id: buyer,
            seller_id: seller,
            lines,
            delivery_event_id: request.delivery_event_id,
            shipping_option_id: request.shipping_option_id,
            home_delivery: request.home_delivery,
            comment: request.comment,
            payment_option_id: request.payment_option_id,
            rail,
            currency: self.currency.clone(),
            shipping_price,
        };
        let order = self.db.insert_order(new_order).await?;
        info!("🔄️ Order {} created by {buyer} for seller {seller} on the {rail} rail", order.id);
        self.producers.publish_order_created(OrderCreatedEvent { order: order.clone() }).await;
        Ok(order)
    }

    /// Fetches an order. Only its buyer, its seller and admins may see it.
    pub async fn fetch_order(&self, caller: ProfileId, id: OrderId) -> Result<Order, LifecycleError> {
        let order = self.load(id).await?;
        self.authorize(caller, &order, &[Party::Buyer, Party::Seller]).await?;
        Ok(order)
    }

    /// Lists orders. Non-admins only ever see orders they take part in: an unrestricted filter is narrowed to the
    /// caller, and a filter on somebody else's orders is refused.
    pub async fn list_orders(&self, caller: ProfileId, filter: OrderQueryFilter) -> Result<Vec<Order>, LifecycleError> {
        let filter = if self.is_admin(caller).await? || filter.is_restricted_to(caller) {
            filter
        } else if filter.buyer_id.is_none() && filter.seller_id.is_none() && filter.participant.is_none() {
            filter.with_participant(caller)
        } else {
            warn!("🔄️ {caller} tried to list orders belonging to someone else");
            return Err(LifecycleError::AuthorizationError("You may only list your own orders".into()));
        };
        trace!("🔄️ Searching orders: {filter}");
        Ok(self.db.search_orders(filter).await?)
    }

    /// CREATED → ACCEPTED, then straight on to AWAITING_PAYMENT.
    ///
    /// Once the acceptance is stored it stands. If the order cannot be moved on to payment (the gateway cannot open a
    /// checkout session, or the write fails) it is returned as `ACCEPTED`. [`initiate_checkout`](Self::initiate_checkout)
    /// or the first [`confirm_payment`](Self::confirm_payment) picks it up from there.
    pub async fn accept_order(
        &self,
        caller: ProfileId,
        id: OrderId,
        request: AcceptOrderRequest,
    ) -> Result<Order, LifecycleError> {
        let mut order = self.load(id).await?;
        self.authorize_item_owner(caller, &order).await?;
        order.guard(OrderAction::Accept)?;
        let ordered = quantities_per_item(&order)?;
        let mut accepted = Vec::with_capacity(ordered.len());
        for (&item_id, &quantity) in &ordered {
            let item = self.market.item(item_id).await?;
            if let StockCheck::Insufficient { available } = self.market.check_stock(item_id, quantity).await? {
                return Err(LifecycleError::ValidationError(format!(
                    "Only {available} of item {item_id} left, but {quantity} were ordered"
                )));
            }
            accepted.push(item.accepted_payment_options);
        }
        let reassign = match request.selected_payment_option_id {
            Some(option) if option != order.effective_payment_option() => {
                let rail = self.resolve_payment_option(option, order.seller_id, &accepted).await?;
                Some((option, rail))
            },
            _ => None,
        };
        order.accept(request.estimated_delivery_date, reassign)?;
        let order = self.db.update_order(&order).await?;
        info!("🔄️ Order {id} accepted by {caller}");
        self.producers.publish_order_accepted(OrderAcceptedEvent { order: order.clone() }).await;
        match self.settlement.begin_payment(order.clone()).await {
            Ok(order) => Ok(order),
            Err(LifecycleError::GatewayError(e)) => {
                warn!("🔄️ Order {id} stays accepted until a checkout session can be opened. {e}");
                Ok(order)
            },
            Err(e) => {
                warn!("🔄️ Order {id} is accepted but could not be moved on to payment yet. {e}");
                Ok(order)
            },
        }
    }

    /// CREATED → REJECTED, by the seller or an admin.
    pub async fn reject_order(&self, caller: ProfileId, id: OrderId) -> Result<Order, LifecycleError> {
        let mut order = self.load(id).await?;
        self.authorize(caller, &order, &[Party::Seller]).await?;
        order.reject()?;
        let order = self.db.update_order(&order).await?;
        info!("🔄️ Order {id} rejected by {caller}");
        self.producers.publish_order_annulled(OrderAnnulledEvent::new(order.clone())).await;
        Ok(order)
    }

    /// Any state before PAID → CANCELLED, by the buyer, the seller or an admin.
    pub async fn cancel_order(&self, caller: ProfileId, id: OrderId) -> Result<Order, LifecycleError> {
        let mut order = self.load(id).await?;
        self.authorize(caller, &order, &[Party::Buyer, Party::Seller]).await?;
        order.cancel()?;
        let order = self.db.update_order(&order).await?;
        info!("🔄️ Order {id} cancelled by {caller}");
        self.producers.publish_order_annulled(OrderAnnulledEvent::new(order.clone())).await;
        Ok(order)
    }

    /// Records that `party` has received (buyer) or handed over (seller) the goods. The second confirmation completes
    /// the order.
    pub async fn confirm_delivery(&self, caller: ProfileId, id: OrderId, party: Party) -> Result<Order, LifecycleError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut order = self.load(id).await?;
            let claim = verify_party(&self.market, caller, party, &order).await?;
            let outcome = order.confirm_delivery(&claim)?;
            if !outcome.changed() {
                return Ok(order);
            }
            match self.db.update_order(&order).await.map_err(LifecycleError::from) {
                Ok(order) => {
                    info!("🔄️ The {party} confirmed delivery of order {id}");
                    let event = DeliveryConfirmedEvent { order: order.clone(), party };
                    self.producers.publish_delivery_confirmed(event).await;
                    if outcome == ConfirmOutcome::Completed {
                        info!("🔄️ Order {id} is complete");
                        self.producers.publish_order_completed(OrderCompletedEvent { order: order.clone() }).await;
                    }
                    return Ok(order);
                },
                Err(LifecycleError::ConflictError(_)) if attempt < MAX_CONFLICT_RETRIES => {
                    debug!("🔄️ Delivery confirmation for order {id} lost a write race. Retrying");
                },
                Err(e) => return Err(e),
            }
        }
    }

    /// Records that `party` has sent (buyer) or received (seller) the bank transfer of a manual-rail order. The second
    /// confirmation settles it.
    pub async fn confirm_payment(&self, caller: ProfileId, id: OrderId, party: Party) -> Result<Order, LifecycleError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut order = self.load(id).await?;
            let claim = verify_party(&self.market, caller, party, &order).await?;
            if order.status == OrderStatusType::Accepted && !order.rail.requires_webhook() {
                debug!("🔄️ Order {id} was accepted but never moved on to payment. Moving it now");
                order = self.settlement.begin_payment(order).await?;
            }
            match self.settlement.confirm_manual_payment(order, claim).await {
                Err(LifecycleError::ConflictError(_)) if attempt < MAX_CONFLICT_RETRIES => {
                    debug!("🔄️ Payment confirmation for order {id} lost a write race. Retrying");
                },
                result => return result,
            }
        }
    }

    /// Changes the estimated delivery date. Seller or admin, while the order is between acceptance and completion.
    pub async fn update_delivery_date(
        &self,
        caller: ProfileId,
        id: OrderId,
        date: NaiveDate,
    ) -> Result<Order, LifecycleError> {
        let mut order = self.load(id).await?;
        self.authorize(caller, &order, &[Party::Seller]).await?;
        let previous_date = order.estimated_delivery_date;
        order.update_delivery_date(date)?;
        let order = self.db.update_order(&order).await?;
        info!("🔄️ Delivery date of order {id} changed from {previous_date:?} to {date}");
        self.producers.publish_delivery_date_changed(DeliveryDateChangedEvent { order: order.clone(), previous_date }).await;
        Ok(order)
    }

    /// Returns the order's checkout session, opening one if the order is accepted but has none yet.
    pub async fn initiate_checkout(&self, caller: ProfileId, id: OrderId) -> Result<CheckoutResult, LifecycleError> {
        let order = self.load(id).await?;
        self.authorize(caller, &order, &[Party::Buyer, Party::Seller]).await?;
        self.settlement.initiate_checkout(order).await
    }

    /// Verifies and applies a raw gateway webhook.
    pub async fn handle_gateway_webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, LifecycleError> {
        self.settlement.handle_webhook(body, signature).await
    }
}

/// Total quantity ordered per item. The same item may appear on more than one line.
fn quantities_per_item(order: &Order) -> Result<BTreeMap<ItemId, i64>, LifecycleError> {
    let mut totals = BTreeMap::new();
    for line in &order.lines {
        let total: &mut i64 = totals.entry(line.item_id).or_default();
        *total = total.checked_add(line.quantity).ok_or_else(|| {
            LifecycleError::ValidationError(format!("Too many of item {} were ordered", line.item_id))
        })?;
    }
    Ok(totals)
}
