//! Order notifications.
//!
//! Every status change is reported through the engine's event hooks. The hooks here write a structured log line per
//! event under the `mse::notifications` target, which the deployment ships on to the messaging service.
use futures::future::BoxFuture;
use log::*;
use settlement_engine::events::{
    DeliveryConfirmedEvent,
    DeliveryDateChangedEvent,
    EventHandlers,
    EventHooks,
    OrderAcceptedEvent,
    OrderAnnulledEvent,
    OrderCompletedEvent,
    OrderCreatedEvent,
    OrderPaidEvent,
};

pub const NOTIFICATION_EVENT_BUFFER_SIZE: usize = 25;
const TARGET: &str = "mse::notifications";

pub fn create_notification_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_created(|OrderCreatedEvent { order }| {
            info!(target: TARGET, "📬️ {} placed order {} with {}", order.buyer_id, order.id, order.seller_id);
            no_op()
        })
        .on_order_accepted(|OrderAcceptedEvent { order }| {
            info!(target: TARGET, "📬️ {} accepted order {} from {}", order.seller_id, order.id, order.buyer_id);
            no_op()
        })
        .on_order_annulled(|OrderAnnulledEvent { order, status }| {
            info!(
                target: TARGET,
                "📬️ Order {} is {status}. Notifying {} and {}",
                order.id, order.buyer_id, order.seller_id
            );
            no_op()
        })
        .on_order_paid(|OrderPaidEvent { order, ledger_entry }| {
            info!(
                target: TARGET,
                "📬️ Order {} is paid. {} will receive {} {}",
                order.id, order.seller_id, ledger_entry.net, ledger_entry.currency
            );
            no_op()
        })
        .on_delivery_confirmed(|DeliveryConfirmedEvent { order, party }| {
            info!(target: TARGET, "📬️ The {party} confirmed delivery of order {}", order.id);
            no_op()
        })
        .on_order_completed(|OrderCompletedEvent { order }| {
            info!(target: TARGET, "📬️ Order {} is complete", order.id);
            no_op()
        })
        .on_delivery_date_changed(|DeliveryDateChangedEvent { order, previous_date }| {
            match (previous_date, order.estimated_delivery_date) {
                (Some(before), Some(after)) => {
                    info!(target: TARGET, "📬️ Delivery of order {} moved from {before} to {after}", order.id)
                },
                (_, Some(after)) => info!(target: TARGET, "📬️ Order {} will be delivered on {after}", order.id),
                (_, None) => warn!(target: TARGET, "📬️ Order {} has lost its delivery date", order.id),
            }
            no_op()
        });
    EventHandlers::new(NOTIFICATION_EVENT_BUFFER_SIZE, hooks)
}

fn no_op() -> BoxFuture<'static, ()> {
    Box::pin(async {})
}
