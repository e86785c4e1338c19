use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::events::{
    DeliveryConfirmedEvent,
    DeliveryDateChangedEvent,
    EventHandler,
    EventProducer,
    Handler,
    OrderAcceptedEvent,
    OrderAnnulledEvent,
    OrderCompletedEvent,
    OrderCreatedEvent,
    OrderPaidEvent,
};

type BoxedFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Generates the three hook containers. For every event there is
/// * an optional [`Handler`] in [`EventHooks`], registered with a builder-style setter,
/// * an optional [`EventHandler`] in [`EventHandlers`], which owns the channel,
/// * a list of [`EventProducer`]s in [`EventProducers`], which the APIs publish to.
macro_rules! event_hooks {
    ($($event:ty => $hook:ident, $producer:ident, $publish:ident;)+) => {
        #[derive(Default, Clone)]
        pub struct EventHooks {
            $(pub $hook: Option<Handler<$event>>,)+
        }

        impl EventHooks {
            $(
                pub fn $hook<F>(&mut self, f: F) -> &mut Self
                where F: (Fn($event) -> BoxedFuture) + Send + Sync + 'static {
                    self.$hook = Some(Arc::new(f));
                    self
                }
            )+
        }

        pub struct EventHandlers {
            $(pub $hook: Option<EventHandler<$event>>,)+
        }

        impl EventHandlers {
            pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
                Self {
                    $($hook: hooks.$hook.map(|f| EventHandler::new(buffer_size, f)),)+
                }
            }

            pub fn producers(&self) -> EventProducers {
                let mut result = EventProducers::default();
                $(
                    if let Some(handler) = &self.$hook {
                        result.$producer.push(handler.subscribe());
                    }
                )+
                result
            }

            /// Spawns one tokio task per registered handler.
            pub async fn start_handlers(self) {
                $(
                    if let Some(handler) = self.$hook {
                        debug!("📬️ Starting {} handler", stringify!($hook));
                        tokio::spawn(handler.start_handler());
                    }
                )+
            }
        }

        #[derive(Default, Clone)]
        pub struct EventProducers {
            $(pub $producer: Vec<EventProducer<$event>>,)+
        }

        impl EventProducers {
            $(
                pub async fn $publish(&self, event: $event) {
                    for producer in &self.$producer {
                        trace!("📬️ Publishing {}", stringify!($event));
                        producer.publish_event(event.clone()).await;
                    }
                }
            )+
        }
    };
}

event_hooks! {
    OrderCreatedEvent => on_order_created, order_created_producer, publish_order_created;
    OrderAcceptedEvent => on_order_accepted, order_accepted_producer, publish_order_accepted;
    OrderAnnulledEvent => on_order_annulled, order_annulled_producer, publish_order_annulled;
    OrderPaidEvent => on_order_paid, order_paid_producer, publish_order_paid;
    DeliveryConfirmedEvent => on_delivery_confirmed, delivery_confirmed_producer, publish_delivery_confirmed;
    OrderCompletedEvent => on_order_completed, order_completed_producer, publish_order_completed;
    DeliveryDateChangedEvent => on_delivery_date_changed, delivery_date_changed_producer, publish_delivery_date_changed;
}
