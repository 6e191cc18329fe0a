use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    ListingsChangedEvent,
    OrderCompletedEvent,
    OrderDeclinedEvent,
    OrderProposedEvent,
    RatingPostedEvent,
};

/// The producer ends handed to the engine APIs. Each API publishes into every registered producer for the event type.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_proposed: Vec<EventProducer<OrderProposedEvent>>,
    pub order_completed: Vec<EventProducer<OrderCompletedEvent>>,
    pub order_declined: Vec<EventProducer<OrderDeclinedEvent>>,
    pub rating_posted: Vec<EventProducer<RatingPostedEvent>>,
    pub listings_changed: Vec<EventProducer<ListingsChangedEvent>>,
}

pub struct EventHandlers {
    pub on_order_proposed: Option<EventHandler<OrderProposedEvent>>,
    pub on_order_completed: Option<EventHandler<OrderCompletedEvent>>,
    pub on_order_declined: Option<EventHandler<OrderDeclinedEvent>>,
    pub on_rating_posted: Option<EventHandler<RatingPostedEvent>>,
    pub on_listings_changed: Option<EventHandler<ListingsChangedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        Self {
            on_order_proposed: hooks.on_order_proposed.map(|f| EventHandler::new(buffer_size, f)),
            on_order_completed: hooks.on_order_completed.map(|f| EventHandler::new(buffer_size, f)),
            on_order_declined: hooks.on_order_declined.map(|f| EventHandler::new(buffer_size, f)),
            on_rating_posted: hooks.on_rating_posted.map(|f| EventHandler::new(buffer_size, f)),
            on_listings_changed: hooks.on_listings_changed.map(|f| EventHandler::new(buffer_size, f)),
        }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_proposed {
            result.order_proposed.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_completed {
            result.order_completed.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_declined {
            result.order_declined.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_rating_posted {
            result.rating_posted.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_listings_changed {
            result.listings_changed.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_proposed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_completed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_declined {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_rating_posted {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_listings_changed {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_proposed: Option<Handler<OrderProposedEvent>>,
    pub on_order_completed: Option<Handler<OrderCompletedEvent>>,
    pub on_order_declined: Option<Handler<OrderDeclinedEvent>>,
    pub on_rating_posted: Option<Handler<RatingPostedEvent>>,
    pub on_listings_changed: Option<Handler<ListingsChangedEvent>>,
}

macro_rules! hook_setter {
    ($name:ident, $event:ty) => {
        pub fn $name<F>(&mut self, f: F) -> &mut Self
        where F: (Fn($event) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
            self.$name = Some(Arc::new(f));
            self
        }
    };
}

impl EventHooks {
    hook_setter!(on_order_proposed, OrderProposedEvent);

    hook_setter!(on_order_completed, OrderCompletedEvent);

    hook_setter!(on_order_declined, OrderDeclinedEvent);

    hook_setter!(on_rating_posted, RatingPostedEvent);

    hook_setter!(on_listings_changed, ListingsChangedEvent);
}
