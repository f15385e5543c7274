use std::{pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, MatchSuccessEvent, WaiterExpiredEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub match_success_producers: Vec<EventProducer<MatchSuccessEvent>>,
    pub waiter_expired_producers: Vec<EventProducer<WaiterExpiredEvent>>,
}

pub struct EventHandlers {
    pub on_match_success: Option<EventHandler<MatchSuccessEvent>>,
    pub on_waiter_expired: Option<EventHandler<WaiterExpiredEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_match_success = hooks.on_match_success.map(|f| EventHandler::new(buffer_size, f));
        let on_waiter_expired = hooks.on_waiter_expired.map(|f| EventHandler::new(buffer_size, f));
        Self { on_match_success, on_waiter_expired }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_match_success {
            result.match_success_producers.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_waiter_expired {
            result.waiter_expired_producers.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_match_success {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_waiter_expired {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_match_success: Option<Handler<MatchSuccessEvent>>,
    pub on_waiter_expired: Option<Handler<WaiterExpiredEvent>>,
}

impl EventHooks {
    pub fn on_match_success<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(MatchSuccessEvent) -> Pin<Box<dyn std::future::Future<Output = ()> + Send>>) + Send + Sync + 'static
    {
        self.on_match_success = Some(Arc::new(f));
        self
    }

    pub fn on_waiter_expired<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(WaiterExpiredEvent) -> Pin<Box<dyn std::future::Future<Output = ()> + Send>>) + Send + Sync + 'static
    {
        self.on_waiter_expired = Some(Arc::new(f));
        self
    }
}
