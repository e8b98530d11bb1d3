use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    BalanceAddedEvent,
    CommissionEarnedEvent,
    EventHandler,
    EventProducer,
    Handler,
    PaymentVerifiedEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub payment_verified_producer: Vec<EventProducer<PaymentVerifiedEvent>>,
    pub balance_added_producer: Vec<EventProducer<BalanceAddedEvent>>,
    pub commission_earned_producer: Vec<EventProducer<CommissionEarnedEvent>>,
}

pub struct EventHandlers {
    pub on_payment_verified: Option<EventHandler<PaymentVerifiedEvent>>,
    pub on_balance_added: Option<EventHandler<BalanceAddedEvent>>,
    pub on_commission_earned: Option<EventHandler<CommissionEarnedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_payment_verified = hooks.on_payment_verified.map(|f| EventHandler::new(buffer_size, f));
        let on_balance_added = hooks.on_balance_added.map(|f| EventHandler::new(buffer_size, f));
        let on_commission_earned = hooks.on_commission_earned.map(|f| EventHandler::new(buffer_size, f));
        Self { on_payment_verified, on_balance_added, on_commission_earned }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_payment_verified {
            result.payment_verified_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_balance_added {
            result.balance_added_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_commission_earned {
            result.commission_earned_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_payment_verified {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_balance_added {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_commission_earned {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_payment_verified: Option<Handler<PaymentVerifiedEvent>>,
    pub on_balance_added: Option<Handler<BalanceAddedEvent>>,
    pub on_commission_earned: Option<Handler<CommissionEarnedEvent>>,
}

impl EventHooks {
    pub fn on_payment_verified<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentVerifiedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payment_verified = Some(Arc::new(f));
        self
    }

    pub fn on_balance_added<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(BalanceAddedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_balance_added = Some(Arc::new(f));
        self
    }

    pub fn on_commission_earned<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CommissionEarnedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_commission_earned = Some(Arc::new(f));
        self
    }
}
