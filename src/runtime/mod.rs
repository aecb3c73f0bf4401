//! Owner-thread runtime glue: event dispatch and task scheduling.

mod event_bus;
mod scheduler;

pub use event_bus::{EventBus, EventPublisher, SubscriptionToken};
pub use scheduler::{CancelToken, Scheduler};
