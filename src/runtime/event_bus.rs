//! Single-consumer event bus feeding the models.
//!
//! The gateway adapter lives on runtime threads and can only reach the
//! owner thread through a channel. [`EventPublisher`] is the `Send` half;
//! [`EventBus::pump`] drains the channel on the owner thread and dispatches
//! each event to the subscribed handlers in subscription order.

use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind};

use tokio::sync::mpsc;
use tracing::{error, trace};

use crate::domain::ports::{Event, EventFilter};

/// Opaque handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

/// `Send + Clone` handle for posting events from any thread.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventPublisher {
    /// Posts an event for the next [`EventBus::pump`] pass. Events posted
    /// from one publisher arrive in posting order. Silently dropped if the
    /// bus is gone.
    pub fn publish(&self, event: Event) {
        if self.tx.send(event).is_err() {
            trace!("event bus dropped, discarding event");
        }
    }
}

struct Subscription {
    id: u64,
    filter: EventFilter,
    handler: Box<dyn FnMut(&Event)>,
}

enum PendingOp {
    Add(Subscription),
    Remove(u64),
}

/// Owner-thread event dispatcher.
///
/// Not `Send`: handlers close over model state. Subscribing and
/// unsubscribing from inside a handler is allowed; the change applies after
/// the event currently being dispatched.
pub struct EventBus {
    tx: mpsc::UnboundedSender<Event>,
    rx: RefCell<mpsc::UnboundedReceiver<Event>>,
    subscriptions: RefCell<Vec<Subscription>>,
    pending: RefCell<Vec<PendingOp>>,
    next_id: Cell<u64>,
    dispatching: Cell<bool>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: RefCell::new(rx),
            subscriptions: RefCell::new(Vec::new()),
            pending: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            dispatching: Cell::new(false),
        }
    }

    /// Returns a `Send` publisher for this bus.
    #[must_use]
    pub fn publisher(&self) -> EventPublisher {
        EventPublisher {
            tx: self.tx.clone(),
        }
    }

    /// Posts an event from the owner thread itself.
    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Registers a handler for events matching `filter`. An empty filter
    /// matches everything. Handlers fire in subscription order.
    pub fn subscribe(
        &self,
        filter: EventFilter,
        handler: impl FnMut(&Event) + 'static,
    ) -> SubscriptionToken {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let subscription = Subscription {
            id,
            filter,
            handler: Box::new(handler),
        };
        if self.dispatching.get() {
            self.pending.borrow_mut().push(PendingOp::Add(subscription));
        } else {
            self.subscriptions.borrow_mut().push(subscription);
        }
        SubscriptionToken(id)
    }

    /// Removes a subscription. Safe to call from inside a handler; the
    /// removal applies after the current event finishes dispatching.
    /// Unknown tokens are ignored.
    pub fn unsubscribe(&self, token: SubscriptionToken) {
        if self.dispatching.get() {
            self.pending.borrow_mut().push(PendingOp::Remove(token.0));
        } else {
            self.subscriptions.borrow_mut().retain(|s| s.id != token.0);
        }
    }

    /// Drains queued events and dispatches each to matching handlers, FIFO.
    /// Returns the number of events dispatched. A handler that panics is
    /// logged and dropped; remaining handlers still run. Reentrant calls
    /// from inside a handler are no-ops.
    pub fn pump(&self) -> usize {
        if self.dispatching.get() {
            return 0;
        }
        let mut dispatched = 0;
        loop {
            let event = match self.rx.borrow_mut().try_recv() {
                Ok(event) => event,
                Err(_) => break,
            };
            self.dispatch(&event);
            dispatched += 1;
        }
        dispatched
    }

    fn dispatch(&self, event: &Event) {
        self.dispatching.set(true);
        {
            let mut subscriptions = self.subscriptions.borrow_mut();
            let mut index = 0;
            while index < subscriptions.len() {
                let subscription = &mut subscriptions[index];
                if !subscription.filter.matches(event) {
                    index += 1;
                    continue;
                }
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    (subscription.handler)(event);
                }));
                if outcome.is_err() {
                    error!(
                        subscription = subscription.id,
                        kind = ?event.kind(),
                        "event handler panicked, dropping subscription"
                    );
                    subscriptions.remove(index);
                } else {
                    index += 1;
                }
            }
        }
        self.dispatching.set(false);
        self.apply_pending();
    }

    fn apply_pending(&self) {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        let mut subscriptions = self.subscriptions.borrow_mut();
        for op in pending {
            match op {
                PendingOp::Add(subscription) => subscriptions.push(subscription),
                PendingOp::Remove(id) => subscriptions.retain(|s| s.id != id),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use chrono::Utc;

    use crate::domain::entities::{ChannelId, UserId};

    fn typing_event(channel: u64) -> Event {
        Event::TypingStart {
            channel_id: ChannelId(channel),
            guild_id: None,
            user_id: UserId(1),
            member: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_pump_dispatches_in_order() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let log = Rc::clone(&seen);
        bus.subscribe(EventFilter::TYPING_START, move |event| {
            if let Event::TypingStart { channel_id, .. } = event {
                log.borrow_mut().push(channel_id.0);
            }
        });

        let publisher = bus.publisher();
        publisher.publish(typing_event(1));
        publisher.publish(typing_event(2));
        publisher.publish(typing_event(3));

        assert_eq!(bus.pump(), 3);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_filter_skips_handler() {
        let bus = EventBus::new();
        let calls = Rc::new(Cell::new(0));

        let counter = Rc::clone(&calls);
        bus.subscribe(EventFilter::MESSAGES, move |_| {
            counter.set(counter.get() + 1);
        });

        bus.publish(typing_event(1));
        bus.pump();
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_unsubscribe_inside_handler() {
        let bus = Rc::new(EventBus::new());
        let calls = Rc::new(Cell::new(0));
        let token = Rc::new(Cell::new(None));

        let counter = Rc::clone(&calls);
        let bus_ref = Rc::clone(&bus);
        let token_ref = Rc::clone(&token);
        let registered = bus.subscribe(EventFilter::empty(), move |_| {
            counter.set(counter.get() + 1);
            if let Some(t) = token_ref.get() {
                bus_ref.unsubscribe(t);
            }
        });
        token.set(Some(registered));

        bus.publish(typing_event(1));
        bus.publish(typing_event(2));
        assert_eq!(bus.pump(), 2);
        // The first dispatch removes the subscription, so only one call.
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_panicking_handler_is_dropped() {
        let bus = EventBus::new();
        let calls = Rc::new(Cell::new(0));

        bus.subscribe(EventFilter::empty(), |_| panic!("boom"));
        let counter = Rc::clone(&calls);
        bus.subscribe(EventFilter::empty(), move |_| {
            counter.set(counter.get() + 1);
        });

        bus.publish(typing_event(1));
        bus.publish(typing_event(2));
        bus.pump();
        // The surviving handler saw both events.
        assert_eq!(calls.get(), 2);
    }
}
