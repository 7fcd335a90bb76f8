//! Event system infrastructure for the bookswap platform.
//!
//! Domain operations emit a [`DomainEvent`] after each successful mutation;
//! registered handlers react with side effects (the push fan-out, logging,
//! and so on) without the domain layer knowing about them.
//!
//! This crate has no dependencies on internal crates (entity, domain, etc.),
//! avoiding circular dependencies. Entity data is carried as serialized JSON
//! values.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// A type alias that represents any Entity's internal id field data type.
/// This matches the definition in the entity crate to maintain compatibility.
pub type Id = Uuid;

/// Domain events that represent business-level changes in the system.
/// These events are emitted when domain operations complete successfully.
///
/// Every variant carries the ids of the users whose live channels must be
/// refreshed; the domain layer (which knows the chat's participants) fills
/// these in, so handlers only route.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// A chat and its exchange were created together.
    ChatCreated {
        chat_id: Id,
        /// Both participants of the new chat.
        notify_user_ids: Vec<Id>,
    },
    /// A message was appended to a chat's log.
    MessageAppended {
        chat_id: Id,
        /// The stored message, serialized, so handlers can forward it
        /// without re-reading the log.
        message: Value,
        notify_user_ids: Vec<Id>,
    },
    /// The chat's exchange moved to a new status — by an explicit request
    /// (accept, cancel) or derived from dual confirmation (completed).
    /// Also emitted for a one-sided confirmation that leaves the status at
    /// accepted, since the confirming user's flag changed.
    ExchangeTransitioned {
        chat_id: Id,
        status: String,
        notify_user_ids: Vec<Id>,
    },
}

impl DomainEvent {
    pub fn chat_id(&self) -> Id {
        match self {
            DomainEvent::ChatCreated { chat_id, .. }
            | DomainEvent::MessageAppended { chat_id, .. }
            | DomainEvent::ExchangeTransitioned { chat_id, .. } => *chat_id,
        }
    }

    pub fn notify_user_ids(&self) -> &[Id] {
        match self {
            DomainEvent::ChatCreated {
                notify_user_ids, ..
            }
            | DomainEvent::MessageAppended {
                notify_user_ids, ..
            }
            | DomainEvent::ExchangeTransitioned {
                notify_user_ids, ..
            } => notify_user_ids,
        }
    }
}

/// Trait for handling domain events.
/// Implementations can perform side effects like pushing snapshots to live
/// connections, updating caches, logging, etc.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher in your application state.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Publish an event to all registered handlers.
    /// Handlers are called sequentially; a handler's failure is its own to
    /// log and never propagates to the publishing operation.
    pub async fn publish(&self, event: DomainEvent) {
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: &DomainEvent) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn publish_reaches_every_registered_handler() {
        let seen = Arc::new(AtomicUsize::new(0));
        let publisher = EventPublisher::new()
            .with_handler(Arc::new(CountingHandler { seen: seen.clone() }))
            .with_handler(Arc::new(CountingHandler { seen: seen.clone() }));

        publisher
            .publish(DomainEvent::ChatCreated {
                chat_id: Id::new_v4(),
                notify_user_ids: vec![Id::new_v4(), Id::new_v4()],
            })
            .await;

        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn accessors_expose_chat_and_recipients() {
        let chat_id = Id::new_v4();
        let recipients = vec![Id::new_v4(), Id::new_v4()];
        let event = DomainEvent::ExchangeTransitioned {
            chat_id,
            status: "accepted".to_string(),
            notify_user_ids: recipients.clone(),
        };

        assert_eq!(event.chat_id(), chat_id);
        assert_eq!(event.notify_user_ids(), recipients.as_slice());
    }
}
