use crate::document::Document;
use parking_lot::RwLock;

/// A lifecycle event emitted after a successful mutation. Fire-and-forget:
/// subscribers get no acknowledgment channel.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    Insert {
        collection: String,
        document: Document,
    },
    Update {
        collection: String,
        document: Document,
        old_document: Document,
    },
    Remove {
        collection: String,
        document: Document,
    },
}

impl ChangeEvent {
    pub fn collection(&self) -> &str {
        match self {
            ChangeEvent::Insert { collection, .. }
            | ChangeEvent::Update { collection, .. }
            | ChangeEvent::Remove { collection, .. } => collection,
        }
    }
}

type Subscriber = Box<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Routes change events from collections to subscribers.
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<Subscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, subscriber: F)
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.subscribers.write().push(Box::new(subscriber));
    }

    pub fn emit(&self, event: &ChangeEvent) {
        for subscriber in self.subscribers.read().iter() {
            subscriber(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_emit_reaches_every_subscriber() {
        let bus = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let seen = seen.clone();
            bus.subscribe(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            });
        }

        let document = Document::from_value(json!({ "id": "a" })).unwrap();
        bus.emit(&ChangeEvent::Insert {
            collection: "todos".into(),
            document,
        });
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_event_collection_accessor() {
        let document = Document::from_value(json!({ "id": "a" })).unwrap();
        let event = ChangeEvent::Remove {
            collection: "todos".into(),
            document,
        };
        assert_eq!(event.collection(), "todos");
    }
}
