//! Observers notified after successful mutations.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectEventKind {
    Created,
    Updated,
    Deleted,
}

impl fmt::Display for ObjectEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// What happened to a record, and its state afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectEvent {
    pub kind: ObjectEventKind,
    pub entity: &'static str,
    /// Key of the affected row, rendered as text.
    pub key: String,
    /// Columns written by the statement.
    pub changed: Vec<&'static str>,
    /// Every column of the record as a JSON object.
    pub state: serde_json::Value,
}

#[async_trait]
pub trait ObjectObserver: Send + Sync {
    async fn notify(&self, event: &ObjectEvent);
}

pub struct NoopObserver;

#[async_trait]
impl ObjectObserver for NoopObserver {
    async fn notify(&self, _event: &ObjectEvent) {}
}

/// Forwards each event to every member, in registration order.
#[derive(Default, Clone)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn ObjectObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn ObjectObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

#[async_trait]
impl ObjectObserver for ObserverSet {
    async fn notify(&self, event: &ObjectEvent) {
        for observer in &self.observers {
            observer.notify(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    struct Recorder(Mutex<Vec<ObjectEventKind>>);

    #[async_trait]
    impl ObjectObserver for Recorder {
        async fn notify(&self, event: &ObjectEvent) {
            self.0.lock().await.push(event.kind);
        }
    }

    #[tokio::test]
    async fn test_observer_set_fans_out() {
        let first = Arc::new(Recorder(Mutex::new(Vec::new())));
        let second = Arc::new(Recorder(Mutex::new(Vec::new())));
        let set = ObserverSet::new()
            .with(first.clone())
            .with(Arc::new(NoopObserver))
            .with(second.clone());
        assert_eq!(set.len(), 3);

        let event = ObjectEvent {
            kind: ObjectEventKind::Deleted,
            entity: "Screen",
            key: "1".to_string(),
            changed: Vec::new(),
            state: serde_json::json!({}),
        };
        set.notify(&event).await;

        assert_eq!(*first.0.lock().await, vec![ObjectEventKind::Deleted]);
        assert_eq!(*second.0.lock().await, vec![ObjectEventKind::Deleted]);
    }
}
