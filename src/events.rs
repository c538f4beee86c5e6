// Named events published while indexing
// Payloads are flat key/value maps of primitives.

use std::sync::Mutex;

use serde_json::{Map, Value};

pub const INDEX_FOLDER: &str = "index.folder";
pub const INDEX_UPDATING: &str = "index.updating";
pub const INDEX_COMPLETED: &str = "index.completed";
pub const INDEX_CANCELED: &str = "index.canceled";
pub const INDEX_FAILED: &str = "index.failed";

pub type EventData = Map<String, Value>;

/// Build a payload from key/value pairs
pub fn data<I, K, V>(pairs: I) -> EventData
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

pub trait EventSink: Send + Sync {
    fn publish(&self, name: &str, payload: EventData);
}

/// Writes every event to the debug log
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&self, name: &str, payload: EventData) {
        log::debug!("Event: {} {}", name, Value::Object(payload));
    }
}

/// Keeps events in memory for later inspection
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<(String, EventData)>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, EventData)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|(name, _)| name).collect()
    }

    /// Payloads of every event with this name
    pub fn find(&self, name: &str) -> Vec<EventData> {
        self.events()
            .into_iter()
            .filter(|(n, _)| n == name)
            .map(|(_, payload)| payload)
            .collect()
    }
}

impl EventSink for CollectingSink {
    fn publish(&self, name: &str, payload: EventData) {
        match self.events.lock() {
            Ok(mut events) => events.push((name.to_string(), payload)),
            Err(e) => log::warn!("Event: dropped {}: {}", name, e),
        }
    }
}
