//! Event type to handler routing shared by the bus adapters.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::ports::{EventHandler, EventSubscriber};

/// Handlers keyed by event type.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the handlers for one event type.
    ///
    /// Cloned so no lock is held across handler await points.
    pub fn handlers_for(&self, event_type: &str) -> Vec<Arc<dyn EventHandler>> {
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        handlers.get(event_type).cloned().unwrap_or_default()
    }
}

impl EventSubscriber for HandlerRegistry {
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
    }
}
