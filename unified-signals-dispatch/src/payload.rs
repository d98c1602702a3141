//! Messages and the payload handed to receivers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use uuid::Uuid;

/// Message trait
///
/// Implemented for every `'static + Send + Sync` type, so any plain struct can
/// be emitted. Receivers get it back through [`Payload::message`].
pub trait Message: Any + Send + Sync {
    /// Cast to Any for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Name of the concrete message type
    fn type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync> Message for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Extra keyword context forwarded to receivers unchanged
pub type Extra = serde_json::Map<String, serde_json::Value>;

/// Metadata describing a single emission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmissionMetadata {
    /// Unique emission ID
    pub id: Uuid,

    /// Name of the emitting signal
    pub signal: String,

    /// Timestamp when the emission started
    pub timestamp: DateTime<Utc>,
}

impl EmissionMetadata {
    /// Create metadata for a new emission
    pub fn new(signal: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            signal: signal.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Everything a receiver sees besides the sender.
///
/// One payload is built per emission and shared by all receivers.
#[derive(Clone)]
pub struct Payload<'a> {
    message: Option<&'a dyn Message>,
    extra: &'a Extra,
    metadata: EmissionMetadata,
}

impl<'a> Payload<'a> {
    pub fn new(signal: &str, message: Option<&'a dyn Message>, extra: &'a Extra) -> Self {
        Self {
            message,
            extra,
            metadata: EmissionMetadata::new(signal),
        }
    }

    /// The message downcast to `M`, if present and of that type
    pub fn message<M: Message>(&self) -> Option<&'a M> {
        self.message.and_then(|m| m.as_any().downcast_ref::<M>())
    }

    /// The untyped message
    pub fn raw_message(&self) -> Option<&'a dyn Message> {
        self.message
    }

    pub fn has_message(&self) -> bool {
        self.message.is_some()
    }

    /// Extra context passed by the emitter
    pub fn extra(&self) -> &'a Extra {
        self.extra
    }

    /// Look up a single extra value
    pub fn get(&self, key: &str) -> Option<&'a serde_json::Value> {
        self.extra.get(key)
    }

    pub fn metadata(&self) -> &EmissionMetadata {
        &self.metadata
    }
}

impl std::fmt::Debug for Payload<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Payload")
            .field("message", &self.message.map(|m| m.type_name()))
            .field("extra", &self.extra)
            .field("metadata", &self.metadata)
            .finish()
    }
}
