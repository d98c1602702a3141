//! Receivers and connection options

use crate::error::ReceiverError;
use crate::payload::Payload;
use crate::sender::Sender;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Result of a single receiver invocation
pub type ReceiverResult = Result<serde_json::Value, ReceiverError>;

/// `(receiver, response)` pairs from a strict emission
pub type Responses = Vec<(ReceiverId, serde_json::Value)>;

/// `(receiver, response or error)` pairs from a robust emission
pub type RobustResponses = Vec<(ReceiverId, ReceiverResult)>;

/// Receiver trait
///
/// Closures with the signature `Fn(&Sender, &Payload) -> ReceiverResult`
/// implement it automatically.
pub trait Receiver: Send + Sync {
    /// Handle one emission
    fn receive(&self, sender: &Sender, payload: &Payload<'_>) -> ReceiverResult;
}

impl<F> Receiver for F
where
    F: Fn(&Sender, &Payload<'_>) -> ReceiverResult + Send + Sync,
{
    fn receive(&self, sender: &Sender, payload: &Payload<'_>) -> ReceiverResult {
        self(sender, payload)
    }
}

/// Handle identifying one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiverId(Uuid);

impl ReceiverId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Options for connecting a receiver
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// Only receive emissions from this sender
    pub sender: Option<Sender>,

    /// Hold the receiver through a weak reference
    pub weak: bool,

    /// Unique identifier used instead of the receiver's identity
    pub dispatch_uid: Option<String>,
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one sender
    pub fn sender(mut self, sender: Sender) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Hold the receiver weakly
    pub fn weak(mut self) -> Self {
        self.weak = true;
        self
    }

    /// Hold the receiver strongly
    pub fn strong(mut self) -> Self {
        self.weak = false;
        self
    }

    /// Deduplicate by this identifier
    pub fn dispatch_uid(mut self, uid: impl Into<String>) -> Self {
        self.dispatch_uid = Some(uid.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Extra;

    fn echo_sender(sender: &Sender, _payload: &Payload<'_>) -> ReceiverResult {
        Ok(serde_json::json!(sender.to_string()))
    }

    #[test]
    fn test_fn_receiver() {
        let extra = Extra::new();
        let payload = Payload::new("test", None, &extra);
        let response = echo_sender.receive(&Sender::named("a"), &payload).unwrap();

        assert_eq!(response, serde_json::json!("a"));
    }

    #[test]
    fn test_connect_options_builder() {
        let options = ConnectOptions::new()
            .sender(Sender::named("billing"))
            .weak()
            .dispatch_uid("audit");

        assert_eq!(options.sender, Some(Sender::named("billing")));
        assert!(options.weak);
        assert_eq!(options.dispatch_uid.as_deref(), Some("audit"));
    }

    #[test]
    fn test_strong_clears_weak() {
        let options = ConnectOptions::new().weak().strong();
        assert!(!options.weak);
    }

    #[test]
    fn test_receiver_ids_are_unique() {
        assert_ne!(ReceiverId::new(), ReceiverId::new());
    }
}
