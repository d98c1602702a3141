//! Dispatch and receiver errors

use crate::receiver::ReceiverId;

/// Error returned by a receiver
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    #[error("Receiver failed: {0}")]
    Failed(String),

    #[error("Receiver panicked: {0}")]
    Panicked(String),

    #[error("Receiver expected a message of type {expected}")]
    UnexpectedMessage { expected: &'static str },

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ReceiverError {
    /// Shorthand for [`ReceiverError::Failed`]
    pub fn failed(reason: impl Into<String>) -> Self {
        ReceiverError::Failed(reason.into())
    }

    pub(crate) fn from_panic(panic: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = panic.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        ReceiverError::Panicked(message)
    }
}

/// Dispatch errors
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Receiver {receiver} on signal `{signal}` failed: {source}")]
    ReceiverFailed {
        signal: String,
        receiver: ReceiverId,
        #[source]
        source: ReceiverError,
    },
}
