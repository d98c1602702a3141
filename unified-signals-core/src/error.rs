// Error types for typed signals

use thiserror::Error;
use unified_signals_dispatch::DispatchError;

/// The message passed to a typed signal is absent or of the wrong type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "wrong message passed to signal `{signal}`: {}, expected {expected}",
    .found.unwrap_or("no message")
)]
pub struct MessageTypeError {
    /// Name of the rejecting signal
    pub signal: String,

    /// Declared message type
    pub expected: &'static str,

    /// Type of the rejected message, `None` when no message was passed
    pub found: Option<&'static str>,
}

#[derive(Error, Debug)]
pub enum SignalError {
    #[error(transparent)]
    MessageType(#[from] MessageTypeError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl SignalError {
    /// Whether the emission was rejected before reaching any receiver
    pub fn is_message_type(&self) -> bool {
        matches!(self, SignalError::MessageType(_))
    }
}

pub type Result<T> = std::result::Result<T, SignalError>;
