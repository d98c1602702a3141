// Unified Signals - typed, synchronous signals for Rust
//
// This library binds a single message type to each signal, rejects emissions
// whose message does not match, and leaves dispatch to a pluggable dispatcher.

// Re-export core functionality
pub use unified_signals_core::*;

// Re-export the dispatcher crate for custom `Dispatcher` implementations
pub use unified_signals_dispatch;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        ConnectOptions, Dispatcher, Extra, Message, MessageTypeError, Payload, Receiver,
        ReceiverError, ReceiverId, ReceiverResult, Sender, Signal, SignalError, TypedSignal,
        typed_signal,
    };
    pub use serde_json::{Value, json};
}
