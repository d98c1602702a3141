//! Typed signals for Unified Signals
//!
//! A [`TypedSignal`] binds one message type to a named signal. Every emission
//! is checked against that type before the wrapped dispatcher runs any
//! receiver; registration, fan-out and failure isolation are left to the
//! dispatcher.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use unified_signals_core::*;
//!
//! #[derive(Debug)]
//! struct OrderPlaced {
//!     order_id: u64,
//! }
//!
//! struct Checkout;
//!
//! typed_signal!(pub static ORDER_PLACED: OrderPlaced);
//!
//! ORDER_PLACED.connect(|_sender, order, _payload| {
//!     println!("order {} placed", order.order_id);
//!     Ok(serde_json::Value::Null)
//! });
//!
//! ORDER_PLACED.send(&Sender::of::<Checkout>(), Some(&OrderPlaced { order_id: 7 }))?;
//! ```
//!
//! ## Rejected Messages
//!
//! ```rust,ignore
//! match ORDER_PLACED.send(&sender, Some(&"not an order")) {
//!     Err(SignalError::MessageType(e)) => eprintln!("{}", e),
//!     _ => unreachable!(),
//! }
//! ```
//!
//! ## Robust Emission
//!
//! ```rust,ignore
//! // Receiver failures are reported per receiver instead of aborting
//! let responses = ORDER_PLACED.send_robust(&sender, Some(&order))?;
//! ```

pub mod error;
pub mod message_type;
pub mod typed;

pub use error::{MessageTypeError, Result, SignalError};
pub use message_type::MessageType;
pub use typed::TypedSignal;

pub use unified_signals_dispatch::{
    ConnectOptions, DispatchError, Dispatcher, EmissionMetadata, Extra, Message, Payload,
    Receiver, ReceiverError, ReceiverId, ReceiverResult, Responses, RobustResponses, Sender,
    Signal, SignalBuilder, SignalConfig,
};

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
    pub use unified_signals_dispatch::SignalConfig;
}

/// Declare a process-wide typed signal.
///
/// The signal is created on first use, named after the static, and lives for
/// the rest of the process. Its configuration comes from
/// [`SignalConfig::from_env`]. Append `, caching` to force the per-sender
/// receiver cache on.
///
/// ```rust,ignore
/// typed_signal!(pub static POINT_MOVED: Point);
/// typed_signal!(static HOT_PATH: Tick, caching);
/// ```
#[macro_export]
macro_rules! typed_signal {
    ($(#[$attr:meta])* $vis:vis static $name:ident: $message:ty, caching $(,)?) => {
        $(#[$attr])*
        $vis static $name: $crate::__private::Lazy<$crate::TypedSignal<$message>> =
            $crate::__private::Lazy::new(|| {
                $crate::TypedSignal::with_config(
                    stringify!($name),
                    $crate::__private::SignalConfig {
                        use_caching: true,
                        ..$crate::__private::SignalConfig::from_env()
                    },
                )
            });
    };
    ($(#[$attr:meta])* $vis:vis static $name:ident: $message:ty $(,)?) => {
        $(#[$attr])*
        $vis static $name: $crate::__private::Lazy<$crate::TypedSignal<$message>> =
            $crate::__private::Lazy::new(|| {
                $crate::TypedSignal::with_config(
                    stringify!($name),
                    $crate::__private::SignalConfig::from_env(),
                )
            });
    };
}
