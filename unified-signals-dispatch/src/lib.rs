//! Synchronous signal dispatch for Unified Signals
//!
//! This crate provides the dispatcher that typed signals delegate to: receiver
//! registration, fan-out to every matching receiver, and failure isolation.
//!
//! ## Features
//!
//! - **Signals** - Named channels with any number of receivers
//! - **Sender filtering** - Receivers may listen to a single sender only
//! - **Weak receivers** - Receivers that disappear when their owner is dropped
//! - **Deduplication** - `dispatch_uid` prevents double registration
//! - **Robust emission** - Receiver errors and panics are captured per receiver
//! - **Caching** - Optional per-sender receiver lookup cache
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use unified_signals_dispatch::*;
//!
//! let signal = Signal::new("user_created");
//!
//! signal.connect(|sender, payload| {
//!     println!("{} sent {:?}", sender, payload.extra());
//!     Ok(serde_json::Value::Null)
//! });
//!
//! let responses = signal.send(&Sender::named("accounts"), None, &Extra::new())?;
//! assert_eq!(responses.len(), 1);
//! ```
//!
//! ## Robust Emission
//!
//! ```rust,ignore
//! signal.connect(|_, _| Err(ReceiverError::failed("smtp down")));
//! signal.connect(|_, _| Ok(serde_json::json!("audited")));
//!
//! // Both receivers run; the failure is reported in place
//! for (receiver, outcome) in signal.send_robust(&sender, None, &Extra::new()) {
//!     if let Err(e) = outcome {
//!         eprintln!("receiver {} failed: {}", receiver, e);
//!     }
//! }
//! ```
//!
//! ## Configuration
//!
//! ```rust,ignore
//! let signal = SignalBuilder::new()
//!     .name("order_placed")
//!     .use_caching(true)       // Memoize receivers per sender
//!     .enable_logging(false)   // Silence dispatch logs
//!     .build();
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod payload;
pub mod receiver;
pub mod sender;
pub mod signal;

pub use config::{SignalBuilder, SignalConfig};
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, ReceiverError};
pub use payload::{EmissionMetadata, Extra, Message, Payload};
pub use receiver::{
    ConnectOptions, Receiver, ReceiverId, ReceiverResult, Responses, RobustResponses,
};
pub use sender::Sender;
pub use signal::Signal;
