//! Dispatcher abstraction
//!
//! Typed signals only need this surface; [`Signal`] is the default
//! implementation.

use crate::config::SignalConfig;
use crate::error::DispatchError;
use crate::payload::{Extra, Message};
use crate::receiver::{ConnectOptions, Receiver, ReceiverId, Responses, RobustResponses};
use crate::sender::Sender;
use crate::signal::Signal;
use std::sync::Arc;

/// A signal-like dispatcher
pub trait Dispatcher: Send + Sync {
    /// Construct a dispatcher
    fn with_config(name: String, config: SignalConfig) -> Self
    where
        Self: Sized;

    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Register a receiver
    fn connect_receiver(&self, receiver: Arc<dyn Receiver>, options: ConnectOptions) -> ReceiverId;

    /// Remove a receiver
    fn disconnect(&self, id: ReceiverId) -> bool;

    /// Whether any receiver would run for `sender`
    fn has_listeners(&self, sender: &Sender) -> bool;

    /// Strict emission: receiver errors abort and propagate
    fn send(
        &self,
        sender: &Sender,
        message: Option<&dyn Message>,
        extra: &Extra,
    ) -> Result<Responses, DispatchError>;

    /// Robust emission: receiver errors are captured per receiver
    fn send_robust(
        &self,
        sender: &Sender,
        message: Option<&dyn Message>,
        extra: &Extra,
    ) -> RobustResponses;
}

impl Dispatcher for Signal {
    fn with_config(name: String, config: SignalConfig) -> Self {
        Signal::with_config(name, config)
    }

    fn name(&self) -> &str {
        Signal::name(self)
    }

    fn connect_receiver(&self, receiver: Arc<dyn Receiver>, options: ConnectOptions) -> ReceiverId {
        Signal::connect_receiver(self, receiver, options)
    }

    fn disconnect(&self, id: ReceiverId) -> bool {
        Signal::disconnect(self, id)
    }

    fn has_listeners(&self, sender: &Sender) -> bool {
        Signal::has_listeners(self, sender)
    }

    fn send(
        &self,
        sender: &Sender,
        message: Option<&dyn Message>,
        extra: &Extra,
    ) -> Result<Responses, DispatchError> {
        Signal::send(self, sender, message, extra)
    }

    fn send_robust(
        &self,
        sender: &Sender,
        message: Option<&dyn Message>,
        extra: &Extra,
    ) -> RobustResponses {
        Signal::send_robust(self, sender, message, extra)
    }
}

impl<D: Dispatcher> Dispatcher for Arc<D> {
    fn with_config(name: String, config: SignalConfig) -> Self {
        Arc::new(D::with_config(name, config))
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn connect_receiver(&self, receiver: Arc<dyn Receiver>, options: ConnectOptions) -> ReceiverId {
        (**self).connect_receiver(receiver, options)
    }

    fn disconnect(&self, id: ReceiverId) -> bool {
        (**self).disconnect(id)
    }

    fn has_listeners(&self, sender: &Sender) -> bool {
        (**self).has_listeners(sender)
    }

    fn send(
        &self,
        sender: &Sender,
        message: Option<&dyn Message>,
        extra: &Extra,
    ) -> Result<Responses, DispatchError> {
        (**self).send(sender, message, extra)
    }

    fn send_robust(
        &self,
        sender: &Sender,
        message: Option<&dyn Message>,
        extra: &Extra,
    ) -> RobustResponses {
        (**self).send_robust(sender, message, extra)
    }
}
