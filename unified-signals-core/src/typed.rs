//! Typed signal implementation

use crate::error::{MessageTypeError, SignalError};
use crate::message_type::MessageType;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;
use unified_signals_dispatch::{
    ConnectOptions, Dispatcher, Extra, Message, Payload, Receiver, ReceiverError, ReceiverId,
    ReceiverResult, Responses, RobustResponses, Sender, Signal, SignalConfig,
};

/// Signal carrying messages of a single type `M`.
///
/// Emission checks the message against `M` at run time and only then hands it
/// to the wrapped dispatcher, which does everything else.
///
/// # Examples
///
/// ```rust,ignore
/// #[derive(Debug)]
/// struct Point { x: i32, y: i32 }
///
/// let moved = TypedSignal::<Point>::new();
///
/// moved.connect(|_sender, point, _payload| {
///     println!("moved to {}, {}", point.x, point.y);
///     Ok(serde_json::Value::Null)
/// });
///
/// moved.send(&Sender::of::<Cursor>(), Some(&Point { x: 10, y: 5 }))?;
///
/// // Rejected before any receiver runs
/// assert!(moved.send(&Sender::anonymous(), None).is_err());
/// ```
pub struct TypedSignal<M, D = Signal> {
    expected: MessageType,
    dispatcher: D,
    _message: PhantomData<fn() -> M>,
}

impl<M: Message> TypedSignal<M, Signal> {
    /// Create a typed signal named after its message type
    pub fn new() -> Self {
        Self::named(std::any::type_name::<M>())
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::with_config(name, SignalConfig::default())
    }

    /// Create a typed signal, enabling or disabling the per-sender cache
    pub fn with_caching(use_caching: bool) -> Self {
        Self::with_config(
            std::any::type_name::<M>(),
            SignalConfig {
                use_caching,
                ..SignalConfig::default()
            },
        )
    }

    pub fn with_config(name: impl Into<String>, config: SignalConfig) -> Self {
        Self::from_dispatcher(Signal::with_config(name, config))
    }
}

impl<M: Message> Default for TypedSignal<M, Signal> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message, D: Dispatcher> TypedSignal<M, D> {
    /// Wrap an existing dispatcher
    pub fn from_dispatcher(dispatcher: D) -> Self {
        Self {
            expected: MessageType::of::<M>(),
            dispatcher,
            _message: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.dispatcher.name()
    }

    pub fn expected_type(&self) -> &MessageType {
        &self.expected
    }

    /// The wrapped dispatcher
    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Check that `message` is present and of type `M`
    pub fn validate(&self, message: Option<&dyn Message>) -> Result<(), MessageTypeError> {
        match message {
            Some(message) if self.expected.matches(message) => Ok(()),
            other => {
                let found = other.map(|m| m.type_name());
                debug!(
                    signal = %self.name(),
                    expected = self.expected.name(),
                    found = found.unwrap_or("none"),
                    "Rejected message"
                );
                Err(MessageTypeError {
                    signal: self.name().to_string(),
                    expected: self.expected.name(),
                    found,
                })
            }
        }
    }

    /// Send `message` to every receiver.
    ///
    /// Fails with [`SignalError::MessageType`] before any receiver runs when the
    /// message is absent or not an `M`. A failing receiver aborts the emission
    /// with [`SignalError::Dispatch`].
    pub fn send(
        &self,
        sender: &Sender,
        message: Option<&dyn Message>,
    ) -> Result<Responses, SignalError> {
        self.send_with(sender, message, &Extra::new())
    }

    /// [`send`](Self::send) with extra context for the receivers
    pub fn send_with(
        &self,
        sender: &Sender,
        message: Option<&dyn Message>,
        extra: &Extra,
    ) -> Result<Responses, SignalError> {
        self.validate(message)?;
        Ok(self.dispatcher.send(sender, message, extra)?)
    }

    /// Send `message` to every receiver, isolating receiver failures.
    ///
    /// Only the type check can fail; receiver errors are reported per receiver.
    pub fn send_robust(
        &self,
        sender: &Sender,
        message: Option<&dyn Message>,
    ) -> Result<RobustResponses, MessageTypeError> {
        self.send_robust_with(sender, message, &Extra::new())
    }

    /// [`send_robust`](Self::send_robust) with extra context for the receivers
    pub fn send_robust_with(
        &self,
        sender: &Sender,
        message: Option<&dyn Message>,
        extra: &Extra,
    ) -> Result<RobustResponses, MessageTypeError> {
        self.validate(message)?;
        Ok(self.dispatcher.send_robust(sender, message, extra))
    }

    /// Connect a receiver taking the typed message
    pub fn connect<F>(&self, receiver: F) -> ReceiverId
    where
        F: Fn(&Sender, &M, &Payload<'_>) -> ReceiverResult + Send + Sync + 'static,
    {
        self.connect_with(receiver, ConnectOptions::default())
    }

    /// Connect a typed receiver with options.
    ///
    /// The signal owns the closure, so `options.weak` is ignored. Weak
    /// connections go through [`connect_receiver`](Self::connect_receiver)
    /// with a caller-owned `Arc`.
    pub fn connect_with<F>(&self, receiver: F, options: ConnectOptions) -> ReceiverId
    where
        F: Fn(&Sender, &M, &Payload<'_>) -> ReceiverResult + Send + Sync + 'static,
    {
        self.dispatcher.connect_receiver(
            Arc::new(TypedReceiver::<M, F>::new(receiver)),
            options.strong(),
        )
    }

    /// Connect an untyped receiver, e.g. one held weakly
    pub fn connect_receiver(
        &self,
        receiver: Arc<dyn Receiver>,
        options: ConnectOptions,
    ) -> ReceiverId {
        self.dispatcher.connect_receiver(receiver, options)
    }

    pub fn disconnect(&self, id: ReceiverId) -> bool {
        self.dispatcher.disconnect(id)
    }

    pub fn has_listeners(&self, sender: &Sender) -> bool {
        self.dispatcher.has_listeners(sender)
    }
}

impl<M, D: Dispatcher> std::fmt::Debug for TypedSignal<M, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedSignal")
            .field("name", &self.dispatcher.name())
            .field("expected", &self.expected)
            .finish()
    }
}

/// Adapts a typed closure to [`Receiver`]
struct TypedReceiver<M, F> {
    handler: F,
    _message: PhantomData<fn(&M)>,
}

impl<M, F> TypedReceiver<M, F> {
    fn new(handler: F) -> Self {
        Self {
            handler,
            _message: PhantomData,
        }
    }
}

impl<M, F> Receiver for TypedReceiver<M, F>
where
    M: Message,
    F: Fn(&Sender, &M, &Payload<'_>) -> ReceiverResult + Send + Sync,
{
    fn receive(&self, sender: &Sender, payload: &Payload<'_>) -> ReceiverResult {
        match payload.message::<M>() {
            Some(message) => (self.handler)(sender, message, payload),
            None => Err(ReceiverError::UnexpectedMessage {
                expected: std::any::type_name::<M>(),
            }),
        }
    }
}
