//! Runtime message type tags

use std::any::{Any, TypeId};
use std::fmt;
use unified_signals_dispatch::Message;

/// Nominal type tag captured when a typed signal is constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageType {
    id: TypeId,
    name: &'static str,
}

impl MessageType {
    pub fn of<M: Message>() -> Self {
        Self {
            id: TypeId::of::<M>(),
            name: std::any::type_name::<M>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether `message` is exactly of this type
    pub fn matches(&self, message: &dyn Message) -> bool {
        Any::type_id(message.as_any()) == self.id
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
