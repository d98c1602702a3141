//! Sender identities

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;

/// Identity of the logical origin of an emission.
///
/// Receivers see it unchanged. The dispatcher only compares it for equality
/// when a receiver was connected for one specific sender.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Sender {
    /// A type acting as sender
    Type { id: TypeId, name: &'static str },

    /// A named component
    Named(Cow<'static, str>),

    /// No particular origin
    #[default]
    Anonymous,
}

impl Sender {
    /// Use a type as the sender identity
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// struct BillingService;
    ///
    /// let sender = Sender::of::<BillingService>();
    /// assert_eq!(sender, Sender::of::<BillingService>());
    /// ```
    pub fn of<T: ?Sized + 'static>() -> Self {
        Sender::Type {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Use a name as the sender identity
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Sender::Named(name.into())
    }

    /// Sender without identity
    pub fn anonymous() -> Self {
        Sender::Anonymous
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::Type { name, .. } => write!(f, "{}", name),
            Sender::Named(name) => write!(f, "{}", name),
            Sender::Anonymous => write!(f, "<anonymous>"),
        }
    }
}
