//! Signal implementation

use crate::config::SignalConfig;
use crate::error::{DispatchError, ReceiverError};
use crate::payload::{Extra, Message, Payload};
use crate::receiver::{
    ConnectOptions, Receiver, ReceiverId, ReceiverResult, Responses, RobustResponses,
};
use crate::sender::Sender;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tracing::{debug, error};

/// Strong or weak hold on a receiver
#[derive(Clone)]
enum ReceiverHandle {
    Strong(Arc<dyn Receiver>),
    Weak(Weak<dyn Receiver>),
}

impl ReceiverHandle {
    fn upgrade(&self) -> Option<Arc<dyn Receiver>> {
        match self {
            ReceiverHandle::Strong(receiver) => Some(receiver.clone()),
            ReceiverHandle::Weak(receiver) => receiver.upgrade(),
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            ReceiverHandle::Strong(_) => true,
            ReceiverHandle::Weak(receiver) => receiver.strong_count() > 0,
        }
    }
}

/// What makes two connections the same connection
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReceiverKey {
    Uid(String),
    Identity(usize),
}

struct Registration {
    id: ReceiverId,
    key: ReceiverKey,
    sender: Option<Sender>,
    handle: ReceiverHandle,
}

impl Registration {
    fn matches(&self, sender: &Sender) -> bool {
        self.sender.as_ref().is_none_or(|s| s == sender)
    }
}

type LiveReceivers = Vec<(ReceiverId, Arc<dyn Receiver>)>;

/// Synchronous signal with any number of receivers
///
/// Receivers run on the emitting thread, in the order they were connected.
pub struct Signal {
    name: String,

    /// Registrations in connection order
    receivers: RwLock<Vec<Registration>>,

    /// Matching registrations per sender, when caching is enabled
    sender_cache: DashMap<Sender, Vec<(ReceiverId, ReceiverHandle)>>,

    config: SignalConfig,
}

impl Signal {
    /// Create new signal
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, SignalConfig::default())
    }

    /// Create signal with custom config
    pub fn with_config(name: impl Into<String>, config: SignalConfig) -> Self {
        Self {
            name: name.into(),
            receivers: RwLock::new(Vec::new()),
            sender_cache: DashMap::new(),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Connect a closure receiving every emission
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let signal = Signal::new("user_created");
    /// signal.connect(|sender, payload| {
    ///     println!("created by {}", sender);
    ///     Ok(serde_json::Value::Null)
    /// });
    /// ```
    pub fn connect<F>(&self, receiver: F) -> ReceiverId
    where
        F: Fn(&Sender, &Payload<'_>) -> ReceiverResult + Send + Sync + 'static,
    {
        self.connect_receiver(Arc::new(receiver), ConnectOptions::default())
    }

    /// Connect a closure with options.
    ///
    /// The signal owns the closure, so it is always held strongly and
    /// `options.weak` is ignored. Use [`connect_weak`](Self::connect_weak) or
    /// [`connect_receiver`](Self::connect_receiver) with a caller-owned `Arc`
    /// for weak connections.
    pub fn connect_with<F>(&self, receiver: F, options: ConnectOptions) -> ReceiverId
    where
        F: Fn(&Sender, &Payload<'_>) -> ReceiverResult + Send + Sync + 'static,
    {
        self.connect_receiver(Arc::new(receiver), options.strong())
    }

    /// Connect a receiver held through a weak reference.
    ///
    /// The receiver stops being called once the caller drops every `Arc` to it.
    pub fn connect_weak<R: Receiver + 'static>(&self, receiver: &Arc<R>) -> ReceiverId {
        let receiver: Arc<dyn Receiver> = receiver.clone();
        self.connect_receiver(receiver, ConnectOptions::new().weak())
    }

    /// Connect a shared receiver.
    ///
    /// Connecting again with the same lookup key (`dispatch_uid`, or else the
    /// receiver's identity, plus the sender filter) returns the existing id.
    pub fn connect_receiver(
        &self,
        receiver: Arc<dyn Receiver>,
        options: ConnectOptions,
    ) -> ReceiverId {
        let key = match options.dispatch_uid {
            Some(uid) => ReceiverKey::Uid(uid),
            None => ReceiverKey::Identity(Arc::as_ptr(&receiver) as *const () as usize),
        };

        let mut receivers = self.receivers.write();
        receivers.retain(|r| r.handle.is_alive());

        if let Some(existing) = receivers
            .iter()
            .find(|r| r.key == key && r.sender == options.sender)
        {
            if self.config.enable_logging {
                debug!(signal = %self.name, receiver = %existing.id, "Receiver already connected");
            }
            return existing.id;
        }

        let handle = if options.weak {
            ReceiverHandle::Weak(Arc::downgrade(&receiver))
        } else {
            ReceiverHandle::Strong(receiver)
        };

        let id = ReceiverId::new();
        receivers.push(Registration {
            id,
            key,
            sender: options.sender,
            handle,
        });
        self.sender_cache.clear();

        if self.config.enable_logging {
            debug!(signal = %self.name, receiver = %id, weak = options.weak, "Connected receiver");
        }

        id
    }

    /// Disconnect a receiver
    pub fn disconnect(&self, id: ReceiverId) -> bool {
        self.remove_where(|r| r.id == id)
    }

    /// Disconnect the receiver registered under `dispatch_uid` for `sender`
    pub fn disconnect_uid(&self, dispatch_uid: &str, sender: Option<&Sender>) -> bool {
        let key = ReceiverKey::Uid(dispatch_uid.to_string());
        self.remove_where(|r| r.key == key && r.sender.as_ref() == sender)
    }

    /// Disconnect every receiver
    pub fn clear(&self) {
        let mut receivers = self.receivers.write();
        receivers.clear();
        self.sender_cache.clear();
        drop(receivers);

        if self.config.enable_logging {
            debug!(signal = %self.name, "Cleared all receivers");
        }
    }

    fn remove_where(&self, predicate: impl Fn(&Registration) -> bool) -> bool {
        let mut receivers = self.receivers.write();
        let before = receivers.len();
        receivers.retain(|r| r.handle.is_alive() && !predicate(r));
        let removed = receivers.len() < before;
        self.sender_cache.clear();
        drop(receivers);

        if removed && self.config.enable_logging {
            debug!(signal = %self.name, "Disconnected receiver");
        }
        removed
    }

    /// Whether any live receiver would run for `sender`
    pub fn has_listeners(&self, sender: &Sender) -> bool {
        !self.live_receivers(sender).is_empty()
    }

    /// Number of live receivers, regardless of sender filters
    pub fn receiver_count(&self) -> usize {
        self.receivers
            .read()
            .iter()
            .filter(|r| r.handle.is_alive())
            .count()
    }

    /// Send signal to all matching receivers.
    ///
    /// The first receiver error aborts the emission; receivers after it are not
    /// called. Panics propagate to the caller.
    pub fn send(
        &self,
        sender: &Sender,
        message: Option<&dyn Message>,
        extra: &Extra,
    ) -> Result<Responses, DispatchError> {
        let receivers = self.live_receivers(sender);
        if receivers.is_empty() {
            return Ok(Vec::new());
        }

        let payload = Payload::new(&self.name, message, extra);
        self.log_emission(sender, &payload, receivers.len());

        let mut responses = Vec::with_capacity(receivers.len());
        for (id, receiver) in receivers {
            match receiver.receive(sender, &payload) {
                Ok(response) => responses.push((id, response)),
                Err(source) => {
                    return Err(DispatchError::ReceiverFailed {
                        signal: self.name.clone(),
                        receiver: id,
                        source,
                    });
                }
            }
        }

        Ok(responses)
    }

    /// Send signal to all matching receivers, isolating failures.
    ///
    /// Every receiver runs. Errors and panics are captured as that receiver's
    /// result.
    pub fn send_robust(
        &self,
        sender: &Sender,
        message: Option<&dyn Message>,
        extra: &Extra,
    ) -> RobustResponses {
        let receivers = self.live_receivers(sender);
        if receivers.is_empty() {
            return Vec::new();
        }

        let payload = Payload::new(&self.name, message, extra);
        self.log_emission(sender, &payload, receivers.len());

        let mut responses = Vec::with_capacity(receivers.len());
        for (id, receiver) in receivers {
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| receiver.receive(sender, &payload)))
                    .unwrap_or_else(|panic| Err(ReceiverError::from_panic(panic)));

            if let Err(e) = &outcome {
                if self.config.enable_logging {
                    error!(
                        signal = %self.name,
                        receiver = %id,
                        emission = %payload.metadata().id,
                        "Error calling receiver in send_robust: {}",
                        e
                    );
                }
            }

            responses.push((id, outcome));
        }

        responses
    }

    fn log_emission(&self, sender: &Sender, payload: &Payload<'_>, receivers: usize) {
        if self.config.enable_logging {
            debug!(
                signal = %self.name,
                sender = %sender,
                emission = %payload.metadata().id,
                receivers,
                "Sending signal"
            );
        }
    }

    /// Snapshot of live receivers for `sender`, in connection order.
    ///
    /// The registry lock is released before any receiver runs.
    fn live_receivers(&self, sender: &Sender) -> LiveReceivers {
        let handles = if self.caches(sender) {
            let cached = self
                .sender_cache
                .get(sender)
                .map(|entry| entry.value().clone());
            match cached {
                Some(handles) => handles,
                None => self.fill_cache(sender),
            }
        } else {
            let receivers = self.receivers.read();
            matching_handles(&receivers, sender)
        };

        let mut live = Vec::with_capacity(handles.len());
        let mut saw_dead = false;
        for (id, handle) in handles {
            match handle.upgrade() {
                Some(receiver) => live.push((id, receiver)),
                None => saw_dead = true,
            }
        }

        if saw_dead {
            self.prune_dead();
        }

        live
    }

    /// Only type and anonymous senders are cached
    fn caches(&self, sender: &Sender) -> bool {
        self.config.use_caching && !matches!(sender, Sender::Named(_))
    }

    /// Compute and cache the handles for `sender`.
    ///
    /// The registry read guard is held until the entry is inserted. Registry
    /// writers clear the cache under the write guard, so an entry can never
    /// outlive the registry state it was computed from.
    fn fill_cache(&self, sender: &Sender) -> Vec<(ReceiverId, ReceiverHandle)> {
        let receivers = self.receivers.read();
        let handles = matching_handles(&receivers, sender);

        #[cfg(test)]
        tests::before_cache_fill();

        self.sender_cache.insert(sender.clone(), handles.clone());
        drop(receivers);
        handles
    }

    fn prune_dead(&self) {
        let mut receivers = self.receivers.write();
        let before = receivers.len();
        receivers.retain(|r| r.handle.is_alive());
        let pruned = before - receivers.len();
        self.sender_cache.clear();
        drop(receivers);

        if pruned > 0 && self.config.enable_logging {
            debug!(signal = %self.name, pruned, "Pruned dead receivers");
        }
    }
}

fn matching_handles(
    receivers: &[Registration],
    sender: &Sender,
) -> Vec<(ReceiverId, ReceiverHandle)> {
    receivers
        .iter()
        .filter(|r| r.matches(sender))
        .map(|r| (r.id, r.handle.clone()))
        .collect()
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name)
            .field("receivers", &self.receiver_count())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SignalBuilder;
    use parking_lot::Mutex;
    use serde_json::{Value, json};
    use std::cell::RefCell;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::thread;
    use std::time::Duration;

    thread_local! {
        static BEFORE_CACHE_FILL: RefCell<Option<Box<dyn FnOnce()>>> = const { RefCell::new(None) };
    }

    /// Runs the hook installed on this thread, between computing and caching handles
    pub(super) fn before_cache_fill() {
        let hook = BEFORE_CACHE_FILL.with(|hook| hook.borrow_mut().take());
        if let Some(hook) = hook {
            hook();
        }
    }

    #[derive(Clone)]
    struct CountingReceiver {
        counter: Arc<AtomicU32>,
    }

    impl CountingReceiver {
        fn new() -> Self {
            Self {
                counter: Arc::new(AtomicU32::new(0)),
            }
        }

        fn count(&self) -> u32 {
            self.counter.load(Ordering::SeqCst)
        }
    }

    impl Receiver for CountingReceiver {
        fn receive(&self, _sender: &Sender, _payload: &Payload<'_>) -> ReceiverResult {
            self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        }
    }

    fn anonymous_send(signal: &Signal) -> Result<Responses, DispatchError> {
        signal.send(&Sender::anonymous(), None, &Extra::new())
    }

    #[test]
    fn test_send_without_receivers() {
        let signal = Signal::new("empty");
        assert!(anonymous_send(&signal).unwrap().is_empty());
        assert!(
            signal
                .send_robust(&Sender::anonymous(), None, &Extra::new())
                .is_empty()
        );
    }

    #[test]
    fn test_send_reaches_every_receiver_in_order() {
        let signal = Signal::new("ordered");
        let calls = Arc::new(Mutex::new(Vec::new()));

        for n in 0..3 {
            let calls = calls.clone();
            signal.connect(move |_, _| {
                calls.lock().push(n);
                Ok(json!(n))
            });
        }

        let responses = anonymous_send(&signal).unwrap();

        assert_eq!(*calls.lock(), vec![0, 1, 2]);
        let values: Vec<Value> = responses.into_iter().map(|(_, v)| v).collect();
        assert_eq!(values, vec![json!(0), json!(1), json!(2)]);
    }

    #[test]
    fn test_send_aborts_on_first_error() {
        let signal = Signal::new("strict");
        let after = CountingReceiver::new();

        let failing = signal.connect(|_, _| Err(ReceiverError::failed("boom")));
        signal.connect_receiver(Arc::new(after.clone()), ConnectOptions::default());

        let err = anonymous_send(&signal).unwrap_err();

        match err {
            DispatchError::ReceiverFailed { signal, receiver, source } => {
                assert_eq!(signal, "strict");
                assert_eq!(receiver, failing);
                assert!(matches!(source, ReceiverError::Failed(ref m) if m == "boom"));
            }
        }
        assert_eq!(after.count(), 0);
    }

    #[test]
    fn test_send_robust_isolates_errors_and_panics() {
        let signal = Signal::new("robust");
        let after = CountingReceiver::new();

        signal.connect(|_, _| Err(ReceiverError::failed("boom")));
        signal.connect(|_, _| panic!("receiver exploded"));
        signal.connect_receiver(Arc::new(after.clone()), ConnectOptions::default());

        let responses = signal.send_robust(&Sender::anonymous(), None, &Extra::new());

        assert_eq!(responses.len(), 3);
        assert!(matches!(responses[0].1, Err(ReceiverError::Failed(_))));
        assert!(matches!(
            responses[1].1,
            Err(ReceiverError::Panicked(ref m)) if m == "receiver exploded"
        ));
        assert!(matches!(responses[2].1, Ok(Value::Null)));
        assert_eq!(after.count(), 1);
    }

    #[test]
    fn test_message_and_extra_pass_through() {
        let signal = Signal::new("context");
        let seen = Arc::new(Mutex::new(None));

        let slot = seen.clone();
        signal.connect(move |sender, payload| {
            *slot.lock() = Some((
                sender.clone(),
                payload.message::<u64>().copied(),
                payload.get("source").cloned(),
            ));
            Ok(Value::Null)
        });

        let mut extra = Extra::new();
        extra.insert("source".to_string(), json!("cli"));
        signal
            .send(&Sender::named("importer"), Some(&7_u64), &extra)
            .unwrap();

        assert_eq!(
            *seen.lock(),
            Some((Sender::named("importer"), Some(7), Some(json!("cli"))))
        );
    }

    #[test]
    fn test_sender_filter() {
        let signal = Signal::new("filtered");
        let billing = CountingReceiver::new();

        signal.connect_receiver(
            Arc::new(billing.clone()),
            ConnectOptions::new().sender(Sender::named("billing")),
        );

        signal.send(&Sender::named("shipping"), None, &Extra::new()).unwrap();
        assert_eq!(billing.count(), 0);
        assert!(!signal.has_listeners(&Sender::named("shipping")));

        signal.send(&Sender::named("billing"), None, &Extra::new()).unwrap();
        assert_eq!(billing.count(), 1);
        assert!(signal.has_listeners(&Sender::named("billing")));
    }

    #[test]
    fn test_same_receiver_connects_once() {
        let signal = Signal::new("dedupe");
        let receiver: Arc<dyn Receiver> = Arc::new(CountingReceiver::new());

        let first = signal.connect_receiver(receiver.clone(), ConnectOptions::default());
        let second = signal.connect_receiver(receiver.clone(), ConnectOptions::default());
        assert_eq!(first, second);
        assert_eq!(signal.receiver_count(), 1);

        // A different sender filter is a different connection
        let third = signal.connect_receiver(
            receiver,
            ConnectOptions::new().sender(Sender::named("billing")),
        );
        assert_ne!(first, third);
        assert_eq!(signal.receiver_count(), 2);
    }

    #[test]
    fn test_dispatch_uid_dedupe_and_disconnect() {
        let signal = Signal::new("uid");

        let audit = ConnectOptions::new().dispatch_uid("audit");
        let first = signal.connect_with(|_, _| Ok(json!(1)), audit.clone());
        let second = signal.connect_with(|_, _| Ok(json!(2)), audit);
        assert_eq!(first, second);

        let responses = anonymous_send(&signal).unwrap();
        assert_eq!(responses, vec![(first, json!(1))]);

        assert!(!signal.disconnect_uid("audit", Some(&Sender::named("other"))));
        assert!(signal.disconnect_uid("audit", None));
        assert_eq!(signal.receiver_count(), 0);
    }

    #[test]
    fn test_disconnect() {
        let signal = Signal::new("disconnect");
        let receiver = CountingReceiver::new();
        let id = signal.connect_receiver(Arc::new(receiver.clone()), ConnectOptions::default());

        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));

        anonymous_send(&signal).unwrap();
        assert_eq!(receiver.count(), 0);
    }

    #[test]
    fn test_weak_receiver_dropped() {
        let signal = Signal::new("weak");
        let receiver = Arc::new(CountingReceiver::new());
        let counter = receiver.counter.clone();

        signal.connect_weak(&receiver);
        anonymous_send(&signal).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        drop(receiver);
        assert!(anonymous_send(&signal).unwrap().is_empty());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(signal.receiver_count(), 0);
    }

    #[test]
    fn test_caching_invalidated_on_connect_and_disconnect() {
        let signal = SignalBuilder::new().name("cached").use_caching(true).build();
        let sender = Sender::named("billing");

        assert!(!signal.has_listeners(&sender));

        let first = CountingReceiver::new();
        let id = signal.connect_receiver(Arc::new(first.clone()), ConnectOptions::default());
        assert!(signal.has_listeners(&sender));

        signal.send(&sender, None, &Extra::new()).unwrap();
        signal.send(&sender, None, &Extra::new()).unwrap();
        assert_eq!(first.count(), 2);

        signal.disconnect(id);
        assert!(!signal.has_listeners(&sender));
        assert!(signal.send(&sender, None, &Extra::new()).unwrap().is_empty());
    }

    #[test]
    fn test_cached_weak_receiver_dropped() {
        let signal = SignalBuilder::new().name("cached_weak").use_caching(true).build();
        let receiver = Arc::new(CountingReceiver::new());

        signal.connect_weak(&receiver);
        assert_eq!(anonymous_send(&signal).unwrap().len(), 1);

        drop(receiver);
        assert!(anonymous_send(&signal).unwrap().is_empty());
        assert_eq!(signal.receiver_count(), 0);
    }

    #[test]
    fn test_connect_during_cache_fill_is_not_lost() {
        let signal = Arc::new(SignalBuilder::new().name("cache_fill").use_caching(true).build());
        let late = CountingReceiver::new();
        let connector = Arc::new(Mutex::new(None));

        let (shared, receiver, slot) = (signal.clone(), late.clone(), connector.clone());
        BEFORE_CACHE_FILL.with(|hook| {
            *hook.borrow_mut() = Some(Box::new(move || {
                let handle = thread::spawn(move || {
                    shared.connect_receiver(Arc::new(receiver), ConnectOptions::default());
                });
                thread::sleep(Duration::from_millis(50));
                *slot.lock() = Some(handle);
            }));
        });

        assert!(anonymous_send(&signal).unwrap().is_empty());
        let handle = connector.lock().take().expect("cache fill hook ran");
        handle.join().unwrap();

        assert_eq!(anonymous_send(&signal).unwrap().len(), 1);
        assert_eq!(late.count(), 1);
    }

    #[test]
    fn test_named_senders_are_not_cached() {
        let signal = SignalBuilder::new().name("named").use_caching(true).build();
        let receiver = CountingReceiver::new();
        signal.connect_receiver(Arc::new(receiver.clone()), ConnectOptions::default());

        for n in 0..10 {
            let sender = Sender::named(format!("worker-{}", n));
            signal.send(&sender, None, &Extra::new()).unwrap();
        }
        assert_eq!(receiver.count(), 10);
        assert!(signal.sender_cache.is_empty());

        signal.send(&Sender::of::<CountingReceiver>(), None, &Extra::new()).unwrap();
        anonymous_send(&signal).unwrap();
        assert_eq!(signal.sender_cache.len(), 2);
    }

    #[test]
    fn test_connect_with_weak_closure_is_held_strongly() {
        let signal = Signal::new("weak_closure");
        signal.connect_with(|_, _| Ok(json!("alive")), ConnectOptions::new().weak());

        assert!(signal.has_listeners(&Sender::anonymous()));
        let responses = anonymous_send(&signal).unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].1, json!("alive"));
    }

    #[test]
    fn test_receiver_may_connect_during_send() {
        let signal = Arc::new(Signal::new("reentrant"));

        let inner = Arc::downgrade(&signal);
        signal.connect(move |_, _| {
            if let Some(signal) = inner.upgrade() {
                signal.connect(|_, _| Ok(Value::Null));
            }
            Ok(Value::Null)
        });

        assert_eq!(anonymous_send(&signal).unwrap().len(), 1);
        assert_eq!(signal.receiver_count(), 2);
    }

    #[test]
    fn test_signals_do_not_share_receivers() {
        let a = Signal::new("same");
        let b = Signal::new("same");
        let receiver = CountingReceiver::new();

        a.connect_receiver(Arc::new(receiver.clone()), ConnectOptions::default());
        anonymous_send(&b).unwrap();

        assert_eq!(receiver.count(), 0);
        assert_eq!(b.receiver_count(), 0);
    }

    #[test]
    fn test_clear() {
        let signal = Signal::new("clear");
        signal.connect(|_, _| Ok(Value::Null));
        signal.connect(|_, _| Ok(Value::Null));

        signal.clear();
        assert_eq!(signal.receiver_count(), 0);
    }
}
