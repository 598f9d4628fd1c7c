//! Action Broadcast Bus.
//!
//! In-process + cross-context publish/subscribe keyed by action name, with
//! wildcard subscription and at-most-once local echo control. The
//! cross-context side of the real system (a BroadcastChannel) is an assumed
//! primitive; here it is the [`Transport`] trait, with [`ChannelHub`] as an
//! in-memory implementation linking several bus instances.
//!
//! Delivery contract:
//! - insertion order across subscribers of one action;
//! - wildcard subscribers fire in addition to exact-action subscribers, with
//!   the per-message candidate set deduplicated by handler identity;
//! - one handler's panic never prevents delivery to the others;
//! - malformed remote payloads go to the `message error` handler set, or are
//!   logged when none is registered.

use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, error};
use serde_json::Value;

use crate::types::message::{Message, SendOptions, ANY_ACTION};

/// A subscribed handler. Identity (for idempotent subscribe and candidate
/// deduplication) is the `Rc` pointer.
pub type Handler = Rc<dyn Fn(&Message)>;

/// Handler for payloads that could not be normalized into a [`Message`].
pub type MessageErrorHandler = Rc<dyn Fn(&Value)>;

/// Cross-context delivery primitive.
pub trait Transport {
    fn publish(&self, sender: u64, channel: &str, message: &Message);
}

static NEXT_BUS_ID: AtomicU64 = AtomicU64::new(1);

/// One broadcast channel endpoint within a context.
pub struct BroadcastBus {
    id: u64,
    channel: String,
    handlers: RefCell<HashMap<String, Vec<Handler>>>,
    message_error_handlers: RefCell<Vec<MessageErrorHandler>>,
    transport: RefCell<Option<Rc<dyn Transport>>>,
}

impl BroadcastBus {
    pub fn new(channel: impl Into<String>) -> Rc<Self> {
        Rc::new(BroadcastBus {
            id: NEXT_BUS_ID.fetch_add(1, Ordering::Relaxed),
            channel: channel.into(),
            handlers: RefCell::new(HashMap::new()),
            message_error_handlers: RefCell::new(Vec::new()),
            transport: RefCell::new(None),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn set_transport(&self, transport: Rc<dyn Transport>) {
        *self.transport.borrow_mut() = Some(transport);
    }

    /// Registers `handler` for one or more action names (or [`ANY_ACTION`]).
    /// Re-registering the identical handler for the same action is a no-op.
    /// Returns a disposer that removes the registrations it made.
    pub fn on(self: &Rc<Self>, actions: &[&str], handler: Handler) -> Subscription {
        let actions = normalize_actions(actions);
        {
            let mut handlers = self.handlers.borrow_mut();
            for action in &actions {
                let entry = handlers.entry(action.clone()).or_default();
                if !entry.iter().any(|h| Rc::ptr_eq(h, &handler)) {
                    entry.push(Rc::clone(&handler));
                }
            }
        }
        Subscription {
            bus: Rc::downgrade(self),
            handler,
            actions,
        }
    }

    /// Removes `handler` from the given actions (all actions when the list
    /// resolves to the wildcard). Returns the number of removals.
    pub fn off(&self, handler: &Handler, actions: &[&str]) -> usize {
        let actions = normalize_actions(actions);
        let mut handlers = self.handlers.borrow_mut();
        let targets: Vec<String> = if actions.iter().any(|a| a == ANY_ACTION) {
            handlers.keys().cloned().collect()
        } else {
            actions
        };

        let mut removed = 0;
        for action in targets {
            if let Some(entry) = handlers.get_mut(&action) {
                let before = entry.len();
                entry.retain(|h| !Rc::ptr_eq(h, handler));
                removed += before - entry.len();
                if entry.is_empty() {
                    handlers.remove(&action);
                }
            }
        }
        removed
    }

    /// Removes every handler registered for the given actions
    /// (all handlers when `None`). Returns the number of removals.
    pub fn off_actions(&self, actions: Option<&[&str]>) -> usize {
        let mut handlers = self.handlers.borrow_mut();
        match actions {
            None => {
                let removed = handlers.values().map(Vec::len).sum();
                handlers.clear();
                removed
            }
            Some(actions) => {
                let mut removed = 0;
                for action in normalize_actions(actions) {
                    if action == ANY_ACTION {
                        removed += handlers.values().map(Vec::len).sum::<usize>();
                        handlers.clear();
                        break;
                    }
                    if let Some(entry) = handlers.remove(&action) {
                        removed += entry.len();
                    }
                }
                removed
            }
        }
    }

    pub fn on_message_error(&self, handler: MessageErrorHandler) {
        self.message_error_handlers.borrow_mut().push(handler);
    }

    /// Sends a message. Unless `local_only`, it is published to the
    /// transport for other contexts; when `include_self`, it is also
    /// dispatched to this bus's own subscribers.
    pub fn send(&self, message: impl Into<Message>, options: SendOptions) -> Message {
        let message = message.into();

        if !options.local_only {
            if let Some(transport) = self.transport.borrow().clone() {
                transport.publish(self.id, &self.channel, &message);
            }
        }

        if options.include_self {
            self.dispatch(&message);
        }

        message
    }

    /// Entry point for payloads arriving from another context.
    pub fn receive_remote(&self, payload: &Value) {
        match Message::from_value(payload) {
            Ok(message) => self.dispatch(&message),
            Err(e) => {
                let handlers: Vec<MessageErrorHandler> =
                    self.message_error_handlers.borrow().clone();
                if handlers.is_empty() {
                    error!("bus {}: {} (payload: {})", self.channel, e, payload);
                    return;
                }
                for handler in handlers {
                    if catch_unwind(AssertUnwindSafe(|| handler(payload))).is_err() {
                        error!("bus {}: message error handler panicked", self.channel);
                    }
                }
            }
        }
    }

    fn dispatch(&self, message: &Message) {
        // Snapshot the candidate set before invoking anything, so handlers
        // may (un)subscribe without touching this delivery.
        let candidates = {
            let handlers = self.handlers.borrow();
            let mut candidates: Vec<Handler> = Vec::new();
            for key in [message.action.as_str(), ANY_ACTION] {
                if let Some(entry) = handlers.get(key) {
                    for handler in entry {
                        if !candidates.iter().any(|h| Rc::ptr_eq(h, handler)) {
                            candidates.push(Rc::clone(handler));
                        }
                    }
                }
            }
            candidates
        };

        debug!(
            "bus {}: dispatch {} to {} handler(s)",
            self.channel,
            message.action,
            candidates.len()
        );

        for handler in candidates {
            if catch_unwind(AssertUnwindSafe(|| handler(message))).is_err() {
                error!(
                    "bus {}: handler panicked on action {}",
                    self.channel, message.action
                );
            }
        }
    }
}

fn normalize_actions(actions: &[&str]) -> Vec<String> {
    if actions.is_empty() || actions.iter().any(|a| *a == ANY_ACTION) {
        return vec![ANY_ACTION.to_string()];
    }
    let mut out: Vec<String> = Vec::with_capacity(actions.len());
    for action in actions {
        if !out.iter().any(|a| a == action) {
            out.push((*action).to_string());
        }
    }
    out
}

/// Disposer returned by [`BroadcastBus::on`]. The owning context's shutdown
/// path is expected to invoke every disposer it holds.
pub struct Subscription {
    bus: Weak<BroadcastBus>,
    handler: Handler,
    actions: Vec<String>,
}

impl Subscription {
    pub fn dispose(&self) -> usize {
        match self.bus.upgrade() {
            Some(bus) => {
                let actions: Vec<&str> = self.actions.iter().map(String::as_str).collect();
                bus.off(&self.handler, &actions)
            }
            None => 0,
        }
    }
}

/// In-memory cross-context hub: every bus attached under the same channel
/// name receives what the others publish.
#[derive(Default)]
pub struct ChannelHub {
    buses: RefCell<Vec<Weak<BroadcastBus>>>,
}

impl ChannelHub {
    pub fn new() -> Rc<Self> {
        Rc::new(ChannelHub::default())
    }

    pub fn attach(self: &Rc<Self>, bus: &Rc<BroadcastBus>) {
        bus.set_transport(Rc::clone(self) as Rc<dyn Transport>);
        self.buses.borrow_mut().push(Rc::downgrade(bus));
    }

    /// Injects a raw payload into every attached bus on `channel`, as a
    /// foreign context would. Used to exercise malformed-payload handling.
    pub fn publish_raw(&self, channel: &str, payload: &Value) {
        for bus in self.live_buses() {
            if bus.channel() == channel {
                bus.receive_remote(payload);
            }
        }
    }

    fn live_buses(&self) -> Vec<Rc<BroadcastBus>> {
        let mut buses = self.buses.borrow_mut();
        buses.retain(|b| b.upgrade().is_some());
        buses.iter().filter_map(Weak::upgrade).collect()
    }
}

impl Transport for ChannelHub {
    fn publish(&self, sender: u64, channel: &str, message: &Message) {
        let payload = match serde_json::to_value(message) {
            Ok(payload) => payload,
            Err(e) => {
                error!("hub: cannot serialize message for {}: {}", channel, e);
                return;
            }
        };
        for bus in self.live_buses() {
            if bus.id() != sender && bus.channel() == channel {
                bus.receive_remote(&payload);
            }
        }
    }
}
