//! Unit tests for the action broadcast bus: subscription semantics,
//! candidate deduplication, fault isolation, and cross-context delivery.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;

use tab_groups::managers::broadcast_bus::{BroadcastBus, ChannelHub, Handler};
use tab_groups::types::message::{Message, SendOptions, ANY_ACTION};

fn counting_handler(counter: &Rc<RefCell<u32>>) -> Handler {
    let counter = Rc::clone(counter);
    Rc::new(move |_message: &Message| {
        *counter.borrow_mut() += 1;
    })
}

fn recording_handler(log: &Rc<RefCell<Vec<String>>>, tag: &str) -> Handler {
    let log = Rc::clone(log);
    let tag = tag.to_string();
    Rc::new(move |message: &Message| {
        log.borrow_mut().push(format!("{}:{}", tag, message.action));
    })
}

// ─── Local dispatch ───

#[test]
fn test_send_with_include_self_dispatches_locally() {
    let bus = BroadcastBus::new("test");
    let counter = Rc::new(RefCell::new(0));
    let _sub = bus.on(&["ping"], counting_handler(&counter));

    bus.send("ping", SendOptions::default());
    assert_eq!(*counter.borrow(), 1);
}

#[test]
fn test_send_without_include_self_skips_local_subscribers() {
    let bus = BroadcastBus::new("test");
    let counter = Rc::new(RefCell::new(0));
    let _sub = bus.on(&["ping"], counting_handler(&counter));

    bus.send("ping", SendOptions::remote_only());
    assert_eq!(*counter.borrow(), 0);
}

#[test]
fn test_string_message_is_normalized_to_action() {
    let bus = BroadcastBus::new("test");
    let log = Rc::new(RefCell::new(Vec::new()));
    let _sub = bus.on(&["ping"], recording_handler(&log, "h"));

    let sent = bus.send("ping", SendOptions::default());
    assert_eq!(sent.action, "ping");
    assert_eq!(log.borrow().as_slice(), ["h:ping"]);
}

#[test]
fn test_delivery_is_insertion_ordered() {
    let bus = BroadcastBus::new("test");
    let log = Rc::new(RefCell::new(Vec::new()));
    let _a = bus.on(&["go"], recording_handler(&log, "first"));
    let _b = bus.on(&["go"], recording_handler(&log, "second"));
    let _c = bus.on(&["go"], recording_handler(&log, "third"));

    bus.send("go", SendOptions::default());
    assert_eq!(log.borrow().as_slice(), ["first:go", "second:go", "third:go"]);
}

// ─── Wildcard and deduplication ───

#[test]
fn test_exact_and_wildcard_handler_fires_once_per_message() {
    let bus = BroadcastBus::new("test");
    let counter = Rc::new(RefCell::new(0));
    let handler = counting_handler(&counter);

    let _exact = bus.on(&["ping"], Rc::clone(&handler));
    let _wild = bus.on(&[ANY_ACTION], handler);

    bus.send("ping", SendOptions::default());
    assert_eq!(*counter.borrow(), 1);
}

#[test]
fn test_wildcard_fires_in_addition_to_exact_subscribers() {
    let bus = BroadcastBus::new("test");
    let log = Rc::new(RefCell::new(Vec::new()));
    let _exact = bus.on(&["ping"], recording_handler(&log, "exact"));
    let _wild = bus.on(&[ANY_ACTION], recording_handler(&log, "wild"));

    bus.send("ping", SendOptions::default());
    bus.send("other", SendOptions::default());

    assert_eq!(
        log.borrow().as_slice(),
        ["exact:ping", "wild:ping", "wild:other"]
    );
}

#[test]
fn test_resubscribing_identical_handler_is_noop() {
    let bus = BroadcastBus::new("test");
    let counter = Rc::new(RefCell::new(0));
    let handler = counting_handler(&counter);

    let _a = bus.on(&["ping"], Rc::clone(&handler));
    let _b = bus.on(&["ping"], handler);

    bus.send("ping", SendOptions::default());
    assert_eq!(*counter.borrow(), 1);
}

// ─── Unsubscription ───

#[test]
fn test_off_removes_handler() {
    let bus = BroadcastBus::new("test");
    let counter = Rc::new(RefCell::new(0));
    let handler = counting_handler(&counter);
    let _sub = bus.on(&["ping"], Rc::clone(&handler));

    assert_eq!(bus.off(&handler, &["ping"]), 1);
    bus.send("ping", SendOptions::default());
    assert_eq!(*counter.borrow(), 0);
}

#[test]
fn test_subscription_dispose_removes_registrations() {
    let bus = BroadcastBus::new("test");
    let counter = Rc::new(RefCell::new(0));
    let sub = bus.on(&["a", "b"], counting_handler(&counter));

    assert_eq!(sub.dispose(), 2);
    bus.send("a", SendOptions::default());
    bus.send("b", SendOptions::default());
    assert_eq!(*counter.borrow(), 0);
}

#[test]
fn test_off_actions_removes_all_handlers_for_action() {
    let bus = BroadcastBus::new("test");
    let counter = Rc::new(RefCell::new(0));
    let _a = bus.on(&["ping"], counting_handler(&counter));
    let _b = bus.on(&["ping"], counting_handler(&counter));

    assert_eq!(bus.off_actions(Some(&["ping"])), 2);
    bus.send("ping", SendOptions::default());
    assert_eq!(*counter.borrow(), 0);
}

// ─── Fault isolation ───

#[test]
fn test_panicking_handler_does_not_block_delivery() {
    let bus = BroadcastBus::new("test");
    let counter = Rc::new(RefCell::new(0));

    let _bad = bus.on(
        &["go"],
        Rc::new(|_message: &Message| panic!("handler failure")),
    );
    let _good = bus.on(&["go"], counting_handler(&counter));

    bus.send("go", SendOptions::default());
    assert_eq!(*counter.borrow(), 1);
}

// ─── Cross-context delivery ───

#[test]
fn test_hub_delivers_to_other_buses_on_same_channel() {
    let hub = ChannelHub::new();
    let background = BroadcastBus::new("tabs");
    let popup = BroadcastBus::new("tabs");
    let other_channel = BroadcastBus::new("containers");
    hub.attach(&background);
    hub.attach(&popup);
    hub.attach(&other_channel);

    let popup_count = Rc::new(RefCell::new(0));
    let other_count = Rc::new(RefCell::new(0));
    let self_count = Rc::new(RefCell::new(0));
    let _p = popup.on(&["updated"], counting_handler(&popup_count));
    let _o = other_channel.on(&["updated"], counting_handler(&other_count));
    let _s = background.on(&["updated"], counting_handler(&self_count));

    background.send(
        Message::new("updated", json!({"tabId": 1})),
        SendOptions::remote_only(),
    );

    assert_eq!(*popup_count.borrow(), 1);
    assert_eq!(*other_count.borrow(), 0, "channel isolation broken");
    assert_eq!(*self_count.borrow(), 0, "no local echo was requested");
}

#[test]
fn test_local_only_skips_transport() {
    let hub = ChannelHub::new();
    let background = BroadcastBus::new("tabs");
    let popup = BroadcastBus::new("tabs");
    hub.attach(&background);
    hub.attach(&popup);

    let popup_count = Rc::new(RefCell::new(0));
    let _p = popup.on(&["updated"], counting_handler(&popup_count));

    background.send(
        "updated",
        SendOptions {
            local_only: true,
            include_self: true,
        },
    );
    assert_eq!(*popup_count.borrow(), 0);
}

#[test]
fn test_malformed_remote_payload_goes_to_message_error_handlers() {
    let hub = ChannelHub::new();
    let bus = BroadcastBus::new("tabs");
    hub.attach(&bus);

    let errors = Rc::new(RefCell::new(Vec::new()));
    let errors_by_handler = Rc::clone(&errors);
    bus.on_message_error(Rc::new(move |payload| {
        errors_by_handler.borrow_mut().push(payload.clone());
    }));

    let delivered = Rc::new(RefCell::new(0));
    let _sub = bus.on(&[ANY_ACTION], counting_handler(&delivered));

    // An object without an action key cannot be normalized.
    hub.publish_raw("tabs", &json!({"data": 1}));
    // A bare number is not a message at all.
    hub.publish_raw("tabs", &json!(42));

    assert_eq!(errors.borrow().len(), 2);
    assert_eq!(*delivered.borrow(), 0);
}

#[test]
fn test_well_formed_remote_payload_is_dispatched() {
    let hub = ChannelHub::new();
    let bus = BroadcastBus::new("tabs");
    hub.attach(&bus);

    let log = Rc::new(RefCell::new(Vec::new()));
    let _sub = bus.on(&["updated"], recording_handler(&log, "ui"));

    hub.publish_raw("tabs", &json!({"action": "updated", "data": {"tabId": 3}}));
    assert_eq!(log.borrow().as_slice(), ["ui:updated"]);
}
