//! User-facing notifications.
//!
//! Failures that matter to the user are aggregated per class across a batch
//! operation and surfaced as one notification, never one per tab. Rendering
//! is out of scope; the engine only emits through the sink trait.

use std::cell::RefCell;
use std::fmt;

use log::info;

/// One user-facing notification, aggregated per failure class.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Pinned tabs cannot join groups; fired once per move batch.
    PinnedTabsNotSupported,
    /// Tabs blocked from hiding (screen/camera/microphone sharing), listed
    /// by short title, fired once per move batch.
    TabsCannotBeHidden(Vec<String>),
    /// A user rename turned a normal container into a temporary-looking one.
    ContainerNowTemporary(String),
    /// A user rename made a temporary container look normal.
    ContainerNoLongerTemporary(String),
    /// Move summary.
    TabsMovedToGroup { count: usize, group_title: String },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::PinnedTabsNotSupported => {
                write!(f, "Pinned tabs are not supported in groups")
            }
            Notification::TabsCannotBeHidden(titles) => {
                write!(f, "These tabs cannot be hidden: {}", titles.join(", "))
            }
            Notification::ContainerNowTemporary(name) => {
                write!(f, "Container \"{}\" is now temporary", name)
            }
            Notification::ContainerNoLongerTemporary(name) => {
                write!(f, "Container \"{}\" is no longer temporary", name)
            }
            Notification::TabsMovedToGroup { count, group_title } => {
                write!(f, "Moved {} tab(s) to group \"{}\"", count, group_title)
            }
        }
    }
}

/// Sink for user-facing notifications.
pub trait NotificationSink {
    fn notify(&self, notification: Notification);
}

/// Default sink: logs at info level.
#[derive(Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, notification: Notification) {
        info!("notification: {}", notification);
    }
}

/// Recording sink for tests.
#[derive(Default)]
pub struct CollectingSink {
    collected: RefCell<Vec<Notification>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        CollectingSink::default()
    }

    pub fn take(&self) -> Vec<Notification> {
        self.collected.borrow_mut().drain(..).collect()
    }

    pub fn count(&self) -> usize {
        self.collected.borrow().len()
    }
}

impl NotificationSink for CollectingSink {
    fn notify(&self, notification: Notification) {
        self.collected.borrow_mut().push(notification);
    }
}
