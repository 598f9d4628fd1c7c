//! Tracking-exclusion state machine.
//!
//! Every tab id is independently in one of four states; incoming native
//! events consult the state to decide whether they are processed, absorbed
//! with a silent cache refresh, or dropped entirely.
//!
//! Tracking suppression is counted: nested self-inflicted operations on the
//! same tab each take their own hold, and the tab leaves `Tracking` only when
//! every hold has been released. Holds are released through the RAII
//! [`TrackingGuard`], which covers every exit path including failures.
//!
//! `PendingRemoval` is sticky: it marks the first `removed` event for a tab
//! and silences the browser's duplicate fire for the same id.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::types::tab::TabId;

/// Observable per-tab tracking state, by priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabTrackState {
    Normal,
    /// The engine created this tab itself; the creation event is skipped.
    SelfCreated,
    /// Events refresh the cache but trigger no downstream broadcast.
    Tracking,
    /// The tab has been (or is being) removed; further events are dropped.
    PendingRemoval,
}

#[derive(Default)]
struct Entry {
    tracking_holds: u32,
    self_created: bool,
    pending_removal: bool,
}

impl Entry {
    fn is_empty(&self) -> bool {
        self.tracking_holds == 0 && !self.self_created && !self.pending_removal
    }
}

/// Shared tracking-exclusion registry.
#[derive(Default)]
pub struct TabTracker {
    entries: RefCell<HashMap<TabId, Entry>>,
}

impl TabTracker {
    pub fn new() -> Rc<Self> {
        Rc::new(TabTracker::default())
    }

    pub fn state(&self, id: TabId) -> TabTrackState {
        let entries = self.entries.borrow();
        match entries.get(&id) {
            None => TabTrackState::Normal,
            Some(entry) if entry.pending_removal => TabTrackState::PendingRemoval,
            Some(entry) if entry.tracking_holds > 0 => TabTrackState::Tracking,
            Some(entry) if entry.self_created => TabTrackState::SelfCreated,
            Some(_) => TabTrackState::Normal,
        }
    }

    pub fn is_tracking(&self, id: TabId) -> bool {
        self.state(id) == TabTrackState::Tracking
    }

    pub fn is_pending_removal(&self, id: TabId) -> bool {
        self.entries
            .borrow()
            .get(&id)
            .map_or(false, |e| e.pending_removal)
    }

    /// True when events for this tab must not be processed at all
    /// (tracking-suppressed or pending removal).
    pub fn is_suppressed(&self, id: TabId) -> bool {
        matches!(
            self.state(id),
            TabTrackState::Tracking | TabTrackState::PendingRemoval
        )
    }

    /// Takes tracking holds on the given ids, released when the returned
    /// guard is dropped.
    pub fn suppress(self: &Rc<Self>, ids: impl IntoIterator<Item = TabId>) -> TrackingGuard {
        let mut guard = TrackingGuard {
            tracker: Rc::clone(self),
            ids: Vec::new(),
        };
        guard.extend(ids);
        guard
    }

    /// Adds one tracking hold. Prefer [`TabTracker::suppress`]; this exists
    /// for callers managing pairing explicitly.
    pub fn begin_tracking(&self, id: TabId) {
        self.entries.borrow_mut().entry(id).or_default().tracking_holds += 1;
    }

    /// Releases one tracking hold. Unbalanced releases are ignored.
    pub fn end_tracking(&self, id: TabId) {
        let mut entries = self.entries.borrow_mut();
        if let Some(entry) = entries.get_mut(&id) {
            entry.tracking_holds = entry.tracking_holds.saturating_sub(1);
            if entry.is_empty() {
                entries.remove(&id);
            }
        }
    }

    /// Marks a tab the engine is about to create itself, so its creation
    /// event is skipped.
    pub fn mark_self_created(&self, id: TabId) {
        self.entries.borrow_mut().entry(id).or_default().self_created = true;
    }

    /// Consumes the self-created marker, returning whether it was set.
    pub fn take_self_created(&self, id: TabId) -> bool {
        let mut entries = self.entries.borrow_mut();
        match entries.get_mut(&id) {
            Some(entry) if entry.self_created => {
                entry.self_created = false;
                if entry.is_empty() {
                    entries.remove(&id);
                }
                true
            }
            _ => false,
        }
    }

    /// Marks a tab as pending removal. Returns `true` when it was already
    /// pending — i.e. this is the duplicate fire of the same removal.
    pub fn mark_pending_removal(&self, id: TabId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let entry = entries.entry(id).or_default();
        let was_pending = entry.pending_removal;
        entry.pending_removal = true;
        was_pending
    }
}

/// RAII release of tracking holds.
pub struct TrackingGuard {
    tracker: Rc<TabTracker>,
    ids: Vec<TabId>,
}

impl TrackingGuard {
    /// Takes additional holds under this guard.
    pub fn extend(&mut self, ids: impl IntoIterator<Item = TabId>) {
        for id in ids {
            self.tracker.begin_tracking(id);
            self.ids.push(id);
        }
    }

    /// Releases every hold this guard has on `id` ahead of drop. Used when a
    /// tab is filtered out of a batch mid-operation.
    pub fn release(&mut self, id: TabId) {
        let mut kept = Vec::with_capacity(self.ids.len());
        for held in self.ids.drain(..) {
            if held == id {
                self.tracker.end_tracking(held);
            } else {
                kept.push(held);
            }
        }
        self.ids = kept;
    }

    pub fn held_ids(&self) -> &[TabId] {
        &self.ids
    }
}

impl Drop for TrackingGuard {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            self.tracker.end_tracking(id);
        }
    }
}
