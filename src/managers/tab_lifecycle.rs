//! Tab Lifecycle Controller.
//!
//! Subscribes to native tab events, reconciles them against the tab cache,
//! suppresses self-inflicted event storms via the tracking-exclusion state in
//! [`TabTracker`], and re-broadcasts semantically meaningful change events on
//! the tabs channel.
//!
//! Browsers fire one event per tab per micro-operation; moving ten tabs fires
//! ten move events. Re-rendering a group view on every one is wasteful and
//! visually noisy, so per-tab events are coalesced into the [`UpdateBatch`]
//! keyed by group and flushed as one `updated.group` (or `updated.all` for
//! the unsync bucket) signal per key.
//!
//! The event handlers themselves are synchronous; the async [`TabLifecycle::run`]
//! pump applies the creation-settle delay and schedules the batch flush.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::{debug, warn};
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::browser::api::BrowserApi;
use crate::services::settings::{Settings, KEY_COLOR_SCHEME, KEY_SHOW_TABS_WITH_THUMBNAILS};
use crate::types::group::GroupViews;
use crate::types::message::{actions, Message, SendOptions};
use crate::types::tab::{BatchKey, Tab, TabChangeInfo, TabId, TabStatus, WindowId};

use super::broadcast_bus::BroadcastBus;
use super::tab_cache::TabCache;
use super::tab_tracker::TabTracker;

/// Delay before a creation event is processed, giving other
/// extension-installed listeners (tree-tab managers) time to attach first.
/// UX debouncing only, never a correctness device.
pub const CREATED_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Native tab event, as fed to the async pump.
#[derive(Debug, Clone)]
pub enum TabEvent {
    Activated {
        tab_id: TabId,
        window_id: WindowId,
        previous_tab_id: Option<TabId>,
    },
    Created(Tab),
    Updated(Tab),
    Removed {
        tab_id: TabId,
        is_window_closing: bool,
    },
    Moved {
        tab_id: TabId,
    },
    Detached {
        tab_id: TabId,
        old_window_id: WindowId,
    },
    Attached {
        tab_id: TabId,
        new_window_id: WindowId,
    },
}

/// Debounced coalescing queue: many rapid per-tab change events collapse
/// into one pending entry per (key, tab) pair before the flush.
#[derive(Default)]
pub struct UpdateBatch {
    pending: RefCell<HashMap<BatchKey, Vec<TabId>>>,
}

impl UpdateBatch {
    /// Enqueues a tab under a key. Idempotent: a tab already pending under
    /// the same key stays a single entry.
    pub fn add(&self, key: BatchKey, tab_id: TabId) {
        let mut pending = self.pending.borrow_mut();
        let entry = pending.entry(key).or_default();
        if !entry.contains(&tab_id) {
            entry.push(tab_id);
        }
    }

    /// Removes a pending entry; how a removed tab "cancels" its refresh.
    pub fn remove(&self, key: BatchKey, tab_id: TabId) {
        let mut pending = self.pending.borrow_mut();
        if let Some(entry) = pending.get_mut(&key) {
            entry.retain(|id| *id != tab_id);
            if entry.is_empty() {
                pending.remove(&key);
            }
        }
    }

    /// Drains every pending key. No ordering guarantee between keys.
    pub fn take_pending(&self) -> Vec<(BatchKey, Vec<TabId>)> {
        self.pending.borrow_mut().drain().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    pub fn pending_for(&self, key: BatchKey) -> Vec<TabId> {
        self.pending
            .borrow()
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }
}

/// Options the controller keeps live via storage change notification.
#[derive(Debug, Clone)]
pub struct LiveOptions {
    pub show_tabs_with_thumbnails: bool,
    pub color_scheme: String,
}

pub struct TabLifecycle {
    browser: Rc<dyn BrowserApi>,
    cache: Rc<TabCache>,
    tracker: Rc<TabTracker>,
    tabs_bus: Rc<BroadcastBus>,
    main_bus: Rc<BroadcastBus>,
    views: Rc<dyn GroupViews>,
    batch: UpdateBatch,
    options: RefCell<LiveOptions>,
}

impl TabLifecycle {
    pub fn new(
        browser: Rc<dyn BrowserApi>,
        cache: Rc<TabCache>,
        tracker: Rc<TabTracker>,
        tabs_bus: Rc<BroadcastBus>,
        main_bus: Rc<BroadcastBus>,
        views: Rc<dyn GroupViews>,
        settings: &Settings,
    ) -> Rc<Self> {
        Rc::new(TabLifecycle {
            browser,
            cache,
            tracker,
            tabs_bus,
            main_bus,
            views,
            batch: UpdateBatch::default(),
            options: RefCell::new(LiveOptions {
                show_tabs_with_thumbnails: settings
                    .get_bool(KEY_SHOW_TABS_WITH_THUMBNAILS, false),
                color_scheme: settings.get_string(KEY_COLOR_SCHEME, "auto"),
            }),
        })
    }

    pub fn options(&self) -> LiveOptions {
        self.options.borrow().clone()
    }

    pub fn batch(&self) -> &UpdateBatch {
        &self.batch
    }

    /// Keeps the live options in sync with storage writes.
    pub fn bind_settings(self: &Rc<Self>, settings: &Settings) {
        let controller = Rc::downgrade(self);
        settings.on_changed(Rc::new(move |key: &str, value: &Value| {
            let Some(controller) = controller.upgrade() else {
                return;
            };
            match key {
                KEY_SHOW_TABS_WITH_THUMBNAILS => {
                    if let Value::Bool(enabled) = value {
                        controller.options.borrow_mut().show_tabs_with_thumbnails = *enabled;
                    }
                }
                KEY_COLOR_SCHEME => {
                    if let Value::String(scheme) = value {
                        controller.options.borrow_mut().color_scheme = scheme.clone();
                    }
                }
                _ => {}
            }
        }));
    }

    fn send(&self, action: &str, data: Value) {
        // UI contexts apply the change; the sender already has.
        self.tabs_bus
            .send(Message::new(action, data), SendOptions::remote_only());
    }

    // --- event handlers ---

    pub fn on_activated(
        &self,
        tab_id: TabId,
        window_id: WindowId,
        previous_tab_id: Option<TabId>,
    ) {
        if self.tracker.is_suppressed(tab_id)
            || previous_tab_id.map_or(false, |id| self.tracker.is_suppressed(id))
        {
            return;
        }

        debug!("lifecycle: activated {} in {}", tab_id, window_id);

        self.send(
            actions::UPDATED,
            json!({ "tabId": tab_id, "changeInfo": TabChangeInfo::active(true) }),
        );
        if let Some(previous) = previous_tab_id {
            self.send(
                actions::UPDATED,
                json!({ "tabId": previous, "changeInfo": TabChangeInfo::active(false) }),
            );
        }
    }

    /// Processes a creation event (the settle delay has already elapsed in
    /// the pump). Self-created tabs are skipped; pinned tabs are cached but
    /// never assigned a group.
    pub fn on_created(&self, tab: &Tab) {
        if self.tracker.take_self_created(tab.id) {
            return;
        }

        debug!("lifecycle: created {}", tab.id);

        self.cache.set_tab(tab);

        if tab.pinned {
            debug!("lifecycle: skip pinned tab {}", tab.id);
            return;
        }

        if let Err(e) = self.cache.set_tab_group(tab.id, None, Some(tab.window_id)) {
            warn!("lifecycle: can't set group for created {}: {}", tab.id, e);
        }

        let group_id = self.cache.get_tab_group(tab.id);
        self.batch.add(BatchKey::from(group_id), tab.id);
    }

    pub fn on_updated(&self, tab: &Tab) {
        if self.tracker.is_pending_removal(tab.id) {
            return;
        }

        if self.tracker.is_tracking(tab.id) {
            self.cache.set_tab(tab);
            return;
        }

        let change = self.cache.real_tab_state_changed(tab);
        self.cache.set_tab(tab);

        let Some(change) = change else {
            return;
        };

        if tab.pinned && change.pinned.is_none() {
            return;
        }

        if let Some(fav_icon_url) = &change.fav_icon_url {
            if let Err(e) = self.cache.set_tab_fav_icon(tab.id, fav_icon_url) {
                warn!("lifecycle: can't set favicon for {}: {}", tab.id, e);
            }
        }

        // A pin/hide transition takes exclusive handling priority: group
        // membership is stripped on pin/hide, re-derived on unpin, re-applied
        // via the show path on unhide. No generic broadcast for this event.
        if change.pinned.is_some() || change.hidden.is_some() {
            if change.pinned == Some(true) || change.hidden == Some(true) {
                debug!("lifecycle: remove group for pinned/hidden tab {}", tab.id);
                if let Err(e) = self.cache.remove_tab_group(tab.id) {
                    warn!("lifecycle: can't remove group for {}: {}", tab.id, e);
                }
            } else if change.pinned == Some(false) {
                debug!("lifecycle: tab {} unpinned", tab.id);
                if let Err(e) = self.cache.set_tab_group(tab.id, None, Some(tab.window_id)) {
                    warn!("lifecycle: can't set group for unpinned {}: {}", tab.id, e);
                }
            } else if change.hidden == Some(false) {
                debug!("lifecycle: tab {} shown", tab.id);
                match self.cache.get_tab_group(tab.id) {
                    Some(group_id) => {
                        // Re-apply the remembered group; the group view
                        // refresh reaches UI contexts through the flush.
                        if let Err(e) =
                            self.cache.set_tab_group(tab.id, Some(group_id), None)
                        {
                            warn!("lifecycle: can't re-apply group for {}: {}", tab.id, e);
                        }
                        self.batch.add(BatchKey::Group(group_id), tab.id);
                    }
                    None => {
                        if let Err(e) =
                            self.cache.set_tab_group(tab.id, None, Some(tab.window_id))
                        {
                            warn!("lifecycle: can't set group for shown {}: {}", tab.id, e);
                        }
                    }
                }
            }
            return;
        }

        self.send(
            actions::UPDATED,
            json!({ "tabId": tab.id, "changeInfo": change }),
        );

        let thumbnails_enabled = self.options.borrow().show_tabs_with_thumbnails;
        if thumbnails_enabled && change.status == Some(TabStatus::Complete) {
            // Fire-and-forget; capture failures never fail the handler.
            self.update_thumbnail(tab.id);
        }
    }

    pub fn on_removed(&self, tab_id: TabId, is_window_closing: bool) {
        let duplicate = self.tracker.mark_pending_removal(tab_id);

        let group_id = self.cache.get_tab_group(tab_id);
        self.batch.remove(BatchKey::from(group_id), tab_id);

        if duplicate {
            // Browsers are known to fire removal twice for one tab; the
            // second fire purges silently.
            self.cache.remove_tab(tab_id);
            return;
        }

        debug!(
            "lifecycle: removed {} (window closing: {})",
            tab_id, is_window_closing
        );

        if is_window_closing {
            // Window close may be a session restore the user wants reversed;
            // keep the cache entry so restoration can run.
            self.main_bus.send(
                Message::new(
                    actions::ADD_RESTORE_TAB_ON_REMOVED_WINDOW,
                    json!({ "tabId": tab_id }),
                ),
                SendOptions::remote_only(),
            );
        } else {
            self.cache.remove_tab(tab_id);
            match group_id {
                Some(group_id) => self.send(
                    actions::REMOVED,
                    json!({ "tabId": tab_id, "groupId": group_id }),
                ),
                None => self.send(actions::REMOVED_UNSYNC, json!({ "tabId": tab_id })),
            }
        }
    }

    pub fn on_moved(&self, tab_id: TabId) {
        if self.tracker.is_suppressed(tab_id) {
            return;
        }
        let group_id = self.cache.get_tab_group(tab_id);
        debug!("lifecycle: moved {} in group {:?}", tab_id, group_id);
        self.batch.add(BatchKey::from(group_id), tab_id);
    }

    /// Detach fires before attach; the batch key is the prior window's group.
    pub fn on_detached(&self, tab_id: TabId, old_window_id: WindowId) {
        if self.tracker.is_suppressed(tab_id) {
            return;
        }
        let group_id = self.cache.get_window_group(old_window_id);
        debug!("lifecycle: detached {} from {}", tab_id, old_window_id);
        self.batch.add(BatchKey::from(group_id), tab_id);
    }

    pub fn on_attached(&self, tab_id: TabId, new_window_id: WindowId) {
        if self.tracker.is_suppressed(tab_id) {
            return;
        }

        debug!("lifecycle: attached {} to {}", tab_id, new_window_id);

        if let Err(e) = self.cache.set_tab_group(tab_id, None, Some(new_window_id)) {
            warn!("lifecycle: can't set group for attached {}: {}", tab_id, e);
        }

        let group_id = self.cache.get_tab_group(tab_id);
        self.batch.add(BatchKey::from(group_id), tab_id);
    }

    // --- thumbnails ---

    /// Captures a tab as a JPEG data-URL thumbnail, stores it, and announces
    /// it as an `updated` change. Failures are logged, never propagated.
    pub fn update_thumbnail(&self, tab_id: TabId) {
        if self.tracker.is_pending_removal(tab_id) {
            return;
        }

        let tab = match self.browser.get_tab(tab_id) {
            Ok(tab) => tab,
            Err(_) => return,
        };

        if !tab.is_loaded() {
            return;
        }

        if tab.discarded {
            // A discarded tab has nothing to capture; reload and let the
            // completion update retrigger the capture.
            if let Err(e) = self.browser.reload_tab(tab_id, false) {
                warn!("lifecycle: can't reload discarded {}: {}", tab_id, e);
            }
            return;
        }

        let jpeg = match self.browser.capture_tab(tab_id) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                warn!("lifecycle: can't capture {}: {}", tab_id, e);
                return;
            }
        };

        let thumbnail = format!("data:image/jpeg;base64,{}", BASE64.encode(jpeg));

        if let Err(e) = self.cache.set_tab_thumbnail(tab_id, &thumbnail) {
            warn!("lifecycle: can't store thumbnail for {}: {}", tab_id, e);
            return;
        }

        self.send(
            actions::UPDATED,
            json!({ "tabId": tab_id, "changeInfo": TabChangeInfo::thumbnail(thumbnail) }),
        );
    }

    // --- batch flush ---

    /// Flushes every pending batch key into one aggregated broadcast per
    /// key: `updated.group` for a group key, `updated.all` for the unsync
    /// bucket. Returns the number of keys flushed.
    pub fn flush_batch(&self) -> usize {
        let pending = self.batch.take_pending();
        let with_thumbnails = self.options.borrow().show_tabs_with_thumbnails;
        let flushed = pending.len();

        for (key, tab_ids) in pending {
            debug!("lifecycle: flush {:?} ({} tab(s))", key, tab_ids.len());
            match key {
                BatchKey::Group(group_id) => {
                    let tabs = self.views.group_tabs(group_id, with_thumbnails);
                    self.send(
                        actions::UPDATED_GROUP,
                        json!({ "groupId": group_id, "tabs": tabs }),
                    );
                }
                BatchKey::Unsync => {
                    let windows = self.views.window_views(with_thumbnails);
                    self.send(actions::UPDATED_ALL, json!({ "windows": windows }));
                }
            }
        }

        flushed
    }

    /// Async pump: applies the creation-settle delay, dispatches events to
    /// the synchronous handlers, and flushes the batch once the event stream
    /// goes momentarily quiet. Runs until the sender side is dropped.
    pub async fn run(self: Rc<Self>, mut events: UnboundedReceiver<TabEvent>) {
        while let Some(event) = events.recv().await {
            self.settle_and_dispatch(event).await;

            // Drain whatever arrived while handling, then flush once.
            while let Ok(event) = events.try_recv() {
                self.settle_and_dispatch(event).await;
            }
            self.flush_batch();
        }
        self.flush_batch();
    }

    async fn settle_and_dispatch(&self, event: TabEvent) {
        if matches!(event, TabEvent::Created(_)) {
            tokio::time::sleep(CREATED_SETTLE_DELAY).await;
        }
        self.dispatch(event);
    }

    /// Synchronous dispatch of one event; the correctness core, testable
    /// without a runtime.
    pub fn dispatch(&self, event: TabEvent) {
        match event {
            TabEvent::Activated {
                tab_id,
                window_id,
                previous_tab_id,
            } => self.on_activated(tab_id, window_id, previous_tab_id),
            TabEvent::Created(tab) => self.on_created(&tab),
            TabEvent::Updated(tab) => self.on_updated(&tab),
            TabEvent::Removed {
                tab_id,
                is_window_closing,
            } => self.on_removed(tab_id, is_window_closing),
            TabEvent::Moved { tab_id } => self.on_moved(tab_id),
            TabEvent::Detached {
                tab_id,
                old_window_id,
            } => self.on_detached(tab_id, old_window_id),
            TabEvent::Attached {
                tab_id,
                new_window_id,
            } => self.on_attached(tab_id, new_window_id),
        }
    }
}
