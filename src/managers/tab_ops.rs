//! Tab Mutation Operations.
//!
//! Batch-oriented wrappers around native tab mutation calls with
//! retry-degradation (an array-form call that the browser rejects falls back
//! to one call per tab) and container re-homing: no native API changes a
//! tab's container in place, so joining a group with a different container
//! destroys and recreates the tab while preserving its session data, under
//! tracking suppression so the lifecycle controller never sees the swap.

use std::rc::Rc;

use log::{debug, error, warn};
use url::Url;
use uuid::Uuid;

use crate::browser::api::{BrowserApi, CreateTabParams, MoveTabParams, TabQuery, UpdateTabParams};
use crate::services::notifications::{Notification, NotificationSink};
use crate::types::container::CookieStoreId;
use crate::types::errors::TabOpError;
use crate::types::group::{Group, GroupStore};
use crate::types::tab::{GroupId, Tab, TabId, TabSession, TabStatus, WindowId};

use super::container_registry::ContainerRegistry;
use super::tab_cache::TabCache;
use super::tab_tracker::TabTracker;

/// Internal help page a disallowed URL is rewritten to; the original URL is
/// preserved as the fragment for display and debugging.
pub const UNSUPPORTED_URL_PAGE: &str = "/help/unsupported-url.html";

/// Batch native calls, with their degradation schema fixed at compile time:
/// `Show`/`Hide`/`Discard`/`Remove` try the array form first and fall back
/// one-by-one; `Reload` has no array form and always goes one-by-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAction {
    Show,
    Hide,
    Discard,
    Remove,
    Reload { bypass_cache: bool },
}

impl BatchAction {
    fn name(&self) -> &'static str {
        match self {
            BatchAction::Show => "show",
            BatchAction::Hide => "hide",
            BatchAction::Discard => "discard",
            BatchAction::Remove => "remove",
            BatchAction::Reload { .. } => "reload",
        }
    }

    fn has_array_form(&self) -> bool {
        !matches!(self, BatchAction::Reload { .. })
    }
}

/// Logical tab-open request, normalized by [`TabOps::create`] into native
/// creation parameters.
#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    pub url: Option<String>,
    pub active: bool,
    pub pinned: bool,
    pub title: Option<String>,
    pub index: Option<u32>,
    pub window_id: Option<WindowId>,
    pub opener_tab_id: Option<TabId>,
    pub cookie_store_id: Option<CookieStoreId>,
    pub container: NewTabContainerParams,
    pub group_id: Option<GroupId>,
    pub fav_icon_url: Option<String>,
    pub thumbnail: Option<String>,
}

/// Container policy of the destination group.
#[derive(Debug, Clone)]
pub struct NewTabContainerParams {
    pub new_tab_container: CookieStoreId,
    pub if_different_container_re_open: bool,
    pub exclude_containers_for_re_open: Vec<CookieStoreId>,
}

impl Default for NewTabContainerParams {
    fn default() -> Self {
        NewTabContainerParams {
            new_tab_container: CookieStoreId::default_store(),
            if_different_container_re_open: false,
            exclude_containers_for_re_open: Vec::new(),
        }
    }
}

impl From<&Group> for NewTabContainerParams {
    fn from(group: &Group) -> Self {
        NewTabContainerParams {
            new_tab_container: group.new_tab_container.clone(),
            if_different_container_re_open: group.if_different_container_re_open,
            exclude_containers_for_re_open: group.exclude_containers_for_re_open.clone(),
        }
    }
}

/// Parameters for [`TabOps::move_to_group`].
#[derive(Debug, Clone)]
pub struct MoveParams {
    /// Destination index; `-1` appends.
    pub new_tab_index: i64,
    pub show_notification: bool,
}

impl Default for MoveParams {
    fn default() -> Self {
        MoveParams {
            new_tab_index: -1,
            show_notification: true,
        }
    }
}

pub struct TabOps {
    browser: Rc<dyn BrowserApi>,
    cache: Rc<TabCache>,
    tracker: Rc<TabTracker>,
    registry: Rc<ContainerRegistry>,
    groups: Rc<dyn GroupStore>,
    sink: Rc<dyn NotificationSink>,
}

impl TabOps {
    pub fn new(
        browser: Rc<dyn BrowserApi>,
        cache: Rc<TabCache>,
        tracker: Rc<TabTracker>,
        registry: Rc<ContainerRegistry>,
        groups: Rc<dyn GroupStore>,
        sink: Rc<dyn NotificationSink>,
    ) -> Rc<Self> {
        Rc::new(TabOps {
            browser,
            cache,
            tracker,
            registry,
            groups,
            sink,
        })
    }

    // --- creation ---

    /// Normalizes a logical tab-open request and creates the tab.
    ///
    /// Disallowed URL schemes are rewritten to the unsupported-URL help page
    /// with the original URL as the fragment. Inactive non-about tabs are
    /// created discarded with their title preserved. The target window is
    /// resolved through the destination group when that group is loaded; the
    /// container through [`TabOps::new_tab_container`], materializing a
    /// fresh temporary container when the policy calls for one.
    ///
    /// `skip_created` pre-registers the new tab id so the lifecycle
    /// controller skips its creation event.
    pub fn create(
        &self,
        request: CreateRequest,
        skip_created: bool,
    ) -> Result<Tab, TabOpError> {
        let mut params = CreateTabParams {
            active: request.active,
            pinned: request.pinned,
            index: request.index,
            opener_tab_id: request.opener_tab_id,
            ..CreateTabParams::default()
        };

        if let Some(url) = &request.url {
            if url != "about:newtab" {
                params.url = Some(normalize_create_url(url));
            }
        }

        if !params.active && !params.pinned {
            if let Some(url) = &params.url {
                if !url.starts_with("about:") {
                    params.discarded = true;
                    params.title = request.title.clone();
                }
            }
        }

        params.window_id = request
            .group_id
            .and_then(|g| self.cache.get_window_id(g))
            .or(request.window_id);

        let current = request
            .cookie_store_id
            .unwrap_or_else(CookieStoreId::default_store);
        let mut resolved = self.new_tab_container(
            params.url.as_deref(),
            None,
            &current,
            &request.container,
        );

        if resolved == CookieStoreId::temporary_sentinel() {
            resolved = self
                .registry
                .create_temporary()
                .map_err(|e| TabOpError::ContainerError(e.to_string()))?
                .cookie_store_id;
        } else {
            match self.registry.get(&resolved) {
                Some(container) => resolved = container.cookie_store_id,
                None => {
                    // Stale container reference; keep responding.
                    error!("ops: no container record for {}, using default", resolved);
                    resolved = CookieStoreId::default_store();
                }
            }
        }
        params.cookie_store_id = Some(resolved);

        let mut tab = self
            .browser
            .create_tab(params)
            .map_err(|e| TabOpError::NativeError(e.to_string()))?;

        if skip_created {
            self.tracker.mark_self_created(tab.id);
        }

        let session = TabSession {
            group_id: request.group_id,
            fav_icon_url: request.fav_icon_url,
            thumbnail: request.thumbnail,
        };
        self.cache.set_tab(&tab);
        if let Err(e) = self.cache.set_tab_session(tab.id, session) {
            warn!("ops: can't persist session for created {}: {}", tab.id, e);
        }
        self.cache.apply_tab_session(&mut tab);

        debug!("ops: created {} in {}", tab.id, tab.cookie_store_id);
        Ok(tab)
    }

    /// Container decision for a tab joining a group. Total over its inputs;
    /// the result is always one of {current, default, target}:
    ///   (a) target already matches, or the tab sits in a temporary
    ///       container: keep as-is;
    ///   (b) a non-http(s)/ftp URL on a tab not mid-navigation: forced
    ///       default (internal pages cannot run in arbitrary containers);
    ///   (c) re-open-on-mismatch requested: keep current when excluded,
    ///       else switch to target;
    ///   (d) otherwise switch away only from the default container.
    pub fn new_tab_container(
        &self,
        url: Option<&str>,
        status: Option<TabStatus>,
        cookie_store_id: &CookieStoreId,
        params: &NewTabContainerParams,
    ) -> CookieStoreId {
        if *cookie_store_id == params.new_tab_container
            || self.registry.is_temporary(cookie_store_id)
        {
            return cookie_store_id.clone();
        }

        if let Some(url) = url {
            if !url.starts_with("http")
                && !url.starts_with("ftp")
                && status != Some(TabStatus::Loading)
            {
                return CookieStoreId::default_store();
            }
        }

        if params.if_different_container_re_open {
            return if params
                .exclude_containers_for_re_open
                .contains(cookie_store_id)
            {
                cookie_store_id.clone()
            } else {
                params.new_tab_container.clone()
            };
        }

        if self.registry.is_default(cookie_store_id) {
            params.new_tab_container.clone()
        } else {
            cookie_store_id.clone()
        }
    }

    // --- queries ---

    /// Queries a window's tabs, drops ids pending removal, and hydrates the
    /// result with cached session fields (pinned queries skip hydration;
    /// pinned tabs never carry groups).
    pub fn get(
        &self,
        window_id: Option<WindowId>,
        pinned: Option<bool>,
        hidden: Option<bool>,
        include_fav_icon: bool,
        include_thumbnail: bool,
    ) -> Vec<Tab> {
        let query = TabQuery {
            window_id,
            pinned,
            hidden,
            ..TabQuery::default()
        };

        let mut tabs: Vec<Tab> = self
            .browser
            .query_tabs(&query)
            .into_iter()
            .filter(|tab| !self.tracker.is_pending_removal(tab.id))
            .collect();

        if pinned != Some(true) {
            for tab in &mut tabs {
                self.cache
                    .load_tab_session(tab, include_fav_icon, include_thumbnail);
            }
        } else {
            for tab in &mut tabs {
                tab.group_id = None;
            }
        }

        tabs
    }

    /// Fetches one tab, with the removal guard applied. The group field is
    /// cleared; it is never trusted from the native object.
    pub fn get_one(&self, tab_id: TabId) -> Option<Tab> {
        if self.tracker.is_pending_removal(tab_id) {
            return None;
        }
        match self.browser.get_tab(tab_id) {
            Ok(mut tab) => {
                tab.group_id = None;
                Some(tab)
            }
            Err(_) => None,
        }
    }

    /// Fetches and hydrates a list of tabs; missing ids are dropped.
    pub fn get_list(
        &self,
        tab_ids: &[TabId],
        include_fav_icon: bool,
        include_thumbnail: bool,
    ) -> Vec<Tab> {
        tab_ids
            .iter()
            .filter_map(|id| self.get_one(*id))
            .map(|mut tab| {
                self.cache
                    .load_tab_session(&mut tab, include_fav_icon, include_thumbnail);
                tab
            })
            .collect()
    }

    pub fn get_active(&self, window_id: WindowId) -> Option<Tab> {
        self.get(Some(window_id), None, Some(false), false, false)
            .into_iter()
            .find(|tab| tab.active)
    }

    /// Re-fetches tabs that still exist, dropping the rest. A count mismatch
    /// is logged as an assertion failure but does not halt.
    fn filter_exist(&self, tab_ids: &[TabId]) -> Vec<Tab> {
        let tabs: Vec<Tab> = tab_ids
            .iter()
            .filter_map(|id| self.get_one(*id))
            .collect();

        if tabs.len() != tab_ids.len() {
            let missing: Vec<TabId> = tab_ids
                .iter()
                .filter(|id| !tabs.iter().any(|t| t.id == **id))
                .copied()
                .collect();
            error!("ops: assertion: tabs missing after filter: {:?}", missing);
        }

        tabs
    }

    // --- activation ---

    /// Activates `tab_id`, or — given only a candidate list — the most
    /// recently accessed candidate. Failures are logged.
    pub fn set_active(&self, tab_id: Option<TabId>, tabs: &[Tab]) -> Option<TabId> {
        let target = match tab_id {
            Some(id) => Some(id),
            None => tabs
                .iter()
                .max_by_key(|tab| tab.last_accessed)
                .map(|tab| tab.id),
        };

        if let Some(id) = target {
            if let Err(e) = self.browser.update_tab(
                id,
                UpdateTabParams {
                    active: Some(true),
                    ..UpdateTabParams::default()
                },
            ) {
                warn!("ops: can't activate {}: {}", id, e);
                return None;
            }
        }

        target
    }

    /// Keeps a window usable while its visible tabs leave: activates a
    /// pinned tab when one exists, otherwise synthesizes a blank active tab.
    pub fn create_temp_active_tab(
        &self,
        window_id: WindowId,
        create_pinned_tab: bool,
    ) -> Option<Tab> {
        let pinned_tabs = self.get(Some(window_id), Some(true), None, false, false);

        if !pinned_tabs.is_empty() {
            if !pinned_tabs.iter().any(|tab| tab.active) {
                self.set_active(None, &pinned_tabs);
            }
            return None;
        }

        let request = CreateRequest {
            url: Some(if create_pinned_tab {
                "about:blank".to_string()
            } else {
                "about:newtab".to_string()
            }),
            pinned: create_pinned_tab,
            active: true,
            window_id: Some(window_id),
            ..CreateRequest::default()
        };

        match self.create(request, true) {
            Ok(tab) => Some(tab),
            Err(e) => {
                warn!("ops: can't create temp active tab: {}", e);
                None
            }
        }
    }

    // --- moving ---

    /// Moves tabs into a group.
    ///
    /// Pinned tabs and tabs blocked from hiding are excluded up front and
    /// reported as one aggregated notification per failure class. Before any
    /// move, windows whose active tab is leaving get another visible tab
    /// activated (or a temporary one created) so the browser never
    /// auto-selects arbitrarily. Tabs whose container must change are
    /// destroyed and recreated under tracking suppression; the rest move
    /// natively in one batch. Finally the tabs are shown or hidden depending
    /// on whether the destination group is loaded, and their group
    /// assignment is written through.
    pub fn move_to_group(
        &self,
        tab_ids: &[TabId],
        group_id: GroupId,
        params: MoveParams,
    ) -> Result<Vec<Tab>, TabOpError> {
        let mut tabs = self.get_list(tab_ids, false, false);
        if tabs.is_empty() {
            debug!("ops: move: no tabs exist");
            return Ok(Vec::new());
        }

        let group = self
            .groups
            .get(group_id)
            .ok_or_else(|| TabOpError::GroupNotFound(group_id.to_string()))?;

        let mut guard = self.tracker.suppress(tabs.iter().map(|t| t.id));

        let group_window_id = self.cache.get_window_id(group_id);
        let window_id = group_window_id
            .or_else(|| self.browser.last_focused_window())
            .ok_or(TabOpError::NoTargetWindow)?;

        let mut show_pinned_message = false;
        let mut titles_cant_hide: Vec<String> = Vec::new();
        let mut active_tabs: Vec<Tab> = Vec::new();

        tabs.retain(|tab| {
            if tab.pinned {
                show_pinned_message = true;
                guard.release(tab.id);
                return false;
            }
            if !tab.can_be_hidden() {
                titles_cant_hide.push(tab.short_title(20));
                guard.release(tab.id);
                return false;
            }
            if tab.active && tab.group_id != Some(group_id) {
                active_tabs.push(tab.clone());
            }
            true
        });

        if !tabs.is_empty() {
            let moving_ids: Vec<TabId> = tabs.iter().map(|t| t.id).collect();
            for active_tab in &active_tabs {
                self.release_active_tab(active_tab, &moving_ids, window_id);
            }
            active_tabs.clear();

            // Container re-homing: destroy and recreate where the target
            // group's container policy demands a different cookie store.
            let container_params = NewTabContainerParams::from(&group);
            let mut ids_to_remove: Vec<TabId> = Vec::new();
            let mut rehomed: Vec<Tab> = Vec::new();

            for tab in tabs {
                let target = self.new_tab_container(
                    Some(&tab.url),
                    Some(tab.status),
                    &tab.cookie_store_id,
                    &container_params,
                );

                if tab.cookie_store_id == target {
                    if tab.active {
                        active_tabs.push(tab.clone());
                    }
                    rehomed.push(tab);
                    continue;
                }

                debug!("ops: re-homing {} into {}", tab.id, target);
                ids_to_remove.push(tab.id);

                let session = self.cache.get_tab_session(tab.id);
                let was_active = tab.active;
                let new_tab = self.create(
                    CreateRequest {
                        url: Some(tab.url.clone()),
                        title: Some(tab.title.clone()),
                        active: false,
                        window_id: Some(window_id),
                        cookie_store_id: Some(target),
                        container: container_params.clone(),
                        group_id: Some(group_id),
                        fav_icon_url: session.fav_icon_url,
                        thumbnail: session.thumbnail,
                        ..CreateRequest::default()
                    },
                    true,
                )?;

                guard.extend([new_tab.id]);
                if was_active {
                    active_tabs.push(new_tab.clone());
                }
                rehomed.push(new_tab);
            }

            self.remove(&ids_to_remove, true);

            let moved_ids: Vec<TabId> = rehomed.iter().map(|t| t.id).collect();
            let mut moved = self.move_native(
                &moved_ids,
                MoveTabParams {
                    index: params.new_tab_index,
                    window_id: Some(window_id),
                },
            );

            if group_window_id.is_some() {
                let hidden_ids: Vec<TabId> =
                    moved.iter().filter(|t| t.hidden).map(|t| t.id).collect();
                self.show(&hidden_ids, false);
                for tab in &mut moved {
                    if hidden_ids.contains(&tab.id) {
                        tab.hidden = false;
                    }
                }
            } else {
                let visible_ids: Vec<TabId> =
                    moved.iter().filter(|t| !t.hidden).map(|t| t.id).collect();
                let hidden = self.hide(&visible_ids, false);
                for tab in &mut moved {
                    if hidden.contains(&tab.id) {
                        tab.hidden = true;
                    }
                }
            }

            for tab in &mut moved {
                match self.cache.set_tab_group(tab.id, Some(group_id), None) {
                    Ok(resolved) => tab.group_id = resolved,
                    Err(e) => warn!("ops: can't persist group for {}: {}", tab.id, e),
                }
            }

            tabs = moved;
        }

        drop(guard);

        if show_pinned_message {
            self.sink.notify(Notification::PinnedTabsNotSupported);
        }
        if !titles_cant_hide.is_empty() {
            self.sink
                .notify(Notification::TabsCannotBeHidden(titles_cant_hide));
        }

        if tabs.is_empty() {
            return Ok(Vec::new());
        }

        if params.show_notification {
            self.sink.notify(Notification::TabsMovedToGroup {
                count: tabs.len(),
                group_title: group.title.clone(),
            });
        }

        Ok(tabs)
    }

    /// Activates another visible tab in the window an active tab is leaving,
    /// or creates a temporary one when that would leave the window empty.
    fn release_active_tab(&self, active_tab: &Tab, moving_ids: &[TabId], dest_window: WindowId) {
        let all_in_window = self.get(Some(active_tab.window_id), None, None, false, false);

        let to_activate: Vec<Tab> = all_in_window
            .iter()
            .filter(|tab| !tab.hidden && !moving_ids.contains(&tab.id))
            .cloned()
            .collect();

        if !to_activate.is_empty() {
            self.set_active(None, &to_activate);
            return;
        }

        let remaining: Vec<&Tab> = all_in_window
            .iter()
            .filter(|tab| !moving_ids.contains(&tab.id))
            .collect();

        let different_windows = active_tab.window_id != dest_window;
        let (last_in_src_group, in_loaded_group, not_in_group) = match active_tab.group_id {
            Some(group_id) => (
                !remaining.iter().any(|tab| tab.group_id == Some(group_id)),
                Some(group_id) == self.cache.get_window_group(active_tab.window_id),
                false,
            ),
            None => (
                false,
                false,
                self.cache.get_window_group(active_tab.window_id).is_none(),
            ),
        };

        if (different_windows && remaining.is_empty())
            || (last_in_src_group && in_loaded_group)
            || not_in_group
        {
            self.create_temp_active_tab(active_tab.window_id, false);
        }
    }

    /// One batch native move; tab ids that no longer exist are filtered out
    /// first. Opener relationships are restored after cross-window moves,
    /// which always drop them.
    pub fn move_native(&self, tab_ids: &[TabId], params: MoveTabParams) -> Vec<Tab> {
        let existing = self.filter_exist(tab_ids);
        if existing.is_empty() {
            return Vec::new();
        }

        let openers: Vec<Option<TabId>> = existing.iter().map(|t| t.opener_tab_id).collect();
        let ids: Vec<TabId> = existing.iter().map(|t| t.id).collect();

        let moved = match self.browser.move_tabs(&ids, &params) {
            Ok(moved) => moved,
            Err(e) => {
                warn!("ops: move failed for {:?}: {}", ids, e);
                return Vec::new();
            }
        };

        if params.window_id.is_some() {
            for (tab, opener) in moved.iter().zip(openers) {
                if let Some(opener_id) = opener {
                    let restore = self.browser.update_tab(
                        tab.id,
                        UpdateTabParams {
                            opener_tab_id: Some(opener_id),
                            ..UpdateTabParams::default()
                        },
                    );
                    if restore.is_err() {
                        debug!("ops: can't restore opener for {}", tab.id);
                    }
                }
            }
        }

        moved
    }

    // --- batch operations ---

    /// Dispatches one batch action. The array form is attempted first when
    /// the schema has one; on rejection the call degrades to one-by-one and
    /// collects partial success — a single bad id never fails the batch.
    /// Returns the ids the action succeeded for.
    fn tabs_action(
        &self,
        action: BatchAction,
        tab_ids: &[TabId],
        skip_tracking: bool,
        silent_remove: bool,
    ) -> Vec<TabId> {
        if tab_ids.is_empty() {
            return Vec::new();
        }

        // Removal always suppresses tracking; silent removal additionally
        // pre-marks the ids so even the first native fire is absorbed.
        let skip_tracking = skip_tracking || action == BatchAction::Remove;
        if action == BatchAction::Remove && silent_remove {
            for id in tab_ids {
                self.tracker.mark_pending_removal(*id);
            }
        }

        let _guard = if skip_tracking {
            Some(self.tracker.suppress(tab_ids.iter().copied()))
        } else {
            None
        };

        debug!("ops: {} {:?}", action.name(), tab_ids);

        if action.has_array_form() {
            match self.array_call(action, tab_ids) {
                Ok(()) => return tab_ids.to_vec(),
                Err(e) => {
                    warn!(
                        "ops: array {} rejected ({}), degrading to one-by-one",
                        action.name(),
                        e
                    );
                }
            }
        }

        let mut succeeded = Vec::with_capacity(tab_ids.len());
        for id in tab_ids {
            match self.single_call(action, *id) {
                Ok(()) => succeeded.push(*id),
                Err(e) => warn!("ops: {} rejected for {}: {}", action.name(), id, e),
            }
        }
        succeeded
    }

    fn array_call(
        &self,
        action: BatchAction,
        tab_ids: &[TabId],
    ) -> Result<(), crate::types::errors::BrowserError> {
        match action {
            BatchAction::Show => self.browser.show_tabs(tab_ids),
            BatchAction::Hide => self.browser.hide_tabs(tab_ids),
            BatchAction::Discard => self.browser.discard_tabs(tab_ids),
            BatchAction::Remove => self.browser.remove_tabs(tab_ids),
            BatchAction::Reload { .. } => unreachable!("reload has no array form"),
        }
    }

    fn single_call(
        &self,
        action: BatchAction,
        tab_id: TabId,
    ) -> Result<(), crate::types::errors::BrowserError> {
        match action {
            BatchAction::Show => self.browser.show_tab(tab_id),
            BatchAction::Hide => self.browser.hide_tab(tab_id),
            BatchAction::Discard => self.browser.discard_tab(tab_id),
            BatchAction::Remove => self.browser.remove_tab(tab_id),
            BatchAction::Reload { bypass_cache } => {
                self.browser.reload_tab(tab_id, bypass_cache)
            }
        }
    }

    pub fn show(&self, tab_ids: &[TabId], skip_tracking: bool) -> Vec<TabId> {
        self.tabs_action(BatchAction::Show, tab_ids, skip_tracking, false)
    }

    pub fn hide(&self, tab_ids: &[TabId], skip_tracking: bool) -> Vec<TabId> {
        self.tabs_action(BatchAction::Hide, tab_ids, skip_tracking, false)
    }

    pub fn discard(&self, tab_ids: &[TabId], skip_tracking: bool) -> Vec<TabId> {
        self.tabs_action(BatchAction::Discard, tab_ids, skip_tracking, false)
    }

    pub fn reload(&self, tab_ids: &[TabId], bypass_cache: bool) -> Vec<TabId> {
        self.tabs_action(BatchAction::Reload { bypass_cache }, tab_ids, false, false)
    }

    pub fn remove(&self, tab_ids: &[TabId], silent_remove: bool) -> Vec<TabId> {
        self.tabs_action(BatchAction::Remove, tab_ids, true, silent_remove)
    }
}

/// Rewrites a URL the browser refuses to open into the unsupported-URL help
/// page, preserving the original as the fragment. `moz-extension` URLs pass
/// only when their host is a well-formed UUID.
pub fn normalize_create_url(url: &str) -> String {
    if is_url_allowed_to_create(url) {
        if url.starts_with("moz-extension") {
            let valid = Url::parse(url)
                .ok()
                .and_then(|u| u.host_str().map(|h| Uuid::parse_str(h).is_ok()))
                .unwrap_or(false);
            if !valid {
                return format!("{}#{}", UNSUPPORTED_URL_PAGE, url);
            }
        }
        url.to_string()
    } else {
        format!("{}#{}", UNSUPPORTED_URL_PAGE, url)
    }
}

/// Schemes a tab may be created with. Privileged pages (`about:` beyond
/// blank, `chrome:`, `javascript:`, `data:`, `file:`) are rejected by the
/// browser's create call, so they are rewritten instead of silently dropped.
pub fn is_url_allowed_to_create(url: &str) -> bool {
    if url == "about:blank" || url == "about:newtab" {
        return true;
    }
    matches!(
        Url::parse(url).map(|u| u.scheme().to_string()).as_deref(),
        Ok("http") | Ok("https") | Ok("ftp") | Ok("moz-extension")
    )
}
