//! In-memory [`BrowserApi`] implementation.
//!
//! Backs the demo wiring and the test suites. Array-form batch calls can be
//! scripted to reject so the one-by-one degradation paths are exercisable.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::types::container::{Container, CookieStoreId};
use crate::types::errors::BrowserError;
use crate::types::tab::{SharingState, Tab, TabId, TabStatus, WindowId};

use super::api::{
    BrowserApi, ContainerParams, CreateTabParams, MoveTabParams, TabQuery, UpdateTabParams,
};

#[derive(Default)]
struct Inner {
    tabs: BTreeMap<TabId, Tab>,
    windows: BTreeSet<WindowId>,
    focused_window: Option<WindowId>,
    containers: BTreeMap<CookieStoreId, Container>,
    next_tab_id: u32,
    next_container_id: u32,
    clock: i64,
    reject_array_calls: HashSet<&'static str>,
    capture_payload: Vec<u8>,
}

impl Inner {
    fn next_tab_id(&mut self) -> TabId {
        self.next_tab_id += 1;
        TabId(self.next_tab_id)
    }

    fn tick(&mut self) -> i64 {
        self.clock += 1;
        self.clock
    }

    fn deactivate_window(&mut self, window_id: WindowId) {
        for tab in self.tabs.values_mut() {
            if tab.window_id == window_id {
                tab.active = false;
            }
        }
    }

    fn reindex_window(&mut self, window_id: WindowId) {
        let mut ids: Vec<(u32, TabId)> = self
            .tabs
            .values()
            .filter(|t| t.window_id == window_id)
            .map(|t| (t.index, t.id))
            .collect();
        ids.sort();
        for (new_index, (_, id)) in ids.into_iter().enumerate() {
            if let Some(tab) = self.tabs.get_mut(&id) {
                tab.index = new_index as u32;
            }
        }
    }
}

/// Scriptable in-memory browser.
pub struct MemoryBrowser {
    inner: RefCell<Inner>,
}

impl Default for MemoryBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBrowser {
    pub fn new() -> Self {
        let mut inner = Inner::default();
        inner.windows.insert(WindowId(1));
        inner.focused_window = Some(WindowId(1));
        inner.capture_payload = vec![0xFF, 0xD8, 0xFF, 0xD9]; // minimal JPEG marker pair
        MemoryBrowser {
            inner: RefCell::new(inner),
        }
    }

    /// Makes the array form of the named batch call (`"show"`, `"hide"`,
    /// `"discard"`, `"remove"`, `"move"`) reject as a whole.
    pub fn reject_array_call(&self, action: &'static str) {
        self.inner.borrow_mut().reject_array_calls.insert(action);
    }

    pub fn add_window(&self, window_id: WindowId) {
        self.inner.borrow_mut().windows.insert(window_id);
    }

    pub fn focus_window(&self, window_id: WindowId) {
        let mut inner = self.inner.borrow_mut();
        inner.windows.insert(window_id);
        inner.focused_window = Some(window_id);
    }

    /// Mutates a tab in place, bypassing the public API. Test hook for state
    /// the engine never writes (sharing state, audible, status transitions).
    pub fn with_tab_mut(&self, id: TabId, f: impl FnOnce(&mut Tab)) {
        if let Some(tab) = self.inner.borrow_mut().tabs.get_mut(&id) {
            f(tab);
        }
    }

    pub fn set_tab_sharing(&self, id: TabId, sharing: SharingState) {
        self.with_tab_mut(id, |tab| tab.sharing_state = sharing);
    }

    pub fn tab_count(&self) -> usize {
        self.inner.borrow().tabs.len()
    }

    fn array_call<T>(
        &self,
        action: &'static str,
        ids: &[TabId],
        mut per_tab: impl FnMut(&mut Inner, TabId) -> Result<T, BrowserError>,
    ) -> Result<(), BrowserError> {
        let mut inner = self.inner.borrow_mut();
        if inner.reject_array_calls.contains(action) {
            return Err(BrowserError::BatchRejected(format!(
                "{} rejected by script",
                action
            )));
        }
        // The native array form is all-or-nothing: validate first.
        for id in ids {
            if !inner.tabs.contains_key(id) {
                return Err(BrowserError::BatchRejected(format!(
                    "{}: no tab {}",
                    action, id
                )));
            }
        }
        for id in ids {
            per_tab(&mut inner, *id)?;
        }
        Ok(())
    }
}

fn hide_one(inner: &mut Inner, id: TabId) -> Result<(), BrowserError> {
    let tab = inner
        .tabs
        .get_mut(&id)
        .ok_or_else(|| BrowserError::TabNotFound(id.to_string()))?;
    if tab.pinned || tab.sharing_state.is_sharing() {
        return Err(BrowserError::Native(format!("cannot hide tab {}", id)));
    }
    tab.hidden = true;
    tab.active = false;
    Ok(())
}

fn show_one(inner: &mut Inner, id: TabId) -> Result<(), BrowserError> {
    let tab = inner
        .tabs
        .get_mut(&id)
        .ok_or_else(|| BrowserError::TabNotFound(id.to_string()))?;
    tab.hidden = false;
    Ok(())
}

fn discard_one(inner: &mut Inner, id: TabId) -> Result<(), BrowserError> {
    let tab = inner
        .tabs
        .get_mut(&id)
        .ok_or_else(|| BrowserError::TabNotFound(id.to_string()))?;
    if tab.active {
        return Err(BrowserError::Native(format!(
            "cannot discard active tab {}",
            id
        )));
    }
    tab.discarded = true;
    tab.status = TabStatus::Complete;
    Ok(())
}

fn remove_one(inner: &mut Inner, id: TabId) -> Result<(), BrowserError> {
    let tab = inner
        .tabs
        .remove(&id)
        .ok_or_else(|| BrowserError::TabNotFound(id.to_string()))?;
    inner.reindex_window(tab.window_id);
    Ok(())
}

impl BrowserApi for MemoryBrowser {
    fn create_tab(&self, params: CreateTabParams) -> Result<Tab, BrowserError> {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_tab_id();
        let window_id = params
            .window_id
            .or(inner.focused_window)
            .unwrap_or(WindowId(1));
        inner.windows.insert(window_id);

        let url = params.url.unwrap_or_else(|| "about:blank".to_string());
        let status = if params.discarded || url.starts_with("about:") {
            TabStatus::Complete
        } else {
            TabStatus::Loading
        };
        let in_window = inner
            .tabs
            .values()
            .filter(|t| t.window_id == window_id)
            .count() as u32;
        let index = params.index.unwrap_or(in_window).min(in_window);

        if params.active {
            inner.deactivate_window(window_id);
        }

        let last_accessed = inner.tick();
        let title = params.title.clone().unwrap_or_else(|| url.clone());
        let tab = Tab {
            id,
            window_id,
            index,
            url,
            title,
            status,
            active: params.active,
            pinned: params.pinned,
            hidden: false,
            discarded: params.discarded,
            audible: false,
            opener_tab_id: params.opener_tab_id,
            cookie_store_id: params
                .cookie_store_id
                .unwrap_or_else(CookieStoreId::default_store),
            last_accessed,
            sharing_state: SharingState::default(),
            group_id: None,
            fav_icon_url: None,
            thumbnail: None,
        };
        inner.tabs.insert(id, tab.clone());
        inner.reindex_window(window_id);
        Ok(tab)
    }

    fn get_tab(&self, id: TabId) -> Result<Tab, BrowserError> {
        self.inner
            .borrow()
            .tabs
            .get(&id)
            .cloned()
            .ok_or_else(|| BrowserError::TabNotFound(id.to_string()))
    }

    fn query_tabs(&self, query: &TabQuery) -> Vec<Tab> {
        let inner = self.inner.borrow();
        let mut tabs: Vec<Tab> = inner
            .tabs
            .values()
            .filter(|t| query.window_id.map_or(true, |w| t.window_id == w))
            .filter(|t| query.pinned.map_or(true, |p| t.pinned == p))
            .filter(|t| query.hidden.map_or(true, |h| t.hidden == h))
            .filter(|t| query.active.map_or(true, |a| t.active == a))
            .filter(|t| query.url.as_ref().map_or(true, |u| &t.url == u))
            .cloned()
            .collect();
        tabs.sort_by_key(|t| (t.window_id, t.index));
        tabs
    }

    fn update_tab(&self, id: TabId, params: UpdateTabParams) -> Result<Tab, BrowserError> {
        let mut inner = self.inner.borrow_mut();
        let window_id = inner
            .tabs
            .get(&id)
            .map(|t| t.window_id)
            .ok_or_else(|| BrowserError::TabNotFound(id.to_string()))?;
        if params.active == Some(true) {
            inner.deactivate_window(window_id);
        }
        let now = inner.tick();
        let tab = inner
            .tabs
            .get_mut(&id)
            .ok_or_else(|| BrowserError::TabNotFound(id.to_string()))?;
        if let Some(active) = params.active {
            tab.active = active;
            if active {
                tab.last_accessed = now;
            }
        }
        if let Some(url) = params.url {
            tab.url = url;
            tab.status = TabStatus::Loading;
        }
        if let Some(opener) = params.opener_tab_id {
            tab.opener_tab_id = Some(opener);
        }
        Ok(tab.clone())
    }

    fn move_tabs(&self, ids: &[TabId], params: &MoveTabParams) -> Result<Vec<Tab>, BrowserError> {
        let mut inner = self.inner.borrow_mut();
        if inner.reject_array_calls.contains("move") {
            return Err(BrowserError::BatchRejected("move rejected by script".into()));
        }
        let mut moved = Vec::new();
        let mut touched_windows = BTreeSet::new();
        for (offset, id) in ids.iter().enumerate() {
            let tab = inner
                .tabs
                .get_mut(id)
                .ok_or_else(|| BrowserError::TabNotFound(id.to_string()))?;
            touched_windows.insert(tab.window_id);
            if let Some(window_id) = params.window_id {
                if tab.window_id != window_id {
                    tab.window_id = window_id;
                    // Cross-window moves drop the opener relationship.
                    tab.opener_tab_id = None;
                }
                touched_windows.insert(window_id);
            }
            tab.index = if params.index < 0 {
                u32::MAX - ids.len() as u32 + offset as u32
            } else {
                params.index as u32 + offset as u32
            };
            moved.push(*id);
        }
        for window_id in touched_windows {
            inner.reindex_window(window_id);
        }
        Ok(moved
            .into_iter()
            .filter_map(|id| inner.tabs.get(&id).cloned())
            .collect())
    }

    fn show_tabs(&self, ids: &[TabId]) -> Result<(), BrowserError> {
        self.array_call("show", ids, show_one)
    }

    fn show_tab(&self, id: TabId) -> Result<(), BrowserError> {
        show_one(&mut self.inner.borrow_mut(), id)
    }

    fn hide_tabs(&self, ids: &[TabId]) -> Result<(), BrowserError> {
        // Whole-call rejection when any tab is unhideable, like the native call.
        {
            let inner = self.inner.borrow();
            for id in ids {
                if let Some(tab) = inner.tabs.get(id) {
                    if tab.pinned || tab.sharing_state.is_sharing() {
                        return Err(BrowserError::BatchRejected(format!(
                            "hide: tab {} cannot be hidden",
                            id
                        )));
                    }
                }
            }
        }
        self.array_call("hide", ids, hide_one)
    }

    fn hide_tab(&self, id: TabId) -> Result<(), BrowserError> {
        hide_one(&mut self.inner.borrow_mut(), id)
    }

    fn discard_tabs(&self, ids: &[TabId]) -> Result<(), BrowserError> {
        self.array_call("discard", ids, discard_one)
    }

    fn discard_tab(&self, id: TabId) -> Result<(), BrowserError> {
        discard_one(&mut self.inner.borrow_mut(), id)
    }

    fn remove_tabs(&self, ids: &[TabId]) -> Result<(), BrowserError> {
        self.array_call("remove", ids, remove_one)
    }

    fn remove_tab(&self, id: TabId) -> Result<(), BrowserError> {
        remove_one(&mut self.inner.borrow_mut(), id)
    }

    fn reload_tab(&self, id: TabId, _bypass_cache: bool) -> Result<(), BrowserError> {
        let mut inner = self.inner.borrow_mut();
        let tab = inner
            .tabs
            .get_mut(&id)
            .ok_or_else(|| BrowserError::TabNotFound(id.to_string()))?;
        tab.discarded = false;
        tab.status = TabStatus::Loading;
        Ok(())
    }

    fn capture_tab(&self, id: TabId) -> Result<Vec<u8>, BrowserError> {
        let inner = self.inner.borrow();
        let tab = inner
            .tabs
            .get(&id)
            .ok_or_else(|| BrowserError::TabNotFound(id.to_string()))?;
        if tab.discarded {
            return Err(BrowserError::Native(format!(
                "cannot capture discarded tab {}",
                id
            )));
        }
        Ok(inner.capture_payload.clone())
    }

    fn query_containers(&self) -> Result<Vec<Container>, BrowserError> {
        Ok(self.inner.borrow().containers.values().cloned().collect())
    }

    fn create_container(
        &self,
        name: &str,
        color: &str,
        icon: &str,
    ) -> Result<Container, BrowserError> {
        let mut inner = self.inner.borrow_mut();
        inner.next_container_id += 1;
        let id = CookieStoreId::new(format!("firefox-container-{}", inner.next_container_id));
        let container = Container {
            cookie_store_id: id.clone(),
            name: name.to_string(),
            color: color.to_string(),
            icon: icon.to_string(),
        };
        inner.containers.insert(id, container.clone());
        Ok(container)
    }

    fn update_container(
        &self,
        id: &CookieStoreId,
        params: ContainerParams,
    ) -> Result<Container, BrowserError> {
        let mut inner = self.inner.borrow_mut();
        let container = inner
            .containers
            .get_mut(id)
            .ok_or_else(|| BrowserError::ContainerNotFound(id.to_string()))?;
        if let Some(name) = params.name {
            container.name = name;
        }
        if let Some(color) = params.color {
            container.color = color;
        }
        if let Some(icon) = params.icon {
            container.icon = icon;
        }
        Ok(container.clone())
    }

    fn remove_container(&self, id: &CookieStoreId) -> Result<(), BrowserError> {
        self.inner
            .borrow_mut()
            .containers
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| BrowserError::ContainerNotFound(id.to_string()))
    }

    fn last_focused_window(&self) -> Option<WindowId> {
        let inner = self.inner.borrow();
        inner
            .focused_window
            .or_else(|| inner.windows.iter().next().copied())
    }
}
