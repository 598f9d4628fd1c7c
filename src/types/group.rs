use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;

use super::container::CookieStoreId;
use super::tab::{GroupId, Tab, WindowId};

/// The slice of a user-defined group the engine consumes. Group editing and
/// rendering live in the UI layer; only container policy and presentation
/// metadata cross this boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub title: String,
    pub icon_url: Option<String>,
    pub new_tab_container: CookieStoreId,
    pub if_different_container_re_open: bool,
    pub exclude_containers_for_re_open: Vec<CookieStoreId>,
}

impl Group {
    pub fn new(id: GroupId, title: impl Into<String>) -> Self {
        Group {
            id,
            title: title.into(),
            icon_url: None,
            new_tab_container: CookieStoreId::default_store(),
            if_different_container_re_open: false,
            exclude_containers_for_re_open: Vec::new(),
        }
    }
}

/// Lookup boundary to the Groups module.
pub trait GroupStore {
    fn get(&self, id: GroupId) -> Option<Group>;
}

/// In-memory group store used by the demo wiring and tests.
#[derive(Default)]
pub struct MemoryGroupStore {
    groups: RefCell<HashMap<GroupId, Group>>,
}

impl MemoryGroupStore {
    pub fn new() -> Self {
        MemoryGroupStore::default()
    }

    pub fn insert(&self, group: Group) {
        self.groups.borrow_mut().insert(group.id, group);
    }

    pub fn remove(&self, id: GroupId) {
        self.groups.borrow_mut().remove(&id);
    }
}

impl GroupStore for MemoryGroupStore {
    fn get(&self, id: GroupId) -> Option<Group> {
        self.groups.borrow().get(&id).cloned()
    }
}

/// One window's renderable state, carried by the `updated.all` broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowView {
    pub window_id: WindowId,
    pub group_id: Option<GroupId>,
    pub tabs: Vec<Tab>,
}

/// Materialization boundary to the Groups/Windows modules: composes the tab
/// cache and container registry into renderable views for the batch flush.
pub trait GroupViews {
    fn group_tabs(&self, group_id: GroupId, with_thumbnails: bool) -> Vec<Tab>;
    fn window_views(&self, with_thumbnails: bool) -> Vec<WindowView>;
}
