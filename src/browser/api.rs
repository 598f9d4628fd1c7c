//! Native browser API boundary.
//!
//! The engine consumes the browser through this trait so the reconciliation
//! logic can be exercised against an in-memory implementation. Batch
//! operations exist in both array form (one native call for many ids, which
//! the browser may reject as a whole) and per-id form (used by the
//! degradation path).

use crate::types::container::{Container, CookieStoreId};
use crate::types::errors::BrowserError;
use crate::types::tab::{Tab, TabId, WindowId};

/// Parameters for creating a native tab.
#[derive(Debug, Clone, Default)]
pub struct CreateTabParams {
    pub url: Option<String>,
    pub active: bool,
    pub pinned: bool,
    pub discarded: bool,
    pub title: Option<String>,
    pub index: Option<u32>,
    pub window_id: Option<WindowId>,
    pub opener_tab_id: Option<TabId>,
    pub cookie_store_id: Option<CookieStoreId>,
}

/// Parameters for updating a native tab in place.
#[derive(Debug, Clone, Default)]
pub struct UpdateTabParams {
    pub active: Option<bool>,
    pub url: Option<String>,
    pub opener_tab_id: Option<TabId>,
}

/// Native tab query. `None` fields do not constrain the result.
#[derive(Debug, Clone, Default)]
pub struct TabQuery {
    pub window_id: Option<WindowId>,
    pub pinned: Option<bool>,
    pub hidden: Option<bool>,
    pub active: Option<bool>,
    pub url: Option<String>,
}

/// Parameters for moving tabs. `index == -1` appends at the end.
#[derive(Debug, Clone)]
pub struct MoveTabParams {
    pub index: i64,
    pub window_id: Option<WindowId>,
}

/// Partial update of a contextual identity.
#[derive(Debug, Clone, Default)]
pub struct ContainerParams {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// The native browser capabilities the engine consumes: tab CRUD and query,
/// move/show/hide/discard/reload, capture, contextual identity CRUD and
/// query, window query.
pub trait BrowserApi {
    // --- tabs ---
    fn create_tab(&self, params: CreateTabParams) -> Result<Tab, BrowserError>;
    fn get_tab(&self, id: TabId) -> Result<Tab, BrowserError>;
    fn query_tabs(&self, query: &TabQuery) -> Vec<Tab>;
    fn update_tab(&self, id: TabId, params: UpdateTabParams) -> Result<Tab, BrowserError>;
    fn move_tabs(&self, ids: &[TabId], params: &MoveTabParams) -> Result<Vec<Tab>, BrowserError>;

    fn show_tabs(&self, ids: &[TabId]) -> Result<(), BrowserError>;
    fn show_tab(&self, id: TabId) -> Result<(), BrowserError>;
    fn hide_tabs(&self, ids: &[TabId]) -> Result<(), BrowserError>;
    fn hide_tab(&self, id: TabId) -> Result<(), BrowserError>;
    fn discard_tabs(&self, ids: &[TabId]) -> Result<(), BrowserError>;
    fn discard_tab(&self, id: TabId) -> Result<(), BrowserError>;
    fn remove_tabs(&self, ids: &[TabId]) -> Result<(), BrowserError>;
    fn remove_tab(&self, id: TabId) -> Result<(), BrowserError>;
    fn reload_tab(&self, id: TabId, bypass_cache: bool) -> Result<(), BrowserError>;

    /// Captures the visible content of a tab as JPEG bytes.
    fn capture_tab(&self, id: TabId) -> Result<Vec<u8>, BrowserError>;

    // --- contextual identities ---
    fn query_containers(&self) -> Result<Vec<Container>, BrowserError>;
    fn create_container(
        &self,
        name: &str,
        color: &str,
        icon: &str,
    ) -> Result<Container, BrowserError>;
    fn update_container(
        &self,
        id: &CookieStoreId,
        params: ContainerParams,
    ) -> Result<Container, BrowserError>;
    fn remove_container(&self, id: &CookieStoreId) -> Result<(), BrowserError>;

    // --- windows ---
    fn last_focused_window(&self) -> Option<WindowId>;
}
