use serde::{Deserialize, Serialize};
use std::fmt;

use super::container::CookieStoreId;

/// Native browser tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Native browser window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Identifier of a user-defined tab group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub i64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Loading state of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Loading,
    Complete,
}

/// Media-sharing state of a tab. A tab actively sharing its screen, camera
/// or microphone cannot be hidden by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SharingState {
    pub screen: bool,
    pub camera: bool,
    pub microphone: bool,
}

impl SharingState {
    pub fn is_sharing(&self) -> bool {
        self.screen || self.camera || self.microphone
    }
}

/// Mirror of a native browser tab, extended with extension-private session
/// fields (`group_id`, `fav_icon_url`, `thumbnail`). The session fields are
/// never trusted from the native object — the lifecycle controller clears
/// them and re-derives them from the tab cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    pub window_id: WindowId,
    pub index: u32,
    pub url: String,
    pub title: String,
    pub status: TabStatus,
    pub active: bool,
    pub pinned: bool,
    pub hidden: bool,
    pub discarded: bool,
    pub audible: bool,
    pub opener_tab_id: Option<TabId>,
    pub cookie_store_id: CookieStoreId,
    pub last_accessed: i64,
    pub sharing_state: SharingState,
    pub group_id: Option<GroupId>,
    pub fav_icon_url: Option<String>,
    pub thumbnail: Option<String>,
}

impl Tab {
    pub fn is_loaded(&self) -> bool {
        self.status == TabStatus::Complete
    }

    pub fn is_loading(&self) -> bool {
        self.status == TabStatus::Loading
    }

    pub fn can_be_hidden(&self) -> bool {
        !self.pinned && !self.sharing_state.is_sharing()
    }

    /// Short display title for user-facing messages: title, falling back to
    /// the URL, truncated to `max_len` characters.
    pub fn short_title(&self, max_len: usize) -> String {
        let title = if self.title.is_empty() {
            self.url.as_str()
        } else {
            self.title.as_str()
        };
        title.chars().take(max_len).collect()
    }
}

/// Extension-private session record persisted per tab.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabSession {
    pub group_id: Option<GroupId>,
    pub fav_icon_url: Option<String>,
    pub thumbnail: Option<String>,
}

/// Diff between the cached and the incoming state of a tab, restricted to
/// the watched-key allowlist plus `active` (activation events) and
/// `thumbnail` (capture results). Every field is `None` when that key did
/// not change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabChangeInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TabStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discarded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl TabChangeInfo {
    pub fn is_empty(&self) -> bool {
        *self == TabChangeInfo::default()
    }

    pub fn active(value: bool) -> Self {
        TabChangeInfo {
            active: Some(value),
            ..TabChangeInfo::default()
        }
    }

    pub fn thumbnail(value: String) -> Self {
        TabChangeInfo {
            thumbnail: Some(value),
            ..TabChangeInfo::default()
        }
    }
}

/// Coalescing key for the update batch: a loaded group, or the `unsync`
/// bucket for tabs not currently assigned to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchKey {
    Group(GroupId),
    Unsync,
}

impl From<Option<GroupId>> for BatchKey {
    fn from(group_id: Option<GroupId>) -> Self {
        match group_id {
            Some(id) => BatchKey::Group(id),
            None => BatchKey::Unsync,
        }
    }
}
