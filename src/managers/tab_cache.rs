//! Tab Cache.
//!
//! Authoritative in-memory projection of every tracked tab's
//! extension-private session data (group assignment, favicon, thumbnail),
//! keyed by tab and window identifier. Group/session mutations are written
//! through to the `tab_sessions` table; read failures degrade to treating
//! the tab as group-less rather than failing the caller.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, warn};
use rusqlite::params;

use crate::database::Database;
use crate::types::errors::CacheError;
use crate::types::tab::{GroupId, Tab, TabChangeInfo, TabId, TabSession, WindowId};

pub struct TabCache {
    db: Rc<Database>,
    tabs: RefCell<HashMap<TabId, Tab>>,
    sessions: RefCell<HashMap<TabId, TabSession>>,
    window_groups: RefCell<HashMap<WindowId, GroupId>>,
}

impl TabCache {
    pub fn new(db: Rc<Database>) -> Rc<Self> {
        Rc::new(TabCache {
            db,
            tabs: RefCell::new(HashMap::new()),
            sessions: RefCell::new(HashMap::new()),
            window_groups: RefCell::new(HashMap::new()),
        })
    }

    // --- native tab projection ---

    /// Stores the native state of a tab. Session fields carried by the
    /// incoming record are ignored; the session map is the authority.
    pub fn set_tab(&self, tab: &Tab) {
        let mut stored = tab.clone();
        stored.group_id = None;
        stored.fav_icon_url = None;
        stored.thumbnail = None;
        self.tabs.borrow_mut().insert(stored.id, stored);
    }

    pub fn get_tab(&self, id: TabId) -> Option<Tab> {
        self.tabs.borrow().get(&id).cloned()
    }

    /// Removes every trace of a tab, including its persisted session row.
    pub fn remove_tab(&self, id: TabId) {
        self.tabs.borrow_mut().remove(&id);
        self.sessions.borrow_mut().remove(&id);
        if let Err(e) = self.db.connection().execute(
            "DELETE FROM tab_sessions WHERE tab_id = ?1",
            params![id.0],
        ) {
            warn!("cache: can't delete session row for {}: {}", id, e);
        }
    }

    /// Computes the real state change between the cached and the incoming
    /// tab, restricted to the watched-key allowlist (`title`, `status`,
    /// `fav_icon_url`, `hidden`, `pinned`, `discarded`, `audible`).
    /// Returns `None` when nothing allowlisted changed — the device that
    /// keeps unrelated native updates (e.g. a last-accessed bump) from
    /// cascading downstream.
    pub fn real_tab_state_changed(&self, incoming: &Tab) -> Option<TabChangeInfo> {
        let tabs = self.tabs.borrow();
        let cached = tabs.get(&incoming.id);
        let mut change = TabChangeInfo::default();

        match cached {
            None => {
                change.title = Some(incoming.title.clone());
                change.status = Some(incoming.status);
                change.fav_icon_url = incoming.fav_icon_url.clone();
                change.hidden = Some(incoming.hidden);
                change.pinned = Some(incoming.pinned);
                change.discarded = Some(incoming.discarded);
                change.audible = Some(incoming.audible);
            }
            Some(cached) => {
                if cached.title != incoming.title {
                    change.title = Some(incoming.title.clone());
                }
                if cached.status != incoming.status {
                    change.status = Some(incoming.status);
                }
                if incoming.fav_icon_url.is_some() && cached.fav_icon_url != incoming.fav_icon_url
                {
                    change.fav_icon_url = incoming.fav_icon_url.clone();
                }
                if cached.hidden != incoming.hidden {
                    change.hidden = Some(incoming.hidden);
                }
                if cached.pinned != incoming.pinned {
                    change.pinned = Some(incoming.pinned);
                }
                if cached.discarded != incoming.discarded {
                    change.discarded = Some(incoming.discarded);
                }
                if cached.audible != incoming.audible {
                    change.audible = Some(incoming.audible);
                }
            }
        }

        if change.is_empty() {
            None
        } else {
            Some(change)
        }
    }

    // --- group association ---

    pub fn get_tab_group(&self, id: TabId) -> Option<GroupId> {
        self.sessions.borrow().get(&id).and_then(|s| s.group_id)
    }

    /// Assigns a tab to `group_id`, or — when `group_id` is `None` — to the
    /// group currently loaded in `window_id` (leaving the tab unsynced when
    /// that window has no loaded group). Write-through. Returns the resolved
    /// group.
    pub fn set_tab_group(
        &self,
        id: TabId,
        group_id: Option<GroupId>,
        window_id: Option<WindowId>,
    ) -> Result<Option<GroupId>, CacheError> {
        let resolved = group_id.or_else(|| window_id.and_then(|w| self.get_window_group(w)));
        self.sessions.borrow_mut().entry(id).or_default().group_id = resolved;
        self.persist_session(id)?;
        debug!("cache: tab {} group -> {:?}", id, resolved);
        Ok(resolved)
    }

    /// Strips a tab's group association (pin/hide transitions). Write-through.
    pub fn remove_tab_group(&self, id: TabId) -> Result<(), CacheError> {
        self.sessions.borrow_mut().entry(id).or_default().group_id = None;
        self.persist_session(id)
    }

    // --- window/group binding ---

    pub fn get_window_group(&self, window_id: WindowId) -> Option<GroupId> {
        self.window_groups.borrow().get(&window_id).copied()
    }

    pub fn set_window_group(&self, window_id: WindowId, group_id: Option<GroupId>) {
        let mut window_groups = self.window_groups.borrow_mut();
        match group_id {
            Some(group_id) => {
                // One group is loaded in at most one window.
                window_groups.retain(|_, g| *g != group_id);
                window_groups.insert(window_id, group_id);
            }
            None => {
                window_groups.remove(&window_id);
            }
        }
    }

    /// Window a group is currently loaded in, if any.
    pub fn get_window_id(&self, group_id: GroupId) -> Option<WindowId> {
        self.window_groups
            .borrow()
            .iter()
            .find(|(_, g)| **g == group_id)
            .map(|(w, _)| *w)
    }

    // --- session fields ---

    /// Stores a tab's favicon. Kept in memory unconditionally; persisted
    /// only when it is a data-URL, so no remote reference ever lands in
    /// durable storage.
    pub fn set_tab_fav_icon(&self, id: TabId, fav_icon_url: &str) -> Result<(), CacheError> {
        self.sessions.borrow_mut().entry(id).or_default().fav_icon_url =
            Some(fav_icon_url.to_string());
        self.persist_session(id)
    }

    pub fn set_tab_thumbnail(&self, id: TabId, thumbnail: &str) -> Result<(), CacheError> {
        self.sessions.borrow_mut().entry(id).or_default().thumbnail =
            Some(thumbnail.to_string());
        self.persist_session(id)
    }

    /// Replaces a tab's whole session record in one write.
    pub fn set_tab_session(&self, id: TabId, session: TabSession) -> Result<(), CacheError> {
        self.sessions.borrow_mut().insert(id, session);
        self.persist_session(id)
    }

    pub fn get_tab_session(&self, id: TabId) -> TabSession {
        self.sessions.borrow().get(&id).cloned().unwrap_or_default()
    }

    /// Copies cached session fields onto a tab record.
    pub fn apply_tab_session(&self, tab: &mut Tab) {
        let session = self.get_tab_session(tab.id);
        tab.group_id = session.group_id;
        if session.fav_icon_url.is_some() {
            tab.fav_icon_url = session.fav_icon_url;
        }
        if session.thumbnail.is_some() {
            tab.thumbnail = session.thumbnail;
        }
    }

    /// Hydrates a bare native tab with cached session fields, falling back
    /// to the persisted row when the tab is not in memory (fresh context).
    /// Read failures degrade to a group-less tab.
    pub fn load_tab_session(
        &self,
        tab: &mut Tab,
        include_fav_icon: bool,
        include_thumbnail: bool,
    ) {
        if !self.sessions.borrow().contains_key(&tab.id) {
            match self.read_session_row(tab.id) {
                Ok(Some(session)) => {
                    self.sessions.borrow_mut().insert(tab.id, session);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("cache: can't load session for {}: {}", tab.id, e);
                }
            }
        }

        let session = self.get_tab_session(tab.id);
        tab.group_id = session.group_id;
        tab.fav_icon_url = if include_fav_icon {
            session.fav_icon_url
        } else {
            None
        };
        tab.thumbnail = if include_thumbnail {
            session.thumbnail
        } else {
            None
        };
    }

    // --- persistence ---

    fn persist_session(&self, id: TabId) -> Result<(), CacheError> {
        let session = self.get_tab_session(id);
        let persisted_fav = session
            .fav_icon_url
            .filter(|url| url.starts_with("data:"));
        self.db
            .connection()
            .execute(
                "INSERT INTO tab_sessions (tab_id, group_id, fav_icon_url, thumbnail)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(tab_id) DO UPDATE SET
                     group_id = excluded.group_id,
                     fav_icon_url = excluded.fav_icon_url,
                     thumbnail = excluded.thumbnail",
                params![
                    id.0,
                    session.group_id.map(|g| g.0),
                    persisted_fav,
                    session.thumbnail
                ],
            )
            .map(|_| ())
            .map_err(|e| CacheError::DatabaseError(e.to_string()))
    }

    fn read_session_row(&self, id: TabId) -> Result<Option<TabSession>, CacheError> {
        let mut stmt = self
            .db
            .connection()
            .prepare("SELECT group_id, fav_icon_url, thumbnail FROM tab_sessions WHERE tab_id = ?1")
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?;

        let result = stmt.query_row(params![id.0], |row| {
            let group_id: Option<i64> = row.get(0)?;
            let fav_icon_url: Option<String> = row.get(1)?;
            let thumbnail: Option<String> = row.get(2)?;
            Ok(TabSession {
                group_id: group_id.map(GroupId),
                fav_icon_url,
                thumbnail,
            })
        });

        match result {
            Ok(session) => Ok(Some(session)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(CacheError::DatabaseError(e.to_string())),
        }
    }
}
