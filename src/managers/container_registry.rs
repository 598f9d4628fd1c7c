//! Container Registry.
//!
//! Tracks container (cookie store) identities, manages ephemeral temporary
//! containers, and synchronizes container metadata across contexts via the
//! containers broadcast channel.
//!
//! Exactly one context holds write-listener responsibility: a registry built
//! with [`RegistryRole::ListenerOwner`] mutates state from native
//! contextual-identity events; every [`RegistryRole::Replica`] receives the
//! container set over the channel and replaces its local map wholesale,
//! never merging field by field.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, error, warn};
use serde_json::{json, Value};

use crate::browser::api::{BrowserApi, ContainerParams};
use crate::services::notifications::{Notification, NotificationSink};
use crate::types::container::{Container, ContainerData, CookieStoreId};
use crate::types::errors::ContainerError;
use crate::types::message::{actions, Message, SendOptions};
use crate::types::tab::Tab;

use super::broadcast_bus::{BroadcastBus, Subscription};

/// Marker appended to a temporary container's display name between the two
/// native calls of [`ContainerRegistry::create_temporary`]. A container seen
/// with this name is known to be a freshly created temporary, not a user
/// rename, so the rename-transition notification logic leaves it alone.
pub const TEMPORARY_SUFFIX: &str = "\u{229E}\u{200D}\u{23F3}";

/// Color and icon every temporary container is created with.
pub const TEMPORARY_COLOR: &str = "toolbar";
pub const TEMPORARY_ICON: &str = "chill";

/// Display name of the synthesized default container.
pub const DEFAULT_CONTAINER_NAME: &str = "No Container";

/// Which side of the replication invariant this registry instance is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryRole {
    /// Handles native contextual-identity events and broadcasts updates.
    ListenerOwner,
    /// Receives container state over the channel; never mutates from events.
    Replica,
}

/// Container query filter. All flags default to off.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerQuery {
    /// Prepend the synthesized default container.
    pub default_container: bool,
    /// Include concrete temporary containers.
    pub temporary_containers: bool,
    /// Append the logical temporary-container sentinel.
    pub temporary_container: bool,
}

pub struct ContainerRegistry {
    role: RegistryRole,
    browser: Rc<dyn BrowserApi>,
    bus: Rc<BroadcastBus>,
    sink: Rc<dyn NotificationSink>,
    containers: RefCell<HashMap<CookieStoreId, Container>>,
    temporary_title: RefCell<String>,
    // Set while update_temporary_container_title renames its own containers,
    // so on_updated does not treat those writes as user renames.
    updates_detached: Cell<bool>,
}

impl ContainerRegistry {
    /// Builds a registry and loads the current container set from the
    /// browser. A failed query is logged and degrades to an empty registry.
    pub fn new(
        role: RegistryRole,
        browser: Rc<dyn BrowserApi>,
        bus: Rc<BroadcastBus>,
        sink: Rc<dyn NotificationSink>,
        temporary_title: impl Into<String>,
    ) -> Rc<Self> {
        let registry = Rc::new(ContainerRegistry {
            role,
            browser,
            bus,
            sink,
            containers: RefCell::new(HashMap::new()),
            temporary_title: RefCell::new(temporary_title.into()),
            updates_detached: Cell::new(false),
        });
        registry.load();
        registry
    }

    pub fn role(&self) -> RegistryRole {
        self.role
    }

    pub fn temporary_title(&self) -> String {
        self.temporary_title.borrow().clone()
    }

    /// Queries the browser for all containers and rebuilds the id map.
    /// Never fails the caller.
    pub fn load(&self) {
        match self.browser.query_containers() {
            Ok(list) => {
                let mut containers = self.containers.borrow_mut();
                containers.clear();
                for container in list {
                    containers.insert(container.cookie_store_id.clone(), container);
                }
                debug!("containers: loaded {}", containers.len());
            }
            Err(e) => {
                warn!("containers: can't load, starting empty: {}", e);
                self.containers.borrow_mut().clear();
            }
        }
    }

    // --- replication ---

    /// Subscribes a replica to the containers channel. The incoming payload
    /// is the new source of truth for the fields it carries: the container
    /// map is cleared and reassigned, never merged.
    pub fn subscribe_replica(self: &Rc<Self>) -> Subscription {
        let registry = Rc::clone(self);
        self.bus.on(
            &[actions::UPDATED],
            Rc::new(move |message: &Message| registry.apply_remote_update(&message.data)),
        )
    }

    fn apply_remote_update(&self, data: &Value) {
        if let Some(title) = data.get("temporaryContainerTitle").and_then(Value::as_str) {
            *self.temporary_title.borrow_mut() = title.to_string();
            debug!("containers: temporary title updated from broadcast");
        }

        if let Some(raw) = data.get("containers") {
            match serde_json::from_value::<HashMap<CookieStoreId, Container>>(raw.clone()) {
                Ok(incoming) => {
                    let mut containers = self.containers.borrow_mut();
                    containers.clear();
                    *containers = incoming;
                    debug!("containers: map replaced from broadcast");
                }
                Err(e) => error!("containers: malformed broadcast payload: {}", e),
            }
        }
    }

    fn broadcast_update(&self, data: Value) {
        self.bus.send(
            Message::new(actions::UPDATED, data),
            SendOptions::remote_only(),
        );
    }

    fn broadcast_containers(&self) {
        let containers = self.containers.borrow().clone();
        match serde_json::to_value(&containers) {
            Ok(value) => self.broadcast_update(json!({ "containers": value })),
            Err(e) => error!("containers: can't serialize for broadcast: {}", e),
        }
    }

    // --- native events (listener owner only) ---

    pub fn on_created(&self, container: Container) {
        if self.role != RegistryRole::ListenerOwner {
            warn!("containers: replica received a native created event, ignoring");
            return;
        }

        let intermediate = container.name == self.intermediate_name();
        self.containers
            .borrow_mut()
            .insert(container.cookie_store_id.clone(), container);

        if intermediate {
            // Mid-createTemporary; the rename broadcast follows.
            return;
        }

        self.broadcast_containers();
    }

    pub fn on_updated(&self, container: Container) {
        if self.role != RegistryRole::ListenerOwner {
            warn!("containers: replica received a native updated event, ignoring");
            return;
        }
        if self.updates_detached.get() {
            self.containers
                .borrow_mut()
                .insert(container.cookie_store_id.clone(), container);
            return;
        }

        let id = container.cookie_store_id.clone();
        let old_name = self
            .containers
            .borrow()
            .get(&id)
            .map(|c| c.name.clone());
        let old_was_intermediate = old_name.as_deref() == Some(self.intermediate_name().as_str());

        if !old_was_intermediate && old_name.as_deref() != Some(container.name.as_str()) {
            let was_temporary = self.is_temporary(&id);
            let now_temporary = self.matches_temporary_name(&container);
            if was_temporary && !now_temporary {
                self.sink
                    .notify(Notification::ContainerNoLongerTemporary(container.name.clone()));
            } else if !was_temporary && now_temporary {
                self.sink
                    .notify(Notification::ContainerNowTemporary(container.name.clone()));
            }
        }

        self.containers.borrow_mut().insert(id, container);

        if old_was_intermediate {
            return;
        }

        self.broadcast_containers();
    }

    pub fn on_removed(&self, container: Container) {
        if self.role != RegistryRole::ListenerOwner {
            warn!("containers: replica received a native removed event, ignoring");
            return;
        }

        self.containers
            .borrow_mut()
            .remove(&container.cookie_store_id);

        if self.matches_temporary_name(&container) {
            // Temporary containers come and go constantly; their removal is
            // not worth a cross-context refresh.
            return;
        }

        self.broadcast_containers();
    }

    // --- classification ---

    pub fn is_default(&self, id: &CookieStoreId) -> bool {
        id.as_str().is_empty()
            || *id == CookieStoreId::default_store()
            || id.as_str().contains("default")
    }

    /// Temporary classification is by name-pattern match against the current
    /// temporary display name, not by id: a user can rename a temporary
    /// container into a normal-looking one and vice versa.
    pub fn is_temporary(&self, id: &CookieStoreId) -> bool {
        if *id == CookieStoreId::temporary_sentinel() {
            return true;
        }
        self.containers
            .borrow()
            .get(id)
            .map_or(false, |c| self.matches_temporary_name(c))
    }

    fn matches_temporary_name(&self, container: &Container) -> bool {
        container.name == self.temporary_name(&container.cookie_store_id)
    }

    fn temporary_name(&self, id: &CookieStoreId) -> String {
        format!("{} {}", self.temporary_title.borrow(), id.container_number())
    }

    fn intermediate_name(&self) -> String {
        format!("{}{}", self.temporary_title.borrow(), TEMPORARY_SUFFIX)
    }

    // --- temporary lifecycle ---

    /// Creates a temporary container in two native calls: first under the
    /// intermediate marker name, then renamed to its final numbered name
    /// (the final name needs the cookie store id). Broadcasts the updated
    /// container set.
    pub fn create_temporary(&self) -> Result<Container, ContainerError> {
        let created = self
            .browser
            .create_container(&self.intermediate_name(), TEMPORARY_COLOR, TEMPORARY_ICON)
            .map_err(|e| ContainerError::NativeError(e.to_string()))?;
        self.containers
            .borrow_mut()
            .insert(created.cookie_store_id.clone(), created.clone());

        let final_name = self.temporary_name(&created.cookie_store_id);
        let renamed = self
            .browser
            .update_container(
                &created.cookie_store_id,
                ContainerParams {
                    name: Some(final_name),
                    ..ContainerParams::default()
                },
            )
            .map_err(|e| ContainerError::NativeError(e.to_string()))?;
        self.containers
            .borrow_mut()
            .insert(renamed.cookie_store_id.clone(), renamed.clone());

        self.broadcast_containers();

        debug!("containers: created temporary {}", renamed.cookie_store_id);
        Ok(renamed)
    }

    /// Removes every temporary container no tab references any more.
    /// Returns the number removed; per-container failures are logged.
    pub fn remove_unused_temporary_containers(&self, tabs: &[Tab]) -> usize {
        let in_use: Vec<&CookieStoreId> = tabs.iter().map(|t| &t.cookie_store_id).collect();
        let to_remove: Vec<CookieStoreId> = self
            .containers
            .borrow()
            .keys()
            .filter(|id| self.is_temporary(id) && !in_use.contains(id))
            .cloned()
            .collect();

        let mut removed = 0;
        for id in &to_remove {
            match self.browser.remove_container(id) {
                Ok(()) => {
                    self.containers.borrow_mut().remove(id);
                    removed += 1;
                }
                Err(e) => warn!("containers: can't remove {}: {}", id, e),
            }
        }

        self.broadcast_containers();
        debug!("containers: removed {} unused temporary", removed);
        removed
    }

    /// Renames the logical temporary display name and every
    /// currently-temporary container to match. Its own native update
    /// handling is detached for the duration, so the renames are not
    /// mistaken for user renames.
    pub fn update_temporary_container_title(&self, new_title: &str) {
        // Classify before the title changes; afterwards the old names no
        // longer match.
        let temporary_ids: Vec<CookieStoreId> = self
            .containers
            .borrow()
            .keys()
            .filter(|id| self.is_temporary(id))
            .cloned()
            .collect();

        *self.temporary_title.borrow_mut() = new_title.to_string();

        self.updates_detached.set(true);
        for id in &temporary_ids {
            let name = self.temporary_name(id);
            match self.browser.update_container(
                id,
                ContainerParams {
                    name: Some(name),
                    ..ContainerParams::default()
                },
            ) {
                Ok(container) => {
                    self.containers.borrow_mut().insert(id.clone(), container);
                }
                Err(e) => warn!("containers: can't rename {}: {}", id, e),
            }
        }
        self.updates_detached.set(false);

        let mut data = json!({ "temporaryContainerTitle": new_title });
        if !temporary_ids.is_empty() {
            let containers = self.containers.borrow().clone();
            if let Ok(value) = serde_json::to_value(&containers) {
                data["containers"] = value;
            }
        }
        self.broadcast_update(data);

        debug!(
            "containers: temporary title -> {:?}, renamed {}",
            new_title,
            temporary_ids.len()
        );
    }

    // --- lookup ---

    /// Resolves an imported/foreign container reference to a same-session
    /// container with matching name/color/icon, creating one when none
    /// matches. `memo` caches the mapping across one import batch so the
    /// same foreign id never creates twice. A reference without container
    /// data resolves to a fresh temporary container.
    pub fn find_exist_or_create_similar(
        &self,
        cookie_store_id: &CookieStoreId,
        container_data: Option<&ContainerData>,
        memo: &mut HashMap<CookieStoreId, CookieStoreId>,
    ) -> Result<CookieStoreId, ContainerError> {
        if self.is_default(cookie_store_id) {
            return Ok(CookieStoreId::default_store());
        }

        if self.containers.borrow().contains_key(cookie_store_id) {
            return Ok(cookie_store_id.clone());
        }

        if !memo.contains_key(cookie_store_id) {
            match container_data {
                Some(data) => {
                    let existing = self
                        .containers
                        .borrow()
                        .iter()
                        .find(|(id, c)| {
                            !self.is_temporary(id)
                                && c.name == data.name
                                && c.color == data.color
                                && c.icon == data.icon
                        })
                        .map(|(id, _)| id.clone());

                    match existing {
                        Some(id) => {
                            memo.insert(cookie_store_id.clone(), id);
                        }
                        None => {
                            let created = self
                                .browser
                                .create_container(&data.name, &data.color, &data.icon)
                                .map_err(|e| ContainerError::NativeError(e.to_string()))?;
                            self.containers
                                .borrow_mut()
                                .insert(created.cookie_store_id.clone(), created.clone());
                            memo.insert(cookie_store_id.clone(), created.cookie_store_id);
                            self.broadcast_containers();
                        }
                    }
                }
                None => {
                    let temporary = self.create_temporary()?;
                    memo.insert(cookie_store_id.clone(), temporary.cookie_store_id);
                }
            }
        }

        Ok(memo[cookie_store_id].clone())
    }

    /// Looks up a container record; default and temporary identities are
    /// synthesized when not concretely present.
    pub fn get(&self, id: &CookieStoreId) -> Option<Container> {
        if let Some(container) = self.containers.borrow().get(id) {
            return Some(container.clone());
        }
        if self.is_default(id) {
            return Some(Container {
                cookie_store_id: CookieStoreId::default_store(),
                name: DEFAULT_CONTAINER_NAME.to_string(),
                color: String::new(),
                icon: String::new(),
            });
        }
        if self.is_temporary(id) {
            return Some(Container {
                cookie_store_id: CookieStoreId::temporary_sentinel(),
                name: self.temporary_title(),
                color: TEMPORARY_COLOR.to_string(),
                icon: TEMPORARY_ICON.to_string(),
            });
        }
        None
    }

    pub fn query(&self, params: ContainerQuery) -> Vec<Container> {
        let mut result = Vec::new();

        if params.default_container {
            if let Some(default) = self.get(&CookieStoreId::default_store()) {
                result.push(default);
            }
        }

        let mut concrete: Vec<Container> = self
            .containers
            .borrow()
            .values()
            .filter(|c| params.temporary_containers || !self.matches_temporary_name(c))
            .cloned()
            .collect();
        concrete.sort_by(|a, b| a.cookie_store_id.cmp(&b.cookie_store_id));
        result.extend(concrete);

        if params.temporary_container {
            result.push(Container {
                cookie_store_id: CookieStoreId::temporary_sentinel(),
                name: self.temporary_title(),
                color: TEMPORARY_COLOR.to_string(),
                icon: TEMPORARY_ICON.to_string(),
            });
        }

        result
    }

    pub fn len(&self) -> usize {
        self.containers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.borrow().is_empty()
    }

    pub fn contains(&self, id: &CookieStoreId) -> bool {
        self.containers.borrow().contains_key(id)
    }
}
