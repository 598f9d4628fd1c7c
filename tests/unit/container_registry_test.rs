//! Unit tests for the container registry: temporary-container lifecycle,
//! classification, foreign-container resolution and replica synchronization.

use std::collections::HashMap;
use std::rc::Rc;

use tab_groups::browser::api::{BrowserApi, ContainerParams};
use tab_groups::browser::memory::MemoryBrowser;
use tab_groups::managers::broadcast_bus::{BroadcastBus, ChannelHub};
use tab_groups::managers::container_registry::{
    ContainerQuery, ContainerRegistry, RegistryRole, DEFAULT_CONTAINER_NAME,
};
use tab_groups::services::notifications::{CollectingSink, Notification, NotificationSink};
use tab_groups::types::container::{Container, ContainerData, CookieStoreId};
use tab_groups::types::tab::{SharingState, Tab, TabId, TabStatus, WindowId};

struct Fixture {
    browser: Rc<MemoryBrowser>,
    sink: Rc<CollectingSink>,
    registry: Rc<ContainerRegistry>,
}

fn setup() -> Fixture {
    let browser = Rc::new(MemoryBrowser::new());
    let bus = BroadcastBus::new("containers");
    let sink = Rc::new(CollectingSink::new());
    let registry = ContainerRegistry::new(
        RegistryRole::ListenerOwner,
        Rc::clone(&browser) as Rc<dyn BrowserApi>,
        bus,
        Rc::clone(&sink) as Rc<dyn NotificationSink>,
        "Temporary",
    );
    Fixture {
        browser,
        sink,
        registry,
    }
}

fn tab_in_container(id: u32, cookie_store_id: CookieStoreId) -> Tab {
    Tab {
        id: TabId(id),
        window_id: WindowId(1),
        index: 0,
        url: "https://example.com".to_string(),
        title: "Example".to_string(),
        status: TabStatus::Complete,
        active: false,
        pinned: false,
        hidden: false,
        discarded: false,
        audible: false,
        opener_tab_id: None,
        cookie_store_id,
        last_accessed: 0,
        sharing_state: SharingState::default(),
        group_id: None,
        fav_icon_url: None,
        thumbnail: None,
    }
}

// ─── Temporary lifecycle ───

#[test]
fn test_create_temporary_names_by_container_number() {
    let fx = setup();
    let container = fx.registry.create_temporary().unwrap();

    assert_eq!(container.cookie_store_id.as_str(), "firefox-container-1");
    assert_eq!(container.name, "Temporary 1");
    assert!(fx.registry.contains(&container.cookie_store_id));
    assert!(fx.registry.is_temporary(&container.cookie_store_id));
}

#[test]
fn test_rename_away_from_temporary_notifies() {
    let fx = setup();
    let container = fx.registry.create_temporary().unwrap();

    let renamed = fx
        .browser
        .update_container(
            &container.cookie_store_id,
            ContainerParams {
                name: Some("My Stuff".to_string()),
                ..ContainerParams::default()
            },
        )
        .unwrap();
    fx.registry.on_updated(renamed);

    assert!(!fx.registry.is_temporary(&container.cookie_store_id));
    assert_eq!(
        fx.sink.take(),
        vec![Notification::ContainerNoLongerTemporary("My Stuff".to_string())]
    );
}

#[test]
fn test_rename_into_temporary_notifies() {
    let fx = setup();
    let container = fx
        .browser
        .create_container("Work", "blue", "fingerprint")
        .unwrap();
    fx.registry.on_created(container.clone());
    assert!(!fx.registry.is_temporary(&container.cookie_store_id));

    let temporary_name = format!(
        "Temporary {}",
        container.cookie_store_id.container_number()
    );
    let renamed = fx
        .browser
        .update_container(
            &container.cookie_store_id,
            ContainerParams {
                name: Some(temporary_name.clone()),
                ..ContainerParams::default()
            },
        )
        .unwrap();
    fx.registry.on_updated(renamed);

    assert!(fx.registry.is_temporary(&container.cookie_store_id));
    assert_eq!(
        fx.sink.take(),
        vec![Notification::ContainerNowTemporary(temporary_name)]
    );
}

#[test]
fn test_color_change_keeps_classification_silent() {
    let fx = setup();
    let container = fx.registry.create_temporary().unwrap();

    let recolored = fx
        .browser
        .update_container(
            &container.cookie_store_id,
            ContainerParams {
                color: Some("red".to_string()),
                ..ContainerParams::default()
            },
        )
        .unwrap();
    fx.registry.on_updated(recolored);

    assert!(fx.registry.is_temporary(&container.cookie_store_id));
    assert_eq!(fx.sink.count(), 0);
}

#[test]
fn test_remove_unused_temporary_containers_spares_referenced() {
    let fx = setup();
    let used = fx.registry.create_temporary().unwrap();
    let unused = fx.registry.create_temporary().unwrap();
    let tabs = vec![tab_in_container(1, used.cookie_store_id.clone())];

    let removed = fx.registry.remove_unused_temporary_containers(&tabs);

    assert_eq!(removed, 1);
    assert!(fx.registry.contains(&used.cookie_store_id));
    assert!(!fx.registry.contains(&unused.cookie_store_id));
}

#[test]
fn test_update_temporary_container_title_renames_existing() {
    let fx = setup();
    let container = fx.registry.create_temporary().unwrap();

    fx.registry.update_temporary_container_title("Scratch");

    assert_eq!(fx.registry.temporary_title(), "Scratch");
    // Still classified as temporary under the new title.
    assert!(fx.registry.is_temporary(&container.cookie_store_id));
    let stored = fx.registry.get(&container.cookie_store_id).unwrap();
    assert_eq!(stored.name, "Scratch 1");
    // The detached rename pass never reads as a user rename.
    assert_eq!(fx.sink.count(), 0);
}

// ─── Classification ───

#[test]
fn test_is_default_covers_known_forms() {
    let fx = setup();
    assert!(fx.registry.is_default(&CookieStoreId::new("")));
    assert!(fx.registry.is_default(&CookieStoreId::default_store()));
    assert!(fx.registry.is_default(&CookieStoreId::new("icecat-default")));
    assert!(!fx.registry.is_default(&CookieStoreId::new("firefox-container-1")));
}

#[test]
fn test_temporary_sentinel_is_always_temporary() {
    let fx = setup();
    assert!(fx.registry.is_temporary(&CookieStoreId::temporary_sentinel()));
}

// ─── Lookup ───

#[test]
fn test_get_synthesizes_default_and_sentinel() {
    let fx = setup();

    let default = fx.registry.get(&CookieStoreId::default_store()).unwrap();
    assert_eq!(default.name, DEFAULT_CONTAINER_NAME);

    let sentinel = fx.registry.get(&CookieStoreId::temporary_sentinel()).unwrap();
    assert_eq!(sentinel.name, "Temporary");

    assert!(fx.registry.get(&CookieStoreId::new("firefox-container-42")).is_none());
}

#[test]
fn test_query_filters_temporary_containers() {
    let fx = setup();
    fx.registry.create_temporary().unwrap();
    let work = fx
        .browser
        .create_container("Work", "blue", "fingerprint")
        .unwrap();
    fx.registry.on_created(work.clone());

    let plain = fx.registry.query(ContainerQuery::default());
    assert_eq!(plain.len(), 1);
    assert_eq!(plain[0].cookie_store_id, work.cookie_store_id);

    let full = fx.registry.query(ContainerQuery {
        default_container: true,
        temporary_containers: true,
        temporary_container: true,
    });
    assert_eq!(full.len(), 4);
    assert_eq!(full[0].name, DEFAULT_CONTAINER_NAME);
    assert_eq!(
        full.last().unwrap().cookie_store_id,
        CookieStoreId::temporary_sentinel()
    );
}

// ─── Foreign-container resolution ───

#[test]
fn test_resolve_default_passes_through() {
    let fx = setup();
    let mut memo = HashMap::new();
    let resolved = fx
        .registry
        .find_exist_or_create_similar(&CookieStoreId::new("chrome-default"), None, &mut memo)
        .unwrap();
    assert_eq!(resolved, CookieStoreId::default_store());
    assert!(memo.is_empty());
}

#[test]
fn test_resolve_known_id_is_identity() {
    let fx = setup();
    let work = fx
        .browser
        .create_container("Work", "blue", "fingerprint")
        .unwrap();
    fx.registry.on_created(work.clone());

    let mut memo = HashMap::new();
    let resolved = fx
        .registry
        .find_exist_or_create_similar(&work.cookie_store_id, None, &mut memo)
        .unwrap();
    assert_eq!(resolved, work.cookie_store_id);
}

#[test]
fn test_resolve_matches_by_container_data() {
    let fx = setup();
    let work = fx
        .browser
        .create_container("Work", "blue", "fingerprint")
        .unwrap();
    fx.registry.on_created(work.clone());

    let mut memo = HashMap::new();
    let foreign = CookieStoreId::new("foreign-container-9");
    let data = ContainerData {
        name: "Work".to_string(),
        color: "blue".to_string(),
        icon: "fingerprint".to_string(),
    };
    let resolved = fx
        .registry
        .find_exist_or_create_similar(&foreign, Some(&data), &mut memo)
        .unwrap();
    assert_eq!(resolved, work.cookie_store_id);
    assert_eq!(fx.registry.len(), 1);
}

#[test]
fn test_resolve_creates_once_per_foreign_id() {
    let fx = setup();
    let mut memo = HashMap::new();
    let foreign = CookieStoreId::new("foreign-container-9");
    let data = ContainerData {
        name: "Banking".to_string(),
        color: "green".to_string(),
        icon: "dollar".to_string(),
    };

    let first = fx
        .registry
        .find_exist_or_create_similar(&foreign, Some(&data), &mut memo)
        .unwrap();
    let second = fx
        .registry
        .find_exist_or_create_similar(&foreign, Some(&data), &mut memo)
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(fx.registry.len(), 1);
    assert_eq!(fx.registry.get(&first).unwrap().name, "Banking");
}

#[test]
fn test_resolve_without_data_creates_temporary() {
    let fx = setup();
    let mut memo = HashMap::new();
    let resolved = fx
        .registry
        .find_exist_or_create_similar(&CookieStoreId::new("foreign-container-9"), None, &mut memo)
        .unwrap();
    assert!(fx.registry.is_temporary(&resolved));
}

// ─── Replication ───

fn replicated_pair() -> (Fixture, Rc<ContainerRegistry>, tab_groups::managers::broadcast_bus::Subscription)
{
    let hub = ChannelHub::new();

    let browser = Rc::new(MemoryBrowser::new());
    let owner_bus = BroadcastBus::new("containers");
    hub.attach(&owner_bus);
    let sink = Rc::new(CollectingSink::new());
    let owner = ContainerRegistry::new(
        RegistryRole::ListenerOwner,
        Rc::clone(&browser) as Rc<dyn BrowserApi>,
        owner_bus,
        Rc::clone(&sink) as Rc<dyn NotificationSink>,
        "Temporary",
    );

    let replica_browser = Rc::new(MemoryBrowser::new());
    let replica_bus = BroadcastBus::new("containers");
    hub.attach(&replica_bus);
    let replica = ContainerRegistry::new(
        RegistryRole::Replica,
        replica_browser,
        replica_bus,
        Rc::new(CollectingSink::new()),
        "Temporary",
    );
    let subscription = replica.subscribe_replica();

    (
        Fixture {
            browser,
            sink,
            registry: owner,
        },
        replica,
        subscription,
    )
}

#[test]
fn test_replica_replaces_map_wholesale() {
    let (owner, replica, _subscription) = replicated_pair();

    let first = owner.registry.create_temporary().unwrap();
    assert!(replica.contains(&first.cookie_store_id));
    assert_eq!(replica.len(), 1);

    // A later broadcast replaces, never merges: after the owner removes the
    // container, the replica no longer holds it.
    owner.registry.remove_unused_temporary_containers(&[]);
    assert_eq!(replica.len(), 0);
}

#[test]
fn test_replica_receives_temporary_title() {
    let (owner, replica, _subscription) = replicated_pair();

    owner.registry.update_temporary_container_title("Scratch");
    assert_eq!(replica.temporary_title(), "Scratch");
}

#[test]
fn test_replica_ignores_native_events() {
    let (_, replica, _subscription) = replicated_pair();

    replica.on_created(Container {
        cookie_store_id: CookieStoreId::new("firefox-container-99"),
        name: "Rogue".to_string(),
        color: "red".to_string(),
        icon: "fence".to_string(),
    });
    assert!(replica.is_empty());
}
