//! Unit tests for the tab cache: allowlist diffing, group association, and
//! write-through persistence.

use std::rc::Rc;

use tab_groups::database::Database;
use tab_groups::managers::tab_cache::TabCache;
use tab_groups::types::container::CookieStoreId;
use tab_groups::types::tab::{
    GroupId, SharingState, Tab, TabChangeInfo, TabId, TabSession, TabStatus, WindowId,
};

fn setup() -> (Rc<Database>, Rc<TabCache>) {
    let db = Rc::new(Database::open_in_memory().unwrap());
    let cache = TabCache::new(Rc::clone(&db));
    (db, cache)
}

fn make_tab(id: u32) -> Tab {
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
        cookie_store_id: CookieStoreId::default_store(),
        last_accessed: 100,
        sharing_state: SharingState::default(),
        group_id: None,
        fav_icon_url: None,
        thumbnail: None,
    }
}

// ─── Native projection ───

#[test]
fn test_set_tab_strips_session_fields() {
    let (_db, cache) = setup();
    let mut tab = make_tab(1);
    tab.group_id = Some(GroupId(9));
    tab.fav_icon_url = Some("data:image/png;base64,AAA".to_string());
    tab.thumbnail = Some("data:image/jpeg;base64,BBB".to_string());

    cache.set_tab(&tab);

    let stored = cache.get_tab(TabId(1)).unwrap();
    assert_eq!(stored.group_id, None);
    assert_eq!(stored.fav_icon_url, None);
    assert_eq!(stored.thumbnail, None);
}

// ─── Allowlist diff ───

#[test]
fn test_identical_state_yields_no_change() {
    let (_db, cache) = setup();
    let tab = make_tab(1);
    cache.set_tab(&tab);

    let mut incoming = tab.clone();
    incoming.last_accessed = 999; // not on the allowlist
    incoming.index = 5;
    incoming.active = true;
    assert_eq!(cache.real_tab_state_changed(&incoming), None);
}

#[test]
fn test_pinned_transition_yields_exact_diff() {
    let (_db, cache) = setup();
    let tab = make_tab(1);
    cache.set_tab(&tab);

    let mut incoming = tab.clone();
    incoming.pinned = true;
    assert_eq!(
        cache.real_tab_state_changed(&incoming),
        Some(TabChangeInfo {
            pinned: Some(true),
            ..TabChangeInfo::default()
        })
    );
}

#[test]
fn test_multiple_changed_keys_all_reported() {
    let (_db, cache) = setup();
    let tab = make_tab(1);
    cache.set_tab(&tab);

    let mut incoming = tab.clone();
    incoming.title = "Other".to_string();
    incoming.audible = true;
    let change = cache.real_tab_state_changed(&incoming).unwrap();
    assert_eq!(change.title.as_deref(), Some("Other"));
    assert_eq!(change.audible, Some(true));
    assert_eq!(change.status, None);
    assert_eq!(change.hidden, None);
}

#[test]
fn test_fav_icon_cleared_is_not_a_change() {
    let (_db, cache) = setup();
    let mut tab = make_tab(1);
    tab.fav_icon_url = Some("https://example.com/icon.png".to_string());
    // set_tab strips session fields; seed the watched copy through the
    // incoming record instead.
    cache.set_tab(&make_tab(1));

    tab.fav_icon_url = None;
    assert_eq!(cache.real_tab_state_changed(&tab), None);
}

#[test]
fn test_unknown_tab_reports_full_watched_state() {
    let (_db, cache) = setup();
    let tab = make_tab(1);
    let change = cache.real_tab_state_changed(&tab).unwrap();
    assert_eq!(change.title.as_deref(), Some("Example"));
    assert_eq!(change.status, Some(TabStatus::Complete));
    assert_eq!(change.pinned, Some(false));
}

// ─── Group association ───

#[test]
fn test_set_tab_group_resolves_window_group() {
    let (_db, cache) = setup();
    cache.set_window_group(WindowId(1), Some(GroupId(5)));

    let resolved = cache
        .set_tab_group(TabId(1), None, Some(WindowId(1)))
        .unwrap();
    assert_eq!(resolved, Some(GroupId(5)));
    assert_eq!(cache.get_tab_group(TabId(1)), Some(GroupId(5)));
}

#[test]
fn test_set_tab_group_without_window_group_leaves_unsynced() {
    let (_db, cache) = setup();
    let resolved = cache
        .set_tab_group(TabId(1), None, Some(WindowId(2)))
        .unwrap();
    assert_eq!(resolved, None);
}

#[test]
fn test_remove_tab_group_strips_association() {
    let (_db, cache) = setup();
    cache
        .set_tab_group(TabId(1), Some(GroupId(3)), None)
        .unwrap();
    cache.remove_tab_group(TabId(1)).unwrap();
    assert_eq!(cache.get_tab_group(TabId(1)), None);
}

#[test]
fn test_group_is_loaded_in_at_most_one_window() {
    let (_db, cache) = setup();
    cache.set_window_group(WindowId(1), Some(GroupId(7)));
    cache.set_window_group(WindowId(2), Some(GroupId(7)));

    assert_eq!(cache.get_window_group(WindowId(1)), None);
    assert_eq!(cache.get_window_group(WindowId(2)), Some(GroupId(7)));
    assert_eq!(cache.get_window_id(GroupId(7)), Some(WindowId(2)));
}

// ─── Persistence ───

#[test]
fn test_session_round_trips_through_fresh_cache() {
    let (db, cache) = setup();
    cache
        .set_tab_group(TabId(1), Some(GroupId(4)), None)
        .unwrap();
    cache
        .set_tab_fav_icon(TabId(1), "data:image/png;base64,AAA")
        .unwrap();
    cache
        .set_tab_thumbnail(TabId(1), "data:image/jpeg;base64,BBB")
        .unwrap();

    // A fresh cache over the same database simulates a restarted context.
    let fresh = TabCache::new(db);
    let mut tab = make_tab(1);
    fresh.load_tab_session(&mut tab, true, true);
    assert_eq!(tab.group_id, Some(GroupId(4)));
    assert_eq!(tab.fav_icon_url.as_deref(), Some("data:image/png;base64,AAA"));
    assert_eq!(tab.thumbnail.as_deref(), Some("data:image/jpeg;base64,BBB"));
}

#[test]
fn test_remote_fav_icon_is_not_persisted() {
    let (db, cache) = setup();
    cache
        .set_tab_fav_icon(TabId(1), "https://example.com/favicon.ico")
        .unwrap();

    // In-memory copy keeps the remote reference for the running session.
    assert_eq!(
        cache.get_tab_session(TabId(1)).fav_icon_url.as_deref(),
        Some("https://example.com/favicon.ico")
    );

    // Durable storage never holds it.
    let fresh = TabCache::new(db);
    let mut tab = make_tab(1);
    fresh.load_tab_session(&mut tab, true, true);
    assert_eq!(tab.fav_icon_url, None);
}

#[test]
fn test_remove_tab_purges_persisted_session() {
    let (db, cache) = setup();
    cache.set_tab(&make_tab(1));
    cache
        .set_tab_group(TabId(1), Some(GroupId(2)), None)
        .unwrap();

    cache.remove_tab(TabId(1));
    assert!(cache.get_tab(TabId(1)).is_none());

    let fresh = TabCache::new(db);
    let mut tab = make_tab(1);
    fresh.load_tab_session(&mut tab, false, false);
    assert_eq!(tab.group_id, None);
}

#[test]
fn test_load_session_respects_include_flags() {
    let (_db, cache) = setup();
    cache
        .set_tab_session(
            TabId(1),
            TabSession {
                group_id: Some(GroupId(1)),
                fav_icon_url: Some("data:image/png;base64,AAA".to_string()),
                thumbnail: Some("data:image/jpeg;base64,BBB".to_string()),
            },
        )
        .unwrap();

    let mut tab = make_tab(1);
    cache.load_tab_session(&mut tab, false, false);
    assert_eq!(tab.group_id, Some(GroupId(1)));
    assert_eq!(tab.fav_icon_url, None);
    assert_eq!(tab.thumbnail, None);
}
