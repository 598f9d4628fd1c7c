//! App core: composes the database, buses, registry, cache, tracker,
//! lifecycle controller, and mutation operations into one wired engine.

use std::rc::Rc;

use crate::browser::api::BrowserApi;
use crate::browser::memory::MemoryBrowser;
use crate::database::Database;
use crate::managers::broadcast_bus::{BroadcastBus, ChannelHub};
use crate::managers::container_registry::{ContainerRegistry, RegistryRole};
use crate::managers::tab_cache::TabCache;
use crate::managers::tab_lifecycle::TabLifecycle;
use crate::managers::tab_ops::TabOps;
use crate::managers::tab_tracker::TabTracker;
use crate::services::notifications::{LogSink, NotificationSink};
use crate::services::settings::{Settings, KEY_TEMPORARY_CONTAINER_TITLE};
use crate::types::group::{GroupStore, GroupViews, MemoryGroupStore, WindowView};
use crate::types::tab::{GroupId, Tab};

/// Channel names on the cross-context hub.
pub const MAIN_CHANNEL: &str = "main";
pub const TABS_CHANNEL: &str = "tabs";
pub const CONTAINERS_CHANNEL: &str = "containers";

/// Default display name of the logical temporary container.
pub const DEFAULT_TEMPORARY_TITLE: &str = "Temporary";

/// [`GroupViews`] over the live browser state and the tab cache: the
/// materialization the batch flush renders group and window payloads from.
pub struct CacheGroupViews {
    browser: Rc<dyn BrowserApi>,
    cache: Rc<TabCache>,
    tracker: Rc<TabTracker>,
}

impl CacheGroupViews {
    pub fn new(
        browser: Rc<dyn BrowserApi>,
        cache: Rc<TabCache>,
        tracker: Rc<TabTracker>,
    ) -> Rc<Self> {
        Rc::new(CacheGroupViews {
            browser,
            cache,
            tracker,
        })
    }

    fn hydrated_tabs(&self, with_thumbnails: bool) -> Vec<Tab> {
        let mut tabs: Vec<Tab> = self
            .browser
            .query_tabs(&Default::default())
            .into_iter()
            .filter(|tab| !self.tracker.is_pending_removal(tab.id))
            .collect();
        for tab in &mut tabs {
            self.cache.load_tab_session(tab, true, with_thumbnails);
        }
        tabs
    }
}

impl GroupViews for CacheGroupViews {
    fn group_tabs(&self, group_id: GroupId, with_thumbnails: bool) -> Vec<Tab> {
        self.hydrated_tabs(with_thumbnails)
            .into_iter()
            .filter(|tab| tab.group_id == Some(group_id))
            .collect()
    }

    fn window_views(&self, with_thumbnails: bool) -> Vec<WindowView> {
        let tabs = self.hydrated_tabs(with_thumbnails);
        let mut window_ids: Vec<_> = tabs.iter().map(|tab| tab.window_id).collect();
        window_ids.sort();
        window_ids.dedup();

        window_ids
            .into_iter()
            .map(|window_id| WindowView {
                window_id,
                group_id: self.cache.get_window_group(window_id),
                tabs: tabs
                    .iter()
                    .filter(|tab| tab.window_id == window_id)
                    .cloned()
                    .collect(),
            })
            .collect()
    }
}

/// Central engine wiring. One `App` is one privileged background context;
/// its container registry holds the listener-owner role. Replica contexts
/// attach their own registry to the same hub.
pub struct App {
    pub db: Rc<Database>,
    pub hub: Rc<ChannelHub>,
    pub main_bus: Rc<BroadcastBus>,
    pub tabs_bus: Rc<BroadcastBus>,
    pub containers_bus: Rc<BroadcastBus>,
    pub browser: Rc<MemoryBrowser>,
    pub settings: Rc<Settings>,
    pub tracker: Rc<TabTracker>,
    pub cache: Rc<TabCache>,
    pub registry: Rc<ContainerRegistry>,
    pub groups: Rc<MemoryGroupStore>,
    pub views: Rc<CacheGroupViews>,
    pub lifecycle: Rc<TabLifecycle>,
    pub ops: Rc<TabOps>,
}

impl App {
    /// Opens (or creates) the engine database at `db_path` and wires every
    /// component with the default log-based notification sink.
    pub fn new(db_path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let db = Database::open(db_path)?;
        Ok(Self::with_database(db, Rc::new(LogSink)))
    }

    /// Fully in-memory engine (database included) for tests and the demo.
    pub fn in_memory() -> Result<Self, Box<dyn std::error::Error>> {
        let db = Database::open_in_memory()?;
        Ok(Self::with_database(db, Rc::new(LogSink)))
    }

    pub fn with_database(db: Database, sink: Rc<dyn NotificationSink>) -> Self {
        let db = Rc::new(db);
        let hub = ChannelHub::new();

        let main_bus = BroadcastBus::new(MAIN_CHANNEL);
        let tabs_bus = BroadcastBus::new(TABS_CHANNEL);
        let containers_bus = BroadcastBus::new(CONTAINERS_CHANNEL);
        hub.attach(&main_bus);
        hub.attach(&tabs_bus);
        hub.attach(&containers_bus);

        let browser = Rc::new(MemoryBrowser::new());
        let browser_api: Rc<dyn BrowserApi> = browser.clone();

        let settings = Rc::new(Settings::new(Rc::clone(&db)));
        let temporary_title =
            settings.get_string(KEY_TEMPORARY_CONTAINER_TITLE, DEFAULT_TEMPORARY_TITLE);

        let tracker = TabTracker::new();
        let cache = TabCache::new(Rc::clone(&db));
        let registry = ContainerRegistry::new(
            RegistryRole::ListenerOwner,
            Rc::clone(&browser_api),
            Rc::clone(&containers_bus),
            Rc::clone(&sink),
            temporary_title,
        );
        let groups = Rc::new(MemoryGroupStore::new());
        let views = CacheGroupViews::new(
            Rc::clone(&browser_api),
            Rc::clone(&cache),
            Rc::clone(&tracker),
        );

        let lifecycle = TabLifecycle::new(
            Rc::clone(&browser_api),
            Rc::clone(&cache),
            Rc::clone(&tracker),
            Rc::clone(&tabs_bus),
            Rc::clone(&main_bus),
            Rc::clone(&views) as Rc<dyn GroupViews>,
            &settings,
        );
        lifecycle.bind_settings(&settings);

        let ops = TabOps::new(
            browser_api,
            Rc::clone(&cache),
            Rc::clone(&tracker),
            Rc::clone(&registry),
            Rc::clone(&groups) as Rc<dyn GroupStore>,
            sink,
        );

        App {
            db,
            hub,
            main_bus,
            tabs_bus,
            containers_bus,
            browser,
            settings,
            tracker,
            cache,
            registry,
            groups,
            views,
            lifecycle,
            ops,
        }
    }
}
