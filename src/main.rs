//! Demo binary: wires the engine against the in-memory browser and walks one
//! create / group / move scenario through the event pump.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::LocalSet;

use tab_groups::app::{App, TABS_CHANNEL};
use tab_groups::managers::broadcast_bus::BroadcastBus;
use tab_groups::managers::tab_lifecycle::TabEvent;
use tab_groups::managers::tab_ops::{CreateRequest, MoveParams};
use tab_groups::types::group::Group;
use tab_groups::types::message::ANY_ACTION;
use tab_groups::types::tab::{GroupId, WindowId};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let app = App::in_memory()?;

    // A second bus on the tabs channel stands in for a UI context; the
    // engine sends without local echo, so broadcasts are only visible there.
    let ui_bus = BroadcastBus::new(TABS_CHANNEL);
    app.hub.attach(&ui_bus);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_by_handler = Rc::clone(&seen);
    let _sub = ui_bus.on(
        &[ANY_ACTION],
        Rc::new(move |message| {
            seen_by_handler.borrow_mut().push(message.action.clone());
        }),
    );

    let work = Group::new(GroupId(1), "Work");
    app.groups.insert(work);
    app.cache.set_window_group(WindowId(1), Some(GroupId(1)));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let local = LocalSet::new();

    let (events, rx) = mpsc::unbounded_channel();
    local.spawn_local(Rc::clone(&app.lifecycle).run(rx));

    let ops = Rc::clone(&app.ops);
    runtime.block_on(local.run_until(async move {
        for url in ["https://example.com", "https://docs.rs", "https://crates.io"] {
            match ops.create(
                CreateRequest {
                    url: Some(url.to_string()),
                    active: false,
                    ..CreateRequest::default()
                },
                false,
            ) {
                Ok(tab) => {
                    let _ = events.send(TabEvent::Created(tab));
                }
                Err(e) => eprintln!("create failed: {}", e),
            }
        }

        // Let the pump settle the creations and flush the batch.
        tokio::time::sleep(Duration::from_millis(300)).await;
    }));

    let tab_ids: Vec<_> = app
        .ops
        .get(Some(WindowId(1)), None, None, false, false)
        .iter()
        .map(|tab| tab.id)
        .collect();
    let moved = app
        .ops
        .move_to_group(&tab_ids, GroupId(1), MoveParams::default())?;

    println!("tabs in browser: {}", app.browser.tab_count());
    println!("tabs moved into Work: {}", moved.len());
    println!("broadcasts dispatched: {:?}", seen.borrow());

    Ok(())
}
