pub mod api;
pub mod memory;

pub use api::BrowserApi;
pub use memory::MemoryBrowser;
