pub mod broadcast_bus;
pub mod container_registry;
pub mod tab_cache;
pub mod tab_lifecycle;
pub mod tab_ops;
pub mod tab_tracker;
