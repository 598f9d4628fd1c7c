//! Tab-groups reconciliation engine.
//!
//! Keeps an in-memory cache of tabs, groups, and containers consistent with
//! live browser tab state while suppressing the feedback loops caused by the
//! engine's own mutations (hiding, showing, moving, recreating tabs to
//! change their container).
//!
//! This library crate exposes all modules for use by the binary and
//! integration tests.

pub mod app;
pub mod browser;
pub mod database;
pub mod managers;
pub mod services;
pub mod types;
