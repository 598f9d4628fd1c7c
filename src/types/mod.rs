// Shared type definitions for the tab-groups engine.
// Each submodule defines types used across the managers.

pub mod container;
pub mod errors;
pub mod group;
pub mod message;
pub mod tab;
