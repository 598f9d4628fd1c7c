//! Unit tests for the error enums: Display output and trait wiring.

use std::error::Error;

use tab_groups::types::errors::{
    BrowserError, BusError, CacheError, ContainerError, SettingsError, TabOpError,
};

#[test]
fn test_bus_error_display() {
    let e = BusError::MalformedMessage("no action key".to_string());
    assert_eq!(e.to_string(), "Malformed bus message: no action key");
}

#[test]
fn test_browser_error_display() {
    assert_eq!(
        BrowserError::TabNotFound("#5".to_string()).to_string(),
        "Tab not found: #5"
    );
    assert_eq!(
        BrowserError::ContainerNotFound("firefox-container-1".to_string()).to_string(),
        "Container not found: firefox-container-1"
    );
    assert_eq!(
        BrowserError::BatchRejected("hide".to_string()).to_string(),
        "Batch call rejected: hide"
    );
    assert_eq!(
        BrowserError::Native("boom".to_string()).to_string(),
        "Native call failed: boom"
    );
}

#[test]
fn test_cache_error_display() {
    let e = CacheError::DatabaseError("disk full".to_string());
    assert_eq!(e.to_string(), "Tab cache database error: disk full");
}

#[test]
fn test_container_error_display() {
    assert_eq!(
        ContainerError::NativeError("nope".to_string()).to_string(),
        "Container native call failed: nope"
    );
}

#[test]
fn test_settings_error_display() {
    assert_eq!(
        SettingsError::DatabaseError("locked".to_string()).to_string(),
        "Settings database error: locked"
    );
    assert_eq!(
        SettingsError::InvalidValue("not a bool".to_string()).to_string(),
        "Invalid settings value: not a bool"
    );
}

#[test]
fn test_tab_op_error_display() {
    assert_eq!(
        TabOpError::GroupNotFound("g7".to_string()).to_string(),
        "Group not found: g7"
    );
    assert_eq!(
        TabOpError::NoTargetWindow.to_string(),
        "No target window available"
    );
}

#[test]
fn test_errors_implement_std_error() {
    fn assert_error<E: Error>(_e: &E) {}

    assert_error(&BusError::MalformedMessage(String::new()));
    assert_error(&BrowserError::Native(String::new()));
    assert_error(&CacheError::DatabaseError(String::new()));
    assert_error(&ContainerError::NativeError(String::new()));
    assert_error(&SettingsError::InvalidValue(String::new()));
    assert_error(&TabOpError::NoTargetWindow);
}
