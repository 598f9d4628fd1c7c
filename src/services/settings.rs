//! Persisted engine settings with change notification.
//!
//! Key-value storage over the `settings` table. Writers go through the typed
//! setters, which persist and then notify registered change listeners —
//! the storage change-notification surface the lifecycle controller uses to
//! keep its options live.

use std::cell::RefCell;
use std::rc::Rc;

use log::warn;
use rusqlite::params;
use serde_json::Value;

use crate::database::Database;
use crate::types::errors::SettingsError;

pub const KEY_TEMPORARY_CONTAINER_TITLE: &str = "temporaryContainerTitle";
pub const KEY_SHOW_TABS_WITH_THUMBNAILS: &str = "showTabsWithThumbnailsInManageGroups";
pub const KEY_COLOR_SCHEME: &str = "colorScheme";

type ChangeListener = Rc<dyn Fn(&str, &Value)>;

/// Settings service backed by SQLite.
pub struct Settings {
    db: Rc<Database>,
    listeners: RefCell<Vec<ChangeListener>>,
}

impl Settings {
    pub fn new(db: Rc<Database>) -> Self {
        Settings {
            db,
            listeners: RefCell::new(Vec::new()),
        }
    }

    /// Registers a change listener invoked after every successful write.
    pub fn on_changed(&self, listener: ChangeListener) {
        self.listeners.borrow_mut().push(listener);
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        self.db
            .connection()
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .ok()
    }

    fn write_raw(&self, key: &str, value: &Value) -> Result<(), SettingsError> {
        self.db
            .connection()
            .execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value.to_string()],
            )
            .map_err(|e| SettingsError::DatabaseError(e.to_string()))?;

        for listener in self.listeners.borrow().iter() {
            listener(key, value);
        }
        Ok(())
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.read_raw(key) {
            Some(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Bool(b)) => b,
                _ => {
                    warn!("settings: key {} holds a non-boolean value", key);
                    default
                }
            },
            None => default,
        }
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        match self.read_raw(key) {
            Some(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::String(s)) => s,
                _ => {
                    warn!("settings: key {} holds a non-string value", key);
                    default.to_string()
                }
            },
            None => default.to_string(),
        }
    }

    pub fn set_bool(&self, key: &str, value: bool) -> Result<(), SettingsError> {
        self.write_raw(key, &Value::Bool(value))
    }

    pub fn set_string(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.write_raw(key, &Value::String(value.to_string()))
    }
}
