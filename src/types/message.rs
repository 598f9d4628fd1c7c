use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::BusError;

/// Wildcard action name: a handler registered for it receives every message.
pub const ANY_ACTION: &str = "*";

/// Action names carried over the broadcast channels.
pub mod actions {
    pub const UPDATED: &str = "updated";
    pub const UPDATED_ALL: &str = "updated.all";
    pub const UPDATED_GROUP: &str = "updated.group";
    pub const REMOVED: &str = "removed";
    pub const REMOVED_UNSYNC: &str = "removed.unsync";
    pub const ADD_RESTORE_TAB_ON_REMOVED_WINDOW: &str = "add-restore-tab-on-removed-window";
}

/// A broadcast message: an action name plus a JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub action: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl Message {
    pub fn new(action: impl Into<String>, data: Value) -> Self {
        Message {
            action: action.into(),
            data,
        }
    }

    /// Normalizes a raw payload received from another context. A bare string
    /// becomes `{action}`; an object must carry a non-empty `action` key.
    pub fn from_value(value: &Value) -> Result<Message, BusError> {
        match value {
            Value::String(action) if !action.is_empty() => {
                Ok(Message::new(action.clone(), Value::Null))
            }
            Value::Object(map) => {
                let action = map
                    .get("action")
                    .and_then(Value::as_str)
                    .filter(|a| !a.is_empty())
                    .ok_or_else(|| {
                        BusError::MalformedMessage("object without action key".to_string())
                    })?
                    .to_string();
                let data = map.get("data").cloned().unwrap_or(Value::Null);
                Ok(Message { action, data })
            }
            other => Err(BusError::MalformedMessage(format!(
                "unsupported payload type: {}",
                other
            ))),
        }
    }
}

impl From<&str> for Message {
    fn from(action: &str) -> Self {
        Message::new(action, Value::Null)
    }
}

impl From<String> for Message {
    fn from(action: String) -> Self {
        Message::new(action, Value::Null)
    }
}

/// Delivery options for [`crate::managers::broadcast_bus::BroadcastBus::send`].
#[derive(Debug, Clone, Copy)]
pub struct SendOptions {
    /// Skip the cross-context transport; deliver in-process only.
    pub local_only: bool,
    /// Also dispatch to subscribers in the sending context.
    pub include_self: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        SendOptions {
            local_only: false,
            include_self: true,
        }
    }
}

impl SendOptions {
    /// Cross-context fan-out without a local echo — the sender has already
    /// applied the change it is announcing.
    pub fn remote_only() -> Self {
        SendOptions {
            local_only: false,
            include_self: false,
        }
    }
}
