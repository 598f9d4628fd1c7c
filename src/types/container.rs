use serde::{Deserialize, Serialize};
use std::fmt;

/// Cookie store id of the browser's non-isolated default container.
pub const DEFAULT_COOKIE_STORE_ID: &str = "firefox-default";

/// Well-known sentinel id for "open in a (new) temporary container".
/// Resolved to a concrete container at tab-creation time.
pub const TEMPORARY_CONTAINER: &str = "temporary-container";

/// Container (cookie store) identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CookieStoreId(pub String);

impl CookieStoreId {
    pub fn new(id: impl Into<String>) -> Self {
        CookieStoreId(id.into())
    }

    pub fn default_store() -> Self {
        CookieStoreId(DEFAULT_COOKIE_STORE_ID.to_string())
    }

    pub fn temporary_sentinel() -> Self {
        CookieStoreId(TEMPORARY_CONTAINER.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing decimal run of the id (`firefox-container-7` → `"7"`), used
    /// to build the display name of a temporary container. Falls back to the
    /// whole id when there is no trailing number.
    pub fn container_number(&self) -> &str {
        let trailing_digits = self
            .0
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .count();
        if trailing_digits == 0 {
            &self.0
        } else {
            &self.0[self.0.len() - trailing_digits..]
        }
    }
}

impl fmt::Display for CookieStoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CookieStoreId {
    fn from(id: &str) -> Self {
        CookieStoreId(id.to_string())
    }
}

/// A contextual identity (named container) as reported by the browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub cookie_store_id: CookieStoreId,
    pub name: String,
    pub color: String,
    pub icon: String,
}

/// Foreign container description carried by imported data; used to find or
/// create a matching container in the current session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerData {
    pub name: String,
    pub color: String,
    pub icon: String,
}
