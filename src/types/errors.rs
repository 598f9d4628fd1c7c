use std::fmt;

// === BusError ===

/// Errors related to broadcast bus delivery.
#[derive(Debug)]
pub enum BusError {
    /// A payload received from another context could not be normalized.
    MalformedMessage(String),
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::MalformedMessage(msg) => write!(f, "Malformed bus message: {}", msg),
        }
    }
}

impl std::error::Error for BusError {}

// === BrowserError ===

/// Errors surfaced by the native browser API boundary.
#[derive(Debug)]
pub enum BrowserError {
    /// No tab with the given id exists.
    TabNotFound(String),
    /// No container with the given cookie store id exists.
    ContainerNotFound(String),
    /// An array-form batch call was rejected as a whole.
    BatchRejected(String),
    /// Any other native call failure.
    Native(String),
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserError::TabNotFound(id) => write!(f, "Tab not found: {}", id),
            BrowserError::ContainerNotFound(id) => write!(f, "Container not found: {}", id),
            BrowserError::BatchRejected(msg) => write!(f, "Batch call rejected: {}", msg),
            BrowserError::Native(msg) => write!(f, "Native call failed: {}", msg),
        }
    }
}

impl std::error::Error for BrowserError {}

// === CacheError ===

/// Errors related to tab cache persistence.
#[derive(Debug)]
pub enum CacheError {
    /// Database operation failed.
    DatabaseError(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::DatabaseError(msg) => write!(f, "Tab cache database error: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {}

// === ContainerError ===

/// Errors related to container registry operations.
#[derive(Debug)]
pub enum ContainerError {
    /// A native contextual-identity call failed.
    NativeError(String),
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerError::NativeError(msg) => {
                write!(f, "Container native call failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ContainerError {}

// === SettingsError ===

/// Errors related to persisted engine settings.
#[derive(Debug)]
pub enum SettingsError {
    /// Database operation failed.
    DatabaseError(String),
    /// The stored value could not be parsed as the expected type.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::DatabaseError(msg) => write!(f, "Settings database error: {}", msg),
            SettingsError::InvalidValue(msg) => write!(f, "Invalid settings value: {}", msg),
        }
    }
}

impl std::error::Error for SettingsError {}

// === TabOpError ===

/// Errors raised by the top-level tab mutation entry points. Only
/// programmer-error-class conditions propagate; expected transient failures
/// are logged and excluded from result sets instead.
#[derive(Debug)]
pub enum TabOpError {
    /// The destination group does not exist.
    GroupNotFound(String),
    /// No window could be resolved for the operation.
    NoTargetWindow,
    /// Container resolution failed.
    ContainerError(String),
    /// A non-degradable native call failed.
    NativeError(String),
}

impl fmt::Display for TabOpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabOpError::GroupNotFound(id) => write!(f, "Group not found: {}", id),
            TabOpError::NoTargetWindow => write!(f, "No target window available"),
            TabOpError::ContainerError(msg) => write!(f, "Container error: {}", msg),
            TabOpError::NativeError(msg) => write!(f, "Native call failed: {}", msg),
        }
    }
}

impl std::error::Error for TabOpError {}
