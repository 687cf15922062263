/// Typed error for the topology core, dispatched by variant in the API
/// error handler instead of fragile string matching.
///
/// `Validation` and `NotFound` are reported synchronously with no state
/// change. `Persistence` means the storage collaborator rejected a write;
/// the in-memory model has been rolled back to the pre-call value and the
/// caller may retry.
#[derive(Debug)]
pub enum CoreError {
    Validation(String),
    NotFound { resource: &'static str, id: String },
    Persistence(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::Validation(msg) => write!(f, "{}", msg),
            CoreError::NotFound { resource, id } => write!(f, "{} not found: {}", resource, id),
            CoreError::Persistence(msg) => write!(f, "storage write failed: {}", msg),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<crate::storage::StorageError> for CoreError {
    fn from(err: crate::storage::StorageError) -> Self {
        CoreError::Persistence(err.to_string())
    }
}
