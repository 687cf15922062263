mod sqlite;

#[cfg(test)]
pub mod memory;

pub use sqlite::SqliteBackend;

use async_trait::async_trait;

use crate::models::{Connection, Node};

/// Error from the storage collaborator. Every write is independently
/// fallible; the store reacts by rolling back its in-memory state.
#[derive(Debug)]
pub struct StorageError(pub String);

impl StorageError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for StorageError {}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        Self(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.to_string())
    }
}

/// Persistence seam for topology records. Implementations store full Node
/// and Connection documents keyed by id, scoped by project. The core never
/// depends on the concrete technology behind this trait.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn load_nodes(&self, project_id: &str) -> Result<Vec<Node>, StorageError>;
    async fn load_connections(&self, project_id: &str) -> Result<Vec<Connection>, StorageError>;

    async fn insert_node(&self, project_id: &str, node: &Node) -> Result<(), StorageError>;
    async fn update_node(&self, node: &Node) -> Result<(), StorageError>;
    async fn delete_node(&self, id: &str) -> Result<(), StorageError>;

    async fn insert_connection(&self, project_id: &str, conn: &Connection) -> Result<(), StorageError>;
    async fn update_connection(&self, conn: &Connection) -> Result<(), StorageError>;
    async fn delete_connection(&self, id: &str) -> Result<(), StorageError>;

    /// Remove every connection incident to the node (cascade for node delete)
    async fn delete_connections_for_node(&self, node_id: &str) -> Result<(), StorageError>;
}
