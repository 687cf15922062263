use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::{Connection, Node};

use super::{StorageBackend, StorageError};

/// In-memory backend for tests. Writes can be toggled to fail so the
/// store's rollback path can be exercised.
#[derive(Default)]
pub struct MemoryBackend {
    nodes: Mutex<BTreeMap<String, (String, Node)>>,
    connections: Mutex<BTreeMap<String, (String, Connection)>>,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StorageError::new("simulated write failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn load_nodes(&self, project_id: &str) -> Result<Vec<Node>, StorageError> {
        let nodes = self.nodes.lock().unwrap();
        Ok(nodes
            .values()
            .filter(|(pid, _)| pid == project_id)
            .map(|(_, n)| n.clone())
            .collect())
    }

    async fn load_connections(&self, project_id: &str) -> Result<Vec<Connection>, StorageError> {
        let connections = self.connections.lock().unwrap();
        Ok(connections
            .values()
            .filter(|(pid, _)| pid == project_id)
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn insert_node(&self, project_id: &str, node: &Node) -> Result<(), StorageError> {
        self.check_writable()?;
        self.nodes
            .lock()
            .unwrap()
            .insert(node.id.clone(), (project_id.to_string(), node.clone()));
        Ok(())
    }

    async fn update_node(&self, node: &Node) -> Result<(), StorageError> {
        self.check_writable()?;
        let mut nodes = self.nodes.lock().unwrap();
        match nodes.get_mut(&node.id) {
            Some(entry) => {
                entry.1 = node.clone();
                Ok(())
            }
            None => Err(StorageError::new(format!("node row missing: {}", node.id))),
        }
    }

    async fn delete_node(&self, id: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.nodes.lock().unwrap().remove(id);
        Ok(())
    }

    async fn insert_connection(&self, project_id: &str, conn: &Connection) -> Result<(), StorageError> {
        self.check_writable()?;
        self.connections
            .lock()
            .unwrap()
            .insert(conn.id.clone(), (project_id.to_string(), conn.clone()));
        Ok(())
    }

    async fn update_connection(&self, conn: &Connection) -> Result<(), StorageError> {
        self.check_writable()?;
        let mut connections = self.connections.lock().unwrap();
        match connections.get_mut(&conn.id) {
            Some(entry) => {
                entry.1 = conn.clone();
                Ok(())
            }
            None => Err(StorageError::new(format!("connection row missing: {}", conn.id))),
        }
    }

    async fn delete_connection(&self, id: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.connections.lock().unwrap().remove(id);
        Ok(())
    }

    async fn delete_connections_for_node(&self, node_id: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.connections
            .lock()
            .unwrap()
            .retain(|_, (_, c)| c.from != node_id && c.to != node_id);
        Ok(())
    }
}
