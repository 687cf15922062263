use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};

use crate::models::{Connection, Node};

use super::{StorageBackend, StorageError};

/// SQLite-backed storage. Records are JSON documents, one row per record,
/// so the schema never has to chase the document model.
#[derive(Clone)]
pub struct SqliteBackend {
    pool: Pool<Sqlite>,
}

impl SqliteBackend {
    /// Open (creating if needed) and run migrations.
    pub async fn new(db_path: &str) -> anyhow::Result<Self> {
        Self::with_pool_size(db_path, 5).await
    }

    /// Open with a specific connection pool size.
    pub async fn with_pool_size(db_path: &str, max_connections: u32) -> anyhow::Result<Self> {
        use anyhow::Context;

        let db_url = format!("sqlite:{}?mode=rwc", db_path);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&db_url)
            .await
            .context("Failed to connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;

        Ok(Self { pool })
    }

    async fn load_docs<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        project_id: &str,
    ) -> Result<Vec<T>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT data FROM {} WHERE project_id = ? ORDER BY id",
            table
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let data: String = row.try_get("data")?;
            out.push(serde_json::from_str(&data)?);
        }
        Ok(out)
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    async fn load_nodes(&self, project_id: &str) -> Result<Vec<Node>, StorageError> {
        self.load_docs("nodes", project_id).await
    }

    async fn load_connections(&self, project_id: &str) -> Result<Vec<Connection>, StorageError> {
        self.load_docs("connections", project_id).await
    }

    async fn insert_node(&self, project_id: &str, node: &Node) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO nodes (id, project_id, data) VALUES (?, ?, ?)")
            .bind(&node.id)
            .bind(project_id)
            .bind(serde_json::to_string(node)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_node(&self, node: &Node) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE nodes SET data = ? WHERE id = ?")
            .bind(serde_json::to_string(node)?)
            .bind(&node.id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::new(format!("node row missing: {}", node.id)));
        }
        Ok(())
    }

    async fn delete_node(&self, id: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM nodes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_connection(&self, project_id: &str, conn: &Connection) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO connections (id, project_id, data) VALUES (?, ?, ?)")
            .bind(&conn.id)
            .bind(project_id)
            .bind(serde_json::to_string(conn)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_connection(&self, conn: &Connection) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE connections SET data = ? WHERE id = ?")
            .bind(serde_json::to_string(conn)?)
            .bind(&conn.id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::new(format!("connection row missing: {}", conn.id)));
        }
        Ok(())
    }

    async fn delete_connection(&self, id: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM connections WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_connections_for_node(&self, node_id: &str) -> Result<(), StorageError> {
        sqlx::query(
            "DELETE FROM connections WHERE json_extract(data, '$.from') = ? OR json_extract(data, '$.to') = ?",
        )
        .bind(node_id)
        .bind(node_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CableType, NodeType};

    async fn memory_backend() -> SqliteBackend {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        SqliteBackend { pool }
    }

    fn node(id: &str) -> Node {
        Node {
            id: id.to_string(),
            node_type: NodeType::Mufla,
            name: format!("Mufla {}", id),
            lat: Some(4.6),
            lng: Some(-74.1),
            rack: Vec::new(),
            splitters: Vec::new(),
            client_data: None,
            damage_reports: Vec::new(),
        }
    }

    fn connection(id: &str, from: &str, to: &str) -> Connection {
        Connection {
            id: id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            path: vec![[4.6, -74.1], [4.7, -74.2]],
            cable_type: CableType::Adss,
            section_type: Some(crate::models::SectionType::Troncal),
            fibers: 12,
            from_port: None,
            to_port: None,
            reported: false,
            fiber_details: Connection::init_fiber_details(12),
        }
    }

    #[tokio::test]
    async fn test_node_roundtrip_scoped_by_project() {
        let backend = memory_backend().await;
        backend.insert_node("p1", &node("n1")).await.unwrap();
        backend.insert_node("p2", &node("n2")).await.unwrap();

        let p1 = backend.load_nodes("p1").await.unwrap();
        assert_eq!(p1.len(), 1);
        assert_eq!(p1[0].id, "n1");
        assert_eq!(p1[0].node_type, NodeType::Mufla);

        assert!(backend.load_nodes("p3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cascade_delete_by_endpoint() {
        let backend = memory_backend().await;
        backend.insert_connection("p1", &connection("c1", "a", "b")).await.unwrap();
        backend.insert_connection("p1", &connection("c2", "b", "c")).await.unwrap();
        backend.insert_connection("p1", &connection("c3", "c", "d")).await.unwrap();

        backend.delete_connections_for_node("b").await.unwrap();

        let left = backend.load_connections("p1").await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, "c3");
    }

    #[tokio::test]
    async fn test_update_missing_row_fails() {
        let backend = memory_backend().await;
        let err = backend.update_node(&node("ghost")).await;
        assert!(err.is_err());
    }
}
