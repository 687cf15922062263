use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::CoreError;
use crate::migrate;
use crate::models::{
    CableType, Connection, CreateConnectionRequest, CreateEquipmentRequest, CreateNodeRequest,
    Equipment, Node, NodeType, PortRef,
};
use crate::storage::{StorageBackend, StorageError};

/// TopologyStore is the authoritative owner of nodes and connections. All
/// reads clone out of the in-memory state; all mutations apply to memory
/// first, write through to the storage backend, and roll back the in-memory
/// change if the write is rejected. Callers never observe a half-applied
/// mutation.
pub struct TopologyStore {
    project_id: String,
    backend: Arc<dyn StorageBackend>,
    state: RwLock<State>,
}

struct State {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
}

impl TopologyStore {
    /// Load the project's records and run the integrity pass before anything
    /// else can observe them. Repaired connections are re-persisted; a failed
    /// re-persist is logged and retried on next load, since the pass is
    /// idempotent.
    pub async fn load(
        project_id: impl Into<String>,
        backend: Arc<dyn StorageBackend>,
    ) -> Result<Self, StorageError> {
        let project_id = project_id.into();
        let nodes = backend.load_nodes(&project_id).await?;
        let mut connections = backend.load_connections(&project_id).await?;

        let repaired = migrate::run(&nodes, &mut connections);
        for id in &repaired {
            if let Some(conn) = connections.iter().find(|c| c.id == *id) {
                if let Err(e) = backend.update_connection(conn).await {
                    tracing::warn!(connection = %id, "could not persist integrity repair: {}", e);
                }
            }
        }
        if !repaired.is_empty() {
            tracing::info!("integrity pass repaired {} connection(s)", repaired.len());
        }

        Ok(Self {
            project_id,
            backend,
            state: RwLock::new(State { nodes, connections }),
        })
    }

    // ---- reads -------------------------------------------------------------

    pub async fn nodes(&self) -> Vec<Node> {
        self.state.read().await.nodes.clone()
    }

    pub async fn connections(&self) -> Vec<Connection> {
        self.state.read().await.connections.clone()
    }

    pub async fn get_node(&self, id: &str) -> Option<Node> {
        self.state
            .read()
            .await
            .nodes
            .iter()
            .find(|n| n.id == id)
            .cloned()
    }

    pub async fn get_connection(&self, id: &str) -> Option<Connection> {
        self.state
            .read()
            .await
            .connections
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    // ---- node mutations ----------------------------------------------------

    pub async fn add_node(&self, req: CreateNodeRequest) -> Result<Node, CoreError> {
        if req.name.trim().is_empty() {
            return Err(CoreError::validation("node name is required"));
        }
        let node = Node {
            id: Uuid::new_v4().to_string(),
            node_type: req.node_type,
            name: req.name,
            lat: req.lat,
            lng: req.lng,
            rack: Vec::new(),
            splitters: Vec::new(),
            client_data: req.client_data,
            damage_reports: Vec::new(),
        };

        let mut state = self.state.write().await;
        state.nodes.push(node.clone());
        if let Err(e) = self.backend.insert_node(&self.project_id, &node).await {
            state.nodes.pop();
            return Err(e.into());
        }
        Ok(node)
    }

    /// Full-record replace by id.
    pub async fn update_node(&self, node: Node) -> Result<Node, CoreError> {
        let mut state = self.state.write().await;
        let idx = state
            .nodes
            .iter()
            .position(|n| n.id == node.id)
            .ok_or_else(|| CoreError::not_found("node", &node.id))?;

        let previous = std::mem::replace(&mut state.nodes[idx], node.clone());
        if let Err(e) = self.backend.update_node(&node).await {
            state.nodes[idx] = previous;
            return Err(e.into());
        }
        Ok(node)
    }

    /// Removes the node and every connection incident to it. Both steps roll
    /// back together if persistence rejects either one.
    pub async fn delete_node(&self, id: &str) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        if !state.nodes.iter().any(|n| n.id == id) {
            return Err(CoreError::not_found("node", id));
        }

        let prev_nodes = state.nodes.clone();
        let prev_connections = state.connections.clone();
        let removed: Vec<Connection> = state
            .connections
            .iter()
            .filter(|c| c.touches(id))
            .cloned()
            .collect();

        state.nodes.retain(|n| n.id != id);
        state.connections.retain(|c| !c.touches(id));

        if let Err(e) = self.backend.delete_connections_for_node(id).await {
            state.nodes = prev_nodes;
            state.connections = prev_connections;
            return Err(e.into());
        }
        if let Err(e) = self.backend.delete_node(id).await {
            // Connections are already gone from storage. Put them back so the
            // two steps stay atomic from the caller's perspective.
            for conn in &removed {
                if let Err(undo) = self.backend.insert_connection(&self.project_id, conn).await {
                    tracing::warn!(connection = %conn.id, "could not restore connection after failed node delete: {}", undo);
                }
            }
            state.nodes = prev_nodes;
            state.connections = prev_connections;
            return Err(e.into());
        }
        Ok(())
    }

    // ---- connection mutations ----------------------------------------------

    pub async fn add_connection(&self, req: CreateConnectionRequest) -> Result<Connection, CoreError> {
        if req.from == req.to {
            return Err(CoreError::validation("cannot connect a node to itself"));
        }
        if req.fibers == 0 {
            return Err(CoreError::validation("connection must carry at least one fiber"));
        }
        match (&req.cable_type, &req.section_type) {
            (CableType::Drop, Some(_)) => {
                return Err(CoreError::validation("DROP cables cannot carry a section type"))
            }
            (CableType::Drop, None) => {}
            (_, None) => {
                return Err(CoreError::validation("section type is required for non-DROP cables"))
            }
            _ => {}
        }

        let mut state = self.state.write().await;
        let from_node = state
            .nodes
            .iter()
            .find(|n| n.id == req.from)
            .ok_or_else(|| CoreError::not_found("node", &req.from))?;
        let to_node = state
            .nodes
            .iter()
            .find(|n| n.id == req.to)
            .ok_or_else(|| CoreError::not_found("node", &req.to))?;

        if from_node.node_type == NodeType::Rack && to_node.node_type == NodeType::Rack {
            return Err(CoreError::validation(
                "two racks cannot be connected directly",
            ));
        }
        validate_port_ref(from_node, req.from_port.as_ref())?;
        validate_port_ref(to_node, req.to_port.as_ref())?;

        let conn = Connection {
            id: Uuid::new_v4().to_string(),
            from: req.from,
            to: req.to,
            path: req.path,
            cable_type: req.cable_type,
            section_type: req.section_type,
            fibers: req.fibers,
            from_port: req.from_port,
            to_port: req.to_port,
            reported: false,
            fiber_details: Connection::init_fiber_details(req.fibers),
        };

        state.connections.push(conn.clone());
        if let Err(e) = self.backend.insert_connection(&self.project_id, &conn).await {
            state.connections.pop();
            return Err(e.into());
        }
        Ok(conn)
    }

    /// Full-record replace by id.
    pub async fn update_connection(&self, conn: Connection) -> Result<Connection, CoreError> {
        let mut state = self.state.write().await;
        let idx = state
            .connections
            .iter()
            .position(|c| c.id == conn.id)
            .ok_or_else(|| CoreError::not_found("connection", &conn.id))?;

        let previous = std::mem::replace(&mut state.connections[idx], conn.clone());
        if let Err(e) = self.backend.update_connection(&conn).await {
            state.connections[idx] = previous;
            return Err(e.into());
        }
        Ok(conn)
    }

    /// Deleting a connection does not clean up splitter or port state that
    /// referenced it; continuity callers clear terminations first.
    pub async fn delete_connection(&self, id: &str) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        let idx = state
            .connections
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| CoreError::not_found("connection", id))?;

        let removed = state.connections.remove(idx);
        if let Err(e) = self.backend.delete_connection(id).await {
            state.connections.insert(idx, removed);
            return Err(e.into());
        }
        Ok(())
    }

    // ---- rack equipment ----------------------------------------------------

    pub async fn add_equipment(
        &self,
        node_id: &str,
        req: CreateEquipmentRequest,
    ) -> Result<Equipment, CoreError> {
        if req.total_ports == 0 {
            return Err(CoreError::validation("equipment must have at least one port"));
        }

        let mut node = self
            .get_node(node_id)
            .await
            .ok_or_else(|| CoreError::not_found("node", node_id))?;
        if !node.node_type.has_rack() {
            return Err(CoreError::validation(format!(
                "{} nodes do not hold rack equipment",
                node.node_type
            )));
        }

        let equipment = Equipment::new(
            Uuid::new_v4().to_string(),
            req.name,
            req.equipment_type,
            req.total_ports,
            req.is_provider,
        );
        node.rack.push(equipment.clone());
        self.update_node(node).await?;
        Ok(equipment)
    }

    pub async fn delete_equipment(&self, node_id: &str, equip_id: &str) -> Result<(), CoreError> {
        let mut node = self
            .get_node(node_id)
            .await
            .ok_or_else(|| CoreError::not_found("node", node_id))?;
        let idx = node
            .rack
            .iter()
            .position(|e| e.id == equip_id)
            .ok_or_else(|| CoreError::not_found("equipment", equip_id))?;
        node.rack.remove(idx);
        self.update_node(node).await?;
        Ok(())
    }
}

fn validate_port_ref(node: &Node, port: Option<&PortRef>) -> Result<(), CoreError> {
    let Some(port) = port else { return Ok(()) };
    if !node.node_type.has_rack() {
        return Err(CoreError::validation(format!(
            "port reference given for {} node {}, which has no rack",
            node.node_type, node.id
        )));
    }
    let equipment = node
        .equipment(&port.equip_id)
        .ok_or_else(|| CoreError::not_found("equipment", &port.equip_id))?;
    if equipment.port(&port.port_id).is_none() {
        return Err(CoreError::not_found("port", &port.port_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EquipmentType, SectionType};
    use crate::storage::memory::MemoryBackend;

    async fn test_store() -> (TopologyStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let store = TopologyStore::load("test-project", backend.clone())
            .await
            .unwrap();
        (store, backend)
    }

    fn node_req(node_type: NodeType, name: &str) -> CreateNodeRequest {
        CreateNodeRequest {
            node_type,
            name: name.to_string(),
            lat: Some(4.6),
            lng: Some(-74.08),
            client_data: None,
        }
    }

    fn conn_req(from: &str, to: &str) -> CreateConnectionRequest {
        CreateConnectionRequest {
            from: from.to_string(),
            to: to.to_string(),
            path: Vec::new(),
            cable_type: CableType::Adss,
            section_type: Some(SectionType::Troncal),
            fibers: 12,
            from_port: None,
            to_port: None,
        }
    }

    #[tokio::test]
    async fn test_add_node_generates_defaults() {
        let (store, _) = test_store().await;
        let node = store.add_node(node_req(NodeType::Mufla, "Mufla 1")).await.unwrap();
        assert!(node.rack.is_empty());
        assert!(node.splitters.is_empty());
        assert!(node.damage_reports.is_empty());
        assert_eq!(store.nodes().await.len(), 1);
    }

    #[tokio::test]
    async fn test_connection_validations() {
        let (store, _) = test_store().await;
        let a = store.add_node(node_req(NodeType::Rack, "Rack A")).await.unwrap();
        let b = store.add_node(node_req(NodeType::Rack, "Rack B")).await.unwrap();
        let m = store.add_node(node_req(NodeType::Mufla, "Mufla")).await.unwrap();

        // self loop
        let err = store.add_connection(conn_req(&a.id, &a.id)).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        // rack to rack
        let err = store.add_connection(conn_req(&a.id, &b.id)).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        // missing endpoint
        let err = store.add_connection(conn_req(&a.id, "ghost")).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));

        // DROP with a section type
        let mut req = conn_req(&a.id, &m.id);
        req.cable_type = CableType::Drop;
        let err = store.add_connection(req).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        // non-DROP without a section type
        let mut req = conn_req(&a.id, &m.id);
        req.section_type = None;
        let err = store.add_connection(req).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        // valid case generates colored fibers
        let conn = store.add_connection(conn_req(&a.id, &m.id)).await.unwrap();
        assert_eq!(conn.fiber_details.len(), 12);
        assert_eq!(conn.fiber_details[0].color, "Azul");
    }

    #[tokio::test]
    async fn test_cascade_delete_removes_incident_connections() {
        let (store, _) = test_store().await;
        let a = store.add_node(node_req(NodeType::Olt, "OLT")).await.unwrap();
        let b = store.add_node(node_req(NodeType::Mufla, "Mufla")).await.unwrap();
        let c = store.add_node(node_req(NodeType::Nap, "NAP")).await.unwrap();
        store.add_connection(conn_req(&a.id, &b.id)).await.unwrap();
        store.add_connection(conn_req(&b.id, &c.id)).await.unwrap();
        let keep = store.add_connection(conn_req(&a.id, &c.id)).await.unwrap();

        store.delete_node(&b.id).await.unwrap();

        let remaining = store.connections().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keep.id);
        assert!(remaining.iter().all(|cn| !cn.touches(&b.id)));
    }

    #[tokio::test]
    async fn test_mutations_roll_back_on_persistence_failure() {
        let (store, backend) = test_store().await;
        let a = store.add_node(node_req(NodeType::Olt, "OLT")).await.unwrap();
        let b = store.add_node(node_req(NodeType::Mufla, "Mufla")).await.unwrap();
        store.add_connection(conn_req(&a.id, &b.id)).await.unwrap();

        let nodes_before = store.nodes().await;
        let conns_before = store.connections().await;

        backend.set_fail_writes(true);

        let err = store.add_node(node_req(NodeType::Nap, "NAP")).await.unwrap_err();
        assert!(matches!(err, CoreError::Persistence(_)));

        let mut renamed = nodes_before[0].clone();
        renamed.name = "renamed".to_string();
        let err = store.update_node(renamed).await.unwrap_err();
        assert!(matches!(err, CoreError::Persistence(_)));

        let err = store.delete_node(&b.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Persistence(_)));

        let err = store.add_connection(conn_req(&b.id, &a.id)).await.unwrap_err();
        assert!(matches!(err, CoreError::Persistence(_)));

        assert_eq!(store.nodes().await, nodes_before);
        assert_eq!(store.connections().await, conns_before);
    }

    #[tokio::test]
    async fn test_equipment_requires_rack_capability() {
        let (store, _) = test_store().await;
        let rack = store.add_node(node_req(NodeType::Rack, "Rack")).await.unwrap();
        let onu = store.add_node(node_req(NodeType::Onu, "ONU")).await.unwrap();

        let req = CreateEquipmentRequest {
            name: "Router Principal".to_string(),
            equipment_type: EquipmentType::Router,
            total_ports: 8,
            is_provider: true,
        };
        let eq = store.add_equipment(&rack.id, req.clone()).await.unwrap();
        assert_eq!(eq.ports.len(), 8);
        assert!(eq.is_provider);

        let err = store.add_equipment(&onu.id, req).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        store.delete_equipment(&rack.id, &eq.id).await.unwrap();
        assert!(store.get_node(&rack.id).await.unwrap().rack.is_empty());
    }

    #[tokio::test]
    async fn test_load_runs_integrity_pass() {
        use crate::models::{SplitterPin, Termination};

        let backend = Arc::new(MemoryBackend::new());
        {
            let store = TopologyStore::load("p", backend.clone()).await.unwrap();
            let m = store.add_node(node_req(NodeType::Mufla, "Mufla")).await.unwrap();
            let x = store.add_node(node_req(NodeType::Onu, "ONU")).await.unwrap();
            let mut conn = store.add_connection(conn_req(&m.id, &x.id)).await.unwrap();
            conn.fiber_details[0].from_termination = Some(Termination::Splitter {
                node_id: m.id.clone(),
                splitter_id: "gone".to_string(),
                port: SplitterPin::Input,
            });
            store.update_connection(conn).await.unwrap();
        }

        let store = TopologyStore::load("p", backend).await.unwrap();
        let conns = store.connections().await;
        assert!(conns[0].fiber_details[0].from_termination.is_none());
    }
}
