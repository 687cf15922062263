use std::collections::{HashSet, VecDeque};

use serde::Serialize;

use crate::error::CoreError;
use crate::models::{End, EquipmentType, Node};
use crate::store::TopologyStore;

/// Result of a downstream traversal: the affected node records plus the ids
/// of every cable the fault travels over.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownstreamImpact {
    pub nodes: Vec<Node>,
    pub connection_ids: Vec<String>,
}

/// ImpactAnalyzer runs the two graph traversals over the topology: downstream
/// fault propagation along directed edges, and upstream provider reachability
/// over the undirected adjacency. Both take the store explicitly and read a
/// consistent snapshot of it.
pub struct ImpactAnalyzer;

impl ImpactAnalyzer {
    /// Everything downstream of a fault at `start`, following directed
    /// from -> to edges. A visited node with an unresolved damage report is
    /// recorded but not expanded: its own failure isolates whatever lies
    /// beyond it. The start node is exempt from that stopping rule and is
    /// not itself part of the result. Explicit stack, cycle safe.
    pub async fn downstream_impact(
        store: &TopologyStore,
        start: &str,
    ) -> Result<DownstreamImpact, CoreError> {
        let nodes = store.nodes().await;
        let connections = store.connections().await;
        if !nodes.iter().any(|n| n.id == start) {
            return Err(CoreError::not_found("node", start));
        }
        Ok(downstream_from(&nodes, &connections, start))
    }

    /// True if `start` can reach, over any cable in either direction, a
    /// rack-capable node holding a provider router.
    pub async fn check_provider_connectivity(
        store: &TopologyStore,
        start: &str,
    ) -> Result<bool, CoreError> {
        let nodes = store.nodes().await;
        let connections = store.connections().await;
        if !nodes.iter().any(|n| n.id == start) {
            return Err(CoreError::not_found("node", start));
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        visited.insert(start);
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            if let Some(node) = nodes.iter().find(|n| n.id == current) {
                if node.node_type.has_rack() && has_provider_router(node) {
                    return Ok(true);
                }
            }
            for conn in &connections {
                if let Some(other) = conn.other_end(current) {
                    if visited.insert(other) {
                        queue.push_back(other);
                    }
                }
            }
        }
        Ok(false)
    }

    /// Impact of a fault on a rack port: each cable plugged into that exact
    /// port is traversed downstream starting at its far endpoint. The rack
    /// itself is unaffected; the fault isolates what hangs off the cable.
    pub async fn propagate_port_failure(
        store: &TopologyStore,
        node_id: &str,
        port_id: &str,
    ) -> Result<DownstreamImpact, CoreError> {
        let nodes = store.nodes().await;
        let connections = store.connections().await;
        if !nodes.iter().any(|n| n.id == node_id) {
            return Err(CoreError::not_found("node", node_id));
        }

        let mut affected_nodes: Vec<Node> = Vec::new();
        let mut affected_ids: HashSet<String> = HashSet::new();
        let mut connection_ids: Vec<String> = Vec::new();

        for conn in &connections {
            let hit = [End::From, End::To].into_iter().any(|end| {
                conn.end_at(node_id) == Some(end)
                    && conn.port_ref(end).map(|p| p.port_id.as_str()) == Some(port_id)
            });
            if !hit {
                continue;
            }
            let Some(far) = conn.other_end(node_id) else { continue };

            if !connection_ids.iter().any(|id| id == &conn.id) {
                connection_ids.push(conn.id.clone());
            }
            let sub = downstream_from(&nodes, &connections, far);
            for node in sub.nodes {
                if affected_ids.insert(node.id.clone()) {
                    affected_nodes.push(node);
                }
            }
            // The far endpoint itself is affected too.
            if affected_ids.insert(far.to_string()) {
                if let Some(node) = nodes.iter().find(|n| n.id == far) {
                    affected_nodes.push(node.clone());
                }
            }
            for id in sub.connection_ids {
                if !connection_ids.contains(&id) {
                    connection_ids.push(id);
                }
            }
        }

        Ok(DownstreamImpact {
            nodes: affected_nodes,
            connection_ids,
        })
    }

    /// Derived per call, never cached: a node has an active connection when
    /// some incident cable is unreported and every rack port that cable is
    /// plugged into is unreported as well.
    pub async fn has_active_connection(
        store: &TopologyStore,
        node_id: &str,
    ) -> Result<bool, CoreError> {
        let nodes = store.nodes().await;
        let connections = store.connections().await;
        if !nodes.iter().any(|n| n.id == node_id) {
            return Err(CoreError::not_found("node", node_id));
        }

        for conn in connections.iter().filter(|c| c.touches(node_id)) {
            if conn.reported {
                continue;
            }
            let mut port_faulted = false;
            for end in [End::From, End::To] {
                let Some(port_ref) = conn.port_ref(end) else { continue };
                let end_node_id = match end {
                    End::From => &conn.from,
                    End::To => &conn.to,
                };
                let reported = nodes
                    .iter()
                    .find(|n| n.id == *end_node_id)
                    .and_then(|n| n.equipment(&port_ref.equip_id))
                    .and_then(|e| e.port(&port_ref.port_id))
                    .map(|p| p.reported)
                    .unwrap_or(false);
                if reported {
                    port_faulted = true;
                    break;
                }
            }
            if !port_faulted {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn has_provider_router(node: &Node) -> bool {
    node.rack
        .iter()
        .any(|e| e.equipment_type == EquipmentType::Router && e.is_provider)
}

fn downstream_from(
    nodes: &[Node],
    connections: &[crate::models::Connection],
    start: &str,
) -> DownstreamImpact {
    let mut visited: HashSet<String> = HashSet::new();
    let mut affected: Vec<Node> = Vec::new();
    let mut connection_ids: Vec<String> = Vec::new();
    let mut stack: Vec<String> = vec![start.to_string()];
    visited.insert(start.to_string());

    while let Some(current) = stack.pop() {
        // A damaged node is isolated: reached, but nothing beyond it.
        if current != start {
            let damaged = nodes
                .iter()
                .find(|n| n.id == current)
                .map(Node::has_unresolved_damage)
                .unwrap_or(false);
            if damaged {
                continue;
            }
        }

        for conn in connections.iter().filter(|c| c.from == current) {
            if !connection_ids.iter().any(|id| id == &conn.id) {
                connection_ids.push(conn.id.clone());
            }
            if visited.insert(conn.to.clone()) {
                if let Some(node) = nodes.iter().find(|n| n.id == conn.to) {
                    affected.push(node.clone());
                }
                stack.push(conn.to.clone());
            }
        }
    }

    DownstreamImpact {
        nodes: affected,
        connection_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::continuity::Continuity;
    use crate::models::{
        CableType, CreateConnectionRequest, CreateEquipmentRequest, CreateNodeRequest, NodeType,
        PortRef, SectionType,
    };
    use crate::storage::memory::MemoryBackend;

    async fn test_store() -> TopologyStore {
        TopologyStore::load("test", Arc::new(MemoryBackend::new()))
            .await
            .unwrap()
    }

    async fn add_node(store: &TopologyStore, node_type: NodeType, name: &str) -> Node {
        store
            .add_node(CreateNodeRequest {
                node_type,
                name: name.to_string(),
                lat: None,
                lng: None,
                client_data: None,
            })
            .await
            .unwrap()
    }

    async fn cable(
        store: &TopologyStore,
        from: &str,
        to: &str,
        from_port: Option<PortRef>,
    ) -> crate::models::Connection {
        store
            .add_connection(CreateConnectionRequest {
                from: from.to_string(),
                to: to.to_string(),
                path: Vec::new(),
                cable_type: CableType::Adss,
                section_type: Some(SectionType::Tramo),
                fibers: 4,
                from_port,
                to_port: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_downstream_stops_at_damaged_node() {
        let store = test_store().await;
        let a = add_node(&store, NodeType::Olt, "A").await;
        let b = add_node(&store, NodeType::Mufla, "B").await;
        let c = add_node(&store, NodeType::Nap, "C").await;
        let ab = cable(&store, &a.id, &b.id, None).await;
        let bc = cable(&store, &b.id, &c.id, None).await;

        Continuity::add_damage_report(&store, &b.id, "poste caído".to_string())
            .await
            .unwrap();

        let impact = ImpactAnalyzer::downstream_impact(&store, &a.id).await.unwrap();
        let node_ids: Vec<&str> = impact.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(node_ids, vec![b.id.as_str()]);
        assert_eq!(impact.connection_ids, vec![ab.id.clone()]);
        assert!(!impact.connection_ids.contains(&bc.id));

        // The start node is exempt from the stopping rule.
        let impact = ImpactAnalyzer::downstream_impact(&store, &b.id).await.unwrap();
        assert_eq!(impact.nodes.len(), 1);
        assert_eq!(impact.nodes[0].id, c.id);
    }

    #[tokio::test]
    async fn test_downstream_is_directed_and_cycle_safe() {
        let store = test_store().await;
        let a = add_node(&store, NodeType::Olt, "A").await;
        let b = add_node(&store, NodeType::Mufla, "B").await;
        let c = add_node(&store, NodeType::Nap, "C").await;
        let d = add_node(&store, NodeType::Onu, "D").await;
        // Diamond: A -> B, A -> C, B -> D, C -> D, plus an upstream edge D -> A
        cable(&store, &a.id, &b.id, None).await;
        cable(&store, &a.id, &c.id, None).await;
        cable(&store, &b.id, &d.id, None).await;
        cable(&store, &c.id, &d.id, None).await;
        cable(&store, &d.id, &a.id, None).await;

        let impact = ImpactAnalyzer::downstream_impact(&store, &a.id).await.unwrap();
        let mut node_ids: Vec<&str> = impact.nodes.iter().map(|n| n.id.as_str()).collect();
        node_ids.sort();
        let mut expected = vec![b.id.as_str(), c.id.as_str(), d.id.as_str()];
        expected.sort();
        assert_eq!(node_ids, expected);
        // All five edges get traversed exactly once each
        assert_eq!(impact.connection_ids.len(), 5);
    }

    #[tokio::test]
    async fn test_provider_reachability() {
        let store = test_store().await;
        let rack = add_node(&store, NodeType::Rack, "Central").await;
        let x = add_node(&store, NodeType::Mufla, "X").await;
        store
            .add_equipment(
                &rack.id,
                CreateEquipmentRequest {
                    name: "Router Borde".to_string(),
                    equipment_type: crate::models::EquipmentType::Router,
                    total_ports: 4,
                    is_provider: true,
                },
            )
            .await
            .unwrap();

        assert!(!ImpactAnalyzer::check_provider_connectivity(&store, &x.id).await.unwrap());

        // Direction of the cable does not matter for reachability
        let link = cable(&store, &x.id, &rack.id, None).await;
        assert!(ImpactAnalyzer::check_provider_connectivity(&store, &x.id).await.unwrap());

        store.delete_connection(&link.id).await.unwrap();
        assert!(!ImpactAnalyzer::check_provider_connectivity(&store, &x.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_port_failure_propagates_from_far_endpoint() {
        let store = test_store().await;
        let rack = add_node(&store, NodeType::Rack, "Central").await;
        let mufla = add_node(&store, NodeType::Mufla, "Mufla").await;
        let onu = add_node(&store, NodeType::Onu, "Casa").await;
        let olt = store
            .add_equipment(
                &rack.id,
                CreateEquipmentRequest {
                    name: "OLT".to_string(),
                    equipment_type: crate::models::EquipmentType::Olt,
                    total_ports: 8,
                    is_provider: false,
                },
            )
            .await
            .unwrap();

        let feeder = cable(
            &store,
            &rack.id,
            &mufla.id,
            Some(PortRef {
                equip_id: olt.id.clone(),
                port_id: olt.ports[0].id.clone(),
            }),
        )
        .await;
        let drop = cable(&store, &mufla.id, &onu.id, None).await;

        let impact = ImpactAnalyzer::propagate_port_failure(&store, &rack.id, &olt.ports[0].id)
            .await
            .unwrap();
        let node_ids: Vec<&str> = impact.nodes.iter().map(|n| n.id.as_str()).collect();
        assert!(node_ids.contains(&mufla.id.as_str()));
        assert!(node_ids.contains(&onu.id.as_str()));
        assert!(!node_ids.contains(&rack.id.as_str()));
        assert!(impact.connection_ids.contains(&feeder.id));
        assert!(impact.connection_ids.contains(&drop.id));
    }

    #[tokio::test]
    async fn test_active_connection_is_derived() {
        let store = test_store().await;
        let rack = add_node(&store, NodeType::Rack, "Central").await;
        let mufla = add_node(&store, NodeType::Mufla, "Mufla").await;
        let olt = store
            .add_equipment(
                &rack.id,
                CreateEquipmentRequest {
                    name: "OLT".to_string(),
                    equipment_type: crate::models::EquipmentType::Olt,
                    total_ports: 8,
                    is_provider: false,
                },
            )
            .await
            .unwrap();

        assert!(!ImpactAnalyzer::has_active_connection(&store, &mufla.id).await.unwrap());

        let mut conn = cable(
            &store,
            &rack.id,
            &mufla.id,
            Some(PortRef {
                equip_id: olt.id.clone(),
                port_id: olt.ports[2].id.clone(),
            }),
        )
        .await;
        assert!(ImpactAnalyzer::has_active_connection(&store, &mufla.id).await.unwrap());

        // A fault on the rack-side port kills the derived state
        Continuity::report_port(&store, &rack.id, &olt.id, &olt.ports[2].id)
            .await
            .unwrap();
        assert!(!ImpactAnalyzer::has_active_connection(&store, &mufla.id).await.unwrap());

        Continuity::resolve_port_report(&store, &rack.id, &olt.id, &olt.ports[2].id)
            .await
            .unwrap();
        assert!(ImpactAnalyzer::has_active_connection(&store, &mufla.id).await.unwrap());

        // A reported cable is never active
        conn.reported = true;
        store.update_connection(conn).await.unwrap();
        assert!(!ImpactAnalyzer::has_active_connection(&store, &mufla.id).await.unwrap());
    }
}
