use chrono::Utc;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{
    Connection, CreateSplitterRequest, DamageReport, End, FiberRef, Node, Port, PortPeer,
    PortStatus, Splitter, SplitterInput, SplitterPin, Termination,
};
use crate::store::TopologyStore;

/// Continuity is the cross-connect engine: equipment patches, splitter
/// provisioning, fiber fusions, and ODF panel wiring. Every protocol follows
/// the same shape: locate, validate availability, write both sides
/// symmetrically, persist, and undo the already-written side when a second
/// persist fails.
pub struct Continuity;

impl Continuity {
    // ---- equipment patches -------------------------------------------------

    /// Cross-connect two ports in the same rack. Both sides live in one node
    /// record, so the double write persists atomically. Already-connected
    /// ports are rejected; the caller must unpatch first.
    pub async fn patch_ports(
        store: &TopologyStore,
        node_id: &str,
        equip_a: &str,
        port_a: &str,
        equip_b: &str,
        port_b: &str,
    ) -> Result<Node, CoreError> {
        if equip_a == equip_b && port_a == port_b {
            return Err(CoreError::validation("cannot patch a port to itself"));
        }

        let mut node = get_rack_node(store, node_id).await?;

        let name_a = node
            .equipment(equip_a)
            .ok_or_else(|| CoreError::not_found("equipment", equip_a))?
            .name
            .clone();
        let name_b = node
            .equipment(equip_b)
            .ok_or_else(|| CoreError::not_found("equipment", equip_b))?
            .name
            .clone();

        for (equip_id, port_id) in [(equip_a, port_a), (equip_b, port_b)] {
            let port = find_port(&node, equip_id, port_id)?;
            if port.status == PortStatus::Connected {
                return Err(CoreError::validation(format!(
                    "port {} is already connected",
                    port_id
                )));
            }
        }

        set_port(
            &mut node,
            equip_a,
            port_a,
            PortStatus::Connected,
            Some(PortPeer {
                equip_id: equip_b.to_string(),
                port_id: port_b.to_string(),
                equip_name: name_b,
            }),
        )?;
        set_port(
            &mut node,
            equip_b,
            port_b,
            PortStatus::Connected,
            Some(PortPeer {
                equip_id: equip_a.to_string(),
                port_id: port_a.to_string(),
                equip_name: name_a,
            }),
        )?;

        store.update_node(node).await
    }

    /// Disconnect a patched port and its peer. Both sides reset to free with
    /// their fault flags cleared; a disconnected port cannot stay reported.
    pub async fn unpatch_port(
        store: &TopologyStore,
        node_id: &str,
        equip_id: &str,
        port_id: &str,
    ) -> Result<Node, CoreError> {
        let mut node = get_rack_node(store, node_id).await?;

        let port = find_port(&node, equip_id, port_id)?;
        if port.status != PortStatus::Connected {
            return Err(CoreError::validation(format!("port {} is not connected", port_id)));
        }
        let peer = port.connected_to.clone();

        set_port(&mut node, equip_id, port_id, PortStatus::Free, None)?;
        if let Some(p) = node
            .equipment_mut(equip_id)
            .and_then(|e| e.port_mut(port_id))
        {
            p.reported = false;
        }

        // The peer may be a synthetic splitter reference; clear it only when
        // it names a real port in this rack.
        if let Some(peer) = peer {
            if let Some(p) = node
                .equipment_mut(&peer.equip_id)
                .and_then(|e| e.port_mut(&peer.port_id))
            {
                p.status = PortStatus::Free;
                p.connected_to = None;
                p.reported = false;
            }
        }

        store.update_node(node).await
    }

    /// Flag a port as faulted. The flag is mirrored onto the patched peer
    /// port when one exists in the same rack.
    pub async fn report_port(
        store: &TopologyStore,
        node_id: &str,
        equip_id: &str,
        port_id: &str,
    ) -> Result<Node, CoreError> {
        Self::set_port_reported(store, node_id, equip_id, port_id, true).await
    }

    pub async fn resolve_port_report(
        store: &TopologyStore,
        node_id: &str,
        equip_id: &str,
        port_id: &str,
    ) -> Result<Node, CoreError> {
        Self::set_port_reported(store, node_id, equip_id, port_id, false).await
    }

    async fn set_port_reported(
        store: &TopologyStore,
        node_id: &str,
        equip_id: &str,
        port_id: &str,
        reported: bool,
    ) -> Result<Node, CoreError> {
        let mut node = get_rack_node(store, node_id).await?;

        let peer = find_port(&node, equip_id, port_id)?.connected_to.clone();
        if let Some(p) = node
            .equipment_mut(equip_id)
            .and_then(|e| e.port_mut(port_id))
        {
            p.reported = reported;
        }
        if let Some(peer) = peer {
            if let Some(p) = node
                .equipment_mut(&peer.equip_id)
                .and_then(|e| e.port_mut(&peer.port_id))
            {
                p.reported = reported;
            }
        }

        store.update_node(node).await
    }

    // ---- damage reports ----------------------------------------------------

    pub async fn add_damage_report(
        store: &TopologyStore,
        node_id: &str,
        description: String,
    ) -> Result<DamageReport, CoreError> {
        if description.trim().is_empty() {
            return Err(CoreError::validation("damage description is required"));
        }
        let mut node = store
            .get_node(node_id)
            .await
            .ok_or_else(|| CoreError::not_found("node", node_id))?;

        let report = DamageReport::new(Uuid::new_v4().to_string(), description, Utc::now());
        node.damage_reports.push(report.clone());
        store.update_node(node).await?;
        Ok(report)
    }

    pub async fn resolve_damage_report(
        store: &TopologyStore,
        node_id: &str,
        report_id: &str,
    ) -> Result<DamageReport, CoreError> {
        let mut node = store
            .get_node(node_id)
            .await
            .ok_or_else(|| CoreError::not_found("node", node_id))?;
        let report = node
            .damage_reports
            .iter_mut()
            .find(|r| r.id == report_id)
            .ok_or_else(|| CoreError::not_found("damage report", report_id))?;
        if report.resolved {
            return Err(CoreError::validation("damage report is already resolved"));
        }
        report.resolve(Utc::now());
        let resolved = report.clone();
        store.update_node(node).await?;
        Ok(resolved)
    }

    // ---- splitters ---------------------------------------------------------

    /// Provision a splitter fed by one strand of a cable reaching this node.
    /// The input fiber's termination is written first, then the splitter
    /// record; a failed second persist undoes the termination.
    pub async fn add_splitter(
        store: &TopologyStore,
        node_id: &str,
        req: CreateSplitterRequest,
    ) -> Result<Splitter, CoreError> {
        let mut node = store
            .get_node(node_id)
            .await
            .ok_or_else(|| CoreError::not_found("node", node_id))?;
        if !node.node_type.has_splitters() {
            return Err(CoreError::validation(format!(
                "{} nodes do not hold splitters",
                node.node_type
            )));
        }

        let mut conn = get_connection_at(store, &req.connection_id, node_id).await?;
        let end = end_at(&conn, node_id)?;
        let fiber = conn
            .fiber(req.fiber_number)
            .ok_or_else(|| CoreError::not_found("fiber", req.fiber_number.to_string()))?;
        if fiber.termination(end).is_some() {
            return Err(CoreError::validation(format!(
                "fiber {} is already terminated at this node",
                req.fiber_number
            )));
        }
        let input_color = fiber.color.clone();

        let splitter = Splitter::new(
            Uuid::new_v4().to_string(),
            req.splitter_type,
            SplitterInput {
                connection_id: req.connection_id.clone(),
                fiber_number: req.fiber_number,
                color: input_color,
            },
        );

        let conn_before = conn.clone();
        if let Some(f) = conn.fiber_mut(req.fiber_number) {
            f.set_termination(
                end,
                Some(Termination::Splitter {
                    node_id: node_id.to_string(),
                    splitter_id: splitter.id.clone(),
                    port: SplitterPin::Input,
                }),
            );
        }
        store.update_connection(conn).await?;

        node.splitters.push(splitter.clone());
        if let Err(e) = store.update_node(node).await {
            undo_connection(store, conn_before).await;
            return Err(e);
        }
        Ok(splitter)
    }

    /// Remove a splitter, freeing its input fiber's termination first.
    /// Output terminations left on outgoing fibers are repaired by the
    /// integrity pass on next load.
    pub async fn delete_splitter(
        store: &TopologyStore,
        node_id: &str,
        splitter_id: &str,
    ) -> Result<(), CoreError> {
        let mut node = store
            .get_node(node_id)
            .await
            .ok_or_else(|| CoreError::not_found("node", node_id))?;
        let splitter = node
            .splitter(splitter_id)
            .ok_or_else(|| CoreError::not_found("splitter", splitter_id))?
            .clone();

        let mut freed: Option<Connection> = None;
        match store.get_connection(&splitter.input_fiber.connection_id).await {
            Some(mut conn) => {
                if let Some(end) = conn.end_at(node_id) {
                    let before = conn.clone();
                    let points_here = conn
                        .fiber(splitter.input_fiber.fiber_number)
                        .and_then(|f| f.termination(end))
                        .map(|t| matches!(t, Termination::Splitter { splitter_id: sid, .. } if sid == splitter_id))
                        .unwrap_or(false);
                    if points_here {
                        if let Some(f) = conn.fiber_mut(splitter.input_fiber.fiber_number) {
                            f.set_termination(end, None);
                        }
                        store.update_connection(conn).await?;
                        freed = Some(before);
                    }
                }
            }
            None => {
                tracing::warn!(
                    splitter = splitter_id,
                    connection = %splitter.input_fiber.connection_id,
                    "splitter input cable no longer exists"
                );
            }
        }

        node.splitters.retain(|s| s.id != splitter_id);
        if let Err(e) = store.update_node(node).await {
            if let Some(before) = freed {
                undo_connection(store, before).await;
            }
            return Err(e);
        }
        Ok(())
    }

    /// Wire a splitter output port to a strand of an outgoing cable. The
    /// near end of the strand becomes a splitter termination; the far end
    /// becomes either an equipment-port termination (destination rack, port
    /// marked connected with a synthetic splitter peer) or a generic node
    /// termination.
    pub async fn connect_splitter_output(
        store: &TopologyStore,
        node_id: &str,
        splitter_id: &str,
        output_port: u32,
        connection_id: &str,
        fiber_number: u32,
    ) -> Result<Splitter, CoreError> {
        let mut node = store
            .get_node(node_id)
            .await
            .ok_or_else(|| CoreError::not_found("node", node_id))?;
        {
            let splitter = node
                .splitter(splitter_id)
                .ok_or_else(|| CoreError::not_found("splitter", splitter_id))?;
            let port = splitter
                .output_ports
                .iter()
                .find(|p| p.port_number == output_port)
                .ok_or_else(|| CoreError::not_found("splitter port", output_port.to_string()))?;
            if port.used {
                return Err(CoreError::validation(format!(
                    "splitter output {} is already in use",
                    output_port
                )));
            }
        }

        let mut conn = get_connection_at(store, connection_id, node_id).await?;
        let near = end_at(&conn, node_id)?;
        let far = near.opposite();
        let far_node_id = conn
            .other_end(node_id)
            .ok_or_else(|| CoreError::not_found("node", node_id))?
            .to_string();

        let fiber = conn
            .fiber(fiber_number)
            .ok_or_else(|| CoreError::not_found("fiber", fiber_number.to_string()))?;
        if fiber.termination(near).is_some() || fiber.termination(far).is_some() {
            return Err(CoreError::validation(format!(
                "fiber {} is already terminated",
                fiber_number
            )));
        }

        let far_node = store
            .get_node(&far_node_id)
            .await
            .ok_or_else(|| CoreError::not_found("node", &far_node_id))?;

        let far_port = conn.port_ref(far).cloned();
        let far_termination = match (&far_port, far_node.node_type.has_rack()) {
            (Some(port), true) => Termination::Equipment {
                node_id: far_node_id.clone(),
                equip_id: port.equip_id.clone(),
                port_id: port.port_id.clone(),
            },
            _ => Termination::Node {
                node_id: far_node_id.clone(),
            },
        };

        let conn_before = conn.clone();
        if let Some(f) = conn.fiber_mut(fiber_number) {
            f.set_termination(
                near,
                Some(Termination::Splitter {
                    node_id: node_id.to_string(),
                    splitter_id: splitter_id.to_string(),
                    port: SplitterPin::Output(output_port),
                }),
            );
            f.set_termination(far, Some(far_termination.clone()));
        }
        store.update_connection(conn).await?;

        // Destination rack port picks up a synthetic peer naming the splitter.
        let mut far_before: Option<Node> = None;
        if let (Some(port), Termination::Equipment { .. }) = (&far_port, &far_termination) {
            let mut dest = far_node.clone();
            if let Some(p) = dest
                .equipment_mut(&port.equip_id)
                .and_then(|e| e.port_mut(&port.port_id))
            {
                p.status = PortStatus::Connected;
                p.connected_to = Some(PortPeer {
                    equip_id: "SPLITTER".to_string(),
                    port_id: format!("split-{}-p{}", splitter_id, output_port),
                    equip_name: format!("Splitter {}", node.name),
                });
            }
            if let Err(e) = store.update_node(dest).await {
                undo_connection(store, conn_before).await;
                return Err(e);
            }
            far_before = Some(far_node);
        }

        let updated = {
            let splitter = node
                .splitter_mut(splitter_id)
                .ok_or_else(|| CoreError::not_found("splitter", splitter_id))?;
            if let Some(port) = splitter.output_port_mut(output_port) {
                port.used = true;
                port.connected_to = Some(FiberRef {
                    connection_id: connection_id.to_string(),
                    fiber_number,
                });
            }
            splitter.clone()
        };
        if let Err(e) = store.update_node(node).await {
            undo_connection(store, conn_before).await;
            if let Some(before) = far_before {
                undo_node(store, before).await;
            }
            return Err(e);
        }
        Ok(updated)
    }

    // ---- fiber fusions -----------------------------------------------------

    /// Splice two free strands meeting at this node. Both fibers receive
    /// reciprocal fusion terminations on their side facing the node.
    pub async fn fuse_fibers(
        store: &TopologyStore,
        node_id: &str,
        conn_a: &str,
        fiber_a: u32,
        conn_b: &str,
        fiber_b: u32,
    ) -> Result<(), CoreError> {
        if conn_a == conn_b && fiber_a == fiber_b {
            return Err(CoreError::validation("cannot fuse a fiber to itself"));
        }

        let mut a = get_connection_at(store, conn_a, node_id).await?;
        let end_a = end_at(&a, node_id)?;
        check_fiber_free(&a, end_a, fiber_a)?;

        let term_a = Termination::Fusion {
            node_id: node_id.to_string(),
            connection_id: conn_b.to_string(),
            fiber_number: fiber_b,
        };
        let term_b = Termination::Fusion {
            node_id: node_id.to_string(),
            connection_id: conn_a.to_string(),
            fiber_number: fiber_a,
        };

        if conn_a == conn_b {
            // Loopback splice inside the same cable: one record, one write.
            let end_b = end_a;
            check_fiber_free(&a, end_b, fiber_b)?;
            if let Some(f) = a.fiber_mut(fiber_a) {
                f.set_termination(end_a, Some(term_a));
            }
            if let Some(f) = a.fiber_mut(fiber_b) {
                f.set_termination(end_b, Some(term_b));
            }
            store.update_connection(a).await?;
            return Ok(());
        }

        let mut b = get_connection_at(store, conn_b, node_id).await?;
        let end_b = end_at(&b, node_id)?;
        check_fiber_free(&b, end_b, fiber_b)?;

        let a_before = a.clone();
        if let Some(f) = a.fiber_mut(fiber_a) {
            f.set_termination(end_a, Some(term_a));
        }
        store.update_connection(a).await?;

        if let Some(f) = b.fiber_mut(fiber_b) {
            f.set_termination(end_b, Some(term_b));
        }
        if let Err(e) = store.update_connection(b).await {
            undo_connection(store, a_before).await;
            return Err(e);
        }
        Ok(())
    }

    /// Undo a fusion from either side. The peer strand is located through
    /// the stored reference and cleared too; a one-sided clear would leave a
    /// dangling termination.
    pub async fn break_fusion(
        store: &TopologyStore,
        node_id: &str,
        connection_id: &str,
        fiber_number: u32,
    ) -> Result<(), CoreError> {
        let mut conn = get_connection_at(store, connection_id, node_id).await?;
        let end = end_at(&conn, node_id)?;

        let (peer_conn_id, peer_fiber) = match conn
            .fiber(fiber_number)
            .ok_or_else(|| CoreError::not_found("fiber", fiber_number.to_string()))?
            .termination(end)
        {
            Some(Termination::Fusion {
                connection_id: c,
                fiber_number: n,
                ..
            }) => (c.clone(), *n),
            Some(Termination::Splitter { .. }) => {
                return Err(CoreError::validation(
                    "fiber is consumed by a splitter; delete the splitter to release it",
                ))
            }
            _ => {
                return Err(CoreError::validation(format!(
                    "fiber {} is not fused at this node",
                    fiber_number
                )))
            }
        };

        if peer_conn_id == connection_id {
            if let Some(f) = conn.fiber_mut(fiber_number) {
                f.set_termination(end, None);
            }
            if let Some(f) = conn.fiber_mut(peer_fiber) {
                f.set_termination(end, None);
            }
            store.update_connection(conn).await?;
            return Ok(());
        }

        let conn_before = conn.clone();
        if let Some(f) = conn.fiber_mut(fiber_number) {
            f.set_termination(end, None);
        }
        store.update_connection(conn).await?;

        match store.get_connection(&peer_conn_id).await {
            Some(mut peer) => {
                if let Some(peer_end) = peer.end_at(node_id) {
                    if let Some(f) = peer.fiber_mut(peer_fiber) {
                        f.set_termination(peer_end, None);
                    }
                    if let Err(e) = store.update_connection(peer).await {
                        undo_connection(store, conn_before).await;
                        return Err(e);
                    }
                }
            }
            None => {
                tracing::warn!(
                    connection = %peer_conn_id,
                    fiber = peer_fiber,
                    "fusion peer cable no longer exists; cleared one side only"
                );
            }
        }
        Ok(())
    }

    // ---- ODF panel ---------------------------------------------------------

    /// Splice a strand onto an ODF panel position. Panel state lives in the
    /// equipment's auxiliary portData array; the strand gets an equipment
    /// termination pointing at the derived port id.
    pub async fn connect_odf_port(
        store: &TopologyStore,
        node_id: &str,
        equip_id: &str,
        odf_port: u32,
        connection_id: &str,
        fiber_number: u32,
    ) -> Result<Node, CoreError> {
        let mut node = get_rack_node(store, node_id).await?;

        let mut conn = get_connection_at(store, connection_id, node_id).await?;
        let end = end_at(&conn, node_id)?;
        check_fiber_free(&conn, end, fiber_number)?;

        {
            let equipment = node
                .equipment_mut(equip_id)
                .ok_or_else(|| CoreError::not_found("equipment", equip_id))?;
            if odf_port == 0 || odf_port > equipment.total_ports {
                return Err(CoreError::not_found("odf port", odf_port.to_string()));
            }
            let entry = equipment.odf_port_mut(odf_port);
            if entry.connected {
                return Err(CoreError::validation(format!(
                    "odf port {} is already spliced",
                    odf_port
                )));
            }
            entry.connected = true;
            entry.fiber_connection = Some(FiberRef {
                connection_id: connection_id.to_string(),
                fiber_number,
            });
        }

        let node = store.update_node(node).await?;

        if let Some(f) = conn.fiber_mut(fiber_number) {
            f.set_termination(
                end,
                Some(Termination::Equipment {
                    node_id: node_id.to_string(),
                    equip_id: equip_id.to_string(),
                    port_id: Port::derive_id(equip_id, odf_port),
                }),
            );
        }
        if let Err(e) = store.update_connection(conn).await {
            let mut rollback = node.clone();
            if let Some(eq) = rollback.equipment_mut(equip_id) {
                let entry = eq.odf_port_mut(odf_port);
                entry.connected = false;
                entry.fiber_connection = None;
            }
            undo_node(store, rollback).await;
            return Err(e);
        }
        Ok(node)
    }

    /// Release an ODF panel position and the strand termination behind it.
    pub async fn disconnect_odf_port(
        store: &TopologyStore,
        node_id: &str,
        equip_id: &str,
        odf_port: u32,
    ) -> Result<Node, CoreError> {
        let mut node = get_rack_node(store, node_id).await?;

        let fiber_ref = {
            let equipment = node
                .equipment_mut(equip_id)
                .ok_or_else(|| CoreError::not_found("equipment", equip_id))?;
            let entry = equipment.odf_port_mut(odf_port);
            if !entry.connected {
                return Err(CoreError::validation(format!(
                    "odf port {} is not spliced",
                    odf_port
                )));
            }
            let fiber_ref = entry.fiber_connection.clone();
            entry.connected = false;
            entry.fiber_connection = None;
            fiber_ref
        };

        let node_before = store
            .get_node(node_id)
            .await
            .ok_or_else(|| CoreError::not_found("node", node_id))?;
        let node = store.update_node(node).await?;

        if let Some(fiber_ref) = fiber_ref {
            match store.get_connection(&fiber_ref.connection_id).await {
                Some(mut conn) => {
                    if let Some(end) = conn.end_at(node_id) {
                        let clears = conn
                            .fiber(fiber_ref.fiber_number)
                            .and_then(|f| f.termination(end))
                            .map(|t| matches!(t, Termination::Equipment { equip_id: e, .. } if e == equip_id))
                            .unwrap_or(false);
                        if clears {
                            if let Some(f) = conn.fiber_mut(fiber_ref.fiber_number) {
                                f.set_termination(end, None);
                            }
                            if let Err(e) = store.update_connection(conn).await {
                                undo_node(store, node_before).await;
                                return Err(e);
                            }
                        }
                    }
                }
                None => {
                    tracing::warn!(
                        connection = %fiber_ref.connection_id,
                        "odf splice referenced a cable that no longer exists"
                    );
                }
            }
        }
        Ok(node)
    }

    /// Release an ODF splice starting from the strand instead of the panel.
    /// The panel position is located through its stored fiber reference and
    /// cleared together with the termination.
    pub async fn disconnect_odf_fiber(
        store: &TopologyStore,
        node_id: &str,
        connection_id: &str,
        fiber_number: u32,
    ) -> Result<Node, CoreError> {
        let mut node = get_rack_node(store, node_id).await?;
        let mut conn = get_connection_at(store, connection_id, node_id).await?;
        let end = end_at(&conn, node_id)?;

        let equip_id = match conn
            .fiber(fiber_number)
            .ok_or_else(|| CoreError::not_found("fiber", fiber_number.to_string()))?
            .termination(end)
        {
            Some(Termination::Equipment { equip_id, .. }) => equip_id.clone(),
            _ => {
                return Err(CoreError::validation(format!(
                    "fiber {} is not spliced to an odf at this node",
                    fiber_number
                )))
            }
        };

        match node.equipment_mut(&equip_id) {
            Some(equipment) => {
                if let Some(entry) = equipment.port_data.iter_mut().find(|p| {
                    p.fiber_connection
                        .as_ref()
                        .map(|f| f.connection_id == connection_id && f.fiber_number == fiber_number)
                        .unwrap_or(false)
                }) {
                    entry.connected = false;
                    entry.fiber_connection = None;
                }
            }
            None => {
                tracing::warn!(
                    equipment = %equip_id,
                    "odf termination referenced equipment that no longer exists"
                );
            }
        }

        let node_before = store
            .get_node(node_id)
            .await
            .ok_or_else(|| CoreError::not_found("node", node_id))?;
        let node = store.update_node(node).await?;

        if let Some(f) = conn.fiber_mut(fiber_number) {
            f.set_termination(end, None);
        }
        if let Err(e) = store.update_connection(conn).await {
            undo_node(store, node_before).await;
            return Err(e);
        }
        Ok(node)
    }
}

// ---- helpers ---------------------------------------------------------------

async fn get_rack_node(store: &TopologyStore, node_id: &str) -> Result<Node, CoreError> {
    let node = store
        .get_node(node_id)
        .await
        .ok_or_else(|| CoreError::not_found("node", node_id))?;
    if !node.node_type.has_rack() {
        return Err(CoreError::validation(format!(
            "{} nodes do not hold rack equipment",
            node.node_type
        )));
    }
    Ok(node)
}

async fn get_connection_at(
    store: &TopologyStore,
    connection_id: &str,
    node_id: &str,
) -> Result<Connection, CoreError> {
    let conn = store
        .get_connection(connection_id)
        .await
        .ok_or_else(|| CoreError::not_found("connection", connection_id))?;
    if !conn.touches(node_id) {
        return Err(CoreError::validation(format!(
            "connection {} does not reach node {}",
            connection_id, node_id
        )));
    }
    Ok(conn)
}

fn end_at(conn: &Connection, node_id: &str) -> Result<End, CoreError> {
    conn.end_at(node_id)
        .ok_or_else(|| CoreError::not_found("node", node_id))
}

fn check_fiber_free(conn: &Connection, end: End, fiber_number: u32) -> Result<(), CoreError> {
    let fiber = conn
        .fiber(fiber_number)
        .ok_or_else(|| CoreError::not_found("fiber", fiber_number.to_string()))?;
    if fiber.termination(end).is_some() {
        return Err(CoreError::validation(format!(
            "fiber {} is already terminated at this node",
            fiber_number
        )));
    }
    Ok(())
}

fn find_port<'a>(node: &'a Node, equip_id: &str, port_id: &str) -> Result<&'a Port, CoreError> {
    node.equipment(equip_id)
        .ok_or_else(|| CoreError::not_found("equipment", equip_id))?
        .port(port_id)
        .ok_or_else(|| CoreError::not_found("port", port_id))
}

fn set_port(
    node: &mut Node,
    equip_id: &str,
    port_id: &str,
    status: PortStatus,
    peer: Option<PortPeer>,
) -> Result<(), CoreError> {
    let port = node
        .equipment_mut(equip_id)
        .ok_or_else(|| CoreError::not_found("equipment", equip_id))?
        .port_mut(port_id)
        .ok_or_else(|| CoreError::not_found("port", port_id))?;
    port.status = status;
    port.connected_to = peer;
    Ok(())
}

/// Best-effort undo of an already-persisted record after a later step failed.
/// A rejected undo leaves the documented inconsistency window the integrity
/// pass repairs on next load.
async fn undo_connection(store: &TopologyStore, before: Connection) {
    let id = before.id.clone();
    if let Err(e) = store.update_connection(before).await {
        tracing::warn!(connection = %id, "could not undo partial write: {}", e);
    }
}

async fn undo_node(store: &TopologyStore, before: Node) {
    let id = before.id.clone();
    if let Err(e) = store.update_node(before).await {
        tracing::warn!(node = %id, "could not undo partial write: {}", e);
    }
}
