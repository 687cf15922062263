use std::collections::HashSet;

use crate::models::{Connection, Node, Termination};

/// Load-time integrity pass over persisted records. Repairs are logged as
/// warnings and applied in place; only the ids of changed connections are
/// returned so callers re-persist exactly those. Running it twice on the same
/// dataset yields no changes the second time.
///
/// Three repairs:
/// 1. strip the deprecated `used` flag from fiber records,
/// 2. null out terminations referencing a splitter that no longer exists on
///    the named node,
/// 3. backfill the hex color cache on strands written before it existed.
pub fn run(nodes: &[Node], connections: &mut [Connection]) -> Vec<String> {
    let mut changed: HashSet<String> = HashSet::new();

    for conn in connections.iter_mut() {
        for fiber in conn.fiber_details.iter_mut() {
            if fiber.used.take().is_some() {
                tracing::warn!(
                    connection = %conn.id,
                    fiber = fiber.number,
                    "stripping deprecated 'used' flag"
                );
                changed.insert(conn.id.clone());
            }

            if fiber.color_hex.is_empty() {
                let hex = fiber.display_hex().to_string();
                tracing::warn!(
                    connection = %conn.id,
                    fiber = fiber.number,
                    color = %fiber.color,
                    "backfilling missing color hex"
                );
                fiber.color_hex = hex;
                changed.insert(conn.id.clone());
            }

            if let Some(term) = fiber.from_termination.as_ref() {
                if is_orphaned_splitter(term, nodes) {
                    tracing::warn!(
                        connection = %conn.id,
                        fiber = fiber.number,
                        "clearing fromTermination: referenced splitter no longer exists"
                    );
                    fiber.from_termination = None;
                    changed.insert(conn.id.clone());
                }
            }
            if let Some(term) = fiber.to_termination.as_ref() {
                if is_orphaned_splitter(term, nodes) {
                    tracing::warn!(
                        connection = %conn.id,
                        fiber = fiber.number,
                        "clearing toTermination: referenced splitter no longer exists"
                    );
                    fiber.to_termination = None;
                    changed.insert(conn.id.clone());
                }
            }
        }
    }

    let mut ids: Vec<String> = changed.into_iter().collect();
    ids.sort();
    ids
}

fn is_orphaned_splitter(term: &Termination, nodes: &[Node]) -> bool {
    match term {
        Termination::Splitter {
            node_id,
            splitter_id,
            ..
        } => !nodes
            .iter()
            .any(|n| n.id == *node_id && n.splitter(splitter_id).is_some()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CableType, NodeType, SectionType, Splitter, SplitterInput, SplitterPin, SplitterType,
    };

    fn mufla(id: &str, splitters: Vec<Splitter>) -> Node {
        Node {
            id: id.to_string(),
            node_type: NodeType::Mufla,
            name: id.to_string(),
            lat: None,
            lng: None,
            rack: Vec::new(),
            splitters,
            client_data: None,
            damage_reports: Vec::new(),
        }
    }

    fn splitter(id: &str) -> Splitter {
        Splitter::new(
            id.to_string(),
            SplitterType::OneByEight,
            SplitterInput {
                connection_id: "c1".to_string(),
                fiber_number: 1,
                color: "Azul".to_string(),
            },
        )
    }

    fn connection(id: &str, fibers: u32) -> Connection {
        Connection {
            id: id.to_string(),
            from: "m1".to_string(),
            to: "x".to_string(),
            path: Vec::new(),
            cable_type: CableType::Adss,
            section_type: Some(SectionType::Tramo),
            fibers,
            from_port: None,
            to_port: None,
            reported: false,
            fiber_details: Connection::init_fiber_details(fibers),
        }
    }

    fn splitter_term(node: &str, splitter: &str) -> Termination {
        Termination::Splitter {
            node_id: node.to_string(),
            splitter_id: splitter.to_string(),
            port: SplitterPin::Input,
        }
    }

    #[test]
    fn test_clean_dataset_is_a_noop() {
        let nodes = vec![mufla("m1", vec![splitter("s1")])];
        let mut conns = vec![connection("c1", 4)];
        conns[0].fiber_details[0].from_termination = Some(splitter_term("m1", "s1"));

        let changed = run(&nodes, &mut conns);
        assert!(changed.is_empty());
        assert!(conns[0].fiber_details[0].from_termination.is_some());
    }

    #[test]
    fn test_orphaned_splitter_termination_is_cleared() {
        let nodes = vec![mufla("m1", Vec::new())];
        let mut conns = vec![connection("c1", 4), connection("c2", 4)];
        conns[0].fiber_details[0].from_termination = Some(splitter_term("m1", "gone"));
        conns[1].fiber_details[2].to_termination = Some(Termination::Node {
            node_id: "m1".to_string(),
        });

        let changed = run(&nodes, &mut conns);
        assert_eq!(changed, vec!["c1".to_string()]);
        assert!(conns[0].fiber_details[0].from_termination.is_none());
        // Non-splitter terminations are untouched
        assert!(conns[1].fiber_details[2].to_termination.is_some());
    }

    #[test]
    fn test_deprecated_used_flag_is_stripped() {
        let nodes = vec![mufla("m1", Vec::new())];
        let mut conns = vec![connection("c1", 2)];
        conns[0].fiber_details[1].used = Some(false);

        let changed = run(&nodes, &mut conns);
        assert_eq!(changed, vec!["c1".to_string()]);
        assert!(conns[0].fiber_details[1].used.is_none());
    }

    #[test]
    fn test_missing_color_hex_is_backfilled() {
        let nodes = vec![mufla("m1", Vec::new())];
        let mut conns = vec![connection("c1", 4)];
        conns[0].fiber_details[3].color = "Marrón".to_string();
        conns[0].fiber_details[3].color_hex = String::new();

        let changed = run(&nodes, &mut conns);
        assert_eq!(changed, vec!["c1".to_string()]);
        // Legacy alias resolves through the catalog fallback
        assert_eq!(conns[0].fiber_details[3].color_hex, "#8B4513");

        assert!(run(&nodes, &mut conns).is_empty());
    }

    #[test]
    fn test_idempotent() {
        let nodes = vec![mufla("m1", Vec::new())];
        let mut conns = vec![connection("c1", 4)];
        conns[0].fiber_details[0].used = Some(true);
        conns[0].fiber_details[1].from_termination = Some(splitter_term("m1", "gone"));

        let first = run(&nodes, &mut conns);
        assert_eq!(first.len(), 1);
        let second = run(&nodes, &mut conns);
        assert!(second.is_empty());
    }
}
