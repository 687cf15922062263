use serde::{Deserialize, Serialize};

use super::{DamageReport, Equipment, Splitter};

/// Physical node category. Unknown categories from older or external data
/// are preserved as `Other` rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeType {
    Olt,
    Nap,
    Mufla,
    Odf,
    Onu,
    Rack,
    Other(String),
}

impl NodeType {
    pub fn as_str(&self) -> &str {
        match self {
            NodeType::Olt => "OLT",
            NodeType::Nap => "NAP",
            NodeType::Mufla => "MUFLA",
            NodeType::Odf => "ODF",
            NodeType::Onu => "ONU",
            NodeType::Rack => "RACK",
            NodeType::Other(s) => s,
        }
    }

    /// Node hosts equipment in a rack (selectable ports, ODF fusion panel).
    pub fn has_rack(&self) -> bool {
        matches!(self, NodeType::Rack | NodeType::Odf)
    }

    /// Node hosts passive optical splitters.
    pub fn has_splitters(&self) -> bool {
        matches!(self, NodeType::Mufla | NodeType::Nap)
    }

    /// Node carries customer subscription data.
    pub fn has_client_data(&self) -> bool {
        matches!(self, NodeType::Onu)
    }
}

impl From<String> for NodeType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "OLT" => NodeType::Olt,
            "NAP" => NodeType::Nap,
            "MUFLA" => NodeType::Mufla,
            "ODF" => NodeType::Odf,
            "ONU" => NodeType::Onu,
            "RACK" => NodeType::Rack,
            _ => NodeType::Other(s),
        }
    }
}

impl From<NodeType> for String {
    fn from(t: NodeType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Customer data attached to an ONU node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientData {
    pub address: String,
    pub plan: String,
}

/// Node represents a physical location or device in the plant: splice
/// closure, splitter box, rack, termination point, or customer premises.
/// Owned by the TopologyStore; mutated only through store update calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub name: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub rack: Vec<Equipment>,
    #[serde(default)]
    pub splitters: Vec<Splitter>,
    #[serde(default)]
    pub client_data: Option<ClientData>,
    #[serde(default)]
    pub damage_reports: Vec<DamageReport>,
}

impl Node {
    pub fn equipment(&self, equip_id: &str) -> Option<&Equipment> {
        self.rack.iter().find(|e| e.id == equip_id)
    }

    pub fn equipment_mut(&mut self, equip_id: &str) -> Option<&mut Equipment> {
        self.rack.iter_mut().find(|e| e.id == equip_id)
    }

    pub fn splitter(&self, splitter_id: &str) -> Option<&Splitter> {
        self.splitters.iter().find(|s| s.id == splitter_id)
    }

    pub fn splitter_mut(&mut self, splitter_id: &str) -> Option<&mut Splitter> {
        self.splitters.iter_mut().find(|s| s.id == splitter_id)
    }

    /// True if any damage report on this node is still unresolved.
    pub fn has_unresolved_damage(&self) -> bool {
        self.damage_reports.iter().any(|r| !r.resolved)
    }
}

/// CreateNodeRequest for placing a new node
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeRequest {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub name: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub client_data: Option<ClientData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_type_roundtrip() {
        let t: NodeType = "MUFLA".to_string().into();
        assert_eq!(t, NodeType::Mufla);
        assert_eq!(String::from(t), "MUFLA");

        let other: NodeType = "POSTE".to_string().into();
        assert_eq!(other, NodeType::Other("POSTE".to_string()));
        assert_eq!(other.as_str(), "POSTE");
    }

    #[test]
    fn test_capabilities() {
        assert!(NodeType::Rack.has_rack());
        assert!(NodeType::Odf.has_rack());
        assert!(!NodeType::Onu.has_rack());

        assert!(NodeType::Mufla.has_splitters());
        assert!(NodeType::Nap.has_splitters());
        assert!(!NodeType::Rack.has_splitters());

        assert!(NodeType::Onu.has_client_data());
        assert!(!NodeType::Olt.has_client_data());
    }
}
