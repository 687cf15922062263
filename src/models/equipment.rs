use serde::{Deserialize, Serialize};

use super::FiberRef;

/// Active or passive rack equipment category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EquipmentType {
    Olt,
    Odf,
    Switch,
    Router,
    Server,
    Other(String),
}

impl EquipmentType {
    pub fn as_str(&self) -> &str {
        match self {
            EquipmentType::Olt => "OLT",
            EquipmentType::Odf => "ODF",
            EquipmentType::Switch => "SWITCH",
            EquipmentType::Router => "ROUTER",
            EquipmentType::Server => "SERVER",
            EquipmentType::Other(s) => s,
        }
    }
}

impl From<String> for EquipmentType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "OLT" => EquipmentType::Olt,
            "ODF" => EquipmentType::Odf,
            "SWITCH" => EquipmentType::Switch,
            "ROUTER" => EquipmentType::Router,
            "SERVER" => EquipmentType::Server,
            _ => EquipmentType::Other(s),
        }
    }
}

impl From<EquipmentType> for String {
    fn from(t: EquipmentType) -> Self {
        t.as_str().to_string()
    }
}

/// Port occupancy state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortStatus {
    Free,
    Connected,
}

/// Back-reference from a connected port to its patch partner. For ports fed
/// by a splitter output the reference is synthetic (`equip_id == "SPLITTER"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortPeer {
    pub equip_id: String,
    pub port_id: String,
    #[serde(default)]
    pub equip_name: String,
}

/// One physical port on a piece of equipment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub id: String,
    pub number: u32,
    pub status: PortStatus,
    #[serde(default)]
    pub connected_to: Option<PortPeer>,
    #[serde(default)]
    pub reported: bool,
}

impl Port {
    /// Deterministic port id, e.g. `"eq-42-p3"`.
    pub fn derive_id(equip_id: &str, number: u32) -> String {
        format!("{}-p{}", equip_id, number)
    }
}

/// Strand fusion bookkeeping for one ODF panel position. Kept in a separate
/// array from `ports` because panel positions are passive splice points, not
/// patchable active ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OdfPort {
    pub id: u32,
    pub connected: bool,
    #[serde(default)]
    pub fiber_connection: Option<FiberRef>,
}

/// Equipment belongs to exactly one node's rack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub equipment_type: EquipmentType,
    pub total_ports: u32,
    /// Marks an upstream internet gateway; meaningful only for ROUTER.
    #[serde(default)]
    pub is_provider: bool,
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub port_data: Vec<OdfPort>,
}

impl Equipment {
    /// Build equipment with its port array sized to `total_ports`.
    pub fn new(id: String, name: String, equipment_type: EquipmentType, total_ports: u32, is_provider: bool) -> Self {
        let ports = (1..=total_ports)
            .map(|n| Port {
                id: Port::derive_id(&id, n),
                number: n,
                status: PortStatus::Free,
                connected_to: None,
                reported: false,
            })
            .collect();
        Self {
            id,
            name,
            equipment_type,
            total_ports,
            is_provider,
            ports,
            port_data: Vec::new(),
        }
    }

    pub fn port(&self, port_id: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.id == port_id)
    }

    pub fn port_mut(&mut self, port_id: &str) -> Option<&mut Port> {
        self.ports.iter_mut().find(|p| p.id == port_id)
    }

    /// ODF panel position, created lazily on first use.
    pub fn odf_port_mut(&mut self, number: u32) -> &mut OdfPort {
        let idx = match self.port_data.iter().position(|p| p.id == number) {
            Some(idx) => idx,
            None => {
                self.port_data.push(OdfPort {
                    id: number,
                    connected: false,
                    fiber_connection: None,
                });
                self.port_data.len() - 1
            }
        };
        &mut self.port_data[idx]
    }
}

/// CreateEquipmentRequest for adding equipment to a node's rack
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEquipmentRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub equipment_type: EquipmentType,
    pub total_ports: u32,
    #[serde(default)]
    pub is_provider: bool,
}
