use serde::{Deserialize, Serialize};

use super::colors;
use super::SplitterPin;

/// Cable construction category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CableType {
    Adss,
    Subterraneo,
    Drop,
    Other(String),
}

impl CableType {
    pub fn as_str(&self) -> &str {
        match self {
            CableType::Adss => "ADSS",
            CableType::Subterraneo => "SUBTERRANEO",
            CableType::Drop => "DROP",
            CableType::Other(s) => s,
        }
    }
}

impl From<String> for CableType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ADSS" => CableType::Adss,
            "SUBTERRANEO" => CableType::Subterraneo,
            "DROP" => CableType::Drop,
            _ => CableType::Other(s),
        }
    }
}

impl From<CableType> for String {
    fn from(t: CableType) -> Self {
        t.as_str().to_string()
    }
}

/// Network section a trunk cable belongs to. Always absent on DROP cables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionType {
    #[serde(rename = "TRONCAL")]
    Troncal,
    #[serde(rename = "SUB_TRONCAL")]
    SubTroncal,
    #[serde(rename = "TRAMO")]
    Tramo,
}

/// Reference to one strand of one cable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiberRef {
    pub connection_id: String,
    pub fiber_number: u32,
}

/// Reference to an equipment port on a rack endpoint of a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRef {
    pub equip_id: String,
    pub port_id: String,
}

/// What a fiber strand's endpoint is physically spliced to at a node.
/// Exactly one shape or nothing; untagged on the wire so legacy records
/// (shape detected by field presence) still decode. The generic `Node`
/// variant matches older documents where `equipId`/`portId` were null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Termination {
    #[serde(rename_all = "camelCase")]
    Splitter {
        node_id: String,
        splitter_id: String,
        port: SplitterPin,
    },
    #[serde(rename_all = "camelCase")]
    Equipment {
        node_id: String,
        equip_id: String,
        port_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Fusion {
        node_id: String,
        connection_id: String,
        fiber_number: u32,
    },
    #[serde(rename_all = "camelCase")]
    Node { node_id: String },
}

/// One strand within a cable. `used` is a deprecated field from older
/// records; it is deserialized so the integrity pass can detect it, and
/// never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fiber {
    pub number: u32,
    pub color: String,
    pub color_hex: String,
    #[serde(default)]
    pub from_termination: Option<Termination>,
    #[serde(default)]
    pub to_termination: Option<Termination>,
    #[serde(default, skip_serializing)]
    pub used: Option<bool>,
}

impl Fiber {
    pub fn termination(&self, end: End) -> Option<&Termination> {
        match end {
            End::From => self.from_termination.as_ref(),
            End::To => self.to_termination.as_ref(),
        }
    }

    pub fn set_termination(&mut self, end: End, value: Option<Termination>) {
        match end {
            End::From => self.from_termination = value,
            End::To => self.to_termination = value,
        }
    }

    /// Display hex, recomputed from the color name when the cached value is
    /// missing (records written before the hex cache existed).
    pub fn display_hex(&self) -> &str {
        if self.color_hex.is_empty() {
            colors::hex_for_name(&self.color)
        } else {
            &self.color_hex
        }
    }
}

/// Which endpoint of a connection a node sits at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    From,
    To,
}

impl End {
    pub fn opposite(self) -> End {
        match self {
            End::From => End::To,
            End::To => End::From,
        }
    }
}

/// Connection is a physical cable between two nodes. `from`/`to` are
/// directional for downstream traversal, physically symmetric otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub from: String,
    pub to: String,
    /// Polyline including both endpoints and intermediate waypoints
    pub path: Vec<[f64; 2]>,
    pub cable_type: CableType,
    #[serde(default)]
    pub section_type: Option<SectionType>,
    pub fibers: u32,
    #[serde(default)]
    pub from_port: Option<PortRef>,
    #[serde(default)]
    pub to_port: Option<PortRef>,
    #[serde(default)]
    pub reported: bool,
    pub fiber_details: Vec<Fiber>,
}

impl Connection {
    /// Strand array sized to `count`, colored by the TIA-598 catalog.
    pub fn init_fiber_details(count: u32) -> Vec<Fiber> {
        (1..=count)
            .map(|n| {
                let (name, hex) = colors::for_number(n);
                Fiber {
                    number: n,
                    color: name.to_string(),
                    color_hex: hex.to_string(),
                    from_termination: None,
                    to_termination: None,
                    used: None,
                }
            })
            .collect()
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.from == node_id || self.to == node_id
    }

    pub fn end_at(&self, node_id: &str) -> Option<End> {
        if self.from == node_id {
            Some(End::From)
        } else if self.to == node_id {
            Some(End::To)
        } else {
            None
        }
    }

    pub fn other_end(&self, node_id: &str) -> Option<&str> {
        if self.from == node_id {
            Some(&self.to)
        } else if self.to == node_id {
            Some(&self.from)
        } else {
            None
        }
    }

    pub fn fiber(&self, number: u32) -> Option<&Fiber> {
        self.fiber_details.iter().find(|f| f.number == number)
    }

    pub fn fiber_mut(&mut self, number: u32) -> Option<&mut Fiber> {
        self.fiber_details.iter_mut().find(|f| f.number == number)
    }

    /// Port reference on the given end, if that endpoint is a rack
    pub fn port_ref(&self, end: End) -> Option<&PortRef> {
        match end {
            End::From => self.from_port.as_ref(),
            End::To => self.to_port.as_ref(),
        }
    }
}

/// CreateConnectionRequest for tracing a new cable between two nodes
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConnectionRequest {
    pub from: String,
    pub to: String,
    pub path: Vec<[f64; 2]>,
    pub cable_type: CableType,
    #[serde(default)]
    pub section_type: Option<SectionType>,
    pub fibers: u32,
    #[serde(default)]
    pub from_port: Option<PortRef>,
    #[serde(default)]
    pub to_port: Option<PortRef>,
}
