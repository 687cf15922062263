use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::FiberRef;

/// Splitter split ratio; fixes the output port count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitterType {
    #[serde(rename = "1x8")]
    OneByEight,
    #[serde(rename = "1x16")]
    OneBySixteen,
}

impl SplitterType {
    pub fn output_count(self) -> u32 {
        match self {
            SplitterType::OneByEight => 8,
            SplitterType::OneBySixteen => 16,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SplitterType::OneByEight => "1x8",
            SplitterType::OneBySixteen => "1x16",
        }
    }
}

/// Which pin of a splitter a fiber terminates on: the single input, or a
/// numbered output port. Persisted as the string `"input"` or a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitterPin {
    Input,
    Output(u32),
}

impl Serialize for SplitterPin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SplitterPin::Input => serializer.serialize_str("input"),
            SplitterPin::Output(n) => serializer.serialize_u32(*n),
        }
    }
}

impl<'de> Deserialize<'de> for SplitterPin {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PinVisitor;

        impl<'de> Visitor<'de> for PinVisitor {
            type Value = SplitterPin;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("the string \"input\" or an output port number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<SplitterPin, E> {
                if v == "input" {
                    Ok(SplitterPin::Input)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(v), &self))
                }
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<SplitterPin, E> {
                u32::try_from(v)
                    .map(SplitterPin::Output)
                    .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<SplitterPin, E> {
                u32::try_from(v)
                    .map(SplitterPin::Output)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
            }
        }

        deserializer.deserialize_any(PinVisitor)
    }
}

/// The single upstream strand feeding a splitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitterInput {
    pub connection_id: String,
    pub fiber_number: u32,
    pub color: String,
}

/// One output port of a splitter. The port's own color follows the same
/// 12-color cycle as fiber numbers, independent of the strand it feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitterPort {
    pub port_number: u32,
    pub used: bool,
    #[serde(default)]
    pub connected_to: Option<FiberRef>,
}

/// Passive optical splitter hosted inside a MUFLA/NAP node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Splitter {
    pub id: String,
    #[serde(rename = "type")]
    pub splitter_type: SplitterType,
    pub input_fiber: SplitterInput,
    pub output_ports: Vec<SplitterPort>,
}

impl Splitter {
    pub fn new(id: String, splitter_type: SplitterType, input_fiber: SplitterInput) -> Self {
        let output_ports = (1..=splitter_type.output_count())
            .map(|n| SplitterPort {
                port_number: n,
                used: false,
                connected_to: None,
            })
            .collect();
        Self {
            id,
            splitter_type,
            input_fiber,
            output_ports,
        }
    }

    pub fn output_port_mut(&mut self, number: u32) -> Option<&mut SplitterPort> {
        self.output_ports.iter_mut().find(|p| p.port_number == number)
    }
}

/// CreateSplitterRequest for provisioning a splitter fed by a chosen strand
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSplitterRequest {
    #[serde(rename = "type")]
    pub splitter_type: SplitterType,
    pub connection_id: String,
    pub fiber_number: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_port_counts() {
        let s = Splitter::new(
            "s1".to_string(),
            SplitterType::OneByEight,
            SplitterInput {
                connection_id: "c1".to_string(),
                fiber_number: 3,
                color: "Verde".to_string(),
            },
        );
        assert_eq!(s.output_ports.len(), 8);
        assert_eq!(s.output_ports[0].port_number, 1);
        assert!(s.output_ports.iter().all(|p| !p.used));

        assert_eq!(SplitterType::OneBySixteen.output_count(), 16);
    }

    #[test]
    fn test_splitter_pin_wire_format() {
        assert_eq!(serde_json::to_string(&SplitterPin::Input).unwrap(), "\"input\"");
        assert_eq!(serde_json::to_string(&SplitterPin::Output(5)).unwrap(), "5");

        let input: SplitterPin = serde_json::from_str("\"input\"").unwrap();
        assert_eq!(input, SplitterPin::Input);
        let out: SplitterPin = serde_json::from_str("7").unwrap();
        assert_eq!(out, SplitterPin::Output(7));
        assert!(serde_json::from_str::<SplitterPin>("\"output\"").is_err());
    }

    #[test]
    fn test_splitter_type_wire_format() {
        assert_eq!(serde_json::to_string(&SplitterType::OneByEight).unwrap(), "\"1x8\"");
        let t: SplitterType = serde_json::from_str("\"1x16\"").unwrap();
        assert_eq!(t, SplitterType::OneBySixteen);
    }
}
