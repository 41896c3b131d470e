//! Recognizes the lines printed by the ESP32 base station.
//!
//! Only `RADON_JSON {...}` lines carry data. Everything else the firmware
//! prints (pulse diagnostics, heartbeats, handshake banners) is log-only.

use serde_json::{Map, Value};
use thiserror::Error;

pub const DATA_TAG: &str = "RADON_JSON";
pub const HANDSHAKE_TAG: &str = "HANDSHAKE";

/// One of the two measurement nodes behind the base station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    One,
    Two,
}

impl Node {
    pub const ALL: [Node; 2] = [Node::One, Node::Two];

    /// Identifier the firmware uses in handshake lines.
    pub fn wire_id(self) -> &'static str {
        match self {
            Node::One => "Nodo_1",
            Node::Two => "Nodo_2",
        }
    }

    /// JSON field holding this node's activity.
    pub fn field(self) -> &'static str {
        match self {
            Node::One => "radon_activity_nodo1",
            Node::Two => "radon_activity_nodo2",
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Node::One => 1,
            Node::Two => 2,
        }
    }
}

/// Activities decoded from a data frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub node1: f64,
    pub node2: f64,
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("invalid JSON payload in {raw:?}: {source}")]
    InvalidJson {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("field {field} is not numeric ({value}) in {raw:?}")]
    NonNumeric {
        field: &'static str,
        value: String,
        raw: String,
    },
}

/// Decode a data frame.
///
/// Returns `Ok(None)` for lines that are not data frames, including tagged
/// lines without a `{`. Missing fields default to `0.0`; numbers and numeric
/// strings are accepted, anything else is a [`FrameError::NonNumeric`].
pub fn parse_line(raw: &str) -> Result<Option<Reading>, FrameError> {
    if !raw.contains(DATA_TAG) {
        return Ok(None);
    }
    let Some(start) = raw.find('{') else {
        return Ok(None);
    };

    let payload: Map<String, Value> =
        serde_json::from_str(&raw[start..]).map_err(|source| FrameError::InvalidJson {
            raw: raw.to_string(),
            source,
        })?;

    Ok(Some(Reading {
        node1: activity(&payload, Node::One, raw)?,
        node2: activity(&payload, Node::Two, raw)?,
    }))
}

fn activity(payload: &Map<String, Value>, node: Node, raw: &str) -> Result<f64, FrameError> {
    let field = node.field();
    let value = match payload.get(field) {
        None => return Ok(0.0),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match value {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(FrameError::NonNumeric {
            field,
            value: payload.get(field).map(Value::to_string).unwrap_or_default(),
            raw: raw.to_string(),
        }),
    }
}

/// Nodes announced as connected by a handshake line.
pub fn handshake_nodes(raw: &str) -> Vec<Node> {
    if !raw.contains(HANDSHAKE_TAG) {
        return Vec::new();
    }
    Node::ALL
        .into_iter()
        .filter(|node| raw.contains(node.wire_id()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_lines_are_not_frames() {
        assert!(parse_line("Pulso RADON valido. Total = 12").unwrap().is_none());
        assert!(parse_line(r#"{"radon_activity_nodo1": 3.0}"#).unwrap().is_none());
    }

    #[test]
    fn tag_without_payload_is_skipped() {
        assert!(parse_line("RADON_JSON").unwrap().is_none());
    }

    #[test]
    fn firmware_frame_decodes_both_nodes() {
        let line = r#"RADON_JSON {"radon_activity_nodo1":12.345,"radon_activity_nodo2":6.789}"#;
        let reading = parse_line(line).unwrap().unwrap();
        assert_eq!(reading, Reading { node1: 12.345, node2: 6.789 });
    }

    #[test]
    fn missing_field_defaults_to_zero() {
        let reading = parse_line(r#"RADON_JSON {"radon_activity_nodo1": 12.5}"#)
            .unwrap()
            .unwrap();
        assert_eq!(reading, Reading { node1: 12.5, node2: 0.0 });
    }

    #[test]
    fn numeric_strings_and_integers_are_coerced() {
        let reading =
            parse_line(r#"RADON_JSON {"radon_activity_nodo1": "4.5", "radon_activity_nodo2": 7}"#)
                .unwrap()
                .unwrap();
        assert_eq!(reading, Reading { node1: 4.5, node2: 7.0 });
    }

    #[test]
    fn broken_json_is_rejected() {
        let err = parse_line(r#"RADON_JSON {"radon_activity_nodo1": 1.0"#).unwrap_err();
        assert!(matches!(err, FrameError::InvalidJson { .. }));
    }

    #[test]
    fn non_numeric_field_is_rejected() {
        for payload in [r#""abc""#, "null", "true", "[1]"] {
            let line = format!(r#"RADON_JSON {{"radon_activity_nodo2": {payload}}}"#);
            match parse_line(&line) {
                Err(FrameError::NonNumeric { field, .. }) => {
                    assert_eq!(field, "radon_activity_nodo2")
                }
                other => panic!("expected NonNumeric for {payload}, got {other:?}"),
            }
        }
    }

    #[test]
    fn handshake_detection_is_independent_of_data_tag() {
        assert_eq!(handshake_nodes("[HANDSHAKE] Conectado: Nodo_1"), vec![Node::One]);
        assert_eq!(handshake_nodes(" [HANDSHAKE] Mensaje de conexión desde Nodo_2"), vec![Node::Two]);
        assert!(handshake_nodes("Nodo_1;HELLO").is_empty());
        assert!(handshake_nodes("[HANDSHAKE] Conectado: Nodo_3").is_empty());
    }
}
