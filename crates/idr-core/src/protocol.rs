//! Wire protocol between the client and the layout server.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`:
//!
//! ```json
//! { "event": "request_initial_data" }
//! { "event": "initial_data", "data": [{ "id": "a", "x": 0.1, "y": 2.0, "label": 0 }] }
//! { "event": "inform_client_move", "data": { "id": "a", "x": 3.0, "y": 1.0 } }
//! { "event": "client_move_ok", "data": { "id": "a", "x": 3.0, "y": 1.0, "random_color": "#1A2B3C" } }
//! ```
//!
//! Inbound point records are decoded leniently: a bad field never rejects
//! the whole snapshot.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::point::PointId;

/// Messages sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask for the full point list.
    RequestInitialData,
    /// Report a committed move with the final absolute coordinates.
    InformClientMove(MoveReport),
}

/// Messages received from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Greeting sent right after the socket opens.
    Hello(Value),
    /// Full snapshot, in display order.
    InitialData(#[serde(deserialize_with = "lenient_records")] Vec<PointRecord>),
    /// Acknowledgment of a move report. Informational only.
    ClientMoveOk(Value),
    /// Server-side error report.
    Error { message: String },
}

/// Payload of `inform_client_move`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveReport {
    pub id: PointId,
    pub x: f64,
    pub y: f64,
}

/// One point of an `initial_data` snapshot.
///
/// Accepts both `{id, x, y, label}` and the older `{title, value, y, label}`
/// shape. Missing or unreadable numbers decode as `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPointRecord")]
pub struct PointRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

/// Wire shape of a record. `title` and `value` are fallbacks for `id` and
/// `x`, used only when those are absent.
#[derive(Deserialize)]
struct RawPointRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    x: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    y: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    label: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    color: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    radius: Option<f64>,
}

impl From<RawPointRecord> for PointRecord {
    fn from(raw: RawPointRecord) -> Self {
        Self {
            id: raw
                .id
                .filter(|id| !id.is_empty())
                .or(raw.title.filter(|t| !t.is_empty())),
            x: raw.x.or(raw.value).unwrap_or(0.0),
            y: raw.y.unwrap_or(0.0),
            label: raw.label,
            color: raw.color,
            radius: raw.radius,
        }
    }
}

impl PointRecord {
    /// Record with an id and a position.
    pub fn new(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: Some(id.into()),
            x,
            y,
            ..Default::default()
        }
    }

    /// Builder-style label setter.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

// Bounds of the floats that convert to `i64` without saturating.
const I64_MIN: f64 = i64::MIN as f64;
const I64_MAX: f64 = i64::MAX as f64;

fn value_as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => match n.as_f64() {
            // Class labels often arrive as floats (`0.0`); keep them readable.
            Some(f) if n.is_f64() && f.fract() == 0.0 && (I64_MIN..I64_MAX).contains(&f) => {
                Some(format!("{}", f as i64))
            }
            _ => Some(n.to_string()),
        },
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_f64(&value))
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_text(&value))
}

fn lenient_records<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<PointRecord>, D::Error> {
    let values = match Value::deserialize(deserializer)? {
        Value::Array(values) => values,
        Value::Null => Vec::new(),
        other => {
            log::warn!("initial_data payload is not a list: {}", other);
            Vec::new()
        }
    };

    Ok(values
        .into_iter()
        .map(|value| {
            serde_json::from_value::<PointRecord>(value).unwrap_or_else(|e| {
                log::warn!("Unreadable point record, using defaults: {}", e);
                PointRecord::default()
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_initial_data_serialize() {
        let json = serde_json::to_string(&ClientMessage::RequestInitialData).unwrap();
        assert_eq!(json, r#"{"event":"request_initial_data"}"#);
    }

    #[test]
    fn test_inform_client_move_serialize() {
        let msg = ClientMessage::InformClientMove(MoveReport {
            id: "a".to_string(),
            x: 2.0,
            y: -1.0,
        });
        let value: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["event"], "inform_client_move");
        assert_eq!(value["data"]["id"], "a");
        assert_eq!(value["data"]["x"], 2.0);
        assert_eq!(value["data"]["y"], -1.0);
    }

    #[test]
    fn test_initial_data_deserialize() {
        let json = r#"{"event":"initial_data","data":[
            {"id":"a","x":0,"y":0,"label":1},
            {"title":"b","value":1.5,"y":"2.5","label":0.0}
        ]}"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        match msg {
            ServerMessage::InitialData(records) => {
                assert_eq!(records.len(), 2);
                assert_eq!(records[0].id.as_deref(), Some("a"));
                assert_eq!(records[0].label.as_deref(), Some("1"));
                assert_eq!(records[1].id.as_deref(), Some("b"));
                assert_eq!(records[1].x, 1.5);
                assert_eq!(records[1].y, 2.5);
                assert_eq!(records[1].label.as_deref(), Some("0"));
            }
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_records_are_tolerated() {
        let json = r#"{"event":"initial_data","data":[
            {"x":null,"y":"abc"},
            42,
            {"id":7,"x":1,"y":2}
        ]}"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        let ServerMessage::InitialData(records) = msg else {
            panic!("Wrong message type");
        };
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], PointRecord::default());
        assert_eq!(records[1], PointRecord::default());
        assert_eq!(records[2].id.as_deref(), Some("7"));
        assert_eq!((records[2].x, records[2].y), (1.0, 2.0));
    }

    #[test]
    fn test_ack_payload_is_opaque() {
        let json = r##"{"event":"client_move_ok","data":{"id":"a","random_color":"#00FF00"}}"##;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        match msg {
            ServerMessage::ClientMoveOk(payload) => assert_eq!(payload["id"], "a"),
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let json = r#"{"event":"reticulate_splines","data":{}}"#;
        assert!(serde_json::from_str::<ServerMessage>(json).is_err());
    }

    fn records(json: &str) -> Vec<PointRecord> {
        match serde_json::from_str::<ServerMessage>(json).unwrap() {
            ServerMessage::InitialData(records) => records,
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_id_wins_over_title() {
        let records = records(
            r#"{"event":"initial_data","data":[
                {"id":"a","title":"Alpha","x":3,"value":9,"y":4,"label":2},
                {"id":"","title":"b","value":1,"y":1}
            ]}"#,
        );
        assert_eq!(records[0].id.as_deref(), Some("a"));
        assert_eq!((records[0].x, records[0].y), (3.0, 4.0));
        assert_eq!(records[0].label.as_deref(), Some("2"));
        assert_eq!(records[1].id.as_deref(), Some("b"));
        assert_eq!(records[1].x, 1.0);
    }

    #[test]
    fn test_huge_float_label_is_not_clamped() {
        let records = records(
            r#"{"event":"initial_data","data":[
                {"id":"a","label":1e20},
                {"id":"b","label":-3.0}
            ]}"#,
        );
        let label = records[0].label.as_deref().unwrap();
        assert_ne!(label, i64::MAX.to_string());
        assert_eq!(label.parse::<f64>().unwrap(), 1e20);
        assert_eq!(records[1].label.as_deref(), Some("-3"));
    }
}
