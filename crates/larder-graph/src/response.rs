//! Response envelope and GraphSON element decoding.

use serde::Deserialize;
use serde_json::Value;

use larder_core::{Edge, Element, ElementId, Path, Properties, PropertyValue, Vertex};

use crate::client::GraphError;

/// Status code signalling success.
pub const STATUS_SUCCESS: u16 = 200;

/// Status code the server uses for a script that failed to evaluate.
pub const STATUS_SCRIPT_EVALUATION_ERROR: u16 = 597;

/// `{ status: { code, message }, result: { data } }`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Envelope {
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub result: ResultSet,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Status {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ResultSet {
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn ok(rows: Vec<Value>) -> Self {
        Self {
            status: Status {
                code: STATUS_SUCCESS,
                message: String::new(),
            },
            result: ResultSet {
                data: Value::Array(rows),
            },
        }
    }

    pub fn failure(code: u16, message: impl Into<String>) -> Self {
        Self {
            status: Status {
                code,
                message: message.into(),
            },
            result: ResultSet::default(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.code == STATUS_SUCCESS
    }

    /// Result rows; absent or null `data` is an empty result.
    pub fn into_rows(self) -> Vec<Value> {
        match untyped(&self.result.data) {
            Value::Null => Vec::new(),
            Value::Array(rows) => rows.clone(),
            other => vec![other.clone()],
        }
    }
}

static NULL: Value = Value::Null;

/// Strip GraphSON 2/3 `{"@type": .., "@value": ..}` wrappers.
pub fn untyped(value: &Value) -> &Value {
    match value {
        Value::Object(map) if map.contains_key("@type") => {
            map.get("@value").map(untyped).unwrap_or(&NULL)
        }
        _ => value,
    }
}

fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    untyped(value).get(key).map(untyped)
}

fn decode_id(value: &Value) -> Result<ElementId, GraphError> {
    match untyped(value) {
        Value::Number(n) => n
            .as_i64()
            .map(ElementId::Num)
            .ok_or_else(|| GraphError::Decode(format!("Non-integer element id: {n}"))),
        Value::String(s) => Ok(ElementId::Text(s.clone())),
        // JanusGraph relation identifiers
        Value::Object(map) => match map.get("relationId").map(untyped) {
            Some(Value::String(s)) => Ok(ElementId::Text(s.clone())),
            _ => Err(GraphError::Decode(format!("Unrecognised element id: {value}"))),
        },
        other => Err(GraphError::Decode(format!("Unrecognised element id: {other}"))),
    }
}

fn decode_scalar(value: &Value) -> PropertyValue {
    match untyped(value) {
        Value::String(s) => PropertyValue::Text(s.clone()),
        Value::Bool(b) => PropertyValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => PropertyValue::Int(i),
            None => PropertyValue::Text(n.to_string()),
        },
        other => PropertyValue::Blob(other.to_string()),
    }
}

/// Vertex properties arrive as `key: [{id, value}]`, edge properties as `key: value`.
fn decode_property(value: &Value) -> Option<PropertyValue> {
    let value = match untyped(value) {
        Value::Array(items) => untyped(items.first()?),
        other => other,
    };
    match value {
        Value::Object(map) if map.contains_key("value") => map.get("value").map(decode_scalar),
        Value::Null => None,
        other => Some(decode_scalar(other)),
    }
}

fn decode_properties(value: Option<&Value>) -> Properties {
    let mut properties = Properties::new();
    if let Some(Value::Object(map)) = value {
        for (key, raw) in map {
            if let Some(v) = decode_property(raw) {
                properties.insert(key.clone(), v);
            }
        }
    }
    properties
}

fn decode_label(value: &Value) -> String {
    field(value, "label")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub fn decode_vertex(value: &Value) -> Result<Vertex, GraphError> {
    let id = field(value, "id")
        .ok_or_else(|| GraphError::Decode(format!("Vertex without id: {value}")))?;
    Ok(Vertex {
        id: decode_id(id)?,
        label: decode_label(value),
        properties: decode_properties(field(value, "properties")),
    })
}

pub fn decode_edge(value: &Value) -> Result<Edge, GraphError> {
    let get = |key: &str| {
        field(value, key).ok_or_else(|| GraphError::Decode(format!("Edge without {key}: {value}")))
    };
    Ok(Edge {
        id: decode_id(get("id")?)?,
        label: decode_label(value),
        out_v: decode_id(get("outV")?)?,
        in_v: decode_id(get("inV")?)?,
        properties: decode_properties(field(value, "properties")),
    })
}

pub fn decode_element(value: &Value) -> Result<Element, GraphError> {
    let is_edge = field(value, "inV").is_some() && field(value, "outV").is_some();
    if is_edge {
        decode_edge(value).map(Element::Edge)
    } else {
        decode_vertex(value).map(Element::Vertex)
    }
}

pub fn decode_path(value: &Value) -> Result<Path, GraphError> {
    let objects = match field(value, "objects") {
        Some(Value::Array(items)) => items
            .iter()
            .map(decode_element)
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(GraphError::Decode(format!("Path without objects: {value}"))),
    };
    Ok(Path { objects })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_missing_data_is_empty() {
        let env: Envelope = serde_json::from_value(json!({
            "requestId": "abc",
            "status": {"code": 200, "message": "", "attributes": {}},
            "result": {"meta": {}}
        }))
        .unwrap();
        assert!(env.is_success());
        assert!(env.into_rows().is_empty());

        let null: Envelope =
            serde_json::from_value(json!({"status": {"code": 200}, "result": {"data": null}}))
                .unwrap();
        assert!(null.into_rows().is_empty());
    }

    #[test]
    fn test_envelope_failure_status() {
        let env: Envelope = serde_json::from_value(json!({
            "status": {"code": 597, "message": "No such property: foo"},
            "result": {"data": null}
        }))
        .unwrap();
        assert!(!env.is_success());
        assert_eq!(env.status.message, "No such property: foo");
    }

    #[test]
    fn test_decode_graphson_v1_vertex() {
        let v = decode_vertex(&json!({
            "id": 4272,
            "label": "person",
            "type": "vertex",
            "properties": {"name": [{"id": "1l8-3a0-sl", "value": "U1"}]}
        }))
        .unwrap();
        assert_eq!(v.id, ElementId::Num(4272));
        assert_eq!(v.label, "person");
        assert_eq!(v.name(), Some("U1"));
    }

    #[test]
    fn test_decode_graphson_v3_edge() {
        let e = decode_edge(&json!({
            "@type": "g:Edge",
            "@value": {
                "id": {"@type": "janusgraph:RelationIdentifier", "@value": {"relationId": "odxbx-3a0-6c5-3bk"}},
                "label": "selects",
                "inVLabel": "ingredient",
                "outVLabel": "person",
                "inV": {"@type": "g:Int64", "@value": 4144},
                "outV": {"@type": "g:Int64", "@value": 4272},
                "properties": {
                    "count": {"@type": "g:Property", "@value": {"key": "count", "value": {"@type": "g:Int32", "@value": 3}}}
                }
            }
        }))
        .unwrap();
        assert_eq!(e.id, ElementId::Text("odxbx-3a0-6c5-3bk".to_string()));
        assert_eq!(e.out_v, ElementId::Num(4272));
        assert_eq!(e.in_v, ElementId::Num(4144));
        assert_eq!(e.count(), 3);
    }

    #[test]
    fn test_decode_path_objects() {
        let path = decode_path(&json!({
            "labels": [[], [], []],
            "objects": [
                {"id": 1, "label": "person", "type": "vertex", "properties": {}},
                {"id": "e1", "label": "selects", "type": "edge", "inV": 2, "outV": 1, "properties": {"count": 2}},
                {"id": 2, "label": "recipe", "type": "vertex", "properties": {"name": [{"id": "p", "value": "42"}]}}
            ]
        }))
        .unwrap();
        assert_eq!(path.objects.len(), 3);
        assert_eq!(path.first_edge().map(|e| e.count()), Some(2));
    }

    #[test]
    fn test_decode_path_requires_objects() {
        assert!(matches!(
            decode_path(&json!({"labels": []})),
            Err(GraphError::Decode(_))
        ));
    }
}
