//! Batch request types.
//!
//! A batch is a list of request maps, each naming a `request_type` and the
//! arguments that request needs. Requests are parsed one at a time as the
//! batch runs, so a bad request only fails once everything before it has
//! been applied.

use crate::error::{Error, Result};
use crate::{EntityId, EntityType, Map, Record, Value};
use serde::Serialize;

/// One parsed batch request.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchRequest {
    Create {
        entity_type: EntityType,
        data: Map,
        return_fields: Vec<String>,
    },
    Update {
        entity_type: EntityType,
        entity_id: EntityId,
        data: Map,
    },
    Delete {
        entity_type: EntityType,
        entity_id: EntityId,
    },
}

impl BatchRequest {
    /// Parse a request map.
    pub fn from_value(request: &Value) -> Result<Self> {
        let describe = || request.to_json().to_string();
        let map = request
            .as_map()
            .ok_or_else(|| Error::MissingRequestType(describe()))?;
        let request_type = map
            .get("request_type")
            .ok_or_else(|| Error::MissingRequestType(describe()))?;

        let parsed = match request_type.as_str() {
            Some("create") => BatchRequest::Create {
                entity_type: entity_type(map, "create", request)?,
                data: data(map, "create", request)?,
                return_fields: return_fields(map)?,
            },
            Some("update") => BatchRequest::Update {
                entity_type: entity_type(map, "update", request)?,
                entity_id: entity_id(map, "update", request)?,
                data: data(map, "update", request)?,
            },
            Some("delete") => BatchRequest::Delete {
                entity_type: entity_type(map, "delete", request)?,
                entity_id: entity_id(map, "delete", request)?,
            },
            _ => {
                return Err(Error::UnknownRequestType {
                    request_type: request_type
                        .as_str()
                        .map_or_else(|| request_type.to_json().to_string(), str::to_string),
                    request: describe(),
                })
            }
        };
        Ok(parsed)
    }

    /// The request's `request_type` token.
    pub fn request_type(&self) -> &'static str {
        match self {
            BatchRequest::Create { .. } => "create",
            BatchRequest::Update { .. } => "update",
            BatchRequest::Delete { .. } => "delete",
        }
    }

    /// The entity type this request targets.
    pub fn entity_type(&self) -> &str {
        match self {
            BatchRequest::Create { entity_type, .. }
            | BatchRequest::Update { entity_type, .. }
            | BatchRequest::Delete { entity_type, .. } => entity_type,
        }
    }
}

/// What a single batch request produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchResult {
    Created(Record),
    Updated(Record),
    Deleted(bool),
}

impl From<BatchResult> for Value {
    fn from(result: BatchResult) -> Self {
        match result {
            BatchResult::Created(record) | BatchResult::Updated(record) => record.into(),
            BatchResult::Deleted(deleted) => Value::Bool(deleted),
        }
    }
}

fn required<'a>(
    map: &'a Map,
    request_type: &'static str,
    field: &'static str,
    request: &Value,
) -> Result<&'a Value> {
    map.get(field).ok_or_else(|| Error::MissingRequestField {
        request_type,
        field,
        request: request.to_json().to_string(),
    })
}

fn entity_type(map: &Map, request_type: &'static str, request: &Value) -> Result<EntityType> {
    let value = required(map, request_type, "entity_type", request)?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidData(format!("entity_type must be a string, got {}", value.type_name())))
}

fn entity_id(map: &Map, request_type: &'static str, request: &Value) -> Result<EntityId> {
    let value = required(map, request_type, "entity_id", request)?;
    value
        .as_u64()
        .ok_or_else(|| Error::InvalidId(value.to_json().to_string()))
}

fn data(map: &Map, request_type: &'static str, request: &Value) -> Result<Map> {
    let value = required(map, request_type, "data", request)?;
    value
        .as_map()
        .cloned()
        .ok_or_else(|| Error::InvalidData(format!("data must be a mapping, got {}", value.type_name())))
}

fn return_fields(map: &Map) -> Result<Vec<String>> {
    match map.get("return_fields") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::List(fields)) => fields
            .iter()
            .map(|field| {
                field
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::MalformedField(field.to_json().to_string()))
            })
            .collect(),
        Some(other) => Err(Error::InvalidData(format!(
            "return_fields must be a list, got {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    fn parse(request: serde_json::Value) -> Result<BatchRequest> {
        BatchRequest::from_value(&Value::from(request))
    }

    #[test]
    fn parse_create() {
        let request = parse(json!({
            "request_type": "create",
            "entity_type": "Shot",
            "data": {"code": "010"},
            "return_fields": ["created_at"]
        }))
        .unwrap();

        assert_eq!(request.request_type(), "create");
        assert_eq!(request.entity_type(), "Shot");
        match request {
            BatchRequest::Create {
                data,
                return_fields,
                ..
            } => {
                assert_eq!(data.get("code"), Some(&Value::from("010")));
                assert_eq!(return_fields, vec!["created_at".to_string()]);
            }
            other => panic!("expected create, got {other:?}"),
        }
    }

    #[test]
    fn parse_update_and_delete() {
        let update = parse(json!({
            "request_type": "update",
            "entity_type": "Shot",
            "entity_id": 3,
            "data": {"code": "030"}
        }))
        .unwrap();
        assert!(matches!(update, BatchRequest::Update { entity_id: 3, .. }));

        let delete = parse(json!({
            "request_type": "delete",
            "entity_type": "Shot",
            "entity_id": 3,
            "data": "ignored"
        }))
        .unwrap();
        assert_eq!(
            delete,
            BatchRequest::Delete {
                entity_type: "Shot".into(),
                entity_id: 3
            }
        );
    }

    #[test]
    fn missing_request_type() {
        let err = parse(json!({"entity_type": "Shot"})).unwrap_err();
        assert!(matches!(err, Error::MissingRequestType(_)));
        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert!(matches!(parse(json!("create")), Err(Error::MissingRequestType(_))));
    }

    #[test]
    fn unknown_request_type() {
        let err = parse(json!({"request_type": "revive", "entity_type": "Shot"})).unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownRequestType { ref request_type, .. } if request_type == "revive"
        ));
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }

    #[test]
    fn missing_arguments() {
        let err = parse(json!({"request_type": "update", "entity_type": "Shot", "data": {}}))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MissingRequestField { request_type: "update", field: "entity_id", .. }
        ));

        let err = parse(json!({"request_type": "create", "data": {}})).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingRequestField { request_type: "create", field: "entity_type", .. }
        ));

        let err = parse(json!({"request_type": "create", "entity_type": "Shot"})).unwrap_err();
        assert!(matches!(err, Error::MissingRequestField { field: "data", .. }));
    }

    #[test]
    fn wrongly_typed_arguments() {
        let err = parse(json!({"request_type": "create", "entity_type": "Shot", "data": []}))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));

        let err = parse(json!({"request_type": "delete", "entity_type": "Shot", "entity_id": "x"}))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidId(_)));
    }

    #[test]
    fn results_serialize_untagged() {
        let created = BatchResult::Created(Record::new("Shot", 1));
        assert_eq!(
            serde_json::to_value(&created).unwrap(),
            json!({"type": "Shot", "id": 1})
        );
        assert_eq!(serde_json::to_value(BatchResult::Deleted(true)).unwrap(), json!(true));
        assert_eq!(Value::from(BatchResult::Deleted(false)), Value::Bool(false));
    }
}
