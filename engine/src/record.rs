//! Record and link types.

use crate::{EntityId, EntityType, Map, Value};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Field holding a record's entity type.
pub const TYPE_FIELD: &str = "type";
/// Field holding a record's id.
pub const ID_FIELD: &str = "id";
/// Creation timestamp, set by the store.
pub const CREATED_AT_FIELD: &str = "created_at";
/// Last modification timestamp, set by the store.
pub const UPDATED_AT_FIELD: &str = "updated_at";

/// A `{type, id}` reference to another record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Link {
    pub entity_type: EntityType,
    pub id: EntityId,
}

impl Link {
    pub fn new(entity_type: impl Into<EntityType>, id: EntityId) -> Self {
        Self {
            entity_type: entity_type.into(),
            id,
        }
    }

    /// Read a link out of a map value with a string `type` and an integer `id`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_map()?;
        let entity_type = map.get(TYPE_FIELD)?.as_str()?;
        let id = map.get(ID_FIELD)?.as_u64()?;
        Some(Self::new(entity_type, id))
    }

    /// The wire form, `{"type": ..., "id": ...}`.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(TYPE_FIELD.to_string(), Value::from(self.entity_type.as_str()));
        map.insert(ID_FIELD.to_string(), Value::from(self.id));
        Value::Map(map)
    }
}

impl From<Link> for Value {
    fn from(link: Link) -> Self {
        link.to_value()
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)
    }
}

/// An entity record: a field map that always carries `type` and `id`.
///
/// The `type` and `id` fields are fixed at construction; merging data never
/// overwrites them.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    entity_type: EntityType,
    id: EntityId,
    fields: Map,
}

impl Record {
    /// Create a record holding only `type` and `id`.
    pub fn new(entity_type: impl Into<EntityType>, id: EntityId) -> Self {
        Self::from_fields(entity_type, id, Map::new())
    }

    /// Create a record from a field map. Any `type`/`id` entries in `fields`
    /// are replaced by the given ones.
    pub fn from_fields(entity_type: impl Into<EntityType>, id: EntityId, mut fields: Map) -> Self {
        let entity_type = entity_type.into();
        fields.insert(TYPE_FIELD.to_string(), Value::from(entity_type.as_str()));
        fields.insert(ID_FIELD.to_string(), Value::from(id));
        Self {
            entity_type,
            id,
            fields,
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// A link pointing at this record.
    pub fn link(&self) -> Link {
        Link::new(self.entity_type.clone(), self.id)
    }

    /// A copy holding only `type` and `id`.
    pub fn minimal(&self) -> Record {
        Record::new(self.entity_type.clone(), self.id)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Set a field. Writes to `type` or `id` are ignored.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        if field == TYPE_FIELD || field == ID_FIELD {
            return;
        }
        self.fields.insert(field, value.into());
    }

    /// Merge fields into this record, last write wins.
    pub fn merge(&mut self, data: Map) {
        for (field, value) in data {
            self.set(field, value);
        }
    }

    pub fn fields(&self) -> &Map {
        &self.fields
    }

    pub fn into_fields(self) -> Map {
        self.fields
    }

    /// Number of fields, `type` and `id` included.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false; a record holds at least `type` and `id`.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn created_at(&self) -> Option<&DateTime<Utc>> {
        match self.fields.get(CREATED_AT_FIELD) {
            Some(Value::DateTime(dt)) => Some(dt),
            _ => None,
        }
    }

    pub fn updated_at(&self) -> Option<&DateTime<Utc>> {
        match self.fields.get(UPDATED_AT_FIELD) {
            Some(Value::DateTime(dt)) => Some(dt),
            _ => None,
        }
    }

    pub(crate) fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.set(CREATED_AT_FIELD, now);
        self.set(UPDATED_AT_FIELD, now);
    }

    pub(crate) fn stamp_updated(&mut self, now: DateTime<Utc>) {
        self.set(UPDATED_AT_FIELD, now);
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Map(record.fields)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn create_record() {
        let record = Record::new("Shot", 7);
        assert_eq!(record.entity_type(), "Shot");
        assert_eq!(record.id(), 7);
        assert_eq!(record.get("type"), Some(&Value::from("Shot")));
        assert_eq!(record.get("id"), Some(&Value::Int(7)));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn type_and_id_are_fixed() {
        let mut record = Record::new("Shot", 7);
        record.set("id", 99);
        record.set("type", "Asset");
        record.set("code", "010");

        assert_eq!(record.id(), 7);
        assert_eq!(record.get("type"), Some(&Value::from("Shot")));
        assert_eq!(record.get("code"), Some(&Value::from("010")));

        let mut fields = Map::new();
        fields.insert("id".into(), Value::Int(3));
        let record = Record::from_fields("Task", 1, fields);
        assert_eq!(record.get("id"), Some(&Value::Int(1)));
    }

    #[test]
    fn link_roundtrip() {
        let link = Link::new("Sequence", 4);
        assert_eq!(link.to_value(), Value::from(json!({"type": "Sequence", "id": 4})));
        assert_eq!(Link::from_value(&link.to_value()), Some(link.clone()));
        assert_eq!(link.to_string(), "Sequence:4");

        assert_eq!(Link::from_value(&Value::from(json!({"type": "Shot", "id": "4"}))), None);
        assert_eq!(Link::from_value(&Value::from(json!({"type": "Shot", "id": -1}))), None);
    }

    #[test]
    fn timestamps() {
        let mut record = Record::new("Shot", 1);
        let t0 = Utc.with_ymd_and_hms(2020, 5, 5, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2020, 5, 6, 0, 0, 0).unwrap();

        record.stamp_created(t0);
        assert_eq!(record.created_at(), Some(&t0));
        assert_eq!(record.updated_at(), Some(&t0));

        record.stamp_updated(t1);
        assert_eq!(record.created_at(), Some(&t0));
        assert_eq!(record.updated_at(), Some(&t1));
    }

    #[test]
    fn serializes_as_field_map() {
        let mut record = Record::new("Shot", 1);
        record.set("code", "001");
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"code": "001", "id": 1, "type": "Shot"})
        );
    }
}
