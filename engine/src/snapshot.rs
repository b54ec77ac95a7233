//! Snapshot types for dumping and loading store state as JSON.
//!
//! The format is the one the mock has always written: a mapping from entity
//! type to a mapping from string-encoded id to record. Datetimes are written
//! as ISO-8601 with a trailing `Z` and dates as `YYYY-MM-DD`; loading turns
//! top-level string fields of exactly that shape back into native values.

use crate::error::{Error, Result};
use crate::{EntityId, EntityType, Map, Record, Value, MAX_ENTITY_ID};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use indexmap::IndexMap;
use regex::Regex;
use std::collections::BTreeMap;
use std::io;
use std::sync::LazyLock;

static TEMPORAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([0-9]{4})-([0-9]{2})-([0-9]{2})(?:T([0-9]{2}):([0-9]{2}):([0-9]{2})(?:\.([0-9]{6}))?Z)?$",
    )
    .expect("temporal pattern is a valid regex")
});

/// A point-in-time copy of the live records.
///
/// Entity types are kept sorted; records keep store insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub entities: BTreeMap<EntityType, IndexMap<EntityId, Record>>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure a type appears in the snapshot even with no records.
    pub fn add_entity_type(&mut self, entity_type: impl Into<EntityType>) {
        self.entities.entry(entity_type.into()).or_default();
    }

    /// Add a record under its own type and id.
    pub fn add_record(&mut self, record: Record) {
        self.entities
            .entry(record.entity_type().to_string())
            .or_default()
            .insert(record.id(), record);
    }

    pub fn get_record(&self, entity_type: &str, id: EntityId) -> Option<&Record> {
        self.entities.get(entity_type)?.get(&id)
    }

    /// Count records across all types.
    pub fn record_count(&self) -> usize {
        self.entities.values().map(IndexMap::len).sum()
    }

    /// The JSON document for this snapshot.
    pub fn to_json_value(&self) -> serde_json::Value {
        let entities = self
            .entities
            .iter()
            .map(|(entity_type, records)| {
                let records = records
                    .iter()
                    .map(|(id, record)| (id.to_string(), Value::from(record.clone()).to_json()))
                    .collect::<serde_json::Map<_, _>>();
                (entity_type.clone(), serde_json::Value::Object(records))
            })
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(entities)
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.to_json_value()).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_json_value())
            .map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Write JSON to `writer`.
    pub fn write_json<W: io::Write>(&self, writer: W, pretty: bool) -> Result<()> {
        let document = self.to_json_value();
        let written = if pretty {
            serde_json::to_writer_pretty(writer, &document)
        } else {
            serde_json::to_writer(writer, &document)
        };
        written.map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: serde_json::Value =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;
        Self::from_json_value(document)
    }

    /// Deserialize from a JSON reader.
    pub fn read_json<R: io::Read>(reader: R) -> Result<Self> {
        let document: serde_json::Value =
            serde_json::from_reader(reader).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;
        Self::from_json_value(document)
    }

    /// Build a snapshot from a parsed JSON document.
    pub fn from_json_value(document: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(types) = document else {
            return Err(Error::InvalidSnapshot(
                "top level must be a mapping of entity types".to_string(),
            ));
        };

        let mut snapshot = Self::new();
        for (entity_type, records) in types {
            let serde_json::Value::Object(records) = records else {
                return Err(Error::InvalidSnapshot(format!(
                    "{entity_type} must map ids to records"
                )));
            };
            snapshot.add_entity_type(entity_type.as_str());

            for (key, fields) in records {
                let id: EntityId = key.parse().map_err(|_| {
                    Error::InvalidSnapshot(format!("{entity_type} has a non-integer id {key:?}"))
                })?;
                if id > MAX_ENTITY_ID {
                    return Err(Error::InvalidSnapshot(format!(
                        "{entity_type} id {id} is out of range"
                    )));
                }
                let serde_json::Value::Object(fields) = fields else {
                    return Err(Error::InvalidSnapshot(format!(
                        "{entity_type} {id} is not a mapping"
                    )));
                };
                let fields: Map = fields
                    .into_iter()
                    .map(|(field, value)| (field, revive_temporal(Value::from(value))))
                    .collect();
                snapshot.add_record(Record::from_fields(entity_type.as_str(), id, fields));
            }
        }
        Ok(snapshot)
    }
}

/// Turn a date or datetime string back into its native value. Anything that
/// is not exactly that shape, or not a real calendar date, is left alone.
pub fn revive_temporal(value: Value) -> Value {
    let Value::String(text) = &value else {
        return value;
    };
    parse_temporal(text).unwrap_or(value)
}

fn parse_temporal(text: &str) -> Option<Value> {
    let captures = TEMPORAL.captures(text)?;
    let number = |index: usize| -> Option<u32> { captures.get(index)?.as_str().parse().ok() };

    let year: i32 = captures.get(1)?.as_str().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, number(2)?, number(3)?)?;
    if captures.get(4).is_none() {
        return Some(Value::Date(date));
    }

    let micros = if captures.get(7).is_some() { number(7)? } else { 0 };
    let time = NaiveTime::from_hms_micro_opt(number(4)?, number(5)?, number(6)?, micros)?;
    Some(Value::DateTime(Utc.from_utc_datetime(&date.and_time(time))))
}
