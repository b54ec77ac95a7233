//! Store - the in-memory entity database.
//!
//! Records are kept per entity type in two insertion-ordered maps: live and
//! retired. Deleting moves a record to the retired map, reviving moves it
//! back. Links stored in records are always reduced to `{type, id}` stubs,
//! and reads hand out minimal copies rather than the stored records.

use crate::error::{Error, Result};
use crate::record::{ID_FIELD, TYPE_FIELD};
use crate::snapshot::Snapshot;
use crate::{EntityId, EntityType, Link, Map, Record, Value, MAX_ENTITY_ID};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// Field copied from a linked record when the link is handed to a caller.
pub const LINK_DISPLAY_FIELD: &str = "name";

/// All records of one entity type.
#[derive(Debug, Clone, Default)]
pub struct Table {
    live: IndexMap<EntityId, Record>,
    retired: IndexMap<EntityId, Record>,
    last_id: EntityId,
}

impl Table {
    /// Live records in insertion order.
    pub fn live(&self) -> impl Iterator<Item = &Record> {
        self.live.values()
    }

    /// Retired records in retirement order.
    pub fn retired(&self) -> impl Iterator<Item = &Record> {
        self.retired.values()
    }

    /// Highest id ever handed out or loaded for this type.
    pub fn last_id(&self) -> EntityId {
        self.last_id
    }

    /// Count of live records.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Check if the table has no live records.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    fn contains_id(&self, id: EntityId) -> bool {
        self.live.contains_key(&id) || self.retired.contains_key(&id)
    }
}

/// The store holding every entity type.
#[derive(Debug, Clone, Default)]
pub struct Store {
    tables: BTreeMap<EntityType, Table>,
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every record, live and retired, and reset all id counters.
    pub fn clear(&mut self) {
        self.tables.clear();
    }

    /// Entity types that have been written to, sorted.
    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn table(&self, entity_type: &str) -> Option<&Table> {
        self.tables.get(entity_type)
    }

    /// The id counter for a type; 0 when nothing was ever created.
    pub fn last_id(&self, entity_type: &str) -> EntityId {
        self.tables.get(entity_type).map_or(0, Table::last_id)
    }

    /// Get a live record.
    pub fn get(&self, entity_type: &str, id: EntityId) -> Option<&Record> {
        self.tables.get(entity_type)?.live.get(&id)
    }

    /// Get a retired record.
    pub fn get_retired(&self, entity_type: &str, id: EntityId) -> Option<&Record> {
        self.tables.get(entity_type)?.retired.get(&id)
    }

    /// Live (or retired) records of a type in store order.
    pub fn records<'a>(
        &'a self,
        entity_type: &str,
        retired: bool,
    ) -> impl Iterator<Item = &'a Record> + 'a {
        self.tables
            .get(entity_type)
            .into_iter()
            .flat_map(move |table| {
                if retired {
                    table.retired.values()
                } else {
                    table.live.values()
                }
            })
    }

    /// True if the link points at a live record.
    pub fn exists(&self, link: &Link) -> bool {
        self.get(&link.entity_type, link.id).is_some()
    }

    /// Follow a link to its record, live first, then retired.
    pub fn resolve(&self, link: &Link) -> Option<&Record> {
        self.get(&link.entity_type, link.id)
            .or_else(|| self.get_retired(&link.entity_type, link.id))
    }

    /// Create a record.
    ///
    /// The id is the type's counter plus one unless `data` supplies an `id`,
    /// which must be a non-negative integer not used by any live or retired
    /// record of the type. Returns a minimal copy holding the supplied fields
    /// plus `return_fields`.
    pub fn create(
        &mut self,
        entity_type: &str,
        data: &Map,
        return_fields: &[&str],
        now: DateTime<Utc>,
    ) -> Result<Record> {
        for field in return_fields {
            check_field(field)?;
        }

        let requested = match data.get(ID_FIELD) {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                value
                    .as_u64()
                    .ok_or_else(|| Error::InvalidId(value.to_json().to_string()))?,
            ),
        };

        let reduced = self.reduce_map(data);
        let table = self.tables.entry(entity_type.to_string()).or_default();

        let id = match requested {
            Some(id) if table.contains_id(id) => {
                return Err(Error::DuplicateId {
                    entity_type: entity_type.to_string(),
                    id,
                })
            }
            Some(id) => id,
            None => table
                .last_id
                .checked_add(1)
                .filter(|id| *id <= MAX_ENTITY_ID)
                .ok_or_else(|| Error::IdsExhausted(entity_type.to_string()))?,
        };
        table.last_id = table.last_id.max(id);

        let mut record = Record::new(entity_type, id);
        record.stamp_created(now);
        record.merge(reduced);
        table.live.insert(id, record);

        let fields: Vec<&str> = data
            .keys()
            .map(String::as_str)
            .chain(return_fields.iter().copied())
            .collect();
        match self.get(entity_type, id) {
            Some(record) => self.minimal_copy(record, &fields),
            None => Err(Error::EntityNotFound {
                entity_type: entity_type.to_string(),
                id,
            }),
        }
    }

    /// Merge `data` into a live record and bump `updated_at`.
    ///
    /// Returns `{type, id}` plus the stored values of the updated fields.
    pub fn update(
        &mut self,
        entity_type: &str,
        id: EntityId,
        data: &Map,
        now: DateTime<Utc>,
    ) -> Result<Record> {
        let reduced = self.reduce_map(data);
        let record = self
            .tables
            .get_mut(entity_type)
            .and_then(|table| table.live.get_mut(&id))
            .ok_or_else(|| Error::EntityNotFound {
                entity_type: entity_type.to_string(),
                id,
            })?;

        record.stamp_updated(now);
        record.merge(reduced);

        let mut result = record.minimal();
        for field in data.keys() {
            if let Some(value) = record.get(field) {
                result.set(field.clone(), value.clone());
            }
        }
        Ok(result)
    }

    /// Move a record from live to retired. Returns whether it was live.
    pub fn delete(&mut self, entity_type: &str, id: EntityId) -> bool {
        let Some(table) = self.tables.get_mut(entity_type) else {
            return false;
        };
        match table.live.shift_remove(&id) {
            Some(record) => {
                table.retired.insert(id, record);
                true
            }
            None => false,
        }
    }

    /// Move a record from retired back to live. Returns whether it was retired.
    pub fn revive(&mut self, entity_type: &str, id: EntityId) -> bool {
        let Some(table) = self.tables.get_mut(entity_type) else {
            return false;
        };
        match table.retired.shift_remove(&id) {
            Some(record) => {
                table.live.insert(id, record);
                true
            }
            None => false,
        }
    }

    /// Reduce every link inside `value` to its `{type, id}` stub.
    ///
    /// Links to records that are not live degrade to null. Maps and lists
    /// are walked recursively; scalars pass through.
    pub fn reduce_links(&self, value: &Value) -> Value {
        match value {
            Value::Map(_) if value.is_link() => match Link::from_value(value) {
                Some(link) if self.exists(&link) => link.to_value(),
                _ => Value::Null,
            },
            Value::Map(map) => Value::Map(self.reduce_map(map)),
            Value::List(items) => Value::List(items.iter().map(|v| self.reduce_links(v)).collect()),
            other => other.clone(),
        }
    }

    fn reduce_map(&self, map: &Map) -> Map {
        map.iter()
            .map(|(field, value)| (field.clone(), self.reduce_links(value)))
            .collect()
    }

    /// Copy of `record` holding `type`, `id` and the requested fields.
    ///
    /// Linked records come back as `{type, id, name}`; links inside lists as
    /// `{type, id}`. Requested fields the record does not have are left out.
    pub fn minimal_copy<S: AsRef<str>>(&self, record: &Record, fields: &[S]) -> Result<Record> {
        let mut minimal = record.minimal();
        for field in fields {
            let field = field.as_ref();
            let Some(value) = self.lookup_field(record, field)? else {
                continue;
            };
            let value = match value {
                link if link.is_link() => Link::from_value(&link)
                    .and_then(|link| self.resolve(&link))
                    .map_or(Value::Null, |linked| self.link_stub(linked)),
                Value::List(items) => Value::List(
                    items
                        .into_iter()
                        .map(|item| match Link::from_value(&item) {
                            Some(link) => link.to_value(),
                            None => item,
                        })
                        .collect(),
                ),
                other => other,
            };
            minimal.set(field, value);
        }
        Ok(minimal)
    }

    fn link_stub(&self, linked: &Record) -> Value {
        let mut stub = linked.minimal();
        if let Some(name) = linked.get(LINK_DISPLAY_FIELD) {
            stub.set(LINK_DISPLAY_FIELD, name.clone());
        }
        stub.into()
    }

    /// Read a field, following at most one deep link.
    ///
    /// `Ok(None)` means the field should be left out of results entirely;
    /// `Ok(Some(Value::Null))` means it is present but null.
    pub fn lookup_field(&self, record: &Record, field: &str) -> Result<Option<Value>> {
        if let Some(value) = record.get(field) {
            return Ok(Some(value.clone()));
        }

        let Some(deep) = DeepField::parse(field) else {
            check_field(field)?;
            // Anything dotted that is not a recognised deep link reads as null.
            return Ok(field.contains('.').then_some(Value::Null));
        };

        let local = match record.get(deep.local) {
            Some(local @ Value::Map(_)) => local,
            _ => return Ok(None),
        };
        match local.get(TYPE_FIELD).and_then(Value::as_str) {
            None => return Ok(None),
            Some(linked_type) if linked_type != deep.linked_type => return Ok(Some(Value::Null)),
            Some(_) => {}
        }

        let remote = Link::from_value(local)
            .and_then(|link| self.resolve(&link))
            .and_then(|linked| linked.get(deep.remote))
            .cloned()
            .unwrap_or(Value::Null);
        Ok(Some(remote))
    }

    /// Export the live records as a snapshot.
    pub fn export_snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for (entity_type, table) in &self.tables {
            snapshot.add_entity_type(entity_type.clone());
            for record in table.live.values() {
                snapshot.add_record(record.clone());
            }
        }
        snapshot
    }

    /// Replace the whole store with a snapshot.
    ///
    /// Retired records are dropped and each id counter becomes the highest
    /// id loaded for its type.
    pub fn import_snapshot(&mut self, snapshot: Snapshot) {
        self.tables.clear();
        for (entity_type, records) in snapshot.entities {
            let table = self.tables.entry(entity_type).or_default();
            for (id, record) in records {
                table.last_id = table.last_id.max(id);
                table.live.insert(id, record);
            }
        }
    }
}

/// A `local.LinkedType.remote` field path. Segments past the third are
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DeepField<'a> {
    local: &'a str,
    linked_type: &'a str,
    remote: &'a str,
}

impl<'a> DeepField<'a> {
    fn parse(field: &'a str) -> Option<Self> {
        let mut parts = field.splitn(4, '.');
        let local = parts.next().filter(|s| is_word(s))?;
        let linked_type = parts.next().filter(|s| is_word(s))?;
        let remote = parts.next().filter(|s| !s.is_empty())?;
        Some(Self {
            local,
            linked_type,
            remote,
        })
    }
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Reject field paths with empty dotted segments.
fn check_field(field: &str) -> Result<()> {
    if DeepField::parse(field).is_none() && field.split('.').any(str::is_empty) {
        return Err(Error::MalformedField(field.to_string()));
    }
    Ok(())
}
