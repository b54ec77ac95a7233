//! Session - the query façade callers talk to.
//!
//! A [`Session`] owns a [`Store`], the relation registry filters compile
//! against, and the clock that stamps records. Its methods mirror the calls
//! of the real client API: `find`, `create`, `update`, `delete`, `batch` and
//! friends.

use crate::batch::{BatchRequest, BatchResult};
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::filter;
use crate::relation::Relations;
use crate::snapshot::Snapshot;
use crate::store::Store;
use crate::{EntityId, Map, Record, Value};
use std::io;
use tracing::{debug, info};

/// Most records a single `find` returns.
pub const MAX_PAGE_SIZE: i64 = 500;

/// Reported when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://github.com/westernx/sgmock";

/// Version of the server API this mock imitates.
pub const SERVER_VERSION: [u32; 3] = [6, 0, 0];

/// Paging and visibility options for `find`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindOptions {
    pub limit: i64,
    pub page: i64,
    pub retired_only: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            limit: MAX_PAGE_SIZE,
            page: 1,
            retired_only: false,
        }
    }
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn page(mut self, page: i64) -> Self {
        self.page = page;
        self
    }

    pub fn retired_only(mut self, retired_only: bool) -> Self {
        self.retired_only = retired_only;
        self
    }

    /// The limit clamped to `1..=MAX_PAGE_SIZE`.
    pub fn page_size(&self) -> usize {
        self.limit.clamp(1, MAX_PAGE_SIZE) as usize
    }

    /// Records to skip; pages below 1 count as page 1.
    pub fn offset(&self) -> usize {
        let page = self.page.max(1) - 1;
        usize::try_from(page)
            .unwrap_or(usize::MAX)
            .saturating_mul(self.page_size())
    }
}

/// An in-memory stand-in for a connection to the real server.
#[derive(Debug)]
pub struct Session {
    store: Store,
    relations: Relations,
    clock: Box<dyn Clock>,
    base_url: String,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// An empty session using the wall clock and the standard relations.
    pub fn new() -> Self {
        Self {
            store: Store::new(),
            relations: Relations::standard(),
            clock: Box::new(SystemClock),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Stamp records with `clock` instead of the wall clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Compile filters against `relations` instead of the standard set.
    pub fn with_relations(mut self, relations: Relations) -> Self {
        self.relations = relations;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn relations(&self) -> &Relations {
        &self.relations
    }

    /// Mutable access for registering custom relations.
    pub fn relations_mut(&mut self) -> &mut Relations {
        &mut self.relations
    }

    /// Server information, shaped like the real `info()` response.
    pub fn info(&self) -> Value {
        let version =
            |v: [u32; 3]| -> Value { v.iter().map(|n| Value::Int(i64::from(*n))).collect() };
        let mut sgmock = Map::new();
        sgmock.insert("version".to_string(), version(crate::VERSION));

        let mut info = Map::new();
        info.insert("s3_uploads_enabled".to_string(), Value::Bool(false));
        info.insert("version".to_string(), version(SERVER_VERSION));
        info.insert("base_url".to_string(), Value::from(self.base_url.as_str()));
        info.insert("sgmock".to_string(), Value::Map(sgmock));
        Value::Map(info)
    }

    /// Find live records of `entity_type` matching `filters`, first page.
    pub fn find<S: AsRef<str>>(
        &self,
        entity_type: &str,
        filters: &Value,
        fields: &[S],
    ) -> Result<Vec<Record>> {
        self.find_with(entity_type, filters, fields, FindOptions::default())
    }

    /// Find records with explicit paging and visibility.
    ///
    /// Results are minimal copies in store order holding `type`, `id` and
    /// the requested `fields`. An unknown type yields nothing.
    pub fn find_with<S: AsRef<str>>(
        &self,
        entity_type: &str,
        filters: &Value,
        fields: &[S],
        options: FindOptions,
    ) -> Result<Vec<Record>> {
        let predicate = filter::compile(filters, &self.relations)?;
        debug!(entity_type, filters = %filters.to_json(), "compiled filters");

        let results = self
            .store
            .records(entity_type, options.retired_only)
            .filter(|record| predicate(*record))
            .skip(options.offset())
            .take(options.page_size())
            .map(|record| self.store.minimal_copy(record, fields))
            .collect::<Result<Vec<_>>>()?;

        info!(
            entity_type,
            page = options.page,
            limit = options.page_size(),
            retired_only = options.retired_only,
            found = results.len(),
            "find"
        );
        Ok(results)
    }

    /// The first live record matching `filters`, if any.
    pub fn find_one<S: AsRef<str>>(
        &self,
        entity_type: &str,
        filters: &Value,
        fields: &[S],
    ) -> Result<Option<Record>> {
        self.find_one_with(entity_type, filters, fields, false)
    }

    pub fn find_one_with<S: AsRef<str>>(
        &self,
        entity_type: &str,
        filters: &Value,
        fields: &[S],
        retired_only: bool,
    ) -> Result<Option<Record>> {
        let options = FindOptions::new().limit(1).retired_only(retired_only);
        Ok(self
            .find_with(entity_type, filters, fields, options)?
            .into_iter()
            .next())
    }

    /// Create a record from a data mapping.
    pub fn create(
        &mut self,
        entity_type: &str,
        data: impl Into<Value>,
        return_fields: &[&str],
    ) -> Result<Record> {
        let data = into_data(data.into())?;
        let record = self
            .store
            .create(entity_type, &data, return_fields, self.clock.now())?;
        info!(entity_type, id = record.id(), fields = data.len(), "create");
        Ok(record)
    }

    /// Merge a data mapping into a live record.
    pub fn update(
        &mut self,
        entity_type: &str,
        entity_id: EntityId,
        data: impl Into<Value>,
    ) -> Result<Record> {
        let data = into_data(data.into())?;
        let record = self
            .store
            .update(entity_type, entity_id, &data, self.clock.now())?;
        info!(entity_type, id = entity_id, fields = data.len(), "update");
        Ok(record)
    }

    /// Retire a record. Returns whether it was live.
    pub fn delete(&mut self, entity_type: &str, entity_id: EntityId) -> bool {
        let deleted = self.store.delete(entity_type, entity_id);
        info!(entity_type, id = entity_id, deleted, "delete");
        deleted
    }

    /// Bring a retired record back. Returns whether it was retired.
    pub fn revive(&mut self, entity_type: &str, entity_id: EntityId) -> bool {
        let revived = self.store.revive(entity_type, entity_id);
        info!(entity_type, id = entity_id, revived, "revive");
        revived
    }

    /// Run a list of requests in order.
    ///
    /// Each request is parsed just before it runs. The first failure stops
    /// the batch; requests already applied stay applied.
    pub fn batch(&mut self, requests: &[Value]) -> Result<Vec<BatchResult>> {
        if requests.is_empty() {
            return Err(Error::EmptyBatch);
        }
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            let request = BatchRequest::from_value(request)?;
            results.push(self.execute(request)?);
        }
        info!(requests = results.len(), "batch");
        Ok(results)
    }

    /// Run one parsed batch request.
    pub fn execute(&mut self, request: BatchRequest) -> Result<BatchResult> {
        match request {
            BatchRequest::Create {
                entity_type,
                data,
                return_fields,
            } => {
                let return_fields: Vec<&str> = return_fields.iter().map(String::as_str).collect();
                self.create(&entity_type, data, &return_fields)
                    .map(BatchResult::Created)
            }
            BatchRequest::Update {
                entity_type,
                entity_id,
                data,
            } => self
                .update(&entity_type, entity_id, data)
                .map(BatchResult::Updated),
            BatchRequest::Delete {
                entity_type,
                entity_id,
            } => Ok(BatchResult::Deleted(self.delete(&entity_type, entity_id))),
        }
    }

    /// Forget every record and id counter.
    pub fn clear(&mut self) {
        self.store.clear();
        info!("clear");
    }

    /// Snapshot the live records.
    pub fn snapshot(&self) -> Snapshot {
        self.store.export_snapshot()
    }

    /// Replace the store with a snapshot.
    pub fn restore(&mut self, snapshot: Snapshot) {
        let records = snapshot.record_count();
        self.store.import_snapshot(snapshot);
        info!(records, "restore");
    }

    /// Write the live records as JSON.
    pub fn dump_json<W: io::Write>(&self, writer: W, pretty: bool) -> Result<()> {
        let snapshot = self.snapshot();
        snapshot.write_json(writer, pretty)?;
        info!(records = snapshot.record_count(), "dump");
        Ok(())
    }

    /// Replace the store with records read from JSON.
    pub fn load_json<R: io::Read>(&mut self, reader: R) -> Result<()> {
        let snapshot = Snapshot::read_json(reader)?;
        self.restore(snapshot);
        Ok(())
    }
}

fn into_data(data: Value) -> Result<Map> {
    match data {
        Value::Map(map) => Ok(map),
        other => Err(Error::InvalidData(format!(
            "data must be a mapping, got {}",
            other.type_name()
        ))),
    }
}
