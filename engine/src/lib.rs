//! # sgmock engine
//!
//! An in-memory stand-in for a remote entity database, for tests that must
//! not touch the network.
//!
//! Records are typed maps carrying a `type` and an integer `id`. Records
//! reference each other through links, small `{type, id}` maps that are
//! never inlined. Queries use the same nested filter language as the real
//! API and return minimal copies: `type`, `id` and only the fields asked for.
//!
//! ## Core Concepts
//!
//! ### Filters
//!
//! [`filter::compile`] turns a filter expression into a [`Predicate`].
//! Conditions name a relation from a [`Relations`] registry (`is`, `in`,
//! `less_than`, `starts_with`, ...); groups combine children with `and` or
//! `or`. Every error is reported while compiling, before any record is
//! scanned.
//!
//! ### Store
//!
//! The [`Store`] keeps live and retired records per entity type in
//! insertion order. Deleting retires a record; reviving brings it back.
//! Links are reduced to `{type, id}` on write and resolved on read, with
//! one level of `field.Type.remote` deep lookup.
//!
//! ### Session
//!
//! [`Session`] is the façade: `find`, `find_one`, `create`, `update`,
//! `delete`, `revive`, `batch`, plus JSON dump and load through
//! [`Snapshot`].
//!
//! ### Fixtures
//!
//! [`Fixture`] builds typed test data (projects, sequences, shots, tasks,
//! assets, steps) wired to their parents, and deletes it again.
//!
//! ## Quick Start
//!
//! ```rust
//! use sgmock_engine::{Session, Value};
//! use serde_json::json;
//!
//! let mut session = Session::new();
//! session.create("Sequence", json!({"code": "sq010"}), &[]).unwrap();
//! session
//!     .create(
//!         "Shot",
//!         json!({"code": "010", "sg_sequence": {"type": "Sequence", "id": 1}}),
//!         &[],
//!     )
//!     .unwrap();
//!
//! let filters = Value::from(json!([["code", "starts_with", "0"]]));
//! let shots = session
//!     .find("Shot", &filters, &["code", "sg_sequence.Sequence.code"])
//!     .unwrap();
//!
//! assert_eq!(shots.len(), 1);
//! assert_eq!(
//!     shots[0].get("sg_sequence.Sequence.code"),
//!     Some(&Value::from("sq010"))
//! );
//! ```

pub mod batch;
pub mod clock;
pub mod coerce;
pub mod error;
pub mod filter;
pub mod fixture;
pub mod record;
pub mod relation;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod value;

// Re-export main types at crate root
pub use batch::{BatchRequest, BatchResult};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, ErrorKind, Result};
pub use filter::LogicalOperator;
pub use fixture::{Argument, ArgumentDefault, Creator, EntityKind, EntityKinds, Fixture};
pub use record::{Link, Record};
pub use relation::{Predicate, RelationFn, Relations};
pub use session::{FindOptions, Session, MAX_PAGE_SIZE};
pub use snapshot::Snapshot;
pub use store::{Store, Table};
pub use value::{Map, Value};

/// Type aliases for clarity
pub type EntityType = String;
pub type EntityId = u64;

/// Largest id a record can have; ids must fit a signed 64-bit integer.
pub const MAX_ENTITY_ID: EntityId = i64::MAX as EntityId;

/// Version of this mock, reported by [`Session::info`].
pub const VERSION: [u32; 3] = [0, 1, 0];
