//! Error types for the sgmock engine.

use crate::EntityId;
use thiserror::Error;

/// Broad classification of an [`Error`], mirroring the fault classes the
/// real server reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad filter, operator, relation or field path. Raised before any scan.
    Configuration,
    /// An explicit id collided with an existing record.
    Conflict,
    /// A record addressed by id does not exist.
    NotFound,
    /// A request is missing required keys or has an unknown type.
    Integrity,
    /// A snapshot could not be read or written.
    Snapshot,
}

impl ErrorKind {
    /// Stable lowercase name, used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Integrity => "integrity",
            ErrorKind::Snapshot => "snapshot",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All possible errors from the engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    // Filter compilation
    #[error("invalid filter operator {0:?}")]
    InvalidOperator(String),

    #[error("unknown filter relation {0:?}")]
    UnknownRelation(String),

    #[error("filter relation {relation:?} takes {expected} value(s), got {got}")]
    RelationArity {
        relation: String,
        expected: usize,
        got: usize,
    },

    #[error("malformed filter: {0}")]
    MalformedFilter(String),

    #[error("malformed field {0:?}")]
    MalformedField(String),

    // Store
    #[error("invalid id {0}; ids must be non-negative integers")]
    InvalidId(String),

    #[error("there is already a {entity_type:?} record with the id {id}")]
    DuplicateId { entity_type: String, id: EntityId },

    #[error("no ids left for {0:?}")]
    IdsExhausted(String),

    #[error("invalid entity data: {0}")]
    InvalidData(String),

    #[error("{entity_type} {id} does not exist")]
    EntityNotFound { entity_type: String, id: EntityId },

    // Batch
    #[error("batch must have at least one request")]
    EmptyBatch,

    #[error("missing request_type; {0}")]
    MissingRequestType(String),

    #[error("unknown request_type {request_type:?}; {request}")]
    UnknownRequestType {
        request_type: String,
        request: String,
    },

    #[error("{request_type} request missing {field}; {request}")]
    MissingRequestField {
        request_type: &'static str,
        field: &'static str,
        request: String,
    },

    // Fixture
    #[error("{entity_type} missing required {argument}")]
    MissingRequiredArgument {
        entity_type: String,
        argument: String,
    },

    #[error("{entity_type} takes {expected} positional argument(s), got {got}")]
    TooManyArguments {
        entity_type: String,
        expected: usize,
        got: usize,
    },

    #[error("{child} is not a child type of {parent}")]
    NotAChildType { parent: String, child: String },

    // Snapshot
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidOperator(_)
            | Error::UnknownRelation(_)
            | Error::RelationArity { .. }
            | Error::MalformedFilter(_)
            | Error::MalformedField(_) => ErrorKind::Configuration,
            Error::DuplicateId { .. } | Error::IdsExhausted(_) => ErrorKind::Conflict,
            Error::EntityNotFound { .. } => ErrorKind::NotFound,
            Error::InvalidId(_)
            | Error::InvalidData(_)
            | Error::EmptyBatch
            | Error::MissingRequestType(_)
            | Error::UnknownRequestType { .. }
            | Error::MissingRequestField { .. }
            | Error::MissingRequiredArgument { .. }
            | Error::TooManyArguments { .. }
            | Error::NotAChildType { .. } => ErrorKind::Integrity,
            Error::InvalidSnapshot(_) => ErrorKind::Snapshot,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
