//! Message protocol definitions.
//!
//! One JSON object per line in each direction. Requests name a `method` and
//! may carry a `request_id`, which is echoed on the response. All field
//! names are snake_case.

use serde::{Deserialize, Serialize};

/// A request line.
#[derive(Debug, Deserialize)]
pub struct Request {
    /// Request ID for correlating responses
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub message: ClientMessage,
}

/// Calls a client can make.
#[derive(Debug, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ClientMessage {
    Find {
        entity_type: String,
        #[serde(default = "match_everything")]
        filters: serde_json::Value,
        #[serde(default)]
        fields: Vec<String>,
        #[serde(default)]
        limit: Option<i64>,
        #[serde(default)]
        page: Option<i64>,
        #[serde(default)]
        retired_only: bool,
    },

    FindOne {
        entity_type: String,
        #[serde(default = "match_everything")]
        filters: serde_json::Value,
        #[serde(default)]
        fields: Vec<String>,
        #[serde(default)]
        retired_only: bool,
    },

    Create {
        entity_type: String,
        data: serde_json::Value,
        #[serde(default)]
        return_fields: Vec<String>,
    },

    Update {
        entity_type: String,
        entity_id: u64,
        data: serde_json::Value,
    },

    Delete {
        entity_type: String,
        entity_id: u64,
    },

    Revive {
        entity_type: String,
        entity_id: u64,
    },

    Batch {
        requests: Vec<serde_json::Value>,
    },

    Info,

    /// Return the live records as a snapshot, and write them to `path` if
    /// one is given.
    Dump {
        #[serde(default)]
        path: Option<String>,
    },

    Clear,
}

fn match_everything() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}

impl ClientMessage {
    /// The method name, for logging.
    pub fn method(&self) -> &'static str {
        match self {
            ClientMessage::Find { .. } => "find",
            ClientMessage::FindOne { .. } => "find_one",
            ClientMessage::Create { .. } => "create",
            ClientMessage::Update { .. } => "update",
            ClientMessage::Delete { .. } => "delete",
            ClientMessage::Revive { .. } => "revive",
            ClientMessage::Batch { .. } => "batch",
            ClientMessage::Info => "info",
            ClientMessage::Dump { .. } => "dump",
            ClientMessage::Clear => "clear",
        }
    }
}

/// A response line.
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok {
        result: serde_json::Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    Error {
        kind: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
}

impl Response {
    pub fn ok(result: serde_json::Value, request_id: Option<String>) -> Self {
        Response::Ok { result, request_id }
    }

    pub fn error(kind: impl Into<String>, message: impl Into<String>, request_id: Option<String>) -> Self {
        Response::Error {
            kind: kind.into(),
            message: message.into(),
            request_id,
        }
    }
}
