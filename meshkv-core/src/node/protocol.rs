/*
    protocol.rs - Wire protocol types

    Two frame shapes travel over the newline-terminated text protocol:
    - Client command lines (shell-style tokens), parsed in command.rs
    - Control frames: one JSON object with a "type" field, used only
      between nodes (REPLICATE pushes, anti-entropy SYNC batches)

    Every response is a single JSON object with at least a "status"
    field; error responses carry a "message".
*/

use crate::store::{LogOperation, ReplicationLogEntry, VectorClock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors produced while parsing a client command line
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Invalid command format (mismatched quotes?)")]
    MalformedQuoting,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("{command} expects {expected}")]
    WrongArity {
        command: &'static str,
        expected: &'static str,
    },

    #[error("{0}")]
    InvalidArgument(String),
}

/// Inter-node control frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlFrame {
    /// Push one write or delete to a peer
    #[serde(rename = "REPLICATE")]
    Replicate {
        operation: LogOperation,
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        vector_clock: Option<VectorClock>,
    },

    /// Anti-entropy batch of recent log entries
    #[serde(rename = "SYNC")]
    Sync {
        log_entries: Vec<ReplicationLogEntry>,
    },
}

/// Whether a raw line is a control frame rather than a command line
pub fn is_control_frame(line: &str) -> bool {
    matches!(
        serde_json::from_str::<Value>(line),
        Ok(Value::Object(ref map)) if map.contains_key("type")
    )
}

/// Response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR")]
    Error,
}

/// A semantic-search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredKey {
    pub key: String,
    pub score: f32,
}

/// Single-object response sent for every processed line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub versions: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ScoredKey>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub peers: Option<usize>,
}

impl Response {
    fn base(status: Status) -> Self {
        Response {
            status,
            message: None,
            value: None,
            versions: None,
            keys: None,
            results: None,
            node_id: None,
            mode: None,
            peers: None,
        }
    }

    pub fn ok() -> Self {
        Self::base(Status::Ok)
    }

    pub fn ok_message(message: impl Into<String>) -> Self {
        Self::ok().with_message(message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::base(Status::Error).with_message(message)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_versions(mut self, versions: usize) -> Self {
        self.versions = Some(versions);
        self
    }

    /// Keys are sorted so responses are deterministic
    pub fn with_keys(mut self, keys: impl IntoIterator<Item = String>) -> Self {
        let mut keys: Vec<String> = keys.into_iter().collect();
        keys.sort();
        self.keys = Some(keys);
        self
    }

    pub fn with_results(mut self, results: Vec<ScoredKey>) -> Self {
        self.results = Some(results);
        self
    }

    pub fn with_node_status(
        mut self,
        node_id: impl Into<String>,
        mode: impl Into<String>,
        peers: usize,
    ) -> Self {
        self.node_id = Some(node_id.into());
        self.mode = Some(mode.into());
        self.peers = Some(peers);
        self
    }

    /// Serialize to one line; responses never legitimately fail to
    /// encode, but the fallback keeps the connection protocol intact
    pub fn to_line(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"status":"ERROR","message":"response encoding failed"}"#.into())
    }
}
