//! JSON message protocol for IPC communication between clients and the daemon.

use crate::error::JimakuError;
use crate::pipeline::orchestrator::SubtitleSegment;
use serde::{Deserialize, Serialize};

/// Requests sent by clients to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Process one chunk of a source and return its subtitle segments.
    ///
    /// `source_url` is required but optional in the wire shape so a missing
    /// field surfaces as a structured validation error instead of a parse
    /// failure. Offsets default to the start of the source and one chunk.
    Process {
        #[serde(default)]
        source_url: Option<String>,
        #[serde(default)]
        start_offset_secs: Option<u32>,
        #[serde(default)]
        duration_secs: Option<u32>,
    },
    /// Get daemon status
    Status,
    /// Shut down the daemon
    Shutdown,
}

impl Request {
    /// Serialize request to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize request from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Responses sent by the daemon to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Request succeeded with no payload
    Ok,
    /// Completed chunk: every assembled sentence produced one segment
    Segments {
        segments: Vec<SubtitleSegment>,
        status: String,
    },
    /// Current daemon status
    Status {
        model_name: String,
        in_flight: usize,
        cache_dir: String,
    },
    /// Request failed
    Error {
        /// Coarse failure class: "validation", "busy", "cancelled",
        /// "pipeline", "protocol", or "internal".
        kind: String,
        /// HTTP-equivalent status code for the class.
        code: u16,
        /// Failing pipeline stage, when one is known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stage: Option<String>,
        message: String,
    },
}

impl Response {
    /// Serialize response to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize response from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Map an error into the wire shape, classifying by taxonomy.
    pub fn from_error(error: &JimakuError) -> Response {
        let (kind, code) = match error {
            JimakuError::MissingField { .. } | JimakuError::InvalidRequest { .. } => {
                ("validation", 400)
            }
            JimakuError::ChunkInFlight { .. } => ("busy", 409),
            JimakuError::Cancelled => ("cancelled", 499),
            JimakuError::Pipeline { .. } => ("pipeline", 500),
            JimakuError::IpcProtocol { .. } => ("protocol", 400),
            _ => ("internal", 500),
        };

        Response::Error {
            kind: kind.to_string(),
            code,
            stage: error.stage().map(|s| s.as_str().to_string()),
            message: error.to_string(),
        }
    }
}
