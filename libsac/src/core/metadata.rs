//! stream metadata block
//!
//! Stored as MessagePack between the header and the first frame. The
//! decoder never needs it; it is carried for tools.

use serde::{Deserialize, Serialize};

use crate::core::{CoderConfig, SacError, SacResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamMetadata {
    /// encoder name and version
    pub encoder: String,
    /// rfc3339 timestamp, filled in by the caller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoded_at: Option<String>,
    /// e.g. "wav" or "flac"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_format: Option<String>,
    #[serde(default)]
    pub tags: Vec<(String, String)>,
    /// configuration the stream was encoded with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<CoderConfig>,
    /// opaque application data
    #[serde(default, with = "serde_bytes")]
    pub extra: Vec<u8>,
}

impl StreamMetadata {
    pub fn new() -> Self {
        StreamMetadata {
            encoder: format!("libsac {}", env!("CARGO_PKG_VERSION")),
            ..Default::default()
        }
    }

    pub fn with_config(mut self, config: &CoderConfig) -> Self {
        self.config = Some(config.clone());
        self
    }

    pub fn to_msgpack(&self) -> SacResult<Vec<u8>> {
        rmp_serde::to_vec_named(self).map_err(|e| SacError::Metadata(e.to_string()))
    }

    pub fn from_msgpack(data: &[u8]) -> SacResult<Self> {
        rmp_serde::from_slice(data).map_err(|e| SacError::Metadata(e.to_string()))
    }

    /// parse if present and well formed, otherwise None
    pub fn parse_lenient(data: &[u8]) -> Option<Self> {
        if data.is_empty() {
            return None;
        }
        Self::from_msgpack(data).ok()
    }
}
