//! Wire form of the layout
//!
//! The section tree as JSON text, every timestamp (`openedAt`, `closedAt`,
//! item `timestamp`) written as ISO-8601 with millisecond precision. The
//! envelope carries a format version so older saves can be recognized.

use serde::{Deserialize, Serialize};
use shared::models::Section;
use thiserror::Error;

/// Current wire format version
pub const WIRE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("Malformed layout: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unsupported layout version: {0}")]
    UnsupportedVersion(u32),
}

pub type WireResult<T> = Result<T, WireError>;

/// Serialized layout, ready for durable storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireLayout(String);

impl WireLayout {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    sections: &'a [Section],
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default = "legacy_version")]
    version: u32,
    sections: Vec<Section>,
}

/// Saves written before the envelope had a version field
fn legacy_version() -> u32 {
    WIRE_VERSION
}

/// Sections → wire form
pub fn serialize(sections: &[Section]) -> WireResult<WireLayout> {
    let text = serde_json::to_string(&EnvelopeRef {
        version: WIRE_VERSION,
        sections,
    })?;
    Ok(WireLayout(text))
}

/// Wire form → sections. Also accepts a bare section array.
pub fn deserialize(wire: &WireLayout) -> WireResult<Vec<Section>> {
    let value: serde_json::Value = serde_json::from_str(&wire.0)?;
    if value.is_array() {
        return Ok(serde_json::from_value(value)?);
    }
    let envelope: Envelope = serde_json::from_value(value)?;
    if envelope.version > WIRE_VERSION {
        return Err(WireError::UnsupportedVersion(envelope.version));
    }
    Ok(envelope.sections)
}
