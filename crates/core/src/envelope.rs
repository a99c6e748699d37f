// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Versioned JSON envelopes for rule configuration
//!
//! Conditions and actions are stored as `{"version": 1, "data": [...]}`.
//! Rules created before the envelope was introduced hold a bare array, which
//! decodes as implicit version 1. Any other version is rejected outright;
//! the engine never guesses at a schema it does not understand.

use serde_json::Value;
use thiserror::Error;

/// The envelope version this build understands
pub const PAYLOAD_VERSION: u64 = 1;

/// Errors decoding a rule's condition/action payload
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("unsupported payload version {0}")]
    Version(u64),
    #[error("payload is not an array or versioned envelope")]
    Shape,
    #[error("payload item is malformed: {0}")]
    Item(#[from] serde_json::Error),
}

/// Unwrap a versioned payload down to its raw items
pub fn decode_payload(payload: &Value) -> Result<Vec<Value>, PayloadError> {
    match payload {
        // Bare arrays predate the envelope and are implicit version 1
        Value::Array(items) => Ok(items.clone()),
        Value::Object(map) if map.contains_key("version") => {
            let version = map
                .get("version")
                .and_then(Value::as_u64)
                .ok_or(PayloadError::Shape)?;
            if version != PAYLOAD_VERSION {
                return Err(PayloadError::Version(version));
            }
            match map.get("data") {
                Some(Value::Array(items)) => Ok(items.clone()),
                _ => Err(PayloadError::Shape),
            }
        }
        _ => Err(PayloadError::Shape),
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
