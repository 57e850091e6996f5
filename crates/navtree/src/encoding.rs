//! Nav encodings.
//!
//! JSON is the structural, tagged-field form used for transport and
//! snapshots. The binary form (postcard) is what the read cache stores, so
//! every cache hit decodes an independent copy. Neither carries the
//! uncommitted event buffer.

use crate::aggregate::Nav;
use crate::error::{NavError, Result};

pub fn to_json(nav: &Nav) -> Result<String> {
    serde_json::to_string(nav).map_err(encoding)
}

pub fn from_json(json: &str) -> Result<Nav> {
    serde_json::from_str(json).map_err(encoding)
}

pub fn to_bytes(nav: &Nav) -> Result<Vec<u8>> {
    postcard::to_allocvec(nav).map_err(encoding)
}

pub fn from_bytes(bytes: &[u8]) -> Result<Nav> {
    postcard::from_bytes(bytes).map_err(encoding)
}

fn encoding(err: impl std::fmt::Display) -> NavError {
    NavError::Encoding {
        reason: err.to_string(),
    }
}
