//! Instance identifiers
//!
//! Instance IDs end up in object names and hostnames, so they are restricted
//! to the subdomain alphabet: ASCII alphanumerics and dashes, 1 to 253 chars.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Longest accepted instance ID
pub const MAX_INSTANCE_ID_LEN: usize = 253;

lazy_static! {
    static ref VALID_ID: Regex = Regex::new(r"^[a-zA-Z0-9\-]{1,253}$").expect("static regex");
    static ref INVALID_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9\-]").expect("static regex");
}

/// An instance ID that failed validation, with a sanitized alternative
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{bad_id} is an invalid id; valid characters are dash and alphanumerics. Try {suggested_id}")]
pub struct InvalidInstanceId {
    pub bad_id: String,
    pub suggested_id: String,
}

/// Validate an instance ID, suggesting a sanitized one on failure
pub fn validate_instance_id(id: &str) -> Result<(), InvalidInstanceId> {
    if VALID_ID.is_match(id) {
        return Ok(());
    }

    let mut suggested = INVALID_CHARS.replace_all(id, "-").into_owned();
    // Replacement output is pure ASCII, so byte truncation is safe
    suggested.truncate(MAX_INSTANCE_ID_LEN);

    Err(InvalidInstanceId {
        bad_id: id.to_string(),
        suggested_id: suggested,
    })
}

/// Identity of an instance: the owning playbook plus the instance ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceKey {
    pub playbook_id: String,
    pub id: String,
}

impl InstanceKey {
    pub fn new(playbook_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            playbook_id: playbook_id.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.playbook_id, self.id)
    }
}
