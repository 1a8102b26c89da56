//! Account profile values
//!
//! Profiles are descriptive (username, display name, platform follower count,
//! ...). The analytics stages never read them; queries can filter on them and
//! snapshots carry them through unchanged.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One profile entry, stored as it arrived in JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Null,
}

impl PropertyValue {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

/// Profile entries by field name
pub type PropertyMap = HashMap<String, PropertyValue>;
