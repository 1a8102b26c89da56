//! Account records
//!
//! An account is an arena slot: its handle, its external key, a descriptive
//! profile and the attributes computed by the pipeline.

use super::attributes::NodeAttributes;
use super::property::{PropertyMap, PropertyValue};
use super::types::{AccountId, NodeId};
use serde::{Deserialize, Serialize};

/// An account in the follow graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Arena handle
    pub id: NodeId,

    /// External identifier, unique per store
    pub key: AccountId,

    /// Descriptive properties supplied at ingestion
    pub profile: PropertyMap,

    /// Values computed by the analytics stages
    pub attributes: NodeAttributes,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last attribute or profile update (Unix milliseconds)
    pub updated_at: i64,
}

impl Account {
    pub fn new(id: NodeId, key: impl Into<AccountId>) -> Self {
        Self::with_profile(id, key, PropertyMap::new())
    }

    pub fn with_profile(id: NodeId, key: impl Into<AccountId>, profile: PropertyMap) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Account {
            id,
            key: key.into(),
            profile,
            attributes: NodeAttributes::for_account(id),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.profile.get(key)
    }

    /// Display name: the `username` profile entry, falling back to the key
    pub fn username(&self) -> &str {
        self.profile
            .get("username")
            .and_then(PropertyValue::as_string)
            .unwrap_or_else(|| self.key.as_str())
    }

    /// Effective community: the assigned label or the account itself
    pub fn community(&self) -> NodeId {
        self.attributes.community_id.unwrap_or(self.id)
    }

    pub(crate) fn touch(&mut self, now: i64) {
        self.updated_at = now;
    }
}
