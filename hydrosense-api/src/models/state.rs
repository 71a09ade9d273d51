use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{CanonicalFragment, SensorFields};

/// Last known state of the world, built by sparse merges of fragments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalState {
    /// Timestamp of the most recent accepted fragment
    #[serde(
        default,
        with = "crate::timestamp::iso_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<OffsetDateTime>,
    /// Latest known value of every sensor field seen so far
    #[serde(flatten)]
    pub fields: SensorFields,
}

impl CanonicalState {
    pub fn is_empty(&self) -> bool {
        self.timestamp.is_none() && self.fields.is_empty()
    }

    pub fn apply(&mut self, fragment: &CanonicalFragment) {
        self.timestamp = Some(fragment.timestamp);
        self.fields.merge(&fragment.fields);
    }
}

impl From<&CanonicalFragment> for CanonicalState {
    fn from(fragment: &CanonicalFragment) -> Self {
        Self {
            timestamp: Some(fragment.timestamp),
            fields: fragment.fields.clone(),
        }
    }
}
