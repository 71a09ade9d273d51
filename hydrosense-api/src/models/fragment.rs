use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::SensorFields;

/// Normalized subset of a single reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalFragment {
    /// Reading time, synthesized when the payload carried none
    #[serde(with = "crate::timestamp::iso")]
    pub timestamp: OffsetDateTime,
    /// Recognized sensor fields
    #[serde(flatten)]
    pub fields: SensorFields,
}

impl CanonicalFragment {
    pub fn new(timestamp: OffsetDateTime) -> Self {
        Self {
            timestamp,
            fields: SensorFields::default(),
        }
    }

    /// A fragment carrying nothing but its timestamp must not reach the state store.
    pub fn is_valid(&self) -> bool {
        !self.fields.is_empty()
    }
}
