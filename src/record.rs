//! Mutation records and histories.
//!
//! A [`MutationRecord`] describes one property write. A [`MutationHistory`]
//! is the ordered list of records captured during a session: insertion
//! order is temporal order is replay order.
//!
//! # Wire format
//!
//! Histories are stored as one JSON document:
//!
//! ```text
//! {"version":1,"records":[
//!   {"elementId":"x","category":"data","propertyName":"text",
//!    "newValue":"A","propType":"Local","sequence":1}, ...]}
//! ```
//!
//! `oldValue` is omitted when absent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category::{Category, PropType};
use crate::error::{ZuiError, ZuiResult};
use crate::id::ElementId;
use crate::node::PropKey;
use crate::value::Value;

/// Current schema version of the persisted history.
pub const HISTORY_SCHEMA_VERSION: u32 = 1;

// =============================================================================
// MutationRecord
// =============================================================================

/// One captured state change. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationRecord {
    pub element_id: ElementId,
    pub category: Category,
    pub property_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    pub new_value: Value,
    /// Local or inheritable write
    #[serde(default = "local", with = "prop_type_serde")]
    pub prop_type: PropType,
    /// Monotonic order key; larger wins for the same property.
    pub sequence: u64,
}

fn local() -> PropType {
    PropType::Local
}

mod prop_type_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::category::PropType;

    pub fn serialize<S: Serializer>(kind: &PropType, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(kind.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PropType, D::Error> {
        let s = String::deserialize(deserializer)?;
        PropType::parse_tag(&format!("{s}/"))
            .map(|(kind, _)| kind)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown prop type `{s}`")))
    }
}

impl MutationRecord {
    /// Address of the property this record writes.
    pub fn key(&self) -> PropKey {
        PropKey::new(self.element_id.clone(), self.category, self.property_name.clone())
    }
}

/// Borrowed view of a mutation as it happens, handed to observers.
#[derive(Debug, Clone, Copy)]
pub struct Mutation<'a> {
    pub element_id: &'a ElementId,
    pub category: Category,
    pub property_name: &'a str,
    pub old_value: Option<&'a Value>,
    pub new_value: &'a Value,
}

// =============================================================================
// MutationHistory
// =============================================================================

/// Ordered list of mutation records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationHistory {
    records: Vec<MutationRecord>,
}

#[derive(Serialize, Deserialize)]
struct HistoryEnvelope<R> {
    version: u32,
    records: R,
}

impl MutationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a history from records already in temporal order.
    pub fn from_records(records: Vec<MutationRecord>) -> Self {
        Self { records }
    }

    pub(crate) fn push(&mut self, record: MutationRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[MutationRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MutationRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Highest sequence number in the history (0 when empty).
    pub fn last_sequence(&self) -> u64 {
        self.records.iter().map(|r| r.sequence).max().unwrap_or(0)
    }

    pub fn into_records(self) -> Vec<MutationRecord> {
        self.records
    }

    /// Expected state after replay: for every property, the value of the
    /// record with the highest sequence. Transient categories are ignored.
    pub fn last_write_wins(&self) -> BTreeMap<PropKey, &Value> {
        let mut winners: BTreeMap<PropKey, (u64, &Value)> = BTreeMap::new();
        for record in self.records.iter().filter(|r| r.category.is_persistent()) {
            let entry = winners.entry(record.key()).or_insert((record.sequence, &record.new_value));
            if record.sequence >= entry.0 {
                *entry = (record.sequence, &record.new_value);
            }
        }
        winners.into_iter().map(|(k, (_, v))| (k, v)).collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Serialization
    // ─────────────────────────────────────────────────────────────────────────

    pub fn to_json(&self) -> ZuiResult<String> {
        let envelope = HistoryEnvelope {
            version: HISTORY_SCHEMA_VERSION,
            records: &self.records,
        };
        serde_json::to_string(&envelope).map_err(|e| ZuiError::json("encode history", e))
    }

    /// Decode a history, checking the schema version.
    pub fn from_json(json: &str) -> ZuiResult<Self> {
        let envelope: HistoryEnvelope<Vec<MutationRecord>> =
            serde_json::from_str(json).map_err(|e| ZuiError::json("decode history", e))?;
        if envelope.version != HISTORY_SCHEMA_VERSION {
            return Err(ZuiError::VersionMismatch {
                expected: HISTORY_SCHEMA_VERSION,
                found: envelope.version,
            });
        }
        Ok(Self {
            records: envelope.records,
        })
    }

    pub fn to_bytes(&self) -> ZuiResult<Vec<u8>> {
        self.to_json().map(String::into_bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> ZuiResult<Self> {
        let json = std::str::from_utf8(bytes).map_err(|e| ZuiError::corrupted("history", e.to_string()))?;
        Self::from_json(json)
    }
}

impl<'a> IntoIterator for &'a MutationHistory {
    type Item = &'a MutationRecord;
    type IntoIter = std::slice::Iter<'a, MutationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// =============================================================================
// Tests
// =============================================================================
