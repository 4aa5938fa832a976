//! Mutation recorder.
//!
//! State machine with two states:
//!
//! ```text
//!            capture()
//!   Idle  ─────────────▶  Capturing
//!    ▲                        │
//!    └──────── clear() ───────┘   (clear() from Idle stays Idle)
//! ```
//!
//! While capturing, every non-transient property write on the owning
//! session is appended to the history with the next sequence number.
//! Replay never goes through the recorder; capture starts only after a
//! replay has finished, so the two phases never overlap on one tree.

use compact_str::CompactString;
use rustc_hash::FxHashSet;

use crate::category::{Category, PropType};
use crate::error::ZuiResult;
use crate::id::ElementId;
use crate::persist::{Persistence, Storage};
use crate::record::{MutationHistory, MutationRecord};
use crate::value::Value;

/// Recorder state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    #[default]
    Idle,
    Capturing,
}

/// Append-only mutation log for one session.
#[derive(Debug, Clone)]
pub struct Recorder {
    state: RecorderState,
    history: MutationHistory,
    next_sequence: u64,
    /// Transient (category, name) pairs that are recorded anyway
    allowed: FxHashSet<(Category, CompactString)>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            state: RecorderState::Idle,
            history: MutationHistory::new(),
            next_sequence: 1,
            allowed: FxHashSet::default(),
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    #[inline]
    pub fn is_capturing(&self) -> bool {
        self.state == RecorderState::Capturing
    }

    /// Idle → Capturing. No-op when already capturing.
    pub fn capture(&mut self) {
        if !self.is_capturing() {
            tracing::debug!(records = self.history.len(), "mutation capture started");
        }
        self.state = RecorderState::Capturing;
    }

    /// Any state → Idle, dropping the in-memory history.
    pub fn clear(&mut self) {
        tracing::debug!(dropped = self.history.len(), "mutation history cleared");
        self.state = RecorderState::Idle;
        self.history = MutationHistory::new();
        self.next_sequence = 1;
    }

    /// Record a transient property anyway (e.g. an event that must be
    /// replayed for a form to come back in the right state).
    pub fn allow(&mut self, category: Category, name: &str) {
        self.allowed.insert((category, CompactString::new(name)));
    }

    /// Whether a write to this property would be recorded while capturing.
    pub fn records(&self, category: Category, name: &str) -> bool {
        category.is_persistent() || self.allowed.contains(&(category, CompactString::new(name)))
    }

    /// Append a record if capturing and the property is recordable.
    ///
    /// Returns the sequence number assigned, if any.
    pub fn record(
        &mut self,
        element_id: &ElementId,
        category: Category,
        name: &str,
        prop_type: PropType,
        old_value: Option<Value>,
        new_value: Value,
    ) -> Option<u64> {
        if !self.is_capturing() || !self.records(category, name) {
            return None;
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.history.push(MutationRecord {
            element_id: element_id.clone(),
            category,
            property_name: name.to_string(),
            old_value,
            new_value,
            prop_type,
            sequence,
        });
        Some(sequence)
    }

    pub fn history(&self) -> &MutationHistory {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Take the history out, leaving an empty one. State is unchanged.
    pub fn take_history(&mut self) -> MutationHistory {
        std::mem::take(&mut self.history)
    }

    /// Adopt a replayed history so later captures extend it.
    pub fn restore(&mut self, history: MutationHistory) {
        self.next_sequence = history.last_sequence() + 1;
        self.history = history;
    }

    /// Serialize the current history.
    pub fn serialize(&self) -> ZuiResult<Vec<u8>> {
        self.history.to_bytes()
    }

    /// Decode a serialized history.
    pub fn deserialize(bytes: &[u8]) -> ZuiResult<MutationHistory> {
        MutationHistory::from_bytes(bytes)
    }

    /// Hand the history to the persistence adapter.
    pub fn persist<S: Storage>(&self, persistence: &Persistence<S>) -> ZuiResult<()> {
        persistence.save_history(&self.history)
    }

    /// Read a stored history through the adapter.
    pub fn load<S: Storage>(persistence: &Persistence<S>) -> ZuiResult<Option<MutationHistory>> {
        persistence.load_history()
    }
}

// =============================================================================
// Tests
// =============================================================================
