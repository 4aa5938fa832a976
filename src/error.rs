//! Error types for zui-vdom.
//!
//! One error enum covers the whole crate: persisted-history decoding, replay
//! validation, batch decoding and tree lookups.

use thiserror::Error;

use crate::id::ElementId;
use crate::value::ValueKind;

/// Errors that can occur while recording, persisting, replaying or
/// reconciling an element tree.
#[derive(Debug, Error)]
pub enum ZuiError {
    /// JSON encode/decode failed
    #[error("json error ({context}): {source}")]
    Json {
        /// What was being encoded or decoded
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Base64 envelope of a batch could not be decoded
    #[error("invalid batch envelope: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Binary batch is truncated or contains an unknown operation
    #[error("malformed batch at byte {offset}: {reason}")]
    MalformedBatch {
        /// Byte offset in the decoded buffer
        offset: usize,
        /// What was wrong
        reason: String,
    },

    /// Edit script cannot be represented in the batch format
    #[error("cannot encode batch: {0}")]
    BatchEncode(String),

    /// No constructor registered under this name
    #[error("no constructor registered for element kind `{0}`")]
    UnknownConstructor(String),

    /// Element id is not present in the tree
    #[error("element {0} does not exist")]
    UnknownElement(ElementId),

    /// An element with this id already exists
    #[error("element {0} already exists")]
    DuplicateElement(ElementId),

    /// Requested child ordering would break the tree
    #[error("invalid structure under {parent}: {reason}")]
    InvalidStructure {
        /// Parent whose children were being changed
        parent: ElementId,
        /// What was wrong
        reason: String,
    },

    /// Property is maintained by the tree and cannot be overwritten
    #[error("{element}: index/{name} is read-only")]
    ReadOnly {
        /// Target element
        element: ElementId,
        /// Property name
        name: String,
    },

    /// Persisted history was written by an incompatible version
    #[error("history version mismatch: expected v{expected}, found v{found}")]
    VersionMismatch {
        /// Expected schema version
        expected: u32,
        /// Found schema version
        found: u32,
    },

    /// Category name is not one of the known namespaces
    #[error("unknown property category `{0}`")]
    UnknownCategory(String),

    /// Value does not match the kind declared for its property
    #[error("{category}/{name} expects {expected}, found {found}")]
    TypeMismatch {
        /// Category wire name
        category: &'static str,
        /// Property name
        name: String,
        /// Declared kind
        expected: ValueKind,
        /// Actual kind
        found: ValueKind,
    },

    /// Number is NaN or infinite; JSON cannot carry it
    #[error("{category}/{name} holds a non-finite number")]
    NonFiniteNumber {
        /// Category wire name
        category: &'static str,
        /// Property name
        name: String,
    },

    /// A history record could not be replayed
    #[error("replay failed at sequence {sequence}: {source}")]
    ReplayFailed {
        /// Sequence number of the offending record
        sequence: u64,
        #[source]
        source: Box<ZuiError>,
    },

    /// A persisted entry is corrupted
    #[error("corrupted store entry `{key}`: {reason}")]
    CorruptedStore {
        /// Storage key
        key: String,
        /// What was wrong
        reason: String,
    },
}

/// Result type alias for zui-vdom operations.
pub type ZuiResult<T> = Result<T, ZuiError>;

impl ZuiError {
    /// Wrap a serde_json error with context.
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    /// Create a corrupted-store error.
    pub fn corrupted(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptedStore {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed-batch error.
    pub fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Self::MalformedBatch {
            offset,
            reason: reason.into(),
        }
    }

    /// Attach the sequence number of the record being replayed.
    pub fn at_sequence(self, sequence: u64) -> Self {
        Self::ReplayFailed {
            sequence,
            source: Box::new(self),
        }
    }
}
