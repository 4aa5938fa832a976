//! Prelude module for common imports.
//!
//! ```
//! use zui_vdom::prelude::*;
//! ```

// Values and addressing
pub use crate::category::{Category, PropType};
pub use crate::id::{ElementId, PageSeed};
pub use crate::value::{Object, Value, ValueKind};

// Tree
pub use crate::node::{CHILDREN_PROP, Element, KIND_PROP, PropKey, Tree};

// Session, capture, replay
pub use crate::config::{Platform, SessionConfig};
pub use crate::record::{Mutation, MutationHistory, MutationRecord};
pub use crate::recorder::{Recorder, RecorderState};
pub use crate::registry::{Constructor, DEFAULT_KIND, Registry};
pub use crate::replay::ReplayEngine;
pub use crate::session::Session;

// Persistence
pub use crate::persist::{CONNECTED_KEY, DEFAULT_HISTORY_KEY, MemoryStorage, Persistence, Storage};

// Algorithms
pub use crate::algo::{EditOp, OpKind, apply_edit_script, decode_batch, edit_script, encode_batch};
pub use crate::reconcile::{ApplyStats, apply_batch, diff_children};

// Render
pub use crate::render::{DEFAULT_ID_ATTR, RenderConfig, render_document, render_tree};

// Error
pub use crate::error::{ZuiError, ZuiResult};
