//! zui-vdom - element tree with mutation capture, replay and batched
//! child reconciliation
//!
//! ## Core Concepts
//!
//! **Session**: owns the element [`Tree`], the mutation [`Recorder`] and the
//! id allocator. Every intercepted property write goes through it.
//!
//! **Capture / Replay**: while capturing, non-transient writes become
//! [`MutationRecord`]s. A [`ReplayEngine`] rebuilds an equivalent session
//! from that history, constructing elements through the [`Registry`] of
//! named constructors.
//!
//! **Reconciliation**: child order changes travel as a Myers edit script
//! packed into a base64 batch (see [`algo`] and [`reconcile`]).
//!
//! ## Modules
//! - `node`: elements, properties, tree store
//! - `session`, `recorder`, `record`: intercepted writes and their history
//! - `replay`: history → session, hydrate with recovery
//! - `persist`: key-value persistence adapter
//! - `algo`, `reconcile`: edit scripts, batches, batch application
//! - `render`: server-side HTML
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use zui_vdom::prelude::*;
//!
//! fn app(session: &mut Session, id: &ElementId) -> ZuiResult<()> {
//!     let label = session.create(DEFAULT_KIND)?;
//!     session.append_child(id, &label)
//! }
//!
//! let registry = Arc::new(Registry::new().with("app", "main", app));
//! let persistence = Persistence::new(MemoryStorage::connected());
//!
//! // First visit: nothing stored, the tree is built from constructors.
//! let engine = ReplayEngine::new(Arc::clone(&registry), SessionConfig::client("/"));
//! let mut session = engine.hydrate(&persistence, "app")?;
//! let root = session.root().cloned().unwrap();
//! let label = session.tree().children(&root)[0].clone();
//! session.set(&label, Category::Ui, "text", Value::from("saved"))?;
//! session.persist(&persistence)?;
//!
//! // Next visit: the history is replayed.
//! let session = engine.hydrate(&persistence, "app")?;
//! assert_eq!(session.prop(&label, Category::Ui, "text"), Some(&Value::from("saved")));
//! # Ok::<(), ZuiError>(())
//! ```

/// Error types
pub mod error;

/// Property values
pub mod value;

/// Property categories and types
pub mod category;

/// Element identity and deterministic allocation
pub mod id;

/// Stable hashing
pub mod hash;

/// Elements, properties, tree store
pub mod node;

/// Named constructors
pub mod registry;

/// Mutation records and histories
pub mod record;

/// Capture state machine
pub mod recorder;

/// Session context
pub mod session;

/// Replay and hydration
pub mod replay;

/// Persistence adapter
pub mod persist;

/// Algorithms: myers, batch
pub mod algo;

/// Batch application against a tree
pub mod reconcile;

/// HTML rendering
pub mod render;

/// Session configuration
pub mod config;

/// Prelude for common imports
pub mod prelude;

// =============================================================================
// Re-exports
// =============================================================================

pub use category::{Category, PropType};
pub use config::{Platform, SessionConfig};
pub use error::{ZuiError, ZuiResult};
pub use id::{ElementId, IdAllocator, PageSeed};
pub use node::{Element, Prop, PropKey, Props, Tree};
pub use persist::{MemoryStorage, Persistence, Storage};
pub use record::{Mutation, MutationHistory, MutationRecord};
pub use recorder::{Recorder, RecorderState};
pub use registry::{Constructor, Registry};
pub use replay::ReplayEngine;
pub use session::Session;
pub use value::{Value, ValueKind};
