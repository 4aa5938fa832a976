//! Replay engine and the hydrate lifecycle.
//!
//! Replay rebuilds a session from a history without running application
//! logic beyond the registered constructors:
//!
//! 1. Validate every record (registered constructor, declared value kinds).
//!    Nothing is applied if one fails. Transient records the engine does
//!    not [allow](ReplayEngine::allow) are skipped, not rejected.
//! 2. Mount the root in a fresh, idle session.
//! 3. Apply records in sequence order straight to the tree. Elements that
//!    do not exist yet are constructed on demand, from their recorded
//!    `index/kind` or as [`DEFAULT_KIND`].
//! 4. Adopt the history so later captures continue its sequence.
//!
//! [`ReplayEngine::hydrate`] wraps this with the recovery policy: a history
//! that fails to load or replay is cleared and the tree is rebuilt from its
//! root constructor.

use std::sync::Arc;

use compact_str::CompactString;
use rustc_hash::FxHashSet;

use crate::category::Category;
use crate::config::SessionConfig;
use crate::error::{ZuiError, ZuiResult};
use crate::id::ElementId;
use crate::node::{CHILDREN_PROP, KIND_PROP, parse_child_list};
use crate::persist::{Persistence, Storage};
use crate::record::{MutationHistory, MutationRecord};
use crate::registry::{DEFAULT_KIND, Registry};
use crate::session::Session;
use crate::value::ValueKind;

/// Builds sessions from histories.
#[derive(Debug, Clone)]
pub struct ReplayEngine {
    registry: Arc<Registry>,
    config: SessionConfig,
    /// Transient properties accepted in a history
    allowed: FxHashSet<(Category, CompactString)>,
}

impl ReplayEngine {
    pub fn new(registry: Arc<Registry>, config: SessionConfig) -> Self {
        Self {
            registry,
            config,
            allowed: FxHashSet::default(),
        }
    }

    /// Accept (and keep recording) a transient property, mirroring
    /// `Recorder::allow`.
    pub fn allow(mut self, category: Category, name: &str) -> Self {
        self.allowed.insert((category, CompactString::new(name)));
        self
    }

    fn session(&self) -> Session {
        let mut session = Session::new(Arc::clone(&self.registry), self.config.clone().idle());
        for (category, name) in &self.allowed {
            session.recorder_mut().allow(*category, name);
        }
        session
    }

    /// Fresh session with only the root constructed.
    pub fn rebuild(&self, root_kind: &str) -> ZuiResult<Session> {
        let mut session = self.session();
        session.mount(root_kind)?;
        Ok(session)
    }

    /// Rebuild a session from `history`.
    ///
    /// The returned session is idle; call `capture()` to continue recording.
    pub fn replay(&self, history: MutationHistory, root_kind: &str) -> ZuiResult<Session> {
        let mut ordered: Vec<&MutationRecord> = history.iter().filter(|r| self.admits(r)).collect();
        for record in &ordered {
            self.validate(record).map_err(|e| e.at_sequence(record.sequence))?;
        }

        let mut session = self.rebuild(root_kind)?;
        ordered.sort_by_key(|r| r.sequence);
        for record in ordered {
            apply(&mut session, record).map_err(|e| e.at_sequence(record.sequence))?;
        }

        tracing::info!(
            records = history.len(),
            elements = session.tree().len(),
            "history replayed"
        );
        session.recorder_mut().restore(history);
        Ok(session)
    }

    /// Load, replay and start capturing.
    ///
    /// A missing history rebuilds from the root constructor. A history that
    /// fails to decode or replay is logged, deleted from storage, and also
    /// rebuilt. Only a failing rebuild is returned as an error.
    pub fn hydrate<S: Storage>(&self, persistence: &Persistence<S>, root_kind: &str) -> ZuiResult<Session> {
        let attempt = persistence
            .load_history()
            .and_then(|history| history.map(|h| self.replay(h, root_kind)).transpose());

        let mut session = match attempt {
            Ok(Some(session)) => session,
            Ok(None) => {
                tracing::debug!(root = root_kind, "no stored history, building fresh");
                self.rebuild(root_kind)?
            }
            Err(error) => {
                tracing::warn!(%error, root = root_kind, "discarding stored history");
                persistence.clear_history()?;
                let session = self.rebuild(root_kind)?;
                tracing::info!(elements = session.tree().len(), "rebuilt from constructors");
                session
            }
        };
        session.capture();
        Ok(session)
    }

    /// Transient records only replay when allowed.
    fn admits(&self, record: &MutationRecord) -> bool {
        let category = record.category;
        if !category.is_transient() || self.allowed.contains(&(category, CompactString::new(&record.property_name))) {
            return true;
        }
        tracing::debug!(
            element = %record.element_id,
            category = %category,
            name = %record.property_name,
            sequence = record.sequence,
            "transient record skipped"
        );
        false
    }

    fn validate(&self, record: &MutationRecord) -> ZuiResult<()> {
        let category = record.category;
        let name = record.property_name.as_str();
        match (category, name) {
            (Category::Index, KIND_PROP) => {
                let kind = record.new_value.as_str().ok_or_else(|| ZuiError::TypeMismatch {
                    category: category.as_str(),
                    name: name.to_string(),
                    expected: ValueKind::String,
                    found: record.new_value.kind(),
                })?;
                self.registry.get(kind).map(|_| ())
            }
            (Category::Index, CHILDREN_PROP) => parse_child_list(&record.new_value).map(|_| ()),
            _ => self.registry.check(category, name, &record.new_value),
        }
    }
}

fn apply(session: &mut Session, record: &MutationRecord) -> ZuiResult<()> {
    let id = &record.element_id;
    match (record.category, record.property_name.as_str()) {
        (Category::Index, KIND_PROP) => {
            if !session.tree().contains(id) {
                let kind = record.new_value.as_str().unwrap_or(DEFAULT_KIND);
                session.create_with_id(kind, id.clone())?;
            }
            Ok(())
        }
        (Category::Index, CHILDREN_PROP) => {
            ensure(session, id)?;
            let children = parse_child_list(&record.new_value)?;
            for child in &children {
                ensure(session, child)?;
            }
            session.tree_mut().set_children(id, children)
        }
        (category, name) => {
            ensure(session, id)?;
            session
                .tree_mut()
                .set_raw(id, category, name, record.prop_type, record.new_value.clone())?;
            Ok(())
        }
    }
}

/// Construct `id` as a default element if the history never created it.
fn ensure(session: &mut Session, id: &ElementId) -> ZuiResult<()> {
    if !session.tree().contains(id) {
        tracing::debug!(element = %id, "element built on demand");
        session.create_with_id(DEFAULT_KIND, id.clone())?;
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
