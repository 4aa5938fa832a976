//! Session - the context object every mutation flows through.
//!
//! A session owns the element tree, the recorder, the id allocator and a
//! shared handle to the constructor registry. Constructors receive the
//! session explicitly, so there is no process-wide element store.
//!
//! # Write paths
//!
//! | Path | Recorded | Used by |
//! |------|----------|---------|
//! | [`Session::set`] / [`Session::set_inheritable`] | when capturing | application code |
//! | [`Session::set_default`] | never | constructors |
//! | [`Session::dispatch`] | only if allowed | event handlers |
//! | `Tree::set_raw` | never | replay |
//!
//! ```
//! use std::sync::Arc;
//! use zui_vdom::prelude::*;
//!
//! fn label(session: &mut Session, id: &ElementId) -> ZuiResult<()> {
//!     session.set_default(id, Category::Ui, "text", Value::from(""))
//! }
//!
//! let registry = Arc::new(Registry::new().with("label", "span", label));
//! let mut session = Session::new(registry, SessionConfig::server("/"));
//! let root = session.mount("label")?;
//! session.set(&root, Category::Ui, "text", Value::from("hello"))?;
//!
//! assert_eq!(session.prop(&root, Category::Ui, "text"), Some(&Value::from("hello")));
//! // Root creation plus the text write
//! assert_eq!(session.history().len(), 2);
//! # Ok::<(), ZuiError>(())
//! ```

use std::fmt;
use std::sync::Arc;

use crate::algo::{edit_script, encode_batch};
use crate::category::{Category, PropType};
use crate::config::{Platform, SessionConfig};
use crate::error::{ZuiError, ZuiResult};
use crate::id::{ElementId, IdAllocator};
use crate::node::{CHILDREN_PROP, Element, KIND_PROP, Tree, parse_child_list};
use crate::persist::{Persistence, Storage};
use crate::record::{Mutation, MutationHistory, MutationRecord};
use crate::recorder::Recorder;
use crate::registry::{Entry, Registry};
use crate::value::Value;

/// Callback invoked for every intercepted mutation, recorded or not.
pub type Observer = Box<dyn FnMut(&Mutation<'_>)>;

/// Element tree plus everything needed to mutate it.
pub struct Session {
    tree: Tree,
    recorder: Recorder,
    ids: IdAllocator,
    registry: Arc<Registry>,
    config: SessionConfig,
    root: Option<ElementId>,
    /// Server only: the latest intercepted mutation, transient ones included
    last_mutation: Option<MutationRecord>,
    observers: Vec<Observer>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("platform", &self.config.platform)
            .field("root", &self.root)
            .field("elements", &self.tree.len())
            .field("recorder", &self.recorder.state())
            .field("records", &self.recorder.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Session {
    pub fn new(registry: Arc<Registry>, config: SessionConfig) -> Self {
        let mut recorder = Recorder::new();
        if config.capture_on_start {
            recorder.capture();
        }
        Self {
            tree: Tree::new(),
            recorder,
            ids: IdAllocator::new(config.seed),
            registry,
            config,
            root: None,
            last_mutation: None,
            observers: Vec::new(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut Recorder {
        &mut self.recorder
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Root element, once [`Session::mount`] has run.
    pub fn root(&self) -> Option<&ElementId> {
        self.root.as_ref()
    }

    pub fn history(&self) -> &MutationHistory {
        self.recorder.history()
    }

    /// Latest intercepted mutation (server sessions only).
    pub fn last_mutation(&self) -> Option<&MutationRecord> {
        self.last_mutation.as_ref()
    }

    /// Queryable value of a property, own or inherited.
    pub fn prop(&self, id: &ElementId, category: Category, name: &str) -> Option<&Value> {
        self.tree.prop(id, category, name)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Recorder lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Start capturing mutations.
    pub fn capture(&mut self) {
        self.recorder.capture();
    }

    /// Stop capturing and drop the in-memory history.
    pub fn clear(&mut self) {
        self.recorder.clear();
    }

    /// [`Session::clear`] plus removal of the persisted history.
    pub fn clear_persisted<S: Storage>(&mut self, persistence: &Persistence<S>) -> ZuiResult<()> {
        self.recorder.clear();
        persistence.clear_history()
    }

    /// Save the captured history through the adapter.
    pub fn persist<S: Storage>(&self, persistence: &Persistence<S>) -> ZuiResult<()> {
        self.recorder.persist(persistence)
    }

    /// Register a mutation observer.
    pub fn on_mutation(&mut self, observer: impl FnMut(&Mutation<'_>) + 'static) {
        self.observers.push(Box::new(observer));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Construction
    // ─────────────────────────────────────────────────────────────────────────

    /// Create the root element.
    pub fn mount(&mut self, kind: &str) -> ZuiResult<ElementId> {
        let id = self.create(kind)?;
        self.root = Some(id.clone());
        Ok(id)
    }

    /// Create a detached element with a freshly allocated id.
    pub fn create(&mut self, kind: &str) -> ZuiResult<ElementId> {
        let entry = self.registry.get(kind)?;
        let id = self.ids.next_id();
        self.construct(kind, entry, id.clone())?;
        Ok(id)
    }

    /// Create a detached element under a known id.
    ///
    /// Later allocations skip past `id` when it comes from this session's
    /// allocator.
    pub fn create_with_id(&mut self, kind: &str, id: ElementId) -> ZuiResult<()> {
        let entry = self.registry.get(kind)?;
        if self.tree.contains(&id) {
            return Err(ZuiError::DuplicateElement(id));
        }
        self.ids.observe(&id);
        self.construct(kind, entry, id)
    }

    fn construct(&mut self, kind: &str, entry: Entry, id: ElementId) -> ZuiResult<()> {
        self.tree.insert(Element::new(id.clone(), kind, entry.tag))?;
        // The creation record precedes everything the constructor records.
        self.intercept(&id, Category::Index, KIND_PROP, PropType::Default, None, Value::from(kind));
        tracing::trace!(element = %id, kind, "element created");
        (entry.constructor)(self, &id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Property writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Set a local property (intercepted path).
    pub fn set(&mut self, id: &ElementId, category: Category, name: &str, value: Value) -> ZuiResult<()> {
        self.write(id, category, name, PropType::Local, value)
    }

    /// Set a property that descendants without their own value inherit.
    pub fn set_inheritable(
        &mut self,
        id: &ElementId,
        category: Category,
        name: &str,
        value: Value,
    ) -> ZuiResult<()> {
        self.write(id, category, name, PropType::Inheritable, value)
    }

    /// Constructor default. Never recorded or observed.
    pub fn set_default(&mut self, id: &ElementId, category: Category, name: &str, value: Value) -> ZuiResult<()> {
        self.registry.check(category, name, &value)?;
        self.tree.set_raw(id, category, name, PropType::Default, value)?;
        Ok(())
    }

    /// Deliver an event as a write to the `event` category.
    pub fn dispatch(&mut self, id: &ElementId, event: &str, payload: Value) -> ZuiResult<()> {
        self.write(id, Category::Event, event, PropType::Local, payload)
    }

    fn write(
        &mut self,
        id: &ElementId,
        category: Category,
        name: &str,
        kind: PropType,
        value: Value,
    ) -> ZuiResult<()> {
        if category == Category::Index && name == CHILDREN_PROP {
            let children = parse_child_list(&value)?;
            return self.set_children(id, children);
        }
        self.registry.check(category, name, &value)?;
        let old = self.tree.set_raw(id, category, name, kind, value.clone())?;
        if category == Category::Index && name == KIND_PROP {
            // Accepted only when unchanged.
            return Ok(());
        }
        self.intercept(id, category, name, kind, old, value);
        Ok(())
    }

    fn intercept(
        &mut self,
        id: &ElementId,
        category: Category,
        name: &str,
        kind: PropType,
        old: Option<Value>,
        new: Value,
    ) {
        let mutation = Mutation {
            element_id: id,
            category,
            property_name: name,
            old_value: old.as_ref(),
            new_value: &new,
        };
        for observer in &mut self.observers {
            observer(&mutation);
        }

        let last = (self.config.platform == Platform::Server).then(|| (old.clone(), new.clone()));
        let sequence = self.recorder.record(id, category, name, kind, old, new);
        if let Some((old_value, new_value)) = last {
            tracing::trace!(element = %id, category = %category, name, ?sequence, "mutation");
            self.last_mutation = Some(MutationRecord {
                element_id: id.clone(),
                category,
                property_name: name.to_string(),
                old_value,
                new_value,
                prop_type: kind,
                sequence: sequence.unwrap_or(0),
            });
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Structure
    // ─────────────────────────────────────────────────────────────────────────

    /// Move `child` to the end of `parent`'s children.
    pub fn append_child(&mut self, parent: &ElementId, child: &ElementId) -> ZuiResult<()> {
        if !self.tree.contains(parent) {
            return Err(ZuiError::UnknownElement(parent.clone()));
        }
        let mut children = self.tree.children(parent).to_vec();
        children.retain(|c| c != child);
        children.push(child.clone());
        self.set_children(parent, children)
    }

    /// Detach an element from its parent. The element stays addressable.
    pub fn detach(&mut self, id: &ElementId) -> ZuiResult<()> {
        let Some(parent) = self.tree.get(id).ok_or_else(|| ZuiError::UnknownElement(id.clone()))?.parent.clone()
        else {
            return Ok(());
        };
        let children = self.tree.children(&parent).iter().filter(|c| *c != id).cloned().collect();
        self.set_children(&parent, children)
    }

    /// Replace the ordered children of `parent`.
    ///
    /// Records the new `index/children` of `parent` and of every parent a
    /// child was taken from.
    pub fn set_children(&mut self, parent: &ElementId, children: Vec<ElementId>) -> ZuiResult<()> {
        let mut touched: Vec<(ElementId, Option<Value>)> = Vec::new();
        for child in &children {
            if let Some(previous) = self.tree.parent(child)
                && previous != parent
                && !touched.iter().any(|(id, _)| id == previous)
            {
                touched.push((previous.clone(), children_value(&self.tree, previous)));
            }
        }
        touched.push((parent.clone(), children_value(&self.tree, parent)));

        self.tree.set_children(parent, children)?;

        for (id, old) in touched {
            let new = children_value(&self.tree, &id).unwrap_or_else(|| Value::List(Vec::new()));
            if old.as_ref() != Some(&new) {
                self.intercept(&id, Category::Index, CHILDREN_PROP, PropType::Local, old, new);
            }
        }
        Ok(())
    }

    /// Reorder `parent`'s children to `desired` and return the edit script
    /// as a base64 batch for the native side.
    pub fn reconcile_children(&mut self, parent: &ElementId, desired: &[ElementId]) -> ZuiResult<String> {
        if !self.tree.contains(parent) {
            return Err(ZuiError::UnknownElement(parent.clone()));
        }
        let ops = edit_script(self.tree.children(parent), desired);
        let batch = encode_batch(&ops)?;
        self.set_children(parent, desired.to_vec())?;
        tracing::debug!(parent = %parent, ops = ops.len(), "children reconciled");
        Ok(batch)
    }
}

fn children_value(tree: &Tree, id: &ElementId) -> Option<Value> {
    tree.own_prop(id, Category::Index, CHILDREN_PROP).map(|p| p.value.clone())
}

// =============================================================================
// Tests
// =============================================================================
