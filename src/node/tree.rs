//! Element store and tree structure.
//!
//! The tree owns every element of a session, attached or not. Detached
//! elements stay addressable by id so a later batch can re-insert them.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::category::{Category, PropType};
use crate::error::{ZuiError, ZuiResult};
use crate::id::ElementId;
use crate::value::{Value, ValueKind};

use super::element::{CHILDREN_PROP, Element, KIND_PROP};
use super::props::{Prop, PropKey};

/// Element registry keyed by id
#[derive(Debug, Clone, Default)]
pub struct Tree {
    elements: FxHashMap<ElementId, Element>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.elements.contains_key(id)
    }

    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Iterate over all elements (unordered)
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// Add a detached element. Ids are never reused.
    pub fn insert(&mut self, element: Element) -> ZuiResult<()> {
        if self.elements.contains_key(&element.id) {
            return Err(ZuiError::DuplicateElement(element.id));
        }
        self.elements.insert(element.id.clone(), element);
        Ok(())
    }

    fn require(&self, id: &ElementId) -> ZuiResult<&Element> {
        self.elements
            .get(id)
            .ok_or_else(|| ZuiError::UnknownElement(id.clone()))
    }

    fn require_mut(&mut self, id: &ElementId) -> ZuiResult<&mut Element> {
        self.elements
            .get_mut(id)
            .ok_or_else(|| ZuiError::UnknownElement(id.clone()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Structure
    // ─────────────────────────────────────────────────────────────────────────

    /// Child ids of an element (empty for unknown ids)
    pub fn children(&self, id: &ElementId) -> &[ElementId] {
        self.elements
            .get(id)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, id: &ElementId) -> Option<&ElementId> {
        self.elements.get(id)?.parent.as_ref()
    }

    /// Whether `ancestor` is a strict ancestor of `id`.
    pub fn is_ancestor(&self, ancestor: &ElementId, id: &ElementId) -> bool {
        let mut current = self.parent(id);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// Depth-first, pre-order ids of the subtree rooted at `root`.
    pub fn descendants(&self, root: &ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(id) = stack.pop() {
            if !self.contains(&id) {
                continue;
            }
            stack.extend(self.children(&id).iter().rev().cloned());
            out.push(id);
        }
        out
    }

    /// Move `child` to the end of `parent`'s children.
    ///
    /// Returns the child's previous parent when it was attached elsewhere.
    pub fn append_child(&mut self, parent: &ElementId, child: &ElementId) -> ZuiResult<Option<ElementId>> {
        let mut children = self.require(parent)?.children.to_vec();
        children.retain(|c| c != child);
        children.push(child.clone());

        let previous = self.parent(child).filter(|p| *p != parent).cloned();
        self.set_children(parent, children)?;
        Ok(previous)
    }

    /// Detach an element (with its subtree) from its parent.
    ///
    /// The element stays in the store. Returns the former parent.
    pub fn detach(&mut self, id: &ElementId) -> ZuiResult<Option<ElementId>> {
        let Some(parent) = self.require(id)?.parent.clone() else {
            return Ok(None);
        };
        let children = self.children(&parent).iter().filter(|c| *c != id).cloned().collect();
        self.set_children(&parent, children)?;
        Ok(Some(parent))
    }

    /// Replace the ordered children of `parent`.
    ///
    /// Dropped children become detached; children taken from another parent
    /// are removed there first. Every id must exist, appear once, and not be
    /// `parent` itself or one of its ancestors.
    pub fn set_children(&mut self, parent: &ElementId, children: Vec<ElementId>) -> ZuiResult<()> {
        self.require(parent)?;

        let mut seen = FxHashSet::default();
        for child in &children {
            if !self.contains(child) {
                return Err(ZuiError::UnknownElement(child.clone()));
            }
            if !seen.insert(child.clone()) {
                return Err(ZuiError::InvalidStructure {
                    parent: parent.clone(),
                    reason: format!("{child} listed twice"),
                });
            }
            if child == parent || self.is_ancestor(child, parent) {
                return Err(ZuiError::InvalidStructure {
                    parent: parent.clone(),
                    reason: format!("{child} is an ancestor"),
                });
            }
        }

        let old = std::mem::take(&mut self.require_mut(parent)?.children);
        for dropped in old.iter().filter(|c| !seen.contains(*c)) {
            if let Some(el) = self.elements.get_mut(dropped) {
                el.parent = None;
            }
        }

        for child in &children {
            let previous = self.parent(child).filter(|p| *p != parent).cloned();
            if let Some(previous) = previous
                && let Some(prev) = self.elements.get_mut(&previous)
            {
                prev.children.retain(|c| c != child);
                prev.sync_children_prop();
            }
            if let Some(el) = self.elements.get_mut(child) {
                el.parent = Some(parent.clone());
            }
        }

        let el = self.require_mut(parent)?;
        el.children = children.into_iter().collect();
        el.sync_children_prop();
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Properties
    // ─────────────────────────────────────────────────────────────────────────

    /// Own property of an element, no inheritance
    pub fn own_prop(&self, id: &ElementId, category: Category, name: &str) -> Option<&Prop> {
        self.elements.get(id)?.props.get(category, name)
    }

    /// Resolve a property, falling back to the nearest ancestor that holds
    /// the key. An ancestor's value is only visible when it is inheritable.
    pub fn resolve(&self, id: &ElementId, category: Category, name: &str) -> Option<(PropType, &Value)> {
        if let Some(prop) = self.own_prop(id, category, name) {
            return Some((prop.kind, &prop.value));
        }
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            if let Some(prop) = self.own_prop(ancestor, category, name) {
                return (prop.kind == PropType::Inheritable).then_some((PropType::Inherited, &prop.value));
            }
            current = self.parent(ancestor);
        }
        None
    }

    /// Queryable value of a property (own or inherited).
    pub fn prop(&self, id: &ElementId, category: Category, name: &str) -> Option<&Value> {
        self.resolve(id, category, name).map(|(_, v)| v)
    }

    /// Write a property directly, without going through a session.
    ///
    /// `index/children` is routed to [`Tree::set_children`]; `index/kind`
    /// only accepts the element's existing constructor name.
    /// Returns the previous own value.
    pub fn set_raw(
        &mut self,
        id: &ElementId,
        category: Category,
        name: &str,
        kind: PropType,
        value: Value,
    ) -> ZuiResult<Option<Value>> {
        match (category, name) {
            (Category::Index, KIND_PROP) => {
                let el = self.require(id)?;
                if value.as_str() == Some(el.kind.as_str()) {
                    Ok(Some(value))
                } else {
                    Err(ZuiError::ReadOnly {
                        element: id.clone(),
                        name: name.to_string(),
                    })
                }
            }
            (Category::Index, CHILDREN_PROP) => {
                let children = parse_child_list(&value)?;
                let old = self.require(id)?.value(category, name).cloned();
                self.set_children(id, children)?;
                Ok(old)
            }
            _ => {
                let el = self.require_mut(id)?;
                Ok(el.props.insert(category, name, Prop::new(kind, value)).map(|p| p.value))
            }
        }
    }

    /// Remove an own property. Reserved `index` properties cannot be removed.
    pub fn remove_raw(&mut self, id: &ElementId, category: Category, name: &str) -> ZuiResult<Option<Value>> {
        if category == Category::Index && (name == KIND_PROP || name == CHILDREN_PROP) {
            return Err(ZuiError::ReadOnly {
                element: id.clone(),
                name: name.to_string(),
            });
        }
        let el = self.require_mut(id)?;
        Ok(el.props.remove(category, name).map(|p| p.value))
    }

    /// Every non-transient own property in the tree.
    ///
    /// Two trees with equal property state are indistinguishable to replay.
    pub fn property_state(&self) -> BTreeMap<PropKey, Value> {
        self.elements
            .values()
            .flat_map(|el| {
                el.props
                    .iter()
                    .filter(|(c, _, _)| c.is_persistent())
                    .map(|(c, n, p)| (PropKey::new(el.id.clone(), c, n), p.value.clone()))
            })
            .collect()
    }
}

/// Decode an `index/children` value into ids.
pub(crate) fn parse_child_list(value: &Value) -> ZuiResult<Vec<ElementId>> {
    let mismatch = |expected, found| ZuiError::TypeMismatch {
        category: Category::Index.as_str(),
        name: CHILDREN_PROP.to_string(),
        expected,
        found,
    };
    value
        .as_list()
        .ok_or_else(|| mismatch(ValueKind::List, value.kind()))?
        .iter()
        .map(|item| {
            item.as_str()
                .map(ElementId::from)
                .ok_or_else(|| mismatch(ValueKind::String, item.kind()))
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ElementId {
        ElementId::from(s)
    }

    fn tree_with(ids: &[&str]) -> Tree {
        let mut tree = Tree::new();
        for i in ids {
            tree.insert(Element::new(id(i), "element", "div")).unwrap();
        }
        tree
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut tree = tree_with(&["a"]);
        let err = tree.insert(Element::new(id("a"), "element", "div")).unwrap_err();
        assert!(matches!(err, ZuiError::DuplicateElement(_)));
    }

    #[test]
    fn test_append_child_moves_between_parents() {
        let mut tree = tree_with(&["p1", "p2", "c"]);
        assert_eq!(tree.append_child(&id("p1"), &id("c")).unwrap(), None);
        assert_eq!(tree.children(&id("p1")), &[id("c")]);

        let previous = tree.append_child(&id("p2"), &id("c")).unwrap();
        assert_eq!(previous, Some(id("p1")));
        assert!(tree.children(&id("p1")).is_empty());
        assert_eq!(tree.parent(&id("c")), Some(&id("p2")));
        assert_eq!(
            tree.prop(&id("p1"), Category::Index, CHILDREN_PROP),
            Some(&Value::List(vec![]))
        );
    }

    #[test]
    fn test_set_children_detaches_dropped() {
        let mut tree = tree_with(&["root", "a", "b", "c"]);
        tree.set_children(&id("root"), vec![id("a"), id("b")]).unwrap();
        tree.set_children(&id("root"), vec![id("b"), id("c")]).unwrap();

        assert_eq!(tree.parent(&id("a")), None);
        assert_eq!(tree.parent(&id("c")), Some(&id("root")));
        assert!(tree.contains(&id("a")));
    }

    #[test]
    fn test_detach_keeps_element() {
        let mut tree = tree_with(&["root", "a", "a1"]);
        tree.set_children(&id("root"), vec![id("a")]).unwrap();
        tree.set_children(&id("a"), vec![id("a1")]).unwrap();

        assert_eq!(tree.detach(&id("a")).unwrap(), Some(id("root")));
        assert!(tree.children(&id("root")).is_empty());
        assert_eq!(tree.children(&id("a")), &[id("a1")]);
        assert_eq!(tree.detach(&id("a")).unwrap(), None);
    }

    #[test]
    fn test_cycles_and_duplicates_rejected() {
        let mut tree = tree_with(&["root", "a"]);
        tree.set_children(&id("root"), vec![id("a")]).unwrap();

        let err = tree.set_children(&id("a"), vec![id("root")]).unwrap_err();
        assert!(matches!(err, ZuiError::InvalidStructure { .. }));

        let err = tree.set_children(&id("root"), vec![id("a"), id("a")]).unwrap_err();
        assert!(matches!(err, ZuiError::InvalidStructure { .. }));

        let err = tree.set_children(&id("root"), vec![id("ghost")]).unwrap_err();
        assert!(matches!(err, ZuiError::UnknownElement(_)));
    }

    #[test]
    fn test_inheritable_values_flow_down() {
        let mut tree = tree_with(&["root", "mid", "leaf"]);
        tree.set_children(&id("root"), vec![id("mid")]).unwrap();
        tree.set_children(&id("mid"), vec![id("leaf")]).unwrap();

        tree.set_raw(&id("root"), Category::Ui, "theme", PropType::Inheritable, "dark".into())
            .unwrap();
        assert_eq!(
            tree.resolve(&id("leaf"), Category::Ui, "theme"),
            Some((PropType::Inherited, &Value::from("dark")))
        );

        // A local value on the way down shadows and stops inheritance.
        tree.set_raw(&id("mid"), Category::Ui, "theme", PropType::Local, "light".into())
            .unwrap();
        assert_eq!(tree.prop(&id("mid"), Category::Ui, "theme"), Some(&Value::from("light")));
        assert_eq!(tree.prop(&id("leaf"), Category::Ui, "theme"), None);
    }

    #[test]
    fn test_reserved_index_props() {
        let mut tree = tree_with(&["root", "a"]);
        let old = tree
            .set_raw(&id("root"), Category::Index, CHILDREN_PROP, PropType::Local, Value::List(vec!["a".into()]))
            .unwrap();
        assert_eq!(old, None);
        assert_eq!(tree.children(&id("root")), &[id("a")]);

        let err = tree
            .set_raw(&id("a"), Category::Index, KIND_PROP, PropType::Local, "button".into())
            .unwrap_err();
        assert!(matches!(err, ZuiError::ReadOnly { .. }));
        assert!(tree.set_raw(&id("a"), Category::Index, KIND_PROP, PropType::Local, "element".into()).is_ok());

        let err = tree
            .set_raw(&id("root"), Category::Index, CHILDREN_PROP, PropType::Local, Value::from(3))
            .unwrap_err();
        assert!(matches!(err, ZuiError::TypeMismatch { expected: ValueKind::List, .. }));
    }

    #[test]
    fn test_property_state_skips_transient() {
        let mut tree = tree_with(&["a"]);
        tree.set_raw(&id("a"), Category::Data, "text", PropType::Local, "hi".into()).unwrap();
        tree.set_raw(&id("a"), Category::Event, "click", PropType::Local, true.into()).unwrap();

        let state = tree.property_state();
        assert!(state.contains_key(&PropKey::new("a", Category::Data, "text")));
        assert!(state.contains_key(&PropKey::new("a", Category::Index, KIND_PROP)));
        assert!(!state.contains_key(&PropKey::new("a", Category::Event, "click")));
    }

    #[test]
    fn test_descendants_preorder() {
        let mut tree = tree_with(&["r", "a", "b", "a1"]);
        tree.set_children(&id("r"), vec![id("a"), id("b")]).unwrap();
        tree.set_children(&id("a"), vec![id("a1")]).unwrap();
        assert_eq!(tree.descendants(&id("r")), vec![id("r"), id("a"), id("a1"), id("b")]);
    }
}
