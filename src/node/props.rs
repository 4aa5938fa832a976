//! Per-element property storage.

use std::collections::BTreeMap;

use crate::category::{Category, PropType};
use crate::id::ElementId;
use crate::value::Value;

/// A stored property value and how it got there.
#[derive(Debug, Clone, PartialEq)]
pub struct Prop {
    pub kind: PropType,
    pub value: Value,
}

impl Prop {
    pub fn new(kind: PropType, value: Value) -> Self {
        Self { kind, value }
    }
}

/// Fully-qualified property address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropKey {
    pub element_id: ElementId,
    pub category: Category,
    pub name: String,
}

impl PropKey {
    pub fn new(element_id: impl Into<ElementId>, category: Category, name: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
            category,
            name: name.into(),
        }
    }
}

/// Properties of one element, grouped by category.
///
/// Ordered maps keep iteration (and therefore persisted indexes) stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    inner: BTreeMap<Category, BTreeMap<String, Prop>>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: Category, name: &str) -> Option<&Prop> {
        self.inner.get(&category)?.get(name)
    }

    pub fn value(&self, category: Category, name: &str) -> Option<&Value> {
        self.get(category, name).map(|p| &p.value)
    }

    /// Insert or replace, returning the previous prop.
    pub fn insert(&mut self, category: Category, name: impl Into<String>, prop: Prop) -> Option<Prop> {
        self.inner.entry(category).or_default().insert(name.into(), prop)
    }

    pub fn remove(&mut self, category: Category, name: &str) -> Option<Prop> {
        let names = self.inner.get_mut(&category)?;
        let removed = names.remove(name);
        if names.is_empty() {
            self.inner.remove(&category);
        }
        removed
    }

    /// Categories that hold at least one property
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.inner.keys().copied()
    }

    /// Properties of one category, by name.
    pub fn in_category(&self, category: Category) -> impl Iterator<Item = (&str, &Prop)> {
        self.inner
            .get(&category)
            .into_iter()
            .flat_map(|names| names.iter().map(|(n, p)| (n.as_str(), p)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &str, &Prop)> {
        self.inner
            .iter()
            .flat_map(|(c, names)| names.iter().map(move |(n, p)| (*c, n.as_str(), p)))
    }

    pub fn len(&self) -> usize {
        self.inner.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_remove() {
        let mut props = Props::new();
        assert!(props.insert(Category::Data, "text", Prop::new(PropType::Local, "a".into())).is_none());
        let old = props.insert(Category::Data, "text", Prop::new(PropType::Local, "b".into()));
        assert_eq!(old.map(|p| p.value), Some(Value::from("a")));
        assert_eq!(props.value(Category::Data, "text"), Some(&Value::from("b")));
        assert_eq!(props.len(), 1);

        props.remove(Category::Data, "text");
        assert!(props.is_empty());
        assert_eq!(props.categories().count(), 0);
    }

    #[test]
    fn test_iteration_is_ordered() {
        let mut props = Props::new();
        props.insert(Category::Css, "width", Prop::new(PropType::Local, "1px".into()));
        props.insert(Category::Data, "b", Prop::new(PropType::Local, 1.into()));
        props.insert(Category::Data, "a", Prop::new(PropType::Local, 2.into()));

        let keys: Vec<_> = props.iter().map(|(c, n, _)| (c, n)).collect();
        assert_eq!(
            keys,
            vec![(Category::Data, "a"), (Category::Data, "b"), (Category::Css, "width")]
        );
    }
}
