//! Element type - one node of the UI tree
//!
//! Elements never own each other: structure is expressed through ids, and
//! the [`Tree`](super::Tree) owns every element.

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::category::{Category, PropType};
use crate::id::ElementId;
use crate::value::Value;

use super::props::{Prop, Props};

/// Reserved `index` property holding the element's constructor name.
pub const KIND_PROP: &str = "kind";

/// Reserved `index` property mirroring the ordered child ids.
pub const CHILDREN_PROP: &str = "children";

/// Ordered child ids
pub type Children = SmallVec<[ElementId; 8]>;

/// UI element
#[derive(Debug, Clone)]
pub struct Element {
    pub id: ElementId,
    /// Registered constructor name
    pub kind: CompactString,
    /// HTML tag used when rendering
    pub tag: CompactString,
    pub props: Props,
    pub parent: Option<ElementId>,
    pub children: Children,
}

impl Element {
    /// Create a detached element. The constructor name is mirrored into
    /// `index/kind` so it shows up in the persisted state.
    pub fn new(id: ElementId, kind: &str, tag: &str) -> Self {
        let mut props = Props::new();
        props.insert(
            Category::Index,
            KIND_PROP,
            Prop::new(PropType::Default, Value::from(kind)),
        );
        Self {
            id,
            kind: CompactString::new(kind),
            tag: CompactString::new(tag),
            props,
            parent: None,
            children: SmallVec::new(),
        }
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.parent.is_some()
    }

    /// Own value of a property (no inheritance)
    pub fn value(&self, category: Category, name: &str) -> Option<&Value> {
        self.props.value(category, name)
    }

    /// Rewrite `index/children` from the child list.
    pub(crate) fn sync_children_prop(&mut self) {
        let ids = self
            .children
            .iter()
            .map(|c| Value::from(c.as_str()))
            .collect::<Vec<_>>();
        self.props.insert(
            Category::Index,
            CHILDREN_PROP,
            Prop::new(PropType::Local, Value::List(ids)),
        );
    }
}
