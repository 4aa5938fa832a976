//! Element tree: elements, their properties, and the store that owns them.
//!
//! Structure is id-based. An element lists its children by [`ElementId`]
//! and points back at its parent; the [`Tree`] resolves ids to elements.
//! The ordered child list is mirrored into the reserved `index/children`
//! property so structure can be recorded and replayed like any other
//! mutation.
//!
//! [`ElementId`]: crate::id::ElementId

mod element;
mod props;
mod tree;

pub use element::{CHILDREN_PROP, Children, Element, KIND_PROP};
pub use props::{Prop, PropKey, Props};
pub use tree::Tree;

pub(crate) use tree::parse_child_list;
