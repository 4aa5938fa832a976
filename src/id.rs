//! Element identity.
//!
//! An [`ElementId`] is an opaque string assigned when an element is created
//! and never reused within a session. Mutation records and batch patches
//! refer to elements only through it.
//!
//! # Deterministic allocation
//!
//! Hydration needs the client to rebuild the exact ids the server rendered.
//! [`IdAllocator`] therefore derives ids from a [`PageSeed`] (hash of the
//! page path) and a creation counter instead of a random source: building
//! the same page in the same order yields the same ids on both sides.
//!
//! ```
//! use zui_vdom::id::{IdAllocator, PageSeed};
//!
//! let mut server = IdAllocator::new(PageSeed::from_path("/todo"));
//! let mut client = IdAllocator::new(PageSeed::from_path("/todo"));
//! assert_eq!(server.next_id(), client.next_id());
//! ```

use std::borrow::Borrow;
use std::fmt;

use compact_str::{CompactString, format_compact};
use serde::{Deserialize, Serialize};

use crate::hash::StableHasher;

// =============================================================================
// PageSeed
// =============================================================================

/// Page-specific seed so ids from different pages never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PageSeed(pub u64);

impl PageSeed {
    /// Create a PageSeed from a page path
    pub fn from_path(path: &str) -> Self {
        Self(StableHasher::new().update_str("__page__").update_str(path).finish())
    }

    /// Zero seed (single-page or test scenarios)
    pub const fn zero() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

// =============================================================================
// ElementId
// =============================================================================

/// Stable element identifier.
///
/// Short ids (up to 24 bytes) are stored inline without heap allocation.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(CompactString);

impl ElementId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(CompactString::new(id.as_ref()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({})", self.0)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ElementId {
    fn from(s: String) -> Self {
        Self(CompactString::from(s))
    }
}

impl AsRef<str> for ElementId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ElementId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// IdAllocator
// =============================================================================

/// Hands out ids for newly created elements.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    prefix: CompactString,
    next: u64,
}

impl IdAllocator {
    pub fn new(seed: PageSeed) -> Self {
        // 8 hex digits are enough to keep pages apart and keep ids inline.
        let prefix = format_compact!("z{:08x}", seed.as_u64() as u32);
        Self { prefix, next: 0 }
    }

    /// Allocate the next id.
    pub fn next_id(&mut self) -> ElementId {
        let id = ElementId(format_compact!("{}-{}", self.prefix, self.next));
        self.next += 1;
        id
    }

    /// Account for an id created elsewhere (e.g. by replay) so it is never
    /// handed out again. Ids from other allocators are ignored.
    pub fn observe(&mut self, id: &ElementId) {
        let counter = id
            .as_str()
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('-'))
            .and_then(|n| n.parse::<u64>().ok());
        if let Some(n) = counter
            && n >= self.next
        {
            self.next = n + 1;
        }
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> u64 {
        self.next
    }
}

// =============================================================================
// Tests
// =============================================================================
