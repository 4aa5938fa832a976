//! Property namespaces and property kinds.
//!
//! Every property lives in one [`Category`]. Two of them, `event` and
//! `internals`, carry runtime signalling only: they are never recorded,
//! persisted, or replayed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ZuiError, ZuiResult};

// =============================================================================
// Category
// =============================================================================

/// Namespace partition of an element's properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Data,
    Ui,
    Css,
    Event,
    Internals,
    Index,
}

impl Category {
    /// All categories, in wire order.
    pub const ALL: [Category; 6] = [
        Self::Data,
        Self::Ui,
        Self::Css,
        Self::Event,
        Self::Internals,
        Self::Index,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Ui => "ui",
            Self::Css => "css",
            Self::Event => "event",
            Self::Internals => "internals",
            Self::Index => "index",
        }
    }

    /// Transient categories are runtime signals, not durable state.
    #[inline]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Event | Self::Internals)
    }

    /// Inverse of `is_transient`
    #[inline]
    pub const fn is_persistent(self) -> bool {
        !self.is_transient()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ZuiError;

    fn from_str(s: &str) -> ZuiResult<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ZuiError::UnknownCategory(s.to_string()))
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// PropType
// =============================================================================

/// How a property value came to be on an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PropType {
    /// Set by the element's constructor
    #[default]
    Default,
    /// Received from an ancestor's inheritable value
    Inherited,
    /// Set directly on the element
    Local,
    /// Set directly and pushed down to descendants
    Inheritable,
}

impl PropType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::Inherited => "Inherited",
            Self::Local => "Local",
            Self::Inheritable => "Inheritable",
        }
    }

    /// Local and inheritable values shadow inherited ones.
    #[inline]
    pub const fn is_own(self) -> bool {
        matches!(self, Self::Local | Self::Inheritable)
    }

    /// Encode an index entry: `"<PropType>/<name>"`.
    pub fn tag(self, name: &str) -> String {
        format!("{}/{}", self.as_str(), name)
    }

    /// Decode an index entry produced by [`PropType::tag`].
    pub fn parse_tag(tag: &str) -> Option<(PropType, &str)> {
        let (kind, name) = tag.split_once('/')?;
        let kind = match kind {
            "Default" => Self::Default,
            "Inherited" => Self::Inherited,
            "Local" => Self::Local,
            "Inheritable" => Self::Inheritable,
            _ => return None,
        };
        Some((kind, name))
    }
}

impl fmt::Display for PropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Tests
// =============================================================================
