//! Named element constructors and property schema.
//!
//! Replay can run before any application code has executed, so it cannot
//! rely on closures captured at call sites. Constructors are plain `fn`
//! items registered under a stable name once at startup; replay resolves
//! them by that name.
//!
//! ```
//! use zui_vdom::prelude::*;
//!
//! fn counter(session: &mut Session, id: &ElementId) -> ZuiResult<()> {
//!     session.set_default(id, Category::Data, "count", Value::from(0))
//! }
//!
//! let registry = Registry::new()
//!     .with("counter", "span", counter)
//!     .expect(Category::Data, "count", ValueKind::Number);
//! assert!(registry.contains("counter"));
//! ```

use compact_str::CompactString;
use rustc_hash::FxHashMap;

use crate::category::Category;
use crate::error::{ZuiError, ZuiResult};
use crate::id::ElementId;
use crate::session::Session;
use crate::value::{Value, ValueKind};

/// Kind used when replay meets an element with no recorded constructor.
pub const DEFAULT_KIND: &str = "element";

/// Element constructor: initializes the freshly inserted element `id`.
///
/// Defaults written with [`Session::set_default`] are not recorded, since
/// running the constructor again during replay reproduces them.
pub type Constructor = fn(&mut Session, &ElementId) -> ZuiResult<()>;

/// Registered constructor
#[derive(Debug, Clone, Copy)]
pub struct Entry {
    /// HTML tag of elements built by this constructor
    pub tag: &'static str,
    pub constructor: Constructor,
}

fn bare(_: &mut Session, _: &ElementId) -> ZuiResult<()> {
    Ok(())
}

/// Constructor table plus optional value-kind expectations per property.
#[derive(Debug, Clone)]
pub struct Registry {
    constructors: FxHashMap<CompactString, Entry>,
    schema: FxHashMap<(Category, CompactString), ValueKind>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Registry holding only [`DEFAULT_KIND`] (a bare `div`).
    pub fn new() -> Self {
        let mut constructors = FxHashMap::default();
        constructors.insert(
            CompactString::new(DEFAULT_KIND),
            Entry {
                tag: "div",
                constructor: bare,
            },
        );
        Self {
            constructors,
            schema: FxHashMap::default(),
        }
    }

    /// Register (or replace) a constructor.
    pub fn register(&mut self, name: &str, tag: &'static str, constructor: Constructor) -> &mut Self {
        self.constructors
            .insert(CompactString::new(name), Entry { tag, constructor });
        self
    }

    /// Builder form of [`Registry::register`]
    pub fn with(mut self, name: &str, tag: &'static str, constructor: Constructor) -> Self {
        self.register(name, tag, constructor);
        self
    }

    /// Declare the value kind a property must hold.
    pub fn expect(mut self, category: Category, name: &str, kind: ValueKind) -> Self {
        self.schema.insert((category, CompactString::new(name)), kind);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn get(&self, name: &str) -> ZuiResult<Entry> {
        self.constructors
            .get(name)
            .copied()
            .ok_or_else(|| ZuiError::UnknownConstructor(name.to_string()))
    }

    /// Check a value against the declared kind, if any. Non-finite numbers
    /// are always rejected.
    pub fn check(&self, category: Category, name: &str, value: &Value) -> ZuiResult<()> {
        if !value.is_finite() {
            return Err(ZuiError::NonFiniteNumber {
                category: category.as_str(),
                name: name.to_string(),
            });
        }
        match self.schema.get(&(category, CompactString::new(name))) {
            Some(&expected) if expected != value.kind() => Err(ZuiError::TypeMismatch {
                category: category.as_str(),
                name: name.to_string(),
                expected,
                found: value.kind(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut Session, _: &ElementId) -> ZuiResult<()> {
        Ok(())
    }

    #[test]
    fn test_default_kind_always_present() {
        let registry = Registry::new();
        assert_eq!(registry.get(DEFAULT_KIND).unwrap().tag, "div");
    }

    #[test]
    fn test_unknown_constructor() {
        let registry = Registry::new().with("button", "button", noop);
        assert!(registry.contains("button"));
        assert!(matches!(
            registry.get("slider"),
            Err(ZuiError::UnknownConstructor(name)) if name == "slider"
        ));
    }

    #[test]
    fn test_schema_check() {
        let registry = Registry::new().expect(Category::Data, "count", ValueKind::Number);
        assert!(registry.check(Category::Data, "count", &Value::from(3)).is_ok());
        assert!(registry.check(Category::Data, "other", &Value::from("x")).is_ok());

        let err = registry
            .check(Category::Data, "count", &Value::from("three"))
            .unwrap_err();
        assert_eq!(err.to_string(), "data/count expects number, found string");
    }

    #[test]
    fn test_non_finite_rejected() {
        let registry = Registry::new();
        let err = registry
            .check(Category::Css, "opacity", &Value::from(f64::INFINITY))
            .unwrap_err();
        assert!(matches!(err, ZuiError::NonFiniteNumber { category: "css", .. }));
        assert_eq!(err.to_string(), "css/opacity holds a non-finite number");
    }
}
