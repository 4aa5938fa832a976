//! Persistence adapter over a string key-value store.
//!
//! The core only needs `get`/`set`/`delete`; a browser binding implements
//! [`Storage`] over `localStorage`, servers and tests use [`MemoryStorage`].
//!
//! # Availability
//!
//! The store counts as available only when the sentinel key
//! [`CONNECTED_KEY`] is present. Without it every operation is a no-op and
//! the session runs memory-only.
//!
//! # Element layout
//!
//! ```text
//! "<id>"                  → ["data","ui"]                 categories
//! "<id>/<category>"       → ["Local/text","Inheritable/theme"]  tagged names
//! "<id>/<category>/<name>"→ "<JSON value>"                JSON string of the value's JSON
//! ```
//!
//! Values are encoded twice: the value's JSON text is itself stored as a
//! JSON string, so `"A"` lands as `"\"A\""`.
//!
//! Loading one element costs `1 + categories + properties` point lookups.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::category::{Category, PropType};
use crate::error::{ZuiError, ZuiResult};
use crate::id::ElementId;
use crate::node::{Element, Prop, Props, Tree};
use crate::record::MutationHistory;
use crate::value::Value;

/// Sentinel key marking the store as available.
pub const CONNECTED_KEY: &str = "zui-connected";

/// Key the serialized history is stored under.
pub const DEFAULT_HISTORY_KEY: &str = "zui-history";

// =============================================================================
// Storage
// =============================================================================

/// Synchronous string key-value store.
pub trait Storage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn delete(&self, key: &str);
    fn keys(&self) -> Vec<String>;
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<FxHashMap<String, String>>>,
}

impl MemoryStorage {
    /// Empty store without the sentinel (persistence disabled).
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store with the sentinel already written.
    pub fn connected() -> Self {
        let storage = Self::new();
        storage.set(CONNECTED_KEY, "true".to_string());
        storage
    }

    pub fn with_read<R>(&self, f: impl FnOnce(&FxHashMap<String, String>) -> R) -> R {
        let guard = self.inner.read();
        f(&guard)
    }

    pub fn with_write<R>(&self, f: impl FnOnce(&mut FxHashMap<String, String>) -> R) -> R {
        let mut guard = self.inner.write();
        f(&mut guard)
    }

    pub fn len(&self) -> usize {
        self.with_read(|m| m.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.with_read(|m| m.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) {
        self.with_write(|m| {
            m.insert(key.to_string(), value);
        });
    }

    fn delete(&self, key: &str) {
        self.with_write(|m| {
            m.remove(key);
        });
    }

    fn keys(&self) -> Vec<String> {
        self.with_read(|m| m.keys().cloned().collect())
    }
}

// =============================================================================
// Persistence
// =============================================================================

/// Element state and history on top of a [`Storage`].
#[derive(Debug, Clone)]
pub struct Persistence<S> {
    storage: S,
    history_key: String,
}

fn category_key(id: &ElementId, category: Category) -> String {
    format!("{id}/{category}")
}

fn prop_key(id: &ElementId, category: Category, name: &str) -> String {
    format!("{id}/{category}/{name}")
}

impl<S: Storage> Persistence<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            history_key: DEFAULT_HISTORY_KEY.to_string(),
        }
    }

    /// Store the history under another key (several documents per store).
    pub fn with_history_key(mut self, key: impl Into<String>) -> Self {
        self.history_key = key.into();
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn history_key(&self) -> &str {
        &self.history_key
    }

    pub fn is_connected(&self) -> bool {
        self.storage.get(CONNECTED_KEY).is_some()
    }

    /// Write the sentinel, enabling persistence.
    pub fn connect(&self) {
        self.storage.set(CONNECTED_KEY, "true".to_string());
    }

    fn available(&self, op: &'static str) -> bool {
        let connected = self.is_connected();
        if !connected {
            tracing::debug!(op, "storage not connected, skipping");
        }
        connected
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Element state
    // ─────────────────────────────────────────────────────────────────────────

    /// Write an element's non-transient own properties, replacing whatever
    /// was stored for it before.
    pub fn save_element(&self, element: &Element) -> ZuiResult<()> {
        if !self.available("save_element") {
            return Ok(());
        }
        self.delete_entries(&element.id);

        let id = &element.id;
        let categories: Vec<Category> = element.props.categories().filter(|c| c.is_persistent()).collect();
        for &category in &categories {
            let mut names = Vec::new();
            for (name, prop) in element.props.in_category(category) {
                let key = prop_key(id, category, name);
                self.storage.set(&key, encode_value(&key, &prop.value)?);
                names.push(prop.kind.tag(name));
            }
            self.storage.set(&category_key(id, category), encode_list(&names)?);
        }
        self.storage.set(id.as_str(), encode_list(&categories)?);
        Ok(())
    }

    /// Save every element of a tree.
    pub fn save_tree(&self, tree: &Tree) -> ZuiResult<()> {
        tree.iter().try_for_each(|el| self.save_element(el))
    }

    /// Read an element's stored properties.
    ///
    /// Malformed entries are logged and skipped; a malformed top-level index
    /// drops the whole element.
    pub fn load_element(&self, id: &ElementId) -> Option<Props> {
        if !self.available("load_element") {
            return None;
        }
        let raw = self.storage.get(id.as_str())?;
        let categories: Vec<String> = match serde_json::from_str(&raw) {
            Ok(c) => c,
            Err(error) => {
                tracing::warn!(element = %id, %error, "malformed element index, skipping element");
                return None;
            }
        };

        let mut props = Props::new();
        for name in categories {
            let category = match name.parse::<Category>() {
                Ok(c) => c,
                Err(error) => {
                    tracing::warn!(element = %id, %error, "skipping stored category");
                    continue;
                }
            };
            self.load_category(id, category, &mut props);
        }
        Some(props)
    }

    fn load_category(&self, id: &ElementId, category: Category, props: &mut Props) {
        let key = category_key(id, category);
        let Some(raw) = self.storage.get(&key) else {
            tracing::warn!(key, "category index missing");
            return;
        };
        let tags: Vec<String> = match serde_json::from_str(&raw) {
            Ok(t) => t,
            Err(error) => {
                tracing::warn!(key, %error, "malformed category index, skipping category");
                return;
            }
        };
        for tag in &tags {
            let Some((kind, name)) = PropType::parse_tag(tag) else {
                tracing::warn!(key, tag, "malformed property tag, skipping");
                continue;
            };
            let key = prop_key(id, category, name);
            match self.storage.get(&key).map(|raw| decode_value(&raw)) {
                Some(Ok(value)) => {
                    props.insert(category, name, Prop::new(kind, value));
                }
                Some(Err(error)) => tracing::warn!(key, %error, "malformed stored value, skipping"),
                None => tracing::warn!(key, "stored value missing, skipping"),
            }
        }
    }

    /// Apply stored properties to the elements already in `tree`.
    ///
    /// Reserved `index` properties are skipped; structure comes from the
    /// constructors. Returns how many elements had stored state.
    pub fn load_tree(&self, tree: &mut Tree) -> usize {
        let ids: Vec<ElementId> = tree.iter().map(|el| el.id.clone()).collect();
        let mut restored = 0;
        for id in ids {
            let Some(props) = self.load_element(&id) else {
                continue;
            };
            restored += 1;
            for (category, name, prop) in props.iter().filter(|(c, _, _)| *c != Category::Index) {
                if let Err(error) = tree.set_raw(&id, category, name, prop.kind, prop.value.clone()) {
                    tracing::warn!(element = %id, %error, "could not restore property");
                }
            }
        }
        restored
    }

    /// Delete everything stored for an element.
    ///
    /// # Panics
    ///
    /// When an index entry is malformed. The offending key is deleted
    /// first, so a reload starts from a clean state.
    pub fn clear_element(&self, id: &ElementId) {
        if !self.available("clear_element") {
            return;
        }
        if let Err(err) = self.try_delete_entries(id) {
            if let ZuiError::CorruptedStore { key, .. } = &err {
                self.storage.delete(key);
            }
            panic!("{err}; the entry has been deleted, reload to rebuild the element from its constructor");
        }
    }

    /// Tolerant delete used before rewriting an element.
    fn delete_entries(&self, id: &ElementId) {
        if let Err(error) = self.try_delete_entries(id) {
            tracing::warn!(element = %id, %error, "stale element entries left behind");
        }
    }

    fn try_delete_entries(&self, id: &ElementId) -> ZuiResult<()> {
        let Some(raw) = self.storage.get(id.as_str()) else {
            return Ok(());
        };
        let categories: Vec<String> =
            serde_json::from_str(&raw).map_err(|e| ZuiError::corrupted(id.as_str(), e.to_string()))?;
        for name in &categories {
            let category: Category = name.parse().map_err(|e: ZuiError| ZuiError::corrupted(id.as_str(), e.to_string()))?;
            let key = category_key(id, category);
            if let Some(raw) = self.storage.get(&key) {
                let tags: Vec<String> =
                    serde_json::from_str(&raw).map_err(|e| ZuiError::corrupted(key.as_str(), e.to_string()))?;
                for tag in &tags {
                    let (_, name) = PropType::parse_tag(tag)
                        .ok_or_else(|| ZuiError::corrupted(key.as_str(), format!("bad property tag `{tag}`")))?;
                    self.storage.delete(&prop_key(id, category, name));
                }
            }
            self.storage.delete(&key);
        }
        self.storage.delete(id.as_str());
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // History
    // ─────────────────────────────────────────────────────────────────────────

    pub fn save_history(&self, history: &MutationHistory) -> ZuiResult<()> {
        if !self.available("save_history") {
            return Ok(());
        }
        self.storage.set(&self.history_key, history.to_json()?);
        tracing::debug!(key = %self.history_key, records = history.len(), "history saved");
        Ok(())
    }

    /// Load the stored history. `Ok(None)` when nothing is stored or the
    /// store is not connected; decode failures are returned to the caller.
    pub fn load_history(&self) -> ZuiResult<Option<MutationHistory>> {
        if !self.available("load_history") {
            return Ok(None);
        }
        self.storage
            .get(&self.history_key)
            .map(|json| MutationHistory::from_json(&json))
            .transpose()
    }

    pub fn clear_history(&self) -> ZuiResult<()> {
        if self.available("clear_history") {
            self.storage.delete(&self.history_key);
        }
        Ok(())
    }
}

fn encode_value(key: &str, value: &Value) -> ZuiResult<String> {
    serde_json::to_string(value)
        .and_then(|inner| serde_json::to_string(&inner))
        .map_err(|e| ZuiError::json(key, e))
}

fn decode_value(raw: &str) -> Result<Value, serde_json::Error> {
    let inner: String = serde_json::from_str(raw)?;
    serde_json::from_str(&inner)
}

fn encode_list<T: serde::Serialize>(items: &[T]) -> ZuiResult<String> {
    serde_json::to_string(items).map_err(|e| ZuiError::json("encode index", e))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;
    use crate::node::KIND_PROP;
    use crate::record::tests::record;

    static_assertions::assert_impl_all!(MemoryStorage: Send, Sync, Clone);

    fn element() -> Element {
        let mut el = Element::new(ElementId::from("x"), "label", "span");
        el.props.insert(Category::Data, "text", Prop::new(PropType::Local, "A".into()));
        el.props.insert(Category::Ui, "theme", Prop::new(PropType::Inheritable, "dark".into()));
        el.props.insert(Category::Event, "click", Prop::new(PropType::Local, true.into()));
        el
    }

    #[test]
    fn test_disconnected_store_is_noop() {
        let persistence = Persistence::new(MemoryStorage::new());
        persistence.save_element(&element()).unwrap();
        persistence.save_history(&MutationHistory::new()).unwrap();
        assert!(persistence.storage().is_empty());
        assert!(persistence.load_history().unwrap().is_none());

        persistence.connect();
        assert!(persistence.is_connected());
    }

    #[test]
    fn test_element_layout() {
        let persistence = Persistence::new(MemoryStorage::connected());
        persistence.save_element(&element()).unwrap();

        let storage = persistence.storage();
        assert_eq!(storage.get("x").unwrap(), r#"["data","ui","index"]"#);
        assert_eq!(storage.get("x/ui").unwrap(), r#"["Inheritable/theme"]"#);
        assert_eq!(storage.get("x/data/text").unwrap(), r#""\"A\"""#);
        assert!(storage.get("x/event").is_none());
    }

    #[test]
    fn test_element_round_trip() {
        let persistence = Persistence::new(MemoryStorage::connected());
        persistence.save_element(&element()).unwrap();

        let props = persistence.load_element(&ElementId::from("x")).unwrap();
        assert_eq!(props.value(Category::Data, "text"), Some(&Value::from("A")));
        assert_eq!(props.get(Category::Ui, "theme").unwrap().kind, PropType::Inheritable);
        assert_eq!(props.get(Category::Index, KIND_PROP).unwrap().kind, PropType::Default);
        assert!(props.get(Category::Event, "click").is_none());
    }

    #[test]
    fn test_resave_drops_stale_keys() {
        let persistence = Persistence::new(MemoryStorage::connected());
        let mut el = element();
        persistence.save_element(&el).unwrap();
        el.props.remove(Category::Data, "text");
        persistence.save_element(&el).unwrap();

        assert!(persistence.storage().get("x/data/text").is_none());
        assert!(persistence.storage().get("x/data").is_none());
    }

    #[test]
    fn test_values_stored_double_encoded() {
        let persistence = Persistence::new(MemoryStorage::connected());
        let mut el = element();
        el.props.insert(Category::Data, "list", Prop::new(PropType::Local, Value::from(vec![Value::from(1.0), Value::from("b")])));
        persistence.save_element(&el).unwrap();

        let raw = persistence.storage().get("x/data/list").unwrap();
        let inner: String = serde_json::from_str(&raw).unwrap();
        assert_eq!(inner, r#"[1.0,"b"]"#);
        assert_eq!(serde_json::from_str::<Value>(&inner).unwrap(), Value::from(vec![Value::from(1.0), Value::from("b")]));

        // Single-encoded text is not a stored value.
        persistence.storage().set("x/data/list", inner);
        let props = persistence.load_element(&ElementId::from("x")).unwrap();
        assert!(props.get(Category::Data, "list").is_none());
        assert_eq!(props.value(Category::Data, "text"), Some(&Value::from("A")));
    }

    #[test]
    fn test_malformed_entries_skipped_on_load() {
        let persistence = Persistence::new(MemoryStorage::connected());
        persistence.save_element(&element()).unwrap();
        let storage = persistence.storage();
        storage.set("x/data/text", "{not json".to_string());
        storage.set("x", r#"["data","ui","index","bogus"]"#.to_string());

        let props = persistence.load_element(&ElementId::from("x")).unwrap();
        assert!(props.get(Category::Data, "text").is_none());
        assert_eq!(props.value(Category::Ui, "theme"), Some(&Value::from("dark")));

        storage.set("x", "[".to_string());
        assert!(persistence.load_element(&ElementId::from("x")).is_none());
    }

    #[test]
    fn test_clear_element() {
        let persistence = Persistence::new(MemoryStorage::connected());
        persistence.save_element(&element()).unwrap();
        persistence.clear_element(&ElementId::from("x"));
        assert_eq!(persistence.storage().keys(), vec![CONNECTED_KEY.to_string()]);
    }

    #[test]
    fn test_clear_corrupted_element_deletes_then_panics() {
        let persistence = Persistence::new(MemoryStorage::connected());
        persistence.save_element(&element()).unwrap();
        persistence.storage().set("x/ui", "oops".to_string());

        let result = catch_unwind(AssertUnwindSafe(|| persistence.clear_element(&ElementId::from("x"))));
        let message = *result.unwrap_err().downcast::<String>().unwrap();
        assert!(message.contains("corrupted store entry `x/ui`"));
        assert!(persistence.storage().get("x/ui").is_none());
    }

    #[test]
    fn test_load_tree_restores_props() {
        let persistence = Persistence::new(MemoryStorage::connected());
        persistence.save_element(&element()).unwrap();

        let mut tree = Tree::new();
        tree.insert(Element::new(ElementId::from("x"), "label", "span")).unwrap();
        tree.insert(Element::new(ElementId::from("y"), "label", "span")).unwrap();
        assert_eq!(persistence.load_tree(&mut tree), 1);
        assert_eq!(tree.prop(&ElementId::from("x"), Category::Data, "text"), Some(&Value::from("A")));
    }

    #[test]
    fn test_history_round_trip_and_key() {
        let persistence = Persistence::new(MemoryStorage::connected()).with_history_key("page-2");
        let history = MutationHistory::from_records(vec![record("x", Category::Data, "text", "A".into(), 1)]);
        persistence.save_history(&history).unwrap();

        assert!(persistence.storage().get("page-2").is_some());
        assert_eq!(persistence.load_history().unwrap(), Some(history));

        persistence.clear_history().unwrap();
        assert_eq!(persistence.load_history().unwrap(), None);
    }

    #[test]
    fn test_corrupt_history_is_an_error() {
        let persistence = Persistence::new(MemoryStorage::connected());
        persistence.storage().set(DEFAULT_HISTORY_KEY, "garbage".to_string());
        assert!(matches!(persistence.load_history(), Err(ZuiError::Json { .. })));
    }
}
