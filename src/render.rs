//! HTML rendering for server-side output.
//!
//! Element properties map to markup as follows:
//!
//! | Property | Output |
//! |----------|--------|
//! | `ui/text` | escaped text content, before the children |
//! | other scalar `ui/*` | attribute (`true` renders bare, `false` is omitted) |
//! | `css/*` | one inline `style` attribute |
//! | everything else | not rendered |
//!
//! Property names become attribute names and style declarations as they
//! are, so names outside a conservative grammar are logged and skipped.
//!
//! [`render_document`] also embeds the captured history so the client can
//! hydrate without re-running the page logic.

use crate::category::Category;
use crate::error::ZuiResult;
use crate::id::ElementId;
use crate::node::{Element, Tree};
use crate::persist::DEFAULT_HISTORY_KEY;
use crate::session::Session;
use crate::value::Value;

// =============================================================================
// RenderConfig
// =============================================================================

/// Default attribute carrying the element id.
pub const DEFAULT_ID_ATTR: &str = "data-zui-id";

/// `ui` property rendered as text content instead of an attribute.
pub const TEXT_PROP: &str = "text";

/// Elements with no closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

/// Configuration for HTML rendering.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Emit element ids (needed to hydrate)
    pub emit_ids: bool,
    /// Embed the history payload in [`render_document`]
    pub embed_history: bool,
    /// Attribute name for element ids; empty means [`DEFAULT_ID_ATTR`].
    pub id_attr_name: String,
}

impl RenderConfig {
    /// Hydratable output.
    pub const DEV: Self = Self {
        emit_ids: true,
        embed_history: true,
        id_attr_name: String::new(),
    };

    /// Static output: no ids, no history.
    pub const PROD: Self = Self {
        emit_ids: false,
        embed_history: false,
        id_attr_name: String::new(),
    };

    pub fn with_id_attr(mut self, attr_name: impl Into<String>) -> Self {
        self.id_attr_name = attr_name.into();
        self
    }

    pub fn id_attr(&self) -> &str {
        if self.id_attr_name.is_empty() {
            DEFAULT_ID_ATTR
        } else {
            &self.id_attr_name
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::DEV
    }
}

// =============================================================================
// Tree rendering
// =============================================================================

/// Render the subtree rooted at `root`. Unknown ids render nothing.
pub fn render_tree(tree: &Tree, root: &ElementId, config: &RenderConfig) -> String {
    let mut output = String::new();
    if let Some(el) = tree.get(root) {
        render_element(tree, el, config, &mut output);
    }
    output
}

/// Render the session's root plus the embedded history.
pub fn render_document(session: &Session, config: &RenderConfig) -> ZuiResult<String> {
    let mut output = match session.root() {
        Some(root) => render_tree(session.tree(), root, config),
        None => String::new(),
    };
    if config.embed_history {
        let json = session.history().to_json()?;
        output.push_str("<script type=\"application/json\" id=\"");
        output.push_str(DEFAULT_HISTORY_KEY);
        output.push_str("\">");
        // Keep `</script>` inside string values from closing the tag.
        output.push_str(&json.replace("</", "<\\/"));
        output.push_str("</script>");
    }
    Ok(output)
}

/// [`render_document`] as bytes.
pub fn render_document_bytes(session: &Session, config: &RenderConfig) -> ZuiResult<Vec<u8>> {
    render_document(session, config).map(String::into_bytes)
}

fn render_element(tree: &Tree, el: &Element, config: &RenderConfig, output: &mut String) {
    output.push('<');
    output.push_str(&el.tag);

    if config.emit_ids {
        push_attr(output, config.id_attr(), el.id.as_str());
    }

    for (name, prop) in el.props.in_category(Category::Ui) {
        if name == TEXT_PROP {
            continue;
        }
        if !is_attr_name(name) {
            tracing::warn!(element = %el.id, name, "unsafe attribute name, skipped");
            continue;
        }
        match &prop.value {
            Value::Bool(true) => {
                output.push(' ');
                output.push_str(name);
            }
            Value::Bool(false) => {}
            value => {
                if let Some(text) = value.to_scalar_string() {
                    push_attr(output, name, &text);
                }
            }
        }
    }

    let style = el
        .props
        .in_category(Category::Css)
        .filter(|(name, _)| {
            let safe = is_attr_name(name) && !name.contains([':', ';']);
            if !safe {
                tracing::warn!(element = %el.id, name, "unsafe style property, skipped");
            }
            safe
        })
        .filter_map(|(name, prop)| prop.value.to_scalar_string().map(|v| format!("{name}: {v}")))
        .collect::<Vec<_>>()
        .join("; ");
    if !style.is_empty() {
        push_attr(output, "style", &style);
    }

    if VOID_ELEMENTS.contains(&el.tag.as_str()) {
        output.push_str(" />");
        return;
    }

    output.push('>');

    if let Some(text) = el.value(Category::Ui, TEXT_PROP).and_then(Value::to_scalar_string) {
        escape_into(output, &text, false);
    }

    for child in tree.children(&el.id) {
        if let Some(child) = tree.get(child) {
            render_element(tree, child, config, output);
        }
    }

    output.push_str("</");
    output.push_str(&el.tag);
    output.push('>');
}

fn push_attr(output: &mut String, name: &str, value: &str) {
    output.push(' ');
    output.push_str(name);
    output.push_str("=\"");
    escape_into(output, value, true);
    output.push('"');
}

/// Names that cannot break out of an attribute list: non-empty, with no
/// whitespace, control characters, quotes, `<`, `>`, `/` or `=`.
fn is_attr_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '<' | '>' | '/' | '='))
}

/// Append `text` escaped for a text node, or for a double-quoted
/// attribute value when `in_attr` is set.
fn escape_into(output: &mut String, text: &str, in_attr: bool) {
    let mut start = 0;
    for (i, byte) in text.bytes().enumerate() {
        let entity = match byte {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'"' if in_attr => "&quot;",
            _ => continue,
        };
        output.push_str(&text[start..i]);
        output.push_str(entity);
        start = i + 1;
    }
    output.push_str(&text[start..]);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::SessionConfig;
    use crate::record::MutationHistory;
    use crate::registry::Registry;

    fn page(session: &mut Session, id: &ElementId) -> ZuiResult<()> {
        let field = session.create("field")?;
        session.append_child(id, &field)?;
        session.set_default(id, Category::Ui, TEXT_PROP, Value::from("a < b"))
    }

    fn field(session: &mut Session, id: &ElementId) -> ZuiResult<()> {
        session.set_default(id, Category::Ui, "disabled", Value::from(true))?;
        session.set_default(id, Category::Ui, "hidden", Value::from(false))
    }

    fn session() -> Session {
        let registry = Arc::new(Registry::new().with("page", "main", page).with("field", "input", field));
        let mut session = Session::new(registry, SessionConfig::server("/"));
        let root = session.mount("page").unwrap();
        session.set(&root, Category::Css, "color", "red".into()).unwrap();
        session.set(&root, Category::Css, "opacity", 0.5.into()).unwrap();
        session.set(&root, Category::Ui, "title", "say \"hi\"".into()).unwrap();
        session
    }

    #[test]
    fn test_render_tree() {
        let session = session();
        let html = render_tree(session.tree(), session.root().unwrap(), &RenderConfig::PROD);
        assert_eq!(
            html,
            r#"<main title="say &quot;hi&quot;" style="color: red; opacity: 0.5">a &lt; b<input disabled /></main>"#
        );
    }

    #[test]
    fn test_render_ids() {
        let session = session();
        let root = session.root().unwrap();
        let html = render_tree(session.tree(), root, &RenderConfig::DEV);
        assert!(html.starts_with(&format!("<main data-zui-id=\"{root}\"")));

        let config = RenderConfig::DEV.with_id_attr("data-my-id");
        let html = render_tree(session.tree(), root, &config);
        assert!(html.contains("data-my-id="));
        assert!(!html.contains("data-zui-id"));
    }

    #[test]
    fn test_document_embeds_history() {
        let mut session = session();
        let root = session.root().unwrap().clone();
        session.set(&root, Category::Data, "note", "</script>".into()).unwrap();

        let html = render_document(&session, &RenderConfig::DEV).unwrap();
        let start = html.find("<script type=\"application/json\" id=\"zui-history\">").unwrap();
        let payload = &html[start..];
        assert_eq!(payload.matches("</script>").count(), 1);

        let json = payload
            .trim_start_matches("<script type=\"application/json\" id=\"zui-history\">")
            .trim_end_matches("</script>")
            .replace("<\\/", "</");
        assert_eq!(&MutationHistory::from_json(&json).unwrap(), session.history());
    }

    #[test]
    fn test_document_without_history() {
        let html = render_document(&session(), &RenderConfig::PROD).unwrap();
        assert!(!html.contains("<script"));
    }

    #[test]
    fn test_escape_into() {
        let mut out = String::new();
        escape_into(&mut out, "<b>\"café\" & co", false);
        assert_eq!(out, "&lt;b&gt;\"café\" &amp; co");

        out.clear();
        escape_into(&mut out, "\"café\"", true);
        assert_eq!(out, "&quot;café&quot;");
    }

    #[test]
    fn test_unsafe_names_skipped() {
        let mut session = session();
        let root = session.root().unwrap().clone();
        session.set(&root, Category::Ui, "onclick=\"steal()\" x", "y".into()).unwrap();
        session.set(&root, Category::Ui, "a><script>alert(1)</script", true.into()).unwrap();
        session.set(&root, Category::Ui, "aria-label", "ok".into()).unwrap();
        session.set(&root, Category::Css, "color: red; background", "url(x)".into()).unwrap();

        let html = render_tree(session.tree(), &root, &RenderConfig::PROD);
        assert!(!html.contains("onclick"));
        assert!(!html.contains("<script"));
        assert!(!html.contains("background"));
        assert!(html.contains(r#" aria-label="ok""#));
        assert!(html.contains(r#"style="color: red; opacity: 0.5""#));
    }
}
