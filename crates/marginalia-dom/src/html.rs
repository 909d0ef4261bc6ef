//! HTML parsing (via `scraper`) and serialization.

use marginalia_core::{DocumentTree, NodeId};
use scraper::{Html, Node as HtmlNode};

use crate::document::{Document, NodeData};

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose text content is written unescaped.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

impl Document {
    /// Parse a full HTML document. Missing `html`/`head`/`body` are implied
    /// the way browsers imply them.
    pub fn parse_html(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut doc = Document::new();
        let root_id = doc.document();

        let mut stack = vec![(parsed.tree.root(), root_id)];
        while let Some((source, target)) = stack.pop() {
            for child in source.children() {
                let created = match child.value() {
                    HtmlNode::Element(el) => {
                        let attrs: Vec<(&str, &str)> = el.attrs().collect();
                        Some(doc.create_element(el.name(), &attrs))
                    }
                    HtmlNode::Text(text) => {
                        let text: &str = text;
                        Some(doc.create_text(text))
                    }
                    HtmlNode::Comment(comment) => {
                        let comment: &str = comment;
                        Some(doc.create_comment(comment))
                    }
                    HtmlNode::Doctype(doctype) => Some(doc.create_doctype(doctype.name())),
                    _ => None,
                };
                if let Some(id) = created {
                    // both nodes are freshly created, so appending cannot fail
                    if doc.append_child(target, id).is_ok() {
                        stack.push((child, id));
                    }
                }
            }
        }
        doc
    }

    /// Serialize the whole document.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for child in self.children(self.document()) {
            self.write_node(child, &mut out, false);
        }
        out
    }

    /// Serialize one node and its subtree.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_node(node, &mut out, false);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String, raw_text: bool) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.data {
            NodeData::Document => {
                for child in &node.children {
                    self.write_node(*child, out, false);
                }
            }
            NodeData::Doctype(name) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(name);
                out.push('>');
            }
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Text(text) => {
                if raw_text {
                    out.push_str(text);
                } else {
                    escape_into(text, out, false);
                }
            }
            NodeData::Element { name, attrs } => {
                out.push('<');
                out.push_str(name);
                for (key, value) in attrs {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    escape_into(value, out, true);
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&name.as_str()) {
                    return;
                }
                let raw = RAW_TEXT_ELEMENTS.contains(&name.as_str());
                for child in &node.children {
                    self.write_node(*child, out, raw);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }
}

fn escape_into(text: &str, out: &mut String, attribute: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{00a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}
