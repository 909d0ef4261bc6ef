//! Content-root detection and structural paths against parsed documents.

use marginalia_core::tree::{
    content_root_of, content_roots, find_content_root, nth_text_child, resolve_structural_path,
    structural_path, text_child_index,
};
use marginalia_core::DocumentTree;
use marginalia_dom::Document;

const PAGE: &str = r#"
<html><body>
  <nav><p>menu</p></nav>
  <div class="wrapper">
    <article>
      <h1>Title</h1>
      <p>First paragraph.</p>
      <p id="lead">Second <em>emphasised</em> paragraph.</p>
      <section><p>Nested one.</p><p>Nested two.</p></section>
    </article>
  </div>
</body></html>
"#;

#[test]
fn test_content_root_is_nearest_article() {
    let doc = Document::parse_html(PAGE);
    let range = doc.select_text("Nested two", 0).unwrap();
    let root = content_root_of(&doc, range.start.node).unwrap();
    assert_eq!(doc.tag_name(root), Some("article"));
    assert_eq!(find_content_root(&doc), Some(root));
}

#[test]
fn test_content_root_falls_back_to_body() {
    let doc = Document::parse_html("<div><p>plain page</p></div>");
    let range = doc.select_text("plain", 0).unwrap();
    let root = content_root_of(&doc, range.start.node).unwrap();
    assert_eq!(doc.tag_name(root), Some("body"));
}

#[test]
fn test_content_root_by_class_marker_and_role() {
    let doc = Document::parse_html(
        r#"<div class="site"><div class="entry-content"><p>by class</p></div></div>
           <div role="main"><p>by role</p></div>"#,
    );
    let by_class = doc.select_text("by class", 0).unwrap();
    let root = content_root_of(&doc, by_class.start.node).unwrap();
    assert_eq!(doc.attribute(root, "class"), Some("entry-content"));

    let by_role = doc.select_text("by role", 0).unwrap();
    let root = content_root_of(&doc, by_role.start.node).unwrap();
    assert_eq!(doc.attribute(root, "role"), Some("main"));
}

#[test]
fn test_structural_path_uses_ids_and_sibling_indexes() {
    let doc = Document::parse_html(PAGE);
    let root = find_content_root(&doc).unwrap();

    let nested = doc.select_text("Nested two", 0).unwrap();
    let p = doc.parent(nested.start.node).unwrap();
    assert_eq!(structural_path(&doc, p, root), vec!["section:0", "p:1"]);

    let lead = doc.select_text("Second", 0).unwrap();
    let p = doc.parent(lead.start.node).unwrap();
    assert_eq!(structural_path(&doc, p, root), vec!["p#lead"]);
}

#[test]
fn test_structural_path_resolves_back() {
    let doc = Document::parse_html(PAGE);
    let root = find_content_root(&doc).unwrap();
    let nested = doc.select_text("Nested two", 0).unwrap();
    let p = doc.parent(nested.start.node).unwrap();
    let path = structural_path(&doc, p, root);
    assert_eq!(resolve_structural_path(&doc, root, &path), Some(p));
}

#[test]
fn test_missing_path_step_is_none() {
    let doc = Document::parse_html(PAGE);
    let root = find_content_root(&doc).unwrap();
    let path = vec!["section:0".to_string(), "p:7".to_string()];
    assert_eq!(resolve_structural_path(&doc, root, &path), None);
    let path = vec!["p#missing".to_string()];
    assert_eq!(resolve_structural_path(&doc, root, &path), None);
}

#[test]
fn test_text_child_index_skips_elements() {
    let doc = Document::parse_html(PAGE);
    let tail = doc.select_text(" paragraph.", 1).unwrap();
    let p = doc.parent(tail.start.node).unwrap();
    assert_eq!(doc.attribute(p, "id"), Some("lead"));
    assert_eq!(text_child_index(&doc, tail.start.node), Some(1));
    assert_eq!(nth_text_child(&doc, p, 1), Some(tail.start.node));
}

#[test]
fn test_content_roots_lists_nested_roots_then_body() {
    let doc = Document::parse_html(r#"<div id="content"><article><p>x</p></article></div>"#);
    let tags: Vec<&str> = content_roots(&doc)
        .into_iter()
        .filter_map(|root| doc.tag_name(root))
        .collect();
    assert_eq!(tags, vec!["div", "article", "body"]);
}
