//! End-to-end tree construction over the public API.

use folio_dom::{DomTree, NodeId, NodeType};
use folio_html::parse_document;

fn find_all(tree: &DomTree, tag: &str) -> Vec<NodeId> {
    tree.iter_all()
        .filter(|&id| tree.as_element(id).is_some_and(|e| e.tag_name == tag))
        .collect()
}

fn find(tree: &DomTree, tag: &str) -> NodeId {
    find_all(tree, tag)
        .into_iter()
        .next()
        .unwrap_or_else(|| panic!("no <{tag}> in tree"))
}

#[test]
fn full_document_shape() {
    let tree = parse_document(
        "<!DOCTYPE html><html><head><title>T</title></head><body><p>hi</p></body></html>",
    );
    let html = tree.document_element().expect("document element");
    let children: Vec<_> = tree
        .children(html)
        .iter()
        .filter_map(|&id| tree.as_element(id).map(|e| e.tag_name.as_str()))
        .collect();
    assert_eq!(children, vec!["head", "body"]);
    assert_eq!(tree.text_content(find(&tree, "title")), "T");
    assert_eq!(tree.text_content(tree.body().unwrap()), "hi");
}

#[test]
fn misnested_formatting_keeps_text_order_and_nesting() {
    // Spec scenario: <p>A<b>B<i>C</p>D</i>E</b>F
    let tree = parse_document("<p>A<b>B<i>C</p>D</i>E</b>F");
    let body = tree.body().unwrap();
    assert_eq!(tree.text_content(body), "ABCDEF");

    // B and C render inside <b>; C inside <i> inside <b>.
    let p = find(&tree, "p");
    let b_in_p = find_all(&tree, "b")
        .into_iter()
        .find(|&b| tree.is_descendant_of(b, p))
        .expect("b inside p");
    assert_eq!(tree.text_content(b_in_p), "BC");

    // D sits in a reopened <i> via formatting reconstruction, E back under
    // a <b>, F at body top level.
    let i_boxes = find_all(&tree, "i");
    assert!(i_boxes.len() >= 2, "expected the <i> to be reopened");
    let last_text = tree
        .children(body)
        .iter()
        .rev()
        .find_map(|&id| tree.as_text(id))
        .unwrap();
    assert_eq!(last_text, "F");
}

#[test]
fn adoption_agency_b_i_recovery() {
    // <b><i></b></i> yields <b><i></i></b><i></i>-style recovery.
    let tree = parse_document("<b><i>one</b>two</i>");
    let b = find(&tree, "b");
    let i_boxes = find_all(&tree, "i");
    assert_eq!(i_boxes.len(), 2);
    assert!(tree.is_descendant_of(i_boxes[0], b));
    assert!(!tree.is_descendant_of(i_boxes[1], b));
    assert_eq!(tree.text_content(i_boxes[0]), "one");
    assert_eq!(tree.text_content(i_boxes[1]), "two");
}

#[test]
fn table_text_fosters_before_table() {
    // Spec scenario: <table>x<tr><td>y
    let tree = parse_document("<table>x<tr><td>y");
    let body = tree.body().unwrap();
    let children = tree.children(body);

    // "x" is a sibling *before* the table.
    assert_eq!(tree.as_text(children[0]), Some("x"));
    let table = children[1];
    assert_eq!(tree.as_element(table).unwrap().tag_name, "table");

    // The table grew an implicit tbody > tr > td with "y".
    let tbody = tree.children(table)[0];
    assert_eq!(tree.as_element(tbody).unwrap().tag_name, "tbody");
    let tr = tree.children(tbody)[0];
    assert_eq!(tree.as_element(tr).unwrap().tag_name, "tr");
    let td = tree.children(tr)[0];
    assert_eq!(tree.as_element(td).unwrap().tag_name, "td");
    assert_eq!(tree.text_content(td), "y");
}

#[test]
fn whitespace_inside_table_does_not_foster() {
    let tree = parse_document("<table> <tr> <td>y</td> </tr> </table>");
    let body = tree.body().unwrap();
    // No foster-parented text before the table.
    let first = tree.children(body)[0];
    assert!(tree.as_element(first).is_some());
}

#[test]
fn rawtext_style_element_keeps_css_verbatim() {
    let tree = parse_document("<style>p > a { color: red; }</style>");
    let style = find(&tree, "style");
    assert_eq!(tree.text_content(style), "p > a { color: red; }");
}

#[test]
fn script_content_never_reaches_the_tree_as_markup() {
    let tree = parse_document("<script>if (a < b) { document.write('<p>'); }</script><p>real</p>");
    // Exactly one real <p>; the string inside the script stays text.
    assert_eq!(find_all(&tree, "p").len(), 1);
}

#[test]
fn frameset_document_parses() {
    let tree = parse_document(
        "<html><frameset rows=\"*\"><frame src=\"a.html\"><noframes>text</noframes></frameset></html>",
    );
    let frameset = find(&tree, "frameset");
    assert!(find_all(&tree, "frame")
        .iter()
        .all(|&f| tree.is_descendant_of(f, frameset)));
}

#[test]
fn select_in_table_pops_out() {
    let tree = parse_document("<table><tr><td><select><option>a<table><tr><td>b</table>");
    // The nested table start tag forces the select closed.
    assert_eq!(find_all(&tree, "select").len(), 1);
    assert_eq!(find_all(&tree, "table").len(), 2);
}

#[test]
fn comments_and_doctype_order() {
    let tree = parse_document("<!DOCTYPE html><!--one--><html><body><!--two-->");
    let doc_children = tree.children(NodeId::ROOT);
    assert!(matches!(
        tree.get(doc_children[0]).map(|n| &n.node_type),
        Some(NodeType::Comment(data)) if data == "one"
    ));
}

#[test]
fn entity_text_merges_into_single_nodes() {
    let tree = parse_document("<p>fish &amp; chips &mdash; nightly</p>");
    let p = find(&tree, "p");
    assert_eq!(tree.children(p).len(), 1);
    assert_eq!(
        tree.as_text(tree.children(p)[0]),
        Some("fish & chips \u{2014} nightly")
    );
}

#[test]
fn svg_subtree_with_html_island() {
    let tree = parse_document(
        "<p>before</p><svg><defs><lineargradient id=\"g\"></lineargradient></defs>\
         <foreignobject><div>island</div></foreignobject></svg><p>after</p>",
    );
    // Case-adjusted foreign names.
    assert_eq!(find_all(&tree, "linearGradient").len(), 1);
    let div = find(&tree, "div");
    assert!(tree.as_element(div).unwrap().is_html());
    assert_eq!(find_all(&tree, "p").len(), 2);
}
