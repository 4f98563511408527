//! Selector matching against real parsed documents.

use folio_css::parser::consume_selector_list;
use folio_css::selector::{matches_selector, ComplexSelector, PseudoType};
use folio_css::tokenizer::{CssTokenizer, TokenStream};
use folio_dom::{DomTree, NodeId};
use folio_html::parse_document;

fn selector(text: &str) -> ComplexSelector {
    let mut tokenizer = CssTokenizer::new(text);
    tokenizer.run();
    let mut stream = TokenStream::new(tokenizer.into_tokens());
    let mut list =
        consume_selector_list(&mut stream).unwrap_or_else(|| panic!("bad selector: {text}"));
    list.remove(0)
}

fn elements_matching(tree: &DomTree, text: &str) -> Vec<String> {
    let sel = selector(text);
    tree.iter_all()
        .filter(|&id| matches_selector(tree, id, &sel, PseudoType::None))
        .filter_map(|id| {
            let element = tree.as_element(id)?;
            let mut label = element.tag_name.as_str().to_owned();
            if let Some(id_attr) = element.attribute_str("id") {
                label.push('#');
                label.push_str(id_attr);
            }
            Some(label)
        })
        .collect()
}

fn first_match(tree: &DomTree, text: &str) -> Option<NodeId> {
    let sel = selector(text);
    tree.iter_all()
        .find(|&id| matches_selector(tree, id, &sel, PseudoType::None))
}

#[test]
fn nth_child_odd_matches_c1_c3_c5() {
    let tree = parse_document(
        "<div><p id=\"c1\"></p><p id=\"c2\"></p><p id=\"c3\"></p><p id=\"c4\"></p><p id=\"c5\"></p></div>",
    );
    assert_eq!(
        elements_matching(&tree, "div > p:nth-child(2n+1)"),
        vec!["p#c1", "p#c3", "p#c5"]
    );
    // Counting from the end flips nothing here: odd from the back is the
    // same set for five children.
    assert_eq!(
        elements_matching(&tree, "div > p:nth-last-child(odd)"),
        vec!["p#c1", "p#c3", "p#c5"]
    );
    // But with four children the sets differ.
    let four = parse_document(
        "<div><p id=\"c1\"></p><p id=\"c2\"></p><p id=\"c3\"></p><p id=\"c4\"></p></div>",
    );
    assert_eq!(
        elements_matching(&four, "div > p:nth-last-child(odd)"),
        vec!["p#c2", "p#c4"]
    );
}

#[test]
fn combinators_walk_the_tree() {
    let tree = parse_document(
        "<div id=\"outer\"><ul><li id=\"a\">x</li><li id=\"b\"><em>y</em></li><li id=\"c\">z</li></ul></div>",
    );
    assert_eq!(elements_matching(&tree, "ul > li"), vec!["li#a", "li#b", "li#c"]);
    assert_eq!(elements_matching(&tree, "li + li"), vec!["li#b", "li#c"]);
    assert_eq!(elements_matching(&tree, "li#a ~ li"), vec!["li#b", "li#c"]);
    assert_eq!(elements_matching(&tree, "div em"), vec!["em"]);
    assert_eq!(elements_matching(&tree, "div > em"), Vec::<String>::new());
}

#[test]
fn descendant_combinator_backtracks() {
    // The inner div does not match `.wrap`, but the outer one does; the
    // walk must keep climbing after the first candidate fails.
    let tree = parse_document(
        "<div class=\"wrap\"><div class=\"inner\"><span id=\"t\">x</span></div></div>",
    );
    assert!(first_match(&tree, "div.wrap span").is_some());
    assert!(first_match(&tree, "div.missing span").is_none());
}

#[test]
fn structural_pseudo_classes() {
    let tree = parse_document(
        "<section><p id=\"only\">a</p></section><div><span id=\"s1\"></span><b></b><span id=\"s2\"></span></div>",
    );
    assert_eq!(elements_matching(&tree, "p:only-child"), vec!["p#only"]);
    assert_eq!(elements_matching(&tree, "span:first-of-type"), vec!["span#s1"]);
    assert_eq!(elements_matching(&tree, "span:last-of-type"), vec!["span#s2"]);
    assert_eq!(elements_matching(&tree, "b:only-of-type"), vec!["b"]);
    assert!(first_match(&tree, "html:root").is_some());
    assert_eq!(elements_matching(&tree, "span:empty"), vec!["span#s1", "span#s2"]);
}

#[test]
fn attribute_matchers_and_case_flag() {
    let tree = parse_document(
        "<a id=\"l\" href=\"HTTPS://X/file.PNG\" class=\"nav active\" lang=\"en-US\">x</a>",
    );
    assert!(first_match(&tree, "[href]").is_some());
    assert!(first_match(&tree, "[class~=active]").is_some());
    assert!(first_match(&tree, "[lang|=en]").is_some());
    // Case-sensitive by default, insensitive with the `i` flag.
    assert!(first_match(&tree, "[href^=https]").is_none());
    assert!(first_match(&tree, "[href^=https i]").is_some());
    assert!(first_match(&tree, "[href$=\".png\" i]").is_some());
    assert!(first_match(&tree, "[href*=\"//x/\" i]").is_some());
}

#[test]
fn lang_uses_nearest_ancestor() {
    let tree = parse_document("<div lang=\"fr\"><p><span id=\"t\">x</span></p></div>");
    assert!(first_match(&tree, "span:lang(fr)").is_some());
    assert!(first_match(&tree, "span:lang(fr-CA)").is_none());
    assert!(first_match(&tree, "span:lang(de)").is_none());
}

#[test]
fn link_and_form_state_pseudo_classes() {
    let tree = parse_document(
        "<a id=\"with\" href=\"#\">x</a><a id=\"without\">y</a>\
         <input id=\"on\"><input id=\"off\" disabled><input id=\"chk\" checked>",
    );
    assert_eq!(elements_matching(&tree, "a:link"), vec!["a#with"]);
    assert_eq!(
        elements_matching(&tree, "input:enabled"),
        vec!["input#on", "input#chk"]
    );
    assert_eq!(elements_matching(&tree, "input:disabled"), vec!["input#off"]);
    assert_eq!(elements_matching(&tree, "input:checked"), vec!["input#chk"]);
}

#[test]
fn is_and_not_functional_pseudo_classes() {
    let tree = parse_document(
        "<h1 id=\"a\">x</h1><h2 id=\"b\">y</h2><p id=\"c\" class=\"skip\">z</p><p id=\"d\">w</p>",
    );
    assert_eq!(
        elements_matching(&tree, ":is(h1, h2)"),
        vec!["h1#a", "h2#b"]
    );
    assert_eq!(elements_matching(&tree, "p:not(.skip)"), vec!["p#d"]);
}

#[test]
fn pseudo_element_selectors_require_matching_pseudo() {
    let tree = parse_document("<p id=\"t\">x</p>");
    let sel = selector("p::before");
    let p = first_match(&tree, "p").unwrap();
    assert!(!matches_selector(&tree, p, &sel, PseudoType::None));
    assert!(matches_selector(&tree, p, &sel, PseudoType::Before));
    assert!(!matches_selector(&tree, p, &sel, PseudoType::After));
}
