//! Generated content and counters over the full pipeline.

use std::rc::Rc;

use folio_book::{BoxNode, Book, ElementBox, PageMargins, PageOrientation, PageSize};
use folio_common::net::NullResourceClient;
use folio_css::selector::PseudoType;

fn load(html: &str, user_style: &str) -> Book {
    let mut book = Book::with_client(
        PageSize::A4,
        PageOrientation::Portrait,
        PageMargins::uniform(40.0),
        Rc::new(NullResourceClient),
    );
    assert!(book.load(html, "", user_style));
    book
}

/// Depth-first collection of every box for a tag.
fn boxes_for_tag<'a>(book: &'a Book, root: &'a ElementBox, tag: &str, out: &mut Vec<&'a ElementBox>) {
    if let Some(node) = root.node {
        if book
            .document()
            .unwrap()
            .tree()
            .as_element(node)
            .is_some_and(|e| e.tag_name == tag)
        {
            out.push(root);
        }
    }
    for child in &root.children {
        if let BoxNode::Element(element) = child {
            boxes_for_tag(book, element, tag, out);
        }
    }
}

fn marker_texts(book: &Book, root: &ElementBox, tag: &str) -> Vec<String> {
    let mut items = Vec::new();
    boxes_for_tag(book, root, tag, &mut items);
    items
        .iter()
        .filter_map(|item| item.pseudo_child(PseudoType::Marker))
        .map(ElementBox::text_content)
        .collect()
}

#[test]
fn ordered_list_numbering_with_start_and_value() {
    // Spec scenario: <ol start="5"><li><li value="10"><li></ol> renders
    // markers 5. 10. 11. with decimal list style.
    let book = load(
        "<ol start=\"5\"><li>a</li><li value=\"10\">b</li><li>c</li></ol>",
        "",
    );
    let root = book.build_boxes().expect("box tree");
    assert_eq!(marker_texts(&book, &root, "li"), vec!["5.", "10.", "11."]);
}

#[test]
fn unordered_list_markers_are_bullets() {
    let book = load("<ul><li>a</li><li>b</li></ul>", "");
    let root = book.build_boxes().unwrap();
    assert_eq!(
        marker_texts(&book, &root, "li"),
        vec!["\u{2022}", "\u{2022}"]
    );
}

#[test]
fn nested_lists_restart_numbering() {
    let book = load(
        "<ol><li>one<ol><li>inner</li></ol></li><li>two</li></ol>",
        "ol, ol ol { list-style-type: decimal }",
    );
    let root = book.build_boxes().unwrap();
    let markers = marker_texts(&book, &root, "li");
    assert_eq!(markers, vec!["1.", "1.", "2."]);
}

#[test]
fn roman_and_alpha_list_styles() {
    let book = load(
        "<ol class=\"r\"><li>a</li><li>b</li><li>c</li><li>d</li></ol>\
         <ol class=\"a\"><li>x</li><li>y</li></ol>",
        ".r { list-style-type: upper-roman } .a { list-style-type: lower-alpha }",
    );
    let root = book.build_boxes().unwrap();
    let markers = marker_texts(&book, &root, "li");
    assert_eq!(markers, vec!["I.", "II.", "III.", "IV.", "a.", "b."]);
}

#[test]
fn before_and_after_content_with_counters() {
    let book = load(
        "<div><h2>One</h2><h2>Two</h2></div>",
        "div { counter-reset: chapter; } \
         h2::before { counter-increment: chapter; content: \"Chapter \" counter(chapter) \": \"; } \
         h2::after { content: \" \\2014\"; }",
    );
    let root = book.build_boxes().unwrap();
    let mut headings = Vec::new();
    boxes_for_tag(&book, &root, "h2", &mut headings);
    assert_eq!(headings.len(), 2);
    assert_eq!(headings[0].text_content(), "Chapter 1: One \u{2014}");
    assert_eq!(headings[1].text_content(), "Chapter 2: Two \u{2014}");
    assert!(headings[0].pseudo_child(PseudoType::Before).is_some());
    assert!(headings[0].pseudo_child(PseudoType::After).is_some());
}

#[test]
fn counters_function_joins_nesting_levels() {
    let book = load(
        "<ol><li>a<ol><li>b<ol><li>c</li></ol></li></ol></li></ol>",
        "ol { counter-reset: item; } \
         li { counter-increment: item; } \
         li::before { content: counters(item, \".\") \" \"; }",
    );
    let root = book.build_boxes().unwrap();
    let mut items = Vec::new();
    boxes_for_tag(&book, &root, "li", &mut items);
    let befores: Vec<String> = items
        .iter()
        .filter_map(|item| item.pseudo_child(PseudoType::Before))
        .map(ElementBox::text_content)
        .collect();
    assert_eq!(befores, vec!["1 ", "1.1 ", "1.1.1 "]);
}

#[test]
fn quote_nesting_uses_quote_pairs() {
    let book = load(
        "<p><q>outer <q>inner</q> tail</q></p>",
        "q { quotes: \"\\00AB\" \"\\00BB\" \"\\2018\" \"\\2019\"; }",
    );
    let root = book.build_boxes().unwrap();
    let mut quotes = Vec::new();
    boxes_for_tag(&book, &root, "q", &mut quotes);
    let outer = quotes[0].text_content();
    assert_eq!(outer, "\u{AB}outer \u{2018}inner\u{2019} tail\u{BB}");
}

#[test]
fn attr_content_reads_the_element() {
    let book = load(
        "<a href=\"#ch1\" title=\"Chapter One\">link</a>",
        "a::after { content: \" (\" attr(title) \")\"; }",
    );
    let root = book.build_boxes().unwrap();
    let mut anchors = Vec::new();
    boxes_for_tag(&book, &root, "a", &mut anchors);
    assert_eq!(anchors[0].text_content(), "link (Chapter One)");
}

#[test]
fn display_none_prunes_the_subtree() {
    let book = load(
        "<div><p id=\"gone\">hidden</p><p>kept</p></div>",
        "#gone { display: none }",
    );
    let root = book.build_boxes().unwrap();
    let mut paragraphs = Vec::new();
    boxes_for_tag(&book, &root, "p", &mut paragraphs);
    assert_eq!(paragraphs.len(), 1);
    assert_eq!(paragraphs[0].text_content(), "kept");
}

#[test]
fn content_none_generates_no_box() {
    let book = load(
        "<p>x</p>",
        "p::before { content: none }",
    );
    let root = book.build_boxes().unwrap();
    let mut paragraphs = Vec::new();
    boxes_for_tag(&book, &root, "p", &mut paragraphs);
    let before = paragraphs[0].pseudo_child(PseudoType::Before);
    // The box exists but materializes nothing.
    assert!(before.is_none_or(|b| b.text_content().is_empty()));
}

#[test]
fn marker_image_overrides_counter_text() {
    let book = load(
        "<ul><li>a</li></ul>",
        "li { list-style-image: url(\"bullet.png\") }",
    );
    let root = book.build_boxes().unwrap();
    let mut items = Vec::new();
    boxes_for_tag(&book, &root, "li", &mut items);
    let marker = items[0].pseudo_child(PseudoType::Marker).unwrap();
    assert!(marker
        .children
        .iter()
        .any(|child| matches!(child, BoxNode::Image(_))));
}

#[test]
fn counter_set_updates_without_new_scope() {
    let book = load(
        "<div><p>a</p><p id=\"jump\">b</p><p>c</p></div>",
        "div { counter-reset: n } \
         p { counter-increment: n } \
         #jump { counter-set: n 100 } \
         p::after { content: \" [\" counter(n) \"]\" }",
    );
    let root = book.build_boxes().unwrap();
    let mut paragraphs = Vec::new();
    boxes_for_tag(&book, &root, "p", &mut paragraphs);
    let texts: Vec<String> = paragraphs.iter().map(|p| p.text_content()).collect();
    assert_eq!(texts, vec!["a [1]", "b [100]", "c [101]"]);
}
