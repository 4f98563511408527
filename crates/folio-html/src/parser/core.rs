//! The HTML tree construction stage.
//!
//! [§ 13.2.6 Tree construction](https://html.spec.whatwg.org/multipage/parsing.html#tree-construction)
//!
//! The parser consumes the tokenizer's output and builds a DOM tree via the
//! insertion-mode state machine. Every anomaly records a parse issue and
//! recovers; EOF in any mode closes all open elements, so a tree is always
//! produced.

use strum_macros::Display;

use folio_common::intern::Atom;
use folio_common::warning::{warn_once, WarnKind};
use folio_dom::{
    DomTree, ElementData, NodeId, NodeType, HTML_NAMESPACE, MATHML_NAMESPACE, SVG_NAMESPACE,
};

use super::foreign::{adjust_mathml_attribute, adjust_svg_attribute, adjust_svg_tag_name};
use crate::tokenizer::{Attribute, Token};

/// [§ 13.2.4.1 The insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-insertion-mode)
///
/// "The insertion mode is a state variable that controls the primary
/// operation of the tree construction stage."
///
/// `InForeignContent` is selected by the dispatcher whenever the adjusted
/// current node is in the SVG or MathML namespace and the token is not at an
/// integration point; the other modes are explicit parser state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum InsertionMode {
    /// § 13.2.6.4.1 The "initial" insertion mode.
    Initial,
    /// § 13.2.6.4.2 The "before html" insertion mode.
    BeforeHtml,
    /// § 13.2.6.4.3 The "before head" insertion mode.
    BeforeHead,
    /// § 13.2.6.4.4 The "in head" insertion mode.
    InHead,
    /// § 13.2.6.4.5 The "in head noscript" insertion mode.
    InHeadNoscript,
    /// § 13.2.6.4.6 The "after head" insertion mode.
    AfterHead,
    /// § 13.2.6.4.7 The "in body" insertion mode.
    InBody,
    /// § 13.2.6.4.8 The "text" insertion mode.
    Text,
    /// § 13.2.6.4.9 The "in table" insertion mode.
    InTable,
    /// § 13.2.6.4.10 The "in table text" insertion mode.
    InTableText,
    /// § 13.2.6.4.11 The "in caption" insertion mode.
    InCaption,
    /// § 13.2.6.4.12 The "in column group" insertion mode.
    InColumnGroup,
    /// § 13.2.6.4.13 The "in table body" insertion mode.
    InTableBody,
    /// § 13.2.6.4.14 The "in row" insertion mode.
    InRow,
    /// § 13.2.6.4.15 The "in cell" insertion mode.
    InCell,
    /// § 13.2.6.4.16 The "in select" insertion mode.
    InSelect,
    /// § 13.2.6.4.17 The "in select in table" insertion mode.
    InSelectInTable,
    /// § 13.2.6.4.19 The "after body" insertion mode.
    AfterBody,
    /// § 13.2.6.4.20 The "in frameset" insertion mode.
    InFrameset,
    /// § 13.2.6.4.21 The "after frameset" insertion mode.
    AfterFrameset,
    /// § 13.2.6.4.22 The "after after body" insertion mode.
    AfterAfterBody,
    /// § 13.2.6.4.23 The "after after frameset" insertion mode.
    AfterAfterFrameset,
    /// § 13.2.6.5 The rules for parsing tokens in foreign content.
    InForeignContent,
}

/// Everything one parse produced: the tree, the recorded issues, and the
/// quirks flag the DOCTYPE prologue selected.
#[derive(Debug)]
pub struct ParseOutcome {
    /// The constructed DOM tree.
    pub tree: DomTree,
    /// Parse issues in token order.
    pub issues: Vec<ParseIssue>,
    /// Whether the document parses in quirks mode.
    pub quirks_mode: bool,
}

/// [§ 13.2.2 Parse errors](https://html.spec.whatwg.org/multipage/parsing.html#parse-errors)
///
/// A recorded parse error or warning. "The handling of parse errors is
/// well-defined" - recording one never stops the parse.
#[derive(Debug, Clone)]
pub struct ParseIssue {
    /// Description of the parse error per the spec's error definitions.
    pub message: String,
    /// Index into the token stream where this error was encountered.
    pub token_index: usize,
}

/// [§ 13.2.4.3 The list of active formatting elements](https://html.spec.whatwg.org/multipage/parsing.html#the-list-of-active-formatting-elements)
///
/// "The list of active formatting elements... is used to handle mis-nested
/// formatting element tags."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormattingEntry {
    /// A formatting element (a, b, big, code, em, font, i, nobr, s, small,
    /// strike, strong, tt, u) that may need reopening.
    Element(NodeId),
    /// "A marker... Markers are inserted when entering applet, object,
    /// marquee, template, td, th, and caption elements" and scope the list.
    Marker,
}

/// Scope terminator set shared by the default, list-item, and button scopes.
const DEFAULT_SCOPE_TERMINATORS: &[&str] = &[
    "applet", "caption", "html", "table", "td", "th", "marquee", "object",
];

/// MathML elements that terminate scopes and act as text integration points.
const MATHML_TEXT_INTEGRATION: &[&str] = &["mi", "mo", "mn", "ms", "mtext"];

/// SVG elements that terminate scopes and act as HTML integration points.
const SVG_HTML_INTEGRATION: &[&str] = &["foreignObject", "desc", "title"];

/// The formatting element category.
const FORMATTING_TAGS: &[&str] = &[
    "a", "b", "big", "code", "em", "font", "i", "nobr", "s", "small", "strike", "strong", "tt", "u",
];

/// [§ 13.2.4.2 "special" category](https://html.spec.whatwg.org/multipage/parsing.html#special)
const SPECIAL_TAGS: &[&str] = &[
    "address", "applet", "area", "article", "aside", "base", "basefont", "bgsound", "blockquote",
    "body", "br", "button", "caption", "center", "col", "colgroup", "dd", "details", "dir", "div",
    "dl", "dt", "embed", "fieldset", "figcaption", "figure", "footer", "form", "frame", "frameset",
    "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hgroup", "hr", "html", "iframe", "img",
    "input", "keygen", "li", "link", "listing", "main", "marquee", "menu", "meta", "nav", "noembed",
    "noframes", "noscript", "object", "ol", "p", "param", "plaintext", "pre", "script", "section",
    "select", "source", "style", "summary", "table", "tbody", "td", "textarea", "tfoot", "th",
    "thead", "title", "tr", "track", "ul", "wbr", "xmp",
];

/// Start tags that break out of foreign content
/// ([§ 13.2.6.5](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inforeign)).
const FOREIGN_BREAKOUT_TAGS: &[&str] = &[
    "b", "big", "blockquote", "body", "br", "center", "code", "dd", "div", "dl", "dt", "em",
    "embed", "h1", "h2", "h3", "h4", "h5", "h6", "head", "hr", "i", "img", "li", "listing", "menu",
    "meta", "nobr", "ol", "p", "pre", "ruby", "s", "small", "span", "strong", "strike", "sub",
    "sup", "table", "tt", "u", "ul", "var",
];

/// Where a node is about to be inserted.
struct InsertionLocation {
    parent: NodeId,
    before: Option<NodeId>,
}

/// [§ 13.2.6 Tree construction](https://html.spec.whatwg.org/multipage/parsing.html#tree-construction)
///
/// The HTML parser builds a DOM tree from a stream of tokens.
pub struct HtmlParser {
    insertion_mode: InsertionMode,
    original_insertion_mode: InsertionMode,

    /// [§ 13.2.4.3 The stack of open elements](https://html.spec.whatwg.org/multipage/parsing.html#the-stack-of-open-elements)
    open_elements: Vec<NodeId>,
    active_formatting: Vec<FormattingEntry>,

    /// [§ 13.2.4.4 The element pointers](https://html.spec.whatwg.org/multipage/parsing.html#the-element-pointers)
    head_element: Option<NodeId>,
    form_element: Option<NodeId>,

    tree: DomTree,
    tokens: Vec<Token>,
    token_index: usize,
    stopped: bool,

    /// "If the frameset-ok flag is 'ok'... a frameset element can still be
    /// inserted."
    frameset_ok: bool,
    quirks_mode: bool,
    foster_parenting: bool,

    /// Honored after `<pre>`, `<textarea>`, and `<listing>`: "the next token
    /// ... if it is a U+000A LINE FEED character token, ignore that token."
    skip_leading_newline: bool,

    /// [§ 13.2.6.4.10](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intabletext)
    /// "the pending table character tokens list".
    pending_table_characters: Vec<char>,

    issues: Vec<ParseIssue>,
}

impl HtmlParser {
    /// Create a new parser from a token stream.
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        HtmlParser {
            insertion_mode: InsertionMode::Initial,
            original_insertion_mode: InsertionMode::InBody,
            open_elements: Vec::new(),
            active_formatting: Vec::new(),
            head_element: None,
            form_element: None,
            tree: DomTree::new(),
            tokens,
            token_index: 0,
            stopped: false,
            frameset_ok: true,
            quirks_mode: false,
            foster_parenting: false,
            skip_leading_newline: false,
            pending_table_characters: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// Run the parser and return the DOM tree.
    #[must_use]
    pub fn run(mut self) -> DomTree {
        while !self.stopped && self.token_index < self.tokens.len() {
            let token = self.tokens[self.token_index].clone();
            self.dispatch(&token);
            self.token_index += 1;
        }
        // EOF in any mode closes all open elements.
        self.open_elements.clear();
        self.tree
    }

    /// Run the parser and return both the tree and the recorded issues.
    #[must_use]
    pub fn run_with_issues(self) -> (DomTree, Vec<ParseIssue>) {
        let outcome = self.finish();
        (outcome.tree, outcome.issues)
    }

    /// Run the parser and return everything the parse produced.
    #[must_use]
    pub fn finish(mut self) -> ParseOutcome {
        while !self.stopped && self.token_index < self.tokens.len() {
            let token = self.tokens[self.token_index].clone();
            self.dispatch(&token);
            self.token_index += 1;
        }
        self.open_elements.clear();
        ParseOutcome {
            tree: self.tree,
            issues: self.issues,
            quirks_mode: self.quirks_mode,
        }
    }

    /// Whether a DOCTYPE put the document into quirks mode.
    #[must_use]
    pub const fn quirks_mode(&self) -> bool {
        self.quirks_mode
    }

    /// Parse issues recorded so far.
    #[must_use]
    pub fn issues(&self) -> &[ParseIssue] {
        &self.issues
    }

    fn parse_error(&mut self, message: &str) {
        warn_once(WarnKind::HtmlParser, message);
        self.issues.push(ParseIssue {
            message: message.to_string(),
            token_index: self.token_index,
        });
    }

    // ==================================================================
    // Dispatcher
    // ==================================================================

    /// [Tree construction dispatcher](https://html.spec.whatwg.org/multipage/parsing.html#tree-construction-dispatcher):
    /// tokens are processed per the current insertion mode unless the
    /// current node is a foreign element outside an integration point.
    fn dispatch(&mut self, token: &Token) {
        if self.skip_leading_newline {
            self.skip_leading_newline = false;
            if matches!(token, Token::SpaceCharacter { data: '\n' }) {
                return;
            }
        }
        let mode = if self.use_foreign_rules(token) {
            InsertionMode::InForeignContent
        } else {
            self.insertion_mode
        };
        self.handle_mode(mode, token);
    }

    fn handle_mode(&mut self, mode: InsertionMode, token: &Token) {
        match mode {
            InsertionMode::Initial => self.handle_initial(token),
            InsertionMode::BeforeHtml => self.handle_before_html(token),
            InsertionMode::BeforeHead => self.handle_before_head(token),
            InsertionMode::InHead => self.handle_in_head(token),
            InsertionMode::InHeadNoscript => self.handle_in_head_noscript(token),
            InsertionMode::AfterHead => self.handle_after_head(token),
            InsertionMode::InBody => self.handle_in_body(token),
            InsertionMode::Text => self.handle_text(token),
            InsertionMode::InTable => self.handle_in_table(token),
            InsertionMode::InTableText => self.handle_in_table_text(token),
            InsertionMode::InCaption => self.handle_in_caption(token),
            InsertionMode::InColumnGroup => self.handle_in_column_group(token),
            InsertionMode::InTableBody => self.handle_in_table_body(token),
            InsertionMode::InRow => self.handle_in_row(token),
            InsertionMode::InCell => self.handle_in_cell(token),
            InsertionMode::InSelect => self.handle_in_select(token),
            InsertionMode::InSelectInTable => self.handle_in_select_in_table(token),
            InsertionMode::AfterBody => self.handle_after_body(token),
            InsertionMode::InFrameset => self.handle_in_frameset(token),
            InsertionMode::AfterFrameset => self.handle_after_frameset(token),
            InsertionMode::AfterAfterBody => self.handle_after_after_body(token),
            InsertionMode::AfterAfterFrameset => self.handle_after_after_frameset(token),
            InsertionMode::InForeignContent => self.handle_in_foreign_content(token),
        }
    }

    fn use_foreign_rules(&self, token: &Token) -> bool {
        let Some(current) = self.current_node() else {
            return false;
        };
        let Some(element) = self.tree.as_element(current) else {
            return false;
        };
        if element.is_html() {
            return false;
        }
        let tag = element.tag_name.as_str();
        let mathml_text = element.namespace == *MATHML_NAMESPACE
            && MATHML_TEXT_INTEGRATION.contains(&tag);
        if mathml_text {
            match token {
                Token::StartTag { name, .. } if name != "mglyph" && name != "malignmark" => {
                    return false;
                }
                Token::Character { .. } | Token::SpaceCharacter { .. } => return false,
                _ => {}
            }
        }
        if element.namespace == *MATHML_NAMESPACE && tag == "annotation-xml" {
            if let Token::StartTag { name, .. } = token {
                if name == "svg" {
                    return false;
                }
            }
            let html_encoding = element.attribute_str("encoding").is_some_and(|e| {
                e.eq_ignore_ascii_case("text/html") || e.eq_ignore_ascii_case("application/xhtml+xml")
            });
            if html_encoding
                && matches!(
                    token,
                    Token::StartTag { .. } | Token::Character { .. } | Token::SpaceCharacter { .. }
                )
            {
                return false;
            }
        }
        if element.namespace == *SVG_NAMESPACE
            && SVG_HTML_INTEGRATION.contains(&tag)
            && matches!(
                token,
                Token::StartTag { .. } | Token::Character { .. } | Token::SpaceCharacter { .. }
            )
        {
            return false;
        }
        !matches!(token, Token::EndOfFile)
    }

    // ==================================================================
    // Stack and tree helpers
    // ==================================================================

    fn current_node(&self) -> Option<NodeId> {
        self.open_elements.last().copied()
    }

    fn tag_of(&self, id: NodeId) -> &'static str {
        self.tree.as_element(id).map_or("", |e| e.tag_name.as_str())
    }

    fn is_html_element(&self, id: NodeId) -> bool {
        self.tree.as_element(id).is_some_and(ElementData::is_html)
    }

    fn current_tag_is(&self, tag: &str) -> bool {
        self.current_node()
            .is_some_and(|id| self.tag_of(id) == tag && self.is_html_element(id))
    }

    fn html_element(&self) -> NodeId {
        self.open_elements.first().copied().unwrap_or(NodeId::ROOT)
    }

    fn is_special(&self, id: NodeId) -> bool {
        let Some(element) = self.tree.as_element(id) else {
            return false;
        };
        let tag = element.tag_name.as_str();
        if element.is_html() {
            SPECIAL_TAGS.contains(&tag)
        } else if element.namespace == *MATHML_NAMESPACE {
            MATHML_TEXT_INTEGRATION.contains(&tag) || tag == "annotation-xml"
        } else {
            SVG_HTML_INTEGRATION.contains(&tag)
        }
    }

    /// [§ 13.2.4.3 "have an element in scope"](https://html.spec.whatwg.org/multipage/parsing.html#has-an-element-in-target-scope)
    ///
    /// Walk the stack from the top; each scope has its own terminator set.
    fn in_scope_with(&self, target: &str, extra_terminators: &[&str]) -> bool {
        for &node in self.open_elements.iter().rev() {
            let Some(element) = self.tree.as_element(node) else {
                continue;
            };
            let tag = element.tag_name.as_str();
            if element.is_html() {
                if tag == target {
                    return true;
                }
                if DEFAULT_SCOPE_TERMINATORS.contains(&tag) || extra_terminators.contains(&tag) {
                    return false;
                }
            } else if element.namespace == *MATHML_NAMESPACE {
                if MATHML_TEXT_INTEGRATION.contains(&tag) || tag == "annotation-xml" {
                    return false;
                }
            } else if SVG_HTML_INTEGRATION.contains(&tag) {
                return false;
            }
        }
        false
    }

    fn in_scope(&self, target: &str) -> bool {
        self.in_scope_with(target, &[])
    }

    fn in_list_item_scope(&self, target: &str) -> bool {
        self.in_scope_with(target, &["ol", "ul"])
    }

    fn in_button_scope(&self, target: &str) -> bool {
        self.in_scope_with(target, &["button"])
    }

    fn in_table_scope(&self, target: &str) -> bool {
        for &node in self.open_elements.iter().rev() {
            let tag = self.tag_of(node);
            if tag == target && self.is_html_element(node) {
                return true;
            }
            if tag == "html" || tag == "table" {
                return false;
            }
        }
        false
    }

    fn in_select_scope(&self, target: &str) -> bool {
        for &node in self.open_elements.iter().rev() {
            let tag = self.tag_of(node);
            if tag == target && self.is_html_element(node) {
                return true;
            }
            if tag != "optgroup" && tag != "option" {
                return false;
            }
        }
        false
    }

    fn node_in_scope(&self, target_node: NodeId) -> bool {
        for &node in self.open_elements.iter().rev() {
            if node == target_node {
                return true;
            }
            let Some(element) = self.tree.as_element(node) else {
                continue;
            };
            let tag = element.tag_name.as_str();
            if element.is_html() {
                if DEFAULT_SCOPE_TERMINATORS.contains(&tag) {
                    return false;
                }
            } else if element.namespace == *MATHML_NAMESPACE {
                if MATHML_TEXT_INTEGRATION.contains(&tag) || tag == "annotation-xml" {
                    return false;
                }
            } else if SVG_HTML_INTEGRATION.contains(&tag) {
                return false;
            }
        }
        false
    }

    /// [§ 13.2.6.3 Closing elements that have implied end tags](https://html.spec.whatwg.org/multipage/parsing.html#generate-implied-end-tags)
    fn generate_implied_end_tags(&mut self, except: Option<&str>) {
        loop {
            let Some(current) = self.current_node() else {
                return;
            };
            let tag = self.tag_of(current);
            if matches!(tag, "dd" | "dt" | "li" | "option" | "optgroup" | "p" | "rp" | "rt")
                && Some(tag) != except
            {
                let _ = self.open_elements.pop();
            } else {
                return;
            }
        }
    }

    fn pop_until_popped(&mut self, tag: &str) {
        while let Some(node) = self.open_elements.pop() {
            if self.tag_of(node) == tag && self.is_html_element(node) {
                return;
            }
        }
    }

    fn pop_until_node_popped(&mut self, target: NodeId) {
        while let Some(node) = self.open_elements.pop() {
            if node == target {
                return;
            }
        }
    }

    fn pop_until_one_of_popped(&mut self, tags: &[&str]) {
        while let Some(node) = self.open_elements.pop() {
            if tags.contains(&self.tag_of(node)) && self.is_html_element(node) {
                return;
            }
        }
    }

    /// "Clear the stack back to a table context."
    fn clear_stack_to_table_context(&mut self) {
        while let Some(current) = self.current_node() {
            if matches!(self.tag_of(current), "table" | "html") {
                return;
            }
            let _ = self.open_elements.pop();
        }
    }

    /// "Clear the stack back to a table body context."
    fn clear_stack_to_table_body_context(&mut self) {
        while let Some(current) = self.current_node() {
            if matches!(self.tag_of(current), "tbody" | "tfoot" | "thead" | "html") {
                return;
            }
            let _ = self.open_elements.pop();
        }
    }

    /// "Clear the stack back to a table row context."
    fn clear_stack_to_table_row_context(&mut self) {
        while let Some(current) = self.current_node() {
            if matches!(self.tag_of(current), "tr" | "html") {
                return;
            }
            let _ = self.open_elements.pop();
        }
    }

    // ==================================================================
    // Node creation and insertion
    // ==================================================================

    fn create_element(&mut self, name: &str, namespace: Atom, attributes: &[Attribute]) -> NodeId {
        let mut data = ElementData::new(Atom::new(name), namespace);
        for attr in attributes {
            data.add_attribute(Atom::new(&attr.name), attr.value.clone());
        }
        self.tree.alloc(NodeType::Element(data))
    }

    /// Duplicate an element's tag and attributes into a fresh node. Used by
    /// formatting reconstruction and the adoption agency.
    fn clone_element(&mut self, source: NodeId) -> NodeId {
        let data = self
            .tree
            .as_element(source)
            .cloned()
            .unwrap_or_else(|| ElementData::new(Atom::new("span"), *HTML_NAMESPACE));
        let mut fresh = ElementData::new(data.tag_name, data.namespace);
        for attr in data.attributes() {
            fresh.add_attribute(attr.name, attr.value.clone());
        }
        self.tree.alloc(NodeType::Element(fresh))
    }

    /// [§ 13.2.6.1 "appropriate place for inserting a node"](https://html.spec.whatwg.org/multipage/parsing.html#appropriate-place-for-inserting-a-node)
    ///
    /// Foster parenting: while the foster-parenting flag is set and the
    /// target is a table-section element, nodes go before the nearest
    /// enclosing table (or inside the element before it when the table has
    /// no parent).
    fn insertion_location(&self, override_target: Option<NodeId>) -> InsertionLocation {
        let target = override_target
            .or_else(|| self.current_node())
            .unwrap_or(NodeId::ROOT);

        if self.foster_parenting
            && matches!(self.tag_of(target), "table" | "tbody" | "tfoot" | "thead" | "tr")
        {
            let table_index = self
                .open_elements
                .iter()
                .rposition(|&n| self.tag_of(n) == "table");
            if let Some(index) = table_index {
                let table = self.open_elements[index];
                if let Some(parent) = self.tree.parent(table) {
                    return InsertionLocation {
                        parent,
                        before: Some(table),
                    };
                }
                // A table with no parent: insert inside the element that sits
                // just below it on the stack.
                return InsertionLocation {
                    parent: self.open_elements[index.saturating_sub(1)],
                    before: None,
                };
            }
            return InsertionLocation {
                parent: self.html_element(),
                before: None,
            };
        }

        InsertionLocation {
            parent: target,
            before: None,
        }
    }

    fn insert_at(&mut self, location: &InsertionLocation, node: NodeId) {
        match location.before {
            Some(before) => self.tree.insert_before(location.parent, node, before),
            None => self.tree.append_child(location.parent, node),
        }
    }

    /// [§ 13.2.6.1 Insert a character](https://html.spec.whatwg.org/multipage/parsing.html#insert-a-character)
    ///
    /// Adjacent character runs merge into one text node: "if there is a Text
    /// node immediately before the adjusted insertion location, append data
    /// to that Text node."
    fn insert_character(&mut self, c: char) {
        let location = self.insertion_location(None);
        if location.parent == NodeId::ROOT {
            // Characters are never inserted directly into the Document.
            return;
        }
        let preceding = match location.before {
            Some(before) => self.tree.prev_sibling(before),
            None => self.tree.last_child(location.parent),
        };
        if let Some(prev) = preceding {
            if self.tree.as_text(prev).is_some() {
                self.tree.append_text(prev, &c.to_string());
                return;
            }
        }
        let text = self.tree.alloc(NodeType::Text(c.to_string()));
        self.insert_at(&location, text);
    }

    /// [§ 13.2.6.1 Insert a comment](https://html.spec.whatwg.org/multipage/parsing.html#insert-a-comment)
    fn insert_comment(&mut self, data: &str, parent: Option<NodeId>) {
        let comment = self.tree.alloc(NodeType::Comment(data.to_string()));
        match parent {
            Some(parent) => self.tree.append_child(parent, comment),
            None => {
                let location = self.insertion_location(None);
                self.insert_at(&location, comment);
            }
        }
    }

    /// [§ 13.2.6.1 Insert a foreign element / insert an HTML element](https://html.spec.whatwg.org/multipage/parsing.html#insert-a-foreign-element)
    fn insert_element(&mut self, name: &str, namespace: Atom, attributes: &[Attribute]) -> NodeId {
        let element = self.create_element(name, namespace, attributes);
        let location = self.insertion_location(None);
        self.insert_at(&location, element);
        self.open_elements.push(element);
        element
    }

    fn insert_html_element(&mut self, name: &str, attributes: &[Attribute]) -> NodeId {
        self.insert_element(name, *HTML_NAMESPACE, attributes)
    }

    /// Insert an element that takes no content: insert, then pop immediately.
    fn insert_self_closing(&mut self, name: &str, attributes: &[Attribute]) {
        let _ = self.insert_html_element(name, attributes);
        let _ = self.open_elements.pop();
    }

    /// Merge token attributes into an existing element, first-wins per name.
    /// Used for repeated `<html>` and `<body>` start tags.
    fn merge_attributes(&mut self, target: NodeId, attributes: &[Attribute]) {
        let interned: Vec<(Atom, String)> = attributes
            .iter()
            .map(|attr| (Atom::new(&attr.name), attr.value.clone()))
            .collect();
        if let Some(element) = self.tree.as_element_mut(target) {
            for (name, value) in interned {
                element.add_attribute(name, value);
            }
        }
    }

    // ==================================================================
    // Active formatting elements
    // ==================================================================

    fn formatting_position(&self, node: NodeId) -> Option<usize> {
        self.active_formatting
            .iter()
            .position(|entry| *entry == FormattingEntry::Element(node))
    }

    /// Push with the Noah's Ark clause: "if there are already three elements
    /// in the list after the last marker with the same tag name, namespace,
    /// and attributes, then remove the earliest such element."
    fn push_formatting_element(&mut self, node: NodeId) {
        let Some(data) = self.tree.as_element(node).cloned() else {
            return;
        };
        let mut equivalent = Vec::new();
        for (index, entry) in self.active_formatting.iter().enumerate().rev() {
            match entry {
                FormattingEntry::Marker => break,
                FormattingEntry::Element(existing) => {
                    let Some(other) = self.tree.as_element(*existing) else {
                        continue;
                    };
                    if other.tag_name == data.tag_name
                        && other.namespace == data.namespace
                        && other.attributes() == data.attributes()
                    {
                        equivalent.push(index);
                    }
                }
            }
        }
        if equivalent.len() >= 3 {
            // `equivalent` is in reverse order; the last entry is earliest.
            let _ = self.active_formatting.remove(equivalent[equivalent.len() - 1]);
        }
        self.active_formatting.push(FormattingEntry::Element(node));
    }

    fn clear_formatting_to_last_marker(&mut self) {
        while let Some(entry) = self.active_formatting.pop() {
            if entry == FormattingEntry::Marker {
                return;
            }
        }
    }

    /// [§ 13.2.4.3 Reconstruct the active formatting elements](https://html.spec.whatwg.org/multipage/parsing.html#reconstruct-the-active-formatting-elements)
    fn reconstruct_active_formatting_elements(&mut self) {
        let Some(last) = self.active_formatting.last() else {
            return;
        };
        match last {
            FormattingEntry::Marker => return,
            FormattingEntry::Element(node) => {
                if self.open_elements.contains(node) {
                    return;
                }
            }
        }

        // Rewind to the entry after the nearest marker or open element.
        let mut index = self.active_formatting.len() - 1;
        loop {
            if index == 0 {
                break;
            }
            index -= 1;
            let stop = match self.active_formatting[index] {
                FormattingEntry::Marker => true,
                FormattingEntry::Element(node) => self.open_elements.contains(&node),
            };
            if stop {
                index += 1;
                break;
            }
        }

        // Advance: clone each entry and reopen it.
        while index < self.active_formatting.len() {
            let FormattingEntry::Element(old) = self.active_formatting[index] else {
                index += 1;
                continue;
            };
            let clone = self.clone_element(old);
            let location = self.insertion_location(None);
            self.insert_at(&location, clone);
            self.open_elements.push(clone);
            self.active_formatting[index] = FormattingEntry::Element(clone);
            index += 1;
        }
    }

    // ==================================================================
    // The adoption agency algorithm
    // ==================================================================

    /// [§ 13.2.6.4.7 The adoption agency algorithm](https://html.spec.whatwg.org/multipage/parsing.html#adoption-agency-algorithm)
    ///
    /// Up to 8 outer and 3 inner iterations, cloning the formatting element
    /// once per outer pass, reparenting the furthest block's children, and
    /// relocating the clone.
    #[allow(clippy::too_many_lines)]
    fn adoption_agency(&mut self, subject: &str) {
        // Shortcut: the current node is the subject and not in the list.
        if let Some(&current) = self.open_elements.last() {
            if self.is_html_element(current)
                && self.tag_of(current) == subject
                && self.formatting_position(current).is_none()
            {
                let _ = self.open_elements.pop();
                return;
            }
        }

        for _ in 0..8 {
            // Find the formatting element: the last element in the list of
            // active formatting elements before the last marker with the
            // subject's tag name.
            let mut formatting = None;
            for entry in self.active_formatting.iter().rev() {
                match entry {
                    FormattingEntry::Marker => break,
                    FormattingEntry::Element(node) => {
                        if self.tag_of(*node) == subject {
                            formatting = Some(*node);
                            break;
                        }
                    }
                }
            }
            let Some(formatting_element) = formatting else {
                self.any_other_end_tag_in_body(subject);
                return;
            };

            let Some(stack_index) = self
                .open_elements
                .iter()
                .position(|&n| n == formatting_element)
            else {
                self.parse_error("formatting element not in the stack of open elements");
                if let Some(pos) = self.formatting_position(formatting_element) {
                    let _ = self.active_formatting.remove(pos);
                }
                return;
            };

            if !self.node_in_scope(formatting_element) {
                self.parse_error("formatting element not in scope");
                return;
            }
            if Some(formatting_element) != self.current_node() {
                self.parse_error("formatting end tag does not match current node");
            }

            // The furthest block: the topmost node in the stack lower than
            // the formatting element that is special.
            let furthest_block = self.open_elements[stack_index + 1..]
                .iter()
                .copied()
                .find(|&n| self.is_special(n));
            let Some(furthest_block) = furthest_block else {
                self.open_elements.truncate(stack_index);
                if let Some(pos) = self.formatting_position(formatting_element) {
                    let _ = self.active_formatting.remove(pos);
                }
                return;
            };

            let common_ancestor = self.open_elements[stack_index.saturating_sub(1)];
            let mut bookmark = self
                .formatting_position(formatting_element)
                .unwrap_or(self.active_formatting.len());

            let furthest_index = self
                .open_elements
                .iter()
                .position(|&n| n == furthest_block)
                .unwrap_or(stack_index + 1);

            let mut node_index = furthest_index;
            let mut last_node = furthest_block;
            let mut inner = 0usize;
            loop {
                inner += 1;
                node_index -= 1;
                let node = self.open_elements[node_index];
                if node == formatting_element {
                    break;
                }

                let mut list_position = self.formatting_position(node);
                if inner > 3 {
                    if let Some(pos) = list_position.take() {
                        let _ = self.active_formatting.remove(pos);
                        if pos < bookmark {
                            bookmark -= 1;
                        }
                    }
                }
                let Some(pos) = list_position else {
                    let _ = self.open_elements.remove(node_index);
                    continue;
                };

                let clone = self.clone_element(node);
                self.active_formatting[pos] = FormattingEntry::Element(clone);
                self.open_elements[node_index] = clone;
                if last_node == furthest_block {
                    bookmark = pos + 1;
                }
                self.tree.append_child(clone, last_node);
                last_node = clone;
            }

            // Place whatever last node ended up being at the appropriate
            // place for the common ancestor, foster-parenting included.
            let location = self.insertion_location(Some(common_ancestor));
            self.tree.detach(last_node);
            self.insert_at(&location, last_node);

            // Fresh clone of the formatting element takes over the furthest
            // block's children.
            let clone = self.clone_element(formatting_element);
            self.tree.reparent_children(furthest_block, clone);
            self.tree.append_child(furthest_block, clone);

            if let Some(pos) = self.formatting_position(formatting_element) {
                let _ = self.active_formatting.remove(pos);
                if pos < bookmark {
                    bookmark -= 1;
                }
            }
            let insert_at = bookmark.min(self.active_formatting.len());
            self.active_formatting
                .insert(insert_at, FormattingEntry::Element(clone));

            if let Some(pos) = self.open_elements.iter().position(|&n| n == formatting_element) {
                let _ = self.open_elements.remove(pos);
            }
            if let Some(pos) = self.open_elements.iter().position(|&n| n == furthest_block) {
                self.open_elements.insert(pos + 1, clone);
            }
        }
    }

    /// "Any other end tag" handling in the in-body mode: walk the stack for a
    /// matching element, generating implied end tags; abort at any special
    /// element.
    fn any_other_end_tag_in_body(&mut self, subject: &str) {
        for index in (0..self.open_elements.len()).rev() {
            let node = self.open_elements[index];
            if self.tag_of(node) == subject && self.is_html_element(node) {
                self.generate_implied_end_tags(Some(subject));
                if self.current_node() != Some(node) {
                    self.parse_error("unexpected end tag for open element");
                }
                self.pop_until_node_popped(node);
                return;
            }
            if self.is_special(node) {
                self.parse_error("end tag with no matching open element");
                return;
            }
        }
    }

    // ==================================================================
    // Mode-independent fragments
    // ==================================================================

    /// [§ 13.2.6.4.22 Resetting the insertion mode appropriately](https://html.spec.whatwg.org/multipage/parsing.html#reset-the-insertion-mode-appropriately)
    fn reset_insertion_mode(&mut self) {
        for (index, &node) in self.open_elements.iter().enumerate().rev() {
            let last = index == 0;
            match self.tag_of(node) {
                "select" => {
                    // Walk the remainder of the stack for an enclosing table.
                    for &ancestor in self.open_elements[..index].iter().rev() {
                        match self.tag_of(ancestor) {
                            "table" => {
                                self.insertion_mode = InsertionMode::InSelectInTable;
                                return;
                            }
                            "template" => break,
                            _ => {}
                        }
                    }
                    self.insertion_mode = InsertionMode::InSelect;
                    return;
                }
                "td" | "th" if !last => {
                    self.insertion_mode = InsertionMode::InCell;
                    return;
                }
                "tr" => {
                    self.insertion_mode = InsertionMode::InRow;
                    return;
                }
                "tbody" | "thead" | "tfoot" => {
                    self.insertion_mode = InsertionMode::InTableBody;
                    return;
                }
                "caption" => {
                    self.insertion_mode = InsertionMode::InCaption;
                    return;
                }
                "colgroup" => {
                    self.insertion_mode = InsertionMode::InColumnGroup;
                    return;
                }
                "table" => {
                    self.insertion_mode = InsertionMode::InTable;
                    return;
                }
                "head" if !last => {
                    self.insertion_mode = InsertionMode::InHead;
                    return;
                }
                "body" => {
                    self.insertion_mode = InsertionMode::InBody;
                    return;
                }
                "frameset" => {
                    self.insertion_mode = InsertionMode::InFrameset;
                    return;
                }
                "html" => {
                    self.insertion_mode = if self.head_element.is_none() {
                        InsertionMode::BeforeHead
                    } else {
                        InsertionMode::AfterHead
                    };
                    return;
                }
                _ => {}
            }
            if last {
                self.insertion_mode = InsertionMode::InBody;
                return;
            }
        }
        self.insertion_mode = InsertionMode::InBody;
    }

    /// Close a `<p>` element:
    /// "generate implied end tags, except for p elements", then pop to the p.
    fn close_p_element(&mut self) {
        self.generate_implied_end_tags(Some("p"));
        if !self.current_tag_is("p") {
            self.parse_error("unclosed elements inside p");
        }
        self.pop_until_popped("p");
    }

    fn close_p_if_in_button_scope(&mut self) {
        if self.in_button_scope("p") {
            self.close_p_element();
        }
    }

    /// "Close the cell": used when a new cell or row starts while a td/th is
    /// open.
    fn close_cell(&mut self) {
        self.generate_implied_end_tags(None);
        if !self.current_tag_is("td") && !self.current_tag_is("th") {
            self.parse_error("unclosed elements inside table cell");
        }
        self.pop_until_one_of_popped(&["td", "th"]);
        self.clear_formatting_to_last_marker();
        self.insertion_mode = InsertionMode::InRow;
    }

    fn stop_parsing(&mut self) {
        self.stopped = true;
        self.open_elements.clear();
    }

    /// Process a synthesized start tag as if it appeared in the stream.
    fn fake_start_tag(&mut self, name: &str) {
        let token = Token::StartTag {
            name: name.to_string(),
            self_closing: false,
            attributes: Vec::new(),
        };
        self.dispatch(&token);
    }

    // ==================================================================
    // § 13.2.6.4.1 - 13.2.6.4.6: document prologue modes
    // ==================================================================

    fn handle_initial(&mut self, token: &Token) {
        match token {
            Token::SpaceCharacter { .. } => {}
            Token::Comment { data } => self.insert_comment(data, Some(NodeId::ROOT)),
            Token::Doctype {
                name,
                public_identifier,
                force_quirks,
                system_identifier,
            } => {
                // Quirks detection covers the common legacy doctypes; the
                // full spec table lists dozens of dead public identifiers.
                let name_ok = name.as_deref() == Some("html");
                let legacy_public = public_identifier.as_deref().is_some_and(|p| {
                    let p = p.to_ascii_lowercase();
                    p.starts_with("-//w3c//dtd html 4.01 frameset//")
                        || p.starts_with("-//w3c//dtd html 4.01 transitional//")
                        || p.starts_with("+//silmaril//")
                        || p.starts_with("-//advasoft ltd//")
                        || p.starts_with("-//ietf//dtd html//")
                });
                if *force_quirks
                    || !name_ok
                    || (legacy_public && system_identifier.is_none())
                {
                    self.quirks_mode = true;
                }
                self.insertion_mode = InsertionMode::BeforeHtml;
            }
            _ => {
                self.quirks_mode = true;
                self.insertion_mode = InsertionMode::BeforeHtml;
                self.dispatch(token);
            }
        }
    }

    fn handle_before_html(&mut self, token: &Token) {
        match token {
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::Comment { data } => self.insert_comment(data, Some(NodeId::ROOT)),
            Token::SpaceCharacter { .. } => {}
            Token::StartTag {
                name, attributes, ..
            } if name == "html" => {
                let element = self.create_element("html", *HTML_NAMESPACE, attributes);
                self.tree.append_child(NodeId::ROOT, element);
                self.open_elements.push(element);
                self.insertion_mode = InsertionMode::BeforeHead;
            }
            Token::EndTag { name, .. }
                if !matches!(name.as_str(), "head" | "body" | "html" | "br") =>
            {
                self.parse_error("unexpected end tag before html");
            }
            _ => {
                let element = self.create_element("html", *HTML_NAMESPACE, &[]);
                self.tree.append_child(NodeId::ROOT, element);
                self.open_elements.push(element);
                self.insertion_mode = InsertionMode::BeforeHead;
                self.dispatch(token);
            }
        }
    }

    fn handle_before_head(&mut self, token: &Token) {
        match token {
            Token::SpaceCharacter { .. } => {}
            Token::Comment { data } => self.insert_comment(data, None),
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body(token),
            Token::StartTag {
                name, attributes, ..
            } if name == "head" => {
                let head = self.insert_html_element("head", attributes);
                self.head_element = Some(head);
                self.insertion_mode = InsertionMode::InHead;
            }
            Token::EndTag { name, .. }
                if !matches!(name.as_str(), "head" | "body" | "html" | "br") =>
            {
                self.parse_error("unexpected end tag before head");
            }
            _ => {
                let head = self.insert_html_element("head", &[]);
                self.head_element = Some(head);
                self.insertion_mode = InsertionMode::InHead;
                self.dispatch(token);
            }
        }
    }

    fn handle_in_head(&mut self, token: &Token) {
        match token {
            Token::SpaceCharacter { data } => self.insert_character(*data),
            Token::Comment { data } => self.insert_comment(data, None),
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::StartTag {
                name, attributes, ..
            } => match name.as_str() {
                "html" => self.handle_in_body(token),
                "base" | "basefont" | "bgsound" | "link" | "meta" => {
                    self.insert_self_closing(name, attributes);
                }
                // The tokenizer already switched itself into RCDATA /
                // RAWTEXT / script data when it emitted these start tags;
                // the builder only has to park in the text mode.
                "title" | "noframes" | "style" | "script" => {
                    let _ = self.insert_html_element(name, attributes);
                    self.original_insertion_mode = self.insertion_mode;
                    self.insertion_mode = InsertionMode::Text;
                }
                "noscript" => {
                    let _ = self.insert_html_element(name, attributes);
                    self.insertion_mode = InsertionMode::InHeadNoscript;
                }
                "head" => self.parse_error("nested head start tag"),
                _ => {
                    let _ = self.open_elements.pop();
                    self.insertion_mode = InsertionMode::AfterHead;
                    self.dispatch(token);
                }
            },
            Token::EndTag { name, .. } => match name.as_str() {
                "head" => {
                    let _ = self.open_elements.pop();
                    self.insertion_mode = InsertionMode::AfterHead;
                }
                "body" | "html" | "br" => {
                    let _ = self.open_elements.pop();
                    self.insertion_mode = InsertionMode::AfterHead;
                    self.dispatch(token);
                }
                _ => self.parse_error("unexpected end tag in head"),
            },
            _ => {
                let _ = self.open_elements.pop();
                self.insertion_mode = InsertionMode::AfterHead;
                self.dispatch(token);
            }
        }
    }

    fn handle_in_head_noscript(&mut self, token: &Token) {
        match token {
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body(token),
            Token::EndTag { name, .. } if name == "noscript" => {
                let _ = self.open_elements.pop();
                self.insertion_mode = InsertionMode::InHead;
            }
            Token::SpaceCharacter { .. } | Token::Comment { .. } => self.handle_in_head(token),
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "basefont" | "bgsound" | "link" | "meta" | "noframes" | "style"
                ) =>
            {
                self.handle_in_head(token);
            }
            Token::StartTag { name, .. } if matches!(name.as_str(), "head" | "noscript") => {
                self.parse_error("unexpected start tag in noscript");
            }
            Token::EndTag { name, .. } if name != "br" => {
                self.parse_error("unexpected end tag in noscript");
            }
            _ => {
                self.parse_error("content outside noscript");
                let _ = self.open_elements.pop();
                self.insertion_mode = InsertionMode::InHead;
                self.dispatch(token);
            }
        }
    }

    fn handle_after_head(&mut self, token: &Token) {
        match token {
            Token::SpaceCharacter { data } => self.insert_character(*data),
            Token::Comment { data } => self.insert_comment(data, None),
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::StartTag {
                name, attributes, ..
            } => match name.as_str() {
                "html" => self.handle_in_body(token),
                "body" => {
                    let _ = self.insert_html_element("body", attributes);
                    self.frameset_ok = false;
                    self.insertion_mode = InsertionMode::InBody;
                }
                "frameset" => {
                    let _ = self.insert_html_element("frameset", attributes);
                    self.insertion_mode = InsertionMode::InFrameset;
                }
                "base" | "basefont" | "bgsound" | "link" | "meta" | "noframes" | "script"
                | "style" | "title" => {
                    self.parse_error("head element after head");
                    if let Some(head) = self.head_element {
                        self.open_elements.push(head);
                        self.handle_in_head(token);
                        self.open_elements.retain(|&n| n != head);
                    }
                }
                "head" => self.parse_error("head start tag after head"),
                _ => {
                    let _ = self.insert_html_element("body", &[]);
                    self.insertion_mode = InsertionMode::InBody;
                    self.dispatch(token);
                }
            },
            Token::EndTag { name, .. }
                if !matches!(name.as_str(), "body" | "html" | "br") =>
            {
                self.parse_error("unexpected end tag after head");
            }
            _ => {
                let _ = self.insert_html_element("body", &[]);
                self.insertion_mode = InsertionMode::InBody;
                self.dispatch(token);
            }
        }
    }

    // ==================================================================
    // § 13.2.6.4.7 The "in body" insertion mode
    // ==================================================================

    #[allow(clippy::too_many_lines)]
    fn handle_in_body(&mut self, token: &Token) {
        match token {
            Token::Character { data: '\0' } => self.parse_error("unexpected null character"),
            Token::SpaceCharacter { data } => {
                self.reconstruct_active_formatting_elements();
                self.insert_character(*data);
            }
            Token::Character { data } => {
                self.reconstruct_active_formatting_elements();
                self.insert_character(*data);
                self.frameset_ok = false;
            }
            Token::Comment { data } => self.insert_comment(data, None),
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => self.start_tag_in_body(name, attributes, *self_closing, token),
            Token::EndTag { name, .. } => self.end_tag_in_body(name, token),
            Token::EndOfFile => {
                for &node in &self.open_elements {
                    if !matches!(
                        self.tag_of(node),
                        "dd" | "dt"
                            | "li"
                            | "optgroup"
                            | "option"
                            | "p"
                            | "rb"
                            | "rp"
                            | "rt"
                            | "rtc"
                            | "tbody"
                            | "td"
                            | "tfoot"
                            | "th"
                            | "thead"
                            | "tr"
                            | "body"
                            | "html"
                    ) {
                        warn_once(WarnKind::HtmlParser, "EOF with unclosed elements");
                        break;
                    }
                }
                self.stop_parsing();
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    fn start_tag_in_body(
        &mut self,
        name: &str,
        attributes: &[Attribute],
        self_closing: bool,
        token: &Token,
    ) {
        match name {
            "html" => {
                self.parse_error("repeated html start tag");
                let html = self.html_element();
                self.merge_attributes(html, attributes);
            }
            "base" | "basefont" | "bgsound" | "link" | "meta" | "noframes" | "script" | "style"
            | "title" => self.handle_in_head(token),
            "body" => {
                self.parse_error("repeated body start tag");
                if let Some(&body) = self.open_elements.get(1) {
                    if self.tag_of(body) == "body" {
                        self.frameset_ok = false;
                        self.merge_attributes(body, attributes);
                    }
                }
            }
            "frameset" => {
                self.parse_error("frameset inside body");
                let body_is_second = self
                    .open_elements
                    .get(1)
                    .is_some_and(|&n| self.tag_of(n) == "body");
                if body_is_second && self.frameset_ok {
                    if let Some(&body) = self.open_elements.get(1) {
                        self.tree.detach(body);
                    }
                    self.open_elements.truncate(1);
                    let _ = self.insert_html_element("frameset", attributes);
                    self.insertion_mode = InsertionMode::InFrameset;
                }
            }
            "address" | "article" | "aside" | "blockquote" | "center" | "details" | "dialog"
            | "dir" | "div" | "dl" | "fieldset" | "figcaption" | "figure" | "footer" | "header"
            | "hgroup" | "main" | "menu" | "nav" | "ol" | "section" | "summary" | "ul" => {
                self.close_p_if_in_button_scope();
                let _ = self.insert_html_element(name, attributes);
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.close_p_if_in_button_scope();
                if self
                    .current_node()
                    .is_some_and(|n| matches!(self.tag_of(n), "h1" | "h2" | "h3" | "h4" | "h5" | "h6"))
                {
                    self.parse_error("nested heading start tag");
                    let _ = self.open_elements.pop();
                }
                let _ = self.insert_html_element(name, attributes);
            }
            "pre" | "listing" => {
                self.close_p_if_in_button_scope();
                let _ = self.insert_html_element(name, attributes);
                self.skip_leading_newline = true;
                self.frameset_ok = false;
            }
            "form" => {
                if self.form_element.is_some() {
                    self.parse_error("nested form start tag");
                } else {
                    self.close_p_if_in_button_scope();
                    let form = self.insert_html_element("form", attributes);
                    self.form_element = Some(form);
                }
            }
            "li" => {
                self.frameset_ok = false;
                for index in (0..self.open_elements.len()).rev() {
                    let node = self.open_elements[index];
                    let tag = self.tag_of(node);
                    if tag == "li" {
                        self.generate_implied_end_tags(Some("li"));
                        if !self.current_tag_is("li") {
                            self.parse_error("unclosed elements inside li");
                        }
                        self.pop_until_popped("li");
                        break;
                    }
                    if self.is_special(node) && !matches!(tag, "address" | "div" | "p") {
                        break;
                    }
                }
                self.close_p_if_in_button_scope();
                let _ = self.insert_html_element("li", attributes);
            }
            "dd" | "dt" => {
                self.frameset_ok = false;
                for index in (0..self.open_elements.len()).rev() {
                    let node = self.open_elements[index];
                    let tag = self.tag_of(node);
                    if tag == "dd" || tag == "dt" {
                        self.generate_implied_end_tags(Some(tag));
                        if !self.current_tag_is(tag) {
                            self.parse_error("unclosed elements inside dd/dt");
                        }
                        self.pop_until_popped(tag);
                        break;
                    }
                    if self.is_special(node) && !matches!(tag, "address" | "div" | "p") {
                        break;
                    }
                }
                self.close_p_if_in_button_scope();
                let _ = self.insert_html_element(name, attributes);
            }
            "plaintext" => {
                self.close_p_if_in_button_scope();
                let _ = self.insert_html_element("plaintext", attributes);
                // The tokenizer switched to PLAINTEXT at emit time; every
                // remaining token is a character.
            }
            "button" => {
                if self.in_scope("button") {
                    self.parse_error("nested button start tag");
                    self.generate_implied_end_tags(None);
                    self.pop_until_popped("button");
                }
                self.reconstruct_active_formatting_elements();
                let _ = self.insert_html_element("button", attributes);
                self.frameset_ok = false;
            }
            "a" => {
                let mut open_a = None;
                for entry in self.active_formatting.iter().rev() {
                    match entry {
                        FormattingEntry::Marker => break,
                        FormattingEntry::Element(node) => {
                            if self.tag_of(*node) == "a" {
                                open_a = Some(*node);
                                break;
                            }
                        }
                    }
                }
                if let Some(node) = open_a {
                    self.parse_error("a start tag with open a element");
                    self.adoption_agency("a");
                    if let Some(pos) = self.formatting_position(node) {
                        let _ = self.active_formatting.remove(pos);
                    }
                    self.open_elements.retain(|&n| n != node);
                }
                self.reconstruct_active_formatting_elements();
                let element = self.insert_html_element("a", attributes);
                self.push_formatting_element(element);
            }
            "b" | "big" | "code" | "em" | "font" | "i" | "s" | "small" | "strike" | "strong"
            | "tt" | "u" => {
                self.reconstruct_active_formatting_elements();
                let element = self.insert_html_element(name, attributes);
                self.push_formatting_element(element);
            }
            "nobr" => {
                self.reconstruct_active_formatting_elements();
                if self.in_scope("nobr") {
                    self.parse_error("nested nobr start tag");
                    self.adoption_agency("nobr");
                    self.reconstruct_active_formatting_elements();
                }
                let element = self.insert_html_element("nobr", attributes);
                self.push_formatting_element(element);
            }
            "applet" | "marquee" | "object" => {
                self.reconstruct_active_formatting_elements();
                let _ = self.insert_html_element(name, attributes);
                self.active_formatting.push(FormattingEntry::Marker);
                self.frameset_ok = false;
            }
            "table" => {
                if !self.quirks_mode {
                    self.close_p_if_in_button_scope();
                }
                let _ = self.insert_html_element("table", attributes);
                self.frameset_ok = false;
                self.insertion_mode = InsertionMode::InTable;
            }
            "area" | "br" | "embed" | "img" | "keygen" | "wbr" => {
                self.reconstruct_active_formatting_elements();
                self.insert_self_closing(name, attributes);
                self.frameset_ok = false;
            }
            "input" => {
                self.reconstruct_active_formatting_elements();
                self.insert_self_closing("input", attributes);
                let hidden = attributes
                    .iter()
                    .find(|a| a.name == "type")
                    .is_some_and(|a| a.value.eq_ignore_ascii_case("hidden"));
                if !hidden {
                    self.frameset_ok = false;
                }
            }
            "param" | "source" | "track" => self.insert_self_closing(name, attributes),
            "hr" => {
                self.close_p_if_in_button_scope();
                self.insert_self_closing("hr", attributes);
                self.frameset_ok = false;
            }
            "image" => {
                self.parse_error("image start tag treated as img");
                self.reconstruct_active_formatting_elements();
                self.insert_self_closing("img", attributes);
                self.frameset_ok = false;
            }
            "textarea" => {
                let _ = self.insert_html_element("textarea", attributes);
                self.skip_leading_newline = true;
                self.frameset_ok = false;
                self.original_insertion_mode = self.insertion_mode;
                self.insertion_mode = InsertionMode::Text;
            }
            "xmp" => {
                self.close_p_if_in_button_scope();
                self.reconstruct_active_formatting_elements();
                self.frameset_ok = false;
                let _ = self.insert_html_element("xmp", attributes);
                self.original_insertion_mode = self.insertion_mode;
                self.insertion_mode = InsertionMode::Text;
            }
            "iframe" => {
                self.frameset_ok = false;
                let _ = self.insert_html_element("iframe", attributes);
                self.original_insertion_mode = self.insertion_mode;
                self.insertion_mode = InsertionMode::Text;
            }
            "noembed" => {
                let _ = self.insert_html_element("noembed", attributes);
                self.original_insertion_mode = self.insertion_mode;
                self.insertion_mode = InsertionMode::Text;
            }
            "select" => {
                self.reconstruct_active_formatting_elements();
                let _ = self.insert_html_element("select", attributes);
                self.frameset_ok = false;
                self.insertion_mode = if matches!(
                    self.insertion_mode,
                    InsertionMode::InTable
                        | InsertionMode::InCaption
                        | InsertionMode::InTableBody
                        | InsertionMode::InRow
                        | InsertionMode::InCell
                ) {
                    InsertionMode::InSelectInTable
                } else {
                    InsertionMode::InSelect
                };
            }
            "optgroup" | "option" => {
                if self.current_tag_is("option") {
                    let _ = self.open_elements.pop();
                }
                self.reconstruct_active_formatting_elements();
                let _ = self.insert_html_element(name, attributes);
            }
            "rb" | "rtc" => {
                if self.in_scope("ruby") {
                    self.generate_implied_end_tags(None);
                    if !self.current_tag_is("ruby") {
                        self.parse_error("unclosed elements inside ruby");
                    }
                }
                let _ = self.insert_html_element(name, attributes);
            }
            "rp" | "rt" => {
                if self.in_scope("ruby") {
                    self.generate_implied_end_tags(Some("rtc"));
                    if !self.current_tag_is("ruby") && !self.current_tag_is("rtc") {
                        self.parse_error("unclosed elements inside ruby");
                    }
                }
                let _ = self.insert_html_element(name, attributes);
            }
            "math" => {
                self.reconstruct_active_formatting_elements();
                let adjusted = adjust_foreign_token_attributes(attributes, false);
                let _ = self.insert_element("math", *MATHML_NAMESPACE, &adjusted);
                if self_closing {
                    let _ = self.open_elements.pop();
                }
            }
            "svg" => {
                self.reconstruct_active_formatting_elements();
                let adjusted = adjust_foreign_token_attributes(attributes, true);
                let _ = self.insert_element("svg", *SVG_NAMESPACE, &adjusted);
                if self_closing {
                    let _ = self.open_elements.pop();
                }
            }
            "caption" | "col" | "colgroup" | "frame" | "head" | "tbody" | "td" | "tfoot" | "th"
            | "thead" | "tr" => {
                self.parse_error("table-structure start tag outside table");
            }
            _ => {
                self.reconstruct_active_formatting_elements();
                let _ = self.insert_html_element(name, attributes);
            }
        }
    }

    fn end_tag_in_body(&mut self, name: &str, token: &Token) {
        match name {
            "body" => {
                if self.in_scope("body") {
                    self.insertion_mode = InsertionMode::AfterBody;
                } else {
                    self.parse_error("body end tag with no body in scope");
                }
            }
            "html" => {
                if self.in_scope("body") {
                    self.insertion_mode = InsertionMode::AfterBody;
                    self.dispatch(token);
                } else {
                    self.parse_error("html end tag with no body in scope");
                }
            }
            "address" | "article" | "aside" | "blockquote" | "button" | "center" | "details"
            | "dialog" | "dir" | "div" | "dl" | "fieldset" | "figcaption" | "figure" | "footer"
            | "header" | "hgroup" | "listing" | "main" | "menu" | "nav" | "ol" | "pre"
            | "section" | "summary" | "ul" => {
                if self.in_scope(name) {
                    self.generate_implied_end_tags(None);
                    if !self.current_tag_is(name) {
                        self.parse_error("unclosed elements at block end tag");
                    }
                    self.pop_until_popped(name);
                } else {
                    self.parse_error("block end tag with no element in scope");
                }
            }
            "form" => {
                let form = self.form_element.take();
                match form {
                    Some(node) if self.node_in_scope(node) => {
                        self.generate_implied_end_tags(None);
                        if self.current_node() != Some(node) {
                            self.parse_error("unclosed elements at form end tag");
                        }
                        self.open_elements.retain(|&n| n != node);
                    }
                    _ => self.parse_error("form end tag with no form in scope"),
                }
            }
            "p" => {
                if !self.in_button_scope("p") {
                    self.parse_error("p end tag with no p in scope");
                    let _ = self.insert_html_element("p", &[]);
                }
                self.close_p_element();
            }
            "li" => {
                if self.in_list_item_scope("li") {
                    self.generate_implied_end_tags(Some("li"));
                    if !self.current_tag_is("li") {
                        self.parse_error("unclosed elements at li end tag");
                    }
                    self.pop_until_popped("li");
                } else {
                    self.parse_error("li end tag with no li in scope");
                }
            }
            "dd" | "dt" => {
                if self.in_scope(name) {
                    self.generate_implied_end_tags(Some(name));
                    if !self.current_tag_is(name) {
                        self.parse_error("unclosed elements at dd/dt end tag");
                    }
                    self.pop_until_popped(name);
                } else {
                    self.parse_error("dd/dt end tag with no element in scope");
                }
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let any_in_scope = ["h1", "h2", "h3", "h4", "h5", "h6"]
                    .iter()
                    .any(|h| self.in_scope(h));
                if any_in_scope {
                    self.generate_implied_end_tags(None);
                    if !self.current_tag_is(name) {
                        self.parse_error("heading end tag mismatch");
                    }
                    self.pop_until_one_of_popped(&["h1", "h2", "h3", "h4", "h5", "h6"]);
                } else {
                    self.parse_error("heading end tag with no heading in scope");
                }
            }
            name if FORMATTING_TAGS.contains(&name) => self.adoption_agency(name),
            "applet" | "marquee" | "object" => {
                if self.in_scope(name) {
                    self.generate_implied_end_tags(None);
                    if !self.current_tag_is(name) {
                        self.parse_error("unclosed elements at embedded-object end tag");
                    }
                    self.pop_until_popped(name);
                    self.clear_formatting_to_last_marker();
                } else {
                    self.parse_error("embedded-object end tag with no element in scope");
                }
            }
            "br" => {
                self.parse_error("br end tag treated as start tag");
                self.reconstruct_active_formatting_elements();
                self.insert_self_closing("br", &[]);
                self.frameset_ok = false;
            }
            _ => self.any_other_end_tag_in_body(name),
        }
    }

    // ==================================================================
    // § 13.2.6.4.8 The "text" insertion mode
    // ==================================================================

    fn handle_text(&mut self, token: &Token) {
        match token {
            Token::Character { data } | Token::SpaceCharacter { data } => {
                self.insert_character(*data);
            }
            Token::EndOfFile => {
                self.parse_error("EOF in raw text element");
                let _ = self.open_elements.pop();
                self.insertion_mode = self.original_insertion_mode;
                self.dispatch(token);
            }
            Token::EndTag { .. } => {
                let _ = self.open_elements.pop();
                self.insertion_mode = self.original_insertion_mode;
            }
            _ => {}
        }
    }

    // ==================================================================
    // § 13.2.6.4.9 - 13.2.6.4.15: table modes
    // ==================================================================

    fn handle_in_table(&mut self, token: &Token) {
        match token {
            Token::Character { .. } | Token::SpaceCharacter { .. }
                if self.current_node().is_some_and(|n| {
                    matches!(self.tag_of(n), "table" | "tbody" | "tfoot" | "thead" | "tr")
                }) =>
            {
                self.pending_table_characters.clear();
                self.original_insertion_mode = self.insertion_mode;
                self.insertion_mode = InsertionMode::InTableText;
                self.dispatch(token);
            }
            Token::Comment { data } => self.insert_comment(data, None),
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::StartTag {
                name, attributes, ..
            } => match name.as_str() {
                "caption" => {
                    self.clear_stack_to_table_context();
                    self.active_formatting.push(FormattingEntry::Marker);
                    let _ = self.insert_html_element("caption", attributes);
                    self.insertion_mode = InsertionMode::InCaption;
                }
                "colgroup" => {
                    self.clear_stack_to_table_context();
                    let _ = self.insert_html_element("colgroup", attributes);
                    self.insertion_mode = InsertionMode::InColumnGroup;
                }
                "col" => {
                    self.clear_stack_to_table_context();
                    self.fake_start_tag("colgroup");
                    self.dispatch(token);
                }
                "tbody" | "tfoot" | "thead" => {
                    self.clear_stack_to_table_context();
                    let _ = self.insert_html_element(name, attributes);
                    self.insertion_mode = InsertionMode::InTableBody;
                }
                "td" | "th" | "tr" => {
                    self.clear_stack_to_table_context();
                    self.fake_start_tag("tbody");
                    self.dispatch(token);
                }
                "table" => {
                    self.parse_error("table start tag inside table");
                    if self.in_table_scope("table") {
                        self.pop_until_popped("table");
                        self.reset_insertion_mode();
                        self.dispatch(token);
                    }
                }
                "style" | "script" => self.handle_in_head(token),
                "input" => {
                    let hidden = attributes
                        .iter()
                        .find(|a| a.name == "type")
                        .is_some_and(|a| a.value.eq_ignore_ascii_case("hidden"));
                    if hidden {
                        self.parse_error("hidden input inside table");
                        self.insert_self_closing("input", attributes);
                    } else {
                        self.anything_else_in_table(token);
                    }
                }
                "form" => {
                    self.parse_error("form start tag inside table");
                    if self.form_element.is_none() {
                        let form = self.insert_html_element("form", attributes);
                        self.form_element = Some(form);
                        let _ = self.open_elements.pop();
                    }
                }
                _ => self.anything_else_in_table(token),
            },
            Token::EndTag { name, .. } => match name.as_str() {
                "table" => {
                    if self.in_table_scope("table") {
                        self.pop_until_popped("table");
                        self.reset_insertion_mode();
                    } else {
                        self.parse_error("table end tag with no table in scope");
                    }
                }
                "body" | "caption" | "col" | "colgroup" | "html" | "tbody" | "td" | "tfoot"
                | "th" | "thead" | "tr" => {
                    self.parse_error("unexpected end tag in table");
                }
                _ => self.anything_else_in_table(token),
            },
            Token::EndOfFile => self.handle_in_body(token),
            _ => self.anything_else_in_table(token),
        }
    }

    /// "Anything else" in the in-table mode: foster-parent the content.
    fn anything_else_in_table(&mut self, token: &Token) {
        self.parse_error("content misplaced inside table");
        self.foster_parenting = true;
        self.handle_in_body(token);
        self.foster_parenting = false;
    }

    fn handle_in_table_text(&mut self, token: &Token) {
        match token {
            Token::Character { data: '\0' } => self.parse_error("unexpected null character"),
            Token::Character { data } | Token::SpaceCharacter { data } => {
                self.pending_table_characters.push(*data);
            }
            _ => {
                let pending = std::mem::take(&mut self.pending_table_characters);
                let has_non_space = pending
                    .iter()
                    .any(|c| !matches!(c, ' ' | '\t' | '\n' | '\x0C'));
                if has_non_space {
                    // Stray text fosters out in front of the table.
                    self.parse_error("non-space characters inside table");
                    self.foster_parenting = true;
                    for c in pending {
                        self.reconstruct_active_formatting_elements();
                        self.insert_character(c);
                    }
                    self.foster_parenting = false;
                    self.frameset_ok = false;
                } else {
                    for c in pending {
                        self.insert_character(c);
                    }
                }
                self.insertion_mode = self.original_insertion_mode;
                self.dispatch(token);
            }
        }
    }

    fn handle_in_caption(&mut self, token: &Token) {
        match token {
            Token::EndTag { name, .. } if name == "caption" => {
                if self.in_table_scope("caption") {
                    self.generate_implied_end_tags(None);
                    if !self.current_tag_is("caption") {
                        self.parse_error("unclosed elements at caption end tag");
                    }
                    self.pop_until_popped("caption");
                    self.clear_formatting_to_last_marker();
                    self.insertion_mode = InsertionMode::InTable;
                } else {
                    self.parse_error("caption end tag with no caption in scope");
                }
            }
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "col" | "colgroup" | "tbody" | "td" | "tfoot" | "th" | "thead"
                        | "tr"
                ) =>
            {
                self.parse_error("table structure inside caption");
                if self.in_table_scope("caption") {
                    self.generate_implied_end_tags(None);
                    self.pop_until_popped("caption");
                    self.clear_formatting_to_last_marker();
                    self.insertion_mode = InsertionMode::InTable;
                    self.dispatch(token);
                }
            }
            Token::EndTag { name, .. } if name == "table" => {
                self.parse_error("table end tag inside caption");
                if self.in_table_scope("caption") {
                    self.generate_implied_end_tags(None);
                    self.pop_until_popped("caption");
                    self.clear_formatting_to_last_marker();
                    self.insertion_mode = InsertionMode::InTable;
                    self.dispatch(token);
                }
            }
            Token::EndTag { name, .. }
                if matches!(
                    name.as_str(),
                    "body" | "col" | "colgroup" | "html" | "tbody" | "td" | "tfoot" | "th"
                        | "thead" | "tr"
                ) =>
            {
                self.parse_error("unexpected end tag inside caption");
            }
            _ => self.handle_in_body(token),
        }
    }

    fn handle_in_column_group(&mut self, token: &Token) {
        match token {
            Token::SpaceCharacter { data } => self.insert_character(*data),
            Token::Comment { data } => self.insert_comment(data, None),
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::StartTag {
                name, attributes, ..
            } => match name.as_str() {
                "html" => self.handle_in_body(token),
                "col" => self.insert_self_closing("col", attributes),
                _ => self.column_group_anything_else(token),
            },
            Token::EndTag { name, .. } => match name.as_str() {
                "colgroup" => {
                    if self.current_tag_is("colgroup") {
                        let _ = self.open_elements.pop();
                        self.insertion_mode = InsertionMode::InTable;
                    } else {
                        self.parse_error("colgroup end tag mismatch");
                    }
                }
                "col" => self.parse_error("col end tag"),
                _ => self.column_group_anything_else(token),
            },
            Token::EndOfFile => self.handle_in_body(token),
            _ => self.column_group_anything_else(token),
        }
    }

    fn column_group_anything_else(&mut self, token: &Token) {
        if self.current_tag_is("colgroup") {
            let _ = self.open_elements.pop();
            self.insertion_mode = InsertionMode::InTable;
            self.dispatch(token);
        } else {
            self.parse_error("content misplaced in column group");
        }
    }

    fn handle_in_table_body(&mut self, token: &Token) {
        match token {
            Token::StartTag {
                name, attributes, ..
            } if name == "tr" => {
                self.clear_stack_to_table_body_context();
                let _ = self.insert_html_element("tr", attributes);
                self.insertion_mode = InsertionMode::InRow;
            }
            Token::StartTag { name, .. } if matches!(name.as_str(), "th" | "td") => {
                self.parse_error("cell start tag outside row");
                self.clear_stack_to_table_body_context();
                self.fake_start_tag("tr");
                self.dispatch(token);
            }
            Token::EndTag { name, .. } if matches!(name.as_str(), "tbody" | "tfoot" | "thead") => {
                if self.in_table_scope(name) {
                    self.clear_stack_to_table_body_context();
                    let _ = self.open_elements.pop();
                    self.insertion_mode = InsertionMode::InTable;
                } else {
                    self.parse_error("table-section end tag with no section in scope");
                }
            }
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "col" | "colgroup" | "tbody" | "tfoot" | "thead"
                ) =>
            {
                self.table_body_close_and_reprocess(token);
            }
            Token::EndTag { name, .. } if name == "table" => {
                self.table_body_close_and_reprocess(token);
            }
            Token::EndTag { name, .. }
                if matches!(
                    name.as_str(),
                    "body" | "caption" | "col" | "colgroup" | "html" | "td" | "th" | "tr"
                ) =>
            {
                self.parse_error("unexpected end tag in table body");
            }
            _ => self.handle_in_table(token),
        }
    }

    fn table_body_close_and_reprocess(&mut self, token: &Token) {
        let any_section = ["tbody", "thead", "tfoot"]
            .iter()
            .any(|s| self.in_table_scope(s));
        if any_section {
            self.clear_stack_to_table_body_context();
            let _ = self.open_elements.pop();
            self.insertion_mode = InsertionMode::InTable;
            self.dispatch(token);
        } else {
            self.parse_error("table structure with no open section");
        }
    }

    fn handle_in_row(&mut self, token: &Token) {
        match token {
            Token::StartTag {
                name, attributes, ..
            } if matches!(name.as_str(), "th" | "td") => {
                self.clear_stack_to_table_row_context();
                let _ = self.insert_html_element(name, attributes);
                self.insertion_mode = InsertionMode::InCell;
                self.active_formatting.push(FormattingEntry::Marker);
            }
            Token::EndTag { name, .. } if name == "tr" => {
                if self.in_table_scope("tr") {
                    self.clear_stack_to_table_row_context();
                    let _ = self.open_elements.pop();
                    self.insertion_mode = InsertionMode::InTableBody;
                } else {
                    self.parse_error("tr end tag with no tr in scope");
                }
            }
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "col" | "colgroup" | "tbody" | "tfoot" | "thead" | "tr"
                ) =>
            {
                self.row_close_and_reprocess(token);
            }
            Token::EndTag { name, .. } if name == "table" => self.row_close_and_reprocess(token),
            Token::EndTag { name, .. } if matches!(name.as_str(), "tbody" | "tfoot" | "thead") => {
                if self.in_table_scope(name) {
                    self.row_close_and_reprocess(token);
                } else {
                    self.parse_error("table-section end tag with no section in scope");
                }
            }
            Token::EndTag { name, .. }
                if matches!(
                    name.as_str(),
                    "body" | "caption" | "col" | "colgroup" | "html" | "td" | "th"
                ) =>
            {
                self.parse_error("unexpected end tag in table row");
            }
            _ => self.handle_in_table(token),
        }
    }

    fn row_close_and_reprocess(&mut self, token: &Token) {
        if self.in_table_scope("tr") {
            self.clear_stack_to_table_row_context();
            let _ = self.open_elements.pop();
            self.insertion_mode = InsertionMode::InTableBody;
            self.dispatch(token);
        } else {
            self.parse_error("row structure with no open tr");
        }
    }

    fn handle_in_cell(&mut self, token: &Token) {
        match token {
            Token::EndTag { name, .. } if matches!(name.as_str(), "td" | "th") => {
                if self.in_table_scope(name) {
                    self.generate_implied_end_tags(None);
                    if !self.current_tag_is(name) {
                        self.parse_error("unclosed elements at cell end tag");
                    }
                    self.pop_until_popped(name);
                    self.clear_formatting_to_last_marker();
                    self.insertion_mode = InsertionMode::InRow;
                } else {
                    self.parse_error("cell end tag with no cell in scope");
                }
            }
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "col" | "colgroup" | "tbody" | "td" | "tfoot" | "th" | "thead"
                        | "tr"
                ) =>
            {
                if self.in_table_scope("td") || self.in_table_scope("th") {
                    self.close_cell();
                    self.dispatch(token);
                } else {
                    self.parse_error("table structure with no open cell");
                }
            }
            Token::EndTag { name, .. }
                if matches!(name.as_str(), "body" | "caption" | "col" | "colgroup" | "html") =>
            {
                self.parse_error("unexpected end tag in table cell");
            }
            Token::EndTag { name, .. }
                if matches!(name.as_str(), "table" | "tbody" | "tfoot" | "thead" | "tr") =>
            {
                if self.in_table_scope(name) {
                    self.close_cell();
                    self.dispatch(token);
                } else {
                    self.parse_error("table end tag with no element in scope");
                }
            }
            _ => self.handle_in_body(token),
        }
    }

    // ==================================================================
    // § 13.2.6.4.16 - 13.2.6.4.17: select modes
    // ==================================================================

    fn handle_in_select(&mut self, token: &Token) {
        match token {
            Token::Character { data: '\0' } => self.parse_error("unexpected null character"),
            Token::Character { data } | Token::SpaceCharacter { data } => {
                self.insert_character(*data);
            }
            Token::Comment { data } => self.insert_comment(data, None),
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::StartTag {
                name, attributes, ..
            } => match name.as_str() {
                "html" => self.handle_in_body(token),
                "option" => {
                    if self.current_tag_is("option") {
                        let _ = self.open_elements.pop();
                    }
                    let _ = self.insert_html_element("option", attributes);
                }
                "optgroup" => {
                    if self.current_tag_is("option") {
                        let _ = self.open_elements.pop();
                    }
                    if self.current_tag_is("optgroup") {
                        let _ = self.open_elements.pop();
                    }
                    let _ = self.insert_html_element("optgroup", attributes);
                }
                "select" => {
                    self.parse_error("select start tag inside select");
                    if self.in_select_scope("select") {
                        self.pop_until_popped("select");
                        self.reset_insertion_mode();
                    }
                }
                "input" | "keygen" | "textarea" => {
                    self.parse_error("form control inside select");
                    if self.in_select_scope("select") {
                        self.pop_until_popped("select");
                        self.reset_insertion_mode();
                        self.dispatch(token);
                    }
                }
                "script" => self.handle_in_head(token),
                _ => self.parse_error("unexpected start tag inside select"),
            },
            Token::EndTag { name, .. } => match name.as_str() {
                "optgroup" => {
                    if self.current_tag_is("option") {
                        let above = self
                            .open_elements
                            .len()
                            .checked_sub(2)
                            .map(|i| self.open_elements[i]);
                        if above.is_some_and(|n| self.tag_of(n) == "optgroup") {
                            let _ = self.open_elements.pop();
                        }
                    }
                    if self.current_tag_is("optgroup") {
                        let _ = self.open_elements.pop();
                    } else {
                        self.parse_error("optgroup end tag mismatch");
                    }
                }
                "option" => {
                    if self.current_tag_is("option") {
                        let _ = self.open_elements.pop();
                    } else {
                        self.parse_error("option end tag mismatch");
                    }
                }
                "select" => {
                    if self.in_select_scope("select") {
                        self.pop_until_popped("select");
                        self.reset_insertion_mode();
                    } else {
                        self.parse_error("select end tag with no select in scope");
                    }
                }
                _ => self.parse_error("unexpected end tag inside select"),
            },
            Token::EndOfFile => self.handle_in_body(token),
        }
    }

    fn handle_in_select_in_table(&mut self, token: &Token) {
        match token {
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "table" | "tbody" | "tfoot" | "thead" | "tr" | "td" | "th"
                ) =>
            {
                self.parse_error("table structure inside select");
                self.pop_until_popped("select");
                self.reset_insertion_mode();
                self.dispatch(token);
            }
            Token::EndTag { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "table" | "tbody" | "tfoot" | "thead" | "tr" | "td" | "th"
                ) =>
            {
                self.parse_error("table end tag inside select");
                if self.in_table_scope(name) {
                    self.pop_until_popped("select");
                    self.reset_insertion_mode();
                    self.dispatch(token);
                }
            }
            _ => self.handle_in_select(token),
        }
    }

    // ==================================================================
    // § 13.2.6.4.19 - 13.2.6.4.23: document epilogue modes
    // ==================================================================

    fn handle_after_body(&mut self, token: &Token) {
        match token {
            Token::SpaceCharacter { .. } => self.handle_in_body(token),
            Token::Comment { data } => {
                let html = self.html_element();
                self.insert_comment(data, Some(html));
            }
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body(token),
            Token::EndTag { name, .. } if name == "html" => {
                self.insertion_mode = InsertionMode::AfterAfterBody;
            }
            Token::EndOfFile => self.stop_parsing(),
            _ => {
                self.parse_error("content after body");
                self.insertion_mode = InsertionMode::InBody;
                self.dispatch(token);
            }
        }
    }

    fn handle_in_frameset(&mut self, token: &Token) {
        match token {
            Token::SpaceCharacter { data } => self.insert_character(*data),
            Token::Comment { data } => self.insert_comment(data, None),
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::StartTag {
                name, attributes, ..
            } => match name.as_str() {
                "html" => self.handle_in_body(token),
                "frameset" => {
                    let _ = self.insert_html_element("frameset", attributes);
                }
                "frame" => self.insert_self_closing("frame", attributes),
                "noframes" => self.handle_in_head(token),
                _ => self.parse_error("unexpected start tag in frameset"),
            },
            Token::EndTag { name, .. } if name == "frameset" => {
                if self.current_tag_is("html") {
                    self.parse_error("frameset end tag at root");
                } else {
                    let _ = self.open_elements.pop();
                    if !self.current_tag_is("frameset") {
                        self.insertion_mode = InsertionMode::AfterFrameset;
                    }
                }
            }
            Token::EndOfFile => {
                if !self.current_tag_is("html") {
                    self.parse_error("EOF inside frameset");
                }
                self.stop_parsing();
            }
            _ => self.parse_error("unexpected content in frameset"),
        }
    }

    fn handle_after_frameset(&mut self, token: &Token) {
        match token {
            Token::SpaceCharacter { data } => self.insert_character(*data),
            Token::Comment { data } => self.insert_comment(data, None),
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body(token),
            Token::StartTag { name, .. } if name == "noframes" => self.handle_in_head(token),
            Token::EndTag { name, .. } if name == "html" => {
                self.insertion_mode = InsertionMode::AfterAfterFrameset;
            }
            Token::EndOfFile => self.stop_parsing(),
            _ => self.parse_error("unexpected content after frameset"),
        }
    }

    fn handle_after_after_body(&mut self, token: &Token) {
        match token {
            Token::Comment { data } => self.insert_comment(data, Some(NodeId::ROOT)),
            Token::Doctype { .. } | Token::SpaceCharacter { .. } => self.handle_in_body(token),
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body(token),
            Token::EndOfFile => self.stop_parsing(),
            _ => {
                self.parse_error("content after document end");
                self.insertion_mode = InsertionMode::InBody;
                self.dispatch(token);
            }
        }
    }

    fn handle_after_after_frameset(&mut self, token: &Token) {
        match token {
            Token::Comment { data } => self.insert_comment(data, Some(NodeId::ROOT)),
            Token::Doctype { .. } | Token::SpaceCharacter { .. } => self.handle_in_body(token),
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body(token),
            Token::StartTag { name, .. } if name == "noframes" => self.handle_in_head(token),
            Token::EndOfFile => self.stop_parsing(),
            _ => self.parse_error("content after frameset document end"),
        }
    }

    // ==================================================================
    // § 13.2.6.5 Foreign content
    // ==================================================================

    fn handle_in_foreign_content(&mut self, token: &Token) {
        match token {
            Token::Character { data: '\0' } => {
                self.parse_error("unexpected null character");
                self.insert_character('\u{FFFD}');
            }
            Token::SpaceCharacter { data } => self.insert_character(*data),
            Token::Character { data } => {
                self.insert_character(*data);
                self.frameset_ok = false;
            }
            Token::Comment { data } => self.insert_comment(data, None),
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let font_breakout = name == "font"
                    && attributes
                        .iter()
                        .any(|a| matches!(a.name.as_str(), "color" | "face" | "size"));
                if FOREIGN_BREAKOUT_TAGS.contains(&name.as_str()) || font_breakout {
                    self.parse_error("HTML start tag breaks out of foreign content");
                    loop {
                        let Some(current) = self.current_node() else {
                            break;
                        };
                        if self.is_html_element(current) || self.is_integration_point(current) {
                            break;
                        }
                        let _ = self.open_elements.pop();
                    }
                    self.dispatch(token);
                    return;
                }

                let namespace = self
                    .current_node()
                    .and_then(|n| self.tree.as_element(n))
                    .map_or(*HTML_NAMESPACE, |e| e.namespace);
                let (tag, adjusted) = if namespace == *SVG_NAMESPACE {
                    (
                        adjust_svg_tag_name(name).to_string(),
                        adjust_foreign_token_attributes(attributes, true),
                    )
                } else {
                    (name.clone(), adjust_foreign_token_attributes(attributes, false))
                };
                let _ = self.insert_element(&tag, namespace, &adjusted);
                if *self_closing {
                    let _ = self.open_elements.pop();
                }
            }
            Token::EndTag { name, .. } => {
                // "If node's tag name, converted to ASCII lowercase, is not
                // the same as the tag name of the token, then this is a
                // parse error."
                if let Some(current) = self.current_node() {
                    if !self.tag_of(current).eq_ignore_ascii_case(name) {
                        self.parse_error("foreign end tag mismatch");
                    }
                }
                for index in (0..self.open_elements.len()).rev() {
                    let node = self.open_elements[index];
                    if self.is_html_element(node) {
                        // Process per the current insertion mode instead.
                        self.handle_mode(self.insertion_mode, token);
                        return;
                    }
                    if self.tag_of(node).eq_ignore_ascii_case(name) {
                        self.pop_until_node_popped(node);
                        return;
                    }
                }
            }
            Token::EndOfFile => self.handle_in_body(token),
        }
    }

    fn is_integration_point(&self, node: NodeId) -> bool {
        let Some(element) = self.tree.as_element(node) else {
            return false;
        };
        let tag = element.tag_name.as_str();
        if element.namespace == *MATHML_NAMESPACE {
            if MATHML_TEXT_INTEGRATION.contains(&tag) {
                return true;
            }
            return tag == "annotation-xml"
                && element.attribute_str("encoding").is_some_and(|e| {
                    e.eq_ignore_ascii_case("text/html")
                        || e.eq_ignore_ascii_case("application/xhtml+xml")
                });
        }
        element.namespace == *SVG_NAMESPACE && SVG_HTML_INTEGRATION.contains(&tag)
    }
}

/// Apply the foreign-content attribute adjustments to a token's attributes.
fn adjust_foreign_token_attributes(attributes: &[Attribute], svg: bool) -> Vec<Attribute> {
    attributes
        .iter()
        .map(|attr| {
            let name = if svg {
                adjust_svg_attribute(&attr.name)
            } else {
                adjust_mathml_attribute(&attr.name)
            };
            Attribute::new(name.to_string(), attr.value.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::HtmlTokenizer;

    fn parse(input: &str) -> DomTree {
        let mut tokenizer = HtmlTokenizer::new(input);
        tokenizer.run();
        HtmlParser::new(tokenizer.into_tokens()).run()
    }

    fn find_first(tree: &DomTree, tag: &str) -> Option<NodeId> {
        tree.iter_all()
            .find(|&id| tree.as_element(id).is_some_and(|e| e.tag_name == tag))
    }

    #[test]
    fn builds_implied_html_head_body() {
        let tree = parse("hello");
        let html = tree.document_element().expect("html element");
        assert_eq!(tree.as_element(html).unwrap().tag_name, "html");
        let body = tree.body().expect("body element");
        assert_eq!(tree.text_content(body), "hello");
        assert!(find_first(&tree, "head").is_some());
    }

    #[test]
    fn adjacent_text_merges_into_one_node() {
        let tree = parse("<p>a&amp;b</p>");
        let p = find_first(&tree, "p").unwrap();
        assert_eq!(tree.children(p).len(), 1);
        assert_eq!(tree.as_text(tree.children(p)[0]), Some("a&b"));
    }

    #[test]
    fn pre_skips_leading_newline() {
        let tree = parse("<pre>\nkeep</pre>");
        let pre = find_first(&tree, "pre").unwrap();
        assert_eq!(tree.text_content(pre), "keep");
    }

    #[test]
    fn repeated_html_attributes_merge_first_wins() {
        let tree = parse("<html lang=\"en\"><html lang=\"fr\" dir=\"ltr\"><body>");
        let html = tree.document_element().unwrap();
        let element = tree.as_element(html).unwrap();
        assert_eq!(element.attribute_str("lang"), Some("en"));
        assert_eq!(element.attribute_str("dir"), Some("ltr"));
    }

    #[test]
    fn table_grows_implied_tbody() {
        let tree = parse("<table><tr><td>y</td></tr></table>");
        let table = find_first(&tree, "table").unwrap();
        let tbody = tree.children(table)[0];
        assert_eq!(tree.as_element(tbody).unwrap().tag_name, "tbody");
        let tr = tree.children(tbody)[0];
        assert_eq!(tree.as_element(tr).unwrap().tag_name, "tr");
        let td = tree.children(tr)[0];
        assert_eq!(tree.as_element(td).unwrap().tag_name, "td");
        assert_eq!(tree.text_content(td), "y");
    }

    #[test]
    fn stray_table_text_is_foster_parented() {
        // "x" must land before the table, not inside it.
        let tree = parse("<table>x<tr><td>y");
        let body = tree.body().unwrap();
        let children = tree.children(body).to_vec();
        assert_eq!(tree.as_text(children[0]), Some("x"));
        assert_eq!(tree.as_element(children[1]).unwrap().tag_name, "table");
        let table = children[1];
        assert_eq!(tree.text_content(table), "y");
    }

    #[test]
    fn adoption_agency_recovers_misnested_formatting() {
        // <b><i></b></i> yields <b><i></i></b><i></i>-style recovery; the
        // paragraph stays open throughout, so every run lands inside it.
        let tree = parse("<p>A<b>B<i>C</b>D</i>E</p>F");
        let p = find_first(&tree, "p").unwrap();
        assert_eq!(tree.text_content(p), "ABCDE");
        let b = find_first(&tree, "b").unwrap();
        assert_eq!(tree.text_content(b), "BC");
        // The reopened <i> carrying "D" sits outside <b>.
        let mut i_nodes = tree
            .iter_all()
            .filter(|&id| tree.as_element(id).is_some_and(|e| e.tag_name == "i"));
        let first_i = i_nodes.next().unwrap();
        let second_i = i_nodes.next().expect("reopened i element");
        assert!(tree.is_descendant_of(first_i, b));
        assert!(!tree.is_descendant_of(second_i, b));
        assert_eq!(tree.text_content(second_i), "D");
    }

    #[test]
    fn formatting_reconstruction_spans_blocks() {
        let tree = parse("<b>one<p>two</p></b>");
        let p = find_first(&tree, "p").unwrap();
        // The <b> is reconstructed inside the <p>.
        let inner_b = tree.children(p)[0];
        assert_eq!(tree.as_element(inner_b).unwrap().tag_name, "b");
        assert_eq!(tree.text_content(inner_b), "two");
    }

    #[test]
    fn misnested_spec_scenario_keeps_text_order() {
        let tree = parse("<p>A<b>B<i>C</p>D</i>E</b>F");
        let body = tree.body().unwrap();
        assert_eq!(tree.text_content(body), "ABCDEF");
    }

    #[test]
    fn implied_end_tags_close_list_items() {
        let tree = parse("<ul><li>one<li>two</ul>");
        let ul = find_first(&tree, "ul").unwrap();
        let items: Vec<_> = tree
            .children(ul)
            .iter()
            .filter(|&&id| tree.as_element(id).is_some_and(|e| e.tag_name == "li"))
            .copied()
            .collect();
        assert_eq!(items.len(), 2);
        assert_eq!(tree.text_content(items[0]), "one");
        assert_eq!(tree.text_content(items[1]), "two");
    }

    #[test]
    fn paragraph_closes_before_block() {
        let tree = parse("<p>one<div>two</div>");
        let p = find_first(&tree, "p").unwrap();
        let div = find_first(&tree, "div").unwrap();
        assert!(!tree.is_descendant_of(div, p));
        assert_eq!(tree.text_content(p), "one");
    }

    #[test]
    fn svg_enters_foreign_content_with_case_fixups() {
        let tree = parse("<svg viewbox=\"0 0 1 1\"><foreignobject><p>x</p></foreignobject></svg>");
        let svg = find_first(&tree, "svg").unwrap();
        let element = tree.as_element(svg).unwrap();
        assert_eq!(element.namespace, *SVG_NAMESPACE);
        assert_eq!(element.attribute_str("viewBox"), Some("0 0 1 1"));
        let foreign_object = find_first(&tree, "foreignObject").unwrap();
        // HTML integration point: the <p> inside is an HTML element again.
        let p = find_first(&tree, "p").unwrap();
        assert!(tree.is_descendant_of(p, foreign_object));
        assert!(tree.as_element(p).unwrap().is_html());
    }

    #[test]
    fn math_enters_mathml_namespace() {
        let tree = parse("<math><mi>x</mi></math>");
        let mi = find_first(&tree, "mi").unwrap();
        assert_eq!(tree.as_element(mi).unwrap().namespace, *MATHML_NAMESPACE);
    }

    #[test]
    fn html_breakout_tag_leaves_foreign_content() {
        let tree = parse("<svg><circle/><div>out</div>");
        let div = find_first(&tree, "div").unwrap();
        assert!(tree.as_element(div).unwrap().is_html());
        let svg = find_first(&tree, "svg").unwrap();
        assert!(!tree.is_descendant_of(div, svg));
    }

    #[test]
    fn select_keeps_only_option_content() {
        let tree = parse("<select><option>a<option>b</select>");
        let select = find_first(&tree, "select").unwrap();
        let options: Vec<_> = tree
            .children(select)
            .iter()
            .filter(|&&id| tree.as_element(id).is_some_and(|e| e.tag_name == "option"))
            .copied()
            .collect();
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn caption_and_colgroup_parse() {
        let tree = parse("<table><caption>t</caption><colgroup><col></colgroup><tr><td>c</table>");
        let table = find_first(&tree, "table").unwrap();
        let tags: Vec<_> = tree
            .children(table)
            .iter()
            .filter_map(|&id| tree.as_element(id).map(|e| e.tag_name.as_str()))
            .collect();
        assert_eq!(tags, vec!["caption", "colgroup", "tbody"]);
    }

    #[test]
    fn quirks_mode_detection() {
        let mut tokenizer = HtmlTokenizer::new("<html><body>");
        tokenizer.run();
        let parser = HtmlParser::new(tokenizer.into_tokens());
        let mut parser = parser;
        while parser.token_index < parser.tokens.len() && !parser.stopped {
            let token = parser.tokens[parser.token_index].clone();
            parser.dispatch(&token);
            parser.token_index += 1;
        }
        assert!(parser.quirks_mode(), "missing doctype forces quirks");
    }

    #[test]
    fn standards_doctype_is_not_quirks() {
        let mut tokenizer = HtmlTokenizer::new("<!DOCTYPE html><html><body>");
        tokenizer.run();
        let mut parser = HtmlParser::new(tokenizer.into_tokens());
        while parser.token_index < parser.tokens.len() && !parser.stopped {
            let token = parser.tokens[parser.token_index].clone();
            parser.dispatch(&token);
            parser.token_index += 1;
        }
        assert!(!parser.quirks_mode());
    }

    #[test]
    fn eof_closes_everything() {
        let tree = parse("<div><p><b>text");
        let b = find_first(&tree, "b").unwrap();
        assert_eq!(tree.text_content(b), "text");
    }

    #[test]
    fn comments_attach_in_place() {
        let tree = parse("<!--top--><html><body><!--inner-->");
        let doc_children = tree.children(NodeId::ROOT);
        assert!(matches!(
            tree.get(doc_children[0]).map(|n| &n.node_type),
            Some(NodeType::Comment(text)) if text == "top"
        ));
    }
}
