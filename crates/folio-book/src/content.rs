//! Counters and generated content.
//!
//! [CSS Lists and Counters](https://www.w3.org/TR/css-lists-3/) /
//! [CSS Generated Content](https://www.w3.org/TR/css-content-3/)
//!
//! A recursive walk over the styled DOM constructs the box tree: each
//! element pushes a counter scope, applies its `counter-reset` /
//! `counter-set` / `counter-increment` declarations and the list-item
//! numbering rules, materializes its `::marker`, `::before`, and `::after`
//! pseudo boxes, recurses, and pops the scope on exit.

use std::collections::HashMap;
use std::rc::Rc;

use folio_common::intern::Atom;
use folio_css::properties::PropertyId;
use folio_css::selector::PseudoType;
use folio_css::style::{ComputedStyle, Display};
use folio_css::value::{CssValue, ValueId, ValueRef};
use folio_dom::NodeId;

use crate::document::HtmlDocument;

/// One frame of counter state: a name-to-value map, created lazily the
/// first time the scope receives a counter.
type CounterScope = Option<HashMap<Atom, i32>>;

/// The counters machine: a stack of scopes plus the active quote depth.
#[derive(Debug, Default)]
pub struct Counters {
    scopes: Vec<CounterScope>,
    quote_depth: usize,
}

impl Counters {
    /// An empty counter state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter an element: push an (empty) scope.
    pub fn push(&mut self) {
        self.scopes.push(None);
    }

    /// Leave an element: pop its scope.
    pub fn pop(&mut self) {
        let _ = self.scopes.pop();
    }

    /// `counter-reset`: create (or overwrite) the counter in the top scope.
    pub fn reset(&mut self, name: Atom, value: i32) {
        if self.scopes.is_empty() {
            self.scopes.push(None);
        }
        let scope = self
            .scopes
            .last_mut()
            .expect("scope stack cannot be empty here")
            .get_or_insert_with(HashMap::new);
        let _ = scope.insert(name, value);
    }

    /// `counter-set`: update the nearest scope holding the counter, or
    /// create it in the top scope.
    pub fn set(&mut self, name: Atom, value: i32) {
        match self.find_mut(name) {
            Some(entry) => *entry = value,
            None => self.reset(name, value),
        }
    }

    /// `counter-increment`: add to the nearest scope holding the counter,
    /// or create it in the top scope.
    pub fn increment(&mut self, name: Atom, value: i32) {
        match self.find_mut(name) {
            Some(entry) => *entry += value,
            None => self.reset(name, value),
        }
    }

    /// The counter's current value; 0 when it does not exist.
    #[must_use]
    pub fn value(&self, name: Atom) -> i32 {
        for scope in self.scopes.iter().rev() {
            if let Some(map) = scope {
                if let Some(value) = map.get(&name) {
                    return *value;
                }
            }
        }
        0
    }

    /// Every value of the counter across the scope stack, outermost first.
    /// `counters()` joins these with its separator.
    #[must_use]
    pub fn values(&self, name: Atom) -> Vec<i32> {
        self.scopes
            .iter()
            .filter_map(|scope| scope.as_ref().and_then(|map| map.get(&name)).copied())
            .collect()
    }

    /// Format one counter (or the whole `counters()` chain when `separator`
    /// is non-empty) with the given list style.
    #[must_use]
    pub fn format(&self, name: Atom, list_style: ValueId, separator: &str) -> String {
        if separator.is_empty() {
            return format_counter(self.value(name), list_style);
        }
        let values = self.values(name);
        if values.is_empty() {
            return format_counter(0, list_style);
        }
        values
            .iter()
            .map(|v| format_counter(*v, list_style))
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Bump the quote nesting depth (after an open-quote is emitted).
    pub fn increase_quote_depth(&mut self) {
        self.quote_depth += 1;
    }

    /// Drop the quote nesting depth, floored at zero (before a close-quote
    /// is emitted).
    pub fn decrease_quote_depth(&mut self) {
        self.quote_depth = self.quote_depth.saturating_sub(1);
    }

    /// The current quote depth.
    #[must_use]
    pub const fn quote_depth(&self) -> usize {
        self.quote_depth
    }

    fn find_mut(&mut self, name: Atom) -> Option<&mut i32> {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(map) = scope {
                if map.contains_key(&name) {
                    return map.get_mut(&name);
                }
            }
        }
        None
    }
}

/// A node in the constructed box tree.
#[derive(Debug)]
pub enum BoxNode {
    /// An element box (or a pseudo-element box when `node` is `None`).
    Element(ElementBox),
    /// A text run.
    Text(TextBox),
    /// A replaced image box; the painter fetches the bytes by URL.
    Image(ImageBox),
}

/// An element or pseudo-element box.
#[derive(Debug)]
pub struct ElementBox {
    /// The DOM element this box belongs to; `None` for generated boxes.
    pub node: Option<NodeId>,
    /// Which pseudo-element generated this box, if any.
    pub pseudo: PseudoType,
    /// The box's computed style.
    pub style: Rc<ComputedStyle>,
    /// Child boxes in document order, generated content included.
    pub children: Vec<BoxNode>,
}

/// A text run inside an element box.
#[derive(Debug)]
pub struct TextBox {
    /// The text payload. Adjacent generated runs merge into one box.
    pub text: String,
}

/// A replaced image inside an element box.
#[derive(Debug)]
pub struct ImageBox {
    /// The resolved image URL.
    pub url: String,
}

impl ElementBox {
    /// Concatenated text of this box's subtree, for tests and debugging.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                BoxNode::Element(element) => element.collect_text(out),
                BoxNode::Text(text) => out.push_str(&text.text),
                BoxNode::Image(_) => {}
            }
        }
    }

    /// The first generated child of the given pseudo type, if any.
    #[must_use]
    pub fn pseudo_child(&self, pseudo: PseudoType) -> Option<&ElementBox> {
        self.children.iter().find_map(|child| match child {
            BoxNode::Element(element) if element.pseudo == pseudo => Some(element),
            _ => None,
        })
    }
}

/// Run the box-construction walk over a styled document. Returns the box
/// for the document element, or `None` for an empty document.
#[must_use]
pub fn build_box_tree(document: &HtmlDocument) -> Option<ElementBox> {
    let root = document.tree().document_element()?;
    let mut counters = Counters::new();
    build_element_box(document, root, &mut counters)
}

fn build_element_box(
    document: &HtmlDocument,
    element: NodeId,
    counters: &mut Counters,
) -> Option<ElementBox> {
    let style = document.style(element)?;
    if style.is_display_none() {
        return None;
    }

    let mut element_box = ElementBox {
        node: Some(element),
        pseudo: PseudoType::None,
        style: Rc::clone(style),
        children: Vec::new(),
    };

    counters.push();
    update_counters(document, element, &element_box, counters);

    build_pseudo_box(document, element, &mut element_box, PseudoType::Marker, counters);
    build_pseudo_box(document, element, &mut element_box, PseudoType::Before, counters);

    let children: Vec<NodeId> = document.tree().children(element).to_vec();
    for child in children {
        if document.tree().as_element(child).is_some() {
            if let Some(child_box) = build_element_box(document, child, counters) {
                element_box.children.push(BoxNode::Element(child_box));
            }
        } else if let Some(text) = document.tree().as_text(child) {
            element_box.children.push(BoxNode::Text(TextBox {
                text: text.to_owned(),
            }));
        }
    }

    build_pseudo_box(document, element, &mut element_box, PseudoType::After, counters);
    counters.pop();

    Some(element_box)
}

/// Apply the element's counter directives and list-item numbering.
fn update_counters(
    document: &HtmlDocument,
    element: NodeId,
    element_box: &ElementBox,
    counters: &mut Counters,
) {
    apply_counter_property(&element_box.style, PropertyId::CounterReset, counters, Counters::reset);
    apply_counter_property(&element_box.style, PropertyId::CounterSet, counters, Counters::set);
    apply_counter_property(
        &element_box.style,
        PropertyId::CounterIncrement,
        counters,
        Counters::increment,
    );

    let list_item = Atom::new("list-item");
    let tree = document.tree();
    let Some(data) = tree.as_element(element) else {
        return;
    };

    if element_box.style.display == Display::ListItem {
        // An <li> with a value attribute restarts the numbering there, in
        // the enclosing list's scope so later siblings continue from it.
        if data.tag_name == "li" {
            if let Some(value) = data
                .attribute_str("value")
                .and_then(|v| v.trim().parse::<i32>().ok())
            {
                counters.set(list_item, value);
                return;
            }
        }
        // An explicit counter-reset naming list-item suppresses the
        // automatic increment.
        let reset_touched_list_item = element_box
            .style
            .get(PropertyId::CounterReset)
            .is_some_and(|value| counter_list_names(value).contains(&list_item));
        if !reset_touched_list_item {
            counters.increment(list_item, 1);
        }
        return;
    }

    if data.tag_name == "ol" {
        let start = data
            .attribute_str("start")
            .and_then(|v| v.trim().parse::<i32>().ok())
            .unwrap_or(1);
        // The first list item increments before rendering, so the scope
        // starts one below the first marker value.
        counters.reset(list_item, start - 1);
    } else if matches!(data.tag_name.as_str(), "ul" | "dir" | "menu") {
        counters.reset(list_item, 0);
    }
}

/// The counter names a `counter-reset`-style list value touches.
fn counter_list_names(value: &ValueRef) -> Vec<Atom> {
    let CssValue::List(entries) = &**value else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match &**entry {
            CssValue::Pair(name, _) => match &**name {
                CssValue::CustomIdent(name) => Some(*name),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

fn apply_counter_property(
    style: &ComputedStyle,
    id: PropertyId,
    counters: &mut Counters,
    apply: fn(&mut Counters, Atom, i32),
) {
    let Some(value) = style.get(id) else { return };
    let CssValue::List(entries) = &**value else {
        return;
    };
    for entry in entries {
        let CssValue::Pair(name, amount) = &**entry else {
            continue;
        };
        let CssValue::CustomIdent(name) = &**name else {
            continue;
        };
        let Some(amount) = amount.as_integer() else {
            continue;
        };
        apply(counters, *name, amount);
    }
}

/// A style carrying only the inherited properties of `parent`. Used for a
/// `::marker` no rule targets: the marker still materializes, inheriting
/// the list item's text properties.
fn inherited_only_style(parent: &ComputedStyle) -> ComputedStyle {
    let properties: HashMap<PropertyId, ValueRef> = parent
        .properties()
        .iter()
        .filter(|(id, _)| {
            id.is_inherited() && !matches!(id, PropertyId::FontSize | PropertyId::FontWeight)
        })
        .map(|(id, value)| (*id, Rc::clone(value)))
        .collect();
    ComputedStyle::build(properties, parent, false)
}

/// Generate one pseudo-element box on `parent`, when its style exists and
/// is not `display: none`.
fn build_pseudo_box(
    document: &HtmlDocument,
    element: NodeId,
    parent: &mut ElementBox,
    pseudo: PseudoType,
    counters: &mut Counters,
) {
    // Markers exist only on list items.
    if pseudo == PseudoType::Marker && parent.style.display != Display::ListItem {
        return;
    }
    let style = match document.pseudo_style_for_element(element, &parent.style, pseudo) {
        Some(style) => style,
        // A list item renders its marker even when no ::marker rule exists.
        None if pseudo == PseudoType::Marker => inherited_only_style(&parent.style),
        None => return,
    };
    if style.is_display_none() {
        return;
    }

    let mut pseudo_box = ElementBox {
        node: None,
        pseudo,
        style: Rc::new(style),
        children: Vec::new(),
    };

    // ::before and ::after carry their own counter directives and can be
    // list items with markers of their own.
    if pseudo == PseudoType::Before || pseudo == PseudoType::After {
        apply_counter_property(
            &pseudo_box.style,
            PropertyId::CounterReset,
            counters,
            Counters::reset,
        );
        apply_counter_property(
            &pseudo_box.style,
            PropertyId::CounterSet,
            counters,
            Counters::set,
        );
        apply_counter_property(
            &pseudo_box.style,
            PropertyId::CounterIncrement,
            counters,
            Counters::increment,
        );
        if pseudo_box.style.display == Display::ListItem {
            counters.increment(Atom::new("list-item"), 1);
            build_pseudo_box(document, element, &mut pseudo_box, PseudoType::Marker, counters);
        }
    }

    materialize_content(document, element, &mut pseudo_box, counters);
    parent.children.push(BoxNode::Element(pseudo_box));
}

/// Fill a pseudo box's children from its `content` value; a `::marker`
/// without `content` falls back to `list-style-image`, then to the
/// formatted `list-item` counter.
fn materialize_content(
    document: &HtmlDocument,
    element: NodeId,
    pseudo_box: &mut ElementBox,
    counters: &mut Counters,
) {
    let style = Rc::clone(&pseudo_box.style);
    let content = style.content().cloned();
    let Some(content) = content else {
        if pseudo_box.pseudo == PseudoType::Marker {
            materialize_marker_fallback(&style, counters, pseudo_box);
        }
        return;
    };
    let CssValue::List(parts) = &*content else {
        // `content: normal | none` generates nothing; the marker still gets
        // its fallback.
        if pseudo_box.pseudo == PseudoType::Marker && content.is_ident(ValueId::Normal) {
            materialize_marker_fallback(&style, counters, pseudo_box);
        }
        return;
    };

    for part in parts {
        evaluate_content_part(document, element, part, &style, counters, pseudo_box);
    }
}

fn evaluate_content_part(
    document: &HtmlDocument,
    element: NodeId,
    part: &ValueRef,
    style: &Rc<ComputedStyle>,
    counters: &mut Counters,
    out: &mut ElementBox,
) {
    match &**part {
        CssValue::String(text) => add_text(out, text),
        CssValue::Image(url) => add_image(document, out, url),
        CssValue::Counter {
            name,
            list_style,
            separator,
        } => {
            add_text(out, &counters.format(*name, *list_style, separator));
        }
        CssValue::Function(ValueId::Attr, arguments) => {
            if let Some(CssValue::CustomIdent(name)) = arguments.first().map(|v| &**v) {
                if let Some(value) = document
                    .tree()
                    .as_element(element)
                    .and_then(|e| e.attribute(*name))
                {
                    add_text(out, value);
                }
            }
        }
        CssValue::Ident(id) => {
            let use_quote = matches!(id, ValueId::OpenQuote | ValueId::CloseQuote);
            let open_quote = matches!(id, ValueId::OpenQuote | ValueId::NoOpenQuote);
            if !matches!(
                id,
                ValueId::OpenQuote | ValueId::CloseQuote | ValueId::NoOpenQuote | ValueId::NoCloseQuote
            ) {
                return;
            }
            // Depth drops before a close token is emitted, floored at 0;
            // it rises after an open token.
            if !open_quote {
                counters.decrease_quote_depth();
            }
            if use_quote {
                add_text(out, &quote_text(style, open_quote, counters.quote_depth()));
            }
            if open_quote {
                counters.increase_quote_depth();
            }
        }
        _ => {}
    }
}

/// A `::marker` without `content`: `list-style-image` wins, else the
/// formatted `list-item` counter with the style's `list-style-type`.
fn materialize_marker_fallback(
    style: &Rc<ComputedStyle>,
    counters: &mut Counters,
    out: &mut ElementBox,
) {
    if let Some(url) = style.list_style_image() {
        out.children.push(BoxNode::Image(ImageBox {
            url: url.to_owned(),
        }));
        return;
    }
    let list_style = style.list_style_type();
    if list_style == ValueId::None {
        return;
    }
    let text = marker_text(counters.value(Atom::new("list-item")), list_style);
    add_text(out, &text);
}

fn add_text(out: &mut ElementBox, text: &str) {
    if text.is_empty() {
        return;
    }
    // Adjacent generated runs merge, like adjacent DOM text nodes.
    if let Some(BoxNode::Text(last)) = out.children.last_mut() {
        last.text.push_str(text);
        return;
    }
    out.children.push(BoxNode::Text(TextBox {
        text: text.to_owned(),
    }));
}

fn add_image(document: &HtmlDocument, out: &mut ElementBox, url: &str) {
    let resolved = document.base_url().complete(url);
    if resolved.is_null() {
        return;
    }
    out.children.push(BoxNode::Image(ImageBox {
        url: resolved.as_str().to_owned(),
    }));
}

/// The quote mark for the current depth. The `quotes` pairs clamp at the
/// deepest defined level; a document with no `quotes` falls back to `"`.
fn quote_text(style: &ComputedStyle, open: bool, depth: usize) -> String {
    let Some(value) = style.quotes() else {
        return "\"".to_owned();
    };
    match &**value {
        CssValue::Ident(ValueId::None) => String::new(),
        CssValue::List(pairs) if !pairs.is_empty() => {
            let index = depth.min(pairs.len() - 1);
            let CssValue::Pair(open_quote, close_quote) = &*pairs[index] else {
                return String::new();
            };
            let chosen = if open { open_quote } else { close_quote };
            match &**chosen {
                CssValue::String(text) => text.clone(),
                _ => String::new(),
            }
        }
        _ => "\"".to_owned(),
    }
}

/// Marker text: formatted counter plus the numeric-marker suffix.
fn marker_text(value: i32, list_style: ValueId) -> String {
    let formatted = format_counter(value, list_style);
    match list_style {
        ValueId::Disc | ValueId::Circle | ValueId::Square | ValueId::None => formatted,
        _ => format!("{formatted}."),
    }
}

/// Format an integer in a list style.
///
/// Roman numerals are classical and defined for 1..=3999; outside that
/// range the formatter falls back to decimal, as do alphabetic styles for
/// non-positive values.
#[must_use]
pub fn format_counter(value: i32, list_style: ValueId) -> String {
    match list_style {
        ValueId::None => String::new(),
        ValueId::Disc => "\u{2022}".to_owned(),
        ValueId::Circle => "\u{25E6}".to_owned(),
        ValueId::Square => "\u{25AA}".to_owned(),
        ValueId::DecimalLeadingZero => {
            if value < 0 {
                format!("-{:02}", -i64::from(value))
            } else {
                format!("{value:02}")
            }
        }
        ValueId::LowerAlpha | ValueId::LowerLatin => format_alphabetic(value, b'a'),
        ValueId::UpperAlpha | ValueId::UpperLatin => format_alphabetic(value, b'A'),
        ValueId::LowerRoman => format_roman(value, false),
        ValueId::UpperRoman => format_roman(value, true),
        _ => value.to_string(),
    }
}

/// Bijective base-26 with A=1: 1 -> a, 26 -> z, 27 -> aa.
fn format_alphabetic(value: i32, base: u8) -> String {
    if value < 1 {
        return value.to_string();
    }
    let mut value = u32::try_from(value).unwrap_or(0);
    let mut letters = Vec::new();
    while value > 0 {
        value -= 1;
        letters.push(char::from(base + u8::try_from(value % 26).unwrap_or(0)));
        value /= 26;
    }
    letters.iter().rev().collect()
}

/// Classical roman numerals, 1..=3999.
fn format_roman(value: i32, uppercase: bool) -> String {
    if !(1..=3999).contains(&value) {
        return value.to_string();
    }
    const TABLE: &[(i32, &str)] = &[
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut remaining = value;
    let mut out = String::new();
    for &(amount, digits) in TABLE {
        while remaining >= amount {
            remaining -= amount;
            out.push_str(digits);
        }
    }
    if uppercase {
        out.to_ascii_uppercase()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roman_formatting() {
        assert_eq!(format_counter(1, ValueId::LowerRoman), "i");
        assert_eq!(format_counter(4, ValueId::LowerRoman), "iv");
        assert_eq!(format_counter(9, ValueId::UpperRoman), "IX");
        assert_eq!(format_counter(1994, ValueId::UpperRoman), "MCMXCIV");
        assert_eq!(format_counter(3999, ValueId::LowerRoman), "mmmcmxcix");
        // Outside the classical range: decimal fallback.
        assert_eq!(format_counter(4000, ValueId::LowerRoman), "4000");
        assert_eq!(format_counter(0, ValueId::UpperRoman), "0");
    }

    #[test]
    fn alphabetic_formatting() {
        assert_eq!(format_counter(1, ValueId::LowerAlpha), "a");
        assert_eq!(format_counter(26, ValueId::LowerAlpha), "z");
        assert_eq!(format_counter(27, ValueId::LowerAlpha), "aa");
        assert_eq!(format_counter(28, ValueId::UpperLatin), "AB");
        assert_eq!(format_counter(0, ValueId::LowerAlpha), "0");
    }

    #[test]
    fn decimal_leading_zero() {
        assert_eq!(format_counter(5, ValueId::DecimalLeadingZero), "05");
        assert_eq!(format_counter(11, ValueId::DecimalLeadingZero), "11");
        assert_eq!(format_counter(-7, ValueId::DecimalLeadingZero), "-07");
    }

    #[test]
    fn scope_nesting_and_nearest_scope_updates() {
        let chapter = Atom::new("chapter");
        let mut counters = Counters::new();
        counters.push();
        counters.reset(chapter, 0);
        counters.increment(chapter, 1);
        assert_eq!(counters.value(chapter), 1);

        // A nested scope sees the outer counter and increments it in place.
        counters.push();
        counters.increment(chapter, 1);
        assert_eq!(counters.value(chapter), 2);

        // A reset in the inner scope shadows the outer one.
        counters.reset(chapter, 10);
        assert_eq!(counters.value(chapter), 10);
        assert_eq!(counters.values(chapter), vec![2, 10]);

        counters.pop();
        assert_eq!(counters.value(chapter), 2);
        counters.pop();
        assert_eq!(counters.value(chapter), 0);
    }

    #[test]
    fn counters_format_joins_scopes() {
        let section = Atom::new("section");
        let mut counters = Counters::new();
        counters.push();
        counters.reset(section, 1);
        counters.push();
        counters.reset(section, 2);
        counters.push();
        counters.reset(section, 5);
        assert_eq!(counters.format(section, ValueId::Decimal, "."), "1.2.5");
        assert_eq!(counters.format(section, ValueId::Decimal, ""), "5");
    }

    #[test]
    fn quote_depth_floors_at_zero() {
        let mut counters = Counters::new();
        counters.decrease_quote_depth();
        assert_eq!(counters.quote_depth(), 0);
        counters.increase_quote_depth();
        counters.increase_quote_depth();
        counters.decrease_quote_depth();
        assert_eq!(counters.quote_depth(), 1);
    }
}
