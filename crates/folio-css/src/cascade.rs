//! Rule cache and cascade.
//!
//! [CSS Cascading and Inheritance Level 4](https://www.w3.org/TR/css-cascade-4/)
//!
//! User-agent, user, and author sheets all parse into one [`StyleSheet`];
//! origin tagging is implicit in installation order (user-agent first, user
//! second, author last), because the cascade's tie-breaker is the
//! monotonically increasing rule position. `@import`s fetch at install time
//! and inline their rules at the import's position.
//!
//! Rules partition by the **rightmost** simple selector of each complex
//! selector: id, class, tag, and pseudo-element each get a hash map, with a
//! universal fallback list, so candidate retrieval per element is O(k).

use std::collections::HashMap;
use std::rc::Rc;

use folio_common::intern::Atom;
use folio_common::net::ResourceClient;
use folio_common::resource::{Resource, ResourceCache, ResourceKind};
use folio_common::url::Url;
use folio_common::warning::{warn_once, WarnKind};
use folio_dom::{DomTree, ElementData, NodeId};

use crate::parser::{CssParser, Declaration, PageRule, Rule, StyleRule};
use crate::properties::PropertyId;
use crate::selector::{matches_selector, ComplexSelector, PseudoPage, PseudoType, SimpleSelector};
use crate::style::ComputedStyle;
use crate::value::{CssValue, ValueRef};
use crate::fontface::FontFaceCache;

/// How deep `@import` chains may recurse at install time.
const IMPORT_DEPTH_LIMIT: usize = 8;

/// One filed selector: `(rule, selector, specificity, source position)`.
/// Candidate ordering is lexicographic `(specificity, position)` - the
/// cascade's tie-breaker.
#[derive(Debug, Clone)]
pub struct RuleData {
    rule: Rc<StyleRule>,
    selector_index: usize,
    specificity: u32,
    position: u32,
}

impl RuleData {
    fn selector(&self) -> &ComplexSelector {
        &self.rule.selectors[self.selector_index]
    }

    /// The cascade sort key.
    #[must_use]
    pub const fn sort_key(&self) -> (u32, u32) {
        (self.specificity, self.position)
    }

    /// The rule's declarations.
    #[must_use]
    pub fn declarations(&self) -> &[Declaration] {
        &self.rule.declarations
    }
}

/// The installed rule set for a document: the four keyed rule maps, the
/// universal list, page rules, and harvested font faces.
#[derive(Default)]
pub struct StyleSheet {
    id_rules: HashMap<Atom, Vec<RuleData>>,
    class_rules: HashMap<Atom, Vec<RuleData>>,
    tag_rules: HashMap<Atom, Vec<RuleData>>,
    pseudo_rules: HashMap<PseudoType, Vec<RuleData>>,
    universal_rules: Vec<RuleData>,
    page_rules: Vec<PageRule>,
    font_faces: FontFaceCache,
    position: u32,
}

impl StyleSheet {
    /// An empty sheet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text` and install its rules at the end of the cascade order.
    /// `@import`s are fetched through `client` (memoized in `cache`) and
    /// recurse synchronously.
    pub fn add_sheet(
        &mut self,
        text: &str,
        base_url: &Url,
        cache: &mut ResourceCache,
        client: &dyn ResourceClient,
    ) {
        let rules = CssParser::parse_stylesheet(text);
        self.install_rules(rules, base_url, cache, client, 0);
    }

    fn install_rules(
        &mut self,
        rules: Vec<Rule>,
        base_url: &Url,
        cache: &mut ResourceCache,
        client: &dyn ResourceClient,
        depth: usize,
    ) {
        for rule in rules {
            match rule {
                Rule::Style(rule) => self.install_style_rule(rule),
                Rule::Import(import) => {
                    if depth >= IMPORT_DEPTH_LIMIT {
                        warn_once(WarnKind::Css, "skipping @import nested too deeply");
                        continue;
                    }
                    let url = base_url.complete(&import.href);
                    let Some(resource) = cache.fetch(client, &url, ResourceKind::Text) else {
                        // Unavailable imports contribute no rules.
                        continue;
                    };
                    if let Resource::Text(text) = &*resource {
                        let imported = CssParser::parse_stylesheet(text);
                        self.install_rules(imported, &url, cache, client, depth + 1);
                    }
                }
                Rule::FontFace(font_face) => self.font_faces.harvest(&font_face),
                Rule::Page(page) => self.page_rules.push(page),
            }
        }
    }

    fn install_style_rule(&mut self, rule: StyleRule) {
        let rule = Rc::new(rule);
        for selector_index in 0..rule.selectors.len() {
            let specificity = rule.selectors[selector_index].specificity();
            self.position += 1;
            let data = RuleData {
                rule: Rc::clone(&rule),
                selector_index,
                specificity,
                position: self.position,
            };
            self.file_rule_data(data);
        }
    }

    /// File one selector under the key derived from its terminal simple
    /// selector.
    fn file_rule_data(&mut self, data: RuleData) {
        match data.selector().terminal() {
            Some(SimpleSelector::Id(id)) => {
                self.id_rules.entry(*id).or_default().push(data);
            }
            Some(SimpleSelector::Class(class)) => {
                self.class_rules.entry(*class).or_default().push(data);
            }
            Some(SimpleSelector::Tag(tag)) => {
                self.tag_rules.entry(*tag).or_default().push(data);
            }
            Some(SimpleSelector::PseudoElement(pseudo)) => {
                self.pseudo_rules.entry(*pseudo).or_default().push(data);
            }
            _ => self.universal_rules.push(data),
        }
    }

    /// Candidate retrieval plus matching: id map, class map per class, tag
    /// map, universal list, and - for pseudo lookups - the pseudo map.
    fn matched_rules(
        &self,
        tree: &DomTree,
        element: NodeId,
        pseudo: PseudoType,
    ) -> Vec<&RuleData> {
        let Some(data) = tree.as_element(element) else {
            return Vec::new();
        };

        let mut buckets: Vec<&[RuleData]> = Vec::new();
        if let Some(id) = data.id() {
            if let Some(candidates) = self.id_rules.get(&id) {
                buckets.push(candidates);
            }
        }
        for class in data.classes() {
            if let Some(candidates) = self.class_rules.get(class) {
                buckets.push(candidates);
            }
        }
        if let Some(candidates) = self.tag_rules.get(&data.tag_name) {
            buckets.push(candidates);
        }
        if pseudo != PseudoType::None {
            if let Some(candidates) = self.pseudo_rules.get(&pseudo) {
                buckets.push(candidates);
            }
        }
        buckets.push(&self.universal_rules);

        let mut matched = Vec::new();
        for bucket in buckets {
            for candidate in bucket {
                if matches_selector(tree, element, candidate.selector(), pseudo) {
                    matched.push(candidate);
                }
            }
        }

        matched.sort_by_key(|data| data.sort_key());
        matched
    }

    /// The harvested font faces.
    #[must_use]
    pub fn font_faces(&self) -> &FontFaceCache {
        &self.font_faces
    }

    /// The installed `@page` rules.
    #[must_use]
    pub fn page_rules(&self) -> &[PageRule] {
        &self.page_rules
    }
}

/// The cascade and style builder.
///
/// Holds the document-wide inputs every style computation needs: the DOM,
/// the installed sheet, and the viewport for unit resolution.
pub struct StyleBuilder<'a> {
    tree: &'a DomTree,
    sheet: &'a StyleSheet,
}

impl<'a> StyleBuilder<'a> {
    /// A builder over one document.
    #[must_use]
    pub fn new(tree: &'a DomTree, sheet: &'a StyleSheet) -> Self {
        Self { tree, sheet }
    }

    /// Compute an element's style.
    ///
    /// Pipeline: retrieve and match rule-cache candidates, append inline
    /// `style=""` and presentation-attribute declarations, merge by
    /// `(specificity, position)` with `!important` precedence, inherit from
    /// the parent, then resolve the computed scalars.
    #[must_use]
    pub fn style_for_element(
        &self,
        element: NodeId,
        parent_style: &ComputedStyle,
    ) -> ComputedStyle {
        let mut merged: Vec<Declaration> = Vec::new();
        for rule in self.sheet.matched_rules(self.tree, element, PseudoType::None) {
            for declaration in rule.declarations() {
                merge_declaration(&mut merged, declaration);
            }
        }

        // Presentation attributes apply after matched rules, before inline
        // style.
        if let Some(data) = self.tree.as_element(element) {
            for declaration in presentation_declarations(data) {
                merge_declaration(&mut merged, &declaration);
            }
            if let Some(inline) = data.attribute_str("style") {
                for declaration in CssParser::parse_inline_style(inline) {
                    merge_declaration(&mut merged, &declaration);
                }
            }
        }

        let is_root = self
            .tree
            .parent_element(element)
            .is_none();
        self.build_style(&merged, parent_style, is_root)
    }

    /// Compute a pseudo-element's style, or `None` when no rule targets the
    /// pseudo (no box is generated then). Inline style and presentation
    /// attributes never apply to pseudo-elements.
    #[must_use]
    pub fn pseudo_style_for_element(
        &self,
        element: NodeId,
        parent_style: &ComputedStyle,
        pseudo: PseudoType,
    ) -> Option<ComputedStyle> {
        let rules = self.sheet.matched_rules(self.tree, element, pseudo);
        if rules.is_empty() {
            return None;
        }
        let mut merged: Vec<Declaration> = Vec::new();
        for rule in rules {
            for declaration in rule.declarations() {
                merge_declaration(&mut merged, declaration);
            }
        }
        Some(self.build_style(&merged, parent_style, false))
    }

    /// Compute the style for a page, matching `@page` selectors against the
    /// page name and index. Page specificity: named page 0x10000, `:first`
    /// 0x100, `:left`/`:right`/`:blank` 0x1.
    #[must_use]
    pub fn style_for_page(
        &self,
        page_name: Option<Atom>,
        page_index: usize,
        root_style: &ComputedStyle,
    ) -> ComputedStyle {
        let mut candidates: Vec<(u32, usize, &PageRule)> = Vec::new();
        for (position, rule) in self.sheet.page_rules().iter().enumerate() {
            if rule.selectors.is_empty() {
                candidates.push((0, position, rule));
                continue;
            }
            let best = rule
                .selectors
                .iter()
                .filter_map(|selector| {
                    page_selector_matches(selector.name, &selector.pseudos, page_name, page_index)
                })
                .max();
            if let Some(specificity) = best {
                candidates.push((specificity, position, rule));
            }
        }
        candidates.sort_by_key(|(specificity, position, _)| (*specificity, *position));

        let mut merged: Vec<Declaration> = Vec::new();
        for (_, _, rule) in candidates {
            for declaration in &rule.declarations {
                merge_declaration(&mut merged, declaration);
            }
        }
        self.build_style(&merged, root_style, false)
    }

    /// Inheritance and computed-value resolution (steps 4-6 of the
    /// pipeline).
    fn build_style(
        &self,
        merged: &[Declaration],
        parent_style: &ComputedStyle,
        is_root: bool,
    ) -> ComputedStyle {
        // Inherit from the parent first: every inherited property key
        // present on the parent copies its raw value. Font size and weight
        // are excluded - their computed values ride on the unpacked scalars,
        // and copying a raw `2em` or `bolder` would re-resolve it against
        // every descendant in turn.
        let mut properties: HashMap<PropertyId, ValueRef> = parent_style
            .properties()
            .iter()
            .filter(|(id, _)| {
                id.is_inherited()
                    && !matches!(id, PropertyId::FontSize | PropertyId::FontWeight)
            })
            .map(|(id, value)| (*id, Rc::clone(value)))
            .collect();

        // Apply the cascaded declarations: `initial` removes the property,
        // `inherit` re-fetches the parent's value.
        for Declaration { id, value, .. } in merged {
            match &**value {
                CssValue::Initial => {
                    let _ = properties.remove(id);
                }
                CssValue::Inherit => match parent_style.get(*id) {
                    Some(parent_value) => {
                        let _ = properties.insert(*id, Rc::clone(parent_value));
                    }
                    None => {
                        let _ = properties.remove(id);
                    }
                },
                _ => {
                    let _ = properties.insert(*id, Rc::clone(value));
                }
            }
        }

        ComputedStyle::build(properties, parent_style, is_root)
    }
}

/// The per-property merge: a later declaration overwrites an earlier one of
/// the same property unless the earlier one is `!important` and the later
/// one is not.
fn merge_declaration(merged: &mut Vec<Declaration>, declaration: &Declaration) {
    match merged.iter_mut().find(|d| d.id == declaration.id) {
        Some(existing) => {
            if existing.important && !declaration.important {
                return;
            }
            *existing = declaration.clone();
        }
        None => merged.push(declaration.clone()),
    }
}

/// Whether a page selector matches; `Some(specificity)` when it does.
fn page_selector_matches(
    name: Option<Atom>,
    pseudos: &[PseudoPage],
    page_name: Option<Atom>,
    page_index: usize,
) -> Option<u32> {
    let mut specificity = 0;
    if let Some(name) = name {
        if page_name != Some(name) {
            return None;
        }
        specificity += 0x10000;
    }
    for pseudo in pseudos {
        match pseudo {
            PseudoPage::First => {
                if page_index != 0 {
                    return None;
                }
                specificity += 0x100;
            }
            // The first page of an LTR document is a right page; pages
            // alternate from there.
            PseudoPage::Right => {
                if page_index % 2 != 0 {
                    return None;
                }
                specificity += 0x1;
            }
            PseudoPage::Left => {
                if page_index % 2 != 1 {
                    return None;
                }
                specificity += 0x1;
            }
            // Blank-page detection needs layout; the selector never matches
            // during style computation.
            PseudoPage::Blank => return None,
        }
    }
    Some(specificity)
}

/// Presentation attributes become declarations applied between matched
/// rules and inline style. The supported set covers what book content
/// actually carries.
fn presentation_declarations(element: &ElementData) -> Vec<Declaration> {
    let mut css = String::new();
    let tag = element.tag_name.as_str();

    if let Some(width) = element.attribute_str("width") {
        push_dimension(&mut css, "width", width);
    }
    if let Some(height) = element.attribute_str("height") {
        push_dimension(&mut css, "height", height);
    }
    if let Some(bgcolor) = element.attribute_str("bgcolor") {
        push_property(&mut css, "background-color", bgcolor);
    }
    if let Some(align) = element.attribute_str("align") {
        if matches!(
            align.to_ascii_lowercase().as_str(),
            "left" | "right" | "center" | "justify"
        ) {
            push_property(&mut css, "text-align", align);
        }
    }
    if let Some(valign) = element.attribute_str("valign") {
        push_property(&mut css, "vertical-align", valign);
    }
    if tag == "body" {
        if let Some(text) = element.attribute_str("text") {
            push_property(&mut css, "color", text);
        }
    }
    if tag == "table" {
        if let Some(border) = element.attribute_str("border") {
            if border.parse::<f32>().map(|v| v > 0.0).unwrap_or(false) {
                css.push_str("border-width: ");
                css.push_str(border);
                css.push_str("px; border-style: solid;");
            }
        }
        if let Some(spacing) = element.attribute_str("cellspacing") {
            push_dimension(&mut css, "border-spacing", spacing);
        }
    }

    if css.is_empty() {
        Vec::new()
    } else {
        CssParser::parse_inline_style(&css)
    }
}

fn push_property(css: &mut String, name: &str, value: &str) {
    css.push_str(name);
    css.push_str(": ");
    css.push_str(value);
    css.push(';');
}

/// HTML dimension attributes: a bare number is pixels, a `%` suffix is a
/// percentage.
fn push_dimension(css: &mut String, name: &str, value: &str) {
    let value = value.trim();
    if let Some(percent) = value.strip_suffix('%') {
        if percent.parse::<f32>().is_ok() {
            css.push_str(name);
            css.push_str(": ");
            css.push_str(value);
            css.push(';');
        }
    } else if value.parse::<f32>().is_ok() {
        css.push_str(name);
        css.push_str(": ");
        css.push_str(value);
        css.push_str("px;");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_common::net::NullResourceClient;
    use folio_html::parse_document;

    fn styled(html: &str, css: &str) -> (DomTree, StyleSheet) {
        let tree = parse_document(html);
        let mut sheet = StyleSheet::new();
        let mut cache = ResourceCache::new();
        sheet.add_sheet(css, &Url::default(), &mut cache, &NullResourceClient);
        (tree, sheet)
    }

    fn find(tree: &DomTree, tag: &str) -> NodeId {
        tree.iter_all()
            .find(|&id| tree.as_element(id).is_some_and(|e| e.tag_name == tag))
            .unwrap_or_else(|| panic!("no <{tag}>"))
    }

    fn color_of(style: &ComputedStyle) -> (u8, u8, u8) {
        (style.color.r, style.color.g, style.color.b)
    }

    #[test]
    fn important_beats_higher_specificity() {
        // Spec scenario: `p { color: red !important }` vs `p.x { color: blue }`.
        let (tree, sheet) = styled(
            "<p class=\"x\">t</p>",
            "p { color: red !important } p.x { color: blue }",
        );
        let builder = StyleBuilder::new(&tree, &sheet);
        let parent = ComputedStyle::initial(800.0, 600.0);
        let p = find(&tree, "p");
        let style = builder.style_for_element(p, &parent);
        assert_eq!(color_of(&style), (0xFF, 0, 0));
    }

    #[test]
    fn later_position_wins_at_equal_specificity() {
        // Spec scenario: `a, b { color: red }` then `a { color: blue }`.
        let (tree, sheet) = styled(
            "<a href=\"#\">x</a><b>y</b>",
            "a, b { color: red } a { color: blue }",
        );
        let builder = StyleBuilder::new(&tree, &sheet);
        let parent = ComputedStyle::initial(800.0, 600.0);
        let a_style = builder.style_for_element(find(&tree, "a"), &parent);
        assert_eq!(color_of(&a_style), (0, 0, 0xFF));
        let b_style = builder.style_for_element(find(&tree, "b"), &parent);
        assert_eq!(color_of(&b_style), (0xFF, 0, 0));
    }

    #[test]
    fn inline_style_overrides_rules() {
        let (tree, sheet) = styled(
            "<p style=\"color: lime\">t</p>",
            "p { color: red }",
        );
        let builder = StyleBuilder::new(&tree, &sheet);
        let parent = ComputedStyle::initial(800.0, 600.0);
        let style = builder.style_for_element(find(&tree, "p"), &parent);
        assert_eq!(color_of(&style), (0, 0xFF, 0));
    }

    #[test]
    fn important_rule_beats_inline_style() {
        let (tree, sheet) = styled(
            "<p style=\"color: lime\">t</p>",
            "p { color: red !important }",
        );
        let builder = StyleBuilder::new(&tree, &sheet);
        let parent = ComputedStyle::initial(800.0, 600.0);
        let style = builder.style_for_element(find(&tree, "p"), &parent);
        assert_eq!(color_of(&style), (0xFF, 0, 0));
    }

    #[test]
    fn inherited_properties_flow_down() {
        let (tree, sheet) = styled(
            "<div><p>t</p></div>",
            "div { color: teal; margin-top: 10px }",
        );
        let builder = StyleBuilder::new(&tree, &sheet);
        let parent = ComputedStyle::initial(800.0, 600.0);
        let div_style = builder.style_for_element(find(&tree, "div"), &parent);
        let p_style = builder.style_for_element(find(&tree, "p"), &div_style);
        // color inherits, margin does not.
        assert_eq!(color_of(&p_style), (0, 0x80, 0x80));
        assert!(p_style.get(PropertyId::MarginTop).is_none());
    }

    #[test]
    fn initial_removes_the_property_from_the_map() {
        let (tree, sheet) = styled(
            "<div><p>t</p></div>",
            "div { color: teal; margin-top: 4px } p { color: initial; margin-top: initial }",
        );
        let builder = StyleBuilder::new(&tree, &sheet);
        let parent = ComputedStyle::initial(800.0, 600.0);
        let div_style = builder.style_for_element(find(&tree, "div"), &parent);
        let p_style = builder.style_for_element(find(&tree, "p"), &div_style);
        // The raw property is gone; queries fall back to the built-in
        // default. The unpacked inherited scalar keeps the parent's value,
        // matching the inherit-then-apply pipeline.
        assert!(p_style.get(PropertyId::Color).is_none());
        assert!(p_style.get(PropertyId::MarginTop).is_none());
        assert_eq!(color_of(&p_style), (0, 0x80, 0x80));
    }

    #[test]
    fn cascade_is_pure() {
        let (tree, sheet) = styled("<p class=\"x\">t</p>", "p { color: red } .x { width: 4px }");
        let builder = StyleBuilder::new(&tree, &sheet);
        let parent = ComputedStyle::initial(800.0, 600.0);
        let p = find(&tree, "p");
        let first = builder.style_for_element(p, &parent);
        let second = builder.style_for_element(p, &parent);
        assert_eq!(first.properties().len(), second.properties().len());
        for (id, value) in first.properties() {
            assert_eq!(second.get(*id).map(|v| &**v), Some(&**value));
        }
    }

    #[test]
    fn pseudo_style_exists_only_when_rules_match() {
        let (tree, sheet) = styled(
            "<p>t</p>",
            "p::before { content: \"!\" }",
        );
        let builder = StyleBuilder::new(&tree, &sheet);
        let parent = ComputedStyle::initial(800.0, 600.0);
        let p = find(&tree, "p");
        let p_style = builder.style_for_element(p, &parent);
        assert!(builder
            .pseudo_style_for_element(p, &p_style, PseudoType::Before)
            .is_some());
        assert!(builder
            .pseudo_style_for_element(p, &p_style, PseudoType::After)
            .is_none());
    }

    #[test]
    fn rule_cache_files_by_terminal_selector() {
        let (tree, sheet) = styled(
            "<div id=\"a\" class=\"b\">x</div>",
            "#a { color: red } .b { width: 1px } div { height: 2px } * { margin-top: 3px } div::marker { content: \"x\" }",
        );
        assert_eq!(sheet.id_rules.len(), 1);
        assert_eq!(sheet.class_rules.len(), 1);
        assert_eq!(sheet.tag_rules.len(), 1);
        assert_eq!(sheet.universal_rules.len(), 1);
        assert_eq!(sheet.pseudo_rules.len(), 1);
        let _ = tree;
    }

    #[test]
    fn presentation_attributes_apply_before_inline() {
        let (tree, sheet) = styled(
            "<table width=\"400\" bgcolor=\"red\" style=\"background-color: blue\"><tr><td>x</td></tr></table>",
            "",
        );
        let builder = StyleBuilder::new(&tree, &sheet);
        let parent = ComputedStyle::initial(800.0, 600.0);
        let table = find(&tree, "table");
        let style = builder.style_for_element(table, &parent);
        let width = style.get(PropertyId::Width).expect("width attribute");
        assert!(matches!(&**width, CssValue::Length { value, .. } if (*value - 400.0).abs() < 0.01));
        // Inline style wins over the bgcolor attribute.
        let background = style.get(PropertyId::BackgroundColor).unwrap();
        assert!(matches!(&**background, CssValue::Color(c) if c.b == 0xFF));
    }

    #[test]
    fn page_styles_cascade_by_page_specificity() {
        let (tree, sheet) = styled(
            "<p>x</p>",
            "@page { margin-top: 1cm } @page :first { margin-top: 2cm } @page chapter { margin-top: 3cm }",
        );
        let builder = StyleBuilder::new(&tree, &sheet);
        let root = ComputedStyle::initial(800.0, 600.0);

        let first = builder.style_for_page(None, 0, &root);
        let margin = first.get(PropertyId::MarginTop).unwrap();
        assert!(matches!(&**margin, CssValue::Length { value, .. } if (*value - 2.0).abs() < 0.01));

        let second = builder.style_for_page(None, 1, &root);
        let margin = second.get(PropertyId::MarginTop).unwrap();
        assert!(matches!(&**margin, CssValue::Length { value, .. } if (*value - 1.0).abs() < 0.01));

        let chapter = builder.style_for_page(Some(Atom::new("chapter")), 3, &root);
        let margin = chapter.get(PropertyId::MarginTop).unwrap();
        assert!(matches!(&**margin, CssValue::Length { value, .. } if (*value - 3.0).abs() < 0.01));
    }
}
