//! CSS selector model and matching.
//!
//! This module implements selector matching per
//! [Selectors Level 4](https://www.w3.org/TR/selectors-4/). Matching walks
//! **right-to-left**: the subject compound is tested against the candidate
//! element first, then the combinator chain steps to ancestors and siblings.
//! The descendant and subsequent-sibling combinators backtrack; child and
//! next-sibling do not.

use folio_common::intern::Atom;
use folio_dom::{DomTree, ElementData, NodeId};

/// [§ 14 Pseudo-elements](https://www.w3.org/TR/selectors-4/#pseudo-elements)
///
/// The pseudo-element a rule targets. A box is generated for each when its
/// style calls for one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoType {
    /// No pseudo-element; the element itself.
    None,
    /// `::before`
    Before,
    /// `::after`
    After,
    /// `::marker`
    Marker,
    /// `::first-letter`
    FirstLetter,
    /// `::first-line`
    FirstLine,
}

impl PseudoType {
    /// Parse a pseudo-element name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "before" => Self::Before,
            "after" => Self::After,
            "marker" => Self::Marker,
            "first-letter" => Self::FirstLetter,
            "first-line" => Self::FirstLine,
            _ => return None,
        })
    }
}

/// [CSS Paged Media § 7.4](https://www.w3.org/TR/css-page-3/#spread-pseudos)
///
/// Page pseudo-classes usable in `@page` selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoPage {
    /// `:first`
    First,
    /// `:left`
    Left,
    /// `:right`
    Right,
    /// `:blank`
    Blank,
}

impl PseudoPage {
    /// Parse a page pseudo-class name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "first" => Self::First,
            "left" => Self::Left,
            "right" => Self::Right,
            "blank" => Self::Blank,
            _ => return None,
        })
    }
}

/// Case sensitivity of an attribute value comparison. The `i` flag after
/// the value requests ASCII case-insensitive matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrCase {
    /// Exact byte comparison.
    Sensitive,
    /// ASCII case-insensitive comparison.
    Insensitive,
}

/// Which structural counting an `An+B` pseudo-class performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NthKind {
    /// `:nth-child`
    Child,
    /// `:nth-last-child`
    LastChild,
    /// `:nth-of-type`
    OfType,
    /// `:nth-last-of-type`
    LastOfType,
}

/// A simple selector: one condition on one element.
#[derive(Debug, Clone, PartialEq)]
pub enum SimpleSelector {
    /// `*`
    Universal,
    /// A type selector.
    Tag(Atom),
    /// `#id`
    Id(Atom),
    /// `.class`
    Class(Atom),
    /// `[name]`
    AttrHas(Atom),
    /// `[name=value]`
    AttrEquals(Atom, String, AttrCase),
    /// `[name~=value]`
    AttrIncludes(Atom, String, AttrCase),
    /// `[name*=value]`
    AttrContains(Atom, String, AttrCase),
    /// `[name|=value]`
    AttrDashEquals(Atom, String, AttrCase),
    /// `[name^=value]`
    AttrStartsWith(Atom, String, AttrCase),
    /// `[name$=value]`
    AttrEndsWith(Atom, String, AttrCase),
    /// `:root`
    Root,
    /// `:empty`
    Empty,
    /// `:first-child`
    FirstChild,
    /// `:last-child`
    LastChild,
    /// `:only-child`
    OnlyChild,
    /// `:first-of-type`
    FirstOfType,
    /// `:last-of-type`
    LastOfType,
    /// `:only-of-type`
    OnlyOfType,
    /// `:link`
    Link,
    /// `:enabled`
    Enabled,
    /// `:disabled`
    Disabled,
    /// `:checked`
    Checked,
    /// `:lang(tag)`
    Lang(String),
    /// `:nth-child(An+B)` and friends.
    Nth {
        /// The step.
        a: i32,
        /// The offset.
        b: i32,
        /// Which sibling axis and filter to count on.
        kind: NthKind,
    },
    /// `:is(list)`
    Is(Vec<ComplexSelector>),
    /// `:not(list)`
    Not(Vec<ComplexSelector>),
    /// `::before` and friends.
    PseudoElement(PseudoType),
    /// `:first` / `:left` / `:right` / `:blank` in `@page` selectors.
    PseudoPage(PseudoPage),
}

/// [§ 16 Combinators](https://www.w3.org/TR/selectors-4/#combinators)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// The leftmost compound has no combinator.
    None,
    /// Whitespace: an arbitrary ancestor.
    Descendant,
    /// `>`: the parent.
    Child,
    /// `+`: the immediately preceding element sibling.
    NextSibling,
    /// `~`: any preceding element sibling.
    SubsequentSibling,
}

/// [§ 4.2 Compound selectors](https://www.w3.org/TR/selectors-4/#compound)
///
/// "A sequence of simple selectors that are not separated by a combinator."
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundSelector {
    /// The simple selectors, all of which must match one element.
    pub selectors: Vec<SimpleSelector>,
}

/// [§ 4.3 Complex selectors](https://www.w3.org/TR/selectors-4/#complex)
///
/// Compounds in source order (left to right); each carries the combinator
/// that links it to the compound before it. The last compound is the
/// subject.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexSelector {
    /// `(combinator, compound)` pairs; the first pair's combinator is
    /// `Combinator::None`.
    pub compounds: Vec<(Combinator, CompoundSelector)>,
}

impl ComplexSelector {
    /// The rightmost compound (the subject).
    #[must_use]
    pub fn subject(&self) -> Option<&CompoundSelector> {
        self.compounds.last().map(|(_, compound)| compound)
    }

    /// The terminal simple selector: the rightmost simple selector of the
    /// subject compound. The rule cache files rules under it.
    #[must_use]
    pub fn terminal(&self) -> Option<&SimpleSelector> {
        self.subject().and_then(|compound| compound.selectors.last())
    }

    /// The pseudo-element this selector targets, if any.
    #[must_use]
    pub fn pseudo_type(&self) -> PseudoType {
        self.subject().map_or(PseudoType::None, |compound| {
            compound
                .selectors
                .iter()
                .find_map(|simple| match simple {
                    SimpleSelector::PseudoElement(pseudo) => Some(*pseudo),
                    _ => None,
                })
                .unwrap_or(PseudoType::None)
        })
    }

    /// [§ 17 Calculating specificity](https://www.w3.org/TR/selectors-4/#specificity-rules)
    ///
    /// 32-bit accumulator: 0x10000 per id, 0x100 per class / attribute /
    /// pseudo-class, 0x1 per type selector / pseudo-element.
    #[must_use]
    pub fn specificity(&self) -> u32 {
        let mut total = 0u32;
        for (_, compound) in &self.compounds {
            for simple in &compound.selectors {
                total = total.saturating_add(match simple {
                    SimpleSelector::Id(_) => 0x10000,
                    SimpleSelector::Universal => 0,
                    SimpleSelector::Tag(_) | SimpleSelector::PseudoElement(_) => 0x1,
                    SimpleSelector::PseudoPage(_) => 0x1,
                    _ => 0x100,
                });
            }
        }
        total
    }
}

/// Match a complex selector against an element, right to left.
#[must_use]
pub fn matches_selector(
    tree: &DomTree,
    element: NodeId,
    selector: &ComplexSelector,
    pseudo: PseudoType,
) -> bool {
    let Some((_, subject)) = selector.compounds.last() else {
        return false;
    };
    // The selector's pseudo-element must agree with the requested pseudo.
    if selector.pseudo_type() != pseudo {
        return false;
    }
    if !matches_compound(tree, element, subject) {
        return false;
    }
    matches_leftward(tree, element, selector, selector.compounds.len() - 1)
}

/// Walk the combinator chain leftward from compound `index`, which already
/// matched at `element`.
fn matches_leftward(
    tree: &DomTree,
    element: NodeId,
    selector: &ComplexSelector,
    index: usize,
) -> bool {
    if index == 0 {
        return true;
    }
    let (combinator, _) = &selector.compounds[index];
    let (_, left_compound) = &selector.compounds[index - 1];
    match combinator {
        Combinator::None => true,
        // Backtracking: any ancestor may satisfy the left compound.
        Combinator::Descendant => {
            let mut current = tree.parent_element(element);
            while let Some(ancestor) = current {
                if matches_compound(tree, ancestor, left_compound)
                    && matches_leftward(tree, ancestor, selector, index - 1)
                {
                    return true;
                }
                current = tree.parent_element(ancestor);
            }
            false
        }
        Combinator::Child => tree.parent_element(element).is_some_and(|parent| {
            matches_compound(tree, parent, left_compound)
                && matches_leftward(tree, parent, selector, index - 1)
        }),
        Combinator::NextSibling => previous_element_sibling(tree, element).is_some_and(|sibling| {
            matches_compound(tree, sibling, left_compound)
                && matches_leftward(tree, sibling, selector, index - 1)
        }),
        // Backtracking: any preceding element sibling may satisfy it.
        Combinator::SubsequentSibling => {
            let mut current = previous_element_sibling(tree, element);
            while let Some(sibling) = current {
                if matches_compound(tree, sibling, left_compound)
                    && matches_leftward(tree, sibling, selector, index - 1)
                {
                    return true;
                }
                current = previous_element_sibling(tree, sibling);
            }
            false
        }
    }
}

fn matches_compound(tree: &DomTree, element: NodeId, compound: &CompoundSelector) -> bool {
    compound
        .selectors
        .iter()
        .all(|simple| matches_simple(tree, element, simple))
}

fn previous_element_sibling(tree: &DomTree, element: NodeId) -> Option<NodeId> {
    tree.preceding_siblings(element)
        .find(|&id| tree.as_element(id).is_some())
}

fn next_element_sibling(tree: &DomTree, element: NodeId) -> Option<NodeId> {
    let mut current = tree.next_sibling(element);
    while let Some(id) = current {
        if tree.as_element(id).is_some() {
            return Some(id);
        }
        current = tree.next_sibling(id);
    }
    None
}

fn attr_compare(value: &str, target: &str, case: AttrCase) -> (String, String) {
    match case {
        AttrCase::Sensitive => (value.to_owned(), target.to_owned()),
        AttrCase::Insensitive => (value.to_ascii_lowercase(), target.to_ascii_lowercase()),
    }
}

#[allow(clippy::too_many_lines)]
fn matches_simple(tree: &DomTree, element: NodeId, simple: &SimpleSelector) -> bool {
    let Some(data) = tree.as_element(element) else {
        return false;
    };
    match simple {
        SimpleSelector::Universal => true,
        SimpleSelector::Tag(tag) => data.tag_name == *tag,
        SimpleSelector::Id(id) => data.id() == Some(*id),
        SimpleSelector::Class(class) => data.classes().contains(class),
        SimpleSelector::AttrHas(name) => data.attribute(*name).is_some(),
        SimpleSelector::AttrEquals(name, target, case) => {
            data.attribute(*name).is_some_and(|value| {
                let (value, target) = attr_compare(value, target, *case);
                value == target
            })
        }
        SimpleSelector::AttrIncludes(name, target, case) => {
            data.attribute(*name).is_some_and(|value| {
                let (value, target) = attr_compare(value, target, *case);
                value.split_ascii_whitespace().any(|word| word == target)
            })
        }
        SimpleSelector::AttrContains(name, target, case) => {
            data.attribute(*name).is_some_and(|value| {
                let (value, target) = attr_compare(value, target, *case);
                !target.is_empty() && value.contains(&target)
            })
        }
        SimpleSelector::AttrDashEquals(name, target, case) => {
            data.attribute(*name).is_some_and(|value| {
                let (value, target) = attr_compare(value, target, *case);
                value == target || value.starts_with(&format!("{target}-"))
            })
        }
        SimpleSelector::AttrStartsWith(name, target, case) => {
            data.attribute(*name).is_some_and(|value| {
                let (value, target) = attr_compare(value, target, *case);
                !target.is_empty() && value.starts_with(&target)
            })
        }
        SimpleSelector::AttrEndsWith(name, target, case) => {
            data.attribute(*name).is_some_and(|value| {
                let (value, target) = attr_compare(value, target, *case);
                !target.is_empty() && value.ends_with(&target)
            })
        }
        // ":root ⇔ no parent element."
        SimpleSelector::Root => tree.parent_element(element).is_none(),
        // ":empty ⇔ no first child of any kind."
        SimpleSelector::Empty => tree.first_child(element).is_none(),
        SimpleSelector::FirstChild => previous_element_sibling(tree, element).is_none(),
        SimpleSelector::LastChild => next_element_sibling(tree, element).is_none(),
        SimpleSelector::OnlyChild => {
            previous_element_sibling(tree, element).is_none()
                && next_element_sibling(tree, element).is_none()
        }
        SimpleSelector::FirstOfType => {
            !tree
                .preceding_siblings(element)
                .any(|id| tree.tag_name(id) == Some(data.tag_name))
        }
        SimpleSelector::LastOfType => {
            let mut current = tree.next_sibling(element);
            while let Some(id) = current {
                if tree.tag_name(id) == Some(data.tag_name) {
                    return false;
                }
                current = tree.next_sibling(id);
            }
            true
        }
        SimpleSelector::OnlyOfType => {
            let preceded = tree
                .preceding_siblings(element)
                .any(|id| tree.tag_name(id) == Some(data.tag_name));
            if preceded {
                return false;
            }
            let mut current = tree.next_sibling(element);
            while let Some(id) = current {
                if tree.tag_name(id) == Some(data.tag_name) {
                    return false;
                }
                current = tree.next_sibling(id);
            }
            true
        }
        // ":link: an anchor with an href attribute."
        SimpleSelector::Link => {
            (data.tag_name == "a" || data.tag_name == "area") && data.has_attribute("href")
        }
        SimpleSelector::Enabled => {
            matches!(
                data.tag_name.as_str(),
                "input" | "button" | "select" | "textarea" | "option" | "optgroup"
            ) && !data.has_attribute("disabled")
        }
        SimpleSelector::Disabled => {
            matches!(
                data.tag_name.as_str(),
                "input" | "button" | "select" | "textarea" | "option" | "optgroup"
            ) && data.has_attribute("disabled")
        }
        SimpleSelector::Checked => {
            (data.tag_name == "input" && data.has_attribute("checked"))
                || (data.tag_name == "option" && data.has_attribute("selected"))
        }
        // ":lang(L) uses dash-equals on the nearest lang attribute."
        SimpleSelector::Lang(lang) => {
            let mut current = Some(element);
            while let Some(id) = current {
                if let Some(value) = tree.as_element(id).and_then(|e| e.attribute_str("lang")) {
                    let value = value.to_ascii_lowercase();
                    let target = lang.to_ascii_lowercase();
                    return value == target || value.starts_with(&format!("{target}-"));
                }
                current = tree.parent_element(id);
            }
            false
        }
        SimpleSelector::Nth { a, b, kind } => {
            let same_type = matches!(kind, NthKind::OfType | NthKind::LastOfType);
            let from_end = matches!(kind, NthKind::LastChild | NthKind::LastOfType);
            let count = sibling_index(tree, element, data, same_type, from_end);
            nth_matches(*a, *b, count)
        }
        SimpleSelector::Is(selectors) => selectors
            .iter()
            .any(|s| matches_selector(tree, element, s, PseudoType::None)),
        SimpleSelector::Not(selectors) => !selectors
            .iter()
            .any(|s| matches_selector(tree, element, s, PseudoType::None)),
        // Pseudo-element agreement is checked at the complex-selector level;
        // page pseudo-classes never match elements.
        SimpleSelector::PseudoElement(_) => true,
        SimpleSelector::PseudoPage(_) => false,
    }
}

/// 1-based index among element siblings, counted from the front or back,
/// optionally filtered by tag name.
fn sibling_index(
    tree: &DomTree,
    element: NodeId,
    data: &ElementData,
    same_type: bool,
    from_end: bool,
) -> i32 {
    let mut count = 1i32;
    if from_end {
        let mut current = tree.next_sibling(element);
        while let Some(id) = current {
            if tree.as_element(id).is_some()
                && (!same_type || tree.tag_name(id) == Some(data.tag_name))
            {
                count += 1;
            }
            current = tree.next_sibling(id);
        }
    } else {
        for id in tree.preceding_siblings(element) {
            if tree.as_element(id).is_some()
                && (!same_type || tree.tag_name(id) == Some(data.tag_name))
            {
                count += 1;
            }
        }
    }
    count
}

/// The `An+B` matcher: does some n >= 0 satisfy `count == A*n + B`?
fn nth_matches(a: i32, b: i32, count: i32) -> bool {
    match a.cmp(&0) {
        std::cmp::Ordering::Greater => count >= b && (count - b) % a == 0,
        std::cmp::Ordering::Less => count <= b && (b - count) % -a == 0,
        std::cmp::Ordering::Equal => count == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nth_formula() {
        // 2n+1: odd positions.
        assert!(nth_matches(2, 1, 1));
        assert!(!nth_matches(2, 1, 2));
        assert!(nth_matches(2, 1, 3));
        // 2n+3: 3, 5, 7... but never 1.
        assert!(!nth_matches(2, 3, 1));
        assert!(nth_matches(2, 3, 3));
        assert!(nth_matches(2, 3, 5));
        // -n+2: 1 and 2 only.
        assert!(nth_matches(-1, 2, 1));
        assert!(nth_matches(-1, 2, 2));
        assert!(!nth_matches(-1, 2, 3));
        // 0n+4: exactly 4.
        assert!(nth_matches(0, 4, 4));
        assert!(!nth_matches(0, 4, 8));
    }

    #[test]
    fn specificity_accumulates() {
        let selector = ComplexSelector {
            compounds: vec![(
                Combinator::None,
                CompoundSelector {
                    selectors: vec![
                        SimpleSelector::Tag(Atom::new("p")),
                        SimpleSelector::Class(Atom::new("x")),
                        SimpleSelector::Id(Atom::new("y")),
                    ],
                },
            )],
        };
        assert_eq!(selector.specificity(), 0x10101);
    }
}
