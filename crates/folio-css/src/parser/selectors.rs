//! The selector grammar.
//!
//! [Selectors Level 4 § 19 Grammar](https://www.w3.org/TR/selectors-4/#grammar)
//!
//! An unsupported or malformed selector anywhere in a selector list
//! invalidates the whole list, which drops the rule - CSS error recovery
//! works at rule granularity for selectors.

use folio_common::intern::Atom;

use crate::selector::{
    AttrCase, Combinator, ComplexSelector, CompoundSelector, NthKind, PseudoPage, PseudoType,
    SimpleSelector,
};
use crate::tokenizer::{CssToken, NumericKind, TokenStream};

/// Parse a comma-separated selector list. `None` when any selector in the
/// list fails to parse.
pub fn consume_selector_list(input: &mut TokenStream) -> Option<Vec<ComplexSelector>> {
    let mut selectors = Vec::new();
    loop {
        let selector = consume_complex_selector(input)?;
        selectors.push(selector);
        input.skip_whitespace();
        if *input.peek() == CssToken::Comma {
            input.advance();
        } else {
            break;
        }
    }
    input.skip_whitespace();
    if input.at_end() {
        Some(selectors)
    } else {
        None
    }
}

/// Parse a selector list terminated by `)` (the `:is()` / `:not()` inner
/// grammar). Consumes the closing parenthesis.
fn consume_inner_selector_list(input: &mut TokenStream) -> Option<Vec<ComplexSelector>> {
    let mut selectors = Vec::new();
    loop {
        let selector = consume_complex_selector(input)?;
        selectors.push(selector);
        input.skip_whitespace();
        match input.peek() {
            CssToken::Comma => input.advance(),
            CssToken::RightParen => {
                input.advance();
                return Some(selectors);
            }
            _ => return None,
        }
    }
}

fn consume_complex_selector(input: &mut TokenStream) -> Option<ComplexSelector> {
    input.skip_whitespace();
    let first = consume_compound_selector(input)?;
    let mut compounds = vec![(Combinator::None, first)];

    loop {
        // Whitespace between compounds reads as the descendant combinator,
        // so note it before skipping.
        let saw_whitespace = input.peek().is_whitespace();
        input.skip_whitespace();
        let combinator = match input.peek() {
            CssToken::Delim('>') => {
                input.advance();
                input.skip_whitespace();
                Combinator::Child
            }
            CssToken::Delim('+') => {
                input.advance();
                input.skip_whitespace();
                Combinator::NextSibling
            }
            CssToken::Delim('~') => {
                input.advance();
                input.skip_whitespace();
                Combinator::SubsequentSibling
            }
            CssToken::Comma | CssToken::RightParen | CssToken::EndOfFile => break,
            _ if saw_whitespace => Combinator::Descendant,
            _ => break,
        };
        // A dangling combinator invalidates the selector.
        let compound = consume_compound_selector(input)?;
        compounds.push((combinator, compound));
    }

    Some(ComplexSelector { compounds })
}

fn consume_compound_selector(input: &mut TokenStream) -> Option<CompoundSelector> {
    let mut selectors = Vec::new();
    loop {
        match input.peek().clone() {
            CssToken::Ident(name) => {
                input.advance();
                selectors.push(SimpleSelector::Tag(Atom::new(&name)));
            }
            CssToken::Delim('*') => {
                input.advance();
                selectors.push(SimpleSelector::Universal);
            }
            CssToken::Hash { value, kind } => {
                if kind != crate::tokenizer::HashKind::Identifier {
                    return None;
                }
                input.advance();
                selectors.push(SimpleSelector::Id(Atom::new(&value)));
            }
            CssToken::Delim('.') => {
                input.advance();
                let CssToken::Ident(name) = input.next_token() else {
                    return None;
                };
                selectors.push(SimpleSelector::Class(Atom::new(&name)));
            }
            CssToken::LeftBracket => {
                input.advance();
                selectors.push(consume_attribute_selector(input)?);
            }
            CssToken::Colon => {
                input.advance();
                selectors.push(consume_pseudo_selector(input)?);
            }
            _ => break,
        }
    }
    if selectors.is_empty() {
        None
    } else {
        Some(CompoundSelector { selectors })
    }
}

/// [§ 6 Attribute selectors](https://www.w3.org/TR/selectors-4/#attribute-selectors)
///
/// The opening `[` has been consumed.
fn consume_attribute_selector(input: &mut TokenStream) -> Option<SimpleSelector> {
    input.skip_whitespace();
    let CssToken::Ident(name) = input.next_token() else {
        return None;
    };
    let name = Atom::new(&name);
    input.skip_whitespace();

    let matcher = match input.peek() {
        CssToken::RightBracket => {
            input.advance();
            return Some(SimpleSelector::AttrHas(name));
        }
        CssToken::Delim(c @ ('=' | '~' | '|' | '^' | '$' | '*')) => {
            let matcher = *c;
            input.advance();
            if matcher != '=' && input.next_token() != CssToken::Delim('=') {
                return None;
            }
            matcher
        }
        _ => return None,
    };

    input.skip_whitespace();
    let value = match input.next_token() {
        CssToken::Ident(v) | CssToken::String(v) => v,
        _ => return None,
    };
    input.skip_whitespace();

    // Optional case-sensitivity flag.
    let mut case = AttrCase::Sensitive;
    if let CssToken::Ident(flag) = input.peek() {
        if flag.eq_ignore_ascii_case("i") {
            case = AttrCase::Insensitive;
            input.advance();
            input.skip_whitespace();
        } else if flag.eq_ignore_ascii_case("s") {
            input.advance();
            input.skip_whitespace();
        }
    }

    if input.next_token() != CssToken::RightBracket {
        return None;
    }

    Some(match matcher {
        '=' => SimpleSelector::AttrEquals(name, value, case),
        '~' => SimpleSelector::AttrIncludes(name, value, case),
        '|' => SimpleSelector::AttrDashEquals(name, value, case),
        '^' => SimpleSelector::AttrStartsWith(name, value, case),
        '$' => SimpleSelector::AttrEndsWith(name, value, case),
        '*' => SimpleSelector::AttrContains(name, value, case),
        _ => return None,
    })
}

/// The leading `:` has been consumed.
fn consume_pseudo_selector(input: &mut TokenStream) -> Option<SimpleSelector> {
    if *input.peek() == CssToken::Colon {
        // "::pseudo introduces pseudo-elements."
        input.advance();
        let CssToken::Ident(name) = input.next_token() else {
            return None;
        };
        return PseudoType::from_name(&name).map(SimpleSelector::PseudoElement);
    }

    match input.next_token() {
        CssToken::Ident(name) => {
            let lower = name.to_ascii_lowercase();
            Some(match lower.as_str() {
                "root" => SimpleSelector::Root,
                "empty" => SimpleSelector::Empty,
                "first-child" => SimpleSelector::FirstChild,
                "last-child" => SimpleSelector::LastChild,
                "only-child" => SimpleSelector::OnlyChild,
                "first-of-type" => SimpleSelector::FirstOfType,
                "last-of-type" => SimpleSelector::LastOfType,
                "only-of-type" => SimpleSelector::OnlyOfType,
                "link" => SimpleSelector::Link,
                "enabled" => SimpleSelector::Enabled,
                "disabled" => SimpleSelector::Disabled,
                "checked" => SimpleSelector::Checked,
                // Single-colon legacy pseudo-element syntax.
                "before" => SimpleSelector::PseudoElement(PseudoType::Before),
                "after" => SimpleSelector::PseudoElement(PseudoType::After),
                "first-letter" => SimpleSelector::PseudoElement(PseudoType::FirstLetter),
                "first-line" => SimpleSelector::PseudoElement(PseudoType::FirstLine),
                _ => return None,
            })
        }
        CssToken::Function(name) => {
            let lower = name.to_ascii_lowercase();
            match lower.as_str() {
                "is" => consume_inner_selector_list(input).map(SimpleSelector::Is),
                "not" => consume_inner_selector_list(input).map(SimpleSelector::Not),
                "lang" => {
                    input.skip_whitespace();
                    let tag = match input.next_token() {
                        CssToken::Ident(v) | CssToken::String(v) => v,
                        _ => return None,
                    };
                    input.skip_whitespace();
                    if input.next_token() != CssToken::RightParen {
                        return None;
                    }
                    Some(SimpleSelector::Lang(tag))
                }
                "nth-child" | "nth-last-child" | "nth-of-type" | "nth-last-of-type" => {
                    let kind = match lower.as_str() {
                        "nth-child" => NthKind::Child,
                        "nth-last-child" => NthKind::LastChild,
                        "nth-of-type" => NthKind::OfType,
                        _ => NthKind::LastOfType,
                    };
                    let (a, b) = consume_nth_pattern(input)?;
                    input.skip_whitespace();
                    if input.next_token() != CssToken::RightParen {
                        return None;
                    }
                    Some(SimpleSelector::Nth { a, b, kind })
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// [§ 6 The An+B microsyntax](https://www.w3.org/TR/css-syntax-3/#anb-microsyntax)
///
/// Covers `odd`, `even`, `N`, `+N`, `-N`, `An`, `An+B`, `An-B`, with
/// whitespace allowed around the sign.
#[allow(clippy::cast_possible_truncation)]
fn consume_nth_pattern(input: &mut TokenStream) -> Option<(i32, i32)> {
    input.skip_whitespace();
    match input.next_token() {
        CssToken::Ident(name) => {
            let lower = name.to_ascii_lowercase();
            match lower.as_str() {
                "odd" => Some((2, 1)),
                "even" => Some((2, 0)),
                _ => consume_n_and_offset(input, &lower, 1),
            }
        }
        // "+n..." arrives as a delim followed by an ident.
        CssToken::Delim('+') => {
            let CssToken::Ident(name) = input.next_token() else {
                return None;
            };
            consume_n_and_offset(input, &name.to_ascii_lowercase(), 1)
        }
        CssToken::Number { value, kind, .. } => {
            if kind != NumericKind::Integer {
                return None;
            }
            Some((0, value as i32))
        }
        CssToken::Dimension {
            value, kind, unit, ..
        } => {
            if kind != NumericKind::Integer {
                return None;
            }
            let a = value as i32;
            if unit == "n" {
                let b = consume_signed_offset(input).unwrap_or(0);
                Some((a, b))
            } else if let Some(rest) = unit.strip_prefix("n-") {
                // "2n-1" tokenizes as one dimension with unit "n-1".
                rest.parse::<i32>().ok().map(|b| (a, -b))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Handle the ident forms: `n`, `-n`, `n-3`, `-n-3`, then an optional
/// signed offset.
fn consume_n_and_offset(input: &mut TokenStream, name: &str, sign: i32) -> Option<(i32, i32)> {
    let (a, embedded_b) = if name == "n" {
        (sign, None)
    } else if name == "-n" {
        (-sign, None)
    } else if let Some(rest) = name.strip_prefix("n-") {
        (sign, Some(-rest.parse::<i32>().ok()?))
    } else if let Some(rest) = name.strip_prefix("-n-") {
        (-sign, Some(-rest.parse::<i32>().ok()?))
    } else {
        return None;
    };
    if let Some(b) = embedded_b {
        return Some((a, b));
    }
    let b = consume_signed_offset(input).unwrap_or(0);
    Some((a, b))
}

/// The `± B` tail of `An ± B`, tolerating whitespace around the sign.
#[allow(clippy::cast_possible_truncation)]
fn consume_signed_offset(input: &mut TokenStream) -> Option<i32> {
    let start = input.position();
    input.skip_whitespace();
    match input.peek().clone() {
        CssToken::Number {
            value,
            kind: NumericKind::Integer,
            signed: true,
        } => {
            input.advance();
            Some(value as i32)
        }
        CssToken::Delim(sign @ ('+' | '-')) => {
            input.advance();
            input.skip_whitespace();
            match input.peek().clone() {
                CssToken::Number {
                    value,
                    kind: NumericKind::Integer,
                    signed: false,
                } => {
                    input.advance();
                    Some(if sign == '-' {
                        -(value as i32)
                    } else {
                        value as i32
                    })
                }
                _ => {
                    input.rewind(start);
                    None
                }
            }
        }
        _ => {
            input.rewind(start);
            None
        }
    }
}

/// Parse an `@page` selector prelude:
/// `page-name? (":first" | ":left" | ":right" | ":blank")*`.
pub fn consume_page_selector_list(input: &mut TokenStream) -> Option<Vec<(Option<Atom>, Vec<PseudoPage>)>> {
    let mut selectors = Vec::new();
    loop {
        input.skip_whitespace();
        let mut name = None;
        if let CssToken::Ident(ident) = input.peek().clone() {
            input.advance();
            name = Some(Atom::new(&ident));
        }
        let mut pseudos = Vec::new();
        while *input.peek() == CssToken::Colon {
            input.advance();
            let CssToken::Ident(pseudo) = input.next_token() else {
                return None;
            };
            pseudos.push(PseudoPage::from_name(&pseudo)?);
        }
        selectors.push((name, pseudos));
        input.skip_whitespace();
        if *input.peek() == CssToken::Comma {
            input.advance();
        } else {
            break;
        }
    }
    input.skip_whitespace();
    if input.at_end() {
        Some(selectors)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::CssTokenizer;

    fn parse_list(input: &str) -> Option<Vec<ComplexSelector>> {
        let mut tokenizer = CssTokenizer::new(input);
        tokenizer.run();
        let mut tokens = tokenizer.into_tokens();
        // Drop the EOF so at_end() reflects the selector text only.
        let _ = tokens.pop();
        let mut stream = TokenStream::new(tokens);
        consume_selector_list(&mut stream)
    }

    #[test]
    fn simple_selectors_parse() {
        let list = parse_list("div.note#main[data-x=\"1\"]").unwrap();
        assert_eq!(list.len(), 1);
        let compound = list[0].subject().unwrap();
        assert_eq!(compound.selectors.len(), 4);
    }

    #[test]
    fn combinators_parse() {
        let list = parse_list("ul > li + li ~ b em").unwrap();
        let combinators: Vec<_> = list[0].compounds.iter().map(|(c, _)| *c).collect();
        assert_eq!(
            combinators,
            vec![
                Combinator::None,
                Combinator::Child,
                Combinator::NextSibling,
                Combinator::SubsequentSibling,
                Combinator::Descendant,
            ]
        );
    }

    #[test]
    fn selector_list_splits_on_commas() {
        let list = parse_list("h1, h2 , h3").unwrap();
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn pseudo_elements_double_and_single_colon() {
        let list = parse_list("p::before, p:after").unwrap();
        assert_eq!(list[0].pseudo_type(), PseudoType::Before);
        assert_eq!(list[1].pseudo_type(), PseudoType::After);
    }

    #[test]
    fn functional_pseudo_classes() {
        let list = parse_list("li:nth-child(2n+1):not(.skip)").unwrap();
        let compound = list[0].subject().unwrap();
        assert!(compound.selectors.iter().any(|s| matches!(
            s,
            SimpleSelector::Nth {
                a: 2,
                b: 1,
                kind: NthKind::Child
            }
        )));
        assert!(compound
            .selectors
            .iter()
            .any(|s| matches!(s, SimpleSelector::Not(_))));
    }

    #[test]
    fn nth_pattern_forms() {
        for (text, expected) in [
            ("li:nth-child(odd)", (2, 1)),
            ("li:nth-child(even)", (2, 0)),
            ("li:nth-child(5)", (0, 5)),
            ("li:nth-child(n)", (1, 0)),
            ("li:nth-child(-n+2)", (-1, 2)),
            ("li:nth-child(2n)", (2, 0)),
            ("li:nth-child(2n+1)", (2, 1)),
            ("li:nth-child(2n - 1)", (2, -1)),
            ("li:nth-child(3n-2)", (3, -2)),
        ] {
            let list = parse_list(text).unwrap_or_else(|| panic!("failed to parse {text}"));
            let compound = list[0].subject().unwrap();
            let nth = compound
                .selectors
                .iter()
                .find_map(|s| match s {
                    SimpleSelector::Nth { a, b, .. } => Some((*a, *b)),
                    _ => None,
                })
                .unwrap();
            assert_eq!(nth, expected, "pattern {text}");
        }
    }

    #[test]
    fn attribute_matchers_parse() {
        let list = parse_list("[a] [b=x] [c~=x] [d|=x] [e^=x] [f$=x] [g*=x i]").unwrap();
        let kinds: Vec<_> = list[0]
            .compounds
            .iter()
            .map(|(_, c)| c.selectors[0].clone())
            .collect();
        assert!(matches!(kinds[0], SimpleSelector::AttrHas(_)));
        assert!(matches!(kinds[1], SimpleSelector::AttrEquals(..)));
        assert!(matches!(kinds[2], SimpleSelector::AttrIncludes(..)));
        assert!(matches!(kinds[3], SimpleSelector::AttrDashEquals(..)));
        assert!(matches!(kinds[4], SimpleSelector::AttrStartsWith(..)));
        assert!(matches!(kinds[5], SimpleSelector::AttrEndsWith(..)));
        assert!(matches!(
            kinds[6],
            SimpleSelector::AttrContains(_, _, AttrCase::Insensitive)
        ));
    }

    #[test]
    fn unsupported_pseudo_invalidates_list() {
        assert!(parse_list("p:hover").is_none());
        assert!(parse_list("p, q:hover").is_none());
    }

    #[test]
    fn specificity_ordering() {
        let list = parse_list("#a, .b, c").unwrap();
        assert_eq!(list[0].specificity(), 0x10000);
        assert_eq!(list[1].specificity(), 0x100);
        assert_eq!(list[2].specificity(), 0x1);
    }
}
