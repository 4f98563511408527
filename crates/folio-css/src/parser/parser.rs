//! Rule-level parsing: style rules, at-rules, and declarations.
//!
//! [§ 5.4 Parser Algorithms](https://www.w3.org/TR/css-syntax-3/#parser-algorithms)
//!
//! A style sheet is a list of rules. Anything the grammar rejects - an
//! unknown at-rule, an unparseable selector list, a declaration whose value
//! does not match its property - is dropped and parsing continues.

use std::rc::Rc;

use folio_common::intern::Atom;
use folio_common::warning::{warn_once, WarnKind};

use super::selectors::{consume_page_selector_list, consume_selector_list};
use super::shorthand::{expand, Shorthand};
use super::values::consume_longhand;
use crate::properties::PropertyId;
use crate::selector::{ComplexSelector, PseudoPage};
use crate::tokenizer::{CssToken, CssTokenizer, TokenStream};
use crate::value::{CssValue, ValueRef};

/// A parsed declaration: `(property-id, !important flag, value)`.
#[derive(Debug, Clone)]
pub struct Declaration {
    /// The longhand property.
    pub id: PropertyId,
    /// The parsed value tree.
    pub value: ValueRef,
    /// Whether the declaration carried `!important`.
    pub important: bool,
}

/// A qualified rule: selector list plus declaration block.
#[derive(Debug, Clone)]
pub struct StyleRule {
    /// The comma-separated selectors.
    pub selectors: Vec<ComplexSelector>,
    /// The declarations, shorthands already expanded.
    pub declarations: Vec<Declaration>,
}

/// `@import url(...)`. The child rules are fetched lazily at rule-cache
/// install time, not during parsing.
#[derive(Debug, Clone)]
pub struct ImportRule {
    /// The unresolved href as written.
    pub href: String,
}

/// `@font-face { ... }`. The declaration subset that matters downstream is
/// `font-family` / `font-style` / `font-variant` / `font-weight` / `src`.
#[derive(Debug, Clone)]
pub struct FontFaceRule {
    /// The block's declarations.
    pub declarations: Vec<Declaration>,
}

/// One `@page` selector: `page-name? (":first"|":left"|":right"|":blank")*`.
#[derive(Debug, Clone)]
pub struct PageSelector {
    /// The optional page name.
    pub name: Option<Atom>,
    /// The page pseudo-classes, in source order.
    pub pseudos: Vec<PseudoPage>,
}

/// [CSS Paged Media § 6 Page-margin boxes](https://www.w3.org/TR/css-page-3/#margin-boxes)
///
/// The 16 margin-box slots around the page area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PageMarginBox {
    TopLeftCorner,
    TopLeft,
    TopCenter,
    TopRight,
    TopRightCorner,
    BottomLeftCorner,
    BottomLeft,
    BottomCenter,
    BottomRight,
    BottomRightCorner,
    LeftTop,
    LeftMiddle,
    LeftBottom,
    RightTop,
    RightMiddle,
    RightBottom,
}

impl PageMarginBox {
    /// Look up a margin box by its at-keyword name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "top-left-corner" => Self::TopLeftCorner,
            "top-left" => Self::TopLeft,
            "top-center" => Self::TopCenter,
            "top-right" => Self::TopRight,
            "top-right-corner" => Self::TopRightCorner,
            "bottom-left-corner" => Self::BottomLeftCorner,
            "bottom-left" => Self::BottomLeft,
            "bottom-center" => Self::BottomCenter,
            "bottom-right" => Self::BottomRight,
            "bottom-right-corner" => Self::BottomRightCorner,
            "left-top" => Self::LeftTop,
            "left-middle" => Self::LeftMiddle,
            "left-bottom" => Self::LeftBottom,
            "right-top" => Self::RightTop,
            "right-middle" => Self::RightMiddle,
            "right-bottom" => Self::RightBottom,
            _ => return None,
        })
    }
}

/// One page-margin rule inside an `@page` block.
#[derive(Debug, Clone)]
pub struct PageMarginRule {
    /// Which margin slot this rule styles.
    pub margin_box: PageMarginBox,
    /// The slot's declarations.
    pub declarations: Vec<Declaration>,
}

/// `@page` rule: selectors, margin rules, and page declarations.
#[derive(Debug, Clone)]
pub struct PageRule {
    /// The page selectors; empty means "all pages".
    pub selectors: Vec<PageSelector>,
    /// Margin-box rules in source order.
    pub margins: Vec<PageMarginRule>,
    /// The page's own declarations.
    pub declarations: Vec<Declaration>,
}

/// A top-level rule.
#[derive(Debug, Clone)]
pub enum Rule {
    /// A style rule.
    Style(StyleRule),
    /// An `@import` rule.
    Import(ImportRule),
    /// An `@font-face` rule.
    FontFace(FontFaceRule),
    /// An `@page` rule.
    Page(PageRule),
}

/// The CSS parser entry points.
pub struct CssParser;

impl CssParser {
    /// Parse a style sheet into its rule list.
    #[must_use]
    pub fn parse_stylesheet(text: &str) -> Vec<Rule> {
        let mut tokenizer = CssTokenizer::new(text);
        tokenizer.run();
        let mut input = TokenStream::new(tokenizer.into_tokens());
        consume_rule_list(&mut input)
    }

    /// Parse a bare declaration list (the `style=""` attribute).
    #[must_use]
    pub fn parse_inline_style(text: &str) -> Vec<Declaration> {
        let mut tokenizer = CssTokenizer::new(text);
        tokenizer.run();
        parse_declaration_list(tokenizer.into_tokens())
    }
}

/// [§ 5.4.1 Consume a list of rules](https://www.w3.org/TR/css-syntax-3/#consume-list-of-rules)
fn consume_rule_list(input: &mut TokenStream) -> Vec<Rule> {
    let mut rules = Vec::new();
    loop {
        input.skip_whitespace();
        match input.peek().clone() {
            CssToken::EndOfFile => return rules,
            // "<CDO-token> / <CDC-token>: do nothing" at the top level.
            CssToken::CDO | CssToken::CDC => input.advance(),
            CssToken::AtKeyword(name) => {
                input.advance();
                if let Some(rule) = consume_at_rule(input, &name) {
                    rules.push(rule);
                }
            }
            _ => {
                if let Some(rule) = consume_qualified_rule(input) {
                    rules.push(rule);
                }
            }
        }
        if input.at_end() {
            return rules;
        }
    }
}

/// Collect prelude tokens up to (not including) a `{`, `;`, or EOF,
/// preserving nested blocks verbatim.
fn collect_prelude(input: &mut TokenStream) -> Vec<CssToken> {
    let mut prelude = Vec::new();
    loop {
        match input.peek().clone() {
            CssToken::EndOfFile | CssToken::LeftBrace | CssToken::Semicolon => return prelude,
            token => {
                input.advance();
                if let Some(closer) = token.closing_pair() {
                    prelude.push(token.clone());
                    let mut inner = input.collect_block(&closer);
                    prelude.append(&mut inner);
                    prelude.push(closer);
                } else {
                    prelude.push(token);
                }
            }
        }
    }
}

/// [§ 5.4.2 Consume an at-rule](https://www.w3.org/TR/css-syntax-3/#consume-at-rule)
fn consume_at_rule(input: &mut TokenStream, name: &str) -> Option<Rule> {
    let prelude = collect_prelude(input);
    match name.to_ascii_lowercase().as_str() {
        "import" => {
            if *input.peek() == CssToken::Semicolon {
                input.advance();
            }
            consume_import_prelude(prelude)
        }
        "font-face" => {
            if *input.peek() != CssToken::LeftBrace {
                return None;
            }
            input.advance();
            let block = input.collect_block(&CssToken::RightBrace);
            Some(Rule::FontFace(FontFaceRule {
                declarations: parse_declaration_list(block),
            }))
        }
        "page" => {
            if *input.peek() != CssToken::LeftBrace {
                return None;
            }
            input.advance();
            let block = input.collect_block(&CssToken::RightBrace);
            consume_page_rule(prelude, block)
        }
        other => {
            warn_once(WarnKind::Css, &format!("dropping unsupported at-rule '@{other}'"));
            if *input.peek() == CssToken::Semicolon {
                input.advance();
            } else if *input.peek() == CssToken::LeftBrace {
                input.advance();
                input.consume_block_contents(&CssToken::RightBrace);
            }
            None
        }
    }
}

/// `@import <url> ;` - with a url-function or string argument. Media
/// queries are not supported; trailing tokens drop the rule.
fn consume_import_prelude(prelude: Vec<CssToken>) -> Option<Rule> {
    let mut input = TokenStream::new(prelude);
    input.skip_whitespace();
    let href = match input.next_token() {
        CssToken::Url(href) | CssToken::String(href) => href,
        CssToken::Function(name) if name == "url" => {
            input.skip_whitespace();
            let CssToken::String(href) = input.next_token() else {
                return None;
            };
            input.skip_whitespace();
            if input.next_token() != CssToken::RightParen {
                return None;
            }
            href
        }
        _ => return None,
    };
    input.skip_whitespace();
    if !input.at_end() {
        warn_once(WarnKind::Css, "dropping @import with unsupported media query");
        return None;
    }
    Some(Rule::Import(ImportRule { href }))
}

/// An `@page` block: declarations mixed with page-margin at-rules.
fn consume_page_rule(prelude: Vec<CssToken>, block: Vec<CssToken>) -> Option<Rule> {
    let selectors = if prelude.iter().all(CssToken::is_whitespace) {
        Vec::new()
    } else {
        let mut prelude_input = TokenStream::new(prelude);
        let parsed = consume_page_selector_list(&mut prelude_input)?;
        parsed
            .into_iter()
            .map(|(name, pseudos)| PageSelector { name, pseudos })
            .collect()
    };

    let mut input = TokenStream::new(block);
    let mut margins = Vec::new();
    let mut declaration_tokens = Vec::new();
    loop {
        match input.peek().clone() {
            CssToken::EndOfFile => break,
            CssToken::AtKeyword(margin_name) => {
                input.advance();
                let _ = collect_prelude(&mut input);
                if *input.peek() != CssToken::LeftBrace {
                    continue;
                }
                input.advance();
                let margin_block = input.collect_block(&CssToken::RightBrace);
                match PageMarginBox::from_name(&margin_name) {
                    Some(margin_box) => margins.push(PageMarginRule {
                        margin_box,
                        declarations: parse_declaration_list(margin_block),
                    }),
                    None => warn_once(
                        WarnKind::Css,
                        &format!("dropping unknown page-margin rule '@{margin_name}'"),
                    ),
                }
            }
            token => {
                input.advance();
                if let Some(closer) = token.closing_pair() {
                    declaration_tokens.push(token.clone());
                    let mut inner = input.collect_block(&closer);
                    declaration_tokens.append(&mut inner);
                    declaration_tokens.push(closer);
                } else {
                    declaration_tokens.push(token);
                }
            }
        }
        if input.at_end() {
            break;
        }
    }

    Some(Rule::Page(PageRule {
        selectors,
        margins,
        declarations: parse_declaration_list(declaration_tokens),
    }))
}

/// [§ 5.4.3 Consume a qualified rule](https://www.w3.org/TR/css-syntax-3/#consume-qualified-rule)
fn consume_qualified_rule(input: &mut TokenStream) -> Option<Rule> {
    let prelude = collect_prelude(input);
    if *input.peek() != CssToken::LeftBrace {
        // "EOF: this is a parse error. Return nothing."
        input.advance();
        return None;
    }
    input.advance();
    let block = input.collect_block(&CssToken::RightBrace);

    let mut prelude_input = TokenStream::new(prelude);
    let Some(selectors) = consume_selector_list(&mut prelude_input) else {
        warn_once(WarnKind::Css, "dropping rule with unsupported selector list");
        return None;
    };
    Some(Rule::Style(StyleRule {
        selectors,
        declarations: parse_declaration_list(block),
    }))
}

/// [§ 5.4.5 Consume a list of declarations](https://www.w3.org/TR/css-syntax-3/#consume-list-of-declarations)
pub fn parse_declaration_list(tokens: Vec<CssToken>) -> Vec<Declaration> {
    let mut input = TokenStream::new(tokens);
    let mut declarations = Vec::new();
    loop {
        input.skip_whitespace();
        match input.peek().clone() {
            CssToken::EndOfFile => break,
            CssToken::Semicolon => input.advance(),
            CssToken::Ident(name) => {
                input.advance();
                consume_declaration(&mut input, &name, &mut declarations);
            }
            _ => {
                // "Parse error. As long as the next input token is anything
                // other than a <semicolon-token>, consume a component value
                // and throw it away."
                while !matches!(input.peek(), CssToken::Semicolon | CssToken::EndOfFile) {
                    input.consume_component();
                }
            }
        }
        if input.at_end() {
            break;
        }
    }
    declarations
}

/// [§ 5.4.6 Consume a declaration](https://www.w3.org/TR/css-syntax-3/#consume-declaration)
///
/// The property name has been consumed.
fn consume_declaration(input: &mut TokenStream, name: &str, out: &mut Vec<Declaration>) {
    input.skip_whitespace();
    if *input.peek() != CssToken::Colon {
        // Not a declaration after all; discard to the next semicolon.
        while !matches!(input.peek(), CssToken::Semicolon | CssToken::EndOfFile) {
            input.consume_component();
        }
        return;
    }
    input.advance();

    // Collect the value tokens up to the declaration's end, keeping nested
    // blocks intact.
    let mut value_tokens = Vec::new();
    loop {
        match input.peek().clone() {
            CssToken::Semicolon | CssToken::EndOfFile => break,
            token => {
                input.advance();
                if let Some(closer) = token.closing_pair() {
                    value_tokens.push(token.clone());
                    let mut inner = input.collect_block(&closer);
                    value_tokens.append(&mut inner);
                    value_tokens.push(closer);
                } else {
                    value_tokens.push(token);
                }
            }
        }
        if input.at_end() {
            break;
        }
    }

    let important = take_important(&mut value_tokens);
    while value_tokens.last().is_some_and(CssToken::is_whitespace) {
        let _ = value_tokens.pop();
    }

    apply_declaration(name, value_tokens, important, out);
}

/// "Trailing `!important` captured by looking backward before value
/// parsing."
fn take_important(value_tokens: &mut Vec<CssToken>) -> bool {
    let mut index = value_tokens.len();
    while index > 0 && value_tokens[index - 1].is_whitespace() {
        index -= 1;
    }
    let Some(CssToken::Ident(word)) = value_tokens.get(index.wrapping_sub(1)) else {
        return false;
    };
    if !word.eq_ignore_ascii_case("important") {
        return false;
    }
    let mut before = index - 1;
    while before > 0 && value_tokens[before - 1].is_whitespace() {
        before -= 1;
    }
    if before == 0 || value_tokens[before - 1] != CssToken::Delim('!') {
        return false;
    }
    value_tokens.truncate(before - 1);
    true
}

/// Route a declaration to the CSS-wide keywords, a shorthand expander, or
/// the property's longhand consumer.
fn apply_declaration(
    name: &str,
    value_tokens: Vec<CssToken>,
    important: bool,
    out: &mut Vec<Declaration>,
) {
    // `inherit` and `initial` expand to every longhand of a shorthand.
    let wide_keyword = {
        let non_ws: Vec<&CssToken> = value_tokens
            .iter()
            .filter(|t| !t.is_whitespace())
            .collect();
        match non_ws.as_slice() {
            [CssToken::Ident(word)] if word.eq_ignore_ascii_case("inherit") => {
                Some(CssValue::Inherit)
            }
            [CssToken::Ident(word)] if word.eq_ignore_ascii_case("initial") => {
                Some(CssValue::Initial)
            }
            _ => None,
        }
    };

    if let Some(keyword) = wide_keyword {
        let value = Rc::new(keyword);
        if let Some(shorthand) = Shorthand::from_name(name) {
            for &id in shorthand.longhands() {
                out.push(Declaration {
                    id,
                    value: Rc::clone(&value),
                    important,
                });
            }
        } else if let Some(id) = PropertyId::from_name(name) {
            out.push(Declaration {
                id,
                value,
                important,
            });
        } else {
            warn_once(WarnKind::Css, &format!("dropping unknown property '{name}'"));
        }
        return;
    }

    let mut value_input = TokenStream::new(value_tokens);
    if let Some(shorthand) = Shorthand::from_name(name) {
        if !expand(shorthand, &mut value_input, important, out) {
            warn_once(WarnKind::Css, &format!("dropping invalid '{name}' shorthand value"));
        }
        return;
    }
    let Some(id) = PropertyId::from_name(name) else {
        warn_once(WarnKind::Css, &format!("dropping unknown property '{name}'"));
        return;
    };
    value_input.skip_whitespace();
    let Some(value) = consume_longhand(&mut value_input, id) else {
        warn_once(WarnKind::Css, &format!("dropping invalid value for '{name}'"));
        return;
    };
    value_input.skip_whitespace();
    if !value_input.at_end() {
        warn_once(WarnKind::Css, &format!("dropping '{name}' with trailing junk"));
        return;
    }
    out.push(Declaration {
        id,
        value,
        important,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueId;

    fn parse(text: &str) -> Vec<Rule> {
        CssParser::parse_stylesheet(text)
    }

    fn style_rules(rules: &[Rule]) -> Vec<&StyleRule> {
        rules
            .iter()
            .filter_map(|r| match r {
                Rule::Style(rule) => Some(rule),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn simple_rule_parses() {
        let rules = parse("p { color: red; display: block }");
        let styles = style_rules(&rules);
        assert_eq!(styles.len(), 1);
        assert_eq!(styles[0].selectors.len(), 1);
        assert_eq!(styles[0].declarations.len(), 2);
        assert_eq!(styles[0].declarations[0].id, PropertyId::Color);
        assert!(styles[0].declarations[1]
            .value
            .is_ident(ValueId::Block));
    }

    #[test]
    fn important_flag_is_captured() {
        let rules = parse("p { color: red !important; width: 4px ! Important }");
        let styles = style_rules(&rules);
        assert!(styles[0].declarations[0].important);
        assert!(styles[0].declarations[1].important);
    }

    #[test]
    fn invalid_declaration_is_dropped() {
        let rules = parse("p { color: ; display: block; bogus: 1; width: nonsense }");
        let styles = style_rules(&rules);
        assert_eq!(styles[0].declarations.len(), 1);
        assert_eq!(styles[0].declarations[0].id, PropertyId::Display);
    }

    #[test]
    fn margin_shorthand_fill_up() {
        let rules = parse("div { margin: 1px 2px }");
        let styles = style_rules(&rules);
        let decls = &styles[0].declarations;
        assert_eq!(decls.len(), 4);
        assert_eq!(decls[0].id, PropertyId::MarginTop);
        assert_eq!(decls[1].id, PropertyId::MarginRight);
        // bottom takes top, left takes right
        assert_eq!(decls[2].value, decls[0].value);
        assert_eq!(decls[3].value, decls[1].value);
    }

    #[test]
    fn inherit_expands_shorthand() {
        let rules = parse("div { margin: inherit }");
        let styles = style_rules(&rules);
        assert_eq!(styles[0].declarations.len(), 4);
        assert!(styles[0]
            .declarations
            .iter()
            .all(|d| matches!(&*d.value, CssValue::Inherit)));
    }

    #[test]
    fn border_shorthand_expands_all_sides() {
        let rules = parse("div { border: 1px solid black }");
        let styles = style_rules(&rules);
        assert_eq!(styles[0].declarations.len(), 12);
    }

    #[test]
    fn font_shorthand() {
        let rules = parse("body { font: italic bold 12pt/1.5 Georgia, serif }");
        let styles = style_rules(&rules);
        let decls = &styles[0].declarations;
        assert_eq!(decls.len(), 6);
        let by_id = |id: PropertyId| decls.iter().find(|d| d.id == id).unwrap();
        assert!(by_id(PropertyId::FontStyle).value.is_ident(ValueId::Italic));
        assert!(by_id(PropertyId::FontWeight).value.is_ident(ValueId::Bold));
        assert!(matches!(
            &*by_id(PropertyId::LineHeight).value,
            CssValue::Number(v) if (*v - 1.5).abs() < f32::EPSILON
        ));
    }

    #[test]
    fn import_rule_parses_without_media_query() {
        let rules = parse("@import url(base.css); @import \"other.css\" print;");
        let imports: Vec<_> = rules
            .iter()
            .filter_map(|r| match r {
                Rule::Import(rule) => Some(rule.href.clone()),
                _ => None,
            })
            .collect();
        // The media-qualified import is dropped.
        assert_eq!(imports, vec!["base.css".to_string()]);
    }

    #[test]
    fn font_face_rule_harvests_declarations() {
        let rules = parse(
            "@font-face { font-family: Gentium; src: url(gentium.woff2) format(\"woff2\"); font-weight: 700 }",
        );
        let Some(Rule::FontFace(font_face)) = rules.first() else {
            panic!("expected font-face rule");
        };
        assert_eq!(font_face.declarations.len(), 3);
    }

    #[test]
    fn page_rule_with_margin_boxes() {
        let rules = parse(
            "@page chapter:first { margin-top: 2cm; @top-center { content: \"Title\" } @bottom-right { content: counter(page) } }",
        );
        let Some(Rule::Page(page)) = rules.first() else {
            panic!("expected page rule");
        };
        assert_eq!(page.selectors.len(), 1);
        assert_eq!(page.selectors[0].name, Some(Atom::new("chapter")));
        assert_eq!(page.selectors[0].pseudos, vec![PseudoPage::First]);
        assert_eq!(page.margins.len(), 2);
        assert_eq!(page.margins[0].margin_box, PageMarginBox::TopCenter);
        assert_eq!(page.margins[1].margin_box, PageMarginBox::BottomRight);
        assert_eq!(page.declarations.len(), 1);
    }

    #[test]
    fn unknown_at_rule_is_skipped() {
        let rules = parse("@media print { p { color: red } } q { display: inline }");
        let styles = style_rules(&rules);
        assert_eq!(styles.len(), 1);
        assert_eq!(styles[0].declarations.len(), 1);
    }

    #[test]
    fn unsupported_selector_drops_whole_rule() {
        let rules = parse("p:hover { color: red } b { color: blue }");
        let styles = style_rules(&rules);
        assert_eq!(styles.len(), 1);
    }

    #[test]
    fn inline_style_parses() {
        let declarations = CssParser::parse_inline_style("color: red; margin: 2px");
        assert_eq!(declarations.len(), 5);
    }

    #[test]
    fn cdo_cdc_ignored_at_top_level() {
        let rules = parse("<!-- p { color: red } -->");
        assert_eq!(style_rules(&rules).len(), 1);
    }
}
