//! WHATWG-compliant HTML parsing for the Folio book compiler.
//!
//! Two stages, matching the structure of
//! [§ 13.2 Parsing HTML documents](https://html.spec.whatwg.org/multipage/parsing.html):
//!
//! - [`tokenizer`] - byte stream to token stream, the 70+ state tokenizer
//!   machine with character-reference resolution
//! - [`parser`] - token stream to DOM tree, the insertion-mode machine with
//!   foster parenting, the adoption agency, and foreign-content handoff
//!
//! Parsing never fails: every anomaly records a parse issue and recovers, so
//! a tree always comes out the other end.

pub mod parser;
pub mod tokenizer;

pub use parser::{HtmlParser, ParseIssue};
pub use tokenizer::{HtmlTokenizer, Token};

use folio_dom::DomTree;

/// Parse an HTML document in one step: tokenize `content`, then run the tree
/// builder over the token stream.
#[must_use]
pub fn parse_document(content: &str) -> DomTree {
    let mut tokenizer = HtmlTokenizer::new(content);
    tokenizer.run();
    HtmlParser::new(tokenizer.into_tokens()).run()
}
