//! HTML tokenizer per
//! [§ 13.2.5 Tokenization](https://html.spec.whatwg.org/multipage/parsing.html#tokenization).

mod entities;
mod token;
#[allow(clippy::module_inception)]
mod tokenizer;

pub use token::{Attribute, Token};
pub use tokenizer::{HtmlTokenizer, TokenizerState};
