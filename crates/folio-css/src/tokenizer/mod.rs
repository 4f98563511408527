//! CSS tokenizer per
//! [§ 4 Tokenization](https://www.w3.org/TR/css-syntax-3/#tokenization).

mod stream;
mod token;
#[allow(clippy::module_inception)]
mod tokenizer;

pub use stream::{StreamGuard, TokenStream};
pub use token::{CssToken, HashKind, NumericKind};
pub use tokenizer::CssTokenizer;
