//! CSS compilation for the Folio book compiler.
//!
//! # Scope
//!
//! This crate implements the style half of the front-end pipeline:
//!
//! - **CSS Tokenizer** ([§ 4 Tokenization](https://www.w3.org/TR/css-syntax-3/#tokenization))
//!   with a preserved-token stream, block/component consumption, and a
//!   transactional stream guard
//! - **CSS Parser** ([§ 5 Parsing](https://www.w3.org/TR/css-syntax-3/#parsing)):
//!   style rules, `@import`, `@font-face`, `@page` with margin boxes, the
//!   full selector grammar, per-property value consumers, and shorthand
//!   expansion
//! - **Selector matching** ([Selectors Level 4](https://www.w3.org/TR/selectors-4/)):
//!   right-to-left combinator walk with backtracking
//! - **Rule cache and cascade** ([CSS Cascading Level 4](https://www.w3.org/TR/css-cascade-4/)):
//!   rules partitioned by their rightmost simple selector, candidates
//!   resolved by `(specificity, source order)` with `!important` handling,
//!   inheritance, and computed-value resolution
//!
//! Everything recovers: an unknown property, selector, or at-rule drops that
//! construct and parsing continues, per CSS error recovery.

pub mod cascade;
pub mod fontface;
pub mod parser;
pub mod properties;
pub mod selector;
pub mod style;
pub mod tokenizer;
pub mod ua_stylesheet;
pub mod value;

pub use cascade::{StyleBuilder, StyleSheet};
pub use parser::Declaration;
pub use properties::PropertyId;
pub use selector::PseudoType;
pub use style::ComputedStyle;
pub use value::{CssValue, ValueId, ValueRef};
