//! CSS parser per [§ 5 Parsing](https://www.w3.org/TR/css-syntax-3/#parsing).
//!
//! Rule-level parsing lives in [`parser`]; the selector grammar in
//! [`selectors`]; per-property value consumers in [`values`]; shorthand
//! expansion in [`shorthand`].

#[allow(clippy::module_inception)]
mod parser;
mod selectors;
mod shorthand;
mod values;

pub use parser::{
    CssParser, Declaration, FontFaceRule, ImportRule, PageMarginBox, PageMarginRule, PageRule,
    PageSelector, Rule, StyleRule,
};
pub use selectors::consume_selector_list;
pub use values::consume_longhand;
