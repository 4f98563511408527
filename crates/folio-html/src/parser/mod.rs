//! HTML tree construction per
//! [§ 13.2.6 Tree construction](https://html.spec.whatwg.org/multipage/parsing.html#tree-construction).

mod core;
mod foreign;

pub use core::{HtmlParser, InsertionMode, ParseIssue, ParseOutcome};
