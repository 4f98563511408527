//! User-Agent Stylesheet
//!
//! [WHATWG HTML § 15 Rendering](https://html.spec.whatwg.org/multipage/rendering.html)
//!
//! "User agents are expected to have a default style sheet that presents
//! elements of HTML documents in ways consistent with general user
//! expectations."
//!
//! UA rules install first, so any user or author rule overrides them at the
//! cascade's position tie-breaker regardless of when it was written.

/// [WHATWG HTML § 15.3 The CSS user agent style sheet](https://html.spec.whatwg.org/multipage/rendering.html#the-css-user-agent-style-sheet-and-presentational-hints)
///
/// Default CSS rules for HTML elements, covering the subset that matters
/// for paginated book output.
pub const UA_CSS: &str = r#"
/* Hidden elements */
area, base, basefont, datalist, head, link, meta, noembed,
noframes, param, rp, script, style, template, title {
    display: none;
}

/* Flow content */
address, article, aside, blockquote, body, center, dd, details,
dialog, dir, div, dl, dt, fieldset, figcaption, figure, footer,
form, h1, h2, h3, h4, h5, h6, header, hgroup, hr, html, legend,
listing, main, menu, nav, ol, p, plaintext, pre,
section, summary, ul, xmp {
    display: block;
}

body {
    margin: 8px;
}

p, blockquote, figure, dl {
    margin-top: 1em;
    margin-bottom: 1em;
}

blockquote, figure {
    margin-left: 40px;
    margin-right: 40px;
}

dd {
    margin-left: 40px;
}

center {
    text-align: center;
}

/* Sections and headings */
h1 { font-size: 2em; font-weight: bold; margin-top: 0.67em; margin-bottom: 0.67em; }
h2 { font-size: 1.5em; font-weight: bold; margin-top: 0.83em; margin-bottom: 0.83em; }
h3 { font-size: 1.17em; font-weight: bold; margin-top: 1em; margin-bottom: 1em; }
h4 { font-weight: bold; margin-top: 1.33em; margin-bottom: 1.33em; }
h5 { font-size: 0.83em; font-weight: bold; margin-top: 1.67em; margin-bottom: 1.67em; }
h6 { font-size: 0.67em; font-weight: bold; margin-top: 2.33em; margin-bottom: 2.33em; }

/* Lists */
li {
    display: list-item;
}

ol, ul, dir, menu {
    padding-left: 40px;
    margin-top: 1em;
    margin-bottom: 1em;
}

ol { list-style-type: decimal; }
ul, dir, menu { list-style-type: disc; }

ol ol, ol ul, ul ol, ul ul {
    margin-top: 0;
    margin-bottom: 0;
}

ul ul, ol ul { list-style-type: circle; }
ol ol ul, ol ul ul, ul ol ul, ul ul ul { list-style-type: square; }

/* Phrasing content */
b, strong { font-weight: bolder; }
i, em, cite, dfn, var, address { font-style: italic; }
code, kbd, samp, tt, pre, listing, plaintext, xmp { font-family: monospace; }
pre, listing, plaintext, xmp { white-space: pre; margin-top: 1em; margin-bottom: 1em; }
big { font-size: larger; }
small { font-size: smaller; }
sub { vertical-align: sub; font-size: smaller; }
sup { vertical-align: super; font-size: smaller; }
u, ins { text-decoration: underline; }
s, strike, del { text-decoration: line-through; }
abbr[title], acronym[title] { text-decoration: underline dotted; }
mark { background-color: yellow; color: black; }

a[href] {
    color: blue;
    text-decoration: underline;
}

/* Quotes */
q::before { content: open-quote; }
q::after { content: close-quote; }
blockquote, q {
    quotes: "\201C" "\201D" "\2018" "\2019";
}

/* Tables */
table {
    display: table;
    border-collapse: separate;
    border-spacing: 2px;
    box-sizing: border-box;
}
caption { display: table-caption; text-align: center; }
colgroup { display: table-column-group; }
col { display: table-column; }
thead { display: table-header-group; vertical-align: middle; }
tbody { display: table-row-group; vertical-align: middle; }
tfoot { display: table-footer-group; vertical-align: middle; }
tr { display: table-row; vertical-align: middle; }
td, th { display: table-cell; vertical-align: middle; padding: 1px; }
th { font-weight: bold; text-align: center; }

/* Forms (static rendering) */
input, select, button, textarea {
    display: inline-block;
}
textarea { white-space: pre-wrap; }

/* Misc */
hr {
    border-top-width: 1px; border-top-style: inset;
    border-bottom-width: 1px; border-bottom-style: inset;
    margin-top: 0.5em; margin-bottom: 0.5em;
}
iframe { border: 2px inset; }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{CssParser, Rule};

    #[test]
    fn ua_sheet_parses_without_dropping_rules() {
        let rules = CssParser::parse_stylesheet(UA_CSS);
        let style_count = rules
            .iter()
            .filter(|r| matches!(r, Rule::Style(_)))
            .count();
        // Every rule in the UA sheet must survive our own parser.
        assert!(style_count >= 40, "only {style_count} rules parsed");
    }

    #[test]
    fn list_item_display_is_present() {
        let rules = CssParser::parse_stylesheet(UA_CSS);
        let has_list_item = rules.iter().any(|rule| {
            matches!(rule, Rule::Style(style) if style
                .declarations
                .iter()
                .any(|d| d.value.is_ident(crate::value::ValueId::ListItem)))
        });
        assert!(has_list_item);
    }
}
