//! Named character reference lookup table.
//!
//! [§ 13.2.5.73 Named character reference state](https://html.spec.whatwg.org/multipage/parsing.html#named-character-reference-state)
//!
//! The full spec table defines 2,231 entities; this table carries the ones
//! that occur in real book content. Entities are stored WITH their trailing
//! semicolon where required; the handful of legacy names that also match
//! without a semicolon get a second entry.

use std::collections::HashMap;
use std::sync::LazyLock;

/// The named character reference table, keyed without the leading `&`.
static NAMED_ENTITIES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        // Markup-significant entities and their legacy no-semicolon forms
        ("amp;", "&"),
        ("amp", "&"),
        ("lt;", "<"),
        ("lt", "<"),
        ("gt;", ">"),
        ("gt", ">"),
        ("quot;", "\""),
        ("quot", "\""),
        ("apos;", "'"),
        ("nbsp;", "\u{00A0}"),
        ("nbsp", "\u{00A0}"),
        // Punctuation and typographic symbols
        ("copy;", "\u{00A9}"),
        ("copy", "\u{00A9}"),
        ("reg;", "\u{00AE}"),
        ("reg", "\u{00AE}"),
        ("trade;", "\u{2122}"),
        ("sect;", "\u{00A7}"),
        ("para;", "\u{00B6}"),
        ("dagger;", "\u{2020}"),
        ("Dagger;", "\u{2021}"),
        ("mdash;", "\u{2014}"),
        ("ndash;", "\u{2013}"),
        ("hellip;", "\u{2026}"),
        ("bull;", "\u{2022}"),
        ("middot;", "\u{00B7}"),
        ("shy;", "\u{00AD}"),
        ("lsquo;", "\u{2018}"),
        ("rsquo;", "\u{2019}"),
        ("ldquo;", "\u{201C}"),
        ("rdquo;", "\u{201D}"),
        ("sbquo;", "\u{201A}"),
        ("bdquo;", "\u{201E}"),
        ("laquo;", "\u{00AB}"),
        ("raquo;", "\u{00BB}"),
        ("lsaquo;", "\u{2039}"),
        ("rsaquo;", "\u{203A}"),
        ("prime;", "\u{2032}"),
        ("Prime;", "\u{2033}"),
        // Currency
        ("cent;", "\u{00A2}"),
        ("pound;", "\u{00A3}"),
        ("curren;", "\u{00A4}"),
        ("euro;", "\u{20AC}"),
        ("yen;", "\u{00A5}"),
        // Math and technical
        ("times;", "\u{00D7}"),
        ("divide;", "\u{00F7}"),
        ("plusmn;", "\u{00B1}"),
        ("minus;", "\u{2212}"),
        ("ne;", "\u{2260}"),
        ("le;", "\u{2264}"),
        ("ge;", "\u{2265}"),
        ("deg;", "\u{00B0}"),
        ("micro;", "\u{00B5}"),
        ("infin;", "\u{221E}"),
        ("sum;", "\u{2211}"),
        ("prod;", "\u{220F}"),
        ("radic;", "\u{221A}"),
        ("int;", "\u{222B}"),
        ("asymp;", "\u{2248}"),
        ("equiv;", "\u{2261}"),
        ("sup2;", "\u{00B2}"),
        ("sup3;", "\u{00B3}"),
        ("frac12;", "\u{00BD}"),
        ("frac14;", "\u{00BC}"),
        ("frac34;", "\u{00BE}"),
        ("permil;", "\u{2030}"),
        // Arrows
        ("larr;", "\u{2190}"),
        ("rarr;", "\u{2192}"),
        ("uarr;", "\u{2191}"),
        ("darr;", "\u{2193}"),
        ("harr;", "\u{2194}"),
        ("rArr;", "\u{21D2}"),
        ("lArr;", "\u{21D0}"),
        // Greek letters
        ("Alpha;", "\u{0391}"),
        ("Beta;", "\u{0392}"),
        ("Gamma;", "\u{0393}"),
        ("Delta;", "\u{0394}"),
        ("Theta;", "\u{0398}"),
        ("Lambda;", "\u{039B}"),
        ("Pi;", "\u{03A0}"),
        ("Sigma;", "\u{03A3}"),
        ("Omega;", "\u{03A9}"),
        ("alpha;", "\u{03B1}"),
        ("beta;", "\u{03B2}"),
        ("gamma;", "\u{03B3}"),
        ("delta;", "\u{03B4}"),
        ("epsilon;", "\u{03B5}"),
        ("theta;", "\u{03B8}"),
        ("lambda;", "\u{03BB}"),
        ("mu;", "\u{03BC}"),
        ("pi;", "\u{03C0}"),
        ("rho;", "\u{03C1}"),
        ("sigma;", "\u{03C3}"),
        ("tau;", "\u{03C4}"),
        ("phi;", "\u{03C6}"),
        ("omega;", "\u{03C9}"),
        // Latin-1 accented letters
        ("Agrave;", "\u{00C0}"),
        ("Aacute;", "\u{00C1}"),
        ("Acirc;", "\u{00C2}"),
        ("Atilde;", "\u{00C3}"),
        ("Auml;", "\u{00C4}"),
        ("Aring;", "\u{00C5}"),
        ("AElig;", "\u{00C6}"),
        ("Ccedil;", "\u{00C7}"),
        ("Egrave;", "\u{00C8}"),
        ("Eacute;", "\u{00C9}"),
        ("Ecirc;", "\u{00CA}"),
        ("Euml;", "\u{00CB}"),
        ("Igrave;", "\u{00CC}"),
        ("Iacute;", "\u{00CD}"),
        ("Icirc;", "\u{00CE}"),
        ("Iuml;", "\u{00CF}"),
        ("Ntilde;", "\u{00D1}"),
        ("Ograve;", "\u{00D2}"),
        ("Oacute;", "\u{00D3}"),
        ("Ocirc;", "\u{00D4}"),
        ("Otilde;", "\u{00D5}"),
        ("Ouml;", "\u{00D6}"),
        ("Oslash;", "\u{00D8}"),
        ("Ugrave;", "\u{00D9}"),
        ("Uacute;", "\u{00DA}"),
        ("Ucirc;", "\u{00DB}"),
        ("Uuml;", "\u{00DC}"),
        ("Yacute;", "\u{00DD}"),
        ("szlig;", "\u{00DF}"),
        ("agrave;", "\u{00E0}"),
        ("aacute;", "\u{00E1}"),
        ("acirc;", "\u{00E2}"),
        ("atilde;", "\u{00E3}"),
        ("auml;", "\u{00E4}"),
        ("aring;", "\u{00E5}"),
        ("aelig;", "\u{00E6}"),
        ("ccedil;", "\u{00E7}"),
        ("egrave;", "\u{00E8}"),
        ("eacute;", "\u{00E9}"),
        ("ecirc;", "\u{00EA}"),
        ("euml;", "\u{00EB}"),
        ("igrave;", "\u{00EC}"),
        ("iacute;", "\u{00ED}"),
        ("icirc;", "\u{00EE}"),
        ("iuml;", "\u{00EF}"),
        ("ntilde;", "\u{00F1}"),
        ("ograve;", "\u{00F2}"),
        ("oacute;", "\u{00F3}"),
        ("ocirc;", "\u{00F4}"),
        ("otilde;", "\u{00F5}"),
        ("ouml;", "\u{00F6}"),
        ("oslash;", "\u{00F8}"),
        ("ugrave;", "\u{00F9}"),
        ("uacute;", "\u{00FA}"),
        ("ucirc;", "\u{00FB}"),
        ("uuml;", "\u{00FC}"),
        ("yacute;", "\u{00FD}"),
        ("yuml;", "\u{00FF}"),
        ("oelig;", "\u{0153}"),
        ("OElig;", "\u{0152}"),
        // Ligature with a multi-character expansion
        ("fjlig;", "fj"),
    ])
});

/// Look up a named character reference. `name` excludes the leading `&`.
pub fn lookup_entity(name: &str) -> Option<&'static str> {
    NAMED_ENTITIES.get(name).copied()
}

/// Check if any entity name starts with the given prefix. Used to decide
/// whether to keep consuming characters while hunting the longest match.
pub fn any_entity_has_prefix(prefix: &str) -> bool {
    NAMED_ENTITIES.keys().any(|name| name.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semicolon_and_legacy_forms_resolve() {
        assert_eq!(lookup_entity("amp;"), Some("&"));
        assert_eq!(lookup_entity("amp"), Some("&"));
        assert_eq!(lookup_entity("eacute;"), Some("\u{00E9}"));
        assert_eq!(lookup_entity("eacute"), None);
    }

    #[test]
    fn prefix_scan_matches_partial_names() {
        assert!(any_entity_has_prefix("am"));
        assert!(any_entity_has_prefix("mdas"));
        assert!(!any_entity_has_prefix("zzz"));
    }

    #[test]
    fn multi_character_expansion() {
        assert_eq!(lookup_entity("fjlig;"), Some("fj"));
    }
}
