//! The `@font-face` cache.
//!
//! [CSS Fonts § 4 Font Resources](https://www.w3.org/TR/css-fonts-4/#font-resources)
//!
//! Font-face rules are not pushed to the rule cache; they are harvested into
//! this table at sheet-install time. Lookup happens when a computed style
//! first resolves its font.

use std::collections::HashMap;

use crate::parser::{Declaration, FontFaceRule};
use crate::properties::PropertyId;
use crate::value::{CssValue, ValueId};

/// One `src` component of a font-face rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontFaceSource {
    /// A downloadable font, resolved against the sheet's base URL.
    Url(String),
    /// A locally installed family name.
    Local(String),
}

/// One harvested `@font-face` rule.
#[derive(Debug, Clone)]
pub struct FontFaceEntry {
    /// The family name, as written.
    pub family: String,
    /// `font-style: italic | oblique`.
    pub italic: bool,
    /// `font-variant: small-caps`.
    pub small_caps: bool,
    /// `font-weight`, numeric.
    pub weight: i32,
    /// The `src` list in preference order.
    pub sources: Vec<FontFaceSource>,
}

/// Font faces keyed by lowercased family name.
#[derive(Debug, Default)]
pub struct FontFaceCache {
    faces: HashMap<String, Vec<FontFaceEntry>>,
}

impl FontFaceCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Harvest a parsed `@font-face` rule. Rules without a usable
    /// `font-family` and `src` are dropped.
    pub fn harvest(&mut self, rule: &FontFaceRule) {
        let mut family = None;
        let mut italic = false;
        let mut small_caps = false;
        let mut weight = 400;
        let mut sources = Vec::new();

        for Declaration { id, value, .. } in &rule.declarations {
            match id {
                PropertyId::FontFamily => {
                    // The family consumer yields a list; a face declares one.
                    if let CssValue::List(values) = &**value {
                        if let Some(first) = values.first() {
                            match &**first {
                                CssValue::String(name) => family = Some(name.clone()),
                                CssValue::CustomIdent(name) => {
                                    family = Some(name.as_str().to_owned());
                                }
                                _ => {}
                            }
                        }
                    }
                }
                PropertyId::FontStyle => {
                    italic = value.is_ident(ValueId::Italic) || value.is_ident(ValueId::Oblique);
                }
                PropertyId::FontVariant => {
                    small_caps = value.is_ident(ValueId::SmallCaps);
                }
                PropertyId::FontWeight => {
                    weight = match value.as_ident() {
                        Some(ValueId::Bold) => 700,
                        Some(ValueId::Normal) => 400,
                        _ => value.as_integer().unwrap_or(400),
                    };
                }
                PropertyId::Src => {
                    if let CssValue::List(values) = &**value {
                        for source in values {
                            match &**source {
                                CssValue::Url(href) => {
                                    sources.push(FontFaceSource::Url(href.clone()));
                                }
                                CssValue::Function(ValueId::Format, parts) => {
                                    if let Some(CssValue::Url(href)) =
                                        parts.first().map(|v| &**v)
                                    {
                                        sources.push(FontFaceSource::Url(href.clone()));
                                    }
                                }
                                CssValue::Function(ValueId::LocalFunction, parts) => {
                                    if let Some(CssValue::String(name)) =
                                        parts.first().map(|v| &**v)
                                    {
                                        sources.push(FontFaceSource::Local(name.clone()));
                                    }
                                }
                                _ => {}
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        let Some(family) = family else { return };
        if sources.is_empty() {
            return;
        }
        self.faces
            .entry(family.to_ascii_lowercase())
            .or_default()
            .push(FontFaceEntry {
                family,
                italic,
                small_caps,
                weight,
                sources,
            });
    }

    /// Query for the face best matching `(family, italic, small_caps,
    /// weight)`. Style and variant must match exactly when any face of the
    /// family declares them; weight picks the nearest declared value.
    #[must_use]
    pub fn get(
        &self,
        family: &str,
        italic: bool,
        small_caps: bool,
        weight: i32,
    ) -> Option<&FontFaceEntry> {
        let faces = self.faces.get(&family.to_ascii_lowercase())?;
        faces
            .iter()
            .min_by_key(|face| {
                let style_penalty = if face.italic == italic { 0 } else { 1_000_000 };
                let variant_penalty = if face.small_caps == small_caps {
                    0
                } else {
                    100_000
                };
                style_penalty + variant_penalty + (face.weight - weight).abs()
            })
    }

    /// True when no faces have been harvested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{CssParser, Rule};

    fn harvest(css: &str) -> FontFaceCache {
        let mut cache = FontFaceCache::new();
        for rule in CssParser::parse_stylesheet(css) {
            if let Rule::FontFace(font_face) = rule {
                cache.harvest(&font_face);
            }
        }
        cache
    }

    #[test]
    fn harvests_and_matches_by_weight() {
        let cache = harvest(
            "@font-face { font-family: Gentium; font-weight: 400; src: url(g.woff2) }\
             @font-face { font-family: Gentium; font-weight: 700; src: url(g-bold.woff2) }",
        );
        let regular = cache.get("gentium", false, false, 400).unwrap();
        assert_eq!(regular.sources, vec![FontFaceSource::Url("g.woff2".into())]);
        let bold = cache.get("Gentium", false, false, 700).unwrap();
        assert_eq!(bold.weight, 700);
        // Weight 600 picks the nearest declared face.
        let near = cache.get("Gentium", false, false, 600).unwrap();
        assert_eq!(near.weight, 700);
    }

    #[test]
    fn italic_face_wins_for_italic_query() {
        let cache = harvest(
            "@font-face { font-family: F; src: url(r.woff) }\
             @font-face { font-family: F; font-style: italic; src: url(i.woff) }",
        );
        let face = cache.get("F", true, false, 400).unwrap();
        assert!(face.italic);
    }

    #[test]
    fn rule_without_src_is_ignored() {
        let cache = harvest("@font-face { font-family: Empty }");
        assert!(cache.is_empty());
    }

    #[test]
    fn local_sources_survive() {
        let cache = harvest("@font-face { font-family: G; src: local(Georgia), url(g.woff) }");
        let face = cache.get("G", false, false, 400).unwrap();
        assert_eq!(face.sources[0], FontFaceSource::Local("Georgia".into()));
    }
}
