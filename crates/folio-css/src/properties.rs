//! Property identifiers and metadata.
//!
//! Each longhand property the parser understands has a [`PropertyId`].
//! Shorthands never reach the cascade; the parser expands them into these
//! longhands (see `parser::shorthand`).

/// A longhand CSS property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum PropertyId {
    AlignContent,
    AlignItems,
    AlignSelf,
    BackgroundAttachment,
    BackgroundClip,
    BackgroundColor,
    BackgroundImage,
    BackgroundOrigin,
    BackgroundPosition,
    BackgroundRepeat,
    BackgroundSize,
    BorderBottomColor,
    BorderBottomLeftRadius,
    BorderBottomRightRadius,
    BorderBottomStyle,
    BorderBottomWidth,
    BorderCollapse,
    BorderHorizontalSpacing,
    BorderLeftColor,
    BorderLeftStyle,
    BorderLeftWidth,
    BorderRightColor,
    BorderRightStyle,
    BorderRightWidth,
    BorderTopColor,
    BorderTopLeftRadius,
    BorderTopRightRadius,
    BorderTopStyle,
    BorderTopWidth,
    BorderVerticalSpacing,
    Bottom,
    BoxSizing,
    CaptionSide,
    Clear,
    Clip,
    Color,
    ColumnCount,
    ColumnFill,
    ColumnGap,
    ColumnRuleColor,
    ColumnRuleStyle,
    ColumnRuleWidth,
    ColumnSpan,
    ColumnWidth,
    Content,
    CounterIncrement,
    CounterReset,
    CounterSet,
    Direction,
    Display,
    EmptyCells,
    FlexBasis,
    FlexDirection,
    FlexGrow,
    FlexShrink,
    FlexWrap,
    Float,
    FontFamily,
    FontSize,
    FontStyle,
    FontVariant,
    FontWeight,
    Height,
    JustifyContent,
    Left,
    LetterSpacing,
    LineHeight,
    ListStyleImage,
    ListStylePosition,
    ListStyleType,
    MarginBottom,
    MarginLeft,
    MarginRight,
    MarginTop,
    MaxHeight,
    MaxWidth,
    MinHeight,
    MinWidth,
    Order,
    Orphans,
    OutlineColor,
    OutlineOffset,
    OutlineStyle,
    OutlineWidth,
    OverflowX,
    OverflowY,
    PaddingBottom,
    PaddingLeft,
    PaddingRight,
    PaddingTop,
    Page,
    PageBreakAfter,
    PageBreakBefore,
    PageBreakInside,
    Position,
    Quotes,
    Right,
    Size,
    Src,
    TabSize,
    TableLayout,
    TextAlign,
    TextDecorationColor,
    TextDecorationLine,
    TextDecorationStyle,
    TextIndent,
    TextTransform,
    Top,
    VerticalAlign,
    Visibility,
    WhiteSpace,
    Widows,
    Width,
    WordSpacing,
    ZIndex,
}

impl PropertyId {
    /// Look up a longhand by its CSS name. Shorthand names return `None`;
    /// the parser handles those separately.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        Some(match lower.as_str() {
            "align-content" => Self::AlignContent,
            "align-items" => Self::AlignItems,
            "align-self" => Self::AlignSelf,
            "background-attachment" => Self::BackgroundAttachment,
            "background-clip" => Self::BackgroundClip,
            "background-color" => Self::BackgroundColor,
            "background-image" => Self::BackgroundImage,
            "background-origin" => Self::BackgroundOrigin,
            "background-position" => Self::BackgroundPosition,
            "background-repeat" => Self::BackgroundRepeat,
            "background-size" => Self::BackgroundSize,
            "border-bottom-color" => Self::BorderBottomColor,
            "border-bottom-left-radius" => Self::BorderBottomLeftRadius,
            "border-bottom-right-radius" => Self::BorderBottomRightRadius,
            "border-bottom-style" => Self::BorderBottomStyle,
            "border-bottom-width" => Self::BorderBottomWidth,
            "border-collapse" => Self::BorderCollapse,
            "-folio-border-horizontal-spacing" => Self::BorderHorizontalSpacing,
            "border-left-color" => Self::BorderLeftColor,
            "border-left-style" => Self::BorderLeftStyle,
            "border-left-width" => Self::BorderLeftWidth,
            "border-right-color" => Self::BorderRightColor,
            "border-right-style" => Self::BorderRightStyle,
            "border-right-width" => Self::BorderRightWidth,
            "border-top-color" => Self::BorderTopColor,
            "border-top-left-radius" => Self::BorderTopLeftRadius,
            "border-top-right-radius" => Self::BorderTopRightRadius,
            "border-top-style" => Self::BorderTopStyle,
            "border-top-width" => Self::BorderTopWidth,
            "-folio-border-vertical-spacing" => Self::BorderVerticalSpacing,
            "bottom" => Self::Bottom,
            "box-sizing" => Self::BoxSizing,
            "caption-side" => Self::CaptionSide,
            "clear" => Self::Clear,
            "clip" => Self::Clip,
            "color" => Self::Color,
            "column-count" => Self::ColumnCount,
            "column-fill" => Self::ColumnFill,
            "column-gap" => Self::ColumnGap,
            "column-rule-color" => Self::ColumnRuleColor,
            "column-rule-style" => Self::ColumnRuleStyle,
            "column-rule-width" => Self::ColumnRuleWidth,
            "column-span" => Self::ColumnSpan,
            "column-width" => Self::ColumnWidth,
            "content" => Self::Content,
            "counter-increment" => Self::CounterIncrement,
            "counter-reset" => Self::CounterReset,
            "counter-set" => Self::CounterSet,
            "direction" => Self::Direction,
            "display" => Self::Display,
            "empty-cells" => Self::EmptyCells,
            "flex-basis" => Self::FlexBasis,
            "flex-direction" => Self::FlexDirection,
            "flex-grow" => Self::FlexGrow,
            "flex-shrink" => Self::FlexShrink,
            "flex-wrap" => Self::FlexWrap,
            "float" => Self::Float,
            "font-family" => Self::FontFamily,
            "font-size" => Self::FontSize,
            "font-style" => Self::FontStyle,
            "font-variant" => Self::FontVariant,
            "font-weight" => Self::FontWeight,
            "height" => Self::Height,
            "justify-content" => Self::JustifyContent,
            "left" => Self::Left,
            "letter-spacing" => Self::LetterSpacing,
            "line-height" => Self::LineHeight,
            "list-style-image" => Self::ListStyleImage,
            "list-style-position" => Self::ListStylePosition,
            "list-style-type" => Self::ListStyleType,
            "margin-bottom" => Self::MarginBottom,
            "margin-left" => Self::MarginLeft,
            "margin-right" => Self::MarginRight,
            "margin-top" => Self::MarginTop,
            "max-height" => Self::MaxHeight,
            "max-width" => Self::MaxWidth,
            "min-height" => Self::MinHeight,
            "min-width" => Self::MinWidth,
            "order" => Self::Order,
            "orphans" => Self::Orphans,
            "outline-color" => Self::OutlineColor,
            "outline-offset" => Self::OutlineOffset,
            "outline-style" => Self::OutlineStyle,
            "outline-width" => Self::OutlineWidth,
            "overflow-x" => Self::OverflowX,
            "overflow-y" => Self::OverflowY,
            "padding-bottom" => Self::PaddingBottom,
            "padding-left" => Self::PaddingLeft,
            "padding-right" => Self::PaddingRight,
            "padding-top" => Self::PaddingTop,
            "page" => Self::Page,
            "page-break-after" => Self::PageBreakAfter,
            "page-break-before" => Self::PageBreakBefore,
            "page-break-inside" => Self::PageBreakInside,
            "position" => Self::Position,
            "quotes" => Self::Quotes,
            "right" => Self::Right,
            "size" => Self::Size,
            "src" => Self::Src,
            "tab-size" => Self::TabSize,
            "table-layout" => Self::TableLayout,
            "text-align" => Self::TextAlign,
            "text-decoration-color" => Self::TextDecorationColor,
            "text-decoration-line" => Self::TextDecorationLine,
            "text-decoration-style" => Self::TextDecorationStyle,
            "text-indent" => Self::TextIndent,
            "text-transform" => Self::TextTransform,
            "top" => Self::Top,
            "vertical-align" => Self::VerticalAlign,
            "visibility" => Self::Visibility,
            "white-space" => Self::WhiteSpace,
            "widows" => Self::Widows,
            "width" => Self::Width,
            "word-spacing" => Self::WordSpacing,
            "z-index" => Self::ZIndex,
            _ => return None,
        })
    }

    /// [CSS Cascading § 7.1 Inherited Properties](https://www.w3.org/TR/css-cascade-4/#inherited-property)
    ///
    /// Whether the property inherits from the parent element by default.
    #[must_use]
    pub const fn is_inherited(self) -> bool {
        matches!(
            self,
            Self::BorderCollapse
                | Self::BorderHorizontalSpacing
                | Self::BorderVerticalSpacing
                | Self::CaptionSide
                | Self::Color
                | Self::Direction
                | Self::EmptyCells
                | Self::FontFamily
                | Self::FontSize
                | Self::FontStyle
                | Self::FontVariant
                | Self::FontWeight
                | Self::LetterSpacing
                | Self::LineHeight
                | Self::ListStyleImage
                | Self::ListStylePosition
                | Self::ListStyleType
                | Self::Orphans
                | Self::Quotes
                | Self::TabSize
                | Self::TextAlign
                | Self::TextIndent
                | Self::TextTransform
                | Self::Visibility
                | Self::WhiteSpace
                | Self::Widows
                | Self::WordSpacing
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longhand_lookup() {
        assert_eq!(PropertyId::from_name("color"), Some(PropertyId::Color));
        assert_eq!(
            PropertyId::from_name("BORDER-TOP-WIDTH"),
            Some(PropertyId::BorderTopWidth)
        );
        // Shorthands are not longhands.
        assert_eq!(PropertyId::from_name("margin"), None);
        assert_eq!(PropertyId::from_name("background"), None);
    }

    #[test]
    fn inheritance_metadata() {
        assert!(PropertyId::Color.is_inherited());
        assert!(PropertyId::FontSize.is_inherited());
        assert!(PropertyId::Quotes.is_inherited());
        assert!(!PropertyId::Display.is_inherited());
        assert!(!PropertyId::MarginTop.is_inherited());
        assert!(!PropertyId::Content.is_inherited());
    }
}
