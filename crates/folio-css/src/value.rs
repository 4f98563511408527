//! The CSS value tree.
//!
//! The parser produces reference-counted [`CssValue`] nodes; the cascade
//! and the generated-content engine consume them. A tagged variant stands in
//! for the deep class hierarchy such engines usually grow: hot paths match
//! on the discriminant before touching any payload.

use std::rc::Rc;

use folio_common::intern::Atom;

/// A shared CSS value. The same `Ident(Auto)` instance may back any number
/// of declarations.
pub type ValueRef = Rc<CssValue>;

/// Length units accepted by the value grammar.
///
/// Absolute units resolve at parse-read time (96 dpi CSS pixels); the
/// relative units resolve lazily against the computed style that reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    /// Unitless zero (and quirks-mode unitless lengths).
    None,
    /// CSS pixel.
    Px,
    /// Point: 1/72 inch.
    Pt,
    /// Pica: 12 points.
    Pc,
    /// Centimeter.
    Cm,
    /// Millimeter.
    Mm,
    /// Quarter-millimeter.
    Q,
    /// Inch: 96 CSS pixels.
    In,
    /// Relative to the element's own font size.
    Em,
    /// Relative to the root element's font size.
    Rem,
    /// Approximated as half the font size.
    Ex,
    /// Approximated as half the font size.
    Ch,
    /// 1% of viewport width.
    Vw,
    /// 1% of viewport height.
    Vh,
    /// 1% of the smaller viewport dimension.
    Vmin,
    /// 1% of the larger viewport dimension.
    Vmax,
}

impl LengthUnit {
    /// Parse a dimension unit identifier (already lowercased).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "px" => Self::Px,
            "pt" => Self::Pt,
            "pc" => Self::Pc,
            "cm" => Self::Cm,
            "mm" => Self::Mm,
            "q" => Self::Q,
            "in" => Self::In,
            "em" => Self::Em,
            "rem" => Self::Rem,
            "ex" => Self::Ex,
            "ch" => Self::Ch,
            "vw" => Self::Vw,
            "vh" => Self::Vh,
            "vmin" => Self::Vmin,
            "vmax" => Self::Vmax,
            _ => return None,
        })
    }
}

/// Angle units for gradients and transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleUnit {
    /// Degrees.
    Deg,
    /// Radians.
    Rad,
    /// Gradians: 400 per turn.
    Grad,
    /// Full turns.
    Turn,
}

impl AngleUnit {
    /// Parse an angle unit identifier (already lowercased).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "deg" => Self::Deg,
            "rad" => Self::Rad,
            "grad" => Self::Grad,
            "turn" => Self::Turn,
            _ => return None,
        })
    }
}

/// A 32-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel; 255 is opaque.
    pub a: u8,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    /// An RGBA color.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// An opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// Keyword identifiers used by property values.
///
/// The table mirrors the keyword set the property grammar accepts; parsing
/// interns every other identifier as a [`CssValue::CustomIdent`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ValueId {
    // Page sizes
    A3,
    A4,
    A5,
    B4,
    B5,
    Ledger,
    Legal,
    Letter,
    Landscape,
    Portrait,
    // Display
    Block,
    Inline,
    InlineBlock,
    Flex,
    InlineFlex,
    InlineTable,
    ListItem,
    Table,
    TableCaption,
    TableCell,
    TableColumn,
    TableColumnGroup,
    TableFooterGroup,
    TableHeaderGroup,
    TableRow,
    TableRowGroup,
    // Position / float / clear
    Static,
    Relative,
    Absolute,
    Fixed,
    Left,
    Right,
    Both,
    // Overflow / visibility
    Visible,
    Hidden,
    Scroll,
    Collapse,
    // Direction / box sizing
    Ltr,
    Rtl,
    BorderBox,
    ContentBox,
    PaddingBox,
    // Fonts
    Italic,
    Oblique,
    SmallCaps,
    Bold,
    Bolder,
    Lighter,
    XxSmall,
    XSmall,
    Small,
    Medium,
    Large,
    XLarge,
    XxLarge,
    Smaller,
    Larger,
    Serif,
    SansSerif,
    Monospace,
    Cursive,
    Fantasy,
    // Text
    Center,
    Justify,
    Capitalize,
    Uppercase,
    Lowercase,
    Underline,
    Overline,
    LineThrough,
    Blink,
    Solid,
    Double,
    Dotted,
    Dashed,
    Wavy,
    Pre,
    PreLine,
    PreWrap,
    Nowrap,
    // Vertical align
    Baseline,
    Sub,
    Super,
    Top,
    TextTop,
    Middle,
    Bottom,
    TextBottom,
    // List styles
    Disc,
    Circle,
    Square,
    Decimal,
    DecimalLeadingZero,
    LowerAlpha,
    LowerLatin,
    LowerRoman,
    UpperAlpha,
    UpperLatin,
    UpperRoman,
    Inside,
    Outside,
    // Borders
    Groove,
    Ridge,
    Inset,
    Outset,
    Thin,
    Thick,
    Separate,
    // Backgrounds
    Repeat,
    RepeatX,
    RepeatY,
    NoRepeat,
    Local,
    Cover,
    Contain,
    // Tables
    Show,
    Hide,
    // Flex
    Row,
    RowReverse,
    Column,
    ColumnReverse,
    Wrap,
    WrapReverse,
    FlexStart,
    FlexEnd,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
    Stretch,
    // Columns / pages
    All,
    Balance,
    Always,
    Avoid,
    // Generated content
    OpenQuote,
    CloseQuote,
    NoOpenQuote,
    NoCloseQuote,
    // Colors
    CurrentColor,
    Transparent,
    // Functions
    Attr,
    Counter,
    Counters,
    Format,
    Rect,
    Rgb,
    Rgba,
    LocalFunction,
    UrlFunction,
    // Generic
    Auto,
    None,
    Normal,
}

impl ValueId {
    /// Look up a keyword by its CSS name (matched ASCII case-insensitively).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        Some(match lower.as_str() {
            "a3" => Self::A3,
            "a4" => Self::A4,
            "a5" => Self::A5,
            "b4" => Self::B4,
            "b5" => Self::B5,
            "ledger" => Self::Ledger,
            "legal" => Self::Legal,
            "letter" => Self::Letter,
            "landscape" => Self::Landscape,
            "portrait" => Self::Portrait,
            "block" => Self::Block,
            "inline" => Self::Inline,
            "inline-block" => Self::InlineBlock,
            "flex" => Self::Flex,
            "inline-flex" => Self::InlineFlex,
            "inline-table" => Self::InlineTable,
            "list-item" => Self::ListItem,
            "table" => Self::Table,
            "table-caption" => Self::TableCaption,
            "table-cell" => Self::TableCell,
            "table-column" => Self::TableColumn,
            "table-column-group" => Self::TableColumnGroup,
            "table-footer-group" => Self::TableFooterGroup,
            "table-header-group" => Self::TableHeaderGroup,
            "table-row" => Self::TableRow,
            "table-row-group" => Self::TableRowGroup,
            "static" => Self::Static,
            "relative" => Self::Relative,
            "absolute" => Self::Absolute,
            "fixed" => Self::Fixed,
            "left" => Self::Left,
            "right" => Self::Right,
            "both" => Self::Both,
            "visible" => Self::Visible,
            "hidden" => Self::Hidden,
            "scroll" => Self::Scroll,
            "collapse" => Self::Collapse,
            "ltr" => Self::Ltr,
            "rtl" => Self::Rtl,
            "border-box" => Self::BorderBox,
            "content-box" => Self::ContentBox,
            "padding-box" => Self::PaddingBox,
            "italic" => Self::Italic,
            "oblique" => Self::Oblique,
            "small-caps" => Self::SmallCaps,
            "bold" => Self::Bold,
            "bolder" => Self::Bolder,
            "lighter" => Self::Lighter,
            "xx-small" => Self::XxSmall,
            "x-small" => Self::XSmall,
            "small" => Self::Small,
            "medium" => Self::Medium,
            "large" => Self::Large,
            "x-large" => Self::XLarge,
            "xx-large" => Self::XxLarge,
            "smaller" => Self::Smaller,
            "larger" => Self::Larger,
            "serif" => Self::Serif,
            "sans-serif" => Self::SansSerif,
            "monospace" => Self::Monospace,
            "cursive" => Self::Cursive,
            "fantasy" => Self::Fantasy,
            "center" => Self::Center,
            "justify" => Self::Justify,
            "capitalize" => Self::Capitalize,
            "uppercase" => Self::Uppercase,
            "lowercase" => Self::Lowercase,
            "underline" => Self::Underline,
            "overline" => Self::Overline,
            "line-through" => Self::LineThrough,
            "blink" => Self::Blink,
            "solid" => Self::Solid,
            "double" => Self::Double,
            "dotted" => Self::Dotted,
            "dashed" => Self::Dashed,
            "wavy" => Self::Wavy,
            "pre" => Self::Pre,
            "pre-line" => Self::PreLine,
            "pre-wrap" => Self::PreWrap,
            "nowrap" => Self::Nowrap,
            "baseline" => Self::Baseline,
            "sub" => Self::Sub,
            "super" => Self::Super,
            "top" => Self::Top,
            "text-top" => Self::TextTop,
            "middle" => Self::Middle,
            "bottom" => Self::Bottom,
            "text-bottom" => Self::TextBottom,
            "disc" => Self::Disc,
            "circle" => Self::Circle,
            "square" => Self::Square,
            "decimal" => Self::Decimal,
            "decimal-leading-zero" => Self::DecimalLeadingZero,
            "lower-alpha" => Self::LowerAlpha,
            "lower-latin" => Self::LowerLatin,
            "lower-roman" => Self::LowerRoman,
            "upper-alpha" => Self::UpperAlpha,
            "upper-latin" => Self::UpperLatin,
            "upper-roman" => Self::UpperRoman,
            "inside" => Self::Inside,
            "outside" => Self::Outside,
            "groove" => Self::Groove,
            "ridge" => Self::Ridge,
            "inset" => Self::Inset,
            "outset" => Self::Outset,
            "thin" => Self::Thin,
            "thick" => Self::Thick,
            "separate" => Self::Separate,
            "repeat" => Self::Repeat,
            "repeat-x" => Self::RepeatX,
            "repeat-y" => Self::RepeatY,
            "no-repeat" => Self::NoRepeat,
            "local" => Self::Local,
            "cover" => Self::Cover,
            "contain" => Self::Contain,
            "show" => Self::Show,
            "hide" => Self::Hide,
            "row" => Self::Row,
            "row-reverse" => Self::RowReverse,
            "column" => Self::Column,
            "column-reverse" => Self::ColumnReverse,
            "wrap" => Self::Wrap,
            "wrap-reverse" => Self::WrapReverse,
            "flex-start" => Self::FlexStart,
            "flex-end" => Self::FlexEnd,
            "space-between" => Self::SpaceBetween,
            "space-around" => Self::SpaceAround,
            "space-evenly" => Self::SpaceEvenly,
            "stretch" => Self::Stretch,
            "all" => Self::All,
            "balance" => Self::Balance,
            "always" => Self::Always,
            "avoid" => Self::Avoid,
            "open-quote" => Self::OpenQuote,
            "close-quote" => Self::CloseQuote,
            "no-open-quote" => Self::NoOpenQuote,
            "no-close-quote" => Self::NoCloseQuote,
            "currentcolor" => Self::CurrentColor,
            "transparent" => Self::Transparent,
            "auto" => Self::Auto,
            "none" => Self::None,
            "normal" => Self::Normal,
            _ => return None,
        })
    }
}

/// A parsed CSS value.
///
/// `Initial` and `Inherit` are the CSS-wide keywords; they survive into the
/// cascade, where `Initial` removes the property and `Inherit` re-fetches
/// the parent's value.
#[derive(Debug, Clone, PartialEq)]
pub enum CssValue {
    /// The `initial` keyword.
    Initial,
    /// The `inherit` keyword.
    Inherit,
    /// A known keyword.
    Ident(ValueId),
    /// An author-defined identifier (counter names, page names).
    CustomIdent(Atom),
    /// An integer.
    Integer(i32),
    /// A number.
    Number(f32),
    /// A percentage; `50%` is stored as `50.0`.
    Percent(f32),
    /// An angle.
    Angle {
        /// The numeric value.
        value: f32,
        /// The unit it was written in.
        unit: AngleUnit,
    },
    /// A length.
    Length {
        /// The numeric value.
        value: f32,
        /// The unit it was written in.
        unit: LengthUnit,
    },
    /// A quoted string.
    String(String),
    /// A plain `url(...)` reference, resolved against the document base URL
    /// at fetch time.
    Url(String),
    /// An image reference; the image handle is fetched lazily through the
    /// document's resource cache when first read.
    Image(String),
    /// A resolved color.
    Color(Color),
    /// A `counter()` / `counters()` reference.
    Counter {
        /// The counter name.
        name: Atom,
        /// The list-style keyword used for formatting.
        list_style: ValueId,
        /// The separator for `counters()`; empty for `counter()`.
        separator: String,
    },
    /// Two related values (background position, border spacing, radii).
    Pair(ValueRef, ValueRef),
    /// Four edge values in top / right / bottom / left order.
    Rect(ValueRef, ValueRef, ValueRef, ValueRef),
    /// A list of values.
    List(Vec<ValueRef>),
    /// A functional value that stays structured (attr(), local(), format()).
    Function(ValueId, Vec<ValueRef>),
}

impl CssValue {
    /// Shorthand for a reference-counted ident value.
    #[must_use]
    pub fn ident(id: ValueId) -> ValueRef {
        Rc::new(Self::Ident(id))
    }

    /// Shorthand for a reference-counted length value.
    #[must_use]
    pub fn length(value: f32, unit: LengthUnit) -> ValueRef {
        Rc::new(Self::Length { value, unit })
    }

    /// True when the value is the given keyword. Cheap discriminant check
    /// used on hot cascade paths.
    #[must_use]
    pub fn is_ident(&self, id: ValueId) -> bool {
        matches!(self, Self::Ident(v) if *v == id)
    }

    /// The keyword, if this value is one.
    #[must_use]
    pub fn as_ident(&self) -> Option<ValueId> {
        match self {
            Self::Ident(id) => Some(*id),
            _ => None,
        }
    }

    /// The integer payload, accepting plain numbers that hold integers.
    #[must_use]
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Self::Integer(v) => Some(*v),
            #[allow(clippy::cast_possible_truncation)]
            Self::Number(v) if v.fract() == 0.0 => Some(*v as i32),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup_is_case_insensitive() {
        assert_eq!(ValueId::from_name("AUTO"), Some(ValueId::Auto));
        assert_eq!(ValueId::from_name("list-item"), Some(ValueId::ListItem));
        assert_eq!(ValueId::from_name("unknown-keyword"), None);
    }

    #[test]
    fn shared_ident_values_compare_equal() {
        let a = CssValue::ident(ValueId::Auto);
        let b = Rc::clone(&a);
        assert!(Rc::ptr_eq(&a, &b));
        assert!(b.is_ident(ValueId::Auto));
    }

    #[test]
    fn length_units_parse() {
        assert_eq!(LengthUnit::from_name("px"), Some(LengthUnit::Px));
        assert_eq!(LengthUnit::from_name("vmin"), Some(LengthUnit::Vmin));
        assert_eq!(LengthUnit::from_name("furlong"), None);
    }

    #[test]
    fn integer_extraction() {
        assert_eq!(CssValue::Integer(4).as_integer(), Some(4));
        assert_eq!(CssValue::Number(4.0).as_integer(), Some(4));
        assert_eq!(CssValue::Number(4.5).as_integer(), None);
    }
}
