//! Shorthand property expansion.
//!
//! Shorthands never reach the cascade: each handler parses the combined
//! grammar and emits longhand declarations. A shorthand resets every
//! longhand it covers, so longhands the author omitted are emitted with the
//! `initial` value. The 4-value sides shorthands apply top / right / bottom /
//! left fill-up (missing right takes top, missing bottom takes top, missing
//! left takes right).

use std::rc::Rc;

use super::parser::Declaration;
use super::values::{
    consume_background_position, consume_background_size, consume_border_radius_value,
    consume_color, consume_font_family, consume_font_size, consume_font_weight, consume_ident,
    consume_image_or_none, consume_integer, consume_length, consume_length_or_percent,
    consume_length_or_percent_or_auto, consume_line_height, consume_line_width, consume_none,
    consume_number, consume_text_decoration_line, BORDER_STYLES,
};
use crate::properties::PropertyId;
use crate::tokenizer::{CssToken, TokenStream};
use crate::value::{CssValue, ValueId, ValueRef};

/// The shorthand properties the parser expands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shorthand {
    Background,
    Border,
    BorderBottom,
    BorderColor,
    BorderLeft,
    BorderRadius,
    BorderRight,
    BorderSpacing,
    BorderStyle,
    BorderTop,
    BorderWidth,
    Columns,
    ColumnRule,
    Flex,
    FlexFlow,
    Font,
    ListStyle,
    Margin,
    Outline,
    Overflow,
    Padding,
    TextDecoration,
}

impl Shorthand {
    /// Look up a shorthand by its CSS name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "background" => Self::Background,
            "border" => Self::Border,
            "border-bottom" => Self::BorderBottom,
            "border-color" => Self::BorderColor,
            "border-left" => Self::BorderLeft,
            "border-radius" => Self::BorderRadius,
            "border-right" => Self::BorderRight,
            "border-spacing" => Self::BorderSpacing,
            "border-style" => Self::BorderStyle,
            "border-top" => Self::BorderTop,
            "border-width" => Self::BorderWidth,
            "columns" => Self::Columns,
            "column-rule" => Self::ColumnRule,
            "flex" => Self::Flex,
            "flex-flow" => Self::FlexFlow,
            "font" => Self::Font,
            "list-style" => Self::ListStyle,
            "margin" => Self::Margin,
            "outline" => Self::Outline,
            "overflow" => Self::Overflow,
            "padding" => Self::Padding,
            "text-decoration" => Self::TextDecoration,
            _ => return None,
        })
    }

    /// The longhands this shorthand expands to. `inherit` / `initial` on the
    /// shorthand applies to each of these.
    #[must_use]
    pub const fn longhands(self) -> &'static [PropertyId] {
        use PropertyId as P;
        match self {
            Self::Background => &[
                P::BackgroundColor,
                P::BackgroundImage,
                P::BackgroundRepeat,
                P::BackgroundAttachment,
                P::BackgroundPosition,
                P::BackgroundSize,
                P::BackgroundOrigin,
                P::BackgroundClip,
            ],
            Self::Border => &[
                P::BorderTopWidth,
                P::BorderRightWidth,
                P::BorderBottomWidth,
                P::BorderLeftWidth,
                P::BorderTopStyle,
                P::BorderRightStyle,
                P::BorderBottomStyle,
                P::BorderLeftStyle,
                P::BorderTopColor,
                P::BorderRightColor,
                P::BorderBottomColor,
                P::BorderLeftColor,
            ],
            Self::BorderTop => &[P::BorderTopWidth, P::BorderTopStyle, P::BorderTopColor],
            Self::BorderRight => &[P::BorderRightWidth, P::BorderRightStyle, P::BorderRightColor],
            Self::BorderBottom => {
                &[P::BorderBottomWidth, P::BorderBottomStyle, P::BorderBottomColor]
            }
            Self::BorderLeft => &[P::BorderLeftWidth, P::BorderLeftStyle, P::BorderLeftColor],
            Self::BorderColor => &[
                P::BorderTopColor,
                P::BorderRightColor,
                P::BorderBottomColor,
                P::BorderLeftColor,
            ],
            Self::BorderStyle => &[
                P::BorderTopStyle,
                P::BorderRightStyle,
                P::BorderBottomStyle,
                P::BorderLeftStyle,
            ],
            Self::BorderWidth => &[
                P::BorderTopWidth,
                P::BorderRightWidth,
                P::BorderBottomWidth,
                P::BorderLeftWidth,
            ],
            Self::BorderRadius => &[
                P::BorderTopLeftRadius,
                P::BorderTopRightRadius,
                P::BorderBottomRightRadius,
                P::BorderBottomLeftRadius,
            ],
            Self::BorderSpacing => &[P::BorderHorizontalSpacing, P::BorderVerticalSpacing],
            Self::Columns => &[P::ColumnWidth, P::ColumnCount],
            Self::ColumnRule => &[P::ColumnRuleWidth, P::ColumnRuleStyle, P::ColumnRuleColor],
            Self::Flex => &[P::FlexGrow, P::FlexShrink, P::FlexBasis],
            Self::FlexFlow => &[P::FlexDirection, P::FlexWrap],
            Self::Font => &[
                P::FontStyle,
                P::FontVariant,
                P::FontWeight,
                P::FontSize,
                P::LineHeight,
                P::FontFamily,
            ],
            Self::ListStyle => &[P::ListStyleType, P::ListStylePosition, P::ListStyleImage],
            Self::Margin => &[P::MarginTop, P::MarginRight, P::MarginBottom, P::MarginLeft],
            Self::Outline => &[P::OutlineWidth, P::OutlineStyle, P::OutlineColor],
            Self::Overflow => &[P::OverflowX, P::OverflowY],
            Self::Padding => &[
                P::PaddingTop,
                P::PaddingRight,
                P::PaddingBottom,
                P::PaddingLeft,
            ],
            Self::TextDecoration => &[
                P::TextDecorationLine,
                P::TextDecorationStyle,
                P::TextDecorationColor,
            ],
        }
    }
}

fn declaration(id: PropertyId, value: ValueRef, important: bool) -> Declaration {
    Declaration {
        id,
        value,
        important,
    }
}

fn initial() -> ValueRef {
    Rc::new(CssValue::Initial)
}

/// Expand a shorthand declaration. On success the longhand declarations are
/// appended to `out`; a grammar mismatch leaves `out` untouched and the
/// caller drops the declaration.
pub fn expand(
    shorthand: Shorthand,
    input: &mut TokenStream,
    important: bool,
    out: &mut Vec<Declaration>,
) -> bool {
    let mut expanded = Vec::new();
    let ok = match shorthand {
        Shorthand::Margin => expand_sides(
            input,
            important,
            Shorthand::Margin.longhands(),
            |input| consume_length_or_percent_or_auto(input, true, true),
            &mut expanded,
        ),
        Shorthand::Padding => expand_sides(
            input,
            important,
            Shorthand::Padding.longhands(),
            |input| consume_length_or_percent(input, false, true),
            &mut expanded,
        ),
        Shorthand::BorderWidth => expand_sides(
            input,
            important,
            Shorthand::BorderWidth.longhands(),
            |input| consume_line_width(input, false),
            &mut expanded,
        ),
        Shorthand::BorderStyle => expand_sides(
            input,
            important,
            Shorthand::BorderStyle.longhands(),
            |input| consume_ident(input, BORDER_STYLES),
            &mut expanded,
        ),
        Shorthand::BorderColor => expand_sides(
            input,
            important,
            Shorthand::BorderColor.longhands(),
            consume_color,
            &mut expanded,
        ),
        Shorthand::Border => expand_border(input, important, &mut expanded),
        Shorthand::BorderTop | Shorthand::BorderRight | Shorthand::BorderBottom
        | Shorthand::BorderLeft => {
            expand_border_side(input, important, shorthand.longhands(), &mut expanded)
        }
        Shorthand::BorderRadius => expand_border_radius(input, important, &mut expanded),
        Shorthand::BorderSpacing => expand_border_spacing(input, important, &mut expanded),
        Shorthand::Overflow => expand_overflow(input, important, &mut expanded),
        Shorthand::Background => expand_background(input, important, &mut expanded),
        Shorthand::Font => expand_font(input, important, &mut expanded),
        Shorthand::ListStyle => expand_list_style(input, important, &mut expanded),
        Shorthand::Columns => expand_columns(input, important, &mut expanded),
        Shorthand::ColumnRule | Shorthand::Outline => {
            expand_rule_like(input, important, shorthand.longhands(), &mut expanded)
        }
        Shorthand::TextDecoration => expand_text_decoration(input, important, &mut expanded),
        Shorthand::Flex => expand_flex(input, important, &mut expanded),
        Shorthand::FlexFlow => expand_flex_flow(input, important, &mut expanded),
    };
    input.skip_whitespace();
    if ok && input.at_end() {
        out.append(&mut expanded);
        true
    } else {
        false
    }
}

/// The 1-to-4-value sides grammar with fill-up.
fn expand_sides(
    input: &mut TokenStream,
    important: bool,
    sides: &[PropertyId],
    consumer: impl Fn(&mut TokenStream) -> Option<ValueRef>,
    out: &mut Vec<Declaration>,
) -> bool {
    input.skip_whitespace();
    let Some(top) = consumer(input) else {
        return false;
    };
    input.skip_whitespace();
    let right = consumer(input);
    input.skip_whitespace();
    let bottom = consumer(input);
    input.skip_whitespace();
    let left = consumer(input);

    let right = right.unwrap_or_else(|| Rc::clone(&top));
    let bottom = bottom.unwrap_or_else(|| Rc::clone(&top));
    let left = left.unwrap_or_else(|| Rc::clone(&right));

    out.push(declaration(sides[0], top, important));
    out.push(declaration(sides[1], right, important));
    out.push(declaration(sides[2], bottom, important));
    out.push(declaration(sides[3], left, important));
    true
}

/// `width || style || color`, any order, each at most once.
fn consume_width_style_color(
    input: &mut TokenStream,
) -> Option<(Option<ValueRef>, Option<ValueRef>, Option<ValueRef>)> {
    let mut width = None;
    let mut style = None;
    let mut color = None;
    let mut matched = false;
    loop {
        input.skip_whitespace();
        if input.at_end() {
            break;
        }
        if width.is_none() {
            if let Some(value) = consume_line_width(input, false) {
                width = Some(value);
                matched = true;
                continue;
            }
        }
        if style.is_none() {
            if let Some(value) = consume_ident(input, BORDER_STYLES) {
                style = Some(value);
                matched = true;
                continue;
            }
        }
        if color.is_none() {
            if let Some(value) = consume_color(input) {
                color = Some(value);
                matched = true;
                continue;
            }
        }
        break;
    }
    if matched {
        Some((width, style, color))
    } else {
        None
    }
}

fn expand_border(input: &mut TokenStream, important: bool, out: &mut Vec<Declaration>) -> bool {
    let Some((width, style, color)) = consume_width_style_color(input) else {
        return false;
    };
    let width = width.unwrap_or_else(initial);
    let style = style.unwrap_or_else(initial);
    let color = color.unwrap_or_else(initial);
    use PropertyId as P;
    for id in [
        P::BorderTopWidth,
        P::BorderRightWidth,
        P::BorderBottomWidth,
        P::BorderLeftWidth,
    ] {
        out.push(declaration(id, Rc::clone(&width), important));
    }
    for id in [
        P::BorderTopStyle,
        P::BorderRightStyle,
        P::BorderBottomStyle,
        P::BorderLeftStyle,
    ] {
        out.push(declaration(id, Rc::clone(&style), important));
    }
    for id in [
        P::BorderTopColor,
        P::BorderRightColor,
        P::BorderBottomColor,
        P::BorderLeftColor,
    ] {
        out.push(declaration(id, Rc::clone(&color), important));
    }
    true
}

fn expand_border_side(
    input: &mut TokenStream,
    important: bool,
    longhands: &[PropertyId],
    out: &mut Vec<Declaration>,
) -> bool {
    let Some((width, style, color)) = consume_width_style_color(input) else {
        return false;
    };
    out.push(declaration(
        longhands[0],
        width.unwrap_or_else(initial),
        important,
    ));
    out.push(declaration(
        longhands[1],
        style.unwrap_or_else(initial),
        important,
    ));
    out.push(declaration(
        longhands[2],
        color.unwrap_or_else(initial),
        important,
    ));
    true
}

/// `outline` / `column-rule`: same `width || style || color` grammar as a
/// border side, different longhands.
fn expand_rule_like(
    input: &mut TokenStream,
    important: bool,
    longhands: &[PropertyId],
    out: &mut Vec<Declaration>,
) -> bool {
    expand_border_side(input, important, longhands, out)
}

fn expand_border_radius(
    input: &mut TokenStream,
    important: bool,
    out: &mut Vec<Declaration>,
) -> bool {
    fn consume_radii(input: &mut TokenStream) -> Option<Vec<ValueRef>> {
        let mut values = Vec::new();
        loop {
            input.skip_whitespace();
            let Some(value) = consume_length_or_percent(input, false, false) else {
                break;
            };
            values.push(value);
            if values.len() == 4 {
                break;
            }
        }
        if values.is_empty() || values.len() > 4 {
            None
        } else {
            Some(values)
        }
    }

    /// Corner fill-up: top-left, top-right, bottom-right, bottom-left.
    fn fill(values: &[ValueRef]) -> [ValueRef; 4] {
        let top_left = Rc::clone(&values[0]);
        let top_right = values.get(1).map_or_else(|| Rc::clone(&top_left), Rc::clone);
        let bottom_right = values.get(2).map_or_else(|| Rc::clone(&top_left), Rc::clone);
        let bottom_left = values.get(3).map_or_else(|| Rc::clone(&top_right), Rc::clone);
        [top_left, top_right, bottom_right, bottom_left]
    }

    let Some(horizontal) = consume_radii(input) else {
        return false;
    };
    input.skip_whitespace();
    let vertical = if *input.peek() == CssToken::Delim('/') {
        input.advance();
        let Some(vertical) = consume_radii(input) else {
            return false;
        };
        vertical
    } else {
        horizontal.clone()
    };

    let horizontal = fill(&horizontal);
    let vertical = fill(&vertical);
    let corners = Shorthand::BorderRadius.longhands();
    for index in 0..4 {
        out.push(declaration(
            corners[index],
            Rc::new(CssValue::Pair(
                Rc::clone(&horizontal[index]),
                Rc::clone(&vertical[index]),
            )),
            important,
        ));
    }
    true
}

fn expand_border_spacing(
    input: &mut TokenStream,
    important: bool,
    out: &mut Vec<Declaration>,
) -> bool {
    input.skip_whitespace();
    let Some(horizontal) = consume_length(input, false, false) else {
        return false;
    };
    input.skip_whitespace();
    let vertical = consume_length(input, false, false).unwrap_or_else(|| Rc::clone(&horizontal));
    out.push(declaration(
        PropertyId::BorderHorizontalSpacing,
        horizontal,
        important,
    ));
    out.push(declaration(
        PropertyId::BorderVerticalSpacing,
        vertical,
        important,
    ));
    true
}

fn expand_overflow(input: &mut TokenStream, important: bool, out: &mut Vec<Declaration>) -> bool {
    const OVERFLOW: &[ValueId] = &[
        ValueId::Visible,
        ValueId::Hidden,
        ValueId::Scroll,
        ValueId::Auto,
    ];
    input.skip_whitespace();
    let Some(x) = consume_ident(input, OVERFLOW) else {
        return false;
    };
    input.skip_whitespace();
    let y = consume_ident(input, OVERFLOW).unwrap_or_else(|| Rc::clone(&x));
    out.push(declaration(PropertyId::OverflowX, x, important));
    out.push(declaration(PropertyId::OverflowY, y, important));
    true
}

fn expand_background(input: &mut TokenStream, important: bool, out: &mut Vec<Declaration>) -> bool {
    let mut color = None;
    let mut image = None;
    let mut repeat = None;
    let mut attachment = None;
    let mut position = None;
    let mut size = None;
    let mut origin = None;
    let mut clip = None;
    let mut matched = false;

    loop {
        input.skip_whitespace();
        if input.at_end() {
            break;
        }
        if image.is_none() {
            if let Some(value) = consume_image_or_none(input) {
                image = Some(value);
                matched = true;
                continue;
            }
        }
        if repeat.is_none() {
            if let Some(value) = consume_ident(
                input,
                &[
                    ValueId::Repeat,
                    ValueId::RepeatX,
                    ValueId::RepeatY,
                    ValueId::NoRepeat,
                ],
            ) {
                repeat = Some(value);
                matched = true;
                continue;
            }
        }
        if attachment.is_none() {
            if let Some(value) =
                consume_ident(input, &[ValueId::Scroll, ValueId::Fixed, ValueId::Local])
            {
                attachment = Some(value);
                matched = true;
                continue;
            }
        }
        if position.is_none() {
            if let Some(value) = consume_background_position(input) {
                position = Some(value);
                matched = true;
                // An optional "/ <size>" follows the position.
                input.skip_whitespace();
                if *input.peek() == CssToken::Delim('/') {
                    input.advance();
                    input.skip_whitespace();
                    let Some(sized) = consume_background_size(input) else {
                        return false;
                    };
                    size = Some(sized);
                }
                continue;
            }
        }
        if origin.is_none() {
            if let Some(value) = consume_ident(
                input,
                &[
                    ValueId::BorderBox,
                    ValueId::PaddingBox,
                    ValueId::ContentBox,
                ],
            ) {
                origin = Some(value);
                matched = true;
                continue;
            }
        }
        if clip.is_none() && origin.is_some() {
            if let Some(value) = consume_ident(
                input,
                &[
                    ValueId::BorderBox,
                    ValueId::PaddingBox,
                    ValueId::ContentBox,
                ],
            ) {
                clip = Some(value);
                matched = true;
                continue;
            }
        }
        if color.is_none() {
            if let Some(value) = consume_color(input) {
                color = Some(value);
                matched = true;
                continue;
            }
        }
        break;
    }

    if !matched {
        return false;
    }
    use PropertyId as P;
    out.push(declaration(P::BackgroundColor, color.unwrap_or_else(initial), important));
    out.push(declaration(P::BackgroundImage, image.unwrap_or_else(initial), important));
    out.push(declaration(P::BackgroundRepeat, repeat.unwrap_or_else(initial), important));
    out.push(declaration(
        P::BackgroundAttachment,
        attachment.unwrap_or_else(initial),
        important,
    ));
    out.push(declaration(
        P::BackgroundPosition,
        position.unwrap_or_else(initial),
        important,
    ));
    out.push(declaration(P::BackgroundSize, size.unwrap_or_else(initial), important));
    out.push(declaration(P::BackgroundOrigin, origin.unwrap_or_else(initial), important));
    out.push(declaration(P::BackgroundClip, clip.unwrap_or_else(initial), important));
    true
}

fn expand_font(input: &mut TokenStream, important: bool, out: &mut Vec<Declaration>) -> bool {
    let mut style = None;
    let mut variant = None;
    let mut weight = None;

    // "[style || variant || weight]* size [/ line-height]? family"
    loop {
        input.skip_whitespace();
        if style.is_none() {
            if let Some(value) =
                consume_ident(input, &[ValueId::Italic, ValueId::Oblique])
            {
                style = Some(value);
                continue;
            }
        }
        if variant.is_none() {
            if let Some(value) = consume_ident(input, &[ValueId::SmallCaps]) {
                variant = Some(value);
                continue;
            }
        }
        if weight.is_none() {
            if let Some(value) = consume_font_weight(input) {
                // "normal" here is ambiguous; font-weight's consumer accepts
                // it, which also covers resetting style/variant.
                weight = Some(value);
                continue;
            }
        }
        break;
    }

    input.skip_whitespace();
    let Some(font_size) = consume_font_size(input, false) else {
        return false;
    };

    input.skip_whitespace();
    let mut line_height = None;
    if *input.peek() == CssToken::Delim('/') {
        input.advance();
        input.skip_whitespace();
        let Some(value) = consume_line_height(input) else {
            return false;
        };
        line_height = Some(value);
    }

    input.skip_whitespace();
    let Some(family) = consume_font_family(input) else {
        return false;
    };

    use PropertyId as P;
    out.push(declaration(P::FontStyle, style.unwrap_or_else(initial), important));
    out.push(declaration(P::FontVariant, variant.unwrap_or_else(initial), important));
    out.push(declaration(P::FontWeight, weight.unwrap_or_else(initial), important));
    out.push(declaration(P::FontSize, font_size, important));
    out.push(declaration(
        P::LineHeight,
        line_height.unwrap_or_else(initial),
        important,
    ));
    out.push(declaration(P::FontFamily, family, important));
    true
}

fn expand_list_style(input: &mut TokenStream, important: bool, out: &mut Vec<Declaration>) -> bool {
    const TYPES: &[ValueId] = &[
        ValueId::Disc,
        ValueId::Circle,
        ValueId::Square,
        ValueId::Decimal,
        ValueId::DecimalLeadingZero,
        ValueId::LowerAlpha,
        ValueId::LowerLatin,
        ValueId::LowerRoman,
        ValueId::UpperAlpha,
        ValueId::UpperLatin,
        ValueId::UpperRoman,
    ];
    let mut list_type = None;
    let mut position = None;
    let mut image = None;
    let mut none_seen = false;
    let mut matched = false;

    loop {
        input.skip_whitespace();
        if input.at_end() {
            break;
        }
        if !none_seen {
            if let Some(_none) = consume_none(input) {
                none_seen = true;
                matched = true;
                continue;
            }
        }
        if list_type.is_none() {
            if let Some(value) = consume_ident(input, TYPES) {
                list_type = Some(value);
                matched = true;
                continue;
            }
        }
        if position.is_none() {
            if let Some(value) = consume_ident(input, &[ValueId::Inside, ValueId::Outside]) {
                position = Some(value);
                matched = true;
                continue;
            }
        }
        if image.is_none() {
            if let Some(value) = consume_image_or_none(input) {
                image = Some(value);
                matched = true;
                continue;
            }
        }
        break;
    }

    if !matched {
        return false;
    }
    // A bare "none" sets the type when no explicit type appeared.
    if none_seen && list_type.is_none() {
        list_type = Some(CssValue::ident(ValueId::None));
    }
    use PropertyId as P;
    out.push(declaration(
        P::ListStyleType,
        list_type.unwrap_or_else(initial),
        important,
    ));
    out.push(declaration(
        P::ListStylePosition,
        position.unwrap_or_else(initial),
        important,
    ));
    out.push(declaration(
        P::ListStyleImage,
        image.unwrap_or_else(initial),
        important,
    ));
    true
}

fn expand_columns(input: &mut TokenStream, important: bool, out: &mut Vec<Declaration>) -> bool {
    let mut width = None;
    let mut count = None;
    let mut matched = false;
    loop {
        input.skip_whitespace();
        if input.at_end() {
            break;
        }
        if consume_ident(input, &[ValueId::Auto]).is_some() {
            matched = true;
            continue;
        }
        if width.is_none() {
            if let Some(value) = consume_length(input, false, false) {
                width = Some(value);
                matched = true;
                continue;
            }
        }
        if count.is_none() {
            if let Some(value) = consume_integer(input, false) {
                count = Some(value);
                matched = true;
                continue;
            }
        }
        break;
    }
    if !matched {
        return false;
    }
    out.push(declaration(
        PropertyId::ColumnWidth,
        width.unwrap_or_else(initial),
        important,
    ));
    out.push(declaration(
        PropertyId::ColumnCount,
        count.unwrap_or_else(initial),
        important,
    ));
    true
}

fn expand_text_decoration(
    input: &mut TokenStream,
    important: bool,
    out: &mut Vec<Declaration>,
) -> bool {
    let mut line = None;
    let mut style = None;
    let mut color = None;
    let mut matched = false;
    loop {
        input.skip_whitespace();
        if input.at_end() {
            break;
        }
        if line.is_none() {
            if let Some(value) = consume_text_decoration_line(input) {
                line = Some(value);
                matched = true;
                continue;
            }
        }
        if style.is_none() {
            if let Some(value) = consume_ident(
                input,
                &[
                    ValueId::Solid,
                    ValueId::Double,
                    ValueId::Dotted,
                    ValueId::Dashed,
                    ValueId::Wavy,
                ],
            ) {
                style = Some(value);
                matched = true;
                continue;
            }
        }
        if color.is_none() {
            if let Some(value) = consume_color(input) {
                color = Some(value);
                matched = true;
                continue;
            }
        }
        break;
    }
    if !matched {
        return false;
    }
    use PropertyId as P;
    out.push(declaration(P::TextDecorationLine, line.unwrap_or_else(initial), important));
    out.push(declaration(
        P::TextDecorationStyle,
        style.unwrap_or_else(initial),
        important,
    ));
    out.push(declaration(
        P::TextDecorationColor,
        color.unwrap_or_else(initial),
        important,
    ));
    true
}

fn expand_flex(input: &mut TokenStream, important: bool, out: &mut Vec<Declaration>) -> bool {
    use PropertyId as P;
    input.skip_whitespace();
    if consume_none(input).is_some() {
        out.push(declaration(P::FlexGrow, Rc::new(CssValue::Number(0.0)), important));
        out.push(declaration(P::FlexShrink, Rc::new(CssValue::Number(0.0)), important));
        out.push(declaration(P::FlexBasis, CssValue::ident(ValueId::Auto), important));
        return true;
    }

    let mut grow = None;
    let mut shrink = None;
    let mut basis = None;
    let mut matched = false;
    loop {
        input.skip_whitespace();
        if input.at_end() {
            break;
        }
        if grow.is_none() {
            if let Some(value) = consume_number(input, false) {
                grow = Some(value);
                matched = true;
                // An immediately following number is the shrink factor.
                input.skip_whitespace();
                if let Some(second) = consume_number(input, false) {
                    shrink = Some(second);
                }
                continue;
            }
        }
        if basis.is_none() {
            if let Some(value) = consume_length_or_percent_or_auto(input, false, false) {
                basis = Some(value);
                matched = true;
                continue;
            }
        }
        break;
    }
    if !matched {
        return false;
    }
    out.push(declaration(
        P::FlexGrow,
        grow.unwrap_or_else(|| Rc::new(CssValue::Number(1.0))),
        important,
    ));
    out.push(declaration(
        P::FlexShrink,
        shrink.unwrap_or_else(|| Rc::new(CssValue::Number(1.0))),
        important,
    ));
    out.push(declaration(
        P::FlexBasis,
        basis.unwrap_or_else(|| CssValue::length(0.0, crate::value::LengthUnit::Px)),
        important,
    ));
    true
}

fn expand_flex_flow(input: &mut TokenStream, important: bool, out: &mut Vec<Declaration>) -> bool {
    let mut direction = None;
    let mut wrap = None;
    let mut matched = false;
    loop {
        input.skip_whitespace();
        if input.at_end() {
            break;
        }
        if direction.is_none() {
            if let Some(value) = consume_ident(
                input,
                &[
                    ValueId::Row,
                    ValueId::RowReverse,
                    ValueId::Column,
                    ValueId::ColumnReverse,
                ],
            ) {
                direction = Some(value);
                matched = true;
                continue;
            }
        }
        if wrap.is_none() {
            if let Some(value) =
                consume_ident(input, &[ValueId::Nowrap, ValueId::Wrap, ValueId::WrapReverse])
            {
                wrap = Some(value);
                matched = true;
                continue;
            }
        }
        break;
    }
    if !matched {
        return false;
    }
    out.push(declaration(
        PropertyId::FlexDirection,
        direction.unwrap_or_else(initial),
        important,
    ));
    out.push(declaration(
        PropertyId::FlexWrap,
        wrap.unwrap_or_else(initial),
        important,
    ));
    true
}
