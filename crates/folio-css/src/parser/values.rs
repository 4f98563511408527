//! Per-property value consumers.
//!
//! Every longhand property has a dedicated consumer returning either a
//! parsed value tree or no match - which causes the declaration to be
//! dropped, per CSS error recovery. Consumers only commit tokens they
//! accept; compound consumers use [`StreamGuard`] transactions.

use std::rc::Rc;

use folio_common::intern::Atom;

use crate::properties::PropertyId;
use crate::tokenizer::{CssToken, NumericKind, StreamGuard, TokenStream};
use crate::value::{Color, CssValue, LengthUnit, ValueId, ValueRef};

/// Named colors the grammar accepts, alongside hex and `rgb()` forms.
const NAMED_COLORS: &[(&str, Color)] = &[
    ("aqua", Color::rgb(0x00, 0xFF, 0xFF)),
    ("black", Color::rgb(0x00, 0x00, 0x00)),
    ("blue", Color::rgb(0x00, 0x00, 0xFF)),
    ("brown", Color::rgb(0xA5, 0x2A, 0x2A)),
    ("crimson", Color::rgb(0xDC, 0x14, 0x3C)),
    ("cyan", Color::rgb(0x00, 0xFF, 0xFF)),
    ("darkblue", Color::rgb(0x00, 0x00, 0x8B)),
    ("darkgray", Color::rgb(0xA9, 0xA9, 0xA9)),
    ("darkgreen", Color::rgb(0x00, 0x64, 0x00)),
    ("darkred", Color::rgb(0x8B, 0x00, 0x00)),
    ("dimgray", Color::rgb(0x69, 0x69, 0x69)),
    ("fuchsia", Color::rgb(0xFF, 0x00, 0xFF)),
    ("gainsboro", Color::rgb(0xDC, 0xDC, 0xDC)),
    ("gold", Color::rgb(0xFF, 0xD7, 0x00)),
    ("gray", Color::rgb(0x80, 0x80, 0x80)),
    ("green", Color::rgb(0x00, 0x80, 0x00)),
    ("indigo", Color::rgb(0x4B, 0x00, 0x82)),
    ("ivory", Color::rgb(0xFF, 0xFF, 0xF0)),
    ("khaki", Color::rgb(0xF0, 0xE6, 0x8C)),
    ("lavender", Color::rgb(0xE6, 0xE6, 0xFA)),
    ("lightblue", Color::rgb(0xAD, 0xD8, 0xE6)),
    ("lightgray", Color::rgb(0xD3, 0xD3, 0xD3)),
    ("lightgreen", Color::rgb(0x90, 0xEE, 0x90)),
    ("lime", Color::rgb(0x00, 0xFF, 0x00)),
    ("linen", Color::rgb(0xFA, 0xF0, 0xE6)),
    ("magenta", Color::rgb(0xFF, 0x00, 0xFF)),
    ("maroon", Color::rgb(0x80, 0x00, 0x00)),
    ("navy", Color::rgb(0x00, 0x00, 0x80)),
    ("olive", Color::rgb(0x80, 0x80, 0x00)),
    ("orange", Color::rgb(0xFF, 0xA5, 0x00)),
    ("orchid", Color::rgb(0xDA, 0x70, 0xD6)),
    ("pink", Color::rgb(0xFF, 0xC0, 0xCB)),
    ("plum", Color::rgb(0xDD, 0xA0, 0xDD)),
    ("purple", Color::rgb(0x80, 0x00, 0x80)),
    ("red", Color::rgb(0xFF, 0x00, 0x00)),
    ("salmon", Color::rgb(0xFA, 0x80, 0x72)),
    ("sienna", Color::rgb(0xA0, 0x52, 0x2D)),
    ("silver", Color::rgb(0xC0, 0xC0, 0xC0)),
    ("snow", Color::rgb(0xFF, 0xFA, 0xFA)),
    ("tan", Color::rgb(0xD2, 0xB4, 0x8C)),
    ("teal", Color::rgb(0x00, 0x80, 0x80)),
    ("tomato", Color::rgb(0xFF, 0x63, 0x47)),
    ("violet", Color::rgb(0xEE, 0x82, 0xEE)),
    ("wheat", Color::rgb(0xF5, 0xDE, 0xB3)),
    ("white", Color::rgb(0xFF, 0xFF, 0xFF)),
    ("yellow", Color::rgb(0xFF, 0xFF, 0x00)),
];

/// Consume a keyword from `allowed`.
pub fn consume_ident(input: &mut TokenStream, allowed: &[ValueId]) -> Option<ValueRef> {
    let CssToken::Ident(name) = input.peek() else {
        return None;
    };
    let id = ValueId::from_name(name)?;
    if !allowed.contains(&id) {
        return None;
    }
    input.advance();
    Some(CssValue::ident(id))
}

/// `none`
pub fn consume_none(input: &mut TokenStream) -> Option<ValueRef> {
    consume_ident(input, &[ValueId::None])
}

/// `auto`
pub fn consume_auto(input: &mut TokenStream) -> Option<ValueRef> {
    consume_ident(input, &[ValueId::Auto])
}

/// `normal`
pub fn consume_normal(input: &mut TokenStream) -> Option<ValueRef> {
    consume_ident(input, &[ValueId::Normal])
}

/// An integer; `negative` permits values below zero.
#[allow(clippy::cast_possible_truncation)]
pub fn consume_integer(input: &mut TokenStream, negative: bool) -> Option<ValueRef> {
    if let CssToken::Number {
        value,
        kind: NumericKind::Integer,
        ..
    } = *input.peek()
    {
        if negative || value >= 0.0 {
            input.advance();
            return Some(Rc::new(CssValue::Integer(value as i32)));
        }
    }
    None
}

/// A number (integer or fractional).
pub fn consume_number(input: &mut TokenStream, negative: bool) -> Option<ValueRef> {
    if let CssToken::Number { value, .. } = *input.peek() {
        if negative || value >= 0.0 {
            input.advance();
            return Some(Rc::new(CssValue::Number(value)));
        }
    }
    None
}

/// A percentage.
pub fn consume_percent(input: &mut TokenStream, negative: bool) -> Option<ValueRef> {
    if let CssToken::Percentage { value, .. } = *input.peek() {
        if negative || value >= 0.0 {
            input.advance();
            return Some(Rc::new(CssValue::Percent(value)));
        }
    }
    None
}

/// A length; `unitless` permits plain numbers (quirks lengths and zero).
pub fn consume_length(input: &mut TokenStream, negative: bool, unitless: bool) -> Option<ValueRef> {
    match input.peek().clone() {
        CssToken::Dimension { value, unit, .. } => {
            let unit = LengthUnit::from_name(&unit)?;
            if negative || value >= 0.0 {
                input.advance();
                return Some(CssValue::length(value, unit));
            }
            None
        }
        CssToken::Number { value, .. } => {
            if (unitless || value == 0.0) && (negative || value >= 0.0) {
                input.advance();
                return Some(CssValue::length(value, LengthUnit::None));
            }
            None
        }
        _ => None,
    }
}

/// A length or percentage.
pub fn consume_length_or_percent(
    input: &mut TokenStream,
    negative: bool,
    unitless: bool,
) -> Option<ValueRef> {
    consume_length(input, negative, unitless).or_else(|| consume_percent(input, negative))
}

/// `<length> | <percentage> | auto`
pub fn consume_length_or_percent_or_auto(
    input: &mut TokenStream,
    negative: bool,
    unitless: bool,
) -> Option<ValueRef> {
    consume_auto(input).or_else(|| consume_length_or_percent(input, negative, unitless))
}

/// `<length> | <percentage> | none`
pub fn consume_length_or_percent_or_none(
    input: &mut TokenStream,
    negative: bool,
    unitless: bool,
) -> Option<ValueRef> {
    consume_none(input).or_else(|| consume_length_or_percent(input, negative, unitless))
}

/// `<length> | <percentage> | normal`
pub fn consume_length_or_normal(
    input: &mut TokenStream,
    negative: bool,
    unitless: bool,
) -> Option<ValueRef> {
    consume_normal(input).or_else(|| consume_length(input, negative, unitless))
}

/// A quoted string.
pub fn consume_string(input: &mut TokenStream) -> Option<ValueRef> {
    if let CssToken::String(value) = input.peek().clone() {
        input.advance();
        return Some(Rc::new(CssValue::String(value)));
    }
    None
}

/// An author-defined identifier. CSS-wide keywords are rejected.
pub fn consume_custom_ident(input: &mut TokenStream) -> Option<ValueRef> {
    if let CssToken::Ident(name) = input.peek().clone() {
        if matches!(
            name.to_ascii_lowercase().as_str(),
            "initial" | "inherit" | "unset" | "default"
        ) {
            return None;
        }
        input.advance();
        return Some(Rc::new(CssValue::CustomIdent(Atom::new(&name))));
    }
    None
}

/// A `url(...)` in either tokenized form.
pub fn consume_url(input: &mut TokenStream) -> Option<ValueRef> {
    match input.peek().clone() {
        CssToken::Url(value) => {
            input.advance();
            Some(Rc::new(CssValue::Url(value)))
        }
        CssToken::Function(name) if name == "url" => {
            let mut guard = StreamGuard::new(input);
            guard.advance();
            guard.skip_whitespace();
            let CssToken::String(value) = guard.next_token() else {
                return None;
            };
            guard.skip_whitespace();
            if guard.next_token() != CssToken::RightParen {
                return None;
            }
            guard.release();
            Some(Rc::new(CssValue::Url(value)))
        }
        _ => None,
    }
}

/// An image reference; the handle is resolved lazily at style-read time.
pub fn consume_image(input: &mut TokenStream) -> Option<ValueRef> {
    let url = consume_url(input)?;
    match &*url {
        CssValue::Url(href) => Some(Rc::new(CssValue::Image(href.clone()))),
        _ => None,
    }
}

/// `<image> | none`
pub fn consume_image_or_none(input: &mut TokenStream) -> Option<ValueRef> {
    consume_none(input).or_else(|| consume_image(input))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_channel(value: f32) -> u8 {
    value.clamp(0.0, 255.0).round() as u8
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_alpha(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn parse_hex_color(hex: &str) -> Option<Color> {
    let digits: Vec<u32> = hex.chars().map(|c| c.to_digit(16)).collect::<Option<_>>()?;
    #[allow(clippy::cast_possible_truncation)]
    let byte = |hi: u32, lo: u32| -> u8 { (hi * 16 + lo) as u8 };
    match digits.len() {
        3 => Some(Color::rgb(
            byte(digits[0], digits[0]),
            byte(digits[1], digits[1]),
            byte(digits[2], digits[2]),
        )),
        4 => Some(Color::new(
            byte(digits[0], digits[0]),
            byte(digits[1], digits[1]),
            byte(digits[2], digits[2]),
            byte(digits[3], digits[3]),
        )),
        6 => Some(Color::rgb(
            byte(digits[0], digits[1]),
            byte(digits[2], digits[3]),
            byte(digits[4], digits[5]),
        )),
        8 => Some(Color::new(
            byte(digits[0], digits[1]),
            byte(digits[2], digits[3]),
            byte(digits[4], digits[5]),
            byte(digits[6], digits[7]),
        )),
        _ => None,
    }
}

/// [CSS Color 4](https://www.w3.org/TR/css-color-4/): hex, named,
/// `transparent`, `currentColor`, and the `rgb()`/`rgba()` functions.
pub fn consume_color(input: &mut TokenStream) -> Option<ValueRef> {
    match input.peek().clone() {
        CssToken::Hash { value, .. } => {
            let color = parse_hex_color(&value)?;
            input.advance();
            Some(Rc::new(CssValue::Color(color)))
        }
        CssToken::Ident(name) => {
            let lower = name.to_ascii_lowercase();
            if lower == "transparent" {
                input.advance();
                return Some(Rc::new(CssValue::Color(Color::TRANSPARENT)));
            }
            if lower == "currentcolor" {
                input.advance();
                return Some(CssValue::ident(ValueId::CurrentColor));
            }
            let (_, color) = NAMED_COLORS.iter().find(|(n, _)| *n == lower)?;
            input.advance();
            Some(Rc::new(CssValue::Color(*color)))
        }
        CssToken::Function(name) if name == "rgb" || name == "rgba" => consume_rgb(input),
        _ => None,
    }
}

/// `rgb(R, G, B)` / `rgba(R, G, B, A)` with numbers or percentages.
fn consume_rgb(input: &mut TokenStream) -> Option<ValueRef> {
    let mut guard = StreamGuard::new(input);
    guard.advance();

    let mut channels = Vec::new();
    let mut alpha = 255u8;
    loop {
        guard.skip_whitespace();
        match guard.next_token() {
            CssToken::Number { value, .. } => {
                if channels.len() == 3 {
                    alpha = clamp_alpha(value);
                } else {
                    channels.push(clamp_channel(value));
                }
            }
            CssToken::Percentage { value, .. } => {
                if channels.len() == 3 {
                    alpha = clamp_alpha(value / 100.0);
                } else {
                    channels.push(clamp_channel(value * 255.0 / 100.0));
                }
            }
            _ => return None,
        }
        guard.skip_whitespace();
        match guard.next_token() {
            CssToken::Comma | CssToken::Delim('/') => {}
            CssToken::RightParen => break,
            _ => return None,
        }
    }
    if channels.len() != 3 {
        return None;
    }
    guard.release();
    Some(Rc::new(CssValue::Color(Color::new(
        channels[0],
        channels[1],
        channels[2],
        alpha,
    ))))
}

/// `quotes: none | auto | [<string> <string>]+`
fn consume_quotes(input: &mut TokenStream) -> Option<ValueRef> {
    if let Some(keyword) = consume_ident(input, &[ValueId::None, ValueId::Auto]) {
        return Some(keyword);
    }
    let mut values = Vec::new();
    loop {
        input.skip_whitespace();
        let Some(open) = consume_string(input) else {
            break;
        };
        input.skip_whitespace();
        let close = consume_string(input)?;
        values.push(Rc::new(CssValue::Pair(open, close)) as ValueRef);
    }
    if values.is_empty() {
        None
    } else {
        Some(Rc::new(CssValue::List(values)))
    }
}

/// `attr(name)`
fn consume_content_attr(input: &mut TokenStream) -> Option<ValueRef> {
    let mut guard = StreamGuard::new(input);
    guard.advance();
    guard.skip_whitespace();
    let CssToken::Ident(name) = guard.next_token() else {
        return None;
    };
    guard.skip_whitespace();
    if guard.next_token() != CssToken::RightParen {
        return None;
    }
    guard.release();
    Some(Rc::new(CssValue::Function(
        ValueId::Attr,
        vec![Rc::new(CssValue::CustomIdent(Atom::new(&name)))],
    )))
}

/// `counter(name[, style])` / `counters(name, separator[, style])`
fn consume_content_counter(input: &mut TokenStream, counters: bool) -> Option<ValueRef> {
    let mut guard = StreamGuard::new(input);
    guard.advance();
    guard.skip_whitespace();
    let CssToken::Ident(name) = guard.next_token() else {
        return None;
    };
    let name = Atom::new(&name);

    let mut separator = String::new();
    if counters {
        guard.skip_whitespace();
        if guard.next_token() != CssToken::Comma {
            return None;
        }
        guard.skip_whitespace();
        let CssToken::String(sep) = guard.next_token() else {
            return None;
        };
        separator = sep;
    }

    guard.skip_whitespace();
    let mut list_style = ValueId::Decimal;
    if *guard.peek() == CssToken::Comma {
        guard.advance();
        guard.skip_whitespace();
        let CssToken::Ident(style) = guard.next_token() else {
            return None;
        };
        list_style = ValueId::from_name(&style)?;
    }
    guard.skip_whitespace();
    if guard.next_token() != CssToken::RightParen {
        return None;
    }
    guard.release();
    Some(Rc::new(CssValue::Counter {
        name,
        list_style,
        separator,
    }))
}

/// The `content` property:
/// `normal | none | [<string> | <image> | counter() | counters() | attr() |
/// open-quote | close-quote | no-open-quote | no-close-quote]+`
fn consume_content(input: &mut TokenStream) -> Option<ValueRef> {
    if let Some(keyword) = consume_ident(input, &[ValueId::Normal, ValueId::None]) {
        input.skip_whitespace();
        if input.at_end() {
            return Some(keyword);
        }
        return None;
    }
    let mut values: Vec<ValueRef> = Vec::new();
    loop {
        input.skip_whitespace();
        if input.at_end() {
            break;
        }
        let component = match input.peek().clone() {
            CssToken::String(_) => consume_string(input),
            CssToken::Url(_) => consume_image(input),
            CssToken::Function(name) => match name.as_str() {
                "url" => consume_image(input),
                "attr" => consume_content_attr(input),
                "counter" => consume_content_counter(input, false),
                "counters" => consume_content_counter(input, true),
                _ => None,
            },
            CssToken::Ident(_) => consume_ident(
                input,
                &[
                    ValueId::OpenQuote,
                    ValueId::CloseQuote,
                    ValueId::NoOpenQuote,
                    ValueId::NoCloseQuote,
                ],
            ),
            _ => None,
        };
        values.push(component?);
    }
    if values.is_empty() {
        None
    } else {
        Some(Rc::new(CssValue::List(values)))
    }
}

/// `counter-reset` / `counter-set` / `counter-increment`:
/// `none | [<custom-ident> <integer>?]+`. The default integer is 0 for
/// reset/set and 1 for increment.
fn consume_counter(input: &mut TokenStream, default_value: i32) -> Option<ValueRef> {
    if let Some(none) = consume_none(input) {
        return Some(none);
    }
    let mut values: Vec<ValueRef> = Vec::new();
    loop {
        input.skip_whitespace();
        let Some(name) = consume_custom_ident(input) else {
            break;
        };
        input.skip_whitespace();
        let value = consume_integer(input, true)
            .unwrap_or_else(|| Rc::new(CssValue::Integer(default_value)));
        values.push(Rc::new(CssValue::Pair(name, value)));
    }
    if values.is_empty() {
        None
    } else {
        Some(Rc::new(CssValue::List(values)))
    }
}

/// One font family name: a string, a generic keyword, or a run of
/// identifiers joined with spaces.
fn consume_font_family_name(input: &mut TokenStream) -> Option<ValueRef> {
    if let Some(string) = consume_string(input) {
        return Some(string);
    }
    if let Some(generic) = consume_ident(
        input,
        &[
            ValueId::Serif,
            ValueId::SansSerif,
            ValueId::Monospace,
            ValueId::Cursive,
            ValueId::Fantasy,
        ],
    ) {
        return Some(generic);
    }
    let mut words = Vec::new();
    while let CssToken::Ident(word) = input.peek().clone() {
        input.advance();
        words.push(word);
        input.skip_whitespace();
    }
    if words.is_empty() {
        None
    } else {
        Some(Rc::new(CssValue::String(words.join(" "))))
    }
}

/// `font-family: [<family-name> | <generic-family>]#`
pub fn consume_font_family(input: &mut TokenStream) -> Option<ValueRef> {
    let mut families = Vec::new();
    loop {
        input.skip_whitespace();
        families.push(consume_font_family_name(input)?);
        input.skip_whitespace();
        if *input.peek() == CssToken::Comma {
            input.advance();
        } else {
            break;
        }
    }
    Some(Rc::new(CssValue::List(families)))
}

/// `font-size: <absolute-size> | <relative-size> | <length-percentage>`
pub fn consume_font_size(input: &mut TokenStream, unitless: bool) -> Option<ValueRef> {
    consume_ident(
        input,
        &[
            ValueId::XxSmall,
            ValueId::XSmall,
            ValueId::Small,
            ValueId::Medium,
            ValueId::Large,
            ValueId::XLarge,
            ValueId::XxLarge,
            ValueId::Smaller,
            ValueId::Larger,
        ],
    )
    .or_else(|| consume_length_or_percent(input, false, unitless))
}

/// `font-weight: normal | bold | bolder | lighter | <integer 1..1000>`
pub fn consume_font_weight(input: &mut TokenStream) -> Option<ValueRef> {
    if let Some(keyword) = consume_ident(
        input,
        &[
            ValueId::Normal,
            ValueId::Bold,
            ValueId::Bolder,
            ValueId::Lighter,
        ],
    ) {
        return Some(keyword);
    }
    let weight = consume_integer(input, false)?;
    match weight.as_integer() {
        Some(v) if (1..=1000).contains(&v) => Some(weight),
        _ => None,
    }
}

/// `thin | medium | thick | <length>`
pub fn consume_line_width(input: &mut TokenStream, unitless: bool) -> Option<ValueRef> {
    consume_ident(input, &[ValueId::Thin, ValueId::Medium, ValueId::Thick])
        .or_else(|| consume_length(input, false, unitless))
}

/// `line-height: normal | <number> | <length-percentage>`
pub fn consume_line_height(input: &mut TokenStream) -> Option<ValueRef> {
    consume_normal(input)
        .or_else(|| consume_number(input, false))
        .or_else(|| consume_length_or_percent(input, false, false))
}

/// `vertical-align` keywords or a length/percentage offset.
fn consume_vertical_align(input: &mut TokenStream) -> Option<ValueRef> {
    consume_ident(
        input,
        &[
            ValueId::Baseline,
            ValueId::Sub,
            ValueId::Super,
            ValueId::Top,
            ValueId::TextTop,
            ValueId::Middle,
            ValueId::Bottom,
            ValueId::TextBottom,
        ],
    )
    .or_else(|| consume_length_or_percent(input, true, false))
}

/// `text-decoration-line: none | [underline || overline || line-through || blink]`
pub fn consume_text_decoration_line(input: &mut TokenStream) -> Option<ValueRef> {
    if let Some(none) = consume_none(input) {
        return Some(none);
    }
    let mut values = Vec::new();
    loop {
        input.skip_whitespace();
        let Some(line) = consume_ident(
            input,
            &[
                ValueId::Underline,
                ValueId::Overline,
                ValueId::LineThrough,
                ValueId::Blink,
            ],
        ) else {
            break;
        };
        values.push(line);
    }
    if values.is_empty() {
        None
    } else {
        Some(Rc::new(CssValue::List(values)))
    }
}

/// `background-position`: one or two keyword/length/percent components,
/// normalized to a `Pair`.
pub fn consume_background_position(input: &mut TokenStream) -> Option<ValueRef> {
    let component = |input: &mut TokenStream| {
        consume_ident(
            input,
            &[
                ValueId::Left,
                ValueId::Right,
                ValueId::Top,
                ValueId::Bottom,
                ValueId::Center,
            ],
        )
        .or_else(|| consume_length_or_percent(input, true, false))
    };
    let first = component(input)?;
    input.skip_whitespace();
    let second = component(input).unwrap_or_else(|| CssValue::ident(ValueId::Center));
    Some(Rc::new(CssValue::Pair(first, second)))
}

/// `background-size: cover | contain | [<length-percentage> | auto]{1,2}`
pub fn consume_background_size(input: &mut TokenStream) -> Option<ValueRef> {
    if let Some(keyword) = consume_ident(input, &[ValueId::Cover, ValueId::Contain]) {
        return Some(keyword);
    }
    let first = consume_length_or_percent_or_auto(input, false, false)?;
    input.skip_whitespace();
    let second =
        consume_length_or_percent_or_auto(input, false, false).unwrap_or_else(|| Rc::clone(&first));
    Some(Rc::new(CssValue::Pair(first, second)))
}

/// One border-radius corner: one or two length/percent values.
pub fn consume_border_radius_value(input: &mut TokenStream) -> Option<ValueRef> {
    let first = consume_length_or_percent(input, false, false)?;
    input.skip_whitespace();
    let second = consume_length_or_percent(input, false, false).unwrap_or_else(|| Rc::clone(&first));
    Some(Rc::new(CssValue::Pair(first, second)))
}

/// `page: auto | <custom-ident>`
fn consume_page(input: &mut TokenStream) -> Option<ValueRef> {
    consume_auto(input).or_else(|| consume_custom_ident(input))
}

/// `size` (from CSS Paged Media): `auto | <page-size> || [portrait |
/// landscape] | <length>{1,2}`
fn consume_size(input: &mut TokenStream) -> Option<ValueRef> {
    if let Some(auto) = consume_auto(input) {
        return Some(auto);
    }
    if let Some(first) = consume_length(input, false, false) {
        input.skip_whitespace();
        let second = consume_length(input, false, false).unwrap_or_else(|| Rc::clone(&first));
        return Some(Rc::new(CssValue::Pair(first, second)));
    }
    let keywords = [
        ValueId::A3,
        ValueId::A4,
        ValueId::A5,
        ValueId::B4,
        ValueId::B5,
        ValueId::Letter,
        ValueId::Legal,
        ValueId::Ledger,
        ValueId::Landscape,
        ValueId::Portrait,
    ];
    let first = consume_ident(input, &keywords)?;
    input.skip_whitespace();
    match consume_ident(input, &keywords) {
        Some(second) => Some(Rc::new(CssValue::Pair(first, second))),
        None => Some(first),
    }
}

/// One `@font-face` `src` component: `url() format()?` or `local(name)`.
fn consume_font_face_source(input: &mut TokenStream) -> Option<ValueRef> {
    if let Some(url) = consume_url(input) {
        input.skip_whitespace();
        if let CssToken::Function(name) = input.peek().clone() {
            if name == "format" {
                input.advance();
                input.skip_whitespace();
                let format = match input.next_token() {
                    CssToken::String(v) | CssToken::Ident(v) => v,
                    _ => return None,
                };
                input.skip_whitespace();
                if input.next_token() != CssToken::RightParen {
                    return None;
                }
                return Some(Rc::new(CssValue::Function(
                    ValueId::Format,
                    vec![url, Rc::new(CssValue::String(format))],
                )));
            }
        }
        return Some(url);
    }
    if let CssToken::Function(name) = input.peek().clone() {
        if name == "local" {
            let mut guard = StreamGuard::new(input);
            guard.advance();
            guard.skip_whitespace();
            let family = match guard.next_token() {
                CssToken::String(v) | CssToken::Ident(v) => v,
                _ => return None,
            };
            guard.skip_whitespace();
            if guard.next_token() != CssToken::RightParen {
                return None;
            }
            guard.release();
            return Some(Rc::new(CssValue::Function(
                ValueId::LocalFunction,
                vec![Rc::new(CssValue::String(family))],
            )));
        }
    }
    None
}

/// `src: <font-face-source>#`
fn consume_font_face_src(input: &mut TokenStream) -> Option<ValueRef> {
    let mut sources = Vec::new();
    loop {
        input.skip_whitespace();
        sources.push(consume_font_face_source(input)?);
        input.skip_whitespace();
        if *input.peek() == CssToken::Comma {
            input.advance();
        } else {
            break;
        }
    }
    Some(Rc::new(CssValue::List(sources)))
}

/// `clip: auto | rect(t, r, b, l)`
fn consume_clip(input: &mut TokenStream) -> Option<ValueRef> {
    if let Some(auto) = consume_auto(input) {
        return Some(auto);
    }
    let CssToken::Function(name) = input.peek().clone() else {
        return None;
    };
    if name != "rect" {
        return None;
    }
    let mut guard = StreamGuard::new(input);
    guard.advance();
    let mut edges = Vec::new();
    for index in 0..4 {
        guard.skip_whitespace();
        let edge = consume_auto(&mut guard).or_else(|| consume_length(&mut guard, true, false))?;
        edges.push(edge);
        guard.skip_whitespace();
        if index < 3 && *guard.peek() == CssToken::Comma {
            guard.advance();
        }
    }
    guard.skip_whitespace();
    if guard.next_token() != CssToken::RightParen {
        return None;
    }
    guard.release();
    Some(Rc::new(CssValue::Rect(
        Rc::clone(&edges[0]),
        Rc::clone(&edges[1]),
        Rc::clone(&edges[2]),
        Rc::clone(&edges[3]),
    )))
}

/// Border style keywords shared by borders, outlines, and column rules.
pub const BORDER_STYLES: &[ValueId] = &[
    ValueId::None,
    ValueId::Hidden,
    ValueId::Dotted,
    ValueId::Dashed,
    ValueId::Solid,
    ValueId::Double,
    ValueId::Groove,
    ValueId::Ridge,
    ValueId::Inset,
    ValueId::Outset,
];

/// Page break keywords.
const PAGE_BREAKS: &[ValueId] = &[
    ValueId::Auto,
    ValueId::Always,
    ValueId::Avoid,
    ValueId::Left,
    ValueId::Right,
];

/// The per-property dispatcher: consume one declaration value for `id`.
///
/// Returns `None` on grammar mismatch, in which case the caller drops the
/// declaration.
#[allow(clippy::too_many_lines)]
pub fn consume_longhand(input: &mut TokenStream, id: PropertyId) -> Option<ValueRef> {
    use PropertyId as P;
    match id {
        P::Display => consume_ident(
            input,
            &[
                ValueId::Block,
                ValueId::Inline,
                ValueId::InlineBlock,
                ValueId::Flex,
                ValueId::InlineFlex,
                ValueId::InlineTable,
                ValueId::ListItem,
                ValueId::Table,
                ValueId::TableCaption,
                ValueId::TableCell,
                ValueId::TableColumn,
                ValueId::TableColumnGroup,
                ValueId::TableFooterGroup,
                ValueId::TableHeaderGroup,
                ValueId::TableRow,
                ValueId::TableRowGroup,
                ValueId::None,
            ],
        ),
        P::Position => consume_ident(
            input,
            &[
                ValueId::Static,
                ValueId::Relative,
                ValueId::Absolute,
                ValueId::Fixed,
            ],
        ),
        P::Float => consume_ident(input, &[ValueId::Left, ValueId::Right, ValueId::None]),
        P::Clear => consume_ident(
            input,
            &[ValueId::Left, ValueId::Right, ValueId::Both, ValueId::None],
        ),
        P::OverflowX | P::OverflowY => consume_ident(
            input,
            &[
                ValueId::Visible,
                ValueId::Hidden,
                ValueId::Scroll,
                ValueId::Auto,
            ],
        ),
        P::Visibility => consume_ident(
            input,
            &[ValueId::Visible, ValueId::Hidden, ValueId::Collapse],
        ),
        P::Direction => consume_ident(input, &[ValueId::Ltr, ValueId::Rtl]),
        P::BoxSizing => consume_ident(input, &[ValueId::BorderBox, ValueId::ContentBox]),
        P::Color | P::BackgroundColor | P::TextDecorationColor | P::OutlineColor
        | P::ColumnRuleColor | P::BorderTopColor | P::BorderRightColor | P::BorderBottomColor
        | P::BorderLeftColor => consume_color(input),
        P::BackgroundImage => consume_image_or_none(input),
        P::BackgroundRepeat => consume_ident(
            input,
            &[
                ValueId::Repeat,
                ValueId::RepeatX,
                ValueId::RepeatY,
                ValueId::NoRepeat,
            ],
        ),
        P::BackgroundAttachment => consume_ident(
            input,
            &[ValueId::Scroll, ValueId::Fixed, ValueId::Local],
        ),
        P::BackgroundClip | P::BackgroundOrigin => consume_ident(
            input,
            &[
                ValueId::BorderBox,
                ValueId::PaddingBox,
                ValueId::ContentBox,
            ],
        ),
        P::BackgroundPosition => consume_background_position(input),
        P::BackgroundSize => consume_background_size(input),
        P::BorderTopStyle | P::BorderRightStyle | P::BorderBottomStyle | P::BorderLeftStyle
        | P::ColumnRuleStyle => consume_ident(input, BORDER_STYLES),
        P::OutlineStyle => {
            consume_auto(input).or_else(|| consume_ident(input, BORDER_STYLES))
        }
        P::BorderTopWidth | P::BorderRightWidth | P::BorderBottomWidth | P::BorderLeftWidth
        | P::OutlineWidth | P::ColumnRuleWidth => consume_line_width(input, false),
        P::BorderTopLeftRadius | P::BorderTopRightRadius | P::BorderBottomLeftRadius
        | P::BorderBottomRightRadius => consume_border_radius_value(input),
        P::BorderCollapse => consume_ident(input, &[ValueId::Collapse, ValueId::Separate]),
        P::BorderHorizontalSpacing | P::BorderVerticalSpacing => {
            consume_length(input, false, false)
        }
        P::Width | P::Height => consume_length_or_percent_or_auto(input, false, true),
        P::MinWidth | P::MinHeight => consume_length_or_percent_or_auto(input, false, true),
        P::MaxWidth | P::MaxHeight => consume_length_or_percent_or_none(input, false, true),
        P::MarginTop | P::MarginRight | P::MarginBottom | P::MarginLeft => {
            consume_length_or_percent_or_auto(input, true, true)
        }
        P::PaddingTop | P::PaddingRight | P::PaddingBottom | P::PaddingLeft => {
            consume_length_or_percent(input, false, true)
        }
        P::Top | P::Right | P::Bottom | P::Left => {
            consume_length_or_percent_or_auto(input, true, true)
        }
        P::FontFamily => consume_font_family(input),
        P::FontSize => consume_font_size(input, true),
        P::FontStyle => consume_ident(
            input,
            &[ValueId::Normal, ValueId::Italic, ValueId::Oblique],
        ),
        P::FontVariant => consume_ident(input, &[ValueId::Normal, ValueId::SmallCaps]),
        P::FontWeight => consume_font_weight(input),
        P::LineHeight => consume_line_height(input),
        P::TextAlign => consume_ident(
            input,
            &[
                ValueId::Left,
                ValueId::Right,
                ValueId::Center,
                ValueId::Justify,
            ],
        ),
        P::TextDecorationLine => consume_text_decoration_line(input),
        P::TextDecorationStyle => consume_ident(
            input,
            &[
                ValueId::Solid,
                ValueId::Double,
                ValueId::Dotted,
                ValueId::Dashed,
                ValueId::Wavy,
            ],
        ),
        P::TextIndent => consume_length_or_percent(input, true, true),
        P::TextTransform => consume_ident(
            input,
            &[
                ValueId::Capitalize,
                ValueId::Uppercase,
                ValueId::Lowercase,
                ValueId::None,
            ],
        ),
        P::LetterSpacing | P::WordSpacing => consume_length_or_normal(input, true, false),
        P::WhiteSpace => consume_ident(
            input,
            &[
                ValueId::Normal,
                ValueId::Pre,
                ValueId::PreLine,
                ValueId::PreWrap,
                ValueId::Nowrap,
            ],
        ),
        P::VerticalAlign => consume_vertical_align(input),
        P::ListStyleType => consume_ident(
            input,
            &[
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
                ValueId::None,
            ],
        ),
        P::ListStylePosition => consume_ident(input, &[ValueId::Inside, ValueId::Outside]),
        P::ListStyleImage => consume_image_or_none(input),
        P::Content => consume_content(input),
        P::Quotes => consume_quotes(input),
        P::CounterReset | P::CounterSet => consume_counter(input, 0),
        P::CounterIncrement => consume_counter(input, 1),
        P::CaptionSide => consume_ident(input, &[ValueId::Top, ValueId::Bottom]),
        P::EmptyCells => consume_ident(input, &[ValueId::Show, ValueId::Hide]),
        P::TableLayout => consume_ident(input, &[ValueId::Auto, ValueId::Fixed]),
        P::FlexBasis => consume_length_or_percent_or_auto(input, false, false),
        P::FlexDirection => consume_ident(
            input,
            &[
                ValueId::Row,
                ValueId::RowReverse,
                ValueId::Column,
                ValueId::ColumnReverse,
            ],
        ),
        P::FlexWrap => consume_ident(
            input,
            &[ValueId::Nowrap, ValueId::Wrap, ValueId::WrapReverse],
        ),
        P::FlexGrow | P::FlexShrink => consume_number(input, false),
        P::JustifyContent => consume_ident(
            input,
            &[
                ValueId::FlexStart,
                ValueId::FlexEnd,
                ValueId::Center,
                ValueId::SpaceBetween,
                ValueId::SpaceAround,
                ValueId::SpaceEvenly,
            ],
        ),
        P::AlignContent => consume_ident(
            input,
            &[
                ValueId::FlexStart,
                ValueId::FlexEnd,
                ValueId::Center,
                ValueId::SpaceBetween,
                ValueId::SpaceAround,
                ValueId::Stretch,
            ],
        ),
        P::AlignItems | P::AlignSelf => consume_ident(
            input,
            &[
                ValueId::FlexStart,
                ValueId::FlexEnd,
                ValueId::Center,
                ValueId::Baseline,
                ValueId::Stretch,
                ValueId::Auto,
            ],
        ),
        P::Order | P::ZIndex => {
            consume_auto(input).or_else(|| consume_integer(input, true))
        }
        P::ColumnCount => consume_auto(input).or_else(|| consume_integer(input, false)),
        P::ColumnWidth | P::ColumnGap => {
            consume_auto(input)
                .or_else(|| consume_normal(input))
                .or_else(|| consume_length(input, false, false))
        }
        P::ColumnSpan => consume_ident(input, &[ValueId::None, ValueId::All]),
        P::ColumnFill => consume_ident(input, &[ValueId::Auto, ValueId::Balance]),
        P::Orphans | P::Widows => consume_integer(input, false),
        P::TabSize => consume_integer(input, false).or_else(|| consume_length(input, false, false)),
        P::OutlineOffset => consume_length(input, true, false),
        P::Page => consume_page(input),
        P::PageBreakBefore | P::PageBreakAfter => consume_ident(input, PAGE_BREAKS),
        P::PageBreakInside => consume_ident(input, &[ValueId::Auto, ValueId::Avoid]),
        P::Size => consume_size(input),
        P::Src => consume_font_face_src(input),
        P::Clip => consume_clip(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::CssTokenizer;

    fn stream(input: &str) -> TokenStream {
        let mut tokenizer = CssTokenizer::new(input);
        tokenizer.run();
        let mut tokens = tokenizer.into_tokens();
        let _ = tokens.pop();
        TokenStream::new(tokens)
    }

    #[test]
    fn colors_parse_in_all_forms() {
        for (text, expected) in [
            ("#fff", Color::rgb(0xFF, 0xFF, 0xFF)),
            ("#ff0000", Color::rgb(0xFF, 0x00, 0x00)),
            ("#ff000080", Color::new(0xFF, 0x00, 0x00, 0x80)),
            ("red", Color::rgb(0xFF, 0x00, 0x00)),
            ("rgb(1, 2, 3)", Color::rgb(1, 2, 3)),
            ("rgba(1, 2, 3, 0.5)", Color::new(1, 2, 3, 128)),
            ("rgb(100%, 0%, 0%)", Color::rgb(255, 0, 0)),
        ] {
            let mut input = stream(text);
            let value = consume_color(&mut input).unwrap_or_else(|| panic!("no color: {text}"));
            assert_eq!(*value, CssValue::Color(expected), "color {text}");
        }
    }

    #[test]
    fn current_color_stays_symbolic() {
        let mut input = stream("currentColor");
        let value = consume_color(&mut input).unwrap();
        assert!(value.is_ident(ValueId::CurrentColor));
    }

    #[test]
    fn invalid_value_is_no_match() {
        let mut input = stream("bogus-keyword");
        assert!(consume_longhand(&mut input, PropertyId::Display).is_none());
        let mut input = stream("-4");
        assert!(consume_longhand(&mut input, PropertyId::PaddingTop).is_none());
    }

    #[test]
    fn lengths_and_percentages() {
        let mut input = stream("1.5em");
        assert_eq!(
            *consume_length(&mut input, false, false).unwrap(),
            CssValue::Length {
                value: 1.5,
                unit: LengthUnit::Em
            }
        );
        let mut input = stream("50%");
        assert_eq!(
            *consume_percent(&mut input, false).unwrap(),
            CssValue::Percent(50.0)
        );
        // Bare zero is a valid length even without the unitless quirk.
        let mut input = stream("0");
        assert!(consume_length(&mut input, false, false).is_some());
    }

    #[test]
    fn font_family_list() {
        let mut input = stream("\"Gentium Book\", Palatino Linotype, serif");
        let value = consume_font_family(&mut input).unwrap();
        let CssValue::List(families) = &*value else {
            panic!("expected list");
        };
        assert_eq!(families.len(), 3);
        assert_eq!(*families[0], CssValue::String("Gentium Book".into()));
        assert_eq!(*families[1], CssValue::String("Palatino Linotype".into()));
        assert!(families[2].is_ident(ValueId::Serif));
    }

    #[test]
    fn content_components() {
        let mut input = stream("\"(\" counter(chapter) counters(sec, \".\") attr(title) open-quote");
        let value = consume_content(&mut input).unwrap();
        let CssValue::List(parts) = &*value else {
            panic!("expected list");
        };
        assert_eq!(parts.len(), 5);
        assert!(matches!(&*parts[1], CssValue::Counter { separator, .. } if separator.is_empty()));
        assert!(matches!(&*parts[2], CssValue::Counter { separator, .. } if separator == "."));
        assert!(matches!(&*parts[3], CssValue::Function(ValueId::Attr, _)));
        assert!(parts[4].is_ident(ValueId::OpenQuote));
    }

    #[test]
    fn counter_reset_defaults() {
        let mut input = stream("chapter section 4");
        let value = consume_counter(&mut input, 0).unwrap();
        let CssValue::List(counters) = &*value else {
            panic!("expected list");
        };
        let CssValue::Pair(_, first_value) = &*counters[0] else {
            panic!("expected pair");
        };
        assert_eq!(**first_value, CssValue::Integer(0));
        let CssValue::Pair(_, second_value) = &*counters[1] else {
            panic!("expected pair");
        };
        assert_eq!(**second_value, CssValue::Integer(4));
    }

    #[test]
    fn quotes_pairs() {
        let mut input = stream("\"\u{201C}\" \"\u{201D}\" \"\u{2018}\" \"\u{2019}\"");
        let value = consume_quotes(&mut input).unwrap();
        let CssValue::List(pairs) = &*value else {
            panic!("expected list");
        };
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn font_face_src_forms() {
        let mut input = stream("url(book.woff2) format(\"woff2\"), local(Georgia)");
        let value = consume_font_face_src(&mut input).unwrap();
        let CssValue::List(sources) = &*value else {
            panic!("expected list");
        };
        assert!(matches!(&*sources[0], CssValue::Function(ValueId::Format, _)));
        assert!(matches!(
            &*sources[1],
            CssValue::Function(ValueId::LocalFunction, _)
        ));
    }

    #[test]
    fn clip_rect() {
        let mut input = stream("rect(1px, 2px, 3px, auto)");
        let value = consume_longhand(&mut input, PropertyId::Clip).unwrap();
        assert!(matches!(&*value, CssValue::Rect(..)));
    }
}
