//! Computed style.
//!
//! One [`ComputedStyle`] exists per `(element, pseudo-type)` for the life of
//! a document. The cascade writes a property map; the scalar fields layout
//! reads hundreds of times per element are unpacked eagerly. Everything else
//! resolves lazily on read: `em` against the element's own font size, `rem`
//! against the root's, viewport units against the document's viewport, and
//! `currentColor` against the style's own color.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use folio_common::resource::FontData;

use crate::properties::PropertyId;
use crate::value::{Color, CssValue, LengthUnit, ValueId, ValueRef};

/// The `display` property, unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum Display {
    None,
    Block,
    #[default]
    Inline,
    InlineBlock,
    Flex,
    InlineFlex,
    ListItem,
    Table,
    InlineTable,
    TableRow,
    TableCell,
    TableCaption,
    TableRowGroup,
    TableHeaderGroup,
    TableFooterGroup,
    TableColumn,
    TableColumnGroup,
}

/// The `position` property, unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
}

/// The `float` property, unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum Float {
    #[default]
    None,
    Left,
    Right,
}

/// The `clear` property, unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum Clear {
    #[default]
    None,
    Left,
    Right,
    Both,
}

/// The `overflow` properties, unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    Scroll,
    Auto,
}

/// The `visibility` property, unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
    Collapse,
}

/// The `font-style` property, unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

/// The `font-variant` property, unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum FontVariant {
    #[default]
    Normal,
    SmallCaps,
}

/// The `text-align` property, unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum TextAlign {
    #[default]
    Left,
    Right,
    Center,
    Justify,
}

/// The `white-space` property, unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum WhiteSpace {
    #[default]
    Normal,
    Pre,
    PreLine,
    PreWrap,
    Nowrap,
}

/// The `direction` property, unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

/// The `box-sizing` property, unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum BoxSizing {
    #[default]
    ContentBox,
    BorderBox,
}

/// The medium font size in CSS pixels.
pub const MEDIUM_FONT_SIZE: f32 = 16.0;

/// A resolved style: the cascaded property map plus the eagerly unpacked
/// scalars.
#[derive(Debug, Clone)]
pub struct ComputedStyle {
    properties: HashMap<PropertyId, ValueRef>,

    /// Unpacked `display`.
    pub display: Display,
    /// Unpacked `position`.
    pub position: Position,
    /// Unpacked `float`.
    pub float: Float,
    /// Unpacked `clear`.
    pub clear: Clear,
    /// Unpacked `overflow-x`.
    pub overflow: Overflow,
    /// Unpacked `visibility`.
    pub visibility: Visibility,
    /// Resolved `font-size` in CSS pixels.
    pub font_size: f32,
    /// Resolved numeric `font-weight`.
    pub font_weight: i32,
    /// Unpacked `font-style`.
    pub font_style: FontStyle,
    /// Unpacked `font-variant`.
    pub font_variant: FontVariant,
    /// Resolved `color`.
    pub color: Color,
    /// Unpacked `text-align`.
    pub text_align: TextAlign,
    /// Unpacked `white-space`.
    pub white_space: WhiteSpace,
    /// Unpacked `direction`.
    pub direction: Direction,
    /// Unpacked `box-sizing`.
    pub box_sizing: BoxSizing,

    root_font_size: f32,
    viewport_width: f32,
    viewport_height: f32,

    /// Lazily resolved font face, cached after the first query.
    font_face: RefCell<Option<Option<Rc<FontData>>>>,
}

impl ComputedStyle {
    /// The initial style used as the root element's parent: medium serif
    /// text, black, everything else at its default.
    #[must_use]
    pub fn initial(viewport_width: f32, viewport_height: f32) -> Self {
        Self {
            properties: HashMap::new(),
            display: Display::Inline,
            position: Position::Static,
            float: Float::None,
            clear: Clear::None,
            overflow: Overflow::Visible,
            visibility: Visibility::Visible,
            font_size: MEDIUM_FONT_SIZE,
            font_weight: 400,
            font_style: FontStyle::Normal,
            font_variant: FontVariant::Normal,
            color: Color::BLACK,
            text_align: TextAlign::Left,
            white_space: WhiteSpace::Normal,
            direction: Direction::Ltr,
            box_sizing: BoxSizing::ContentBox,
            root_font_size: MEDIUM_FONT_SIZE,
            viewport_width,
            viewport_height,
            font_face: RefCell::new(None),
        }
    }

    /// Build a computed style from the cascade's property map.
    ///
    /// `is_root` marks the document element: its own font size becomes the
    /// reference for `rem` units document-wide.
    #[must_use]
    pub fn build(
        properties: HashMap<PropertyId, ValueRef>,
        parent: &Self,
        is_root: bool,
    ) -> Self {
        let font_size = resolve_font_size(properties.get(&PropertyId::FontSize), parent);
        let root_font_size = if is_root {
            font_size
        } else {
            parent.root_font_size
        };
        let font_weight = resolve_font_weight(properties.get(&PropertyId::FontWeight), parent);

        let mut style = Self {
            display: unpack_display(properties.get(&PropertyId::Display)),
            position: unpack_position(properties.get(&PropertyId::Position)),
            float: unpack_float(properties.get(&PropertyId::Float)),
            clear: unpack_clear(properties.get(&PropertyId::Clear)),
            overflow: unpack_overflow(properties.get(&PropertyId::OverflowX)),
            visibility: unpack_visibility(properties.get(&PropertyId::Visibility), parent),
            font_size,
            font_weight,
            font_style: unpack_font_style(properties.get(&PropertyId::FontStyle), parent),
            font_variant: unpack_font_variant(properties.get(&PropertyId::FontVariant), parent),
            color: Color::BLACK,
            text_align: unpack_text_align(properties.get(&PropertyId::TextAlign), parent),
            white_space: unpack_white_space(properties.get(&PropertyId::WhiteSpace), parent),
            direction: unpack_direction(properties.get(&PropertyId::Direction), parent),
            box_sizing: unpack_box_sizing(properties.get(&PropertyId::BoxSizing)),
            root_font_size,
            viewport_width: parent.viewport_width,
            viewport_height: parent.viewport_height,
            font_face: RefCell::new(None),
            properties,
        };
        style.color = resolve_color_scalar(style.properties.get(&PropertyId::Color), parent);
        style
    }

    /// Raw cascaded value for a property, if one was set.
    #[must_use]
    pub fn get(&self, id: PropertyId) -> Option<&ValueRef> {
        self.properties.get(&id)
    }

    /// The full property map; the counters walk iterates it.
    #[must_use]
    pub fn properties(&self) -> &HashMap<PropertyId, ValueRef> {
        &self.properties
    }

    /// True when `display: none` removes the element from box construction.
    #[must_use]
    pub fn is_display_none(&self) -> bool {
        self.display == Display::None
    }

    /// Convert a length in `unit` to CSS pixels against this style.
    #[must_use]
    pub fn resolve_length(&self, value: f32, unit: LengthUnit) -> f32 {
        match unit {
            LengthUnit::None | LengthUnit::Px => value,
            LengthUnit::Pt => value * 96.0 / 72.0,
            LengthUnit::Pc => value * 16.0,
            LengthUnit::In => value * 96.0,
            LengthUnit::Cm => value * 96.0 / 2.54,
            LengthUnit::Mm => value * 96.0 / 25.4,
            LengthUnit::Q => value * 96.0 / 101.6,
            LengthUnit::Em => value * self.font_size,
            LengthUnit::Rem => value * self.root_font_size,
            // Approximation without font metrics loaded.
            LengthUnit::Ex | LengthUnit::Ch => value * self.font_size * 0.5,
            LengthUnit::Vw => value * self.viewport_width / 100.0,
            LengthUnit::Vh => value * self.viewport_height / 100.0,
            LengthUnit::Vmin => value * self.viewport_width.min(self.viewport_height) / 100.0,
            LengthUnit::Vmax => value * self.viewport_width.max(self.viewport_height) / 100.0,
        }
    }

    /// A property's length in pixels; percentages resolve against
    /// `percent_base`.
    #[must_use]
    pub fn length_in_px(&self, value: &CssValue, percent_base: f32) -> Option<f32> {
        match value {
            CssValue::Length { value, unit } => Some(self.resolve_length(*value, *unit)),
            CssValue::Percent(p) => Some(percent_base * p / 100.0),
            _ => None,
        }
    }

    /// Resolve a color value; `currentColor` resolves against this style's
    /// own color field.
    #[must_use]
    pub fn resolve_color(&self, value: &CssValue) -> Option<Color> {
        match value {
            CssValue::Color(color) => Some(*color),
            CssValue::Ident(ValueId::CurrentColor) => Some(self.color),
            _ => None,
        }
    }

    /// The `font-family` list as plain names, generic keywords included.
    #[must_use]
    pub fn font_families(&self) -> Vec<String> {
        let Some(value) = self.get(PropertyId::FontFamily) else {
            return vec!["serif".to_owned()];
        };
        let CssValue::List(families) = &**value else {
            return vec!["serif".to_owned()];
        };
        families
            .iter()
            .filter_map(|family| match &**family {
                CssValue::String(name) => Some(name.clone()),
                CssValue::Ident(id) => Some(
                    match id {
                        ValueId::Serif => "serif",
                        ValueId::SansSerif => "sans-serif",
                        ValueId::Monospace => "monospace",
                        ValueId::Cursive => "cursive",
                        ValueId::Fantasy => "fantasy",
                        _ => return None,
                    }
                    .to_owned(),
                ),
                _ => None,
            })
            .collect()
    }

    /// `line-height` in pixels; `normal` maps to 1.2 times the font size.
    #[must_use]
    pub fn line_height(&self) -> f32 {
        match self.get(PropertyId::LineHeight).map(|v| &**v) {
            Some(CssValue::Number(factor)) => factor * self.font_size,
            Some(CssValue::Length { value, unit }) => self.resolve_length(*value, *unit),
            Some(CssValue::Percent(p)) => self.font_size * p / 100.0,
            _ => self.font_size * 1.2,
        }
    }

    /// The `list-style-type` keyword; `disc` when unset.
    #[must_use]
    pub fn list_style_type(&self) -> ValueId {
        self.get(PropertyId::ListStyleType)
            .and_then(|v| v.as_ident())
            .unwrap_or(ValueId::Disc)
    }

    /// The `list-style-image` URL, when one was set.
    #[must_use]
    pub fn list_style_image(&self) -> Option<&str> {
        match self.get(PropertyId::ListStyleImage).map(|v| &**v) {
            Some(CssValue::Image(url)) => Some(url),
            _ => None,
        }
    }

    /// The `quotes` value, when one was set.
    #[must_use]
    pub fn quotes(&self) -> Option<&ValueRef> {
        self.get(PropertyId::Quotes)
    }

    /// The `content` value, when one was set.
    #[must_use]
    pub fn content(&self) -> Option<&ValueRef> {
        self.get(PropertyId::Content)
    }

    /// The cached font-face slot; the document fills it on first query.
    #[must_use]
    pub fn font_face_slot(&self) -> &RefCell<Option<Option<Rc<FontData>>>> {
        &self.font_face
    }

    /// Viewport width in CSS pixels, for `vw` resolution downstream.
    #[must_use]
    pub const fn viewport_width(&self) -> f32 {
        self.viewport_width
    }

    /// Viewport height in CSS pixels, for `vh` resolution downstream.
    #[must_use]
    pub const fn viewport_height(&self) -> f32 {
        self.viewport_height
    }
}

fn ident_of(value: Option<&ValueRef>) -> Option<ValueId> {
    value.and_then(|v| v.as_ident())
}

fn unpack_display(value: Option<&ValueRef>) -> Display {
    match ident_of(value) {
        Some(ValueId::None) => Display::None,
        Some(ValueId::Block) => Display::Block,
        Some(ValueId::InlineBlock) => Display::InlineBlock,
        Some(ValueId::Flex) => Display::Flex,
        Some(ValueId::InlineFlex) => Display::InlineFlex,
        Some(ValueId::ListItem) => Display::ListItem,
        Some(ValueId::Table) => Display::Table,
        Some(ValueId::InlineTable) => Display::InlineTable,
        Some(ValueId::TableRow) => Display::TableRow,
        Some(ValueId::TableCell) => Display::TableCell,
        Some(ValueId::TableCaption) => Display::TableCaption,
        Some(ValueId::TableRowGroup) => Display::TableRowGroup,
        Some(ValueId::TableHeaderGroup) => Display::TableHeaderGroup,
        Some(ValueId::TableFooterGroup) => Display::TableFooterGroup,
        Some(ValueId::TableColumn) => Display::TableColumn,
        Some(ValueId::TableColumnGroup) => Display::TableColumnGroup,
        _ => Display::Inline,
    }
}

fn unpack_position(value: Option<&ValueRef>) -> Position {
    match ident_of(value) {
        Some(ValueId::Relative) => Position::Relative,
        Some(ValueId::Absolute) => Position::Absolute,
        Some(ValueId::Fixed) => Position::Fixed,
        _ => Position::Static,
    }
}

fn unpack_float(value: Option<&ValueRef>) -> Float {
    match ident_of(value) {
        Some(ValueId::Left) => Float::Left,
        Some(ValueId::Right) => Float::Right,
        _ => Float::None,
    }
}

fn unpack_clear(value: Option<&ValueRef>) -> Clear {
    match ident_of(value) {
        Some(ValueId::Left) => Clear::Left,
        Some(ValueId::Right) => Clear::Right,
        Some(ValueId::Both) => Clear::Both,
        _ => Clear::None,
    }
}

fn unpack_overflow(value: Option<&ValueRef>) -> Overflow {
    match ident_of(value) {
        Some(ValueId::Hidden) => Overflow::Hidden,
        Some(ValueId::Scroll) => Overflow::Scroll,
        Some(ValueId::Auto) => Overflow::Auto,
        _ => Overflow::Visible,
    }
}

fn unpack_visibility(value: Option<&ValueRef>, parent: &ComputedStyle) -> Visibility {
    match ident_of(value) {
        Some(ValueId::Visible) => Visibility::Visible,
        Some(ValueId::Hidden) => Visibility::Hidden,
        Some(ValueId::Collapse) => Visibility::Collapse,
        _ => parent.visibility,
    }
}

fn unpack_font_style(value: Option<&ValueRef>, parent: &ComputedStyle) -> FontStyle {
    match ident_of(value) {
        Some(ValueId::Normal) => FontStyle::Normal,
        Some(ValueId::Italic) => FontStyle::Italic,
        Some(ValueId::Oblique) => FontStyle::Oblique,
        _ => parent.font_style,
    }
}

fn unpack_font_variant(value: Option<&ValueRef>, parent: &ComputedStyle) -> FontVariant {
    match ident_of(value) {
        Some(ValueId::Normal) => FontVariant::Normal,
        Some(ValueId::SmallCaps) => FontVariant::SmallCaps,
        _ => parent.font_variant,
    }
}

fn unpack_text_align(value: Option<&ValueRef>, parent: &ComputedStyle) -> TextAlign {
    match ident_of(value) {
        Some(ValueId::Left) => TextAlign::Left,
        Some(ValueId::Right) => TextAlign::Right,
        Some(ValueId::Center) => TextAlign::Center,
        Some(ValueId::Justify) => TextAlign::Justify,
        _ => parent.text_align,
    }
}

fn unpack_white_space(value: Option<&ValueRef>, parent: &ComputedStyle) -> WhiteSpace {
    match ident_of(value) {
        Some(ValueId::Normal) => WhiteSpace::Normal,
        Some(ValueId::Pre) => WhiteSpace::Pre,
        Some(ValueId::PreLine) => WhiteSpace::PreLine,
        Some(ValueId::PreWrap) => WhiteSpace::PreWrap,
        Some(ValueId::Nowrap) => WhiteSpace::Nowrap,
        _ => parent.white_space,
    }
}

fn unpack_direction(value: Option<&ValueRef>, parent: &ComputedStyle) -> Direction {
    match ident_of(value) {
        Some(ValueId::Ltr) => Direction::Ltr,
        Some(ValueId::Rtl) => Direction::Rtl,
        _ => parent.direction,
    }
}

fn unpack_box_sizing(value: Option<&ValueRef>) -> BoxSizing {
    match ident_of(value) {
        Some(ValueId::BorderBox) => BoxSizing::BorderBox,
        _ => BoxSizing::ContentBox,
    }
}

/// `font-size` resolution: keywords against the medium scale, `em` and
/// percentages against the parent's size, `smaller`/`larger` by ratio.
fn resolve_font_size(value: Option<&ValueRef>, parent: &ComputedStyle) -> f32 {
    let Some(value) = value else {
        return parent.font_size;
    };
    match &**value {
        CssValue::Ident(id) => match id {
            ValueId::XxSmall => MEDIUM_FONT_SIZE * 0.6,
            ValueId::XSmall => MEDIUM_FONT_SIZE * 0.75,
            ValueId::Small => MEDIUM_FONT_SIZE * 8.0 / 9.0,
            ValueId::Medium => MEDIUM_FONT_SIZE,
            ValueId::Large => MEDIUM_FONT_SIZE * 1.2,
            ValueId::XLarge => MEDIUM_FONT_SIZE * 1.5,
            ValueId::XxLarge => MEDIUM_FONT_SIZE * 2.0,
            ValueId::Smaller => parent.font_size / 1.2,
            ValueId::Larger => parent.font_size * 1.2,
            _ => parent.font_size,
        },
        CssValue::Length { value, unit } => match unit {
            LengthUnit::Em => value * parent.font_size,
            LengthUnit::Rem => value * parent.root_font_size,
            LengthUnit::Ex | LengthUnit::Ch => value * parent.font_size * 0.5,
            _ => parent.resolve_length(*value, *unit),
        },
        CssValue::Percent(p) => parent.font_size * p / 100.0,
        _ => parent.font_size,
    }
}

/// `font-weight` resolution: `bolder`/`lighter` move relative to the
/// parent's computed weight.
fn resolve_font_weight(value: Option<&ValueRef>, parent: &ComputedStyle) -> i32 {
    let Some(value) = value else {
        return parent.font_weight;
    };
    match &**value {
        CssValue::Ident(ValueId::Normal) => 400,
        CssValue::Ident(ValueId::Bold) => 700,
        CssValue::Ident(ValueId::Bolder) => (parent.font_weight + 300).min(900),
        CssValue::Ident(ValueId::Lighter) => (parent.font_weight - 300).max(100),
        CssValue::Integer(weight) => *weight,
        _ => parent.font_weight,
    }
}

/// The `color` scalar; `currentColor` on `color` itself resolves to the
/// inherited color.
fn resolve_color_scalar(value: Option<&ValueRef>, parent: &ComputedStyle) -> Color {
    match value.map(|v| &**v) {
        Some(CssValue::Color(color)) => *color,
        Some(CssValue::Ident(ValueId::CurrentColor)) => parent.color,
        _ => parent.color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style_with(
        properties: &[(PropertyId, ValueRef)],
        parent: &ComputedStyle,
    ) -> ComputedStyle {
        let map = properties
            .iter()
            .map(|(id, value)| (*id, Rc::clone(value)))
            .collect();
        ComputedStyle::build(map, parent, false)
    }

    #[test]
    fn em_resolves_against_own_font_size() {
        let parent = ComputedStyle::initial(800.0, 600.0);
        let style = style_with(
            &[(PropertyId::FontSize, CssValue::length(2.0, LengthUnit::Em))],
            &parent,
        );
        assert!((style.font_size - 32.0).abs() < 0.01);
        // 1em inside this style is now 32px.
        assert!((style.resolve_length(1.0, LengthUnit::Em) - 32.0).abs() < 0.01);
    }

    #[test]
    fn rem_resolves_against_root() {
        let mut root_parent = ComputedStyle::initial(800.0, 600.0);
        root_parent.root_font_size = 20.0;
        assert!((root_parent.resolve_length(2.0, LengthUnit::Rem) - 40.0).abs() < 0.01);
    }

    #[test]
    fn viewport_units() {
        let style = ComputedStyle::initial(1000.0, 500.0);
        assert!((style.resolve_length(10.0, LengthUnit::Vw) - 100.0).abs() < 0.01);
        assert!((style.resolve_length(10.0, LengthUnit::Vh) - 50.0).abs() < 0.01);
        assert!((style.resolve_length(10.0, LengthUnit::Vmin) - 50.0).abs() < 0.01);
        assert!((style.resolve_length(10.0, LengthUnit::Vmax) - 100.0).abs() < 0.01);
    }

    #[test]
    fn absolute_units_at_96_dpi() {
        let style = ComputedStyle::initial(800.0, 600.0);
        assert!((style.resolve_length(1.0, LengthUnit::In) - 96.0).abs() < 0.01);
        assert!((style.resolve_length(72.0, LengthUnit::Pt) - 96.0).abs() < 0.01);
        assert!((style.resolve_length(2.54, LengthUnit::Cm) - 96.0).abs() < 0.01);
    }

    #[test]
    fn current_color_resolves_to_own_color() {
        let parent = ComputedStyle::initial(800.0, 600.0);
        let red = Rc::new(CssValue::Color(Color::rgb(255, 0, 0)));
        let style = style_with(&[(PropertyId::Color, red)], &parent);
        let resolved = style
            .resolve_color(&CssValue::Ident(ValueId::CurrentColor))
            .unwrap();
        assert_eq!(resolved, Color::rgb(255, 0, 0));
    }

    #[test]
    fn bolder_and_lighter_move_from_parent() {
        let parent = ComputedStyle::initial(800.0, 600.0);
        let bolder = style_with(
            &[(PropertyId::FontWeight, CssValue::ident(ValueId::Bolder))],
            &parent,
        );
        assert_eq!(bolder.font_weight, 700);
        let lighter = style_with(
            &[(PropertyId::FontWeight, CssValue::ident(ValueId::Lighter))],
            &parent,
        );
        assert_eq!(lighter.font_weight, 100);
    }

    #[test]
    fn display_none_detection() {
        let parent = ComputedStyle::initial(800.0, 600.0);
        let style = style_with(
            &[(PropertyId::Display, CssValue::ident(ValueId::None))],
            &parent,
        );
        assert!(style.is_display_none());
    }

    #[test]
    fn line_height_forms() {
        let parent = ComputedStyle::initial(800.0, 600.0);
        let number = style_with(
            &[(
                PropertyId::LineHeight,
                Rc::new(CssValue::Number(1.5)),
            )],
            &parent,
        );
        assert!((number.line_height() - 24.0).abs() < 0.01);
        let unset = style_with(&[], &parent);
        assert!((unset.line_height() - 19.2).abs() < 0.01);
    }
}
