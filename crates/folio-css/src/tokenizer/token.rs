//! CSS token types.
//!
//! [§ 4 Tokenization](https://www.w3.org/TR/css-syntax-3/#tokenization)
//!
//! "The output of tokenization step is a stream of zero or more of the
//! following tokens..." Comments are consumed and elided during
//! tokenization.

use core::fmt;

/// [§ 4.2 Definitions](https://www.w3.org/TR/css-syntax-3/#typedef-hash-token)
///
/// "Hash tokens have a type flag set to either 'id' or 'unrestricted'."
/// Only identifier-typed hashes are valid ID selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    /// The hash value is a valid identifier.
    Identifier,
    /// The hash value is only valid as a color or similar literal.
    Unrestricted,
}

/// "Number tokens have a type flag set to either 'integer' or 'number'."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    /// No decimal point or exponent appeared in the source.
    Integer,
    /// A fractional or exponential form.
    Number,
}

/// A CSS token.
///
/// Numeric tokens carry a `signed` flag recording whether the source wrote
/// an explicit sign; the `An+B` grammar needs it to tell `n+1` from `n +1`.
#[derive(Debug, Clone, PartialEq)]
pub enum CssToken {
    /// `<ident-token>`
    Ident(String),
    /// `<function-token>`: an identifier immediately followed by `(`.
    Function(String),
    /// `<at-keyword-token>`: `@` followed by an identifier.
    AtKeyword(String),
    /// `<hash-token>`
    Hash {
        /// The value, without the `#`.
        value: String,
        /// Identifier or unrestricted.
        kind: HashKind,
    },
    /// `<string-token>`
    String(String),
    /// `<bad-string-token>`: an unescaped newline ended the string.
    BadString,
    /// `<url-token>`: the unquoted `url(...)` form.
    Url(String),
    /// `<bad-url-token>`: forbidden code points inside an unquoted url.
    BadUrl,
    /// `<delim-token>`
    Delim(char),
    /// `<number-token>`
    Number {
        /// The numeric value.
        value: f32,
        /// Integer or number.
        kind: NumericKind,
        /// True when the source wrote an explicit `+` or `-`.
        signed: bool,
    },
    /// `<percentage-token>`
    Percentage {
        /// The numeric value before the `%`.
        value: f32,
        /// True when the source wrote an explicit sign.
        signed: bool,
    },
    /// `<dimension-token>`
    Dimension {
        /// The numeric value.
        value: f32,
        /// Integer or number.
        kind: NumericKind,
        /// The unit identifier, lowercased.
        unit: String,
        /// True when the source wrote an explicit sign.
        signed: bool,
    },
    /// `<whitespace-token>`: a run of whitespace collapses to one token.
    Whitespace,
    /// `<CDO-token>`: `<!--`
    CDO,
    /// `<CDC-token>`: `-->`
    CDC,
    /// `<colon-token>`
    Colon,
    /// `<semicolon-token>`
    Semicolon,
    /// `<comma-token>`
    Comma,
    /// `<(-token>`
    LeftParen,
    /// `<)-token>`
    RightParen,
    /// `<[-token>`
    LeftBracket,
    /// `<]-token>`
    RightBracket,
    /// `<{-token>`
    LeftBrace,
    /// `<}-token>`
    RightBrace,
    /// `<EOF-token>`
    EndOfFile,
}

impl CssToken {
    /// Returns true if this is the end-of-file token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::EndOfFile)
    }

    /// Returns true for the whitespace token.
    #[must_use]
    pub const fn is_whitespace(&self) -> bool {
        matches!(self, Self::Whitespace)
    }

    /// The matching closer for an open-bracket token, if this is one.
    #[must_use]
    pub const fn closing_pair(&self) -> Option<Self> {
        match self {
            Self::LeftParen | Self::Function(_) => Some(Self::RightParen),
            Self::LeftBracket => Some(Self::RightBracket),
            Self::LeftBrace => Some(Self::RightBrace),
            _ => None,
        }
    }
}

impl fmt::Display for CssToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(v) => write!(f, "{v}"),
            Self::Function(v) => write!(f, "{v}("),
            Self::AtKeyword(v) => write!(f, "@{v}"),
            Self::Hash { value, .. } => write!(f, "#{value}"),
            Self::String(v) => write!(f, "\"{v}\""),
            Self::BadString => write!(f, "<bad-string>"),
            Self::Url(v) => write!(f, "url({v})"),
            Self::BadUrl => write!(f, "<bad-url>"),
            Self::Delim(c) => write!(f, "{c}"),
            Self::Number { value, .. } => write!(f, "{value}"),
            Self::Percentage { value, .. } => write!(f, "{value}%"),
            Self::Dimension { value, unit, .. } => write!(f, "{value}{unit}"),
            Self::Whitespace => write!(f, " "),
            Self::CDO => write!(f, "<!--"),
            Self::CDC => write!(f, "-->"),
            Self::Colon => write!(f, ":"),
            Self::Semicolon => write!(f, ";"),
            Self::Comma => write!(f, ","),
            Self::LeftParen => write!(f, "("),
            Self::RightParen => write!(f, ")"),
            Self::LeftBracket => write!(f, "["),
            Self::RightBracket => write!(f, "]"),
            Self::LeftBrace => write!(f, "{{"),
            Self::RightBrace => write!(f, "}}"),
            Self::EndOfFile => write!(f, "<eof>"),
        }
    }
}
