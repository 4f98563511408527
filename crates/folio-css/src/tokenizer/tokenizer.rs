//! The CSS tokenizer.
//!
//! [§ 4.3 Tokenizer Algorithms](https://www.w3.org/TR/css-syntax-3/#tokenizer-algorithms)
//!
//! "This section describes how to consume a token from a stream of code
//! points. It will return a single token of any type."

use super::token::{CssToken, HashKind, NumericKind};

/// CSS tokenizer following the CSS Syntax Module Level 3 specification.
pub struct CssTokenizer {
    /// The input being tokenized.
    input: Vec<char>,
    /// Current position in the input.
    position: usize,
    /// Collected tokens.
    tokens: Vec<CssToken>,
}

pub(super) fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

fn is_name_continue(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-'
}

impl CssTokenizer {
    /// Create a new CSS tokenizer with the given input.
    #[must_use]
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            tokens: Vec::new(),
        }
    }

    /// Tokenize the whole input.
    pub fn run(&mut self) {
        loop {
            let token = self.consume_token();
            let eof = token.is_eof();
            self.tokens.push(token);
            if eof {
                break;
            }
        }
    }

    /// Return the collected tokens.
    #[must_use]
    pub fn into_tokens(self) -> Vec<CssToken> {
        self.tokens
    }

    /// A reference to the collected tokens.
    #[must_use]
    pub fn tokens(&self) -> &[CssToken] {
        &self.tokens
    }

    fn consume(&mut self) -> Option<char> {
        let c = self.input.get(self.position).copied();
        if c.is_some() {
            self.position += 1;
        }
        c
    }

    fn reconsume(&mut self) {
        self.position = self.position.saturating_sub(1);
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    /// [§ 4.3.1 Consume a token](https://www.w3.org/TR/css-syntax-3/#consume-token)
    fn consume_token(&mut self) -> CssToken {
        // "Consume comments."
        self.consume_comments();

        let Some(c) = self.consume() else {
            return CssToken::EndOfFile;
        };

        match c {
            // "Consume as much whitespace as possible."
            c if is_whitespace(c) => {
                while self.peek().is_some_and(is_whitespace) {
                    let _ = self.consume();
                }
                CssToken::Whitespace
            }

            '"' => self.consume_string_token('"'),
            '\'' => self.consume_string_token('\''),

            '#' => {
                // "If the next input code point is an ident code point or
                // the next two input code points are a valid escape..."
                if self.peek().is_some_and(is_name_continue)
                    || self.is_valid_escape(self.peek(), self.peek_at(1))
                {
                    let kind = if self.would_start_ident() {
                        HashKind::Identifier
                    } else {
                        HashKind::Unrestricted
                    };
                    let value = self.consume_ident_sequence();
                    CssToken::Hash { value, kind }
                } else {
                    CssToken::Delim('#')
                }
            }

            '(' => CssToken::LeftParen,
            ')' => CssToken::RightParen,
            '[' => CssToken::LeftBracket,
            ']' => CssToken::RightBracket,
            '{' => CssToken::LeftBrace,
            '}' => CssToken::RightBrace,
            ',' => CssToken::Comma,
            ':' => CssToken::Colon,
            ';' => CssToken::Semicolon,

            '+' => {
                if self.would_start_number_after_sign() {
                    self.reconsume();
                    self.consume_numeric_token()
                } else {
                    CssToken::Delim('+')
                }
            }

            '-' => {
                if self.would_start_number_after_sign() {
                    self.reconsume();
                    self.consume_numeric_token()
                } else if self.peek() == Some('-') && self.peek_at(1) == Some('>') {
                    let _ = self.consume();
                    let _ = self.consume();
                    CssToken::CDC
                } else {
                    self.reconsume();
                    if self.would_start_ident() {
                        self.consume_ident_like_token()
                    } else {
                        let _ = self.consume();
                        CssToken::Delim('-')
                    }
                }
            }

            '.' => {
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.reconsume();
                    self.consume_numeric_token()
                } else {
                    CssToken::Delim('.')
                }
            }

            '<' => {
                if self.peek() == Some('!')
                    && self.peek_at(1) == Some('-')
                    && self.peek_at(2) == Some('-')
                {
                    let _ = self.consume();
                    let _ = self.consume();
                    let _ = self.consume();
                    CssToken::CDO
                } else {
                    CssToken::Delim('<')
                }
            }

            '@' => {
                if self.would_start_ident() {
                    let name = self.consume_ident_sequence();
                    CssToken::AtKeyword(name)
                } else {
                    CssToken::Delim('@')
                }
            }

            '\\' => {
                if self.is_valid_escape(Some('\\'), self.peek()) {
                    self.reconsume();
                    self.consume_ident_like_token()
                } else {
                    // "This is a parse error. Return a <delim-token>."
                    CssToken::Delim('\\')
                }
            }

            c if c.is_ascii_digit() => {
                self.reconsume();
                self.consume_numeric_token()
            }

            c if is_name_start(c) => {
                self.reconsume();
                self.consume_ident_like_token()
            }

            c => CssToken::Delim(c),
        }
    }

    /// [§ 4.3.2 Consume comments](https://www.w3.org/TR/css-syntax-3/#consume-comments)
    fn consume_comments(&mut self) {
        while self.peek() == Some('/') && self.peek_at(1) == Some('*') {
            let _ = self.consume();
            let _ = self.consume();
            loop {
                match self.consume() {
                    Some('*') if self.peek() == Some('/') => {
                        let _ = self.consume();
                        break;
                    }
                    // Unclosed comment: swallow to EOF, parse error.
                    None => return,
                    Some(_) => {}
                }
            }
        }
    }

    /// [§ 4.3.5 Consume a string token](https://www.w3.org/TR/css-syntax-3/#consume-string-token)
    fn consume_string_token(&mut self, quote: char) -> CssToken {
        let mut value = String::new();
        loop {
            match self.consume() {
                Some(c) if c == quote => return CssToken::String(value),
                // "EOF: This is a parse error. Return the <string-token>."
                None => return CssToken::String(value),
                Some('\n') => {
                    // "This is a parse error. Reconsume... return a
                    // <bad-string-token>."
                    self.reconsume();
                    return CssToken::BadString;
                }
                Some('\\') => match self.peek() {
                    None => {}
                    Some('\n') => {
                        let _ = self.consume();
                    }
                    Some(_) => value.push(self.consume_escaped_code_point()),
                },
                Some(c) => value.push(c),
            }
        }
    }

    /// [§ 4.3.7 Consume an escaped code point](https://www.w3.org/TR/css-syntax-3/#consume-escaped-code-point)
    ///
    /// `\` followed by 1-6 hex digits (trailing whitespace consumed); a
    /// non-hex escape emits the literal character; null or EOF becomes
    /// U+FFFD.
    fn consume_escaped_code_point(&mut self) -> char {
        let Some(c) = self.consume() else {
            return '\u{FFFD}';
        };
        if c.is_ascii_hexdigit() {
            let mut code = c.to_digit(16).unwrap_or(0);
            for _ in 0..5 {
                let Some(h) = self.peek() else { break };
                let Some(digit) = h.to_digit(16) else { break };
                let _ = self.consume();
                code = code * 16 + digit;
            }
            if self.peek().is_some_and(is_whitespace) {
                let _ = self.consume();
            }
            if code == 0 || (0xD800..=0xDFFF).contains(&code) || code > 0x0010_FFFF {
                return '\u{FFFD}';
            }
            char::from_u32(code).unwrap_or('\u{FFFD}')
        } else {
            c
        }
    }

    /// [§ 4.3.8 Check if two code points are a valid escape](https://www.w3.org/TR/css-syntax-3/#starts-with-a-valid-escape)
    fn is_valid_escape(&self, first: Option<char>, second: Option<char>) -> bool {
        first == Some('\\') && second.is_some_and(|c| c != '\n')
    }

    /// [§ 4.3.9 Check if three code points would start an ident sequence](https://www.w3.org/TR/css-syntax-3/#would-start-an-identifier)
    ///
    /// Checked at the current (unconsumed) position.
    fn would_start_ident(&self) -> bool {
        match self.peek() {
            Some('-') => {
                self.peek_at(1).is_some_and(is_name_start)
                    || self.peek_at(1) == Some('-')
                    || (self.peek_at(1) == Some('\\')
                        && self.peek_at(2).is_some_and(|c| c != '\n'))
            }
            Some('\\') => self.peek_at(1).is_some_and(|c| c != '\n'),
            Some(c) => is_name_start(c),
            None => false,
        }
    }

    /// Whether a sign character just consumed is followed by a number.
    fn would_start_number_after_sign(&self) -> bool {
        match self.peek() {
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => self.peek_at(1).is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        }
    }

    /// [§ 4.3.11 Consume an ident sequence](https://www.w3.org/TR/css-syntax-3/#consume-name)
    fn consume_ident_sequence(&mut self) -> String {
        let mut result = String::new();
        loop {
            match self.consume() {
                Some(c) if is_name_continue(c) => result.push(c),
                Some('\\') if self.peek().is_some_and(|c| c != '\n') => {
                    result.push(self.consume_escaped_code_point());
                }
                Some(_) => {
                    self.reconsume();
                    return result;
                }
                None => return result,
            }
        }
    }

    /// [§ 4.3.3 Consume a numeric token](https://www.w3.org/TR/css-syntax-3/#consume-numeric-token)
    fn consume_numeric_token(&mut self) -> CssToken {
        let (value, kind, signed) = self.consume_number();
        if self.would_start_ident() {
            let unit = self.consume_ident_sequence().to_ascii_lowercase();
            CssToken::Dimension {
                value,
                kind,
                unit,
                signed,
            }
        } else if self.peek() == Some('%') {
            let _ = self.consume();
            CssToken::Percentage { value, signed }
        } else {
            CssToken::Number {
                value,
                kind,
                signed,
            }
        }
    }

    /// [§ 4.3.12 Consume a number](https://www.w3.org/TR/css-syntax-3/#consume-number)
    ///
    /// "optional sign, integer part, optional `.digits`, optional exponent."
    fn consume_number(&mut self) -> (f32, NumericKind, bool) {
        let mut repr = String::new();
        let mut kind = NumericKind::Integer;
        let mut signed = false;

        if matches!(self.peek(), Some('+' | '-')) {
            signed = true;
            repr.push(self.consume().unwrap_or('+'));
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            repr.push(self.consume().unwrap_or('0'));
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            kind = NumericKind::Number;
            repr.push(self.consume().unwrap_or('.'));
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                repr.push(self.consume().unwrap_or('0'));
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let exponent_start = match self.peek_at(1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('+' | '-') => self.peek_at(2).is_some_and(|c| c.is_ascii_digit()),
                _ => false,
            };
            if exponent_start {
                kind = NumericKind::Number;
                repr.push(self.consume().unwrap_or('e'));
                if matches!(self.peek(), Some('+' | '-')) {
                    repr.push(self.consume().unwrap_or('+'));
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    repr.push(self.consume().unwrap_or('0'));
                }
            }
        }

        (repr.parse::<f32>().unwrap_or(0.0), kind, signed)
    }

    /// [§ 4.3.4 Consume an ident-like token](https://www.w3.org/TR/css-syntax-3/#consume-ident-like-token)
    ///
    /// Distinguishes plain identifiers, functions, and the unquoted
    /// `url(...)` form.
    fn consume_ident_like_token(&mut self) -> CssToken {
        let value = self.consume_ident_sequence();
        if value.eq_ignore_ascii_case("url") && self.peek() == Some('(') {
            let _ = self.consume();
            // "While the next two input code points are whitespace, consume."
            while self.peek().is_some_and(is_whitespace)
                && self.peek_at(1).is_some_and(is_whitespace)
            {
                let _ = self.consume();
            }
            if matches!(self.peek(), Some('"' | '\''))
                || (self.peek().is_some_and(is_whitespace)
                    && matches!(self.peek_at(1), Some('"' | '\'')))
            {
                CssToken::Function(value.to_ascii_lowercase())
            } else {
                self.consume_url_token()
            }
        } else if self.peek() == Some('(') {
            let _ = self.consume();
            CssToken::Function(value.to_ascii_lowercase())
        } else {
            CssToken::Ident(value)
        }
    }

    /// [§ 4.3.6 Consume a url token](https://www.w3.org/TR/css-syntax-3/#consume-url-token)
    fn consume_url_token(&mut self) -> CssToken {
        let mut value = String::new();
        while self.peek().is_some_and(is_whitespace) {
            let _ = self.consume();
        }
        loop {
            match self.consume() {
                Some(')') => return CssToken::Url(value),
                None => return CssToken::Url(value),
                Some(c) if is_whitespace(c) => {
                    while self.peek().is_some_and(is_whitespace) {
                        let _ = self.consume();
                    }
                    match self.consume() {
                        Some(')') | None => return CssToken::Url(value),
                        Some(_) => {
                            self.reconsume();
                            self.consume_bad_url_remnants();
                            return CssToken::BadUrl;
                        }
                    }
                }
                // "U+0022, U+0027, U+0028, or non-printable: this is a parse
                // error... return a <bad-url-token>."
                Some('"' | '\'' | '(') => {
                    self.consume_bad_url_remnants();
                    return CssToken::BadUrl;
                }
                Some('\\') => {
                    if self.is_valid_escape(Some('\\'), self.peek()) {
                        value.push(self.consume_escaped_code_point());
                    } else {
                        self.consume_bad_url_remnants();
                        return CssToken::BadUrl;
                    }
                }
                Some(c) if c.is_control() => {
                    self.consume_bad_url_remnants();
                    return CssToken::BadUrl;
                }
                Some(c) => value.push(c),
            }
        }
    }

    /// [§ 4.3.14 Consume the remnants of a bad url](https://www.w3.org/TR/css-syntax-3/#consume-remnants-of-bad-url)
    fn consume_bad_url_remnants(&mut self) {
        loop {
            match self.consume() {
                Some(')') | None => return,
                Some('\\') if self.peek().is_some_and(|c| c != '\n') => {
                    let _ = self.consume_escaped_code_point();
                }
                Some(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(input: &str) -> Vec<CssToken> {
        let mut tokenizer = CssTokenizer::new(input);
        tokenizer.run();
        tokenizer.into_tokens()
    }

    #[test]
    fn basic_rule_tokens() {
        let tokens = tokenize("p { color: red; }");
        assert_eq!(tokens[0], CssToken::Ident("p".into()));
        assert_eq!(tokens[1], CssToken::Whitespace);
        assert_eq!(tokens[2], CssToken::LeftBrace);
        assert!(tokens.contains(&CssToken::Colon));
        assert!(tokens.contains(&CssToken::Semicolon));
        assert!(tokens.contains(&CssToken::RightBrace));
    }

    #[test]
    fn numbers_percentages_dimensions() {
        let tokens = tokenize("12 1.5 -3px 50% +2em 6e2");
        assert_eq!(
            tokens[0],
            CssToken::Number {
                value: 12.0,
                kind: NumericKind::Integer,
                signed: false
            }
        );
        assert_eq!(
            tokens[2],
            CssToken::Number {
                value: 1.5,
                kind: NumericKind::Number,
                signed: false
            }
        );
        assert_eq!(
            tokens[4],
            CssToken::Dimension {
                value: -3.0,
                kind: NumericKind::Integer,
                unit: "px".into(),
                signed: true
            }
        );
        assert_eq!(
            tokens[6],
            CssToken::Percentage {
                value: 50.0,
                signed: false
            }
        );
        assert_eq!(
            tokens[8],
            CssToken::Dimension {
                value: 2.0,
                kind: NumericKind::Integer,
                unit: "em".into(),
                signed: true
            }
        );
        assert_eq!(
            tokens[10],
            CssToken::Number {
                value: 600.0,
                kind: NumericKind::Number,
                signed: false
            }
        );
    }

    #[test]
    fn hash_kinds() {
        let tokens = tokenize("#main #0af");
        assert_eq!(
            tokens[0],
            CssToken::Hash {
                value: "main".into(),
                kind: HashKind::Identifier
            }
        );
        assert_eq!(
            tokens[2],
            CssToken::Hash {
                value: "0af".into(),
                kind: HashKind::Unrestricted
            }
        );
    }

    #[test]
    fn comments_are_elided() {
        let tokens = tokenize("a/* comment */b");
        assert_eq!(tokens[0], CssToken::Ident("a".into()));
        assert_eq!(tokens[1], CssToken::Ident("b".into()));
    }

    #[test]
    fn unclosed_comment_swallows_to_eof() {
        let tokens = tokenize("a /* unclosed");
        assert_eq!(tokens[0], CssToken::Ident("a".into()));
        assert_eq!(tokens[1], CssToken::Whitespace);
        assert!(tokens[2].is_eof());
    }

    #[test]
    fn strings_and_bad_strings() {
        let tokens = tokenize("\"ok\" 'also' \"broken\nrest");
        assert_eq!(tokens[0], CssToken::String("ok".into()));
        assert_eq!(tokens[2], CssToken::String("also".into()));
        assert_eq!(tokens[4], CssToken::BadString);
    }

    #[test]
    fn unclosed_string_hits_eof() {
        let tokens = tokenize("\"open");
        assert_eq!(tokens[0], CssToken::String("open".into()));
    }

    #[test]
    fn escapes_resolve() {
        // "\41" is 'A'; trailing whitespace after the escape is consumed.
        let tokens = tokenize("\\41 b");
        assert_eq!(tokens[0], CssToken::Ident("Ab".into()));
        // Out-of-range and null escapes become U+FFFD.
        let tokens = tokenize("\\110000");
        assert_eq!(tokens[0], CssToken::Ident("\u{FFFD}".into()));
    }

    #[test]
    fn url_forms() {
        let tokens = tokenize("url(plain.png) url( spaced.png ) url(\"quoted.png\")");
        assert_eq!(tokens[0], CssToken::Url("plain.png".into()));
        assert_eq!(tokens[2], CssToken::Url("spaced.png".into()));
        // The quoted form stays a function token.
        assert_eq!(tokens[4], CssToken::Function("url".into()));
        assert_eq!(tokens[5], CssToken::String("quoted.png".into()));
    }

    #[test]
    fn bad_url_on_forbidden_code_points() {
        let tokens = tokenize("url(bro(ken)");
        assert_eq!(tokens[0], CssToken::BadUrl);
    }

    #[test]
    fn cdo_cdc() {
        let tokens = tokenize("<!-- a -->");
        assert_eq!(tokens[0], CssToken::CDO);
        assert_eq!(tokens[4], CssToken::CDC);
    }

    #[test]
    fn at_keyword_and_function() {
        let tokens = tokenize("@import rgb(1,2,3)");
        assert_eq!(tokens[0], CssToken::AtKeyword("import".into()));
        assert_eq!(tokens[2], CssToken::Function("rgb".into()));
    }

    #[test]
    fn signed_flag_feeds_an_plus_b() {
        let tokens = tokenize("2n+1");
        assert_eq!(
            tokens[0],
            CssToken::Dimension {
                value: 2.0,
                kind: NumericKind::Integer,
                unit: "n".into(),
                signed: false
            }
        );
        assert_eq!(
            tokens[1],
            CssToken::Number {
                value: 1.0,
                kind: NumericKind::Integer,
                signed: true
            }
        );
    }

    #[test]
    fn custom_property_ident() {
        let tokens = tokenize("--main-color");
        assert_eq!(tokens[0], CssToken::Ident("--main-color".into()));
    }
}
