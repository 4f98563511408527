//! The HTML tokenizer state machine.
//!
//! [§ 13.2.5 Tokenization](https://html.spec.whatwg.org/multipage/parsing.html#tokenization)
//!
//! "Implementations must act as if they used the following state machine to
//! tokenize HTML."
//!
//! Input discipline: CR and CRLF collapse to LF before dispatch
//! ([§ 13.2.3.5](https://html.spec.whatwg.org/multipage/parsing.html#preprocessing-the-input-stream));
//! null bytes in most states record a parse error but are still emitted or
//! replaced per the state's rules. Tokenization never aborts.

use strum_macros::Display;

use folio_common::warning::{warn_once, WarnKind};

use super::entities::{any_entity_has_prefix, lookup_entity};
use super::token::Token;

/// The tokenizer state machine. Each state corresponds to a subsection of
/// [§ 13.2.5](https://html.spec.whatwg.org/multipage/parsing.html#tokenization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TokenizerState {
    /// § 13.2.5.1 Data state.
    Data,
    /// § 13.2.5.2 RCDATA state.
    RCDATA,
    /// § 13.2.5.3 RAWTEXT state.
    RAWTEXT,
    /// § 13.2.5.4 Script data state.
    ScriptData,
    /// § 13.2.5.5 PLAINTEXT state.
    PLAINTEXT,
    /// § 13.2.5.6 Tag open state.
    TagOpen,
    /// § 13.2.5.7 End tag open state.
    EndTagOpen,
    /// § 13.2.5.8 Tag name state.
    TagName,
    /// § 13.2.5.9 RCDATA less-than sign state.
    RCDATALessThanSign,
    /// § 13.2.5.10 RCDATA end tag open state.
    RCDATAEndTagOpen,
    /// § 13.2.5.11 RCDATA end tag name state.
    RCDATAEndTagName,
    /// § 13.2.5.12 RAWTEXT less-than sign state.
    RAWTEXTLessThanSign,
    /// § 13.2.5.13 RAWTEXT end tag open state.
    RAWTEXTEndTagOpen,
    /// § 13.2.5.14 RAWTEXT end tag name state.
    RAWTEXTEndTagName,
    /// § 13.2.5.15 Script data less-than sign state.
    ScriptDataLessThanSign,
    /// § 13.2.5.16 Script data end tag open state.
    ScriptDataEndTagOpen,
    /// § 13.2.5.17 Script data end tag name state.
    ScriptDataEndTagName,
    /// § 13.2.5.18 Script data escape start state.
    ScriptDataEscapeStart,
    /// § 13.2.5.19 Script data escape start dash state.
    ScriptDataEscapeStartDash,
    /// § 13.2.5.20 Script data escaped state.
    ScriptDataEscaped,
    /// § 13.2.5.21 Script data escaped dash state.
    ScriptDataEscapedDash,
    /// § 13.2.5.22 Script data escaped dash dash state.
    ScriptDataEscapedDashDash,
    /// § 13.2.5.23 Script data escaped less-than sign state.
    ScriptDataEscapedLessThanSign,
    /// § 13.2.5.24 Script data escaped end tag open state.
    ScriptDataEscapedEndTagOpen,
    /// § 13.2.5.25 Script data escaped end tag name state.
    ScriptDataEscapedEndTagName,
    /// § 13.2.5.26 Script data double escape start state.
    ScriptDataDoubleEscapeStart,
    /// § 13.2.5.27 Script data double escaped state.
    ScriptDataDoubleEscaped,
    /// § 13.2.5.28 Script data double escaped dash state.
    ScriptDataDoubleEscapedDash,
    /// § 13.2.5.29 Script data double escaped dash dash state.
    ScriptDataDoubleEscapedDashDash,
    /// § 13.2.5.30 Script data double escaped less-than sign state.
    ScriptDataDoubleEscapedLessThanSign,
    /// § 13.2.5.31 Script data double escape end state.
    ScriptDataDoubleEscapeEnd,
    /// § 13.2.5.32 Before attribute name state.
    BeforeAttributeName,
    /// § 13.2.5.33 Attribute name state.
    AttributeName,
    /// § 13.2.5.34 After attribute name state.
    AfterAttributeName,
    /// § 13.2.5.35 Before attribute value state.
    BeforeAttributeValue,
    /// § 13.2.5.36 Attribute value (double-quoted) state.
    AttributeValueDoubleQuoted,
    /// § 13.2.5.37 Attribute value (single-quoted) state.
    AttributeValueSingleQuoted,
    /// § 13.2.5.38 Attribute value (unquoted) state.
    AttributeValueUnquoted,
    /// § 13.2.5.39 After attribute value (quoted) state.
    AfterAttributeValueQuoted,
    /// § 13.2.5.40 Self-closing start tag state.
    SelfClosingStartTag,
    /// § 13.2.5.41 Bogus comment state.
    BogusComment,
    /// § 13.2.5.42 Markup declaration open state.
    MarkupDeclarationOpen,
    /// § 13.2.5.43 Comment start state.
    CommentStart,
    /// § 13.2.5.44 Comment start dash state.
    CommentStartDash,
    /// § 13.2.5.45 Comment state.
    Comment,
    /// § 13.2.5.46 Comment less-than sign state.
    CommentLessThanSign,
    /// § 13.2.5.47 Comment less-than sign bang state.
    CommentLessThanSignBang,
    /// § 13.2.5.48 Comment less-than sign bang dash state.
    CommentLessThanSignBangDash,
    /// § 13.2.5.49 Comment less-than sign bang dash dash state.
    CommentLessThanSignBangDashDash,
    /// § 13.2.5.50 Comment end dash state.
    CommentEndDash,
    /// § 13.2.5.51 Comment end state.
    CommentEnd,
    /// § 13.2.5.52 Comment end bang state.
    CommentEndBang,
    /// § 13.2.5.53 DOCTYPE state.
    DOCTYPE,
    /// § 13.2.5.54 Before DOCTYPE name state.
    BeforeDOCTYPEName,
    /// § 13.2.5.55 DOCTYPE name state.
    DOCTYPEName,
    /// § 13.2.5.56 After DOCTYPE name state.
    AfterDOCTYPEName,
    /// § 13.2.5.57 After DOCTYPE public keyword state.
    AfterDOCTYPEPublicKeyword,
    /// § 13.2.5.58 Before DOCTYPE public identifier state.
    BeforeDOCTYPEPublicIdentifier,
    /// § 13.2.5.59 DOCTYPE public identifier (double-quoted) state.
    DOCTYPEPublicIdentifierDoubleQuoted,
    /// § 13.2.5.60 DOCTYPE public identifier (single-quoted) state.
    DOCTYPEPublicIdentifierSingleQuoted,
    /// § 13.2.5.61 After DOCTYPE public identifier state.
    AfterDOCTYPEPublicIdentifier,
    /// § 13.2.5.62 Between DOCTYPE public and system identifiers state.
    BetweenDOCTYPEPublicAndSystemIdentifiers,
    /// § 13.2.5.63 After DOCTYPE system keyword state.
    AfterDOCTYPESystemKeyword,
    /// § 13.2.5.64 Before DOCTYPE system identifier state.
    BeforeDOCTYPESystemIdentifier,
    /// § 13.2.5.65 DOCTYPE system identifier (double-quoted) state.
    DOCTYPESystemIdentifierDoubleQuoted,
    /// § 13.2.5.66 DOCTYPE system identifier (single-quoted) state.
    DOCTYPESystemIdentifierSingleQuoted,
    /// § 13.2.5.67 After DOCTYPE system identifier state.
    AfterDOCTYPESystemIdentifier,
    /// § 13.2.5.68 Bogus DOCTYPE state.
    BogusDOCTYPE,
    /// § 13.2.5.69 CDATA section state.
    CDATASection,
    /// § 13.2.5.70 CDATA section bracket state.
    CDATASectionBracket,
    /// § 13.2.5.71 CDATA section end state.
    CDATASectionEnd,
    /// § 13.2.5.72 Character reference state.
    CharacterReference,
    /// § 13.2.5.73 Named character reference state.
    NamedCharacterReference,
    /// § 13.2.5.74 Ambiguous ampersand state.
    AmbiguousAmpersand,
    /// § 13.2.5.75 Numeric character reference state.
    NumericCharacterReference,
    /// § 13.2.5.76 Hexadecimal character reference start state.
    HexadecimalCharacterReferenceStart,
    /// § 13.2.5.77 Decimal character reference start state.
    DecimalCharacterReferenceStart,
    /// § 13.2.5.78 Hexadecimal character reference state.
    HexadecimalCharacterReference,
    /// § 13.2.5.79 Decimal character reference state.
    DecimalCharacterReference,
    /// § 13.2.5.80 Numeric character reference end state.
    NumericCharacterReferenceEnd,
}

use TokenizerState as S;

/// The HTML tokenizer.
///
/// The initial state is the data state. The tree builder may force a
/// different content model via [`HtmlTokenizer::set_state`]; additionally,
/// because the token stream is produced before tree construction begins,
/// the tokenizer switches itself into RCDATA / RAWTEXT / script-data /
/// PLAINTEXT when it emits the start tags that require them (`<title>`,
/// `<textarea>`, `<style>`, `<script>`, `<plaintext>`, ...).
pub struct HtmlTokenizer {
    state: TokenizerState,
    return_state: TokenizerState,
    input: Vec<char>,
    pos: usize,
    current_char: Option<char>,
    // "Reconsume in the X state" sets this flag; the next loop iteration
    // re-dispatches the current character instead of consuming a new one.
    reconsume: bool,
    current_token: Option<Token>,
    tokens: Vec<Token>,

    /// "The last start tag token emitted is used... in the RCDATA, RAWTEXT,
    /// and script data states" for appropriate-end-tag detection.
    last_start_tag_name: Option<String>,

    /// "The temporary buffer" used by end-tag detection and character
    /// references.
    temporary_buffer: String,

    /// Accumulator for numeric character references.
    character_reference_code: u32,

    /// Count of parse errors recorded; consumed by the tree builder's
    /// diagnostics.
    parse_errors: usize,
}

impl HtmlTokenizer {
    /// Create a tokenizer over `content`. CR and CRLF are normalized to LF
    /// here so no state has to handle carriage returns.
    #[must_use]
    pub fn new(content: &str) -> Self {
        let mut input = Vec::with_capacity(content.len());
        let mut chars = content.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\r' {
                if chars.peek() == Some(&'\n') {
                    let _ = chars.next();
                }
                input.push('\n');
            } else {
                input.push(c);
            }
        }
        Self {
            state: S::Data,
            return_state: S::Data,
            input,
            pos: 0,
            current_char: None,
            reconsume: false,
            current_token: None,
            tokens: Vec::new(),
            last_start_tag_name: None,
            temporary_buffer: String::new(),
            character_reference_code: 0,
            parse_errors: 0,
        }
    }

    /// Run the machine until the end-of-file token is emitted.
    pub fn run(&mut self) {
        loop {
            let c = if self.reconsume {
                self.reconsume = false;
                self.current_char
            } else {
                self.consume()
            };
            self.step(c);
            if matches!(self.tokens.last(), Some(Token::EndOfFile)) {
                break;
            }
        }
    }

    /// Consume the tokenizer and return the token stream.
    #[must_use]
    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    /// The collected tokens.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Number of parse errors recorded.
    #[must_use]
    pub const fn parse_error_count(&self) -> usize {
        self.parse_errors
    }

    /// Force a content-model state. The tree builder uses this to switch the
    /// machine into RCDATA / RAWTEXT / script data / PLAINTEXT for the
    /// elements that require it.
    pub fn set_state(&mut self, state: TokenizerState) {
        self.state = state;
    }

    // ------------------------------------------------------------------
    // Input helpers
    // ------------------------------------------------------------------

    fn consume(&mut self) -> Option<char> {
        let c = self.input.get(self.pos).copied();
        if c.is_some() {
            self.pos += 1;
        }
        self.current_char = c;
        c
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    /// Case-insensitive match of the next characters (not yet consumed).
    fn next_few_are_ci(&self, target: &str) -> bool {
        target
            .chars()
            .enumerate()
            .all(|(i, t)| self.peek(i).is_some_and(|c| c.eq_ignore_ascii_case(&t)))
    }

    /// Exact match of the next characters (not yet consumed).
    fn next_few_are(&self, target: &str) -> bool {
        target
            .chars()
            .enumerate()
            .all(|(i, t)| self.peek(i) == Some(t))
    }

    fn skip(&mut self, count: usize) {
        self.pos += count;
    }

    // ------------------------------------------------------------------
    // State transitions and emission
    // ------------------------------------------------------------------

    const fn switch_to(&mut self, state: TokenizerState) {
        self.state = state;
    }

    const fn reconsume_in(&mut self, state: TokenizerState) {
        self.reconsume = true;
        self.state = state;
    }

    fn parse_error(&mut self, code: &str) {
        self.parse_errors += 1;
        warn_once(WarnKind::HtmlTokenizer, &format!("{code} near position {}", self.pos));
    }

    fn emit_char(&mut self, c: char) {
        self.tokens.push(Token::new_character(c));
    }

    fn emit_eof(&mut self) {
        self.tokens.push(Token::EndOfFile);
    }

    /// Emit the current token.
    ///
    /// For start tags this also records the last start tag name and performs
    /// the content-model switch the tree builder would otherwise request:
    /// the generic RCDATA / raw-text / script / plaintext parsing algorithms
    /// of [§ 13.2.6](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inhead)
    /// all begin by switching the tokenizer, and since this tokenizer runs
    /// ahead of the parser the switch happens at emit time.
    fn emit_current(&mut self) {
        let Some(token) = self.current_token.take() else {
            return;
        };
        if let Token::StartTag {
            ref name,
            self_closing,
            ..
        } = token
        {
            self.last_start_tag_name = Some(name.clone());
            if !self_closing {
                match name.as_str() {
                    "title" | "textarea" => self.switch_to(S::RCDATA),
                    "style" | "xmp" | "iframe" | "noembed" | "noframes" => {
                        self.switch_to(S::RAWTEXT);
                    }
                    "script" => self.switch_to(S::ScriptData),
                    "plaintext" => self.switch_to(S::PLAINTEXT),
                    _ => {}
                }
            }
        }
        self.tokens.push(token);
    }

    /// "An appropriate end tag token is an end tag token whose tag name
    /// matches the tag name of the last start tag to have been emitted from
    /// this tokenizer, if any."
    fn is_appropriate_end_tag(&self) -> bool {
        match (&self.last_start_tag_name, &self.current_token) {
            (Some(last), Some(Token::EndTag { name, .. })) => name == last,
            _ => false,
        }
    }

    /// "When the user agent leaves the attribute name state... the complete
    /// attribute's name must be compared to the other attributes on the same
    /// token; if there is already an attribute on the token with the exact
    /// same name... the new attribute must be removed from the token."
    fn check_duplicate_attribute(&mut self) {
        let duplicate = self
            .current_token
            .as_ref()
            .is_some_and(Token::current_attribute_name_is_duplicate);
        if duplicate {
            self.parse_error("duplicate-attribute");
            if let Some(token) = self.current_token.as_mut() {
                token.remove_current_attribute();
            }
        }
    }

    /// True when the pending character reference was started inside an
    /// attribute value.
    const fn charref_in_attribute(&self) -> bool {
        matches!(
            self.return_state,
            S::AttributeValueDoubleQuoted | S::AttributeValueSingleQuoted | S::AttributeValueUnquoted
        )
    }

    /// "Flush code points consumed as a character reference": append the
    /// temporary buffer to the attribute value, or emit it as character
    /// tokens.
    fn flush_code_points(&mut self) {
        let buffer = std::mem::take(&mut self.temporary_buffer);
        if self.charref_in_attribute() {
            if let Some(token) = self.current_token.as_mut() {
                token.append_str_to_attribute_value(&buffer);
            }
        } else {
            for c in buffer.chars() {
                self.emit_char(c);
            }
        }
    }

    /// Shared "anything else" path for the three end-tag-name states:
    /// emit `</`, the buffered characters, drop the tag token, and reconsume
    /// in `fallback`.
    fn abandon_end_tag(&mut self, fallback: TokenizerState) {
        self.emit_char('<');
        self.emit_char('/');
        let buffer = std::mem::take(&mut self.temporary_buffer);
        for c in buffer.chars() {
            self.emit_char(c);
        }
        self.current_token = None;
        self.reconsume_in(fallback);
    }

    /// End-tag-name handling shared by the RCDATA, RAWTEXT, script-data, and
    /// script-data-escaped pathways.
    fn step_end_tag_name(&mut self, c: Option<char>, fallback: TokenizerState) {
        match c {
            Some(' ' | '\t' | '\n' | '\x0C') if self.is_appropriate_end_tag() => {
                self.switch_to(S::BeforeAttributeName);
            }
            Some('/') if self.is_appropriate_end_tag() => self.switch_to(S::SelfClosingStartTag),
            Some('>') if self.is_appropriate_end_tag() => {
                self.switch_to(S::Data);
                self.emit_current();
            }
            Some(c) if c.is_ascii_alphabetic() => {
                if let Some(token) = self.current_token.as_mut() {
                    token.append_to_tag_name(c.to_ascii_lowercase());
                }
                self.temporary_buffer.push(c);
            }
            _ => self.abandon_end_tag(fallback),
        }
    }

    // ------------------------------------------------------------------
    // The dispatcher
    // ------------------------------------------------------------------

    #[allow(clippy::too_many_lines)]
    fn step(&mut self, c: Option<char>) {
        match self.state {
            S::Data => match c {
                Some('&') => {
                    self.return_state = S::Data;
                    self.switch_to(S::CharacterReference);
                }
                Some('<') => self.switch_to(S::TagOpen),
                Some('\0') => {
                    self.parse_error("unexpected-null-character");
                    self.emit_char('\0');
                }
                Some(c) => self.emit_char(c),
                None => self.emit_eof(),
            },

            S::RCDATA => match c {
                Some('&') => {
                    self.return_state = S::RCDATA;
                    self.switch_to(S::CharacterReference);
                }
                Some('<') => self.switch_to(S::RCDATALessThanSign),
                Some('\0') => {
                    self.parse_error("unexpected-null-character");
                    self.emit_char('\u{FFFD}');
                }
                Some(c) => self.emit_char(c),
                None => self.emit_eof(),
            },

            S::RAWTEXT => match c {
                Some('<') => self.switch_to(S::RAWTEXTLessThanSign),
                Some('\0') => {
                    self.parse_error("unexpected-null-character");
                    self.emit_char('\u{FFFD}');
                }
                Some(c) => self.emit_char(c),
                None => self.emit_eof(),
            },

            S::ScriptData => match c {
                Some('<') => self.switch_to(S::ScriptDataLessThanSign),
                Some('\0') => {
                    self.parse_error("unexpected-null-character");
                    self.emit_char('\u{FFFD}');
                }
                Some(c) => self.emit_char(c),
                None => self.emit_eof(),
            },

            S::PLAINTEXT => match c {
                Some('\0') => {
                    self.parse_error("unexpected-null-character");
                    self.emit_char('\u{FFFD}');
                }
                Some(c) => self.emit_char(c),
                None => self.emit_eof(),
            },

            S::TagOpen => match c {
                Some('!') => self.switch_to(S::MarkupDeclarationOpen),
                Some('/') => self.switch_to(S::EndTagOpen),
                Some(c) if c.is_ascii_alphabetic() => {
                    self.current_token = Some(Token::new_start_tag());
                    self.reconsume_in(S::TagName);
                }
                Some('?') => {
                    self.parse_error("unexpected-question-mark-instead-of-tag-name");
                    self.current_token = Some(Token::new_comment());
                    self.reconsume_in(S::BogusComment);
                }
                Some(_) => {
                    self.parse_error("invalid-first-character-of-tag-name");
                    self.emit_char('<');
                    self.reconsume_in(S::Data);
                }
                None => {
                    self.parse_error("eof-before-tag-name");
                    self.emit_char('<');
                    self.emit_eof();
                }
            },

            S::EndTagOpen => match c {
                Some(c) if c.is_ascii_alphabetic() => {
                    self.current_token = Some(Token::new_end_tag());
                    self.reconsume_in(S::TagName);
                }
                Some('>') => {
                    self.parse_error("missing-end-tag-name");
                    self.switch_to(S::Data);
                }
                Some(_) => {
                    self.parse_error("invalid-first-character-of-tag-name");
                    self.current_token = Some(Token::new_comment());
                    self.reconsume_in(S::BogusComment);
                }
                None => {
                    self.parse_error("eof-before-tag-name");
                    self.emit_char('<');
                    self.emit_char('/');
                    self.emit_eof();
                }
            },

            S::TagName => match c {
                Some(' ' | '\t' | '\n' | '\x0C') => self.switch_to(S::BeforeAttributeName),
                Some('/') => self.switch_to(S::SelfClosingStartTag),
                Some('>') => {
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                Some('\0') => {
                    self.parse_error("unexpected-null-character");
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_tag_name('\u{FFFD}');
                    }
                }
                Some(c) => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_tag_name(c.to_ascii_lowercase());
                    }
                }
                None => {
                    self.parse_error("eof-in-tag");
                    self.emit_eof();
                }
            },

            S::RCDATALessThanSign => match c {
                Some('/') => {
                    self.temporary_buffer.clear();
                    self.switch_to(S::RCDATAEndTagOpen);
                }
                _ => {
                    self.emit_char('<');
                    self.reconsume_in(S::RCDATA);
                }
            },

            S::RCDATAEndTagOpen => match c {
                Some(c) if c.is_ascii_alphabetic() => {
                    self.current_token = Some(Token::new_end_tag());
                    self.reconsume_in(S::RCDATAEndTagName);
                }
                _ => {
                    self.emit_char('<');
                    self.emit_char('/');
                    self.reconsume_in(S::RCDATA);
                }
            },

            S::RCDATAEndTagName => self.step_end_tag_name(c, S::RCDATA),

            S::RAWTEXTLessThanSign => match c {
                Some('/') => {
                    self.temporary_buffer.clear();
                    self.switch_to(S::RAWTEXTEndTagOpen);
                }
                _ => {
                    self.emit_char('<');
                    self.reconsume_in(S::RAWTEXT);
                }
            },

            S::RAWTEXTEndTagOpen => match c {
                Some(c) if c.is_ascii_alphabetic() => {
                    self.current_token = Some(Token::new_end_tag());
                    self.reconsume_in(S::RAWTEXTEndTagName);
                }
                _ => {
                    self.emit_char('<');
                    self.emit_char('/');
                    self.reconsume_in(S::RAWTEXT);
                }
            },

            S::RAWTEXTEndTagName => self.step_end_tag_name(c, S::RAWTEXT),

            S::ScriptDataLessThanSign => match c {
                Some('/') => {
                    self.temporary_buffer.clear();
                    self.switch_to(S::ScriptDataEndTagOpen);
                }
                Some('!') => {
                    self.switch_to(S::ScriptDataEscapeStart);
                    self.emit_char('<');
                    self.emit_char('!');
                }
                _ => {
                    self.emit_char('<');
                    self.reconsume_in(S::ScriptData);
                }
            },

            S::ScriptDataEndTagOpen => match c {
                Some(c) if c.is_ascii_alphabetic() => {
                    self.current_token = Some(Token::new_end_tag());
                    self.reconsume_in(S::ScriptDataEndTagName);
                }
                _ => {
                    self.emit_char('<');
                    self.emit_char('/');
                    self.reconsume_in(S::ScriptData);
                }
            },

            S::ScriptDataEndTagName => self.step_end_tag_name(c, S::ScriptData),

            S::ScriptDataEscapeStart => match c {
                Some('-') => {
                    self.switch_to(S::ScriptDataEscapeStartDash);
                    self.emit_char('-');
                }
                _ => self.reconsume_in(S::ScriptData),
            },

            S::ScriptDataEscapeStartDash => match c {
                Some('-') => {
                    self.switch_to(S::ScriptDataEscapedDashDash);
                    self.emit_char('-');
                }
                _ => self.reconsume_in(S::ScriptData),
            },

            S::ScriptDataEscaped => match c {
                Some('-') => {
                    self.switch_to(S::ScriptDataEscapedDash);
                    self.emit_char('-');
                }
                Some('<') => self.switch_to(S::ScriptDataEscapedLessThanSign),
                Some('\0') => {
                    self.parse_error("unexpected-null-character");
                    self.emit_char('\u{FFFD}');
                }
                Some(c) => self.emit_char(c),
                None => {
                    self.parse_error("eof-in-script-html-comment-like-text");
                    self.emit_eof();
                }
            },

            S::ScriptDataEscapedDash => match c {
                Some('-') => {
                    self.switch_to(S::ScriptDataEscapedDashDash);
                    self.emit_char('-');
                }
                Some('<') => self.switch_to(S::ScriptDataEscapedLessThanSign),
                Some('\0') => {
                    self.parse_error("unexpected-null-character");
                    self.switch_to(S::ScriptDataEscaped);
                    self.emit_char('\u{FFFD}');
                }
                Some(c) => {
                    self.switch_to(S::ScriptDataEscaped);
                    self.emit_char(c);
                }
                None => {
                    self.parse_error("eof-in-script-html-comment-like-text");
                    self.emit_eof();
                }
            },

            S::ScriptDataEscapedDashDash => match c {
                Some('-') => self.emit_char('-'),
                Some('<') => self.switch_to(S::ScriptDataEscapedLessThanSign),
                Some('>') => {
                    self.switch_to(S::ScriptData);
                    self.emit_char('>');
                }
                Some('\0') => {
                    self.parse_error("unexpected-null-character");
                    self.switch_to(S::ScriptDataEscaped);
                    self.emit_char('\u{FFFD}');
                }
                Some(c) => {
                    self.switch_to(S::ScriptDataEscaped);
                    self.emit_char(c);
                }
                None => {
                    self.parse_error("eof-in-script-html-comment-like-text");
                    self.emit_eof();
                }
            },

            S::ScriptDataEscapedLessThanSign => match c {
                Some('/') => {
                    self.temporary_buffer.clear();
                    self.switch_to(S::ScriptDataEscapedEndTagOpen);
                }
                Some(c) if c.is_ascii_alphabetic() => {
                    self.temporary_buffer.clear();
                    self.emit_char('<');
                    self.reconsume_in(S::ScriptDataDoubleEscapeStart);
                }
                _ => {
                    self.emit_char('<');
                    self.reconsume_in(S::ScriptDataEscaped);
                }
            },

            S::ScriptDataEscapedEndTagOpen => match c {
                Some(c) if c.is_ascii_alphabetic() => {
                    self.current_token = Some(Token::new_end_tag());
                    self.reconsume_in(S::ScriptDataEscapedEndTagName);
                }
                _ => {
                    self.emit_char('<');
                    self.emit_char('/');
                    self.reconsume_in(S::ScriptDataEscaped);
                }
            },

            S::ScriptDataEscapedEndTagName => self.step_end_tag_name(c, S::ScriptDataEscaped),

            S::ScriptDataDoubleEscapeStart => match c {
                Some(c @ (' ' | '\t' | '\n' | '\x0C' | '/' | '>')) => {
                    if self.temporary_buffer == "script" {
                        self.switch_to(S::ScriptDataDoubleEscaped);
                    } else {
                        self.switch_to(S::ScriptDataEscaped);
                    }
                    self.emit_char(c);
                }
                Some(c) if c.is_ascii_alphabetic() => {
                    self.temporary_buffer.push(c.to_ascii_lowercase());
                    self.emit_char(c);
                }
                _ => self.reconsume_in(S::ScriptDataEscaped),
            },

            S::ScriptDataDoubleEscaped => match c {
                Some('-') => {
                    self.switch_to(S::ScriptDataDoubleEscapedDash);
                    self.emit_char('-');
                }
                Some('<') => {
                    self.switch_to(S::ScriptDataDoubleEscapedLessThanSign);
                    self.emit_char('<');
                }
                Some('\0') => {
                    self.parse_error("unexpected-null-character");
                    self.emit_char('\u{FFFD}');
                }
                Some(c) => self.emit_char(c),
                None => {
                    self.parse_error("eof-in-script-html-comment-like-text");
                    self.emit_eof();
                }
            },

            S::ScriptDataDoubleEscapedDash => match c {
                Some('-') => {
                    self.switch_to(S::ScriptDataDoubleEscapedDashDash);
                    self.emit_char('-');
                }
                Some('<') => {
                    self.switch_to(S::ScriptDataDoubleEscapedLessThanSign);
                    self.emit_char('<');
                }
                Some('\0') => {
                    self.parse_error("unexpected-null-character");
                    self.switch_to(S::ScriptDataDoubleEscaped);
                    self.emit_char('\u{FFFD}');
                }
                Some(c) => {
                    self.switch_to(S::ScriptDataDoubleEscaped);
                    self.emit_char(c);
                }
                None => {
                    self.parse_error("eof-in-script-html-comment-like-text");
                    self.emit_eof();
                }
            },

            S::ScriptDataDoubleEscapedDashDash => match c {
                Some('-') => self.emit_char('-'),
                Some('<') => {
                    self.switch_to(S::ScriptDataDoubleEscapedLessThanSign);
                    self.emit_char('<');
                }
                Some('>') => {
                    self.switch_to(S::ScriptData);
                    self.emit_char('>');
                }
                Some('\0') => {
                    self.parse_error("unexpected-null-character");
                    self.switch_to(S::ScriptDataDoubleEscaped);
                    self.emit_char('\u{FFFD}');
                }
                Some(c) => {
                    self.switch_to(S::ScriptDataDoubleEscaped);
                    self.emit_char(c);
                }
                None => {
                    self.parse_error("eof-in-script-html-comment-like-text");
                    self.emit_eof();
                }
            },

            S::ScriptDataDoubleEscapedLessThanSign => match c {
                Some('/') => {
                    self.temporary_buffer.clear();
                    self.switch_to(S::ScriptDataDoubleEscapeEnd);
                    self.emit_char('/');
                }
                _ => self.reconsume_in(S::ScriptDataDoubleEscaped),
            },

            S::ScriptDataDoubleEscapeEnd => match c {
                Some(c @ (' ' | '\t' | '\n' | '\x0C' | '/' | '>')) => {
                    if self.temporary_buffer == "script" {
                        self.switch_to(S::ScriptDataEscaped);
                    } else {
                        self.switch_to(S::ScriptDataDoubleEscaped);
                    }
                    self.emit_char(c);
                }
                Some(c) if c.is_ascii_alphabetic() => {
                    self.temporary_buffer.push(c.to_ascii_lowercase());
                    self.emit_char(c);
                }
                _ => self.reconsume_in(S::ScriptDataDoubleEscaped),
            },

            S::BeforeAttributeName => match c {
                Some(' ' | '\t' | '\n' | '\x0C') => {}
                Some('/' | '>') | None => self.reconsume_in(S::AfterAttributeName),
                Some('=') => {
                    self.parse_error("unexpected-equals-sign-before-attribute-name");
                    if let Some(token) = self.current_token.as_mut() {
                        token.start_new_attribute();
                        token.append_to_attribute_name('=');
                    }
                    self.switch_to(S::AttributeName);
                }
                Some(_) => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.start_new_attribute();
                    }
                    self.reconsume_in(S::AttributeName);
                }
            },

            S::AttributeName => match c {
                Some(' ' | '\t' | '\n' | '\x0C' | '/' | '>') | None => {
                    self.check_duplicate_attribute();
                    self.reconsume_in(S::AfterAttributeName);
                }
                Some('=') => {
                    self.check_duplicate_attribute();
                    self.switch_to(S::BeforeAttributeValue);
                }
                Some('\0') => {
                    self.parse_error("unexpected-null-character");
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_attribute_name('\u{FFFD}');
                    }
                }
                Some(c @ ('"' | '\'' | '<')) => {
                    self.parse_error("unexpected-character-in-attribute-name");
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_attribute_name(c);
                    }
                }
                Some(c) => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_attribute_name(c.to_ascii_lowercase());
                    }
                }
            },

            S::AfterAttributeName => match c {
                Some(' ' | '\t' | '\n' | '\x0C') => {}
                Some('/') => self.switch_to(S::SelfClosingStartTag),
                Some('=') => self.switch_to(S::BeforeAttributeValue),
                Some('>') => {
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                Some(_) => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.start_new_attribute();
                    }
                    self.reconsume_in(S::AttributeName);
                }
                None => {
                    self.parse_error("eof-in-tag");
                    self.emit_eof();
                }
            },

            S::BeforeAttributeValue => match c {
                Some(' ' | '\t' | '\n' | '\x0C') => {}
                Some('"') => self.switch_to(S::AttributeValueDoubleQuoted),
                Some('\'') => self.switch_to(S::AttributeValueSingleQuoted),
                Some('>') => {
                    self.parse_error("missing-attribute-value");
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                _ => self.reconsume_in(S::AttributeValueUnquoted),
            },

            S::AttributeValueDoubleQuoted => match c {
                Some('"') => self.switch_to(S::AfterAttributeValueQuoted),
                Some('&') => {
                    self.return_state = S::AttributeValueDoubleQuoted;
                    self.switch_to(S::CharacterReference);
                }
                Some('\0') => {
                    self.parse_error("unexpected-null-character");
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_attribute_value('\u{FFFD}');
                    }
                }
                Some(c) => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_attribute_value(c);
                    }
                }
                None => {
                    self.parse_error("eof-in-tag");
                    self.emit_eof();
                }
            },

            S::AttributeValueSingleQuoted => match c {
                Some('\'') => self.switch_to(S::AfterAttributeValueQuoted),
                Some('&') => {
                    self.return_state = S::AttributeValueSingleQuoted;
                    self.switch_to(S::CharacterReference);
                }
                Some('\0') => {
                    self.parse_error("unexpected-null-character");
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_attribute_value('\u{FFFD}');
                    }
                }
                Some(c) => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_attribute_value(c);
                    }
                }
                None => {
                    self.parse_error("eof-in-tag");
                    self.emit_eof();
                }
            },

            S::AttributeValueUnquoted => match c {
                Some(' ' | '\t' | '\n' | '\x0C') => self.switch_to(S::BeforeAttributeName),
                Some('&') => {
                    self.return_state = S::AttributeValueUnquoted;
                    self.switch_to(S::CharacterReference);
                }
                Some('>') => {
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                Some('\0') => {
                    self.parse_error("unexpected-null-character");
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_attribute_value('\u{FFFD}');
                    }
                }
                Some(c @ ('"' | '\'' | '<' | '=' | '`')) => {
                    self.parse_error("unexpected-character-in-unquoted-attribute-value");
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_attribute_value(c);
                    }
                }
                Some(c) => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_attribute_value(c);
                    }
                }
                None => {
                    self.parse_error("eof-in-tag");
                    self.emit_eof();
                }
            },

            S::AfterAttributeValueQuoted => match c {
                Some(' ' | '\t' | '\n' | '\x0C') => self.switch_to(S::BeforeAttributeName),
                Some('/') => self.switch_to(S::SelfClosingStartTag),
                Some('>') => {
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                Some(_) => {
                    self.parse_error("missing-whitespace-between-attributes");
                    self.reconsume_in(S::BeforeAttributeName);
                }
                None => {
                    self.parse_error("eof-in-tag");
                    self.emit_eof();
                }
            },

            S::SelfClosingStartTag => match c {
                Some('>') => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_self_closing();
                    }
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                Some(_) => {
                    self.parse_error("unexpected-solidus-in-tag");
                    self.reconsume_in(S::BeforeAttributeName);
                }
                None => {
                    self.parse_error("eof-in-tag");
                    self.emit_eof();
                }
            },

            S::BogusComment => match c {
                Some('>') => {
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                Some('\0') => {
                    self.parse_error("unexpected-null-character");
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_comment('\u{FFFD}');
                    }
                }
                Some(c) => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_comment(c);
                    }
                }
                None => {
                    self.emit_current();
                    self.emit_eof();
                }
            },

            S::MarkupDeclarationOpen => {
                // The current character has been consumed; put it back and
                // do string lookahead from the unconsumed position.
                if c.is_some() {
                    self.pos -= 1;
                }
                if self.next_few_are("--") {
                    self.skip(2);
                    self.current_token = Some(Token::new_comment());
                    self.switch_to(S::CommentStart);
                } else if self.next_few_are_ci("DOCTYPE") {
                    self.skip(7);
                    self.switch_to(S::DOCTYPE);
                } else if self.next_few_are("[CDATA[") {
                    // In HTML content CDATA is a bogus comment whose data
                    // starts with "[CDATA[". Foreign-content CDATA would need
                    // tree-builder context this stage does not have.
                    self.skip(7);
                    self.parse_error("cdata-in-html-content");
                    let mut comment = Token::new_comment();
                    comment.append_str_to_comment("[CDATA[");
                    self.current_token = Some(comment);
                    self.switch_to(S::BogusComment);
                } else {
                    self.parse_error("incorrectly-opened-comment");
                    self.current_token = Some(Token::new_comment());
                    self.switch_to(S::BogusComment);
                }
            }

            S::CommentStart => match c {
                Some('-') => self.switch_to(S::CommentStartDash),
                Some('>') => {
                    self.parse_error("abrupt-closing-of-empty-comment");
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                _ => self.reconsume_in(S::Comment),
            },

            S::CommentStartDash => match c {
                Some('-') => self.switch_to(S::CommentEnd),
                Some('>') => {
                    self.parse_error("abrupt-closing-of-empty-comment");
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                Some(_) => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_comment('-');
                    }
                    self.reconsume_in(S::Comment);
                }
                None => {
                    self.parse_error("eof-in-comment");
                    self.emit_current();
                    self.emit_eof();
                }
            },

            S::Comment => match c {
                Some('<') => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_comment('<');
                    }
                    self.switch_to(S::CommentLessThanSign);
                }
                Some('-') => self.switch_to(S::CommentEndDash),
                Some('\0') => {
                    self.parse_error("unexpected-null-character");
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_comment('\u{FFFD}');
                    }
                }
                Some(c) => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_comment(c);
                    }
                }
                None => {
                    self.parse_error("eof-in-comment");
                    self.emit_current();
                    self.emit_eof();
                }
            },

            S::CommentLessThanSign => match c {
                Some('!') => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_comment('!');
                    }
                    self.switch_to(S::CommentLessThanSignBang);
                }
                Some('<') => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_comment('<');
                    }
                }
                _ => self.reconsume_in(S::Comment),
            },

            S::CommentLessThanSignBang => match c {
                Some('-') => self.switch_to(S::CommentLessThanSignBangDash),
                _ => self.reconsume_in(S::Comment),
            },

            S::CommentLessThanSignBangDash => match c {
                Some('-') => self.switch_to(S::CommentLessThanSignBangDashDash),
                _ => self.reconsume_in(S::CommentEndDash),
            },

            S::CommentLessThanSignBangDashDash => match c {
                Some('>') | None => self.reconsume_in(S::CommentEnd),
                Some(_) => {
                    self.parse_error("nested-comment");
                    self.reconsume_in(S::CommentEnd);
                }
            },

            S::CommentEndDash => match c {
                Some('-') => self.switch_to(S::CommentEnd),
                Some(_) => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_comment('-');
                    }
                    self.reconsume_in(S::Comment);
                }
                None => {
                    self.parse_error("eof-in-comment");
                    self.emit_current();
                    self.emit_eof();
                }
            },

            S::CommentEnd => match c {
                Some('>') => {
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                Some('!') => self.switch_to(S::CommentEndBang),
                Some('-') => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_comment('-');
                    }
                }
                Some(_) => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_str_to_comment("--");
                    }
                    self.reconsume_in(S::Comment);
                }
                None => {
                    self.parse_error("eof-in-comment");
                    self.emit_current();
                    self.emit_eof();
                }
            },

            S::CommentEndBang => match c {
                Some('-') => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_str_to_comment("--!");
                    }
                    self.switch_to(S::CommentEndDash);
                }
                Some('>') => {
                    self.parse_error("incorrectly-closed-comment");
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                Some(_) => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_str_to_comment("--!");
                    }
                    self.reconsume_in(S::Comment);
                }
                None => {
                    self.parse_error("eof-in-comment");
                    self.emit_current();
                    self.emit_eof();
                }
            },

            S::DOCTYPE => match c {
                Some(' ' | '\t' | '\n' | '\x0C') => self.switch_to(S::BeforeDOCTYPEName),
                Some('>') => self.reconsume_in(S::BeforeDOCTYPEName),
                Some(_) => {
                    self.parse_error("missing-whitespace-before-doctype-name");
                    self.reconsume_in(S::BeforeDOCTYPEName);
                }
                None => {
                    self.parse_error("eof-in-doctype");
                    let mut doctype = Token::new_doctype();
                    doctype.set_force_quirks();
                    self.tokens.push(doctype);
                    self.emit_eof();
                }
            },

            S::BeforeDOCTYPEName => match c {
                Some(' ' | '\t' | '\n' | '\x0C') => {}
                Some('\0') => {
                    self.parse_error("unexpected-null-character");
                    let mut doctype = Token::new_doctype();
                    doctype.append_to_doctype_name('\u{FFFD}');
                    self.current_token = Some(doctype);
                    self.switch_to(S::DOCTYPEName);
                }
                Some('>') => {
                    self.parse_error("missing-doctype-name");
                    let mut doctype = Token::new_doctype();
                    doctype.set_force_quirks();
                    self.current_token = Some(doctype);
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                Some(c) => {
                    let mut doctype = Token::new_doctype();
                    doctype.append_to_doctype_name(c.to_ascii_lowercase());
                    self.current_token = Some(doctype);
                    self.switch_to(S::DOCTYPEName);
                }
                None => {
                    self.parse_error("eof-in-doctype");
                    let mut doctype = Token::new_doctype();
                    doctype.set_force_quirks();
                    self.tokens.push(doctype);
                    self.emit_eof();
                }
            },

            S::DOCTYPEName => match c {
                Some(' ' | '\t' | '\n' | '\x0C') => self.switch_to(S::AfterDOCTYPEName),
                Some('>') => {
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                Some('\0') => {
                    self.parse_error("unexpected-null-character");
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_doctype_name('\u{FFFD}');
                    }
                }
                Some(c) => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.append_to_doctype_name(c.to_ascii_lowercase());
                    }
                }
                None => {
                    self.parse_error("eof-in-doctype");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_force_quirks();
                    }
                    self.emit_current();
                    self.emit_eof();
                }
            },

            S::AfterDOCTYPEName => match c {
                Some(' ' | '\t' | '\n' | '\x0C') => {}
                Some('>') => {
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                Some(current) => {
                    // Lookahead includes the already-consumed character.
                    if current.eq_ignore_ascii_case(&'p') && self.next_few_are_ci("UBLIC") {
                        self.skip(5);
                        self.switch_to(S::AfterDOCTYPEPublicKeyword);
                    } else if current.eq_ignore_ascii_case(&'s') && self.next_few_are_ci("YSTEM") {
                        self.skip(5);
                        self.switch_to(S::AfterDOCTYPESystemKeyword);
                    } else {
                        self.parse_error("invalid-character-sequence-after-doctype-name");
                        if let Some(token) = self.current_token.as_mut() {
                            token.set_force_quirks();
                        }
                        self.reconsume_in(S::BogusDOCTYPE);
                    }
                }
                None => {
                    self.parse_error("eof-in-doctype");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_force_quirks();
                    }
                    self.emit_current();
                    self.emit_eof();
                }
            },

            S::AfterDOCTYPEPublicKeyword => match c {
                Some(' ' | '\t' | '\n' | '\x0C') => {
                    self.switch_to(S::BeforeDOCTYPEPublicIdentifier);
                }
                Some('"') => {
                    self.parse_error("missing-whitespace-after-doctype-public-keyword");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_empty_public_identifier();
                    }
                    self.switch_to(S::DOCTYPEPublicIdentifierDoubleQuoted);
                }
                Some('\'') => {
                    self.parse_error("missing-whitespace-after-doctype-public-keyword");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_empty_public_identifier();
                    }
                    self.switch_to(S::DOCTYPEPublicIdentifierSingleQuoted);
                }
                Some('>') => {
                    self.parse_error("missing-doctype-public-identifier");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_force_quirks();
                    }
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                Some(_) => {
                    self.parse_error("missing-quote-before-doctype-public-identifier");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_force_quirks();
                    }
                    self.reconsume_in(S::BogusDOCTYPE);
                }
                None => {
                    self.parse_error("eof-in-doctype");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_force_quirks();
                    }
                    self.emit_current();
                    self.emit_eof();
                }
            },

            S::BeforeDOCTYPEPublicIdentifier => match c {
                Some(' ' | '\t' | '\n' | '\x0C') => {}
                Some('"') => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_empty_public_identifier();
                    }
                    self.switch_to(S::DOCTYPEPublicIdentifierDoubleQuoted);
                }
                Some('\'') => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_empty_public_identifier();
                    }
                    self.switch_to(S::DOCTYPEPublicIdentifierSingleQuoted);
                }
                Some('>') => {
                    self.parse_error("missing-doctype-public-identifier");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_force_quirks();
                    }
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                Some(_) => {
                    self.parse_error("missing-quote-before-doctype-public-identifier");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_force_quirks();
                    }
                    self.reconsume_in(S::BogusDOCTYPE);
                }
                None => {
                    self.parse_error("eof-in-doctype");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_force_quirks();
                    }
                    self.emit_current();
                    self.emit_eof();
                }
            },

            S::DOCTYPEPublicIdentifierDoubleQuoted | S::DOCTYPEPublicIdentifierSingleQuoted => {
                let quote = if self.state == S::DOCTYPEPublicIdentifierDoubleQuoted {
                    '"'
                } else {
                    '\''
                };
                match c {
                    Some(c) if c == quote => self.switch_to(S::AfterDOCTYPEPublicIdentifier),
                    Some('\0') => {
                        self.parse_error("unexpected-null-character");
                        if let Some(token) = self.current_token.as_mut() {
                            token.append_to_public_identifier('\u{FFFD}');
                        }
                    }
                    Some('>') => {
                        self.parse_error("abrupt-doctype-public-identifier");
                        if let Some(token) = self.current_token.as_mut() {
                            token.set_force_quirks();
                        }
                        self.switch_to(S::Data);
                        self.emit_current();
                    }
                    Some(c) => {
                        if let Some(token) = self.current_token.as_mut() {
                            token.append_to_public_identifier(c);
                        }
                    }
                    None => {
                        self.parse_error("eof-in-doctype");
                        if let Some(token) = self.current_token.as_mut() {
                            token.set_force_quirks();
                        }
                        self.emit_current();
                        self.emit_eof();
                    }
                }
            }

            S::AfterDOCTYPEPublicIdentifier => match c {
                Some(' ' | '\t' | '\n' | '\x0C') => {
                    self.switch_to(S::BetweenDOCTYPEPublicAndSystemIdentifiers);
                }
                Some('>') => {
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                Some('"') => {
                    self.parse_error("missing-whitespace-between-doctype-public-and-system-identifiers");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_empty_system_identifier();
                    }
                    self.switch_to(S::DOCTYPESystemIdentifierDoubleQuoted);
                }
                Some('\'') => {
                    self.parse_error("missing-whitespace-between-doctype-public-and-system-identifiers");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_empty_system_identifier();
                    }
                    self.switch_to(S::DOCTYPESystemIdentifierSingleQuoted);
                }
                Some(_) => {
                    self.parse_error("missing-quote-before-doctype-system-identifier");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_force_quirks();
                    }
                    self.reconsume_in(S::BogusDOCTYPE);
                }
                None => {
                    self.parse_error("eof-in-doctype");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_force_quirks();
                    }
                    self.emit_current();
                    self.emit_eof();
                }
            },

            S::BetweenDOCTYPEPublicAndSystemIdentifiers => match c {
                Some(' ' | '\t' | '\n' | '\x0C') => {}
                Some('>') => {
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                Some('"') => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_empty_system_identifier();
                    }
                    self.switch_to(S::DOCTYPESystemIdentifierDoubleQuoted);
                }
                Some('\'') => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_empty_system_identifier();
                    }
                    self.switch_to(S::DOCTYPESystemIdentifierSingleQuoted);
                }
                Some(_) => {
                    self.parse_error("missing-quote-before-doctype-system-identifier");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_force_quirks();
                    }
                    self.reconsume_in(S::BogusDOCTYPE);
                }
                None => {
                    self.parse_error("eof-in-doctype");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_force_quirks();
                    }
                    self.emit_current();
                    self.emit_eof();
                }
            },

            S::AfterDOCTYPESystemKeyword => match c {
                Some(' ' | '\t' | '\n' | '\x0C') => {
                    self.switch_to(S::BeforeDOCTYPESystemIdentifier);
                }
                Some('"') => {
                    self.parse_error("missing-whitespace-after-doctype-system-keyword");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_empty_system_identifier();
                    }
                    self.switch_to(S::DOCTYPESystemIdentifierDoubleQuoted);
                }
                Some('\'') => {
                    self.parse_error("missing-whitespace-after-doctype-system-keyword");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_empty_system_identifier();
                    }
                    self.switch_to(S::DOCTYPESystemIdentifierSingleQuoted);
                }
                Some('>') => {
                    self.parse_error("missing-doctype-system-identifier");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_force_quirks();
                    }
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                Some(_) => {
                    self.parse_error("missing-quote-before-doctype-system-identifier");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_force_quirks();
                    }
                    self.reconsume_in(S::BogusDOCTYPE);
                }
                None => {
                    self.parse_error("eof-in-doctype");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_force_quirks();
                    }
                    self.emit_current();
                    self.emit_eof();
                }
            },

            S::BeforeDOCTYPESystemIdentifier => match c {
                Some(' ' | '\t' | '\n' | '\x0C') => {}
                Some('"') => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_empty_system_identifier();
                    }
                    self.switch_to(S::DOCTYPESystemIdentifierDoubleQuoted);
                }
                Some('\'') => {
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_empty_system_identifier();
                    }
                    self.switch_to(S::DOCTYPESystemIdentifierSingleQuoted);
                }
                Some('>') => {
                    self.parse_error("missing-doctype-system-identifier");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_force_quirks();
                    }
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                Some(_) => {
                    self.parse_error("missing-quote-before-doctype-system-identifier");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_force_quirks();
                    }
                    self.reconsume_in(S::BogusDOCTYPE);
                }
                None => {
                    self.parse_error("eof-in-doctype");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_force_quirks();
                    }
                    self.emit_current();
                    self.emit_eof();
                }
            },

            S::DOCTYPESystemIdentifierDoubleQuoted | S::DOCTYPESystemIdentifierSingleQuoted => {
                let quote = if self.state == S::DOCTYPESystemIdentifierDoubleQuoted {
                    '"'
                } else {
                    '\''
                };
                match c {
                    Some(c) if c == quote => self.switch_to(S::AfterDOCTYPESystemIdentifier),
                    Some('\0') => {
                        self.parse_error("unexpected-null-character");
                        if let Some(token) = self.current_token.as_mut() {
                            token.append_to_system_identifier('\u{FFFD}');
                        }
                    }
                    Some('>') => {
                        self.parse_error("abrupt-doctype-system-identifier");
                        if let Some(token) = self.current_token.as_mut() {
                            token.set_force_quirks();
                        }
                        self.switch_to(S::Data);
                        self.emit_current();
                    }
                    Some(c) => {
                        if let Some(token) = self.current_token.as_mut() {
                            token.append_to_system_identifier(c);
                        }
                    }
                    None => {
                        self.parse_error("eof-in-doctype");
                        if let Some(token) = self.current_token.as_mut() {
                            token.set_force_quirks();
                        }
                        self.emit_current();
                        self.emit_eof();
                    }
                }
            }

            S::AfterDOCTYPESystemIdentifier => match c {
                Some(' ' | '\t' | '\n' | '\x0C') => {}
                Some('>') => {
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                Some(_) => {
                    self.parse_error("unexpected-character-after-doctype-system-identifier");
                    // Force-quirks stays off on this path.
                    self.reconsume_in(S::BogusDOCTYPE);
                }
                None => {
                    self.parse_error("eof-in-doctype");
                    if let Some(token) = self.current_token.as_mut() {
                        token.set_force_quirks();
                    }
                    self.emit_current();
                    self.emit_eof();
                }
            },

            S::BogusDOCTYPE => match c {
                Some('>') => {
                    self.switch_to(S::Data);
                    self.emit_current();
                }
                Some('\0') => self.parse_error("unexpected-null-character"),
                Some(_) => {}
                None => {
                    self.emit_current();
                    self.emit_eof();
                }
            },

            S::CDATASection => match c {
                Some(']') => self.switch_to(S::CDATASectionBracket),
                Some(c) => self.emit_char(c),
                None => {
                    self.parse_error("eof-in-cdata");
                    self.emit_eof();
                }
            },

            S::CDATASectionBracket => match c {
                Some(']') => self.switch_to(S::CDATASectionEnd),
                _ => {
                    self.emit_char(']');
                    self.reconsume_in(S::CDATASection);
                }
            },

            S::CDATASectionEnd => match c {
                Some(']') => self.emit_char(']'),
                Some('>') => self.switch_to(S::Data),
                _ => {
                    self.emit_char(']');
                    self.emit_char(']');
                    self.reconsume_in(S::CDATASection);
                }
            },

            S::CharacterReference => {
                self.temporary_buffer.clear();
                self.temporary_buffer.push('&');
                match c {
                    Some(c) if c.is_ascii_alphanumeric() => {
                        self.reconsume_in(S::NamedCharacterReference);
                    }
                    Some('#') => {
                        self.temporary_buffer.push('#');
                        self.switch_to(S::NumericCharacterReference);
                    }
                    _ => {
                        self.flush_code_points();
                        self.reconsume_in(self.return_state);
                    }
                }
            }

            S::NamedCharacterReference => self.step_named_character_reference(),

            S::AmbiguousAmpersand => match c {
                Some(c) if c.is_ascii_alphanumeric() => {
                    if self.charref_in_attribute() {
                        if let Some(token) = self.current_token.as_mut() {
                            token.append_to_attribute_value(c);
                        }
                    } else {
                        self.emit_char(c);
                    }
                }
                Some(';') => {
                    self.parse_error("unknown-named-character-reference");
                    self.reconsume_in(self.return_state);
                }
                _ => self.reconsume_in(self.return_state),
            },

            S::NumericCharacterReference => {
                self.character_reference_code = 0;
                match c {
                    Some(c @ ('x' | 'X')) => {
                        self.temporary_buffer.push(c);
                        self.switch_to(S::HexadecimalCharacterReferenceStart);
                    }
                    _ => self.reconsume_in(S::DecimalCharacterReferenceStart),
                }
            }

            S::HexadecimalCharacterReferenceStart => match c {
                Some(c) if c.is_ascii_hexdigit() => {
                    self.reconsume_in(S::HexadecimalCharacterReference);
                }
                _ => {
                    self.parse_error("absence-of-digits-in-numeric-character-reference");
                    self.flush_code_points();
                    self.reconsume_in(self.return_state);
                }
            },

            S::DecimalCharacterReferenceStart => match c {
                Some(c) if c.is_ascii_digit() => {
                    self.reconsume_in(S::DecimalCharacterReference);
                }
                _ => {
                    self.parse_error("absence-of-digits-in-numeric-character-reference");
                    self.flush_code_points();
                    self.reconsume_in(self.return_state);
                }
            },

            S::HexadecimalCharacterReference => match c {
                Some(c) if c.is_ascii_hexdigit() => {
                    self.character_reference_code = self
                        .character_reference_code
                        .saturating_mul(16)
                        .saturating_add(c.to_digit(16).unwrap_or(0));
                }
                Some(';') => self.switch_to(S::NumericCharacterReferenceEnd),
                _ => {
                    self.parse_error("missing-semicolon-after-character-reference");
                    self.reconsume_in(S::NumericCharacterReferenceEnd);
                }
            },

            S::DecimalCharacterReference => match c {
                Some(c) if c.is_ascii_digit() => {
                    self.character_reference_code = self
                        .character_reference_code
                        .saturating_mul(10)
                        .saturating_add(c.to_digit(10).unwrap_or(0));
                }
                Some(';') => self.switch_to(S::NumericCharacterReferenceEnd),
                _ => {
                    self.parse_error("missing-semicolon-after-character-reference");
                    self.reconsume_in(S::NumericCharacterReferenceEnd);
                }
            },

            S::NumericCharacterReferenceEnd => {
                // This state consumes nothing: the character the driver
                // handed us belongs to the return state, so it is reconsumed
                // there after the reference is resolved.
                let resolved = self.resolve_numeric_reference();
                self.temporary_buffer.clear();
                self.temporary_buffer.push_str(&resolved);
                self.flush_code_points();
                self.reconsume_in(self.return_state);
            }
        }
    }

    /// § 13.2.5.73: find the longest entity name matching at the current
    /// position, then apply the attribute-context legacy rule.
    fn step_named_character_reference(&mut self) {
        // The driver consumed one character to get here; include it in the
        // lookahead window.
        self.pos -= 1;

        let mut candidate = String::new();
        let mut best: Option<(usize, &'static str)> = None;
        let mut index = 0;
        while let Some(c) = self.peek(index) {
            if !(c.is_ascii_alphanumeric() || c == ';') {
                break;
            }
            candidate.push(c);
            if !any_entity_has_prefix(&candidate) {
                break;
            }
            if let Some(replacement) = lookup_entity(&candidate) {
                best = Some((candidate.len(), replacement));
            }
            if c == ';' {
                break;
            }
            index += 1;
        }

        if let Some((length, replacement)) = best {
            let matched: String = (0..length).filter_map(|i| self.peek(i)).collect();
            let ends_with_semicolon = matched.ends_with(';');
            let next_after = self.peek(length);

            // "If the character reference was consumed as part of an
            // attribute, and the last character matched is not ';', and the
            // next input character is '=' or an ASCII alphanumeric, then...
            // flush code points consumed as a character reference and switch
            // to the return state."
            if self.charref_in_attribute()
                && !ends_with_semicolon
                && next_after.is_some_and(|c| c == '=' || c.is_ascii_alphanumeric())
            {
                self.skip(length);
                self.temporary_buffer.push_str(&matched);
                self.flush_code_points();
                self.switch_to(self.return_state);
                return;
            }

            if !ends_with_semicolon {
                self.parse_error("missing-semicolon-after-character-reference");
            }
            self.skip(length);
            self.temporary_buffer.clear();
            self.temporary_buffer.push_str(replacement);
            self.flush_code_points();
            self.switch_to(self.return_state);
        } else {
            // No match: flush the "&" and let the ambiguous-ampersand state
            // pass the name characters through one at a time.
            self.flush_code_points();
            self.switch_to(S::AmbiguousAmpersand);
        }
    }

    /// § 13.2.5.80: map the accumulated numeric reference to its character.
    fn resolve_numeric_reference(&mut self) -> String {
        let code = self.character_reference_code;

        // C1 controls get the Windows-1252 remapping.
        const C1_REPLACEMENTS: &[(u32, char)] = &[
            (0x80, '\u{20AC}'),
            (0x82, '\u{201A}'),
            (0x83, '\u{0192}'),
            (0x84, '\u{201E}'),
            (0x85, '\u{2026}'),
            (0x86, '\u{2020}'),
            (0x87, '\u{2021}'),
            (0x88, '\u{02C6}'),
            (0x89, '\u{2030}'),
            (0x8A, '\u{0160}'),
            (0x8B, '\u{2039}'),
            (0x8C, '\u{0152}'),
            (0x8E, '\u{017D}'),
            (0x91, '\u{2018}'),
            (0x92, '\u{2019}'),
            (0x93, '\u{201C}'),
            (0x94, '\u{201D}'),
            (0x95, '\u{2022}'),
            (0x96, '\u{2013}'),
            (0x97, '\u{2014}'),
            (0x98, '\u{02DC}'),
            (0x99, '\u{2122}'),
            (0x9A, '\u{0161}'),
            (0x9B, '\u{203A}'),
            (0x9C, '\u{0153}'),
            (0x9E, '\u{017E}'),
            (0x9F, '\u{0178}'),
        ];

        if code == 0 {
            self.parse_error("null-character-reference");
            return '\u{FFFD}'.to_string();
        }
        if code > 0x0010_FFFF {
            self.parse_error("character-reference-outside-unicode-range");
            return '\u{FFFD}'.to_string();
        }
        if (0xD800..=0xDFFF).contains(&code) {
            self.parse_error("surrogate-character-reference");
            return '\u{FFFD}'.to_string();
        }
        if let Some(&(_, replacement)) = C1_REPLACEMENTS.iter().find(|&&(c1, _)| c1 == code) {
            self.parse_error("control-character-reference");
            return replacement.to_string();
        }
        match char::from_u32(code) {
            Some(c) => c.to_string(),
            None => '\u{FFFD}'.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::Token;

    fn tokenize(input: &str) -> Vec<Token> {
        let mut tokenizer = HtmlTokenizer::new(input);
        tokenizer.run();
        tokenizer.into_tokens()
    }

    fn text_of(tokens: &[Token]) -> String {
        tokens
            .iter()
            .filter_map(|t| match t {
                Token::Character { data } | Token::SpaceCharacter { data } => Some(*data),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn simple_start_tag_with_attributes() {
        let tokens = tokenize("<div id=\"a\" class=x>");
        match &tokens[0] {
            Token::StartTag {
                name, attributes, ..
            } => {
                assert_eq!(name, "div");
                assert_eq!(attributes.len(), 2);
                assert_eq!(attributes[0].name, "id");
                assert_eq!(attributes[0].value, "a");
                assert_eq!(attributes[1].name, "class");
                assert_eq!(attributes[1].value, "x");
            }
            other => panic!("expected start tag, got {other}"),
        }
    }

    #[test]
    fn tag_names_are_lowercased() {
        let tokens = tokenize("<DiV></DIV>");
        assert_eq!(tokens[0].tag_name(), Some("div"));
        assert_eq!(tokens[1].tag_name(), Some("div"));
    }

    #[test]
    fn duplicate_attribute_dropped() {
        let tokens = tokenize("<input type=a type=b>");
        match &tokens[0] {
            Token::StartTag { attributes, .. } => {
                assert_eq!(attributes.len(), 1);
                assert_eq!(attributes[0].value, "a");
            }
            other => panic!("expected start tag, got {other}"),
        }
    }

    #[test]
    fn space_characters_are_distinct_tokens() {
        let tokens = tokenize("a b");
        assert!(matches!(tokens[0], Token::Character { data: 'a' }));
        assert!(matches!(tokens[1], Token::SpaceCharacter { data: ' ' }));
        assert!(matches!(tokens[2], Token::Character { data: 'b' }));
    }

    #[test]
    fn crlf_collapses_to_lf() {
        let tokens = tokenize("a\r\nb\rc");
        assert_eq!(text_of(&tokens), "a\nb\nc");
    }

    #[test]
    fn named_entity_resolution() {
        assert_eq!(text_of(&tokenize("a&amp;b")), "a&b");
        assert_eq!(text_of(&tokenize("x&mdash;y")), "x\u{2014}y");
    }

    #[test]
    fn legacy_entity_without_semicolon() {
        assert_eq!(text_of(&tokenize("a&ampb")), "a&b");
    }

    #[test]
    fn entity_in_attribute_value_with_trailing_equals_is_literal() {
        // Historical rule: "&not=" inside an attribute stays literal.
        let tokens = tokenize("<a href=\"?a&amp=1\">");
        match &tokens[0] {
            Token::StartTag { attributes, .. } => {
                assert_eq!(attributes[0].value, "?a&amp=1");
            }
            other => panic!("expected start tag, got {other}"),
        }
    }

    #[test]
    fn numeric_character_references() {
        assert_eq!(text_of(&tokenize("&#65;&#x42;")), "AB");
        // Null and out-of-range map to U+FFFD.
        assert_eq!(text_of(&tokenize("&#0;")), "\u{FFFD}");
        assert_eq!(text_of(&tokenize("&#x110000;")), "\u{FFFD}");
        // C1 control remapping.
        assert_eq!(text_of(&tokenize("&#x80;")), "\u{20AC}");
    }

    #[test]
    fn comment_tokenization() {
        let tokens = tokenize("<!-- hello -->");
        assert!(matches!(&tokens[0], Token::Comment { data } if data == " hello "));
    }

    #[test]
    fn unclosed_comment_is_emitted_at_eof() {
        let tokens = tokenize("<!-- oops");
        assert!(matches!(&tokens[0], Token::Comment { data } if data == " oops"));
        assert!(tokens[1].is_eof());
    }

    #[test]
    fn cdata_in_html_content_becomes_bogus_comment() {
        let tokens = tokenize("<![CDATA[x]]>");
        assert!(matches!(&tokens[0], Token::Comment { data } if data == "[CDATA[x]]"));
    }

    #[test]
    fn doctype_with_identifiers() {
        let tokens = tokenize(
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD HTML 4.01//EN\" \"http://www.w3.org/TR/html4/strict.dtd\">",
        );
        match &tokens[0] {
            Token::Doctype {
                name,
                public_identifier,
                system_identifier,
                force_quirks,
            } => {
                assert_eq!(name.as_deref(), Some("html"));
                assert_eq!(public_identifier.as_deref(), Some("-//W3C//DTD HTML 4.01//EN"));
                assert_eq!(
                    system_identifier.as_deref(),
                    Some("http://www.w3.org/TR/html4/strict.dtd")
                );
                assert!(!force_quirks);
            }
            other => panic!("expected doctype, got {other}"),
        }
    }

    #[test]
    fn malformed_doctype_forces_quirks() {
        let tokens = tokenize("<!DOCTYPE>");
        assert!(matches!(
            &tokens[0],
            Token::Doctype {
                force_quirks: true,
                ..
            }
        ));
    }

    #[test]
    fn rcdata_keeps_markup_as_text() {
        let tokens = tokenize("<title>a<b>c</title>");
        let text: String = text_of(&tokens);
        assert_eq!(text, "a<b>c");
        assert_eq!(tokens.last().map(Token::is_eof), Some(true));
    }

    #[test]
    fn rawtext_style_content() {
        let tokens = tokenize("<style>p < q { }</style>");
        assert_eq!(text_of(&tokens), "p < q { }");
    }

    #[test]
    fn script_data_comment_like_content() {
        // "<!--" inside script data enters the escaped pathway and the
        // content comes out as characters.
        let tokens = tokenize("<script><!-- if (a<b) --></script>");
        assert_eq!(text_of(&tokens), "<!-- if (a<b) -->");
        assert!(matches!(&tokens[0], Token::StartTag { name, .. } if name == "script"));
        assert!(
            tokens
                .iter()
                .any(|t| matches!(t, Token::EndTag { name, .. } if name == "script"))
        );
    }

    #[test]
    fn script_double_escape() {
        let tokens = tokenize("<script><!--<script>x</script>--></script>");
        assert!(
            tokens
                .iter()
                .any(|t| matches!(t, Token::EndTag { name, .. } if name == "script"))
        );
    }

    #[test]
    fn plaintext_consumes_everything() {
        let tokens = tokenize("<plaintext></plaintext><p>");
        assert_eq!(text_of(&tokens), "</plaintext><p>");
    }

    #[test]
    fn self_closing_flag() {
        let tokens = tokenize("<br/>");
        assert!(matches!(
            &tokens[0],
            Token::StartTag {
                self_closing: true,
                ..
            }
        ));
    }

    #[test]
    fn unclosed_string_like_attribute_hits_eof() {
        let tokens = tokenize("<a href=\"x");
        // EOF in a tag drops the tag and emits only EOF.
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_eof());
    }
}
