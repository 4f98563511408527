//! Token stream round-trip laws.
//!
//! Tokenize-then-serialize is idempotent on the token subset that has a
//! canonical textual form: idents, numbers, dimensions, strings, hashes,
//! and delims. Serializing a token stream and re-tokenizing it must yield
//! the same stream.

use folio_css::tokenizer::{CssToken, CssTokenizer};

fn tokenize(input: &str) -> Vec<CssToken> {
    let mut tokenizer = CssTokenizer::new(input);
    tokenizer.run();
    tokenizer.into_tokens()
}

fn untokenize(tokens: &[CssToken]) -> String {
    tokens
        .iter()
        .filter(|t| !t.is_eof())
        .map(ToString::to_string)
        .collect()
}

fn assert_round_trip(input: &str) {
    let first = tokenize(input);
    let text = untokenize(&first);
    let second = tokenize(&text);
    assert_eq!(first, second, "round-trip diverged for {input:?}");
}

#[test]
fn idents_round_trip() {
    assert_round_trip("alpha beta-gamma _delta --custom");
}

#[test]
fn numbers_round_trip() {
    assert_round_trip("0 1 12.5 100 0.25");
}

#[test]
fn dimensions_round_trip() {
    assert_round_trip("10px 1.5em 12pt 80vw 0.5turn");
}

#[test]
fn strings_round_trip() {
    assert_round_trip("\"hello\" \"two words\" \"punct.,:;\"");
}

#[test]
fn hashes_round_trip() {
    assert_round_trip("#main #a1b2c3 #fff");
}

#[test]
fn delims_round_trip() {
    assert_round_trip("* > ~ | ^ $ = !");
}

#[test]
fn mixed_declaration_round_trips() {
    assert_round_trip("margin:10px 2em \"serif\" #abc *");
}

#[test]
fn whitespace_collapses_to_one_token() {
    let tokens = tokenize("a   \t\n  b");
    assert_eq!(
        tokens,
        vec![
            CssToken::Ident("a".into()),
            CssToken::Whitespace,
            CssToken::Ident("b".into()),
            CssToken::EndOfFile,
        ]
    );
}
