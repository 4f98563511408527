//! Preserved-token stream with transactional lookahead.
//!
//! [§ 5 Parsing](https://www.w3.org/TR/css-syntax-3/#parsing)
//!
//! "The input to the parsing stage is a stream of tokens from the
//! tokenization stage." The stream is random-access enough to support
//! skipping a matched block (`consume_block`) or one component value
//! (`consume_component`), and a [`StreamGuard`] gives parsers speculative
//! lookahead: commit with `release`, otherwise the stream rewinds on drop.

use super::token::CssToken;

/// A cursor over a tokenized stylesheet fragment.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<CssToken>,
    position: usize,
}

impl TokenStream {
    /// Wrap a token list. A trailing `EndOfFile` token is not required;
    /// reads past the end return `EndOfFile`.
    #[must_use]
    pub fn new(tokens: Vec<CssToken>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// The current token without consuming it.
    #[must_use]
    pub fn peek(&self) -> &CssToken {
        self.tokens.get(self.position).unwrap_or(&CssToken::EndOfFile)
    }

    /// Look ahead `offset` tokens without consuming.
    #[must_use]
    pub fn peek_at(&self, offset: usize) -> &CssToken {
        self.tokens
            .get(self.position + offset)
            .unwrap_or(&CssToken::EndOfFile)
    }

    /// Consume and return the current token.
    pub fn next_token(&mut self) -> CssToken {
        let token = self
            .tokens
            .get(self.position)
            .cloned()
            .unwrap_or(CssToken::EndOfFile);
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    /// Advance past the current token.
    pub fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    /// Skip any whitespace tokens.
    pub fn skip_whitespace(&mut self) {
        while self.peek().is_whitespace() {
            self.advance();
        }
    }

    /// True once every token has been consumed.
    #[must_use]
    pub fn at_end(&self) -> bool {
        self.position >= self.tokens.len() || self.peek().is_eof()
    }

    /// The current cursor position; pairs with [`TokenStream::rewind`].
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Move the cursor back to a previously observed position.
    pub fn rewind(&mut self, position: usize) {
        self.position = position;
    }

    /// [§ 5.4.8 Consume a component value](https://www.w3.org/TR/css-syntax-3/#consume-component-value)
    ///
    /// Skip one component value: a single token, or a whole block/function
    /// (recursively) when the current token opens one.
    pub fn consume_component(&mut self) {
        let token = self.next_token();
        if let Some(closer) = token.closing_pair() {
            self.consume_block_contents(&closer);
        }
    }

    /// Skip tokens until the matching `closer` is consumed, recursing into
    /// nested blocks. The opening token must already be consumed.
    pub fn consume_block_contents(&mut self, closer: &CssToken) {
        loop {
            let token = self.peek().clone();
            if token.is_eof() {
                return;
            }
            self.advance();
            if token == *closer {
                return;
            }
            if let Some(nested) = token.closing_pair() {
                self.consume_block_contents(&nested);
            }
        }
    }

    /// Collect the tokens of a block whose opener was just consumed,
    /// excluding the closing token. Nested blocks are kept verbatim.
    pub fn collect_block(&mut self, closer: &CssToken) -> Vec<CssToken> {
        let mut depth_stack: Vec<CssToken> = Vec::new();
        let mut collected = Vec::new();
        loop {
            let token = self.peek().clone();
            if token.is_eof() {
                return collected;
            }
            self.advance();
            if depth_stack.is_empty() && token == *closer {
                return collected;
            }
            if let Some(nested) = token.closing_pair() {
                depth_stack.push(nested);
            } else if depth_stack.last() == Some(&token) {
                let _ = depth_stack.pop();
            }
            collected.push(token);
        }
    }
}

/// Transactional checkpoint over a [`TokenStream`].
///
/// The guard rewinds the stream to its creation point when dropped, unless
/// [`StreamGuard::release`] committed the consumed tokens.
pub struct StreamGuard<'a> {
    stream: &'a mut TokenStream,
    start: usize,
    released: bool,
}

impl<'a> StreamGuard<'a> {
    /// Begin a transaction at the stream's current position.
    pub fn new(stream: &'a mut TokenStream) -> Self {
        let start = stream.position();
        Self {
            stream,
            start,
            released: false,
        }
    }

    /// Commit: the consumed tokens stay consumed.
    pub fn release(mut self) {
        self.released = true;
    }
}

impl std::ops::Deref for StreamGuard<'_> {
    type Target = TokenStream;

    fn deref(&self) -> &TokenStream {
        self.stream
    }
}

impl std::ops::DerefMut for StreamGuard<'_> {
    fn deref_mut(&mut self) -> &mut TokenStream {
        self.stream
    }
}

impl Drop for StreamGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.stream.rewind(self.start);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::CssTokenizer;

    fn stream(input: &str) -> TokenStream {
        let mut tokenizer = CssTokenizer::new(input);
        tokenizer.run();
        TokenStream::new(tokenizer.into_tokens())
    }

    #[test]
    fn guard_rewinds_on_drop() {
        let mut input = stream("a b c");
        {
            let mut guard = StreamGuard::new(&mut input);
            let _ = guard.next_token();
            let _ = guard.next_token();
        }
        assert_eq!(input.peek(), &CssToken::Ident("a".into()));
    }

    #[test]
    fn guard_release_commits() {
        let mut input = stream("a b");
        {
            let mut guard = StreamGuard::new(&mut input);
            let _ = guard.next_token();
            let _ = guard.next_token();
            guard.release();
        }
        assert_eq!(input.peek(), &CssToken::Ident("b".into()));
    }

    #[test]
    fn consume_component_skips_blocks() {
        let mut input = stream("rgb(1, (2), 3) x");
        input.consume_component();
        input.skip_whitespace();
        assert_eq!(input.peek(), &CssToken::Ident("x".into()));
    }

    #[test]
    fn collect_block_keeps_nested_structure() {
        let mut input = stream("{ a { b } c } after");
        assert_eq!(input.next_token(), CssToken::LeftBrace);
        let inner = input.collect_block(&CssToken::RightBrace);
        assert!(inner.contains(&CssToken::Ident("a".into())));
        assert!(inner.contains(&CssToken::LeftBrace));
        assert!(inner.contains(&CssToken::Ident("b".into())));
        assert!(inner.contains(&CssToken::RightBrace));
        assert!(inner.contains(&CssToken::Ident("c".into())));
        input.skip_whitespace();
        assert_eq!(input.peek(), &CssToken::Ident("after".into()));
    }
}
