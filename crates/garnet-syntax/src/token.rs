//! Token stream primitives.
//!
//! The grammar engine lexes the whole source file up front and hands us an
//! ordered token list. Nothing here rewinds: [`TokenCursor`] advances
//! monotonically and the correlator consumes the stream exactly once.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A source position as reported by the grammar engine's lexer.
///
/// Lines are 1-based, columns are 0-based byte offsets within the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
}

impl Pos {
    #[inline]
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Lexeme kinds emitted by the grammar engine.
///
/// The set mirrors the engine's lexer events one-to-one. Keywords arrive as a
/// single [`TokenKind::Keyword`] kind with the keyword text; operators as
/// [`TokenKind::Op`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    // --- Trivia ---
    Space,
    /// A statement-ending newline.
    Newline,
    /// A newline with no syntactic significance (inside an expression).
    IgnoredNewline,
    Semicolon,
    Comment,

    // --- Names ---
    Keyword,
    Ident,
    Constant,
    InstanceVar,
    ClassVar,
    GlobalVar,
    Backref,
    Label,

    // --- Numbers ---
    Int,
    Float,

    // --- Strings, symbols, regexps ---
    StringBeg,
    StringContent,
    StringEnd,
    EmbExprBeg,
    EmbExprEnd,
    HeredocBeg,
    HeredocEnd,
    SymbolBeg,
    WordsBeg,
    SymbolsBeg,
    WordSep,
    RegexpBeg,
    RegexpEnd,
    Backtick,

    // --- Punctuation ---
    Op,
    Period,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
}

impl TokenKind {
    /// Trivia is skipped (never asserted) by the correlator. Blank-line facts
    /// are derived from the newline tokens inside a trivia run before it is
    /// discarded.
    #[inline]
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Space
                | TokenKind::Newline
                | TokenKind::IgnoredNewline
                | TokenKind::Semicolon
                | TokenKind::Comment
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Space => "space",
            TokenKind::Newline => "newline",
            TokenKind::IgnoredNewline => "ignored newline",
            TokenKind::Semicolon => "semicolon",
            TokenKind::Comment => "comment",
            TokenKind::Keyword => "keyword",
            TokenKind::Ident => "identifier",
            TokenKind::Constant => "constant",
            TokenKind::InstanceVar => "instance variable",
            TokenKind::ClassVar => "class variable",
            TokenKind::GlobalVar => "global variable",
            TokenKind::Backref => "back-reference",
            TokenKind::Label => "label",
            TokenKind::Int => "integer literal",
            TokenKind::Float => "float literal",
            TokenKind::StringBeg => "string opening",
            TokenKind::StringContent => "string content",
            TokenKind::StringEnd => "string closing",
            TokenKind::EmbExprBeg => "interpolation opening",
            TokenKind::EmbExprEnd => "interpolation closing",
            TokenKind::HeredocBeg => "heredoc opening",
            TokenKind::HeredocEnd => "heredoc closing",
            TokenKind::SymbolBeg => "symbol opening",
            TokenKind::WordsBeg => "word-list opening",
            TokenKind::SymbolsBeg => "symbol-list opening",
            TokenKind::WordSep => "word separator",
            TokenKind::RegexpBeg => "regexp opening",
            TokenKind::RegexpEnd => "regexp closing",
            TokenKind::Backtick => "backtick",
            TokenKind::Op => "operator",
            TokenKind::Period => "period",
            TokenKind::Comma => "comma",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
        };
        f.write_str(name)
    }
}

/// A single lexeme: kind, verbatim source text, and start position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub pos: Pos,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, pos: Pos) -> Self {
        Self {
            kind,
            text: text.into(),
            pos,
        }
    }
}

/// The full token stream for one source file.
#[derive(Debug, Clone, Default)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Start a single forward pass over the stream.
    pub fn cursor(&self) -> TokenCursor<'_> {
        TokenCursor {
            tokens: &self.tokens,
            index: 0,
        }
    }
}

/// What a correlator assertion was looking for when it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expected {
    Kind(TokenKind),
    Keyword(String),
    Op(String),
    /// A name token with specific text (method, variable, or symbol name).
    Name(String),
    EndOfStream,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Kind(kind) => write!(f, "{kind}"),
            Expected::Keyword(kw) => write!(f, "keyword `{kw}`"),
            Expected::Op(op) => write!(f, "operator `{op}`"),
            Expected::Name(name) => write!(f, "name `{name}`"),
            Expected::EndOfStream => f.write_str("end of token stream"),
        }
    }
}

/// A failed expected-token assertion, before node context is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub expected: Expected,
    /// `None` when the stream ran out instead of producing a wrong token.
    pub actual: Option<Token>,
}

/// Monotonic cursor over a [`TokenStream`].
///
/// The cursor is the only mutable state shared across the correlator's
/// recursive walk. It is passed by exclusive reference and never rewinds.
#[derive(Debug)]
pub struct TokenCursor<'t> {
    tokens: &'t [Token],
    index: usize,
}

impl<'t> TokenCursor<'t> {
    /// Index of the next unconsumed token (trivia included).
    pub fn position(&self) -> usize {
        self.index
    }

    /// Peek at the next significant token without consuming anything.
    pub fn peek(&self) -> Option<&'t Token> {
        self.tokens[self.index..].iter().find(|t| !t.kind.is_trivia())
    }

    /// Peek at the second significant token without consuming anything.
    pub fn peek2(&self) -> Option<&'t Token> {
        self.tokens[self.index..]
            .iter()
            .filter(|t| !t.kind.is_trivia())
            .nth(1)
    }

    /// True when the pending trivia run contains two newlines in a row, i.e.
    /// the next significant token is preceded by at least one blank line.
    pub fn blank_line_pending(&self) -> bool {
        let mut newlines = 0u32;
        for token in &self.tokens[self.index..] {
            match token.kind {
                TokenKind::Newline | TokenKind::IgnoredNewline => {
                    newlines += 1;
                    if newlines >= 2 {
                        return true;
                    }
                }
                TokenKind::Space | TokenKind::Comment | TokenKind::Semicolon => {}
                _ => break,
            }
        }
        false
    }

    /// True when a newline separates the cursor from the next significant
    /// token. Distinguishes `foo()` from `foo` followed by a parenthesized
    /// statement on the next line.
    pub fn newline_before_next(&self) -> bool {
        for token in &self.tokens[self.index..] {
            match token.kind {
                TokenKind::Newline | TokenKind::IgnoredNewline => return true,
                kind if kind.is_trivia() => {}
                _ => return false,
            }
        }
        false
    }

    /// True when the previously consumed token sits immediately before a
    /// statement-ending newline (only trivia up to and including a
    /// [`TokenKind::Newline`] follows).
    pub fn before_statement_end(&self) -> bool {
        for token in &self.tokens[self.index..] {
            match token.kind {
                TokenKind::Newline => return true,
                kind if kind.is_trivia() => {}
                _ => return false,
            }
        }
        // End of stream terminates the last statement.
        true
    }

    fn skip_trivia(&mut self) {
        while let Some(token) = self.tokens.get(self.index) {
            if token.kind.is_trivia() {
                self.index += 1;
            } else {
                break;
            }
        }
    }

    /// Consume and return the next significant token.
    pub fn bump(&mut self) -> Option<&'t Token> {
        self.skip_trivia();
        let token = self.tokens.get(self.index)?;
        self.index += 1;
        Some(token)
    }

    /// Consume the next significant token, asserting its kind.
    pub fn expect(&mut self, kind: TokenKind) -> Result<&'t Token, Mismatch> {
        self.skip_trivia();
        match self.tokens.get(self.index) {
            Some(token) if token.kind == kind => {
                self.index += 1;
                Ok(token)
            }
            actual => Err(Mismatch {
                expected: Expected::Kind(kind),
                actual: actual.cloned(),
            }),
        }
    }

    /// Consume the next significant token, asserting it is the keyword `kw`.
    pub fn expect_keyword(&mut self, kw: &str) -> Result<&'t Token, Mismatch> {
        self.skip_trivia();
        match self.tokens.get(self.index) {
            Some(token) if token.kind == TokenKind::Keyword && token.text == kw => {
                self.index += 1;
                Ok(token)
            }
            actual => Err(Mismatch {
                expected: Expected::Keyword(kw.to_string()),
                actual: actual.cloned(),
            }),
        }
    }

    /// Consume the next significant token, asserting it is the operator `op`.
    pub fn expect_op(&mut self, op: &str) -> Result<&'t Token, Mismatch> {
        self.skip_trivia();
        match self.tokens.get(self.index) {
            Some(token) if token.kind == TokenKind::Op && token.text == op => {
                self.index += 1;
                Ok(token)
            }
            actual => Err(Mismatch {
                expected: Expected::Op(op.to_string()),
                actual: actual.cloned(),
            }),
        }
    }

    /// Consume the next significant token if it has the given kind.
    pub fn eat(&mut self, kind: TokenKind) -> Option<&'t Token> {
        if self.peek().map(|t| t.kind) == Some(kind) {
            self.bump()
        } else {
            None
        }
    }

    /// Consume the next significant token if it is the keyword `kw`.
    pub fn eat_keyword(&mut self, kw: &str) -> Option<&'t Token> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Keyword && token.text == kw => self.bump(),
            _ => None,
        }
    }

    /// Consume the next significant token if it is the operator `op`.
    pub fn eat_op(&mut self, op: &str) -> Option<&'t Token> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Op && token.text == op => self.bump(),
            _ => None,
        }
    }

    /// Assert the stream holds nothing but trivia from here on.
    ///
    /// Every valid correlation ends here with zero leftover significant
    /// tokens; anything else means a construct forgot to consume its share.
    pub fn finish(mut self) -> Result<(), Mismatch> {
        self.skip_trivia();
        match self.tokens.get(self.index) {
            None => Ok(()),
            Some(token) => Err(Mismatch {
                expected: Expected::EndOfStream,
                actual: Some(token.clone()),
            }),
        }
    }
}
