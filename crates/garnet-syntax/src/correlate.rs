//! Token-tree correlation.
//!
//! The bare tree from the grammar engine has no layout facts: it does not say
//! which quote a string used, whether the author left a blank line between
//! two statements, or which tags a heredoc opened with. The correlator
//! recovers those facts by walking the tree depth-first while consuming the
//! token stream in lock-step.
//!
//! The walk is strict: every significant token must be matched by exactly one
//! assertion, and any divergence between what the current construct expects
//! and what the stream holds is a hard [`CorrelateError`]. Silently skipping
//! a mismatched token risks dropping or duplicating source text downstream.

use thiserror::Error;
use tracing::{debug, trace};

use crate::node::{Node, NodeId, NodeKind};
use crate::token::{Expected, Mismatch, Pos, Token, TokenCursor, TokenKind, TokenStream};

/// Quote character a string-like literal was (or should be) enclosed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    Single,
    Double,
}

/// Sub-style of a literal that has more than one surface form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralStyle {
    /// Bracketed form (`[...]`, `/.../`).
    Plain,
    /// `%w[...]` word list.
    WordList,
    /// `%i[...]` symbol list.
    SymbolList,
    /// `%r{...}` percent-delimited regexp.
    Percent,
}

/// How a heredoc treats leading indentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeredocIndent {
    /// `<<TAG`: closing tag must be at column zero.
    None,
    /// `<<-TAG`: closing tag may be indented.
    Dash,
    /// `<<~TAG`: body indentation is stripped.
    Squiggly,
}

/// Opening/closing tag metadata for a heredoc literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeredocDelimiter {
    pub tag: String,
    pub indent: HeredocIndent,
    /// `Some` when the tag was quoted (`<<~'EOS'` suppresses interpolation).
    pub quote: Option<QuoteStyle>,
}

/// Layout facts for one node, derived once and never recomputed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutFacts {
    pub blank_line_before: bool,
    pub blank_line_after: bool,
    pub quote: Option<QuoteStyle>,
    pub literal_style: Option<LiteralStyle>,
    pub heredoc: Option<HeredocDelimiter>,
    /// The collection or argument list ended with a `,` before its closer.
    pub trailing_comma: bool,
    /// `and`/`or`/`not` was spelled as a word rather than `&&`/`||`/`!`.
    ///
    /// The word forms have different precedence, so the spelling must
    /// round-trip.
    pub keyword_operator: bool,
    /// Line of the node's last token, for trailing-comment attachment.
    pub end_line: u32,
}

/// Side table of [`LayoutFacts`] keyed by [`NodeId`].
///
/// Together with the tree this is the "enriched syntax tree": identical
/// structure, plus metadata. The table is read-only input to the document
/// builder.
#[derive(Debug, Clone)]
pub struct Layout {
    facts: Vec<LayoutFacts>,
}

impl Layout {
    fn with_capacity(nodes: usize) -> Self {
        Self {
            facts: vec![LayoutFacts::default(); nodes],
        }
    }

    pub fn facts(&self, id: NodeId) -> &LayoutFacts {
        &self.facts[id.index()]
    }

    fn facts_mut(&mut self, id: NodeId) -> &mut LayoutFacts {
        &mut self.facts[id.index()]
    }
}

/// A correlation failure. Always fatal for the file being formatted.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CorrelateError {
    #[error("in `{node}`: expected {expected}, found {found} `{text}` at {pos}")]
    TokenMismatch {
        node: &'static str,
        expected: Expected,
        found: TokenKind,
        text: String,
        pos: Pos,
    },
    #[error("in `{node}`: expected {expected}, but the token stream was exhausted")]
    StreamExhausted {
        node: &'static str,
        expected: Expected,
    },
    #[error("leftover {found} `{text}` at {pos} after the tree was fully correlated")]
    LeftoverTokens {
        found: TokenKind,
        text: String,
        pos: Pos,
    },
}

impl CorrelateError {
    fn from_mismatch(node: &'static str, mismatch: Mismatch) -> Self {
        match mismatch.actual {
            Some(token) => CorrelateError::TokenMismatch {
                node,
                expected: mismatch.expected,
                found: token.kind,
                text: token.text,
                pos: token.pos,
            },
            None => CorrelateError::StreamExhausted {
                node,
                expected: mismatch.expected,
            },
        }
    }
}

type Result<T> = std::result::Result<T, CorrelateError>;

/// Correlate `root` with `stream`, producing the layout-fact table.
///
/// Consumes the stream exactly once; at the end the cursor must hold nothing
/// but trivia.
pub fn correlate(root: &Node, stream: &TokenStream) -> Result<Layout> {
    debug!(tokens = stream.len(), "correlating tree with token stream");

    let nodes = count_nodes(root);
    let mut correlator = Correlator {
        cursor: stream.cursor(),
        layout: Layout::with_capacity(nodes),
        ctx: "program",
        last_end: Pos::new(1, 0),
    };

    correlator.walk(root)?;

    correlator.cursor.finish().map_err(|m| match m.actual {
        Some(token) => CorrelateError::LeftoverTokens {
            found: token.kind,
            text: token.text,
            pos: token.pos,
        },
        None => unreachable!("finish only fails on a leftover token"),
    })?;

    Ok(correlator.layout)
}

fn count_nodes(root: &Node) -> usize {
    // Ids are dense and assigned in decoding order, so the largest id in the
    // tree bounds the table size.
    fn max_id(node: &Node, acc: &mut u32) {
        *acc = (*acc).max(node.id.0);
        for child in node.children() {
            max_id(child, acc);
        }
    }
    let mut acc = 0;
    max_id(root, &mut acc);
    acc as usize + 1
}

struct Correlator<'t> {
    cursor: TokenCursor<'t>,
    layout: Layout,
    /// Tag of the construct currently being walked, for error context.
    ctx: &'static str,
    last_end: Pos,
}

impl<'t> Correlator<'t> {
    // --- cursor wrappers that attach node context ---

    fn expect(&mut self, kind: TokenKind) -> Result<&'t Token> {
        let ctx = self.ctx;
        let token = self
            .cursor
            .expect(kind)
            .map_err(|m| CorrelateError::from_mismatch(ctx, m))?;
        self.last_end = token_end(token);
        Ok(token)
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<&'t Token> {
        let ctx = self.ctx;
        let token = self
            .cursor
            .expect_keyword(kw)
            .map_err(|m| CorrelateError::from_mismatch(ctx, m))?;
        self.last_end = token_end(token);
        Ok(token)
    }

    fn expect_op(&mut self, op: &str) -> Result<&'t Token> {
        let ctx = self.ctx;
        let token = self
            .cursor
            .expect_op(op)
            .map_err(|m| CorrelateError::from_mismatch(ctx, m))?;
        self.last_end = token_end(token);
        Ok(token)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if let Some(token) = self.cursor.eat(kind) {
            self.last_end = token_end(token);
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if let Some(token) = self.cursor.eat_keyword(kw) {
            self.last_end = token_end(token);
            true
        } else {
            false
        }
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if let Some(token) = self.cursor.eat_op(op) {
            self.last_end = token_end(token);
            true
        } else {
            false
        }
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.cursor.peek().map(|t| t.kind) == Some(kind)
    }

    fn peek_is_keyword(&self, kw: &str) -> bool {
        matches!(self.cursor.peek(), Some(t) if t.kind == TokenKind::Keyword && t.text == kw)
    }

    /// Consume a method/attribute name token. Names can surface as
    /// identifiers, constants, operators, or even keywords (`foo.class`).
    fn expect_name(&mut self, name: &str) -> Result<&'t Token> {
        let ctx = self.ctx;
        match self.cursor.peek() {
            Some(token)
                if token.text == name
                    && matches!(
                        token.kind,
                        TokenKind::Ident
                            | TokenKind::Constant
                            | TokenKind::Op
                            | TokenKind::Keyword
                    ) =>
            {
                let token = self.cursor.bump().expect("peeked token");
                self.last_end = token_end(token);
                Ok(token)
            }
            actual => Err(CorrelateError::from_mismatch(
                ctx,
                Mismatch {
                    expected: Expected::Name(name.to_string()),
                    actual: actual.cloned(),
                },
            )),
        }
    }

    // --- tree walk ---

    fn walk(&mut self, node: &Node) -> Result<()> {
        let saved = self.ctx;
        self.ctx = node.tag();
        trace!(node = self.ctx, line = node.pos.line, "walk");
        self.walk_kind(node)?;
        self.layout.facts_mut(node.id).end_line = self.last_end.line;
        self.ctx = saved;
        Ok(())
    }

    fn walk_kind(&mut self, node: &Node) -> Result<()> {
        use NodeKind::*;
        match &node.kind {
            Program { body } => self.walk_body(body),
            Begin { body } => {
                self.expect(TokenKind::LParen)?;
                self.walk_body(body)?;
                self.expect(TokenKind::RParen)?;
                Ok(())
            }
            KwBegin { body } => {
                self.expect_keyword("begin")?;
                self.walk_body(body)?;
                self.expect_keyword("end")?;
                Ok(())
            }
            Module { name, body } => {
                self.expect_keyword("module")?;
                self.walk(name)?;
                self.walk_body(body)?;
                self.expect_keyword("end")?;
                Ok(())
            }
            Class {
                name,
                superclass,
                body,
            } => {
                self.expect_keyword("class")?;
                self.walk(name)?;
                if let Some(superclass) = superclass {
                    self.expect_op("<")?;
                    self.walk(superclass)?;
                }
                self.walk_body(body)?;
                self.expect_keyword("end")?;
                Ok(())
            }
            SingletonClass { object, body } => {
                self.expect_keyword("class")?;
                self.expect_op("<<")?;
                self.walk(object)?;
                self.walk_body(body)?;
                self.expect_keyword("end")?;
                Ok(())
            }
            Def { name, args, body } => {
                self.expect_keyword("def")?;
                self.expect_name(name)?;
                self.walk_def_args(args)?;
                self.walk_body(body)?;
                self.expect_keyword("end")?;
                Ok(())
            }
            DefSelf {
                recv,
                name,
                args,
                body,
            } => {
                self.expect_keyword("def")?;
                self.walk(recv)?;
                self.expect(TokenKind::Period)?;
                self.expect_name(name)?;
                self.walk_def_args(args)?;
                self.walk_body(body)?;
                self.expect_keyword("end")?;
                Ok(())
            }
            Args { list } => self.walk_comma_separated(list),
            Arg { name } => {
                let ctx = self.ctx;
                let token = self.expect(TokenKind::Ident)?;
                expect_text(ctx, token, name)?;
                Ok(())
            }
            OptArg { name, default } => {
                let ctx = self.ctx;
                let token = self.expect(TokenKind::Ident)?;
                expect_text(ctx, token, name)?;
                self.expect_op("=")?;
                self.walk(default)
            }
            RestArg { name } => {
                self.expect_op("*")?;
                if name.is_some() {
                    self.expect(TokenKind::Ident)?;
                }
                Ok(())
            }
            KwArg { name } => {
                let ctx = self.ctx;
                let token = self.expect(TokenKind::Label)?;
                expect_label(ctx, token, name)?;
                Ok(())
            }
            KwOptArg { name, default } => {
                let ctx = self.ctx;
                let token = self.expect(TokenKind::Label)?;
                expect_label(ctx, token, name)?;
                self.walk(default)
            }
            KwRestArg { name } => {
                self.expect_op("**")?;
                if name.is_some() {
                    self.expect(TokenKind::Ident)?;
                }
                Ok(())
            }
            BlockArg { name } => {
                self.expect_op("&")?;
                let ctx = self.ctx;
                let token = self.expect(TokenKind::Ident)?;
                expect_text(ctx, token, name)?;
                Ok(())
            }
            Alias { new_name, old_name } => {
                self.expect_keyword("alias")?;
                self.walk_bare_symbol(new_name)?;
                self.walk_bare_symbol(old_name)
            }
            Undef { names } => {
                self.expect_keyword("undef")?;
                for (idx, name) in names.iter().enumerate() {
                    if idx > 0 {
                        self.expect(TokenKind::Comma)?;
                    }
                    self.walk_bare_symbol(name)?;
                }
                Ok(())
            }
            Send { recv, name, args } => {
                if let Some(recv) = recv {
                    self.walk(recv)?;
                    self.expect(TokenKind::Period)?;
                }
                self.walk_send_tail(node.id, name, args)
            }
            CSend { recv, name, args } => {
                self.walk(recv)?;
                self.expect_op("&.")?;
                self.walk_send_tail(node.id, name, args)
            }
            Index { recv, indexes } => {
                self.walk(recv)?;
                self.expect(TokenKind::LBracket)?;
                self.walk_comma_separated(indexes)?;
                self.expect(TokenKind::RBracket)?;
                Ok(())
            }
            IndexAsgn {
                recv,
                indexes,
                value,
            } => {
                self.walk(recv)?;
                self.expect(TokenKind::LBracket)?;
                self.walk_comma_separated(indexes)?;
                self.expect(TokenKind::RBracket)?;
                self.expect_op("=")?;
                self.walk(value)
            }
            BinaryOp { op, lhs, rhs } => {
                self.walk(lhs)?;
                self.expect_op(op)?;
                self.walk(rhs)
            }
            UnaryOp { op, recv } => {
                self.expect_op(op)?;
                self.walk(recv)
            }
            Block { call, params, body } => {
                self.walk(call)?;
                if self.eat(TokenKind::LBrace) {
                    self.walk_block_params(params)?;
                    self.walk_body(body)?;
                    self.expect(TokenKind::RBrace)?;
                } else {
                    self.expect_keyword("do")?;
                    self.walk_block_params(params)?;
                    self.walk_body(body)?;
                    self.expect_keyword("end")?;
                }
                Ok(())
            }
            BlockPass { value } => {
                self.expect_op("&")?;
                self.walk(value)
            }
            Lambda { params, body } => {
                self.expect_op("->")?;
                if self.eat(TokenKind::LParen) {
                    if let Some(params) = params {
                        self.walk(params)?;
                    }
                    self.expect(TokenKind::RParen)?;
                } else if let Some(params) = params {
                    self.walk(params)?;
                }
                if self.eat(TokenKind::LBrace) {
                    self.walk_body(body)?;
                    self.expect(TokenKind::RBrace)?;
                } else {
                    self.expect_keyword("do")?;
                    self.walk_body(body)?;
                    self.expect_keyword("end")?;
                }
                Ok(())
            }
            Yield { args } => {
                self.expect_keyword("yield")?;
                self.walk_call_args(node.id, args)
            }
            Super { args } => {
                self.expect_keyword("super")?;
                self.walk_call_args(node.id, args)
            }
            ZSuper => {
                self.expect_keyword("super")?;
                Ok(())
            }
            Lvar { name } => {
                let ctx = self.ctx;
                let token = self.expect(TokenKind::Ident)?;
                expect_text(ctx, token, name)?;
                Ok(())
            }
            Ivar { name } => {
                let ctx = self.ctx;
                let token = self.expect(TokenKind::InstanceVar)?;
                expect_text(ctx, token, name)?;
                Ok(())
            }
            Cvar { name } => {
                let ctx = self.ctx;
                let token = self.expect(TokenKind::ClassVar)?;
                expect_text(ctx, token, name)?;
                Ok(())
            }
            Gvar { name } => {
                let ctx = self.ctx;
                let token = self.expect(TokenKind::GlobalVar)?;
                expect_text(ctx, token, name)?;
                Ok(())
            }
            Const { scope, name } => {
                if let Some(scope) = scope {
                    self.walk(scope)?;
                    self.expect_op("::")?;
                }
                let ctx = self.ctx;
                let token = self.expect(TokenKind::Constant)?;
                expect_text(ctx, token, name)?;
                Ok(())
            }
            Cbase => {
                self.expect_op("::")?;
                Ok(())
            }
            NthRef { .. } | BackRef { .. } => {
                self.expect(TokenKind::Backref)?;
                Ok(())
            }
            SelfRef => {
                self.expect_keyword("self")?;
                Ok(())
            }
            Lvasgn { name, value } => self.walk_var_assign(TokenKind::Ident, name, value),
            Ivasgn { name, value } => self.walk_var_assign(TokenKind::InstanceVar, name, value),
            Cvasgn { name, value } => self.walk_var_assign(TokenKind::ClassVar, name, value),
            Gvasgn { name, value } => self.walk_var_assign(TokenKind::GlobalVar, name, value),
            Casgn { scope, name, value } => {
                if let Some(scope) = scope {
                    self.walk(scope)?;
                    self.expect_op("::")?;
                }
                let ctx = self.ctx;
                let token = self.expect(TokenKind::Constant)?;
                expect_text(ctx, token, name)?;
                self.expect_op("=")?;
                self.walk(value)
            }
            Masgn { targets, value } => {
                self.walk(targets)?;
                self.expect_op("=")?;
                self.walk(value)
            }
            Mlhs { items } => self.walk_comma_separated(items),
            OpAsgn { target, op, value } => {
                self.walk(target)?;
                let compound = format!("{op}=");
                self.expect_op(&compound)?;
                self.walk(value)
            }
            OrAsgn { target, value } => {
                self.walk(target)?;
                self.expect_op("||=")?;
                self.walk(value)
            }
            AndAsgn { target, value } => {
                self.walk(target)?;
                self.expect_op("&&=")?;
                self.walk(value)
            }
            Splat { value } => {
                self.expect_op("*")?;
                if let Some(value) = value {
                    self.walk(value)?;
                }
                Ok(())
            }
            KwSplat { value } => {
                self.expect_op("**")?;
                self.walk(value)
            }
            If {
                cond,
                then_body,
                else_body,
            } => self.walk_conditional("if", cond, then_body, else_body),
            Unless {
                cond,
                then_body,
                else_body,
            } => self.walk_conditional("unless", cond, then_body, else_body),
            Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                self.walk(cond)?;
                self.expect_op("?")?;
                self.walk(then_expr)?;
                self.expect_op(":")?;
                self.walk(else_expr)
            }
            While { cond, body } => self.walk_loop("while", cond, body),
            Until { cond, body } => self.walk_loop("until", cond, body),
            For {
                var,
                iterable,
                body,
            } => {
                self.expect_keyword("for")?;
                self.walk(var)?;
                self.expect_keyword("in")?;
                self.walk(iterable)?;
                self.eat_keyword("do");
                self.walk_body(body)?;
                self.expect_keyword("end")?;
                Ok(())
            }
            Case {
                subject,
                whens,
                else_body,
            } => {
                self.expect_keyword("case")?;
                if let Some(subject) = subject {
                    self.walk(subject)?;
                }
                for when in whens {
                    self.walk(when)?;
                }
                if !else_body.is_empty() {
                    self.expect_keyword("else")?;
                    self.walk_body(else_body)?;
                }
                self.expect_keyword("end")?;
                Ok(())
            }
            When { patterns, body } => {
                self.expect_keyword("when")?;
                self.walk_comma_separated(patterns)?;
                self.eat_keyword("then");
                self.walk_body(body)
            }
            Rescue {
                body,
                clauses,
                else_body,
            } => {
                self.walk_body(body)?;
                for clause in clauses {
                    self.walk(clause)?;
                }
                if !else_body.is_empty() {
                    self.expect_keyword("else")?;
                    self.walk_body(else_body)?;
                }
                Ok(())
            }
            RescueClause {
                exceptions,
                binding,
                body,
            } => {
                self.expect_keyword("rescue")?;
                self.walk_comma_separated(exceptions)?;
                if let Some(binding) = binding {
                    self.expect_op("=>")?;
                    self.walk(binding)?;
                }
                self.eat_keyword("then");
                self.walk_body(body)
            }
            Ensure { body, ensure_body } => {
                self.walk_body(body)?;
                self.expect_keyword("ensure")?;
                self.walk_body(ensure_body)
            }
            Return { args } => {
                self.expect_keyword("return")?;
                self.walk_call_args(node.id, args)
            }
            Break { args } => {
                self.expect_keyword("break")?;
                self.walk_call_args(node.id, args)
            }
            Next { args } => {
                self.expect_keyword("next")?;
                self.walk_call_args(node.id, args)
            }
            Redo => {
                self.expect_keyword("redo")?;
                Ok(())
            }
            Retry => {
                self.expect_keyword("retry")?;
                Ok(())
            }
            And { lhs, rhs } => {
                self.walk(lhs)?;
                if !self.eat_op("&&") {
                    self.expect_keyword("and")?;
                    self.layout.facts_mut(node.id).keyword_operator = true;
                }
                self.walk(rhs)
            }
            Or { lhs, rhs } => {
                self.walk(lhs)?;
                if !self.eat_op("||") {
                    self.expect_keyword("or")?;
                    self.layout.facts_mut(node.id).keyword_operator = true;
                }
                self.walk(rhs)
            }
            Not { value } => {
                if !self.eat_op("!") {
                    self.expect_keyword("not")?;
                    self.layout.facts_mut(node.id).keyword_operator = true;
                }
                self.walk(value)
            }
            Defined { value } => {
                self.expect_keyword("defined?")?;
                if self.eat(TokenKind::LParen) {
                    self.walk(value)?;
                    self.expect(TokenKind::RParen)?;
                    Ok(())
                } else {
                    self.walk(value)
                }
            }
            Nil => {
                self.expect_keyword("nil")?;
                Ok(())
            }
            True => {
                self.expect_keyword("true")?;
                Ok(())
            }
            False => {
                self.expect_keyword("false")?;
                Ok(())
            }
            Int { value } => self.walk_number(TokenKind::Int, value),
            Float { value } => self.walk_number(TokenKind::Float, value),
            Str { .. } => self.walk_plain_string(node),
            DStr { parts } => {
                self.expect(TokenKind::StringBeg)?;
                self.layout.facts_mut(node.id).quote = Some(QuoteStyle::Double);
                self.walk_string_parts(parts)?;
                self.expect(TokenKind::StringEnd)?;
                Ok(())
            }
            Interp { body } => {
                self.expect(TokenKind::EmbExprBeg)?;
                self.walk_body(body)?;
                self.expect(TokenKind::EmbExprEnd)?;
                Ok(())
            }
            Heredoc { parts } => {
                let ctx = self.ctx;
                let opener = self.expect(TokenKind::HeredocBeg)?;
                let delimiter = parse_heredoc_opener(ctx, opener)?;
                self.layout.facts_mut(node.id).heredoc = Some(delimiter);
                self.walk_string_parts(parts)?;
                self.expect(TokenKind::HeredocEnd)?;
                Ok(())
            }
            XStr { parts } => {
                self.expect(TokenKind::Backtick)?;
                self.walk_string_parts(parts)?;
                self.expect(TokenKind::StringEnd)?;
                Ok(())
            }
            Sym { name } => {
                let ctx = self.ctx;
                let opener = self.expect(TokenKind::SymbolBeg)?;
                if opener.text.len() > 1 {
                    // Quoted symbol (`:"..."` or `:'...'`).
                    let quote = if opener.text.ends_with('\'') {
                        QuoteStyle::Single
                    } else {
                        QuoteStyle::Double
                    };
                    self.layout.facts_mut(node.id).quote = Some(quote);
                    if !name.is_empty() {
                        self.expect(TokenKind::StringContent)?;
                    }
                    self.expect(TokenKind::StringEnd)?;
                } else {
                    let token = self.expect_sym_name()?;
                    expect_text(ctx, token, name)?;
                }
                Ok(())
            }
            DSym { parts } => {
                self.expect(TokenKind::SymbolBeg)?;
                self.walk_string_parts(parts)?;
                self.expect(TokenKind::StringEnd)?;
                Ok(())
            }
            Regexp { parts, .. } => {
                let opener = self.expect(TokenKind::RegexpBeg)?;
                if opener.text.starts_with("%r") {
                    self.layout.facts_mut(node.id).literal_style = Some(LiteralStyle::Percent);
                }
                self.walk_string_parts(parts)?;
                self.expect(TokenKind::RegexpEnd)?;
                Ok(())
            }
            Array { elements } => self.walk_array(node.id, elements),
            Hash { pairs } => {
                if self.eat(TokenKind::LBrace) {
                    self.walk_comma_separated(pairs)?;
                    if self.eat(TokenKind::Comma) {
                        self.layout.facts_mut(node.id).trailing_comma = true;
                    }
                    self.expect(TokenKind::RBrace)?;
                } else {
                    // Braceless keyword-argument hash in a call's last
                    // argument position.
                    self.walk_comma_separated(pairs)?;
                }
                Ok(())
            }
            Pair { key, value } => {
                if self.peek_is(TokenKind::Label) {
                    self.expect(TokenKind::Label)?;
                    self.walk(value)
                } else {
                    self.walk(key)?;
                    self.expect_op("=>")?;
                    self.walk(value)
                }
            }
            IRange { low, high } => self.walk_range("..", low, high),
            ERange { low, high } => self.walk_range("...", low, high),
            Preexe { body } => {
                self.expect_keyword("BEGIN")?;
                self.expect(TokenKind::LBrace)?;
                self.walk_body(body)?;
                self.expect(TokenKind::RBrace)?;
                Ok(())
            }
            Postexe { body } => {
                self.expect_keyword("END")?;
                self.expect(TokenKind::LBrace)?;
                self.walk_body(body)?;
                self.expect(TokenKind::RBrace)?;
                Ok(())
            }
        }
    }

    /// Walk a statement sequence, recording blank-line facts between
    /// consecutive statements and asserting statement boundaries.
    fn walk_body(&mut self, body: &[Node]) -> Result<()> {
        let mut prev: Option<NodeId> = None;
        for stmt in body {
            if prev.is_some() && self.cursor.blank_line_pending() {
                self.layout.facts_mut(stmt.id).blank_line_before = true;
                if let Some(prev) = prev {
                    self.layout.facts_mut(prev).blank_line_after = true;
                }
            }
            self.walk(stmt)?;
            prev = Some(stmt.id);
        }
        Ok(())
    }

    fn walk_comma_separated(&mut self, nodes: &[Node]) -> Result<()> {
        for (idx, node) in nodes.iter().enumerate() {
            if idx > 0 {
                self.expect(TokenKind::Comma)?;
            }
            self.walk(node)?;
        }
        Ok(())
    }

    fn walk_def_args(&mut self, args: &Option<Box<Node>>) -> Result<()> {
        if self.eat(TokenKind::LParen) {
            if let Some(args) = args {
                self.walk(args)?;
            }
            self.expect(TokenKind::RParen)?;
        } else if let Some(args) = args {
            self.walk(args)?;
        }
        Ok(())
    }

    fn walk_block_params(&mut self, params: &Option<Box<Node>>) -> Result<()> {
        if let Some(params) = params {
            self.expect_op("|")?;
            self.walk(params)?;
            self.expect_op("|")?;
        }
        Ok(())
    }

    /// Name and argument tokens of a send, after any receiver and separator.
    fn walk_send_tail(&mut self, id: NodeId, name: &str, args: &[Node]) -> Result<()> {
        if let Some(base) = name.strip_suffix('=').filter(|base| {
            // Attribute-writer send (`recv.name = value`), not an operator
            // method like `==` or `<=`.
            !base.is_empty() && base.chars().all(|c| c.is_alphanumeric() || c == '_')
        }) {
            self.expect_name(base)?;
            self.expect_op("=")?;
            debug_assert_eq!(args.len(), 1);
            for arg in args {
                self.walk(arg)?;
            }
            return Ok(());
        }

        self.expect_name(name)?;
        self.walk_call_args(id, args)
    }

    /// Argument tokens of a call: parenthesized, bare, or absent. An `(`
    /// on a later line belongs to the next statement, not to this call.
    fn walk_call_args(&mut self, id: NodeId, args: &[Node]) -> Result<()> {
        if self.peek_is(TokenKind::LParen) && !self.cursor.newline_before_next() {
            self.expect(TokenKind::LParen)?;
            self.walk_comma_separated(args)?;
            if self.eat(TokenKind::Comma) {
                self.layout.facts_mut(id).trailing_comma = true;
            }
            self.expect(TokenKind::RParen)?;
        } else if !args.is_empty() {
            self.walk_comma_separated(args)?;
        }
        Ok(())
    }

    fn walk_var_assign(&mut self, kind: TokenKind, name: &str, value: &Node) -> Result<()> {
        let ctx = self.ctx;
        let token = self.expect(kind)?;
        expect_text(ctx, token, name)?;
        self.expect_op("=")?;
        self.walk(value)
    }

    fn walk_number(&mut self, kind: TokenKind, value: &str) -> Result<()> {
        let ctx = self.ctx;
        // The engine folds a leading sign into the literal node but lexes it
        // as a separate operator token.
        if let Some(rest) = value.strip_prefix('-') {
            self.expect_op("-")?;
            let token = self.expect(kind)?;
            expect_text(ctx, token, rest)?;
        } else {
            let token = self.expect(kind)?;
            expect_text(ctx, token, value)?;
        }
        Ok(())
    }

    fn walk_plain_string(&mut self, node: &Node) -> Result<()> {
        let opener = self.expect(TokenKind::StringBeg)?;
        let quote = if opener.text.starts_with('\'') || opener.text.starts_with("%q") {
            QuoteStyle::Single
        } else {
            QuoteStyle::Double
        };
        self.layout.facts_mut(node.id).quote = Some(quote);
        // Empty strings lex without a content token.
        self.eat(TokenKind::StringContent);
        self.expect(TokenKind::StringEnd)?;
        Ok(())
    }

    /// Parts of an interpolatable literal: plain segments are bare content
    /// tokens (no quote delimiters of their own), interpolations recurse.
    fn walk_string_parts(&mut self, parts: &[Node]) -> Result<()> {
        for part in parts {
            match &part.kind {
                NodeKind::Str { .. } => {
                    self.expect(TokenKind::StringContent)?;
                    self.layout.facts_mut(part.id).end_line = self.last_end.line;
                }
                NodeKind::Interp { .. } => self.walk(part)?,
                _ => {
                    // The decoder only builds Str/Interp parts; anything else
                    // is a correlator bug, not an input error.
                    unreachable!("string part must be str or interp, got {}", part.tag())
                }
            }
        }
        Ok(())
    }

    fn walk_array(&mut self, id: NodeId, elements: &[Node]) -> Result<()> {
        if self.peek_is(TokenKind::WordsBeg) || self.peek_is(TokenKind::SymbolsBeg) {
            let style = if self.peek_is(TokenKind::WordsBeg) {
                self.expect(TokenKind::WordsBeg)?;
                LiteralStyle::WordList
            } else {
                self.expect(TokenKind::SymbolsBeg)?;
                LiteralStyle::SymbolList
            };
            self.layout.facts_mut(id).literal_style = Some(style);
            for (idx, element) in elements.iter().enumerate() {
                if idx > 0 {
                    self.eat(TokenKind::WordSep);
                }
                self.expect(TokenKind::StringContent)?;
                self.layout.facts_mut(element.id).end_line = self.last_end.line;
            }
            self.expect(TokenKind::StringEnd)?;
            return Ok(());
        }

        self.layout.facts_mut(id).literal_style = Some(LiteralStyle::Plain);
        self.expect(TokenKind::LBracket)?;
        self.walk_comma_separated(elements)?;
        if self.eat(TokenKind::Comma) {
            self.layout.facts_mut(id).trailing_comma = true;
        }
        self.expect(TokenKind::RBracket)?;
        Ok(())
    }

    fn walk_range(
        &mut self,
        op: &str,
        low: &Option<Box<Node>>,
        high: &Option<Box<Node>>,
    ) -> Result<()> {
        if let Some(low) = low {
            self.walk(low)?;
        }
        self.expect_op(op)?;
        if let Some(high) = high {
            self.walk(high)?;
        }
        Ok(())
    }

    /// `if`/`unless`, in regular or modifier form.
    fn walk_conditional(
        &mut self,
        keyword: &str,
        cond: &Node,
        then_body: &[Node],
        else_body: &[Node],
    ) -> Result<()> {
        if self.eat_keyword(keyword) {
            self.walk(cond)?;
            self.eat_keyword("then");
            self.walk_body(then_body)?;
            self.walk_else_chain(else_body)?;
            self.expect_keyword("end")?;
            return Ok(());
        }

        // Modifier form: `body if cond`. A modifier conditional has exactly
        // one statement and no else branch.
        let ctx = self.ctx;
        let [stmt] = then_body else {
            return Err(CorrelateError::from_mismatch(
                ctx,
                Mismatch {
                    expected: Expected::Keyword(keyword.to_string()),
                    actual: self.cursor.peek().cloned(),
                },
            ));
        };
        self.walk(stmt)?;
        self.expect_keyword(keyword)?;
        self.walk(cond)
    }

    fn walk_else_chain(&mut self, else_body: &[Node]) -> Result<()> {
        if else_body.is_empty() {
            return Ok(());
        }

        // An `elsif` continuation nests as a single conditional in the else
        // branch; it shares the outer `end`.
        if self.peek_is_keyword("elsif") {
            let inner = match else_body {
                [inner] => inner,
                _ => {
                    return Err(CorrelateError::from_mismatch(
                        self.ctx,
                        Mismatch {
                            expected: Expected::Keyword("else".to_string()),
                            actual: self.cursor.peek().cloned(),
                        },
                    ))
                }
            };
            let NodeKind::If {
                cond,
                then_body,
                else_body: nested_else,
            } = &inner.kind
            else {
                return Err(CorrelateError::from_mismatch(
                    self.ctx,
                    Mismatch {
                        expected: Expected::Keyword("else".to_string()),
                        actual: self.cursor.peek().cloned(),
                    },
                ));
            };
            self.expect_keyword("elsif")?;
            self.walk(cond)?;
            self.eat_keyword("then");
            self.walk_body(then_body)?;
            self.walk_else_chain(nested_else)?;
            self.layout.facts_mut(inner.id).end_line = self.last_end.line;
            return Ok(());
        }

        self.expect_keyword("else")?;
        self.walk_body(else_body)
    }

    /// `while`/`until`, in regular or modifier form.
    fn walk_loop(&mut self, keyword: &str, cond: &Node, body: &[Node]) -> Result<()> {
        if self.eat_keyword(keyword) {
            self.walk(cond)?;
            self.eat_keyword("do");
            self.walk_body(body)?;
            self.expect_keyword("end")?;
            return Ok(());
        }

        let ctx = self.ctx;
        let [stmt] = body else {
            return Err(CorrelateError::from_mismatch(
                ctx,
                Mismatch {
                    expected: Expected::Keyword(keyword.to_string()),
                    actual: self.cursor.peek().cloned(),
                },
            ));
        };
        self.walk(stmt)?;
        self.expect_keyword(keyword)?;
        self.walk(cond)
    }

    /// `alias`/`undef` accept both bare names and symbol literals.
    fn walk_bare_symbol(&mut self, node: &Node) -> Result<()> {
        if self.peek_is(TokenKind::SymbolBeg) {
            return self.walk(node);
        }
        let ctx = self.ctx;
        match &node.kind {
            NodeKind::Sym { name } => {
                let token = self.expect_sym_name()?;
                expect_text(ctx, token, name)?;
                self.layout.facts_mut(node.id).end_line = self.last_end.line;
                Ok(())
            }
            _ => self.walk(node),
        }
    }

    /// Symbol bodies accept a wider set of name tokens than method names.
    fn expect_sym_name(&mut self) -> Result<&'t Token> {
        let ctx = self.ctx;
        match self.cursor.peek() {
            Some(token)
                if matches!(
                    token.kind,
                    TokenKind::Ident
                        | TokenKind::Constant
                        | TokenKind::Op
                        | TokenKind::Keyword
                        | TokenKind::InstanceVar
                        | TokenKind::ClassVar
                        | TokenKind::GlobalVar
                ) =>
            {
                let token = self.cursor.bump().expect("peeked token");
                self.last_end = token_end(token);
                Ok(token)
            }
            actual => Err(CorrelateError::from_mismatch(
                ctx,
                Mismatch {
                    expected: Expected::Kind(TokenKind::Ident),
                    actual: actual.cloned(),
                },
            )),
        }
    }
}

fn expect_text(ctx: &'static str, token: &Token, text: &str) -> Result<()> {
    if token.text == text {
        Ok(())
    } else {
        Err(CorrelateError::TokenMismatch {
            node: ctx,
            expected: Expected::Name(text.to_string()),
            found: token.kind,
            text: token.text.clone(),
            pos: token.pos,
        })
    }
}

fn expect_label(ctx: &'static str, token: &Token, name: &str) -> Result<()> {
    let base = token.text.strip_suffix(':').unwrap_or(&token.text);
    if base == name {
        Ok(())
    } else {
        Err(CorrelateError::TokenMismatch {
            node: ctx,
            expected: Expected::Name(format!("{name}:")),
            found: token.kind,
            text: token.text.clone(),
            pos: token.pos,
        })
    }
}

fn parse_heredoc_opener(ctx: &'static str, token: &Token) -> Result<HeredocDelimiter> {
    let Some(rest) = token.text.strip_prefix("<<") else {
        return Err(CorrelateError::TokenMismatch {
            node: ctx,
            expected: Expected::Kind(TokenKind::HeredocBeg),
            found: token.kind,
            text: token.text.clone(),
            pos: token.pos,
        });
    };

    let (indent, rest) = match rest.as_bytes().first() {
        Some(b'~') => (HeredocIndent::Squiggly, &rest[1..]),
        Some(b'-') => (HeredocIndent::Dash, &rest[1..]),
        _ => (HeredocIndent::None, rest),
    };

    let (quote, tag) = match rest.as_bytes().first() {
        Some(b'\'') => (
            Some(QuoteStyle::Single),
            rest.trim_matches('\'').to_string(),
        ),
        Some(b'"') => (Some(QuoteStyle::Double), rest.trim_matches('"').to_string()),
        _ => (None, rest.to_string()),
    };

    Ok(HeredocDelimiter { tag, indent, quote })
}

fn token_end(token: &Token) -> Pos {
    let mut line = token.pos.line;
    let mut col = token.pos.col;
    for ch in token.text.chars() {
        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    Pos::new(line, col)
}
