//! Syntax-side primitives for the Garnet formatter.
//!
//! This crate owns everything that happens before a document is built:
//! - [`token`]: the engine's token stream and the monotonic cursor over it.
//! - [`node`]: the concrete syntax tree as a closed sum over construct kinds.
//! - [`input`]: decoding of the grammar engine's JSON payload.
//! - [`correlate`]: the token-tree correlator producing per-node layout
//!   facts (quotes, blank lines, heredoc tags, literal sub-styles).
//!
//! Parsing itself is out of scope: an external grammar engine lexes and
//! parses the source and hands us its output. One [`input::SourceFile`] plus
//! one [`correlate::Layout`] is everything the document builder needs.

pub mod correlate;
pub mod input;
pub mod node;
pub mod token;

pub use correlate::{
    correlate, CorrelateError, HeredocDelimiter, HeredocIndent, Layout, LayoutFacts,
    LiteralStyle, QuoteStyle,
};
pub use input::{decode, decode_value, InputError, SourceFile};
pub use node::{Comment, Node, NodeId, NodeKind};
pub use token::{Expected, Pos, Token, TokenCursor, TokenKind, TokenStream};
