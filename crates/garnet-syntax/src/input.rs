//! Decoding of the grammar engine's payload.
//!
//! The engine parses the source out of process and serializes three things as
//! one JSON document:
//!
//! ```json
//! {
//!   "ast": { "ast_type": "program", "line": 1, "col": 0, "body": [...] },
//!   "tokens": [[[1, 0], "keyword", "def"], ...],
//!   "comments": [{ "text": "# note", "line": 3 }]
//! }
//! ```
//!
//! Tokens are `[[line, col], kind, text]` triples in source order. Node
//! objects carry an `ast_type` tag plus kind-specific fields; the mapping is
//! one arm per construct in [`decode_node`].
//!
//! This is the one place an unknown construct can enter the pipeline, so the
//! unsupported-construct error lives here: everything past this boundary
//! works with the closed [`NodeKind`] sum and is exhaustively matched.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::node::{Comment, Node, NodeId, NodeKind};
use crate::token::{Pos, Token, TokenKind, TokenStream};

/// A failure while decoding the grammar engine's payload.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InputError {
    /// The engine itself failed; its message is surfaced verbatim.
    #[error("{0}")]
    Engine(String),
    #[error("malformed grammar payload: {0}")]
    Malformed(String),
    /// The payload used a construct tag this engine has no rule for.
    #[error("unsupported construct `{tag}` at line {line}")]
    UnsupportedConstruct { tag: String, line: u32 },
}

type Result<T> = std::result::Result<T, InputError>;

/// A fully decoded per-file payload: tree, token stream, and comments.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub ast: Node,
    pub tokens: TokenStream,
    pub comments: Vec<Comment>,
}

/// Decode one engine payload.
pub fn decode(payload: &str) -> Result<SourceFile> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|err| InputError::Malformed(err.to_string()))?;
    decode_value(&value)
}

/// Decode an already-parsed engine payload.
pub fn decode_value(value: &Value) -> Result<SourceFile> {
    let root = value
        .as_object()
        .ok_or_else(|| InputError::Malformed("payload is not an object".to_string()))?;

    if let Some(error) = root.get("error").and_then(Value::as_str) {
        return Err(InputError::Engine(error.to_string()));
    }

    let mut ids = IdAllocator::default();
    let ast = decode_node(
        root.get("ast")
            .ok_or_else(|| InputError::Malformed("missing `ast`".to_string()))?,
        &mut ids,
    )?;

    let tokens = decode_tokens(
        root.get("tokens")
            .ok_or_else(|| InputError::Malformed("missing `tokens`".to_string()))?,
    )?;

    let comments = match root.get("comments") {
        Some(comments) => decode_comments(comments)?,
        None => Vec::new(),
    };

    debug!(
        nodes = ids.next,
        tokens = tokens.len(),
        comments = comments.len(),
        "decoded grammar payload"
    );

    Ok(SourceFile {
        ast,
        tokens,
        comments,
    })
}

#[derive(Default)]
struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    fn alloc(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

fn decode_tokens(value: &Value) -> Result<TokenStream> {
    let entries = value
        .as_array()
        .ok_or_else(|| InputError::Malformed("`tokens` is not an array".to_string()))?;

    let mut tokens = Vec::with_capacity(entries.len());
    for entry in entries {
        let triple = entry
            .as_array()
            .filter(|t| t.len() == 3)
            .ok_or_else(|| {
                InputError::Malformed("token entry is not a [[line, col], kind, text] triple".to_string())
            })?;

        let pos = triple[0]
            .as_array()
            .filter(|p| p.len() == 2)
            .and_then(|p| Some(Pos::new(p[0].as_u64()? as u32, p[1].as_u64()? as u32)))
            .ok_or_else(|| InputError::Malformed("token position is not [line, col]".to_string()))?;

        let kind: TokenKind = serde_json::from_value(triple[1].clone()).map_err(|_| {
            InputError::Malformed(format!("unknown token kind `{}`", triple[1]))
        })?;

        let text = triple[2]
            .as_str()
            .ok_or_else(|| InputError::Malformed("token text is not a string".to_string()))?;

        tokens.push(Token::new(kind, text, pos));
    }

    Ok(TokenStream::new(tokens))
}

fn decode_comments(value: &Value) -> Result<Vec<Comment>> {
    let entries = value
        .as_array()
        .ok_or_else(|| InputError::Malformed("`comments` is not an array".to_string()))?;

    let mut comments = Vec::with_capacity(entries.len());
    for entry in entries {
        let obj = entry
            .as_object()
            .ok_or_else(|| InputError::Malformed("comment entry is not an object".to_string()))?;
        let text = obj
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| InputError::Malformed("comment without `text`".to_string()))?;
        let line = obj
            .get("line")
            .and_then(Value::as_u64)
            .ok_or_else(|| InputError::Malformed("comment without `line`".to_string()))?;
        comments.push(Comment {
            text: text.to_string(),
            line: line as u32,
        });
    }

    comments.sort_by_key(|c| c.line);
    Ok(comments)
}

struct NodeObject<'v> {
    tag: &'v str,
    obj: &'v serde_json::Map<String, Value>,
    pos: Pos,
}

impl<'v> NodeObject<'v> {
    fn field(&self, name: &str) -> Result<&'v Value> {
        self.obj.get(name).ok_or_else(|| {
            InputError::Malformed(format!("`{}` node without `{name}`", self.tag))
        })
    }

    fn str_field(&self, name: &str) -> Result<String> {
        let value = self.field(name)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                InputError::Malformed(format!("`{}` field `{name}` is not a string", self.tag))
            })
    }

    fn opt_str_field(&self, name: &str) -> Result<Option<String>> {
        match self.obj.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value.as_str().map(|s| Some(s.to_string())).ok_or_else(|| {
                InputError::Malformed(format!("`{}` field `{name}` is not a string", self.tag))
            }),
        }
    }
}

fn decode_node(value: &Value, ids: &mut IdAllocator) -> Result<Node> {
    let obj = value
        .as_object()
        .ok_or_else(|| InputError::Malformed("node is not an object".to_string()))?;

    let tag = obj
        .get("ast_type")
        .and_then(Value::as_str)
        .ok_or_else(|| InputError::Malformed("node without `ast_type`".to_string()))?;

    let line = obj.get("line").and_then(Value::as_u64).unwrap_or(0) as u32;
    let col = obj.get("col").and_then(Value::as_u64).unwrap_or(0) as u32;

    let node = NodeObject {
        tag,
        obj,
        pos: Pos::new(line, col),
    };

    // Ids are allocated pre-order so they sort in source order.
    let id = ids.alloc();

    let kind = decode_kind(&node, ids)?;
    Ok(Node::new(id, node.pos, kind))
}

fn node_field(node: &NodeObject<'_>, name: &str, ids: &mut IdAllocator) -> Result<Box<Node>> {
    decode_node(node.field(name)?, ids).map(Box::new)
}

fn opt_node_field(
    node: &NodeObject<'_>,
    name: &str,
    ids: &mut IdAllocator,
) -> Result<Option<Box<Node>>> {
    match node.obj.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => decode_node(value, ids).map(|n| Some(Box::new(n))),
    }
}

fn node_list(node: &NodeObject<'_>, name: &str, ids: &mut IdAllocator) -> Result<Vec<Node>> {
    match node.obj.get(name) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => {
            let entries = value.as_array().ok_or_else(|| {
                InputError::Malformed(format!(
                    "`{}` field `{name}` is not an array",
                    node.tag
                ))
            })?;
            entries.iter().map(|e| decode_node(e, ids)).collect()
        }
    }
}

fn decode_kind(node: &NodeObject<'_>, ids: &mut IdAllocator) -> Result<NodeKind> {
    let kind = match node.tag {
        "program" => NodeKind::Program {
            body: node_list(node, "body", ids)?,
        },
        "begin" => NodeKind::Begin {
            body: node_list(node, "body", ids)?,
        },
        "kwbegin" => NodeKind::KwBegin {
            body: node_list(node, "body", ids)?,
        },
        "module" => NodeKind::Module {
            name: node_field(node, "name", ids)?,
            body: node_list(node, "body", ids)?,
        },
        "class" => NodeKind::Class {
            name: node_field(node, "name", ids)?,
            superclass: opt_node_field(node, "superclass", ids)?,
            body: node_list(node, "body", ids)?,
        },
        "sclass" => NodeKind::SingletonClass {
            object: node_field(node, "object", ids)?,
            body: node_list(node, "body", ids)?,
        },
        "def" => NodeKind::Def {
            name: node.str_field("name")?,
            args: opt_node_field(node, "args", ids)?,
            body: node_list(node, "body", ids)?,
        },
        "defs" => NodeKind::DefSelf {
            recv: node_field(node, "recv", ids)?,
            name: node.str_field("name")?,
            args: opt_node_field(node, "args", ids)?,
            body: node_list(node, "body", ids)?,
        },
        "args" => NodeKind::Args {
            list: node_list(node, "list", ids)?,
        },
        "arg" => NodeKind::Arg {
            name: node.str_field("name")?,
        },
        "optarg" => NodeKind::OptArg {
            name: node.str_field("name")?,
            default: node_field(node, "default", ids)?,
        },
        "restarg" => NodeKind::RestArg {
            name: node.opt_str_field("name")?,
        },
        "kwarg" => NodeKind::KwArg {
            name: node.str_field("name")?,
        },
        "kwoptarg" => NodeKind::KwOptArg {
            name: node.str_field("name")?,
            default: node_field(node, "default", ids)?,
        },
        "kwrestarg" => NodeKind::KwRestArg {
            name: node.opt_str_field("name")?,
        },
        "blockarg" => NodeKind::BlockArg {
            name: node.str_field("name")?,
        },
        "alias" => NodeKind::Alias {
            new_name: node_field(node, "new_name", ids)?,
            old_name: node_field(node, "old_name", ids)?,
        },
        "undef" => NodeKind::Undef {
            names: node_list(node, "names", ids)?,
        },
        "send" => NodeKind::Send {
            recv: opt_node_field(node, "recv", ids)?,
            name: node.str_field("name")?,
            args: node_list(node, "args", ids)?,
        },
        "csend" => NodeKind::CSend {
            recv: node_field(node, "recv", ids)?,
            name: node.str_field("name")?,
            args: node_list(node, "args", ids)?,
        },
        "index" => NodeKind::Index {
            recv: node_field(node, "recv", ids)?,
            indexes: node_list(node, "indexes", ids)?,
        },
        "indexasgn" => NodeKind::IndexAsgn {
            recv: node_field(node, "recv", ids)?,
            indexes: node_list(node, "indexes", ids)?,
            value: node_field(node, "value", ids)?,
        },
        "binary_op" => NodeKind::BinaryOp {
            op: node.str_field("op")?,
            lhs: node_field(node, "lhs", ids)?,
            rhs: node_field(node, "rhs", ids)?,
        },
        "unary_op" => NodeKind::UnaryOp {
            op: node.str_field("op")?,
            recv: node_field(node, "recv", ids)?,
        },
        "block" => NodeKind::Block {
            call: node_field(node, "call", ids)?,
            params: opt_node_field(node, "params", ids)?,
            body: node_list(node, "body", ids)?,
        },
        "block_pass" => NodeKind::BlockPass {
            value: node_field(node, "value", ids)?,
        },
        "lambda" => NodeKind::Lambda {
            params: opt_node_field(node, "params", ids)?,
            body: node_list(node, "body", ids)?,
        },
        "yield" => NodeKind::Yield {
            args: node_list(node, "args", ids)?,
        },
        "super" => NodeKind::Super {
            args: node_list(node, "args", ids)?,
        },
        "zsuper" => NodeKind::ZSuper,
        "lvar" => NodeKind::Lvar {
            name: node.str_field("name")?,
        },
        "ivar" => NodeKind::Ivar {
            name: node.str_field("name")?,
        },
        "cvar" => NodeKind::Cvar {
            name: node.str_field("name")?,
        },
        "gvar" => NodeKind::Gvar {
            name: node.str_field("name")?,
        },
        "const" => NodeKind::Const {
            scope: opt_node_field(node, "scope", ids)?,
            name: node.str_field("name")?,
        },
        "cbase" => NodeKind::Cbase,
        "nth_ref" => {
            let index = node
                .field("index")?
                .as_u64()
                .ok_or_else(|| {
                    InputError::Malformed("`nth_ref` index is not an integer".to_string())
                })?;
            NodeKind::NthRef {
                index: index as u32,
            }
        }
        "back_ref" => NodeKind::BackRef {
            name: node.str_field("name")?,
        },
        "self" => NodeKind::SelfRef,
        "lvasgn" => NodeKind::Lvasgn {
            name: node.str_field("name")?,
            value: node_field(node, "value", ids)?,
        },
        "ivasgn" => NodeKind::Ivasgn {
            name: node.str_field("name")?,
            value: node_field(node, "value", ids)?,
        },
        "cvasgn" => NodeKind::Cvasgn {
            name: node.str_field("name")?,
            value: node_field(node, "value", ids)?,
        },
        "gvasgn" => NodeKind::Gvasgn {
            name: node.str_field("name")?,
            value: node_field(node, "value", ids)?,
        },
        "casgn" => NodeKind::Casgn {
            scope: opt_node_field(node, "scope", ids)?,
            name: node.str_field("name")?,
            value: node_field(node, "value", ids)?,
        },
        "masgn" => NodeKind::Masgn {
            targets: node_field(node, "targets", ids)?,
            value: node_field(node, "value", ids)?,
        },
        "mlhs" => NodeKind::Mlhs {
            items: node_list(node, "items", ids)?,
        },
        "op_asgn" => NodeKind::OpAsgn {
            target: node_field(node, "target", ids)?,
            op: node.str_field("op")?,
            value: node_field(node, "value", ids)?,
        },
        "or_asgn" => NodeKind::OrAsgn {
            target: node_field(node, "target", ids)?,
            value: node_field(node, "value", ids)?,
        },
        "and_asgn" => NodeKind::AndAsgn {
            target: node_field(node, "target", ids)?,
            value: node_field(node, "value", ids)?,
        },
        "splat" => NodeKind::Splat {
            value: opt_node_field(node, "value", ids)?,
        },
        "kwsplat" => NodeKind::KwSplat {
            value: node_field(node, "value", ids)?,
        },
        "if" => NodeKind::If {
            cond: node_field(node, "cond", ids)?,
            then_body: node_list(node, "then_body", ids)?,
            else_body: node_list(node, "else_body", ids)?,
        },
        "unless" => NodeKind::Unless {
            cond: node_field(node, "cond", ids)?,
            then_body: node_list(node, "then_body", ids)?,
            else_body: node_list(node, "else_body", ids)?,
        },
        "ternary" => NodeKind::Ternary {
            cond: node_field(node, "cond", ids)?,
            then_expr: node_field(node, "then_expr", ids)?,
            else_expr: node_field(node, "else_expr", ids)?,
        },
        "while" => NodeKind::While {
            cond: node_field(node, "cond", ids)?,
            body: node_list(node, "body", ids)?,
        },
        "until" => NodeKind::Until {
            cond: node_field(node, "cond", ids)?,
            body: node_list(node, "body", ids)?,
        },
        "for" => NodeKind::For {
            var: node_field(node, "var", ids)?,
            iterable: node_field(node, "iterable", ids)?,
            body: node_list(node, "body", ids)?,
        },
        "case" => NodeKind::Case {
            subject: opt_node_field(node, "subject", ids)?,
            whens: node_list(node, "whens", ids)?,
            else_body: node_list(node, "else_body", ids)?,
        },
        "when" => NodeKind::When {
            patterns: node_list(node, "patterns", ids)?,
            body: node_list(node, "body", ids)?,
        },
        "rescue" => NodeKind::Rescue {
            body: node_list(node, "body", ids)?,
            clauses: node_list(node, "clauses", ids)?,
            else_body: node_list(node, "else_body", ids)?,
        },
        "resbody" => NodeKind::RescueClause {
            exceptions: node_list(node, "exceptions", ids)?,
            binding: opt_node_field(node, "binding", ids)?,
            body: node_list(node, "body", ids)?,
        },
        "ensure" => NodeKind::Ensure {
            body: node_list(node, "body", ids)?,
            ensure_body: node_list(node, "ensure_body", ids)?,
        },
        "return" => NodeKind::Return {
            args: node_list(node, "args", ids)?,
        },
        "break" => NodeKind::Break {
            args: node_list(node, "args", ids)?,
        },
        "next" => NodeKind::Next {
            args: node_list(node, "args", ids)?,
        },
        "redo" => NodeKind::Redo,
        "retry" => NodeKind::Retry,
        "and" => NodeKind::And {
            lhs: node_field(node, "lhs", ids)?,
            rhs: node_field(node, "rhs", ids)?,
        },
        "or" => NodeKind::Or {
            lhs: node_field(node, "lhs", ids)?,
            rhs: node_field(node, "rhs", ids)?,
        },
        "not" => NodeKind::Not {
            value: node_field(node, "value", ids)?,
        },
        "defined?" => NodeKind::Defined {
            value: node_field(node, "value", ids)?,
        },
        "nil" => NodeKind::Nil,
        "true" => NodeKind::True,
        "false" => NodeKind::False,
        "int" => NodeKind::Int {
            value: node.str_field("value")?,
        },
        "float" => NodeKind::Float {
            value: node.str_field("value")?,
        },
        "str" => NodeKind::Str {
            value: node.str_field("value")?,
        },
        "dstr" => NodeKind::DStr {
            parts: node_list(node, "parts", ids)?,
        },
        "interp" => NodeKind::Interp {
            body: node_list(node, "body", ids)?,
        },
        "heredoc" => NodeKind::Heredoc {
            parts: node_list(node, "parts", ids)?,
        },
        "xstr" => NodeKind::XStr {
            parts: node_list(node, "parts", ids)?,
        },
        "sym" => NodeKind::Sym {
            name: node.str_field("name")?,
        },
        "dsym" => NodeKind::DSym {
            parts: node_list(node, "parts", ids)?,
        },
        "regexp" => NodeKind::Regexp {
            parts: node_list(node, "parts", ids)?,
            flags: node.str_field("flags")?,
        },
        "array" => NodeKind::Array {
            elements: node_list(node, "elements", ids)?,
        },
        "hash" => NodeKind::Hash {
            pairs: node_list(node, "pairs", ids)?,
        },
        "pair" => NodeKind::Pair {
            key: node_field(node, "key", ids)?,
            value: node_field(node, "value", ids)?,
        },
        "irange" => NodeKind::IRange {
            low: opt_node_field(node, "low", ids)?,
            high: opt_node_field(node, "high", ids)?,
        },
        "erange" => NodeKind::ERange {
            low: opt_node_field(node, "low", ids)?,
            high: opt_node_field(node, "high", ids)?,
        },
        "preexe" => NodeKind::Preexe {
            body: node_list(node, "body", ids)?,
        },
        "postexe" => NodeKind::Postexe {
            body: node_list(node, "body", ids)?,
        },
        other => {
            return Err(InputError::UnsupportedConstruct {
                tag: other.to_string(),
                line: node.pos.line,
            })
        }
    };

    Ok(kind)
}
