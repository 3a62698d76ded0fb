//! Per-construct document building.
//!
//! [`Formatter`] maps each enriched syntax node to a [`Doc`]. The mapping is
//! exhaustive over the construct kinds; layout policy lives here and nowhere
//! else. Group boundaries are chosen so that breaking is always a local,
//! visually meaningful unit: one conditional, one argument list, one
//! literal.

use garnet_syntax::{Layout, Node, NodeKind};
use tracing::trace;

use crate::comments::CommentStore;
use crate::doc::Doc;
use crate::FormatOptions;

mod decl;
mod expr;
mod literals;
mod stmt;

/// Call names that format as keyword-like commands: with a non-empty
/// argument list they take no parentheses (`require "json"`,
/// `attr_reader :name`). Ordinary calls always get parentheses.
const KEYWORD_SENDS: &[&str] = &[
    "alias_method",
    "attr_accessor",
    "attr_reader",
    "attr_writer",
    "define_method",
    "extend",
    "gem",
    "include",
    "load",
    "module_function",
    "prepend",
    "private",
    "private_constant",
    "protected",
    "public",
    "require",
    "require_relative",
    "using",
];

pub(crate) fn is_keyword_send(name: &str) -> bool {
    KEYWORD_SENDS.binary_search(&name).is_ok()
}

pub(crate) struct Formatter<'a> {
    pub(crate) layout: &'a Layout,
    pub(crate) comments: CommentStore,
    pub(crate) options: &'a FormatOptions,
}

impl<'a> Formatter<'a> {
    pub(crate) fn new(
        layout: &'a Layout,
        comments: CommentStore,
        options: &'a FormatOptions,
    ) -> Self {
        Self {
            layout,
            comments,
            options,
        }
    }

    /// Build the document for a whole file.
    pub(crate) fn build(&mut self, root: &'a Node) -> Doc<'a> {
        trace!(node = root.tag(), "building document");
        let NodeKind::Program { body } = &root.kind else {
            return self.stmt(root);
        };

        // A file holding nothing but comments attaches them to the root.
        let mut parts: Vec<Doc<'a>> = Vec::new();
        for comment in self.comments.take_leading(root.id) {
            if !parts.is_empty() {
                parts.push(Doc::hardline());
            }
            parts.push(Doc::text(comment.text));
        }

        let stmts = self.stmt_seq(body);
        if !stmts.is_nil() {
            if !parts.is_empty() {
                parts.push(Doc::hardline());
            }
            parts.push(stmts);
        }

        Doc::concat(parts)
    }

    /// A hardline-separated statement sequence. One blank line is preserved
    /// where the source had one or more.
    pub(crate) fn stmt_seq(&mut self, body: &'a [Node]) -> Doc<'a> {
        let mut parts = Vec::new();
        for (idx, node) in body.iter().enumerate() {
            if idx > 0 {
                parts.push(Doc::hardline());
                if self.layout.facts(node.id).blank_line_before {
                    parts.push(Doc::hardline());
                }
            }
            parts.push(self.stmt(node));
        }
        Doc::concat(parts)
    }

    /// One statement: attached comments interleaved around the node itself.
    pub(crate) fn stmt(&mut self, node: &'a Node) -> Doc<'a> {
        let leading = self.comments.take_leading(node.id);
        let trailing = self.comments.take_trailing(node.id);

        let mut parts = Vec::new();
        for comment in leading {
            parts.push(Doc::text(comment.text));
            parts.push(Doc::hardline());
        }

        parts.push(self.stmt_node(node));

        for comment in trailing {
            if comment.same_line {
                parts.push(Doc::line_suffix(Doc::concat([
                    Doc::text(" "),
                    Doc::text(comment.text),
                ])));
            } else {
                parts.push(Doc::hardline());
                parts.push(Doc::text(comment.text));
            }
        }

        Doc::concat(parts)
    }

    /// Statement-position rendering: conditionals and loops may collapse to
    /// their trailing-modifier form here (never in expression position).
    fn stmt_node(&mut self, node: &'a Node) -> Doc<'a> {
        match &node.kind {
            NodeKind::If {
                cond,
                then_body,
                else_body,
            } => self.conditional(node, "if", cond, then_body, else_body, true),
            NodeKind::Unless {
                cond,
                then_body,
                else_body,
            } => self.conditional(node, "unless", cond, then_body, else_body, true),
            NodeKind::While { cond, body } => self.loop_stmt(node, "while", cond, body, true),
            NodeKind::Until { cond, body } => self.loop_stmt(node, "until", cond, body, true),
            _ => self.node(node),
        }
    }

    /// Expression-position dispatch, exhaustive over every construct kind.
    pub(crate) fn node(&mut self, node: &'a Node) -> Doc<'a> {
        use NodeKind::*;
        match &node.kind {
            Program { body } => self.stmt_seq(body),
            Begin { body } => self.grouping_parens(body),
            KwBegin { body } => self.kwbegin(body),
            Module { name, body } => self.module(name, body),
            Class {
                name,
                superclass,
                body,
            } => self.class(name, superclass.as_deref(), body),
            SingletonClass { object, body } => self.singleton_class(object, body),
            Def { name, args, body } => self.def(None, name, args.as_deref(), body),
            DefSelf {
                recv,
                name,
                args,
                body,
            } => self.def(Some(recv.as_ref()), name, args.as_deref(), body),
            Args { list } => self.arg_list(list),
            Arg { name } => Doc::text(name.as_str()),
            OptArg { name, default } => self.opt_arg(name, default),
            RestArg { name } => self.prefixed_name("*", name.as_deref()),
            KwArg { name } => Doc::concat([Doc::text(name.as_str()), Doc::text(":")]),
            KwOptArg { name, default } => self.kw_opt_arg(name, default),
            KwRestArg { name } => self.prefixed_name("**", name.as_deref()),
            BlockArg { name } => Doc::concat([Doc::text("&"), Doc::text(name.as_str())]),
            Alias { new_name, old_name } => self.alias(new_name, old_name),
            Undef { names } => self.undef(names),
            Send { .. } | CSend { .. } => self.send(node),
            Index { recv, indexes } => self.index(recv, indexes),
            IndexAsgn {
                recv,
                indexes,
                value,
            } => self.index_assign(recv, indexes, value),
            BinaryOp { op, lhs, rhs } => self.binary(op.as_str(), lhs, rhs),
            UnaryOp { op, recv } => self.unary(op.as_str(), recv),
            Block { call, params, body } => self.block(node, call, params.as_deref(), body),
            BlockPass { value } => Doc::concat([Doc::text("&"), self.node(value)]),
            Lambda { params, body } => self.lambda(node, params.as_deref(), body),
            Yield { args } => self.keyword_call("yield", args),
            Super { args } => self.super_call(args),
            ZSuper => Doc::text("super"),
            Lvar { name } | Ivar { name } | Cvar { name } | Gvar { name } => {
                Doc::text(name.as_str())
            }
            Const { scope, name } => self.constant(scope.as_deref(), name),
            Cbase => Doc::nil(),
            NthRef { index } => Doc::text(format!("${index}")),
            BackRef { name } => Doc::text(name.as_str()),
            SelfRef => Doc::text("self"),
            Lvasgn { name, value }
            | Ivasgn { name, value }
            | Cvasgn { name, value }
            | Gvasgn { name, value } => self.assign(Doc::text(name.as_str()), "=", value),
            Casgn { scope, name, value } => self.const_assign(scope.as_deref(), name, value),
            Masgn { targets, value } => {
                let lhs = self.node(targets);
                self.assign(lhs, "=", value)
            }
            Mlhs { items } => self.mlhs(items),
            OpAsgn { target, op, value } => {
                let lhs = self.node(target);
                let op = format!("{op}=");
                self.assign(lhs, op, value)
            }
            OrAsgn { target, value } => {
                let lhs = self.node(target);
                self.assign(lhs, "||=", value)
            }
            AndAsgn { target, value } => {
                let lhs = self.node(target);
                self.assign(lhs, "&&=", value)
            }
            Splat { value } => match value {
                Some(value) => Doc::concat([Doc::text("*"), self.node(value)]),
                None => Doc::text("*"),
            },
            KwSplat { value } => Doc::concat([Doc::text("**"), self.node(value)]),
            If {
                cond,
                then_body,
                else_body,
            } => self.conditional(node, "if", cond, then_body, else_body, false),
            Unless {
                cond,
                then_body,
                else_body,
            } => self.conditional(node, "unless", cond, then_body, else_body, false),
            Ternary {
                cond,
                then_expr,
                else_expr,
            } => self.ternary(cond, then_expr, else_expr),
            While { cond, body } => self.loop_stmt(node, "while", cond, body, false),
            Until { cond, body } => self.loop_stmt(node, "until", cond, body, false),
            For {
                var,
                iterable,
                body,
            } => self.for_loop(var, iterable, body),
            Case {
                subject,
                whens,
                else_body,
            } => self.case(subject.as_deref(), whens, else_body),
            When { patterns, body } => self.when(node, patterns, body),
            Rescue { .. } => self.rescue_body(node),
            RescueClause { .. } => self.rescue_clause(node),
            Ensure { body, ensure_body } => self.ensure(body, ensure_body),
            Return { args } => self.keyword_call("return", args),
            Break { args } => self.keyword_call("break", args),
            Next { args } => self.keyword_call("next", args),
            Redo => Doc::text("redo"),
            Retry => Doc::text("retry"),
            And { lhs, rhs } => self.logical(node, "&&", "and", lhs, rhs),
            Or { lhs, rhs } => self.logical(node, "||", "or", lhs, rhs),
            Not { value } => self.not(node, value),
            Defined { value } => Doc::concat([
                Doc::text("defined?("),
                self.node(value),
                Doc::text(")"),
            ]),
            Nil => Doc::text("nil"),
            True => Doc::text("true"),
            False => Doc::text("false"),
            Int { value } | Float { value } => Doc::text(value.as_str()),
            Str { value } => self.string(node, value),
            DStr { parts } => self.dstr(parts),
            Interp { body } => self.interp(body),
            Heredoc { parts } => self.heredoc(node, parts),
            XStr { parts } => self.xstr(parts),
            Sym { name } => self.symbol(node, name),
            DSym { parts } => self.dsym(parts),
            Regexp { parts, flags } => self.regexp(node, parts, flags),
            Array { elements } => self.array(node, elements),
            Hash { pairs } => self.hash(pairs, true),
            Pair { key, value } => self.pair(key, value),
            IRange { low, high } => self.range("..", low.as_deref(), high.as_deref()),
            ERange { low, high } => self.range("...", low.as_deref(), high.as_deref()),
            Preexe { body } => self.hook_block("BEGIN", body),
            Postexe { body } => self.hook_block("END", body),
        }
    }

    /// Whether a one-line collapse is allowed for a construct: no blank-line
    /// metadata and no comments anywhere inside it.
    pub(crate) fn collapsible(&self, node: &Node) -> bool {
        !self.comments.has_attached_within(node) && !self.has_blank_lines_within(node)
    }

    fn has_blank_lines_within(&self, node: &Node) -> bool {
        node.children().iter().any(|child| {
            self.layout.facts(child.id).blank_line_before || self.has_blank_lines_within(child)
        })
    }
}
