//! Statement layout rules: conditionals, loops, case dispatch, and
//! begin/rescue/ensure bodies.

use garnet_syntax::{Node, NodeKind};

use super::Formatter;
use crate::doc::Doc;

impl<'a> Formatter<'a> {
    /// `if`/`unless`. In statement position a single-statement, else-less
    /// conditional collapses to the trailing-modifier form when the whole
    /// construct fits on one line.
    pub(super) fn conditional(
        &mut self,
        node: &'a Node,
        keyword: &'static str,
        cond: &'a Node,
        then_body: &'a [Node],
        else_body: &'a [Node],
        stmt_position: bool,
    ) -> Doc<'a> {
        let cond_doc = self.node(cond);

        let modifier_ok = stmt_position
            && else_body.is_empty()
            && then_body.len() == 1
            && !self.comments.has_attached(then_body[0].id)
            && self.collapsible(node);

        if modifier_ok {
            let stmt_doc = self.node(&then_body[0]);
            let block = block_conditional(
                keyword,
                cond_doc.clone(),
                Doc::concat([Doc::hardline(), stmt_doc.clone()]).indent(),
                Doc::nil(),
            );
            let modifier = Doc::concat([
                stmt_doc,
                Doc::text(" "),
                Doc::text(keyword),
                Doc::text(" "),
                cond_doc,
            ]);
            return Doc::if_break(block, modifier).group();
        }

        let then_doc = if then_body.is_empty() {
            Doc::nil()
        } else {
            Doc::concat([Doc::hardline(), self.stmt_seq(then_body)]).indent()
        };

        let else_doc = self.else_chain(keyword, else_body);
        block_conditional(keyword, cond_doc, then_doc, else_doc)
    }

    /// The else side of a conditional. An `if` whose else branch holds a
    /// single conditional renders as an `elsif` continuation (the two forms
    /// are equivalent; the chain is canonical).
    fn else_chain(&mut self, keyword: &'static str, else_body: &'a [Node]) -> Doc<'a> {
        if else_body.is_empty() {
            return Doc::nil();
        }

        if keyword == "if" {
            if let [inner] = else_body {
                if let NodeKind::If {
                    cond,
                    then_body,
                    else_body: nested_else,
                } = &inner.kind
                {
                    if !self.comments.has_attached(inner.id) {
                        let cond_doc = self.node(cond);
                        let then_doc = if then_body.is_empty() {
                            Doc::nil()
                        } else {
                            Doc::concat([Doc::hardline(), self.stmt_seq(then_body)]).indent()
                        };
                        let nested = self.else_chain(keyword, nested_else);
                        return Doc::concat([
                            Doc::hardline(),
                            Doc::text("elsif "),
                            cond_doc,
                            then_doc,
                            nested,
                        ]);
                    }
                }
            }
        }

        Doc::concat([
            Doc::hardline(),
            Doc::text("else"),
            Doc::concat([Doc::hardline(), self.stmt_seq(else_body)]).indent(),
        ])
    }

    /// `while`/`until`, with the same modifier collapse as conditionals.
    /// A `begin ... end while cond` post-test loop always keeps the modifier
    /// form: rewriting it as a head-test loop would skip the first
    /// iteration.
    pub(super) fn loop_stmt(
        &mut self,
        node: &'a Node,
        keyword: &'static str,
        cond: &'a Node,
        body: &'a [Node],
        stmt_position: bool,
    ) -> Doc<'a> {
        let cond_doc = self.node(cond);

        if let [stmt] = body {
            if matches!(stmt.kind, NodeKind::KwBegin { .. }) {
                return Doc::concat([
                    self.stmt(stmt),
                    Doc::text(" "),
                    Doc::text(keyword),
                    Doc::text(" "),
                    cond_doc,
                ]);
            }
        }

        let modifier_ok = stmt_position
            && body.len() == 1
            && !self.comments.has_attached(body[0].id)
            && self.collapsible(node);

        if modifier_ok {
            let stmt_doc = self.node(&body[0]);
            let block = loop_block(keyword, cond_doc.clone(), stmt_doc.clone());
            let modifier = Doc::concat([
                stmt_doc,
                Doc::text(" "),
                Doc::text(keyword),
                Doc::text(" "),
                cond_doc,
            ]);
            return Doc::if_break(block, modifier).group();
        }

        let body_doc = if body.is_empty() {
            Doc::nil()
        } else {
            Doc::concat([Doc::hardline(), self.stmt_seq(body)]).indent()
        };
        Doc::concat([
            Doc::text(keyword),
            Doc::text(" "),
            cond_doc,
            body_doc,
            Doc::hardline(),
            Doc::text("end"),
        ])
    }

    pub(super) fn for_loop(
        &mut self,
        var: &'a Node,
        iterable: &'a Node,
        body: &'a [Node],
    ) -> Doc<'a> {
        let body_doc = if body.is_empty() {
            Doc::nil()
        } else {
            Doc::concat([Doc::hardline(), self.stmt_seq(body)]).indent()
        };
        Doc::concat([
            Doc::text("for "),
            self.node(var),
            Doc::text(" in "),
            self.node(iterable),
            body_doc,
            Doc::hardline(),
            Doc::text("end"),
        ])
    }

    pub(super) fn ternary(
        &mut self,
        cond: &'a Node,
        then_expr: &'a Node,
        else_expr: &'a Node,
    ) -> Doc<'a> {
        // Wrapped branches line up with each other under the `?`.
        Doc::concat([
            self.node(cond),
            Doc::concat([
                Doc::line(),
                Doc::text("? "),
                self.node(then_expr),
                Doc::line(),
                Doc::text(": "),
                self.node(else_expr),
            ])
            .align(2),
        ])
        .group()
    }

    pub(super) fn case(
        &mut self,
        subject: Option<&'a Node>,
        whens: &'a [Node],
        else_body: &'a [Node],
    ) -> Doc<'a> {
        let mut parts = vec![Doc::text("case")];
        if let Some(subject) = subject {
            parts.push(Doc::text(" "));
            parts.push(self.node(subject));
        }

        for when in whens {
            parts.push(Doc::hardline());
            parts.push(self.stmt(when));
        }

        if !else_body.is_empty() {
            parts.push(Doc::hardline());
            parts.push(Doc::text("else"));
            parts.push(Doc::concat([Doc::hardline(), self.stmt_seq(else_body)]).indent());
        }

        parts.push(Doc::hardline());
        parts.push(Doc::text("end"));
        Doc::concat(parts)
    }

    /// `when a, b then expr` on one line when it fits, otherwise the body
    /// indents under the `when`.
    pub(super) fn when(
        &mut self,
        _node: &'a Node,
        patterns: &'a [Node],
        body: &'a [Node],
    ) -> Doc<'a> {
        let pattern_docs: Vec<_> = patterns.iter().map(|p| self.node(p)).collect();
        let head = Doc::concat([
            Doc::text("when "),
            Doc::join(Doc::text(", "), pattern_docs),
        ]);

        if body.is_empty() {
            return head;
        }

        let single = matches!(body, [stmt]
            if !self.comments.has_attached(stmt.id) && self.collapsible(stmt));

        if single {
            let stmt_doc = self.node(&body[0]);
            let broken = Doc::concat([Doc::hardline(), stmt_doc.clone()]).indent();
            let flat = Doc::concat([Doc::text(" then "), stmt_doc]);
            return Doc::concat([head, Doc::if_break(broken, flat)]).group();
        }

        Doc::concat([
            head,
            Doc::concat([Doc::hardline(), self.stmt_seq(body)]).indent(),
        ])
    }

    pub(super) fn kwbegin(&mut self, body: &'a [Node]) -> Doc<'a> {
        let inner = if body.is_empty() {
            Doc::nil()
        } else {
            Doc::concat([Doc::hardline(), self.stmt_seq(body)]).indent()
        };
        Doc::concat([
            Doc::text("begin"),
            inner,
            Doc::hardline(),
            Doc::text("end"),
        ])
    }

    /// A rescued body. The statements render at the current indent; each
    /// `rescue` (and a trailing `else`) dedents its keyword back to the
    /// enclosing construct's level.
    pub(super) fn rescue_body(&mut self, node: &'a Node) -> Doc<'a> {
        let NodeKind::Rescue {
            body,
            clauses,
            else_body,
        } = &node.kind
        else {
            unreachable!("rescue_body only handles rescue nodes");
        };

        let mut parts = vec![self.stmt_seq(body)];
        for clause in clauses {
            // Clause comments render at the body's indent, above the
            // dedented `rescue` keyword.
            for comment in self.comments.take_leading(clause.id) {
                parts.push(Doc::hardline());
                parts.push(Doc::text(comment.text));
            }
            parts.push(self.rescue_clause(clause));
            for comment in self.comments.take_trailing(clause.id) {
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
        }

        if !else_body.is_empty() {
            parts.push(Doc::concat([Doc::hardline(), Doc::text("else")]).dedent());
            parts.push(Doc::hardline());
            parts.push(self.stmt_seq(else_body));
        }

        Doc::concat(parts)
    }

    pub(super) fn rescue_clause(&mut self, node: &'a Node) -> Doc<'a> {
        let NodeKind::RescueClause {
            exceptions,
            binding,
            body,
        } = &node.kind
        else {
            unreachable!("rescue_clause only handles resbody nodes");
        };

        let mut header = vec![Doc::text("rescue")];
        if !exceptions.is_empty() {
            let docs: Vec<_> = exceptions.iter().map(|e| self.node(e)).collect();
            header.push(Doc::text(" "));
            header.push(Doc::join(Doc::text(", "), docs));
        }
        if let Some(binding) = binding {
            header.push(Doc::text(" => "));
            header.push(self.node(binding));
        }

        let mut parts = vec![Doc::concat([Doc::hardline(), Doc::concat(header)]).dedent()];
        if !body.is_empty() {
            parts.push(Doc::hardline());
            parts.push(self.stmt_seq(body));
        }
        Doc::concat(parts)
    }

    pub(super) fn ensure(&mut self, body: &'a [Node], ensure_body: &'a [Node]) -> Doc<'a> {
        let mut parts = Vec::new();
        if !body.is_empty() {
            parts.push(self.stmt_seq(body));
        }
        parts.push(Doc::concat([Doc::hardline(), Doc::text("ensure")]).dedent());
        if !ensure_body.is_empty() {
            parts.push(Doc::hardline());
            parts.push(self.stmt_seq(ensure_body));
        }
        Doc::concat(parts)
    }
}

fn block_conditional<'a>(
    keyword: &'static str,
    cond: Doc<'a>,
    then_doc: Doc<'a>,
    else_doc: Doc<'a>,
) -> Doc<'a> {
    Doc::concat([
        Doc::text(keyword),
        Doc::text(" "),
        cond,
        then_doc,
        else_doc,
        Doc::hardline(),
        Doc::text("end"),
    ])
}

fn loop_block<'a>(keyword: &'static str, cond: Doc<'a>, stmt: Doc<'a>) -> Doc<'a> {
    Doc::concat([
        Doc::text(keyword),
        Doc::text(" "),
        cond,
        Doc::concat([Doc::hardline(), stmt]).indent(),
        Doc::hardline(),
        Doc::text("end"),
    ])
}
