//! Expression layout rules: sends and call chains, operators, assignments,
//! and blocks.

use std::borrow::Cow;

use garnet_syntax::{Node, NodeKind};

use super::{is_keyword_send, Formatter};
use crate::doc::Doc;

impl<'a> Formatter<'a> {
    pub(super) fn send(&mut self, node: &'a Node) -> Doc<'a> {
        // Attribute writers (`recv.name = value`) format like assignments.
        if let NodeKind::Send {
            recv: Some(recv),
            name,
            args,
        } = &node.kind
        {
            if let Some(base) = writer_name(name) {
                if let [value] = args.as_slice() {
                    let target =
                        Doc::concat([self.node(recv), Doc::text("."), Doc::text(base)]);
                    return self.assign(target, "=", value);
                }
            }
        }

        if chain_length(node) >= 2 {
            return self.chain(node);
        }

        self.send_flat(node)
    }

    /// A dot chain of two or more calls: flat on one line, otherwise every
    /// call after the first breaks onto its own indented line at the dot.
    fn chain(&mut self, node: &'a Node) -> Doc<'a> {
        let mut links: Vec<(&'static str, &'a str, &'a [Node])> = Vec::new();
        let mut cur = node;
        loop {
            cur = match &cur.kind {
                NodeKind::Send {
                    recv: Some(recv),
                    name,
                    args,
                } => {
                    links.push((".", name.as_str(), args.as_slice()));
                    recv
                }
                NodeKind::CSend { recv, name, args } => {
                    links.push(("&.", name.as_str(), args.as_slice()));
                    recv
                }
                _ => break,
            };
        }

        let base = self.node(cur);
        let mut tail = Vec::with_capacity(links.len());
        for (sep, name, args) in links.into_iter().rev() {
            tail.push(Doc::concat([
                Doc::softline(),
                Doc::text(sep),
                Doc::text(name),
                self.call_args(args),
            ]));
        }

        Doc::concat([base, Doc::concat(tail).indent()]).group()
    }

    fn send_flat(&mut self, node: &'a Node) -> Doc<'a> {
        let (recv, sep, name, args) = match &node.kind {
            NodeKind::Send { recv, name, args } => (recv.as_deref(), ".", name.as_str(), args),
            NodeKind::CSend { recv, name, args } => {
                (Some(recv.as_ref()), "&.", name.as_str(), args)
            }
            _ => unreachable!("send_flat only handles send nodes"),
        };

        let mut parts = Vec::new();
        if let Some(recv) = recv {
            parts.push(self.node(recv));
            parts.push(Doc::text(sep));
        }
        parts.push(Doc::text(name));

        if recv.is_none() && is_keyword_send(name) && !args.is_empty() {
            parts.push(Doc::text(" "));
            parts.push(self.command_args(args));
        } else {
            parts.push(self.call_args(args));
        }

        Doc::concat(parts)
    }

    /// A parenthesized argument list as one group: all on one line, or one
    /// argument per line indented under the call.
    pub(super) fn call_args(&mut self, args: &'a [Node]) -> Doc<'a> {
        if args.is_empty() {
            return Doc::nil();
        }

        let items = self.arg_items(args);
        Doc::concat([
            Doc::text("("),
            Doc::concat([
                Doc::softline(),
                Doc::join(Doc::concat([Doc::text(","), Doc::line()]), items),
            ])
            .indent(),
            Doc::softline(),
            Doc::text(")"),
        ])
        .group()
    }

    /// Arguments of a parenthesis-free command (`puts 1, 2`).
    pub(super) fn command_args(&mut self, args: &'a [Node]) -> Doc<'a> {
        let items = self.arg_items(args);
        Doc::join(Doc::concat([Doc::text(","), Doc::line()]), items)
            .indent()
            .group()
    }

    /// A keyword-like hash in final argument position drops its braces.
    fn arg_items(&mut self, args: &'a [Node]) -> Vec<Doc<'a>> {
        let last = args.len() - 1;
        args.iter()
            .enumerate()
            .map(|(idx, arg)| match &arg.kind {
                NodeKind::Hash { pairs } if idx == last && !pairs.is_empty() => {
                    self.hash(pairs, false)
                }
                _ => self.node(arg),
            })
            .collect()
    }

    pub(super) fn index(&mut self, recv: &'a Node, indexes: &'a [Node]) -> Doc<'a> {
        let items: Vec<_> = indexes.iter().map(|i| self.node(i)).collect();
        Doc::concat([
            self.node(recv),
            Doc::concat([
                Doc::text("["),
                Doc::concat([
                    Doc::softline(),
                    Doc::join(Doc::concat([Doc::text(","), Doc::line()]), items),
                ])
                .indent(),
                Doc::softline(),
                Doc::text("]"),
            ])
            .group(),
        ])
    }

    pub(super) fn index_assign(
        &mut self,
        recv: &'a Node,
        indexes: &'a [Node],
        value: &'a Node,
    ) -> Doc<'a> {
        let target = self.index(recv, indexes);
        self.assign(target, "=", value)
    }

    pub(super) fn binary(&mut self, op: &'a str, lhs: &'a Node, rhs: &'a Node) -> Doc<'a> {
        Doc::concat([
            self.node(lhs),
            Doc::text(" "),
            Doc::text(op),
            Doc::concat([Doc::line(), self.node(rhs)]).indent(),
        ])
        .group()
    }

    pub(super) fn unary(&mut self, op: &'a str, recv: &'a Node) -> Doc<'a> {
        Doc::concat([Doc::text(op), self.node(recv)])
    }

    pub(super) fn logical(
        &mut self,
        node: &'a Node,
        symbolic: &'static str,
        word: &'static str,
        lhs: &'a Node,
        rhs: &'a Node,
    ) -> Doc<'a> {
        // `and`/`or` bind looser than `&&`/`||`; the spelling is semantic
        // and must survive.
        let op = if self.layout.facts(node.id).keyword_operator {
            word
        } else {
            symbolic
        };
        self.binary(op, lhs, rhs)
    }

    pub(super) fn not(&mut self, node: &'a Node, value: &'a Node) -> Doc<'a> {
        if self.layout.facts(node.id).keyword_operator {
            Doc::concat([Doc::text("not "), self.node(value)])
        } else {
            Doc::concat([Doc::text("!"), self.node(value)])
        }
    }

    /// Target, operator, and value joined so an overlong value moves to its
    /// own indented line. Hash literals and heredocs are the exception: they
    /// stay attached to the operator and only their own contents wrap.
    pub(super) fn assign(
        &mut self,
        lhs: Doc<'a>,
        op: impl Into<Cow<'a, str>>,
        value: &'a Node,
    ) -> Doc<'a> {
        let op = Doc::text(op);
        if value_stays_attached(value) {
            return Doc::concat([
                lhs,
                Doc::text(" "),
                op,
                Doc::text(" "),
                self.node(value),
            ]);
        }

        Doc::concat([
            lhs,
            Doc::text(" "),
            op,
            Doc::concat([Doc::line(), self.node(value)]).indent(),
        ])
        .group()
    }

    pub(super) fn mlhs(&mut self, items: &'a [Node]) -> Doc<'a> {
        let docs: Vec<_> = items.iter().map(|i| self.node(i)).collect();
        Doc::join(Doc::text(", "), docs)
    }

    pub(super) fn constant(&mut self, scope: Option<&'a Node>, name: &'a str) -> Doc<'a> {
        match scope {
            None => Doc::text(name),
            Some(scope) if matches!(scope.kind, NodeKind::Cbase) => {
                Doc::concat([Doc::text("::"), Doc::text(name)])
            }
            Some(scope) => Doc::concat([self.node(scope), Doc::text("::"), Doc::text(name)]),
        }
    }

    pub(super) fn const_assign(
        &mut self,
        scope: Option<&'a Node>,
        name: &'a str,
        value: &'a Node,
    ) -> Doc<'a> {
        let target = self.constant(scope, name);
        self.assign(target, "=", value)
    }

    pub(super) fn keyword_call(&mut self, keyword: &'static str, args: &'a [Node]) -> Doc<'a> {
        if args.is_empty() {
            return Doc::text(keyword);
        }
        Doc::concat([
            Doc::text(keyword),
            Doc::text(" "),
            self.command_args(args),
        ])
    }

    pub(super) fn super_call(&mut self, args: &'a [Node]) -> Doc<'a> {
        if args.is_empty() {
            // `super()` forwards nothing; bare `super` is a different node.
            return Doc::text("super()");
        }
        Doc::concat([Doc::text("super"), self.call_args(args)])
    }

    /// `call { |x| ... }` or `call do ... end`. A single-statement block with
    /// no blank-line metadata prefers the brace form when it fits; anything
    /// else always uses `do`/`end`.
    pub(super) fn block(
        &mut self,
        _node: &'a Node,
        call: &'a Node,
        params: Option<&'a Node>,
        body: &'a [Node],
    ) -> Doc<'a> {
        let call_doc = self.node(call);
        let params_doc = params.map(|p| self.node(p));

        if body.is_empty() {
            let inline = match params_doc {
                Some(params) => {
                    Doc::concat([Doc::text(" { |"), params, Doc::text("| }")])
                }
                None => Doc::text(" {}"),
            };
            return Doc::concat([call_doc, inline]);
        }

        let single = matches!(body, [stmt]
            if !self.comments.has_attached(stmt.id) && self.collapsible(stmt));

        let do_form = self.do_block(params_doc.clone(), body);

        if single {
            let stmt_doc = self.node(&body[0]);
            let brace = match params_doc {
                Some(params) => Doc::concat([
                    Doc::text(" { |"),
                    params,
                    Doc::text("| "),
                    stmt_doc,
                    Doc::text(" }"),
                ]),
                None => Doc::concat([Doc::text(" { "), stmt_doc, Doc::text(" }")]),
            };
            return Doc::concat([call_doc, Doc::if_break(do_form, brace).group()]);
        }

        Doc::concat([call_doc, do_form])
    }

    fn do_block(&mut self, params_doc: Option<Doc<'a>>, body: &'a [Node]) -> Doc<'a> {
        let header = match params_doc {
            Some(params) => {
                Doc::concat([Doc::text(" do |"), params, Doc::text("|")])
            }
            None => Doc::text(" do"),
        };
        Doc::concat([
            header,
            Doc::concat([Doc::hardline(), self.stmt_seq(body)]).indent(),
            Doc::hardline(),
            Doc::text("end"),
        ])
    }

    pub(super) fn lambda(
        &mut self,
        _node: &'a Node,
        params: Option<&'a Node>,
        body: &'a [Node],
    ) -> Doc<'a> {
        let head = match params {
            Some(params) => Doc::concat([
                Doc::text("->("),
                self.node(params),
                Doc::text(")"),
            ]),
            None => Doc::text("->"),
        };

        if body.is_empty() {
            return Doc::concat([head, Doc::text(" {}")]);
        }

        let single = matches!(body, [stmt]
            if !self.comments.has_attached(stmt.id) && self.collapsible(stmt));

        let do_form = Doc::concat([
            Doc::text(" do"),
            Doc::concat([Doc::hardline(), self.stmt_seq(body)]).indent(),
            Doc::hardline(),
            Doc::text("end"),
        ]);

        if single {
            let stmt_doc = self.node(&body[0]);
            let brace = Doc::concat([Doc::text(" { "), stmt_doc, Doc::text(" }")]);
            return Doc::concat([head, Doc::if_break(do_form, brace).group()]);
        }

        Doc::concat([head, do_form])
    }

    /// Explicit grouping parentheses from the source. They always survive:
    /// dropping them would require a precedence analysis this engine does
    /// not do.
    pub(super) fn grouping_parens(&mut self, body: &'a [Node]) -> Doc<'a> {
        let exprs: Vec<_> = body.iter().map(|stmt| self.node(stmt)).collect();
        Doc::concat([
            Doc::text("("),
            Doc::join(Doc::text("; "), exprs),
            Doc::text(")"),
        ])
    }
}

/// Values that stay glued to the assignment operator: only their own
/// contents wrap.
fn value_stays_attached(value: &Node) -> bool {
    matches!(
        value.kind,
        NodeKind::Hash { .. } | NodeKind::Heredoc { .. }
    )
}

fn chain_length(node: &Node) -> usize {
    let mut len = 0;
    let mut cur = node;
    loop {
        cur = match &cur.kind {
            NodeKind::Send {
                recv: Some(recv), ..
            } => {
                len += 1;
                recv
            }
            NodeKind::CSend { recv, .. } => {
                len += 1;
                recv
            }
            _ => return len,
        };
    }
}

/// `name=` is an attribute writer unless it is an operator method.
fn writer_name(name: &str) -> Option<&str> {
    let base = name.strip_suffix('=')?;
    if base.is_empty() {
        return None;
    }
    base.chars()
        .all(|c| c.is_alphanumeric() || c == '_')
        .then_some(base)
}
