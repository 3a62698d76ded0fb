//! Declaration layout rules: modules, classes, method definitions, and
//! parameter lists.

use garnet_syntax::{Node, NodeKind};

use super::Formatter;
use crate::doc::Doc;

impl<'a> Formatter<'a> {
    pub(super) fn module(&mut self, name: &'a Node, body: &'a [Node]) -> Doc<'a> {
        Doc::concat([
            Doc::text("module "),
            self.node(name),
            self.decl_body(body),
        ])
    }

    pub(super) fn class(
        &mut self,
        name: &'a Node,
        superclass: Option<&'a Node>,
        body: &'a [Node],
    ) -> Doc<'a> {
        let mut parts = vec![Doc::text("class "), self.node(name)];
        if let Some(superclass) = superclass {
            parts.push(Doc::text(" < "));
            parts.push(self.node(superclass));
        }
        parts.push(self.decl_body(body));
        Doc::concat(parts)
    }

    pub(super) fn singleton_class(&mut self, object: &'a Node, body: &'a [Node]) -> Doc<'a> {
        Doc::concat([
            Doc::text("class << "),
            self.node(object),
            self.decl_body(body),
        ])
    }

    /// `def name(params)` with the body indented one level. Parameter lists
    /// always get parentheses; the list is one group, so it either fits on
    /// the definition line or explodes one parameter per line.
    pub(super) fn def(
        &mut self,
        recv: Option<&'a Node>,
        name: &'a str,
        args: Option<&'a Node>,
        body: &'a [Node],
    ) -> Doc<'a> {
        let mut parts = vec![Doc::text("def ")];
        if let Some(recv) = recv {
            parts.push(self.node(recv));
            parts.push(Doc::text("."));
        }
        parts.push(Doc::text(name));

        if let Some(args) = args {
            if let NodeKind::Args { list } = &args.kind {
                if !list.is_empty() {
                    parts.push(self.def_params(list));
                }
            }
        }

        parts.push(self.decl_body(body));
        Doc::concat(parts)
    }

    fn def_params(&mut self, list: &'a [Node]) -> Doc<'a> {
        let items: Vec<_> = list.iter().map(|arg| self.node(arg)).collect();
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

    /// Block and lambda parameter lists (no enclosing delimiters of their
    /// own; the caller adds `| |` or parentheses).
    pub(super) fn arg_list(&mut self, list: &'a [Node]) -> Doc<'a> {
        let items: Vec<_> = list.iter().map(|arg| self.node(arg)).collect();
        Doc::join(Doc::text(", "), items)
    }

    pub(super) fn opt_arg(&mut self, name: &'a str, default: &'a Node) -> Doc<'a> {
        Doc::concat([Doc::text(name), Doc::text(" = "), self.node(default)])
    }

    pub(super) fn kw_opt_arg(&mut self, name: &'a str, default: &'a Node) -> Doc<'a> {
        Doc::concat([Doc::text(name), Doc::text(": "), self.node(default)])
    }

    pub(super) fn prefixed_name(
        &mut self,
        prefix: &'static str,
        name: Option<&'a str>,
    ) -> Doc<'a> {
        match name {
            Some(name) => Doc::concat([Doc::text(prefix), Doc::text(name)]),
            None => Doc::text(prefix),
        }
    }

    pub(super) fn alias(&mut self, new_name: &'a Node, old_name: &'a Node) -> Doc<'a> {
        Doc::concat([
            Doc::text("alias "),
            self.bare_name(new_name),
            Doc::text(" "),
            self.bare_name(old_name),
        ])
    }

    pub(super) fn undef(&mut self, names: &'a [Node]) -> Doc<'a> {
        let docs: Vec<_> = names.iter().map(|n| self.bare_name(n)).collect();
        Doc::concat([Doc::text("undef "), Doc::join(Doc::text(", "), docs)])
    }

    /// `alias`/`undef` take bare method names; a symbol in that position
    /// drops its colon.
    fn bare_name(&mut self, node: &'a Node) -> Doc<'a> {
        match &node.kind {
            NodeKind::Sym { name } => Doc::text(name.as_str()),
            _ => self.node(node),
        }
    }

    /// `BEGIN { ... }` / `END { ... }` always keep their braces.
    pub(super) fn hook_block(&mut self, keyword: &'static str, body: &'a [Node]) -> Doc<'a> {
        if body.is_empty() {
            return Doc::concat([Doc::text(keyword), Doc::text(" {}")]);
        }

        let single = matches!(body, [stmt]
            if !self.comments.has_attached(stmt.id) && self.collapsible(stmt));

        let multi = Doc::concat([
            Doc::text(keyword),
            Doc::text(" {"),
            Doc::concat([Doc::hardline(), self.stmt_seq(body)]).indent(),
            Doc::hardline(),
            Doc::text("}"),
        ]);

        if single {
            let stmt_doc = self.node(&body[0]);
            let flat = Doc::concat([
                Doc::text(keyword),
                Doc::text(" { "),
                stmt_doc,
                Doc::text(" }"),
            ]);
            return Doc::if_break(multi, flat).group();
        }

        multi
    }

    fn decl_body(&mut self, body: &'a [Node]) -> Doc<'a> {
        if body.is_empty() {
            return Doc::concat([Doc::hardline(), Doc::text("end")]);
        }
        Doc::concat([
            Doc::concat([Doc::hardline(), self.stmt_seq(body)]).indent(),
            Doc::hardline(),
            Doc::text("end"),
        ])
    }
}
