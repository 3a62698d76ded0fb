//! Literal layout rules: strings, heredocs, symbols, regexps, numbers, and
//! collections.

use garnet_syntax::{HeredocDelimiter, HeredocIndent, LiteralStyle, Node, NodeKind, QuoteStyle};

use super::Formatter;
use crate::doc::Doc;
use crate::quotes;

impl<'a> Formatter<'a> {
    pub(super) fn string(&mut self, _node: &'a Node, value: &'a str) -> Doc<'a> {
        Doc::text(quotes::requote(value, self.options.preferred_quote.as_char()))
    }

    pub(super) fn dstr(&mut self, parts: &'a [Node]) -> Doc<'a> {
        let mut out = vec![Doc::text("\"")];
        out.extend(self.interpolated_parts(parts, PartEscape::DoubleQuote));
        out.push(Doc::text("\""));
        Doc::concat(out)
    }

    pub(super) fn interp(&mut self, body: &'a [Node]) -> Doc<'a> {
        let exprs: Vec<_> = body.iter().map(|stmt| self.node(stmt)).collect();
        Doc::concat([
            Doc::text("#{"),
            Doc::join(Doc::text("; "), exprs),
            Doc::text("}"),
        ])
    }

    /// Heredocs render their opening tag inline and defer the body to the
    /// end of the current line, where it belongs syntactically. The body is
    /// verbatim source text and never participates in fitting.
    pub(super) fn heredoc(&mut self, node: &'a Node, parts: &'a [Node]) -> Doc<'a> {
        let delimiter = self
            .layout
            .facts(node.id)
            .heredoc
            .as_ref()
            .expect("correlator records delimiter metadata for every heredoc");

        let opener = heredoc_opener(delimiter);

        let mut body = vec![Doc::text("\n")];
        let mut ends_with_newline = false;
        for part in parts {
            match &part.kind {
                NodeKind::Str { value } => {
                    ends_with_newline = value.ends_with('\n');
                    body.push(Doc::text(value.as_str()));
                }
                _ => {
                    ends_with_newline = false;
                    body.push(self.node(part));
                }
            }
        }
        if !ends_with_newline {
            body.push(Doc::text("\n"));
        }
        body.push(Doc::text(delimiter.tag.as_str()));

        Doc::concat([Doc::text(opener), Doc::line_suffix(Doc::concat(body))])
    }

    pub(super) fn xstr(&mut self, parts: &'a [Node]) -> Doc<'a> {
        let mut out = vec![Doc::text("`")];
        out.extend(self.interpolated_parts(parts, PartEscape::Verbatim));
        out.push(Doc::text("`"));
        Doc::concat(out)
    }

    pub(super) fn symbol(&mut self, _node: &'a Node, name: &'a str) -> Doc<'a> {
        if bare_symbol_ok(name) {
            Doc::concat([Doc::text(":"), Doc::text(name)])
        } else {
            Doc::concat([
                Doc::text(":"),
                Doc::text(quotes::requote(
                    name,
                    self.options.preferred_quote.as_char(),
                )),
            ])
        }
    }

    pub(super) fn dsym(&mut self, parts: &'a [Node]) -> Doc<'a> {
        let mut out = vec![Doc::text(":\"")];
        out.extend(self.interpolated_parts(parts, PartEscape::DoubleQuote));
        out.push(Doc::text("\""));
        Doc::concat(out)
    }

    pub(super) fn regexp(&mut self, node: &'a Node, parts: &'a [Node], flags: &'a str) -> Doc<'a> {
        let percent = self.layout.facts(node.id).literal_style == Some(LiteralStyle::Percent);
        let (open, close) = if percent { ("%r{", "}") } else { ("/", "/") };

        let mut out = vec![Doc::text(open)];
        out.extend(self.interpolated_parts(parts, PartEscape::Verbatim));
        out.push(Doc::text(close));
        out.push(Doc::text(flags));
        Doc::concat(out)
    }

    fn interpolated_parts(
        &mut self,
        parts: &'a [Node],
        escape: PartEscape,
    ) -> Vec<Doc<'a>> {
        parts
            .iter()
            .map(|part| match &part.kind {
                NodeKind::Str { value } => match escape {
                    PartEscape::DoubleQuote => Doc::text(quotes::escape_double_part(value)),
                    PartEscape::Verbatim => Doc::text(value.as_str()),
                },
                _ => self.node(part),
            })
            .collect()
    }

    pub(super) fn array(&mut self, node: &'a Node, elements: &'a [Node]) -> Doc<'a> {
        match self.layout.facts(node.id).literal_style {
            Some(LiteralStyle::WordList) => self.word_list("%w[", elements),
            Some(LiteralStyle::SymbolList) => self.word_list("%i[", elements),
            _ => self.bracket_collection(elements),
        }
    }

    fn bracket_collection(&mut self, elements: &'a [Node]) -> Doc<'a> {
        if elements.is_empty() {
            return Doc::text("[]");
        }

        let items: Vec<_> = elements.iter().map(|e| self.node(e)).collect();
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
        .group()
    }

    /// Word and symbol lists reflow like prose: as many words per line as
    /// fit, rather than one element per line.
    fn word_list(&mut self, open: &'static str, elements: &'a [Node]) -> Doc<'a> {
        if elements.is_empty() {
            return Doc::concat([Doc::text(open), Doc::text("]")]);
        }

        let mut parts = Vec::with_capacity(elements.len() * 2);
        for (idx, element) in elements.iter().enumerate() {
            if idx > 0 {
                parts.push(Doc::line());
            }
            match &element.kind {
                NodeKind::Str { value } | NodeKind::Sym { name: value } => {
                    parts.push(Doc::text(value.as_str()));
                }
                _ => parts.push(self.node(element)),
            }
        }

        Doc::concat([
            Doc::text(open),
            Doc::concat([Doc::softline(), Doc::fill(parts)]).indent(),
            Doc::softline(),
            Doc::text("]"),
        ])
        .group()
    }

    pub(super) fn hash(&mut self, pairs: &'a [Node], braced: bool) -> Doc<'a> {
        if pairs.is_empty() {
            return Doc::text("{}");
        }

        let items: Vec<_> = pairs.iter().map(|p| self.node(p)).collect();
        let joined = Doc::join(Doc::concat([Doc::text(","), Doc::line()]), items);

        if braced {
            Doc::concat([
                Doc::text("{"),
                Doc::concat([Doc::line(), joined]).indent(),
                Doc::line(),
                Doc::text("}"),
            ])
            .group()
        } else {
            joined.group()
        }
    }

    pub(super) fn pair(&mut self, key: &'a Node, value: &'a Node) -> Doc<'a> {
        if let NodeKind::Sym { name } = &key.kind {
            if bare_symbol_ok(name) && !name.ends_with(['?', '!', '=']) {
                return Doc::concat([
                    Doc::text(name.as_str()),
                    Doc::text(": "),
                    self.node(value),
                ]);
            }
        }
        Doc::concat([self.node(key), Doc::text(" => "), self.node(value)])
    }

    pub(super) fn range(
        &mut self,
        op: &'static str,
        low: Option<&'a Node>,
        high: Option<&'a Node>,
    ) -> Doc<'a> {
        Doc::concat([
            low.map_or_else(Doc::nil, |low| self.node(low)),
            Doc::text(op),
            high.map_or_else(Doc::nil, |high| self.node(high)),
        ])
    }
}

#[derive(Clone, Copy)]
enum PartEscape {
    /// Escape for a double-quoted context (plain segments of `"..."`).
    DoubleQuote,
    /// Verbatim source text (regexp bodies, backtick strings).
    Verbatim,
}

fn heredoc_opener(delimiter: &HeredocDelimiter) -> String {
    let marker = match delimiter.indent {
        HeredocIndent::None => "",
        HeredocIndent::Dash => "-",
        HeredocIndent::Squiggly => "~",
    };
    match delimiter.quote {
        Some(QuoteStyle::Single) => format!("<<{marker}'{}'", delimiter.tag),
        Some(QuoteStyle::Double) => format!("<<{marker}\"{}\"", delimiter.tag),
        None => format!("<<{marker}{}", delimiter.tag),
    }
}

/// Whether a symbol can render without quotes.
fn bare_symbol_ok(name: &str) -> bool {
    const OPERATORS: &[&str] = &[
        "+", "-", "*", "/", "%", "**", "==", "!=", "<", "<=", ">", ">=", "<=>", "<<", ">>",
        "[]", "[]=", "!", "~", "&", "|", "^", "=~", "===",
    ];
    if OPERATORS.contains(&name) {
        return true;
    }

    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_' || first == '@' || first == '$') {
        return false;
    }

    let rest: Vec<char> = chars.collect();
    let body = match rest.last() {
        Some('?' | '!' | '=') => &rest[..rest.len() - 1],
        _ => &rest[..],
    };
    body.iter()
        .all(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '@')
}
