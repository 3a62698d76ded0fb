//! The layout-agnostic document model and its renderer.
//!
//! A [`Doc`] describes *what* to print and where breaking is allowed; the
//! [`print`] function decides *how* each [`Group`](Doc::group) actually
//! renders, flat or broken, against a line-width budget. The algorithm is a
//! single left-to-right pass with bounded lookahead (the fits-test), in the
//! Wadler/Prettier tradition: no backtracking, linear in document size.
//!
//! Documents are immutable values shared by reference counting, so the
//! fits-test can look ahead without copying subtrees.

use std::borrow::Cow;
use std::rc::Rc;

/// Rendering configuration for [`print`].
#[derive(Debug, Clone, Copy)]
pub struct PrintConfig {
    pub max_width: usize,
    pub indent_width: usize,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            max_width: 79,
            indent_width: 2,
        }
    }
}

/// Resolved rendering mode of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Flat,
    Break,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// `" "` when flat, a newline when broken.
    Line,
    /// `""` when flat, a newline when broken.
    Soft,
    /// Always a newline; forces every enclosing group to break.
    Hard,
}

#[derive(Debug)]
enum DocKind<'a> {
    Nil,
    Text(Cow<'a, str>),
    Concat(Vec<Doc<'a>>),
    Group(Doc<'a>),
    /// One indentation level deeper for contained line breaks.
    Indent(Doc<'a>),
    /// One indentation level shallower for contained line breaks.
    Dedent(Doc<'a>),
    /// A fixed column offset, independent of the indent width. Used where
    /// continuation lines must line up under a specific character (ternary
    /// branches under their `?`).
    Align(usize, Doc<'a>),
    Line(LineKind),
    /// Deferred content printed just before the break that ends the current
    /// line. Carries trailing comments and heredoc bodies; excluded from
    /// fitting so arbitrarily long content here never forces a wrap.
    LineSuffix(Doc<'a>),
    /// Forces enclosing groups to break without emitting anything itself.
    BreakParent,
    /// Alternating content/separator parts packed greedily onto lines.
    Fill(Vec<Doc<'a>>),
    /// Content conditional on the enclosing group's resolved mode.
    IfBreak {
        broken: Doc<'a>,
        flat: Doc<'a>,
    },
}

/// A composable layout description.
///
/// Cheaply cloneable; clones share structure.
#[derive(Clone, Debug)]
pub struct Doc<'a>(Rc<DocKind<'a>>);

impl<'a> Doc<'a> {
    fn new(kind: DocKind<'a>) -> Self {
        Self(Rc::new(kind))
    }

    fn kind(&self) -> &DocKind<'a> {
        self.0.as_ref()
    }

    /// An empty document.
    pub fn nil() -> Self {
        Self::new(DocKind::Nil)
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self.kind(), DocKind::Nil)
    }

    /// A text fragment. Must not contain layout-significant newlines; use
    /// the line constructors for those. (Verbatim multi-line content such as
    /// heredoc bodies is the one deliberate exception.)
    pub fn text<T>(text: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        Self::new(DocKind::Text(text.into()))
    }

    /// Concatenation. Nil members are dropped and nested concats flattened.
    pub fn concat<I>(docs: I) -> Self
    where
        I: IntoIterator<Item = Doc<'a>>,
    {
        let mut parts = Vec::new();
        for doc in docs {
            match doc.kind() {
                DocKind::Nil => {}
                DocKind::Concat(inner) => parts.extend(inner.iter().cloned()),
                _ => parts.push(doc),
            }
        }

        match parts.len() {
            0 => Self::nil(),
            1 => parts.pop().expect("one part"),
            _ => Self::new(DocKind::Concat(parts)),
        }
    }

    /// The atomic unit of the fits-test: the group renders entirely flat if
    /// its flat form fits the remaining width, otherwise entirely broken.
    pub fn group(self) -> Self {
        Self::new(DocKind::Group(self))
    }

    /// One indentation level deeper for line breaks inside `self`.
    pub fn indent(self) -> Self {
        Self::new(DocKind::Indent(self))
    }

    /// One indentation level shallower for line breaks inside `self`.
    pub fn dedent(self) -> Self {
        Self::new(DocKind::Dedent(self))
    }

    /// A fixed `width`-column offset for line breaks inside `self`.
    pub fn align(self, width: usize) -> Self {
        Self::new(DocKind::Align(width, self))
    }

    /// A break that collapses to a space when flat.
    pub fn line() -> Self {
        Self::new(DocKind::Line(LineKind::Line))
    }

    /// A break that collapses to nothing when flat.
    pub fn softline() -> Self {
        Self::new(DocKind::Line(LineKind::Soft))
    }

    /// An unconditional newline. Every enclosing group breaks.
    pub fn hardline() -> Self {
        Self::new(DocKind::Line(LineKind::Hard))
    }

    /// `broken` when the enclosing group breaks, `flat` otherwise.
    pub fn if_break(broken: Doc<'a>, flat: Doc<'a>) -> Self {
        Self::new(DocKind::IfBreak { broken, flat })
    }

    /// Defer `doc` to the end of the current line.
    pub fn line_suffix(doc: Doc<'a>) -> Self {
        Self::new(DocKind::LineSuffix(doc))
    }

    /// Force the enclosing groups to break.
    pub fn break_parent() -> Self {
        Self::new(DocKind::BreakParent)
    }

    /// Greedily pack alternating content/separator `parts` onto lines.
    pub fn fill<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = Doc<'a>>,
    {
        let items: Vec<_> = parts.into_iter().filter(|p| !p.is_nil()).collect();
        match items.len() {
            0 => Self::nil(),
            1 => items.into_iter().next().expect("one part"),
            _ => Self::new(DocKind::Fill(items)),
        }
    }

    /// Join non-nil `docs` with `separator`.
    pub fn join<I>(separator: Doc<'a>, docs: I) -> Self
    where
        I: IntoIterator<Item = Doc<'a>>,
    {
        let mut parts = Vec::new();
        for doc in docs {
            if doc.is_nil() {
                continue;
            }
            if !parts.is_empty() {
                parts.push(separator.clone());
            }
            parts.push(doc);
        }
        Self::concat(parts)
    }
}

#[derive(Clone, Debug)]
enum Command<'a> {
    Doc {
        indent: usize,
        mode: Mode,
        doc: Doc<'a>,
    },
    Fill {
        indent: usize,
        mode: Mode,
        doc: Doc<'a>,
        index: usize,
    },
}

/// Render `doc` against `config`.
///
/// Iterative: a stack of [`Command`]s replaces recursion, and each group in
/// break mode runs a [`fits`] lookahead to decide whether it can flatten.
#[must_use]
pub fn print<'a>(doc: Doc<'a>, config: PrintConfig) -> String {
    let mut out = String::new();
    let mut pos: usize = 0;

    let mut stack = vec![Command::Doc {
        indent: 0,
        mode: Mode::Break,
        doc,
    }];

    let mut line_suffixes: Vec<Command<'a>> = Vec::new();

    while !stack.is_empty() || !line_suffixes.is_empty() {
        if stack.is_empty() {
            flush_line_suffixes(&mut stack, &mut line_suffixes);
            continue;
        }

        match stack.pop().expect("stack is not empty") {
            Command::Doc { indent, mode, doc } => match doc.kind() {
                DocKind::Nil => {}
                DocKind::Text(text) => {
                    out.push_str(text);
                    pos = pos.saturating_add(text_width(text));
                }
                DocKind::Concat(parts) => {
                    for part in parts.iter().rev() {
                        stack.push(Command::Doc {
                            indent,
                            mode,
                            doc: part.clone(),
                        });
                    }
                }
                DocKind::Group(inner) => match mode {
                    Mode::Flat => stack.push(Command::Doc {
                        indent,
                        mode: Mode::Flat,
                        doc: inner.clone(),
                    }),
                    Mode::Break => {
                        let remaining = config.max_width as isize - pos as isize;
                        let lookahead = vec![Command::Doc {
                            indent,
                            mode: Mode::Flat,
                            doc: inner.clone(),
                        }];

                        let next_mode = if fits(remaining, &stack, &lookahead, config) {
                            Mode::Flat
                        } else {
                            Mode::Break
                        };
                        stack.push(Command::Doc {
                            indent,
                            mode: next_mode,
                            doc: inner.clone(),
                        });
                    }
                },
                DocKind::Indent(inner) => stack.push(Command::Doc {
                    indent: indent.saturating_add(config.indent_width),
                    mode,
                    doc: inner.clone(),
                }),
                DocKind::Dedent(inner) => stack.push(Command::Doc {
                    indent: indent.saturating_sub(config.indent_width),
                    mode,
                    doc: inner.clone(),
                }),
                DocKind::Align(width, inner) => stack.push(Command::Doc {
                    indent: indent.saturating_add(*width),
                    mode,
                    doc: inner.clone(),
                }),
                DocKind::Line(kind) => {
                    let will_break = match mode {
                        Mode::Break => true,
                        Mode::Flat => matches!(kind, LineKind::Hard),
                    };

                    // Pending suffixes render before the break that would end
                    // their line.
                    if will_break && !line_suffixes.is_empty() {
                        stack.push(Command::Doc {
                            indent,
                            mode,
                            doc: doc.clone(),
                        });
                        flush_line_suffixes(&mut stack, &mut line_suffixes);
                        continue;
                    }

                    if will_break {
                        trim_trailing_blanks(&mut out);
                        out.push('\n');
                        push_spaces(&mut out, indent);
                        pos = indent;
                    } else {
                        match kind {
                            LineKind::Line => {
                                out.push(' ');
                                pos = pos.saturating_add(1);
                            }
                            LineKind::Soft => {}
                            LineKind::Hard => unreachable!("hard breaks always break"),
                        }
                    }
                }
                DocKind::LineSuffix(inner) => {
                    line_suffixes.push(Command::Doc {
                        indent,
                        mode,
                        doc: inner.clone(),
                    });
                }
                DocKind::BreakParent => {}
                DocKind::Fill(_) => stack.push(Command::Fill {
                    indent,
                    mode,
                    doc: doc.clone(),
                    index: 0,
                }),
                DocKind::IfBreak { broken, flat } => {
                    let chosen = if mode == Mode::Break {
                        broken.clone()
                    } else {
                        flat.clone()
                    };
                    stack.push(Command::Doc {
                        indent,
                        mode,
                        doc: chosen,
                    });
                }
            },
            Command::Fill {
                indent,
                mode,
                doc,
                index,
            } => {
                let DocKind::Fill(parts) = doc.kind() else {
                    unreachable!("Fill command must reference DocKind::Fill")
                };

                if index >= parts.len() {
                    continue;
                }

                match mode {
                    Mode::Flat => {
                        for part in parts[index..].iter().rev() {
                            stack.push(Command::Doc {
                                indent,
                                mode: Mode::Flat,
                                doc: part.clone(),
                            });
                        }
                    }
                    Mode::Break => {
                        if index % 2 == 0 {
                            // Content part.
                            stack.push(Command::Fill {
                                indent,
                                mode,
                                doc: doc.clone(),
                                index: index + 1,
                            });
                            stack.push(Command::Doc {
                                indent,
                                mode,
                                doc: parts[index].clone(),
                            });
                            continue;
                        }

                        // Separator part: flatten it when the next content
                        // part still fits on this line.
                        let sep = parts[index].clone();
                        if index + 1 >= parts.len() {
                            stack.push(Command::Doc {
                                indent,
                                mode,
                                doc: sep,
                            });
                            continue;
                        }

                        let next = parts[index + 1].clone();
                        let remaining = config.max_width as isize - pos as isize;
                        let sep_mode = if fits_flat(remaining, &[sep.clone(), next.clone()]) {
                            Mode::Flat
                        } else {
                            Mode::Break
                        };

                        stack.push(Command::Fill {
                            indent,
                            mode,
                            doc: doc.clone(),
                            index: index + 2,
                        });
                        stack.push(Command::Doc {
                            indent,
                            mode,
                            doc: next,
                        });
                        stack.push(Command::Doc {
                            indent,
                            mode: sep_mode,
                            doc: sep,
                        });
                    }
                }
            }
        }
    }

    out
}

fn push_spaces(out: &mut String, count: usize) {
    out.extend(std::iter::repeat_n(' ', count));
}

fn trim_trailing_blanks(out: &mut String) {
    while matches!(out.as_bytes().last(), Some(b' ' | b'\t')) {
        out.pop();
    }
}

fn text_width(text: &str) -> usize {
    if text.is_ascii() {
        text.len()
    } else {
        text.chars().count()
    }
}

fn flush_line_suffixes<'a>(stack: &mut Vec<Command<'a>>, line_suffixes: &mut Vec<Command<'a>>) {
    // Suffixes are stored in insertion order; pushed in reverse so they pop
    // back out in that order.
    for cmd in line_suffixes.drain(..).rev() {
        stack.push(cmd);
    }
}

/// Flat-only fitting used for `fill` separator decisions.
fn fits_flat<'a>(mut remaining: isize, docs: &[Doc<'a>]) -> bool {
    if remaining < 0 {
        return false;
    }

    // Small step cap: on overrun, prefer breaking. Keeps pathological inputs
    // deterministic and the pass linear.
    const MAX_STEPS: usize = 4_096;
    let mut steps = 0usize;

    let mut stack: Vec<Doc<'a>> = docs.iter().cloned().rev().collect();

    while remaining >= 0 {
        if steps >= MAX_STEPS {
            return false;
        }
        steps += 1;

        let Some(doc) = stack.pop() else {
            return true;
        };

        match doc.kind() {
            DocKind::Nil => {}
            DocKind::Text(text) => remaining -= text_width(text) as isize,
            DocKind::Concat(parts) | DocKind::Fill(parts) => {
                for part in parts.iter().rev() {
                    stack.push(part.clone());
                }
            }
            DocKind::Group(inner)
            | DocKind::Indent(inner)
            | DocKind::Dedent(inner)
            | DocKind::Align(_, inner) => stack.push(inner.clone()),
            DocKind::Line(kind) => match kind {
                LineKind::Line => remaining -= 1,
                LineKind::Soft => {}
                LineKind::Hard => return false,
            },
            // Suffix content never influences fitting.
            DocKind::LineSuffix(_) => {}
            DocKind::BreakParent => return false,
            DocKind::IfBreak { flat, .. } => stack.push(flat.clone()),
        }
    }

    false
}

/// The fits-test: can `lookahead` (in flat mode) plus everything already
/// committed on the rest of `base_stack` render within `remaining` columns
/// before the next forced break?
fn fits<'a>(
    mut remaining: isize,
    base_stack: &[Command<'a>],
    lookahead: &[Command<'a>],
    config: PrintConfig,
) -> bool {
    if remaining < 0 {
        return false;
    }

    // Step cap against O(n^2) blowups with deeply nested groups; on overrun,
    // prefer breaking so output stays deterministic.
    const MAX_STEPS: usize = 32_768;
    let mut steps = 0usize;

    let mut idx = base_stack.len();
    let mut stack: Vec<Command<'a>> = lookahead.to_vec();

    while remaining >= 0 {
        if steps >= MAX_STEPS {
            return false;
        }
        steps += 1;

        let cmd = if let Some(cmd) = stack.pop() {
            cmd
        } else if idx > 0 {
            idx -= 1;
            base_stack[idx].clone()
        } else {
            return true;
        };

        match cmd {
            Command::Doc { indent, mode, doc } => match doc.kind() {
                DocKind::Nil => {}
                DocKind::Text(text) => remaining -= text_width(text) as isize,
                DocKind::Concat(parts) => {
                    for part in parts.iter().rev() {
                        stack.push(Command::Doc {
                            indent,
                            mode,
                            doc: part.clone(),
                        });
                    }
                }
                // A nested group inherits the current fitting mode: a break
                // inside it only ends the measurement when we are measuring
                // committed (break-mode) content.
                DocKind::Group(inner) => stack.push(Command::Doc {
                    indent,
                    mode,
                    doc: inner.clone(),
                }),
                DocKind::Indent(inner) => stack.push(Command::Doc {
                    indent: indent.saturating_add(config.indent_width),
                    mode,
                    doc: inner.clone(),
                }),
                DocKind::Dedent(inner) => stack.push(Command::Doc {
                    indent: indent.saturating_sub(config.indent_width),
                    mode,
                    doc: inner.clone(),
                }),
                DocKind::Align(width, inner) => stack.push(Command::Doc {
                    indent: indent.saturating_add(*width),
                    mode,
                    doc: inner.clone(),
                }),
                DocKind::Line(kind) => match mode {
                    Mode::Flat => match kind {
                        LineKind::Line => remaining -= 1,
                        LineKind::Soft => {}
                        LineKind::Hard => return false,
                    },
                    // A real break in committed content ends the line; the
                    // lookahead fits.
                    Mode::Break => return true,
                },
                DocKind::LineSuffix(_) => {}
                DocKind::BreakParent => {
                    if mode == Mode::Flat {
                        return false;
                    }
                }
                DocKind::Fill(_) => stack.push(Command::Fill {
                    indent,
                    mode,
                    doc: doc.clone(),
                    index: 0,
                }),
                DocKind::IfBreak { broken, flat } => {
                    let chosen = if mode == Mode::Break {
                        broken.clone()
                    } else {
                        flat.clone()
                    };
                    stack.push(Command::Doc {
                        indent,
                        mode,
                        doc: chosen,
                    });
                }
            },
            Command::Fill {
                indent,
                mode,
                doc,
                index,
            } => {
                let DocKind::Fill(parts) = doc.kind() else {
                    unreachable!("Fill command must reference DocKind::Fill")
                };

                for part in parts[index..].iter().rev() {
                    stack.push(Command::Doc {
                        indent,
                        mode,
                        doc: part.clone(),
                    });
                }
            }
        }
    }

    false
}
