//! Comment attachment.
//!
//! Comments are out-of-band `{ text, line }` records. Before building the
//! document, every comment is attached to a statement anchor: trailing when
//! it sits on the line where a statement ends, leading to the next statement
//! otherwise. Attachment is one linear merge over the position-sorted
//! statement list and the position-sorted comment list, not a per-comment
//! tree search.
//!
//! The builder drains anchors as it emits them. In debug builds the store
//! asserts on drop that every comment was consumed; losing a comment
//! silently is never acceptable.

use std::collections::HashMap;

use garnet_syntax::{Comment, Layout, Node, NodeId, NodeKind};

/// A comment attached to its anchor statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedComment {
    pub text: String,
    pub line: u32,
    /// Trailing comment on the same line as the anchor's last token; rendered
    /// as a line suffix rather than on its own line.
    pub same_line: bool,
}

/// One statement anchor in source order.
#[derive(Debug, Clone, Copy)]
struct Anchor {
    id: NodeId,
    start_line: u32,
    end_line: u32,
}

/// Position-attached comments, keyed by anchor statement.
#[derive(Debug, Default)]
pub struct CommentStore {
    leading: HashMap<NodeId, Vec<AttachedComment>>,
    trailing: HashMap<NodeId, Vec<AttachedComment>>,
}

impl CommentStore {
    /// Attach `comments` to statements of the tree rooted at `root`.
    ///
    /// Both inputs are sorted by position, so a single merge suffices.
    pub fn new(root: &Node, layout: &Layout, comments: Vec<Comment>) -> Self {
        let mut anchors = Vec::new();
        collect_statement_anchors(root, layout, &mut anchors);
        // Ids are allocated pre-order by the decoder; sorting by id restores
        // source order across the two collection passes.
        anchors.sort_by_key(|a| a.id);

        let mut store = CommentStore::default();
        if comments.is_empty() {
            return store;
        }

        if anchors.is_empty() {
            // Nothing but comments in the file; hang them all off the root.
            for comment in comments {
                store.push_leading(root.id, comment, false);
            }
            return store;
        }

        let mut next_idx = 0usize;
        for comment in comments {
            // Advance to the first statement starting after the comment.
            while next_idx < anchors.len() && anchors[next_idx].start_line <= comment.line {
                next_idx += 1;
            }

            // A statement ending exactly on the comment's line takes it as
            // trailing; the outermost such statement wins (anchors are in
            // pre-order, so the first match is the outermost).
            let trailing_anchor = anchors[..next_idx]
                .iter()
                .find(|a| a.end_line == comment.line);

            match (trailing_anchor, anchors.get(next_idx)) {
                (Some(anchor), _) => {
                    let id = anchor.id;
                    store.push_trailing(id, comment, true);
                }
                (None, Some(next)) => {
                    let id = next.id;
                    store.push_leading(id, comment, false);
                }
                (None, None) => {
                    // Past the last statement and not on any end line.
                    let last = anchors.last().expect("anchors are non-empty");
                    store.push_trailing(last.id, comment, false);
                }
            }
        }

        store
    }

    fn push_leading(&mut self, id: NodeId, comment: Comment, same_line: bool) {
        self.leading.entry(id).or_default().push(AttachedComment {
            text: comment.text,
            line: comment.line,
            same_line,
        });
    }

    fn push_trailing(&mut self, id: NodeId, comment: Comment, same_line: bool) {
        self.trailing.entry(id).or_default().push(AttachedComment {
            text: comment.text,
            line: comment.line,
            same_line,
        });
    }

    /// Drain the leading comments attached to `id`.
    pub fn take_leading(&mut self, id: NodeId) -> Vec<AttachedComment> {
        self.leading.remove(&id).unwrap_or_default()
    }

    /// Drain the trailing comments attached to `id`.
    pub fn take_trailing(&mut self, id: NodeId) -> Vec<AttachedComment> {
        self.trailing.remove(&id).unwrap_or_default()
    }

    /// Whether any undrained comment is attached to `id`.
    pub fn has_attached(&self, id: NodeId) -> bool {
        self.leading.contains_key(&id) || self.trailing.contains_key(&id)
    }

    /// Whether any undrained comment is attached within the subtree rooted
    /// at `node` (excluding `node` itself).
    pub fn has_attached_within(&self, node: &Node) -> bool {
        node.children()
            .iter()
            .any(|child| self.has_attached(child.id) || self.has_attached_within(child))
    }

    pub fn is_drained(&self) -> bool {
        self.leading.is_empty() && self.trailing.is_empty()
    }

    /// Panic if any comment was never drained. Debug builds call this on
    /// drop.
    pub fn assert_drained(&self) {
        assert!(
            self.is_drained(),
            "comments were attached but never printed: leading={:?} trailing={:?}",
            self.leading,
            self.trailing
        );
    }
}

impl Drop for CommentStore {
    fn drop(&mut self) {
        if cfg!(debug_assertions) && !std::thread::panicking() {
            self.assert_drained();
        }
    }
}

/// Collect statement-position nodes in pre-order.
///
/// Statements are the members of body sequences, the positions where the
/// builder emits hard breaks and where a comment can own a line. The root
/// itself is not an anchor; neither are expression-position nodes.
fn collect_statement_anchors(node: &Node, layout: &Layout, out: &mut Vec<Anchor>) {
    for stmt in statement_children(node) {
        out.push(Anchor {
            id: stmt.id,
            start_line: stmt.pos.line,
            end_line: layout.facts(stmt.id).end_line,
        });
        collect_statement_anchors(stmt, layout, out);
    }

    // Recurse into non-statement children so nested bodies (a block hanging
    // off a call in a condition, a lambda in an argument list) still
    // contribute anchors.
    for child in node.children() {
        if !is_statement_child(node, child.id) {
            collect_statement_anchors(child, layout, out);
        }
    }
}

fn statement_children<'n>(node: &'n Node) -> Vec<&'n Node> {
    use NodeKind::*;
    match &node.kind {
        // Grouping parens and interpolations render inline, so their bodies
        // cannot own a comment line and are not anchors.
        Program { body } | KwBegin { body } | Preexe { body } | Postexe { body } => {
            body.iter().collect()
        }
        Module { body, .. }
        | Class { body, .. }
        | SingletonClass { body, .. }
        | Def { body, .. }
        | DefSelf { body, .. }
        | Block { body, .. }
        | Lambda { body, .. }
        | While { body, .. }
        | Until { body, .. }
        | For { body, .. } => body.iter().collect(),
        If {
            then_body,
            else_body,
            ..
        }
        | Unless {
            then_body,
            else_body,
            ..
        } => then_body.iter().chain(else_body).collect(),
        Case {
            whens, else_body, ..
        } => whens.iter().chain(else_body).collect(),
        When { body, .. } => body.iter().collect(),
        Rescue {
            body,
            clauses,
            else_body,
        } => body.iter().chain(clauses).chain(else_body).collect(),
        RescueClause { body, .. } => body.iter().collect(),
        Ensure { body, ensure_body } => body.iter().chain(ensure_body).collect(),
        _ => Vec::new(),
    }
}

fn is_statement_child(node: &Node, id: NodeId) -> bool {
    statement_children(node).iter().any(|stmt| stmt.id == id)
}
