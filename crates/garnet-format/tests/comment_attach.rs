use garnet_format::CommentStore;
use garnet_syntax::{correlate, decode_value, NodeKind};
use pretty_assertions::assert_eq;
use serde_json::json;

mod support;
use support::{fmt, payload_with_comments, t};

fn two_statement_file() -> serde_json::Value {
    payload_with_comments(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "lvasgn", "line": 1, "col": 0, "name": "a",
                  "value": { "ast_type": "int", "line": 1, "col": 4, "value": "1" } },
                { "ast_type": "lvasgn", "line": 3, "col": 0, "name": "b",
                  "value": { "ast_type": "int", "line": 3, "col": 4, "value": "2" } }
            ]
        }),
        vec![
            t(1, "ident", "a"),
            t(1, "op", "="),
            t(1, "int", "1"),
            t(1, "comment", "# trailing a"),
            t(1, "newline", "\n"),
            t(2, "comment", "# before b"),
            t(2, "newline", "\n"),
            t(3, "ident", "b"),
            t(3, "op", "="),
            t(3, "int", "2"),
            t(3, "newline", "\n"),
        ],
        json!([
            { "text": "# trailing a", "line": 1 },
            { "text": "# before b", "line": 2 }
        ]),
    )
}

#[test]
fn same_line_comments_attach_trailing_and_others_leading() {
    let payload = two_statement_file();
    let file = decode_value(&payload).unwrap();
    let layout = correlate(&file.ast, &file.tokens).unwrap();

    let NodeKind::Program { body } = &file.ast.kind else {
        panic!("expected program root");
    };
    let a = body[0].id;
    let b = body[1].id;

    let mut store = CommentStore::new(&file.ast, &layout, file.comments.clone());

    let trailing_a = store.take_trailing(a);
    assert_eq!(trailing_a.len(), 1);
    assert_eq!(trailing_a[0].text, "# trailing a");
    assert!(trailing_a[0].same_line);

    let leading_b = store.take_leading(b);
    assert_eq!(leading_b.len(), 1);
    assert_eq!(leading_b[0].text, "# before b");
    assert!(!leading_b[0].same_line);

    assert!(store.take_leading(a).is_empty());
    assert!(store.take_trailing(b).is_empty());
    assert!(store.is_drained());
}

#[test]
fn every_comment_appears_exactly_once_in_the_output() {
    let out = fmt(&two_statement_file());
    assert_eq!(out.matches("# trailing a").count(), 1);
    assert_eq!(out.matches("# before b").count(), 1);
    // Relative order is preserved.
    let first = out.find("# trailing a").unwrap();
    let second = out.find("# before b").unwrap();
    assert!(first < second);
}

#[test]
fn comment_after_all_code_attaches_below_the_last_statement() {
    let payload = payload_with_comments(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "lvasgn", "line": 1, "col": 0, "name": "a",
                  "value": { "ast_type": "int", "line": 1, "col": 4, "value": "1" } }
            ]
        }),
        vec![
            t(1, "ident", "a"),
            t(1, "op", "="),
            t(1, "int", "1"),
            t(1, "newline", "\n"),
            t(2, "comment", "# epilogue"),
            t(2, "newline", "\n"),
        ],
        json!([{ "text": "# epilogue", "line": 2 }]),
    );

    assert_eq!(fmt(&payload), "a = 1\n# epilogue\n");
}

#[test]
fn comment_only_files_keep_their_comments() {
    let payload = payload_with_comments(
        json!({ "ast_type": "program", "line": 1, "col": 0, "body": [] }),
        vec![
            t(1, "comment", "# just"),
            t(1, "newline", "\n"),
            t(2, "comment", "# comments"),
            t(2, "newline", "\n"),
        ],
        json!([
            { "text": "# just", "line": 1 },
            { "text": "# comments", "line": 2 }
        ]),
    );

    assert_eq!(fmt(&payload), "# just\n# comments\n");
}

#[test]
fn comments_inside_a_body_attach_to_the_inner_statement() {
    let payload = payload_with_comments(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "def", "line": 1, "col": 0, "name": "run",
                  "args": null,
                  "body": [
                      { "ast_type": "send", "line": 3, "col": 2, "recv": null,
                        "name": "work", "args": [] }
                  ] }
            ]
        }),
        vec![
            t(1, "keyword", "def"),
            t(1, "ident", "run"),
            t(1, "newline", "\n"),
            t(2, "comment", "# the point"),
            t(2, "newline", "\n"),
            t(3, "ident", "work"),
            t(3, "newline", "\n"),
            t(4, "keyword", "end"),
            t(4, "newline", "\n"),
        ],
        json!([{ "text": "# the point", "line": 2 }]),
    );

    assert_eq!(fmt(&payload), "def run\n  # the point\n  work\nend\n");
}

#[test]
fn comment_attached_to_a_conditional_body_forces_block_form() {
    let payload = payload_with_comments(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "if", "line": 1, "col": 0,
                  "cond": { "ast_type": "lvar", "line": 1, "col": 3, "name": "a" },
                  "then_body": [
                      { "ast_type": "send", "line": 3, "col": 2, "recv": null,
                        "name": "work", "args": [] }
                  ],
                  "else_body": [] }
            ]
        }),
        vec![
            t(1, "keyword", "if"),
            t(1, "ident", "a"),
            t(1, "newline", "\n"),
            t(2, "comment", "# why"),
            t(2, "newline", "\n"),
            t(3, "ident", "work"),
            t(3, "newline", "\n"),
            t(4, "keyword", "end"),
            t(4, "newline", "\n"),
        ],
        json!([{ "text": "# why", "line": 2 }]),
    );

    // Without the comment this would collapse to `work if a`.
    assert_eq!(fmt(&payload), "if a\n  # why\n  work\nend\n");
}
