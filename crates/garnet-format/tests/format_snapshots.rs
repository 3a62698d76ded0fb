use garnet_format::{format_payload, FormatError, FormatOptions};
use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use serde_json::json;

mod support;
use support::{fmt, fmt_single_quote, fmt_width, payload, payload_with_comments, t};

#[test]
fn formats_a_method_definition() {
    let payload = payload(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "def", "line": 1, "col": 0, "name": "foo",
                  "args": { "ast_type": "args", "line": 1, "col": 8, "list": [
                      { "ast_type": "arg", "line": 1, "col": 8, "name": "a" },
                      { "ast_type": "optarg", "line": 1, "col": 11, "name": "b",
                        "default": { "ast_type": "int", "line": 1, "col": 15, "value": "2" } }
                  ] },
                  "body": [
                      { "ast_type": "send", "line": 2, "col": 2, "recv": null,
                        "name": "puts", "args": [
                          { "ast_type": "lvar", "line": 2, "col": 7, "name": "a" }
                      ] }
                  ] }
            ]
        }),
        vec![
            t(1, "keyword", "def"),
            t(1, "ident", "foo"),
            t(1, "l_paren", "("),
            t(1, "ident", "a"),
            t(1, "comma", ","),
            t(1, "ident", "b"),
            t(1, "op", "="),
            t(1, "int", "2"),
            t(1, "r_paren", ")"),
            t(1, "newline", "\n"),
            t(2, "ident", "puts"),
            t(2, "ident", "a"),
            t(2, "newline", "\n"),
            t(3, "keyword", "end"),
            t(3, "newline", "\n"),
        ],
    );

    assert_snapshot!(fmt(&payload), @r###"
def foo(a, b = 2)
  puts(a)
end
"###);
}

#[test]
fn collapses_short_conditional_to_modifier_form() {
    let payload = payload(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "if", "line": 1, "col": 0,
                  "cond": { "ast_type": "send", "line": 1, "col": 3,
                            "recv": null, "name": "a", "args": [] },
                  "then_body": [
                      { "ast_type": "send", "line": 1, "col": 10, "recv": null,
                        "name": "puts", "args": [
                          { "ast_type": "int", "line": 1, "col": 15, "value": "1" }
                      ] }
                  ],
                  "else_body": [] }
            ]
        }),
        vec![
            t(1, "keyword", "if"),
            t(1, "ident", "a"),
            t(1, "keyword", "then"),
            t(1, "ident", "puts"),
            t(1, "int", "1"),
            t(1, "keyword", "end"),
            t(1, "newline", "\n"),
        ],
    );

    assert_eq!(fmt(&payload), "puts(1) if a\n");
}

#[test]
fn expands_an_overflowing_conditional_to_block_form() {
    let payload = payload(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "if", "line": 1, "col": 0,
                  "cond": { "ast_type": "send", "line": 1, "col": 3,
                            "recv": null, "name": "some_long_condition_name", "args": [] },
                  "then_body": [
                      { "ast_type": "send", "line": 1, "col": 33, "recv": null,
                        "name": "puts", "args": [
                          { "ast_type": "int", "line": 1, "col": 38, "value": "1" }
                      ] }
                  ],
                  "else_body": [] }
            ]
        }),
        vec![
            t(1, "keyword", "if"),
            t(1, "ident", "some_long_condition_name"),
            t(1, "keyword", "then"),
            t(1, "ident", "puts"),
            t(1, "int", "1"),
            t(1, "keyword", "end"),
            t(1, "newline", "\n"),
        ],
    );

    assert_snapshot!(fmt_width(&payload, 30), @r###"
if some_long_condition_name
  puts(1)
end
"###);
}

#[test]
fn keeps_a_short_array_on_one_line() {
    assert_eq!(fmt(&int_array_payload()), "[1, 2, 3]\n");
}

#[test]
fn explodes_an_overlong_array_one_element_per_line() {
    assert_snapshot!(fmt_width(&int_array_payload(), 5), @r###"
[
  1,
  2,
  3
]
"###);
}

fn int_array_payload() -> serde_json::Value {
    payload(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "array", "line": 1, "col": 0, "elements": [
                    { "ast_type": "int", "line": 1, "col": 1, "value": "1" },
                    { "ast_type": "int", "line": 1, "col": 4, "value": "2" },
                    { "ast_type": "int", "line": 1, "col": 7, "value": "3" }
                ] }
            ]
        }),
        vec![
            t(1, "l_bracket", "["),
            t(1, "int", "1"),
            t(1, "comma", ","),
            t(1, "int", "2"),
            t(1, "comma", ","),
            t(1, "int", "3"),
            t(1, "r_bracket", "]"),
            t(1, "newline", "\n"),
        ],
    )
}

#[test]
fn switches_quotes_to_minimize_escapes() {
    // Content full of double quotes, preferred quote double: the alternate
    // needs zero escapes, so it wins.
    let payload = payload(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "str", "line": 1, "col": 0, "value": "say \"hi\"" }
            ]
        }),
        vec![
            t(1, "string_beg", "'"),
            t(1, "string_content", "say \"hi\""),
            t(1, "string_end", "'"),
            t(1, "newline", "\n"),
        ],
    );

    assert_eq!(fmt(&payload), "'say \"hi\"'\n");
}

#[test]
fn requotes_plain_strings_with_the_preferred_quote() {
    let payload = payload(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "str", "line": 1, "col": 0, "value": "hello" }
            ]
        }),
        vec![
            t(1, "string_beg", "'"),
            t(1, "string_content", "hello"),
            t(1, "string_end", "'"),
            t(1, "newline", "\n"),
        ],
    );

    assert_eq!(fmt(&payload), "\"hello\"\n");
}

#[test]
fn honors_a_single_quote_preference() {
    let payload = payload(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "str", "line": 1, "col": 0, "value": "hello" }
            ]
        }),
        vec![
            t(1, "string_beg", "\""),
            t(1, "string_content", "hello"),
            t(1, "string_end", "\""),
            t(1, "newline", "\n"),
        ],
    );

    assert_eq!(fmt_single_quote(&payload), "'hello'\n");
}

#[test]
fn breaks_long_call_chains_at_the_dots() {
    let payload = payload(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "send", "line": 1, "col": 0,
                  "recv": { "ast_type": "send", "line": 1, "col": 0,
                    "recv": { "ast_type": "send", "line": 1, "col": 0,
                      "recv": { "ast_type": "send", "line": 1, "col": 0,
                                "recv": null, "name": "foo", "args": [] },
                      "name": "bar", "args": [
                          { "ast_type": "int", "line": 1, "col": 8, "value": "1" }
                      ] },
                    "name": "baz", "args": [
                        { "ast_type": "int", "line": 1, "col": 15, "value": "2" }
                    ] },
                  "name": "qux", "args": [
                      { "ast_type": "int", "line": 1, "col": 22, "value": "3" }
                  ] }
            ]
        }),
        vec![
            t(1, "ident", "foo"),
            t(1, "period", "."),
            t(1, "ident", "bar"),
            t(1, "l_paren", "("),
            t(1, "int", "1"),
            t(1, "r_paren", ")"),
            t(1, "period", "."),
            t(1, "ident", "baz"),
            t(1, "l_paren", "("),
            t(1, "int", "2"),
            t(1, "r_paren", ")"),
            t(1, "period", "."),
            t(1, "ident", "qux"),
            t(1, "l_paren", "("),
            t(1, "int", "3"),
            t(1, "r_paren", ")"),
            t(1, "newline", "\n"),
        ],
    );

    assert_eq!(fmt(&payload), "foo.bar(1).baz(2).qux(3)\n");
    assert_snapshot!(fmt_width(&payload, 20), @r###"
foo
  .bar(1)
  .baz(2)
  .qux(3)
"###);
}

#[test]
fn preserves_blank_lines_and_comments() {
    let payload = payload_with_comments(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "lvasgn", "line": 1, "col": 0, "name": "a",
                  "value": { "ast_type": "int", "line": 1, "col": 4, "value": "1" } },
                { "ast_type": "lvasgn", "line": 4, "col": 0, "name": "b",
                  "value": { "ast_type": "int", "line": 4, "col": 4, "value": "2" } }
            ]
        }),
        vec![
            t(1, "ident", "a"),
            t(1, "op", "="),
            t(1, "int", "1"),
            t(1, "newline", "\n"),
            t(2, "newline", "\n"),
            t(3, "comment", "# note"),
            t(3, "newline", "\n"),
            t(4, "ident", "b"),
            t(4, "op", "="),
            t(4, "int", "2"),
            t(4, "comment", "# inline"),
            t(4, "newline", "\n"),
        ],
        json!([
            { "text": "# note", "line": 3 },
            { "text": "# inline", "line": 4 }
        ]),
    );

    assert_snapshot!(fmt(&payload), @r###"
a = 1

# note
b = 2 # inline
"###);
}

#[test]
fn keeps_heredocs_attached_and_verbatim() {
    let payload = payload(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "lvasgn", "line": 1, "col": 0, "name": "text",
                  "value": { "ast_type": "heredoc", "line": 1, "col": 7, "parts": [
                      { "ast_type": "str", "line": 2, "col": 0, "value": "  Hello\n" }
                  ] } }
            ]
        }),
        vec![
            t(1, "ident", "text"),
            t(1, "op", "="),
            t(1, "heredoc_beg", "<<~GREETING"),
            t(1, "newline", "\n"),
            t(2, "string_content", "  Hello\n"),
            t(3, "heredoc_end", "GREETING"),
            t(3, "newline", "\n"),
        ],
    );

    assert_snapshot!(fmt(&payload), @r###"
text = <<~GREETING
  Hello
GREETING
"###);
}

#[test]
fn formats_case_dispatch_under_an_assignment() {
    let payload = payload(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "lvasgn", "line": 1, "col": 0, "name": "kind",
                  "value": { "ast_type": "case", "line": 2, "col": 2,
                    "subject": { "ast_type": "send", "line": 2, "col": 7,
                                 "recv": null, "name": "year", "args": [] },
                    "whens": [
                        { "ast_type": "when", "line": 3, "col": 2,
                          "patterns": [
                              { "ast_type": "irange", "line": 3, "col": 7,
                                "low": { "ast_type": "int", "line": 3, "col": 7, "value": "1850" },
                                "high": { "ast_type": "int", "line": 3, "col": 13, "value": "1889" } }
                          ],
                          "body": [
                              { "ast_type": "str", "line": 3, "col": 23, "value": "Blues" }
                          ] }
                    ],
                    "else_body": [
                        { "ast_type": "str", "line": 4, "col": 7, "value": "Jazz" }
                    ] } }
            ]
        }),
        vec![
            t(1, "ident", "kind"),
            t(1, "op", "="),
            t(1, "newline", "\n"),
            t(2, "keyword", "case"),
            t(2, "ident", "year"),
            t(2, "newline", "\n"),
            t(3, "keyword", "when"),
            t(3, "int", "1850"),
            t(3, "op", ".."),
            t(3, "int", "1889"),
            t(3, "keyword", "then"),
            t(3, "string_beg", "'"),
            t(3, "string_content", "Blues"),
            t(3, "string_end", "'"),
            t(3, "newline", "\n"),
            t(4, "keyword", "else"),
            t(4, "string_beg", "'"),
            t(4, "string_content", "Jazz"),
            t(4, "string_end", "'"),
            t(4, "newline", "\n"),
            t(5, "keyword", "end"),
            t(5, "newline", "\n"),
        ],
    );

    assert_snapshot!(fmt(&payload), @r###"
kind =
  case year
  when 1850..1889 then "Blues"
  else
    "Jazz"
  end
"###);
}

#[test]
fn formats_rescue_and_ensure_clauses() {
    let payload = payload(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "def", "line": 1, "col": 0, "name": "read",
                  "args": null,
                  "body": [
                      { "ast_type": "ensure", "line": 2, "col": 2,
                        "body": [
                            { "ast_type": "rescue", "line": 2, "col": 2,
                              "body": [
                                  { "ast_type": "send", "line": 2, "col": 2,
                                    "recv": { "ast_type": "send", "line": 2, "col": 2,
                                              "recv": null, "name": "io", "args": [] },
                                    "name": "read", "args": [] }
                              ],
                              "clauses": [
                                  { "ast_type": "resbody", "line": 3, "col": 0,
                                    "exceptions": [
                                        { "ast_type": "const", "line": 3, "col": 7,
                                          "scope": null, "name": "IOError" }
                                    ],
                                    "binding": { "ast_type": "lvar", "line": 3, "col": 18,
                                                 "name": "e" },
                                    "body": [
                                        { "ast_type": "retry", "line": 4, "col": 2 }
                                    ] }
                              ],
                              "else_body": [] }
                        ],
                        "ensure_body": [
                            { "ast_type": "send", "line": 6, "col": 2,
                              "recv": { "ast_type": "send", "line": 6, "col": 2,
                                        "recv": null, "name": "io", "args": [] },
                              "name": "close", "args": [] }
                        ] }
                  ] }
            ]
        }),
        vec![
            t(1, "keyword", "def"),
            t(1, "ident", "read"),
            t(1, "newline", "\n"),
            t(2, "ident", "io"),
            t(2, "period", "."),
            t(2, "ident", "read"),
            t(2, "newline", "\n"),
            t(3, "keyword", "rescue"),
            t(3, "constant", "IOError"),
            t(3, "op", "=>"),
            t(3, "ident", "e"),
            t(3, "newline", "\n"),
            t(4, "keyword", "retry"),
            t(4, "newline", "\n"),
            t(5, "keyword", "ensure"),
            t(5, "newline", "\n"),
            t(6, "ident", "io"),
            t(6, "period", "."),
            t(6, "ident", "close"),
            t(6, "newline", "\n"),
            t(7, "keyword", "end"),
            t(7, "newline", "\n"),
        ],
    );

    assert_snapshot!(fmt(&payload), @r###"
def read
  io.read
rescue IOError => e
  retry
ensure
  io.close
end
"###);
}

#[test]
fn prefers_braces_for_single_statement_blocks() {
    let payload = payload(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "block", "line": 1, "col": 0,
                  "call": { "ast_type": "send", "line": 1, "col": 0,
                    "recv": { "ast_type": "array", "line": 1, "col": 0, "elements": [
                        { "ast_type": "int", "line": 1, "col": 1, "value": "1" },
                        { "ast_type": "int", "line": 1, "col": 4, "value": "2" }
                    ] },
                    "name": "map", "args": [] },
                  "params": { "ast_type": "args", "line": 1, "col": 13, "list": [
                      { "ast_type": "arg", "line": 1, "col": 13, "name": "x" }
                  ] },
                  "body": [
                      { "ast_type": "binary_op", "line": 1, "col": 16, "op": "*",
                        "lhs": { "ast_type": "lvar", "line": 1, "col": 16, "name": "x" },
                        "rhs": { "ast_type": "int", "line": 1, "col": 20, "value": "2" } }
                  ] }
            ]
        }),
        vec![
            t(1, "l_bracket", "["),
            t(1, "int", "1"),
            t(1, "comma", ","),
            t(1, "int", "2"),
            t(1, "r_bracket", "]"),
            t(1, "period", "."),
            t(1, "ident", "map"),
            t(1, "l_brace", "{"),
            t(1, "op", "|"),
            t(1, "ident", "x"),
            t(1, "op", "|"),
            t(1, "ident", "x"),
            t(1, "op", "*"),
            t(1, "int", "2"),
            t(1, "r_brace", "}"),
            t(1, "newline", "\n"),
        ],
    );

    assert_eq!(fmt(&payload), "[1, 2].map { |x| x * 2 }\n");
}

#[test]
fn uses_do_end_for_multi_statement_blocks() {
    let payload = payload(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "block", "line": 1, "col": 0,
                  "call": { "ast_type": "send", "line": 1, "col": 0,
                    "recv": { "ast_type": "send", "line": 1, "col": 0,
                              "recv": null, "name": "items", "args": [] },
                    "name": "each", "args": [] },
                  "params": { "ast_type": "args", "line": 1, "col": 14, "list": [
                      { "ast_type": "arg", "line": 1, "col": 14, "name": "item" }
                  ] },
                  "body": [
                      { "ast_type": "send", "line": 2, "col": 2, "recv": null,
                        "name": "log", "args": [
                          { "ast_type": "lvar", "line": 2, "col": 6, "name": "item" }
                      ] },
                      { "ast_type": "send", "line": 3, "col": 2, "recv": null,
                        "name": "process", "args": [
                          { "ast_type": "lvar", "line": 3, "col": 10, "name": "item" }
                      ] }
                  ] }
            ]
        }),
        vec![
            t(1, "ident", "items"),
            t(1, "period", "."),
            t(1, "ident", "each"),
            t(1, "keyword", "do"),
            t(1, "op", "|"),
            t(1, "ident", "item"),
            t(1, "op", "|"),
            t(1, "newline", "\n"),
            t(2, "ident", "log"),
            t(2, "l_paren", "("),
            t(2, "ident", "item"),
            t(2, "r_paren", ")"),
            t(2, "newline", "\n"),
            t(3, "ident", "process"),
            t(3, "l_paren", "("),
            t(3, "ident", "item"),
            t(3, "r_paren", ")"),
            t(3, "newline", "\n"),
            t(4, "keyword", "end"),
            t(4, "newline", "\n"),
        ],
    );

    assert_snapshot!(fmt(&payload), @r###"
items.each do |item|
  log(item)
  process(item)
end
"###);
}

#[test]
fn preserves_keyword_logical_operator_spellings() {
    let payload = payload(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "and", "line": 1, "col": 0,
                  "lhs": { "ast_type": "send", "line": 1, "col": 0,
                           "recv": null, "name": "a", "args": [] },
                  "rhs": { "ast_type": "send", "line": 1, "col": 6,
                           "recv": null, "name": "b", "args": [] } },
                { "ast_type": "and", "line": 2, "col": 0,
                  "lhs": { "ast_type": "send", "line": 2, "col": 0,
                           "recv": null, "name": "c", "args": [] },
                  "rhs": { "ast_type": "send", "line": 2, "col": 5,
                           "recv": null, "name": "d", "args": [] } }
            ]
        }),
        vec![
            t(1, "ident", "a"),
            t(1, "keyword", "and"),
            t(1, "ident", "b"),
            t(1, "newline", "\n"),
            t(2, "ident", "c"),
            t(2, "op", "&&"),
            t(2, "ident", "d"),
            t(2, "newline", "\n"),
        ],
    );

    assert_snapshot!(fmt(&payload), @r###"
a and b
c && d
"###);
}

#[test]
fn reflows_word_lists_like_prose() {
    let payload = payload(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "array", "line": 1, "col": 0, "elements": [
                    { "ast_type": "str", "line": 1, "col": 3, "value": "alpha" },
                    { "ast_type": "str", "line": 1, "col": 9, "value": "beta" },
                    { "ast_type": "str", "line": 1, "col": 14, "value": "gamma" }
                ] }
            ]
        }),
        vec![
            t(1, "words_beg", "%w["),
            t(1, "string_content", "alpha"),
            t(1, "word_sep", " "),
            t(1, "string_content", "beta"),
            t(1, "word_sep", " "),
            t(1, "string_content", "gamma"),
            t(1, "string_end", "]"),
            t(1, "newline", "\n"),
        ],
    );

    assert_eq!(fmt(&payload), "%w[alpha beta gamma]\n");
    assert_snapshot!(fmt_width(&payload, 12), @r###"
%w[
  alpha beta
  gamma
]
"###);
}

#[test]
fn aligns_wrapped_ternary_branches() {
    let payload = payload(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "ternary", "line": 1, "col": 0,
                  "cond": { "ast_type": "lvar", "line": 1, "col": 0, "name": "ok" },
                  "then_expr": { "ast_type": "lvar", "line": 1, "col": 5, "name": "a1" },
                  "else_expr": { "ast_type": "lvar", "line": 1, "col": 10, "name": "b2" } }
            ]
        }),
        vec![
            t(1, "ident", "ok"),
            t(1, "op", "?"),
            t(1, "ident", "a1"),
            t(1, "op", ":"),
            t(1, "ident", "b2"),
            t(1, "newline", "\n"),
        ],
    );

    assert_eq!(fmt(&payload), "ok ? a1 : b2\n");
    assert_snapshot!(fmt_width(&payload, 10), @r###"
ok
  ? a1
  : b2
"###);
}

#[test]
fn keeps_loop_modifiers_that_already_fit() {
    let payload = payload(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "while", "line": 1, "col": 0,
                  "cond": { "ast_type": "binary_op", "line": 1, "col": 13, "op": "<",
                    "lhs": { "ast_type": "lvar", "line": 1, "col": 13, "name": "i" },
                    "rhs": { "ast_type": "int", "line": 1, "col": 17, "value": "10" } },
                  "body": [
                      { "ast_type": "op_asgn", "line": 1, "col": 0, "op": "+",
                        "target": { "ast_type": "lvar", "line": 1, "col": 0, "name": "i" },
                        "value": { "ast_type": "int", "line": 1, "col": 5, "value": "1" } }
                  ] }
            ]
        }),
        vec![
            t(1, "ident", "i"),
            t(1, "op", "+="),
            t(1, "int", "1"),
            t(1, "keyword", "while"),
            t(1, "ident", "i"),
            t(1, "op", "<"),
            t(1, "int", "10"),
            t(1, "newline", "\n"),
        ],
    );

    assert_eq!(fmt(&payload), "i += 1 while i < 10\n");
}

#[test]
fn renders_empty_collections_without_inner_whitespace() {
    let payload = payload(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "lvasgn", "line": 1, "col": 0, "name": "x",
                  "value": { "ast_type": "array", "line": 1, "col": 4, "elements": [] } },
                { "ast_type": "lvasgn", "line": 2, "col": 0, "name": "h",
                  "value": { "ast_type": "hash", "line": 2, "col": 4, "pairs": [] } }
            ]
        }),
        vec![
            t(1, "ident", "x"),
            t(1, "op", "="),
            t(1, "l_bracket", "["),
            t(1, "r_bracket", "]"),
            t(1, "newline", "\n"),
            t(2, "ident", "h"),
            t(2, "op", "="),
            t(2, "l_brace", "{"),
            t(2, "r_brace", "}"),
            t(2, "newline", "\n"),
        ],
    );

    assert_snapshot!(fmt(&payload), @r###"
x = []
h = {}
"###);
}

#[test]
fn modifier_form_input_is_a_fixed_point() {
    // The same tree as the `if a then puts 1 end` scenario, arriving in the
    // already-canonical token order. Output equals input: idempotence.
    let payload = payload(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "if", "line": 1, "col": 0,
                  "cond": { "ast_type": "send", "line": 1, "col": 11,
                            "recv": null, "name": "a", "args": [] },
                  "then_body": [
                      { "ast_type": "send", "line": 1, "col": 0, "recv": null,
                        "name": "puts", "args": [
                          { "ast_type": "int", "line": 1, "col": 5, "value": "1" }
                      ] }
                  ],
                  "else_body": [] }
            ]
        }),
        vec![
            t(1, "ident", "puts"),
            t(1, "l_paren", "("),
            t(1, "int", "1"),
            t(1, "r_paren", ")"),
            t(1, "keyword", "if"),
            t(1, "ident", "a"),
            t(1, "newline", "\n"),
        ],
    );

    assert_eq!(fmt(&payload), "puts(1) if a\n");
}

#[test]
fn elsif_chains_stay_flat_against_the_margin() {
    let payload = payload(
        json!({
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "if", "line": 1, "col": 0,
                  "cond": { "ast_type": "lvar", "line": 1, "col": 3, "name": "a" },
                  "then_body": [
                      { "ast_type": "send", "line": 2, "col": 2, "recv": null,
                        "name": "foo", "args": [] }
                  ],
                  "else_body": [
                      { "ast_type": "if", "line": 3, "col": 0,
                        "cond": { "ast_type": "lvar", "line": 3, "col": 6, "name": "b" },
                        "then_body": [
                            { "ast_type": "send", "line": 4, "col": 2, "recv": null,
                              "name": "bar", "args": [] }
                        ],
                        "else_body": [
                            { "ast_type": "send", "line": 6, "col": 2, "recv": null,
                              "name": "baz", "args": [] }
                        ] }
                  ] }
            ]
        }),
        vec![
            t(1, "keyword", "if"),
            t(1, "ident", "a"),
            t(1, "newline", "\n"),
            t(2, "ident", "foo"),
            t(2, "newline", "\n"),
            t(3, "keyword", "elsif"),
            t(3, "ident", "b"),
            t(3, "newline", "\n"),
            t(4, "ident", "bar"),
            t(4, "newline", "\n"),
            t(5, "keyword", "else"),
            t(5, "newline", "\n"),
            t(6, "ident", "baz"),
            t(6, "newline", "\n"),
            t(7, "keyword", "end"),
            t(7, "newline", "\n"),
        ],
    );

    assert_snapshot!(fmt(&payload), @r###"
if a
  foo
elsif b
  bar
else
  baz
end
"###);
}

#[test]
fn unknown_constructs_abort_with_the_tag() {
    let payload = json!({
        "ast": { "ast_type": "match_pattern", "line": 3, "col": 0 },
        "tokens": []
    });

    let err = format_payload(&payload.to_string(), &FormatOptions::default()).unwrap_err();
    assert!(matches!(err, FormatError::UnsupportedConstruct(_)));
    assert_eq!(
        err.to_string(),
        "unsupported construct `match_pattern` at line 3"
    );
}

#[test]
fn token_mismatches_abort_instead_of_guessing() {
    // The tree claims a class, the tokens spell a module.
    let payload = json!({
        "ast": {
            "ast_type": "program", "line": 1, "col": 0,
            "body": [
                { "ast_type": "class", "line": 1, "col": 0,
                  "name": { "ast_type": "const", "line": 1, "col": 6,
                            "scope": null, "name": "Foo" },
                  "superclass": null,
                  "body": [] }
            ]
        },
        "tokens": [
            [[1, 0], "keyword", "module"],
            [[1, 7], "constant", "Foo"],
            [[2, 0], "keyword", "end"]
        ]
    });

    let err = format_payload(&payload.to_string(), &FormatOptions::default()).unwrap_err();
    assert!(matches!(err, FormatError::Correlation(_)));
    assert!(err.to_string().contains("class"));
    assert!(err.to_string().contains("module"));
}

#[test]
fn engine_failures_surface_verbatim() {
    let payload = json!({ "error": "3:1: syntax error, unexpected end" });
    let err = format_payload(&payload.to_string(), &FormatOptions::default()).unwrap_err();
    assert!(matches!(err, FormatError::Input(_)));
    assert_eq!(err.to_string(), "3:1: syntax error, unexpected end");
}

#[test]
fn output_ends_with_exactly_one_newline() {
    let out = fmt(&int_array_payload());
    assert!(out.ends_with('\n'));
    assert!(!out.ends_with("\n\n"));
}
