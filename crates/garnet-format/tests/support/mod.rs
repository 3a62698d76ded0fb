//! Shared helpers for building grammar-engine payloads in tests.
#![allow(dead_code)]

use garnet_format::{FormatOptions, QuotePreference};
use serde_json::{json, Value};

/// One token entry: `[[line, col], kind, text]`. Columns are irrelevant to
/// layout, so tests pin them to zero.
pub fn t(line: u64, kind: &str, text: &str) -> Value {
    json!([[line, 0], kind, text])
}

pub fn payload(ast: Value, tokens: Vec<Value>) -> Value {
    json!({ "ast": ast, "tokens": tokens, "comments": [] })
}

pub fn payload_with_comments(ast: Value, tokens: Vec<Value>, comments: Value) -> Value {
    json!({ "ast": ast, "tokens": tokens, "comments": comments })
}

pub fn fmt(payload: &Value) -> String {
    fmt_opts(payload, &FormatOptions::default())
}

pub fn fmt_width(payload: &Value, max_line_width: usize) -> String {
    fmt_opts(
        payload,
        &FormatOptions {
            max_line_width,
            ..FormatOptions::default()
        },
    )
}

pub fn fmt_single_quote(payload: &Value) -> String {
    fmt_opts(
        payload,
        &FormatOptions {
            preferred_quote: QuotePreference::Single,
            ..FormatOptions::default()
        },
    )
}

pub fn fmt_opts(payload: &Value, options: &FormatOptions) -> String {
    let file = garnet_syntax::decode_value(payload).expect("payload decodes");
    garnet_format::format_file(&file, options).expect("file formats")
}
