//! Garnet's formatting engine.
//!
//! The pipeline per file is strictly sequential: correlate the tree with its
//! token stream, attach comments, build a [`doc::Doc`], render it against
//! the line-width budget. The same enriched tree and options always produce
//! the same text, and nothing is retried: any failure aborts the file with a
//! structured [`FormatError`], never partial output.

use thiserror::Error;
use tracing::debug;

use garnet_syntax::{correlate, CorrelateError, InputError, SourceFile};

pub mod doc;

mod comments;
mod pretty;
mod quotes;

pub use comments::{AttachedComment, CommentStore};
pub use quotes::{choose_quote, requote};

use doc::PrintConfig;

/// Which quote character encloses string literals when the content leaves a
/// free choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuotePreference {
    Single,
    #[default]
    Double,
}

impl QuotePreference {
    #[inline]
    pub fn as_char(self) -> char {
        match self {
            QuotePreference::Single => '\'',
            QuotePreference::Double => '"',
        }
    }
}

/// Style options. Nothing else affects the engine's output.
#[derive(Debug, Clone)]
pub struct FormatOptions {
    pub preferred_quote: QuotePreference,
    pub indent_width: usize,
    pub max_line_width: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            preferred_quote: QuotePreference::Double,
            indent_width: 2,
            max_line_width: 79,
        }
    }
}

/// A formatting failure. Fatal for the file being processed; no partial
/// output is ever produced.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FormatError {
    /// The grammar engine failed or its payload was malformed.
    #[error(transparent)]
    Input(InputError),
    /// The tree and the token stream disagreed about the source.
    #[error(transparent)]
    Correlation(#[from] CorrelateError),
    /// The payload used a construct this engine has no layout rule for.
    #[error(transparent)]
    UnsupportedConstruct(InputError),
}

impl From<InputError> for FormatError {
    fn from(err: InputError) -> Self {
        match err {
            InputError::UnsupportedConstruct { .. } => FormatError::UnsupportedConstruct(err),
            other => FormatError::Input(other),
        }
    }
}

/// Format a raw grammar-engine payload (JSON text).
pub fn format_payload(payload: &str, options: &FormatOptions) -> Result<String, FormatError> {
    let file = garnet_syntax::decode(payload)?;
    format_file(&file, options)
}

/// Format a decoded [`SourceFile`].
pub fn format_file(file: &SourceFile, options: &FormatOptions) -> Result<String, FormatError> {
    let layout = correlate(&file.ast, &file.tokens)?;

    let comments = CommentStore::new(&file.ast, &layout, file.comments.clone());
    let mut formatter = pretty::Formatter::new(&layout, comments, options);
    let document = formatter.build(&file.ast);

    let mut out = doc::print(
        document,
        PrintConfig {
            max_width: options.max_line_width,
            indent_width: options.indent_width,
        },
    );
    finalize_output(&mut out);

    debug!(bytes = out.len(), "formatted file");
    Ok(out)
}

/// The output contract: exactly one trailing newline, no trailing blanks.
fn finalize_output(out: &mut String) {
    while matches!(out.as_bytes().last(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
        out.pop();
    }
    out.push('\n');
}
