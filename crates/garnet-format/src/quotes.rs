//! Escape-minimizing string re-quoting.
//!
//! String nodes carry decoded content; re-quoting always escapes from
//! scratch, so an unnecessary escape in the source (`"\'"`) cannot survive
//! into the output. The enclosing quote is chosen by counting both quote
//! characters in the content and picking the one that needs fewer escapes,
//! with the configured preference winning ties.

/// Choose the enclosing quote for `content`.
///
/// Returns the preferred quote unless the content contains strictly more of
/// it than of the alternate. Content that needs double-quote escape
/// sequences (control characters) always gets double quotes, since the
/// single-quoted form cannot express them.
pub fn choose_quote(content: &str, preferred: char) -> char {
    debug_assert!(preferred == '"' || preferred == '\'');
    if needs_double_quotes(content) {
        return '"';
    }

    let alternate = if preferred == '"' { '\'' } else { '"' };
    let preferred_count = content.matches(preferred).count();
    let alternate_count = content.matches(alternate).count();

    if preferred_count > alternate_count {
        alternate
    } else {
        preferred
    }
}

/// Render `content` enclosed in the chosen quote, with minimal escaping.
pub fn requote(content: &str, preferred: char) -> String {
    let quote = choose_quote(content, preferred);
    enclose(content, quote)
}

/// Render `content` enclosed in exactly `quote`.
pub fn enclose(content: &str, quote: char) -> String {
    let mut out = String::with_capacity(content.len() + 2);
    out.push(quote);

    if quote == '\'' {
        for ch in content.chars() {
            match ch {
                '\'' => out.push_str("\\'"),
                '\\' => out.push_str("\\\\"),
                _ => out.push(ch),
            }
        }
    } else {
        let mut chars = content.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                '\r' => out.push_str("\\r"),
                '\x1b' => out.push_str("\\e"),
                '\0' => out.push_str("\\0"),
                // `#` only needs escaping when it would start an
                // interpolation.
                '#' if matches!(chars.peek(), Some('{' | '$' | '@')) => out.push_str("\\#"),
                _ => out.push(ch),
            }
        }
    }

    out.push(quote);
    out
}

/// Escape one plain segment of an interpolated double-quoted literal,
/// without enclosing quotes.
pub fn escape_double_part(content: &str) -> String {
    let enclosed = enclose(content, '"');
    enclosed[1..enclosed.len() - 1].to_string()
}

fn needs_double_quotes(content: &str) -> bool {
    content.chars().any(|c| c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keeps_the_preferred_quote_for_plain_content() {
        assert_eq!(requote("hello", '"'), "\"hello\"");
        assert_eq!(requote("hello", '\''), "'hello'");
    }

    #[test]
    fn switches_to_the_alternate_to_avoid_escapes() {
        // Content made only of double quotes: enclosing in double quotes
        // would escape every character.
        assert_eq!(requote("\"\"", '"'), "'\"\"'");
        assert_eq!(requote("it's", '"'), "\"it's\"");
    }

    #[test]
    fn prefers_the_configured_quote_on_ties() {
        assert_eq!(requote("'\"", '"'), "\"'\\\"\"");
        assert_eq!(requote("'\"", '\''), "'\\'\"'");
    }

    #[test]
    fn escapes_from_decoded_content_so_stray_escapes_normalize() {
        // A source `"\'"` decodes to just `'`; re-quoting never reproduces
        // the unnecessary escape.
        assert_eq!(requote("'", '"'), "\"'\"");
    }

    #[test]
    fn control_characters_force_double_quotes() {
        assert_eq!(requote("a\nb", '\''), "\"a\\nb\"");
        assert_eq!(requote("tab\there", '\''), "\"tab\\there\"");
    }

    #[test]
    fn interpolation_openers_are_escaped_in_double_quotes() {
        assert_eq!(enclose("#{x}", '"'), "\"\\#{x}\"");
        assert_eq!(enclose("# plain", '"'), "\"# plain\"");
    }

    #[test]
    fn chosen_quote_never_needs_more_escapes_than_the_alternate() {
        for content in ["", "a", "'", "\"", "''\"", "\"\"'", "a'b\"c", "'''", "\"\"\""] {
            for preferred in ['"', '\''] {
                let chosen = choose_quote(content, preferred);
                let alternate = if chosen == '"' { '\'' } else { '"' };
                let chosen_escapes = content.matches(chosen).count();
                let alternate_escapes = content.matches(alternate).count();
                assert!(
                    chosen_escapes <= alternate_escapes,
                    "content {content:?} preferred {preferred:?} chose {chosen:?}"
                );
            }
        }
    }
}
