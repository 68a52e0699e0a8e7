//! Strips a leading `CYPHER { ... }` query-parameter prefix before lexing.
//!
//! A small text-preprocessing pass over raw bytes, run before the real
//! tokenizer sees them.

/// If `text` begins with `CYPHER` followed by a balanced `{ ... }` block,
/// returns the remainder after that block (trimmed of leading whitespace).
/// Otherwise returns `text` unchanged. Malformed/unbalanced braces are left
/// for the real lexer to reject.
pub fn strip_cypher_prefix(text: &str) -> &str {
    let trimmed = text.trim_start();
    let rest = match trimmed.strip_prefix("CYPHER").or_else(|| trimmed.strip_prefix("cypher")) {
        Some(rest) => rest,
        None => return text,
    };
    let rest = rest.trim_start();
    if !rest.starts_with('{') {
        return text;
    }
    let bytes = rest.as_bytes();
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return rest[i + 1..].trim_start();
                }
            }
            _ => {}
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_balanced_prefix() {
        assert_eq!(strip_cypher_prefix("CYPHER {runtime: 'interpreted'} MATCH (n) RETURN n"), "MATCH (n) RETURN n");
    }

    #[test]
    fn leaves_plain_query_untouched() {
        assert_eq!(strip_cypher_prefix("MATCH (n) RETURN n"), "MATCH (n) RETURN n");
    }

    #[test]
    fn leaves_malformed_prefix_for_the_lexer() {
        let text = "CYPHER {runtime: 'interpreted' MATCH (n) RETURN n";
        assert_eq!(strip_cypher_prefix(text), text);
    }
}
