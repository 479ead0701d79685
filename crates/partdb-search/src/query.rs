//! Building FTS5 match expressions from free text.

/// Split `query` into terms on non-alphanumeric characters.
pub fn terms(query: &str) -> Vec<&str> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Turn free text into an FTS5 match expression.
///
/// Each term is double-quoted, so FTS5 operators typed by the user are
/// matched as words, and terms are joined with `OR`. The index tokenizer
/// still applies case folding and stemming to each quoted term. Returns
/// `None` when the query has no terms.
pub fn match_expression(query: &str) -> Option<String> {
    let terms = terms(query);
    if terms.is_empty() {
        return None;
    }
    Some(
        terms
            .iter()
            .map(|t| format!("\"{t}\""))
            .collect::<Vec<_>>()
            .join(" OR "),
    )
}
