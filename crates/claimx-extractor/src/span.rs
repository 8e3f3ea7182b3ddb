//! Span cleanup and surface-form typing

use claimx_core::TextSpan;

/// Leading words dropped from entity spans
const ARTICLES: [&str; 3] = ["the", "a", "an"];

const HTTP_METHODS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// Trim surrounding whitespace and a leading article, adjusting offsets.
///
/// Returns `None` if nothing is left.
pub fn normalize_span(span: &TextSpan) -> Option<TextSpan> {
    let chars: Vec<char> = span.text.chars().collect();
    let (mut start, end) = trimmed_bounds(&chars);

    if let Some(word_end) = (start..end).find(|&i| chars[i].is_whitespace()) {
        let word: String = chars[start..word_end].iter().collect();
        if ARTICLES.contains(&word.to_lowercase().as_str()) {
            start = (word_end..end)
                .find(|&i| !chars[i].is_whitespace())
                .unwrap_or(end);
        }
    }

    build(span, &chars, start, end)
}

/// Trim surrounding whitespace only
pub fn trim_span(span: &TextSpan) -> Option<TextSpan> {
    let chars: Vec<char> = span.text.chars().collect();
    let (start, end) = trimmed_bounds(&chars);
    build(span, &chars, start, end)
}

fn trimmed_bounds(chars: &[char]) -> (usize, usize) {
    let start = chars
        .iter()
        .position(|c| !c.is_whitespace())
        .unwrap_or(chars.len());
    let end = chars
        .iter()
        .rposition(|c| !c.is_whitespace())
        .map(|i| i + 1)
        .unwrap_or(start);
    (start, end.max(start))
}

fn build(span: &TextSpan, chars: &[char], start: usize, end: usize) -> Option<TextSpan> {
    if start >= end {
        return None;
    }
    let text: String = chars[start..end].iter().collect();
    Some(TextSpan::new(
        text,
        span.start_offset + start,
        span.start_offset + end,
    ))
}

/// Guess an entity type from surface text alone
pub fn guess_entity_type(surface: &str) -> &'static str {
    let trimmed = surface.trim();
    let lower = trimmed.to_lowercase();
    let first_word = trimmed.split_whitespace().next().unwrap_or_default();

    if HTTP_METHODS.contains(&first_word)
        || trimmed.split_whitespace().any(|w| w.starts_with('/'))
        || lower.ends_with("endpoint")
    {
        "Endpoint"
    } else if lower.ends_with("parameter") || lower.ends_with("param") {
        "Parameter"
    } else if lower.ends_with("service") {
        "Service"
    } else if lower.ends_with("field") {
        "Field"
    } else if lower.ends_with("header") {
        "Header"
    } else if lower.ends_with("error") || lower.ends_with("exception") {
        "Error"
    } else {
        "Concept"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_article_and_whitespace() {
        let span = TextSpan::new("  The GET /users endpoint ", 10, 36);
        let normalized = normalize_span(&span).unwrap();
        assert_eq!(normalized.text, "GET /users endpoint");
        assert_eq!(normalized.start_offset, 16);
        assert_eq!(normalized.end_offset, 35);
    }

    #[test]
    fn test_normalize_keeps_article_like_words() {
        let span = TextSpan::new("Another token", 0, 13);
        assert_eq!(normalize_span(&span).unwrap().text, "Another token");

        let lone = TextSpan::new("a", 0, 1);
        assert_eq!(normalize_span(&lone).unwrap().text, "a");
    }

    #[test]
    fn test_blank_span_is_dropped() {
        assert!(normalize_span(&TextSpan::new("   ", 0, 3)).is_none());
        assert!(trim_span(&TextSpan::new("", 4, 4)).is_none());
    }

    #[test]
    fn test_trim_span_keeps_article() {
        let span = TextSpan::new(" a ", 5, 8);
        let trimmed = trim_span(&span).unwrap();
        assert_eq!(trimmed.text, "a");
        assert_eq!((trimmed.start_offset, trimmed.end_offset), (6, 7));
    }

    #[test]
    fn test_guess_entity_type() {
        assert_eq!(guess_entity_type("GET /users"), "Endpoint");
        assert_eq!(guess_entity_type("the /orders route"), "Endpoint");
        assert_eq!(guess_entity_type("limit parameter"), "Parameter");
        assert_eq!(guess_entity_type("authentication service"), "Service");
        assert_eq!(guess_entity_type("Authorization header"), "Header");
        assert_eq!(guess_entity_type("RateLimitException"), "Error");
        assert_eq!(guess_entity_type("credentials"), "Concept");
    }
}
