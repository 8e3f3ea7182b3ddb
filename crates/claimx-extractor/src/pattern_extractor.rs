//! Pattern-based claim extraction
//!
//! Runs every enabled pattern of a table snapshot against a sentence, in
//! descending priority order. Text patterns match the raw sentence; shape
//! patterns match its dependency tree. Matching never fails: anything that
//! does not produce both spans is simply not a candidate.

use std::sync::Arc;

use regex::Regex;

use claimx_core::sentence::char_offset;
use claimx_core::{
    ClaimExtractionContext, DependencyShape, ExtractedClaim, ExtractionMethod,
    ExtractionPattern, LinkedEntity, LiteralType, ParsedSentence, Result, TextSpan,
};

use crate::dependency::svo_spans;
use crate::patterns::{Matcher, PatternTable};
use crate::resolver::resolve_entity;
use crate::span::{normalize_span, trim_span};
use crate::ClaimExtractor;

/// Extractor backed by a pattern table snapshot
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    table: Arc<PatternTable>,
}

impl PatternExtractor {
    pub fn new(table: Arc<PatternTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PatternTable {
        &self.table
    }

    fn match_text(
        &self,
        pattern: &ExtractionPattern,
        regex: &Regex,
        sentence: &Arc<ParsedSentence>,
        entities: &[LinkedEntity],
        out: &mut Vec<ExtractedClaim>,
    ) {
        let text = &sentence.text;
        for caps in regex.captures_iter(text) {
            let (Some(subject), Some(object)) = (caps.name("subject"), caps.name("object")) else {
                continue;
            };
            let to_span = |m: regex::Match<'_>| {
                TextSpan::new(
                    m.as_str(),
                    char_offset(text, m.start()),
                    char_offset(text, m.end()),
                )
            };
            if let Some(claim) =
                build_candidate(pattern, sentence, entities, to_span(subject), to_span(object))
            {
                out.push(claim);
            }
        }
    }

    fn match_shape(
        &self,
        pattern: &ExtractionPattern,
        shape: &DependencyShape,
        sentence: &Arc<ParsedSentence>,
        entities: &[LinkedEntity],
        out: &mut Vec<ExtractedClaim>,
    ) {
        let Some(tree) = sentence.dependencies.as_ref() else {
            return;
        };
        // A broken tree is reported by the dependency extractor
        if tree.validate(sentence.char_len()).is_err() {
            return;
        }
        let Some(verb) = tree.root_verb() else {
            return;
        };
        if !shape.verb_lemmas.contains(&tree.tokens[verb].normalized_lemma()) {
            return;
        }

        if let Some((subject, object)) = svo_spans(
            sentence,
            tree,
            verb,
            &shape.subject_relations,
            &shape.object_relations,
        ) {
            if let Some(claim) = build_candidate(pattern, sentence, entities, subject, object) {
                out.push(claim);
            }
        }
    }
}

impl ClaimExtractor for PatternExtractor {
    fn extract(
        &self,
        sentence: &Arc<ParsedSentence>,
        entities: &[LinkedEntity],
        context: &ClaimExtractionContext,
    ) -> Result<Vec<ExtractedClaim>> {
        let mut claims = Vec::new();

        for compiled in self.table.enabled() {
            let pattern = compiled.pattern();
            if !context.allows_predicate(&pattern.predicate) {
                continue;
            }

            match compiled.matcher() {
                Matcher::Text(regex) => {
                    self.match_text(pattern, regex, sentence, entities, &mut claims)
                }
                Matcher::Shape(shape) => {
                    self.match_shape(pattern, shape, sentence, entities, &mut claims)
                }
            }
        }

        Ok(claims)
    }

    fn name(&self) -> &str {
        "pattern"
    }
}

/// Turn a pair of raw spans into a candidate claim
fn build_candidate(
    pattern: &ExtractionPattern,
    sentence: &Arc<ParsedSentence>,
    entities: &[LinkedEntity],
    subject: TextSpan,
    object: TextSpan,
) -> Option<ExtractedClaim> {
    let subject_span = normalize_span(&subject)?;

    let (object_span, object_entity, literal_value, literal_type) = if pattern.object_is_literal {
        let span = trim_span(&object)?;
        let literal_type = pattern.literal_type.unwrap_or(LiteralType::String);
        let Some(value) = literal_type.normalize(&span.text) else {
            tracing::debug!(
                pattern_id = %pattern.id,
                text = %span.text,
                literal_type = %literal_type,
                "Dropped literal that does not parse"
            );
            return None;
        };
        (span, None, Some(value), Some(literal_type))
    } else {
        let span = normalize_span(&object)?;
        let entity = resolve_entity(&span, sentence, entities).cloned();
        (span, entity, None, None)
    };

    Some(ExtractedClaim {
        subject_entity: resolve_entity(&subject_span, sentence, entities).cloned(),
        subject_span,
        object_span,
        predicate: pattern.predicate.clone(),
        method: ExtractionMethod::PatternRule,
        pattern_id: Some(pattern.id.clone()),
        raw_confidence: pattern.base_confidence,
        sentence: Arc::clone(sentence),
        object_entity,
        literal_value,
        literal_type,
        subject_type: pattern.subject_type.clone(),
        object_type: pattern.object_type.clone(),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use claimx_core::{DepRelation, DependencyTree, PosTag, Token};
    use uuid::Uuid;

    fn extractor(patterns: Vec<ExtractionPattern>) -> PatternExtractor {
        let (table, report) = PatternTable::build(patterns, 1);
        assert!(report.is_clean());
        PatternExtractor::new(Arc::new(table))
    }

    fn context() -> ClaimExtractionContext {
        ClaimExtractionContext::new(Uuid::new_v4(), Uuid::new_v4())
    }

    fn accepts() -> ExtractionPattern {
        ExtractionPattern::template("accepts", "{SUBJECT} accepts {OBJECT}", "ACCEPTS")
            .with_types("Endpoint", "Parameter")
            .with_confidence(0.8)
    }

    #[test]
    fn test_template_candidate() {
        let sentence = Arc::new(ParsedSentence::new(
            0,
            "The GET /users endpoint accepts a limit parameter.",
            0,
        ));
        let entities = vec![
            LinkedEntity::new("GET /users", 4, 14).resolved_to("ep-users", "Endpoint"),
            LinkedEntity::new("limit", 34, 39).resolved_to("param-limit", "Parameter"),
        ];

        let claims = extractor(vec![accepts()])
            .extract(&sentence, &entities, &context())
            .unwrap();

        assert_eq!(claims.len(), 1);
        let claim = &claims[0];
        assert_eq!(claim.predicate, "ACCEPTS");
        assert_eq!(claim.subject_span.text, "GET /users endpoint");
        assert_eq!(claim.subject_span.start_offset, 4);
        assert_eq!(claim.object_span.text, "limit parameter");
        assert_eq!(claim.pattern_id.as_deref(), Some("accepts"));
        assert_eq!(claim.raw_confidence, 0.8);
        assert_eq!(claim.subject_entity.as_ref().unwrap().mention.value, "GET /users");
        assert_eq!(claim.object_entity.as_ref().unwrap().mention.value, "limit");
        assert_eq!(claim.subject_type.as_deref(), Some("Endpoint"));
    }

    #[test]
    fn test_literal_candidate() {
        let pattern = ExtractionPattern::template(
            "default-int",
            "{SUBJECT} defaults to {OBJECT}",
            "HAS_DEFAULT",
        )
        .literal(LiteralType::Int);
        let sentence = Arc::new(ParsedSentence::new(0, "The limit parameter defaults to 10.", 0));

        let claims = extractor(vec![pattern])
            .extract(&sentence, &[], &context())
            .unwrap();

        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].literal_value.as_deref(), Some("10"));
        assert_eq!(claims[0].literal_type, Some(LiteralType::Int));
        assert!(claims[0].object_entity.is_none());
        assert_eq!(claims[0].subject_span.text, "limit parameter");
    }

    #[test]
    fn test_invalid_literal_is_not_a_candidate() {
        let pattern = ExtractionPattern::template(
            "default-int",
            "{SUBJECT} defaults to {OBJECT}",
            "HAS_DEFAULT",
        )
        .literal(LiteralType::Int);
        let sentence = Arc::new(ParsedSentence::new(0, "The order defaults to ascending.", 0));

        let claims = extractor(vec![pattern])
            .extract(&sentence, &[], &context())
            .unwrap();
        assert!(claims.is_empty());
    }

    #[test]
    fn test_filtered_pattern_skipped() {
        let sentence = Arc::new(ParsedSentence::new(0, "The endpoint accepts a token.", 0));
        let ctx = context().with_predicate_filter(["RETURNS"]);
        let claims = extractor(vec![accepts()]).extract(&sentence, &[], &ctx).unwrap();
        assert!(claims.is_empty());
    }

    #[test]
    fn test_priority_order_of_results() {
        let sentence = Arc::new(ParsedSentence::new(0, "The client accepts and returns JSON.", 0));
        let patterns = vec![
            ExtractionPattern::regex(
                "low",
                r"(?P<subject>client) accepts and returns (?P<object>JSON)",
                "RETURNS",
            )
            .with_priority(1),
            ExtractionPattern::regex(
                "high",
                r"(?P<subject>client) accepts (?P<object>and)",
                "ACCEPTS",
            )
            .with_priority(9),
        ];
        let claims = extractor(patterns).extract(&sentence, &[], &context()).unwrap();
        let ids: Vec<&str> = claims.iter().filter_map(|c| c.pattern_id.as_deref()).collect();
        assert_eq!(ids, vec!["high", "low"]);
    }

    #[test]
    fn test_multibyte_offsets_are_chars() {
        let pattern = ExtractionPattern::regex(
            "uses",
            r"(?P<subject>\S+) benötigt (?P<object>\S+?)\.",
            "REQUIRES",
        );
        let sentence = Arc::new(ParsedSentence::new(0, "Größe benötigt Zähler.", 0));
        let claims = extractor(vec![pattern]).extract(&sentence, &[], &context()).unwrap();
        assert_eq!(claims[0].object_span.text, "Zähler");
        assert_eq!(claims[0].object_span.start_offset, 15);
        assert_eq!(claims[0].object_span.end_offset, 21);
    }

    #[test]
    fn test_dependency_shape_pattern() {
        // "The list call returns a cursor."
        let tok = |text: &str, lemma: &str, pos, rel: &str, head, start| Token {
            text: text.to_string(),
            lemma: lemma.to_string(),
            pos,
            relation: DepRelation::from(rel),
            head,
            start_offset: start,
            end_offset: start + text.len(),
        };
        let tree = DependencyTree::new(vec![
            tok("The", "the", PosTag::Det, "det", Some(2), 0),
            tok("list", "list", PosTag::Noun, "compound", Some(2), 4),
            tok("call", "call", PosTag::Noun, "nsubj", Some(3), 9),
            tok("returns", "return", PosTag::Verb, "ROOT", None, 14),
            tok("a", "a", PosTag::Det, "det", Some(5), 22),
            tok("cursor", "cursor", PosTag::Noun, "dobj", Some(3), 24),
            tok(".", ".", PosTag::Punct, "punct", Some(3), 30),
        ]);
        let sentence = Arc::new(
            ParsedSentence::new(0, "The list call returns a cursor.", 0).with_dependencies(tree),
        );
        let pattern = ExtractionPattern::dependency_shape(
            "returns-shape",
            DependencyShape::for_verbs(["return"]),
            "RETURNS",
        )
        .with_confidence(0.75);

        let claims = extractor(vec![pattern.clone()])
            .extract(&sentence, &[], &context())
            .unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].subject_span.text, "list call");
        assert_eq!(claims[0].object_span.text, "cursor");
        assert_eq!(claims[0].method, ExtractionMethod::PatternRule);

        let plain = Arc::new(ParsedSentence::new(0, "The list call returns a cursor.", 0));
        let claims = extractor(vec![pattern]).extract(&plain, &[], &context()).unwrap();
        assert!(claims.is_empty());
    }
}
