//! Dependency-tree claim extraction
//!
//! Reads subject-verb-object triples off the main clause of a parsed sentence:
//! the root verb's lemma picks the predicate, its subject and direct object
//! become the spans, each expanded over its compound modifiers.

use std::sync::Arc;

use claimx_core::{
    ClaimExtractionContext, DepRelation, DependencyTree, ExtractedClaim, ExtractionMethod,
    LinkedEntity, ParsedSentence, Predicate, Result, TextSpan,
};

use crate::resolver::resolve_entity;
use crate::span::normalize_span;
use crate::ClaimExtractor;

/// Default raw confidence of dependency-parse claims
pub const DEFAULT_DEPENDENCY_CONFIDENCE: f32 = 0.7;

/// Locate the subject and object spans of `verb` through the given relations.
///
/// Returns `None` unless both are present.
pub fn svo_spans(
    sentence: &ParsedSentence,
    tree: &DependencyTree,
    verb: usize,
    subject_relations: &[DepRelation],
    object_relations: &[DepRelation],
) -> Option<(TextSpan, TextSpan)> {
    let subject = tree.child_with(verb, subject_relations)?;
    let object = tree.child_with(verb, object_relations)?;

    let subject_span = sentence.span_of_tokens(&tree.noun_phrase(subject))?;
    let object_span = sentence.span_of_tokens(&tree.noun_phrase(object))?;
    Some((subject_span, object_span))
}

/// Syntactic SVO extractor
#[derive(Debug, Clone)]
pub struct DependencyExtractor {
    confidence: f32,
}

impl DependencyExtractor {
    pub fn new() -> Self {
        Self {
            confidence: DEFAULT_DEPENDENCY_CONFIDENCE,
        }
    }

    /// Override the raw confidence assigned to every claim
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}

impl Default for DependencyExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimExtractor for DependencyExtractor {
    fn extract(
        &self,
        sentence: &Arc<ParsedSentence>,
        entities: &[LinkedEntity],
        context: &ClaimExtractionContext,
    ) -> Result<Vec<ExtractedClaim>> {
        let Some(tree) = sentence.dependencies.as_ref() else {
            return Ok(Vec::new());
        };
        tree.validate(sentence.char_len())?;

        let Some(verb) = tree.root_verb() else {
            return Ok(Vec::new());
        };

        let predicate = Predicate::from_verb_lemma(&tree.tokens[verb].normalized_lemma());
        if !context.allows_predicate(predicate.as_str()) {
            return Ok(Vec::new());
        }

        let Some((subject, object)) = svo_spans(
            sentence,
            tree,
            verb,
            &[DepRelation::Nsubj, DepRelation::NsubjPass],
            &[DepRelation::Dobj],
        ) else {
            return Ok(Vec::new());
        };

        let (Some(subject_span), Some(object_span)) =
            (normalize_span(&subject), normalize_span(&object))
        else {
            return Ok(Vec::new());
        };

        tracing::debug!(
            sentence = sentence.index,
            predicate = %predicate,
            subject = %subject_span.text,
            object = %object_span.text,
            "Dependency triple"
        );

        Ok(vec![ExtractedClaim {
            subject_entity: resolve_entity(&subject_span, sentence, entities).cloned(),
            object_entity: resolve_entity(&object_span, sentence, entities).cloned(),
            subject_span,
            object_span,
            predicate: predicate.as_str().to_string(),
            method: ExtractionMethod::DependencyParsing,
            pattern_id: None,
            raw_confidence: self.confidence,
            sentence: Arc::clone(sentence),
            literal_value: None,
            literal_type: None,
            subject_type: None,
            object_type: None,
        }])
    }

    fn name(&self) -> &str {
        "dependency"
    }
}

// ============================================================================
// Tests
// ============================================================================
