//! claimx Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used by the claim extraction pipeline:
//! - Spans, linked entities and claim records (subject, predicate, object)
//! - Extraction patterns and the predicate vocabulary
//! - Parsed sentences, dependency trees and the sentence parser trait
//! - Common error types
//! - Configuration management

pub mod config;
pub mod pattern;
pub mod predicate;
pub mod sentence;

pub use config::{
    AppConfig, ConfigError, ExtractionDefaults, LoggingConfig, PatternFile, PatternSourceConfig,
    RuntimeConfig, ScoringConfig,
};
pub use pattern::{DependencyShape, ExtractionPattern, LiteralType, PatternKind};
pub use predicate::Predicate;
pub use sentence::{
    DepRelation, DependencyTree, ParseOptions, ParseOutput, ParsedSentence, PosTag,
    SentenceParser, Token,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for claim extraction
#[derive(Error, Debug)]
pub enum ClaimxError {
    #[error("Invalid extraction context: {0}")]
    InvalidContext(String),

    #[error("Malformed dependency tree: {0}")]
    MalformedTree(String),

    #[error("Sentence parser error: {0}")]
    Parser(String),

    #[error("Pattern '{pattern_id}' failed to compile: {message}")]
    PatternCompile { pattern_id: String, message: String },

    #[error("Extraction cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ClaimxError>;

// ============================================================================
// Spans and Linked Entities
// ============================================================================

/// A contiguous character range within a sentence
///
/// Offsets count characters (not bytes) from the start of the owning sentence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextSpan {
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl TextSpan {
    /// Create a new span. `end_offset` is clamped so that `start <= end` holds.
    pub fn new(text: impl Into<String>, start_offset: usize, end_offset: usize) -> Self {
        Self {
            text: text.into(),
            start_offset,
            end_offset: end_offset.max(start_offset),
        }
    }

    /// Number of characters covered
    pub fn len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    pub fn is_empty(&self) -> bool {
        self.start_offset == self.end_offset
    }

    /// Translate to absolute document offsets given the sentence start
    pub fn to_absolute(&self, sentence_start: usize) -> (usize, usize) {
        (
            sentence_start + self.start_offset,
            sentence_start + self.end_offset,
        )
    }
}

/// The surface mention of a linked entity, in absolute document offsets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMention {
    pub value: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

/// Reference to an entity that already exists in the knowledge graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEntityRef {
    /// Graph entity identifier
    pub id: String,

    /// Ontology class of the entity (e.g. "Endpoint", "Parameter")
    pub entity_type: String,

    /// Human-readable label
    #[serde(default)]
    pub label: Option<String>,
}

/// Output of the external entity linker for one mention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedEntity {
    pub mention: EntityMention,

    /// Resolved graph entity, if the linker found one
    #[serde(default)]
    pub resolved_entity: Option<GraphEntityRef>,

    /// Link confidence (0.0 - 1.0)
    pub confidence: f32,
}

impl LinkedEntity {
    /// Create an unresolved mention
    pub fn new(value: impl Into<String>, start_offset: usize, end_offset: usize) -> Self {
        Self {
            mention: EntityMention {
                value: value.into(),
                start_offset,
                end_offset,
            },
            resolved_entity: None,
            confidence: 1.0,
        }
    }

    /// Attach the resolved graph entity
    pub fn resolved_to(mut self, id: impl Into<String>, entity_type: impl Into<String>) -> Self {
        self.resolved_entity = Some(GraphEntityRef {
            id: id.into(),
            entity_type: entity_type.into(),
            label: None,
        });
        self
    }

    /// Set link confidence
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_entity.is_some()
    }

    /// Whether the mention lies fully inside `[start, end)`
    pub fn is_within(&self, start: usize, end: usize) -> bool {
        self.mention.start_offset >= start && self.mention.end_offset <= end
    }
}

// ============================================================================
// Claims
// ============================================================================

/// How a claim was extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    PatternRule,
    DependencyParsing,
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PatternRule => write!(f, "pattern_rule"),
            Self::DependencyParsing => write!(f, "dependency_parsing"),
        }
    }
}

/// Subject or object entity of a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClaimEntity {
    /// Bound to an existing graph entity
    Resolved {
        entity_id: String,
        surface_form: String,
        entity_type: String,
        link_confidence: f32,
    },
    /// Only the surface text is known
    Unresolved {
        surface_form: String,
        guessed_type: String,
    },
}

impl ClaimEntity {
    pub fn surface_form(&self) -> &str {
        match self {
            Self::Resolved { surface_form, .. } | Self::Unresolved { surface_form, .. } => {
                surface_form
            }
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    /// Identity comparison used for deduplication.
    ///
    /// Resolved entities match on graph id; unresolved ones match on
    /// case-insensitive surface form plus guessed type. Mixed pairs never match.
    pub fn same_identity(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Resolved { entity_id: a, .. }, Self::Resolved { entity_id: b, .. }) => a == b,
            (
                Self::Unresolved {
                    surface_form: a,
                    guessed_type: ta,
                },
                Self::Unresolved {
                    surface_form: b,
                    guessed_type: tb,
                },
            ) => a.to_lowercase() == b.to_lowercase() && ta == tb,
            _ => false,
        }
    }
}

/// Object of a claim: an entity or a typed literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClaimObject {
    Entity { entity: ClaimEntity },
    Literal {
        value: String,
        literal_type: LiteralType,
    },
}

impl ClaimObject {
    /// Surface text of the object (literal value for literals)
    pub fn surface_form(&self) -> &str {
        match self {
            Self::Entity { entity } => entity.surface_form(),
            Self::Literal { value, .. } => value,
        }
    }

    pub fn same_identity(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Entity { entity: a }, Self::Entity { entity: b }) => a.same_identity(b),
            (
                Self::Literal {
                    value: a,
                    literal_type: ta,
                },
                Self::Literal {
                    value: b,
                    literal_type: tb,
                },
            ) => a == b && ta == tb,
            _ => false,
        }
    }
}

/// Where a claim came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimEvidence {
    /// Full text of the source sentence
    pub sentence_text: String,

    /// Absolute document offset where the claim's text begins
    pub start_offset: usize,

    /// Absolute document offset where the claim's text ends
    pub end_offset: usize,

    pub extraction_method: ExtractionMethod,

    /// Pattern that produced the claim (pattern extraction only)
    pub pattern_id: Option<String>,
}

/// A scored subject-predicate-object assertion ready for graph validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub subject: ClaimEntity,
    pub predicate: String,
    pub object: ClaimObject,

    /// Confidence score (0.0 - 1.0)
    pub confidence: f32,

    pub document_id: Uuid,
    pub project_id: Uuid,
    pub evidence: ClaimEvidence,
}

/// Intermediate extraction result, before scoring and conversion
#[derive(Debug, Clone)]
pub struct ExtractedClaim {
    pub subject_span: TextSpan,
    pub object_span: TextSpan,
    pub predicate: String,
    pub method: ExtractionMethod,
    pub pattern_id: Option<String>,
    pub raw_confidence: f32,

    /// Sentence the spans are relative to
    pub sentence: Arc<ParsedSentence>,

    pub subject_entity: Option<LinkedEntity>,
    pub object_entity: Option<LinkedEntity>,

    pub literal_value: Option<String>,
    pub literal_type: Option<LiteralType>,

    /// Expected subject type declared by the producing pattern
    pub subject_type: Option<String>,
    /// Expected object type declared by the producing pattern
    pub object_type: Option<String>,
}

impl ExtractedClaim {
    pub fn is_literal(&self) -> bool {
        self.literal_value.is_some()
    }
}

// ============================================================================
// Extraction Context
// ============================================================================

/// Per-run extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimExtractionContext {
    pub document_id: Uuid,
    pub project_id: Uuid,

    /// Claims scoring below this are dropped
    pub min_confidence: f32,

    pub use_patterns: bool,
    pub use_dependency_extraction: bool,
    pub deduplicate_claims: bool,

    /// Allow-list of predicates; `None` allows everything
    pub predicate_filter: Option<HashSet<String>>,

    pub max_claims_per_sentence: usize,

    /// Patterns for this run only; same id overrides the loaded table
    pub custom_patterns: Option<Vec<ExtractionPattern>>,
}

impl ClaimExtractionContext {
    /// Create a context with default settings
    pub fn new(document_id: Uuid, project_id: Uuid) -> Self {
        ExtractionDefaults::default().context_for(document_id, project_id)
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_patterns(mut self, enabled: bool) -> Self {
        self.use_patterns = enabled;
        self
    }

    pub fn with_dependency_extraction(mut self, enabled: bool) -> Self {
        self.use_dependency_extraction = enabled;
        self
    }

    pub fn with_deduplication(mut self, enabled: bool) -> Self {
        self.deduplicate_claims = enabled;
        self
    }

    pub fn with_max_claims_per_sentence(mut self, max: usize) -> Self {
        self.max_claims_per_sentence = max;
        self
    }

    /// Restrict output to the given predicates
    pub fn with_predicate_filter<I, S>(mut self, predicates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.predicate_filter = Some(predicates.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_custom_patterns(mut self, patterns: Vec<ExtractionPattern>) -> Self {
        self.custom_patterns = Some(patterns);
        self
    }

    /// Check whether a predicate passes the filter
    pub fn allows_predicate(&self, predicate: &str) -> bool {
        self.predicate_filter
            .as_ref()
            .map(|filter| filter.contains(predicate))
            .unwrap_or(true)
    }

    /// Validate settings before any work is done
    pub fn validate(&self) -> Result<()> {
        if !self.min_confidence.is_finite() || !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ClaimxError::InvalidContext(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }
        if self.max_claims_per_sentence == 0 {
            return Err(ClaimxError::InvalidContext(
                "max_claims_per_sentence must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Extraction Results
// ============================================================================

/// Aggregate counters for one extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub sentences_total: usize,
    pub sentences_failed: usize,
    pub pattern_candidates: usize,
    pub dependency_candidates: usize,
    /// Candidates dropped by the per-sentence cap
    pub capped: usize,
    /// Candidates dropped by the confidence threshold
    pub below_threshold: usize,
    pub claims_before_dedup: usize,
    pub duplicates_removed: usize,
    pub claims_produced: usize,
}

/// A sentence whose extraction failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedSentence {
    pub text: String,
    pub start_offset: usize,
    pub reason: String,
}

/// Result bundle of a document extraction run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub claims: Vec<Claim>,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub stats: ExtractionStats,
    pub failed_sentences: Vec<FailedSentence>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn unresolved(surface: &str, guessed: &str) -> ClaimEntity {
        ClaimEntity::Unresolved {
            surface_form: surface.to_string(),
            guessed_type: guessed.to_string(),
        }
    }

    fn resolved(id: &str, surface: &str) -> ClaimEntity {
        ClaimEntity::Resolved {
            entity_id: id.to_string(),
            surface_form: surface.to_string(),
            entity_type: "Endpoint".to_string(),
            link_confidence: 0.9,
        }
    }

    #[test]
    fn test_resolved_identity_uses_graph_id() {
        assert!(resolved("ep-1", "GET /users").same_identity(&resolved("ep-1", "users endpoint")));
        assert!(!resolved("ep-1", "GET /users").same_identity(&resolved("ep-2", "GET /users")));
    }

    #[test]
    fn test_unresolved_identity_is_case_insensitive() {
        assert!(unresolved("Limit", "Parameter").same_identity(&unresolved("limit", "Parameter")));
        assert!(!unresolved("limit", "Parameter").same_identity(&unresolved("limit", "Field")));
    }

    #[test]
    fn test_mixed_identity_never_matches() {
        assert!(!resolved("ep-1", "endpoint").same_identity(&unresolved("endpoint", "Endpoint")));
    }

    #[test]
    fn test_literal_identity() {
        let a = ClaimObject::Literal {
            value: "10".to_string(),
            literal_type: LiteralType::Int,
        };
        let b = ClaimObject::Literal {
            value: "10".to_string(),
            literal_type: LiteralType::String,
        };
        assert!(a.same_identity(&a.clone()));
        assert!(!a.same_identity(&b));
    }

    #[test]
    fn test_context_defaults() {
        let ctx = ClaimExtractionContext::new(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(ctx.min_confidence, 0.5);
        assert_eq!(ctx.max_claims_per_sentence, 5);
        assert!(ctx.use_patterns && ctx.use_dependency_extraction && ctx.deduplicate_claims);
        assert!(ctx.validate().is_ok());
    }

    #[test]
    fn test_context_validation() {
        let ctx = ClaimExtractionContext::new(Uuid::new_v4(), Uuid::new_v4());
        assert!(ctx.clone().with_min_confidence(1.5).validate().is_err());
        assert!(ctx.clone().with_min_confidence(f32::NAN).validate().is_err());
        assert!(ctx.with_max_claims_per_sentence(0).validate().is_err());
    }

    #[test]
    fn test_predicate_filter() {
        let ctx = ClaimExtractionContext::new(Uuid::new_v4(), Uuid::new_v4())
            .with_predicate_filter(["ACCEPTS"]);
        assert!(ctx.allows_predicate("ACCEPTS"));
        assert!(!ctx.allows_predicate("RETURNS"));
    }

    #[test]
    fn test_linked_entity_builder() {
        let entity = LinkedEntity::new("limit", 10, 15)
            .resolved_to("param-1", "Parameter")
            .with_confidence(0.8);
        assert!(entity.is_resolved());
        assert!(entity.is_within(0, 20));
        assert!(!entity.is_within(11, 20));
    }
}
