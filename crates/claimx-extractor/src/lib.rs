//! claimx Extractor - Claim extraction pipeline
//!
//! Turns parsed sentences into scored subject-predicate-object claims using
//! declarative patterns and dependency-tree traversal, then resolves spans
//! against linked entities and deduplicates across the document.

use std::sync::Arc;

use claimx_core::{ClaimExtractionContext, ExtractedClaim, LinkedEntity, ParsedSentence, Result};

pub mod convert;
pub mod dedup;
pub mod defaults;
pub mod dependency;
pub mod metrics;
pub mod orchestrator;
pub mod pattern_extractor;
pub mod patterns;
pub mod resolver;
pub mod scoring;
pub mod segmenter;
pub mod span;

pub use dedup::{ClaimDeduplicator, DedupOutcome};
pub use dependency::DependencyExtractor;
pub use orchestrator::ClaimExtractionService;
pub use pattern_extractor::PatternExtractor;
pub use patterns::{
    CompileError, CompiledPattern, PatternLoadReport, PatternStore, PatternTable,
    PatternTableStats,
};
pub use scoring::ConfidenceScorer;
pub use segmenter::{PreParsedSentences, RuleBasedSegmenter};

/// Trait for per-sentence claim extractors
pub trait ClaimExtractor: Send + Sync {
    /// Produce candidate claims for one sentence.
    ///
    /// `entities` holds the linked entities that fall inside the sentence.
    fn extract(
        &self,
        sentence: &Arc<ParsedSentence>,
        entities: &[LinkedEntity],
        context: &ClaimExtractionContext,
    ) -> Result<Vec<ExtractedClaim>>;

    /// Get extractor name for logging
    fn name(&self) -> &str;
}

/// The set of extractors run by the orchestrator
#[derive(Debug, Clone)]
pub enum Extractor {
    Pattern(PatternExtractor),
    Dependency(DependencyExtractor),
}

impl ClaimExtractor for Extractor {
    fn extract(
        &self,
        sentence: &Arc<ParsedSentence>,
        entities: &[LinkedEntity],
        context: &ClaimExtractionContext,
    ) -> Result<Vec<ExtractedClaim>> {
        match self {
            Self::Pattern(extractor) => extractor.extract(sentence, entities, context),
            Self::Dependency(extractor) => extractor.extract(sentence, entities, context),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Pattern(extractor) => extractor.name(),
            Self::Dependency(extractor) => extractor.name(),
        }
    }
}
