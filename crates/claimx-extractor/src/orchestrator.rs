//! Claim Extraction Orchestrator
//!
//! Entry point of the pipeline:
//! 1. Parse the document into sentences (external parser)
//! 2. Run the extractors on each sentence in a bounded worker pool
//! 3. Cap, score and threshold each sentence's candidates
//! 4. Deduplicate across the whole document
//!
//! A failing sentence is recorded and skipped; it never aborts the run.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use claimx_core::{
    AppConfig, Claim, ClaimExtractionContext, ClaimxError, ExtractedClaim, ExtractionMethod,
    ExtractionPattern, ExtractionResult, ExtractionStats, FailedSentence, LinkedEntity,
    ParseOptions, ParsedSentence, Result, ScoringConfig, SentenceParser,
};

use crate::convert::to_claim;
use crate::dedup::ClaimDeduplicator;
use crate::dependency::DependencyExtractor;
use crate::pattern_extractor::PatternExtractor;
use crate::patterns::{CompiledPattern, PatternLoadReport, PatternStore, PatternTableStats};
use crate::scoring::ConfidenceScorer;
use crate::{ClaimExtractor, Extractor};

// ============================================================================
// Run plan
// ============================================================================

/// Everything one run needs, frozen at call entry
struct RunPlan {
    extractors: Vec<Extractor>,
    scorer: ConfidenceScorer,
    context: ClaimExtractionContext,
}

/// Per-sentence result before document-level aggregation
#[derive(Debug, Default)]
struct SentenceOutcome {
    claims: Vec<Claim>,
    pattern_candidates: usize,
    dependency_candidates: usize,
    capped: usize,
    below_threshold: usize,
}

impl RunPlan {
    fn process_sentence(
        &self,
        sentence: &Arc<ParsedSentence>,
        entities: &[LinkedEntity],
    ) -> Result<SentenceOutcome> {
        let mut outcome = SentenceOutcome::default();
        let mut candidates: Vec<ExtractedClaim> = Vec::new();

        for extractor in &self.extractors {
            candidates.extend(extractor.extract(sentence, entities, &self.context)?);
        }

        for candidate in &candidates {
            match candidate.method {
                ExtractionMethod::PatternRule => outcome.pattern_candidates += 1,
                ExtractionMethod::DependencyParsing => outcome.dependency_candidates += 1,
            }
        }

        // Stable sort keeps extractor and priority order among equal scores
        candidates.sort_by(|a, b| b.raw_confidence.total_cmp(&a.raw_confidence));
        let cap = self.context.max_claims_per_sentence;
        if candidates.len() > cap {
            outcome.capped = candidates.len() - cap;
            candidates.truncate(cap);
        }

        for candidate in &candidates {
            let confidence = self.scorer.score(candidate);
            if confidence < self.context.min_confidence {
                tracing::debug!(
                    sentence = sentence.index,
                    predicate = %candidate.predicate,
                    confidence,
                    "Dropped claim below threshold"
                );
                outcome.below_threshold += 1;
                continue;
            }
            outcome
                .claims
                .push(to_claim(candidate, confidence, &self.context));
        }

        tracing::debug!(
            sentence = sentence.index,
            candidates = candidates.len() + outcome.capped,
            claims = outcome.claims.len(),
            "Sentence processed"
        );

        Ok(outcome)
    }
}

// ============================================================================
// Service
// ============================================================================

/// Claim extraction service
pub struct ClaimExtractionService {
    /// Sentence segmentation and parsing backend
    parser: Arc<dyn SentenceParser>,

    /// Active pattern table
    patterns: PatternStore,

    scorer: ConfidenceScorer,

    dependency: DependencyExtractor,

    /// Sentences processed concurrently
    concurrency: usize,
}

impl ClaimExtractionService {
    /// Create a service with default scoring and concurrency
    pub fn new(parser: Arc<dyn SentenceParser>, patterns: PatternStore) -> Self {
        let config = AppConfig::default();
        Self {
            parser,
            patterns,
            scorer: ConfidenceScorer::new(config.scoring.clone()),
            dependency: DependencyExtractor::new()
                .with_confidence(config.scoring.dependency_confidence),
            concurrency: config.runtime.concurrency(),
        }
    }

    /// Create a service from configuration and an initial pattern list
    pub fn from_config(
        parser: Arc<dyn SentenceParser>,
        config: &AppConfig,
        patterns: Vec<ExtractionPattern>,
    ) -> (Self, PatternLoadReport) {
        let (store, report) = PatternStore::load(patterns);
        let service = Self::new(parser, store)
            .with_scoring(config.scoring.clone())
            .with_concurrency(config.runtime.concurrency());
        (service, report)
    }

    /// Set scoring weights (also sets the dependency claim confidence)
    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.dependency = DependencyExtractor::new().with_confidence(scoring.dependency_confidence);
        self.scorer = ConfidenceScorer::new(scoring);
        self
    }

    /// Set worker pool size
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn parser_name(&self) -> &str {
        self.parser.name()
    }

    /// Atomically replace the active pattern table.
    ///
    /// Runs already in flight keep the table they started with.
    pub async fn reload_patterns(&self, patterns: Vec<ExtractionPattern>) -> PatternLoadReport {
        self.patterns.reload(patterns).await
    }

    /// Statistics of the active pattern table
    pub async fn get_stats(&self) -> PatternTableStats {
        self.patterns.stats().await
    }

    /// Validate the context and freeze the pattern table for one run
    async fn prepare(&self, context: &ClaimExtractionContext) -> Result<Arc<RunPlan>> {
        context.validate()?;

        let mut table = self.patterns.snapshot().await;

        if let Some(custom) = &context.custom_patterns {
            let mut seen = HashSet::new();
            let mut compiled = Vec::with_capacity(custom.len());
            for pattern in custom {
                if !seen.insert(pattern.id.clone()) {
                    return Err(ClaimxError::PatternCompile {
                        pattern_id: pattern.id.clone(),
                        message: "duplicate pattern id".to_string(),
                    });
                }
                let id = pattern.id.clone();
                compiled.push(CompiledPattern::compile(pattern.clone()).map_err(|e| {
                    ClaimxError::PatternCompile {
                        pattern_id: id,
                        message: e.to_string(),
                    }
                })?);
            }
            table = Arc::new(table.with_overrides(compiled));
        }

        let mut extractors = Vec::new();
        if context.use_patterns {
            extractors.push(Extractor::Pattern(PatternExtractor::new(table)));
        }
        if context.use_dependency_extraction {
            extractors.push(Extractor::Dependency(self.dependency.clone()));
        }

        Ok(Arc::new(RunPlan {
            extractors,
            scorer: self.scorer.clone(),
            context: context.clone(),
        }))
    }

    /// Extract claims from a whole document
    pub async fn extract_claims(
        &self,
        text: &str,
        linked_entities: &[LinkedEntity],
        context: &ClaimExtractionContext,
    ) -> Result<ExtractionResult> {
        let never = CancellationToken::new();
        self.extract_claims_with_cancellation(text, linked_entities, context, &never)
            .await
    }

    /// Extract claims from a whole document, aborting when `cancel` fires.
    ///
    /// A cancelled run returns [`ClaimxError::Cancelled`] and no claims.
    pub async fn extract_claims_with_cancellation(
        &self,
        text: &str,
        linked_entities: &[LinkedEntity],
        context: &ClaimExtractionContext,
        cancel: &CancellationToken,
    ) -> Result<ExtractionResult> {
        let started_at = Utc::now();
        let start_time = Instant::now();

        let plan = self.prepare(context).await?;
        let names: Vec<&str> = plan.extractors.iter().map(|e| e.name()).collect();

        tracing::info!(
            document_id = %context.document_id,
            parser = self.parser.name(),
            extractors = ?names,
            "Claim extraction started"
        );

        // 1. Parse
        let options = ParseOptions {
            include_dependencies: context.use_dependency_extraction,
            include_semantic_roles: false,
        };
        let parsed = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClaimxError::Cancelled),
            parsed = self.parser.parse(text, options) => parsed?,
        };

        let sentences: Vec<Arc<ParsedSentence>> =
            parsed.sentences.into_iter().map(Arc::new).collect();
        tracing::debug!("Parsed {} sentences", sentences.len());

        let mut stats = ExtractionStats {
            sentences_total: sentences.len(),
            ..Default::default()
        };

        // 2. Per-sentence extraction, results in document order
        let tasks = sentences.into_iter().map(|sentence| {
            let plan = Arc::clone(&plan);
            let entities: Vec<LinkedEntity> = linked_entities
                .iter()
                .filter(|e| e.is_within(sentence.start_offset, sentence.end_offset))
                .cloned()
                .collect();
            async move {
                let worker_sentence = Arc::clone(&sentence);
                let outcome =
                    run_blocking(move || plan.process_sentence(&worker_sentence, &entities)).await;
                (sentence, outcome)
            }
        });
        let mut results = futures::stream::iter(tasks).buffered(self.concurrency);

        let mut claims = Vec::new();
        let mut failed_sentences = Vec::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(
                        document_id = %context.document_id,
                        "Claim extraction cancelled"
                    );
                    return Err(ClaimxError::Cancelled);
                }
                next = results.next() => next,
            };
            let Some((sentence, outcome)) = next else {
                break;
            };

            let reason = match outcome {
                Ok(outcome) => {
                    stats.pattern_candidates += outcome.pattern_candidates;
                    stats.dependency_candidates += outcome.dependency_candidates;
                    stats.capped += outcome.capped;
                    stats.below_threshold += outcome.below_threshold;
                    claims.extend(outcome.claims);
                    continue;
                }
                Err(reason) => reason,
            };

            tracing::warn!(
                sentence = sentence.index,
                start_offset = sentence.start_offset,
                error = %reason,
                "Sentence extraction failed"
            );
            failed_sentences.push(FailedSentence {
                text: sentence.text.clone(),
                start_offset: sentence.start_offset,
                reason,
            });
        }

        // 3. Document-level deduplication
        stats.claims_before_dedup = claims.len();
        if context.deduplicate_claims {
            let outcome = ClaimDeduplicator::new().deduplicate(claims);
            stats.duplicates_removed = outcome.duplicates_removed;
            claims = outcome.claims;
        }
        stats.claims_produced = claims.len();
        stats.sentences_failed = failed_sentences.len();

        let duration = start_time.elapsed();
        tracing::info!(
            document_id = %context.document_id,
            claims = stats.claims_produced,
            duplicates_removed = stats.duplicates_removed,
            sentences_failed = stats.sentences_failed,
            duration_ms = duration.as_millis() as u64,
            "Claim extraction finished"
        );

        Ok(ExtractionResult {
            claims,
            started_at,
            duration,
            stats,
            failed_sentences,
        })
    }

    /// Extract claims from a single already-parsed sentence.
    ///
    /// Unlike document extraction, a failure here is returned to the caller.
    pub async fn extract_from_sentence(
        &self,
        sentence: ParsedSentence,
        linked_entities: &[LinkedEntity],
        context: &ClaimExtractionContext,
    ) -> Result<Vec<Claim>> {
        let plan = self.prepare(context).await?;
        let mut sentence = sentence;
        if !context.use_dependency_extraction {
            sentence.dependencies = None;
        }
        let sentence = Arc::new(sentence);
        let entities: Vec<LinkedEntity> = linked_entities
            .iter()
            .filter(|e| e.is_within(sentence.start_offset, sentence.end_offset))
            .cloned()
            .collect();

        let outcome = plan.process_sentence(&sentence, &entities)?;

        if context.deduplicate_claims {
            Ok(ClaimDeduplicator::new().deduplicate(outcome.claims).claims)
        } else {
            Ok(outcome.claims)
        }
    }
}

/// Run sentence work on the blocking pool.
///
/// An error or a panic inside `work` comes back as the failure reason.
async fn run_blocking<T, F>(work: F) -> std::result::Result<T, String>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(format!("extraction worker failed: {}", e)),
    }
}

// ============================================================================
// Tests
// ============================================================================
