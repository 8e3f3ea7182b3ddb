//! Confidence scoring
//!
//! Final confidence is the raw extractor confidence plus a bonus for each side
//! bound to a resolved graph entity, weighted by link confidence. The bonus is
//! capped and the result clamped to `[0, 1]`. Scoring is a pure function.

use claimx_core::{ExtractedClaim, LinkedEntity, ScoringConfig};

/// Computes final claim confidence
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    config: ScoringConfig,
}

impl ConfidenceScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Entity bonus contributed by one side
    fn side_bonus(&self, entity: Option<&LinkedEntity>) -> f32 {
        match entity {
            Some(e) if e.is_resolved() && e.confidence.is_finite() => {
                self.config.entity_link_weight.max(0.0) * e.confidence.clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    /// Final confidence for a candidate
    pub fn score(&self, claim: &ExtractedClaim) -> f32 {
        let bonus = self.side_bonus(claim.subject_entity.as_ref())
            + self.side_bonus(claim.object_entity.as_ref());
        let bonus = bonus.min(self.config.max_entity_bonus.max(0.0));

        (claim.raw_confidence + bonus).clamp(0.0, 1.0)
    }
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimx_core::{ExtractionMethod, ParsedSentence, TextSpan};
    use std::sync::Arc;

    fn candidate(raw: f32) -> ExtractedClaim {
        ExtractedClaim {
            subject_span: TextSpan::new("client", 0, 6),
            object_span: TextSpan::new("token", 16, 21),
            predicate: "REQUIRES".to_string(),
            method: ExtractionMethod::PatternRule,
            pattern_id: Some("requires".to_string()),
            raw_confidence: raw,
            sentence: Arc::new(ParsedSentence::new(0, "client requires token", 0)),
            subject_entity: None,
            object_entity: None,
            literal_value: None,
            literal_type: None,
            subject_type: None,
            object_type: None,
        }
    }

    #[test]
    fn test_unresolved_keeps_raw() {
        let scorer = ConfidenceScorer::default();
        assert_eq!(scorer.score(&candidate(0.6)), 0.6);

        let mut claim = candidate(0.6);
        claim.subject_entity = Some(LinkedEntity::new("client", 0, 6));
        assert_eq!(scorer.score(&claim), 0.6);
    }

    #[test]
    fn test_resolved_side_adds_bonus() {
        let scorer = ConfidenceScorer::default();
        let mut claim = candidate(0.6);
        claim.subject_entity = Some(
            LinkedEntity::new("client", 0, 6)
                .resolved_to("c", "Service")
                .with_confidence(0.5),
        );
        let score = scorer.score(&claim);
        assert!((score - 0.65).abs() < 1e-6);
        assert!(score >= claim.raw_confidence);
    }

    #[test]
    fn test_bonus_capped_and_clamped() {
        let scorer = ConfidenceScorer::new(ScoringConfig {
            entity_link_weight: 0.5,
            max_entity_bonus: 0.3,
            dependency_confidence: 0.7,
        });
        let mut claim = candidate(0.5);
        claim.subject_entity = Some(LinkedEntity::new("client", 0, 6).resolved_to("c", "Service"));
        claim.object_entity = Some(LinkedEntity::new("token", 16, 21).resolved_to("t", "Concept"));
        assert!((scorer.score(&claim) - 0.8).abs() < 1e-6);

        claim.raw_confidence = 0.95;
        assert_eq!(scorer.score(&claim), 1.0);
    }

    #[test]
    fn test_score_is_deterministic() {
        let scorer = ConfidenceScorer::default();
        let mut claim = candidate(0.7);
        claim.object_entity = Some(
            LinkedEntity::new("token", 16, 21)
                .resolved_to("t", "Concept")
                .with_confidence(0.9),
        );
        assert_eq!(scorer.score(&claim), scorer.score(&claim.clone()));
    }
}
