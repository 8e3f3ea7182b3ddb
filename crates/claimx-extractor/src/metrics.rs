//! Quality Metrics module
//!
//! Precision, recall and F1 of extracted claims against a hand-labelled gold
//! set. Used to tune pattern tables and thresholds.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use claimx_core::Claim;

// ============================================================================
// Claim Metrics
// ============================================================================

/// Metrics for claim extraction evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimMetrics {
    /// True positives (predicted claims found in the gold set)
    pub true_positives: usize,
    /// False positives (predicted claims not in the gold set)
    pub false_positives: usize,
    /// False negatives (gold claims never predicted)
    pub false_negatives: usize,
    /// Total claims in gold standard
    pub gold_total: usize,
    /// Total claims predicted
    pub predicted_total: usize,
}

impl ClaimMetrics {
    /// Calculate precision (TP / (TP + FP))
    pub fn precision(&self) -> f32 {
        if self.true_positives + self.false_positives == 0 {
            0.0
        } else {
            self.true_positives as f32 / (self.true_positives + self.false_positives) as f32
        }
    }

    /// Calculate recall (TP / (TP + FN))
    pub fn recall(&self) -> f32 {
        if self.true_positives + self.false_negatives == 0 {
            0.0
        } else {
            self.true_positives as f32 / (self.true_positives + self.false_negatives) as f32
        }
    }

    /// Calculate F1 score (2 * P * R / (P + R))
    pub fn f1_score(&self) -> f32 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    fn add(&mut self, other: &ClaimMetrics) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
        self.gold_total += other.gold_total;
        self.predicted_total += other.predicted_total;
    }
}

// ============================================================================
// Gold Standard Types
// ============================================================================

/// A gold standard claim, compared by surface text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GoldClaim {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl GoldClaim {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    fn folded(&self) -> Self {
        Self {
            subject: self.subject.trim().to_lowercase(),
            predicate: self.predicate.trim().to_uppercase(),
            object: self.object.trim().to_lowercase(),
        }
    }
}

impl From<&Claim> for GoldClaim {
    fn from(claim: &Claim) -> Self {
        Self {
            subject: claim.subject.surface_form().to_string(),
            predicate: claim.predicate.clone(),
            object: claim.object.surface_form().to_string(),
        }
    }
}

// ============================================================================
// Evaluator
// ============================================================================

/// Evaluator for claim extraction quality
pub struct Evaluator {
    /// Strict matching (exact, case-sensitive surface text)
    strict: bool,
}

impl Evaluator {
    /// Create a new evaluator (case-insensitive matching)
    pub fn new() -> Self {
        Self { strict: false }
    }

    /// Enable strict matching
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    fn key(&self, claim: &GoldClaim) -> GoldClaim {
        if self.strict {
            claim.clone()
        } else {
            claim.folded()
        }
    }

    /// Evaluate predicted claims against the gold set
    pub fn evaluate(&self, predicted: &[Claim], gold: &[GoldClaim]) -> ClaimMetrics {
        let predicted_set: HashSet<GoldClaim> = predicted
            .iter()
            .map(|c| self.key(&GoldClaim::from(c)))
            .collect();
        let gold_set: HashSet<GoldClaim> = gold.iter().map(|g| self.key(g)).collect();

        let true_positives = predicted_set.intersection(&gold_set).count();

        ClaimMetrics {
            true_positives,
            false_positives: predicted_set.len() - true_positives,
            false_negatives: gold_set.len() - true_positives,
            gold_total: gold_set.len(),
            predicted_total: predicted_set.len(),
        }
    }

    /// Evaluate separately for each predicate seen in either set
    pub fn evaluate_by_predicate(
        &self,
        predicted: &[Claim],
        gold: &[GoldClaim],
    ) -> BTreeMap<String, ClaimMetrics> {
        let predicates: HashSet<String> = predicted
            .iter()
            .map(|c| self.key(&GoldClaim::from(c)).predicate)
            .chain(gold.iter().map(|g| self.key(g).predicate))
            .collect();

        predicates
            .into_iter()
            .map(|predicate| {
                let p: Vec<Claim> = predicted
                    .iter()
                    .filter(|c| self.key(&GoldClaim::from(*c)).predicate == predicate)
                    .cloned()
                    .collect();
                let g: Vec<GoldClaim> = gold
                    .iter()
                    .filter(|c| self.key(c).predicate == predicate)
                    .cloned()
                    .collect();
                let metrics = self.evaluate(&p, &g);
                (predicate, metrics)
            })
            .collect()
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Aggregate Metrics
// ============================================================================

/// Aggregate metrics for a batch of evaluated documents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub claim_metrics: ClaimMetrics,
    pub per_predicate: BTreeMap<String, ClaimMetrics>,
    pub num_documents: usize,
}

impl AggregateMetrics {
    /// Add one document's results
    pub fn add_document(
        &mut self,
        overall: &ClaimMetrics,
        by_predicate: &BTreeMap<String, ClaimMetrics>,
    ) {
        self.claim_metrics.add(overall);
        for (predicate, metrics) in by_predicate {
            self.per_predicate
                .entry(predicate.clone())
                .or_default()
                .add(metrics);
        }
        self.num_documents += 1;
    }

    /// Whether overall precision reaches `min_precision`
    pub fn meets_precision(&self, min_precision: f32) -> bool {
        self.claim_metrics.precision() >= min_precision
    }

    /// Print a summary report
    pub fn report(&self) -> String {
        let mut out = format!(
            "=== Claim Extraction Quality Report ===\n\n\
             Documents evaluated: {}\n\n\
             Overall:\n\
               Precision: {:.1}%\n\
               Recall:    {:.1}%\n\
               F1 Score:  {:.1}%\n\
               Gold: {} | Predicted: {} | TP: {} | FP: {} | FN: {}\n",
            self.num_documents,
            self.claim_metrics.precision() * 100.0,
            self.claim_metrics.recall() * 100.0,
            self.claim_metrics.f1_score() * 100.0,
            self.claim_metrics.gold_total,
            self.claim_metrics.predicted_total,
            self.claim_metrics.true_positives,
            self.claim_metrics.false_positives,
            self.claim_metrics.false_negatives,
        );

        if !self.per_predicate.is_empty() {
            out.push_str("\nBy predicate:\n");
            for (predicate, m) in &self.per_predicate {
                out.push_str(&format!(
                    "  {:<16} P {:>5.1}%  R {:>5.1}%  F1 {:>5.1}%\n",
                    predicate,
                    m.precision() * 100.0,
                    m.recall() * 100.0,
                    m.f1_score() * 100.0,
                ));
            }
        }
        out
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use claimx_core::{ClaimEntity, ClaimEvidence, ClaimObject, ExtractionMethod};
    use uuid::Uuid;

    fn create_claim(subject: &str, predicate: &str, object: &str) -> Claim {
        Claim {
            subject: ClaimEntity::Unresolved {
                surface_form: subject.to_string(),
                guessed_type: "Concept".to_string(),
            },
            predicate: predicate.to_string(),
            object: ClaimObject::Entity {
                entity: ClaimEntity::Unresolved {
                    surface_form: object.to_string(),
                    guessed_type: "Concept".to_string(),
                },
            },
            confidence: 0.8,
            document_id: Uuid::nil(),
            project_id: Uuid::nil(),
            evidence: ClaimEvidence {
                sentence_text: String::new(),
                start_offset: 0,
                end_offset: 0,
                extraction_method: ExtractionMethod::PatternRule,
                pattern_id: None,
            },
        }
    }

    #[test]
    fn test_claim_metrics_precision_recall() {
        let metrics = ClaimMetrics {
            true_positives: 8,
            false_positives: 2,
            false_negatives: 2,
            gold_total: 10,
            predicted_total: 10,
        };

        assert!((metrics.precision() - 0.8).abs() < 0.001);
        assert!((metrics.recall() - 0.8).abs() < 0.001);
        assert!((metrics.f1_score() - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_empty_metrics_are_zero() {
        let metrics = ClaimMetrics::default();
        assert_eq!(metrics.precision(), 0.0);
        assert_eq!(metrics.f1_score(), 0.0);
    }

    #[test]
    fn test_evaluate_case_insensitive() {
        let predicted = vec![
            create_claim("GET /users", "ACCEPTS", "Limit"),
            create_claim("GET /users", "RETURNS", "cursor"),
        ];
        let gold = vec![
            GoldClaim::new("get /users", "accepts", "limit"),
            GoldClaim::new("auth service", "REQUIRES", "credentials"),
        ];

        let metrics = Evaluator::new().evaluate(&predicted, &gold);
        assert_eq!(metrics.true_positives, 1);
        assert_eq!(metrics.false_positives, 1);
        assert_eq!(metrics.false_negatives, 1);
    }

    #[test]
    fn test_evaluate_strict() {
        let predicted = vec![create_claim("GET /users", "ACCEPTS", "Limit")];
        let gold = vec![GoldClaim::new("GET /users", "ACCEPTS", "limit")];

        let metrics = Evaluator::new().strict().evaluate(&predicted, &gold);
        assert_eq!(metrics.true_positives, 0);
    }

    #[test]
    fn test_aggregate_by_predicate() {
        let predicted = vec![
            create_claim("a", "ACCEPTS", "b"),
            create_claim("c", "RETURNS", "d"),
        ];
        let gold = vec![GoldClaim::new("a", "ACCEPTS", "b")];

        let evaluator = Evaluator::new();
        let overall = evaluator.evaluate(&predicted, &gold);
        let by_predicate = evaluator.evaluate_by_predicate(&predicted, &gold);
        assert_eq!(by_predicate["ACCEPTS"].true_positives, 1);
        assert_eq!(by_predicate["RETURNS"].false_positives, 1);

        let mut aggregate = AggregateMetrics::default();
        aggregate.add_document(&overall, &by_predicate);
        aggregate.add_document(&overall, &by_predicate);
        assert_eq!(aggregate.num_documents, 2);
        assert_eq!(aggregate.claim_metrics.true_positives, 2);
        assert!(aggregate.meets_precision(0.5));

        let report = aggregate.report();
        assert!(report.contains("Documents evaluated: 2"));
        assert!(report.contains("RETURNS"));
    }
}
