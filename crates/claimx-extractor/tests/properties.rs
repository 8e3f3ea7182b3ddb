//! Property tests for the extraction pipeline

use std::sync::Arc;

use proptest::prelude::*;
use uuid::Uuid;

use claimx_core::{ClaimExtractionContext, ExtractionPattern, ExtractionResult};
use claimx_extractor::defaults::builtin_patterns;
use claimx_extractor::{ClaimDeduplicator, ClaimExtractionService, PatternStore, RuleBasedSegmenter};

const SUBJECTS: [&str; 5] = ["The client", "GET /users", "The auth service", "A token", "limit"];
const VERBS: [&str; 7] = [
    "accepts",
    "returns",
    "requires",
    "depends on",
    "contains",
    "mentions",
    "defaults to",
];
const OBJECTS: [&str; 6] = [
    "a limit parameter",
    "the cursor",
    "10",
    "true",
    "a token",
    "credentials",
];

fn document() -> impl Strategy<Value = String> {
    prop::collection::vec((0..SUBJECTS.len(), 0..VERBS.len(), 0..OBJECTS.len()), 1..8).prop_map(
        |parts| {
            parts
                .into_iter()
                .map(|(s, v, o)| format!("{} {} {}.", SUBJECTS[s], VERBS[v], OBJECTS[o]))
                .collect::<Vec<_>>()
                .join(" ")
        },
    )
}

fn service() -> ClaimExtractionService {
    let mut patterns = builtin_patterns();
    patterns.push(
        ExtractionPattern::template("weak.mentions", "{SUBJECT} mentions {OBJECT}", "RELATED_TO")
            .with_confidence(0.4),
    );
    let (store, _) = PatternStore::load(patterns);
    ClaimExtractionService::new(Arc::new(RuleBasedSegmenter::new()), store).with_concurrency(3)
}

fn context() -> ClaimExtractionContext {
    ClaimExtractionContext::new(Uuid::nil(), Uuid::nil())
}

fn run(svc: &ClaimExtractionService, text: &str, ctx: &ClaimExtractionContext) -> ExtractionResult {
    tokio_test::block_on(svc.extract_claims(text, &[], ctx)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn extraction_is_deterministic(text in document()) {
        let svc = service();
        let first = run(&svc, &text, &context());
        let second = run(&svc, &text, &context());
        prop_assert_eq!(first.claims, second.claims);
        prop_assert_eq!(first.stats, second.stats);
    }

    #[test]
    fn raising_threshold_never_adds_claims(
        text in document(),
        low in 0.0f32..1.0,
        delta in 0.0f32..1.0,
    ) {
        let high = (low + delta).min(1.0);
        let svc = service();
        let loose = run(&svc, &text, &context().with_min_confidence(low));
        let tight = run(&svc, &text, &context().with_min_confidence(high));
        prop_assert!(tight.claims.len() <= loose.claims.len());
    }

    #[test]
    fn per_sentence_cap_respected(text in document(), cap in 1usize..3) {
        let svc = service();
        let ctx = context()
            .with_max_claims_per_sentence(cap)
            .with_deduplication(false);
        let result = run(&svc, &text, &ctx);

        let sentences = RuleBasedSegmenter::new().segment(&text);
        for sentence in &sentences {
            let count = result
                .claims
                .iter()
                .filter(|c| {
                    c.evidence.start_offset >= sentence.start_offset
                        && c.evidence.start_offset < sentence.end_offset
                })
                .count();
            prop_assert!(count <= cap);
        }
    }

    #[test]
    fn deduplication_is_a_fixed_point(text in document()) {
        let svc = service();
        let result = run(&svc, &text, &context());
        let again = ClaimDeduplicator::new().deduplicate(result.claims.clone());
        prop_assert_eq!(again.duplicates_removed, 0);
        prop_assert_eq!(again.claims, result.claims);
    }

    #[test]
    fn predicate_filter_respected(text in document()) {
        let svc = service();
        let result = run(&svc, &text, &context().with_predicate_filter(["ACCEPTS"]));
        prop_assert!(result.claims.iter().all(|c| c.predicate == "ACCEPTS"));
    }
}
