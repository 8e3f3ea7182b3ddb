//! Document-wide claim deduplication
//!
//! Claims collapse when subject identity, predicate and object identity all
//! match. The survivor is picked by a total order that does not depend on input
//! order, so the reduction is deterministic and idempotent.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use claimx_core::{Claim, ClaimEntity, ClaimObject, ExtractionMethod};

/// Identity of one claim side
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum EntityKey {
    Resolved(String),
    Unresolved { surface: String, guessed_type: String },
}

impl From<&ClaimEntity> for EntityKey {
    fn from(entity: &ClaimEntity) -> Self {
        match entity {
            ClaimEntity::Resolved { entity_id, .. } => Self::Resolved(entity_id.clone()),
            ClaimEntity::Unresolved {
                surface_form,
                guessed_type,
            } => Self::Unresolved {
                surface: surface_form.to_lowercase(),
                guessed_type: guessed_type.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum ObjectKey {
    Entity(EntityKey),
    Literal { value: String, literal_type: &'static str },
}

impl From<&ClaimObject> for ObjectKey {
    fn from(object: &ClaimObject) -> Self {
        match object {
            ClaimObject::Entity { entity } => Self::Entity(entity.into()),
            ClaimObject::Literal {
                value,
                literal_type,
            } => Self::Literal {
                value: value.clone(),
                literal_type: literal_type.as_str(),
            },
        }
    }
}

/// Identity key of a claim
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClaimKey {
    subject: EntityKey,
    predicate: String,
    object: ObjectKey,
}

impl From<&Claim> for ClaimKey {
    fn from(claim: &Claim) -> Self {
        Self {
            subject: (&claim.subject).into(),
            predicate: claim.predicate.clone(),
            object: (&claim.object).into(),
        }
    }
}

/// Result of a deduplication pass
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    pub claims: Vec<Claim>,
    pub duplicates_removed: usize,
}

/// Collapses semantically equivalent claims
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimDeduplicator;

impl ClaimDeduplicator {
    pub fn new() -> Self {
        Self
    }

    /// Keep one claim per identity key.
    ///
    /// Output is ordered by evidence position, then key.
    pub fn deduplicate(&self, claims: Vec<Claim>) -> DedupOutcome {
        let total = claims.len();
        let mut best: BTreeMap<ClaimKey, Claim> = BTreeMap::new();

        for claim in claims {
            let key = ClaimKey::from(&claim);
            match best.get_mut(&key) {
                Some(current) => {
                    if preference(&claim, current) == Ordering::Less {
                        *current = claim;
                    }
                }
                None => {
                    best.insert(key, claim);
                }
            }
        }

        let mut kept: Vec<(ClaimKey, Claim)> = best.into_iter().collect();
        kept.sort_by(|(ka, a), (kb, b)| {
            a.evidence
                .start_offset
                .cmp(&b.evidence.start_offset)
                .then_with(|| a.evidence.end_offset.cmp(&b.evidence.end_offset))
                .then_with(|| ka.cmp(kb))
        });

        let claims: Vec<Claim> = kept.into_iter().map(|(_, c)| c).collect();
        let duplicates_removed = total - claims.len();
        if duplicates_removed > 0 {
            tracing::debug!(duplicates_removed, kept = claims.len(), "Deduplicated claims");
        }

        DedupOutcome {
            claims,
            duplicates_removed,
        }
    }
}

fn method_rank(method: ExtractionMethod) -> u8 {
    match method {
        ExtractionMethod::PatternRule => 0,
        ExtractionMethod::DependencyParsing => 1,
    }
}

/// `Less` means `a` is preferred over `b`
fn preference(a: &Claim, b: &Claim) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| {
            let rank_a = method_rank(a.evidence.extraction_method);
            rank_a.cmp(&method_rank(b.evidence.extraction_method))
        })
        .then_with(|| a.evidence.start_offset.cmp(&b.evidence.start_offset))
        .then_with(|| a.evidence.end_offset.cmp(&b.evidence.end_offset))
        .then_with(|| a.evidence.pattern_id.cmp(&b.evidence.pattern_id))
        .then_with(|| a.evidence.sentence_text.cmp(&b.evidence.sentence_text))
}

// ============================================================================
// Tests
// ============================================================================
