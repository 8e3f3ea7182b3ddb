//! Claim conversion
//!
//! Converts scored candidates into final [`Claim`] records.

use claimx_core::{
    Claim, ClaimEntity, ClaimEvidence, ClaimExtractionContext, ClaimObject, ExtractedClaim,
    LinkedEntity, LiteralType, TextSpan,
};

use crate::span::guess_entity_type;

// ============================================================================
// Conversion utilities
// ============================================================================

/// Build the claim entity for one side of a candidate
pub fn to_claim_entity(
    span: &TextSpan,
    linked: Option<&LinkedEntity>,
    declared_type: Option<&str>,
) -> ClaimEntity {
    if let Some(entity) = linked {
        if let Some(resolved) = &entity.resolved_entity {
            return ClaimEntity::Resolved {
                entity_id: resolved.id.clone(),
                surface_form: entity.mention.value.clone(),
                entity_type: resolved.entity_type.clone(),
                link_confidence: entity.confidence.clamp(0.0, 1.0),
            };
        }
    }

    // An unresolved mention still gives a cleaner surface than the raw span
    let surface_form = linked
        .map(|e| e.mention.value.clone())
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| span.text.clone());

    let guessed_type = declared_type
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| guess_entity_type(&surface_form).to_string());

    ClaimEntity::Unresolved {
        surface_form,
        guessed_type,
    }
}

/// Build the evidence record; offsets cover both spans in document coordinates
pub fn to_evidence(candidate: &ExtractedClaim) -> ClaimEvidence {
    let sentence = &candidate.sentence;
    let (subject_start, subject_end) = candidate.subject_span.to_absolute(sentence.start_offset);
    let (object_start, object_end) = candidate.object_span.to_absolute(sentence.start_offset);

    ClaimEvidence {
        sentence_text: sentence.text.clone(),
        start_offset: subject_start.min(object_start),
        end_offset: subject_end.max(object_end),
        extraction_method: candidate.method,
        pattern_id: candidate.pattern_id.clone(),
    }
}

/// Convert a scored candidate into a final claim
pub fn to_claim(
    candidate: &ExtractedClaim,
    confidence: f32,
    context: &ClaimExtractionContext,
) -> Claim {
    let subject = to_claim_entity(
        &candidate.subject_span,
        candidate.subject_entity.as_ref(),
        candidate.subject_type.as_deref(),
    );

    let object = match &candidate.literal_value {
        Some(value) => ClaimObject::Literal {
            value: value.clone(),
            literal_type: candidate.literal_type.unwrap_or(LiteralType::String),
        },
        None => ClaimObject::Entity {
            entity: to_claim_entity(
                &candidate.object_span,
                candidate.object_entity.as_ref(),
                candidate.object_type.as_deref(),
            ),
        },
    };

    Claim {
        subject,
        predicate: candidate.predicate.clone(),
        object,
        confidence,
        document_id: context.document_id,
        project_id: context.project_id,
        evidence: to_evidence(candidate),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use claimx_core::{ExtractionMethod, ParsedSentence};
    use std::sync::Arc;
    use uuid::Uuid;

    fn candidate() -> ExtractedClaim {
        let sentence = Arc::new(ParsedSentence::new(
            2,
            "The GET /users endpoint accepts a limit parameter.",
            200,
        ));
        ExtractedClaim {
            subject_span: sentence.span(4, 23),
            object_span: sentence.span(34, 49),
            predicate: "ACCEPTS".to_string(),
            method: ExtractionMethod::PatternRule,
            pattern_id: Some("accepts".to_string()),
            raw_confidence: 0.8,
            sentence,
            subject_entity: Some(
                LinkedEntity::new("GET /users", 204, 214)
                    .resolved_to("ep-users", "Endpoint")
                    .with_confidence(0.9),
            ),
            object_entity: None,
            literal_value: None,
            literal_type: None,
            subject_type: Some("Endpoint".to_string()),
            object_type: None,
        }
    }

    #[test]
    fn test_resolved_subject() {
        let ctx = ClaimExtractionContext::new(Uuid::new_v4(), Uuid::new_v4());
        let claim = to_claim(&candidate(), 0.89, &ctx);

        match &claim.subject {
            ClaimEntity::Resolved {
                entity_id,
                surface_form,
                link_confidence,
                ..
            } => {
                assert_eq!(entity_id, "ep-users");
                assert_eq!(surface_form, "GET /users");
                assert_eq!(*link_confidence, 0.9);
            }
            other => panic!("expected resolved subject, got {:?}", other),
        }
        assert_eq!(claim.document_id, ctx.document_id);
        assert_eq!(claim.confidence, 0.89);
    }

    #[test]
    fn test_unresolved_object_guesses_type() {
        let ctx = ClaimExtractionContext::new(Uuid::new_v4(), Uuid::new_v4());
        let claim = to_claim(&candidate(), 0.8, &ctx);

        assert_eq!(
            claim.object,
            ClaimObject::Entity {
                entity: ClaimEntity::Unresolved {
                    surface_form: "limit parameter".to_string(),
                    guessed_type: "Parameter".to_string(),
                }
            }
        );
    }

    #[test]
    fn test_declared_type_wins_over_heuristic() {
        let span = TextSpan::new("cursor", 0, 6);
        let entity = to_claim_entity(&span, None, Some("Field"));
        assert_eq!(
            entity,
            ClaimEntity::Unresolved {
                surface_form: "cursor".to_string(),
                guessed_type: "Field".to_string(),
            }
        );
    }

    #[test]
    fn test_literal_object() {
        let mut c = candidate();
        c.literal_value = Some("10".to_string());
        c.literal_type = Some(LiteralType::Int);
        let ctx = ClaimExtractionContext::new(Uuid::new_v4(), Uuid::new_v4());
        let claim = to_claim(&c, 0.85, &ctx);
        assert_eq!(
            claim.object,
            ClaimObject::Literal {
                value: "10".to_string(),
                literal_type: LiteralType::Int,
            }
        );
    }

    #[test]
    fn test_evidence_offsets_are_absolute() {
        let evidence = to_evidence(&candidate());
        assert_eq!(evidence.start_offset, 204);
        assert_eq!(evidence.end_offset, 249);
        assert_eq!(evidence.extraction_method, ExtractionMethod::PatternRule);
        assert_eq!(evidence.pattern_id.as_deref(), Some("accepts"));
        assert!(evidence.sentence_text.starts_with("The GET"));
    }
}
