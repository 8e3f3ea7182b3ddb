//! Entity resolution for extracted spans
//!
//! Spans carry sentence-relative offsets while linked entities carry absolute
//! document offsets. A span is translated with the sentence start before being
//! compared. Candidates are ranked in three tiers:
//!
//! 1. mentions containing the span, tightest first
//! 2. mentions inside the span, largest first
//! 3. partial overlaps covering at least half the span, largest overlap first
//!
//! Remaining ties go to the earliest mention.

use claimx_core::{LinkedEntity, ParsedSentence, TextSpan};

/// Lower rank wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Rank {
    tier: u8,
    /// Tier-dependent size key, smaller is better
    size: isize,
    start: usize,
}

/// Find the linked entity that best covers `span`
pub fn resolve_entity<'a>(
    span: &TextSpan,
    sentence: &ParsedSentence,
    entities: &'a [LinkedEntity],
) -> Option<&'a LinkedEntity> {
    if span.is_empty() {
        return None;
    }
    let (start, end) = span.to_absolute(sentence.start_offset);

    entities
        .iter()
        .filter_map(|entity| rank(entity, start, end).map(|r| (r, entity)))
        .min_by_key(|(r, _)| *r)
        .map(|(_, entity)| entity)
}

fn rank(entity: &LinkedEntity, start: usize, end: usize) -> Option<Rank> {
    let m_start = entity.mention.start_offset;
    let m_end = entity.mention.end_offset;
    if m_end <= m_start {
        return None;
    }
    let m_len = (m_end - m_start) as isize;

    if m_start <= start && m_end >= end {
        return Some(Rank {
            tier: 0,
            size: m_len,
            start: m_start,
        });
    }

    if start <= m_start && m_end <= end {
        return Some(Rank {
            tier: 1,
            size: -m_len,
            start: m_start,
        });
    }

    let overlap = m_end.min(end).saturating_sub(m_start.max(start));
    if overlap > 0 && overlap * 2 >= end - start {
        return Some(Rank {
            tier: 2,
            size: -(overlap as isize),
            start: m_start,
        });
    }

    None
}
