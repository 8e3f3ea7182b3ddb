//! Pattern compilation and the pattern table store
//!
//! Patterns are compiled once at load time. A malformed pattern is rejected
//! here with a [`CompileError`]; matching never fails afterwards.
//!
//! The active table is an immutable [`PatternTable`] behind an `Arc`. Reloading
//! builds a new table and swaps the pointer, so extraction runs keep using the
//! snapshot they started with.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use claimx_core::{DependencyShape, ExtractionPattern, PatternKind};

const SUBJECT_PLACEHOLDER: &str = "{SUBJECT}";
const OBJECT_PLACEHOLDER: &str = "{OBJECT}";

/// A trailing placeholder ends at sentence punctuation or end of text
const TRAILING_TERMINATOR: &str = r"(?:[.,;:!?](?:\s|$)|\s*$)";

// ============================================================================
// Compilation
// ============================================================================

/// Reasons a pattern can be rejected at load time
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("payload does not match kind '{0}'")]
    PayloadMismatch(PatternKind),

    #[error("regex is missing named group '{0}'")]
    MissingGroup(&'static str),

    #[error("bad template: {0}")]
    Template(String),

    #[error("dependency shape lists no verb lemmas")]
    EmptyShape,

    #[error("base confidence {0} is outside [0, 1]")]
    Confidence(f32),

    #[error("predicate is empty")]
    EmptyPredicate,

    #[error("duplicate pattern id")]
    DuplicateId,
}

/// The compiled form of a pattern's payload
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Regex or template, run against the sentence text
    Text(Regex),
    /// Matched against the dependency tree
    Shape(DependencyShape),
}

/// A validated pattern ready for matching
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pattern: ExtractionPattern,
    matcher: Matcher,
}

impl CompiledPattern {
    /// Validate and compile a pattern
    pub fn compile(pattern: ExtractionPattern) -> Result<Self, CompileError> {
        if !pattern.payload_matches_kind() {
            return Err(CompileError::PayloadMismatch(pattern.kind));
        }
        if !pattern.base_confidence.is_finite() || !(0.0..=1.0).contains(&pattern.base_confidence)
        {
            return Err(CompileError::Confidence(pattern.base_confidence));
        }
        if pattern.predicate.trim().is_empty() {
            return Err(CompileError::EmptyPredicate);
        }

        let matcher = match (&pattern.regex, &pattern.template, &pattern.dependency_shape) {
            (Some(source), None, None) => Matcher::Text(compile_regex(source)?),
            (None, Some(template), None) => {
                Matcher::Text(compile_regex(&template_to_regex(template)?)?)
            }
            (None, None, Some(shape)) => {
                if shape.verb_lemmas.iter().all(|l| l.trim().is_empty()) {
                    return Err(CompileError::EmptyShape);
                }
                let mut shape = shape.clone();
                shape.verb_lemmas = shape.verb_lemmas.iter().map(|l| l.to_lowercase()).collect();
                Matcher::Shape(shape)
            }
            _ => return Err(CompileError::PayloadMismatch(pattern.kind)),
        };

        Ok(Self { pattern, matcher })
    }

    pub fn pattern(&self) -> &ExtractionPattern {
        &self.pattern
    }

    pub fn id(&self) -> &str {
        &self.pattern.id
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }
}

/// Compile a regex and check it exposes both capture groups
fn compile_regex(source: &str) -> Result<Regex, CompileError> {
    let regex = Regex::new(source)?;
    let names: HashSet<&str> = regex.capture_names().flatten().collect();
    if !names.contains("subject") {
        return Err(CompileError::MissingGroup("subject"));
    }
    if !names.contains("object") {
        return Err(CompileError::MissingGroup("object"));
    }
    Ok(regex)
}

/// Convert a `{SUBJECT}` / `{OBJECT}` template into an equivalent regex.
///
/// Literal text is escaped, whitespace runs match `\s+`, both groups are
/// non-greedy and the whole expression is case-insensitive.
pub fn template_to_regex(template: &str) -> Result<String, CompileError> {
    let subject_count = template.matches(SUBJECT_PLACEHOLDER).count();
    let object_count = template.matches(OBJECT_PLACEHOLDER).count();
    if subject_count != 1 || object_count != 1 {
        return Err(CompileError::Template(format!(
            "expected exactly one {} and one {}, found {} and {}",
            SUBJECT_PLACEHOLDER, OBJECT_PLACEHOLDER, subject_count, object_count
        )));
    }

    let subject_at = template.find(SUBJECT_PLACEHOLDER).unwrap_or_default();
    let object_at = template.find(OBJECT_PLACEHOLDER).unwrap_or_default();

    let subject = (subject_at, SUBJECT_PLACEHOLDER.len(), "subject");
    let object = (object_at, OBJECT_PLACEHOLDER.len(), "object");
    let ((first, first_len, first_group), (second, second_len, second_group)) =
        if subject_at < object_at {
            (subject, object)
        } else {
            (object, subject)
        };

    let prefix = &template[..first];
    let middle = &template[first + first_len..second];
    let suffix = &template[second + second_len..];

    if middle.trim().is_empty() {
        return Err(CompileError::Template(
            "placeholders must be separated by literal text".to_string(),
        ));
    }

    let mut regex = String::from("(?i)");
    regex.push_str(&literal_to_regex(prefix.trim_start()));
    regex.push_str(&format!("(?P<{}>.+?)", first_group));
    regex.push_str(&literal_to_regex(middle));
    regex.push_str(&format!("(?P<{}>.+?)", second_group));
    if suffix.trim().is_empty() {
        regex.push_str(TRAILING_TERMINATOR);
    } else {
        regex.push_str(&literal_to_regex(suffix.trim_end()));
    }
    Ok(regex)
}

/// Escape literal template text, turning whitespace runs into `\s+`
fn literal_to_regex(literal: &str) -> String {
    let mut out = String::new();
    let mut word = String::new();
    let mut in_space = false;

    for c in literal.chars() {
        if c.is_whitespace() {
            if !word.is_empty() {
                out.push_str(&regex::escape(&word));
                word.clear();
            }
            if !in_space {
                out.push_str(r"\s+");
                in_space = true;
            }
        } else {
            word.push(c);
            in_space = false;
        }
    }
    if !word.is_empty() {
        out.push_str(&regex::escape(&word));
    }
    out
}

// ============================================================================
// Pattern Table
// ============================================================================

/// A pattern that failed to load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternFailure {
    pub pattern_id: String,
    pub error: String,
}

/// Outcome of loading a batch of patterns
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternLoadReport {
    pub generation: u64,
    pub loaded: usize,
    pub rejected: Vec<PatternFailure>,
}

impl PatternLoadReport {
    /// True when every pattern compiled
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Summary of the active pattern table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternTableStats {
    pub generation: u64,
    pub loaded_at: DateTime<Utc>,
    pub total: usize,
    pub enabled: usize,
    pub regex: usize,
    pub template: usize,
    pub dependency_shape: usize,
    /// Ids of patterns rejected by the load that built this table
    pub rejected: Vec<String>,
}

/// Immutable, priority-ordered set of compiled patterns
#[derive(Debug, Clone)]
pub struct PatternTable {
    patterns: Vec<CompiledPattern>,
    generation: u64,
    loaded_at: DateTime<Utc>,
    rejected: Vec<PatternFailure>,
}

impl PatternTable {
    /// A table with no patterns
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            generation: 0,
            loaded_at: Utc::now(),
            rejected: Vec::new(),
        }
    }

    /// Compile a batch of patterns. Invalid ones are reported and skipped.
    pub fn build(patterns: Vec<ExtractionPattern>, generation: u64) -> (Self, PatternLoadReport) {
        let mut compiled = Vec::with_capacity(patterns.len());
        let mut rejected = Vec::new();
        let mut seen = HashSet::new();

        for pattern in patterns {
            let id = pattern.id.clone();
            let result = if seen.contains(&id) {
                Err(CompileError::DuplicateId)
            } else {
                CompiledPattern::compile(pattern)
            };

            match result {
                Ok(p) => {
                    seen.insert(id);
                    compiled.push(p);
                }
                Err(e) => {
                    tracing::warn!(pattern_id = %id, error = %e, "Rejected extraction pattern");
                    rejected.push(PatternFailure {
                        pattern_id: id,
                        error: e.to_string(),
                    });
                }
            }
        }

        sort_by_priority(&mut compiled);

        let report = PatternLoadReport {
            generation,
            loaded: compiled.len(),
            rejected: rejected.clone(),
        };

        let table = Self {
            patterns: compiled,
            generation,
            loaded_at: Utc::now(),
            rejected,
        };

        (table, report)
    }

    /// Derive a table for one run: `overrides` replace patterns with the same id
    /// and supplement the rest
    pub fn with_overrides(&self, overrides: Vec<CompiledPattern>) -> Self {
        let override_ids: HashSet<&str> = overrides.iter().map(|p| p.id()).collect();
        let mut patterns: Vec<CompiledPattern> = self
            .patterns
            .iter()
            .filter(|p| !override_ids.contains(p.id()))
            .cloned()
            .collect();
        patterns.extend(overrides);
        sort_by_priority(&mut patterns);

        Self {
            patterns,
            generation: self.generation,
            loaded_at: self.loaded_at,
            rejected: self.rejected.clone(),
        }
    }

    /// Enabled patterns in descending priority order
    pub fn enabled(&self) -> impl Iterator<Item = &CompiledPattern> {
        self.patterns.iter().filter(|p| p.pattern.enabled)
    }

    pub fn get(&self, id: &str) -> Option<&CompiledPattern> {
        self.patterns.iter().find(|p| p.id() == id)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn stats(&self) -> PatternTableStats {
        let count_kind = |kind: PatternKind| {
            self.patterns
                .iter()
                .filter(|p| p.pattern.kind == kind)
                .count()
        };

        PatternTableStats {
            generation: self.generation,
            loaded_at: self.loaded_at,
            total: self.patterns.len(),
            enabled: self.enabled().count(),
            regex: count_kind(PatternKind::Regex),
            template: count_kind(PatternKind::Template),
            dependency_shape: count_kind(PatternKind::DependencyShape),
            rejected: self.rejected.iter().map(|f| f.pattern_id.clone()).collect(),
        }
    }
}

impl Default for PatternTable {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descending priority; ties broken by id so ordering is deterministic
fn sort_by_priority(patterns: &mut [CompiledPattern]) {
    patterns.sort_by(|a, b| {
        b.pattern
            .priority
            .cmp(&a.pattern.priority)
            .then_with(|| a.pattern.id.cmp(&b.pattern.id))
    });
}

// ============================================================================
// Pattern Store
// ============================================================================

/// Holder of the active pattern table with atomic reload
#[derive(Debug)]
pub struct PatternStore {
    current: RwLock<Arc<PatternTable>>,
    generation: AtomicU64,
}

impl PatternStore {
    /// Create a store from a prebuilt table
    pub fn new(table: PatternTable) -> Self {
        let generation = table.generation();
        Self {
            current: RwLock::new(Arc::new(table)),
            generation: AtomicU64::new(generation),
        }
    }

    /// Compile patterns into the first table generation
    pub fn load(patterns: Vec<ExtractionPattern>) -> (Self, PatternLoadReport) {
        let (table, report) = PatternTable::build(patterns, 1);
        (Self::new(table), report)
    }

    /// Current snapshot. The returned table never changes.
    pub async fn snapshot(&self) -> Arc<PatternTable> {
        Arc::clone(&*self.current.read().await)
    }

    /// Replace the active table with a freshly compiled one.
    ///
    /// Compilation happens outside the lock. When reloads overlap, the one
    /// with the highest generation wins regardless of which finishes last.
    pub async fn reload(&self, patterns: Vec<ExtractionPattern>) -> PatternLoadReport {
        let generation = self.next_generation();
        let (table, report) = PatternTable::build(patterns, generation);

        if self.install(table).await {
            tracing::info!(
                generation,
                loaded = report.loaded,
                rejected = report.rejected.len(),
                "Pattern table reloaded"
            );
        } else {
            tracing::info!(generation, "Pattern reload superseded by a newer generation");
        }
        report
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Swap in `table` unless a newer generation is already active
    async fn install(&self, table: PatternTable) -> bool {
        let mut current = self.current.write().await;
        if table.generation() < current.generation() {
            return false;
        }
        *current = Arc::new(table);
        true
    }

    pub async fn stats(&self) -> PatternTableStats {
        self.snapshot().await.stats()
    }
}

impl Default for PatternStore {
    fn default() -> Self {
        Self::new(PatternTable::empty())
    }
}

// ============================================================================
// Tests
// ============================================================================
