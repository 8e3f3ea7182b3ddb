//! Built-in pattern set for API documentation
//!
//! Loaded when `patterns.include_builtin` is set. Pattern files loaded on top
//! replace built-ins with the same id.

use std::collections::HashSet;

use claimx_core::{
    ConfigError, DependencyShape, ExtractionPattern, LiteralType, PatternFile,
    PatternSourceConfig, Predicate,
};

fn verb_template(id: &str, verb: &str, predicate: Predicate, confidence: f32) -> ExtractionPattern {
    ExtractionPattern::template(id, format!("{{SUBJECT}} {} {{OBJECT}}", verb), predicate.as_str())
        .with_confidence(confidence)
        .with_priority(50)
        .with_tags(vec!["builtin", "api"])
}

/// Default API-documentation patterns
pub fn builtin_patterns() -> Vec<ExtractionPattern> {
    vec![
        verb_template("builtin.accepts", "accepts", Predicate::Accepts, 0.8)
            .with_types("Endpoint", "Parameter"),
        verb_template("builtin.returns", "returns", Predicate::Returns, 0.8),
        verb_template("builtin.requires", "requires", Predicate::Requires, 0.8),
        verb_template("builtin.depends_on", "depends on", Predicate::DependsOn, 0.8)
            .with_types("Service", "Service"),
        verb_template("builtin.extends", "extends", Predicate::Extends, 0.8),
        verb_template("builtin.implements", "implements", Predicate::Implements, 0.8),
        verb_template("builtin.contains", "contains", Predicate::Contains, 0.75),
        verb_template("builtin.produces", "produces", Predicate::Produces, 0.75),
        verb_template("builtin.consumes", "consumes", Predicate::Consumes, 0.75),
        // "X is deprecated in favor of Y"
        ExtractionPattern::template(
            "builtin.deprecated_for",
            "{SUBJECT} is deprecated in favor of {OBJECT}",
            Predicate::IsDeprecated.as_str(),
        )
        .with_confidence(0.85)
        .with_priority(60)
        .with_tags(vec!["builtin", "lifecycle"]),
        // Literal defaults, most specific type first
        ExtractionPattern::regex(
            "builtin.default_int",
            r"(?i)(?P<subject>[\w./{}\- ]+?)\s+defaults?\s+to\s+(?P<object>[-+]?\d[\d_]*)\b(?:[.,;]|\s|$)",
            Predicate::HasDefault.as_str(),
        )
        .literal(LiteralType::Int)
        .with_confidence(0.85)
        .with_priority(70)
        .with_tags(vec!["builtin", "literal"]),
        ExtractionPattern::regex(
            "builtin.default_bool",
            r"(?i)(?P<subject>[\w./{}\- ]+?)\s+defaults?\s+to\s+(?P<object>true|false)\b",
            Predicate::HasDefault.as_str(),
        )
        .literal(LiteralType::Bool)
        .with_confidence(0.85)
        .with_priority(70)
        .with_tags(vec!["builtin", "literal"]),
        ExtractionPattern::regex(
            "builtin.default_string",
            r#"(?i)(?P<subject>[\w./{}\- ]+?)\s+defaults?\s+to\s+(?P<object>"[^"]*"|'[^']*'|`[^`]*`)"#,
            Predicate::HasDefault.as_str(),
        )
        .literal(LiteralType::String)
        .with_confidence(0.8)
        .with_priority(65)
        .with_tags(vec!["builtin", "literal"]),
        ExtractionPattern::dependency_shape(
            "builtin.returns_shape",
            DependencyShape::for_verbs(["return", "yield"]),
            Predicate::Returns.as_str(),
        )
        .with_confidence(0.75)
        .with_priority(10)
        .with_tags(vec!["builtin", "syntax"]),
    ]
}

/// Layer `overrides` on top of `base`; an override replaces the base pattern
/// with the same id, everything else is appended in order.
pub fn layer_patterns(
    base: Vec<ExtractionPattern>,
    overrides: Vec<ExtractionPattern>,
) -> Vec<ExtractionPattern> {
    let replaced: HashSet<&str> = overrides.iter().map(|p| p.id.as_str()).collect();
    let mut patterns: Vec<ExtractionPattern> = base
        .into_iter()
        .filter(|p| !replaced.contains(p.id.as_str()))
        .collect();
    patterns.extend(overrides);
    patterns
}

/// Resolve the configured pattern sources into one list
pub fn configured_patterns(
    source: &PatternSourceConfig,
) -> Result<Vec<ExtractionPattern>, ConfigError> {
    let base = if source.include_builtin {
        builtin_patterns()
    } else {
        Vec::new()
    };

    let file = match &source.path {
        Some(path) => {
            let file = PatternFile::from_file(path)?;
            tracing::info!(
                path = %path.display(),
                patterns = file.patterns.len(),
                "Pattern file loaded"
            );
            file.patterns
        }
        None => Vec::new(),
    };

    Ok(layer_patterns(base, file))
}
