//! Predicate vocabulary
//!
//! Well-known relation types plus the verb lexicon used by
//! dependency-based extraction. Patterns may bind any predicate string;
//! this enum only covers the ones the pipeline itself produces.

use serde::{Deserialize, Serialize};

/// Relation types produced by the extraction pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Predicate {
    // Interface relations
    Accepts,  // Endpoint -> Parameter
    Returns,  // Endpoint -> Response
    Requires, // Operation -> Credential/Parameter
    Contains, // Schema -> Field

    // Data flow
    Produces,
    Consumes,

    // Structure
    HasProperty,
    Implements,
    Extends,
    DependsOn,

    // Lifecycle and values
    IsDeprecated,
    HasDefault,

    // Generic
    RelatedTo,
}

impl Predicate {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepts => "ACCEPTS",
            Self::Returns => "RETURNS",
            Self::Requires => "REQUIRES",
            Self::Contains => "CONTAINS",
            Self::Produces => "PRODUCES",
            Self::Consumes => "CONSUMES",
            Self::HasProperty => "HAS_PROPERTY",
            Self::Implements => "IMPLEMENTS",
            Self::Extends => "EXTENDS",
            Self::DependsOn => "DEPENDS_ON",
            Self::IsDeprecated => "IS_DEPRECATED",
            Self::HasDefault => "HAS_DEFAULT",
            Self::RelatedTo => "RELATED_TO",
        }
    }

    /// Parse a predicate name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ACCEPTS" => Some(Self::Accepts),
            "RETURNS" => Some(Self::Returns),
            "REQUIRES" => Some(Self::Requires),
            "CONTAINS" => Some(Self::Contains),
            "PRODUCES" => Some(Self::Produces),
            "CONSUMES" => Some(Self::Consumes),
            "HAS_PROPERTY" => Some(Self::HasProperty),
            "IMPLEMENTS" => Some(Self::Implements),
            "EXTENDS" => Some(Self::Extends),
            "DEPENDS_ON" => Some(Self::DependsOn),
            "IS_DEPRECATED" => Some(Self::IsDeprecated),
            "HAS_DEFAULT" => Some(Self::HasDefault),
            "RELATED_TO" => Some(Self::RelatedTo),
            _ => None,
        }
    }

    /// Map a verb lemma to a predicate. Unknown lemmas map to `RelatedTo`.
    pub fn from_verb_lemma(lemma: &str) -> Self {
        match lemma.to_lowercase().as_str() {
            "accept" => Self::Accepts,
            "return" => Self::Returns,
            "require" => Self::Requires,
            "contain" => Self::Contains,
            "produce" => Self::Produces,
            "consume" => Self::Consumes,
            "have" => Self::HasProperty,
            "implement" => Self::Implements,
            "extend" => Self::Extends,
            "depend" => Self::DependsOn,
            "deprecate" => Self::IsDeprecated,
            _ => Self::RelatedTo,
        }
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_display() {
        assert_eq!(Predicate::DependsOn.to_string(), "DEPENDS_ON");
        assert_eq!(Predicate::Accepts.as_str(), "ACCEPTS");
    }

    #[test]
    fn test_predicate_parse() {
        assert_eq!(Predicate::parse("is_deprecated"), Some(Predicate::IsDeprecated));
        assert_eq!(Predicate::parse("unknown"), None);
    }

    #[test]
    fn test_verb_lexicon() {
        assert_eq!(Predicate::from_verb_lemma("Require"), Predicate::Requires);
        assert_eq!(Predicate::from_verb_lemma("depend"), Predicate::DependsOn);
        assert_eq!(Predicate::from_verb_lemma("frobnicate"), Predicate::RelatedTo);
    }
}
