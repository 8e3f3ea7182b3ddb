//! Declarative extraction patterns
//!
//! Patterns are loaded in bulk by a configuration loader and compiled once
//! by the extractor crate. They are immutable after loading.

use serde::{Deserialize, Serialize};

use crate::sentence::DepRelation;

/// Kind of extraction pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Raw regex with named `subject` / `object` groups
    Regex,
    /// Literal text with `{SUBJECT}` / `{OBJECT}` placeholders
    Template,
    /// Verb lemma + dependency relations matched against the parse tree
    DependencyShape,
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Regex => write!(f, "regex"),
            Self::Template => write!(f, "template"),
            Self::DependencyShape => write!(f, "dependency_shape"),
        }
    }
}

/// Type of a literal claim object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiteralType {
    String,
    Int,
    Float,
    Bool,
}

impl LiteralType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
        }
    }

    /// Normalize raw matched text into the canonical form of this type.
    ///
    /// Returns `None` when the text is not a valid value of the type.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match self {
            Self::String => Some(
                raw.trim_matches(|c| c == '"' || c == '\'' || c == '`')
                    .to_string(),
            ),
            Self::Int => raw
                .replace('_', "")
                .parse::<i64>()
                .ok()
                .map(|v| v.to_string()),
            Self::Float => raw.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v.to_string()),
            Self::Bool => match raw.to_lowercase().as_str() {
                "true" | "yes" | "on" | "enabled" => Some("true".to_string()),
                "false" | "no" | "off" | "disabled" => Some("false".to_string()),
                _ => None,
            },
        }
    }
}

impl std::str::FromStr for LiteralType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" | "str" | "text" => Ok(Self::String),
            "int" | "integer" => Ok(Self::Int),
            "float" | "number" | "double" => Ok(Self::Float),
            "bool" | "boolean" => Ok(Self::Bool),
            other => Err(format!("unknown literal type: {}", other)),
        }
    }
}

impl std::fmt::Display for LiteralType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_subject_relations() -> Vec<DepRelation> {
    vec![DepRelation::Nsubj, DepRelation::NsubjPass]
}

fn default_object_relations() -> Vec<DepRelation> {
    vec![DepRelation::Dobj]
}

/// Dependency-shape descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyShape {
    /// Root verb lemmas this shape applies to (lowercase)
    pub verb_lemmas: Vec<String>,

    #[serde(default = "default_subject_relations")]
    pub subject_relations: Vec<DepRelation>,

    #[serde(default = "default_object_relations")]
    pub object_relations: Vec<DepRelation>,
}

impl DependencyShape {
    pub fn for_verbs<I, S>(lemmas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            verb_lemmas: lemmas.into_iter().map(Into::into).collect(),
            subject_relations: default_subject_relations(),
            object_relations: default_object_relations(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A declarative extraction rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionPattern {
    pub id: String,

    #[serde(default)]
    pub name: String,

    pub kind: PatternKind,

    /// Populated when `kind` is `Regex`
    #[serde(default)]
    pub regex: Option<String>,

    /// Populated when `kind` is `Template`
    #[serde(default)]
    pub template: Option<String>,

    /// Populated when `kind` is `DependencyShape`
    #[serde(default)]
    pub dependency_shape: Option<DependencyShape>,

    pub predicate: String,

    #[serde(default)]
    pub subject_type: Option<String>,

    #[serde(default)]
    pub object_type: Option<String>,

    #[serde(default)]
    pub object_is_literal: bool,

    #[serde(default)]
    pub literal_type: Option<LiteralType>,

    pub base_confidence: f32,

    /// Higher priority patterns are matched and reported first
    #[serde(default)]
    pub priority: i32,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl ExtractionPattern {
    fn base(id: impl Into<String>, kind: PatternKind, predicate: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            regex: None,
            template: None,
            dependency_shape: None,
            predicate: predicate.into(),
            subject_type: None,
            object_type: None,
            object_is_literal: false,
            literal_type: None,
            base_confidence: 0.8,
            priority: 0,
            enabled: true,
            tags: Vec::new(),
        }
    }

    /// Create a template pattern
    pub fn template(
        id: impl Into<String>,
        template: impl Into<String>,
        predicate: impl Into<String>,
    ) -> Self {
        let mut pattern = Self::base(id, PatternKind::Template, predicate);
        pattern.template = Some(template.into());
        pattern
    }

    /// Create a regex pattern
    pub fn regex(
        id: impl Into<String>,
        regex: impl Into<String>,
        predicate: impl Into<String>,
    ) -> Self {
        let mut pattern = Self::base(id, PatternKind::Regex, predicate);
        pattern.regex = Some(regex.into());
        pattern
    }

    /// Create a dependency-shape pattern
    pub fn dependency_shape(
        id: impl Into<String>,
        shape: DependencyShape,
        predicate: impl Into<String>,
    ) -> Self {
        let mut pattern = Self::base(id, PatternKind::DependencyShape, predicate);
        pattern.dependency_shape = Some(shape);
        pattern
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set expected subject and object types
    pub fn with_types(mut self, subject: impl Into<String>, object: impl Into<String>) -> Self {
        self.subject_type = Some(subject.into());
        self.object_type = Some(object.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.base_confidence = confidence;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Mark the object as a literal of the given type
    pub fn literal(mut self, literal_type: LiteralType) -> Self {
        self.object_is_literal = true;
        self.literal_type = Some(literal_type);
        self
    }

    pub fn with_tags(mut self, tags: Vec<&str>) -> Self {
        self.tags = tags.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Exactly one payload is populated and it matches `kind`
    pub fn payload_matches_kind(&self) -> bool {
        let populated = (
            self.regex.is_some(),
            self.template.is_some(),
            self.dependency_shape.is_some(),
        );
        matches!(
            (self.kind, populated),
            (PatternKind::Regex, (true, false, false))
                | (PatternKind::Template, (false, true, false))
                | (PatternKind::DependencyShape, (false, false, true))
        )
    }
}
