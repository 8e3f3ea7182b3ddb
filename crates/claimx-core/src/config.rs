//! claimx Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with sensible defaults, plus loading of pattern definition files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::{ClaimExtractionContext, ExtractionPattern};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Defaults for per-run extraction contexts
    pub extraction: ExtractionDefaults,

    /// Confidence scoring weights
    pub scoring: ScoringConfig,

    /// Worker pool settings
    pub runtime: RuntimeConfig,

    /// Where patterns come from
    pub patterns: PatternSourceConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        // Extraction defaults
        if let Some(v) = env_value("CLAIMX_MIN_CONFIDENCE")? {
            self.extraction.min_confidence = v;
        }
        if let Some(v) = env_value("CLAIMX_MAX_CLAIMS_PER_SENTENCE")? {
            self.extraction.max_claims_per_sentence = v;
        }
        if let Some(v) = env_value("CLAIMX_USE_PATTERNS")? {
            self.extraction.use_patterns = v;
        }
        if let Some(v) = env_value("CLAIMX_USE_DEPENDENCY_EXTRACTION")? {
            self.extraction.use_dependency_extraction = v;
        }
        if let Some(v) = env_value("CLAIMX_DEDUPLICATE")? {
            self.extraction.deduplicate_claims = v;
        }

        // Runtime
        if let Some(v) = env_value("CLAIMX_MAX_CONCURRENCY")? {
            self.runtime.max_concurrency = v;
        }

        // Patterns
        if let Ok(path) = std::env::var("CLAIMX_PATTERN_FILE") {
            self.patterns.path = Some(PathBuf::from(path));
        }

        // Logging
        if let Ok(level) = std::env::var("CLAIMX_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(v) = env_value("CLAIMX_LOG_JSON")? {
            self.logging.json_format = v;
        }

        self.validate()?;
        Ok(self)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let min = self.extraction.min_confidence;
        if !(0.0..=1.0).contains(&min) {
            return Err(ConfigError::InvalidValue {
                key: "extraction.min_confidence".to_string(),
                value: min.to_string(),
            });
        }
        if self.extraction.max_claims_per_sentence == 0 {
            return Err(ConfigError::InvalidValue {
                key: "extraction.max_claims_per_sentence".to_string(),
                value: "0".to_string(),
            });
        }
        let dep = self.scoring.dependency_confidence;
        if !(0.0..=1.0).contains(&dep) {
            return Err(ConfigError::InvalidValue {
                key: "scoring.dependency_confidence".to_string(),
                value: dep.to_string(),
            });
        }
        Ok(())
    }
}

/// Parse an environment variable, if set
fn env_value<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}

/// Defaults applied to new extraction contexts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionDefaults {
    /// Minimum final confidence for a claim to be kept
    pub min_confidence: f32,

    /// Maximum candidates kept per sentence
    pub max_claims_per_sentence: usize,

    pub use_patterns: bool,
    pub use_dependency_extraction: bool,
    pub deduplicate_claims: bool,
}

impl Default for ExtractionDefaults {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            max_claims_per_sentence: 5,
            use_patterns: true,
            use_dependency_extraction: true,
            deduplicate_claims: true,
        }
    }
}

impl ExtractionDefaults {
    /// Build a context for a document from these defaults
    pub fn context_for(&self, document_id: Uuid, project_id: Uuid) -> ClaimExtractionContext {
        ClaimExtractionContext {
            document_id,
            project_id,
            min_confidence: self.min_confidence,
            use_patterns: self.use_patterns,
            use_dependency_extraction: self.use_dependency_extraction,
            deduplicate_claims: self.deduplicate_claims,
            predicate_filter: None,
            max_claims_per_sentence: self.max_claims_per_sentence,
            custom_patterns: None,
        }
    }
}

/// Confidence scoring weights
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Bonus per resolved side, multiplied by the link confidence
    pub entity_link_weight: f32,

    /// Cap on the total entity bonus
    pub max_entity_bonus: f32,

    /// Raw confidence assigned to dependency-parse claims
    pub dependency_confidence: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            entity_link_weight: 0.1,
            max_entity_bonus: 0.2,
            dependency_confidence: 0.7,
        }
    }
}

/// Worker pool settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Sentences processed concurrently (0 = number of available cores)
    pub max_concurrency: usize,
}

impl RuntimeConfig {
    /// Effective concurrency
    pub fn concurrency(&self) -> usize {
        if self.max_concurrency > 0 {
            self.max_concurrency
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

/// Pattern source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternSourceConfig {
    /// TOML file with a `[[patterns]]` array
    pub path: Option<PathBuf>,

    /// Load the built-in API documentation patterns as well
    pub include_builtin: bool,
}

impl Default for PatternSourceConfig {
    fn default() -> Self {
        Self {
            path: None,
            include_builtin: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// A pattern definition file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternFile {
    #[serde(default)]
    pub patterns: Vec<ExtractionPattern>,
}

impl PatternFile {
    /// Load patterns from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|message| ConfigError::ParseError { path, message })
    }

    /// Parse patterns from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
