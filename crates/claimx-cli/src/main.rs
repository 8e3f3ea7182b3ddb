//! claimx CLI - Command-line interface
//!
//! Usage:
//!   claimx extract --input doc.json [--patterns file.toml] [--config claimx.toml]
//!   claimx patterns [--patterns file.toml] [--no-builtin]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use claimx_core::{AppConfig, LinkedEntity, LoggingConfig, ParsedSentence, SentenceParser};
use claimx_extractor::defaults::configured_patterns;
use claimx_extractor::{
    ClaimExtractionService, PatternLoadReport, PatternStore, PatternTableStats,
    PreParsedSentences, RuleBasedSegmenter,
};

#[derive(Parser)]
#[command(name = "claimx")]
#[command(about = "Claim extraction from technical documentation")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML); environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract claims from a document and print the result as JSON
    Extract {
        /// Document JSON with text, linked entities and optional parsed sentences
        #[arg(short, long)]
        input: PathBuf,

        /// Pattern file layered on top of the built-in patterns
        #[arg(short, long)]
        patterns: Option<PathBuf>,

        /// Skip the built-in patterns
        #[arg(long)]
        no_builtin: bool,

        /// Minimum confidence for emitted claims
        #[arg(long)]
        min_confidence: Option<f32>,

        /// Only emit these predicates (repeatable)
        #[arg(long = "predicate")]
        predicates: Vec<String>,

        /// Maximum claims kept per sentence
        #[arg(long)]
        max_per_sentence: Option<usize>,

        /// Disable pattern matching
        #[arg(long)]
        no_patterns: bool,

        /// Disable dependency-parse extraction
        #[arg(long)]
        no_dependency: bool,

        /// Keep duplicate claims
        #[arg(long)]
        no_dedup: bool,

        /// Compact JSON output
        #[arg(long)]
        compact: bool,
    },
    /// Validate pattern sources and print the load report
    Patterns {
        /// Pattern file layered on top of the built-in patterns
        #[arg(short, long)]
        patterns: Option<PathBuf>,

        /// Skip the built-in patterns
        #[arg(long)]
        no_builtin: bool,
    },
}

/// Document accepted by `claimx extract`
#[derive(Debug, Deserialize)]
struct DocumentInput {
    #[serde(default)]
    document_id: Option<Uuid>,

    #[serde(default)]
    project_id: Option<Uuid>,

    text: String,

    #[serde(default)]
    entities: Vec<LinkedEntity>,

    /// Sentences from an upstream parser; segmented locally when absent
    #[serde(default)]
    sentences: Option<Vec<ParsedSentence>>,
}

impl DocumentInput {
    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse document {}", path.display()))
    }

    fn parser(&mut self) -> Arc<dyn SentenceParser> {
        match self.sentences.take() {
            Some(sentences) => Arc::new(PreParsedSentences::new(sentences)),
            None => Arc::new(RuleBasedSegmenter::new()),
        }
    }
}

#[derive(Serialize)]
struct PatternsOutput {
    report: PatternLoadReport,
    stats: PatternTableStats,
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.as_str().into());

    // stdout carries the JSON result
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Extract {
            input,
            patterns,
            no_builtin,
            min_confidence,
            predicates,
            max_per_sentence,
            no_patterns,
            no_dependency,
            no_dedup,
            compact,
        } => {
            if let Some(path) = patterns {
                config.patterns.path = Some(path);
            }
            if no_builtin {
                config.patterns.include_builtin = false;
            }

            let mut doc = DocumentInput::from_file(&input)?;
            let pattern_list = configured_patterns(&config.patterns)?;
            let (service, report) =
                ClaimExtractionService::from_config(doc.parser(), &config, pattern_list);
            for failure in &report.rejected {
                tracing::warn!(
                    pattern_id = %failure.pattern_id,
                    error = %failure.error,
                    "Pattern rejected"
                );
            }

            let mut context = config.extraction.context_for(
                doc.document_id.unwrap_or_else(Uuid::new_v4),
                doc.project_id.unwrap_or_else(Uuid::new_v4),
            );
            if let Some(min) = min_confidence {
                context = context.with_min_confidence(min);
            }
            if let Some(max) = max_per_sentence {
                context = context.with_max_claims_per_sentence(max);
            }
            if !predicates.is_empty() {
                context = context.with_predicate_filter(predicates);
            }
            if no_patterns {
                context = context.with_patterns(false);
            }
            if no_dependency {
                context = context.with_dependency_extraction(false);
            }
            if no_dedup {
                context = context.with_deduplication(false);
            }

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, cancelling extraction");
                    on_interrupt.cancel();
                }
            });

            let result = service
                .extract_claims_with_cancellation(&doc.text, &doc.entities, &context, &cancel)
                .await?;

            let json = if compact {
                serde_json::to_string(&result)?
            } else {
                serde_json::to_string_pretty(&result)?
            };
            println!("{}", json);
        }
        Commands::Patterns {
            patterns,
            no_builtin,
        } => {
            if let Some(path) = patterns {
                config.patterns.path = Some(path);
            }
            if no_builtin {
                config.patterns.include_builtin = false;
            }

            let (store, report) = PatternStore::load(configured_patterns(&config.patterns)?);
            let output = PatternsOutput {
                report,
                stats: store.stats().await,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);

            if !output.report.is_clean() {
                anyhow::bail!("{} pattern(s) rejected", output.report.rejected.len());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_input_minimal() {
        let doc: DocumentInput =
            serde_json::from_str(r#"{"text": "The client accepts a token."}"#).unwrap();
        assert!(doc.document_id.is_none());
        assert!(doc.entities.is_empty());
        assert!(doc.sentences.is_none());
    }

    #[test]
    fn test_document_input_selects_parser() {
        let mut doc: DocumentInput =
            serde_json::from_str(r#"{"text": "Hi.", "sentences": []}"#).unwrap();
        assert_eq!(doc.parser().name(), "pre-parsed");

        let mut doc: DocumentInput = serde_json::from_str(r#"{"text": "Hi."}"#).unwrap();
        assert_eq!(doc.parser().name(), "rule-based");
    }

    #[test]
    fn test_cli_parses_extract_flags() {
        let cli = Cli::try_parse_from([
            "claimx",
            "extract",
            "--input",
            "doc.json",
            "--predicate",
            "ACCEPTS",
            "--predicate",
            "RETURNS",
            "--no-dedup",
        ])
        .unwrap();

        match cli.command {
            Commands::Extract {
                predicates,
                no_dedup,
                no_patterns,
                ..
            } => {
                assert_eq!(predicates, vec!["ACCEPTS", "RETURNS"]);
                assert!(no_dedup);
                assert!(!no_patterns);
            }
            Commands::Patterns { .. } => panic!("expected extract"),
        }
    }
}
