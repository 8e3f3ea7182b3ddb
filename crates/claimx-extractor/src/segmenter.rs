//! Built-in sentence parsers
//!
//! [`RuleBasedSegmenter`] splits raw text without any NLP model and never
//! supplies dependency trees. [`PreParsedSentences`] hands back sentences that
//! an external NLP service already produced.

use claimx_core::{ParseOptions, ParseOutput, ParsedSentence, Result, SentenceParser};

/// Sentence-ending punctuation that does not need trailing whitespace
const FULL_WIDTH_TERMINALS: [char; 3] = ['。', '！', '？'];

/// Words that end in a period without ending the sentence
const ABBREVIATIONS: [&str; 9] = ["e.g", "i.e", "etc", "vs", "cf", "approx", "mr", "mrs", "dr"];

// ============================================================================
// Rule-based segmenter
// ============================================================================

/// Splits on terminal punctuation followed by whitespace and on blank lines
#[derive(Debug, Clone, Default)]
pub struct RuleBasedSegmenter;

impl RuleBasedSegmenter {
    pub fn new() -> Self {
        Self
    }

    /// Segment text into sentences with absolute character offsets
    pub fn segment(&self, text: &str) -> Vec<ParsedSentence> {
        let chars: Vec<char> = text.chars().collect();
        let mut sentences = Vec::new();
        let mut start = 0;

        for i in 0..chars.len() {
            let boundary = match chars[i] {
                c if FULL_WIDTH_TERMINALS.contains(&c) => Some(i + 1),
                '.' | '!' | '?' => {
                    let at_break = chars.get(i + 1).map_or(true, |n| n.is_whitespace());
                    let abbreviation = chars[i] == '.' && ends_with_abbreviation(&chars[start..i]);
                    (at_break && !abbreviation).then_some(i + 1)
                }
                '\n' if starts_blank_line(&chars, i) => Some(i),
                _ => None,
            };

            if let Some(end) = boundary {
                if end > start {
                    push_sentence(&chars, start, end, &mut sentences);
                    start = end;
                }
            }
        }
        push_sentence(&chars, start, chars.len(), &mut sentences);

        sentences
    }
}

fn ends_with_abbreviation(preceding: &[char]) -> bool {
    let word_start = preceding
        .iter()
        .rposition(|c| c.is_whitespace())
        .map(|p| p + 1)
        .unwrap_or(0);
    let word: String = preceding[word_start..].iter().collect();
    ABBREVIATIONS.contains(&word.to_lowercase().as_str())
}

/// The newline at `i` is followed by only whitespace up to another newline
fn starts_blank_line(chars: &[char], i: usize) -> bool {
    chars[i + 1..]
        .iter()
        .take_while(|c| c.is_whitespace())
        .any(|&c| c == '\n')
}

fn push_sentence(chars: &[char], start: usize, end: usize, out: &mut Vec<ParsedSentence>) {
    let slice = &chars[start..end];
    let Some(first) = slice.iter().position(|c| !c.is_whitespace()) else {
        return;
    };
    let last = slice
        .iter()
        .rposition(|c| !c.is_whitespace())
        .unwrap_or(first);

    let text: String = slice[first..=last].iter().collect();
    out.push(ParsedSentence::new(out.len(), text, start + first));
}

#[async_trait::async_trait]
impl SentenceParser for RuleBasedSegmenter {
    async fn parse(&self, text: &str, options: ParseOptions) -> Result<ParseOutput> {
        let sentences = self.segment(text);
        tracing::debug!(
            sentences = sentences.len(),
            dependencies_requested = options.include_dependencies,
            "Segmented text"
        );
        Ok(ParseOutput { sentences })
    }

    fn name(&self) -> &str {
        "rule-based"
    }
}

// ============================================================================
// Pre-parsed sentences
// ============================================================================

/// Parser that returns sentences produced elsewhere
#[derive(Debug, Clone, Default)]
pub struct PreParsedSentences {
    sentences: Vec<ParsedSentence>,
}

impl PreParsedSentences {
    pub fn new(sentences: Vec<ParsedSentence>) -> Self {
        Self { sentences }
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}

#[async_trait::async_trait]
impl SentenceParser for PreParsedSentences {
    async fn parse(&self, _text: &str, options: ParseOptions) -> Result<ParseOutput> {
        let mut sentences = self.sentences.clone();
        if !options.include_dependencies {
            for sentence in &mut sentences {
                sentence.dependencies = None;
            }
        }
        Ok(ParseOutput { sentences })
    }

    fn name(&self) -> &str {
        "pre-parsed"
    }
}

// ============================================================================
// Tests
// ============================================================================
