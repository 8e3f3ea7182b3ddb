//! Parsed sentences and dependency trees
//!
//! These are the structures produced by the external sentence parser.
//! The extraction pipeline only reads them.

use serde::{Deserialize, Serialize};

use crate::{ClaimxError, Result, TextSpan};

// ============================================================================
// Part of speech and dependency relations
// ============================================================================

/// Coarse part-of-speech tags (Universal Dependencies style)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PosTag {
    Verb,
    Aux,
    Noun,
    Propn,
    Pron,
    Adj,
    Adv,
    Adp,
    Det,
    Num,
    Part,
    Cconj,
    Sconj,
    Punct,
    #[serde(other)]
    Other,
}

impl PosTag {
    pub fn is_verbal(&self) -> bool {
        matches!(self, Self::Verb | Self::Aux)
    }
}

/// Dependency relation labels
///
/// Accepts both the classic Stanford labels (`dobj`, `nsubjpass`) and their
/// Universal Dependencies spellings (`obj`, `nsubj:pass`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DepRelation {
    Root,
    Nsubj,
    NsubjPass,
    Dobj,
    Iobj,
    Compound,
    Amod,
    Det,
    Prep,
    Pobj,
    Aux,
    AuxPass,
    Punct,
    Other(String),
}

impl DepRelation {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Root => "root",
            Self::Nsubj => "nsubj",
            Self::NsubjPass => "nsubjpass",
            Self::Dobj => "dobj",
            Self::Iobj => "iobj",
            Self::Compound => "compound",
            Self::Amod => "amod",
            Self::Det => "det",
            Self::Prep => "prep",
            Self::Pobj => "pobj",
            Self::Aux => "aux",
            Self::AuxPass => "auxpass",
            Self::Punct => "punct",
            Self::Other(label) => label,
        }
    }
}

impl From<&str> for DepRelation {
    fn from(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "root" => Self::Root,
            "nsubj" => Self::Nsubj,
            "nsubjpass" | "nsubj:pass" => Self::NsubjPass,
            "dobj" | "obj" => Self::Dobj,
            "iobj" => Self::Iobj,
            "compound" | "compound:nn" | "nn" => Self::Compound,
            "amod" => Self::Amod,
            "det" => Self::Det,
            "prep" => Self::Prep,
            "pobj" => Self::Pobj,
            "aux" => Self::Aux,
            "auxpass" | "aux:pass" => Self::AuxPass,
            "punct" => Self::Punct,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for DepRelation {
    fn from(label: String) -> Self {
        Self::from(label.as_str())
    }
}

impl From<DepRelation> for String {
    fn from(relation: DepRelation) -> Self {
        relation.as_str().to_string()
    }
}

impl std::fmt::Display for DepRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Dependency Tree
// ============================================================================

/// A token in a dependency parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub lemma: String,
    pub pos: PosTag,
    pub relation: DepRelation,

    /// Index of the head token; `None` for the root
    pub head: Option<usize>,

    /// Character offset relative to the sentence
    pub start_offset: usize,
    pub end_offset: usize,
}

impl Token {
    /// Lowercased lemma, falling back to the token text when the parser gave none
    pub fn normalized_lemma(&self) -> String {
        if self.lemma.trim().is_empty() {
            self.text.to_lowercase()
        } else {
            self.lemma.to_lowercase()
        }
    }
}

/// Dependency parse of a single sentence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyTree {
    pub tokens: Vec<Token>,
}

impl DependencyTree {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// Check structural consistency against the owning sentence's length
    pub fn validate(&self, sentence_len: usize) -> Result<()> {
        let n = self.tokens.len();

        for (i, token) in self.tokens.iter().enumerate() {
            if token.start_offset > token.end_offset || token.end_offset > sentence_len {
                return Err(ClaimxError::MalformedTree(format!(
                    "token {} '{}' has offsets {}..{} outside sentence of length {}",
                    i, token.text, token.start_offset, token.end_offset, sentence_len
                )));
            }

            match token.head {
                Some(head) if head >= n => {
                    return Err(ClaimxError::MalformedTree(format!(
                        "token {} points to missing head {}",
                        i, head
                    )));
                }
                Some(head) if head == i => {
                    return Err(ClaimxError::MalformedTree(format!(
                        "token {} is its own head",
                        i
                    )));
                }
                _ => {}
            }

            if token.head.is_none() != (token.relation == DepRelation::Root) {
                return Err(ClaimxError::MalformedTree(format!(
                    "token {} has relation '{}' inconsistent with its head",
                    i, token.relation
                )));
            }
        }

        // Walking up from any token must reach a root within n steps
        for start in 0..n {
            let mut current = start;
            let mut steps = 0;
            while let Some(head) = self.tokens[current].head {
                current = head;
                steps += 1;
                if steps > n {
                    return Err(ClaimxError::MalformedTree(format!(
                        "cycle detected above token {}",
                        start
                    )));
                }
            }
        }

        Ok(())
    }

    /// Index of the first root token
    pub fn root(&self) -> Option<usize> {
        self.tokens.iter().position(|t| t.head.is_none())
    }

    /// Root token when it is a verb (the head of the main clause)
    pub fn root_verb(&self) -> Option<usize> {
        self.root().filter(|&i| self.tokens[i].pos.is_verbal())
    }

    /// Indices of the direct dependents of `index`, in token order
    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.tokens
            .iter()
            .enumerate()
            .filter(move |(_, t)| t.head == Some(index))
            .map(|(i, _)| i)
    }

    /// First dependent of `index` attached through any of `relations`
    pub fn child_with(&self, index: usize, relations: &[DepRelation]) -> Option<usize> {
        self.children(index)
            .find(|&child| relations.contains(&self.tokens[child].relation))
    }

    /// Grammatical subject of a verb
    pub fn subject_of(&self, verb: usize) -> Option<usize> {
        self.child_with(verb, &[DepRelation::Nsubj, DepRelation::NsubjPass])
    }

    /// Direct object of a verb
    pub fn direct_object_of(&self, verb: usize) -> Option<usize> {
        self.child_with(verb, &[DepRelation::Dobj])
    }

    /// All compound modifiers below `index` (transitively), unordered
    pub fn compound_modifiers(&self, index: usize) -> Vec<usize> {
        let mut found = Vec::new();
        let mut stack = vec![index];
        while let Some(current) = stack.pop() {
            for child in self.children(current) {
                if self.tokens[child].relation == DepRelation::Compound {
                    found.push(child);
                    stack.push(child);
                }
            }
        }
        found
    }

    /// Head token plus its compound modifiers, ordered by position
    pub fn noun_phrase(&self, head: usize) -> Vec<usize> {
        let mut indices = self.compound_modifiers(head);
        indices.push(head);
        indices.sort_unstable();
        indices
    }
}

// ============================================================================
// Parsed Sentence
// ============================================================================

/// A sentence as returned by the sentence parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSentence {
    /// Position of the sentence in the document
    pub index: usize,

    pub text: String,

    /// Absolute character offsets in the document
    pub start_offset: usize,
    pub end_offset: usize,

    /// Dependency parse, when requested and available
    #[serde(default)]
    pub dependencies: Option<DependencyTree>,
}

impl ParsedSentence {
    /// Create a sentence starting at `start_offset`; the end offset is derived from the text
    pub fn new(index: usize, text: impl Into<String>, start_offset: usize) -> Self {
        let text = text.into();
        let end_offset = start_offset + text.chars().count();
        Self {
            index,
            text,
            start_offset,
            end_offset,
            dependencies: None,
        }
    }

    pub fn with_dependencies(mut self, tree: DependencyTree) -> Self {
        self.dependencies = Some(tree);
        self
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Build a span from relative character offsets
    pub fn span(&self, start: usize, end: usize) -> TextSpan {
        TextSpan::new(slice_chars(&self.text, start, end), start, end)
    }

    /// Span covering the given tokens of the dependency tree
    pub fn span_of_tokens(&self, indices: &[usize]) -> Option<TextSpan> {
        let tree = self.dependencies.as_ref()?;
        let tokens: Vec<&Token> = indices.iter().filter_map(|&i| tree.token(i)).collect();
        let start = tokens.iter().map(|t| t.start_offset).min()?;
        let end = tokens.iter().map(|t| t.end_offset).max()?;
        Some(self.span(start, end))
    }
}

/// Slice `text` by character offsets, clamping to its bounds
pub fn slice_chars(text: &str, start: usize, end: usize) -> &str {
    let byte_at = |char_idx: usize| {
        text.char_indices()
            .nth(char_idx)
            .map(|(b, _)| b)
            .unwrap_or(text.len())
    };
    let start_byte = byte_at(start);
    let end_byte = byte_at(end.max(start));
    &text[start_byte..end_byte]
}

/// Convert a byte offset into a character offset
pub fn char_offset(text: &str, byte_offset: usize) -> usize {
    text.char_indices()
        .take_while(|(b, _)| *b < byte_offset)
        .count()
}

// ============================================================================
// Sentence Parser
// ============================================================================

/// Options passed to the sentence parser
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    pub include_dependencies: bool,
    pub include_semantic_roles: bool,
}

/// Output of the sentence parser
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseOutput {
    pub sentences: Vec<ParsedSentence>,
}

/// Trait for sentence segmentation and dependency parsing backends
#[async_trait::async_trait]
pub trait SentenceParser: Send + Sync {
    /// Segment (and optionally parse) a document
    async fn parse(&self, text: &str, options: ParseOptions) -> Result<ParseOutput>;

    /// Get parser name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str, pos: PosTag, rel: &str, head: Option<usize>, start: usize) -> Token {
        Token {
            text: text.to_string(),
            lemma: text.to_lowercase(),
            pos,
            relation: DepRelation::from(rel),
            head,
            start_offset: start,
            end_offset: start + text.chars().count(),
        }
    }

    // "The auth service requires tokens."
    fn sample_tree() -> DependencyTree {
        DependencyTree::new(vec![
            token("The", PosTag::Det, "det", Some(2), 0),
            token("auth", PosTag::Noun, "compound", Some(2), 4),
            token("service", PosTag::Noun, "nsubj", Some(3), 9),
            token("requires", PosTag::Verb, "ROOT", None, 17),
            token("tokens", PosTag::Noun, "dobj", Some(3), 26),
            token(".", PosTag::Punct, "punct", Some(3), 32),
        ])
    }

    #[test]
    fn test_relation_labels() {
        assert_eq!(DepRelation::from("obj"), DepRelation::Dobj);
        assert_eq!(DepRelation::from("nsubj:pass"), DepRelation::NsubjPass);
        assert_eq!(DepRelation::from("xcomp"), DepRelation::Other("xcomp".to_string()));
        assert_eq!(String::from(DepRelation::Compound), "compound");
    }

    #[test]
    fn test_tree_queries() {
        let tree = sample_tree();
        assert!(tree.validate(33).is_ok());
        assert_eq!(tree.root_verb(), Some(3));
        assert_eq!(tree.subject_of(3), Some(2));
        assert_eq!(tree.direct_object_of(3), Some(4));
        assert_eq!(tree.noun_phrase(2), vec![1, 2]);
    }

    #[test]
    fn test_tree_cycle_is_malformed() {
        let mut tree = sample_tree();
        tree.tokens[3].head = Some(4);
        tree.tokens[3].relation = DepRelation::from("ccomp");
        tree.tokens[4].head = Some(3);
        assert!(matches!(
            tree.validate(33),
            Err(ClaimxError::MalformedTree(_))
        ));
    }

    #[test]
    fn test_tree_bad_head_is_malformed() {
        let mut tree = sample_tree();
        tree.tokens[0].head = Some(42);
        assert!(tree.validate(33).is_err());
    }

    #[test]
    fn test_tree_offsets_checked() {
        assert!(sample_tree().validate(10).is_err());
    }

    #[test]
    fn test_sentence_span_by_chars() {
        let sentence = ParsedSentence::new(0, "Der Größe-Wert ist 5.", 100);
        assert_eq!(sentence.end_offset, 121);
        assert_eq!(sentence.span(4, 14).text, "Größe-Wert");
    }

    #[test]
    fn test_char_offset() {
        let text = "Größe x";
        let byte = text.find('x').unwrap();
        assert_eq!(char_offset(text, byte), 6);
    }
}
