//! Linguistic Annotator Contract
//!
//! The core never loads NLP models. An external annotator produces a
//! typed view of one post — tokens, sentence boundaries, gazetteer-ruled
//! entity spans — plus semantic phrase matches. Everything downstream of
//! this module is deterministic.

use serde::{Deserialize, Serialize};

/// Label prefix for semantic event matches.
pub const EVENT_LABEL_PREFIX: &str = "EVENT:";
/// Label prefix for annotator-emitted context matches.
pub const CONTEXT_LABEL_PREFIX: &str = "CONTEXT:";

/// Entity-ruler labels recognized by structural scoping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityLabel {
    Location,
    Region,
    Group,
    Direction,
}

impl EntityLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityLabel::Location => "LOCATION",
            EntityLabel::Region => "REGION",
            EntityLabel::Group => "GROUP",
            EntityLabel::Direction => "DIRECTION",
        }
    }
}

/// One document token with its character span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub start_char: usize,
    pub end_char: usize,
}

/// An entity span over document tokens, `[start_token, end_token)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySpan {
    pub label: EntityLabel,
    pub start_token: usize,
    pub end_token: usize,
    pub text: String,
}

/// The annotator's per-post output: tokens, sentence token ranges, and
/// entity spans over one immutable text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedDoc {
    text: String,
    tokens: Vec<Token>,
    /// Sentence boundaries as token ranges `[start, end)`, in order
    sentences: Vec<(usize, usize)>,
    entities: Vec<EntitySpan>,
}

impl AnnotatedDoc {
    pub fn new(
        text: String,
        tokens: Vec<Token>,
        sentences: Vec<(usize, usize)>,
        entities: Vec<EntitySpan>,
    ) -> Self {
        Self {
            text,
            tokens,
            sentences,
            entities,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn entities(&self) -> &[EntitySpan] {
        &self.entities
    }

    pub fn sentences(&self) -> &[(usize, usize)] {
        &self.sentences
    }

    /// The sentence token range containing the given token.
    pub fn sentence_containing(&self, token: usize) -> Option<(usize, usize)> {
        self.sentences
            .iter()
            .copied()
            .find(|&(start, end)| token >= start && token < end)
    }

    /// Source text covered by a token range.
    pub fn span_text(&self, start_token: usize, end_token: usize) -> &str {
        if start_token >= end_token || end_token > self.tokens.len() {
            return "";
        }
        let start = self.tokens[start_token].start_char;
        let end = self.tokens[end_token - 1].end_char;
        &self.text[start..end]
    }

    /// Lowercased token texts in a range; used for series-joiner checks.
    pub fn gap_tokens(&self, start_token: usize, end_token: usize) -> impl Iterator<Item = &str> {
        self.tokens[start_token.min(self.tokens.len())..end_token.min(self.tokens.len())]
            .iter()
            .map(|t| t.text.as_str())
    }
}

/// One aligned word inside a phrase match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordMatch {
    /// Pattern-element role ("subject", "verb", ...)
    pub match_type: String,
    /// Document token index of the match head, if aligned
    pub document_token_index: Option<usize>,
    /// Token length of the matched phrase (≥1)
    pub document_token_length: usize,
    /// Matched document word
    pub word: String,
    /// Full matched phrase, when longer than one word
    pub phrase: Option<String>,
    pub similarity: f64,
    pub negated: bool,
    pub uncertain: bool,
    pub involves_coreference: bool,
    pub explanation: String,
}

/// A semantic phrase match emitted by the annotator.
///
/// Event matches carry an `EVENT:`-prefixed label; context matches a
/// `CONTEXT:`-prefixed one. Other labels are ignored by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatorMatch {
    pub label: String,
    /// Overall similarity in [0, 1]
    pub similarity: f64,
    pub negated: bool,
    pub uncertain: bool,
    pub involves_coreference: bool,
    pub word_matches: Vec<WordMatch>,
    /// Sentence text the annotator associated with the match, if any
    pub sentence_text: Option<String>,
}

impl AnnotatorMatch {
    pub fn is_event(&self) -> bool {
        self.label.starts_with(EVENT_LABEL_PREFIX)
    }

    pub fn is_context(&self) -> bool {
        self.label.starts_with(CONTEXT_LABEL_PREFIX)
    }

    /// The context kind carried after the `CONTEXT:` prefix.
    pub fn context_kind_label(&self) -> Option<&str> {
        self.label.strip_prefix(CONTEXT_LABEL_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> AnnotatedDoc {
        let text = "Forces shelled Avdiivka.".to_string();
        let tokens = vec![
            Token { text: "Forces".into(), start_char: 0, end_char: 6 },
            Token { text: "shelled".into(), start_char: 7, end_char: 14 },
            Token { text: "Avdiivka".into(), start_char: 15, end_char: 23 },
            Token { text: ".".into(), start_char: 23, end_char: 24 },
        ];
        AnnotatedDoc::new(text, tokens, vec![(0, 4)], vec![])
    }

    #[test]
    fn test_span_text() {
        let d = doc();
        assert_eq!(d.span_text(0, 2), "Forces shelled");
        assert_eq!(d.span_text(2, 3), "Avdiivka");
        assert_eq!(d.span_text(3, 3), "");
    }

    #[test]
    fn test_sentence_containing() {
        let d = doc();
        assert_eq!(d.sentence_containing(2), Some((0, 4)));
        assert_eq!(d.sentence_containing(9), None);
    }

    #[test]
    fn test_match_label_kinds() {
        let m = AnnotatorMatch {
            label: "CONTEXT:PROXIMITY".into(),
            similarity: 1.0,
            negated: false,
            uncertain: false,
            involves_coreference: false,
            word_matches: vec![],
            sentence_text: None,
        };
        assert!(m.is_context());
        assert!(!m.is_event());
        assert_eq!(m.context_kind_label(), Some("PROXIMITY"));
    }
}
