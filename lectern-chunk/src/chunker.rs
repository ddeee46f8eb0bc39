//! Splitting cleaned document text into overlapping, retrievable passages.
//!
//! Text arrives here already cleaned (headers, footers and hyphenation
//! artifacts removed) and leaves as an ordered sequence of [`Passage`]s. Each
//! passage records the byte range of the source text it was cut from, so
//! callers can map search hits back onto the document.
//!
//! Three policies are available through [`ChunkStrategy`]:
//!
//! *   **Word window**: fixed-size windows of whitespace-separated words with a
//!     configurable word overlap.
//! *   **Sentence window**: sentences packed into passages bounded by a
//!     character budget, carrying the last few sentences of each passage into
//!     the next one.
//! *   **Adaptive**: short texts are returned whole; run-on prose (long mean
//!     sentence length) uses the word window; everything else uses the
//!     sentence window.
//!
//! # Usage
//!
//! ```
//! use lectern_chunk::{ChunkStrategy, PassageBuilder, WordWindow};
//!
//! let strategy = ChunkStrategy::WordWindow(WordWindow::new(4, 1));
//! let builder = PassageBuilder::new("ch01", strategy).unwrap();
//!
//! let passages = builder.get_passages("one two three four five six seven");
//! assert_eq!(passages.len(), 2);
//! assert_eq!(passages[0].id(), "ch01_000000");
//! assert_eq!(passages[0].text(), "one two three four");
//! assert_eq!(passages[1].text(), "four five six seven");
//! ```

use crate::error::Result;
use crate::strategy::{
    Adaptive, ChunkStrategy, LONG_SENTENCE_THRESHOLD, SentenceWindow, WordWindow,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::LazyLock;

/// Default id prefix for passages.
pub const DEFAULT_PREFIX: &str = "chunk";

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").expect("word pattern"));

// A sentence ends at `.`, `!` or `?` followed by whitespace. The punctuation
// stays with the sentence; the whitespace is dropped.
static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("sentence boundary pattern"));

/// A contiguous, possibly overlapping span of source text treated as one
/// retrievable unit.
///
/// Passages are created by the chunker and are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    id: String,
    text: String,
    source_offset: Range<usize>,
}

impl Passage {
    pub fn new(id: impl Into<String>, text: impl Into<String>, source_offset: Range<usize>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source_offset,
        }
    }

    /// `{prefix}_{index}` with the index zero-padded to six digits.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Byte range of the chunked text that this passage covers.
    pub fn source_offset(&self) -> Range<usize> {
        self.source_offset.clone()
    }
}

/// Format a passage id from its prefix and emission index.
pub fn passage_id(prefix: &str, index: usize) -> String {
    format!("{prefix}_{index:06}")
}

/// Passage text plus its source range, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Span {
    text: String,
    range: Range<usize>,
}

/// Reusable chunker bound to an id prefix and a validated strategy.
#[derive(Debug, Clone)]
pub struct PassageBuilder {
    prefix: String,
    strategy: ChunkStrategy,
}

impl PassageBuilder {
    /// Creates a builder, rejecting strategies whose size parameters cannot
    /// make progress.
    pub fn new(prefix: impl Into<String>, strategy: ChunkStrategy) -> Result<Self> {
        strategy.validate()?;
        Ok(Self {
            prefix: prefix.into(),
            strategy,
        })
    }

    /// Adaptive strategy with default sizes.
    pub fn with_defaults(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            strategy: ChunkStrategy::default(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn strategy(&self) -> &ChunkStrategy {
        &self.strategy
    }

    /// Splits `text` into passages in emission order.
    ///
    /// Identical input always produces identical ids, text and offsets. Blank
    /// input produces no passages; no passage is ever empty.
    pub fn get_passages(&self, text: &str) -> Vec<Passage> {
        let spans = match &self.strategy {
            ChunkStrategy::WordWindow(window) => word_window_spans(text, window),
            ChunkStrategy::SentenceWindow(window) => sentence_window_spans(text, window),
            ChunkStrategy::Adaptive(adaptive) => adaptive_spans(text, adaptive),
        };

        tracing::debug!(
            "Chunked {} bytes into {} passages with {} (prefix {})",
            text.len(),
            spans.len(),
            self.strategy.name(),
            self.prefix
        );

        spans
            .into_iter()
            .filter(|span| !span.text.is_empty())
            .enumerate()
            .map(|(index, span)| Passage::new(passage_id(&self.prefix, index), span.text, span.range))
            .collect()
    }
}

/// Chunks `text` with `strategy`, naming passages `{prefix}_{index}`.
pub fn chunk(text: &str, strategy: &ChunkStrategy, prefix: &str) -> Result<Vec<Passage>> {
    let builder = PassageBuilder::new(prefix, *strategy)?;
    Ok(builder.get_passages(text))
}

/// Byte ranges of the sentences in `text`, trimmed, with empty sentences dropped.
pub fn sentence_spans(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for boundary in SENTENCE_BOUNDARY.find_iter(text) {
        // The punctuation mark is a single ASCII byte.
        push_trimmed(text, start..boundary.start() + 1, &mut ranges);
        start = boundary.end();
    }
    push_trimmed(text, start..text.len(), &mut ranges);
    ranges
}

fn push_trimmed(text: &str, range: Range<usize>, ranges: &mut Vec<Range<usize>>) {
    let slice = &text[range.clone()];
    let leading = slice.len() - slice.trim_start().len();
    let trailing = slice.len() - slice.trim_end().len();
    if leading + trailing < slice.len() {
        ranges.push(range.start + leading..range.end - trailing);
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn join_ranges(text: &str, ranges: &[Range<usize>]) -> Span {
    let joined = ranges
        .iter()
        .map(|range| &text[range.clone()])
        .collect::<Vec<_>>()
        .join(" ");
    let start = ranges.first().map_or(0, |range| range.start);
    let end = ranges.last().map_or(0, |range| range.end);
    Span {
        text: joined,
        range: start..end,
    }
}

fn word_window_spans(text: &str, window: &WordWindow) -> Vec<Span> {
    let words: Vec<Range<usize>> = WORD.find_iter(text).map(|m| m.range()).collect();
    let mut spans = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let end = (start + window.chunk_size).min(words.len());
        spans.push(join_ranges(text, &words[start..end]));
        if end == words.len() {
            break;
        }
        start = end - window.overlap;
    }

    spans
}

fn sentence_window_spans(text: &str, window: &SentenceWindow) -> Vec<Span> {
    let sentences: Vec<(Range<usize>, usize)> = sentence_spans(text)
        .into_iter()
        .map(|range| {
            let len = char_len(&text[range.clone()]);
            (range, len)
        })
        .collect();

    let mut spans = Vec::new();
    let mut buffer: Vec<(Range<usize>, usize)> = Vec::new();

    for (range, len) in sentences {
        if !buffer.is_empty() && buffered_len(&buffer) + 1 + len > window.max_chars {
            spans.push(flush(text, &buffer));

            let keep = window.overlap_sentences.min(buffer.len());
            buffer.drain(..buffer.len() - keep);
            // Carried sentences never push the next passage over budget.
            while !buffer.is_empty() && buffered_len(&buffer) + 1 + len > window.max_chars {
                buffer.remove(0);
            }
        }
        buffer.push((range, len));
    }

    if !buffer.is_empty() {
        spans.push(flush(text, &buffer));
    }

    spans
}

/// Length of the buffered sentences once joined by single spaces.
fn buffered_len(buffer: &[(Range<usize>, usize)]) -> usize {
    let chars: usize = buffer.iter().map(|(_, len)| len).sum();
    chars + buffer.len().saturating_sub(1)
}

fn flush(text: &str, buffer: &[(Range<usize>, usize)]) -> Span {
    let ranges: Vec<Range<usize>> = buffer.iter().map(|(range, _)| range.clone()).collect();
    join_ranges(text, &ranges)
}

fn adaptive_spans(text: &str, adaptive: &Adaptive) -> Vec<Span> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    if (char_len(text) as f64) < adaptive.short_text_limit() {
        tracing::debug!("Text shorter than adaptive limit, keeping it whole");
        return vec![Span {
            text: text.to_string(),
            range: 0..text.len(),
        }];
    }

    let sentences = sentence_spans(text);
    let total: usize = sentences
        .iter()
        .map(|range| char_len(&text[range.clone()]))
        .sum();
    let mean_sentence_len = total as f64 / sentences.len().max(1) as f64;

    if mean_sentence_len > LONG_SENTENCE_THRESHOLD {
        tracing::debug!(
            "Mean sentence length {:.1} exceeds threshold, using word window",
            mean_sentence_len
        );
        word_window_spans(text, &adaptive.word_window())
    } else {
        tracing::debug!(
            "Mean sentence length {:.1} within threshold, using sentence window",
            mean_sentence_len
        );
        sentence_window_spans(text, &adaptive.sentence_window())
    }
}
