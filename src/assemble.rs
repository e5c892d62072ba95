//! Merging raw recognition segments into clean sentence units.
//!
//! Raw recognizer chunks rarely align with sentence boundaries, and the
//! model hallucinates filler on silence. A single left-to-right pass with
//! one accumulator buffer filters the noise and emits sentence-sized units
//! ready for translation. The trade is precision for robustness: timestamps
//! on merged sentences are best-effort, not exact.

use crate::defaults::{GARBAGE_REPEAT_RUN, GREETING_MAX_CHARS, MAX_SENTENCE_CHARS};
use crate::stt::recognizer::RawRecognitionSegment;

/// Punctuation that ends a sentence, in both ASCII and the target script.
const TERMINAL_PUNCTUATION: &[char] = &['.', '?', '!', '。', '？', '！'];

/// Known recognizer hallucination markers. Segments containing any of these
/// are attribution artifacts or non-speech tags, not content. Compared
/// lowercased.
const BOILERPLATE_MARKERS: &[&str] = &[
    "[blank_audio]",
    "[inaudible]",
    "[music]",
    "[applause]",
    "[laughter]",
    "(blank_audio)",
    "(inaudible)",
    "subtitles by",
    "amara.org",
    "www.youtube.com",
    "♪",
];

/// Opening words that mark a standalone greeting.
const GREETING_WORDS: &[&str] = &["hello", "hi", "hey", "welcome", "greetings"];

/// A merged, cleaned unit of recognized speech ready for translation.
///
/// Timestamps span the first through last contributing raw segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    pub text: String,
    pub start_secs: f32,
    pub end_secs: f32,
}

/// Stateless sentence assembly pass. Pure and deterministic: the only edge
/// case is empty input producing empty output.
#[derive(Debug, Clone)]
pub struct SentenceAssembler {
    max_chars: usize,
}

impl Default for SentenceAssembler {
    fn default() -> Self {
        Self {
            max_chars: MAX_SENTENCE_CHARS,
        }
    }
}

impl SentenceAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the hard length cap (mainly for tests).
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Merge raw segments into ordered sentences.
    pub fn assemble(&self, segments: &[RawRecognitionSegment]) -> Vec<Sentence> {
        let mut sentences = Vec::new();
        let mut buffer = String::new();
        let mut start_secs = 0.0f32;
        let mut end_secs = 0.0f32;

        for segment in segments {
            let text = segment.text.trim();
            if is_garbage(text) {
                continue;
            }

            if buffer.is_empty() {
                start_secs = segment.start_secs;
            } else {
                buffer.push(' ');
            }
            buffer.push_str(text);
            end_secs = segment.end_secs;

            if self.should_flush(&buffer) {
                sentences.push(Sentence {
                    text: std::mem::take(&mut buffer),
                    start_secs,
                    end_secs,
                });
            }
        }

        if !buffer.trim().is_empty() {
            sentences.push(Sentence {
                text: buffer,
                start_secs,
                end_secs,
            });
        }

        sentences
    }

    fn should_flush(&self, buffer: &str) -> bool {
        ends_with_terminal(buffer)
            || is_short_greeting(buffer)
            || buffer.chars().count() > self.max_chars
    }
}

/// Recognizer hallucination, not content: too short, a lone period, a long
/// run of one repeated character, or a known boilerplate marker.
fn is_garbage(text: &str) -> bool {
    if text == "." || text.chars().count() < 2 {
        return true;
    }

    if has_repeat_run(text, GARBAGE_REPEAT_RUN) {
        return true;
    }

    let lowered = text.to_lowercase();
    BOILERPLATE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// True if any character repeats `run` or more times consecutively.
fn has_repeat_run(text: &str, run: usize) -> bool {
    let mut previous = None;
    let mut count = 0usize;

    for c in text.chars() {
        if Some(c) == previous {
            count += 1;
            if count >= run {
                return true;
            }
        } else {
            previous = Some(c);
            count = 1;
        }
    }

    count >= run
}

fn ends_with_terminal(buffer: &str) -> bool {
    buffer
        .chars()
        .next_back()
        .is_some_and(|c| TERMINAL_PUNCTUATION.contains(&c))
}

/// A short standalone greeting gets its own sentence instead of merging
/// with whatever follows it.
fn is_short_greeting(buffer: &str) -> bool {
    if buffer.chars().count() > GREETING_MAX_CHARS {
        return false;
    }

    let lowered = buffer.to_lowercase();
    let mut words = lowered.split_whitespace();
    let Some(first) = words.next() else {
        return false;
    };
    let first = first.trim_matches(|c: char| !c.is_alphanumeric());

    if GREETING_WORDS.contains(&first) {
        return true;
    }

    // Two-word greetings: "good morning" / "good afternoon" / "good evening"
    if first == "good"
        && let Some(second) = words.next()
    {
        let second = second.trim_matches(|c: char| !c.is_alphanumeric());
        return matches!(second, "morning" | "afternoon" | "evening");
    }

    false
}
