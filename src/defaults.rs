//! Default constants for jimaku.
//!
//! Shared across configuration types and pipeline stages so tuning values
//! live in one place. All of these are tunable, not contractual.

/// Audio sample rate the recognition model expects, in Hz.
pub const SAMPLE_RATE: u32 = 16_000;

/// Default chunk duration in seconds when a request doesn't specify one.
///
/// One minute keeps extraction fast enough to stay ahead of playback while
/// giving the recognizer enough context for coherent sentences.
pub const DEFAULT_CHUNK_SECS: u32 = 60;

/// Decode window length in seconds.
///
/// Matches the recognition model's native context length.
pub const DECODE_WINDOW_SECS: u32 = 30;

/// Overlap between consecutive decode windows in seconds.
///
/// Segments falling entirely inside the overlap are dropped from the later
/// window; they were already decoded by the earlier one.
pub const DECODE_OVERLAP_SECS: u32 = 5;

/// Sampling temperature for decoding. Low but non-zero: greedy decoding at
/// exactly 0.0 is more prone to degenerate repetition loops.
pub const DECODE_TEMPERATURE: f32 = 0.2;

/// Entropy threshold below which a decode window is considered to have
/// collapsed into repetition and is re-sampled.
pub const ENTROPY_THRESHOLD: f32 = 2.4;

/// Minimum speech probability; segments below it are treated as silence.
pub const NO_SPEECH_THRESHOLD: f32 = 0.6;

/// Minimum size in bytes for a cached audio artifact to be considered valid.
///
/// Truncated or empty downloads fall under this floor and are re-fetched.
pub const MIN_ARTIFACT_BYTES: u64 = 1000;

/// Hard cap on accumulated sentence length in characters.
///
/// Bounds translation prompt size when the recognizer emits long runs with
/// no terminal punctuation.
pub const MAX_SENTENCE_CHARS: usize = 80;

/// A run of this many identical consecutive characters marks a recognition
/// segment as repetitive garbage.
pub const GARBAGE_REPEAT_RUN: usize = 5;

/// Length cap for the short-greeting flush in the sentence assembler.
pub const GREETING_MAX_CHARS: usize = 20;

/// Number of leading characters compared (lowercased) when detecting an
/// echoed translation.
pub const ECHO_PREFIX_CHARS: usize = 10;

/// Marker written into the script field when the translation endpoint
/// echoed the input instead of translating it.
pub const ECHO_FAILURE_MARKER: &str = "Translation failed (echoed input)";

/// Default Whisper model name.
///
/// The source language is fixed to English, so the English-only variant is
/// the right default: smaller and faster than the multilingual one.
pub const DEFAULT_MODEL: &str = "base.en";

/// Source language code for transcription.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Default audio extraction tool, resolved on PATH.
pub const DEFAULT_EXTRACTOR: &str = "yt-dlp";

/// Default translation endpoint (Ollama-compatible).
pub const DEFAULT_TRANSLATION_ENDPOINT: &str = "http://127.0.0.1:11434";

/// Default translation model name.
pub const DEFAULT_TRANSLATION_MODEL: &str = "llama3.2";

/// Per-request timeout for translation calls in seconds.
pub const TRANSLATION_TIMEOUT_SECS: u64 = 120;

/// Report the GPU backend compiled into this build.
///
/// Only one GPU backend can be active at a time; if none is enabled,
/// returns "CPU".
pub fn gpu_backend() -> &'static str {
    if cfg!(feature = "cuda") {
        "CUDA"
    } else if cfg!(feature = "vulkan") {
        "Vulkan"
    } else {
        "CPU"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_window_exceeds_overlap() {
        // The window step (window - overlap) must be positive or windowed
        // decoding would never advance.
        assert!(DECODE_WINDOW_SECS > DECODE_OVERLAP_SECS);
    }

    #[test]
    fn gpu_backend_matches_compiled_feature() {
        let expected = if cfg!(feature = "cuda") {
            "CUDA"
        } else if cfg!(feature = "vulkan") {
            "Vulkan"
        } else {
            "CPU"
        };
        assert_eq!(gpu_backend(), expected);
    }
}
