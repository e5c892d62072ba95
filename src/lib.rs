//! jimaku - chunked video transcription and translation for
//! language-learning subtitles.
//!
//! A video URL plus a time window goes in; aligned subtitle segments come
//! out, each with the recognized English text, a romaji reading, and a
//! Japanese translation. Chunks are cached on disk; the recognition model
//! is loaded once per process and shared.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod assemble;
pub mod chunk;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod defaults;
pub mod diagnostics;
pub mod error;
pub mod ipc;
pub mod models;
pub mod pipeline;
pub mod stt;
pub mod translate;

// Core seams (extract → recognize → assemble → translate)
pub use assemble::{Sentence, SentenceAssembler};
pub use chunk::{AudioArtifact, AudioChunkStore, AudioExtractor, ChunkKey, YtDlpExtractor};
pub use stt::{RawRecognitionSegment, SpeechRecognizer, TranscriptionEngine};
pub use translate::{TranslationResult, Translator};

// Pipeline
pub use pipeline::{ChunkState, PipelineOrchestrator, SubtitleSegment};

// Error handling
pub use error::{JimakuError, PipelineStage, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
