//! Speech recognition: audio preprocessing, the recognizer seam, and the
//! shared transcription engine.

pub mod audio;
pub mod engine;
pub mod recognizer;
pub mod whisper;

pub use engine::TranscriptionEngine;
pub use recognizer::{MockRecognizer, RawRecognitionSegment, SpeechRecognizer};
pub use whisper::{WhisperRecognizer, WhisperRecognizerConfig};
