//! Recognition seam over the raw speech model.

use crate::error::{JimakuError, Result};
use std::sync::Arc;

/// One decoded span of speech.
///
/// Timestamps are in seconds, relative to the start of the buffer handed to
/// the recognizer. Transient: produced and consumed within one
/// transcription call.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecognitionSegment {
    pub text: String,
    pub start_secs: f32,
    pub end_secs: f32,
}

impl RawRecognitionSegment {
    pub fn new(text: impl Into<String>, start_secs: f32, end_secs: f32) -> Self {
        Self {
            text: text.into(),
            start_secs,
            end_secs,
        }
    }

    /// Shift both timestamps by a fixed offset (used when assembling
    /// windowed decode output back into chunk-relative time).
    pub fn offset_by(mut self, secs: f32) -> Self {
        self.start_secs += secs;
        self.end_secs += secs;
        self
    }
}

/// Trait for speech recognition over one decode window.
///
/// This trait allows swapping implementations (real Whisper vs mock).
pub trait SpeechRecognizer: Send + Sync {
    /// Decode a 16 kHz mono f32 buffer into ordered timestamped segments.
    ///
    /// # Errors
    /// Returns `JimakuError::Inference` on model failure.
    fn recognize(&self, samples: &[f32]) -> Result<Vec<RawRecognitionSegment>>;

    /// Get the name of the loaded model
    fn model_name(&self) -> &str;
}

/// Implement SpeechRecognizer for Arc<T> to allow sharing across requests.
impl<T: SpeechRecognizer + ?Sized> SpeechRecognizer for Arc<T> {
    fn recognize(&self, samples: &[f32]) -> Result<Vec<RawRecognitionSegment>> {
        (**self).recognize(samples)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Mock recognizer for testing
#[derive(Debug, Clone)]
pub struct MockRecognizer {
    model_name: String,
    segments: Vec<RawRecognitionSegment>,
    should_fail: bool,
}

impl MockRecognizer {
    /// Create a new mock recognizer with default settings
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            segments: Vec::new(),
            should_fail: false,
        }
    }

    /// Configure the mock to return specific segments for every window
    pub fn with_segments(mut self, segments: Vec<RawRecognitionSegment>) -> Self {
        self.segments = segments;
        self
    }

    /// Configure the mock to fail on recognize
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl SpeechRecognizer for MockRecognizer {
    fn recognize(&self, _samples: &[f32]) -> Result<Vec<RawRecognitionSegment>> {
        if self.should_fail {
            Err(JimakuError::Inference {
                message: "mock recognition failure".to_string(),
            })
        } else {
            Ok(self.segments.clone())
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
