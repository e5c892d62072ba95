//! Transcription engine: preprocessing, windowed decoding, and the shared
//! process-wide model instance.

use crate::chunk::store::AudioArtifact;
use crate::defaults::{DECODE_OVERLAP_SECS, DECODE_WINDOW_SECS, SAMPLE_RATE};
use crate::error::{JimakuError, Result};
use crate::stt::audio;
use crate::stt::recognizer::{RawRecognitionSegment, SpeechRecognizer};
use crate::stt::whisper::{WhisperRecognizer, WhisperRecognizerConfig};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Process-wide engine slot. First successful construction wins; the mutex
/// makes concurrent first calls serialize instead of loading two models.
static SHARED_ENGINE: Mutex<Option<Arc<TranscriptionEngine>>> = Mutex::new(None);

/// Converts an audio artifact into ordered, timestamped recognition
/// segments.
///
/// Decoding is windowed: fixed-size windows with a stride overlap, inner
/// timestamps shifted back to chunk-relative time, and overlap-duplicated
/// segments dropped. Inference runs on the blocking pool so concurrent
/// chunk requests aren't starved while the model decodes.
pub struct TranscriptionEngine {
    recognizer: Arc<dyn SpeechRecognizer>,
}

impl TranscriptionEngine {
    /// Build an engine over any recognizer. Used directly by tests;
    /// production code goes through [`TranscriptionEngine::shared`].
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        Self { recognizer }
    }

    /// Get or create the process-wide engine backed by a Whisper model.
    ///
    /// The model is constructed at most once per process lifetime and then
    /// reused by every caller; there is no teardown short of process exit.
    /// Later calls return the existing instance regardless of arguments.
    ///
    /// # Errors
    /// Returns `JimakuError::ModelNotFound` / `JimakuError::Inference` if
    /// the first construction fails. A failed construction leaves the slot
    /// empty so a later call can retry.
    pub fn shared(model_path: &Path, language: &str, threads: Option<usize>) -> Result<Arc<Self>> {
        let mut slot = SHARED_ENGINE
            .lock()
            .map_err(|e| JimakuError::Other(format!("engine init lock poisoned: {}", e)))?;

        if let Some(engine) = slot.as_ref() {
            return Ok(Arc::clone(engine));
        }

        let recognizer = WhisperRecognizer::new(WhisperRecognizerConfig {
            model_path: model_path.to_path_buf(),
            language: language.to_string(),
            threads,
        })?;

        let engine = Arc::new(Self::new(Arc::new(recognizer)));
        *slot = Some(Arc::clone(&engine));
        Ok(engine)
    }

    pub fn model_name(&self) -> &str {
        self.recognizer.model_name()
    }

    /// Transcribe an artifact into ordered recognition segments.
    ///
    /// Cancellation is checked before decoding starts and between decode
    /// windows; an in-flight window always runs to completion (its result
    /// is simply discarded when the token has fired).
    ///
    /// # Errors
    /// Returns `JimakuError::Cancelled` if the token fires at a boundary,
    /// `JimakuError::AudioDecode` / `JimakuError::Inference` otherwise.
    pub async fn transcribe(
        &self,
        artifact: &AudioArtifact,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawRecognitionSegment>> {
        if cancel.is_cancelled() {
            return Err(JimakuError::Cancelled);
        }

        let samples = audio::load_samples(&artifact.path)?;
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let mut segments = Vec::new();
        for (index, range) in decode_windows(samples.len()).into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(JimakuError::Cancelled);
            }

            let offset_secs = (range.start / SAMPLE_RATE as usize) as f32;
            let window: Vec<f32> = samples[range].to_vec();
            let recognizer = Arc::clone(&self.recognizer);

            let window_segments =
                tokio::task::spawn_blocking(move || recognizer.recognize(&window))
                    .await
                    .map_err(|e| JimakuError::Inference {
                        message: format!("inference task failed: {}", e),
                    })??;

            merge_window(&mut segments, window_segments, index, offset_secs);
        }

        Ok(segments)
    }
}

/// Sample ranges for fixed-size windowed decoding: `DECODE_WINDOW_SECS`
/// windows advancing by window minus overlap.
fn decode_windows(total_samples: usize) -> Vec<std::ops::Range<usize>> {
    let window = (DECODE_WINDOW_SECS * SAMPLE_RATE) as usize;
    let step = ((DECODE_WINDOW_SECS - DECODE_OVERLAP_SECS) * SAMPLE_RATE) as usize;

    let mut ranges = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + window).min(total_samples);
        ranges.push(start..end);
        if end == total_samples {
            break;
        }
        start += step;
    }
    ranges
}

/// Append one window's output, shifting to chunk-relative time and dropping
/// segments that fall entirely inside the overlap already covered by the
/// previous window.
fn merge_window(
    merged: &mut Vec<RawRecognitionSegment>,
    window_segments: Vec<RawRecognitionSegment>,
    window_index: usize,
    offset_secs: f32,
) {
    let covered_until = if window_index == 0 {
        0.0
    } else {
        offset_secs + DECODE_OVERLAP_SECS as f32
    };

    for segment in window_segments {
        let shifted = segment.offset_by(offset_secs);
        if window_index > 0 && shifted.end_secs <= covered_until {
            continue;
        }
        merged.push(shifted);
    }
}
