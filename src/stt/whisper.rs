//! Whisper-backed speech recognition.
//!
//! Implements [`SpeechRecognizer`] over whisper-rs.
//!
//! # Feature Gate
//!
//! This module requires the `whisper` feature (enabled by default) and
//! cmake to build. Without it a stub is compiled that fails at runtime
//! with instructions.

use crate::defaults;
use crate::error::{JimakuError, Result};
use crate::stt::recognizer::{RawRecognitionSegment, SpeechRecognizer};
use std::path::PathBuf;

#[cfg(feature = "whisper")]
use std::sync::{Mutex, Once};
#[cfg(feature = "whisper")]
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

#[cfg(feature = "whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Configuration for the Whisper recognizer.
#[derive(Debug, Clone)]
pub struct WhisperRecognizerConfig {
    /// Path to the Whisper model file
    pub model_path: PathBuf,
    /// Source language code (e.g., "en")
    pub language: String,
    /// Number of threads for inference (None = auto-detect)
    pub threads: Option<usize>,
}

impl Default for WhisperRecognizerConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(""),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

/// Whisper-based recognizer.
///
/// Loading the model is expensive; one instance is constructed per process
/// and shared (see [`crate::stt::engine::TranscriptionEngine::shared`]).
/// The context sits behind a Mutex: whisper states are cheap, but decode
/// calls are serialized as a resource pool of size one.
#[cfg(feature = "whisper")]
pub struct WhisperRecognizer {
    context: Mutex<WhisperContext>,
    config: WhisperRecognizerConfig,
    model_name: String,
}

#[cfg(feature = "whisper")]
impl std::fmt::Debug for WhisperRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperRecognizer")
            .field("config", &self.config)
            .field("model_name", &self.model_name)
            .field("context", &"<WhisperContext>")
            .finish()
    }
}

/// Whisper recognizer placeholder (without the whisper feature).
#[cfg(not(feature = "whisper"))]
#[derive(Debug)]
pub struct WhisperRecognizer {
    config: WhisperRecognizerConfig,
    model_name: String,
}

fn model_name_from_path(path: &std::path::Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(feature = "whisper")]
impl WhisperRecognizer {
    /// Load a Whisper model.
    ///
    /// # Errors
    /// Returns `JimakuError::ModelNotFound` if the model file doesn't exist.
    /// Returns `JimakuError::Inference` if model loading fails.
    pub fn new(config: WhisperRecognizerConfig) -> Result<Self> {
        // Install logging hooks to suppress whisper.cpp output (only once)
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if !config.model_path.exists() {
            return Err(JimakuError::ModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = model_name_from_path(&config.model_path);

        let mut context_params = WhisperContextParameters::default();
        // Fused attention kernels avoid the standalone softmax CUDA kernel,
        // which crashes on Blackwell GPUs with older ggml
        context_params.flash_attn(true);
        let context = WhisperContext::new_with_params(
            config
                .model_path
                .to_str()
                .ok_or_else(|| JimakuError::Inference {
                    message: "Invalid UTF-8 in model path".to_string(),
                })?,
            context_params,
        )
        .map_err(|e| JimakuError::Inference {
            message: format!("Failed to load Whisper model: {}", e),
        })?;

        Ok(Self {
            context: Mutex::new(context),
            config,
            model_name,
        })
    }

    pub fn config(&self) -> &WhisperRecognizerConfig {
        &self.config
    }
}

#[cfg(not(feature = "whisper"))]
impl WhisperRecognizer {
    /// Create a Whisper recognizer (stub implementation).
    pub fn new(config: WhisperRecognizerConfig) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(JimakuError::ModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = model_name_from_path(&config.model_path);
        Ok(Self { config, model_name })
    }

    pub fn config(&self) -> &WhisperRecognizerConfig {
        &self.config
    }
}

#[cfg(feature = "whisper")]
impl SpeechRecognizer for WhisperRecognizer {
    fn recognize(&self, samples: &[f32]) -> Result<Vec<RawRecognitionSegment>> {
        let context = self.context.lock().map_err(|e| JimakuError::Inference {
            message: format!("Failed to acquire context lock: {}", e),
        })?;

        let mut state = context.create_state().map_err(|e| JimakuError::Inference {
            message: format!("Failed to create Whisper state: {}", e),
        })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(&self.config.language));
        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }

        // Timestamped output, no conditioning on prior text (prevents
        // feedback loops in generation), low non-zero temperature with an
        // entropy gate against degenerate repeats, and a no-speech floor so
        // pure silence produces nothing.
        params.set_no_timestamps(false);
        params.set_token_timestamps(true);
        params.set_no_context(true);
        params.set_temperature(defaults::DECODE_TEMPERATURE);
        params.set_entropy_thold(defaults::ENTROPY_THRESHOLD);
        params.set_no_speech_thold(defaults::NO_SPEECH_THRESHOLD);
        params.set_suppress_blank(true);

        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, samples)
            .map_err(|e| JimakuError::Inference {
                message: format!("Whisper inference failed: {}", e),
            })?;

        let mut segments = Vec::new();
        for segment in state.as_iter() {
            // Segment probability of silence; keep speech only
            if segment.no_speech_probability() > defaults::NO_SPEECH_THRESHOLD {
                continue;
            }

            let text = segment
                .to_str_lossy()
                .map(|cow| cow.trim().to_string())
                .unwrap_or_default();
            if text.is_empty() {
                continue;
            }

            // Whisper timestamps are in 10 ms units
            let start_secs = segment.start_timestamp() as f32 / 100.0;
            let end_secs = segment.end_timestamp() as f32 / 100.0;

            segments.push(RawRecognitionSegment {
                text,
                start_secs,
                end_secs,
            });
        }

        Ok(segments)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(not(feature = "whisper"))]
impl SpeechRecognizer for WhisperRecognizer {
    fn recognize(&self, _samples: &[f32]) -> Result<Vec<RawRecognitionSegment>> {
        Err(JimakuError::Inference {
            message: concat!(
                "Whisper feature not enabled. This binary was built without speech recognition.\n",
                "To fix: cargo build --release (whisper is enabled by default)\n",
                "If build fails with cmake errors, install: sudo apt install cmake"
            )
            .to_string(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
