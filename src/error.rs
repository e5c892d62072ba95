//! Error types for jimaku.

use thiserror::Error;

/// Identity of the pipeline stage a terminal failure happened in.
///
/// Carried by [`JimakuError::Pipeline`] so callers can distinguish
/// "source unavailable" from "recognition failed" from "cancelled".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Download,
    Transcribe,
    Translate,
}

impl PipelineStage {
    /// Stable lowercase name used in IPC error responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Download => "download",
            PipelineStage::Transcribe => "transcribe",
            PipelineStage::Translate => "translate",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum JimakuError {
    // Request validation errors
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio extraction errors
    #[error("Extraction tool not found: {tool}")]
    ExtractorNotFound { tool: String },

    #[error("Audio extraction failed: {message}")]
    Extraction { message: String },

    // Transcription errors
    #[error("Transcription model not found at {path}")]
    ModelNotFound { path: String },

    #[error("Audio decode failed: {message}")]
    AudioDecode { message: String },

    #[error("Transcription inference failed: {message}")]
    Inference { message: String },

    // Translation errors. These never reach the end caller: every sentence
    // degrades to a fallback triple instead.
    #[error("Translation failed: {message}")]
    Translation { message: String },

    /// The request's cancellation token fired before the next stage boundary.
    /// A distinct outcome, not logged as an error.
    #[error("Operation cancelled")]
    Cancelled,

    /// Another request is already processing this chunk key. Retryable once
    /// the first attempt settles.
    #[error("Chunk {key} is already being processed")]
    ChunkInFlight { key: String },

    /// Terminal stage failure, wrapping the underlying cause.
    #[error("Pipeline stage {stage} failed: {source}")]
    Pipeline {
        stage: PipelineStage,
        #[source]
        source: Box<JimakuError>,
    },

    // IPC errors
    #[error("IPC socket error: {message}")]
    IpcSocket { message: String },

    #[error("IPC protocol error: {message}")]
    IpcProtocol { message: String },

    #[error("IPC connection failed: {message}")]
    IpcConnection { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, JimakuError>;

impl JimakuError {
    /// Wrap this error with the stage it occurred in.
    ///
    /// Cancellation, busy-key outcomes, and already-wrapped errors pass
    /// through untouched so they keep their own semantics.
    pub fn at_stage(self, stage: PipelineStage) -> JimakuError {
        match self {
            JimakuError::Cancelled
            | JimakuError::ChunkInFlight { .. }
            | JimakuError::Pipeline { .. } => self,
            other => JimakuError::Pipeline {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// True for the cancellation outcome, including a wrapped one.
    pub fn is_cancelled(&self) -> bool {
        match self {
            JimakuError::Cancelled => true,
            JimakuError::Pipeline { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// The failing stage, if this is a terminal pipeline failure.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            JimakuError::Pipeline { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_missing_field_display() {
        let error = JimakuError::MissingField {
            field: "source_url".to_string(),
        };
        assert_eq!(error.to_string(), "Missing required field: source_url");
    }

    #[test]
    fn test_extraction_display() {
        let error = JimakuError::Extraction {
            message: "yt-dlp exited with status 1".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Audio extraction failed: yt-dlp exited with status 1"
        );
    }

    #[test]
    fn test_model_not_found_display() {
        let error = JimakuError::ModelNotFound {
            path: "/models/ggml-base.en.bin".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Transcription model not found at /models/ggml-base.en.bin"
        );
    }

    #[test]
    fn test_pipeline_display_names_stage_and_cause() {
        let error = JimakuError::Extraction {
            message: "no output".to_string(),
        }
        .at_stage(PipelineStage::Download);
        assert_eq!(
            error.to_string(),
            "Pipeline stage download failed: Audio extraction failed: no output"
        );
    }

    #[test]
    fn test_at_stage_preserves_cancelled() {
        let error = JimakuError::Cancelled.at_stage(PipelineStage::Transcribe);
        assert!(matches!(error, JimakuError::Cancelled));
        assert!(error.is_cancelled());
    }

    #[test]
    fn test_at_stage_preserves_chunk_in_flight() {
        let error = JimakuError::ChunkInFlight {
            key: "abc@60+60".to_string(),
        }
        .at_stage(PipelineStage::Download);
        assert!(matches!(error, JimakuError::ChunkInFlight { .. }));
    }

    #[test]
    fn test_at_stage_does_not_double_wrap() {
        let error = JimakuError::Inference {
            message: "decode failed".to_string(),
        }
        .at_stage(PipelineStage::Transcribe)
        .at_stage(PipelineStage::Translate);
        assert_eq!(error.stage(), Some(PipelineStage::Transcribe));
    }

    #[test]
    fn test_stage_accessor() {
        let plain = JimakuError::Other("x".to_string());
        assert_eq!(plain.stage(), None);

        let wrapped = JimakuError::Translation {
            message: "timeout".to_string(),
        }
        .at_stage(PipelineStage::Translate);
        assert_eq!(wrapped.stage(), Some(PipelineStage::Translate));
    }

    #[test]
    fn test_pipeline_source_chain() {
        let error = JimakuError::Inference {
            message: "oom".to_string(),
        }
        .at_stage(PipelineStage::Transcribe);

        let error_trait: &dyn std::error::Error = &error;
        let source = error_trait.source();
        assert!(source.is_some());
        assert!(
            source
                .map(|s| s.to_string())
                .unwrap_or_default()
                .contains("oom")
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: JimakuError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_error = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let error: JimakuError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_stage_as_str() {
        assert_eq!(PipelineStage::Download.as_str(), "download");
        assert_eq!(PipelineStage::Transcribe.as_str(), "transcribe");
        assert_eq!(PipelineStage::Translate.as_str(), "translate");
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<JimakuError>();
        assert_sync::<JimakuError>();
    }
}
