//! Request handler implementation for the daemon.

use crate::daemon::DaemonState;
use crate::defaults::DEFAULT_CHUNK_SECS;
use crate::error::JimakuError;
use crate::ipc::protocol::{Request, Response};
use crate::ipc::server::RequestHandler;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Handles IPC requests against the shared pipeline stack.
pub struct DaemonRequestHandler {
    state: Arc<DaemonState>,
    quiet: bool,
    verbosity: u8,
}

impl DaemonRequestHandler {
    pub fn new(state: DaemonState, quiet: bool, verbosity: u8) -> Self {
        Self {
            state: Arc::new(state),
            quiet,
            verbosity,
        }
    }

    /// Validate and run one chunk request. A missing source URL is rejected
    /// before any pipeline stage is touched.
    async fn process(
        &self,
        source_url: Option<String>,
        start_offset_secs: Option<u32>,
        duration_secs: Option<u32>,
        cancel: CancellationToken,
    ) -> Response {
        let Some(source_url) = source_url.filter(|url| !url.trim().is_empty()) else {
            return Response::from_error(&JimakuError::MissingField {
                field: "source_url".to_string(),
            });
        };

        let start = start_offset_secs.unwrap_or(0);
        let duration = duration_secs.unwrap_or(DEFAULT_CHUNK_SECS);
        if duration == 0 {
            return Response::from_error(&JimakuError::InvalidRequest {
                message: "duration_secs must be positive".to_string(),
            });
        }

        match self
            .state
            .orchestrator
            .process_chunk(&source_url, start, duration, &cancel)
            .await
        {
            Ok(segments) => {
                if self.verbosity >= 1 {
                    eprintln!(
                        "jimaku: {} segment(s) for {} [{}s..{}s]",
                        segments.len(),
                        source_url,
                        start,
                        start + duration
                    );
                }
                Response::Segments {
                    segments,
                    status: "ok".to_string(),
                }
            }
            Err(error) => {
                if !self.quiet && !error.is_cancelled() {
                    eprintln!("jimaku: chunk failed: {}", error);
                }
                Response::from_error(&error)
            }
        }
    }

    fn status(&self) -> Response {
        Response::Status {
            model_name: self.state.orchestrator.model_name().to_string(),
            in_flight: self.state.orchestrator.in_flight_count(),
            cache_dir: self.state.cache_dir.to_string_lossy().to_string(),
        }
    }
}

#[async_trait::async_trait]
impl RequestHandler for DaemonRequestHandler {
    async fn handle(&self, request: Request, cancel: CancellationToken) -> Response {
        match request {
            Request::Process {
                source_url,
                start_offset_secs,
                duration_secs,
            } => {
                self.process(source_url, start_offset_secs, duration_secs, cancel)
                    .await
            }
            Request::Status => self.status(),
            Request::Shutdown => {
                self.state.shutdown.notify_one();
                Response::Ok
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::extractor::{AudioExtractor, FixtureExtractor};
    use crate::chunk::store::AudioChunkStore;
    use crate::defaults::SAMPLE_RATE;
    use crate::pipeline::orchestrator::PipelineOrchestrator;
    use crate::stt::engine::TranscriptionEngine;
    use crate::stt::recognizer::{MockRecognizer, RawRecognitionSegment};
    use crate::translate::client::{MockTranslator, Translator};
    use tempfile::TempDir;
    use tokio::sync::Notify;

    fn fixture_wav() -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..SAMPLE_RATE {
            writer.write_sample(100i16).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    fn create_test_handler(temp_dir: &TempDir) -> (DaemonRequestHandler, Arc<FixtureExtractor>) {
        let extractor = Arc::new(FixtureExtractor::new(fixture_wav()));
        let store = Arc::new(AudioChunkStore::new(
            temp_dir.path().join("chunks"),
            extractor.clone() as Arc<dyn AudioExtractor>,
        ));
        let engine = Arc::new(TranscriptionEngine::new(Arc::new(
            MockRecognizer::new("mock-daemon-model").with_segments(vec![
                RawRecognitionSegment::new("One.", 0.0, 1.0),
                RawRecognitionSegment::new("Two.", 1.0, 2.0),
            ]),
        )));
        let translator = Arc::new(MockTranslator::new()) as Arc<dyn Translator>;

        let state = DaemonState {
            orchestrator: Arc::new(PipelineOrchestrator::new(store, engine, translator)),
            cache_dir: temp_dir.path().join("chunks"),
            shutdown: Arc::new(Notify::new()),
        };

        (DaemonRequestHandler::new(state, true, 0), extractor)
    }

    #[tokio::test]
    async fn test_handler_status() {
        let temp_dir = TempDir::new().unwrap();
        let (handler, _) = create_test_handler(&temp_dir);

        let response = handler
            .handle(Request::Status, CancellationToken::new())
            .await;

        match response {
            Response::Status {
                model_name,
                in_flight,
                cache_dir,
            } => {
                assert_eq!(model_name, "mock-daemon-model");
                assert_eq!(in_flight, 0);
                assert!(cache_dir.contains("chunks"));
            }
            _ => panic!("Expected Status response"),
        }
    }

    #[tokio::test]
    async fn test_handler_process_happy_path() {
        let temp_dir = TempDir::new().unwrap();
        let (handler, _) = create_test_handler(&temp_dir);

        let response = handler
            .handle(
                Request::Process {
                    source_url: Some("https://youtu.be/abc".to_string()),
                    start_offset_secs: Some(60),
                    duration_secs: Some(60),
                },
                CancellationToken::new(),
            )
            .await;

        match response {
            Response::Segments { segments, status } => {
                assert_eq!(status, "ok");
                assert_eq!(segments.len(), 2);
                assert_eq!(segments[0].target_text, "One.");
            }
            other => panic!("Expected Segments response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_handler_missing_url_is_validation_error_without_downstream_calls() {
        let temp_dir = TempDir::new().unwrap();
        let (handler, extractor) = create_test_handler(&temp_dir);

        let response = handler
            .handle(
                Request::Process {
                    source_url: None,
                    start_offset_secs: None,
                    duration_secs: None,
                },
                CancellationToken::new(),
            )
            .await;

        match response {
            Response::Error {
                kind,
                code,
                message,
                ..
            } => {
                assert_eq!(kind, "validation");
                assert_eq!(code, 400);
                assert!(message.contains("source_url"));
            }
            other => panic!("Expected Error response, got {:?}", other),
        }
        // Validation short-circuits: nothing downstream ran
        assert_eq!(extractor.calls(), 0);
    }

    #[tokio::test]
    async fn test_handler_blank_url_is_validation_error() {
        let temp_dir = TempDir::new().unwrap();
        let (handler, _) = create_test_handler(&temp_dir);

        let response = handler
            .handle(
                Request::Process {
                    source_url: Some("   ".to_string()),
                    start_offset_secs: None,
                    duration_secs: None,
                },
                CancellationToken::new(),
            )
            .await;

        assert!(matches!(
            response,
            Response::Error { ref kind, .. } if kind == "validation"
        ));
    }

    #[tokio::test]
    async fn test_handler_zero_duration_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let (handler, extractor) = create_test_handler(&temp_dir);

        let response = handler
            .handle(
                Request::Process {
                    source_url: Some("https://youtu.be/abc".to_string()),
                    start_offset_secs: None,
                    duration_secs: Some(0),
                },
                CancellationToken::new(),
            )
            .await;

        assert!(matches!(
            response,
            Response::Error { ref kind, .. } if kind == "validation"
        ));
        assert_eq!(extractor.calls(), 0);
    }

    #[tokio::test]
    async fn test_handler_shutdown_notifies() {
        let temp_dir = TempDir::new().unwrap();
        let (handler, _) = create_test_handler(&temp_dir);
        let shutdown = Arc::clone(&handler.state.shutdown);

        let notified = tokio::spawn(async move { shutdown.notified().await });
        tokio::task::yield_now().await;

        let response = handler
            .handle(Request::Shutdown, CancellationToken::new())
            .await;
        assert_eq!(response, Response::Ok);

        tokio::time::timeout(std::time::Duration::from_secs(1), notified)
            .await
            .expect("shutdown notification should fire")
            .unwrap();
    }

    #[tokio::test]
    async fn test_handler_cancelled_request_reports_cancelled() {
        let temp_dir = TempDir::new().unwrap();
        let (handler, extractor) = create_test_handler(&temp_dir);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let response = handler
            .handle(
                Request::Process {
                    source_url: Some("https://youtu.be/abc".to_string()),
                    start_offset_secs: None,
                    duration_secs: None,
                },
                cancel,
            )
            .await;

        assert!(matches!(
            response,
            Response::Error { ref kind, code: 499, .. } if kind == "cancelled"
        ));
        assert_eq!(extractor.calls(), 0);
    }
}
