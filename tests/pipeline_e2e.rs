//! End-to-end pipeline tests over the IPC surface.
//!
//! The external collaborators are swapped for fixtures: extraction writes
//! a canned WAV, recognition returns scripted segments, translation is a
//! deterministic mock. Everything in between — chunk keying, caching,
//! windowing, sentence assembly, orchestration, the wire protocol — runs
//! for real.

use jimaku::chunk::extractor::{AudioExtractor, FixtureExtractor};
use jimaku::chunk::store::AudioChunkStore;
use jimaku::daemon::{DaemonState, handler::DaemonRequestHandler};
use jimaku::defaults::SAMPLE_RATE;
use jimaku::ipc::client::send_request;
use jimaku::ipc::protocol::{Request, Response};
use jimaku::ipc::server::IpcServer;
use jimaku::pipeline::orchestrator::PipelineOrchestrator;
use jimaku::stt::engine::TranscriptionEngine;
use jimaku::stt::recognizer::{MockRecognizer, RawRecognitionSegment};
use jimaku::translate::client::{MockTranslator, Translator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Notify;

/// A WAV payload large enough to clear the cache viability floor.
fn fixture_wav(secs: u32) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
    for _ in 0..(secs * SAMPLE_RATE) {
        writer.write_sample(100i16).unwrap();
    }
    writer.finalize().unwrap();
    cursor.into_inner()
}

/// Recognizer scripted to produce exactly three sentences after assembly.
fn three_sentence_recognizer() -> MockRecognizer {
    MockRecognizer::new("fixture-model").with_segments(vec![
        RawRecognitionSegment::new("Hello everyone.", 0.2, 1.4),
        RawRecognitionSegment::new("Today we are going", 1.5, 2.6),
        RawRecognitionSegment::new("to learn about AI.", 2.7, 3.8),
        RawRecognitionSegment::new("Let's get started.", 4.0, 5.5),
    ])
}

struct TestDaemon {
    socket_path: PathBuf,
    extractor: Arc<FixtureExtractor>,
    _temp_dir: TempDir,
}

async fn start_daemon(recognizer: MockRecognizer) -> TestDaemon {
    let temp_dir = TempDir::new().unwrap();
    let socket_path = temp_dir.path().join("jimaku-test.sock");
    let cache_dir = temp_dir.path().join("chunks");

    let extractor = Arc::new(FixtureExtractor::new(fixture_wav(10)));
    let store = Arc::new(AudioChunkStore::new(
        cache_dir.clone(),
        extractor.clone() as Arc<dyn AudioExtractor>,
    ));
    let engine = Arc::new(TranscriptionEngine::new(Arc::new(recognizer)));
    let translator = Arc::new(MockTranslator::new()) as Arc<dyn Translator>;

    let state = DaemonState {
        orchestrator: Arc::new(PipelineOrchestrator::new(store, engine, translator)),
        cache_dir,
        shutdown: Arc::new(Notify::new()),
    };
    let handler = DaemonRequestHandler::new(state, true, 0);

    let server_socket = socket_path.clone();
    tokio::spawn(async move {
        let server = IpcServer::new(server_socket).unwrap();
        server.start(handler).await
    });
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    TestDaemon {
        socket_path,
        extractor,
        _temp_dir: temp_dir,
    }
}

fn process_request(url: &str, start: u32, duration: u32) -> Request {
    Request::Process {
        source_url: Some(url.to_string()),
        start_offset_secs: Some(start),
        duration_secs: Some(duration),
    }
}

async fn process(daemon: &TestDaemon, url: &str, start: u32, duration: u32) -> Response {
    send_request(&daemon.socket_path, process_request(url, start, duration))
        .await
        .unwrap()
}

#[tokio::test]
async fn chunk_request_yields_three_ordered_segments() {
    let daemon = start_daemon(three_sentence_recognizer()).await;

    let response = process(&daemon, "https://youtu.be/fixture", 60, 60).await;

    let Response::Segments { segments, status } = response else {
        panic!("expected Segments response, got {:?}", response);
    };

    assert_eq!(status, "ok");
    assert_eq!(segments.len(), 3);

    // Segments come back in sentence emission order with dense ids
    for (index, segment) in segments.iter().enumerate() {
        assert_eq!(segment.id, index as u32);
        assert!(!segment.target_text.is_empty());
        assert!(!segment.source_script.is_empty());
    }

    // Sentence merge happened: the two fragments became one sentence
    assert_eq!(segments[1].target_text, "Today we are going to learn about AI.");

    // Timestamps are shifted by the window offset
    assert!(segments[0].start_secs >= 60.0);
    assert!(segments[2].end_secs <= 120.0);
}

#[tokio::test]
async fn missing_source_url_is_rejected_before_any_work() {
    let daemon = start_daemon(three_sentence_recognizer()).await;

    let response = send_request(
        &daemon.socket_path,
        Request::Process {
            source_url: None,
            start_offset_secs: None,
            duration_secs: None,
        },
    )
    .await
    .unwrap();

    let Response::Error {
        kind,
        code,
        message,
        ..
    } = response
    else {
        panic!("expected Error response, got {:?}", response);
    };

    assert_eq!(kind, "validation");
    assert_eq!(code, 400);
    assert!(message.contains("source_url"));
    assert_eq!(daemon.extractor.calls(), 0);
}

#[tokio::test]
async fn repeat_request_is_served_from_cache() {
    let daemon = start_daemon(three_sentence_recognizer()).await;

    let first = process(&daemon, "https://youtu.be/fixture", 0, 60).await;
    let second = process(&daemon, "https://youtu.be/fixture", 0, 60).await;

    assert!(matches!(first, Response::Segments { .. }));
    assert!(matches!(second, Response::Segments { .. }));
    // One extraction, two full answers
    assert_eq!(daemon.extractor.calls(), 1);
}

#[tokio::test]
async fn distinct_windows_complete_independently() {
    let daemon = start_daemon(three_sentence_recognizer()).await;

    // Out-of-order windows: later window requested first
    let late = process(&daemon, "https://youtu.be/fixture", 120, 60).await;
    let early = process(&daemon, "https://youtu.be/fixture", 0, 60).await;

    let Response::Segments { segments: late, .. } = late else {
        panic!("expected Segments");
    };
    let Response::Segments { segments: early, .. } = early else {
        panic!("expected Segments");
    };

    assert_eq!(daemon.extractor.calls(), 2);
    assert!(late[0].start_secs >= 120.0);
    assert!(early[0].start_secs < 60.0);
}

#[tokio::test]
async fn silent_window_yields_empty_segment_list() {
    // Recognizer that hears nothing
    let daemon = start_daemon(MockRecognizer::new("fixture-model")).await;

    let response = process(&daemon, "https://youtu.be/fixture", 0, 60).await;

    let Response::Segments { segments, status } = response else {
        panic!("expected Segments response, got {:?}", response);
    };
    assert_eq!(status, "ok");
    assert!(segments.is_empty());
}

#[tokio::test]
async fn garbage_recognition_is_filtered_out() {
    let recognizer = MockRecognizer::new("fixture-model").with_segments(vec![
        RawRecognitionSegment::new("Hello.", 0.0, 1.0),
        RawRecognitionSegment::new("!!!!!", 1.0, 2.0),
        RawRecognitionSegment::new("[BLANK_AUDIO]", 2.0, 3.0),
        RawRecognitionSegment::new(".", 3.0, 4.0),
    ]);
    let daemon = start_daemon(recognizer).await;

    let response = process(&daemon, "https://youtu.be/fixture", 0, 60).await;

    let Response::Segments { segments, .. } = response else {
        panic!("expected Segments response");
    };
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].target_text, "Hello.");
}

#[tokio::test]
async fn recognition_failure_surfaces_transcribe_stage() {
    let daemon = start_daemon(MockRecognizer::new("fixture-model").with_failure()).await;

    let response = process(&daemon, "https://youtu.be/fixture", 0, 60).await;

    let Response::Error { kind, stage, .. } = response else {
        panic!("expected Error response, got {:?}", response);
    };
    assert_eq!(kind, "pipeline");
    assert_eq!(stage.as_deref(), Some("transcribe"));

    // The key was released on failure, so the retry runs (and fails at
    // the same stage) instead of bouncing off the in-flight lock
    let retry = process(&daemon, "https://youtu.be/fixture", 0, 60).await;
    assert!(matches!(
        retry,
        Response::Error { ref kind, .. } if kind == "pipeline"
    ));
}

#[tokio::test]
async fn status_reports_model_and_idle_state() {
    let daemon = start_daemon(three_sentence_recognizer()).await;

    let response = send_request(&daemon.socket_path, Request::Status)
        .await
        .unwrap();

    let Response::Status {
        model_name,
        in_flight,
        cache_dir,
    } = response
    else {
        panic!("expected Status response, got {:?}", response);
    };

    assert_eq!(model_name, "fixture-model");
    assert_eq!(in_flight, 0);
    assert!(Path::new(&cache_dir).ends_with("chunks"));
}

#[tokio::test]
async fn concurrent_duplicate_requests_trigger_one_extraction() {
    let daemon = start_daemon(three_sentence_recognizer()).await;

    // Fire the same chunk request from several clients at once. Exactly one
    // claims the key; the rest get the busy rejection or (after the winner
    // finishes) a cached answer. Extraction must not run twice.
    let mut handles = Vec::new();
    for _ in 0..4 {
        let socket_path = daemon.socket_path.clone();
        handles.push(tokio::spawn(async move {
            send_request(
                &socket_path,
                Request::Process {
                    source_url: Some("https://youtu.be/fixture".to_string()),
                    start_offset_secs: Some(0),
                    duration_secs: Some(60),
                },
            )
            .await
            .unwrap()
        }));
    }

    let mut segment_responses = 0;
    let mut busy_responses = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Response::Segments { segments, .. } => {
                segment_responses += 1;
                assert_eq!(segments.len(), 3);
            }
            Response::Error { kind, code, .. } => {
                assert_eq!(kind, "busy");
                assert_eq!(code, 409);
                busy_responses += 1;
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    assert!(segment_responses >= 1);
    assert_eq!(segment_responses + busy_responses, 4);
    assert_eq!(daemon.extractor.calls(), 1);
}
