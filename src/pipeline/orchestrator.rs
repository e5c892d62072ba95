//! Per-chunk pipeline orchestration: dedup, stage sequencing, cancellation
//! propagation, and response assembly.

use crate::assemble::SentenceAssembler;
use crate::chunk::key::ChunkKey;
use crate::chunk::store::AudioChunkStore;
use crate::error::{JimakuError, PipelineStage, Result};
use crate::stt::engine::TranscriptionEngine;
use crate::translate::client::Translator;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// One aligned, time-bounded subtitle unit. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleSegment {
    /// Position within the chunk, matching sentence emission order.
    pub id: u32,
    /// Absolute time in the source, seconds.
    pub start_secs: f32,
    pub end_secs: f32,
    pub source_script: String,
    pub reading: String,
    pub target_text: String,
}

/// Where a chunk key currently sits in its processing lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Pending,
    Downloading,
    Transcribing,
    Translating,
    Ready,
    Failed,
    Cancelled,
}

impl std::fmt::Display for ChunkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChunkState::Pending => "pending",
            ChunkState::Downloading => "downloading",
            ChunkState::Transcribing => "transcribing",
            ChunkState::Translating => "translating",
            ChunkState::Ready => "ready",
            ChunkState::Failed => "failed",
            ChunkState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

type InFlightMap = Arc<Mutex<HashMap<ChunkKey, ChunkState>>>;

/// Coordinates the pipeline stages for one chunk request.
///
/// A key is claimed with an atomic check-and-insert before any work starts,
/// so two concurrent requests for the same key can't both trigger
/// extraction; the claim is released when the attempt settles (success,
/// failure, or cancellation) so callers can retry. Stages run strictly in
/// order, with cancellation checked at every stage boundary and before each
/// per-sentence translation. Sentences translate one at a time, preserving
/// emission order in the output.
pub struct PipelineOrchestrator {
    store: Arc<AudioChunkStore>,
    engine: Arc<TranscriptionEngine>,
    translator: Arc<dyn Translator>,
    assembler: SentenceAssembler,
    in_flight: InFlightMap,
    verbosity: u8,
}

impl PipelineOrchestrator {
    pub fn new(
        store: Arc<AudioChunkStore>,
        engine: Arc<TranscriptionEngine>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            store,
            engine,
            translator,
            assembler: SentenceAssembler::new(),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            verbosity: 0,
        }
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Number of chunk keys currently being processed.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn model_name(&self) -> &str {
        self.engine.model_name()
    }

    /// Run the full pipeline for one chunk and return its subtitle
    /// segments in sentence order.
    ///
    /// # Errors
    /// - `JimakuError::ChunkInFlight` if the key is already being processed
    /// - `JimakuError::Cancelled` if the token fires at a stage boundary
    /// - `JimakuError::Pipeline` for terminal download/transcription
    ///   failures (per-sentence translation failures degrade to fallback
    ///   results instead)
    pub async fn process_chunk(
        &self,
        source_url: &str,
        start_secs: u32,
        duration_secs: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<SubtitleSegment>> {
        let key = ChunkKey::derive(source_url, start_secs, duration_secs);
        let guard = self.claim(key.clone())?;

        if cancel.is_cancelled() {
            guard.set(ChunkState::Cancelled);
            return Err(JimakuError::Cancelled);
        }

        self.trace(&key, "downloading");
        guard.set(ChunkState::Downloading);
        let artifact = self
            .store
            .resolve_key(&key, source_url, cancel)
            .await
            .map_err(|e| settle(&guard, e, PipelineStage::Download))?;

        if cancel.is_cancelled() {
            guard.set(ChunkState::Cancelled);
            return Err(JimakuError::Cancelled);
        }

        self.trace(&key, "transcribing");
        guard.set(ChunkState::Transcribing);
        let raw_segments = self
            .engine
            .transcribe(&artifact, cancel)
            .await
            .map_err(|e| settle(&guard, e, PipelineStage::Transcribe))?;

        if cancel.is_cancelled() {
            guard.set(ChunkState::Cancelled);
            return Err(JimakuError::Cancelled);
        }

        self.trace(&key, "translating");
        guard.set(ChunkState::Translating);
        let sentences = self.assembler.assemble(&raw_segments);

        let mut segments = Vec::with_capacity(sentences.len());
        for (index, sentence) in sentences.iter().enumerate() {
            if cancel.is_cancelled() {
                guard.set(ChunkState::Cancelled);
                return Err(JimakuError::Cancelled);
            }

            let translation = self
                .translator
                .translate(sentence, cancel)
                .await
                .map_err(|e| settle(&guard, e, PipelineStage::Translate))?;

            segments.push(SubtitleSegment {
                id: index as u32,
                start_secs: start_secs as f32 + sentence.start_secs,
                end_secs: start_secs as f32 + sentence.end_secs,
                source_script: translation.source_script,
                reading: translation.reading,
                target_text: translation.target_text,
            });
        }

        guard.set(ChunkState::Ready);
        self.trace(&key, "ready");
        Ok(segments)
    }

    /// Atomically mark a key in flight. Two requests racing here see a
    /// consistent map: exactly one wins, the other gets the busy error.
    fn claim(&self, key: ChunkKey) -> Result<InFlightGuard> {
        let mut map = self
            .in_flight
            .lock()
            .map_err(|e| JimakuError::Other(format!("in-flight lock poisoned: {}", e)))?;

        if map.contains_key(&key) {
            return Err(JimakuError::ChunkInFlight { key: key.label() });
        }
        map.insert(key.clone(), ChunkState::Pending);

        Ok(InFlightGuard {
            map: Arc::clone(&self.in_flight),
            key,
        })
    }

    fn trace(&self, key: &ChunkKey, stage: &str) {
        if self.verbosity >= 1 {
            eprintln!("jimaku: chunk {} {}", key.label(), stage);
        }
    }
}

/// Record the stage a terminal failure happened in and release the claim's
/// state accordingly. Cancellation stays a distinct outcome.
fn settle(guard: &InFlightGuard, error: JimakuError, stage: PipelineStage) -> JimakuError {
    if error.is_cancelled() {
        guard.set(ChunkState::Cancelled);
        error
    } else {
        guard.set(ChunkState::Failed);
        error.at_stage(stage)
    }
}

/// RAII claim on a chunk key. Updates the key's state while processing and
/// removes the entry on drop, releasing the optimistic lock on every exit
/// path.
struct InFlightGuard {
    map: InFlightMap,
    key: ChunkKey,
}

impl InFlightGuard {
    fn set(&self, state: ChunkState) {
        if let Ok(mut map) = self.map.lock()
            && let Some(entry) = map.get_mut(&self.key)
        {
            *entry = state;
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut map) = self.map.lock() {
            map.remove(&self.key);
        }
    }
}
