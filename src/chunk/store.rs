//! Cache-or-fetch resolution of chunk audio artifacts.

use crate::chunk::extractor::AudioExtractor;
use crate::chunk::key::ChunkKey;
use crate::defaults::MIN_ARTIFACT_BYTES;
use crate::error::{JimakuError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A decodable audio file for one chunk, owned by the store.
///
/// Valid only when `size_bytes` exceeds the minimum-viability floor; the
/// store never hands out undersized artifacts. Retained indefinitely as
/// cache — eviction is out of scope.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
    pub size_bytes: u64,
}

/// Resolves a (source, window) key to a local audio artifact.
///
/// Cache hits are served from disk; misses invoke the extraction
/// collaborator and write to a path derived from the chunk key, so
/// subsequent calls for the same key hit cache. Content for a given key is
/// deterministic, so concurrent writers racing on the same path are
/// harmless (last writer wins).
pub struct AudioChunkStore {
    cache_dir: PathBuf,
    extractor: Arc<dyn AudioExtractor>,
}

impl AudioChunkStore {
    pub fn new(cache_dir: PathBuf, extractor: Arc<dyn AudioExtractor>) -> Self {
        Self {
            cache_dir,
            extractor,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Resolve a source URL and window to a cached or freshly extracted
    /// artifact.
    ///
    /// # Errors
    /// Returns `JimakuError::Cancelled` if the token fires before extraction
    /// starts. Returns `JimakuError::Extraction` if the collaborator fails
    /// or its output stays under the viability floor.
    pub async fn resolve(
        &self,
        source_url: &str,
        start_secs: u32,
        duration_secs: u32,
        cancel: &CancellationToken,
    ) -> Result<AudioArtifact> {
        let key = ChunkKey::derive(source_url, start_secs, duration_secs);
        self.resolve_key(&key, source_url, cancel).await
    }

    /// Resolve an already-derived chunk key.
    pub async fn resolve_key(
        &self,
        key: &ChunkKey,
        source_url: &str,
        cancel: &CancellationToken,
    ) -> Result<AudioArtifact> {
        let path = self.cache_dir.join(key.file_name());

        // A cached file is accepted only above the viability floor and only
        // if it still probes as WAV; anything else is re-fetched.
        if is_viable(&path)
            && let Ok(artifact) = probe(&path)
        {
            return Ok(artifact);
        }

        if cancel.is_cancelled() {
            return Err(JimakuError::Cancelled);
        }

        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(JimakuError::Io)?;

        self.extractor
            .extract(source_url, key.start_secs(), key.duration_secs(), &path)
            .await?;

        if !is_viable(&path) {
            return Err(JimakuError::Extraction {
                message: format!(
                    "extracted artifact for {} is missing or under {} bytes",
                    key.label(),
                    MIN_ARTIFACT_BYTES
                ),
            });
        }

        probe(&path)
    }
}

/// True when the file exists and exceeds the minimum-viability threshold.
fn is_viable(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|m| m.len() > MIN_ARTIFACT_BYTES)
}

/// Read the WAV header and build the artifact descriptor.
fn probe(path: &Path) -> Result<AudioArtifact> {
    let size_bytes = std::fs::metadata(path).map(|m| m.len())?;
    let reader = hound::WavReader::open(path).map_err(|e| JimakuError::Extraction {
        message: format!("artifact at {} is not decodable: {}", path.display(), e),
    })?;
    let spec = reader.spec();

    Ok(AudioArtifact {
        path: path.to_path_buf(),
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        size_bytes,
    })
}
