//! Model download and installation management.
//!
//! Downloads Whisper models from HuggingFace, verifies integrity when a
//! checksum is known, and stores them in the user's cache directory.

use crate::error::{JimakuError, Result};
use crate::models::catalog::get_model;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use sha1::{Digest, Sha1};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Get the directory where models are stored.
///
/// Uses `~/.cache/jimaku/models/` on Linux/Unix.
pub fn models_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("jimaku")
        .join("models")
}

/// Get the full path for a model file.
///
/// Always returns a path regardless of whether the model is in the catalog.
/// The file may or may not exist on disk.
pub fn model_path(name: &str) -> PathBuf {
    models_dir().join(format!("ggml-{}.bin", name.trim()))
}

/// Check if a model is installed.
pub fn is_model_installed(name: &str) -> bool {
    model_path(name).exists()
}

/// Download a model by name into the cache directory.
///
/// # Errors
/// Returns an error when the model is not in the catalog, the download
/// fails, or the checksum (when known) doesn't match.
pub async fn download_model(name: &str, progress: bool) -> Result<PathBuf> {
    let model = get_model(name).ok_or_else(|| {
        JimakuError::Other(format!(
            "Model '{}' not in catalog. Run `jimaku models list` for supported names.",
            name
        ))
    })?;

    let output_path = model_path(model.name);

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| JimakuError::Other(format!("Failed to create models directory: {e}")))?;
    }

    if progress {
        eprintln!("Downloading {} ({} MB)...", model.name, model.size_mb);
    }

    let client = reqwest::Client::new();
    let response = client
        .get(model.url)
        .send()
        .await
        .map_err(|e| JimakuError::Other(format!("Failed to start download: {e}")))?;

    if !response.status().is_success() {
        return Err(JimakuError::Other(format!(
            "Download failed with status: {}",
            response.status()
        )));
    }

    let total_size = response.content_length().unwrap_or(0);

    let bar = if progress {
        let bar = ProgressBar::new(total_size);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        Some(bar)
    } else {
        None
    };

    // Stream to disk, hashing as we go
    let mut hasher = Sha1::new();
    let mut stream = response.bytes_stream();
    let mut file = fs::File::create(&output_path)
        .map_err(|e| JimakuError::Other(format!("Failed to create output file: {e}")))?;

    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| JimakuError::Other(format!("Failed to read download chunk: {e}")))?;

        file.write_all(&chunk)
            .map_err(|e| JimakuError::Other(format!("Failed to write to file: {e}")))?;

        hasher.update(&chunk);

        if let Some(ref bar) = bar {
            bar.inc(chunk.len() as u64);
        }
    }

    if let Some(bar) = bar {
        bar.finish_with_message("Downloaded");
    }

    if !model.sha1.is_empty() {
        let calculated = format!("{:x}", hasher.finalize());
        if calculated != model.sha1 {
            if let Err(e) = fs::remove_file(&output_path) {
                eprintln!("jimaku: failed to remove corrupted download: {e}");
            }
            return Err(JimakuError::Other(format!(
                "Checksum mismatch for '{}': expected {}, got {}",
                model.name, model.sha1, calculated
            )));
        }
    }

    Ok(output_path)
}

/// Resolve a model to an on-disk path, downloading it first when missing
/// and allowed.
///
/// # Errors
/// Returns `JimakuError::ModelNotFound` when the model is missing and
/// `no_download` forbids fetching it.
pub async fn ensure_model(name: &str, no_download: bool, quiet: bool) -> Result<PathBuf> {
    if is_model_installed(name) {
        return Ok(model_path(name));
    }

    if no_download {
        return Err(JimakuError::ModelNotFound {
            path: model_path(name).to_string_lossy().to_string(),
        });
    }

    if !quiet {
        eprintln!("Model '{}' not installed.", name);
    }
    download_model(name, !quiet).await
}
