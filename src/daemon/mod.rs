//! Daemon mode for jimaku - builds the pipeline stack once and serves IPC.

pub mod handler;

use crate::chunk::extractor::YtDlpExtractor;
use crate::chunk::store::AudioChunkStore;
use crate::config::Config;
use crate::error::{JimakuError, Result};
use crate::ipc::server::IpcServer;
use crate::models::download::ensure_model;
use crate::pipeline::orchestrator::PipelineOrchestrator;
use crate::stt::engine::TranscriptionEngine;
use crate::translate::client::OllamaTranslator;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;

/// Shared daemon state handed to the request handler.
pub struct DaemonState {
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub cache_dir: PathBuf,
    /// Fired by a Shutdown request; the daemon loop selects on it.
    pub shutdown: Arc<Notify>,
}

/// Build the full pipeline stack from configuration.
///
/// The recognition model is provisioned (downloaded when allowed) and
/// loaded into the process-wide engine before the daemon accepts work, so
/// the first request doesn't pay the warm-up.
pub async fn build_orchestrator(
    config: &Config,
    quiet: bool,
    verbosity: u8,
    no_download: bool,
) -> Result<Arc<PipelineOrchestrator>> {
    if !quiet {
        eprintln!("Loading model '{}'...", config.stt.model);
    }

    let model_path = ensure_model(&config.stt.model, no_download, quiet).await?;
    let engine =
        TranscriptionEngine::shared(&model_path, &config.stt.language, config.stt.threads)?;

    if !quiet {
        eprintln!("Model loaded successfully.");
    }

    let extractor =
        Arc::new(YtDlpExtractor::new(&config.extraction.tool).with_verbosity(verbosity));
    let store = Arc::new(AudioChunkStore::new(
        config.extraction.resolved_cache_dir(),
        extractor,
    ));
    let translator = Arc::new(OllamaTranslator::new(&config.translation)?.with_verbosity(verbosity));

    Ok(Arc::new(
        PipelineOrchestrator::new(store, engine, translator).with_verbosity(verbosity),
    ))
}

/// Run the daemon: load the model, start the IPC server, wait for shutdown.
///
/// Returns Ok(()) on graceful shutdown (signal or Shutdown request).
pub async fn run_daemon(
    config: Config,
    socket_path: Option<PathBuf>,
    quiet: bool,
    verbosity: u8,
    no_download: bool,
) -> Result<()> {
    let orchestrator = build_orchestrator(&config, quiet, verbosity, no_download).await?;
    let cache_dir = config.extraction.resolved_cache_dir();
    let shutdown = Arc::new(Notify::new());

    let state = DaemonState {
        orchestrator,
        cache_dir,
        shutdown: Arc::clone(&shutdown),
    };

    let socket_path = socket_path.unwrap_or_else(IpcServer::default_socket_path);
    let server = Arc::new(IpcServer::new(socket_path)?);

    if !quiet {
        eprintln!(
            "IPC server listening at: {}",
            server.socket_path().display()
        );
        eprintln!("Daemon ready.");
    }

    let request_handler = handler::DaemonRequestHandler::new(state, quiet, verbosity);

    let server_clone = Arc::clone(&server);
    let server_handle = tokio::spawn(async move { server_clone.start(request_handler).await });

    // Wait for SIGINT, SIGTERM, or a Shutdown request
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            if !quiet {
                eprintln!("\nReceived SIGINT, shutting down...");
            }
        }
        res = wait_for_sigterm() => {
            if let Err(e) = res {
                eprintln!("Error setting up signal handler: {}", e);
            }
            if !quiet {
                eprintln!("\nReceived SIGTERM, shutting down...");
            }
        }
        _ = shutdown.notified() => {
            if !quiet {
                eprintln!("Shutdown requested, shutting down...");
            }
        }
    }

    server.stop().await?;

    if let Err(e) = server_handle.await {
        eprintln!("jimaku: daemon server task failed: {e}");
    }

    if !quiet {
        eprintln!("Daemon stopped.");
    }

    Ok(())
}

/// Wait for SIGTERM signal (used by systemd).
#[cfg(unix)]
async fn wait_for_sigterm() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| JimakuError::Other(format!("Failed to register SIGTERM handler: {}", e)))?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> Result<()> {
    // On non-Unix, just wait forever (Ctrl+C will still work)
    std::future::pending::<()>().await
}
