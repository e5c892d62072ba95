//! Command-line interface for jimaku
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Chunked video transcription and translation for language-learning subtitles
#[derive(Parser, Debug)]
#[command(
    name = "jimaku",
    version,
    about = "Chunked video transcription and translation for language-learning subtitles"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: stage transitions, -vv: external tool commands)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Whisper model override (default: base.en)
    #[arg(long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Prevent automatic model download if the configured model is missing
    #[arg(long, global = true)]
    pub no_download: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process one chunk of a source URL and print its subtitle segments
    Process {
        /// Video URL to process
        url: String,

        /// Window start offset in seconds
        #[arg(long, short = 's', value_name = "SECONDS", default_value = "0")]
        start: u32,

        /// Window duration in seconds
        #[arg(long, short = 'd', value_name = "SECONDS", default_value = "60")]
        duration: u32,

        /// Print segments as JSON instead of formatted lines
        #[arg(long)]
        json: bool,
    },

    /// Start the daemon (foreground process for systemd)
    Daemon {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/jimaku.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Get daemon status via IPC
    Status {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/jimaku.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Shut down the daemon via IPC
    Shutdown {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/jimaku.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Manage Whisper models
    Models {
        /// Action to perform
        #[command(subcommand)]
        action: ModelsAction,
    },

    /// Check external dependencies
    Check,

    /// Show configuration
    Config {
        /// Action to perform
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Model management actions
#[derive(Subcommand, Debug)]
pub enum ModelsAction {
    /// List supported models and their installation state
    List,
    /// Download and install a model
    Install {
        /// Model name (e.g., base.en)
        name: String,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration file path
    Path,
    /// Print the effective configuration
    Show,
}
