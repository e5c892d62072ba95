//! Audio extraction seam.
//!
//! The store talks to a pluggable [`AudioExtractor`] so the rest of the
//! pipeline never sees the external tool's argument syntax. The production
//! implementation shells out to yt-dlp; tests inject a fixture-backed fake.

use crate::error::{JimakuError, Result};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Extracts one time window of a source's audio track to a WAV file.
#[async_trait::async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Extract the `[start, start+duration)` window of `source_url`'s audio
    /// into `output` as a decodable WAV file. The file must exist on success.
    ///
    /// # Errors
    /// Returns `JimakuError::ExtractorNotFound` if the tool binary is missing.
    /// Returns `JimakuError::Extraction` if the tool exits non-zero or
    /// produces no output.
    async fn extract(
        &self,
        source_url: &str,
        start_secs: u32,
        duration_secs: u32,
        output: &Path,
    ) -> Result<()>;

    /// Name of the underlying tool, for diagnostics.
    fn tool_name(&self) -> &str;
}

/// Production extractor that shells out to yt-dlp.
pub struct YtDlpExtractor {
    tool: String,
    verbosity: u8,
}

impl YtDlpExtractor {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            verbosity: 0,
        }
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }
}

#[async_trait::async_trait]
impl AudioExtractor for YtDlpExtractor {
    async fn extract(
        &self,
        source_url: &str,
        start_secs: u32,
        duration_secs: u32,
        output: &Path,
    ) -> Result<()> {
        // yt-dlp substitutes %(ext)s in the output template; handing it the
        // final .wav name directly would double the extension after the
        // audio post-processing step.
        let template = output.with_extension("%(ext)s");
        let section = format!("*{}-{}", start_secs, start_secs + duration_secs);

        let mut command = tokio::process::Command::new(&self.tool);
        command
            .arg("-x")
            .args(["--audio-format", "wav"])
            .arg("--no-playlist")
            .arg("--force-overwrites")
            .args(["--download-sections", &section])
            .arg("--force-keyframes-at-cuts")
            .arg("-o")
            .arg(&template)
            .arg(source_url);

        if self.verbosity >= 2 {
            eprintln!("jimaku: running {:?}", command.as_std());
        }

        let result = command.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                JimakuError::ExtractorNotFound {
                    tool: self.tool.clone(),
                }
            } else {
                JimakuError::Extraction {
                    message: format!("failed to run {}: {}", self.tool, e),
                }
            }
        })?;

        if !result.status.success() {
            return Err(JimakuError::Extraction {
                message: format!(
                    "{} exited with {}: {}",
                    self.tool,
                    result.status,
                    last_stderr_line(&result.stderr)
                ),
            });
        }

        if !output.exists() {
            return Err(JimakuError::Extraction {
                message: format!(
                    "{} reported success but produced no output at {}",
                    self.tool,
                    output.display()
                ),
            });
        }

        Ok(())
    }

    fn tool_name(&self) -> &str {
        &self.tool
    }
}

/// Last non-empty stderr line; yt-dlp puts the actual error there.
fn last_stderr_line(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("(no stderr)")
        .to_string()
}

/// Fixture-backed extractor for tests: writes a canned payload instead of
/// invoking an external tool, and counts invocations so dedup and cache
/// behavior can be asserted.
pub struct FixtureExtractor {
    payload: Vec<u8>,
    should_fail: bool,
    calls: AtomicUsize,
}

impl FixtureExtractor {
    /// Create a fixture extractor that writes `payload` to the output path.
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            should_fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Configure the fixture to fail every extraction.
    pub fn failing() -> Self {
        Self {
            payload: Vec::new(),
            should_fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of extract calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AudioExtractor for FixtureExtractor {
    async fn extract(
        &self,
        _source_url: &str,
        _start_secs: u32,
        _duration_secs: u32,
        output: &Path,
    ) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.should_fail {
            return Err(JimakuError::Extraction {
                message: "fixture extraction failure".to_string(),
            });
        }

        tokio::fs::write(output, &self.payload)
            .await
            .map_err(JimakuError::Io)?;
        Ok(())
    }

    fn tool_name(&self) -> &str {
        "fixture"
    }
}
