//! Per-sentence translation against an Ollama-compatible text endpoint.
//!
//! Ordinary translation failures never reach the caller: every sentence
//! yields a usable result, degrading to a fallback triple that reuses the
//! original text. Only cancellation propagates as an error.

use crate::assemble::Sentence;
use crate::config::TranslationConfig;
use crate::defaults::{ECHO_FAILURE_MARKER, ECHO_PREFIX_CHARS};
use crate::error::{JimakuError, Result};
use crate::translate::parse::{ParsedTranslation, parse_response};
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Structured output of translating one sentence.
///
/// `source_script` is the target-script rendering, `reading` its phonetic
/// form, and `target_text` the source-language text shown alongside them.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TranslationResult {
    pub source_script: String,
    pub reading: String,
    pub target_text: String,
}

impl TranslationResult {
    /// The triple used when translation fails: the original sentence stands
    /// in for both text fields so output is never empty.
    pub fn fallback(sentence_text: &str) -> Self {
        Self {
            source_script: sentence_text.to_string(),
            reading: String::new(),
            target_text: sentence_text.to_string(),
        }
    }
}

/// Trait for sentence translation.
///
/// This trait allows swapping implementations (real endpoint vs mock).
#[async_trait::async_trait]
pub trait Translator: Send + Sync {
    /// Translate one sentence.
    ///
    /// # Errors
    /// Only `JimakuError::Cancelled`. Every other failure mode resolves to
    /// `Ok` with the fallback triple.
    async fn translate(
        &self,
        sentence: &Sentence,
        cancel: &CancellationToken,
    ) -> Result<TranslationResult>;
}

/// Production translator speaking the Ollama `/api/generate` protocol.
pub struct OllamaTranslator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    verbosity: u8,
}

impl OllamaTranslator {
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| JimakuError::Other(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            verbosity: 0,
        })
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Fixed prompt template. Asks for both accepted reply shapes so either
    /// parses; anything else degrades to the fallback.
    fn prompt(sentence_text: &str) -> String {
        format!(
            "Translate the following English sentence to Japanese. Reply with ONLY a JSON \
             object with keys \"kanji\" (the Japanese translation), \"romaji\" (its phonetic \
             reading), and \"english\" (the original sentence), or a single line in the form \
             kanji|romaji|english. No notes, no explanations.\n\nSentence: \"{}\"",
            sentence_text
        )
    }

    /// One endpoint round trip, returning the generated text.
    async fn request(&self, prompt: String) -> Result<String> {
        let url = format!("{}/api/generate", self.endpoint);
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| JimakuError::Translation {
                message: format!("request to {} failed: {}", url, e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(JimakuError::Translation {
                message: format!("endpoint returned status {}", status),
            });
        }

        let value: serde_json::Value =
            response.json().await.map_err(|e| JimakuError::Translation {
                message: format!("failed to decode endpoint response: {}", e),
            })?;

        value
            .get("response")
            .and_then(|r| r.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| JimakuError::Translation {
                message: "endpoint response missing generated text".to_string(),
            })
    }

    /// Convert a parsed reply into the final result, applying echo
    /// detection to real translation attempts.
    pub(crate) fn finalize(sentence_text: &str, parsed: ParsedTranslation) -> TranslationResult {
        match parsed {
            ParsedTranslation::ThreeField {
                script,
                reading,
                text,
            } => {
                let mut result = TranslationResult {
                    source_script: script,
                    reading,
                    target_text: if text.is_empty() {
                        sentence_text.to_string()
                    } else {
                        text
                    },
                };

                // An untranslated reply repeats the input: if the script
                // field starts out matching the sentence, the model echoed
                // rather than translated.
                if is_echo(sentence_text, &result.source_script) {
                    result.source_script = ECHO_FAILURE_MARKER.to_string();
                    result.reading.clear();
                }

                result
            }
            ParsedTranslation::TwoField { reading, text } => TranslationResult {
                source_script: sentence_text.to_string(),
                reading,
                target_text: text,
            },
            ParsedTranslation::Unparseable => TranslationResult::fallback(sentence_text),
        }
    }
}

/// Lowercased-prefix comparison between the original sentence and the
/// produced script text.
fn is_echo(sentence_text: &str, script: &str) -> bool {
    let prefix: String = sentence_text
        .chars()
        .take(ECHO_PREFIX_CHARS)
        .collect::<String>()
        .to_lowercase();

    if prefix.trim().is_empty() {
        return false;
    }

    script.to_lowercase().contains(&prefix)
}

#[async_trait::async_trait]
impl Translator for OllamaTranslator {
    async fn translate(
        &self,
        sentence: &Sentence,
        cancel: &CancellationToken,
    ) -> Result<TranslationResult> {
        if cancel.is_cancelled() {
            return Err(JimakuError::Cancelled);
        }

        let raw = match self.request(Self::prompt(&sentence.text)).await {
            Ok(raw) => raw,
            Err(e) => {
                if self.verbosity >= 1 {
                    eprintln!("jimaku: translation fallback: {}", e);
                }
                return Ok(TranslationResult::fallback(&sentence.text));
            }
        };

        Ok(Self::finalize(&sentence.text, parse_response(&raw)))
    }
}

/// Mock translator for testing
pub struct MockTranslator {
    reading: String,
    script_prefix: String,
    calls: std::sync::atomic::AtomicUsize,
    always_fallback: bool,
}

impl MockTranslator {
    /// Create a mock that "translates" by prefixing the sentence text.
    pub fn new() -> Self {
        Self {
            reading: "yomi".to_string(),
            script_prefix: "訳: ".to_string(),
            calls: std::sync::atomic::AtomicUsize::new(0),
            always_fallback: false,
        }
    }

    /// Configure the mock to return the fallback triple for every sentence.
    pub fn with_fallback_only(mut self) -> Self {
        self.always_fallback = true;
        self
    }

    /// Number of translate calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl Default for MockTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Translator for MockTranslator {
    async fn translate(
        &self,
        sentence: &Sentence,
        cancel: &CancellationToken,
    ) -> Result<TranslationResult> {
        if cancel.is_cancelled() {
            return Err(JimakuError::Cancelled);
        }

        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        if self.always_fallback {
            return Ok(TranslationResult::fallback(&sentence.text));
        }

        Ok(TranslationResult {
            source_script: format!("{}{}", self.script_prefix, sentence.text),
            reading: self.reading.clone(),
            target_text: sentence.text.clone(),
        })
    }
}
