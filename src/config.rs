//! Configuration loading and defaults.

use crate::defaults;
use crate::error::{JimakuError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub extraction: ExtractionConfig,
    pub stt: SttConfig,
    pub translation: TranslationConfig,
}

/// Audio extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Extraction tool binary, resolved on PATH if not absolute.
    pub tool: String,
    /// Chunk cache directory. Defaults to `~/.cache/jimaku/chunks`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    pub model: String,
    pub language: String,
    /// Number of inference threads (None = auto-detect)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}

/// Translation endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranslationConfig {
    /// Base URL of the Ollama-compatible endpoint.
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            tool: defaults::DEFAULT_EXTRACTOR.to_string(),
            cache_dir: None,
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: defaults::DEFAULT_MODEL.to_string(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::DEFAULT_TRANSLATION_ENDPOINT.to_string(),
            model: defaults::DEFAULT_TRANSLATION_MODEL.to_string(),
            timeout_secs: defaults::TRANSLATION_TIMEOUT_SECS,
        }
    }
}

impl ExtractionConfig {
    /// Resolve the chunk cache directory, falling back to the XDG cache dir.
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("jimaku")
                .join("chunks")
        })
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Missing fields use default values; invalid TOML is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file, or return defaults if the file is
    /// missing. Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config: Config = toml::from_str(&contents)?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(JimakuError::Io(e)),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported environment variables:
    /// - JIMAKU_MODEL → stt.model
    /// - JIMAKU_LANGUAGE → stt.language
    /// - JIMAKU_EXTRACTOR → extraction.tool
    /// - JIMAKU_TRANSLATION_ENDPOINT → translation.endpoint
    /// - JIMAKU_TRANSLATION_MODEL → translation.model
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("JIMAKU_MODEL")
            && !model.is_empty()
        {
            self.stt.model = model;
        }

        if let Ok(language) = std::env::var("JIMAKU_LANGUAGE")
            && !language.is_empty()
        {
            self.stt.language = language;
        }

        if let Ok(tool) = std::env::var("JIMAKU_EXTRACTOR")
            && !tool.is_empty()
        {
            self.extraction.tool = tool;
        }

        if let Ok(endpoint) = std::env::var("JIMAKU_TRANSLATION_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.translation.endpoint = endpoint;
        }

        if let Ok(model) = std::env::var("JIMAKU_TRANSLATION_MODEL")
            && !model.is_empty()
        {
            self.translation.model = model;
        }

        self
    }

    /// Get the default configuration file path.
    ///
    /// Returns `~/.config/jimaku/config.toml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("jimaku")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_jimaku_env() {
        remove_env("JIMAKU_MODEL");
        remove_env("JIMAKU_LANGUAGE");
        remove_env("JIMAKU_EXTRACTOR");
        remove_env("JIMAKU_TRANSLATION_ENDPOINT");
        remove_env("JIMAKU_TRANSLATION_MODEL");
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.extraction.tool, "yt-dlp");
        assert_eq!(config.extraction.cache_dir, None);

        assert_eq!(config.stt.model, "base.en");
        assert_eq!(config.stt.language, "en");
        assert_eq!(config.stt.threads, None);

        assert_eq!(config.translation.endpoint, "http://127.0.0.1:11434");
        assert_eq!(config.translation.model, "llama3.2");
        assert_eq!(config.translation.timeout_secs, 120);
    }

    #[test]
    fn test_load_from_toml_file() {
        let toml_content = r#"
            [extraction]
            tool = "/opt/yt-dlp/yt-dlp"
            cache_dir = "/var/cache/jimaku"

            [stt]
            model = "small.en"
            language = "en"
            threads = 4

            [translation]
            endpoint = "http://ollama.local:11434"
            model = "llama3.1"
            timeout_secs = 30
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.extraction.tool, "/opt/yt-dlp/yt-dlp");
        assert_eq!(
            config.extraction.cache_dir,
            Some(PathBuf::from("/var/cache/jimaku"))
        );
        assert_eq!(config.stt.model, "small.en");
        assert_eq!(config.stt.threads, Some(4));
        assert_eq!(config.translation.endpoint, "http://ollama.local:11434");
        assert_eq!(config.translation.model, "llama3.1");
        assert_eq!(config.translation.timeout_secs, 30);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let toml_content = r#"
            [stt]
            model = "tiny.en"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.stt.model, "tiny.en");
        // Everything else should be defaults
        assert_eq!(config.stt.language, "en");
        assert_eq!(config.extraction.tool, "yt-dlp");
        assert_eq!(config.translation.model, "llama3.2");
    }

    #[test]
    fn test_env_override_model() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_jimaku_env();

        set_env("JIMAKU_MODEL", "small.en");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.stt.model, "small.en");
        assert_eq!(config.stt.language, "en"); // Not overridden

        clear_jimaku_env();
    }

    #[test]
    fn test_env_override_all() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_jimaku_env();

        set_env("JIMAKU_MODEL", "medium.en");
        set_env("JIMAKU_LANGUAGE", "en");
        set_env("JIMAKU_EXTRACTOR", "/usr/local/bin/yt-dlp");
        set_env("JIMAKU_TRANSLATION_ENDPOINT", "http://10.0.0.2:11434");
        set_env("JIMAKU_TRANSLATION_MODEL", "qwen2.5");

        let config = Config::default().with_env_overrides();

        assert_eq!(config.stt.model, "medium.en");
        assert_eq!(config.extraction.tool, "/usr/local/bin/yt-dlp");
        assert_eq!(config.translation.endpoint, "http://10.0.0.2:11434");
        assert_eq!(config.translation.model, "qwen2.5");

        clear_jimaku_env();
    }

    #[test]
    fn test_env_override_empty_string_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_jimaku_env();

        set_env("JIMAKU_MODEL", "");
        let config = Config::default().with_env_overrides();

        // Empty string should not override default
        assert_eq!(config.stt.model, "base.en");

        clear_jimaku_env();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let invalid_toml = r#"
            [extraction
            tool = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        assert!(Config::load(temp_file.path()).is_err());
        // load_or_default only tolerates a missing file, not invalid TOML
        assert!(Config::load_or_default(temp_file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let missing_path = Path::new("/tmp/nonexistent_jimaku_config_12345.toml");
        let config = Config::load_or_default(missing_path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_resolved_cache_dir_prefers_explicit() {
        let config = ExtractionConfig {
            tool: "yt-dlp".to_string(),
            cache_dir: Some(PathBuf::from("/tmp/chunks")),
        };
        assert_eq!(config.resolved_cache_dir(), PathBuf::from("/tmp/chunks"));
    }

    #[test]
    fn test_resolved_cache_dir_default_ends_with_chunks() {
        let config = ExtractionConfig::default();
        let dir = config.resolved_cache_dir();
        assert!(dir.ends_with("jimaku/chunks"), "got: {:?}", dir);
    }

    #[test]
    fn test_default_path_is_xdg_compliant() {
        let path = Config::default_path();
        let path_str = path.to_string_lossy();
        assert!(path_str.contains("jimaku"));
        assert!(path_str.ends_with("config.toml"));
    }
}
