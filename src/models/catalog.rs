//! Whisper model metadata catalog.

/// Metadata for a Whisper model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    /// Model identifier (e.g., "tiny.en", "base.en", "small")
    pub name: &'static str,
    /// Model size in megabytes
    pub size_mb: u32,
    /// SHA-1 checksum; empty means "skip verification"
    pub sha1: &'static str,
    /// Download URL from HuggingFace
    pub url: &'static str,
    /// Whether this model supports English only
    pub english_only: bool,
}

/// Catalog of supported Whisper models.
///
/// The source language is fixed to English, so the `.en` variants are
/// listed first: smaller and faster at equal quality for this workload.
pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        name: "tiny.en",
        size_mb: 75,
        sha1: "",
        url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-tiny.en.bin",
        english_only: true,
    },
    ModelInfo {
        name: "base.en",
        size_mb: 142,
        sha1: "",
        url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-base.en.bin",
        english_only: true,
    },
    ModelInfo {
        name: "small.en",
        size_mb: 466,
        sha1: "",
        url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-small.en.bin",
        english_only: true,
    },
    ModelInfo {
        name: "tiny",
        size_mb: 75,
        sha1: "",
        url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-tiny.bin",
        english_only: false,
    },
    ModelInfo {
        name: "base",
        size_mb: 142,
        sha1: "",
        url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-base.bin",
        english_only: false,
    },
    ModelInfo {
        name: "small",
        size_mb: 466,
        sha1: "",
        url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-small.bin",
        english_only: false,
    },
];

/// Find a model by name.
pub fn get_model(name: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.name == name.trim())
}

/// All supported models.
pub fn list_models() -> &'static [ModelInfo] {
    MODELS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_model_finds_known_names() {
        assert!(get_model("base.en").is_some());
        assert!(get_model("tiny").is_some());
        assert!(get_model(" small.en ").is_some());
    }

    #[test]
    fn get_model_unknown_is_none() {
        assert!(get_model("large-v9").is_none());
        assert!(get_model("").is_none());
    }

    #[test]
    fn english_variants_are_marked() {
        for model in list_models() {
            assert_eq!(model.english_only, model.name.ends_with(".en"));
        }
    }

    #[test]
    fn urls_match_names() {
        for model in list_models() {
            assert!(model.url.contains(&format!("ggml-{}.bin", model.name)));
        }
    }
}
