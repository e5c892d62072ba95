//! Per-sentence translation: endpoint client and defensive response parsing.

pub mod client;
pub mod parse;

pub use client::{MockTranslator, OllamaTranslator, TranslationResult, Translator};
pub use parse::{ParsedTranslation, parse_response};
