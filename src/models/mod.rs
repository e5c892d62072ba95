//! Whisper model provisioning: catalog, cache paths, and downloads.

pub mod catalog;
pub mod download;

pub use catalog::{ModelInfo, get_model, list_models};
pub use download::{download_model, ensure_model, is_model_installed, model_path, models_dir};
