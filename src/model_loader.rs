//! Model file management with optional auto-download from Hugging Face
//!
//! The DistilBERT backend needs three files from the checkpoint repository:
//! `config.json`, `vocab.txt` and the libtorch weights `rust_model.ot`.
//! When the `auto-download` feature is enabled, missing files are fetched
//! from the hub and copied into the configured model directory.
//!
//! # Examples
//!
//! ```no_run
//! use xai_fundamentals::model_loader::{ensure_model_files, ModelFiles};
//!
//! let files = ModelFiles::in_dir("models/distilbert-sst2");
//! if !files.exists() {
//!     ensure_model_files(
//!         &files,
//!         "distilbert/distilbert-base-uncased-finetuned-sst-2-english",
//!         true,
//!     )?;
//! }
//! # Ok::<(), xai_fundamentals::XaiError>(())
//! ```

use crate::error::{Result, XaiError};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";
const VOCAB_FILE: &str = "vocab.txt";
const WEIGHTS_FILE: &str = "rust_model.ot";

/// Files that make up a loadable checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub vocab: PathBuf,
    pub weights: PathBuf,
}

impl ModelFiles {
    /// Expected file paths inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let base = dir.as_ref();
        Self {
            config: base.join(CONFIG_FILE),
            vocab: base.join(VOCAB_FILE),
            weights: base.join(WEIGHTS_FILE),
        }
    }

    /// Check if all required files exist
    pub fn exists(&self) -> bool {
        self.missing().is_empty()
    }

    pub fn missing(&self) -> Vec<&Path> {
        [&self.config, &self.vocab, &self.weights]
            .into_iter()
            .filter(|p| !p.exists())
            .map(|p| p.as_path())
            .collect()
    }
}

/// Make sure the checkpoint files are on disk, downloading them when allowed.
///
/// # Arguments
/// * `files` - Where the files are expected
/// * `checkpoint` - Hugging Face repository id to download from
/// * `auto_download` - Whether to fetch missing files
pub fn ensure_model_files(files: &ModelFiles, checkpoint: &str, auto_download: bool) -> Result<()> {
    if files.exists() {
        return Ok(());
    }

    let missing: Vec<String> = files
        .missing()
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect();

    if !auto_download {
        return Err(XaiError::ModelUnavailable(format!(
            "model files not found:\n{}\nDownload them from {} or enable auto_download",
            missing.join("\n"),
            checkpoint
        )));
    }

    #[cfg(feature = "auto-download")]
    {
        tracing::info!(checkpoint, "model files not found locally, downloading from Hugging Face");
        download_from_hf(files, checkpoint)?;
        tracing::info!("model files downloaded");
        Ok(())
    }

    #[cfg(not(feature = "auto-download"))]
    {
        Err(XaiError::ModelUnavailable(format!(
            "model files not found:\n{}\nauto-download feature not enabled; rebuild with --features auto-download",
            missing.join("\n")
        )))
    }
}

#[cfg(feature = "auto-download")]
fn download_from_hf(files: &ModelFiles, checkpoint: &str) -> Result<()> {
    use hf_hub::api::sync::Api;

    let unavailable = |e: hf_hub::api::sync::ApiError| XaiError::ModelUnavailable(e.to_string());

    let api = Api::new().map_err(unavailable)?;
    let repo = api.model(checkpoint.to_string());

    for target in [&files.config, &files.vocab, &files.weights] {
        if target.exists() {
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let filename = target
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| XaiError::ModelUnavailable(format!("invalid path {}", target.display())))?;
        tracing::info!(filename, "downloading");
        let downloaded = repo.get(filename).map_err(unavailable)?;
        std::fs::copy(&downloaded, target)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_files_paths() {
        let files = ModelFiles::in_dir("models/distilbert-sst2");
        assert_eq!(files.config, PathBuf::from("models/distilbert-sst2/config.json"));
        assert_eq!(files.vocab, PathBuf::from("models/distilbert-sst2/vocab.txt"));
        assert_eq!(files.weights, PathBuf::from("models/distilbert-sst2/rust_model.ot"));
    }

    #[test]
    fn test_missing_files_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vocab.txt"), "[PAD]\n").unwrap();

        let files = ModelFiles::in_dir(dir.path());
        assert!(!files.exists());
        assert_eq!(files.missing(), vec![files.config.as_path(), files.weights.as_path()]);
    }

    #[test]
    fn test_ensure_without_download_fails() {
        let dir = tempfile::tempdir().unwrap();
        let files = ModelFiles::in_dir(dir.path());

        let err = ensure_model_files(&files, "some/checkpoint", false).unwrap_err();
        match err {
            XaiError::ModelUnavailable(msg) => assert!(msg.contains("rust_model.ot")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_ensure_present_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in [CONFIG_FILE, VOCAB_FILE, WEIGHTS_FILE] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let files = ModelFiles::in_dir(dir.path());
        assert!(ensure_model_files(&files, "some/checkpoint", false).is_ok());
    }
}
