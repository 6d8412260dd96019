//! This module provides loading and defaults for the application's configuration.
//!
//! The configuration lives in `config.yaml` under [`crate::config_dir()`]. Every
//! field has a default, so a partial file (or none at all) is valid.
//!
//! # Examples
//!
//! ```no_run
//! use game_scout::config::load_config;
//!
//! let config = load_config("/path/to/config.yaml").unwrap();
//! println!("{:?}", config.embedder);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ScoutError};

/// Which embedder backs the recommender.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Pretrained BERT sentence-transformer run with Candle.
    Candle,
    /// Offline feature-hashing bag of words; no model download.
    Hashing,
}

/// Compute device for the Candle embedder.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum DeviceChoice {
    Cpu,
    /// CUDA device 0 when compiled in and present, otherwise CPU.
    Auto,
}

/// How much language processing the review normalizer performs.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LanguageMode {
    /// Lowercase and strip only.
    None,
    /// Lemmatize and drop stopwords using the built-in English tables.
    Builtin,
    /// Lemmatize using the YAML pack at `language_pack`.
    File,
}

/// Represents the application's configuration.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(default)]
pub struct ScoutConfig {
    /// CSV catalog. `None` or a missing file selects the sample catalog.
    pub catalog_path: Option<PathBuf>,

    /// Directory holding cached embeddings. Defaults to `<config_dir>/embeddings`.
    pub cache_dir: Option<PathBuf>,

    /// Reuse and write cached embeddings.
    pub use_cache: bool,

    pub embedder: EmbedderKind,

    /// Hugging Face model repository for the Candle embedder.
    pub model_id: String,

    pub revision: String,

    pub device: DeviceChoice,

    /// Inputs per forward pass when embedding the catalog.
    pub batch_size: usize,

    /// Output dimension of the hashing embedder.
    pub hashing_dimension: usize,

    pub language: LanguageMode,

    pub language_pack: Option<PathBuf>,

    pub default_top_k: usize,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            cache_dir: None,
            use_cache: true,
            embedder: EmbedderKind::Candle,
            model_id: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            revision: "main".to_string(),
            device: DeviceChoice::Cpu,
            batch_size: 64,
            hashing_dimension: 384,
            language: LanguageMode::Builtin,
            language_pack: None,
            default_top_k: 5,
        }
    }
}

impl ScoutConfig {
    /// Resolve the embedding cache directory.
    pub fn resolved_cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(crate::config_dir()?.join("embeddings")),
        }
    }
}

/// Loads the application's configuration from a YAML file.
///
/// # Errors
/// [`ScoutError::Config`] when the file cannot be read or is not valid YAML
/// for [`ScoutConfig`].
pub fn load_config<P: AsRef<Path>>(file: P) -> Result<ScoutConfig> {
    let path = file.as_ref();
    debug!("Loading config from {}", path.display());

    let fail = |reason: String| ScoutError::Config {
        path: path.to_path_buf(),
        reason,
    };
    let content = fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
    serde_yaml::from_str(&content).map_err(|e| fail(e.to_string()))
}

/// Load `file` if it exists, otherwise fall back to [`ScoutConfig::default`].
pub fn load_or_default<P: AsRef<Path>>(file: P) -> Result<ScoutConfig> {
    if file.as_ref().exists() {
        load_config(file)
    } else {
        debug!(
            "No config at {}, using defaults",
            file.as_ref().display()
        );
        Ok(ScoutConfig::default())
    }
}

/// Write the default configuration to `file`, creating parent directories.
pub fn write_default_config<P: AsRef<Path>>(file: P) -> Result<ScoutConfig> {
    let path = file.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let config = ScoutConfig::default();
    let yaml = serde_yaml::to_string(&config).map_err(|e| ScoutError::Config {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    fs::write(path, yaml)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_load_config_valid_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
catalog_path: "/data/video_game_reviews.csv"
embedder: hashing
hashing_dimension: 128
language: none
default_top_k: 3
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(
            config.catalog_path,
            Some(PathBuf::from("/data/video_game_reviews.csv"))
        );
        assert_eq!(config.embedder, EmbedderKind::Hashing);
        assert_eq!(config.hashing_dimension, 128);
        assert_eq!(config.language, LanguageMode::None);
        assert_eq!(config.default_top_k, 3);
        // Unset fields keep their defaults.
        assert_eq!(config.batch_size, 64);
        assert!(config.use_cache);
    }

    #[test]
    fn test_load_config_invalid_file() {
        let config = load_config("non/existent/path");
        assert!(matches!(config, Err(ScoutError::Config { .. })));
    }

    #[test]
    fn test_load_config_invalid_format() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, r#"embedder: quantum"#).unwrap();

        assert!(load_config(temp_file.path()).is_err());
    }

    #[test]
    fn test_write_default_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/config.yaml");

        let written = write_default_config(&path).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(written, loaded);
        assert_eq!(loaded, ScoutConfig::default());
    }

    #[test]
    fn test_load_or_default_without_file() {
        let config = load_or_default("non/existent/config.yaml").unwrap();
        assert_eq!(config, ScoutConfig::default());
    }

    #[test]
    fn test_explicit_cache_dir_wins() {
        let config = ScoutConfig {
            cache_dir: Some(PathBuf::from("/tmp/scout-cache")),
            ..ScoutConfig::default()
        };
        assert_eq!(
            config.resolved_cache_dir().unwrap(),
            PathBuf::from("/tmp/scout-cache")
        );
    }
}
