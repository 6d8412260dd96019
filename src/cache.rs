//! # Embedding cache
//!
//! Catalog embeddings are expensive to compute and cheap to store, so they are
//! written once and reused across restarts.
//!
//! Each cache file is named after a key derived from everything that shapes
//! the vectors, so a changed catalog, model or normalizer lands on a new file
//! instead of silently reusing stale rows:
//!
//! ```text
//! <cache_dir>/game_embeddings-<blake3(model, dimension, catalog, normalizer)>.bin
//! ```
//!
//! The file body is a bincode-encoded `Vec<Vec<f32>>`: one row per catalog
//! record, in catalog order. Loading re-checks the row count and every row's
//! dimension against what the caller expects.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, ScoutError};

const FILE_PREFIX: &str = "game_embeddings-";
const FILE_EXTENSION: &str = "bin";

/// Derive the cache key for one (model, catalog, normalizer) combination.
pub fn cache_key(
    model_id: &str,
    dimension: usize,
    catalog_hash: &blake3::Hash,
    normalizer_fingerprint: &str,
) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher
        .update(model_id.as_bytes())
        .update(b"\0")
        .update(&(dimension as u64).to_le_bytes())
        .update(catalog_hash.as_bytes())
        .update(normalizer_fingerprint.as_bytes());
    hasher.finalize().to_hex()[..32].to_string()
}

/// On-disk store of catalog embeddings.
#[derive(Debug, Clone)]
pub struct EmbeddingCache {
    dir: PathBuf,
}

impl EmbeddingCache {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{FILE_PREFIX}{key}.{FILE_EXTENSION}"))
    }

    /// Read the vectors stored under `key`.
    ///
    /// Returns `Ok(None)` when nothing is cached for `key`.
    ///
    /// # Errors
    /// - [`ScoutError::Cache`] if the file cannot be decoded.
    /// - [`ScoutError::CacheRowMismatch`] if the row count differs from
    ///   `expected_rows`.
    /// - [`ScoutError::DimensionMismatch`] if any row is not
    ///   `expected_dimension` long.
    pub fn load(
        &self,
        key: &str,
        expected_rows: usize,
        expected_dimension: usize,
    ) -> Result<Option<Vec<Vec<f32>>>> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!("No cached embeddings at {}", path.display());
            return Ok(None);
        }

        let bytes = fs::read(&path)?;
        let (vectors, _): (Vec<Vec<f32>>, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
                .map_err(|e| ScoutError::Cache(format!("{}: {e}", path.display())))?;

        if vectors.len() != expected_rows {
            return Err(ScoutError::CacheRowMismatch {
                expected: expected_rows,
                found: vectors.len(),
            });
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected_dimension) {
            return Err(ScoutError::DimensionMismatch {
                expected: expected_dimension,
                found: bad.len(),
            });
        }

        info!("Loaded {} cached embeddings from {}", vectors.len(), path.display());
        Ok(Some(vectors))
    }

    /// Persist `vectors` under `key`, creating the cache directory if needed.
    /// The file is written beside its final name and renamed into place.
    pub fn store(&self, key: &str, vectors: &[Vec<f32>]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let bytes = bincode::serde::encode_to_vec(vectors, bincode::config::standard())
            .map_err(|e| ScoutError::Cache(e.to_string()))?;

        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;

        info!("Saved {} embeddings to {}", vectors.len(), path.display());
        Ok(path)
    }

    /// Delete every cache file in the directory. Returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        if !self.dir.is_dir() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_cache_file = path.is_file()
                && path.extension().is_some_and(|ext| ext == FILE_EXTENSION)
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(FILE_PREFIX));
            if is_cache_file {
                fs::remove_file(&path)?;
                debug!("Removed {}", path.display());
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vectors() -> Vec<Vec<f32>> {
        vec![
            vec![0.6, 0.8, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![0.57735026, -0.57735026, 0.57735026],
        ]
    }

    #[test]
    fn test_round_trip_is_exact() {
        let dir = TempDir::new().unwrap();
        let cache = EmbeddingCache::new(dir.path().join("embeddings"));

        cache.store("k1", &vectors()).unwrap();
        let loaded = cache.load("k1", 3, 3).unwrap();
        assert_eq!(loaded, Some(vectors()));
    }

    #[test]
    fn test_missing_key_is_none() {
        let dir = TempDir::new().unwrap();
        let cache = EmbeddingCache::new(dir.path());
        assert_eq!(cache.load("absent", 3, 3).unwrap(), None);
    }

    #[test]
    fn test_row_count_mismatch_is_error() {
        let dir = TempDir::new().unwrap();
        let cache = EmbeddingCache::new(dir.path());
        cache.store("k", &vectors()).unwrap();

        assert!(matches!(
            cache.load("k", 4, 3),
            Err(ScoutError::CacheRowMismatch {
                expected: 4,
                found: 3
            })
        ));
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        let dir = TempDir::new().unwrap();
        let cache = EmbeddingCache::new(dir.path());
        cache.store("k", &vectors()).unwrap();

        assert!(matches!(
            cache.load("k", 3, 384),
            Err(ScoutError::DimensionMismatch {
                expected: 384,
                found: 3
            })
        ));
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        let cache = EmbeddingCache::new(dir.path());
        fs::write(cache.path_for("bad"), b"\xff\xff\xff").unwrap();

        assert!(matches!(cache.load("bad", 1, 1), Err(ScoutError::Cache(_))));
    }

    #[test]
    fn test_clear_removes_only_cache_files() {
        let dir = TempDir::new().unwrap();
        let cache = EmbeddingCache::new(dir.path());
        cache.store("a", &vectors()).unwrap();
        cache.store("b", &vectors()).unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        assert_eq!(cache.clear().unwrap(), 2);
        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(cache.load("a", 3, 3).unwrap(), None);
    }

    #[test]
    fn test_clear_missing_dir() {
        let cache = EmbeddingCache::new("no/such/cache/dir");
        assert_eq!(cache.clear().unwrap(), 0);
    }

    #[test]
    fn test_cache_key_changes_with_inputs() {
        let h1 = blake3::hash(b"catalog one");
        let h2 = blake3::hash(b"catalog two");

        let base = cache_key("model-a", 384, &h1, "basic");
        assert_eq!(base, cache_key("model-a", 384, &h1, "basic"));
        assert_ne!(base, cache_key("model-b", 384, &h1, "basic"));
        assert_ne!(base, cache_key("model-a", 768, &h1, "basic"));
        assert_ne!(base, cache_key("model-a", 384, &h2, "basic"));
        assert_ne!(base, cache_key("model-a", 384, &h1, "lemma:abc"));
    }
}
