//! # Recommender
//!
//! The query-side context object. A [`Recommender`] owns the catalog, the
//! normalizer strategy, the embedder and (once built) the index. It is
//! constructed once by the caller and handed to whatever presents results.
//!
//! ```text
//! catalog ─▶ normalize ─▶ combine ─▶ embed ─┬─▶ GameIndex
//!                                           └─▶ EmbeddingCache (keyed)
//! query text ─▶ embed ─▶ GameIndex::search ─▶ [(title, score)]
//! ```
//!
//! ## Example
//! ```rust
//! use game_scout::catalog::Catalog;
//! use game_scout::embedder::HashingEmbedder;
//! use game_scout::normalize::TextNormalizer;
//! use game_scout::recommender::Recommender;
//!
//! let mut rec = Recommender::new(
//!     Catalog::sample(),
//!     TextNormalizer::Basic,
//!     Box::new(HashingEmbedder::new(384)),
//! );
//! rec.build(None).unwrap();
//!
//! let hits = rec.query("relaxing life simulation cute animals peaceful", 3).unwrap();
//! assert_eq!(hits[0].title, "Animal Crossing: New Horizons");
//! ```

use tracing::{debug, info};

use crate::cache::{EmbeddingCache, cache_key};
use crate::catalog::{Catalog, GameRecord};
use crate::combine::combine_catalog;
use crate::config::ScoutConfig;
use crate::embedder::{Embedder, embed_with_progress, load_embedder};
use crate::error::{Result, ScoutError};
use crate::index::GameIndex;
use crate::normalize::TextNormalizer;

const DEFAULT_BATCH_SIZE: usize = 64;

/// One ranked match.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub title: String,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
}

pub struct Recommender {
    catalog: Catalog,
    normalizer: TextNormalizer,
    embedder: Box<dyn Embedder>,
    index: Option<GameIndex>,
    batch_size: usize,
}

impl Recommender {
    /// An unbuilt recommender. Call [`Recommender::build`] before querying.
    pub fn new(catalog: Catalog, normalizer: TextNormalizer, embedder: Box<dyn Embedder>) -> Self {
        Self {
            catalog,
            normalizer,
            embedder,
            index: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Load the catalog, select the normalizer and embedder, and build the
    /// index, all as `config` describes.
    pub fn from_config(config: &ScoutConfig) -> Result<Self> {
        let catalog = Catalog::load(config.catalog_path.as_deref())?;
        let normalizer =
            TextNormalizer::from_setting(config.language, config.language_pack.as_deref());
        let embedder = load_embedder(config)?;

        let mut rec = Self::new(catalog, normalizer, embedder).with_batch_size(config.batch_size);
        let cache = if config.use_cache {
            Some(EmbeddingCache::new(config.resolved_cache_dir()?))
        } else {
            None
        };
        rec.build(cache.as_ref())?;
        Ok(rec)
    }

    /// Key under which this catalog's embeddings are cached.
    pub fn cache_key(&self) -> String {
        cache_key(
            self.embedder.model_id(),
            self.embedder.dimension(),
            &self.catalog.content_hash(),
            &self.normalizer.fingerprint(),
        )
    }

    /// Embed the catalog (or reuse cached embeddings) and build the index.
    ///
    /// Calling `build` again rebuilds from scratch.
    ///
    /// # Errors
    /// Embedding failures, cache decode failures, and any row-count or
    /// dimension mismatch between vectors and the embedder.
    pub fn build(&mut self, cache: Option<&EmbeddingCache>) -> Result<()> {
        info!(
            "Building index for {} games with {} ({:?} normalization)",
            self.catalog.len(),
            self.embedder.model_id(),
            self.normalizer.capability()
        );

        let dimension = self.embedder.dimension();
        let key = self.cache_key();

        let cached = match cache {
            Some(c) => c.load(&key, self.catalog.len(), dimension)?,
            None => None,
        };

        let vectors = match cached {
            Some(vectors) => vectors,
            None => {
                let texts = combine_catalog(&self.catalog, &self.normalizer);
                let vectors = self.embed_corpus(&texts)?;
                if let Some(c) = cache {
                    c.store(&key, &vectors)?;
                }
                vectors
            }
        };

        if vectors.len() != self.catalog.len() {
            return Err(ScoutError::CacheRowMismatch {
                expected: self.catalog.len(),
                found: vectors.len(),
            });
        }

        self.index = Some(GameIndex::build(dimension, vectors)?);
        info!("Game recommender ready");
        Ok(())
    }

    fn embed_corpus(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        debug!("Encoding {} combined game descriptions", texts.len());
        embed_with_progress(self.embedder.as_ref(), texts, self.batch_size)
    }

    /// Rank catalog games against `text`.
    ///
    /// Returns at most `min(top_k, catalog size)` matches, best first. Text
    /// that embeds to an all-zero vector (e.g. punctuation only with the
    /// hashing embedder) scores `0.0` against every game, so the first
    /// `top_k` catalog rows come back in catalog order.
    ///
    /// # Errors
    /// - [`ScoutError::IndexNotBuilt`] before [`Recommender::build`].
    /// - [`ScoutError::EmptyQuery`] for blank text.
    /// - [`ScoutError::InvalidTopK`] for `top_k == 0`.
    pub fn query(&self, text: &str, top_k: usize) -> Result<Vec<Recommendation>> {
        let index = self.index.as_ref().ok_or(ScoutError::IndexNotBuilt)?;
        if text.trim().is_empty() {
            return Err(ScoutError::EmptyQuery);
        }
        if top_k == 0 {
            return Err(ScoutError::InvalidTopK);
        }

        let query = self
            .embedder
            .embed(&[text])?
            .pop()
            .ok_or_else(|| ScoutError::Embedding("embedder returned no vector".to_string()))?;

        let hits = index.search(&query, top_k)?;
        debug!("Query {:?} matched {} games", text, hits.len());

        Ok(hits
            .into_iter()
            .filter_map(|(row, score)| {
                self.catalog.record_at(row).map(|r| Recommendation {
                    title: r.title.clone(),
                    score,
                })
            })
            .collect())
    }

    /// Details for a single title, if it is in the catalog.
    pub fn get_record(&self, title: &str) -> Option<&GameRecord> {
        self.catalog.get(title)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn is_built(&self) -> bool {
        self.index.is_some()
    }

    pub fn index_len(&self) -> usize {
        self.index.as_ref().map_or(0, GameIndex::len)
    }

    pub fn index(&self) -> Option<&GameIndex> {
        self.index.as_ref()
    }
}
