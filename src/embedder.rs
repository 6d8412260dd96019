//! # Embedders
//!
//! Text → fixed-length, L2-normalized vectors.
//!
//! The [`Embedder`] trait is the seam the recommender depends on. Two strategies
//! implement it and are picked explicitly through
//! [`EmbedderKind`](crate::config::EmbedderKind):
//!
//! - [`CandleEmbedder`]: a BERT sentence-transformer (default
//!   `sentence-transformers/all-MiniLM-L6-v2`, 384-d) fetched from the Hugging
//!   Face hub and run with Candle. Inputs are tokenized with batch-longest
//!   padding, run through the encoder, mean-pooled under the attention mask
//!   and L2-normalized.
//! - [`HashingEmbedder`]: a deterministic bag-of-words feature hasher. It needs
//!   no download and is what tests and offline demos use.
//!
//! ## Example
//! ```rust
//! use game_scout::embedder::{Embedder, HashingEmbedder};
//!
//! let embedder = HashingEmbedder::new(64);
//! let vectors = embedder.embed(&["cozy farming", "space shooter"]).unwrap();
//! assert_eq!(vectors.len(), 2);
//! assert_eq!(vectors[0].len(), embedder.dimension());
//! ```

use std::fs;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{Repo, RepoType, api::sync::Api};
use indicatif::{ProgressBar, ProgressStyle};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::config::{DeviceChoice, EmbedderKind, ScoutConfig};
use crate::error::{Result, ScoutError};

/// BERT position embeddings stop at 512 tokens.
const MAX_SEQUENCE_LENGTH: usize = 512;

/// Text-to-vector embedding.
pub trait Embedder {
    /// Embed a batch of texts; one L2-normalized vector per input, in order.
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Length of every vector returned by [`Embedder::embed`].
    fn dimension(&self) -> usize;

    /// Identity of the model, used to key cached embeddings.
    fn model_id(&self) -> &str;
}

fn embedding_err(e: impl std::fmt::Display) -> ScoutError {
    ScoutError::Embedding(e.to_string())
}

/// Scale `v` to unit length in place. A zero vector is left untouched.
pub fn normalize_l2(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Sentence embeddings model using Candle (pure Rust).
pub struct CandleEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dimension: usize,
    batch_size: usize,
}

impl CandleEmbedder {
    /// Fetch `model_id` at `revision` from the Hugging Face hub (or the local
    /// hub cache) and load it onto the chosen device.
    pub fn load(
        model_id: &str,
        revision: &str,
        device: DeviceChoice,
        batch_size: usize,
    ) -> Result<Self> {
        let device = match device {
            DeviceChoice::Cpu => Device::Cpu,
            DeviceChoice::Auto => Device::cuda_if_available(0)?,
        };
        info!("Loading embedding model {model_id}@{revision} on {device:?}");

        let repo = Repo::with_revision(model_id.to_string(), RepoType::Model, revision.to_string());
        let api = Api::new().map_err(embedding_err)?;
        let api_repo = api.repo(repo);

        let config_filename = api_repo.get("config.json").map_err(embedding_err)?;
        let tokenizer_filename = api_repo.get("tokenizer.json").map_err(embedding_err)?;
        let weights_filename = api_repo.get("model.safetensors").map_err(embedding_err)?;

        let raw_config = fs::read_to_string(config_filename)?;
        let config: Config = serde_json::from_str(&raw_config).map_err(embedding_err)?;
        let dimension = serde_json::from_str::<serde_json::Value>(&raw_config)
            .map_err(embedding_err)?
            .get("hidden_size")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| embedding_err("model config has no hidden_size"))?
            as usize;

        let mut tokenizer = Tokenizer::from_file(tokenizer_filename)
            .map_err(|e| embedding_err(format!("failed to load tokenizer: {e}")))?;
        tokenizer
            .with_padding(Some(PaddingParams {
                strategy: PaddingStrategy::BatchLongest,
                ..Default::default()
            }))
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(embedding_err)?;

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_filename], DTYPE, &device)? };
        let model = BertModel::load(vb, &config)?;

        debug!("Model {model_id} ready, dimension {dimension}");
        Ok(Self {
            model,
            tokenizer,
            device,
            model_id: model_id.to_string(),
            dimension,
            batch_size: batch_size.max(1),
        })
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| embedding_err(format!("tokenization error: {e}")))?;

        let stack = |rows: Vec<&[u32]>| -> Result<Tensor> {
            let rows = rows
                .into_iter()
                .map(|r| Tensor::new(r, &self.device))
                .collect::<candle_core::Result<Vec<_>>>()?;
            Ok(Tensor::stack(&rows, 0)?)
        };
        let token_ids = stack(encodings.iter().map(|e| e.get_ids()).collect())?;
        let token_type_ids = stack(encodings.iter().map(|e| e.get_type_ids()).collect())?;
        let attention_mask = stack(encodings.iter().map(|e| e.get_attention_mask()).collect())?;

        let output = self
            .model
            .forward(&token_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = mean_pooling(&output, &attention_mask)?;
        let normalized = l2_normalize_rows(&pooled)?;

        Ok(normalized.to_vec2::<f32>()?)
    }
}

/// Mean of token embeddings, ignoring padding.
///
/// `embeddings` is `[batch, seq, hidden]`, `attention_mask` is `[batch, seq]`.
fn mean_pooling(embeddings: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?; // [batch, seq, 1]
    let sum = embeddings.broadcast_mul(&mask)?.sum(1)?; // [batch, hidden]
    let count = mask.sum(1)?.clamp(1f32, f32::INFINITY)?; // [batch, 1]
    Ok(sum.broadcast_div(&count)?)
}

fn l2_normalize_rows(t: &Tensor) -> Result<Tensor> {
    let norm = t
        .sqr()?
        .sum_keepdim(1)?
        .sqrt()?
        .clamp(f32::MIN_POSITIVE, f32::INFINITY)?;
    Ok(t.broadcast_div(&norm)?)
}

impl Embedder for CandleEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            out.extend(self.embed_batch(chunk)?);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Bag-of-words feature hashing into a fixed number of buckets.
///
/// Tokens are lowercase ASCII alphanumeric runs; each adds 1.0 to the bucket
/// picked by its blake3 digest. The result is L2-normalized, so texts sharing
/// no tokens score 0 and identical token multisets score 1.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            model_id: format!("hashing-bow-{dimension}"),
        }
    }

    fn bucket(&self, token: &str) -> usize {
        let digest = blake3::hash(token.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.as_bytes()[..8]);
        (u64::from_le_bytes(head) % self.dimension as u64) as usize
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dimension];
        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            v[self.bucket(token)] += 1.0;
        }
        normalize_l2(&mut v);
        v
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Build the embedder selected by `config`. Loading the Candle model is the
/// one-time startup cost of the process.
pub fn load_embedder(config: &ScoutConfig) -> Result<Box<dyn Embedder>> {
    match config.embedder {
        EmbedderKind::Candle => Ok(Box::new(CandleEmbedder::load(
            &config.model_id,
            &config.revision,
            config.device,
            config.batch_size,
        )?)),
        EmbedderKind::Hashing => {
            info!(
                "Using hashing embedder ({} buckets)",
                config.hashing_dimension
            );
            Ok(Box::new(HashingEmbedder::new(config.hashing_dimension)))
        }
    }
}

/// Embed a corpus in batches of `batch_size`, driving a progress bar.
pub fn embed_with_progress(
    embedder: &dyn Embedder,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let pb = ProgressBar::new(texts.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner} embedding [{bar:40}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut out = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(batch_size.max(1)) {
        let refs: Vec<&str> = chunk.iter().map(String::as_str).collect();
        out.extend(embedder.embed(&refs)?);
        pb.inc(chunk.len() as u64);
    }
    pb.finish_and_clear();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_hashing_vectors_are_unit_length() {
        let e = HashingEmbedder::new(384);
        let v = e.embed(&["Open world adventure with puzzles"]).unwrap();
        assert_eq!(v[0].len(), 384);
        assert!((dot(&v[0], &v[0]) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hashing_empty_text_is_zero_vector() {
        let e = HashingEmbedder::new(32);
        let v = e.embed(&["", "!!!"]).unwrap();
        assert!(v.iter().all(|row| row.iter().all(|x| *x == 0.0)));
    }

    #[test]
    fn test_hashing_is_deterministic_and_case_insensitive() {
        let e = HashingEmbedder::new(128);
        let a = e.embed(&["Cozy Farming Sim"]).unwrap();
        let b = e.embed(&["cozy farming sim"]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_hashing_similarity_orders_overlap() {
        let e = HashingEmbedder::new(384);
        let v = e
            .embed(&[
                "relaxing farming simulation",
                "relaxing farming game",
                "gritty space shooter",
            ])
            .unwrap();
        assert!(dot(&v[0], &v[1]) > dot(&v[0], &v[2]));
    }

    #[test]
    fn test_normalize_l2() {
        let mut v = vec![3.0, 4.0];
        normalize_l2(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0; 3];
        normalize_l2(&mut zero);
        assert_eq!(zero, vec![0.0; 3]);
    }

    #[test]
    fn test_embed_with_progress_matches_direct() {
        let e = HashingEmbedder::new(64);
        let texts: Vec<String> = (0..7).map(|i| format!("game number {i}")).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();

        let batched = embed_with_progress(&e, &texts, 3).unwrap();
        assert_eq!(batched, e.embed(&refs).unwrap());
    }

    #[test]
    fn test_load_embedder_hashing() {
        let config = ScoutConfig {
            embedder: EmbedderKind::Hashing,
            hashing_dimension: 48,
            ..ScoutConfig::default()
        };
        let e = load_embedder(&config).unwrap();
        assert_eq!(e.dimension(), 48);
        assert_eq!(e.model_id(), "hashing-bow-48");
    }

    #[test]
    #[ignore = "downloads all-MiniLM-L6-v2 from the Hugging Face hub"]
    fn test_candle_embedder() {
        let e = CandleEmbedder::load(
            "sentence-transformers/all-MiniLM-L6-v2",
            "main",
            DeviceChoice::Cpu,
            2,
        )
        .unwrap();
        assert_eq!(e.dimension(), 384);

        let v = e
            .embed(&[
                "relaxing farming simulation",
                "a calm game about growing crops",
                "fast competitive shooter",
            ])
            .unwrap();
        assert_eq!(v.len(), 3);
        for row in &v {
            assert!((dot(row, row) - 1.0).abs() < 1e-4);
        }
        assert!(dot(&v[0], &v[1]) > dot(&v[0], &v[2]));

        // Padding inside a batch must not change a sentence's vector.
        let alone = e.embed(&["relaxing farming simulation"]).unwrap();
        assert!((dot(&alone[0], &v[0]) - 1.0).abs() < 1e-4);
    }
}
