//! # Game index
//!
//! Exact top-k search over the catalog's embedding vectors.
//!
//! Candidates come from a `hora` brute-force index built with the Euclidean
//! metric. For unit vectors `|a - b|² = 2 - 2·a·b`, so the Euclidean order is
//! exactly the inverse of the inner-product order. Candidates are then
//! re-scored with the exact inner product, which is the cosine similarity
//! reported to callers.
//!
//! Rows whose vector is all zeros cannot be placed on the unit sphere, so they
//! are kept out of the `hora` index and always join the candidate set with
//! score `0.0`.
//!
//! Results are sorted by descending score; equal scores keep ascending row
//! order. `hora` keeps an arbitrary subset of rows tied at its cutoff, so a
//! candidate set is only trusted when its `k`-th exact score is strictly above
//! the weakest candidate's. Anything closer than that, including every search
//! with an all-zero query, falls back to scoring every row.

use std::cmp::Ordering;

use hora::core::ann_index::ANNIndex;
use hora::core::metrics::Metric;
use hora::index::bruteforce_idx::BruteForceIndex;
use hora::index::bruteforce_params::BruteForceParams;
use tracing::debug;

use crate::error::{Result, ScoutError};

/// Extra `hora` candidates fetched beyond `2k`.
const CANDIDATE_SLACK: usize = 16;
/// Minimum gap between the `k`-th score and the candidate floor.
const TIE_EPSILON: f32 = 1e-5;

fn index_err(e: &'static str) -> ScoutError {
    ScoutError::Index(e.to_string())
}

/// Flat inner-product index over row-ordered vectors.
pub struct GameIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
    /// `None` when no row has a non-zero vector.
    ann: Option<BruteForceIndex<f32, usize>>,
    zero_rows: Vec<usize>,
}

impl GameIndex {
    /// Index `vectors`, addressing each by its position.
    ///
    /// # Errors
    /// [`ScoutError::DimensionMismatch`] if any vector's length differs from
    /// `dimension`.
    pub fn build(dimension: usize, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(ScoutError::DimensionMismatch {
                expected: dimension,
                found: bad.len(),
            });
        }

        let mut ann = BruteForceIndex::<f32, usize>::new(dimension, &BruteForceParams::default());
        let mut zero_rows = Vec::new();
        let mut indexed = 0usize;
        for (row, v) in vectors.iter().enumerate() {
            if v.iter().all(|x| *x == 0.0) {
                zero_rows.push(row);
                continue;
            }
            ann.add(v, row).map_err(index_err)?;
            indexed += 1;
        }

        let ann = if indexed > 0 {
            ann.build(Metric::Euclidean).map_err(index_err)?;
            Some(ann)
        } else {
            None
        };

        debug!(
            "Built index: {} rows, {} zero vectors, dimension {}",
            vectors.len(),
            zero_rows.len(),
            dimension
        );

        Ok(Self {
            dimension,
            vectors,
            ann,
            zero_rows,
        })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn vector(&self, row: usize) -> Option<&[f32]> {
        self.vectors.get(row).map(Vec::as_slice)
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    /// The `k` rows most similar to `query` as `(row, score)` pairs.
    ///
    /// Returns `min(k, len())` pairs; `k == 0` yields an empty list.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(ScoutError::DimensionMismatch {
                expected: self.dimension,
                found: query.len(),
            });
        }
        if k == 0 || self.vectors.is_empty() {
            return Ok(Vec::new());
        }

        let indexed = self.vectors.len() - self.zero_rows.len();
        let wanted = k.saturating_mul(2).saturating_add(CANDIDATE_SLACK);
        let mut scored = match &self.ann {
            Some(ann) if wanted < indexed => {
                let rows = ann.search(query, wanted);
                match self.rank_candidates(query, rows, wanted, k) {
                    Some(scored) => scored,
                    None => {
                        debug!("Candidate cutoff is tied at k = {k}; scoring all rows");
                        self.rank(query, 0..self.vectors.len())
                    }
                }
            }
            _ => self.rank(query, 0..self.vectors.len()),
        };
        scored.truncate(k);
        Ok(scored)
    }

    /// Ranks `hora`'s candidates together with the zero rows.
    ///
    /// Every row `hora` left out is at least as far away as its farthest
    /// candidate, so it scores no higher than the candidate floor. `None` when
    /// such a row could still tie or beat the `k`-th result.
    fn rank_candidates(
        &self,
        query: &[f32],
        rows: Vec<usize>,
        wanted: usize,
        k: usize,
    ) -> Option<Vec<(usize, f32)>> {
        if rows.len() < wanted {
            return None;
        }
        let floor = rows
            .iter()
            .map(|&row| self.score(query, row))
            .fold(f32::INFINITY, f32::min);
        let scored = self.rank(query, rows.into_iter().chain(self.zero_rows.iter().copied()));
        let kth = scored.get(k - 1)?.1;
        (kth > floor + TIE_EPSILON).then_some(scored)
    }

    fn rank(&self, query: &[f32], rows: impl IntoIterator<Item = usize>) -> Vec<(usize, f32)> {
        let mut scored: Vec<(usize, f32)> = rows
            .into_iter()
            .map(|row| (row, self.score(query, row)))
            .collect();
        scored.sort_by(|a, b| match b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        scored
    }

    fn score(&self, query: &[f32], row: usize) -> f32 {
        inner_product(query, &self.vectors[row]).clamp(-1.0, 1.0)
    }
}

pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::normalize_l2;

    fn unit(v: &[f32]) -> Vec<f32> {
        let mut v = v.to_vec();
        normalize_l2(&mut v);
        v
    }

    fn fixture() -> GameIndex {
        GameIndex::build(
            3,
            vec![
                unit(&[1.0, 0.0, 0.0]),
                unit(&[0.0, 1.0, 0.0]),
                unit(&[1.0, 1.0, 0.0]),
                unit(&[-1.0, 0.0, 0.0]),
                unit(&[0.0, 0.0, 1.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_build_holds_every_vector() {
        let index = fixture();
        assert_eq!(index.len(), 5);
        assert_eq!(index.dimension(), 3);
    }

    #[test]
    fn test_build_rejects_wrong_dimension() {
        let err = GameIndex::build(3, vec![vec![1.0, 0.0, 0.0], vec![1.0, 0.0]]).err();
        assert!(matches!(
            err,
            Some(ScoutError::DimensionMismatch {
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn test_search_ranks_by_inner_product() {
        let index = fixture();
        let hits = index.search(&unit(&[1.0, 0.2, 0.0]), 3).unwrap();
        let rows: Vec<usize> = hits.iter().map(|(r, _)| *r).collect();
        assert_eq!(rows, vec![0, 2, 1]);
        assert!((hits[0].1 - inner_product(&unit(&[1.0, 0.2, 0.0]), &unit(&[1.0, 0.0, 0.0]))).abs() < 1e-6);
    }

    #[test]
    fn test_search_returns_all_when_k_exceeds_len() {
        let index = fixture();
        let hits = index.search(&unit(&[1.0, 0.0, 0.0]), 50).unwrap();
        assert_eq!(hits.len(), 5);
        assert!(hits.windows(2).all(|w| w[0].1 >= w[1].1));
        assert!(hits.iter().all(|(_, s)| (-1.0..=1.0).contains(s)));
        assert_eq!(hits.last().unwrap().0, 3);
        assert!((hits.last().unwrap().1 + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_search_ties_keep_row_order() {
        let index = fixture();
        // Orthogonal to rows 0, 1, 2 and 3.
        let hits = index.search(&[0.0, 0.0, 1.0], 5).unwrap();
        assert_eq!(hits[0].0, 4);
        let tied: Vec<usize> = hits[1..].iter().map(|(r, _)| *r).collect();
        assert_eq!(tied, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_search_zero_k_and_bad_query() {
        let index = fixture();
        assert!(index.search(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
        assert!(matches!(
            index.search(&[1.0, 0.0], 1),
            Err(ScoutError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_zero_vectors_are_scored_exactly() {
        let index = GameIndex::build(
            2,
            vec![vec![0.0, 0.0], unit(&[-1.0, 0.0]), unit(&[1.0, 0.0])],
        )
        .unwrap();
        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits, vec![(2, 1.0), (0, 0.0)]);
    }

    /// 40 rows: enough that a small `k` goes through the `hora` candidates.
    fn wide_fixture() -> GameIndex {
        let vectors = (0..40)
            .map(|row| match row {
                25 => unit(&[1.0, 0.0, 0.0, 0.0]),
                r if r % 2 == 0 => unit(&[0.0, 1.0, 0.0, 0.0]),
                _ => unit(&[0.0, 0.0, 1.0, 0.0]),
            })
            .collect();
        GameIndex::build(4, vectors).unwrap()
    }

    #[test]
    fn test_ties_at_cutoff_keep_row_order_when_k_is_small() {
        let index = wide_fixture();
        // Row 25 wins; the other 39 rows all score 0.0.
        let hits = index.search(&[1.0, 0.0, 0.0, 0.0], 3).unwrap();
        assert_eq!(hits, vec![(25, 1.0), (0, 0.0), (1, 0.0)]);

        // Every row is orthogonal to this query.
        let hits = index.search(&[0.0, 0.0, 0.0, 1.0], 4).unwrap();
        let rows: Vec<usize> = hits.iter().map(|(r, _)| *r).collect();
        assert_eq!(rows, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_zero_query_returns_leading_rows() {
        let index = wide_fixture();
        let hits = index.search(&[0.0; 4], 3).unwrap();
        assert_eq!(hits, vec![(0, 0.0), (1, 0.0), (2, 0.0)]);
    }

    #[test]
    fn test_separated_scores_with_small_k() {
        let vectors = (0..40)
            .map(|i| unit(&[1.0, i as f32 / 10.0, 0.0]))
            .collect();
        let index = GameIndex::build(3, vectors).unwrap();
        let hits = index.search(&[1.0, 0.0, 0.0], 3).unwrap();
        let rows: Vec<usize> = hits.iter().map(|(r, _)| *r).collect();
        assert_eq!(rows, vec![0, 1, 2]);
        assert!((hits[0].1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_index() {
        let index = GameIndex::build(4, Vec::new()).unwrap();
        assert!(index.is_empty());
        assert!(index.search(&[0.0; 4], 3).unwrap().is_empty());
    }
}
