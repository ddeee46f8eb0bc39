//! Flat inner-product index over unit-normalized vectors.
//!
//! Vectors live in one row-major `Vec<f32>`; position `i` is the `i`-th vector
//! passed to [`VectorIndex::build`]. Search is an exhaustive scan, which keeps
//! results exact and the index trivially serializable.

use crate::error::{Result, RetrieverError};

#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dimension: usize,
    vectors: Vec<f32>,
}

/// Scales `vector` to unit length.
///
/// Zero-length and non-finite vectors have no direction and are rejected.
pub fn normalize(vector: &[f32], subject: impl FnOnce() -> String) -> Result<Vec<f32>> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(RetrieverError::degenerate(subject()));
    }
    Ok(vector.iter().map(|v| v / norm).collect())
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl VectorIndex {
    /// Normalize and store `vectors` in order.
    pub fn build(dimension: usize, vectors: &[Vec<f32>]) -> Result<Self> {
        if dimension == 0 {
            return Err(RetrieverError::config("index dimension must be at least 1"));
        }

        let mut flat = Vec::with_capacity(dimension * vectors.len());
        for (position, vector) in vectors.iter().enumerate() {
            if vector.len() != dimension {
                return Err(RetrieverError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            flat.extend(normalize(vector, || format!("vector at position {position}"))?);
        }

        tracing::debug!(
            "Built vector index with {} vectors of dimension {}",
            vectors.len(),
            dimension
        );
        Ok(Self {
            dimension,
            vectors: flat,
        })
    }

    /// Rebuild an index from an already-normalized row-major buffer.
    pub fn from_normalized(dimension: usize, vectors: Vec<f32>) -> Result<Self> {
        if dimension == 0 || vectors.len() % dimension != 0 {
            return Err(RetrieverError::corrupt(format!(
                "{} values do not form rows of dimension {}",
                vectors.len(),
                dimension
            )));
        }
        if vectors.iter().any(|v| !v.is_finite()) {
            return Err(RetrieverError::corrupt("non-finite value in stored vectors"));
        }
        Ok(Self {
            dimension,
            vectors,
        })
    }

    /// The `k` best positions for `query` as `(score, position)`, best first.
    ///
    /// Scores are cosine similarities in `[-1, 1]`; equal scores are ordered by
    /// ascending position. `k` larger than the index returns every entry.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(f32, usize)>> {
        if query.len() != self.dimension {
            return Err(RetrieverError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        let query = normalize(query, || "query vector".to_string())?;
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f32, usize)> = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            // `+ 0.0` folds -0.0 into 0.0 so that orthogonal rows tie under total_cmp
            .map(|(position, row)| (dot(row, &query).clamp(-1.0, 1.0) + 0.0, position))
            .collect();

        let best_first =
            |a: &(f32, usize), b: &(f32, usize)| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1));
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, best_first);
            scored.truncate(k);
        }
        scored.sort_by(best_first);
        Ok(scored)
    }

    /// The stored (normalized) vector at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.vectors.get(start..start + self.dimension)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Row-major view of every stored component.
    pub fn as_slice(&self) -> &[f32] {
        &self.vectors
    }
}
