//! Pairwise similarity matrices and their descriptive statistics

use serde::{Deserialize, Serialize};

/// Symmetric pairwise similarity matrix over a batch of items.
///
/// Built by computing each `i <= j` cell once and mirroring, so symmetry
/// holds by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    rows: Vec<Vec<f64>>,
}

/// Descriptive statistics over the strict upper triangle of a matrix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatrixStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Number of distinct pairs the statistics cover
    pub pairs: usize,
}

impl SimilarityMatrix {
    /// Wrap precomputed rows. Rows must form a square matrix.
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == rows.len()));
        Self { rows }
    }

    /// Number of items in the batch.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch was empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The similarity of items `i` and `j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.rows[i][j]
    }

    /// Average similarity of item `i` to every other item.
    ///
    /// The diagonal is excluded so self-similarity does not inflate the
    /// average. Returns 0.0 for a single-item batch.
    pub fn row_average(&self, i: usize) -> f64 {
        let n = self.rows.len();
        if n < 2 {
            return 0.0;
        }
        let sum: f64 = self.rows[i]
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, s)| s)
            .sum();
        sum / (n - 1) as f64
    }

    /// Mean/std/min/max over the strict upper triangle.
    ///
    /// `None` when the batch holds fewer than two items.
    pub fn stats(&self) -> Option<MatrixStats> {
        let mut values = Vec::new();
        for i in 0..self.rows.len() {
            for j in (i + 1)..self.rows.len() {
                values.push(self.rows[i][j]);
            }
        }
        if values.is_empty() {
            return None;
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(MatrixStats {
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
            pairs: values.len(),
        })
    }

    /// Index of the item most similar on average to the rest of the batch:
    /// the most typical output across repeated generations. Ties resolve to
    /// the lowest index.
    pub fn most_representative(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for i in 0..self.rows.len() {
            let average = self.row_average(i);
            if best.is_none_or(|(_, b)| average > b) {
                best = Some((i, average));
            }
        }
        best.map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SimilarityMatrix {
        SimilarityMatrix::new(vec![
            vec![1.0, 0.8, 0.2],
            vec![0.8, 1.0, 0.6],
            vec![0.2, 0.6, 1.0],
        ])
    }

    #[test]
    fn test_stats_cover_upper_triangle_only() {
        let stats = sample().stats().unwrap();
        assert_eq!(stats.pairs, 3);
        assert!((stats.mean - (0.8 + 0.2 + 0.6) / 3.0).abs() < 1e-12);
        assert_eq!(stats.min, 0.2);
        assert_eq!(stats.max, 0.8);
    }

    #[test]
    fn test_stats_need_two_items() {
        assert!(SimilarityMatrix::new(vec![vec![1.0]]).stats().is_none());
        assert!(SimilarityMatrix::new(vec![]).stats().is_none());
    }

    #[test]
    fn test_most_representative_is_highest_row_average() {
        // Row averages: a=(0.8+0.2)/2=0.5, b=(0.8+0.6)/2=0.7, c=(0.2+0.6)/2=0.4
        assert_eq!(sample().most_representative(), Some(1));
    }

    #[test]
    fn test_most_representative_tie_breaks_low() {
        let matrix = SimilarityMatrix::new(vec![vec![1.0, 0.5], vec![0.5, 1.0]]);
        assert_eq!(matrix.most_representative(), Some(0));
    }

    #[test]
    fn test_empty_matrix() {
        let matrix = SimilarityMatrix::new(vec![]);
        assert!(matrix.is_empty());
        assert_eq!(matrix.most_representative(), None);
    }

    #[test]
    fn test_std_dev() {
        let matrix = SimilarityMatrix::new(vec![
            vec![1.0, 0.4, 0.8],
            vec![0.4, 1.0, 0.6],
            vec![0.8, 0.6, 1.0],
        ]);
        let stats = matrix.stats().unwrap();
        let mean = (0.4 + 0.8 + 0.6) / 3.0;
        let variance = ((0.4f64 - mean).powi(2) + (0.8 - mean).powi(2) + (0.6 - mean).powi(2)) / 3.0;
        assert!((stats.std_dev - variance.sqrt()).abs() < 1e-12);
    }
}
