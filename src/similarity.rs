use crate::error::{Doc2VecError, Result};
use ndarray::prelude::*;
use ndarray_stats::QuantileExt;
use std::collections::BTreeSet;

/// Cosine lookup over a fixed set of document vectors.
pub struct Similarity {
    w: Array2<f32>,
}

fn l2_normalize(mut row: ArrayViewMut1<f32>) {
    let norm = row.dot(&row).sqrt();
    // an all-zero row stays zero and scores 0 against everything
    if norm > 0.0 {
        row.mapv_inplace(|a| a / norm);
    }
}

impl Similarity {

    pub fn new(w: &Array2<f32>) -> Similarity {

        // normalize w so each row has unit l2 norm, cosine becomes a dot product
        let mut w = w.clone();
        for row in w.axis_iter_mut(Axis(0)) {
            l2_normalize(row);
        }
        Self { w }
    }

    pub fn len(&self) -> usize {
        self.w.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.w.nrows() == 0
    }

    /// The `k` rows most similar to `vec`, best first, as (row, cosine) pairs.
    pub fn find_k_most_similar(&self, vec: &Array1<f32>, k: usize) -> Result<Vec<(usize, f32)>> {

        if vec.len() != self.w.ncols() {
            return Err(Doc2VecError::config(
                "dimensionality",
                format!("query has {} dimensions, index has {}", vec.len(), self.w.ncols()),
            ));
        }
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut query = vec.clone();
        l2_normalize(query.view_mut());
        let scores = self.w.dot(&query);

        if k == 1 {
            if let Ok(best) = scores.argmax() {
                return Ok(vec![(best, scores[best])]);
            }
        }

        let mut indexed_scores: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
        // sort by most similar in descending order
        indexed_scores.sort_by(|(_i, s), (_j, t)| t.total_cmp(s));
        indexed_scores.truncate(k);
        Ok(indexed_scores)
    }
}

/// |A ∩ B| / |A ∪ B|. Undefined when both sets are empty.
pub fn jaccard_similarity<T: Ord>(labels: &BTreeSet<T>, preds: &BTreeSet<T>) -> Result<f32> {
    let union = labels.union(preds).count();
    if union == 0 {
        return Err(Doc2VecError::EmptyTagSet { document: None });
    }
    let intersection = labels.intersection(preds).count();
    Ok(intersection as f32 / union as f32)
}
