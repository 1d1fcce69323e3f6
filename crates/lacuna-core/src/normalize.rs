//! L2 normalization of embedding pools. Dot products of the output are cosine similarities.

use ndarray::{Array2, ArrayView1, Axis};

use crate::store::VectorStore;

/// Norms below this are treated as zero; such rows stay all-zero instead of becoming NaN/Inf.
pub const ZERO_NORM_EPSILON: f64 = 1e-12;

/// Euclidean norm, accumulated in f64.
pub fn l2_norm(v: ArrayView1<'_, f32>) -> f64 {
    v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt()
}

/// Returns a new pool with every vector scaled to unit length. The input is left untouched.
/// Zero-norm vectors come out as zero vectors, so they score 0 against everything.
pub fn normalize(store: &VectorStore) -> VectorStore {
    let mut out = Array2::<f32>::zeros((store.len(), store.dim()));
    let mut zero_rows = 0usize;
    for (src, mut dst) in store.matrix().axis_iter(Axis(0)).zip(out.axis_iter_mut(Axis(0))) {
        let norm = l2_norm(src);
        if norm < ZERO_NORM_EPSILON {
            zero_rows += 1;
            continue;
        }
        for (d, &s) in dst.iter_mut().zip(src.iter()) {
            *d = (f64::from(s) / norm) as f32;
        }
    }
    if zero_rows > 0 {
        tracing::debug!(zero_rows, total = store.len(), "zero-norm vectors left as zero");
    }
    store.with_matrix(out)
}
