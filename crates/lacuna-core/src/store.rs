//! In-memory vector store: fixed-dimension embeddings paired with unique identifiers.
//! Built once per run and never mutated; no persistence, the store is discarded when the process exits.

use std::collections::HashSet;
use std::ops::Range;

use ndarray::{s, Array2, ArrayView1, ArrayView2};

/// An embedding pool. Rows are stored contiguously (row-major N×D) so ranges of rows
/// can be handed to matrix arithmetic without copying.
#[derive(Debug, Clone)]
pub struct VectorStore {
    ids: Vec<String>,
    matrix: Array2<f32>,
}

impl VectorStore {
    /// An empty pool of the given dimension.
    pub fn empty(dim: usize) -> Self {
        Self {
            ids: Vec::new(),
            matrix: Array2::zeros((0, dim)),
        }
    }

    /// Build a pool from (identifier, vector) pairs. The dimension is taken from the first vector.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, PoolError>
    where
        I: IntoIterator<Item = (String, Vec<f32>)>,
    {
        let mut ids = Vec::new();
        let mut seen = HashSet::new();
        let mut data = Vec::new();
        let mut dim = None;

        for (id, vector) in pairs {
            let expected = *dim.get_or_insert(vector.len());
            if vector.len() != expected {
                return Err(PoolError::DimensionMismatch {
                    id,
                    expected,
                    actual: vector.len(),
                });
            }
            if vector.iter().any(|x| !x.is_finite()) {
                return Err(PoolError::NonFiniteValue { id });
            }
            if !seen.insert(id.clone()) {
                return Err(PoolError::DuplicateIdentifier(id));
            }
            data.extend_from_slice(&vector);
            ids.push(id);
        }

        let dim = dim.unwrap_or(0);
        let matrix = Array2::from_shape_vec((ids.len(), dim), data)
            .map_err(|e| PoolError::Shape(e.to_string()))?;
        Ok(Self { ids, matrix })
    }

    /// Build a pool from a matrix and an aligned identifier list (row `i` belongs to `ids[i]`).
    pub fn from_matrix(ids: Vec<String>, matrix: Array2<f32>) -> Result<Self, PoolError> {
        if ids.len() != matrix.nrows() {
            return Err(PoolError::RowCountMismatch {
                ids: ids.len(),
                rows: matrix.nrows(),
            });
        }
        let mut seen = HashSet::with_capacity(ids.len());
        for (id, row) in ids.iter().zip(matrix.rows()) {
            if row.iter().any(|x| !x.is_finite()) {
                return Err(PoolError::NonFiniteValue { id: id.clone() });
            }
            if !seen.insert(id.as_str()) {
                return Err(PoolError::DuplicateIdentifier(id.clone()));
            }
        }
        let matrix = if matrix.is_standard_layout() {
            matrix
        } else {
            matrix.as_standard_layout().into_owned()
        };
        Ok(Self { ids, matrix })
    }

    /// Number of vectors.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Dimension D shared by every vector in the pool.
    pub fn dim(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn id(&self, index: usize) -> &str {
        &self.ids[index]
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn vector(&self, index: usize) -> ArrayView1<'_, f32> {
        self.matrix.row(index)
    }

    /// Zero-copy view of a contiguous range of rows.
    pub fn rows(&self, range: Range<usize>) -> ArrayView2<'_, f32> {
        self.matrix.slice(s![range, ..])
    }

    pub fn matrix(&self) -> ArrayView2<'_, f32> {
        self.matrix.view()
    }

    /// Position of an identifier, if present.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|x| x == id)
    }

    /// Same identifiers, new row data. Used by transforms that preserve the pool's shape.
    pub(crate) fn with_matrix(&self, matrix: Array2<f32>) -> Self {
        debug_assert_eq!(matrix.dim(), self.matrix.dim());
        Self {
            ids: self.ids.clone(),
            matrix,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PoolError {
    #[error("vector for {id:?} has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },
    #[error("duplicate identifier: {0:?}")]
    DuplicateIdentifier(String),
    #[error("vector for {id:?} contains a non-finite value")]
    NonFiniteValue { id: String },
    #[error("{ids} identifiers for {rows} matrix rows")]
    RowCountMismatch { ids: usize, rows: usize },
    #[error("invalid matrix shape: {0}")]
    Shape(String),
}
