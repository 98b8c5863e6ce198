//! Feature matrix storage.
//!
//! [`FeatureMatrix`] is either a dense [`ndarray::Array2`] or a compressed sparse
//! row [`CsrMatrix`]. Both address the same column space built by the
//! [`Vectorizer`](crate::vectorizer::Vectorizer).

use ndarray::Array2;

/// Compressed sparse row matrix of `f64`.
///
/// Row `i` occupies `indices[indptr[i]..indptr[i + 1]]` and the matching slice
/// of `data`. Column indices are strictly increasing within a row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CsrMatrix {
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl CsrMatrix {
    pub fn new(n_cols: usize) -> Self {
        Self {
            n_cols,
            indptr: vec![0],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Appends a row. Entries may come in any order; repeated columns are summed.
    /// The column count grows to cover every index seen.
    pub fn push_row(&mut self, entries: impl IntoIterator<Item = (usize, f64)>) {
        let mut row: Vec<(usize, f64)> = entries.into_iter().collect();
        row.sort_unstable_by_key(|&(col, _)| col);

        let start = self.indices.len();
        for (col, value) in row {
            if self.indices.len() > start && self.indices[self.indices.len() - 1] == col {
                if let Some(last) = self.data.last_mut() {
                    *last += value;
                }
                continue;
            }
            self.indices.push(col);
            self.data.push(value);
            self.n_cols = self.n_cols.max(col + 1);
        }
        self.indptr.push(self.indices.len());
    }

    /// Widens the matrix to at least `n_cols` columns.
    pub fn widen(&mut self, n_cols: usize) {
        self.n_cols = self.n_cols.max(n_cols);
    }

    pub fn n_rows(&self) -> usize {
        self.indptr.len() - 1
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let (start, end) = (self.indptr[i], self.indptr[i + 1]);
        self.indices[start..end]
            .iter()
            .copied()
            .zip(self.data[start..end].iter().copied())
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        let (start, end) = (self.indptr[i], self.indptr[i + 1]);
        match self.indices[start..end].binary_search(&j) {
            Ok(pos) => self.data[start + pos],
            Err(_) => 0.0,
        }
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros((self.n_rows(), self.n_cols));
        for i in 0..self.n_rows() {
            for (j, value) in self.row(i) {
                dense[[i, j]] = value;
            }
        }
        dense
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureMatrix {
    Dense(Array2<f64>),
    Sparse(CsrMatrix),
}

impl FeatureMatrix {
    /// Wraps a built CSR matrix, densifying it unless `sparse` is requested.
    pub fn from_csr(csr: CsrMatrix, sparse: bool) -> Self {
        if sparse {
            FeatureMatrix::Sparse(csr)
        } else {
            FeatureMatrix::Dense(csr.to_dense())
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, FeatureMatrix::Sparse(_))
    }

    pub fn n_rows(&self) -> usize {
        match self {
            FeatureMatrix::Dense(m) => m.nrows(),
            FeatureMatrix::Sparse(m) => m.n_rows(),
        }
    }

    pub fn n_cols(&self) -> usize {
        match self {
            FeatureMatrix::Dense(m) => m.ncols(),
            FeatureMatrix::Sparse(m) => m.n_cols(),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_cols())
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        match self {
            FeatureMatrix::Dense(m) => m[[i, j]],
            FeatureMatrix::Sparse(m) => m.get(i, j),
        }
    }

    /// Non-zero `(column, value)` pairs of row `i`, ordered by column.
    pub fn row_entries(&self, i: usize) -> Vec<(usize, f64)> {
        match self {
            FeatureMatrix::Dense(m) => m
                .row(i)
                .iter()
                .enumerate()
                .filter(|(_, v)| **v != 0.0)
                .map(|(j, v)| (j, *v))
                .collect(),
            FeatureMatrix::Sparse(m) => m.row(i).filter(|(_, v)| *v != 0.0).collect(),
        }
    }

    pub fn to_dense(&self) -> Array2<f64> {
        match self {
            FeatureMatrix::Dense(m) => m.clone(),
            FeatureMatrix::Sparse(m) => m.to_dense(),
        }
    }
}
