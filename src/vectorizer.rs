use crate::config::ONE_HOT_SEPARATOR;
use crate::matrix::{CsrMatrix, FeatureMatrix};
use crate::models::{FeatureMap, FeatureValue};
use anyhow::{bail, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::debug;

/// Stable mapping between feature names and matrix columns.
///
/// Numeric features map to a column named after the feature. Text features
/// are one-hot encoded: `color: "red"` becomes column `color=red` with value 1.
/// Columns are numbered in order of first appearance during [`fit_transform`].
///
/// [`fit_transform`]: Vectorizer::fit_transform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vectorizer {
    feature_names: Vec<String>,
    vocabulary: FxHashMap<String, usize>,
}

/// Column name and numeric contribution of one feature.
fn column_key<'a>(name: &'a str, value: &FeatureValue) -> (Cow<'a, str>, f64) {
    match value {
        FeatureValue::Number(n) => (Cow::Borrowed(name), *n),
        FeatureValue::Text(s) => (
            Cow::Owned(format!("{}{}{}", name, ONE_HOT_SEPARATOR, s)),
            1.0,
        ),
    }
}

impl Vectorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a vectorizer from `maps` and vectorizes them in the same pass.
    ///
    /// Stops at the first `Err` item and returns it.
    pub fn fit_transform<I>(maps: I, sparse: bool) -> Result<(Self, FeatureMatrix)>
    where
        I: IntoIterator<Item = Result<FeatureMap>>,
    {
        let mut vectorizer = Self::new();
        let mut csr = CsrMatrix::new(0);
        for map in maps {
            let map = map?;
            let row: Vec<(usize, f64)> = map
                .iter()
                .map(|(name, value)| {
                    let (key, n) = column_key(name, value);
                    (vectorizer.intern(key), n)
                })
                .collect();
            csr.push_row(row);
        }
        csr.widen(vectorizer.len());

        debug!(
            rows = csr.n_rows(),
            columns = vectorizer.len(),
            nnz = csr.nnz(),
            "Vectorizer fitted"
        );
        Ok((vectorizer, FeatureMatrix::from_csr(csr, sparse)))
    }

    /// Vectorizes `maps` against the existing column space. Unknown features are ignored.
    pub fn transform<'a, I>(&self, maps: I, sparse: bool) -> FeatureMatrix
    where
        I: IntoIterator<Item = &'a FeatureMap>,
    {
        let mut csr = CsrMatrix::new(self.len());
        for map in maps {
            csr.push_row(self.transform_row(map));
        }
        FeatureMatrix::from_csr(csr, sparse)
    }

    pub fn transform_row(&self, map: &FeatureMap) -> Vec<(usize, f64)> {
        map.iter()
            .filter_map(|(name, value)| {
                let (key, n) = column_key(name, value);
                self.index_of(&key).map(|col| (col, n))
            })
            .collect()
    }

    fn intern(&mut self, key: Cow<'_, str>) -> usize {
        if let Some(&col) = self.vocabulary.get(key.as_ref()) {
            return col;
        }
        let col = self.feature_names.len();
        let key = key.into_owned();
        self.vocabulary.insert(key.clone(), col);
        self.feature_names.push(key);
        col
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.vocabulary.get(name).copied()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// For each column of `other`, the matching column in `self` (by name).
    pub fn column_mapping(&self, other: &Vectorizer) -> Vec<Option<usize>> {
        other
            .feature_names
            .iter()
            .map(|name| self.index_of(name))
            .collect()
    }

    /// Checks that every feature name maps back to its own column and nothing else
    /// is in the vocabulary. Only deserialized vectorizers can fail this.
    pub fn check_consistent(&self) -> Result<()> {
        if self.vocabulary.len() != self.feature_names.len() {
            bail!(
                "Vocabulary has {} entries but there are {} feature names",
                self.vocabulary.len(),
                self.feature_names.len()
            );
        }
        for (col, name) in self.feature_names.iter().enumerate() {
            if self.index_of(name) != Some(col) {
                bail!("Feature {:?} is not mapped to column {}", name, col);
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feature_names.is_empty()
    }
}

impl FromIterator<String> for Vectorizer {
    /// Builds a vectorizer whose columns are `names` in order; repeats are ignored.
    fn from_iter<T: IntoIterator<Item = String>>(names: T) -> Self {
        let mut vectorizer = Self::new();
        for name in names {
            vectorizer.intern(Cow::Owned(name));
        }
        vectorizer
    }
}
