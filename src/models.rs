use crate::matrix::FeatureMatrix;
use crate::vectorizer::Vectorizer;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single feature value: numeric when the raw token parsed as a float,
/// otherwise the original text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
}

impl FeatureValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(n) => Some(*n),
            FeatureValue::Text(_) => None,
        }
    }

    /// True only for a numeric zero; text values are never zero.
    pub fn is_zero(&self) -> bool {
        matches!(self, FeatureValue::Number(n) if *n == 0.0)
    }
}

impl From<f64> for FeatureValue {
    fn from(n: f64) -> Self {
        FeatureValue::Number(n)
    }
}

impl From<&str> for FeatureValue {
    fn from(s: &str) -> Self {
        FeatureValue::Text(s.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(s: String) -> Self {
        FeatureValue::Text(s)
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Number(n) => write!(f, "{}", n),
            FeatureValue::Text(s) => f.write_str(s),
        }
    }
}

/// Sparse name -> value mapping for one example, in the order the features
/// appear in the file. Re-inserting a name replaces its value in place.
pub type FeatureMap = IndexMap<String, FeatureValue>;

/// One record produced by a format reader.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub id: String,
    pub label: Option<String>,
    pub features: FeatureMap,
}

/// The standardized output of a load: co-indexed ids, labels and feature rows
/// plus the vectorizer that fixes the column space.
#[derive(Debug, Clone)]
pub struct ExampleTable {
    pub ids: Vec<String>,
    pub labels: Vec<Option<String>>,
    pub features: FeatureMatrix,
    pub vectorizer: Vectorizer,
}

impl ExampleTable {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn has_labels(&self) -> bool {
        self.labels.iter().any(Option::is_some)
    }

    /// Labels with absent entries skipped; meaningful for labelled files only.
    pub fn label_values(&self) -> Vec<&str> {
        self.labels.iter().flatten().map(String::as_str).collect()
    }
}
