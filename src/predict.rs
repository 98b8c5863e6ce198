use crate::models::ExampleTable;
use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
    LogisticRegression,
    LinearSvc,
    LinearRegression,
    Ridge,
}

impl ModelType {
    pub const REGRESSION: [ModelType; 2] = [ModelType::LinearRegression, ModelType::Ridge];

    pub fn is_regression(self) -> bool {
        Self::REGRESSION.contains(&self)
    }

    pub fn name(self) -> &'static str {
        match self {
            ModelType::LogisticRegression => "LogisticRegression",
            ModelType::LinearSvc => "LinearSVC",
            ModelType::LinearRegression => "LinearRegression",
            ModelType::Ridge => "Ridge",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        [
            ModelType::LogisticRegression,
            ModelType::LinearSvc,
            ModelType::LinearRegression,
            ModelType::Ridge,
        ]
        .into_iter()
        .find(|t| t.name().eq_ignore_ascii_case(s))
        .ok_or_else(|| anyhow!("Unknown model type: {}", s))
    }
}

/// A trained model as seen by the prediction driver.
pub trait Classifier {
    /// Raw outputs, one row per example: class probabilities when
    /// [`probability`](Classifier::probability) is set, `[value]` for
    /// regressors, and `[class index]` otherwise.
    fn predict(&self, examples: &ExampleTable) -> Result<Vec<Vec<f64>>>;

    fn probability(&self) -> bool;

    fn model_type(&self) -> ModelType;

    /// Class labels indexed by the class indices `predict` returns.
    fn label_list(&self) -> &[String];
}

/// Final per-example output of a [`Predictor`].
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    /// Probability of the positive class
    Probability(f64),
    /// Positive-class probability compared against a threshold
    Decision(u8),
    /// Regression output
    Value(f64),
    Label(String),
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prediction::Probability(p) => write!(f, "{}", p),
            Prediction::Decision(d) => write!(f, "{}", d),
            Prediction::Value(v) => write!(f, "{}", v),
            Prediction::Label(l) => f.write_str(l),
        }
    }
}

/// Wraps a [`Classifier`] and turns its raw outputs into [`Prediction`]s.
pub struct Predictor<C> {
    classifier: C,
    /// Index of the class whose probability is reported (1 = second class)
    positive_class: usize,
    threshold: Option<f64>,
}

impl<C: Classifier> Predictor<C> {
    pub fn new(classifier: C, positive_class: usize, threshold: Option<f64>) -> Self {
        Self {
            classifier,
            positive_class,
            threshold,
        }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn predict(&self, examples: &ExampleTable) -> Result<Vec<Prediction>> {
        let raw = self.classifier.predict(examples)?;
        if raw.len() != examples.len() {
            bail!(
                "Model returned {} predictions for {} examples",
                raw.len(),
                examples.len()
            );
        }

        raw.into_iter()
            .enumerate()
            .map(|(i, row)| self.convert(&row).map_err(|e| e.context(format!("example {}", i))))
            .collect()
    }

    fn convert(&self, row: &[f64]) -> Result<Prediction> {
        if self.classifier.probability() {
            let p = *row.get(self.positive_class).ok_or_else(|| {
                anyhow!(
                    "Positive class index {} out of range for {} class probabilities",
                    self.positive_class,
                    row.len()
                )
            })?;
            return Ok(match self.threshold {
                None => Prediction::Probability(p),
                Some(t) => Prediction::Decision(u8::from(p >= t)),
            });
        }

        let first = *row.first().ok_or_else(|| anyhow!("Model returned an empty prediction"))?;
        if self.classifier.model_type().is_regression() {
            return Ok(Prediction::Value(first));
        }

        if !first.is_finite() || first < 0.0 {
            bail!("Invalid class index: {}", first);
        }
        let labels = self.classifier.label_list();
        labels
            .get(first as usize)
            .map(|l| Prediction::Label(l.clone()))
            .ok_or_else(|| anyhow!("Class index {} out of range for {} labels", first, labels.len()))
    }
}
