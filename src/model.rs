use crate::config::{MODEL_SUFFIX, MODEL_VERSION};
use crate::models::ExampleTable;
use crate::predict::{Classifier, ModelType};
use crate::vectorizer::Vectorizer;
use anyhow::{bail, Context, Result};
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

/// A linear classifier or regressor with its own feature column space.
///
/// Examples are scored by name: each column of the incoming table is looked up
/// in the model's vectorizer, and features the model never saw are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    model_type: ModelType,
    probability: bool,
    label_list: Vec<String>,
    vectorizer: Vectorizer,
    /// One weight row per class, or a single row for binary and regression models
    coefficients: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct ModelFile {
    version: u32,
    model: LinearModel,
}

impl LinearModel {
    pub fn regressor(
        model_type: ModelType,
        vectorizer: Vectorizer,
        coefficients: Vec<f64>,
        intercept: f64,
    ) -> Result<Self> {
        if !model_type.is_regression() {
            bail!("{} is not a regression model", model_type);
        }
        Self::validated(Self {
            model_type,
            probability: false,
            label_list: Vec::new(),
            vectorizer,
            coefficients: vec![coefficients],
            intercepts: vec![intercept],
        })
    }

    /// Binary models take a single weight row scoring the second label;
    /// multiclass models take one row per label.
    pub fn classifier(
        model_type: ModelType,
        vectorizer: Vectorizer,
        label_list: Vec<String>,
        coefficients: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
        probability: bool,
    ) -> Result<Self> {
        if model_type.is_regression() {
            bail!("{} is not a classification model", model_type);
        }
        if probability && model_type != ModelType::LogisticRegression {
            bail!("{} does not produce probabilities", model_type);
        }
        let expected_rows = if label_list.len() == 2 { 1 } else { label_list.len() };
        if label_list.len() < 2 || coefficients.len() != expected_rows {
            bail!(
                "{} labels need {} weight rows, got {}",
                label_list.len(),
                expected_rows,
                coefficients.len()
            );
        }
        Self::validated(Self {
            model_type,
            probability,
            label_list,
            vectorizer,
            coefficients,
            intercepts,
        })
    }

    fn validated(self) -> Result<Self> {
        self.vectorizer.check_consistent()?;
        if self.intercepts.len() != self.coefficients.len() {
            bail!(
                "Got {} intercepts for {} weight rows",
                self.intercepts.len(),
                self.coefficients.len()
            );
        }
        if let Some(row) = self.coefficients.iter().find(|r| r.len() != self.vectorizer.len()) {
            bail!(
                "Weight row has {} entries but the vectorizer has {} columns",
                row.len(),
                self.vectorizer.len()
            );
        }
        Ok(self)
    }

    pub fn vectorizer(&self) -> &Vectorizer {
        &self.vectorizer
    }

    fn scores(&self, entries: &[(usize, f64)]) -> Vec<f64> {
        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(weights, intercept)| {
                intercept + entries.iter().map(|&(col, x)| weights[col] * x).sum::<f64>()
            })
            .collect()
    }

    fn outputs(&self, scores: Vec<f64>) -> Vec<f64> {
        if self.model_type.is_regression() {
            return scores;
        }
        if let [score] = *scores.as_slice() {
            let p = sigmoid(score);
            return if self.probability {
                vec![1.0 - p, p]
            } else {
                vec![if score > 0.0 { 1.0 } else { 0.0 }]
            };
        }
        if self.probability {
            softmax(&scores)
        } else {
            vec![argmax(&scores) as f64]
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Index of the largest score; the first one wins ties.
fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, s) in scores.iter().enumerate() {
        if *s > scores[best] {
            best = i;
        }
    }
    best
}

impl Classifier for LinearModel {
    fn predict(&self, examples: &ExampleTable) -> Result<Vec<Vec<f64>>> {
        let mapping = self.vectorizer.column_mapping(&examples.vectorizer);
        let outputs = (0..examples.features.n_rows())
            .map(|i| {
                let entries: Vec<(usize, f64)> = examples
                    .features
                    .row_entries(i)
                    .into_iter()
                    .filter_map(|(col, x)| mapping.get(col).copied().flatten().map(|c| (c, x)))
                    .collect();
                self.outputs(self.scores(&entries))
            })
            .collect();
        Ok(outputs)
    }

    fn probability(&self) -> bool {
        self.probability
    }

    fn model_type(&self) -> ModelType {
        self.model_type
    }

    fn label_list(&self) -> &[String] {
        &self.label_list
    }
}

/// `<prefix>.model`
pub fn model_path(prefix: &str) -> PathBuf {
    PathBuf::from(format!("{}.{}", prefix, MODEL_SUFFIX))
}

pub fn load_model(path: &Path) -> Result<LinearModel> {
    let file_size = fs::metadata(path)
        .with_context(|| format!("Failed to get metadata for model: {}", path.display()))?
        .len();
    let file = File::open(path)
        .with_context(|| format!("Failed to open model file: {}", path.display()))?;
    let reader = BufReader::new(file);

    let options = bincode::options().with_limit(file_size.saturating_add(1024));
    let stored: ModelFile = options
        .deserialize_from(reader)
        .with_context(|| format!("Model file is corrupt or unreadable: {}", path.display()))?;

    if stored.version != MODEL_VERSION {
        bail!(
            "Model version mismatch in {} (file: {}, supported: {})",
            path.display(),
            stored.version,
            MODEL_VERSION
        );
    }

    let model = LinearModel::validated(stored.model)
        .with_context(|| format!("Inconsistent model in: {}", path.display()))?;
    info!(
        path = %path.display(),
        model_type = %model.model_type,
        features = model.vectorizer.len(),
        labels = model.label_list.len(),
        "Model loaded"
    );
    Ok(model)
}

/// Writes the model to a temp file and renames it into place.
pub fn save_model(model: &LinearModel, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
    }

    let stored = ModelFile {
        version: MODEL_VERSION,
        model: model.clone(),
    };

    let tmp_path = path.with_extension(format!("{}.tmp", MODEL_SUFFIX));
    let file = File::create(&tmp_path)
        .with_context(|| format!("Failed to create temp model file: {:?}", tmp_path))?;
    let writer = BufWriter::new(file);

    bincode::DefaultOptions::new()
        .serialize_into(writer, &stored)
        .context("Failed to serialize model")?;

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to rename temp model file to: {:?}", path))?;

    info!(path = ?path, "Model saved");
    Ok(())
}
