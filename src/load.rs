//! Builds an [`ExampleTable`] from an example file.
//!
//! The default [`Materialization::Parallel`] strategy runs three independent
//! passes over the file on the rayon pool:
//!
//! 1. **ids** -- collects example ids
//! 2. **labels** -- collects class labels
//! 3. **features** -- streams feature maps straight into the [`Vectorizer`]
//!
//! Each pass opens its own reader, so no example is ever held by more than one
//! pass and no state is shared between them. Every pass reads the same file in
//! the same record order, so row `i` of each projection describes the same
//! example. [`Materialization::Sequential`] collects all three projections in a
//! single pass and yields an identical table.
//!
//! Any failure in any pass fails the whole load; partial tables are discarded.

use crate::formats::{ExampleFormat, ReadOptions};
use crate::matrix::FeatureMatrix;
use crate::models::ExampleTable;
use crate::vectorizer::Vectorizer;
use anyhow::{bail, Context, Result};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Materialization {
    /// Three concurrent passes (ids, labels, features)
    #[default]
    Parallel,
    /// One pass collecting all projections together
    Sequential,
}

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub has_labels: bool,
    /// Keep the feature matrix in CSR form instead of densifying it
    pub sparse: bool,
    pub quiet: bool,
    pub strategy: Materialization,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            has_labels: true,
            sparse: true,
            quiet: false,
            strategy: Materialization::Parallel,
        }
    }
}

/// Loads a `.tsv`, `.jsonlines` or `.megam` file into an [`ExampleTable`].
///
/// The format is chosen from the suffix before the file is touched; an
/// unsupported suffix fails with [`UnsupportedFormat`](crate::formats::UnsupportedFormat).
pub fn load_examples(path: impl AsRef<Path>, options: &LoadOptions) -> Result<ExampleTable> {
    let path = path.as_ref();
    let format = ExampleFormat::from_path(path)?;

    info!(
        path = %path.display(),
        %format,
        strategy = ?options.strategy,
        "Loading examples"
    );
    let start = Instant::now();

    let table = match options.strategy {
        Materialization::Parallel => load_parallel(format, path, options),
        Materialization::Sequential => load_sequential(format, path, options),
    }
    .with_context(|| format!("Failed to load examples from: {}", path.display()))?;

    info!(
        examples = table.len(),
        features = table.vectorizer.len(),
        duration_secs = start.elapsed().as_secs_f64(),
        "Examples loaded"
    );
    Ok(table)
}

fn quiet_options(has_labels: bool) -> ReadOptions {
    ReadOptions {
        has_labels,
        quiet: true,
    }
}

fn ids_pass(format: ExampleFormat, path: &Path, has_labels: bool) -> Result<Vec<String>> {
    let ids = format
        .open(path, quiet_options(has_labels))?
        .map(|example| example.map(|e| e.id))
        .collect::<Result<Vec<_>>>()?;
    debug!(count = ids.len(), "Id pass complete");
    Ok(ids)
}

fn labels_pass(
    format: ExampleFormat,
    path: &Path,
    has_labels: bool,
) -> Result<Vec<Option<String>>> {
    let labels = format
        .open(path, quiet_options(has_labels))?
        .map(|example| example.map(|e| e.label))
        .collect::<Result<Vec<_>>>()?;
    debug!(count = labels.len(), "Label pass complete");
    Ok(labels)
}

fn features_pass(
    format: ExampleFormat,
    path: &Path,
    options: &LoadOptions,
) -> Result<(Vectorizer, FeatureMatrix)> {
    let read = ReadOptions {
        has_labels: options.has_labels,
        quiet: options.quiet,
    };
    let reader = format.open(path, read)?;
    let fitted = Vectorizer::fit_transform(reader.map(|e| e.map(|e| e.features)), options.sparse)?;
    debug!(rows = fitted.1.n_rows(), "Feature pass complete");
    Ok(fitted)
}

fn load_parallel(format: ExampleFormat, path: &Path, options: &LoadOptions) -> Result<ExampleTable> {
    let has_labels = options.has_labels;
    let (ids, (labels, features)) = rayon::join(
        || ids_pass(format, path, has_labels),
        || {
            rayon::join(
                || labels_pass(format, path, has_labels),
                || features_pass(format, path, options),
            )
        },
    );

    let ids = ids.context("Id pass failed")?;
    let labels = labels.context("Label pass failed")?;
    let (vectorizer, features) = features.context("Feature pass failed")?;
    assemble(ids, labels, features, vectorizer)
}

fn load_sequential(
    format: ExampleFormat,
    path: &Path,
    options: &LoadOptions,
) -> Result<ExampleTable> {
    let read = ReadOptions {
        has_labels: options.has_labels,
        quiet: options.quiet,
    };
    let reader = format.open(path, read)?;

    let mut ids = Vec::new();
    let mut labels = Vec::new();
    let (vectorizer, features) = Vectorizer::fit_transform(
        reader.map(|example| {
            example.map(|e| {
                ids.push(e.id);
                labels.push(e.label);
                e.features
            })
        }),
        options.sparse,
    )?;
    assemble(ids, labels, features, vectorizer)
}

fn assemble(
    ids: Vec<String>,
    labels: Vec<Option<String>>,
    features: FeatureMatrix,
    vectorizer: Vectorizer,
) -> Result<ExampleTable> {
    // Passes disagree only if the file changed underneath us
    if ids.len() != labels.len() || ids.len() != features.n_rows() {
        bail!(
            "Passes produced different example counts (ids: {}, labels: {}, features: {})",
            ids.len(),
            labels.len(),
            features.n_rows()
        );
    }
    Ok(ExampleTable {
        ids,
        labels,
        features,
        vectorizer,
    })
}
