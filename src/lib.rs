//! Featio: example file loading and prediction driver
//!
//! This crate turns labelled or unlabelled feature files into a uniform
//! [`ExampleTable`](models::ExampleTable) that a classifier can consume:
//!
//! 1. **Format dispatch** -- The file suffix (`.tsv`, `.jsonlines`, `.megam`) selects
//!    a streaming reader; any other suffix is rejected before the file is opened
//! 2. **Streaming readers** -- Each format yields `(id, label, feature map)` records
//!    in file order, with synthetic `EXAMPLE_<n>` ids where the file has none
//! 3. **Materialization** -- Three independent passes (ids, labels, features) run
//!    concurrently on the rayon pool and are assembled positionally
//! 4. **Vectorization** -- Feature maps become a dense or CSR matrix with a stable
//!    name-to-column mapping that can be reused on other files
//!
//! A thin prediction layer ([`predict`], [`model`]) loads a persisted linear
//! model and converts its raw outputs into probabilities, thresholded decisions,
//! regression values or class labels.
//!
//! # Key Modules
//!
//! - [`formats`] -- TSV, JSON-lines and MegaM readers plus suffix dispatch
//! - [`sanitize`] -- Non-ASCII escaping, safe float parsing, UTF-8/windows-1252 decoding
//! - [`load`] -- Parallel and sequential materialization into an example table
//! - [`vectorizer`] -- Feature name to column mapping, `fit_transform`/`transform`
//! - [`matrix`] -- Dense (`ndarray`) and CSR feature matrices
//! - [`models`] -- Core data types (Example, FeatureValue, ExampleTable)
//! - [`predict`] -- Classifier contract and prediction post-processing
//! - [`model`] -- Linear model with bincode persistence
//! - [`progress`] -- Per-file progress notices on stderr
//! - [`config`] -- Constants for loading and model persistence
//!
//! # Example Usage
//!
//! ```bash
//! # Predict with a saved model (reads clf.model)
//! featio predict clf test.jsonlines --threshold 0.5
//!
//! # Summarize a labelled training file
//! featio inspect -l train.megam --show-vocabulary
//! ```

pub mod config;
pub mod formats;
pub mod load;
pub mod matrix;
pub mod model;
pub mod models;
pub mod predict;
pub mod progress;
pub mod sanitize;
pub mod vectorizer;

pub use formats::{ExampleFormat, ReadOptions, UnsupportedFormat};
pub use load::{load_examples, LoadOptions, Materialization};
pub use models::{Example, ExampleTable, FeatureMap, FeatureValue};
pub use vectorizer::Vectorizer;
