//! Streaming readers for the supported example file formats.
//!
//! Every reader yields `Result<Example>` items in file order from a single pass
//! over one file. A reader cannot be restarted, so callers that need another
//! pass open the file again through [`ExampleFormat::open`].
//!
//! | Suffix | Reader | Label | Id |
//! |---|---|---|---|
//! | `.tsv` | [`tsv::TsvReader`] | first non-`id` column | `id` column |
//! | `.jsonlines` | [`jsonlines::JsonLinesReader`] | key `y` | key `id` |
//! | `.megam` | [`megam::MegaMReader`] | first token | preceding `#` line |
//!
//! Examples without an id get `EXAMPLE_<n>`.

pub mod jsonlines;
pub mod megam;
pub mod tsv;

use crate::models::Example;
use anyhow::Result;
use std::fmt;
use std::path::Path;
use thiserror::Error;

pub use jsonlines::JsonLinesReader;
pub use megam::MegaMReader;
pub use tsv::TsvReader;

/// Raised when a path does not end in one of the supported suffixes.
#[derive(Debug, Error)]
#[error("Example files must be in either TSV, MegaM, or .jsonlines format. You specified: {path}")]
pub struct UnsupportedFormat {
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleFormat {
    Tsv,
    JsonLines,
    MegaM,
}

/// Options shared by all readers.
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    pub has_labels: bool,
    /// Suppress the progress notices on stderr
    pub quiet: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            has_labels: true,
            quiet: false,
        }
    }
}

impl ExampleFormat {
    pub const ALL: [ExampleFormat; 3] = [
        ExampleFormat::Tsv,
        ExampleFormat::JsonLines,
        ExampleFormat::MegaM,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            ExampleFormat::Tsv => ".tsv",
            ExampleFormat::JsonLines => ".jsonlines",
            ExampleFormat::MegaM => ".megam",
        }
    }

    /// Picks the format from the path suffix alone; no I/O happens here.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, UnsupportedFormat> {
        let path = path.as_ref().to_string_lossy();
        Self::ALL
            .into_iter()
            .find(|format| path.ends_with(format.suffix()))
            .ok_or_else(|| UnsupportedFormat {
                path: path.into_owned(),
            })
    }

    /// Opens a fresh reader over `path`.
    pub fn open(self, path: impl AsRef<Path>, options: ReadOptions) -> Result<ExampleReader> {
        let path = path.as_ref();
        Ok(match self {
            ExampleFormat::Tsv => ExampleReader::Tsv(TsvReader::open(path, options)?),
            ExampleFormat::JsonLines => {
                ExampleReader::JsonLines(JsonLinesReader::open(path, options)?)
            }
            ExampleFormat::MegaM => ExampleReader::MegaM(MegaMReader::open(path, options)?),
        })
    }
}

impl fmt::Display for ExampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExampleFormat::Tsv => "tsv",
            ExampleFormat::JsonLines => "jsonlines",
            ExampleFormat::MegaM => "megam",
        })
    }
}

/// A reader over any supported format.
pub enum ExampleReader {
    Tsv(TsvReader),
    JsonLines(JsonLinesReader),
    MegaM(MegaMReader),
}

impl Iterator for ExampleReader {
    type Item = Result<Example>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            ExampleReader::Tsv(r) => r.next(),
            ExampleReader::JsonLines(r) => r.next(),
            ExampleReader::MegaM(r) => r.next(),
        }
    }
}

/// Dispatches on the suffix of `path` and opens the matching reader.
pub fn open_examples(path: impl AsRef<Path>, options: ReadOptions) -> Result<ExampleReader> {
    let path = path.as_ref();
    ExampleFormat::from_path(path)?.open(path, options)
}
