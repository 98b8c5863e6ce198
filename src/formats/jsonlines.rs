use crate::config::{synthetic_id, READ_BUFFER_SIZE};
use crate::formats::ReadOptions;
use crate::models::{Example, FeatureMap, FeatureValue};
use crate::progress::LoadProgress;
use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

/// Scalar JSON values accepted as features.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonScalar {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl JsonScalar {
    fn into_feature(self) -> FeatureValue {
        match self {
            JsonScalar::Number(n) => FeatureValue::Number(n),
            JsonScalar::Text(s) => FeatureValue::Text(s),
            JsonScalar::Bool(b) => FeatureValue::Number(if b { 1.0 } else { 0.0 }),
        }
    }
}

#[derive(Deserialize)]
struct JsonExample {
    #[serde(default, deserialize_with = "present")]
    id: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    y: Option<Value>,
    x: IndexMap<String, JsonScalar>,
}

/// `Some` for any value in the object, `null` included; `None` only when the field is absent.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// Text form of an id or label. Numbers keep the digits as written.
fn scalar_text(field: &str, value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Array(_) | Value::Object(_) => bail!("field \"{}\" must be a scalar", field),
        other => Ok(other.to_string()),
    }
}

/// One JSON object per line: `{"id": ..., "y": ..., "x": {name: value, ...}}`.
///
/// `x` is used verbatim as the feature map, in document order; zero values are
/// kept. Numeric ids and labels are rendered exactly as written, and an explicit
/// `null` becomes the text `null`.
///
/// Blank lines are tolerated: they produce no example but still count toward the
/// line index used for synthetic ids and error messages.
pub struct JsonLinesReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    has_labels: bool,
    line_index: usize,
    progress: LoadProgress,
}

impl JsonLinesReader {
    pub fn open(path: &Path, options: ReadOptions) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open JSON-lines file: {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::with_capacity(READ_BUFFER_SIZE, file).lines(),
            has_labels: options.has_labels,
            line_index: 0,
            progress: LoadProgress::start(path, options.quiet),
        })
    }

    fn parse(&self, index: usize, line: &str) -> Result<Example> {
        let raw: JsonExample = serde_json::from_str(line)?;

        let label = if self.has_labels {
            match raw.y {
                Some(y) => Some(scalar_text("y", y)?),
                None => bail!("missing label field \"y\""),
            }
        } else {
            None
        };

        let id = match raw.id {
            Some(id) => scalar_text("id", id)?,
            None => synthetic_id(index),
        };

        let features: FeatureMap = raw
            .x
            .into_iter()
            .map(|(name, value)| (name, value.into_feature()))
            .collect();

        Ok(Example {
            id,
            label,
            features,
        })
    }
}

impl Iterator for JsonLinesReader {
    type Item = Result<Example>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next() {
                None => {
                    self.progress.finish();
                    return None;
                }
                Some(line) => line,
            };
            let index = self.line_index;
            self.line_index += 1;

            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    let ctx = format!("Failed to read line {} in: {}", index + 1, self.path.display());
                    return Some(Err(anyhow::Error::new(e).context(ctx)));
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let example = self.parse(index, line.trim()).with_context(|| {
                format!("Malformed JSON-lines line {} in: {}", index + 1, self.path.display())
            });
            if example.is_ok() {
                self.progress.example(index);
            }
            return Some(example);
        }
    }
}
