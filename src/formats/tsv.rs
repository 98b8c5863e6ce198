use crate::config::{synthetic_id, READ_BUFFER_SIZE, TSV_ID_COLUMN};
use crate::formats::ReadOptions;
use crate::models::{Example, FeatureMap};
use crate::progress::LoadProgress;
use crate::sanitize::parse_value;
use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Tab-separated examples with a header row.
///
/// With labels, the label is the first column not named `id`. An `id` column
/// supplies the example id. Every other column is a feature, and zero-valued
/// numeric features are left out of the map.
pub struct TsvReader {
    path: PathBuf,
    records: StringRecordsIntoIter<BufReader<File>>,
    headers: StringRecord,
    label_col: Option<usize>,
    id_col: Option<usize>,
    row: usize,
    progress: LoadProgress,
}

impl TsvReader {
    pub fn open(path: &Path, options: ReadOptions) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open TSV file: {}", path.display()))?;
        let mut rdr = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_reader(BufReader::with_capacity(READ_BUFFER_SIZE, file));

        let headers = rdr
            .headers()
            .with_context(|| format!("Failed to read TSV header in: {}", path.display()))?
            .clone();

        let id_col = headers.iter().position(|h| h == TSV_ID_COLUMN);
        let label_col = if options.has_labels {
            match headers.iter().position(|h| h != TSV_ID_COLUMN) {
                Some(col) => Some(col),
                None if headers.is_empty() => None,
                None => bail!("TSV file has no label column: {}", path.display()),
            }
        } else {
            None
        };

        Ok(Self {
            path: path.to_path_buf(),
            records: rdr.into_records(),
            headers,
            label_col,
            id_col,
            row: 0,
            progress: LoadProgress::start(path, options.quiet),
        })
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    fn build(&self, index: usize, record: &StringRecord) -> Example {
        let label = self
            .label_col
            .map(|col| record.get(col).unwrap_or_default().to_string());
        let id = match self.id_col {
            Some(col) => record.get(col).unwrap_or_default().to_string(),
            None => synthetic_id(index),
        };

        let mut features = FeatureMap::new();
        for (col, (name, raw)) in self.headers.iter().zip(record.iter()).enumerate() {
            if Some(col) == self.label_col || Some(col) == self.id_col {
                continue;
            }
            let value = parse_value(raw);
            if value.is_zero() {
                continue;
            }
            features.insert(name.to_string(), value);
        }

        Example {
            id,
            label,
            features,
        }
    }
}

impl Iterator for TsvReader {
    type Item = Result<Example>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next() {
            None => {
                self.progress.finish();
                return None;
            }
            Some(Err(e)) => {
                let ctx = format!("Malformed TSV row {} in: {}", self.row + 1, self.path.display());
                return Some(Err(anyhow::Error::new(e).context(ctx)));
            }
            Some(Ok(record)) => record,
        };

        let index = self.row;
        self.row += 1;
        let example = self.build(index, &record);
        self.progress.example(index);
        Some(Ok(example))
    }
}
