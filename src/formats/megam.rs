use crate::config::{synthetic_id, MEGAM_PARTITION_MARKERS, READ_BUFFER_SIZE};
use crate::formats::ReadOptions;
use crate::models::{Example, FeatureMap};
use crate::progress::LoadProgress;
use crate::sanitize::{decode_line, parse_value, sanitize_line};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::warn;

/// MegaM `-fvals` files: whitespace-separated `name value` pairs, optionally
/// preceded by a label token.
///
/// A `#` line names the next instance. `TRAIN`/`TEST`/`DEV` lines are skipped.
/// Synthetic ids count emitted instances only, so comment and marker lines
/// never advance them.
pub struct MegaMReader {
    path: PathBuf,
    reader: BufReader<File>,
    buf: Vec<u8>,
    has_labels: bool,
    line_number: usize,
    emitted: usize,
    pending_id: Option<String>,
    progress: LoadProgress,
}

impl MegaMReader {
    pub fn open(path: &Path, options: ReadOptions) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open MegaM file: {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::with_capacity(READ_BUFFER_SIZE, file),
            buf: Vec::new(),
            has_labels: options.has_labels,
            line_number: 0,
            emitted: 0,
            pending_id: None,
            progress: LoadProgress::start(path, options.quiet),
        })
    }

    fn build(&mut self, line: &str) -> Example {
        let mut tokens = line.split_whitespace();
        let label = if self.has_labels {
            tokens.next().map(str::to_string)
        } else {
            None
        };

        let pairs: Vec<&str> = tokens.collect();
        if pairs.len() % 2 == 1 {
            warn!(
                path = %self.path.display(),
                line = self.line_number,
                token = pairs[pairs.len() - 1],
                "Dropping unpaired trailing feature token"
            );
        }

        // Later duplicates overwrite earlier ones
        let mut features = FeatureMap::new();
        for pair in pairs.chunks_exact(2) {
            features.insert(pair[0].to_string(), parse_value(pair[1]));
        }

        let id = self
            .pending_id
            .take()
            .unwrap_or_else(|| synthetic_id(self.emitted));

        Example {
            id,
            label,
            features,
        }
    }
}

impl Iterator for MegaMReader {
    type Item = Result<Example>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.progress.finish();
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    let ctx = format!(
                        "Failed to read line {} in: {}",
                        self.line_number + 1,
                        self.path.display()
                    );
                    return Some(Err(anyhow::Error::new(e).context(ctx)));
                }
            }
            self.line_number += 1;

            let line = sanitize_line(decode_line(&self.buf).trim()).into_owned();

            if let Some(id) = line.strip_prefix('#') {
                self.pending_id = Some(id.trim().to_string());
                continue;
            }
            if line.is_empty() || MEGAM_PARTITION_MARKERS.contains(&line.as_str()) {
                continue;
            }

            let example = self.build(&line);
            self.emitted += 1;
            self.progress.example(self.emitted);
            return Some(Ok(example));
        }
    }
}
