use crate::config::PROGRESS_INTERVAL;
use indicatif::ProgressBar;
use std::path::Path;
use tracing::debug;

/// Progress notices for one pass over an example file.
///
/// Draws a spinner on stderr: `Loading <path>...` at start, a tick every
/// [`PROGRESS_INTERVAL`] examples, and `done` once the reader is exhausted.
/// Quiet readers get a hidden bar, so the output never affects the examples.
pub struct LoadProgress {
    pb: ProgressBar,
    message: String,
    finished: bool,
}

impl LoadProgress {
    pub fn start(path: &Path, quiet: bool) -> Self {
        let message = format!("Loading {}...", path.display());
        let pb = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new_spinner();
            pb.set_message(message.clone());
            pb
        };
        debug!(path = %path.display(), quiet, "Reader opened");
        Self {
            pb,
            message,
            finished: false,
        }
    }

    /// Records that the `count`-th example (0-based) was produced.
    pub fn example(&self, count: usize) {
        if count % PROGRESS_INTERVAL == 0 {
            self.pb.tick();
        }
    }

    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.pb.finish_with_message(format!("{}done", self.message));
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
