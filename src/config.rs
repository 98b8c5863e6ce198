/// Progress update interval (tick every N examples)
pub const PROGRESS_INTERVAL: usize = 100;

/// Prefix for ids assigned to examples that carry none
pub const SYNTHETIC_ID_PREFIX: &str = "EXAMPLE_";

/// Header column that supplies example ids in TSV files
pub const TSV_ID_COLUMN: &str = "id";

/// MegaM lines equal to one of these are partition markers, not examples
pub const MEGAM_PARTITION_MARKERS: [&str; 3] = ["TRAIN", "TEST", "DEV"];

/// Separator between feature name and value in one-hot columns for text features
pub const ONE_HOT_SEPARATOR: char = '=';

/// Read buffer size for example files
pub const READ_BUFFER_SIZE: usize = 128 * 1024;

/// Suffix appended to a model prefix to locate the persisted model
pub const MODEL_SUFFIX: &str = "model";

/// Bumped whenever the persisted model layout changes
pub const MODEL_VERSION: u32 = 1;

/// Builds the id used for an example that has no explicit one.
pub fn synthetic_id(index: usize) -> String {
    format!("{}{}", SYNTHETIC_ID_PREFIX, index)
}
