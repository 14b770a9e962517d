// ============================================================
// Shared — Pipeline Error Taxonomy
// ============================================================
// Every failure the data layer can report. The application and
// CLI layers wrap these in anyhow::Error with extra context;
// the data layer itself never reaches for anyhow so callers can
// still match on the variant (e.g. FeatureMissing vs Decode).

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for the sample pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    // ========== Archive Errors ==========

    /// A shard archive could not be opened
    #[error("Cannot open feature archive '{path}': {source}")]
    ArchiveOpen {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// An entry exists but could not be read out of the archive
    #[error("Cannot read entry '{entry}' from shard {shard} ('{}'): {reason}", .archive.display())]
    EntryRead {
        shard: usize,
        archive: PathBuf,
        entry: String,
        reason: String,
    },

    /// The entry bytes are not a valid .npy payload
    #[error("Cannot decode features of '{id}' from shard {shard}: {reason}")]
    Decode {
        id: String,
        shard: usize,
        reason: String,
    },

    /// The decoded array is not (frames x feature_dim)
    #[error("Features of '{id}' have shape {shape:?}, expected 2 dimensions")]
    BadShape { id: String, shape: Vec<u64> },

    /// Neither shard holds the id
    #[error("Features for '{id}' not found in any shard")]
    FeatureMissing { id: String },

    // ========== Record Errors ==========

    /// Index past the end of the record table
    #[error("Index {index} out of range for {len} records")]
    IndexOutOfRange { index: usize, len: usize },

    /// Train-mode record without a category id
    #[error("Record '{id}' has no category_id")]
    MissingLabel { id: String },

    /// Category id not present in the category list
    #[error("Unknown category id '{category_id}'")]
    UnknownCategory { category_id: String },

    /// The category list itself is malformed
    #[error("Invalid category list: {reason}")]
    CategoryList { reason: String },

    /// Annotation file could not be parsed
    #[error("Cannot parse annotations '{path}': {source}")]
    Annotation {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // ========== Text Errors ==========

    /// Tokenizer load or encode failure
    #[error("Tokenizer error: {message}")]
    Tokenizer { message: String },

    // ========== Configuration / IO ==========

    /// Invalid configuration value
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// True when the error means the data on disk is unusable,
    /// as opposed to simply absent
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            PipelineError::EntryRead { .. }
                | PipelineError::Decode { .. }
                | PipelineError::BadShape { .. }
        )
    }

    pub(crate) fn tokenizer(message: impl std::fmt::Display) -> Self {
        PipelineError::Tokenizer { message: message.to_string() }
    }
}

/// Result alias for data-layer operations
pub type Result<T> = std::result::Result<T, PipelineError>;
