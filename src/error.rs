//! Error types for the extraction, identification and persistence stages.

use std::path::PathBuf;

/// Failure to turn a source file into declaration records.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The source is not valid syntax. No records are produced for the file.
    #[error("Syntax error in {}: line {line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Language error: {0}")]
    Language(String),
}

impl ExtractError {
    /// 1-based line of a parse failure.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Parse { line, .. } => Some(*line),
            Self::Language(_) => None,
        }
    }
}

/// Failure to compute a content identifier.
#[derive(Debug, thiserror::Error)]
pub enum CidError {
    #[error("Hashing failed ({algorithm}): {reason}")]
    Hashing {
        algorithm: &'static str,
        reason: String,
    },
}

/// Failure inside a catalog backend.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A content record already exists under this CID with different code.
    #[error("Conflicting content for cid {0}")]
    Conflict(String),
}

/// Failure inside a part-of-speech tagger.
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("Tagger unavailable: {0}")]
    Unavailable(String),

    #[error("Tagger returned {got} tags for {expected} tokens")]
    LengthMismatch { expected: usize, got: usize },
}
