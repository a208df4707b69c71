/// Error types for level construction and asset lookup.
///
/// Everything here is a configuration error: it is raised while a level is
/// being built and never mid-frame.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("asset not found: {key}")]
    NotFound { key: String },
    #[error("asset {key} has no frames")]
    Empty { key: String },
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid level manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("layer {layer} row {row} has {actual} cells, expected {expected}")]
    RaggedRow {
        layer: String,
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("layer {layer} has unknown token '{token}' at row {row}, col {col}")]
    UnknownToken {
        layer: String,
        row: usize,
        col: usize,
        token: String,
    },
    #[error("layer {layer} token {index} at row {row}, col {col} is outside a sheet of {len} tiles")]
    TokenOutOfRange {
        layer: String,
        row: usize,
        col: usize,
        index: usize,
        len: usize,
    },
    #[error("level has no player spawn")]
    MissingPlayer,
    #[error("level has a second player spawn at row {row}, col {col}")]
    DuplicatePlayer { row: usize, col: usize },
    #[error("level is missing required layer {0}")]
    MissingLayer(&'static str),
    #[error(transparent)]
    Asset(#[from] AssetError),
}
