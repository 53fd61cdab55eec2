//! Error types for configuration, checkpoint and artifact storage.
//!
//! Provides a unified error type covering all failure modes: I/O,
//! serialization, configuration validation, checkpoint verification, and
//! compression.

use thiserror::Error;

/// Errors that can occur while loading or persisting pipeline state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Run configuration failed validation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A stage's checkpoint is not recorded in the manifest or missing on disk.
    #[error("missing checkpoint for stage {0}")]
    MissingCheckpoint(String),

    /// Checksum mismatch between the manifest and the checkpoint on disk.
    #[error("invalid checksum: {0}")]
    InvalidChecksum(String),

    /// Gzip compression or decompression failure.
    #[error("compression error: {0}")]
    CompressionError(String),

    /// A compact artifact references a file index with no entry.
    #[error("unknown file index {0}")]
    UnknownFileIndex(u64),

    /// The compact artifact does not have the expected top-level shape.
    #[error("malformed compact artifact: {0}")]
    MalformedArtifact(String),
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
