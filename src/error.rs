//! Error handling for aclip-merge
//!
//! Every failure is fatal for the run. Errors are grouped into the parse,
//! engine, filesystem and task classes and carry recovery suggestions for the
//! command-line diagnostic.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for merge operations
pub type Result<T> = std::result::Result<T, MergeError>;

/// Broad class of a [`MergeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing manifest, or bad configuration
    Parse,
    /// The audio engine failed a zero-trim or overlay
    Engine,
    /// Scratch directory or destination problems
    Filesystem,
    /// A group task died without producing a result
    Task,
}

/// Main error type for merge operations
#[derive(Error, Debug)]
pub enum MergeError {
    // Parse Errors
    #[error("Manifest not found: {path}")]
    ManifestNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read manifest {path}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed manifest {path}: {source}")]
    ManifestSyntax {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid clip #{index}: {reason}")]
    InvalidClip { index: usize, reason: String },

    #[error("Invalid configuration: {key}={value}")]
    InvalidConfig { key: String, value: String },

    // Engine Errors
    #[error("Engine {operation} failed: {reason}")]
    Engine {
        operation: &'static str,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Audio engine program '{program}' could not be started")]
    EngineUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    // Filesystem Errors
    #[error("Destination directory does not exist: {path}")]
    DestinationMissing { path: PathBuf },

    #[error("Failed to create scratch directory")]
    ScratchDir {
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove scratch directory {path}")]
    ScratchCleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to publish {from} to {to}")]
    Publish {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Task Errors
    #[error("Merge task for actor '{actor}' failed: {reason}")]
    TaskFailed { actor: String, reason: String },
}

impl MergeError {
    /// Shorthand for an engine failure without an underlying error value
    pub fn engine(operation: &'static str, reason: impl Into<String>) -> Self {
        MergeError::Engine {
            operation,
            reason: reason.into(),
            source: None,
        }
    }

    /// Get the error class
    pub fn kind(&self) -> ErrorKind {
        match self {
            MergeError::ManifestNotFound { .. }
            | MergeError::ManifestRead { .. }
            | MergeError::ManifestSyntax { .. }
            | MergeError::InvalidClip { .. }
            | MergeError::InvalidConfig { .. } => ErrorKind::Parse,
            MergeError::Engine { .. } | MergeError::EngineUnavailable { .. } => ErrorKind::Engine,
            MergeError::DestinationMissing { .. }
            | MergeError::ScratchDir { .. }
            | MergeError::ScratchCleanup { .. }
            | MergeError::Publish { .. } => ErrorKind::Filesystem,
            MergeError::TaskFailed { .. } => ErrorKind::Task,
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            MergeError::ManifestNotFound { .. } => "MANIFEST_NOT_FOUND",
            MergeError::ManifestRead { .. } => "MANIFEST_READ",
            MergeError::ManifestSyntax { .. } => "MANIFEST_SYNTAX",
            MergeError::InvalidClip { .. } => "INVALID_CLIP",
            MergeError::InvalidConfig { .. } => "INVALID_CONFIG",
            MergeError::Engine { .. } => "ENGINE_FAILED",
            MergeError::EngineUnavailable { .. } => "ENGINE_UNAVAILABLE",
            MergeError::DestinationMissing { .. } => "DESTINATION_MISSING",
            MergeError::ScratchDir { .. } => "SCRATCH_DIR",
            MergeError::ScratchCleanup { .. } => "SCRATCH_CLEANUP",
            MergeError::Publish { .. } => "PUBLISH_FAILED",
            MergeError::TaskFailed { .. } => "TASK_FAILED",
        }
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            MergeError::ManifestNotFound { .. } => vec![
                "Check the manifest path is correct",
                "Relative paths are resolved from the current directory",
            ],
            MergeError::ManifestSyntax { .. } => vec![
                "The manifest must look like {\"clips\": [{\"actor\", \"file\", \"startAt\"}]}",
                "startAt is a number of milliseconds",
            ],
            MergeError::InvalidClip { .. } => vec![
                "Actors become file names and must not contain path separators",
                "startAt must be a non-negative number of milliseconds",
            ],
            MergeError::InvalidConfig { .. } => vec![
                "ACLIP_MERGE_ENGINE accepts 'native' or 'ffmpeg'",
            ],
            MergeError::Engine { .. } => vec![
                "Check that every clip file exists and is a readable WAV file",
                "Run with RUST_LOG=debug to see each engine step",
            ],
            MergeError::EngineUnavailable { .. } => vec![
                "Install ffmpeg or point ACLIP_MERGE_FFMPEG at the binary",
                "Unset ACLIP_MERGE_ENGINE to use the built-in engine",
            ],
            MergeError::DestinationMissing { .. } => {
                vec!["Create the destination directory before running"]
            }
            MergeError::Publish { .. } => vec![
                "Check the destination directory is writable",
                "Free up disk space",
            ],
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = MergeError::InvalidClip {
            index: 3,
            reason: "negative startAt".to_string(),
        };
        assert_eq!(err.error_code(), "INVALID_CLIP");
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert_eq!(err.to_string(), "Invalid clip #3: negative startAt");
    }

    #[test]
    fn test_engine_shorthand() {
        let err = MergeError::engine("overlay", "ffmpeg exited with code 1");
        assert_eq!(err.kind(), ErrorKind::Engine);
        assert_eq!(err.to_string(), "Engine overlay failed: ffmpeg exited with code 1");
        assert!(!err.recovery_suggestions().is_empty());
    }

    #[test]
    fn test_filesystem_kind() {
        let err = MergeError::DestinationMissing {
            path: PathBuf::from("/out"),
        };
        assert_eq!(err.kind(), ErrorKind::Filesystem);
        assert_eq!(err.error_code(), "DESTINATION_MISSING");
    }
}
