//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReacherError {
    /// A named body was not found on the articulation.
    #[error("Body not found: {0}")]
    BodyNotFound(String),

    /// A per-environment batch does not have the expected length.
    #[error("Batch size mismatch in {what}: expected {expected}, got {actual}")]
    BatchSizeMismatch {
        /// What the batch holds, e.g. `"target positions"`.
        what: String,
        /// The number of environments.
        expected: usize,
        /// The length of the offending batch.
        actual: usize,
    },

    /// Environment ids outside `0..num_envs` were given to a pose reset.
    #[error("Invalid environment ids {ids:?} for {num_envs} environments")]
    InvalidEnvIds {
        /// Rejected ids.
        ids: Vec<usize>,
        /// The number of environments.
        num_envs: usize,
    },

    /// A sampling interval with `lo > hi` or non-finite bounds.
    #[error("Invalid range: [{lo}, {hi}]")]
    InvalidRange {
        /// Lower bound.
        lo: f32,
        /// Upper bound.
        hi: f32,
    },

    /// An environment variable could not be parsed.
    #[error("Invalid value for environment variable {name}: {value:?}")]
    InvalidEnvVar {
        /// Variable name.
        name: String,
        /// Raw value.
        value: String,
    },

    /// A configuration value that the task cannot run with.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),
}

/// Checks that a batch has one entry per environment.
pub(crate) fn check_len(what: &str, expected: usize, actual: usize) -> Result<(), ReacherError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ReacherError::BatchSizeMismatch {
            what: what.to_string(),
            expected,
            actual,
        })
    }
}
