//! Evaluation error taxonomy.
//!
//! These error types are defined in `promptgrade-core` so callers can match
//! on failure classes (not-found vs. precondition vs. service failure)
//! without string matching.

use thiserror::Error;

use crate::model::VersionId;

/// Errors raised while parsing an annotated schema.
///
/// Schema parsing is the only place a transform can fail; the transforms
/// themselves are total functions over the parsed representation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The node is not a JSON object.
    #[error("schema node at `{path}` is not an object")]
    NotAnObject { path: String },

    /// The node has no `type` and no `properties`/`items` to infer one from.
    #[error("schema node at `{path}` has no type and no structural children")]
    MissingType { path: String },

    /// The node's `type` is not a supported JSON Schema type.
    #[error("schema node at `{path}` has unsupported type `{ty}`")]
    UnsupportedType { path: String, ty: String },

    /// A `metrics`/`desiredProperties` entry is not a string.
    #[error("schema node at `{path}` has a non-string metric entry")]
    InvalidMetrics { path: String },

    /// A `required` entry is not a string.
    #[error("schema node at `{path}` has a non-string `required` entry")]
    InvalidRequired { path: String },
}

/// Errors raised while grading a single test case.
#[derive(Debug, Clone, Error)]
pub enum GradingError {
    /// The completion service call failed.
    #[error("completion service error: {0}")]
    Completion(String),

    /// The completion call exceeded the per-request timeout.
    #[error("grading request timed out after {0}s")]
    Timeout(u64),

    /// Invoking the function under test failed.
    #[error("function invocation failed: {0}")]
    Invocation(String),

    /// The grading response did not validate against the grading schema.
    #[error("grading response does not conform to the grading schema: {0}")]
    NonConforming(String),

    /// The generated grading schema was rejected by the validator.
    #[error("grading schema did not compile: {0}")]
    GradingSchema(String),
}

/// Top-level evaluation errors surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The version id does not resolve in the function's version tree.
    #[error("version not found: {0}")]
    VersionNotFound(VersionId),

    /// The function key or name does not resolve in the owner aggregate.
    #[error("function not found: {0}")]
    FunctionNotFound(String),

    /// Evaluation was requested with an empty test set.
    #[error("test set is empty")]
    EmptyTestSet,

    /// The function's declared schema failed to parse.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Grading failed before any per-case results were produced.
    #[error(transparent)]
    Grading(#[from] GradingError),
}

impl EvalError {
    /// Returns `true` if this error is a not-found condition that should be
    /// reported to the caller as such, never retried.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EvalError::VersionNotFound(_) | EvalError::FunctionNotFound(_)
        )
    }
}

/// Errors raised by aggregate stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The aggregate changed between load and save. Callers should re-fetch
    /// and replay the whole read-modify-write cycle.
    #[error(
        "aggregate `{owner}` was modified concurrently \
         (expected revision {expected:?}, found {found:?})"
    )]
    ConcurrentModification {
        owner: String,
        expected: Option<u64>,
        found: Option<u64>,
    },

    /// A function with this name already exists for the owner.
    #[error("function name already exists: {0}")]
    FunctionExists(String),

    /// Underlying I/O failure.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored aggregate could not be (de)serialized.
    #[error("aggregate serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns `true` if retrying the whole read-modify-write cycle may
    /// succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::ConcurrentModification { .. })
    }
}
