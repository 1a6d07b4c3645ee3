//! Collaborator trait definitions.
//!
//! The core never owns a network client or a database handle. The completion
//! service, the function-under-test invoker, and the aggregate store are
//! passed in explicitly, which is what makes the grading pipeline
//! deterministic under test.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;
use crate::model::{Function, OwnerAggregate};
use crate::tree::VersionNode;

// ---------------------------------------------------------------------------
// Completion service
// ---------------------------------------------------------------------------

/// A structured-output completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier (e.g. "gpt-4o-mini").
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    /// Sampling temperature; provider default when `None`.
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Name of the constraining schema (e.g. "evaluation", "output").
    pub schema_name: String,
    /// Strict JSON Schema the response must validate against.
    pub schema: Value,
}

/// Trait for backends that produce schema-constrained completions.
///
/// On success the returned value parses as JSON; conformance to the
/// requested schema is re-checked by callers that depend on it.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Human-readable backend name (e.g. "openai").
    fn name(&self) -> &str;

    /// Submit one completion request and return the structured JSON value.
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<Value>;
}

// ---------------------------------------------------------------------------
// Function invocation
// ---------------------------------------------------------------------------

/// Trait for running the function under test.
///
/// The orchestrator grades whatever this produces; how the configuration
/// named by `version` is actually executed is opaque to the core.
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    async fn invoke(
        &self,
        function: &Function,
        version: &VersionNode,
        input: &Value,
    ) -> anyhow::Result<Value>;
}

// ---------------------------------------------------------------------------
// Aggregate store
// ---------------------------------------------------------------------------

/// An aggregate together with the revision observed at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedAggregate {
    pub aggregate: OwnerAggregate,
    pub revision: u64,
}

/// Whole-value persistence for owner aggregates.
///
/// `save` must reject a write whose `expected` revision does not match the
/// stored one, so two concurrent read-modify-write cycles cannot silently
/// discard each other's mutations.
pub trait FunctionStore: Send + Sync {
    /// Fetch the aggregate for `owner`, if any.
    fn load(&self, owner: &str) -> Result<Option<VersionedAggregate>, StoreError>;

    /// Persist the whole aggregate. `expected` is the revision observed at
    /// load time, or `None` when creating a new aggregate. Returns the new
    /// revision.
    fn save(
        &self,
        owner: &str,
        aggregate: &OwnerAggregate,
        expected: Option<u64>,
    ) -> Result<u64, StoreError>;
}
