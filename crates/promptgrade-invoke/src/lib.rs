//! promptgrade-invoke — runs the function under test.
//!
//! [`LlmInvoker`] executes a completion-backed version: it validates the
//! input against the function's declared input schema, strips grading
//! annotations from the output schema, and issues one schema-constrained
//! completion with the version's prompt, model, and temperature. Custom
//! (caller-run) versions are rejected; executing those is the caller's own
//! collaborator.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use promptgrade_core::error::SchemaError;
use promptgrade_core::model::{Function, VersionParameters};
use promptgrade_core::schema::{to_output_schema, Schema};
use promptgrade_core::traits::{CompletionRequest, CompletionService, FunctionInvoker};
use promptgrade_core::tree::VersionNode;

/// Errors raised while invoking a function under test.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The input does not validate against the declared input schema.
    #[error("input does not validate against the declared input schema: {0}")]
    InputValidation(String),

    /// The version holds custom parameters; the core cannot execute it.
    #[error("version `{0}` holds custom parameters and must be run by the caller's own pipeline")]
    CustomFunction(String),

    /// A declared schema failed to parse.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Invoker for completion-backed functions.
pub struct LlmInvoker {
    completion: Arc<dyn CompletionService>,
}

impl LlmInvoker {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl FunctionInvoker for LlmInvoker {
    #[instrument(skip_all, fields(function = %function.name, version = %version.id))]
    async fn invoke(
        &self,
        function: &Function,
        version: &VersionNode,
        input: &Value,
    ) -> anyhow::Result<Value> {
        let VersionParameters::Completion {
            prompt,
            model,
            temperature,
        } = &version.parameters
        else {
            return Err(InvokeError::CustomFunction(version.id.to_string()).into());
        };

        // The declared schema may carry annotations a strict validator has
        // no keyword for; they are ignored during instance validation.
        let validator = jsonschema::validator_for(&function.input_schema).map_err(|e| {
            InvokeError::InputValidation(format!("input schema did not compile: {e}"))
        })?;
        if let Err(error) = validator.validate(input) {
            return Err(InvokeError::InputValidation(error.to_string()).into());
        }

        let output_schema = Schema::parse(&function.output_schema).map_err(InvokeError::Schema)?;

        let request = CompletionRequest {
            model: model.clone(),
            system_prompt: prompt.clone(),
            user_prompt: input.to_string(),
            temperature: Some(*temperature),
            schema_name: "output".to_string(),
            schema: to_output_schema(&output_schema),
        };

        self.completion.complete(&request).await
    }
}
