//! Grading pipeline.
//!
//! Submits one schema-constrained completion per test case and turns the
//! structured response into [`EvaluationRecord`]s. Batches run with bounded
//! concurrency; results are written to slots indexed by input order, so the
//! output is deterministic even though execution is not.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::error::GradingError;
use crate::model::{EvaluationRecord, TestCase};
use crate::prompts;
use crate::schema::{to_grading_schema, to_test_input_schema, Schema};
use crate::traits::{CompletionRequest, CompletionService};

/// Configuration for the grading engine.
#[derive(Debug, Clone)]
pub struct GradingConfig {
    /// Model used for grading completions.
    pub model: String,
    /// Maximum simultaneous in-flight gradings per batch.
    pub parallelism: usize,
    /// Per-request timeout at the completion-call boundary.
    pub request_timeout: Duration,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            parallelism: 3,
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// The grading engine.
pub struct GradingEngine {
    completion: Arc<dyn CompletionService>,
    config: GradingConfig,
}

impl GradingEngine {
    pub fn new(completion: Arc<dyn CompletionService>, config: GradingConfig) -> Self {
        Self { completion, config }
    }

    pub fn with_defaults(completion: Arc<dyn CompletionService>) -> Self {
        Self::new(completion, GradingConfig::default())
    }

    pub fn config(&self) -> &GradingConfig {
        &self.config
    }

    /// Grade one input/output pair against the annotated output schema.
    ///
    /// Fails when the completion call fails or the response does not
    /// conform to the grading schema. Not retried here; the caller owns
    /// retry policy.
    pub async fn grade_one(
        &self,
        task: &str,
        input: &Value,
        output_schema: &Schema,
        output: &Value,
    ) -> Result<EvaluationRecord, GradingError> {
        let grading_schema = to_grading_schema(output_schema);
        let validator = jsonschema::validator_for(&grading_schema)
            .map_err(|e| GradingError::GradingSchema(e.to_string()))?;
        self.grade_with(&validator, &grading_schema, task, input, output_schema, output)
            .await
    }

    async fn grade_with(
        &self,
        validator: &jsonschema::Validator,
        grading_schema: &Value,
        task: &str,
        input: &Value,
        output_schema: &Schema,
        output: &Value,
    ) -> Result<EvaluationRecord, GradingError> {
        let request = CompletionRequest {
            model: self.config.model.clone(),
            system_prompt: prompts::GRADING_SYSTEM_PROMPT.to_string(),
            user_prompt: prompts::grading_user_message(task, input, output),
            temperature: None,
            schema_name: "evaluation".to_string(),
            schema: grading_schema.clone(),
        };

        let response = self.submit(&request).await?;
        if let Err(error) = validator.validate(&response) {
            return Err(GradingError::NonConforming(error.to_string()));
        }

        let mut scores = BTreeMap::new();
        let mut reasoning = Vec::new();
        collect_grades(output_schema, &response, &mut scores, &mut reasoning);

        Ok(EvaluationRecord::new(
            input.clone(),
            output.clone(),
            scores,
            reasoning.join("\n\n"),
        ))
    }

    /// Run the function under test and grade its output for every case.
    ///
    /// `run_fn` invokes the configuration being evaluated. Each slot in the
    /// returned vector corresponds to the test at the same index; a failed
    /// case yields an `Err` slot and never aborts or discards in-flight
    /// work.
    pub async fn grade_batch<'a, F>(
        &self,
        task: &str,
        tests: &[TestCase],
        output_schema: &Schema,
        run_fn: F,
    ) -> Vec<Result<EvaluationRecord, GradingError>>
    where
        F: Fn(Value) -> BoxFuture<'a, anyhow::Result<Value>> + Send + Sync,
    {
        let grading_schema = to_grading_schema(output_schema);
        let validator = match jsonschema::validator_for(&grading_schema) {
            Ok(validator) => validator,
            Err(error) => {
                let error = GradingError::GradingSchema(error.to_string());
                return tests.iter().map(|_| Err(error.clone())).collect();
            }
        };

        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        let mut in_flight = FuturesUnordered::new();

        for (index, case) in tests.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let validator = &validator;
            let grading_schema = &grading_schema;
            let run_fn = &run_fn;

            in_flight.push(async move {
                let result = async {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| GradingError::Completion("semaphore closed".into()))?;

                    let output = run_fn(case.input.clone())
                        .await
                        .map_err(|e| GradingError::Invocation(format!("{e:#}")))?;

                    self.grade_with(
                        validator,
                        grading_schema,
                        task,
                        &case.input,
                        output_schema,
                        &output,
                    )
                    .await
                }
                .await;
                (index, result)
            });
        }

        let mut slots: Vec<Option<Result<EvaluationRecord, GradingError>>> =
            (0..tests.len()).map(|_| None).collect();
        while let Some((index, result)) = in_flight.next().await {
            if let Err(error) = &result {
                tracing::warn!("grading failed for test {index}: {error}");
            }
            slots[index] = Some(result);
        }

        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| Err(GradingError::Completion("missing result slot".into())))
            })
            .collect()
    }

    /// Request `n` synthetic test inputs in one structured-output call.
    pub async fn generate_tests(
        &self,
        task: &str,
        input_schema: &Schema,
        n: usize,
    ) -> Result<Vec<Value>, GradingError> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let request = CompletionRequest {
            model: self.config.model.clone(),
            system_prompt: prompts::TEST_GENERATION_SYSTEM_PROMPT.to_string(),
            user_prompt: prompts::test_generation_user_message(task),
            temperature: Some(1.0),
            schema_name: "test_input".to_string(),
            schema: to_test_input_schema(input_schema, n),
        };

        let response = self.submit(&request).await?;
        let mut tests = Vec::with_capacity(n);
        for i in 0..n {
            match response.get(format!("test_{i}")) {
                Some(value) => tests.push(value.clone()),
                None => {
                    return Err(GradingError::NonConforming(format!(
                        "missing test slot `test_{i}`"
                    )))
                }
            }
        }
        Ok(tests)
    }

    async fn submit(&self, request: &CompletionRequest) -> Result<Value, GradingError> {
        match tokio::time::timeout(
            self.config.request_timeout,
            self.completion.complete(request),
        )
        .await
        {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(GradingError::Completion(format!("{error:#}"))),
            Err(_) => Err(GradingError::Timeout(self.config.request_timeout.as_secs())),
        }
    }
}

/// Walk the grading response alongside the schema, collecting the flat
/// score map and the reasoning of metrics-wrapped nodes.
///
/// Synthetic object-level `reasoning` fields are convenience output and are
/// not collected. Descendants of a wrapped node are plain `models_output`
/// structure and carry no grades.
fn collect_grades(
    schema: &Schema,
    response: &Value,
    scores: &mut BTreeMap<String, f64>,
    reasoning: &mut Vec<String>,
) {
    if !schema.metrics().is_empty() {
        if let Some(node_scores) = response.get("scores").and_then(Value::as_object) {
            for (metric, value) in node_scores {
                if let Some(score) = value.as_f64() {
                    scores.insert(metric.clone(), score);
                }
            }
        }
        if let Some(text) = response.get("reasoning").and_then(Value::as_str) {
            if !text.is_empty() {
                reasoning.push(text.to_string());
            }
        }
        return;
    }

    match schema {
        Schema::Scalar { .. } => {}
        Schema::Object { properties, .. } => {
            if let Some(object) = response.as_object() {
                for (key, child) in properties {
                    if let Some(value) = object.get(key) {
                        collect_grades(child, value, scores, reasoning);
                    }
                }
            }
        }
        Schema::Array { items, .. } => {
            if let Some(array) = response.as_array() {
                for value in array {
                    collect_grades(items, value, scores, reasoning);
                }
            }
        }
    }
}
