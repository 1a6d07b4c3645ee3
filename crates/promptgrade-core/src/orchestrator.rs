//! Evaluation orchestration.
//!
//! Composes the schema transformer, grading engine, version tree, and test
//! set: given a function and a target version, produce a batch of scored
//! results and merge them into the right tree node. Persisting the mutated
//! aggregate back through a [`FunctionStore`] is the caller's step, as one
//! whole-value write.

use std::collections::BTreeMap;

use futures::FutureExt;
use serde_json::Value;

use crate::error::{EvalError, GradingError};
use crate::grading::GradingEngine;
use crate::model::{
    EvaluationRecord, Function, FunctionDefinition, VersionId, VersionParameters,
};
use crate::schema::Schema;
use crate::traits::FunctionInvoker;

/// The outcome of evaluating one version against the test set.
#[derive(Debug)]
pub struct EvaluationSummary {
    pub version: VersionId,
    /// Records appended to the version node, in test order.
    pub records: Vec<EvaluationRecord>,
    /// Per-case failures, by test index. Never aborts the batch.
    pub failures: Vec<(usize, GradingError)>,
}

impl EvaluationSummary {
    /// Mean score per metric across the appended records.
    pub fn mean_scores(&self) -> BTreeMap<String, f64> {
        let mut sums: BTreeMap<String, (f64, u32)> = BTreeMap::new();
        for record in &self.records {
            for (metric, score) in &record.scores {
                let entry = sums.entry(metric.clone()).or_insert((0.0, 0));
                entry.0 += score;
                entry.1 += 1;
            }
        }
        sums.into_iter()
            .map(|(metric, (sum, count))| (metric, sum / f64::from(count)))
            .collect()
    }
}

/// The evaluation orchestrator.
pub struct Orchestrator {
    grading: GradingEngine,
}

impl Orchestrator {
    pub fn new(grading: GradingEngine) -> Self {
        Self { grading }
    }

    pub fn grading(&self) -> &GradingEngine {
        &self.grading
    }

    /// Build a function from its definition. See [`Function::create`].
    pub fn create_function(&self, definition: FunctionDefinition) -> Result<Function, EvalError> {
        Function::create(definition)
    }

    /// Branch a new version off `parent`.
    pub fn branch_version(
        &self,
        function: &mut Function,
        parent: &VersionId,
        parameters: VersionParameters,
    ) -> Result<VersionId, EvalError> {
        function.version_tree.branch(parent, parameters)
    }

    /// Evaluate `version_id` against the whole test set and append the
    /// resulting records to its node.
    pub async fn evaluate_version(
        &self,
        function: &mut Function,
        version_id: &VersionId,
        invoker: &dyn FunctionInvoker,
    ) -> Result<EvaluationSummary, EvalError> {
        if function.test_set.is_empty() {
            return Err(EvalError::EmptyTestSet);
        }

        let schema = Schema::parse(&function.output_schema)?;

        let results = {
            let function: &Function = &*function;
            let node = function
                .version_tree
                .get(version_id)
                .ok_or_else(|| EvalError::VersionNotFound(version_id.clone()))?;

            self.grading
                .grade_batch(
                    &function.task,
                    function.test_set.cases(),
                    &schema,
                    |input| {
                        async move { invoker.invoke(function, node, &input).await }.boxed()
                    },
                )
                .await
        };

        let mut records = Vec::new();
        let mut failures = Vec::new();
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(record) => records.push(record),
                Err(error) => failures.push((index, error)),
            }
        }

        // Nodes are never deleted, so this only fails if the id went stale
        // between the lookup above and now; the contract is still checked.
        function
            .version_tree
            .append_evaluations(version_id, records.clone())?;

        tracing::info!(
            version = %version_id,
            appended = records.len(),
            failed = failures.len(),
            "evaluation complete"
        );

        Ok(EvaluationSummary {
            version: version_id.clone(),
            records,
            failures,
        })
    }

    /// Grade one observed input/output pair and append the record to
    /// `version_id`.
    pub async fn evaluate_call(
        &self,
        function: &mut Function,
        version_id: &VersionId,
        input: Value,
        output: Value,
    ) -> Result<EvaluationRecord, EvalError> {
        if !function.version_tree.contains(version_id) {
            return Err(EvalError::VersionNotFound(version_id.clone()));
        }

        let schema = Schema::parse(&function.output_schema)?;
        let record = self
            .grading
            .grade_one(&function.task, &input, &schema, &output)
            .await?;

        function
            .version_tree
            .append_evaluations(version_id, vec![record.clone()])?;
        Ok(record)
    }

    /// Record an observed input/output pair into the regression test set.
    ///
    /// Returns `true` when the input was new; a structurally equal input is
    /// a no-op.
    pub fn record_call(
        &self,
        function: &mut Function,
        input: Value,
        output: Option<Value>,
    ) -> bool {
        function.test_set.record_observed(input, output)
    }

    /// Generate `n` synthetic test inputs and merge them into the test set.
    /// Returns how many were new.
    pub async fn grow_test_set(
        &self,
        function: &mut Function,
        n: usize,
    ) -> Result<usize, EvalError> {
        let schema = Schema::parse(&function.input_schema)?;
        let inputs = self
            .grading
            .generate_tests(&function.task, &schema, n)
            .await?;
        Ok(function.test_set.extend_generated(inputs))
    }
}
