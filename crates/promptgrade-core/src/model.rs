//! Core data model types for promptgrade.
//!
//! These are the fundamental types the entire promptgrade system uses to
//! represent functions, version parameters, test cases, and evaluation
//! records.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{EvalError, StoreError};
use crate::testset::TestSet;
use crate::tree::VersionTree;

/// Opaque identifier of a version node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    /// Generate a fresh id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The configuration realized by one version node.
///
/// Stored untagged: completion parameters are the `{prompt, model,
/// temperature}` shape, anything else is an opaque custom parameter map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VersionParameters {
    /// A chat-completion configuration.
    Completion {
        /// System prompt sent to the model.
        prompt: String,
        /// Model identifier (e.g. "gpt-4o-mini").
        model: String,
        /// Sampling temperature.
        temperature: f64,
    },
    /// Arbitrary parameters for functions executed outside the core
    /// (the caller's own pipeline invokes these).
    Custom(serde_json::Map<String, Value>),
}

/// What realizes a function: a completion call or a caller-run pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    Completion,
    Custom,
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionKind::Completion => write!(f, "completion"),
            FunctionKind::Custom => write!(f, "custom"),
        }
    }
}

/// One scored input/output pair attached to a version node.
///
/// Records are immutable once created: the orchestrator appends them, never
/// edits them in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// Unique key of this evaluation call.
    pub call_key: String,
    /// When the grading completed.
    pub timestamp: DateTime<Utc>,
    /// The input the function under test received, verbatim.
    pub input: Value,
    /// The output it produced, verbatim.
    pub output: Value,
    /// Score per metric, 0-100.
    pub scores: BTreeMap<String, f64>,
    /// The grader's reasoning.
    pub reasoning: String,
}

impl EvaluationRecord {
    /// Build a record with a fresh call key and the current timestamp.
    pub fn new(
        input: Value,
        output: Value,
        scores: BTreeMap<String, f64>,
        reasoning: String,
    ) -> Self {
        Self {
            call_key: Uuid::new_v4().simple().to_string(),
            timestamp: Utc::now(),
            input,
            output,
            scores,
            reasoning,
        }
    }
}

/// A recorded input (optionally with an observed output) used for
/// regression evaluation.
///
/// Deserialization normalizes legacy bare-value cases to the `{input}`
/// shape, so a stored `"some string"` becomes `{input: "some string"}`
/// instead of being dropped on the next scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCase {
    pub input: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

impl TestCase {
    pub fn new(input: Value) -> Self {
        Self {
            input,
            output: None,
        }
    }

    /// Normalize any JSON value into the canonical `{input}` shape.
    ///
    /// An object carrying an `input` key is taken as an already-shaped case;
    /// anything else is the input itself.
    pub fn normalize(value: Value) -> Self {
        match value {
            Value::Object(mut map) if map.contains_key("input") => {
                let input = map.remove("input").unwrap_or(Value::Null);
                let output = map.remove("output");
                Self { input, output }
            }
            other => Self {
                input: other,
                output: None,
            },
        }
    }
}

impl<'de> Deserialize<'de> for TestCase {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(TestCase::normalize(value))
    }
}

/// A declared task with input/output schemas and a version history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// Opaque key the function is invoked by.
    pub function_key: String,
    /// Owner-unique display name.
    pub name: String,
    /// Free-text description of what the function should do.
    pub task: String,
    pub kind: FunctionKind,
    /// Declared input schema, as authored (may carry grading annotations).
    pub input_schema: Value,
    /// Declared output schema, as authored.
    pub output_schema: Value,
    #[serde(default)]
    pub test_set: TestSet,
    pub version_tree: VersionTree,
    /// The deployed version. Always resolves in `version_tree`.
    pub current_version: VersionId,
}

impl Function {
    /// Build a function from its definition: fresh function key, a version
    /// tree rooted at the definition's parameters, and a deduplicated test
    /// set. Both declared schemas must parse.
    pub fn create(definition: FunctionDefinition) -> Result<Self, EvalError> {
        crate::schema::Schema::parse(&definition.input_schema)?;
        crate::schema::Schema::parse(&definition.output_schema)?;

        let version_tree = VersionTree::new(definition.parameters);
        let current_version = version_tree.root().clone();

        Ok(Self {
            function_key: Uuid::new_v4().simple().to_string(),
            name: definition.name,
            task: definition.task,
            kind: definition.kind,
            input_schema: definition.input_schema,
            output_schema: definition.output_schema,
            test_set: TestSet::from_cases(definition.test_set),
            version_tree,
            current_version,
        })
    }

    /// Move the deployment pointer to `id`.
    ///
    /// The pointer is left untouched when `id` does not resolve.
    pub fn deploy(&mut self, id: &VersionId) -> Result<(), EvalError> {
        if !self.version_tree.contains(id) {
            return Err(EvalError::VersionNotFound(id.clone()));
        }
        self.current_version = id.clone();
        Ok(())
    }

    /// The node the deployment pointer designates.
    pub fn deployed(&self) -> Option<&crate::tree::VersionNode> {
        self.version_tree.get(&self.current_version)
    }
}

/// Everything needed to create a [`Function`].
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub task: String,
    #[serde(default = "default_kind")]
    pub kind: FunctionKind,
    pub input_schema: Value,
    pub output_schema: Value,
    /// Parameters of the root version.
    pub parameters: VersionParameters,
    #[serde(default)]
    pub test_set: Vec<TestCase>,
}

fn default_kind() -> FunctionKind {
    FunctionKind::Completion
}

/// The whole-value unit an aggregate store round-trips: one owner and all
/// of their functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerAggregate {
    pub owner_key: String,
    #[serde(default)]
    pub functions: Vec<Function>,
}

impl OwnerAggregate {
    pub fn new(owner_key: impl Into<String>) -> Self {
        Self {
            owner_key: owner_key.into(),
            functions: Vec::new(),
        }
    }

    pub fn function_by_key(&self, function_key: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.function_key == function_key)
    }

    pub fn function_by_key_mut(&mut self, function_key: &str) -> Option<&mut Function> {
        self.functions
            .iter_mut()
            .find(|f| f.function_key == function_key)
    }

    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn function_by_name_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.functions.iter_mut().find(|f| f.name == name)
    }

    /// Add a function, enforcing owner-unique names.
    pub fn insert_function(&mut self, function: Function) -> Result<(), StoreError> {
        if self.function_by_name(&function.name).is_some() {
            return Err(StoreError::FunctionExists(function.name));
        }
        self.functions.push(function);
        Ok(())
    }
}
