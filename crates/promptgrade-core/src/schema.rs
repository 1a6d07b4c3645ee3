//! Annotated schema parsing and the grading-schema transforms.
//!
//! Callers declare an output schema in ordinary JSON Schema shape, with the
//! qualitative properties to grade attached as a `metrics` list (accepted
//! under the legacy `desiredProperties` spelling, or as an array-valued
//! `description`). Parsing turns that into a tagged representation where a
//! node either carries metrics or structural children, so the transforms
//! below are total functions and cannot half-rewrite a schema.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::error::SchemaError;

/// Supported scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl ScalarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Number => "number",
            ScalarKind::Integer => "integer",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Null => "null",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(ScalarKind::String),
            "number" => Some(ScalarKind::Number),
            "integer" => Some(ScalarKind::Integer),
            "boolean" => Some(ScalarKind::Boolean),
            "null" => Some(ScalarKind::Null),
            _ => None,
        }
    }
}

/// A parsed, annotated schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Scalar {
        kind: ScalarKind,
        metrics: Vec<String>,
    },
    Object {
        properties: BTreeMap<String, Schema>,
        /// `None` when the caller declared no `required` list; the grading
        /// transform then synthesizes one.
        required: Option<Vec<String>>,
        /// A declared `additionalProperties` bool, carried through
        /// transforms verbatim.
        additional: Option<bool>,
        metrics: Vec<String>,
    },
    Array {
        items: Box<Schema>,
        metrics: Vec<String>,
    },
}

impl Schema {
    /// Parse an annotated JSON Schema value.
    pub fn parse(value: &Value) -> Result<Schema, SchemaError> {
        parse_node(value, "$")
    }

    /// The metrics declared on this node.
    pub fn metrics(&self) -> &[String] {
        match self {
            Schema::Scalar { metrics, .. }
            | Schema::Object { metrics, .. }
            | Schema::Array { metrics, .. } => metrics,
        }
    }
}

fn parse_node(value: &Value, path: &str) -> Result<Schema, SchemaError> {
    let obj = value.as_object().ok_or_else(|| SchemaError::NotAnObject {
        path: path.to_string(),
    })?;

    let metrics = metric_list(obj, path)?;

    if let Some(props) = obj.get("properties") {
        let props = props.as_object().ok_or_else(|| SchemaError::NotAnObject {
            path: format!("{path}.properties"),
        })?;
        let mut properties = BTreeMap::new();
        for (key, child) in props {
            properties.insert(key.clone(), parse_node(child, &format!("{path}.{key}"))?);
        }
        let required = match obj.get("required") {
            Some(req) => Some(string_array(req).ok_or_else(|| SchemaError::InvalidRequired {
                path: path.to_string(),
            })?),
            None => None,
        };
        return Ok(Schema::Object {
            properties,
            required,
            additional: obj.get("additionalProperties").and_then(Value::as_bool),
            metrics,
        });
    }

    if let Some(items) = obj.get("items") {
        let items = parse_node(items, &format!("{path}.items"))?;
        return Ok(Schema::Array {
            items: Box::new(items),
            metrics,
        });
    }

    match obj.get("type").and_then(Value::as_str) {
        Some("object") => Ok(Schema::Object {
            properties: BTreeMap::new(),
            required: None,
            additional: obj.get("additionalProperties").and_then(Value::as_bool),
            metrics,
        }),
        Some("array") => Err(SchemaError::MissingType {
            path: format!("{path}.items"),
        }),
        Some(ty) => match ScalarKind::parse(ty) {
            Some(kind) => Ok(Schema::Scalar { kind, metrics }),
            None => Err(SchemaError::UnsupportedType {
                path: path.to_string(),
                ty: ty.to_string(),
            }),
        },
        None => Err(SchemaError::MissingType {
            path: path.to_string(),
        }),
    }
}

/// Read the metrics annotation off a raw node. `metrics` and
/// `desiredProperties` must be string arrays; `description` only counts
/// when it is one (a plain-string description is decoration and dropped).
fn metric_list(obj: &Map<String, Value>, path: &str) -> Result<Vec<String>, SchemaError> {
    for key in ["metrics", "desiredProperties"] {
        if let Some(value) = obj.get(key) {
            return string_array(value).ok_or_else(|| SchemaError::InvalidMetrics {
                path: path.to_string(),
            });
        }
    }
    if let Some(value @ Value::Array(_)) = obj.get("description") {
        return string_array(value).ok_or_else(|| SchemaError::InvalidMetrics {
            path: path.to_string(),
        });
    }
    Ok(Vec::new())
}

fn string_array(value: &Value) -> Option<Vec<String>> {
    let array = value.as_array()?;
    array
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

fn object_node(props: Map<String, Value>, required: Vec<String>, additional: Option<bool>) -> Value {
    let mut node = Map::new();
    node.insert("type".to_string(), json!("object"));
    node.insert("properties".to_string(), Value::Object(props));
    node.insert("required".to_string(), json!(required));
    if let Some(additional) = additional {
        node.insert("additionalProperties".to_string(), json!(additional));
    }
    Value::Object(node)
}

/// Rewrite an annotated schema into the strict grading schema sent to the
/// completion service.
///
/// Every node bearing metrics becomes an object requiring `models_output`
/// (the value's own schema), `scores` (exactly the metric names, each a
/// number), and `reasoning`. Object levels without a declared `required`
/// list gain one covering all properties plus a synthetic `reasoning`
/// field.
pub fn to_grading_schema(schema: &Schema) -> Value {
    grading_node(schema)
}

fn grading_node(schema: &Schema) -> Value {
    if !schema.metrics().is_empty() {
        return wrap_metrics(schema);
    }
    match schema {
        Schema::Scalar { kind, .. } => json!({"type": kind.as_str()}),
        Schema::Array { items, .. } => json!({
            "type": "array",
            "items": grading_node(items),
        }),
        Schema::Object {
            properties,
            required,
            additional,
            ..
        } => {
            let mut props = Map::new();
            for (key, child) in properties {
                props.insert(key.clone(), grading_node(child));
            }
            let required = match required {
                Some(declared) => declared.clone(),
                None => {
                    let mut names: Vec<String> = properties.keys().cloned().collect();
                    props.insert("reasoning".to_string(), json!({"type": "string"}));
                    names.push("reasoning".to_string());
                    names
                }
            };
            object_node(props, required, *additional)
        }
    }
}

fn wrap_metrics(schema: &Schema) -> Value {
    let metrics = schema.metrics();
    let mut score_props = Map::new();
    for metric in metrics {
        score_props.insert(metric.clone(), json!({"type": "number"}));
    }
    json!({
        "type": "object",
        "properties": {
            "models_output": plain_node(schema),
            "scores": {
                "type": "object",
                "properties": score_props,
                "required": metrics,
                "additionalProperties": false,
            },
            "reasoning": {"type": "string"},
        },
        "required": ["scores", "models_output", "reasoning"],
        "additionalProperties": false,
    })
}

/// The node's value schema with grading annotations stripped and structure
/// untouched. Metrics on descendants are consumed by the enclosing wrap.
fn plain_node(schema: &Schema) -> Value {
    match schema {
        Schema::Scalar { kind, .. } => json!({"type": kind.as_str()}),
        Schema::Array { items, .. } => json!({
            "type": "array",
            "items": plain_node(items),
        }),
        Schema::Object {
            properties,
            required,
            additional,
            ..
        } => {
            let mut props = Map::new();
            for (key, child) in properties {
                props.insert(key.clone(), plain_node(child));
            }
            let mut node = Map::new();
            node.insert("type".to_string(), json!("object"));
            node.insert("properties".to_string(), Value::Object(props));
            if let Some(declared) = required {
                node.insert("required".to_string(), json!(declared));
            }
            if let Some(additional) = additional {
                node.insert("additionalProperties".to_string(), json!(additional));
            }
            Value::Object(node)
        }
    }
}

/// The invocation-side schema: grading annotations stripped, every object
/// closed and fully required. This is what constrains the function under
/// test's own completion.
pub fn to_output_schema(schema: &Schema) -> Value {
    strict_node(schema)
}

/// Wrap the (metrics-stripped) schema into `n` independently required
/// numbered slots, used to request `n` synthetic test inputs in a single
/// structured-output call.
pub fn to_test_input_schema(schema: &Schema, n: usize) -> Value {
    let slot = strict_node(schema);
    let mut props = Map::new();
    let mut required = Vec::with_capacity(n);
    for i in 0..n {
        let key = format!("test_{i}");
        props.insert(key.clone(), slot.clone());
        required.push(key);
    }
    json!({
        "type": "object",
        "properties": props,
        "required": required,
        "additionalProperties": false,
    })
}

fn strict_node(schema: &Schema) -> Value {
    match schema {
        Schema::Scalar { kind, .. } => json!({"type": kind.as_str()}),
        Schema::Array { items, .. } => json!({
            "type": "array",
            "items": strict_node(items),
        }),
        Schema::Object {
            properties,
            required,
            ..
        } => {
            let mut props = Map::new();
            for (key, child) in properties {
                props.insert(key.clone(), strict_node(child));
            }
            let required: Vec<String> = match required {
                Some(declared) => declared.clone(),
                None => properties.keys().cloned().collect(),
            };
            object_node(props, required, Some(false))
        }
    }
}

/// All metric names grading can produce scores for, in schema order.
///
/// Descendants of a metrics-bearing node are excluded: the wrap consumes
/// them and the grader never sees their annotations.
pub fn collect_metrics(schema: &Schema) -> Vec<String> {
    let mut out = Vec::new();
    collect_into(schema, &mut out);
    out
}

fn collect_into(schema: &Schema, out: &mut Vec<String>) {
    out.extend(schema.metrics().iter().cloned());
    if !schema.metrics().is_empty() {
        return;
    }
    match schema {
        Schema::Scalar { .. } => {}
        Schema::Array { items, .. } => collect_into(items, out),
        Schema::Object { properties, .. } => {
            for child in properties.values() {
                collect_into(child, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "Answer": {"type": "string", "metrics": ["Correctness"]},
            },
        })
    }

    #[test]
    fn parse_rejects_non_object() {
        let err = Schema::parse(&json!("string")).unwrap_err();
        assert!(matches!(err, SchemaError::NotAnObject { .. }));
    }

    #[test]
    fn parse_rejects_missing_type() {
        let err = Schema::parse(&json!({"metrics": ["Clarity"]})).unwrap_err();
        assert!(matches!(err, SchemaError::MissingType { .. }));
    }

    #[test]
    fn parse_rejects_unsupported_type() {
        let err = Schema::parse(&json!({"type": "tuple"})).unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedType { .. }));
    }

    #[test]
    fn parse_rejects_non_string_metrics() {
        let err = Schema::parse(&json!({"type": "string", "metrics": [1, 2]})).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidMetrics { .. }));
    }

    #[test]
    fn desired_properties_alias_and_string_description_dropped() {
        let schema = Schema::parse(&json!({
            "type": "string",
            "desiredProperties": ["Creative"],
        }))
        .unwrap();
        assert_eq!(schema.metrics(), ["Creative"]);

        let schema = Schema::parse(&json!({
            "type": "string",
            "description": "a human-readable note",
        }))
        .unwrap();
        assert!(schema.metrics().is_empty());

        let schema = Schema::parse(&json!({
            "type": "string",
            "description": ["Emotionally engaging"],
        }))
        .unwrap();
        assert_eq!(schema.metrics(), ["Emotionally engaging"]);
    }

    #[test]
    fn grading_schema_wraps_metric_nodes() {
        let schema = Schema::parse(&answer_schema()).unwrap();
        let grading = to_grading_schema(&schema);

        let answer = &grading["properties"]["Answer"];
        assert_eq!(
            answer["required"],
            json!(["scores", "models_output", "reasoning"])
        );
        assert_eq!(answer["additionalProperties"], json!(false));
        assert_eq!(
            answer["properties"]["models_output"],
            json!({"type": "string"})
        );
        assert_eq!(
            answer["properties"]["scores"]["properties"]["Correctness"],
            json!({"type": "number"})
        );
        assert_eq!(
            answer["properties"]["scores"]["required"],
            json!(["Correctness"])
        );
        assert_eq!(
            answer["properties"]["scores"]["additionalProperties"],
            json!(false)
        );

        // The root object had no declared `required`: all properties plus
        // the synthetic reasoning field become required.
        let root_required = grading["required"].as_array().unwrap();
        assert!(root_required.contains(&json!("Answer")));
        assert!(root_required.contains(&json!("reasoning")));
        assert_eq!(grading["properties"]["reasoning"], json!({"type": "string"}));
    }

    #[test]
    fn scores_required_matches_metrics_exactly() {
        let schema = Schema::parse(&json!({
            "type": "string",
            "metrics": ["Correct", "Concise", "Polite"],
        }))
        .unwrap();
        let grading = to_grading_schema(&schema);

        let mut required: Vec<String> = grading["properties"]["scores"]["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        required.sort();
        assert_eq!(required, ["Concise", "Correct", "Polite"]);

        let score_props = grading["properties"]["scores"]["properties"]
            .as_object()
            .unwrap();
        assert_eq!(score_props.len(), 3);
    }

    #[test]
    fn declared_required_is_preserved_without_synthesis() {
        let schema = Schema::parse(&json!({
            "type": "object",
            "properties": {
                "a": {"type": "string"},
                "b": {"type": "string"},
            },
            "required": ["a"],
        }))
        .unwrap();
        let grading = to_grading_schema(&schema);
        assert_eq!(grading["required"], json!(["a"]));
        assert!(grading["properties"].get("reasoning").is_none());
    }

    #[test]
    fn transform_is_idempotent_on_grading_portions() {
        let schema = Schema::parse(&answer_schema()).unwrap();
        let once = to_grading_schema(&schema);

        let reparsed = Schema::parse(&once).unwrap();
        let twice = to_grading_schema(&reparsed);

        // No metrics survive the first transform, so nothing re-wraps.
        assert_eq!(twice, once);
        let answer = &twice["properties"]["Answer"];
        assert!(answer["properties"]["models_output"]
            .get("properties")
            .is_none());
    }

    #[test]
    fn metrics_on_object_wrap_whole_subtree() {
        let schema = Schema::parse(&json!({
            "type": "object",
            "properties": {
                "Report": {
                    "type": "object",
                    "properties": {
                        "summary": {"type": "string", "metrics": ["Ignored"]},
                        "pages": {"type": "integer"},
                    },
                    "metrics": ["Complete", "Accurate"],
                },
            },
        }))
        .unwrap();
        let grading = to_grading_schema(&schema);

        let report = &grading["properties"]["Report"];
        assert_eq!(
            report["required"],
            json!(["scores", "models_output", "reasoning"])
        );
        // The inner annotation is consumed by the outer wrap.
        let inner = &report["properties"]["models_output"]["properties"]["summary"];
        assert_eq!(inner, &json!({"type": "string"}));
        assert_eq!(collect_metrics(&schema), ["Complete", "Accurate"]);
    }

    #[test]
    fn schema_without_metrics_still_transforms() {
        let schema = Schema::parse(&json!({
            "type": "object",
            "properties": {"Answer": {"type": "string"}},
        }))
        .unwrap();
        let grading = to_grading_schema(&schema);
        assert_eq!(grading["properties"]["Answer"], json!({"type": "string"}));
        assert_eq!(grading["properties"]["reasoning"], json!({"type": "string"}));
        assert!(collect_metrics(&schema).is_empty());
    }

    #[test]
    fn test_input_schema_has_numbered_slots() {
        let schema = Schema::parse(&json!({
            "type": "object",
            "properties": {"Question": {"type": "string", "metrics": ["Hard"]}},
        }))
        .unwrap();
        let wrapped = to_test_input_schema(&schema, 3);

        let props = wrapped["properties"].as_object().unwrap();
        assert_eq!(props.len(), 3);
        assert_eq!(wrapped["required"], json!(["test_0", "test_1", "test_2"]));
        assert_eq!(wrapped["additionalProperties"], json!(false));
        // Metrics are stripped; slots are strict.
        let slot = &props["test_0"];
        assert_eq!(slot["properties"]["Question"], json!({"type": "string"}));
        assert_eq!(slot["required"], json!(["Question"]));
        assert_eq!(slot["additionalProperties"], json!(false));
    }

    #[test]
    fn output_schema_strips_metrics_and_closes_objects() {
        let schema = Schema::parse(&answer_schema()).unwrap();
        let output = to_output_schema(&schema);
        assert_eq!(output["properties"]["Answer"], json!({"type": "string"}));
        assert_eq!(output["required"], json!(["Answer"]));
        assert_eq!(output["additionalProperties"], json!(false));
    }

    #[test]
    fn arrays_recurse_through_items() {
        let schema = Schema::parse(&json!({
            "type": "array",
            "items": {"type": "string", "metrics": ["Relevant"]},
        }))
        .unwrap();
        let grading = to_grading_schema(&schema);
        assert_eq!(
            grading["items"]["required"],
            json!(["scores", "models_output", "reasoning"])
        );
        assert_eq!(collect_metrics(&schema), ["Relevant"]);
    }
}
