//! Prompt text for grading and test generation.

use serde_json::Value;

/// System prompt for grading completions.
pub const GRADING_SYSTEM_PROMPT: &str = "\
Given the task, the input, and an output schema outlining the metrics to \
grade for each item, grade the output against every metric.

Instructions:

1. Understand the metrics: for each item in the output schema, identify the \
metrics the model's output should satisfy.
2. Analyze the output: compare each output item against its metrics, \
reasoning step by step about how well it satisfies each one.
3. Assign scores on a 0-100 scale: 0-25 means the metric is not satisfied at \
all, 26-75 partially satisfied, 76-100 fully satisfied (this should be \
rare). Use the full range; aim for an average of around 50 across \
evaluations. If a metric names a negative property, a higher score means a \
stronger presence of that property.
4. Keep the original model outputs exactly as provided in `models_output`.
5. Put your per-item justification in `reasoning`.";

/// System prompt for synthesizing test inputs.
pub const TEST_GENERATION_SYSTEM_PROMPT: &str = "\
Generate example inputs for evaluation that match the given input schema \
for the task. Generate inputs indicative of real user input, and include \
edge cases.";

/// User message for one grading request: the task plus the verbatim
/// input/output pair under evaluation.
pub fn grading_user_message(task: &str, input: &Value, output: &Value) -> String {
    format!("task: {task}\ninput: {input}\noutput: {output}")
}

/// User message for a test-generation request.
pub fn test_generation_user_message(task: &str) -> String {
    format!("Task:\n{task}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn grading_message_embeds_pair_verbatim() {
        let msg = grading_user_message(
            "derivative of sin(x)",
            &json!({"Question": "d/dx sin(x)?"}),
            &json!({"Answer": "cos(x)"}),
        );
        assert!(msg.starts_with("task: derivative of sin(x)"));
        assert!(msg.contains(r#"input: {"Question":"d/dx sin(x)?"}"#));
        assert!(msg.contains(r#"output: {"Answer":"cos(x)"}"#));
    }
}
