//! The `promptgrade validate` command.

use std::path::PathBuf;

use anyhow::Result;

use promptgrade_core::schema::{collect_metrics, to_grading_schema, Schema};

use super::context::load_definition;

pub fn execute(definition_path: PathBuf) -> Result<()> {
    let definition = load_definition(&definition_path)?;

    Schema::parse(&definition.input_schema)?;
    let output = Schema::parse(&definition.output_schema)?;
    let metrics = collect_metrics(&output);
    let grading = to_grading_schema(&output);

    println!("Function: {} ({})", definition.name, definition.kind);
    println!("Task: {}", definition.task);
    println!("Tests: {}", definition.test_set.len());
    if metrics.is_empty() {
        println!("Metrics: none (grading will only check schema conformance)");
    } else {
        println!("Metrics: {}", metrics.join(", "));
    }

    // Check the declared test inputs against the input schema.
    let mut warnings = 0;
    if let Ok(validator) = jsonschema::validator_for(&definition.input_schema) {
        for (index, case) in definition.test_set.iter().enumerate() {
            if let Err(error) = validator.validate(&case.input) {
                println!("  [test {index}] WARNING: input does not match the input schema: {error}");
                warnings += 1;
            }
        }
    }

    println!(
        "\nGrading schema:\n{}",
        serde_json::to_string_pretty(&grading)?
    );

    if warnings == 0 {
        println!("\nDefinition is valid.");
    } else {
        println!("\nDefinition is valid, {warnings} warning(s) found.");
    }
    Ok(())
}
