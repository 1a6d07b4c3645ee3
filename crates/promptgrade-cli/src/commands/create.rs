//! The `promptgrade create` command.

use std::path::PathBuf;

use anyhow::Result;

use promptgrade_core::model::Function;

use super::context::{load_definition, CliContext};

pub fn execute(ctx: &CliContext, definition_path: PathBuf) -> Result<()> {
    let definition = load_definition(&definition_path)?;

    let (mut aggregate, revision) = ctx.load_aggregate()?;
    let function = Function::create(definition)?;

    let name = function.name.clone();
    let key = function.function_key.clone();
    let root = function.current_version.clone();
    let tests = function.test_set.len();

    aggregate.insert_function(function)?;
    ctx.save_aggregate(&aggregate, revision)?;

    println!("Created function '{name}'");
    println!("  function key: {key}");
    println!("  root version: {root}");
    println!("  tests: {tests}");
    println!("\nEvaluate it with: promptgrade evaluate --function {name}");
    Ok(())
}
