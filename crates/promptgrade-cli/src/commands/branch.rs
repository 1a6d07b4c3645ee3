//! The `promptgrade branch` command.

use anyhow::Result;

use promptgrade_core::error::EvalError;
use promptgrade_core::model::VersionParameters;
use promptgrade_invoke::LlmInvoker;

use super::context::{resolve_function_mut, resolve_version, CliContext};
use super::evaluate::print_summary;

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    ctx: &CliContext,
    function_spec: String,
    parent: Option<String>,
    prompt: Option<String>,
    model: Option<String>,
    temperature: Option<f64>,
    evaluate: bool,
    provider: Option<String>,
) -> Result<()> {
    let (mut aggregate, revision) = ctx.load_aggregate()?;

    let (branch_id, parent_id, has_tests) = {
        let function = resolve_function_mut(&mut aggregate, &function_spec)?;
        let parent_id = resolve_version(function, parent.as_deref())?;

        let parent_params = function
            .version_tree
            .get(&parent_id)
            .map(|node| node.parameters.clone())
            .ok_or_else(|| EvalError::VersionNotFound(parent_id.clone()))?;

        let parameters = match parent_params {
            VersionParameters::Completion {
                prompt: parent_prompt,
                model: parent_model,
                temperature: parent_temperature,
            } => VersionParameters::Completion {
                prompt: prompt.unwrap_or(parent_prompt),
                model: model.unwrap_or(parent_model),
                temperature: temperature.unwrap_or(parent_temperature),
            },
            VersionParameters::Custom(values) => {
                anyhow::ensure!(
                    prompt.is_none() && model.is_none() && temperature.is_none(),
                    "version {parent_id} holds custom parameters; \
                     prompt/model/temperature overrides do not apply"
                );
                VersionParameters::Custom(values)
            }
        };

        let branch_id = function.version_tree.branch(&parent_id, parameters)?;
        (branch_id, parent_id, !function.test_set.is_empty())
    };

    // Persist the branch before evaluating, so a failed evaluation never
    // loses it.
    let revision = Some(ctx.save_aggregate(&aggregate, revision)?);
    println!("Created version {branch_id} from {parent_id}");

    if evaluate {
        if !has_tests {
            eprintln!("Test set is empty; skipping evaluation.");
            return Ok(());
        }
        let orchestrator = ctx.orchestrator(provider.as_deref())?;
        let invoker = LlmInvoker::new(ctx.completion(provider.as_deref())?);

        let summary = {
            let function = resolve_function_mut(&mut aggregate, &function_spec)?;
            orchestrator
                .evaluate_version(function, &branch_id, &invoker)
                .await?
        };
        ctx.save_aggregate(&aggregate, revision)?;
        print_summary(&summary);
    }

    Ok(())
}
