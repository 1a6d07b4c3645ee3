//! The `promptgrade evaluate` command.

use anyhow::Result;
use comfy_table::Table;

use promptgrade_core::orchestrator::EvaluationSummary;
use promptgrade_invoke::LlmInvoker;

use super::context::{resolve_function_mut, resolve_version, CliContext};

pub async fn execute(
    ctx: &CliContext,
    function_spec: String,
    version: Option<String>,
    provider: Option<String>,
) -> Result<()> {
    let orchestrator = ctx.orchestrator(provider.as_deref())?;
    let invoker = LlmInvoker::new(ctx.completion(provider.as_deref())?);

    let (mut aggregate, revision) = ctx.load_aggregate()?;
    let summary = {
        let function = resolve_function_mut(&mut aggregate, &function_spec)?;
        let version_id = resolve_version(function, version.as_deref())?;
        orchestrator
            .evaluate_version(function, &version_id, &invoker)
            .await?
    };
    ctx.save_aggregate(&aggregate, revision)?;

    print_summary(&summary);
    Ok(())
}

pub(crate) fn print_summary(summary: &EvaluationSummary) {
    eprintln!(
        "\nVersion {}: {} record(s) appended, {} failed",
        summary.version,
        summary.records.len(),
        summary.failures.len()
    );

    let means = summary.mean_scores();
    if !means.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Metric", "Mean score", "Samples"]);
        for (metric, mean) in &means {
            let samples = summary
                .records
                .iter()
                .filter(|r| r.scores.contains_key(metric))
                .count();
            table.add_row(vec![
                metric.clone(),
                format!("{mean:.1}"),
                samples.to_string(),
            ]);
        }
        eprintln!("{table}");
    }

    for (index, error) in &summary.failures {
        eprintln!("  test {index}: {error}");
    }
}
