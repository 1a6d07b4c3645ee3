//! The `promptgrade show` command.

use std::collections::BTreeMap;

use anyhow::Result;
use comfy_table::Table;

use promptgrade_core::model::{Function, VersionId, VersionParameters};

use super::context::{resolve_function_mut, CliContext};

pub fn execute(ctx: &CliContext, function_spec: String) -> Result<()> {
    let (mut aggregate, _revision) = ctx.load_aggregate()?;
    let function = resolve_function_mut(&mut aggregate, &function_spec)?;

    println!("Function: {} ({})", function.name, function.kind);
    println!("Key: {}", function.function_key);
    println!("Task: {}", function.task);
    println!("Tests: {}", function.test_set.len());
    println!("Versions: {}", function.version_tree.len());

    let mut table = Table::new();
    table.set_header(vec!["Version", "Created", "Parameters", "Evals", "Mean scores"]);
    let root = function.version_tree.root().clone();
    add_rows(&mut table, function, &root, 0);
    println!("{table}");
    println!("(* marks the deployed version)");
    Ok(())
}

fn add_rows(table: &mut Table, function: &Function, id: &VersionId, depth: usize) {
    let Some(node) = function.version_tree.get(id) else {
        return;
    };

    let marker = if *id == function.current_version {
        "*"
    } else {
        " "
    };
    let label = format!("{}{} {}", "  ".repeat(depth), marker, short(id));

    let parameters = match &node.parameters {
        VersionParameters::Completion {
            model, temperature, ..
        } => format!("{model} temp={temperature}"),
        VersionParameters::Custom(values) => format!("custom ({} keys)", values.len()),
    };

    table.add_row(vec![
        label,
        node.date.format("%Y-%m-%d %H:%M").to_string(),
        parameters,
        node.evals.len().to_string(),
        mean_scores_label(node.evals.iter().map(|record| &record.scores)),
    ]);

    for child in &node.children {
        add_rows(table, function, child, depth + 1);
    }
}

fn short(id: &VersionId) -> String {
    let s = id.as_str();
    if s.len() > 8 {
        s[..8].to_string()
    } else {
        s.to_string()
    }
}

fn mean_scores_label<'a>(
    score_maps: impl Iterator<Item = &'a BTreeMap<String, f64>>,
) -> String {
    let mut sums: BTreeMap<&str, (f64, u32)> = BTreeMap::new();
    for scores in score_maps {
        for (metric, score) in scores {
            let entry = sums.entry(metric.as_str()).or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }
    }
    if sums.is_empty() {
        return "-".to_string();
    }
    sums.into_iter()
        .map(|(metric, (sum, count))| format!("{metric}: {:.1}", sum / f64::from(count)))
        .collect::<Vec<_>>()
        .join(", ")
}
