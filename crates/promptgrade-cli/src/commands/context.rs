//! Shared command context: configuration, store, and lookups.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use promptgrade_core::error::EvalError;
use promptgrade_core::grading::GradingEngine;
use promptgrade_core::model::{Function, FunctionDefinition, OwnerAggregate, VersionId};
use promptgrade_core::orchestrator::Orchestrator;
use promptgrade_core::traits::{CompletionService, FunctionStore};
use promptgrade_providers::config::{create_completion, load_config_from, PromptgradeConfig};
use promptgrade_store::JsonFileStore;

pub struct CliContext {
    pub config: PromptgradeConfig,
    pub store: JsonFileStore,
    pub owner: String,
}

impl CliContext {
    pub fn load(
        config_path: Option<&Path>,
        store_dir: Option<PathBuf>,
        owner: Option<String>,
    ) -> Result<Self> {
        let config = load_config_from(config_path)?;
        let store = JsonFileStore::new(store_dir.unwrap_or_else(|| config.store_dir.clone()));
        let owner = owner.unwrap_or_else(|| config.owner.clone());
        Ok(Self {
            config,
            store,
            owner,
        })
    }

    /// Completion backend by name, or the configured default.
    pub fn completion(&self, provider: Option<&str>) -> Result<Arc<dyn CompletionService>> {
        let name = provider.unwrap_or(&self.config.default_provider);
        let provider_config = self.config.providers.get(name).with_context(|| {
            format!(
                "provider '{name}' not found in config. Available: {:?}",
                self.config.providers.keys().collect::<Vec<_>>()
            )
        })?;
        Ok(Arc::from(create_completion(name, provider_config)?))
    }

    /// An orchestrator grading through the named (or default) provider.
    pub fn orchestrator(&self, provider: Option<&str>) -> Result<Orchestrator> {
        let completion = self.completion(provider)?;
        Ok(Orchestrator::new(GradingEngine::new(
            completion,
            self.config.grading_config(),
        )))
    }

    /// Load the owner aggregate with its revision, or a fresh empty one.
    pub fn load_aggregate(&self) -> Result<(OwnerAggregate, Option<u64>)> {
        match self.store.load(&self.owner)? {
            Some(stored) => Ok((stored.aggregate, Some(stored.revision))),
            None => Ok((OwnerAggregate::new(self.owner.clone()), None)),
        }
    }

    pub fn save_aggregate(
        &self,
        aggregate: &OwnerAggregate,
        expected: Option<u64>,
    ) -> Result<u64> {
        Ok(self.store.save(&self.owner, aggregate, expected)?)
    }
}

/// Parse a function definition TOML file.
pub fn load_definition(path: &Path) -> Result<FunctionDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read definition: {}", path.display()))?;
    let definition: FunctionDefinition = toml::from_str(&content)
        .with_context(|| format!("failed to parse definition: {}", path.display()))?;
    Ok(definition)
}

/// Resolve a function by display name or function key.
pub fn resolve_function_mut<'a>(
    aggregate: &'a mut OwnerAggregate,
    name_or_key: &str,
) -> Result<&'a mut Function> {
    let index = aggregate
        .functions
        .iter()
        .position(|f| f.name == name_or_key || f.function_key == name_or_key)
        .ok_or_else(|| EvalError::FunctionNotFound(name_or_key.to_string()))?;
    Ok(&mut aggregate.functions[index])
}

/// Resolve a version spec: a full id, a unique prefix, `current`, or
/// nothing (the deployed version).
pub fn resolve_version(function: &Function, spec: Option<&str>) -> Result<VersionId> {
    let Some(spec) = spec else {
        return Ok(function.current_version.clone());
    };
    if spec == "current" {
        return Ok(function.current_version.clone());
    }

    let matches: Vec<VersionId> = function
        .version_tree
        .walk()
        .iter()
        .map(|node| node.id.clone())
        .filter(|id| id.as_str().starts_with(spec))
        .collect();

    match matches.as_slice() {
        [single] => Ok(single.clone()),
        [] => Err(EvalError::VersionNotFound(VersionId::from(spec)).into()),
        _ => anyhow::bail!("version prefix '{spec}' is ambiguous"),
    }
}
