//! The `promptgrade deploy` command.

use anyhow::Result;

use super::context::{resolve_function_mut, resolve_version, CliContext};

pub fn execute(ctx: &CliContext, function_spec: String, version: String) -> Result<()> {
    let (mut aggregate, revision) = ctx.load_aggregate()?;

    let deployed = {
        let function = resolve_function_mut(&mut aggregate, &function_spec)?;
        let version_id = resolve_version(function, Some(&version))?;
        function.deploy(&version_id)?;
        version_id
    };

    ctx.save_aggregate(&aggregate, revision)?;
    println!("Version {deployed} deployed");
    Ok(())
}
