//! `svcforge validate` command implementation

use crate::CliResult;
use crate::cli::SelectionArgs;
use crate::selection::build_model;
use colored::Colorize;
use svcforge_kernel::CapabilityRegistry;

/// Resolve a selection and print the model it produces.
///
/// Invalid selections fail with every violated invariant listed.
pub fn run(name: Option<&str>, selection: &SelectionArgs, json: bool) -> CliResult<()> {
    let registry = CapabilityRegistry::standard();
    registry.validate_acyclic()?;
    let model = build_model(&registry, name, selection)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&model)?);
        return Ok(());
    }

    eprintln!(
        "{} Composition for '{}' is valid",
        "✓".green(),
        model.service_name()
    );
    print!("{}", serde_yaml::to_string(&model)?);
    Ok(())
}
