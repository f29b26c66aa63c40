//! `svcforge new` command implementation

use crate::CliResult;
use crate::cli::SelectionArgs;
use crate::generator::Generator;
use crate::selection::build_model;
use colored::Colorize;
use std::path::Path;
use svcforge_kernel::CapabilityRegistry;

/// Execute the `svcforge new` command
pub fn run(
    name: Option<&str>,
    selection: &SelectionArgs,
    output: &Path,
    force: bool,
    runtime_path: Option<&Path>,
) -> CliResult<()> {
    let registry = CapabilityRegistry::standard();
    registry.validate_acyclic()?;
    let model = build_model(&registry, name, selection)?;

    println!(
        "{} Creating service: {}",
        "→".green(),
        model.service_name().cyan()
    );
    println!("  Type: {}", model.service_type().to_string().yellow());
    let enabled: Vec<String> = model
        .enabled()
        .filter(|(name, _)| registry.resolve(name).is_some_and(|c| !c.is_core))
        .map(|(name, selection)| format!("{name} ({})", selection.provider))
        .collect();
    if enabled.is_empty() {
        println!("  Capabilities: {}", "core only".dimmed());
    } else {
        println!("  Capabilities: {}", enabled.join(", "));
    }

    let mut generator = Generator::new(&registry);
    if let Some(path) = runtime_path {
        generator = generator.with_runtime_path(path);
    }
    let report = generator.generate(&model, output, force)?;

    println!(
        "{} Generated {} files in {}",
        "✓".green(),
        report.files.len(),
        report.root.display()
    );
    for removed in &report.removed {
        println!("  {} {}", "removed".red(), removed);
    }
    println!();
    println!("Next steps:");
    println!("  cd {}", report.root.display());
    println!("  cargo run");

    Ok(())
}
