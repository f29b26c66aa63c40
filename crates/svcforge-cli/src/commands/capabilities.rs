//! `svcforge capabilities` command implementation

use crate::CliResult;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use svcforge_kernel::{CapabilityRegistry, StartMode};

/// List the capability catalog.
pub fn run(json: bool) -> CliResult<()> {
    let registry = CapabilityRegistry::standard();
    registry.validate_acyclic()?;

    if json {
        println!("{}", serde_json::to_string_pretty(registry.all())?);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120)
        .set_header(vec![
            "Capability",
            "Core",
            "Default",
            "Providers",
            "Depends on",
            "Start",
        ]);

    for capability in registry.all() {
        let core = if capability.is_core {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no")
        };
        let providers: Vec<&str> = capability
            .valid_providers
            .iter()
            .map(String::as_str)
            .collect();
        let start = match capability.start_mode {
            StartMode::InProcess => "in-process".to_string(),
            StartMode::Connect(phase) => format!("{phase:?}").to_lowercase(),
        };
        table.add_row(vec![
            Cell::new(&capability.name).fg(Color::Cyan),
            core,
            Cell::new(&capability.default_provider),
            Cell::new(providers.join(", ")),
            Cell::new(capability.depends_on.join(", ")),
            Cell::new(start),
        ]);
    }

    println!("{table}");
    Ok(())
}
