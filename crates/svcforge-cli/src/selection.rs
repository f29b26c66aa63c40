//! Turns selection flags (and an optional selection file) into a model.

use crate::cli::SelectionArgs;
use crate::error::{CliError, CliResult};
use svcforge_kernel::config::SelectionFile;
use svcforge_kernel::{CapabilityRegistry, CompositionBuilder, CompositionModel};
use tracing::debug;

/// Build and validate the composition model.
///
/// Precedence, lowest first: selection file, `--type`, `--with`,
/// `--without`, `--option`.
pub fn build_model(
    registry: &CapabilityRegistry,
    name: Option<&str>,
    args: &SelectionArgs,
) -> CliResult<CompositionModel> {
    let file = args
        .config
        .as_deref()
        .map(|path| {
            debug!(path = %path.display(), "Loading selection file");
            SelectionFile::load(path)
        })
        .transpose()?;

    let service_name = name
        .map(str::to_string)
        .or_else(|| file.as_ref().and_then(|f| f.service_name.clone()))
        .ok_or_else(|| {
            CliError::Other(
                "a service name is required (positional argument or `service.name` in --config)"
                    .into(),
            )
        })?;

    let mut builder = CompositionBuilder::new(registry, service_name);
    if let Some(file) = &file {
        builder = file.apply(builder);
    }
    if let Some(service_type) = &args.service_type {
        builder = builder.service_type_str(service_type);
    }
    for raw in &args.with {
        builder = match raw.split_once('=') {
            Some((capability, provider)) => builder.select(capability, provider),
            None => builder.enable(raw, None),
        };
    }
    for capability in &args.without {
        builder = builder.disable(capability);
    }
    for raw in &args.options {
        let (capability, key, value) = parse_option(raw)?;
        builder = builder.option(capability, key, value);
    }

    Ok(builder.build()?)
}

/// Split `capability.key=value`.
fn parse_option(raw: &str) -> CliResult<(&str, &str, &str)> {
    let malformed = || CliError::Other(format!("invalid --option '{raw}', expected CAPABILITY.KEY=VALUE"));
    let (path, value) = raw.split_once('=').ok_or_else(malformed)?;
    let (capability, key) = path.split_once('.').ok_or_else(malformed)?;
    if capability.trim().is_empty() || key.trim().is_empty() {
        return Err(malformed());
    }
    Ok((capability.trim(), key.trim(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn args() -> SelectionArgs {
        SelectionArgs::default()
    }

    #[test]
    fn flags_select_and_configure_capabilities() {
        let registry = CapabilityRegistry::standard();
        let mut selection = args();
        selection.with = vec!["database=postgres".into(), "auth".into()];
        selection.options = vec!["database.port=6543".into()];

        let model = build_model(&registry, Some("orders"), &selection).unwrap();
        assert_eq!(model.provider("database"), Some("postgresql"));
        assert_eq!(model.provider("auth"), Some("jwt"));
        assert_eq!(
            model.selection("database").unwrap().option("port"),
            Some("6543")
        );
    }

    #[test]
    fn name_can_come_from_the_selection_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("svcforge.yaml");
        fs::write(&path, "service:\n  name: billing\ncache: memory\n").unwrap();

        let mut selection = args();
        selection.config = Some(path);
        selection.without = vec!["cache".into()];

        let model = build_model(&registry_standard(), None, &selection).unwrap();
        assert_eq!(model.service_name(), "billing");
        assert!(!model.is_enabled("cache"));
    }

    #[test]
    fn missing_name_is_an_error() {
        let err = build_model(&registry_standard(), None, &args()).unwrap_err();
        assert!(err.to_string().contains("service name is required"));
    }

    #[test]
    fn malformed_option_is_rejected() {
        let mut selection = args();
        selection.options = vec!["database-port=1".into()];
        let err = build_model(&registry_standard(), Some("orders"), &selection).unwrap_err();
        assert!(matches!(err, CliError::Other(ref m) if m.contains("CAPABILITY.KEY=VALUE")));
    }

    fn registry_standard() -> CapabilityRegistry {
        CapabilityRegistry::standard()
    }
}
