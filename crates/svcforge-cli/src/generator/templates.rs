//! Embedded project templates and the tera environment they render in.

use super::projection::{CapabilityView, Projection};
use crate::error::{CliError, CliResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tera::{Context, Tera, Value};

/// One file of the generated tree.
#[derive(Debug, Clone, Copy)]
pub struct TemplateSpec {
    /// Output path relative to the project root, `/`-separated.
    pub path: &'static str,
    pub source: &'static str,
    /// Rendered only when this capability is enabled.
    pub when: Option<&'static str>,
}

impl TemplateSpec {
    pub const fn always(path: &'static str, source: &'static str) -> Self {
        Self {
            path,
            source,
            when: None,
        }
    }

    pub const fn when(capability: &'static str, path: &'static str, source: &'static str) -> Self {
        Self {
            path,
            source,
            when: Some(capability),
        }
    }
}

macro_rules! template {
    ($file:literal) => {
        include_str!(concat!("../../templates/", $file, ".tera"))
    };
}

/// The built-in template set.
pub const STANDARD: &[TemplateSpec] = &[
    TemplateSpec::always("Cargo.toml", template!("Cargo.toml")),
    TemplateSpec::always(".gitignore", template!("gitignore")),
    TemplateSpec::always("cmd/main.rs", template!("main.rs")),
    TemplateSpec::always("internal/lib.rs", template!("lib.rs")),
    TemplateSpec::always("internal/providers.rs", template!("providers.rs")),
    TemplateSpec::always("internal/handlers/mod.rs", template!("handlers.rs")),
    TemplateSpec::always("internal/models/mod.rs", template!("models.rs")),
    TemplateSpec::always("internal/services/mod.rs", template!("services.rs")),
    TemplateSpec::always("internal/middleware/mod.rs", template!("middleware.rs")),
    TemplateSpec::always("pkg/types/mod.rs", template!("types.rs")),
    TemplateSpec::always("configs/config.yaml", template!("config.yaml")),
    TemplateSpec::always("deployments/docker/Dockerfile", template!("Dockerfile")),
    TemplateSpec::always("deployments/docker/docker-compose.yml", template!("docker-compose.yml")),
    TemplateSpec::always("deployments/kubernetes/deployment.yaml", template!("deployment.yaml")),
    TemplateSpec::always("deployments/kubernetes/configmap.yaml", template!("configmap.yaml")),
    TemplateSpec::always("deployments/helm/Chart.yaml", template!("Chart.yaml")),
    TemplateSpec::always("deployments/helm/values.yaml", template!("values.yaml")),
    TemplateSpec::always("tests/integration/health.rs", template!("health_test.rs")),
    TemplateSpec::always("docs/README.md", template!("README.md")),
    TemplateSpec::when("database", "internal/repositories/mod.rs", template!("repositories.rs")),
    TemplateSpec::when("auth", "internal/middleware/auth.rs", template!("auth.rs")),
    TemplateSpec::when("event", "internal/services/events.rs", template!("events.rs")),
    TemplateSpec::when("scheduler", "internal/services/jobs.rs", template!("jobs.rs")),
    TemplateSpec::when("payment", "internal/handlers/payment.rs", template!("payment.rs")),
];

/// Build a tera environment holding `templates`, with the capability
/// lookup functions bound to `projection`.
///
/// Functions: `enabled(name)`, `provider(name)` and
/// `option(name, key, default)`. Filters: `yaml` renders a setting as a
/// YAML scalar, `rust_str` as a Rust string literal.
pub fn environment(templates: &[TemplateSpec], projection: &Projection) -> CliResult<Tera> {
    let mut tera = Tera::default();
    for spec in templates {
        tera.add_raw_template(spec.path, spec.source)
            .map_err(|e| CliError::template(spec.path, &e))?;
    }

    let capabilities = Arc::new(projection.capabilities.clone());

    let lookup = capabilities.clone();
    tera.register_function("enabled", move |args: &HashMap<String, Value>| {
        let name = string_arg(args, "enabled", "name")?;
        Ok(Value::Bool(lookup.get(&name).is_some_and(|c| c.enabled)))
    });

    let lookup = capabilities.clone();
    tera.register_function("provider", move |args: &HashMap<String, Value>| {
        let name = string_arg(args, "provider", "name")?;
        let provider = enabled(&lookup, &name).map(|c| c.provider.clone());
        Ok(Value::String(provider.unwrap_or_default()))
    });

    let lookup = capabilities;
    tera.register_function("option", move |args: &HashMap<String, Value>| {
        let name = string_arg(args, "option", "name")?;
        let key = string_arg(args, "option", "key")?;
        let value = enabled(&lookup, &name).and_then(|c| c.settings.get(&key).cloned());
        match value {
            Some(value) => Ok(Value::String(value)),
            None => Ok(args.get("default").cloned().unwrap_or(Value::Null)),
        }
    });

    tera.register_filter("yaml", |value: &Value, _: &HashMap<String, Value>| {
        Ok(Value::String(yaml_scalar(value)))
    });
    tera.register_filter("rust_str", |value: &Value, _: &HashMap<String, Value>| {
        Ok(Value::String(rust_literal(value)))
    });

    Ok(tera)
}

pub fn context(projection: &Projection) -> CliResult<Context> {
    Context::from_serialize(projection).map_err(|e| CliError::template("<context>", &e))
}

fn enabled<'a>(
    capabilities: &'a BTreeMap<String, CapabilityView>,
    name: &str,
) -> Option<&'a CapabilityView> {
    capabilities.get(name).filter(|c| c.enabled)
}

fn string_arg(args: &HashMap<String, Value>, function: &str, arg: &str) -> tera::Result<String> {
    match args.get(arg) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(tera::Error::msg(format!(
            "`{function}`: argument `{arg}` must be a string, got {other}"
        ))),
        None => Err(tera::Error::msg(format!(
            "`{function}`: missing argument `{arg}`"
        ))),
    }
}

/// Render a setting as a YAML scalar.
///
/// Booleans and numbers whose canonical form is the exact input text stay
/// bare; everything else is double-quoted, so `0123` or `1e3` read back as
/// the same string.
fn yaml_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => {
            let bare = s.parse::<i64>().is_ok_and(|n| n.to_string() == *s)
                || (s.contains('.')
                    && s.parse::<f64>()
                        .is_ok_and(|f| f.is_finite() && f.to_string() == *s))
                || s == "true"
                || s == "false";
            if bare {
                s.clone()
            } else {
                Value::String(s.clone()).to_string()
            }
        }
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Render a setting as a Rust string literal.
fn rust_literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("{s:?}"),
        other => format!("{:?}", other.to_string()),
    }
}
