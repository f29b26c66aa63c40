//! Selection files
//!
//! A composition can be described in a file instead of (or in addition to)
//! command-line flags. The same shape is used for the generated service's
//! `configs/config.yaml`, so a generated project can be re-composed from its
//! own configuration:
//!
//! ```yaml
//! service:
//!   name: orders
//!   type: rest
//! database:
//!   enabled: true
//!   provider: postgresql
//!   providers:
//!     postgresql:
//!       host: ${DB_HOST}
//!       port: 5432
//! cache: false
//! auth: jwt
//! ```
//!
//! ## Features
//!
//! - Auto-detection of format from file extension (YAML, TOML, JSON)
//! - Environment variable substitution (`${VAR}` and `$VAR` syntax)
//! - Scalars are accepted as a shorthand: `true`/`false` toggle a capability,
//!   any other string selects a provider

use crate::model::CompositionBuilder;
pub use config::FileFormat;
use config::{Config as Cfg, File, Value, ValueKind};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::LazyLock;

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid entry '{key}': {reason}")]
    InvalidEntry { key: String, reason: String },
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

static BRACED_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));
static SIMPLE_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b").expect("valid regex"));

/// Detect configuration format from file extension
///
/// # Supported Extensions
///
/// - YAML: `.yaml`, `.yml`
/// - TOML: `.toml`
/// - JSON: `.json`
pub fn detect_format(path: &Path) -> ConfigResult<FileFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat("No file extension found".to_string()))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

/// Substitute environment variables in a string
///
/// Supports both `${VAR_NAME}` and `$VAR_NAME`. References to unset
/// variables are left untouched so that generated configuration keeps its
/// placeholders.
pub fn substitute_env_vars(content: &str) -> String {
    let result = BRACED_VAR
        .replace_all(content, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string();

    SIMPLE_VAR
        .replace_all(&result, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string()
}

/// One capability entry of a selection file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityEntry {
    pub enabled: bool,
    pub provider: Option<String>,
    pub options: BTreeMap<String, String>,
}

/// Parsed selection file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionFile {
    pub service_name: Option<String>,
    pub service_type: Option<String>,
    pub capabilities: BTreeMap<String, CapabilityEntry>,
}

impl SelectionFile {
    /// Load a selection file, detecting its format from the extension.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let format = detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content, format)
    }

    /// Parse a selection from a string with explicit format.
    pub fn from_str(content: &str, format: FileFormat) -> ConfigResult<Self> {
        let substituted = substitute_env_vars(content);

        let config = Cfg::builder()
            .add_source(File::from_str(&substituted, format))
            .build()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        let root: HashMap<String, Value> = config
            .try_deserialize()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        let mut file = SelectionFile::default();
        for (key, value) in root {
            if key == "service" {
                let mut service = table(&key, value)?;
                file.service_name = service.remove("name").map(|v| scalar("service.name", v)).transpose()?;
                file.service_type = service.remove("type").map(|v| scalar("service.type", v)).transpose()?;
                continue;
            }
            let entry = capability_entry(&key, value)?;
            file.capabilities.insert(key, entry);
        }
        Ok(file)
    }

    /// Feed this selection into a builder. Later calls on the builder
    /// (e.g. command-line flags) override what the file says.
    pub fn apply<'r>(&self, mut builder: CompositionBuilder<'r>) -> CompositionBuilder<'r> {
        if let Some(ref service_type) = self.service_type {
            builder = builder.service_type_str(service_type);
        }
        for (name, entry) in &self.capabilities {
            builder = if entry.enabled {
                builder.enable(name, entry.provider.as_deref())
            } else {
                builder.disable(name)
            };
            if !entry.options.is_empty() {
                builder = builder.options(name, &entry.options);
            }
        }
        builder
    }
}

fn capability_entry(key: &str, value: Value) -> ConfigResult<CapabilityEntry> {
    match value.kind {
        ValueKind::Nil => Ok(CapabilityEntry::default()),
        ValueKind::Boolean(enabled) => Ok(CapabilityEntry {
            enabled,
            ..Default::default()
        }),
        ValueKind::Table(_) => {
            let mut fields = table(key, value)?;
            let enabled = match fields.remove("enabled") {
                Some(v) => v.into_bool().map_err(|e| invalid(key, e))?,
                None => true,
            };
            let mut provider = fields
                .remove("provider")
                .map(|v| scalar(key, v))
                .transpose()?
                .filter(|p| !p.is_empty());

            let mut options = BTreeMap::new();
            if let Some(providers) = fields.remove("providers") {
                let mut providers = table(key, providers)?;
                if provider.is_none() && providers.len() == 1 {
                    provider = providers.keys().next().cloned();
                }
                if let Some(settings) = provider.as_ref().and_then(|p| providers.remove(p)) {
                    options.extend(string_table(key, settings)?);
                }
            }
            if let Some(extra) = fields.remove("options") {
                options.extend(string_table(key, extra)?);
            }

            Ok(CapabilityEntry {
                enabled,
                provider,
                options,
            })
        }
        ValueKind::Array(_) => Err(ConfigError::InvalidEntry {
            key: key.to_string(),
            reason: "expected a table, a boolean or a provider name".to_string(),
        }),
        _ => {
            let raw = scalar(key, value)?;
            match raw.trim().to_ascii_lowercase().as_str() {
                "" | "false" | "off" | "none" => Ok(CapabilityEntry::default()),
                "true" | "on" | "default" => Ok(CapabilityEntry {
                    enabled: true,
                    ..Default::default()
                }),
                _ => Ok(CapabilityEntry {
                    enabled: true,
                    provider: Some(raw),
                    options: BTreeMap::new(),
                }),
            }
        }
    }
}

fn table(key: &str, value: Value) -> ConfigResult<HashMap<String, Value>> {
    value
        .into_table()
        .map(|t| t.into_iter().collect())
        .map_err(|e| invalid(key, e))
}

fn string_table(key: &str, value: Value) -> ConfigResult<BTreeMap<String, String>> {
    table(key, value)?
        .into_iter()
        .map(|(k, v)| {
            let path = format!("{key}.{k}");
            scalar(&path, v).map(|s| (k, s))
        })
        .collect()
}

fn scalar(key: &str, value: Value) -> ConfigResult<String> {
    value.into_string().map_err(|e| invalid(key, e))
}

fn invalid(key: &str, err: config::ConfigError) -> ConfigError {
    ConfigError::InvalidEntry {
        key: key.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests;
