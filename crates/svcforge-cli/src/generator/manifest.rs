use crate::error::CliResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path};

/// Location of the manifest inside a generated project.
pub const MANIFEST_PATH: &str = ".svcforge/manifest.json";

/// Files produced by the last generation pass.
///
/// A forced regeneration removes files listed here that the new pass no
/// longer produces. Files not listed are never touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub service: String,
    pub generator_version: String,
    pub files: BTreeSet<String>,
}

impl Manifest {
    pub fn new(service: &str, files: BTreeSet<String>) -> Self {
        Self {
            service: service.to_string(),
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            files,
        }
    }

    /// Manifest of a previous pass, if the project has one.
    pub fn load(root: &Path) -> CliResult<Option<Self>> {
        let path = root.join(MANIFEST_PATH);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, root: &Path) -> CliResult<()> {
        let path = root.join(MANIFEST_PATH);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        fs::write(path, content)?;
        Ok(())
    }

    /// Files listed here but absent from `current`.
    ///
    /// Entries that would escape the project root are skipped.
    pub fn stale<'a>(&'a self, current: &'a BTreeSet<String>) -> impl Iterator<Item = &'a str> {
        self.files
            .difference(current)
            .map(String::as_str)
            .filter(|path| is_contained(path))
    }
}

fn is_contained(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}
