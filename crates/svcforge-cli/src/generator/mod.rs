//! Static composer
//!
//! Renders a project tree from a validated composition model. A pass is
//! render-then-commit: every template is rendered into memory first, so a
//! template error leaves the destination untouched.

mod defaults;
mod lock;
mod manifest;
mod projection;
mod templates;

pub use lock::GenerationLock;
pub use manifest::{MANIFEST_PATH, Manifest};
pub use projection::{CapabilityView, Projection};
pub use templates::{STANDARD, TemplateSpec};

use crate::error::{CliError, CliResult};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use svcforge_kernel::{CapabilityRegistry, CompositionModel};
use tracing::{debug, info};

/// Directories every generated project has, whether or not a template
/// writes into them.
pub const SKELETON_DIRS: &[&str] = &[
    "cmd",
    "internal/handlers",
    "internal/models",
    "internal/repositories",
    "internal/services",
    "internal/middleware",
    "pkg/types",
    "configs",
    "deployments/docker",
    "deployments/kubernetes",
    "deployments/helm",
    "tests/unit",
    "tests/integration",
    "tests/e2e",
    "docs",
];

/// Outcome of one generation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub root: PathBuf,
    /// Files written, relative to `root`, sorted.
    pub files: Vec<String>,
    /// Files from a previous pass that were removed, sorted.
    pub removed: Vec<String>,
}

/// The workspace `crates/` directory this binary was built from.
pub fn default_runtime_path() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .map_or_else(|| manifest_dir.to_path_buf(), Path::to_path_buf)
}

pub struct Generator<'r> {
    registry: &'r CapabilityRegistry,
    templates: Vec<TemplateSpec>,
    runtime_path: PathBuf,
}

impl<'r> Generator<'r> {
    pub fn new(registry: &'r CapabilityRegistry) -> Self {
        Self::with_templates(registry, STANDARD.to_vec())
    }

    pub fn with_templates(registry: &'r CapabilityRegistry, templates: Vec<TemplateSpec>) -> Self {
        Self {
            registry,
            templates,
            runtime_path: default_runtime_path(),
        }
    }

    /// Point the generated manifest's svcforge dependencies at `path`.
    pub fn with_runtime_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.runtime_path = path.into();
        self
    }

    /// Generate `<output_dir>/<service_name>`.
    ///
    /// Without `force`, an existing non-empty project directory is a
    /// [`CliError::DestinationConflict`] and nothing is written. With
    /// `force`, files are overwritten and files left over from a previous
    /// pass that this pass does not produce are removed.
    pub fn generate(
        &self,
        model: &CompositionModel,
        output_dir: &Path,
        force: bool,
    ) -> CliResult<GenerationReport> {
        let root = output_dir.join(model.service_name());
        check_destination(&root, force)?;

        fs::create_dir_all(output_dir)?;
        let _lock = GenerationLock::acquire(output_dir, model.service_name())?;
        // Another pass may have finished while we were waiting on the lock.
        check_destination(&root, force)?;

        let rendered = self.render(model)?;
        let previous = Manifest::load(&root)?;

        for dir in SKELETON_DIRS {
            fs::create_dir_all(root.join(dir))?;
        }
        for (path, content) in &rendered {
            let target = root.join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, content)?;
            debug!(file = %path, "Wrote file");
        }

        let files: BTreeSet<String> = rendered.iter().map(|(path, _)| path.to_string()).collect();
        let mut removed = Vec::new();
        if let Some(previous) = previous {
            for stale in previous.stale(&files) {
                let target = root.join(stale);
                if target.is_file() {
                    fs::remove_file(&target)?;
                    debug!(file = %stale, "Removed stale file");
                    removed.push(stale.to_string());
                }
            }
        }
        Manifest::new(model.service_name(), files.clone()).save(&root)?;

        info!(
            service = %model.service_name(),
            root = %root.display(),
            files = files.len(),
            removed = removed.len(),
            "Project generated"
        );
        Ok(GenerationReport {
            root,
            files: files.into_iter().collect(),
            removed,
        })
    }

    /// Render every applicable template into memory, in template order.
    pub fn render(&self, model: &CompositionModel) -> CliResult<Vec<(&'static str, String)>> {
        let mut projection = Projection::new(model, self.registry);
        projection.runtime_path = self
            .runtime_path
            .to_string_lossy()
            .replace('\\', "/")
            .trim_end_matches('/')
            .to_string();
        let selected: Vec<TemplateSpec> = self
            .templates
            .iter()
            .filter(|spec| spec.when.is_none_or(|capability| model.is_enabled(capability)))
            .copied()
            .collect();

        let tera = templates::environment(&selected, &projection)?;
        let context = templates::context(&projection)?;

        selected
            .iter()
            .map(|spec| {
                let content = tera
                    .render(spec.path, &context)
                    .map_err(|e| CliError::template(spec.path, &e))?;
                Ok((spec.path, content))
            })
            .collect()
    }
}

fn check_destination(root: &Path, force: bool) -> CliResult<()> {
    if !root.exists() {
        return Ok(());
    }
    let conflict = if root.is_dir() {
        !force && fs::read_dir(root)?.next().is_some()
    } else {
        true
    };
    if conflict {
        return Err(CliError::DestinationConflict {
            path: root.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests;
