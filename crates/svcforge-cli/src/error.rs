use std::path::PathBuf;
use svcforge_kernel::config::ConfigError;
use svcforge_kernel::{RegistryError, ValidationError};
use svcforge_runtime::OrchestratorError;

pub type CliResult<T> = Result<T, CliError>;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(
        "destination '{}' already exists and is not empty (use --force to regenerate into it)",
        path.display()
    )]
    DestinationConflict { path: PathBuf },

    #[error("failed to render template '{template}': {message}")]
    TemplateRender { template: String, message: String },

    #[error("another generation is in progress (lock file '{}')", path.display())]
    Locked { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Capability catalog error: {0}")]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error("{0}")]
    Other(String),
}

impl CliError {
    /// Flatten a tera error chain into one message.
    pub fn template(template: &str, error: &tera::Error) -> Self {
        let mut message = error.to_string();
        let mut source = std::error::Error::source(error);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        CliError::TemplateRender {
            template: template.to_string(),
            message,
        }
    }
}

impl From<&str> for CliError {
    fn from(s: &str) -> Self {
        CliError::Other(s.to_string())
    }
}

impl From<String> for CliError {
    fn from(s: String) -> Self {
        CliError::Other(s)
    }
}
