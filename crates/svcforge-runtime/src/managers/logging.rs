use crate::catalog::BuildContext;
use std::any::Any;
use std::sync::Arc;
use svcforge_kernel::manager::{option_or, parse_option};
use svcforge_kernel::{Manager, ManagerError, ManagerResult};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Output format of the service logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Plain,
    Json,
}

/// Installs the service's `tracing` subscriber.
///
/// Options: `level` (an `EnvFilter` directive, default `info`), `format`
/// (`plain` or `json`; the `json` provider implies `json`) and `install`
/// (default `true`). An already installed global subscriber is kept.
#[derive(Debug)]
pub struct LoggingManager {
    provider: String,
    level: String,
    format: LogFormat,
    installed: bool,
}

impl LoggingManager {
    pub fn create(ctx: &BuildContext<'_>) -> ManagerResult<Arc<dyn Manager>> {
        let options = ctx.options();
        let level = option_or(options, "level", "info").to_string();
        let default_format = if ctx.provider() == "json" { "json" } else { "plain" };
        let format = match option_or(options, "format", default_format) {
            "plain" | "text" => LogFormat::Plain,
            "json" => LogFormat::Json,
            other => {
                return Err(ManagerError::invalid_option(
                    "format",
                    format!("'{other}' is not one of plain, json"),
                ));
            }
        };
        let filter = EnvFilter::try_new(&level)
            .map_err(|e| ManagerError::invalid_option("level", e.to_string()))?;

        let installed = if parse_option(options, "install", true)? {
            let result = match format {
                LogFormat::Plain => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
                LogFormat::Json => tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(filter)
                    .try_init(),
            };
            if let Err(ref e) = result {
                debug!(error = %e, "global subscriber already installed, keeping it");
            }
            result.is_ok()
        } else {
            false
        };

        Ok(Arc::new(Self {
            provider: ctx.provider().to_string(),
            level,
            format,
            installed,
        }))
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// Whether this manager installed the global subscriber.
    pub fn installed(&self) -> bool {
        self.installed
    }
}

#[async_trait::async_trait]
impl Manager for LoggingManager {
    fn capability(&self) -> &str {
        "logging"
    }

    fn provider(&self) -> &str {
        &self.provider
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
