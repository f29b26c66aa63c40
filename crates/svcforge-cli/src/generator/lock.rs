use crate::error::{CliError, CliResult};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Exclusive claim on generating one service into one output directory.
///
/// Held for the whole generation pass and released on drop.
#[derive(Debug)]
pub struct GenerationLock {
    path: PathBuf,
}

impl GenerationLock {
    pub fn acquire(output_dir: &Path, service_name: &str) -> CliResult<Self> {
        let path = output_dir.join(format!(".{service_name}.svcforge.lock"));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id())?;
                debug!(path = %path.display(), "Generation lock acquired");
                Ok(Self { path })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(CliError::Locked { path }),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for GenerationLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove generation lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn second_holder_is_rejected_until_release() {
        let dir = TempDir::new().unwrap();
        let lock = GenerationLock::acquire(dir.path(), "orders").unwrap();
        assert!(lock.path().exists());

        let err = GenerationLock::acquire(dir.path(), "orders").unwrap_err();
        assert!(matches!(err, CliError::Locked { .. }));

        // Other services in the same directory are independent.
        let other = GenerationLock::acquire(dir.path(), "billing").unwrap();

        let path = lock.path().to_path_buf();
        drop(lock);
        assert!(!path.exists());
        GenerationLock::acquire(dir.path(), "orders").unwrap();
        drop(other);
    }
}
