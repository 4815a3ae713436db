use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Result, WatchError};
use crate::process::{run_shell, shell_quote};

/// Trait for diff backends (external command or mock)
#[async_trait]
pub trait Differ: Send + Sync {
    /// Compare two buffers by path; an empty result means "no difference"
    async fn compare(&self, old: &Path, new: &Path) -> Result<String>;
}

/// Diff backend that runs an external command as `<command> <old> <new>`
pub struct ExternalDiff {
    command: String,
    shell: String,
}

impl ExternalDiff {
    /// Create an ExternalDiff from the configuration
    pub fn new(config: &Config) -> Self {
        Self {
            command: config.diff_invocation(),
            shell: config.shell.clone(),
        }
    }

    /// The diff command without the buffer paths
    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl Differ for ExternalDiff {
    async fn compare(&self, old: &Path, new: &Path) -> Result<String> {
        let invocation = format!(
            "{} {} {}",
            self.command,
            shell_quote(&old.to_string_lossy()),
            shell_quote(&new.to_string_lossy())
        );

        let result = run_shell(&self.shell, &invocation, true).await?;

        // diff(1) exits 1 when the inputs differ; 126/127 are the shell's
        // "cannot execute" and "not found"
        match result.status.code() {
            Some(0) | Some(1) => {}
            Some(code @ (126 | 127)) => {
                let message = String::from_utf8_lossy(&result.output).trim().to_string();
                let kind = if code == 127 {
                    ErrorKind::NotFound
                } else {
                    ErrorKind::PermissionDenied
                };
                return Err(WatchError::Spawn {
                    program: self.command.clone(),
                    source: std::io::Error::new(kind, message),
                });
            }
            _ => warn!("Diff command {:?} exited with {}", self.command, result.status),
        }

        debug!("Diff produced {} bytes", result.output.len());
        Ok(String::from_utf8_lossy(&result.output).into_owned())
    }
}
