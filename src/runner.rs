use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, WatchError};
use crate::process::{run_shell, ShellOutput};
use crate::snapshot::Snapshot;

/// Separator placed between the outputs of consecutive commands
pub const OUTPUT_SEPARATOR: &[u8] = b"\n";

/// Trait for command runner implementations (real shell or mock)
#[async_trait]
pub trait Runner: Send + Sync {
    /// Capture fresh output into `snapshot`
    async fn update(&self, snapshot: &mut Snapshot) -> Result<()>;
}

/// Production implementation of Runner that executes commands through the shell
pub struct ShellRunner {
    commands: Arc<[String]>,
    shell: String,
    merge_stderr: bool,
    parallel: bool,
    timestamp_format: String,
}

impl ShellRunner {
    /// Create a ShellRunner from the configuration
    pub fn new(config: &Config) -> Self {
        Self {
            commands: Arc::from(config.commands.clone()),
            shell: config.shell.clone(),
            merge_stderr: config.merge_stderr,
            parallel: config.parallel,
            timestamp_format: config.timestamp_format.clone(),
        }
    }

    async fn run_sequential(&self) -> Result<Vec<ShellOutput>> {
        let mut outputs = Vec::with_capacity(self.commands.len());
        for command in self.commands.iter() {
            outputs.push(run_shell(&self.shell, command, self.merge_stderr).await?);
        }
        Ok(outputs)
    }

    async fn run_parallel(&self) -> Result<Vec<ShellOutput>> {
        let handles: Vec<_> = self
            .commands
            .iter()
            .map(|command| {
                let shell = self.shell.clone();
                let command = command.clone();
                let merge_stderr = self.merge_stderr;
                tokio::spawn(async move { run_shell(&shell, &command, merge_stderr).await })
            })
            .collect();

        // Joined in command order, whatever order they finish in
        let mut outputs = Vec::with_capacity(handles.len());
        for handle in handles {
            let output = handle.await.map_err(|e| WatchError::Spawn {
                program: self.shell.clone(),
                source: std::io::Error::other(e),
            })??;
            outputs.push(output);
        }
        Ok(outputs)
    }
}

#[async_trait]
impl Runner for ShellRunner {
    async fn update(&self, snapshot: &mut Snapshot) -> Result<()> {
        let outputs = if self.parallel && self.commands.len() > 1 {
            self.run_parallel().await?
        } else {
            self.run_sequential().await?
        };

        for (command, result) in self.commands.iter().zip(&outputs) {
            if !result.status.success() {
                debug!("Command {:?} exited with {}", command, result.status);
            }
        }

        let captured = join_outputs(outputs.iter().map(|o| o.output.as_slice()));
        let timestamp = Local::now().format(&self.timestamp_format).to_string();

        snapshot.record(&captured, timestamp, Arc::clone(&self.commands))
    }
}

/// Concatenate per-command outputs, separated by [`OUTPUT_SEPARATOR`]
pub fn join_outputs<'a>(outputs: impl IntoIterator<Item = &'a [u8]>) -> Vec<u8> {
    let mut joined = Vec::new();
    for (i, output) in outputs.into_iter().enumerate() {
        if i > 0 {
            joined.extend_from_slice(OUTPUT_SEPARATOR);
        }
        joined.extend_from_slice(output);
    }
    joined
}
