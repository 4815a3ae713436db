use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, WatchError};

/// Captured result of one shell invocation
#[derive(Debug)]
pub struct ShellOutput {
    /// Captured stdout, with stderr folded in when merged
    pub output: Vec<u8>,
    /// Exit status of the shell
    pub status: ExitStatus,
}

/// Run `script` through `<shell> -c` and wait for it to finish
///
/// With `merge_stderr` the script's stderr is redirected into stdout inside
/// the shell, so both streams keep their relative order. Otherwise stderr is
/// discarded.
pub async fn run_shell(shell: &str, script: &str, merge_stderr: bool) -> Result<ShellOutput> {
    let script = if merge_stderr {
        format!("{{ {}\n}} 2>&1", script)
    } else {
        script.to_string()
    };

    debug!("Running: {} -c {:?}", shell, script);

    let output = Command::new(shell)
        .arg("-c")
        .arg(&script)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(if merge_stderr {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| WatchError::Spawn {
            program: shell.to_string(),
            source,
        })?;

    let mut captured = output.stdout;
    // The shell itself may complain before the redirection takes effect
    if merge_stderr {
        captured.extend_from_slice(&output.stderr);
    }

    Ok(ShellOutput {
        output: captured,
        status: output.status,
    })
}

/// Quote a word for safe use in a POSIX shell command line
pub fn shell_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}
