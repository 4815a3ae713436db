use thiserror::Error;

/// Errors that can occur while watching commands
#[derive(Error, Debug)]
pub enum WatchError {
    /// No command was given on the command line or in the config file
    #[error("no command to watch: pass one or more commands or use -e")]
    NoCommands,

    /// Error reading, parsing or validating configuration
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Failed to create, write or read a snapshot buffer
    #[error("snapshot buffer error: {0}")]
    Buffer(#[source] std::io::Error),

    /// Terminal capabilities could not be determined
    #[error("terminal error: {0}")]
    Terminal(String),

    /// Failed to spawn the shell or the diff backend
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write rendered output
    #[error("output error: {0}")]
    Output(#[source] std::io::Error),

    /// Shutdown was requested (e.g., via Ctrl+C)
    #[error("shutdown requested")]
    ShutdownRequested,
}

impl WatchError {
    /// Whether this error should be reported as a usage problem
    pub fn is_usage(&self) -> bool {
        matches!(self, WatchError::NoCommands | WatchError::ConfigError(_))
    }
}

/// Result type alias for deltawatch operations
pub type Result<T> = std::result::Result<T, WatchError>;
