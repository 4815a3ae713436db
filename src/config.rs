use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, WatchError};

/// Diff backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Full diff command; overrides the assembled default backend
    #[serde(default)]
    pub command: Option<String>,
    /// Prefix added lines with `+` and removed lines with `-`
    #[serde(default = "default_true")]
    pub markers: bool,
    /// Show the prior version of changed lines
    #[serde(default = "default_true")]
    pub show_old: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            command: None,
            markers: true,
            show_old: true,
        }
    }
}

/// Main configuration for deltawatch, built once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Commands to run each iteration, in output order
    #[serde(default)]
    pub commands: Vec<String>,
    /// Move the cursor home every N full renders in redraw mode (0 = never)
    #[serde(default = "default_refresh")]
    pub refresh: u32,
    /// Seconds to sleep between iterations
    #[serde(default = "default_interval")]
    pub interval: f64,
    /// Number of iterations to run (0 = run indefinitely)
    #[serde(default = "default_repeat")]
    pub repeat: u32,
    /// Print only a timestamp when nothing changed
    #[serde(default)]
    pub silent: bool,
    /// Print a timestamp header above each render
    #[serde(default = "default_true")]
    pub show_date: bool,
    /// Append a newline after each render
    #[serde(default = "default_true")]
    pub trailing_newline: bool,
    /// Redraw the screen in place instead of scrolling
    #[serde(default)]
    pub redraw: bool,
    /// Erase leftovers of a longer previous render (redraw mode only)
    #[serde(default = "default_true")]
    pub clear_after: bool,
    /// chrono format string for capture timestamps
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
    /// Shell used to run commands and the diff backend
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Capture stderr together with stdout
    #[serde(default = "default_true")]
    pub merge_stderr: bool,
    /// Run commands concurrently (output order is unchanged)
    #[serde(default)]
    pub parallel: bool,
    /// Diff backend configuration
    #[serde(default)]
    pub diff: DiffConfig,
}

fn default_refresh() -> u32 {
    1
}

fn default_interval() -> f64 {
    2.0
}

fn default_repeat() -> u32 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_timestamp_format() -> String {
    "%a %b %e %H:%M:%S %Y".to_string()
}

fn default_shell() -> String {
    "sh".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            refresh: default_refresh(),
            interval: default_interval(),
            repeat: default_repeat(),
            silent: false,
            show_date: true,
            trailing_newline: true,
            redraw: false,
            clear_after: true,
            timestamp_format: default_timestamp_format(),
            shell: default_shell(),
            merge_stderr: true,
            parallel: false,
            diff: DiffConfig::default(),
        }
    }
}

/// Values taken from the command line; `None` keeps the config value
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub commands: Vec<String>,
    pub refresh: Option<u32>,
    pub interval: Option<f64>,
    pub repeat: Option<u32>,
    pub silent: Option<bool>,
    pub show_date: Option<bool>,
    pub trailing_newline: Option<bool>,
    pub redraw: Option<bool>,
    pub clear_after: Option<bool>,
    pub diff_command: Option<String>,
    pub markers: Option<bool>,
    pub show_old: Option<bool>,
    pub merge_stderr: Option<bool>,
    pub shell: Option<String>,
    pub parallel: Option<bool>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| WatchError::ConfigError(e.to_string()))?;
        toml::from_str(&content).map_err(|e| WatchError::ConfigError(e.to_string()))
    }

    /// Default config file location, `<config_dir>/deltawatch/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("deltawatch").join("config.toml"))
    }

    /// Merge CLI arguments into this configuration
    /// CLI arguments take precedence over config file values
    pub fn merge_cli_args(&mut self, cli: CliOverrides) {
        if !cli.commands.is_empty() {
            self.commands = cli.commands;
        }
        if let Some(r) = cli.refresh {
            self.refresh = r;
        }
        if let Some(i) = cli.interval {
            self.interval = i;
        }
        if let Some(n) = cli.repeat {
            self.repeat = n;
        }
        if let Some(s) = cli.silent {
            self.silent = s;
        }
        if let Some(d) = cli.show_date {
            self.show_date = d;
        }
        if let Some(n) = cli.trailing_newline {
            self.trailing_newline = n;
        }
        if let Some(r) = cli.redraw {
            self.redraw = r;
        }
        if let Some(c) = cli.clear_after {
            self.clear_after = c;
        }
        if cli.diff_command.is_some() {
            self.diff.command = cli.diff_command;
        }
        if let Some(m) = cli.markers {
            self.diff.markers = m;
        }
        if let Some(o) = cli.show_old {
            self.diff.show_old = o;
        }
        if let Some(m) = cli.merge_stderr {
            self.merge_stderr = m;
        }
        if let Some(s) = cli.shell {
            self.shell = s;
        }
        if let Some(p) = cli.parallel {
            self.parallel = p;
        }
    }

    /// Reject configurations the loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.commands.is_empty() {
            return Err(WatchError::NoCommands);
        }
        if Duration::try_from_secs_f64(self.interval).is_err() {
            return Err(WatchError::ConfigError(format!(
                "interval must be a non-negative number of seconds, got {}",
                self.interval
            )));
        }
        if self.shell.trim().is_empty() {
            return Err(WatchError::ConfigError("shell must not be empty".to_string()));
        }
        if StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(WatchError::ConfigError(format!(
                "invalid timestamp format: {:?}",
                self.timestamp_format
            )));
        }
        Ok(())
    }

    /// Number of iterations to run, `None` meaning forever
    pub fn repeat_limit(&self) -> Option<u32> {
        match self.repeat {
            0 => None,
            n => Some(n),
        }
    }

    /// Delay between iterations
    pub fn interval_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval).unwrap_or(Duration::ZERO)
    }

    /// The diff command placed before the two buffer paths
    pub fn diff_invocation(&self) -> String {
        if let Some(ref command) = self.diff.command {
            return command.clone();
        }

        let new_format = if self.diff.markers { "'+%L'" } else { "'%L'" };
        // Hidden old lines still leave a line behind, so a removal never diffs as empty
        let old_format = match (self.diff.show_old, self.diff.markers) {
            (true, true) => "'-%L'",
            (true, false) => "'%L'",
            (false, true) => "'-\n'",
            (false, false) => "'\n'",
        };

        format!(
            "diff --unchanged-line-format= --old-line-format={} --new-line-format={}",
            old_format, new_format
        )
    }
}
