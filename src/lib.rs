//! deltawatch: run shell commands at a fixed cadence and show only what
//! changed since the previous run.
//!
//! Each iteration captures the commands' output into one of two rotating
//! snapshot buffers, hands both buffers to an external diff command, and
//! renders the result.

pub mod buffer;
pub mod config;
pub mod differ;
pub mod error;
pub mod loop_controller;
pub mod process;
pub mod render;
pub mod runner;
pub mod snapshot;
pub mod state;

pub use config::Config;
pub use differ::{Differ, ExternalDiff};
pub use error::{Result, WatchError};
pub use loop_controller::{LoopController, LoopResult};
pub use runner::{Runner, ShellRunner};
