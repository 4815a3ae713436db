use std::path::Path;
use std::sync::Arc;

use crate::buffer::Buffer;
use crate::error::Result;

/// One generation of captured output: a buffer plus when and how it was captured
#[derive(Debug)]
pub struct Snapshot {
    buffer: Buffer,
    timestamp: Option<String>,
    commands: Arc<[String]>,
}

impl Snapshot {
    /// Create an empty snapshot with its own buffer
    pub fn new() -> Result<Self> {
        Ok(Self {
            buffer: Buffer::new()?,
            timestamp: None,
            commands: Arc::from(Vec::new()),
        })
    }

    /// Store a capture. Only the command runner calls this.
    pub fn record(
        &mut self,
        output: &[u8],
        timestamp: String,
        commands: Arc<[String]>,
    ) -> Result<()> {
        self.buffer.write(output)?;
        self.timestamp = Some(timestamp);
        self.commands = commands;
        Ok(())
    }

    /// Timestamp of the last capture, empty before the first one
    pub fn timestamp(&self) -> &str {
        self.timestamp.as_deref().unwrap_or_default()
    }

    /// Commands that produced the last capture
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Full captured content as text
    pub fn read_text(&mut self) -> Result<String> {
        self.buffer.read_text()
    }

    /// Reposition the underlying buffer to its start
    pub fn rewind(&mut self) -> Result<()> {
        self.buffer.rewind()
    }

    /// Path of the underlying buffer
    pub fn path(&self) -> &Path {
        self.buffer.path()
    }
}

/// The two rotating generations: `old` holds the previous capture, `new` the current one
#[derive(Debug)]
pub struct GenerationPair {
    pub old: Snapshot,
    pub new: Snapshot,
}

impl GenerationPair {
    /// Allocate both generations
    pub fn new() -> Result<Self> {
        Ok(Self {
            old: Snapshot::new()?,
            new: Snapshot::new()?,
        })
    }

    /// Exchange roles without copying content
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.old, &mut self.new);
    }
}
