//! Ephemeral storage for one generation of captured output.
//!
//! Each buffer is a named temporary file so that external processes (the diff
//! backend) can open it by path. The file is removed when the buffer is
//! dropped.

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Result, WatchError};

/// File-backed buffer holding the most recently written content
#[derive(Debug)]
pub struct Buffer {
    file: NamedTempFile,
}

impl Buffer {
    /// Create an empty buffer backed by a new temporary file
    pub fn new() -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("deltawatch-")
            .tempfile()
            .map_err(WatchError::Buffer)?;
        Ok(Self { file })
    }

    /// Replace the content and leave the buffer positioned at its start
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let file = self.file.as_file_mut();
        file.set_len(0).map_err(WatchError::Buffer)?;
        file.seek(SeekFrom::Start(0)).map_err(WatchError::Buffer)?;
        file.write_all(bytes).map_err(WatchError::Buffer)?;
        file.flush().map_err(WatchError::Buffer)?;
        self.rewind()
    }

    /// Read the full content and leave the buffer positioned at its start
    pub fn read(&mut self) -> Result<Vec<u8>> {
        self.rewind()?;
        let mut content = Vec::new();
        self.file
            .as_file_mut()
            .read_to_end(&mut content)
            .map_err(WatchError::Buffer)?;
        self.rewind()?;
        Ok(content)
    }

    /// Read the content as text, replacing invalid UTF-8
    pub fn read_text(&mut self) -> Result<String> {
        let bytes = self.read()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Reposition to the start of the content
    pub fn rewind(&mut self) -> Result<()> {
        self.file
            .as_file_mut()
            .seek(SeekFrom::Start(0))
            .map_err(WatchError::Buffer)?;
        Ok(())
    }

    /// Path an external process can use to read the content
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
