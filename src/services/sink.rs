//! Download sinks: where exported files end up.

use std::path::{Path, PathBuf};

use super::DownloadSink;

/// Writes payloads as files into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Create the sink, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn save(&mut self, name: &str, mime: &str, bytes: &[u8]) -> std::io::Result<()> {
        // Only the final component, so payload names cannot escape the directory
        let file_name = Path::new(name).file_name().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid payload name {:?}", name),
            )
        })?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, bytes)?;
        log::info!("Saved {} ({}, {} bytes) to {:?}", name, mime, bytes.len(), path);
        Ok(())
    }
}

/// A payload captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPayload {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Keeps payloads in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    saved: Vec<SavedPayload>,
}

impl MemorySink {
    pub fn saved(&self) -> &[SavedPayload] {
        &self.saved
    }

    /// Look up a payload by name.
    pub fn get(&self, name: &str) -> Option<&SavedPayload> {
        self.saved.iter().find(|p| p.name == name)
    }
}

impl DownloadSink for MemorySink {
    fn save(&mut self, name: &str, mime: &str, bytes: &[u8]) -> std::io::Result<()> {
        self.saved.push(SavedPayload {
            name: name.to_string(),
            mime: mime.to_string(),
            bytes: bytes.to_vec(),
        });
        Ok(())
    }
}
