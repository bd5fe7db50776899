//! services/api/src/adapters/journey_fs.rs
//!
//! Stores generated learning journey pages as files in one directory.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use learning_session_core::ports::{JourneyPageStore, PortError, PortResult};

#[derive(Clone)]
pub struct FsJourneyStore {
    dir: PathBuf,
}

impl FsJourneyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl JourneyPageStore for FsJourneyStore {
    async fn save_page(&self, filename: &str, html: &str) -> PortResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        tokio::fs::write(self.dir.join(filename), html)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn load_page(&self, filename: &str) -> PortResult<String> {
        tokio::fs::read_to_string(self.dir.join(filename))
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => PortError::NotFound(filename.to_string()),
                _ => PortError::Unexpected(e.to_string()),
            })
    }
}
