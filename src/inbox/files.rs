//! The flat inbox directory. Files are only ever created or appended to.

use std::path::PathBuf;

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::InboxError;

#[derive(Debug, Clone)]
pub struct InboxDir {
    root: PathBuf,
}

impl InboxDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Whether `filename` is an existing regular file.
    pub async fn contains(&self, filename: &str) -> bool {
        fs::metadata(self.resolve(filename))
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    /// Append `data`, creating the file if needed. Never truncates.
    pub async fn append(&self, filename: &str, data: &[u8]) -> Result<(), InboxError> {
        let path = self.resolve(filename);
        debug!(file = %path.display(), bytes = data.len(), "Writing to inbox");

        let write = async {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await?;
            file.write_all(data).await?;
            file.flush().await
        };
        write
            .await
            .map_err(|source| InboxError::Write { path: path.clone(), source })
    }
}
