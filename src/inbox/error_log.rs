//! Append-only error log kept next to the notes it concerns.
//!
//! One file per run, `signal-api-errors-<unix-seconds>`, created on the
//! first entry. Entries are free text separated by a blank line.

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Error log for one run.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(inbox_dir: &Path, run_started: i64) -> Self {
        Self {
            path: inbox_dir.join(format!("signal-api-errors-{run_started}")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry. Failing to log is itself only traced.
    pub async fn record(&self, entry: impl AsRef<str>) {
        let entry = entry.as_ref();
        warn!(log = %self.path.display(), "{entry}");

        if let Err(e) = self.append(entry).await {
            warn!(error = %e, log = %self.path.display(), "Could not append to error log");
        }
    }

    async fn append(&self, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{entry}\n\n").as_bytes()).await?;
        file.flush().await
    }
}
