//! Note writer — turns message text into an inbox note.
//!
//! A new note gets the whole message. Writing to an existing note appends
//! only the body, so a `Title: body` message does not repeat its title.
//! Org notes additionally get a header the first time they are created.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use chrono::Utc;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::InboxError;
use crate::inbox::error_log::ErrorLog;
use crate::inbox::files::InboxDir;
use crate::inbox::naming::NamingPolicy;
use crate::inbox::summary::FileWrite;

/// Note extension that gets an org header and link formatting.
const ORG_EXTENSION: &str = "org";

/// Produces the header of a freshly created org note.
#[derive(Debug, Clone, Default)]
pub struct NoteHeader {
    script: Option<PathBuf>,
}

impl NoteHeader {
    pub fn new(script: Option<PathBuf>) -> Self {
        Self { script }
    }

    /// Header for `title`: the metadata script's output, else the built-in one.
    pub async fn render(&self, title: &str) -> String {
        if let Some(script) = &self.script {
            match run_metadata_script(script, title).await {
                Ok(header) => return header,
                Err(e) => warn!(error = %e, "Falling back to built-in note header"),
            }
        }
        fallback_header(title)
    }
}

/// `#+title:` and `#+date:` lines followed by a blank line.
pub fn fallback_header(title: &str) -> String {
    format!(
        "#+title: {title}\n#+date: [{}]\n\n",
        Utc::now().format("%Y-%m-%d")
    )
}

async fn run_metadata_script(script: &Path, title: &str) -> Result<String, InboxError> {
    let failed = |reason: String| InboxError::MetadataScript {
        script: script.to_path_buf(),
        reason,
    };

    let output = Command::new(script)
        .arg(title)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| failed(format!("spawn failed: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(failed(format!("{}: {}", output.status, stderr.trim())));
    }

    let header = String::from_utf8_lossy(&output.stdout);
    let header = header.trim_end();
    if header.is_empty() {
        return Err(failed("empty output".to_string()));
    }
    Ok(format!("{header}\n\n"))
}

/// Writes message text into the inbox.
#[derive(Debug, Clone)]
pub struct NoteWriter {
    inbox: InboxDir,
    naming: NamingPolicy,
    header: NoteHeader,
    errors: ErrorLog,
}

impl NoteWriter {
    pub fn new(
        inbox: InboxDir,
        naming: NamingPolicy,
        header: NoteHeader,
        errors: ErrorLog,
    ) -> Self {
        Self {
            inbox,
            naming,
            header,
            errors,
        }
    }

    pub fn naming(&self) -> &NamingPolicy {
        &self.naming
    }

    /// Create or append the note for `text`.
    ///
    /// Returns `None` when the write failed; the failure is in the error log.
    pub async fn write_note(&self, text: &str) -> Option<FileWrite> {
        let filename = self.naming.derive_filename(text);
        let exists = self.inbox.contains(&filename).await;
        let title = self.naming.extract_user_title(text);

        let body = if exists {
            if title.is_empty() {
                text.to_string()
            } else {
                after_title(text).to_string()
            }
        } else if self.naming.extension().eq_ignore_ascii_case(ORG_EXTENSION) {
            self.format_org(text, &title).await
        } else {
            text.to_string()
        };

        match self.inbox.append(&filename, format!("{body}\n").as_bytes()).await {
            Ok(()) => {
                let write = if exists {
                    FileWrite::Appended(filename)
                } else {
                    FileWrite::Created(filename)
                };
                debug!(file = write.filename(), appended = exists, "Note written");
                Some(write)
            }
            Err(e) => {
                self.errors
                    .record(format!("Writing file: {filename}\nWith message: {body}\n{e}"))
                    .await;
                None
            }
        }
    }

    /// Body of a new org note. Links become `[[link]]`, everything else gets a header.
    async fn format_org(&self, text: &str, title: &str) -> String {
        let body = if title.is_empty() {
            text
        } else {
            after_title(text).trim()
        };

        if text.starts_with("http") {
            return format!("[[{body}]]");
        }

        let head = self.header.render(title).await;
        format!("{head}{body}")
    }
}

/// Everything after the first `:`.
fn after_title(text: &str) -> &str {
    text.find(':').map_or(text, |i| &text[i + 1..])
}
