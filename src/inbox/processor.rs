//! Batch orchestrator — one relay batch in, one run summary out.
//!
//! Flow per message:
//! 1. Admission — non-whitelisted senders are counted, their attachments
//!    deleted remotely, nothing is written.
//! 2. Empty messages are skipped (and logged in debug mode).
//! 3. Messages with attachments become one resolver task per attachment,
//!    using the text as their title. Text-only messages become a note task.
//!
//! All tasks of a batch run concurrently on the calling task and are joined
//! once. Tasks never fail; each write reports what it did and the outcomes
//! are folded into the summary after the join.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use futures::future::{self, FutureExt, LocalBoxFuture};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::InboxConfig;
use crate::error::InboxError;
use crate::inbox::admission::AdmissionFilter;
use crate::inbox::attachments::AttachmentResolver;
use crate::inbox::error_log::ErrorLog;
use crate::inbox::files::InboxDir;
use crate::inbox::naming::NamingPolicy;
use crate::inbox::notes::{NoteHeader, NoteWriter};
use crate::inbox::summary::{FileWrite, RunSummary, SummaryBuilder};
use crate::relay::{ReceivedMessage, Relay};

type WriteTask<'a> = LocalBoxFuture<'a, Option<FileWrite>>;

pub struct InboxProcessor {
    run_started: i64,
    debug: bool,
    backup_dir: Option<PathBuf>,
    admission: AdmissionFilter,
    notes: Arc<NoteWriter>,
    attachments: AttachmentResolver,
    errors: ErrorLog,
    pending_backup: Mutex<Option<JoinHandle<()>>>,
}

impl InboxProcessor {
    pub fn new(config: InboxConfig, relay: Arc<dyn Relay>) -> Self {
        Self::with_run_timestamp(config, relay, Utc::now().timestamp())
    }

    /// Processor whose error log and backup are stamped with `run_started`.
    pub fn with_run_timestamp(
        config: InboxConfig,
        relay: Arc<dyn Relay>,
        run_started: i64,
    ) -> Self {
        let inbox = InboxDir::new(&config.inbox_dir);
        let errors = ErrorLog::new(&config.inbox_dir, run_started);
        let notes = Arc::new(NoteWriter::new(
            inbox.clone(),
            NamingPolicy::from_config(&config),
            NoteHeader::new(config.metadata_script.clone()),
            errors.clone(),
        ));
        let attachments = AttachmentResolver::new(
            relay,
            inbox,
            Arc::clone(&notes),
            errors.clone(),
            config.keep_attachments,
        );

        Self {
            run_started,
            debug: config.debug,
            backup_dir: config.backup_messages.then(|| config.backup_dir.clone()),
            admission: AdmissionFilter::new(config.whitelist),
            notes,
            attachments,
            errors,
            pending_backup: Mutex::new(None),
        }
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.errors
    }

    /// Process the raw JSON returned by the relay's receive endpoint.
    ///
    /// Anything but an array is a no-op. Elements that are not relay
    /// messages count as parsed but are only logged.
    pub async fn process_value(&self, batch: serde_json::Value) -> RunSummary {
        let serde_json::Value::Array(items) = &batch else {
            debug!("Relay returned no message array, nothing to do");
            return RunSummary::default();
        };

        let parsed_count = items.len();
        if self.backup_dir.is_some() {
            self.spawn_backup(batch.clone());
        }

        let mut messages = Vec::with_capacity(parsed_count);
        for item in items {
            match serde_json::from_value::<ReceivedMessage>(item.clone()) {
                Ok(message) => messages.push(message),
                Err(e) => {
                    self.errors
                        .record(format!("Unreadable message ({e}):\n{item:#}"))
                        .await;
                }
            }
        }

        self.run(parsed_count, &messages).await
    }

    /// Process already-decoded messages.
    pub async fn process_batch(&self, messages: &[ReceivedMessage]) -> RunSummary {
        self.run(messages.len(), messages).await
    }

    /// Wait for the backup spawned by the last `process_value`, if any.
    pub async fn wait_for_backup(&self) {
        let handle = self
            .pending_backup
            .lock()
            .map(|mut pending| pending.take())
            .unwrap_or_default();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Backup task did not finish");
            }
        }
    }

    async fn run(&self, parsed_count: usize, messages: &[ReceivedMessage]) -> RunSummary {
        info!(count = parsed_count, "Processing message batch");
        let mut summary = SummaryBuilder::new(parsed_count);
        let mut tasks: Vec<WriteTask<'_>> = Vec::new();

        for message in messages {
            let attachments = message.attachments();

            if !self.admission.is_admitted(message) {
                debug!(
                    sender = message.source_identifier().unwrap_or("unknown"),
                    "Ignoring message from sender or group that is not whitelisted"
                );
                summary.ignore();
                for attachment in attachments {
                    tasks.push(
                        async move {
                            self.attachments.delete_remote(&attachment.id).await;
                            None::<FileWrite>
                        }
                        .boxed_local(),
                    );
                }
                continue;
            }

            let text = message.text();

            if attachments.is_empty() {
                match text {
                    Some(text) => tasks.push(self.notes.write_note(text).boxed_local()),
                    None if self.debug => {
                        let dump = serde_json::to_string_pretty(message).unwrap_or_default();
                        let entry = format!("Message and attachments are empty for:\n{dump}");
                        tasks.push(
                            async move {
                                self.errors.record(entry).await;
                                None::<FileWrite>
                            }
                            .boxed_local(),
                        );
                    }
                    None => {}
                }
                continue;
            }

            for (index, attachment) in attachments.iter().enumerate() {
                tasks.push(
                    self.attachments
                        .write_attachment(attachment, text, index)
                        .boxed_local(),
                );
            }
        }

        let outcomes = future::join_all(tasks).await;
        summary.extend(outcomes.into_iter().flatten());

        let summary = summary.finish();
        info!(
            parsed = summary.parsed_count,
            ignored = summary.ignored_count,
            created = summary.created_files.len(),
            appended = summary.appended_files.len(),
            "Batch processed"
        );
        summary
    }

    /// Write the raw batch to `messages-<run>` without holding up the run.
    fn spawn_backup(&self, batch: serde_json::Value) {
        let Some(dir) = self.backup_dir.clone() else {
            return;
        };
        let path = dir.join(format!("messages-{}", self.run_started));
        let errors = self.errors.clone();

        let handle = tokio::spawn(async move {
            if let Err(e) = write_backup(&dir, &path, &batch).await {
                errors
                    .record(format!("Backing up messages to {}\n{e}", path.display()))
                    .await;
            } else {
                debug!(file = %path.display(), "Backed up message batch");
            }
        });

        if let Ok(mut pending) = self.pending_backup.lock() {
            *pending = Some(handle);
        }
    }
}

async fn write_backup(
    dir: &std::path::Path,
    path: &std::path::Path,
    batch: &serde_json::Value,
) -> Result<(), InboxError> {
    tokio::fs::create_dir_all(dir).await?;
    let json = serde_json::to_string_pretty(batch)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
