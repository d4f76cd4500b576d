//! Attachment resolver — fetch from the relay, persist, delete remotely.

use std::sync::Arc;

use tracing::debug;

use crate::inbox::error_log::ErrorLog;
use crate::inbox::files::InboxDir;
use crate::inbox::naming::{FALLBACK_EXTENSION, NamingPolicy, is_long_message_artifact};
use crate::inbox::notes::NoteWriter;
use crate::inbox::summary::FileWrite;
use crate::relay::{AttachmentRef, Relay};

pub struct AttachmentResolver {
    relay: Arc<dyn Relay>,
    inbox: InboxDir,
    naming: NamingPolicy,
    notes: Arc<NoteWriter>,
    errors: ErrorLog,
    keep_attachments: bool,
}

impl AttachmentResolver {
    pub fn new(
        relay: Arc<dyn Relay>,
        inbox: InboxDir,
        notes: Arc<NoteWriter>,
        errors: ErrorLog,
        keep_attachments: bool,
    ) -> Self {
        Self {
            relay,
            inbox,
            naming: notes.naming().clone(),
            notes,
            errors,
            keep_attachments,
        }
    }

    /// Materialize one attachment.
    ///
    /// `title` is the text sent with the attachment and `index` its position
    /// in the message. Over-length text artifacts are written as notes.
    /// The remote copy is deleted only after the local write succeeded.
    pub async fn write_attachment(
        &self,
        attachment: &AttachmentRef,
        title: Option<&str>,
        index: usize,
    ) -> Option<FileWrite> {
        let name = self.naming.attachment_filename(attachment, title, index);
        if name.unknown_content_type {
            self.errors
                .record(format!(
                    "No file extension for content type {:?} of attachment {}, \
                     using {FALLBACK_EXTENSION}",
                    attachment.content_type, attachment.id
                ))
                .await;
        }

        let data = match self.relay.fetch_attachment(&attachment.id).await {
            Ok(data) => data,
            Err(e) => {
                self.errors
                    .record(format!("fetching /v1/attachments/{}\n{e}", attachment.id))
                    .await;
                return None;
            }
        };

        let long_message = attachment
            .filename
            .as_deref()
            .is_some_and(is_long_message_artifact);

        let written = if long_message {
            debug!(attachment = %attachment.id, "Attachment is a long message, writing as note");
            self.notes.write_note(&String::from_utf8_lossy(&data)).await
        } else {
            self.save(&name.filename, &data).await
        };

        if written.is_some() {
            self.delete_remote(&attachment.id).await;
        }
        written
    }

    /// Best-effort removal from the relay, skipped when attachments are kept.
    pub async fn delete_remote(&self, id: &str) {
        if self.keep_attachments {
            debug!(attachment = %id, "Keeping remote attachment");
            return;
        }

        debug!(attachment = %id, "Deleting remote attachment");
        if let Err(e) = self.relay.delete_attachment(id).await {
            self.errors
                .record(format!("deleting /v1/attachments/{id}\n{e}"))
                .await;
        }
    }

    async fn save(&self, filename: &str, data: &[u8]) -> Option<FileWrite> {
        let exists = self.inbox.contains(filename).await;
        match self.inbox.append(filename, data).await {
            Ok(()) => {
                let write = if exists {
                    FileWrite::Appended(filename.to_string())
                } else {
                    FileWrite::Created(filename.to_string())
                };
                debug!(file = write.filename(), bytes = data.len(), "Attachment saved");
                Some(write)
            }
            Err(e) => {
                self.errors
                    .record(format!(
                        "Writing file: {filename}\nWith {} bytes of attachment data\n{e}",
                        data.len()
                    ))
                    .await;
                None
            }
        }
    }
}
