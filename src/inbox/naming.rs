//! Filename derivation from message content.
//!
//! Rules, in precedence order:
//! 1. `/` never survives into a filename.
//! 2. A first line containing `:` names the note, unless the message is a
//!    bare `http…` link.
//! 3. Otherwise the one-line body names the note, cut at `body_cutoff`
//!    characters and marked with `…` when cut.
//!
//! Attachments keep their own extension when they have one. A sibling text
//! message replaces the stem.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::InboxConfig;
use crate::relay::AttachmentRef;

/// Appended to a body-derived filename that had to be cut.
pub const ELLIPSIS: &str = "…";

/// Extension used when neither the filename nor the content type gives one.
pub const FALLBACK_EXTENSION: &str = ".bin";

/// signal-cli hands over-length texts to us as `long-message-<stamp>.txt` attachments.
static LONG_MESSAGE_ARTIFACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^long-message-.*\.txt").expect("valid regex"));

/// Content types we know an extension for.
const CONTENT_TYPE_EXTENSIONS: &[(&str, &str)] = &[
    // signal-cli labels voice notes audio/mpeg, but the payload is AAC.
    ("audio/mpeg", ".aac"),
    ("audio/aac", ".aac"),
    ("audio/ogg", ".ogg"),
    ("audio/mp4", ".m4a"),
    ("application/octet-stream", ".bin"),
    ("application/pdf", ".pdf"),
    ("image/jpeg", ".jpg"),
    ("image/png", ".png"),
    ("image/gif", ".gif"),
    ("image/webp", ".webp"),
    ("image/heic", ".heic"),
    ("video/mp4", ".mp4"),
    ("video/quicktime", ".mov"),
    ("text/plain", ".txt"),
    ("text/x-signal-plain", ".txt"),
];

/// A derived attachment filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentName {
    pub filename: String,
    /// The content type had to be guessed as [`FALLBACK_EXTENSION`].
    pub unknown_content_type: bool,
}

/// Naming rules bound to the configured extension and cutoffs.
#[derive(Debug, Clone)]
pub struct NamingPolicy {
    extension: String,
    body_cutoff: usize,
    title_cutoff: usize,
}

impl NamingPolicy {
    pub fn new(extension: impl Into<String>, body_cutoff: usize, title_cutoff: usize) -> Self {
        Self {
            extension: extension.into(),
            body_cutoff,
            title_cutoff,
        }
    }

    pub fn from_config(config: &InboxConfig) -> Self {
        Self::new(
            config.note_extension.clone(),
            config.body_cutoff,
            config.title_cutoff,
        )
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Title the sender chose by writing `Title: body`, or an empty string.
    ///
    /// Only the first line is considered, so a colon further down never
    /// makes a title.
    pub fn extract_user_title(&self, text: &str) -> String {
        let first_line = text.split('\n').next().unwrap_or_default();
        if text.starts_with("http") {
            return String::new();
        }
        match first_line.find(':') {
            Some(end) => truncate_chars(&first_line[..end], self.title_cutoff).to_string(),
            None => String::new(),
        }
    }

    /// Note filename for a message.
    pub fn derive_filename(&self, text: &str) -> String {
        let text = text.replace('/', "");

        let title = self.extract_user_title(&text);
        if !title.is_empty() {
            return format!("{title}.{}", self.extension);
        }

        let oneline = collapse_newlines(&text);
        let oneline = oneline.trim();
        if oneline.chars().count() <= self.body_cutoff {
            format!("{oneline}.{}", self.extension)
        } else {
            format!(
                "{}{ELLIPSIS}.{}",
                truncate_chars(oneline, self.body_cutoff),
                self.extension
            )
        }
    }

    /// Filename for the `index`-th attachment of a message.
    ///
    /// `title` is the text sent alongside the attachment. The first
    /// attachment under a title is unsuffixed, later ones get `-<index>`.
    pub fn attachment_filename(
        &self,
        attachment: &AttachmentRef,
        title: Option<&str>,
        index: usize,
    ) -> AttachmentName {
        let base = attachment
            .filename
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(attachment.id.as_str())
            .replace('/', "");

        let mut unknown_content_type = false;
        let (mut filename, mut extension) = match split_extension(&base) {
            Some(ext) => (base.clone(), ext.to_string()),
            None => {
                let ext = extension_for_content_type(&attachment.content_type)
                    .unwrap_or_else(|| {
                        unknown_content_type = true;
                        FALLBACK_EXTENSION
                    });
                (
                    format!("{}{ext}", truncate_chars(&base, self.body_cutoff)),
                    ext.to_string(),
                )
            }
        };

        let title = title
            .map(|t| collapse_newlines(&t.replace('/', "")))
            .map(|t| truncate_chars(t.trim(), self.body_cutoff).trim_end().to_string())
            .filter(|t| !t.is_empty());

        if let Some(title) = title {
            if index > 0 {
                extension = format!("-{index}{extension}");
            }
            filename = format!("{title}{extension}");
        }

        AttachmentName {
            filename,
            unknown_content_type,
        }
    }
}

/// Everything from the first `.` of a filename, so `a.tar.gz` yields `.tar.gz`.
pub fn split_extension(name: &str) -> Option<&str> {
    name.find('.').map(|i| &name[i..])
}

/// Extension (with leading dot) for a MIME type, ignoring parameters and case.
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    CONTENT_TYPE_EXTENSIONS
        .iter()
        .find(|(ct, _)| *ct == essence)
        .map(|(_, ext)| *ext)
}

/// Whether a device filename is a relay-split over-length text message.
pub fn is_long_message_artifact(name: &str) -> bool {
    LONG_MESSAGE_ARTIFACT.is_match(name)
}

fn collapse_newlines(text: &str) -> String {
    text.replace('\n', " ")
}

/// First `max` characters of `s`, never splitting a character.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    s.char_indices().nth(max).map_or(s, |(i, _)| &s[..i])
}
