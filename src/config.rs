//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Default number of body characters used when a filename is derived from the message text.
pub const DEFAULT_BODY_CUTOFF: usize = 60;

/// Default number of characters kept from a user-chosen title.
pub const DEFAULT_TITLE_CUTOFF: usize = 80;

/// Inbox pipeline configuration.
#[derive(Debug, Clone)]
pub struct InboxConfig {
    /// Directory notes and attachments are written into.
    pub inbox_dir: PathBuf,
    /// Base URL of the signal-cli REST API, e.g. `http://localhost:8080`.
    pub relay_host: String,
    /// Account number the relay receives messages for.
    pub account: String,
    /// Extension for note files, without the leading dot.
    pub note_extension: String,
    /// Verbose logging plus error-log entries for empty messages.
    pub debug: bool,
    /// Persist every received batch to `backup_dir`.
    pub backup_messages: bool,
    /// Directory for raw batch snapshots.
    pub backup_dir: PathBuf,
    /// Never delete attachments from the relay.
    pub keep_attachments: bool,
    /// Sender numbers, UUIDs or group ids allowed through. `None` or empty allows everyone.
    pub whitelist: Option<Vec<String>>,
    pub body_cutoff: usize,
    pub title_cutoff: usize,
    /// Executable producing a note header, called with the title as its only argument.
    pub metadata_script: Option<PathBuf>,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            inbox_dir: PathBuf::from("."),
            relay_host: "http://localhost:8080".to_string(),
            account: String::new(),
            note_extension: "md".to_string(),
            debug: false,
            backup_messages: false,
            backup_dir: default_backup_dir(|key| std::env::var(key).ok()),
            keep_attachments: false,
            whitelist: None,
            body_cutoff: DEFAULT_BODY_CUTOFF,
            title_cutoff: DEFAULT_TITLE_CUTOFF,
            metadata_script: None,
        }
    }
}

impl InboxConfig {
    /// Load configuration from `SIGNAL_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let inbox_dir = PathBuf::from(required("SIGNAL_INBOX_DIR")?);
        let relay_host = required("SIGNAL_API_HOST")?
            .trim_end_matches('/')
            .to_string();
        let account = required("SIGNAL_ACCOUNT")?;

        let note_extension = lookup("SIGNAL_INBOX_EXTENSION")
            .map(|s| s.trim().trim_start_matches('.').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "md".to_string());

        let whitelist: Option<Vec<String>> = lookup("SIGNAL_WHITELIST").map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        Ok(Self {
            inbox_dir,
            relay_host,
            account,
            note_extension,
            debug: parse_flag(lookup("SIGNAL_INBOX_DEBUG")),
            backup_messages: parse_flag(lookup("SIGNAL_INBOX_BACKUP")),
            backup_dir: default_backup_dir(&lookup),
            keep_attachments: parse_flag(lookup("SIGNAL_KEEP_ATTACHMENTS")),
            whitelist,
            body_cutoff: parse_cutoff(&lookup, "SIGNAL_BODY_CUTOFF", DEFAULT_BODY_CUTOFF)?,
            title_cutoff: parse_cutoff(&lookup, "SIGNAL_TITLE_CUTOFF", DEFAULT_TITLE_CUTOFF)?,
            metadata_script: lookup("SIGNAL_NOTE_METADATA_SCRIPT")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

/// `$XDG_CACHE_HOME/signal-api-backups`, falling back to `$HOME/.cache`.
fn default_backup_dir<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let cache_home = lookup("XDG_CACHE_HOME")
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let home = lookup("HOME").unwrap_or_else(|| ".".to_string());
            PathBuf::from(home).join(".cache")
        });
    cache_home.join("signal-api-backups")
}

fn parse_flag(value: Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::trim).map(str::to_ascii_lowercase).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

fn parse_cutoff<F>(lookup: &F, key: &str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        }),
    }
}
