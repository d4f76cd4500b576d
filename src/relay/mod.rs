//! Relay abstraction — the signal-cli REST API that queues messages and
//! serves attachment blobs.

pub mod http;
pub mod types;

use async_trait::async_trait;

use crate::error::RelayError;

pub use http::HttpRelay;
pub use types::{AttachmentRef, ReceivedMessage};

/// Remote relay operations used by the inbox pipeline.
///
/// Each call is attempted exactly once. Callers decide what a failure means.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Fetch the pending batch. The raw JSON is returned so it can be backed up verbatim.
    async fn receive(&self) -> Result<serde_json::Value, RelayError>;

    /// Download an attachment's bytes.
    async fn fetch_attachment(&self, id: &str) -> Result<Vec<u8>, RelayError>;

    /// Remove an attachment from the relay's storage.
    async fn delete_attachment(&self, id: &str) -> Result<(), RelayError>;
}
