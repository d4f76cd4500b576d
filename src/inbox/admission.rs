//! Sender/group admission.

use crate::relay::ReceivedMessage;

/// Whitelist of sender numbers, sender UUIDs and group ids.
///
/// An empty whitelist admits everyone. Matching is exact.
#[derive(Debug, Clone, Default)]
pub struct AdmissionFilter {
    whitelist: Vec<String>,
}

impl AdmissionFilter {
    pub fn new(whitelist: Option<Vec<String>>) -> Self {
        Self {
            whitelist: whitelist.unwrap_or_default(),
        }
    }

    pub fn is_admitted(&self, message: &ReceivedMessage) -> bool {
        self.admits(message.source_identifier())
    }

    /// Whether a message from `identifier` passes. Unidentified senders only
    /// pass an empty whitelist.
    pub fn admits(&self, identifier: Option<&str>) -> bool {
        if self.whitelist.is_empty() {
            return true;
        }
        identifier.is_some_and(|id| self.whitelist.iter().any(|w| w == id))
    }
}
