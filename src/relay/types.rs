//! Wire types for the signal-cli REST API `receive` endpoint.
//!
//! Only the fields the inbox needs are modelled. Everything else the relay
//! sends (timestamps, receipts, typing indicators) is ignored on decode.

use serde::{Deserialize, Serialize};

/// One element of the `GET /v1/receive/<account>` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivedMessage {
    pub envelope: Envelope,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default)]
    pub source_number: Option<String>,
    #[serde(default)]
    pub source_uuid: Option<String>,
    #[serde(default)]
    pub data_message: Option<DataMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMessage {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub group_info: Option<GroupInfo>,
    #[serde(default)]
    pub attachments: Option<Vec<AttachmentRef>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub group_id: String,
}

/// An attachment as announced by the relay. The bytes are fetched separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    /// Relay-assigned opaque id.
    pub id: String,
    #[serde(default)]
    pub content_type: String,
    /// Filename on the sending device, if it had one.
    #[serde(default)]
    pub filename: Option<String>,
}

impl ReceivedMessage {
    /// Group id, else sender number, else sender UUID.
    pub fn source_identifier(&self) -> Option<&str> {
        let env = &self.envelope;
        let present = |id: &&str| !id.is_empty();
        env.data_message
            .as_ref()
            .and_then(|d| d.group_info.as_ref())
            .map(|g| g.group_id.as_str())
            .filter(present)
            .or(env.source_number.as_deref().filter(present))
            .or(env.source_uuid.as_deref().filter(present))
    }

    /// Message text, if any non-empty text was sent.
    pub fn text(&self) -> Option<&str> {
        self.envelope
            .data_message
            .as_ref()
            .and_then(|d| d.message.as_deref())
            .filter(|m| !m.is_empty())
    }

    pub fn attachments(&self) -> &[AttachmentRef] {
        self.envelope
            .data_message
            .as_ref()
            .and_then(|d| d.attachments.as_deref())
            .unwrap_or(&[])
    }
}
