use serde::{Deserialize, Serialize};
use trama_core::Message;

use crate::jid;
use crate::payload::ProviderPayload;

/// Sender colors for group and channel threads.
pub const PALETTE: [&str; 12] = [
    "#e57373", "#f06292", "#ba68c8", "#9575cd", "#7986cb", "#64b5f6", "#4db6ac", "#81c784",
    "#dce775", "#ffb74d", "#ff8a65", "#a1887f",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadKind {
    #[default]
    Direct,
    Group,
    Channel,
}

impl ThreadKind {
    /// Guess the thread kind from the conversation's chat handle.
    pub fn from_chat_handle(handle: &str) -> Self {
        let handle = handle.trim();
        if handle.ends_with("@g.us") {
            ThreadKind::Group
        } else if handle.ends_with("@newsletter") {
            ThreadKind::Channel
        } else {
            ThreadKind::Direct
        }
    }

    pub fn has_participants(self) -> bool {
        matches!(self, ThreadKind::Group | ThreadKind::Channel)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantLabel {
    /// Sender handle as reported, before normalization.
    pub handle: String,
    pub name: String,
    pub color: &'static str,
}

/// Label for the sender of a received message in a group or channel thread.
pub fn resolve_participant(message: &Message, thread: ThreadKind) -> Option<ParticipantLabel> {
    let payload = message.raw_payload.as_ref().and_then(ProviderPayload::decode);
    resolve_participant_with(message, payload.as_ref(), thread)
}

pub(crate) fn resolve_participant_with(
    message: &Message,
    payload: Option<&ProviderPayload>,
    thread: ThreadKind,
) -> Option<ParticipantLabel> {
    if !thread.has_participants() || message.from_me || message.is_synthetic() {
        return None;
    }

    let handle = message
        .participant
        .as_deref()
        .or(message.from_number.as_deref())
        .map(str::trim)
        .filter(|h| !h.is_empty())?;

    let name = payload
        .and_then(ProviderPayload::push_name)
        .map(str::to_string)
        .or_else(|| jid::normalized_number(handle).map(|number| format!("+{}", number)))
        .unwrap_or_else(|| handle.to_string());

    Some(ParticipantLabel {
        handle: handle.to_string(),
        name,
        color: participant_color(handle),
    })
}

/// Same handle, same color: the sum of the handle's UTF-16 code units picks a
/// palette slot.
pub fn participant_color(handle: &str) -> &'static str {
    let sum: u64 = handle.encode_utf16().map(u64::from).sum();
    PALETTE[(sum % PALETTE.len() as u64) as usize]
}
