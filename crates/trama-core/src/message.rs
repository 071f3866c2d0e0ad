use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix carried by the local id of every stand-in record built for a quote
/// preview. Such records never come from the store.
pub const SYNTHETIC_ID_PREFIX: &str = "synthetic:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
    Document,
    Location,
    Contact,
    Poll,
    Sticker,
    Reaction,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Video => "video",
            MessageKind::Audio => "audio",
            MessageKind::Document => "document",
            MessageKind::Location => "location",
            MessageKind::Contact => "contact",
            MessageKind::Poll => "poll",
            MessageKind::Sticker => "sticker",
            MessageKind::Reaction => "reaction",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let kind = match value {
            "text" => MessageKind::Text,
            "image" => MessageKind::Image,
            "video" => MessageKind::Video,
            "audio" => MessageKind::Audio,
            "document" => MessageKind::Document,
            "location" => MessageKind::Location,
            "contact" => MessageKind::Contact,
            "poll" => MessageKind::Poll,
            "sticker" => MessageKind::Sticker,
            "reaction" => MessageKind::Reaction,
            _ => return None,
        };
        Some(kind)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub url: Option<String>,
    pub mimetype: Option<String>,
    pub size: Option<u64>,
    /// Seconds, audio and video only.
    pub duration: Option<u32>,
    pub file_name: Option<String>,
    /// Base64 low-resolution preview.
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub target_message_id: String,
    pub emoji: String,
}

/// One record of a conversation as delivered by the data-access layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    /// Provider composite id. Empty for synthetic records.
    #[serde(default)]
    pub message_id: String,
    pub conversation_id: String,
    pub kind: MessageKind,
    pub created_at: DateTime<Utc>,
    /// Provider epoch seconds.
    #[serde(default)]
    pub external_timestamp: Option<i64>,
    #[serde(default)]
    pub from_me: bool,
    #[serde(default)]
    pub from_number: Option<String>,
    #[serde(default)]
    pub participant: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub media: Option<Media>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub contact_vcard: Option<String>,
    #[serde(default)]
    pub poll: Option<Poll>,
    #[serde(default)]
    pub reply_to_message_id: Option<String>,
    /// Present only when `kind` is `Reaction`.
    #[serde(default)]
    pub reaction: Option<Reaction>,
    #[serde(default)]
    pub raw_payload: Option<serde_json::Value>,
}

impl Message {
    /// A bare record with every optional field cleared.
    pub fn new(
        id: impl Into<String>,
        conversation_id: impl Into<String>,
        kind: MessageKind,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            message_id: String::new(),
            conversation_id: conversation_id.into(),
            kind,
            created_at,
            external_timestamp: None,
            from_me: false,
            from_number: None,
            participant: None,
            body: None,
            caption: None,
            media: None,
            location: None,
            contact_vcard: None,
            poll: None,
            reply_to_message_id: None,
            reaction: None,
            raw_payload: None,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.id.starts_with(SYNTHETIC_ID_PREFIX)
    }

    pub fn is_reaction(&self) -> bool {
        self.kind == MessageKind::Reaction
    }

    /// True when the text body is missing or blank.
    pub fn has_empty_body(&self) -> bool {
        self.body.as_deref().is_none_or(|b| b.trim().is_empty())
    }

    /// Ordering key in epoch milliseconds: the provider timestamp when known,
    /// the local record time otherwise.
    pub fn sort_key_millis(&self) -> i64 {
        match self.external_timestamp {
            Some(secs) => secs.saturating_mul(1000),
            None => self.created_at.timestamp_millis(),
        }
    }
}
