use chrono::DateTime;
use serde::{Deserialize, Serialize};
use trama_core::{Message, MessageKind, Reaction};

use crate::error::{DbError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    pub id: i64,
    /// Digits only.
    pub phone_number: String,
    pub name: Option<String>,
    pub notify_name: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Contact {
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or(self.notify_name.as_deref())
            .filter(|n| !n.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConversationSummary {
    pub conversation_id: String,
    /// Epoch milliseconds of the newest record.
    pub last_activity: i64,
    pub message_count: i64,
}

/// Flat `messages` row; structured content is stored as JSON columns.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageRow {
    pub id: String,
    pub message_id: String,
    pub conversation_id: String,
    pub kind: String,
    pub created_at: i64,
    pub external_timestamp: Option<i64>,
    pub from_me: bool,
    pub from_number: Option<String>,
    pub participant: Option<String>,
    pub body: Option<String>,
    pub caption: Option<String>,
    pub media_json: Option<String>,
    pub location_json: Option<String>,
    pub contact_vcard: Option<String>,
    pub poll_json: Option<String>,
    pub reply_to_message_id: Option<String>,
    pub reaction_target_message_id: Option<String>,
    pub reaction_emoji: Option<String>,
    pub raw_json: Option<String>,
}

impl MessageRow {
    pub fn from_message(message: &Message) -> Result<Self> {
        let (reaction_target_message_id, reaction_emoji) = match &message.reaction {
            Some(r) => (Some(r.target_message_id.clone()), Some(r.emoji.clone())),
            None => (None, None),
        };

        Ok(Self {
            id: message.id.clone(),
            message_id: message.message_id.clone(),
            conversation_id: message.conversation_id.clone(),
            kind: message.kind.as_str().to_string(),
            created_at: message.created_at.timestamp_millis(),
            external_timestamp: message.external_timestamp,
            from_me: message.from_me,
            from_number: message.from_number.clone(),
            participant: message.participant.clone(),
            body: message.body.clone(),
            caption: message.caption.clone(),
            media_json: message.media.as_ref().map(serde_json::to_string).transpose()?,
            location_json: message.location.as_ref().map(serde_json::to_string).transpose()?,
            contact_vcard: message.contact_vcard.clone(),
            poll_json: message.poll.as_ref().map(serde_json::to_string).transpose()?,
            reply_to_message_id: message.reply_to_message_id.clone(),
            reaction_target_message_id,
            reaction_emoji,
            raw_json: message.raw_payload.as_ref().map(serde_json::to_string).transpose()?,
        })
    }

    pub fn into_message(self) -> Result<Message> {
        let kind = MessageKind::parse(&self.kind).ok_or_else(|| DbError::InvalidRow {
            id: self.id.clone(),
            reason: format!("unknown kind {}", self.kind),
        })?;
        let created_at = DateTime::from_timestamp_millis(self.created_at).ok_or_else(|| {
            DbError::InvalidRow {
                id: self.id.clone(),
                reason: format!("created_at out of range: {}", self.created_at),
            }
        })?;

        let reaction = match (self.reaction_target_message_id, self.reaction_emoji) {
            (Some(target_message_id), Some(emoji)) => Some(Reaction {
                target_message_id,
                emoji,
            }),
            _ => None,
        };

        // The provider payload is advisory; an unreadable one is dropped
        let raw_payload = self.raw_json.as_deref().and_then(|raw| {
            serde_json::from_str(raw)
                .map_err(|e| tracing::debug!(id = %self.id, error = %e, "Unreadable raw payload"))
                .ok()
        });

        Ok(Message {
            id: self.id,
            message_id: self.message_id,
            conversation_id: self.conversation_id,
            kind,
            created_at,
            external_timestamp: self.external_timestamp,
            from_me: self.from_me,
            from_number: self.from_number,
            participant: self.participant,
            body: self.body,
            caption: self.caption,
            media: self.media_json.as_deref().map(serde_json::from_str).transpose()?,
            location: self.location_json.as_deref().map(serde_json::from_str).transpose()?,
            contact_vcard: self.contact_vcard,
            poll: self.poll_json.as_deref().map(serde_json::from_str).transpose()?,
            reply_to_message_id: self.reply_to_message_id,
            reaction,
            raw_payload,
        })
    }
}
