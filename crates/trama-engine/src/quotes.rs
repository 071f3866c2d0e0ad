use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;
use trama_core::{Media, Message, MessageKind, SYNTHETIC_ID_PREFIX};

use crate::jid;
use crate::payload::{DecodedQuote, ProviderPayload};

/// Loaded messages keyed by every id form a reply reference may use.
#[derive(Debug, Default)]
pub struct MessageIndex<'a> {
    by_key: HashMap<&'a str, &'a Message>,
}

impl<'a> MessageIndex<'a> {
    pub fn build(messages: &'a [Message]) -> Self {
        let mut by_key = HashMap::with_capacity(messages.len() * 2);
        for message in messages {
            if message.is_reaction() || message.is_synthetic() {
                continue;
            }
            for key in jid::lookup_keys(&message.message_id) {
                // First record wins when two ids collapse to the same key
                by_key.entry(key).or_insert(message);
            }
        }
        Self { by_key }
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Find by the reference as given, then by its stanza id.
    pub fn find(&self, reference: &str) -> Option<&'a Message> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        self.by_key.get(reference).copied().or_else(|| {
            jid::extract_stanza_id(reference).and_then(|stanza| self.by_key.get(stanza).copied())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedQuote {
    pub message: Message,
    /// The quoted message was a status post rather than a chat message.
    pub is_ephemeral_source_reply: bool,
    /// Push name of the quoted message's sender, when the provider sent one.
    pub sender_name: Option<String>,
}

/// Resolve the message `message` replies to.
///
/// Looks in the loaded window first, then rebuilds a stand-in from the quote
/// block embedded in the payload. `None` means no quote preview; the reply
/// itself still renders.
pub fn resolve_quote(message: &Message, index: &MessageIndex<'_>) -> Option<ResolvedQuote> {
    let payload = message.raw_payload.as_ref().and_then(ProviderPayload::decode);
    resolve_quote_with(message, payload.as_ref(), index)
}

pub(crate) fn resolve_quote_with(
    message: &Message,
    payload: Option<&ProviderPayload>,
    index: &MessageIndex<'_>,
) -> Option<ResolvedQuote> {
    if message.is_reaction() {
        return None;
    }

    let reference = message
        .reply_to_message_id
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .or_else(|| payload.and_then(ProviderPayload::quoted_stanza_id))?;

    if let Some(found) = index.find(reference).filter(|found| found.id != message.id) {
        let sender_name = if found.from_me {
            None
        } else {
            found
                .raw_payload
                .as_ref()
                .and_then(ProviderPayload::decode)
                .and_then(|p| p.push_name().map(str::to_string))
        };
        return Some(ResolvedQuote {
            message: found.clone(),
            is_ephemeral_source_reply: payload.is_some_and(ProviderPayload::quotes_status),
            sender_name,
        });
    }

    let Some(decoded) = payload.and_then(ProviderPayload::decode_quote) else {
        debug!(id = %message.id, reference, "Quoted message not found");
        return None;
    };

    debug!(id = %message.id, reference, kind = ?decoded.kind, "Quoted message rebuilt from payload");
    let is_ephemeral_source_reply = decoded.from_status;
    let sender_name = decoded.sender_push_name.clone();
    Some(ResolvedQuote {
        message: synthesize(message, decoded),
        is_ephemeral_source_reply,
        sender_name,
    })
}

/// Stand-in for a quoted message that is not in the loaded window. It borrows
/// the replying message's timestamps since it is only drawn nested inside it.
fn synthesize(parent: &Message, quote: DecodedQuote) -> Message {
    let kind = quote.kind.message_kind();
    let mut stand_in = Message::new(
        format!("{}quote:{}", SYNTHETIC_ID_PREFIX, parent.id),
        parent.conversation_id.clone(),
        kind,
        parent.created_at,
    );
    stand_in.message_id = quote.stanza_id.unwrap_or_default();
    stand_in.external_timestamp = parent.external_timestamp;
    stand_in.from_me = false;
    stand_in.from_number = quote
        .sender
        .as_deref()
        .and_then(jid::normalized_number)
        .map(str::to_string);
    stand_in.participant = quote.sender;
    stand_in.body = quote.body;
    stand_in.caption = quote.caption;

    if kind != MessageKind::Text {
        stand_in.media = Some(Media {
            mimetype: quote.mimetype,
            file_name: quote.file_name,
            thumbnail: quote.thumbnail,
            ..Media::default()
        });
    }

    stand_in
}
