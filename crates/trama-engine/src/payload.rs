//! Typed view over the provider's raw message payload.
//!
//! Every decoder here is lenient: a missing or malformed field yields `None`
//! and never an error, and one malformed wrapper does not hide the others.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use trama_core::MessageKind;

use crate::jid;

/// Envelopes that carry the real content one level down under `message`.
const ENVELOPES: [&str; 4] = [
    "ephemeralMessage",
    "viewOnceMessage",
    "viewOnceMessageV2",
    "documentWithCaptionMessage",
];
const MAX_ENVELOPE_DEPTH: usize = 3;

/// A field of the wrong shape reads as absent instead of failing its wrapper.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    #[serde(default, deserialize_with = "lenient")]
    pub remote_jid: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub from_me: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub participant: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub participant_pn: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub participant_alt: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub sender_pn: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub stanza_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub participant: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub remote_jid: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub quoted_message: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub mentioned_jid: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    pub push_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub quoted_push_name: Option<String>,
}

impl ContextInfo {
    pub fn mentioned_handles(&self) -> impl Iterator<Item = &str> {
        self.mentioned_jid
            .iter()
            .flatten()
            .filter_map(Value::as_str)
    }

    pub fn is_from_status(&self) -> bool {
        self.remote_jid.as_deref().is_some_and(jid::is_status_broadcast)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedText {
    #[serde(default, deserialize_with = "lenient")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub context_info: Option<ContextInfo>,
}

/// Image or video content.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visual {
    #[serde(default, deserialize_with = "lenient")]
    pub caption: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub mimetype: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub seconds: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub jpeg_thumbnail: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub context_info: Option<ContextInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audio {
    #[serde(default, deserialize_with = "lenient")]
    pub mimetype: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub seconds: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub ptt: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub context_info: Option<ContextInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, deserialize_with = "lenient")]
    pub file_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub caption: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub mimetype: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub context_info: Option<ContextInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sticker {
    #[serde(default, deserialize_with = "lenient")]
    pub mimetype: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_animated: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub context_info: Option<ContextInfo>,
}

/// The content wrappers the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WrapperKey {
    Conversation,
    ExtendedText,
    Image,
    Video,
    Audio,
    Document,
    Sticker,
}

impl WrapperKey {
    const ALL: [WrapperKey; 7] = [
        WrapperKey::Conversation,
        WrapperKey::ExtendedText,
        WrapperKey::Image,
        WrapperKey::Video,
        WrapperKey::Audio,
        WrapperKey::Document,
        WrapperKey::Sticker,
    ];

    fn field(self) -> &'static str {
        match self {
            WrapperKey::Conversation => "conversation",
            WrapperKey::ExtendedText => "extendedTextMessage",
            WrapperKey::Image => "imageMessage",
            WrapperKey::Video => "videoMessage",
            WrapperKey::Audio => "audioMessage",
            WrapperKey::Document => "documentMessage",
            WrapperKey::Sticker => "stickerMessage",
        }
    }

    fn decode(self, value: &Value) -> Option<ProviderMessage> {
        match self {
            WrapperKey::Conversation => value
                .as_str()
                .map(|text| ProviderMessage::Conversation(text.to_string())),
            WrapperKey::ExtendedText => ExtendedText::deserialize(value)
                .ok()
                .map(ProviderMessage::ExtendedText),
            WrapperKey::Image => Visual::deserialize(value).ok().map(ProviderMessage::Image),
            WrapperKey::Video => Visual::deserialize(value).ok().map(ProviderMessage::Video),
            WrapperKey::Audio => Audio::deserialize(value).ok().map(ProviderMessage::Audio),
            WrapperKey::Document => Document::deserialize(value)
                .ok()
                .map(ProviderMessage::Document),
            WrapperKey::Sticker => Sticker::deserialize(value).ok().map(ProviderMessage::Sticker),
        }
    }
}

/// Content of a provider `message` object, one variant per known wrapper.
#[derive(Debug, Clone)]
pub enum ProviderMessage {
    Conversation(String),
    ExtendedText(ExtendedText),
    Image(Visual),
    Video(Visual),
    Audio(Audio),
    Document(Document),
    Sticker(Sticker),
}

impl ProviderMessage {
    /// Decode the first known wrapper present in a `message` object, looking
    /// through ephemeral/view-once envelopes.
    pub fn decode(message: &Value) -> Option<Self> {
        let inner = unwrap_envelopes(message);
        WrapperKey::ALL.iter().find_map(|key| {
            inner
                .get(key.field())
                .and_then(|wrapper| key.decode(wrapper))
        })
    }

    pub fn context_info(&self) -> Option<&ContextInfo> {
        match self {
            ProviderMessage::Conversation(_) => None,
            ProviderMessage::ExtendedText(m) => m.context_info.as_ref(),
            ProviderMessage::Image(m) | ProviderMessage::Video(m) => m.context_info.as_ref(),
            ProviderMessage::Audio(m) => m.context_info.as_ref(),
            ProviderMessage::Document(m) => m.context_info.as_ref(),
            ProviderMessage::Sticker(m) => m.context_info.as_ref(),
        }
    }

    pub fn quoted_kind(&self) -> QuotedKind {
        match self {
            ProviderMessage::Conversation(_) | ProviderMessage::ExtendedText(_) => QuotedKind::Text,
            ProviderMessage::Image(_) => QuotedKind::Image,
            ProviderMessage::Video(_) => QuotedKind::Video,
            ProviderMessage::Audio(_) => QuotedKind::Audio,
            ProviderMessage::Document(_) => QuotedKind::Document,
            ProviderMessage::Sticker(_) => QuotedKind::Sticker,
        }
    }
}

fn unwrap_envelopes(message: &Value) -> &Value {
    let mut current = message;
    for _ in 0..MAX_ENVELOPE_DEPTH {
        let inner = ENVELOPES
            .iter()
            .find_map(|envelope| current.get(envelope).and_then(|e| e.get("message")));
        match inner {
            Some(inner) => current = inner,
            None => break,
        }
    }
    current
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotedKind {
    Text,
    Image,
    Video,
    Audio,
    Document,
    Sticker,
}

impl QuotedKind {
    pub fn message_kind(self) -> MessageKind {
        match self {
            QuotedKind::Text => MessageKind::Text,
            QuotedKind::Image => MessageKind::Image,
            QuotedKind::Video => MessageKind::Video,
            QuotedKind::Audio => MessageKind::Audio,
            QuotedKind::Document => MessageKind::Document,
            QuotedKind::Sticker => MessageKind::Sticker,
        }
    }
}

/// What could be recovered about a quoted message from the replying
/// message's own payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedQuote {
    pub kind: QuotedKind,
    pub stanza_id: Option<String>,
    pub body: Option<String>,
    pub caption: Option<String>,
    pub thumbnail: Option<String>,
    pub file_name: Option<String>,
    pub mimetype: Option<String>,
    pub sender: Option<String>,
    pub sender_push_name: Option<String>,
    pub from_status: bool,
}

impl DecodedQuote {
    fn from_context(context: &ContextInfo, quoted: ProviderMessage) -> Option<Self> {
        let mut decoded = DecodedQuote {
            kind: quoted.quoted_kind(),
            stanza_id: non_empty(context.stanza_id.as_deref()),
            body: None,
            caption: None,
            thumbnail: None,
            file_name: None,
            mimetype: None,
            sender: non_empty(context.participant.as_deref()),
            sender_push_name: non_empty(context.quoted_push_name.as_deref())
                .or_else(|| non_empty(context.push_name.as_deref())),
            from_status: context.is_from_status(),
        };

        match quoted {
            ProviderMessage::Conversation(text) => {
                decoded.body = non_empty(Some(text.as_str()));
                if decoded.body.is_none() {
                    return None;
                }
            }
            ProviderMessage::ExtendedText(m) => {
                decoded.body = non_empty(m.text.as_deref());
                if decoded.body.is_none() {
                    return None;
                }
            }
            ProviderMessage::Image(m) | ProviderMessage::Video(m) => {
                decoded.caption = non_empty(m.caption.as_deref());
                decoded.thumbnail = m
                    .jpeg_thumbnail
                    .as_ref()
                    .and_then(Value::as_str)
                    .and_then(|t| non_empty(Some(t)));
                decoded.mimetype = m.mimetype;
            }
            ProviderMessage::Audio(m) => {
                decoded.mimetype = m.mimetype;
            }
            ProviderMessage::Document(m) => {
                decoded.file_name = non_empty(m.file_name.as_deref()).or(non_empty(m.title.as_deref()));
                decoded.caption = non_empty(m.caption.as_deref());
                decoded.mimetype = m.mimetype;
            }
            ProviderMessage::Sticker(m) => {
                decoded.mimetype = m.mimetype;
            }
        }

        Some(decoded)
    }
}

/// Decoded top-level provider payload.
#[derive(Debug, Clone, Default)]
pub struct ProviderPayload {
    pub key: MessageKey,
    pub push_name: Option<String>,
    pub sender: Option<String>,
    pub message: Option<ProviderMessage>,
    /// `contextInfo` sitting directly in the `message` object.
    pub message_context: Option<ContextInfo>,
    /// `contextInfo` at the payload root, as some webhook formats send it.
    pub root_context: Option<ContextInfo>,
}

impl ProviderPayload {
    pub fn decode(raw: &Value) -> Option<Self> {
        if !raw.is_object() {
            return None;
        }

        let message_value = raw.get("message");
        Some(Self {
            key: raw
                .get("key")
                .and_then(|k| MessageKey::deserialize(k).ok())
                .unwrap_or_default(),
            push_name: raw.get("pushName").and_then(Value::as_str).map(str::to_string),
            sender: raw.get("sender").and_then(Value::as_str).map(str::to_string),
            message: message_value.and_then(ProviderMessage::decode),
            message_context: message_value
                .and_then(|m| m.get("contextInfo"))
                .and_then(|c| ContextInfo::deserialize(c).ok()),
            root_context: raw
                .get("contextInfo")
                .and_then(|c| ContextInfo::deserialize(c).ok()),
        })
    }

    /// Name the provider attached to the sender of this message.
    pub fn push_name(&self) -> Option<&str> {
        self.push_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// A second handle for the sender, reported under another addressing scheme.
    pub fn alternate_sender(&self) -> Option<&str> {
        [
            self.key.participant_pn.as_deref(),
            self.key.participant_alt.as_deref(),
            self.key.sender_pn.as_deref(),
            self.sender.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find(|handle| !handle.trim().is_empty())
    }

    /// Context blocks in precedence order: content wrapper, message level, root.
    pub fn contexts(&self) -> impl Iterator<Item = &ContextInfo> {
        self.message
            .as_ref()
            .and_then(ProviderMessage::context_info)
            .into_iter()
            .chain(self.message_context.as_ref())
            .chain(self.root_context.as_ref())
    }

    pub fn mentioned_handles(&self) -> impl Iterator<Item = &str> {
        self.contexts().flat_map(|c| c.mentioned_handles())
    }

    /// Stanza id of the message this one replies to, if the payload says.
    pub fn quoted_stanza_id(&self) -> Option<&str> {
        self.contexts()
            .filter_map(|c| c.stanza_id.as_deref())
            .find(|id| !id.trim().is_empty())
    }

    pub fn quotes_status(&self) -> bool {
        self.contexts()
            .find(|c| c.quoted_message.is_some())
            .is_some_and(ContextInfo::is_from_status)
    }

    /// Rebuild the quoted message from the embedded `quotedMessage` block.
    pub fn decode_quote(&self) -> Option<DecodedQuote> {
        self.contexts().find_map(|context| {
            let quoted = context.quoted_message.as_ref()?;
            let content = ProviderMessage::decode(quoted)?;
            DecodedQuote::from_context(context, content)
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reply_payload(quoted: Value, remote_jid: &str) -> Value {
        json!({
            "key": { "remoteJid": "5511999990000@s.whatsapp.net", "fromMe": false, "id": "REPLY1" },
            "pushName": "Maria",
            "message": {
                "extendedTextMessage": {
                    "text": "respondendo",
                    "contextInfo": {
                        "stanzaId": "QUOTED1",
                        "participant": "5511988887777@s.whatsapp.net",
                        "remoteJid": remote_jid,
                        "quotedMessage": quoted
                    }
                }
            }
        })
    }

    #[test]
    fn test_decodes_quoted_extended_text() {
        let raw = reply_payload(json!({ "extendedTextMessage": { "text": "ping" } }), "5511999990000@s.whatsapp.net");
        let payload = ProviderPayload::decode(&raw).unwrap();
        let quote = payload.decode_quote().unwrap();

        assert_eq!(quote.kind, QuotedKind::Text);
        assert_eq!(quote.body.as_deref(), Some("ping"));
        assert_eq!(quote.stanza_id.as_deref(), Some("QUOTED1"));
        assert_eq!(quote.sender.as_deref(), Some("5511988887777@s.whatsapp.net"));
        assert!(!quote.from_status);
    }

    #[test]
    fn test_decodes_quoted_status_image() {
        let raw = reply_payload(
            json!({ "imageMessage": { "caption": "praia", "jpegThumbnail": "/9j/AAA=" } }),
            "status@broadcast",
        );
        let quote = ProviderPayload::decode(&raw).unwrap().decode_quote().unwrap();

        assert_eq!(quote.kind, QuotedKind::Image);
        assert_eq!(quote.caption.as_deref(), Some("praia"));
        assert_eq!(quote.thumbnail.as_deref(), Some("/9j/AAA="));
        assert!(quote.from_status);
    }

    #[test]
    fn test_decodes_quoted_document_name() {
        let raw = reply_payload(
            json!({ "documentWithCaptionMessage": { "message": { "documentMessage": { "fileName": "proposta.pdf" } } } }),
            "5511999990000@s.whatsapp.net",
        );
        let quote = ProviderPayload::decode(&raw).unwrap().decode_quote().unwrap();
        assert_eq!(quote.kind, QuotedKind::Document);
        assert_eq!(quote.file_name.as_deref(), Some("proposta.pdf"));
    }

    #[test]
    fn test_empty_quoted_text_is_no_quote() {
        let raw = reply_payload(json!({ "conversation": "   " }), "x@s.whatsapp.net");
        assert!(ProviderPayload::decode(&raw).unwrap().decode_quote().is_none());
    }

    #[test]
    fn test_unknown_quoted_wrapper_is_no_quote() {
        let raw = reply_payload(json!({ "pollCreationMessage": { "name": "?" } }), "x@s.whatsapp.net");
        assert!(ProviderPayload::decode(&raw).unwrap().decode_quote().is_none());
    }

    #[test]
    fn test_context_inside_image_wrapper() {
        let raw = json!({
            "message": {
                "imageMessage": {
                    "caption": "olha @5511977776666",
                    "contextInfo": { "mentionedJid": ["5511977776666@s.whatsapp.net", null] }
                }
            }
        });
        let payload = ProviderPayload::decode(&raw).unwrap();
        let mentions: Vec<&str> = payload.mentioned_handles().collect();
        assert_eq!(mentions, vec!["5511977776666@s.whatsapp.net"]);
    }

    #[test]
    fn test_mentions_from_every_context_level() {
        let raw = json!({
            "contextInfo": { "mentionedJid": ["111@lid"] },
            "message": {
                "contextInfo": { "mentionedJid": ["222@s.whatsapp.net"] },
                "ephemeralMessage": { "message": {
                    "extendedTextMessage": { "text": "oi", "contextInfo": { "mentionedJid": ["333@c.us"] } }
                } }
            }
        });
        let payload = ProviderPayload::decode(&raw).unwrap();
        let mentions: Vec<&str> = payload.mentioned_handles().collect();
        assert_eq!(mentions, vec!["333@c.us", "222@s.whatsapp.net", "111@lid"]);
    }

    #[test]
    fn test_push_name_and_alternate_sender() {
        let raw = json!({
            "key": { "participant": "99887766@lid", "participantPn": "5511966665555@s.whatsapp.net" },
            "pushName": "  Joana "
        });
        let payload = ProviderPayload::decode(&raw).unwrap();
        assert_eq!(payload.push_name(), Some("Joana"));
        assert_eq!(payload.alternate_sender(), Some("5511966665555@s.whatsapp.net"));
    }

    #[test]
    fn test_both_push_name_keys_in_context() {
        let raw = json!({
            "message": { "extendedTextMessage": {
                "text": "oi @5511977776666",
                "contextInfo": {
                    "stanzaId": "QUOTED1",
                    "pushName": "Contexto",
                    "quotedPushName": "Bruna",
                    "mentionedJid": ["5511977776666@s.whatsapp.net"],
                    "quotedMessage": { "conversation": "ping" }
                }
            } }
        });
        let payload = ProviderPayload::decode(&raw).unwrap();

        assert!(matches!(payload.message, Some(ProviderMessage::ExtendedText(_))));
        assert_eq!(payload.quoted_stanza_id(), Some("QUOTED1"));
        assert_eq!(payload.mentioned_handles().count(), 1);
        let quote = payload.decode_quote().unwrap();
        assert_eq!(quote.body.as_deref(), Some("ping"));
        assert_eq!(quote.sender_push_name.as_deref(), Some("Bruna"));
    }

    #[test]
    fn test_mistyped_field_drops_only_that_field() {
        let raw = json!({
            "key": { "id": 7, "participantPn": "5511966665555@s.whatsapp.net" },
            "message": { "imageMessage": {
                "caption": "praia",
                "seconds": "dez",
                "contextInfo": {
                    "stanzaId": "QUOTED1",
                    "participant": ["not", "a", "string"],
                    "mentionedJid": "5511977776666@s.whatsapp.net",
                    "quotedMessage": { "extendedTextMessage": { "text": "ping", "contextInfo": 3 } }
                }
            } }
        });
        let payload = ProviderPayload::decode(&raw).unwrap();

        assert_eq!(payload.alternate_sender(), Some("5511966665555@s.whatsapp.net"));
        let Some(ProviderMessage::Image(image)) = &payload.message else {
            panic!("image wrapper should decode");
        };
        assert_eq!(image.caption.as_deref(), Some("praia"));
        assert!(image.seconds.is_none());
        assert_eq!(payload.mentioned_handles().count(), 0);

        let quote = payload.decode_quote().unwrap();
        assert_eq!(quote.body.as_deref(), Some("ping"));
        assert_eq!(quote.stanza_id.as_deref(), Some("QUOTED1"));
        assert!(quote.sender.is_none());
    }

    #[test]
    fn test_non_object_payload() {
        assert!(ProviderPayload::decode(&json!("oops")).is_none());
        let payload = ProviderPayload::decode(&json!({ "key": 42, "message": [] })).unwrap();
        assert!(payload.message.is_none());
        assert!(payload.push_name().is_none());
    }
}
