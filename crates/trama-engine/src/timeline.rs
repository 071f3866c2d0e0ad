use serde::{Serialize, Serializer};
use tracing::info;
use trama_core::Message;

use crate::dedupe::dedupe;
use crate::ordering::sort_chronologically;
use crate::participants::{ParticipantLabel, ThreadKind, resolve_participant_with};
use crate::payload::ProviderPayload;
use crate::quotes::{MessageIndex, ResolvedQuote, resolve_quote_with};
use crate::reactions::{ReactionBadge, aggregate_reactions};

/// One renderable row with its resolved cross-references.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub message: Message,
    pub reaction_badges: Option<Vec<ReactionBadge>>,
    pub resolved_quote: Option<ResolvedQuote>,
    pub participant: Option<ParticipantLabel>,
}

impl TimelineEntry {
    pub fn display_name(&self) -> Option<&str> {
        self.participant.as_ref().map(|p| p.name.as_str())
    }

    pub fn display_color(&self) -> Option<&'static str> {
        self.participant.as_ref().map(|p| p.color)
    }
}

/// Render descriptor: the sender label is flattened to its name and color.
impl Serialize for TimelineEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Descriptor<'a> {
            message: &'a Message,
            #[serde(skip_serializing_if = "Option::is_none")]
            reaction_badges: Option<&'a [ReactionBadge]>,
            resolved_quote: Option<&'a ResolvedQuote>,
            display_name: Option<&'a str>,
            display_color: Option<&'a str>,
        }

        Descriptor {
            message: &self.message,
            reaction_badges: self.reaction_badges.as_deref(),
            resolved_quote: self.resolved_quote.as_ref(),
            display_name: self.display_name(),
            display_color: self.display_color(),
        }
        .serialize(serializer)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Timeline {
    pub thread: ThreadKind,
    pub entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimelineEntry> {
        self.entries.iter()
    }

    pub fn find(&self, id: &str) -> Option<&TimelineEntry> {
        self.entries.iter().find(|e| e.message.id == id)
    }
}

/// Build the timeline for the currently loaded records.
///
/// Nothing is carried over between calls: every pass dedupes, orders and
/// resolves from scratch. Reaction records only feed badges and never show up
/// as rows.
pub fn reconcile(messages: impl IntoIterator<Item = Message>, thread: ThreadKind) -> Timeline {
    let ordered = sort_chronologically(dedupe(messages.into_iter().collect()));
    let reactions = aggregate_reactions(&ordered);
    let index = MessageIndex::build(&ordered);

    let entries: Vec<TimelineEntry> = ordered
        .iter()
        .filter(|m| !m.is_reaction())
        .map(|message| {
            let payload = message.raw_payload.as_ref().and_then(ProviderPayload::decode);
            TimelineEntry {
                message: message.clone(),
                reaction_badges: reactions.for_message_id(&message.message_id).map(<[_]>::to_vec),
                resolved_quote: resolve_quote_with(message, payload.as_ref(), &index),
                participant: resolve_participant_with(message, payload.as_ref(), thread),
            }
        })
        .collect();

    info!(
        loaded = ordered.len(),
        rows = entries.len(),
        indexed_keys = index.len(),
        "Timeline reconciled"
    );

    Timeline { thread, entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use trama_core::{MessageKind, Reaction};

    fn msg(id: &str, kind: MessageKind, ts: i64) -> Message {
        let mut m = Message::new(id, "120363@g.us", kind, Utc.timestamp_opt(ts, 0).unwrap());
        m.external_timestamp = Some(ts);
        m
    }

    #[test]
    fn test_page_scenario() {
        let mut a = msg("a", MessageKind::Text, 10);
        a.message_id = "false_5511999990000@s.whatsapp.net_A1".into();
        a.body = Some("oi".into());

        let mut dup = msg("dup", MessageKind::Text, 10);
        dup.message_id = a.message_id.clone();

        let mut reaction = msg("r", MessageKind::Reaction, 11);
        reaction.reaction = Some(Reaction {
            target_message_id: "A1".into(),
            emoji: "👍".into(),
        });

        let timeline = reconcile(vec![a, dup, reaction], ThreadKind::Direct);

        assert_eq!(timeline.len(), 1);
        let entry = &timeline.entries[0];
        assert_eq!(entry.message.id, "a");
        let badges = entry.reaction_badges.as_ref().unwrap();
        assert_eq!(badges.len(), 1);
        assert_eq!(badges[0].emoji, "👍");
        assert_eq!(badges[0].count, 1);
    }

    #[test]
    fn test_group_rows_get_labels_and_quotes() {
        let mut first = msg("first", MessageKind::Text, 20);
        first.message_id = "false_120363@g.us_Q1_5511988887777@s.whatsapp.net".into();
        first.participant = Some("5511988887777@s.whatsapp.net".into());
        first.body = Some("pergunta".into());
        first.raw_payload = Some(json!({ "pushName": "Rita" }));

        let mut answer = msg("answer", MessageKind::Text, 30);
        answer.from_me = true;
        answer.body = Some("resposta".into());
        answer.reply_to_message_id = Some("Q1".into());

        // Out of order on purpose
        let timeline = reconcile(vec![answer, first], ThreadKind::Group);

        let ids: Vec<&str> = timeline.iter().map(|e| e.message.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "answer"]);

        let first = timeline.find("first").unwrap();
        assert_eq!(first.display_name(), Some("Rita"));
        assert!(first.display_color().is_some());
        assert!(first.reaction_badges.is_none());

        let answer = timeline.find("answer").unwrap();
        assert!(answer.participant.is_none());
        assert_eq!(answer.resolved_quote.as_ref().unwrap().message.id, "first");
    }

    #[test]
    fn test_entry_serializes_as_render_descriptor() {
        let mut received = msg("in", MessageKind::Text, 5);
        received.participant = Some("5511988887777@s.whatsapp.net".into());
        received.body = Some("oi".into());
        received.raw_payload = Some(json!({ "pushName": "Rita" }));

        let timeline = reconcile(vec![received], ThreadKind::Group);
        let value = serde_json::to_value(&timeline.entries[0]).unwrap();

        assert_eq!(value["displayName"], "Rita");
        assert_eq!(value["displayColor"], timeline.entries[0].display_color().unwrap());
        assert_eq!(value["message"]["id"], "in");
        assert!(value["resolvedQuote"].is_null());
        assert!(value.get("reactionBadges").is_none());
        assert!(value.get("participant").is_none());
    }

    #[test]
    fn test_empty_input() {
        let timeline = reconcile(Vec::new(), ThreadKind::Direct);
        assert!(timeline.is_empty());
    }
}
