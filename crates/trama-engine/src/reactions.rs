use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;
use trama_core::Message;

use crate::jid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionBadge {
    pub emoji: String,
    pub count: u32,
    /// Set when at least one of the reactions behind this badge is ours.
    pub from_me: bool,
}

/// Badge lists per reaction target, reachable by the target's full composite
/// id and by its bare stanza id.
#[derive(Debug, Clone, Default)]
pub struct ReactionIndex {
    lists: Vec<Vec<ReactionBadge>>,
    keys: HashMap<String, usize>,
}

impl ReactionIndex {
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Exact key lookup.
    pub fn get(&self, key: &str) -> Option<&[ReactionBadge]> {
        self.keys.get(key).map(|&slot| self.lists[slot].as_slice())
    }

    /// Badges for a message: full composite id first, then its stanza id.
    pub fn for_message_id(&self, message_id: &str) -> Option<&[ReactionBadge]> {
        if message_id.is_empty() {
            return None;
        }
        self.get(message_id)
            .or_else(|| jid::extract_stanza_id(message_id).and_then(|stanza| self.get(stanza)))
    }

    fn slot_for(&mut self, target: &str) -> usize {
        if let Some(&slot) = self.keys.get(target) {
            return slot;
        }

        let slot = self.lists.len();
        self.lists.push(Vec::new());
        self.keys.insert(target.to_string(), slot);

        if let Some(stanza) = jid::extract_stanza_id(target) {
            if stanza != target {
                self.keys.entry(stanza.to_string()).or_insert(slot);
            }
        }
        slot
    }
}

/// Fold every reaction record into per-target badges, in first-seen order.
pub fn aggregate_reactions(messages: &[Message]) -> ReactionIndex {
    let mut index = ReactionIndex::default();

    for message in messages.iter().filter(|m| m.is_reaction()) {
        let Some(reaction) = message.reaction.as_ref() else {
            debug!(id = %message.id, "Reaction record without target, skipping");
            continue;
        };
        if reaction.target_message_id.is_empty() || reaction.emoji.is_empty() {
            // An empty emoji is the provider's "reaction removed"
            continue;
        }

        let slot = index.slot_for(&reaction.target_message_id);
        let badges = &mut index.lists[slot];
        match badges.iter_mut().find(|b| b.emoji == reaction.emoji) {
            Some(badge) => {
                badge.count += 1;
                badge.from_me |= message.from_me;
            }
            None => badges.push(ReactionBadge {
                emoji: reaction.emoji.clone(),
                count: 1,
                from_me: message.from_me,
            }),
        }
    }

    index
}
