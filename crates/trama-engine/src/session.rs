use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use trama_core::{ContactDirectory, Message, PageSource};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::mentions::{DirectoryCache, MentionMap, MentionResolver};
use crate::participants::ThreadKind;
use crate::timeline::{Timeline, reconcile};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderedConversation {
    pub timeline: Timeline,
    pub mentions: MentionMap,
}

/// The loaded window of one conversation.
///
/// Pages are kept by page number and may arrive in any order; rendering always
/// works on whatever is loaded so far.
pub struct ConversationSession<S, D> {
    conversation_id: String,
    thread: ThreadKind,
    source: Arc<S>,
    mentions: MentionResolver<D>,
    config: EngineConfig,
    pages: BTreeMap<u32, Vec<Message>>,
    exhausted: bool,
}

impl<S: PageSource, D: ContactDirectory> ConversationSession<S, D> {
    pub fn new(
        conversation_id: impl Into<String>,
        thread: ThreadKind,
        source: Arc<S>,
        directory: Arc<D>,
        cache: Arc<DirectoryCache>,
        config: EngineConfig,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            thread,
            source,
            mentions: MentionResolver::new(directory, cache, &config),
            config,
            pages: BTreeMap::new(),
            exhausted: false,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn thread(&self) -> ThreadKind {
        self.thread
    }

    pub fn loaded_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn has_more(&self) -> bool {
        !self.exhausted
    }

    /// Fetch one page from the source and keep it. Returns the record count.
    pub async fn load_page(&mut self, page: u32) -> Result<usize> {
        let messages = self
            .source
            .fetch_page(&self.conversation_id, page, self.config.page_size)
            .await?;
        let count = messages.len();

        info!(
            conversation_id = %self.conversation_id,
            page,
            count,
            "Page loaded"
        );

        let is_last_known = self.pages.keys().next_back().is_none_or(|&last| page >= last);
        if is_last_known && count < self.config.page_size as usize {
            debug!(conversation_id = %self.conversation_id, page, "History exhausted");
            self.exhausted = true;
        }

        self.insert_page(page, messages);
        Ok(count)
    }

    /// Fetch the page after the oldest one loaded.
    pub async fn load_older(&mut self) -> Result<usize> {
        if self.exhausted {
            return Ok(0);
        }
        let next = self.pages.keys().next_back().map_or(0, |&last| last + 1);
        self.load_page(next).await
    }

    /// Whether a scroll position this close to the top should pull an older page.
    pub fn should_load_older(&self, distance_from_top_px: f32) -> bool {
        !self.exhausted && distance_from_top_px <= self.config.prefetch_threshold_px
    }

    /// Store a page delivered by other means, replacing any page with the same number.
    pub fn insert_page(&mut self, page: u32, messages: Vec<Message>) {
        self.pages.insert(page, messages);
    }

    /// Every loaded record once. A record present in two pages is taken from
    /// the lower (fresher) page.
    pub fn loaded_messages(&self) -> Vec<Message> {
        let mut seen = HashSet::new();
        self.pages
            .values()
            .flatten()
            .filter(|m| seen.insert(m.id.as_str()))
            .cloned()
            .collect()
    }

    /// Render without waiting on the directory.
    pub fn render_cached(&self) -> RenderedConversation {
        let messages = self.loaded_messages();
        let mentions = self.mentions.resolve_cached(&messages);
        RenderedConversation {
            timeline: reconcile(messages, self.thread),
            mentions,
        }
    }

    /// Render with mention names looked up in the directory when needed.
    pub async fn render(&self) -> RenderedConversation {
        let messages = self.loaded_messages();
        let mentions = self.mentions.resolve(&messages).await;
        RenderedConversation {
            timeline: reconcile(messages, self.thread),
            mentions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use trama_core::{DirectoryError, MessageKind, PageError};

    /// Newest first, like the store.
    struct FakeSource {
        history: Vec<Message>,
    }

    impl PageSource for FakeSource {
        async fn fetch_page(
            &self,
            conversation_id: &str,
            page: u32,
            page_size: u32,
        ) -> std::result::Result<Vec<Message>, PageError> {
            if conversation_id != "chat" {
                return Err(PageError::ConversationNotFound(conversation_id.to_string()));
            }
            Ok(self
                .history
                .iter()
                .skip((page * page_size) as usize)
                .take(page_size as usize)
                .cloned()
                .collect())
        }
    }

    struct NamedDirectory;

    impl ContactDirectory for NamedDirectory {
        async fn lookup_by_phone_suffixes(
            &self,
            numbers: &[String],
            _suffix_len: usize,
        ) -> std::result::Result<HashMap<String, String>, DirectoryError> {
            Ok(numbers.iter().map(|n| (n.clone(), format!("Contato {}", n))).collect())
        }
    }

    fn history(count: i64) -> Vec<Message> {
        (0..count)
            .rev()
            .map(|i| {
                let mut m = Message::new(format!("m{}", i), "chat", MessageKind::Text, Utc.timestamp_opt(i, 0).unwrap());
                m.message_id = format!("false_5511999990000@s.whatsapp.net_S{}", i);
                m.body = Some(format!("mensagem {}", i));
                m
            })
            .collect()
    }

    fn session(history: Vec<Message>, page_size: u32) -> ConversationSession<FakeSource, NamedDirectory> {
        let config = EngineConfig {
            page_size,
            ..EngineConfig::default()
        };
        ConversationSession::new(
            "chat",
            ThreadKind::Direct,
            Arc::new(FakeSource { history }),
            Arc::new(NamedDirectory),
            Arc::new(DirectoryCache::new(Duration::from_secs(60))),
            config,
        )
    }

    #[tokio::test]
    async fn test_pages_until_exhausted() {
        let mut session = session(history(5), 2);

        assert_eq!(session.load_older().await.unwrap(), 2);
        assert_eq!(session.load_older().await.unwrap(), 2);
        assert!(session.has_more());
        assert_eq!(session.load_older().await.unwrap(), 1);
        assert!(!session.has_more());
        assert_eq!(session.load_older().await.unwrap(), 0);
        assert!(!session.should_load_older(0.0));

        let rendered = session.render_cached();
        let ids: Vec<&str> = rendered.timeline.iter().map(|e| e.message.id.as_str()).collect();
        assert_eq!(ids, vec!["m0", "m1", "m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn test_out_of_order_pages_render_sorted() {
        let mut session = session(history(4), 2);
        session.load_page(1).await.unwrap();
        assert_eq!(session.render_cached().timeline.len(), 2);

        session.load_page(0).await.unwrap();
        let rendered = session.render_cached();
        let ids: Vec<&str> = rendered.timeline.iter().map(|e| e.message.id.as_str()).collect();
        assert_eq!(ids, vec!["m0", "m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn test_overlapping_pages_collapse_by_id() {
        let mut session = session(history(3), 2);
        session.load_page(0).await.unwrap();
        let mut shifted = history(3);
        shifted.remove(0);
        session.insert_page(1, shifted);

        assert_eq!(session.loaded_messages().len(), 3);
    }

    #[tokio::test]
    async fn test_prefetch_threshold() {
        let session = session(history(1), 2);
        assert!(session.should_load_older(150.0));
        assert!(!session.should_load_older(500.0));
    }

    #[tokio::test]
    async fn test_render_resolves_mentions() {
        let mut history = history(1);
        history[0].raw_payload = Some(json!({ "message": { "extendedTextMessage": {
            "text": "@5511977776666", "contextInfo": { "mentionedJid": ["5511977776666@s.whatsapp.net"] }
        } } }));
        let mut session = session(history, 10);
        session.load_older().await.unwrap();

        assert!(session.render_cached().mentions.is_loading);
        let rendered = session.render().await;
        assert_eq!(rendered.mentions.get("5511977776666"), Some("Contato 5511977776666"));
        assert!(!session.render_cached().mentions.is_loading);
    }

    #[tokio::test]
    async fn test_unknown_conversation_errors() {
        let mut session = session(history(1), 2);
        session.conversation_id = "other".into();
        assert!(session.load_older().await.is_err());
    }
}
