use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use trama_core::{ContactDirectory, Message};

use crate::config::EngineConfig;
use crate::jid;
use crate::payload::ProviderPayload;

/// Display names for mentioned numbers, keyed by normalized number.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionMap {
    pub names: HashMap<String, String>,
    /// A directory lookup for the current mention set has not finished.
    pub is_loading: bool,
}

impl MentionMap {
    pub fn get(&self, number: &str) -> Option<&str> {
        self.names
            .get(jid::strip_routing_suffix(number))
            .map(String::as_str)
    }

    /// Resolved name, or the number formatted for display.
    pub fn display_name(&self, number: &str) -> String {
        match self.get(number) {
            Some(name) => name.to_string(),
            None => jid::format_phone_number(jid::strip_routing_suffix(number)),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Normalized numbers mentioned anywhere in the loaded messages.
pub fn extract_mentions(messages: &[Message]) -> BTreeSet<String> {
    messages
        .iter()
        .filter_map(|m| m.raw_payload.as_ref())
        .filter_map(ProviderPayload::decode)
        .flat_map(|payload| {
            payload
                .mentioned_handles()
                .filter_map(jid::normalized_number)
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Names the provider attached to senders in this thread, registered under
/// the participant handle, the alternate sender handle and the sender number.
/// Later messages override earlier ones.
pub fn harvest_push_names(messages: &[Message]) -> HashMap<String, String> {
    let mut names = HashMap::new();

    for message in messages.iter().filter(|m| !m.from_me) {
        let Some(payload) = message.raw_payload.as_ref().and_then(ProviderPayload::decode) else {
            continue;
        };
        let Some(push_name) = payload.push_name() else {
            continue;
        };

        let participant = message.participant.as_deref().map(jid::strip_routing_suffix);
        let alternate = payload
            .alternate_sender()
            .map(jid::strip_routing_suffix)
            .filter(|alt| Some(*alt) != participant);
        let from_number = message.from_number.as_deref().map(jid::strip_routing_suffix);

        for key in [participant, alternate, from_number].into_iter().flatten() {
            if !key.is_empty() {
                names.insert(key.to_string(), push_name.to_string());
            }
        }
    }

    names
}

struct CacheEntry {
    fetched_at: Instant,
    names: HashMap<String, String>,
}

/// Directory results per mention set, fresh for a fixed stale time.
///
/// Each mention set also gets a lookup gate so that concurrent renders of the
/// same set share one directory call.
pub struct DirectoryCache {
    stale_time: Duration,
    entries: Mutex<HashMap<Vec<String>, CacheEntry>>,
    in_flight: Mutex<HashMap<Vec<String>, Arc<AsyncMutex<()>>>>,
}

impl DirectoryCache {
    pub fn new(stale_time: Duration) -> Self {
        Self {
            stale_time,
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Vec<String>, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn gate(&self, mentions: &[String]) -> Arc<AsyncMutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight.entry(mentions.to_vec()).or_default().clone()
    }

    pub fn get_fresh(&self, mentions: &[String]) -> Option<HashMap<String, String>> {
        let entries = self.lock();
        let entry = entries.get(mentions)?;
        (entry.fetched_at.elapsed() < self.stale_time).then(|| entry.names.clone())
    }

    pub fn insert(&self, mentions: Vec<String>, names: HashMap<String, String>) {
        {
            let mut entries = self.lock();
            let now = Instant::now();
            entries.retain(|_, entry| now.duration_since(entry.fetched_at) < self.stale_time);
            entries.insert(
                mentions.clone(),
                CacheEntry {
                    fetched_at: now,
                    names,
                },
            );
        }

        // Entry first, so a caller that finds no gate also finds the result
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&mentions);
    }
}

pub struct MentionResolver<D> {
    directory: Arc<D>,
    cache: Arc<DirectoryCache>,
    suffix_len: usize,
}

impl<D: ContactDirectory> MentionResolver<D> {
    pub fn new(directory: Arc<D>, cache: Arc<DirectoryCache>, config: &EngineConfig) -> Self {
        Self {
            directory,
            cache,
            suffix_len: config.phone_suffix_len,
        }
    }

    /// Resolve without waiting on the directory: cached results only, and
    /// `is_loading` set while the current mention set has none.
    pub fn resolve_cached(&self, messages: &[Message]) -> MentionMap {
        let mentions: Vec<String> = extract_mentions(messages).into_iter().collect();
        let harvested = harvest_push_names(messages);

        if mentions.is_empty() {
            return merge(harvested, HashMap::new(), false);
        }

        match self.cache.get_fresh(&mentions) {
            Some(directory) => merge(harvested, directory, false),
            None => merge(harvested, HashMap::new(), true),
        }
    }

    /// Resolve, querying the directory when the mention set is not cached.
    pub async fn resolve(&self, messages: &[Message]) -> MentionMap {
        let mentions: Vec<String> = extract_mentions(messages).into_iter().collect();
        let harvested = harvest_push_names(messages);

        if mentions.is_empty() {
            return merge(harvested, HashMap::new(), false);
        }

        if let Some(cached) = self.cache.get_fresh(&mentions) {
            debug!(count = mentions.len(), "Mention directory cache hit");
            return merge(harvested, cached, false);
        }

        // Whoever holds the gate does the lookup; the rest find its result cached
        let gate = self.cache.gate(&mentions);
        let _running = gate.lock().await;
        let directory = match self.cache.get_fresh(&mentions) {
            Some(cached) => {
                debug!(count = mentions.len(), "Mention directory lookup joined");
                cached
            }
            None => self.fetch(mentions).await,
        };

        merge(harvested, directory, false)
    }

    async fn fetch(&self, mentions: Vec<String>) -> HashMap<String, String> {
        info!(count = mentions.len(), "Looking up mentioned numbers");

        let names = match self
            .directory
            .lookup_by_phone_suffixes(&mentions, self.suffix_len)
            .await
        {
            Ok(names) => {
                debug!(resolved = names.len(), "Mention directory lookup done");
                names
            }
            Err(e) => {
                // Cached empty so the same set is not re-requested before it goes stale
                warn!(error = %e, "Mention directory lookup failed");
                HashMap::new()
            }
        };

        self.cache.insert(mentions, names.clone());
        names
    }
}

/// Thread names first, directory names on top.
fn merge(
    mut harvested: HashMap<String, String>,
    directory: HashMap<String, String>,
    is_loading: bool,
) -> MentionMap {
    for (number, name) in directory {
        if !name.trim().is_empty() {
            harvested.insert(number, name);
        }
    }
    MentionMap {
        names: harvested,
        is_loading,
    }
}
