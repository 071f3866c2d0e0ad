mod config;
mod dedupe;
mod error;
mod mentions;
mod ordering;
mod participants;
mod payload;
mod quotes;
mod reactions;
mod session;
mod timeline;

pub mod jid;

pub use config::EngineConfig;
pub use dedupe::dedupe;
pub use error::SessionError;
pub use mentions::{DirectoryCache, MentionMap, MentionResolver, extract_mentions, harvest_push_names};
pub use ordering::sort_chronologically;
pub use participants::{PALETTE, ParticipantLabel, ThreadKind, resolve_participant};
pub use payload::{DecodedQuote, ProviderMessage, ProviderPayload, QuotedKind};
pub use quotes::{MessageIndex, ResolvedQuote, resolve_quote};
pub use reactions::{ReactionBadge, ReactionIndex, aggregate_reactions};
pub use session::{ConversationSession, RenderedConversation};
pub use timeline::{Timeline, TimelineEntry, reconcile};

pub use trama_core::{ContactDirectory, Message, MessageKind, PageSource};
