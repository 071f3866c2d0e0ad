use std::future::Future;

use thiserror::Error;

use crate::message::Message;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Page source failed: {0}")]
    Source(String),
}

/// Data-access collaborator supplying a conversation's history in pages,
/// most recent first. Page 0 holds the newest records.
pub trait PageSource: Send + Sync {
    fn fetch_page(
        &self,
        conversation_id: &str,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Vec<Message>, PageError>> + Send;
}
