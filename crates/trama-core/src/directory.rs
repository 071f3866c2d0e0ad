use std::collections::HashMap;
use std::future::Future;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Directory unavailable: {0}")]
    Unavailable(String),

    #[error("Lookup timed out")]
    Timeout,
}

/// Contacts directory queried for mentioned numbers.
pub trait ContactDirectory: Send + Sync {
    /// Resolves each number to a contact name by matching the last
    /// `suffix_len` digits. Numbers without a match are absent from the result.
    fn lookup_by_phone_suffixes(
        &self,
        numbers: &[String],
        suffix_len: usize,
    ) -> impl Future<Output = Result<HashMap<String, String>, DirectoryError>> + Send;
}

/// Directory with no entries, for callers that have no contacts store.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyDirectory;

impl ContactDirectory for EmptyDirectory {
    async fn lookup_by_phone_suffixes(
        &self,
        _numbers: &[String],
        _suffix_len: usize,
    ) -> Result<HashMap<String, String>, DirectoryError> {
        Ok(HashMap::new())
    }
}
