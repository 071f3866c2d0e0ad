use std::collections::HashMap;

use trama_core::{ContactDirectory, DirectoryError, Message, PageError, PageSource};

use crate::repository::TramaDb;

impl ContactDirectory for TramaDb {
    async fn lookup_by_phone_suffixes(
        &self,
        numbers: &[String],
        suffix_len: usize,
    ) -> Result<HashMap<String, String>, DirectoryError> {
        TramaDb::lookup_by_phone_suffixes(self, numbers, suffix_len)
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))
    }
}

impl PageSource for TramaDb {
    async fn fetch_page(
        &self,
        conversation_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Message>, PageError> {
        self.get_page(conversation_id, page, page_size)
            .await
            .map_err(|e| PageError::Source(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use trama_core::MessageKind;

    #[tokio::test]
    async fn test_store_serves_both_collaborators() {
        let db = TramaDb::new_in_memory().await.unwrap();
        db.upsert_contact("5511999990000", Some("Ana"), None).await.unwrap();
        let msg = Message::new("m1", "chat", MessageKind::Text, Utc.timestamp_opt(1, 0).unwrap());
        db.insert_message(&msg).await.unwrap();

        let names = ContactDirectory::lookup_by_phone_suffixes(&db, &["5511999990000".to_string()], 8)
            .await
            .unwrap();
        assert_eq!(names.get("5511999990000").map(String::as_str), Some("Ana"));

        let page = db.fetch_page("chat", 0, 10).await.unwrap();
        assert_eq!(page, vec![msg]);
    }
}
