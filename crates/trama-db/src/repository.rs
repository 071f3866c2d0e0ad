use directories::ProjectDirs;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite, SqlitePool};
use std::collections::HashMap;
use std::path::PathBuf;

use trama_core::Message;

use crate::error::{DbError, Result};
use crate::models::{Contact, ConversationSummary, MessageRow};
use crate::schema::SCHEMA;

pub struct TramaDb {
    pool: Pool<Sqlite>,
}

impl TramaDb {
    pub async fn new() -> Result<Self> {
        let db_path = Self::get_db_path()?;

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
        let pool = SqlitePool::connect(&db_url).await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        tracing::info!("Database initialized at: {}", db_path.display());

        Ok(Self { pool })
    }

    pub async fn new_with_path(path: &str) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", path);
        let pool = SqlitePool::connect(&db_url).await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Private in-memory database; a single connection so every query sees it.
    pub async fn new_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    fn get_db_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com.br", "trama", "trama").ok_or(DbError::NoProjectDirs)?;
        Ok(dirs.data_dir().join("trama.db"))
    }

    pub async fn insert_message(&self, message: &Message) -> Result<()> {
        let row = MessageRow::from_message(message)?;

        sqlx::query(
            r#"INSERT OR REPLACE INTO messages
               (id, message_id, conversation_id, kind, created_at, external_timestamp, from_me,
                from_number, participant, body, caption, media_json, location_json, contact_vcard,
                poll_json, reply_to_message_id, reaction_target_message_id, reaction_emoji, raw_json)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&row.id)
        .bind(&row.message_id)
        .bind(&row.conversation_id)
        .bind(&row.kind)
        .bind(row.created_at)
        .bind(row.external_timestamp)
        .bind(row.from_me)
        .bind(&row.from_number)
        .bind(&row.participant)
        .bind(&row.body)
        .bind(&row.caption)
        .bind(&row.media_json)
        .bind(&row.location_json)
        .bind(&row.contact_vcard)
        .bind(&row.poll_json)
        .bind(&row.reply_to_message_id)
        .bind(&row.reaction_target_message_id)
        .bind(&row.reaction_emoji)
        .bind(&row.raw_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_messages(&self, messages: &[Message]) -> Result<usize> {
        for message in messages {
            self.insert_message(message).await?;
        }
        tracing::debug!(count = messages.len(), "Messages stored");
        Ok(messages.len())
    }

    /// One page of a conversation, newest first. Page 0 is the most recent.
    pub async fn get_page(&self, conversation_id: &str, page: u32, page_size: u32) -> Result<Vec<Message>> {
        let offset = i64::from(page) * i64::from(page_size);

        let rows = sqlx::query_as::<_, MessageRow>(
            r#"SELECT * FROM messages WHERE conversation_id = ?
               ORDER BY COALESCE(external_timestamp * 1000, created_at) DESC, created_at DESC
               LIMIT ? OFFSET ?"#,
        )
        .bind(conversation_id)
        .bind(i64::from(page_size))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(MessageRow::into_message).collect()
    }

    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        Ok(sqlx::query_as::<_, ConversationSummary>(
            r#"SELECT conversation_id,
                      MAX(COALESCE(external_timestamp * 1000, created_at)) AS last_activity,
                      COUNT(*) AS message_count
               FROM messages GROUP BY conversation_id ORDER BY last_activity DESC"#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn upsert_contact(
        &self,
        phone_number: &str,
        name: Option<&str>,
        notify_name: Option<&str>,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let digits: String = phone_number.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            tracing::debug!(phone_number, "Skipping contact without digits");
            return Ok(());
        }

        sqlx::query(
            r#"INSERT INTO contacts (phone_number, name, notify_name, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(phone_number) DO UPDATE SET
                 name = COALESCE(excluded.name, name),
                 notify_name = COALESCE(excluded.notify_name, notify_name),
                 updated_at = excluded.updated_at"#,
        )
        .bind(&digits)
        .bind(name)
        .bind(notify_name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_contacts(&self) -> Result<Vec<Contact>> {
        Ok(
            sqlx::query_as::<_, Contact>("SELECT * FROM contacts ORDER BY name")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    /// Contact names for each number, matched on the last `suffix_len` digits.
    pub async fn lookup_by_phone_suffixes(
        &self,
        numbers: &[String],
        suffix_len: usize,
    ) -> Result<HashMap<String, String>> {
        let mut names = HashMap::new();

        for number in numbers {
            let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                continue;
            }
            let suffix = &digits[digits.len().saturating_sub(suffix_len)..];

            let contact = sqlx::query_as::<_, Contact>(
                "SELECT * FROM contacts WHERE phone_number LIKE ? ORDER BY updated_at DESC LIMIT 1",
            )
            .bind(format!("%{}", suffix))
            .fetch_optional(&self.pool)
            .await?;

            if let Some(name) = contact.as_ref().and_then(Contact::display_name) {
                names.insert(number.clone(), name.to_string());
            }
        }

        tracing::debug!(requested = numbers.len(), resolved = names.len(), "Phone suffix lookup");
        Ok(names)
    }
}
