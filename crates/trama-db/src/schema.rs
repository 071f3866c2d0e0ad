pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS contacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    phone_number TEXT NOT NULL,
    name TEXT,
    notify_name TEXT,
    created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
    updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
    UNIQUE(phone_number)
);

CREATE INDEX IF NOT EXISTS idx_contacts_phone ON contacts(phone_number);

CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY NOT NULL,
    message_id TEXT NOT NULL DEFAULT '',
    conversation_id TEXT NOT NULL,
    kind TEXT NOT NULL DEFAULT 'text',
    created_at INTEGER NOT NULL,
    external_timestamp INTEGER,
    from_me INTEGER NOT NULL DEFAULT 0,
    from_number TEXT,
    participant TEXT,
    body TEXT,
    caption TEXT,
    media_json TEXT,
    location_json TEXT,
    contact_vcard TEXT,
    poll_json TEXT,
    reply_to_message_id TEXT,
    reaction_target_message_id TEXT,
    reaction_emoji TEXT,
    raw_json TEXT
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id);
CREATE INDEX IF NOT EXISTS idx_messages_message_id ON messages(message_id);
"#;
