use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use chrono::DateTime;
use color_eyre::eyre::{Context, Result, eyre};
use owo_colors::OwoColorize;
use serde::Deserialize;
use trama_core::Message;
use trama_db::TramaDb;
use trama_engine::{
    ConversationSession, DirectoryCache, EngineConfig, RenderedConversation, ThreadKind,
    TimelineEntry,
};

type Session = ConversationSession<TramaDb, TramaDb>;

/// A JSON export is either a flat list of records or a list of pages.
#[derive(Deserialize)]
#[serde(untagged)]
enum MessageExport {
    Pages(Vec<Vec<Message>>),
    Flat(Vec<Message>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactExport {
    phone_number: String,
    name: Option<String>,
    notify_name: Option<String>,
}

struct App {
    db: Arc<TramaDb>,
    cache: Arc<DirectoryCache>,
    config: EngineConfig,
    session: Option<Session>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .from_env_lossy()
                .add_directive("trama_cli=info".parse()?)
                .add_directive("trama_engine=info".parse()?)
                .add_directive("trama_db=info".parse()?),
        )
        .init();

    let config = EngineConfig::load().wrap_err("Failed to load config")?;
    let db = TramaDb::new().await.wrap_err("Failed to open database")?;

    let mut app = App {
        db: Arc::new(db),
        cache: Arc::new(DirectoryCache::new(config.directory_stale_time())),
        config,
        session: None,
    };

    loop {
        print_menu();
        let choice = read_line("Choice: ")?;

        let result = match choice.trim() {
            "1" => import_messages(&app).await,
            "2" => import_contacts(&app).await,
            "3" => list_conversations(&app).await,
            "4" => open_conversation(&mut app).await,
            "5" => load_older(&mut app).await,
            "6" => show_mentions(&app).await,
            "7" => list_contacts(&app).await,
            "0" => {
                println!("👋 Bye");
                break;
            }
            _ => {
                println!("❌ Invalid choice");
                Ok(())
            }
        };

        if let Err(e) = result {
            println!("❌ {:#}", e);
        }
    }

    Ok(())
}

fn print_menu() {
    println!();
    println!("╔════════════════════════════════════╗");
    println!("║         TRAMA CLI - Inbox          ║");
    println!("╠════════════════════════════════════╣");
    println!("║  1. Import Messages (JSON)         ║");
    println!("║  2. Import Contacts (JSON)         ║");
    println!("║  3. List Conversations             ║");
    println!("║  4. Open Conversation              ║");
    println!("║  5. Load Older Page                ║");
    println!("║  6. Show Mentions                  ║");
    println!("║  7. List Contacts                  ║");
    println!("║  0. Exit                           ║");
    println!("╚════════════════════════════════════╝");
}

async fn import_messages(app: &App) -> Result<()> {
    let path = read_line("Messages file: ")?;
    let raw = std::fs::read_to_string(Path::new(path.trim()))
        .wrap_err_with(|| format!("Failed to read {}", path.trim()))?;

    let messages: Vec<Message> = match serde_json::from_str(&raw).wrap_err("Invalid messages JSON")? {
        MessageExport::Pages(pages) => pages.into_iter().flatten().collect(),
        MessageExport::Flat(messages) => messages,
    };

    let count = app.db.insert_messages(&messages).await?;
    println!("✅ Imported {} messages", count);
    Ok(())
}

async fn import_contacts(app: &App) -> Result<()> {
    let path = read_line("Contacts file: ")?;
    let raw = std::fs::read_to_string(Path::new(path.trim()))
        .wrap_err_with(|| format!("Failed to read {}", path.trim()))?;
    let contacts: Vec<ContactExport> = serde_json::from_str(&raw).wrap_err("Invalid contacts JSON")?;

    for contact in &contacts {
        app.db
            .upsert_contact(
                &contact.phone_number,
                contact.name.as_deref(),
                contact.notify_name.as_deref(),
            )
            .await?;
    }
    println!("✅ Imported {} contacts", contacts.len());
    Ok(())
}

async fn list_conversations(app: &App) -> Result<()> {
    let conversations = app.db.list_conversations().await?;

    if conversations.is_empty() {
        println!("📭 No conversations found");
        return Ok(());
    }

    println!("\n💬 Conversations ({}):", conversations.len());
    for (i, conversation) in conversations.iter().enumerate().take(20) {
        println!(
            "  {}. {} ({} messages, last {})",
            i + 1,
            conversation.conversation_id,
            conversation.message_count,
            format_millis(conversation.last_activity)
        );
    }
    if conversations.len() > 20 {
        println!("  ... and {} more", conversations.len() - 20);
    }
    Ok(())
}

async fn list_contacts(app: &App) -> Result<()> {
    let contacts = app.db.get_contacts().await?;

    if contacts.is_empty() {
        println!("📭 No contacts found");
        return Ok(());
    }

    println!("\n📇 Contacts ({}):", contacts.len());
    for contact in contacts.iter().take(20) {
        println!(
            "  • {} ({})",
            contact.display_name().unwrap_or("?"),
            contact.phone_number
        );
    }
    if contacts.len() > 20 {
        println!("  ... and {} more", contacts.len() - 20);
    }
    Ok(())
}

async fn open_conversation(app: &mut App) -> Result<()> {
    let conversation_id = read_line("Conversation ID: ")?;
    let conversation_id = conversation_id.trim();
    if conversation_id.is_empty() {
        return Err(eyre!("Conversation ID is required"));
    }

    let mut session = ConversationSession::new(
        conversation_id,
        ThreadKind::from_chat_handle(conversation_id),
        app.db.clone(),
        app.db.clone(),
        app.cache.clone(),
        app.config.clone(),
    );
    session.load_older().await?;

    print_rendered(&session.render().await);
    app.session = Some(session);
    Ok(())
}

async fn load_older(app: &mut App) -> Result<()> {
    let session = app
        .session
        .as_mut()
        .ok_or_else(|| eyre!("Open a conversation first"))?;

    if !session.has_more() {
        println!("📜 Beginning of conversation");
        return Ok(());
    }

    let count = session.load_older().await?;
    println!("⏳ Loaded {} older messages ({} pages)", count, session.loaded_pages());
    print_rendered(&session.render().await);
    Ok(())
}

async fn show_mentions(app: &App) -> Result<()> {
    let session = app
        .session
        .as_ref()
        .ok_or_else(|| eyre!("Open a conversation first"))?;

    let rendered = session.render().await;
    if rendered.mentions.is_empty() {
        println!("📭 No names known for this conversation");
        return Ok(());
    }

    let mut names: Vec<_> = rendered.mentions.names.iter().collect();
    names.sort();
    println!("\n🏷️  Names ({}):", names.len());
    for (number, name) in names {
        println!("  @{} → {}", number, name);
    }
    Ok(())
}

fn print_rendered(rendered: &RenderedConversation) {
    if rendered.timeline.is_empty() {
        println!("📭 No messages loaded");
        return;
    }

    println!();
    for entry in rendered.timeline.iter() {
        print_entry(entry);
    }
}

fn print_entry(entry: &TimelineEntry) {
    let message = &entry.message;
    let direction = if message.from_me { "→" } else { "←" };
    let time = format_millis(message.sort_key_millis());

    match &entry.participant {
        Some(participant) => {
            let (r, g, b) = hex_rgb(participant.color);
            println!(
                "{} {} {}: {}",
                time.dimmed(),
                direction,
                participant.name.truecolor(r, g, b).bold(),
                preview(message)
            );
        }
        None => println!("{} {} {}", time.dimmed(), direction, preview(message)),
    }

    if let Some(quote) = &entry.resolved_quote {
        let label = if quote.is_ephemeral_source_reply {
            "replied to a status update"
        } else {
            "in reply to"
        };
        let sender = quote.sender_name.as_deref().unwrap_or("");
        println!("    ┆ ↪ {} {} {}", label.italic(), sender, preview(&quote.message));
    }

    if let Some(badges) = &entry.reaction_badges {
        let summary: Vec<String> = badges
            .iter()
            .map(|b| {
                let badge = format!("{} {}", b.emoji, b.count);
                if b.from_me { format!("[{}]", badge) } else { badge }
            })
            .collect();
        println!("    {}", summary.join("  "));
    }
}

fn preview(message: &Message) -> String {
    if let Some(body) = message.body.as_deref().filter(|b| !b.trim().is_empty()) {
        return body.to_string();
    }
    if let Some(caption) = message.caption.as_deref().filter(|c| !c.trim().is_empty()) {
        return format!("[{}] {}", message.kind, caption);
    }
    if let Some(file_name) = message.media.as_ref().and_then(|m| m.file_name.as_deref()) {
        return format!("[{}] {}", message.kind, file_name);
    }
    format!("[{}]", message.kind)
}

fn format_millis(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "?".to_string())
}

fn hex_rgb(color: &str) -> (u8, u8, u8) {
    let hex = color.trim_start_matches('#');
    let channel = |i: usize| {
        hex.get(i..i + 2)
            .and_then(|c| u8::from_str_radix(c, 16).ok())
            .unwrap_or(255)
    };
    (channel(0), channel(2), channel(4))
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_rgb() {
        assert_eq!(hex_rgb("#e57373"), (0xe5, 0x73, 0x73));
        assert_eq!(hex_rgb("bad"), (255, 255, 255));
    }

    #[test]
    fn test_export_accepts_pages_and_flat_lists() {
        let record = r#"{ "id": "m1", "conversationId": "c", "kind": "text", "createdAt": "2024-01-01T00:00:00Z" }"#;

        let pages: MessageExport = serde_json::from_str(&format!("[[{}], [{}]]", record, record)).unwrap();
        assert!(matches!(pages, MessageExport::Pages(p) if p.len() == 2));

        let flat: MessageExport = serde_json::from_str(&format!("[{}]", record)).unwrap();
        assert!(matches!(flat, MessageExport::Flat(m) if m.len() == 1));
    }
}
