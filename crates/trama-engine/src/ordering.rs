use trama_core::Message;

/// Oldest first. Provider seconds (scaled to ms) when present, local record
/// time otherwise; equal keys fall back to `created_at`, and the sort is stable.
pub fn sort_chronologically(mut messages: Vec<Message>) -> Vec<Message> {
    messages.sort_by(|a, b| {
        a.sort_key_millis()
            .cmp(&b.sort_key_millis())
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    messages
}
