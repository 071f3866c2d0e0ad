use tracing::debug;
use trama_core::{Message, MessageKind};

/// Drop empty-body text records when at least one text record has a body.
///
/// The provider sometimes emits a second, body-less copy of a text message.
/// When every text record is empty they are all kept so the activity still
/// shows up as placeholders. Other kinds pass through untouched and input
/// order is preserved.
pub fn dedupe(messages: Vec<Message>) -> Vec<Message> {
    let any_text_with_body = messages
        .iter()
        .any(|m| m.kind == MessageKind::Text && !m.has_empty_body());

    if !any_text_with_body {
        return messages;
    }

    let before = messages.len();
    let kept: Vec<Message> = messages
        .into_iter()
        .filter(|m| !(m.kind == MessageKind::Text && m.has_empty_body()))
        .collect();

    if kept.len() != before {
        debug!(dropped = before - kept.len(), "Dropped empty-body text duplicates");
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn text(id: &str, body: Option<&str>) -> Message {
        let mut msg = Message::new(id, "chat", MessageKind::Text, Utc.timestamp_opt(10, 0).unwrap());
        msg.message_id = "false_5511999990000@s.whatsapp.net_ABC".into();
        msg.body = body.map(str::to_string);
        msg
    }

    fn ids(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_keeps_body_bearing_copy() {
        let out = dedupe(vec![text("a", Some("hi")), text("b", None)]);
        assert_eq!(ids(&out), vec!["a"]);
    }

    #[test]
    fn test_keeps_all_empty_copies() {
        let out = dedupe(vec![text("a", None), text("b", Some(""))]);
        assert_eq!(ids(&out), vec!["a", "b"]);
    }

    #[test]
    fn test_non_text_kinds_untouched() {
        let mut image = text("img", None);
        image.kind = MessageKind::Image;
        let out = dedupe(vec![image, text("a", Some("hi")), text("b", None)]);
        assert_eq!(ids(&out), vec!["img", "a"]);
    }

    #[test]
    fn test_idempotent() {
        let input = vec![text("a", Some("hi")), text("b", None), text("c", Some("yo"))];
        let once = dedupe(input);
        let twice = dedupe(once.clone());
        assert_eq!(once, twice);

        let empties = dedupe(vec![text("a", None), text("b", None)]);
        assert_eq!(dedupe(empties.clone()), empties);
    }
}
