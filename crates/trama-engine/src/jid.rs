//! Utilities for picking apart WhatsApp-style handles and composite message ids

/// Routing-domain suffixes a participant handle may carry: classic individual,
/// linked-device individual and generic encodings.
pub const ROUTING_SUFFIXES: [&str; 3] = ["@s.whatsapp.net", "@lid", "@c.us"];

/// Routing target the provider uses for status (broadcast) posts.
pub const STATUS_BROADCAST: &str = "status@broadcast";

/// Extract the stanza id from a composite message id.
///
/// - No `_` at all: nothing to extract.
/// - Four or more segments (group transport): the segment at index 2, unless it
///   looks like a handle (contains `@`).
/// - Otherwise the last segment.
pub fn extract_stanza_id(composite_id: &str) -> Option<&str> {
    if !composite_id.contains('_') {
        return None;
    }

    let segments: Vec<&str> = composite_id.split('_').collect();
    if segments.len() >= 4 {
        let candidate = segments[2];
        if !candidate.is_empty() && !candidate.contains('@') {
            return Some(candidate);
        }
    }

    segments.last().copied().filter(|s| !s.is_empty())
}

/// Every key a record with this composite id can be found by: the full id, its
/// last segment and, for four-segment ids, the segment at index 2.
pub fn lookup_keys(composite_id: &str) -> Vec<&str> {
    let mut keys = Vec::with_capacity(3);
    if composite_id.is_empty() {
        return keys;
    }
    keys.push(composite_id);

    if composite_id.contains('_') {
        let segments: Vec<&str> = composite_id.split('_').collect();
        if let Some(last) = segments.last().copied() {
            if !last.is_empty() && !keys.contains(&last) {
                keys.push(last);
            }
        }
        if segments.len() >= 4 {
            let third = segments[2];
            if !third.is_empty() && !keys.contains(&third) {
                keys.push(third);
            }
        }
    }

    keys
}

/// Strip the routing suffix (and a `:device` qualifier) from a handle so the
/// same contact compares equal whichever transport reported it.
///
/// "5511999990000:12@s.whatsapp.net" -> "5511999990000"
pub fn strip_routing_suffix(handle: &str) -> &str {
    let mut bare = handle.trim();
    for suffix in ROUTING_SUFFIXES {
        if let Some(stripped) = bare.strip_suffix(suffix) {
            bare = stripped;
            break;
        }
    }
    // Linked devices report "<user>:<device>"
    if let Some((user, device)) = bare.split_once(':') {
        if !device.is_empty() && device.chars().all(|c| c.is_ascii_digit()) {
            bare = user;
        }
    }
    bare
}

pub fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// Normalized handle, kept only when it is a plain phone-like number.
pub fn normalized_number(handle: &str) -> Option<&str> {
    let bare = strip_routing_suffix(handle);
    is_numeric(bare).then_some(bare)
}

/// Last `len` digits of a number, the whole thing when it is shorter.
pub fn phone_suffix(number: &str, len: usize) -> &str {
    let start = number.len().saturating_sub(len);
    // Digit strings are ASCII, any index is a char boundary
    number.get(start..).unwrap_or(number)
}

pub fn is_status_broadcast(remote_jid: &str) -> bool {
    remote_jid.trim() == STATUS_BROADCAST
}

/// Format a phone number string for better readability
/// Example: "5511999999999" -> "+55 11 99999-9999"
pub fn format_phone_number(phone: &str) -> String {
    if !is_numeric(phone) {
        return phone.to_string();
    }

    if phone.starts_with("55") && phone.len() >= 12 {
        let country = &phone[0..2];
        let area = &phone[2..4];
        let rest = &phone[4..];

        match rest.len() {
            9 => return format!("+{} {} {}-{}", country, area, &rest[..5], &rest[5..]),
            8 => return format!("+{} {} {}-{}", country, area, &rest[..4], &rest[4..]),
            _ => {}
        }
    }

    if phone.len() > 10 {
        return format!("+{}", phone);
    }

    phone.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stanza_from_individual_id() {
        assert_eq!(extract_stanza_id("false_123@lid_ABC123"), Some("ABC123"));
        assert_eq!(
            extract_stanza_id("true_5511999990000@s.whatsapp.net_3EB0C0FFEE"),
            Some("3EB0C0FFEE")
        );
    }

    #[test]
    fn test_stanza_from_group_id() {
        assert_eq!(
            extract_stanza_id("false_120363000000@g.us_3EB0AA_5511999990000@s.whatsapp.net"),
            Some("3EB0AA")
        );
    }

    #[test]
    fn test_stanza_group_id_with_handle_at_index_two_falls_back_to_last() {
        assert_eq!(
            extract_stanza_id("false_120363000000@g.us_5511999990000@lid_3EB0BB"),
            Some("3EB0BB")
        );
    }

    #[test]
    fn test_stanza_needs_separator() {
        assert_eq!(extract_stanza_id("ABC123"), None);
        assert_eq!(extract_stanza_id("false_123@lid_"), None);
    }

    #[test]
    fn test_empty_segments_are_not_stanza_ids() {
        assert_eq!(extract_stanza_id("false_120363@g.us__3EB0CC"), Some("3EB0CC"));
        assert_eq!(extract_stanza_id("false_120363@g.us___"), None);
        assert_eq!(lookup_keys("false_1@lid_"), vec!["false_1@lid_"]);
    }

    #[test]
    fn test_lookup_keys_cover_both_schemes() {
        assert_eq!(
            lookup_keys("false_g@g.us_STANZA_5511@s.whatsapp.net"),
            vec!["false_g@g.us_STANZA_5511@s.whatsapp.net", "5511@s.whatsapp.net", "STANZA"]
        );
        assert_eq!(lookup_keys("ABC"), vec!["ABC"]);
        assert!(lookup_keys("").is_empty());
    }

    #[test]
    fn test_strip_known_suffixes() {
        assert_eq!(strip_routing_suffix("5511999990000@s.whatsapp.net"), "5511999990000");
        assert_eq!(strip_routing_suffix("123456789@lid"), "123456789");
        assert_eq!(strip_routing_suffix("5511999990000@c.us"), "5511999990000");
        assert_eq!(strip_routing_suffix("5511999990000:7@s.whatsapp.net"), "5511999990000");
        assert_eq!(strip_routing_suffix("120363@g.us"), "120363@g.us");
    }

    #[test]
    fn test_normalized_number_rejects_non_numeric() {
        assert_eq!(normalized_number("5511999990000@lid"), Some("5511999990000"));
        assert_eq!(normalized_number("abc@lid"), None);
        assert_eq!(normalized_number(""), None);
    }

    #[test]
    fn test_phone_suffix() {
        assert_eq!(phone_suffix("5511999990000", 8), "99990000");
        assert_eq!(phone_suffix("1234", 8), "1234");
    }

    #[test]
    fn test_format_brazilian_mobile() {
        assert_eq!(format_phone_number("5511999999999"), "+55 11 99999-9999");
    }

    #[test]
    fn test_format_brazilian_landline() {
        assert_eq!(format_phone_number("551133334444"), "+55 11 3333-4444");
    }

    #[test]
    fn test_format_other_numbers() {
        assert_eq!(format_phone_number("14155550100"), "+14155550100");
        assert_eq!(format_phone_number("12345"), "12345");
        assert_eq!(format_phone_number("abc"), "abc");
    }

    #[test]
    fn test_status_sentinel() {
        assert!(is_status_broadcast("status@broadcast"));
        assert!(!is_status_broadcast("5511999990000@s.whatsapp.net"));
    }
}
