//! Email ingest adapter — platform work items → `EmailThread`.
//!
//! The trigger platform delivers a JSON work item per forwarded email. The
//! payload carries parsed fields (`from`, `subject`, `text`, threading
//! headers) and may instead carry the raw RFC 822 message, which is parsed
//! here with `mail-parser`. A work-item file may hold a single item or an
//! array of items.

use chrono::{DateTime, Utc};
use mail_parser::MessageParser;
use serde::Deserialize;

use crate::error::IngestError;
use crate::pipeline::types::EmailThread;

// ── Payload shapes ──────────────────────────────────────────────────

/// One platform-delivered work item.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkItem {
    #[serde(default)]
    pub email: Option<EmailPayload>,
}

/// Parsed email fields inside a work item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailPayload {
    #[serde(default)]
    pub from: Option<AddressPayload>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub in_reply_to: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
    /// Timestamp as delivered by the platform; format varies, parsed
    /// leniently.
    #[serde(default)]
    pub date: Option<String>,
    /// Raw RFC 822 message, when the platform forwards it unparsed.
    #[serde(default)]
    pub raw: Option<String>,
}

/// Sender address object.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressPayload {
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
}

// ── Parsing ─────────────────────────────────────────────────────────

/// Parse a work-item document: either a single item or an array of items.
pub fn parse_work_items(json_text: &str) -> Result<Vec<WorkItem>, IngestError> {
    let value: serde_json::Value = serde_json::from_str(json_text)
        .map_err(|e| IngestError::MalformedPayload(format!("not valid JSON: {e}")))?;

    let items = match value {
        serde_json::Value::Array(values) => values,
        other => vec![other],
    };

    items
        .into_iter()
        .map(|v| {
            serde_json::from_value(v)
                .map_err(|e| IngestError::MalformedPayload(format!("bad work item shape: {e}")))
        })
        .collect()
}

/// Load and parse a work-item document from a file.
pub fn load_work_items(path: &std::path::Path) -> Result<Vec<WorkItem>, IngestError> {
    let text = std::fs::read_to_string(path)?;
    parse_work_items(&text)
}

/// Build an `EmailThread` from a work item.
///
/// Body resolution order: `text` → `html` (tags stripped) → `raw` (RFC 822
/// parsed). An item without an email object, a sender address, or a
/// non-empty body is rejected.
pub fn thread_from_work_item(item: &WorkItem) -> Result<EmailThread, IngestError> {
    let email = item.email.as_ref().ok_or_else(|| IngestError::MissingInput {
        reason: "work item has no email payload".into(),
    })?;

    let raw_message = email
        .raw
        .as_deref()
        .and_then(|raw| MessageParser::default().parse(raw.as_bytes()));

    let sender = email
        .from
        .as_ref()
        .map(|a| a.address.clone())
        .or_else(|| raw_message.as_ref().and_then(extract_sender))
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| IngestError::MissingInput {
            reason: "no sender address in work item".into(),
        })?;

    let sender_name = email
        .from
        .as_ref()
        .and_then(|a| a.name.clone())
        .filter(|n| !n.trim().is_empty());

    let subject = email
        .subject
        .clone()
        .or_else(|| {
            raw_message
                .as_ref()
                .and_then(|m| m.subject().map(str::to_string))
        })
        .unwrap_or_else(|| "(no subject)".to_string());

    let body = email
        .text
        .clone()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| {
            email
                .html
                .as_deref()
                .map(strip_html)
                .filter(|t| !t.trim().is_empty())
        })
        .or_else(|| {
            raw_message
                .as_ref()
                .and_then(extract_text)
                .filter(|t| !t.trim().is_empty())
        })
        .ok_or_else(|| IngestError::MissingInput {
            reason: "work item email has an empty body".into(),
        })?;

    Ok(EmailThread {
        sender,
        sender_name,
        subject,
        body,
        in_reply_to: email.in_reply_to.clone(),
        references: email.references.clone(),
        received_at: email.date.as_deref().and_then(parse_date),
    })
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Strip HTML tags from content (basic).
pub fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    // Normalize whitespace
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a platform timestamp, trying RFC 3339 then RFC 2822.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .map(|d| d.with_timezone(&Utc))
        .ok()
}

/// Extract the sender address from a parsed raw message.
fn extract_sender(parsed: &mail_parser::Message) -> Option<String> {
    parsed
        .from()
        .and_then(|addr| addr.first())
        .and_then(|a| a.address())
        .map(|s| s.to_string())
}

/// Extract readable text from a parsed raw message, preferring the text
/// part over stripped HTML.
fn extract_text(parsed: &mail_parser::Message) -> Option<String> {
    if let Some(text) = parsed.body_text(0) {
        return Some(text.to_string());
    }
    parsed.body_html(0).map(|html| strip_html(html.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_json(body: &str) -> String {
        format!(
            r#"{{
                "email": {{
                    "from": {{"address": "buyer@example.com", "name": "Buyer"}},
                    "subject": "Invoice #123 overdue",
                    "text": "{body}",
                    "inReplyTo": "<msg-1@example.com>",
                    "references": ["<msg-0@example.com>", "<msg-1@example.com>"],
                    "date": "2024-01-05T10:30:00Z"
                }}
            }}"#
        )
    }

    #[test]
    fn single_item_parses() {
        let items = parse_work_items(&item_json("We will pay by Friday.")).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn array_of_items_parses() {
        let doc = format!("[{}, {}]", item_json("First."), item_json("Second."));
        let items = parse_work_items(&doc).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn invalid_json_is_malformed_payload() {
        let err = parse_work_items("not json").unwrap_err();
        assert!(matches!(err, IngestError::MalformedPayload(_)));
    }

    #[test]
    fn thread_carries_all_fields() {
        let items = parse_work_items(&item_json("We will pay by Friday.")).unwrap();
        let thread = thread_from_work_item(&items[0]).unwrap();

        assert_eq!(thread.sender, "buyer@example.com");
        assert_eq!(thread.sender_name.as_deref(), Some("Buyer"));
        assert_eq!(thread.subject, "Invoice #123 overdue");
        assert_eq!(thread.body, "We will pay by Friday.");
        assert_eq!(thread.in_reply_to.as_deref(), Some("<msg-1@example.com>"));
        assert_eq!(thread.references.len(), 2);
        assert!(thread.received_at.is_some());
    }

    #[test]
    fn missing_email_object_is_missing_input() {
        let items = parse_work_items(r#"{"other": true}"#).unwrap();
        let err = thread_from_work_item(&items[0]).unwrap_err();
        assert!(matches!(err, IngestError::MissingInput { .. }));
    }

    #[test]
    fn empty_body_is_missing_input() {
        let items = parse_work_items(&item_json("   ")).unwrap();
        let err = thread_from_work_item(&items[0]).unwrap_err();
        assert!(matches!(err, IngestError::MissingInput { .. }));
    }

    #[test]
    fn missing_sender_is_missing_input() {
        let items = parse_work_items(
            r#"{"email": {"subject": "Hi", "text": "Body text"}}"#,
        )
        .unwrap();
        let err = thread_from_work_item(&items[0]).unwrap_err();
        assert!(matches!(err, IngestError::MissingInput { .. }));
    }

    #[test]
    fn html_body_falls_back_with_tags_stripped() {
        let items = parse_work_items(
            r#"{"email": {
                "from": {"address": "a@b.com"},
                "subject": "S",
                "html": "<p>We <b>disputed</b> invoice 42.</p>"
            }}"#,
        )
        .unwrap();
        let thread = thread_from_work_item(&items[0]).unwrap();
        assert_eq!(thread.body, "We disputed invoice 42.");
    }

    #[test]
    fn raw_message_falls_back() {
        let raw = "From: Carol <carol@example.com>\r\n\
                   Subject: Statement request\r\n\
                   Content-Type: text/plain\r\n\
                   \r\n\
                   Please send a copy of invoice 77.\r\n";
        let doc = serde_json::json!({"email": {"raw": raw}}).to_string();
        let items = parse_work_items(&doc).unwrap();
        let thread = thread_from_work_item(&items[0]).unwrap();

        assert_eq!(thread.sender, "carol@example.com");
        assert_eq!(thread.subject, "Statement request");
        assert!(thread.body.contains("invoice 77"));
    }

    #[test]
    fn parsed_fields_win_over_raw() {
        let raw = "From: raw@example.com\r\nSubject: Raw subject\r\n\r\nRaw body\r\n";
        let doc = serde_json::json!({"email": {
            "from": {"address": "parsed@example.com"},
            "subject": "Parsed subject",
            "text": "Parsed body",
            "raw": raw
        }})
        .to_string();
        let items = parse_work_items(&doc).unwrap();
        let thread = thread_from_work_item(&items[0]).unwrap();

        assert_eq!(thread.sender, "parsed@example.com");
        assert_eq!(thread.subject, "Parsed subject");
        assert_eq!(thread.body, "Parsed body");
    }

    #[test]
    fn unparseable_date_becomes_none() {
        let doc = r#"{"email": {
            "from": {"address": "a@b.com"},
            "subject": "S",
            "text": "Body",
            "date": "yesterday-ish"
        }}"#;
        let items = parse_work_items(doc).unwrap();
        let thread = thread_from_work_item(&items[0]).unwrap();
        assert!(thread.received_at.is_none());
    }

    #[test]
    fn rfc2822_date_accepted() {
        assert!(parse_date("Fri, 05 Jan 2024 10:30:00 +0000").is_some());
    }

    #[test]
    fn load_work_items_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("work-item.json");
        std::fs::write(&path, item_json("Paying tomorrow.")).unwrap();

        let items = load_work_items(&path).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn load_work_items_missing_file_is_io_error() {
        let err = load_work_items(std::path::Path::new("/no/such/file.json")).unwrap_err();
        assert!(matches!(err, IngestError::Io(_)));
    }

    #[test]
    fn strip_html_basic() {
        assert_eq!(strip_html("<p>Hello</p>"), "Hello");
    }

    #[test]
    fn strip_html_whitespace_normalized() {
        assert_eq!(strip_html("<div>  a   b </div>"), "a b");
    }
}
