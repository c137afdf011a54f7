//! Email composition: replies and new messages rendered to RFC 5322 MIME.
//!
//! Uses `lettre::message::Message` for standards-compliant MIME generation.

use super::error::{EmailError, EmailResult};
use super::parser::ParsedEmail;

// ── ComposedEmail ───────────────────────────────────────────────────────

/// A composed email ready for SMTP delivery.
#[derive(Debug, Clone)]
pub struct ComposedEmail {
    /// Recipient addresses.
    pub to: Vec<String>,
    /// CC addresses.
    pub cc: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body_text: String,
    /// In-Reply-To header (for threading).
    pub in_reply_to: Option<String>,
    /// References chain (for threading).
    pub references: Vec<String>,
}

// ── compose_reply ───────────────────────────────────────────────────────

/// Compose a reply to an existing email.
///
/// Sets proper `In-Reply-To`, `References`, `Re:` subject prefix,
/// and quotes the original body.
pub fn compose_reply(original: &ParsedEmail, body: &str) -> ComposedEmail {
    // Subject: add "Re: " prefix if not already present.
    let subject = if original
        .subject
        .to_lowercase()
        .starts_with("re:")
    {
        original.subject.clone()
    } else {
        format!("Re: {}", original.subject)
    };

    // Build References chain: original's references + original's message ID.
    let mut references = original.references.clone();
    if !references.contains(&original.message_id) {
        references.push(original.message_id.clone());
    }

    // Quote the original body.
    let quoted = quote_body(original);
    let full_body = format!("{body}\n\n{quoted}");

    ComposedEmail {
        to: vec![original.from.clone()],
        cc: Vec::new(),
        subject,
        body_text: full_body,
        in_reply_to: Some(original.message_id.clone()),
        references,
    }
}

// ── compose_new ─────────────────────────────────────────────────────────

/// Compose a new email (not a reply).
pub fn compose_new(to: Vec<String>, subject: &str, body: &str) -> ComposedEmail {
    ComposedEmail {
        to,
        cc: Vec::new(),
        subject: subject.to_string(),
        body_text: body.to_string(),
        in_reply_to: None,
        references: Vec::new(),
    }
}

// ── to_mime ─────────────────────────────────────────────────────────────

/// Render a `ComposedEmail` to an RFC 5322 MIME string via `lettre`.
pub fn to_mime(email: &ComposedEmail, from: &str) -> EmailResult<String> {
    use lettre::message::header;
    use lettre::message::Message;

    let from_mailbox: lettre::message::Mailbox =
        from.parse().map_err(|e| EmailError::Send {
            message: format!("invalid From address \"{from}\": {e}"),
        })?;

    let mut builder = Message::builder()
        .from(from_mailbox)
        .subject(&email.subject);

    // Add recipients.
    for addr in &email.to {
        let mailbox: lettre::message::Mailbox =
            addr.parse().map_err(|e| EmailError::Send {
                message: format!("invalid To address \"{addr}\": {e}"),
            })?;
        builder = builder.to(mailbox);
    }

    // Add CC.
    for addr in &email.cc {
        let mailbox: lettre::message::Mailbox =
            addr.parse().map_err(|e| EmailError::Send {
                message: format!("invalid Cc address \"{addr}\": {e}"),
            })?;
        builder = builder.cc(mailbox);
    }

    // In-Reply-To header.
    if let Some(ref reply_to) = email.in_reply_to {
        builder = builder.in_reply_to(reply_to.clone());
    }

    // References headers.
    for ref_id in &email.references {
        builder = builder.references(ref_id.clone());
    }

    // Set Content-Type to UTF-8 plain text.
    builder = builder.header(header::ContentType::TEXT_PLAIN);

    let message = builder
        .body(email.body_text.clone())
        .map_err(|e| EmailError::Send {
            message: format!("failed to build MIME message: {e}"),
        })?;

    let formatted = message.formatted();
    String::from_utf8(formatted).map_err(|e| EmailError::Send {
        message: format!("MIME output is not valid UTF-8: {e}"),
    })
}

// ── Helpers ─────────────────────────────────────────────────────────────

/// Quote the original message body for inclusion in a reply.
fn quote_body(original: &ParsedEmail) -> String {
    let sender = original
        .from_display
        .as_deref()
        .unwrap_or(&original.from);

    let body = original
        .body_text
        .as_deref()
        .unwrap_or("[no text]");

    let quoted_lines: String = body
        .lines()
        .map(|line| format!("> {line}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!("On {date}, {sender} wrote:\n{quoted_lines}",
        date = original
            .date
            .map(|ts| format!("{ts}"))
            .unwrap_or_else(|| "[unknown date]".to_string()),
    )
}

// ── Tests ───────────────────────────────────────────────────────────────
