//! Decrypted event payload parsing.
//!
//! A decrypted event is JSON; the displayable text is the string at
//! `content.body`. Anything else (not JSON, missing fields, non-string body)
//! yields no body.

use serde::Deserialize;

#[derive(Deserialize)]
struct Event {
    content: Content,
}

#[derive(Deserialize)]
struct Content {
    body: serde_json::Value,
}

/// Text at `content.body`, if the payload has one.
pub fn message_body(plaintext: &str) -> Option<String> {
    let event: Event = serde_json::from_str(plaintext).ok()?;
    match event.content.body {
        serde_json::Value::String(body) => Some(body),
        _ => None,
    }
}
