//! Textual HTTP decoder
//!
//! Recognizes a single request or response head. The first line must have
//! exactly three space-separated tokens and every following header line
//! must contain a colon, otherwise the whole payload is rejected.

use super::{AppProtocol, AppRecord};

const METHODS: [&str; 9] = [
    "GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "OPTIONS", "TRACE", "PATCH",
];

pub fn parse(payload: &[u8]) -> Option<AppRecord> {
    let text = std::str::from_utf8(payload).ok()?;

    // Only the head matters; a body after the blank line is ignored.
    let head = match text.split_once("\r\n\r\n") {
        Some((head, _)) => head,
        None => text,
    };

    let mut lines = head.split("\r\n").filter(|line| !line.trim().is_empty());
    let first = lines.next()?;

    let parts: Vec<&str> = first.split(' ').collect();
    if parts.len() != 3 {
        return None;
    }

    let mut rec = AppRecord::new(AppProtocol::Http);
    if parts[0].starts_with("HTTP") {
        rec.push("type", "response");
        rec.push("status", format!("{} {}", parts[1], parts[2]));
        rec.push("version", parts[0]);
    } else {
        if !METHODS.contains(&parts[0]) {
            return None;
        }
        rec.push("type", "request");
        rec.push("method", parts[0]);
        rec.push("path", parts[1]);
        rec.push("version", parts[2]);
    }

    for line in lines {
        let (name, value) = line.split_once(':')?;
        rec.push(name.trim(), value.trim());
    }

    Some(rec)
}
