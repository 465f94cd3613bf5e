//! Heuristic application-layer classification
//!
//! Each protocol module exposes a single pure decoder over the transport
//! payload bytes. Decoders fail closed: anything that does not match the
//! protocol's structure yields `None` and the next candidate is tried.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod dns;
pub mod ftp;
pub mod http;
pub mod tls;

/// Application protocol recognized in a transport payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppProtocol {
    Dns,
    Http,
    Https,
    Ftp,
}

impl fmt::Display for AppProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppProtocol::Dns => write!(f, "DNS"),
            AppProtocol::Http => write!(f, "HTTP"),
            AppProtocol::Https => write!(f, "HTTPS"),
            AppProtocol::Ftp => write!(f, "FTP"),
        }
    }
}

/// Decoded application-level view of a payload. Attributes keep their
/// insertion order, which is also the display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppRecord {
    pub protocol: AppProtocol,
    pub attributes: Vec<(String, String)>,
}

impl AppRecord {
    pub fn new(protocol: AppProtocol) -> Self {
        Self {
            protocol,
            attributes: Vec::new(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// One-line "name=value; ..." rendering for log and console output.
    pub fn summary(&self) -> String {
        self.attributes
            .iter()
            .map(|(n, v)| format!("{}={}", n, v))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Try the known decoders in fixed order, first match wins.
///
/// The order matters: DNS is the strictest structural check and goes
/// first, HTTP before the permissive TLS record check, and FTP last
/// because it accepts almost any short command-like line.
pub fn classify(payload: &[u8]) -> Option<AppRecord> {
    if payload.is_empty() {
        return None;
    }
    dns::parse(payload)
        .or_else(|| http::parse(payload))
        .or_else(|| tls::parse(payload))
        .or_else(|| ftp::parse(payload))
}
