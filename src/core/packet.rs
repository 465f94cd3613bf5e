//! Dissected packet representation
//!
//! A [`CapturedPacket`] is the record delivered once per frame that could be
//! classified: one headline protocol, endpoint addresses, the full layer
//! stack and the optional application-level record.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use super::layers::LayerStack;
use crate::protocols::AppRecord;

/// Headline protocol of a dissected packet. Exactly one per packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    Arp,
    Tcp,
    Udp,
    Icmp,
    Igmp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Arp => write!(f, "ARP"),
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
            Protocol::Icmp => write!(f, "ICMP"),
            Protocol::Igmp => write!(f, "IGMP"),
        }
    }
}

/// One fully dissected frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedPacket {
    /// Sequence id, 0-based, strictly increasing per session.
    pub id: u64,
    pub protocol: Protocol,
    pub source: IpAddr,
    pub destination: IpAddr,
    /// Milliseconds since the capture session started.
    pub timestamp_ms: u64,
    /// Length of the classified layer: ARP/ICMP/IGMP message size, or the
    /// TCP/UDP header plus payload.
    pub length: usize,
    pub ipv6: bool,
    pub layers: LayerStack,
    pub application: Option<AppRecord>,
}

impl CapturedPacket {
    /// Hex/ASCII dump of the raw frame, 16 bytes per line.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (i, chunk) in self.layers.raw.chunks(16).enumerate() {
            out.push_str(&format!("{:04X}  ", i * 16));
            for j in 0..16 {
                match chunk.get(j) {
                    Some(b) => out.push_str(&format!("{:02X} ", b)),
                    None => out.push_str("   "),
                }
                if j == 7 {
                    out.push(' ');
                }
            }
            out.push(' ');
            for b in chunk {
                out.push(if b.is_ascii_graphic() || *b == b' ' {
                    *b as char
                } else {
                    '.'
                });
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn packet_with_raw(raw: Vec<u8>) -> CapturedPacket {
        CapturedPacket {
            id: 0,
            protocol: Protocol::Udp,
            source: IpAddr::V4(Ipv4Addr::LOCALHOST),
            destination: IpAddr::V4(Ipv4Addr::LOCALHOST),
            timestamp_ms: 0,
            length: 0,
            ipv6: false,
            layers: LayerStack {
                raw,
                ..Default::default()
            },
            application: None,
        }
    }

    #[test]
    fn test_protocol_display() {
        assert_eq!(Protocol::Arp.to_string(), "ARP");
        assert_eq!(Protocol::Igmp.to_string(), "IGMP");
    }

    #[test]
    fn test_dump_offsets_and_ascii() {
        let mut raw = vec![0x41u8; 16];
        raw.push(0x00);
        let dump = packet_with_raw(raw).dump();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0000  41 41"));
        assert!(lines[0].ends_with("AAAAAAAAAAAAAAAA"));
        assert!(lines[1].starts_with("0010  00"));
        assert!(lines[1].ends_with("."));
    }

    #[test]
    fn test_dump_empty_frame() {
        assert_eq!(packet_with_raw(Vec::new()).dump(), "");
    }
}
