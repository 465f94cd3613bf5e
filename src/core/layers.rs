//! Strongly-typed views of the protocol layers found in a captured frame.
//!
//! A [`LayerStack`] is filled during a single top-down parse of the raw
//! frame; nothing here is re-derived from the bytes afterwards.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

/// Ethernet II frame information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EthernetInfo {
    pub src_mac: [u8; 6],
    pub dst_mac: [u8; 6],
    pub ether_type: u16,
}

pub fn format_mac(mac: &[u8]) -> String {
    mac.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// ARP message information
///
/// `length` is the size of the ARP message itself: the fixed 8-byte header
/// plus the four variable-size address fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArpInfo {
    pub operation: u16,
    pub sender_hw: Vec<u8>,
    pub sender_proto: IpAddr,
    pub target_hw: Vec<u8>,
    pub target_proto: IpAddr,
    pub length: usize,
}

impl ArpInfo {
    /// Check if this is an ARP request
    pub fn is_request(&self) -> bool {
        self.operation == 1
    }

    /// Check if this is an ARP reply
    pub fn is_reply(&self) -> bool {
        self.operation == 2
    }
}

/// IPv4 header information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ipv4Info {
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
    pub protocol: u8,
    pub ttl: u8,
    pub total_length: u16,
    /// Protocol number carried by the IP payload.
    pub payload_protocol: u8,
    pub payload_len: usize,
}

/// IPv6 header information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ipv6Info {
    pub src_addr: Ipv6Addr,
    pub dst_addr: Ipv6Addr,
    pub next_header: u8,
    pub hop_limit: u8,
    /// Protocol number carried by the payload after any extension headers.
    pub payload_protocol: u8,
    pub payload_len: usize,
}

/// TCP header flags
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TcpFlags {
    pub fin: bool,
    pub syn: bool,
    pub rst: bool,
    pub psh: bool,
    pub ack: bool,
    pub urg: bool,
}

impl TcpFlags {
    /// Short flag string in the usual capture-tool notation ("SA" for
    /// SYN+ACK).
    pub fn summary(&self) -> String {
        let mut s = String::new();
        if self.fin {
            s.push('F');
        }
        if self.syn {
            s.push('S');
        }
        if self.rst {
            s.push('R');
        }
        if self.psh {
            s.push('P');
        }
        if self.ack {
            s.push('A');
        }
        if self.urg {
            s.push('U');
        }
        s
    }
}

/// TCP segment information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpInfo {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    pub flags: TcpFlags,
    pub window: u16,
    /// Header length in 32-bit words.
    pub data_offset: u8,
    pub payload: Vec<u8>,
}

impl TcpInfo {
    pub fn header_len(&self) -> usize {
        self.data_offset as usize * 4
    }

    /// Check if this is a SYN packet (SYN only, not SYN-ACK)
    pub fn is_syn(&self) -> bool {
        self.flags.syn && !self.flags.ack
    }
}

/// UDP datagram information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdpInfo {
    pub src_port: u16,
    pub dst_port: u16,
    /// Length field from the UDP header (header + payload).
    pub length: u16,
    pub payload: Vec<u8>,
}

/// ICMP message information (v4 and v6 share the shape)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcmpInfo {
    pub icmp_type: u8,
    pub code: u8,
    pub payload: Vec<u8>,
}

/// All layers recognized in one frame, parsed exactly once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayerStack {
    pub ethernet: Option<EthernetInfo>,
    pub arp: Option<ArpInfo>,
    pub ipv4: Option<Ipv4Info>,
    pub ipv6: Option<Ipv6Info>,
    pub tcp: Option<TcpInfo>,
    pub udp: Option<UdpInfo>,
    pub icmpv4: Option<IcmpInfo>,
    pub icmpv6: Option<IcmpInfo>,
    /// The raw frame as delivered by the capture source.
    pub raw: Vec<u8>,
}

impl LayerStack {
    /// Get source port (TCP/UDP only)
    pub fn src_port(&self) -> Option<u16> {
        match (&self.tcp, &self.udp) {
            (Some(tcp), _) => Some(tcp.src_port),
            (None, Some(udp)) => Some(udp.src_port),
            _ => None,
        }
    }

    /// Get destination port (TCP/UDP only)
    pub fn dst_port(&self) -> Option<u16> {
        match (&self.tcp, &self.udp) {
            (Some(tcp), _) => Some(tcp.dst_port),
            (None, Some(udp)) => Some(udp.dst_port),
            _ => None,
        }
    }

    /// The transport payload handed to application classification, if any.
    pub fn transport_payload(&self) -> Option<&[u8]> {
        match (&self.tcp, &self.udp) {
            (Some(tcp), _) => Some(&tcp.payload),
            (None, Some(udp)) => Some(&udp.payload),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_formatting() {
        assert_eq!(
            format_mac(&[0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]),
            "de:ad:be:ef:00:01"
        );
    }

    #[test]
    fn test_tcp_flag_summary() {
        let flags = TcpFlags {
            syn: true,
            ack: true,
            ..Default::default()
        };
        assert_eq!(flags.summary(), "SA");
    }

    #[test]
    fn test_ports_from_udp() {
        let mut layers = LayerStack::default();
        assert_eq!(layers.src_port(), None);
        layers.udp = Some(UdpInfo {
            src_port: 53,
            dst_port: 5353,
            length: 8,
            payload: Vec::new(),
        });
        assert_eq!(layers.src_port(), Some(53));
        assert_eq!(layers.dst_port(), Some(5353));
    }

    #[test]
    fn test_tcp_header_len_and_syn() {
        let tcp = TcpInfo {
            src_port: 40000,
            dst_port: 80,
            seq: 0,
            ack: 0,
            flags: TcpFlags {
                syn: true,
                ..Default::default()
            },
            window: 4096,
            data_offset: 8,
            payload: Vec::new(),
        };
        assert_eq!(tcp.header_len(), 32);
        assert!(tcp.is_syn());
    }

    #[test]
    fn test_arp_operation() {
        let arp = ArpInfo {
            operation: 1,
            sender_hw: vec![0; 6],
            sender_proto: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)),
            target_hw: vec![0; 6],
            target_proto: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 2)),
            length: 28,
        };
        assert!(arp.is_request());
        assert!(!arp.is_reply());
    }
}
