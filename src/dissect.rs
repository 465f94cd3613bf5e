//! Frame dissector
//!
//! Turns one raw link-layer frame into a [`CapturedPacket`]: a single
//! top-down parse into a [`LayerStack`], then classification under a fixed
//! precedence. ARP outranks everything; inside IP the order is TCP, UDP,
//! ICMP, IGMP. Frames that match none of these are dropped silently.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Instant;

use etherparse::{LinkSlice, NetSlice, SlicedPacket, TransportSlice};
use tracing::trace;

use crate::core::layers::{
    ArpInfo, EthernetInfo, IcmpInfo, Ipv4Info, Ipv6Info, LayerStack, TcpFlags, TcpInfo, UdpInfo,
};
use crate::core::packet::{CapturedPacket, Protocol};
use crate::protocols;

const ETHERTYPE_ARP: u16 = 0x0806;
const ETHERTYPE_VLAN: u16 = 0x8100;
const ETHERTYPE_QINQ: u16 = 0x88A8;
const IP_PROTO_IGMP: u8 = 2;

/// Dissect one raw frame. `started` is the session start instant used for
/// the relative timestamp. Returns `None` for frames outside the known
/// protocol set.
pub fn dissect(id: u64, data: &[u8], started: Instant) -> Option<CapturedPacket> {
    let timestamp_ms = started.elapsed().as_millis() as u64;
    let layers = parse_layers(data);
    classify_layers(id, timestamp_ms, layers)
}

fn classify_layers(id: u64, timestamp_ms: u64, layers: LayerStack) -> Option<CapturedPacket> {
    if let Some(arp) = &layers.arp {
        let (source, destination, length) = (arp.sender_proto, arp.target_proto, arp.length);
        return Some(CapturedPacket {
            id,
            protocol: Protocol::Arp,
            source,
            destination,
            timestamp_ms,
            length,
            ipv6: false,
            layers,
            application: None,
        });
    }

    let (source, destination, ipv6, payload_protocol, payload_len) =
        if let Some(v4) = &layers.ipv4 {
            (
                IpAddr::V4(v4.src_addr),
                IpAddr::V4(v4.dst_addr),
                false,
                v4.payload_protocol,
                v4.payload_len,
            )
        } else if let Some(v6) = &layers.ipv6 {
            (
                IpAddr::V6(v6.src_addr),
                IpAddr::V6(v6.dst_addr),
                true,
                v6.payload_protocol,
                v6.payload_len,
            )
        } else {
            trace!("frame {} has no recognized network layer", id);
            return None;
        };

    let protocol = if layers.tcp.is_some() {
        Protocol::Tcp
    } else if layers.udp.is_some() {
        Protocol::Udp
    } else if layers.icmpv4.is_some() || layers.icmpv6.is_some() {
        Protocol::Icmp
    } else if payload_protocol == IP_PROTO_IGMP {
        Protocol::Igmp
    } else {
        trace!("frame {} carries unclassified protocol {}", id, payload_protocol);
        return None;
    };

    let application = match protocol {
        Protocol::Tcp | Protocol::Udp => {
            layers.transport_payload().and_then(protocols::classify)
        }
        _ => None,
    };

    Some(CapturedPacket {
        id,
        protocol,
        source,
        destination,
        timestamp_ms,
        length: payload_len,
        ipv6,
        layers,
        application,
    })
}

/// Parse every layer the frame carries in one pass.
fn parse_layers(data: &[u8]) -> LayerStack {
    let mut layers = LayerStack {
        raw: data.to_vec(),
        ..Default::default()
    };

    layers.arp = parse_arp(data);

    let sliced = match SlicedPacket::from_ethernet(data) {
        Ok(sliced) => sliced,
        Err(_) => return layers,
    };

    if let Some(LinkSlice::Ethernet2(eth)) = &sliced.link {
        layers.ethernet = Some(EthernetInfo {
            src_mac: eth.source(),
            dst_mac: eth.destination(),
            ether_type: eth.ether_type().0,
        });
    }

    match &sliced.net {
        Some(NetSlice::Ipv4(ipv4)) => {
            let header = ipv4.header();
            let payload = ipv4.payload();
            layers.ipv4 = Some(Ipv4Info {
                src_addr: header.source_addr(),
                dst_addr: header.destination_addr(),
                protocol: header.protocol().0,
                ttl: header.ttl(),
                total_length: header.total_len(),
                payload_protocol: payload.ip_number.0,
                payload_len: payload.payload.len(),
            });
        }
        Some(NetSlice::Ipv6(ipv6)) => {
            let header = ipv6.header();
            let payload = ipv6.payload();
            layers.ipv6 = Some(Ipv6Info {
                src_addr: header.source_addr(),
                dst_addr: header.destination_addr(),
                next_header: header.next_header().0,
                hop_limit: header.hop_limit(),
                payload_protocol: payload.ip_number.0,
                payload_len: payload.payload.len(),
            });
        }
        _ => {}
    }

    match &sliced.transport {
        Some(TransportSlice::Tcp(tcp)) => {
            layers.tcp = Some(TcpInfo {
                src_port: tcp.source_port(),
                dst_port: tcp.destination_port(),
                seq: tcp.sequence_number(),
                ack: tcp.acknowledgment_number(),
                flags: TcpFlags {
                    fin: tcp.fin(),
                    syn: tcp.syn(),
                    rst: tcp.rst(),
                    psh: tcp.psh(),
                    ack: tcp.ack(),
                    urg: tcp.urg(),
                },
                window: tcp.window_size(),
                data_offset: tcp.data_offset(),
                payload: tcp.payload().to_vec(),
            });
        }
        Some(TransportSlice::Udp(udp)) => {
            layers.udp = Some(UdpInfo {
                src_port: udp.source_port(),
                dst_port: udp.destination_port(),
                length: udp.length(),
                payload: udp.payload().to_vec(),
            });
        }
        Some(TransportSlice::Icmpv4(icmp)) => {
            layers.icmpv4 = Some(IcmpInfo {
                icmp_type: icmp.type_u8(),
                code: icmp.code_u8(),
                payload: icmp.payload().to_vec(),
            });
        }
        Some(TransportSlice::Icmpv6(icmp)) => {
            layers.icmpv6 = Some(IcmpInfo {
                icmp_type: icmp.type_u8(),
                code: icmp.code_u8(),
                payload: icmp.payload().to_vec(),
            });
        }
        _ => {}
    }

    layers
}

/// Parse an ARP message out of an Ethernet frame, skipping VLAN tags.
/// Address fields are variable-size; protocol addresses other than IPv4 or
/// IPv6 are not representable and reject the parse.
fn parse_arp(frame: &[u8]) -> Option<ArpInfo> {
    if frame.len() < 14 {
        return None;
    }

    let mut offset = 12;
    let mut ether_type = u16::from_be_bytes([frame[offset], frame[offset + 1]]);
    while ether_type == ETHERTYPE_VLAN || ether_type == ETHERTYPE_QINQ {
        offset += 4;
        if frame.len() < offset + 2 {
            return None;
        }
        ether_type = u16::from_be_bytes([frame[offset], frame[offset + 1]]);
    }
    if ether_type != ETHERTYPE_ARP {
        return None;
    }

    let arp = &frame[offset + 2..];
    if arp.len() < 8 {
        return None;
    }

    let hw_len = arp[4] as usize;
    let proto_len = arp[5] as usize;
    let operation = u16::from_be_bytes([arp[6], arp[7]]);
    let length = 8 + 2 * (hw_len + proto_len);
    if arp.len() < length {
        return None;
    }

    let sender_hw = arp[8..8 + hw_len].to_vec();
    let sender_proto = proto_addr(&arp[8 + hw_len..8 + hw_len + proto_len])?;
    let target_hw = arp[8 + hw_len + proto_len..8 + 2 * hw_len + proto_len].to_vec();
    let target_proto = proto_addr(&arp[8 + 2 * hw_len + proto_len..length])?;

    Some(ArpInfo {
        operation,
        sender_hw,
        sender_proto,
        target_hw,
        target_proto,
        length,
    })
}

fn proto_addr(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => {
            let mut octets = [0u8; 4];
            octets.copy_from_slice(bytes);
            Some(IpAddr::V4(Ipv4Addr::from(octets)))
        }
        16 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(bytes);
            Some(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::AppProtocol;
    use etherparse::PacketBuilder;

    fn dissect_now(data: &[u8]) -> Option<CapturedPacket> {
        dissect(0, data, Instant::now())
    }

    fn arp_request_frame() -> Vec<u8> {
        let mut frame = Vec::new();
        frame.extend_from_slice(&[0xFF; 6]); // broadcast
        frame.extend_from_slice(&[0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
        frame.extend_from_slice(&[0x08, 0x06]); // ARP
        frame.extend_from_slice(&[0x00, 0x01]); // hardware type: ethernet
        frame.extend_from_slice(&[0x08, 0x00]); // protocol type: IPv4
        frame.push(6); // hardware size
        frame.push(4); // protocol size
        frame.extend_from_slice(&[0x00, 0x01]); // request
        frame.extend_from_slice(&[0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
        frame.extend_from_slice(&[192, 168, 1, 1]);
        frame.extend_from_slice(&[0x00; 6]);
        frame.extend_from_slice(&[192, 168, 1, 2]);
        frame
    }

    fn ipv4_frame(protocol: u8, payload: &[u8]) -> Vec<u8> {
        let total_len = (20 + payload.len()) as u16;
        let mut frame = Vec::new();
        frame.extend_from_slice(&[0x02, 0x00, 0x00, 0x00, 0x00, 0x02]);
        frame.extend_from_slice(&[0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
        frame.extend_from_slice(&[0x08, 0x00]); // IPv4
        frame.push(0x45); // version 4, ihl 5
        frame.push(0x00);
        frame.extend_from_slice(&total_len.to_be_bytes());
        frame.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // id, flags
        frame.push(64); // ttl
        frame.push(protocol);
        frame.extend_from_slice(&[0x00, 0x00]); // checksum, not validated
        frame.extend_from_slice(&[10, 0, 0, 1]);
        frame.extend_from_slice(&[10, 0, 0, 2]);
        frame.extend_from_slice(payload);
        frame
    }

    #[test]
    fn test_arp_takes_precedence() {
        let packet = dissect_now(&arp_request_frame()).unwrap();
        assert_eq!(packet.protocol, Protocol::Arp);
        assert_eq!(packet.source.to_string(), "192.168.1.1");
        assert_eq!(packet.destination.to_string(), "192.168.1.2");
        assert_eq!(packet.length, 28);
        assert!(!packet.ipv6);
        assert!(packet.layers.arp.as_ref().unwrap().is_request());
    }

    #[test]
    fn test_tcp_with_http_request() {
        let payload = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let builder = PacketBuilder::ethernet2([1; 6], [2; 6])
            .ipv4([192, 168, 1, 5], [93, 184, 216, 34], 64)
            .tcp(40000, 80, 1000, 4096);
        let mut frame = Vec::new();
        builder.write(&mut frame, payload).unwrap();

        let packet = dissect_now(&frame).unwrap();
        assert_eq!(packet.protocol, Protocol::Tcp);
        assert_eq!(packet.source.to_string(), "192.168.1.5");
        assert_eq!(packet.destination.to_string(), "93.184.216.34");
        // TCP header without options plus the payload
        assert_eq!(packet.length, 20 + payload.len());

        let app = packet.application.unwrap();
        assert_eq!(app.protocol, AppProtocol::Http);
        assert_eq!(app.get("method"), Some("GET"));
        assert_eq!(packet.layers.tcp.unwrap().dst_port, 80);
    }

    #[test]
    fn test_udp_with_dns_query() {
        let dns = [
            0x12u8, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x07,
            b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0x03, b'c', b'o', b'm', 0x00, 0x00, 0x01,
            0x00, 0x01,
        ];
        let builder = PacketBuilder::ethernet2([1; 6], [2; 6])
            .ipv4([10, 0, 0, 1], [8, 8, 8, 8], 64)
            .udp(53000, 53);
        let mut frame = Vec::new();
        builder.write(&mut frame, &dns).unwrap();

        let packet = dissect_now(&frame).unwrap();
        assert_eq!(packet.protocol, Protocol::Udp);
        assert_eq!(packet.length, 8 + dns.len());
        let app = packet.application.unwrap();
        assert_eq!(app.protocol, AppProtocol::Dns);
        assert_eq!(app.get("type"), Some("query"));
    }

    #[test]
    fn test_ipv6_udp_sets_flag() {
        let builder = PacketBuilder::ethernet2([1; 6], [2; 6])
            .ipv6([0x20, 0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
                  [0x20, 0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2],
                  64)
            .udp(4000, 4001);
        let mut frame = Vec::new();
        builder.write(&mut frame, &[0xAB; 4]).unwrap();

        let packet = dissect_now(&frame).unwrap();
        assert_eq!(packet.protocol, Protocol::Udp);
        assert!(packet.ipv6);
        assert!(packet.source.is_ipv6());
    }

    #[test]
    fn test_icmp_echo() {
        // echo request: type 8, code 0, checksum, id, seq
        let icmp = [8u8, 0, 0, 0, 0, 1, 0, 1];
        let packet = dissect_now(&ipv4_frame(1, &icmp)).unwrap();
        assert_eq!(packet.protocol, Protocol::Icmp);
        assert_eq!(packet.length, 8);
        assert_eq!(packet.layers.icmpv4.unwrap().icmp_type, 8);
        assert!(packet.application.is_none());
    }

    #[test]
    fn test_igmp_membership_report() {
        // IGMPv2 membership report for 224.0.0.251
        let igmp = [0x16u8, 0x00, 0x00, 0x00, 224, 0, 0, 251];
        let packet = dissect_now(&ipv4_frame(2, &igmp)).unwrap();
        assert_eq!(packet.protocol, Protocol::Igmp);
        assert_eq!(packet.length, 8);
    }

    #[test]
    fn test_unknown_ip_protocol_dropped() {
        // protocol 253 is reserved for experimentation
        assert!(dissect_now(&ipv4_frame(253, &[0u8; 4])).is_none());
    }

    #[test]
    fn test_garbage_dropped() {
        assert!(dissect_now(&[]).is_none());
        assert!(dissect_now(&[0xDE, 0xAD, 0xBE, 0xEF]).is_none());
    }

    #[test]
    fn test_delivered_ids_are_increasing_subsequence() {
        // Frames keep their capture sequence id whether or not their
        // neighbors dissect, so delivered ids must form a strictly
        // increasing subsequence of the input ids.
        let echo = [8u8, 0, 0, 0, 0, 1, 0, 1];
        let frames: Vec<Vec<u8>> = vec![
            arp_request_frame(),          // survives
            vec![0xDE, 0xAD],             // dropped
            ipv4_frame(1, &echo),         // survives
            ipv4_frame(253, &[0u8; 4]),   // dropped
            arp_request_frame(),          // survives
            Vec::new(),                   // dropped
        ];

        let started = Instant::now();
        let delivered: Vec<u64> = frames
            .iter()
            .enumerate()
            .filter_map(|(id, data)| dissect(id as u64, data, started))
            .map(|packet| packet.id)
            .collect();

        assert_eq!(delivered, [0, 2, 4]);
        assert!(delivered.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_truncated_arp_dropped() {
        let mut frame = arp_request_frame();
        frame.truncate(30);
        assert!(dissect_now(&frame).is_none());
    }
}
