//! TLS record-header decoder
//!
//! Looks only at the 5-byte record header plus, for handshake records, the
//! first handshake message type. No handshake body parsing.

use super::{AppProtocol, AppRecord};

const CHANGE_CIPHER_SPEC: u8 = 0x14;
const ALERT: u8 = 0x15;
const HANDSHAKE: u8 = 0x16;
const APPLICATION_DATA: u8 = 0x17;

pub fn parse(payload: &[u8]) -> Option<AppRecord> {
    if payload.len() < 5 {
        return None;
    }

    let record_type = match payload[0] {
        HANDSHAKE => handshake_type(*payload.get(5)?),
        ALERT => "Alert".to_string(),
        CHANGE_CIPHER_SPEC => "ChangeCipherSpec".to_string(),
        APPLICATION_DATA => "ApplicationData".to_string(),
        _ => return None,
    };

    let version = version_string(u16::from_be_bytes([payload[1], payload[2]]));
    let length = u16::from_be_bytes([payload[3], payload[4]]);

    let mut rec = AppRecord::new(AppProtocol::Https);
    rec.push("type", record_type);
    rec.push("version", version);
    rec.push("length", length.to_string());
    Some(rec)
}

fn handshake_type(byte: u8) -> String {
    match byte {
        0x01 => "ClientHello".to_string(),
        0x02 => "ServerHello".to_string(),
        other => format!("Handshake(0x{:02X})", other),
    }
}

fn version_string(version: u16) -> String {
    match version {
        0x0301 => "TLS 1.0".to_string(),
        0x0302 => "TLS 1.1".to_string(),
        0x0303 => "TLS 1.2".to_string(),
        0x0304 => "TLS 1.3/DTLS1.3".to_string(),
        other => format!("0x{:04X}", other),
    }
}
