//! Structural DNS decoder
//!
//! Accepts a payload only when the whole message body is consistent with
//! the DNS wire format: 12-byte header plus every question and resource
//! record the header counts declare. Name compression pointers are
//! followed with a bounded depth.

use std::net::{Ipv4Addr, Ipv6Addr};

use super::{AppProtocol, AppRecord};

/// DNS record types we render by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    A,
    Ns,
    Cname,
    Soa,
    Ptr,
    Mx,
    Txt,
    Aaaa,
    Srv,
    Any,
    Other(u16),
}

impl From<u16> for RecordType {
    fn from(val: u16) -> Self {
        match val {
            1 => RecordType::A,
            2 => RecordType::Ns,
            5 => RecordType::Cname,
            6 => RecordType::Soa,
            12 => RecordType::Ptr,
            15 => RecordType::Mx,
            16 => RecordType::Txt,
            28 => RecordType::Aaaa,
            33 => RecordType::Srv,
            255 => RecordType::Any,
            other => RecordType::Other(other),
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::Ns => write!(f, "NS"),
            RecordType::Cname => write!(f, "CNAME"),
            RecordType::Soa => write!(f, "SOA"),
            RecordType::Ptr => write!(f, "PTR"),
            RecordType::Mx => write!(f, "MX"),
            RecordType::Txt => write!(f, "TXT"),
            RecordType::Aaaa => write!(f, "AAAA"),
            RecordType::Srv => write!(f, "SRV"),
            RecordType::Any => write!(f, "ANY"),
            RecordType::Other(n) => write!(f, "TYPE{}", n),
        }
    }
}

struct Question {
    name: String,
    qtype: RecordType,
}

struct Record {
    name: String,
    rtype: RecordType,
    ttl: u32,
    rdata: String,
}

struct Message {
    is_response: bool,
    rcode: u8,
    questions: Vec<Question>,
    answers: Vec<Record>,
    authorities: Vec<Record>,
    additionals: Vec<Record>,
}

pub fn parse(payload: &[u8]) -> Option<AppRecord> {
    let msg = parse_message(payload)?;

    let mut rec = AppRecord::new(AppProtocol::Dns);
    rec.push("type", if msg.is_response { "response" } else { "query" });
    rec.push("rcode", rcode_name(msg.rcode));
    rec.push("answers", render_records(&msg.answers));
    rec.push("questions", render_questions(&msg.questions));
    rec.push("authorities", render_records(&msg.authorities));
    rec.push("additional", render_records(&msg.additionals));
    Some(rec)
}

fn rcode_name(rcode: u8) -> String {
    match rcode {
        0 => "No Error".to_string(),
        1 => "Format Error".to_string(),
        2 => "Server Failure".to_string(),
        3 => "Name Error".to_string(),
        4 => "Not Implemented".to_string(),
        5 => "Refused".to_string(),
        other => format!("Rcode({})", other),
    }
}

fn render_questions(questions: &[Question]) -> String {
    let inner = questions
        .iter()
        .map(|q| format!("{} {}", q.name, q.qtype))
        .collect::<Vec<_>>()
        .join("; ");
    format!("[{}]", inner)
}

fn render_records(records: &[Record]) -> String {
    let inner = records
        .iter()
        .map(|r| format!("{} {} {} (ttl {})", r.name, r.rtype, r.rdata, r.ttl))
        .collect::<Vec<_>>()
        .join("; ");
    format!("[{}]", inner)
}

fn parse_message(payload: &[u8]) -> Option<Message> {
    if payload.len() < 12 {
        return None;
    }

    let flags = u16::from_be_bytes([payload[2], payload[3]]);
    let is_response = (flags & 0x8000) != 0;
    let rcode = (flags & 0x000F) as u8;

    let qdcount = u16::from_be_bytes([payload[4], payload[5]]) as usize;
    let ancount = u16::from_be_bytes([payload[6], payload[7]]) as usize;
    let nscount = u16::from_be_bytes([payload[8], payload[9]]) as usize;
    let arcount = u16::from_be_bytes([payload[10], payload[11]]) as usize;

    let mut offset = 12;

    let mut questions = Vec::with_capacity(qdcount.min(32));
    for _ in 0..qdcount {
        let (question, next) = parse_question(payload, offset)?;
        questions.push(question);
        offset = next;
    }

    let mut answers = Vec::with_capacity(ancount.min(32));
    for _ in 0..ancount {
        let (record, next) = parse_resource_record(payload, offset)?;
        answers.push(record);
        offset = next;
    }

    let mut authorities = Vec::with_capacity(nscount.min(32));
    for _ in 0..nscount {
        let (record, next) = parse_resource_record(payload, offset)?;
        authorities.push(record);
        offset = next;
    }

    let mut additionals = Vec::with_capacity(arcount.min(32));
    for _ in 0..arcount {
        let (record, next) = parse_resource_record(payload, offset)?;
        additionals.push(record);
        offset = next;
    }

    Some(Message {
        is_response,
        rcode,
        questions,
        answers,
        authorities,
        additionals,
    })
}

fn parse_question(payload: &[u8], offset: usize) -> Option<(Question, usize)> {
    let (name, offset) = parse_name(payload, offset)?;

    if offset + 4 > payload.len() {
        return None;
    }

    let qtype = u16::from_be_bytes([payload[offset], payload[offset + 1]]);

    Some((
        Question {
            name,
            qtype: RecordType::from(qtype),
        },
        offset + 4,
    ))
}

fn parse_resource_record(payload: &[u8], offset: usize) -> Option<(Record, usize)> {
    let (name, offset) = parse_name(payload, offset)?;

    if offset + 10 > payload.len() {
        return None;
    }

    let rtype = u16::from_be_bytes([payload[offset], payload[offset + 1]]);
    let ttl = u32::from_be_bytes([
        payload[offset + 4],
        payload[offset + 5],
        payload[offset + 6],
        payload[offset + 7],
    ]);
    let rdlength = u16::from_be_bytes([payload[offset + 8], payload[offset + 9]]) as usize;

    let rdata_offset = offset + 10;
    if rdata_offset + rdlength > payload.len() {
        return None;
    }

    let rtype = RecordType::from(rtype);
    let rdata = render_rdata(payload, rdata_offset, rdlength, rtype);

    Some((
        Record {
            name,
            rtype,
            ttl,
            rdata,
        },
        rdata_offset + rdlength,
    ))
}

/// Parse a DNS name, following compression pointers with a bounded depth.
/// Returns the name and the offset just past it in the uncompressed stream.
fn parse_name(payload: &[u8], mut offset: usize) -> Option<(String, usize)> {
    let mut name = String::new();
    let mut jumped = false;
    let mut return_offset = offset;
    let mut depth = 0;

    loop {
        if offset >= payload.len() || depth > 10 {
            return None;
        }

        let len = payload[offset] as usize;

        if len == 0 {
            if !jumped {
                return_offset = offset + 1;
            }
            break;
        }

        if len & 0xC0 == 0xC0 {
            if offset + 1 >= payload.len() {
                return None;
            }
            let pointer = (((len & 0x3F) as usize) << 8) | (payload[offset + 1] as usize);
            if !jumped {
                return_offset = offset + 2;
            }
            offset = pointer;
            jumped = true;
            depth += 1;
            continue;
        }

        offset += 1;
        if offset + len > payload.len() {
            return None;
        }

        if !name.is_empty() {
            name.push('.');
        }
        name.push_str(&String::from_utf8_lossy(&payload[offset..offset + len]));
        offset += len;
    }

    Some((name, return_offset))
}

fn render_rdata(payload: &[u8], offset: usize, length: usize, rtype: RecordType) -> String {
    let rdata = &payload[offset..offset + length];

    match rtype {
        RecordType::A if length == 4 => {
            Ipv4Addr::new(rdata[0], rdata[1], rdata[2], rdata[3]).to_string()
        }
        RecordType::Aaaa if length == 16 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(rdata);
            Ipv6Addr::from(octets).to_string()
        }
        RecordType::Cname | RecordType::Ns | RecordType::Ptr => {
            match parse_name(payload, offset) {
                Some((name, _)) => name,
                None => format!("({} bytes)", length),
            }
        }
        RecordType::Mx if length > 2 => {
            let preference = u16::from_be_bytes([rdata[0], rdata[1]]);
            match parse_name(payload, offset + 2) {
                Some((exchange, _)) => format!("{} {}", preference, exchange),
                None => format!("({} bytes)", length),
            }
        }
        RecordType::Txt => {
            let mut txt = String::new();
            let mut pos = 0;
            while pos < length {
                let str_len = rdata[pos] as usize;
                pos += 1;
                if pos + str_len <= length {
                    txt.push_str(&String::from_utf8_lossy(&rdata[pos..pos + str_len]));
                    pos += str_len;
                } else {
                    break;
                }
            }
            txt
        }
        _ => format!("({} bytes)", length),
    }
}
