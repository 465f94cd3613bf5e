//! Textual FTP decoder
//!
//! A line starting with a three-digit code is a server response; otherwise
//! the first four characters must spell a known command. Commands shorter
//! than four characters (CWD, MKD, PWD, RMD) are therefore matched with
//! their trailing space included.

use super::{AppProtocol, AppRecord};

const COMMANDS: [&str; 70] = [
    "ABOR", "ACCT", "ADAT", "ALLO", "APPE", "AUTH", "AVBL", "CCC", "CDUP", "CONF", "CSID", "CWD",
    "DELE", "DSIZ", "ENC", "EPRT", "EPSV", "FEAT", "HELP", "HOST", "LANG", "LIST", "LPRT", "LPSV",
    "MDTM", "MFCT", "MFF", "MFMT", "MIC", "MKD", "MLSD", "MLST", "MODE", "NLST", "NOOP", "OPTS",
    "PASS", "PASV", "PBSZ", "PORT", "PROT", "PWD", "QUIT", "REIN", "REST", "RETR", "RMD", "RMDA",
    "RNFR", "RNTO", "SITE", "SIZE", "SMNT", "SPSV", "STAT", "STOR", "STOU", "STRU", "SYST", "THMB",
    "TYPE", "USER", "XCUP", "XMKD", "XPWD", "XRCP", "XRMD", "XRSQ", "XSEM", "XSEN",
];

pub fn parse(payload: &[u8]) -> Option<AppRecord> {
    let text = std::str::from_utf8(payload).ok()?;

    if text.len() >= 3 && text.is_char_boundary(3) {
        let code = &text[..3];
        if code.bytes().all(|b| b.is_ascii_digit()) {
            let mut rec = AppRecord::new(AppProtocol::Ftp);
            rec.push("type", "response");
            rec.push("code", code);
            rec.push("message", text[3..].trim());
            return Some(rec);
        }
    }

    let command = text.get(..4)?.trim_end();
    if !COMMANDS.contains(&command) {
        return None;
    }

    let mut rec = AppRecord::new(AppProtocol::Ftp);
    rec.push("type", "request");
    rec.push("command", command);
    let parameters = text[4..].trim();
    if !parameters.is_empty() {
        rec.push("parameters", parameters);
    }
    Some(rec)
}
