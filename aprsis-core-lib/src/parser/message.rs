//! Message (`:` dispatch) pre-classification: recipient extraction, the
//! NWS-broadcast and telemetry-metadata reclassifications, and the
//! disallowed-recipient deny-list.

use super::error::ParseError;
use super::flags::TypeFlags;

/// Legacy client/service recipient names the original refuses to relay
/// messages to.
const DISALLOWED_RECIPIENTS: &[&str] = &["javaMSG", "JAVATITLE", "JAVATITL2", "USERLIST", "KIPSS"];

pub struct MessageInfo {
    pub recipient: String,
    pub extra_flags: TypeFlags,
}

/// `body` is the info field starting right after the leading `:`.
/// Expects a 9-byte padded recipient followed by `:` at offset 9.
pub fn classify(body: &[u8]) -> Result<MessageInfo, ParseError> {
    if body.len() < 10 || body[9] != b':' {
        return Err(ParseError::PktTooShort);
    }
    let recipient_raw = &body[..9];
    let recipient = String::from_utf8_lossy(recipient_raw).trim_end().to_string();

    if DISALLOWED_RECIPIENTS.iter().any(|&d| d == recipient) {
        return Err(ParseError::DisMsgDst);
    }

    let mut extra_flags = TypeFlags::empty();
    if recipient.starts_with("NWS-") || recipient.starts_with("NWS_") || recipient.starts_with("SKY") {
        extra_flags |= TypeFlags::NWS;
    }

    let payload = &body[10..];
    if starts_with_any(payload, &[b"PARM.", b"UNIT.", b"EQNS.", b"BITS."]) {
        extra_flags |= TypeFlags::TELEMETRY;
    }

    Ok(MessageInfo { recipient, extra_flags })
}

fn starts_with_any(haystack: &[u8], prefixes: &[&[u8]]) -> bool {
    prefixes.iter().any(|p| haystack.starts_with(p))
}

/// Secondary parse for messages addressed to the server's own callsign:
/// pulls the optional `{msgid` tail and recognizes an `ack` prefix.
pub struct ServerMessage {
    pub is_ack: bool,
    pub msg_id: Option<String>,
}

pub fn parse_server_message(payload: &[u8]) -> ServerMessage {
    let text = String::from_utf8_lossy(payload);
    let is_ack = text.starts_with("ack");
    let msg_id = text.rfind('{').map(|i| text[i + 1..].trim_end().to_string());
    ServerMessage { is_ack, msg_id }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s4_disallowed_recipient_is_rejected() {
        // W5XX>JAVA,qAU,WB5AOH::javaMSG  :hello
        let body = b"javaMSG  :hello";
        let err = classify(body).unwrap_err();
        assert_eq!(err, ParseError::DisMsgDst);
    }

    #[test]
    fn nws_prefix_sets_nws_flag() {
        let body = b"NWS-CHI  :severe weather warning";
        let info = classify(body).unwrap();
        assert!(info.extra_flags.contains(TypeFlags::NWS));
    }

    #[test]
    fn telemetry_metadata_line_sets_telemetry_flag() {
        let body = b"N0CALL   :PARM.Volts,Temp";
        let info = classify(body).unwrap();
        assert!(info.extra_flags.contains(TypeFlags::TELEMETRY));
    }

    #[test]
    fn ordinary_recipient_has_no_extra_flags() {
        let body = b"N0CALL   :hello there";
        let info = classify(body).unwrap();
        assert!(info.extra_flags.is_empty());
        assert_eq!(info.recipient, "N0CALL");
    }
}
