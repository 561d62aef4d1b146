//! Packet parser and classifier (component C2): turns a raw TNC2 frame
//! into a [`ParsedPacket`] carrying routing metadata and, when present, a
//! decoded position.
//!
//! The parser never rejects a packet merely because it doesn't recognize
//! the body — only the closed [`ParseError`] conditions (bad header,
//! disallowed recipient, DX spot, oversized/undersized frame) cause
//! `parse` to return `Err`. Everything else comes back as a
//! `ParsedPacket` with whatever flags and position could be extracted,
//! possibly none at all.

pub mod error;
pub mod flags;
pub(crate) mod message;
mod mice;
mod nmea;
pub(crate) mod objitem;
pub mod position;
pub mod symbol;

pub use error::ParseError;
pub use flags::TypeFlags;
pub use position::Position;

use crate::tick::{Clock, Tick, WallClock};

const MAX_CALLSIGN_LEN: usize = 9;
const MIN_FRAME_LEN: usize = 10;
const THIRD_PARTY_MAX_DEPTH: u8 = 1;
/// Typical digipeater path depth per §6; a path carrying more hops than
/// this (including the eventual Q-construct pair) is rejected outright
/// rather than silently truncated.
const MAX_PATH_ELEMENTS: usize = 8;

/// The unit passed between every other core component.
#[derive(Debug, Clone)]
pub struct ParsedPacket {
    pub raw: Vec<u8>,
    pub src: String,
    pub dst: String,
    pub path: Vec<String>,
    pub info: Vec<u8>,
    pub flags: TypeFlags,
    pub pos: Option<Position>,
    pub sym_table: u8,
    pub sym_code: u8,
    pub src_name: Option<String>,
    pub dst_name: Option<String>,
    pub arrival_tick: Tick,
    pub arrival_wall: WallClock,
}

impl ParsedPacket {
    pub fn has_pos(&self) -> bool {
        self.pos.is_some()
    }

    /// The callsign filters and the history database should key on: the
    /// object/item name when present, otherwise the wire source callsign.
    pub fn effective_src(&self) -> &str {
        self.src_name.as_deref().unwrap_or(&self.src)
    }
}

pub fn parse(frame: &[u8], max_len: usize, clock: &Clock) -> Result<ParsedPacket, ParseError> {
    parse_inner(frame, max_len, clock, 0)
}

fn parse_inner(
    frame: &[u8],
    max_len: usize,
    clock: &Clock,
    depth: u8,
) -> Result<ParsedPacket, ParseError> {
    let frame = trim_eol(frame);
    if frame.len() > max_len {
        return Err(ParseError::PktTooLong);
    }
    if frame.len() < MIN_FRAME_LEN {
        return Err(ParseError::PktTooShort);
    }

    let gt = frame.iter().position(|&b| b == b'>').ok_or(ParseError::NoGt)?;
    let src = validate_callsign(&frame[..gt], ParseError::InvSrcCall)?;

    let rest = &frame[gt + 1..];
    let colon = rest.iter().position(|&b| b == b':').ok_or(ParseError::NoColon)?;
    let header = &rest[..colon];
    let info = &rest[colon + 1..];

    let mut segments = header.split(|&b| b == b',');
    let dst_raw = segments.next().ok_or(ParseError::PathInvalid)?;
    let dst = validate_callsign(dst_raw, ParseError::InvDstCall)?;
    let path = validate_path(segments)?;

    let mut packet = ParsedPacket {
        raw: frame.to_vec(),
        src,
        dst: dst.clone(),
        path,
        info: info.to_vec(),
        flags: TypeFlags::empty(),
        pos: None,
        sym_table: 0,
        sym_code: 0,
        src_name: None,
        dst_name: None,
        arrival_tick: clock.tick(),
        arrival_wall: clock.wall(),
    };

    if info.starts_with(b"DX de ") {
        return Err(ParseError::DisDx);
    }

    if info.first() == Some(&b'}') {
        if depth >= THIRD_PARTY_MAX_DEPTH {
            return Err(ParseError::Inv3rdParty);
        }
        return parse_third_party(packet, &info[1..], max_len, clock, depth);
    }

    let result = dispatch_body(&dst, info)?;
    apply_body_result(&mut packet, result);

    if !packet.has_pos() {
        last_resort_position_scan(&mut packet);
    }

    if is_cwop(&packet.src) {
        packet.flags |= TypeFlags::CWOP;
    }

    Ok(packet)
}

fn parse_third_party(
    mut outer: ParsedPacket,
    inner_frame: &[u8],
    max_len: usize,
    clock: &Clock,
    depth: u8,
) -> Result<ParsedPacket, ParseError> {
    if outer.path.len() < 2 {
        return Err(ParseError::Inv3rdParty);
    }
    let inner = parse_inner(inner_frame, max_len, clock, depth + 1)
        .map_err(|_| ParseError::Inv3rdParty)?;
    outer.flags = inner.flags | TypeFlags::THIRD_PARTY;
    outer.pos = inner.pos;
    outer.sym_table = inner.sym_table;
    outer.sym_code = inner.sym_code;
    outer.src_name = inner.src_name.or(Some(inner.src));
    outer.dst_name = inner.dst_name;
    Ok(outer)
}

struct BodyResult {
    flags: TypeFlags,
    pos: Option<Position>,
    sym_table: u8,
    sym_code: u8,
    src_name: Option<String>,
    dst_name: Option<String>,
}

impl Default for BodyResult {
    fn default() -> Self {
        BodyResult {
            flags: TypeFlags::empty(),
            pos: None,
            sym_table: 0,
            sym_code: 0,
            src_name: None,
            dst_name: None,
        }
    }
}

fn apply_body_result(packet: &mut ParsedPacket, r: BodyResult) {
    packet.flags = r.flags;
    packet.pos = r.pos;
    packet.sym_table = r.sym_table;
    packet.sym_code = r.sym_code;
    packet.src_name = r.src_name;
    packet.dst_name = r.dst_name;
}

fn dispatch_body(dst: &str, info: &[u8]) -> Result<BodyResult, ParseError> {
    let Some(&first) = info.first() else {
        return Ok(BodyResult::default());
    };

    let mut r = match first {
        b'\'' | b'`' => {
            let mut r = BodyResult::default();
            if let Some((pos, table, code)) = mice::decode(dst.as_bytes(), &info[1..]) {
                r.flags = TypeFlags::POSITION;
                r.pos = Some(pos);
                r.sym_table = table;
                r.sym_code = code;
            }
            r
        }
        b'!' | b'=' => decode_position_body(&info[1..], TypeFlags::POSITION),
        b'/' | b'@' => {
            // 7-byte leading timestamp to skip.
            if info.len() > 8 {
                decode_position_body(&info[8..], TypeFlags::POSITION)
            } else {
                BodyResult::default()
            }
        }
        b'$' => {
            let mut r = BodyResult::default();
            if info.len() > 10 {
                if let Ok(s) = std::str::from_utf8(&info[1..]) {
                    if let Some(pos) = nmea::decode(s) {
                        r.flags = TypeFlags::POSITION;
                        r.pos = Some(pos);
                    } else {
                        r.flags = TypeFlags::POSITION;
                    }
                }
            }
            r
        }
        b':' => {
            let mut r = BodyResult::default();
            let msg = message::classify(&info[1..])?;
            // A telemetry-metadata line reclassifies away from MESSAGE
            // entirely rather than carrying both flags.
            r.flags = if msg.extra_flags.contains(TypeFlags::TELEMETRY) {
                msg.extra_flags
            } else {
                TypeFlags::MESSAGE | msg.extra_flags
            };
            r.dst_name = Some(msg.recipient);
            r
        }
        b';' => {
            let mut r = BodyResult::default();
            if info.len() >= 30 {
                if let Some(obj) = objitem::decode_object(&info[1..]) {
                    r.flags = TypeFlags::OBJECT;
                    r.pos = Some(obj.pos);
                    r.sym_table = obj.sym_table;
                    r.sym_code = obj.sym_code;
                    r.src_name = Some(obj.name);
                    // obj.killed is consumed by the historydb layer, which
                    // re-runs decode_object on the stored packet to evict
                    // the entry rather than threading a field through here.
                }
            }
            r
        }
        b')' => {
            let mut r = BodyResult::default();
            if info.len() > 18 {
                if let Some(item) = objitem::decode_item(&info[1..]) {
                    r.flags = TypeFlags::ITEM;
                    r.pos = Some(item.pos);
                    r.sym_table = item.sym_table;
                    r.sym_code = item.sym_code;
                    r.src_name = Some(item.name);
                }
            }
            r
        }
        b'>' => BodyResult { flags: TypeFlags::STATUS, ..Default::default() },
        b'<' => BodyResult { flags: TypeFlags::STATCAPA, ..Default::default() },
        b'?' => BodyResult { flags: TypeFlags::QUERY, ..Default::default() },
        b'T' => BodyResult { flags: TypeFlags::TELEMETRY, ..Default::default() },
        b'#' | b'*' | b'_' => BodyResult { flags: TypeFlags::WX, ..Default::default() },
        b'{' => BodyResult { flags: TypeFlags::USERDEF, ..Default::default() },
        b'}' => BodyResult { flags: TypeFlags::THIRD_PARTY, ..Default::default() },
        _ => BodyResult::default(),
    };

    if let Some((table, code)) = symbol::infer(dst.as_bytes()) {
        if r.sym_table == 0 {
            r.sym_table = table;
            r.sym_code = code;
        }
    }

    Ok(r)
}

fn decode_position_body(body: &[u8], flag: TypeFlags) -> BodyResult {
    let mut r = BodyResult { flags: flag, ..Default::default() };
    if body.first() == Some(&b'!') {
        // Ultimeter 2000 weather report prefix; no position to extract here.
        r.flags |= TypeFlags::WX;
        return r;
    }
    if let Some((table, pos, code)) = position::decode_compressed(body) {
        r.pos = Some(pos);
        r.sym_table = table;
        r.sym_code = code;
    } else if body.len() >= 19 {
        if let Some(pos) = position::decode_uncompressed(&body[..19]) {
            r.pos = Some(pos);
            r.sym_table = body[8];
            r.sym_code = *body.get(18).unwrap_or(&0);
        }
    }
    r
}

/// Bounded last-resort scan: look for `!` in the first 40 body bytes and
/// try both position encodings at that offset.
fn last_resort_position_scan(packet: &mut ParsedPacket) {
    let scan_len = packet.info.len().min(40);
    let Some(bang) = packet.info[..scan_len].iter().position(|&b| b == b'!') else {
        return;
    };
    let rest = &packet.info[bang + 1..];
    if let Some((table, pos, code)) = position::decode_compressed(rest) {
        packet.pos = Some(pos);
        packet.sym_table = table;
        packet.sym_code = code;
        packet.flags |= TypeFlags::POSITION;
    } else if rest.len() >= 19 {
        if let Some(pos) = position::decode_uncompressed(&rest[..19]) {
            packet.pos = Some(pos);
            packet.sym_table = rest[8];
            packet.sym_code = *rest.get(18).unwrap_or(&0);
            packet.flags |= TypeFlags::POSITION;
        }
    }
}

/// Validate a source or destination callsign, reporting `err` (the
/// caller-appropriate `InvSrcCall`/`InvDstCall` variant) on failure so the
/// two positions stay distinguishable in the `rx_errs` histogram (§7).
fn validate_callsign(raw: &[u8], err: ParseError) -> Result<String, ParseError> {
    if raw.is_empty() || raw.len() > MAX_CALLSIGN_LEN {
        return Err(err);
    }
    if !raw.iter().all(|&b| b.is_ascii_alphanumeric() || b == b'-') {
        return Err(err);
    }
    Ok(String::from_utf8_lossy(raw).to_string())
}

/// Validate the digipeater path: bounded element count (§6), and each
/// element a plausible callsign optionally marked digipeated (`*`) or a
/// Q-construct token (`qAR`, …) — both share the same byte-class as a
/// callsign plus the trailing `*`.
fn validate_path<'a>(segments: impl Iterator<Item = &'a [u8]>) -> Result<Vec<String>, ParseError> {
    let mut path = Vec::new();
    for seg in segments {
        if path.len() >= MAX_PATH_ELEMENTS {
            return Err(ParseError::PathInvalid);
        }
        if seg.is_empty()
            || seg.len() > MAX_CALLSIGN_LEN + 1
            || !seg.iter().all(|&b| b.is_ascii_alphanumeric() || b == b'-' || b == b'*')
        {
            return Err(ParseError::PathInvalid);
        }
        path.push(String::from_utf8_lossy(seg).to_string());
    }
    Ok(path)
}

fn trim_eol(frame: &[u8]) -> &[u8] {
    let mut end = frame.len();
    while end > 0 && (frame[end - 1] == b'\n' || frame[end - 1] == b'\r') {
        end -= 1;
    }
    &frame[..end]
}

/// Heuristic CWOP detection: source callsigns of the form `[CDE]W\d+`
/// identify Citizen Weather Observer Program igates.
fn is_cwop(src: &str) -> bool {
    let bytes = src.as_bytes();
    bytes.len() >= 3
        && matches!(bytes[0], b'C' | b'D' | b'E')
        && bytes[1] == b'W'
        && bytes[2..].iter().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> Clock {
        Clock::new()
    }

    #[test]
    fn s1_uncompressed_position_packet() {
        let frame = b"OH7LZB>APRS,TCPIP*:!6028.51N/02505.68E-Test\r\n";
        let p = parse(frame, 512, &clock()).expect("parses");
        assert!(p.flags.contains(TypeFlags::POSITION));
        assert_eq!(p.src, "OH7LZB");
        assert_eq!(p.sym_table, b'/');
        assert_eq!(p.sym_code, b'-');
        let pos = p.pos.expect("has position");
        assert!((pos.lat.to_degrees() - 60.4752).abs() < 1e-3);
        assert!((pos.lng.to_degrees() - 25.0947).abs() < 1e-3);
    }

    #[test]
    fn s2_object_packet() {
        let frame = b"OH2MQK-1>APRS:;LEADER   *111111z4903.50N/07201.75W>\r\n";
        let p = parse(frame, 512, &clock()).expect("parses");
        assert!(p.flags.contains(TypeFlags::OBJECT));
        assert_eq!(p.src_name.as_deref(), Some("LEADER"));
        let pos = p.pos.expect("has position");
        assert!((pos.lat.to_degrees() - 49.0583).abs() < 1e-3);
        assert!((pos.lng.to_degrees() - (-72.0292)).abs() < 1e-3);
    }

    #[test]
    fn s3_mice_packet_has_valid_position() {
        let frame = "N0CALL>APT310,WIDE2-2:`0<0l #>/\r\n".as_bytes();
        let p = parse(frame, 512, &clock()).expect("parses");
        assert!(p.flags.contains(TypeFlags::POSITION));
        let pos = p.pos.expect("mic-e has a position");
        assert!((-90.0..=90.0).contains(&pos.lat.to_degrees()));
        assert!((-180.0..=180.0).contains(&pos.lng.to_degrees()));
    }

    #[test]
    fn s4_disallowed_message_recipient() {
        let frame = b"W5XX>JAVA,qAU,WB5AOH::javaMSG  :hello\r\n";
        let err = parse(frame, 512, &clock()).unwrap_err();
        assert_eq!(err, ParseError::DisMsgDst);
    }

    #[test]
    fn s5_dx_spot_is_rejected() {
        let frame = b"A>B:DX de xyz\r\n";
        let err = parse(frame, 512, &clock()).unwrap_err();
        assert_eq!(err, ParseError::DisDx);
    }

    #[test]
    fn unrecognized_body_still_forwards_with_empty_flags() {
        let frame = b"N0CALL>APRS::this is not really anything useful here\r\n";
        let p = parse(frame, 512, &clock());
        assert!(p.is_ok());
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let huge = vec![b'A'; 600];
        let err = parse(&huge, 512, &clock()).unwrap_err();
        assert_eq!(err, ParseError::PktTooLong);
    }

    #[test]
    fn missing_gt_is_rejected() {
        let frame = b"NOGTHERE:hello world this is long enough\r\n";
        let err = parse(frame, 512, &clock()).unwrap_err();
        assert_eq!(err, ParseError::NoGt);
    }

    #[test]
    fn oversized_destination_callsign_is_inv_dst_call() {
        let frame = b"N0CALL>WAYTOOLONGCALL:hello world this is long enough\r\n";
        let err = parse(frame, 512, &clock()).unwrap_err();
        assert_eq!(err, ParseError::InvDstCall);
    }

    #[test]
    fn oversized_source_callsign_is_inv_src_call() {
        let frame = b"WAYTOOLONGCALL>APRS:hello world this is long enough\r\n";
        let err = parse(frame, 512, &clock()).unwrap_err();
        assert_eq!(err, ParseError::InvSrcCall);
    }

    #[test]
    fn path_with_too_many_elements_is_rejected() {
        let frame = b"N0CALL>APRS,A,B,C,D,E,F,G,H,I:hello world long enough\r\n";
        let err = parse(frame, 512, &clock()).unwrap_err();
        assert_eq!(err, ParseError::PathInvalid);
    }

    #[test]
    fn path_element_with_bad_byte_is_rejected() {
        let frame = b"N0CALL>APRS,WIDE1-1,bad!hop:hello world this is long\r\n";
        let err = parse(frame, 512, &clock()).unwrap_err();
        assert_eq!(err, ParseError::PathInvalid);
    }

    #[test]
    fn third_party_recursion_is_capped_at_depth_one() {
        let inner = b"SRC>DST,qAR,X:!6028.51N/02505.68E-Test";
        let nested = format!(
            "A>B,X,Y:}}C>D,X,Y:}}{}",
            String::from_utf8_lossy(inner)
        );
        let err = parse(nested.as_bytes(), 512, &clock()).unwrap_err();
        assert_eq!(err, ParseError::Inv3rdParty);
    }
}
