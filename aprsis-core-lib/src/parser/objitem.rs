//! Object (`;`) and item (`)`) decoding: a name, a liveness marker, and
//! (for objects) a timestamp, followed by a position in either textual
//! form.

use super::position::{decode_compressed, decode_uncompressed, Position};

pub struct ObjItem {
    pub name: String,
    pub killed: bool,
    pub pos: Position,
    pub sym_table: u8,
    pub sym_code: u8,
}

/// `body` is the info field after the leading `;`. Name is a fixed 9
/// bytes, terminated by `*` (alive) or `_` (kill); then a 7-byte
/// timestamp ending in `z`, `h`, or `/`; then position.
pub fn decode_object(body: &[u8]) -> Option<ObjItem> {
    if body.len() < 9 + 1 + 7 {
        return None;
    }
    let name_raw = &body[..9];
    let marker = body[9];
    let killed = match marker {
        b'*' => false,
        b'_' => true,
        _ => return None,
    };
    let name = String::from_utf8_lossy(name_raw).trim_end().to_string();

    let ts_end = body[16];
    if !matches!(ts_end, b'z' | b'h' | b'/') {
        return None;
    }

    let pos_body = &body[17..];
    let (pos, sym_table, sym_code) = decode_position_either(pos_body)?;
    Some(ObjItem { name, killed, pos, sym_table, sym_code })
}

/// `body` is the info field after the leading `)`. Name is 3-9 bytes,
/// terminated by `!` (alive) or `_` (kill).
pub fn decode_item(body: &[u8]) -> Option<ObjItem> {
    let term_idx = body.iter().take(10).position(|&b| b == b'!' || b == b'_')?;
    if !(3..=9).contains(&term_idx) {
        return None;
    }
    let name = String::from_utf8_lossy(&body[..term_idx]).trim_end().to_string();
    let killed = body[term_idx] == b'_';
    let pos_body = &body[term_idx + 1..];
    let (pos, sym_table, sym_code) = decode_position_either(pos_body)?;
    Some(ObjItem { name, killed, pos, sym_table, sym_code })
}

fn decode_position_either(body: &[u8]) -> Option<(Position, u8, u8)> {
    if let Some((table, pos, code)) = decode_compressed(body) {
        return Some((pos, table, code));
    }
    if body.len() >= 19 {
        let pos = decode_uncompressed(&body[..19])?;
        let sym_table = body[8];
        let sym_code = *body.get(18)?;
        return Some((pos, sym_table, sym_code));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s2_object_from_spec() {
        // ;LEADER   *111111z4903.50N/07201.75W>
        let body = b"LEADER   *111111z4903.50N/07201.75W>";
        let obj = decode_object(body).expect("valid object");
        assert_eq!(obj.name, "LEADER");
        assert!(!obj.killed);
        assert!((obj.pos.lat.to_degrees() - 49.0583).abs() < 1e-3);
        assert!((obj.pos.lng.to_degrees() - (-72.0292)).abs() < 1e-3);
    }

    #[test]
    fn killed_object_sets_killed_flag() {
        let body = b"LEADER   _111111z4903.50N/07201.75W>";
        let obj = decode_object(body).expect("valid object");
        assert!(obj.killed);
    }

    #[test]
    fn item_decodes_short_name() {
        let body = b"AID!4903.50N/07201.75W>";
        let item = decode_item(body).expect("valid item");
        assert_eq!(item.name, "AID");
        assert!(!item.killed);
    }
}
