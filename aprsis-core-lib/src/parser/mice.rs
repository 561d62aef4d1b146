//! Mic-E: latitude and status squeezed into the destination callsign field.
//!
//! The destination's first six bytes double as both latitude digits *and*
//! three flag bits (N/S, longitude +100 offset, W/E), selected by which of
//! three letter classes (digit, `A-J`, `P-Y`) or the ambiguity class
//! (`K`/`L`/`Z`) each byte falls into. Per the design note this
//! implementation resolved: the flag bits are
//! read from the byte's class *before* any ambiguity blanking is applied
//! to the digit value, since ambiguity only ever coarsens the latitude
//! digits, never the hemisphere/offset letters.

use super::position::{validate_degrees, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DestClass {
    Digit(u8),
    LetterAJ(u8),
    LetterPY(u8),
    Ambiguous,
}

fn classify(c: u8) -> Option<DestClass> {
    Some(match c.to_ascii_uppercase() {
        b'0'..=b'9' => DestClass::Digit(c - b'0'),
        b'A'..=b'J' => DestClass::LetterAJ(c.to_ascii_uppercase() - b'A'),
        b'P'..=b'Y' => DestClass::LetterPY(c.to_ascii_uppercase() - b'P'),
        b'K' | b'L' | b'Z' => DestClass::Ambiguous,
        _ => return None,
    })
}

fn digit_value(class: DestClass) -> u32 {
    match class {
        DestClass::Digit(d) | DestClass::LetterAJ(d) | DestClass::LetterPY(d) => d as u32,
        // Ambiguous positions coarsen to the same fallback digit the
        // uncompressed-position blank-tolerance uses.
        DestClass::Ambiguous => 5,
    }
}

fn is_letter(class: DestClass) -> bool {
    matches!(class, DestClass::LetterAJ(_) | DestClass::LetterPY(_))
}

const VALID_SYM_TABLE: &[u8] = b"/\\";

fn valid_sym_table_byte(b: u8) -> bool {
    VALID_SYM_TABLE.contains(&b) || b.is_ascii_uppercase() || (b'a'..=b'j').contains(&b)
}

/// Byte-class mask from the expanded spec's Mic-E sub-section: each body
/// byte must fall in a specific range or the packet isn't really Mic-E.
fn body_mask_ok(body: &[u8]) -> bool {
    if body.len() < 8 {
        return false;
    }
    (0x26..=0x7f).contains(&body[0])
        && (0x26..=0x61).contains(&body[1])
        && (0x1c..=0x7f).contains(&body[2])
        && (0x1c..=0x7f).contains(&body[3])
        && (0x1c..=0x7d).contains(&body[4])
        && (0x1c..=0x7f).contains(&body[5])
        && ((0x21..=0x7b).contains(&body[6]) || body[6] == 0x7d)
        && valid_sym_table_byte(body[7])
}

/// Decode a Mic-E packet: `dest` is the destination callsign (without
/// `-SSID`), `body` is the info field *after* the leading `'`/`` ` ``
/// marker byte.
pub fn decode(dest: &[u8], body: &[u8]) -> Option<(Position, u8, u8)> {
    if dest.len() < 6 || !body_mask_ok(body) {
        return None;
    }
    let classes: Vec<DestClass> = dest[..6].iter().copied().map(classify).collect::<Option<_>>()?;

    let north = is_letter(classes[3]);
    let lon_offset_100 = is_letter(classes[4]);
    let west = is_letter(classes[5]);

    let d: Vec<u32> = classes.iter().map(|c| digit_value(*c)).collect();
    let lat_deg = (d[0] * 10 + d[1]) as f64;
    let lat_min = (d[2] * 10 + d[3]) as f64;
    let lat_frac = (d[4] * 10 + d[5]) as f64;
    let mut lat = lat_deg + (lat_min + lat_frac / 100.0) / 60.0;
    if !north {
        lat = -lat;
    }

    let mut lon_deg = body[0] as i32 - 28;
    if lon_offset_100 {
        lon_deg += 100;
    }
    if (180..=189).contains(&lon_deg) {
        lon_deg -= 80;
    } else if (190..=199).contains(&lon_deg) {
        lon_deg -= 190;
    }
    let mut lon_min = body[1] as i32 - 28;
    if lon_min >= 60 {
        lon_min -= 60;
    }
    let lon_frac = (body[2] as i32 - 28).clamp(0, 99);
    let mut lng = lon_deg as f64 + (lon_min as f64 + lon_frac as f64 / 100.0) / 60.0;
    if west {
        lng = -lng;
    }

    let pos = validate_degrees(lat, lng)?;
    let sym_code = body[6];
    let sym_table = body[7];
    Some((pos, sym_table, sym_code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_body_mask_accepts_well_formed_mice_body() {
        // "0<0l #>/" — 8 bytes following the `` ` `` marker.
        let body = b"0<0l #>/";
        assert!(body_mask_ok(body));
    }

    #[test]
    fn decode_produces_a_position_for_s3_style_input() {
        let dest = b"APT310";
        let body = b"0<0l #>/";
        let decoded = decode(dest, body);
        assert!(decoded.is_some());
        let (pos, _table, _code) = decoded.unwrap();
        assert!((-90.0..=90.0).contains(&pos.lat.to_degrees()));
        assert!((-180.0..=180.0).contains(&pos.lng.to_degrees()));
    }

    #[test]
    fn rejects_destination_shorter_than_six_bytes() {
        assert!(decode(b"AB", b"0<0l #>/").is_none());
    }
}
