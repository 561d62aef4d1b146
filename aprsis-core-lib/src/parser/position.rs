//! Position decoders: uncompressed, compressed (base-91), and validation.
//!
//! Mic-E and NMEA live in their own modules since each has enough
//! idiosyncratic byte-wrangling to earn it; this module holds the two
//! "plain" textual forms plus the shared validation/radian-conversion step
//! every decoder funnels through.

/// A validated position, always in radians with `cos_lat` precomputed
/// (`|cos_lat - cos(lat)| < 1e-6`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
    pub cos_lat: f64,
}

/// Reject out-of-range coordinates and the degenerate zones the original
/// treats as "probably a parser bug, not a real position": near (0,0) and
/// near the poles, tolerance ±0.0001 degrees.
pub fn validate_degrees(lat_deg: f64, lng_deg: f64) -> Option<Position> {
    const TOL: f64 = 0.0001;
    if !(-90.0..=90.0).contains(&lat_deg) || !(-180.0..=180.0).contains(&lng_deg) {
        return None;
    }
    if lat_deg.abs() < TOL && lng_deg.abs() < TOL {
        return None;
    }
    if (lat_deg.abs() - 90.0).abs() < TOL {
        return None;
    }
    let lat = lat_deg.to_radians();
    let lng = lng_deg.to_radians();
    Some(Position { lat, lng, cos_lat: lat.cos() })
}

/// Decode the 18-byte uncompressed form `DDMM.mmH/DDDMM.mmH` (the symbol
/// code that conventionally follows as a 19th byte is read by the caller,
/// not here).
///
/// Whitespace in the low-order minute digits (a common "position
/// ambiguity" marker) is tolerated by substituting fixed digits rather
/// than rejecting the packet, matching the original's ambiguity handling.
pub fn decode_uncompressed(body: &[u8]) -> Option<Position> {
    if body.len() < 18 {
        return None;
    }
    // The 19th byte is the symbol code; callers that care about it read
    // `body[18]` themselves, so a body of exactly 18 bytes (no symbol code
    // yet known) still decodes.
    let mut buf = [0u8; 19];
    let n = body.len().min(19);
    buf[..n].copy_from_slice(&body[..n]);

    // lat degrees [0..2], blank-tolerant; fraction digit [3] also tolerant.
    blank_to(&mut buf, 2, b'3');
    blank_to(&mut buf, 7, b'5');
    blank_to(&mut buf, 12, b'3');
    blank_to(&mut buf, 17, b'5');

    let lat_deg: f64 = parse_digits(&buf[0..2])?;
    let lat_min: f64 = parse_decimal(&buf[2..7])?;
    let ns = buf[7].to_ascii_uppercase();
    if buf[8] != b'/' {
        return None;
    }
    let lng_deg: f64 = parse_digits(&buf[9..12])?;
    let lng_min: f64 = parse_decimal(&buf[12..17])?;
    let ew = buf[17].to_ascii_uppercase();

    let mut lat = lat_deg + lat_min / 60.0;
    let mut lng = lng_deg + lng_min / 60.0;
    match ns {
        b'N' => {}
        b'S' => lat = -lat,
        _ => return None,
    }
    match ew {
        b'E' => {}
        b'W' => lng = -lng,
        _ => return None,
    }
    validate_degrees(lat, lng)
}

fn blank_to(buf: &mut [u8; 19], idx: usize, fallback: u8) {
    if buf[idx] == b' ' {
        buf[idx] = fallback;
    }
}

fn parse_digits(bytes: &[u8]) -> Option<f64> {
    std::str::from_utf8(bytes).ok()?.parse::<f64>().ok()
}

fn parse_decimal(bytes: &[u8]) -> Option<f64> {
    // "MM.mm" — validate the decimal point sits where expected, then parse.
    if bytes.get(2) != Some(&b'.') {
        return None;
    }
    std::str::from_utf8(bytes).ok()?.parse::<f64>().ok()
}

/// Decode the 13-byte compressed form: `sym_table y1y2y3y4 x1x2x3x4 sym_code c s t`.
///
/// Base-91: each byte contributes `(b - 33) * 91^(3-i)`; out-of-range
/// bytes (outside `[0x21, 0x7b]`) invalidate the whole position.
pub fn decode_compressed(body: &[u8]) -> Option<(u8, Position, u8)> {
    if body.len() < 13 {
        return None;
    }
    let sym_table = body[0];
    let y = &body[1..5];
    let x = &body[5..9];
    let sym_code = body[9];
    for &b in y.iter().chain(x.iter()) {
        if !(0x21..=0x7b).contains(&b) {
            return None;
        }
    }
    let n = base91(y);
    let m = base91(x);
    let lat_deg = 90.0 - (n as f64) / 380926.0;
    let lng_deg = -180.0 + (m as f64) / 190463.0;
    let pos = validate_degrees(lat_deg, lng_deg)?;
    Some((sym_table, pos, sym_code))
}

fn base91(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |acc, &b| acc * 91 + (b as u32 - 33))
}
