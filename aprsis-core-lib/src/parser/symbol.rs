//! Symbol inference from a `GPS`/`SPC`/`SYM`-prefixed destination callsign.
//!
//! Some TNC/igate software encodes the station's symbol in the destination
//! callsign instead of (or in addition to) the info field, e.g. `GPSPY ` or
//! `SYMC05`. The mapping is a closed table of first-letter classes.

/// `dest` is the destination callsign (no `-SSID`). Returns `(sym_table,
/// sym_code)` when the destination encodes a symbol this way.
pub fn infer(dest: &[u8]) -> Option<(u8, u8)> {
    if dest.len() < 5 {
        return None;
    }
    let prefix = &dest[..3];
    if prefix != b"GPS" && prefix != b"SPC" && prefix != b"SYM" {
        return None;
    }
    let class = dest[3];
    let rest = dest[4];
    match class {
        b'B' => Some((b'/', b'!')),
        b'P' if rest.is_ascii_digit() || rest.is_ascii_uppercase() => Some((b'/', digit_or_letter_code(rest)?)),
        b'M' => Some((b'/', b':')),
        b'H' => Some((b'/', b'[')),
        b'L' => Some((b'/', b'a')),
        b'J' => Some((b'/', b'{')),
        b'O' => Some((b'\\', b'!')),
        b'A' if rest.is_ascii_digit() || rest.is_ascii_uppercase() => Some((b'\\', digit_or_letter_code(rest)?)),
        b'N' => Some((b'\\', b':')),
        b'D' => Some((b'\\', b'[')),
        b'S' => Some((b'\\', b'a')),
        b'Q' => Some((b'\\', b'{')),
        b'C' if rest.is_ascii_digit() => Some((b'/', 32 + (rest - b'0'))),
        b'E' if rest.is_ascii_digit() => Some((b'\\', 32 + (rest - b'0'))),
        _ => None,
    }
}

fn digit_or_letter_code(b: u8) -> Option<u8> {
    if b.is_ascii_digit() || b.is_ascii_uppercase() {
        Some(b)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpsb_maps_to_slash_bang() {
        assert_eq!(infer(b"GPSB1"), Some((b'/', b'!')));
    }

    #[test]
    fn non_matching_prefix_returns_none() {
        assert_eq!(infer(b"APRS1"), None);
    }

    #[test]
    fn numeric_c_form_maps_digit_to_code() {
        // C05 -> digit '5' -> code 32 + 5
        assert_eq!(infer(b"SYMC5"), Some((b'/', 32 + 5)));
    }
}
