//! NMEA sentence decoding: `$GPGGA`, `$GPGLL`, `$GPRMC`, `$GPWPL`, `$PNTS,1,0`.
//!
//! `$GPGSA`/`$GPVTG`/`$GPGSV` carry no position; they're accepted (success)
//! but yield `None` rather than an error, matching the original's
//! "ignore, don't reject" treatment of non-positional sentence kinds. A
//! malformed positional sentence also yields `None` rather than a parse
//! error — there's no dedicated `rx_errs` label for NMEA specifically, so
//! it falls back to the same "forward with no position" behavior as any
//! other unclassifiable-but-not-invalid packet.

use super::position::validate_degrees;
use super::position::Position;

/// `body` is the info field with the leading `$` already stripped.
pub fn decode(body: &str) -> Option<Position> {
    let fields: Vec<&str> = body.split(',').collect();
    let kind = fields.first().copied().unwrap_or("");
    match kind {
        "GPGGA" => decode_lat_lon_fields(&fields, 2, 4),
        "GPGLL" => decode_lat_lon_fields(&fields, 1, 3),
        "GPWPL" => decode_lat_lon_fields(&fields, 1, 3),
        "GPRMC" => {
            // $GPRMC,time,status,lat,N,lon,E,...
            if fields.get(2) != Some(&"A") {
                return None;
            }
            decode_lat_lon_fields(&fields, 3, 5)
        }
        "PNTS" => {
            if fields.get(1) != Some(&"1") || fields.get(2) != Some(&"0") {
                return None;
            }
            decode_lat_lon_fields(&fields, 3, 5)
        }
        "GPGSA" | "GPVTG" | "GPGSV" => None,
        _ => None,
    }
}

fn decode_lat_lon_fields(fields: &[&str], lat_idx: usize, lon_idx: usize) -> Option<Position> {
    let lat_raw = fields.get(lat_idx)?;
    let ns = fields.get(lat_idx + 1)?.chars().next()?.to_ascii_uppercase();
    let lon_raw = fields.get(lon_idx)?;
    let ew = fields.get(lon_idx + 1)?.chars().next()?.to_ascii_uppercase();

    let mut lat = parse_ddmm(lat_raw, 2)?;
    let mut lng = parse_ddmm(lon_raw, 3)?;
    match ns {
        'N' => {}
        'S' => lat = -lat,
        _ => return None,
    }
    match ew {
        'E' => {}
        'W' => lng = -lng,
        _ => return None,
    }
    validate_degrees(lat, lng)
}

/// Parse `DDMM.mmmm` (or `DDDMM.mmmm` for longitude, `deg_digits = 3`)
/// into decimal degrees.
fn parse_ddmm(raw: &str, deg_digits: usize) -> Option<f64> {
    if raw.len() <= deg_digits {
        return None;
    }
    let deg: f64 = raw[..deg_digits].parse().ok()?;
    let min: f64 = raw[deg_digits..].parse().ok()?;
    Some(deg + min / 60.0)
}
