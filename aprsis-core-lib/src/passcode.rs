//! APRS-IS login passcode algorithm (part of C9's login handshake).
//!
//! The passcode is a 16-bit checksum of the callsign (SSID stripped,
//! upper-cased), computed by XOR-folding successive byte pairs into a
//! running hash seeded with a fixed constant. This is the same algorithm
//! every APRS-IS client and server implements; `-1` is the reserved
//! "read-only, don't bother checking" sentinel.

const SEED: i32 = 0x73e2;

/// Compute the expected passcode for `callsign` (SSID, if any, ignored).
pub fn compute(callsign: &str) -> i16 {
    let base = callsign.split('-').next().unwrap_or(callsign).to_ascii_uppercase();
    let mut hash = SEED;
    let mut chars = base.bytes();
    loop {
        let Some(a) = chars.next() else { break };
        hash ^= (a as i32) << 8;
        if let Some(b) = chars.next() {
            hash ^= b as i32;
        }
    }
    (hash & 0x7fff) as i16
}

/// Outcome of validating a login's `pass` argument against its callsign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginVerdict {
    /// `pass -1` (or any value the client opted not to compute): read-only.
    ReadOnly,
    /// The supplied passcode matches the callsign.
    Verified,
    /// The supplied passcode parsed as a number but didn't match.
    Unverified,
    /// The `pass` argument wasn't a valid integer at all.
    Malformed,
}

/// Validate a login's passcode argument (already split off the `pass`
/// keyword) against its claimed callsign.
pub fn validate(callsign: &str, pass: &str) -> LoginVerdict {
    let Ok(supplied) = pass.parse::<i32>() else { return LoginVerdict::Malformed };
    if supplied == -1 {
        return LoginVerdict::ReadOnly;
    }
    if supplied as i16 == compute(callsign) {
        LoginVerdict::Verified
    } else {
        LoginVerdict::Unverified
    }
}
