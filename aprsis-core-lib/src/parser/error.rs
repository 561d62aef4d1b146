use thiserror::Error;

/// Closed error taxonomy for [`super::parse`]. Every variant corresponds
/// 1:1 to a label in the `rx_errs` histogram (see [`crate::diagnostics`]);
/// adding a variant here means adding a label there.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid source callsign")]
    InvSrcCall,
    #[error("invalid destination callsign")]
    InvDstCall,
    #[error("invalid third-party packet")]
    Inv3rdParty,
    #[error("message to disallowed recipient")]
    DisMsgDst,
    #[error("DX cluster spot, not relayed")]
    DisDx,
    #[error("packet too long")]
    PktTooLong,
    #[error("packet too short")]
    PktTooShort,
    #[error("no colon separating path and info")]
    NoColon,
    #[error("no '>' separating source and destination")]
    NoGt,
    #[error("invalid path")]
    PathInvalid,
}

impl ParseError {
    /// Stable label used both as the `rx_errs` histogram bucket name and in
    /// the live-upgrade file's `rx_errs` compatibility table.
    pub fn label(self) -> &'static str {
        match self {
            ParseError::InvSrcCall => "INV_SRCCALL",
            ParseError::InvDstCall => "INV_DSTCALL",
            ParseError::Inv3rdParty => "INV_3RD_PARTY",
            ParseError::DisMsgDst => "DIS_MSG_DST",
            ParseError::DisDx => "DIS_DX",
            ParseError::PktTooLong => "PKT_TOO_LONG",
            ParseError::PktTooShort => "PKT_TOO_SHORT",
            ParseError::NoColon => "NO_COLON",
            ParseError::NoGt => "NO_GT",
            ParseError::PathInvalid => "PATH_INVALID",
        }
    }

    pub const ALL: [ParseError; 10] = [
        ParseError::InvSrcCall,
        ParseError::InvDstCall,
        ParseError::Inv3rdParty,
        ParseError::DisMsgDst,
        ParseError::DisDx,
        ParseError::PktTooLong,
        ParseError::PktTooShort,
        ParseError::NoColon,
        ParseError::NoGt,
        ParseError::PathInvalid,
    ];
}
