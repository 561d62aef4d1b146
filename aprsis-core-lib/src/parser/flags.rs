use bitflags::bitflags;

bitflags! {
    /// Closed classification bitset for a [`super::ParsedPacket`].
    ///
    /// A packet can carry more than one flag (a telemetry-metadata line is
    /// reclassified from `MESSAGE` into `MESSAGE | TELEMETRY`, for
    /// instance) so this is a bitset, not an enum.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TypeFlags: u16 {
        const POSITION    = 1 << 0;
        const MESSAGE     = 1 << 1;
        const NWS         = 1 << 2;
        const WX          = 1 << 3;
        const OBJECT      = 1 << 4;
        const ITEM        = 1 << 5;
        const TELEMETRY   = 1 << 6;
        const QUERY       = 1 << 7;
        const STATUS      = 1 << 8;
        const STATCAPA    = 1 << 9;
        const USERDEF     = 1 << 10;
        const THIRD_PARTY = 1 << 11;
        const CWOP        = 1 << 12;
    }
}

impl TypeFlags {
    /// Union of every concrete flag; used as the initial, unrefined
    /// classification before dispatch narrows it down.
    pub const ALL: TypeFlags = TypeFlags::from_bits_truncate(
        TypeFlags::POSITION.bits()
            | TypeFlags::MESSAGE.bits()
            | TypeFlags::NWS.bits()
            | TypeFlags::WX.bits()
            | TypeFlags::OBJECT.bits()
            | TypeFlags::ITEM.bits()
            | TypeFlags::TELEMETRY.bits()
            | TypeFlags::QUERY.bits()
            | TypeFlags::STATUS.bits()
            | TypeFlags::STATCAPA.bits()
            | TypeFlags::USERDEF.bits()
            | TypeFlags::THIRD_PARTY.bits()
            | TypeFlags::CWOP.bits(),
    );

    /// Single-letter type-filter codes (`t/` filter term) map onto flags.
    pub fn from_filter_letter(c: char) -> Option<TypeFlags> {
        Some(match c {
            'p' => TypeFlags::POSITION,
            'o' => TypeFlags::OBJECT,
            'i' => TypeFlags::ITEM,
            'm' => TypeFlags::MESSAGE,
            'q' => TypeFlags::QUERY,
            's' => TypeFlags::STATUS,
            't' => TypeFlags::TELEMETRY,
            'u' => TypeFlags::USERDEF,
            'w' => TypeFlags::WX,
            'n' => TypeFlags::NWS,
            'c' => TypeFlags::CWOP,
            _ => return None,
        })
    }
}
