//! Client filter engine (C6): parses a client's login `filter` argument
//! into a small closed term set and evaluates it against each parsed
//! packet to decide whether that client should receive it.
//!
//! A client's filter is the OR of its terms (§4.6); an empty filter
//! matches nothing, which is also how the historical "firehose" behavior
//! is reached in this engine — by configuring `t/poimqstuwnc` explicitly,
//! not as a special-cased empty-filter meaning.

mod budlist;
mod distance;

use std::time::Duration;

use thiserror::Error;

use crate::historydb::HistoryDb;
use crate::parser::{ParsedPacket, Position, TypeFlags};
use crate::tick::Tick;

pub use budlist::BudTerm;
use distance::law_of_cosines_km;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("empty filter term")]
    EmptyTerm,
    #[error("unknown filter letter '{0}'")]
    UnknownLetter(char),
    #[error("malformed number in filter term: {0}")]
    BadNumber(String),
    #[error("filter term has too few fields: {0}")]
    TooFewFields(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterTerm {
    /// `r/lat/lon/dist` — great-circle range around a fixed point.
    Range { lat: f64, lng: f64, cos_lat: f64, dist_km: f64 },
    /// `p/prefix` — callsign prefix match against the effective source.
    Prefix(String),
    /// `b/call1/call2/...` — budlist, exact or trailing-`*` prefix match.
    Budlist(Vec<BudTerm>),
    /// `t/types` — packet type letters.
    Types(TypeFlags),
    /// `m/dist` — message distance from the client's own position.
    MessageDist(f64),
    /// `g/call1/...` — budlist against source or destination.
    Group(Vec<BudTerm>),
    /// `u/call1/...` — budlist against the destination callsign.
    Unproto(Vec<BudTerm>),
}

/// Parse a comma-separated filter expression into its closed term set.
pub fn parse(expr: &str) -> Result<Vec<FilterTerm>, FilterError> {
    expr.split(',')
        .map(str::trim)
        .filter(|tok| !tok.is_empty())
        .map(parse_term)
        .collect()
}

fn parse_term(token: &str) -> Result<FilterTerm, FilterError> {
    let mut parts = token.split('/');
    let letter = parts.next().filter(|s| !s.is_empty()).ok_or(FilterError::EmptyTerm)?;
    let rest: Vec<&str> = parts.collect();

    if letter.len() != 1 {
        return Err(FilterError::UnknownLetter(letter.chars().next().unwrap_or('?')));
    }
    let letter = letter.chars().next().unwrap();

    match letter {
        'r' => {
            if rest.len() != 3 {
                return Err(FilterError::TooFewFields(token.to_string()));
            }
            let lat_deg = parse_f64(rest[0])?;
            let lng_deg = parse_f64(rest[1])?;
            let dist_km = parse_f64(rest[2])?;
            if !(-90.0..=90.0).contains(&lat_deg) || !(-180.0..=180.0).contains(&lng_deg) {
                return Err(FilterError::BadNumber(token.to_string()));
            }
            let lat = lat_deg.to_radians();
            Ok(FilterTerm::Range { lat, lng: lng_deg.to_radians(), cos_lat: lat.cos(), dist_km })
        }
        'p' => {
            if rest.is_empty() || rest[0].is_empty() {
                return Err(FilterError::TooFewFields(token.to_string()));
            }
            Ok(FilterTerm::Prefix(rest[0].to_ascii_uppercase()))
        }
        'b' => Ok(FilterTerm::Budlist(budlist::parse_terms(&rest)?)),
        't' => {
            if rest.is_empty() || rest[0].is_empty() {
                return Err(FilterError::TooFewFields(token.to_string()));
            }
            let mut flags = TypeFlags::empty();
            for c in rest[0].chars() {
                flags |= TypeFlags::from_filter_letter(c).ok_or(FilterError::UnknownLetter(c))?;
            }
            Ok(FilterTerm::Types(flags))
        }
        'm' => {
            if rest.is_empty() {
                return Err(FilterError::TooFewFields(token.to_string()));
            }
            Ok(FilterTerm::MessageDist(parse_f64(rest[0])?))
        }
        'g' => Ok(FilterTerm::Group(budlist::parse_terms(&rest)?)),
        'u' => Ok(FilterTerm::Unproto(budlist::parse_terms(&rest)?)),
        other => Err(FilterError::UnknownLetter(other)),
    }
}

fn parse_f64(s: &str) -> Result<f64, FilterError> {
    s.parse::<f64>().map_err(|_| FilterError::BadNumber(s.to_string()))
}

/// Read-only context a filter evaluation needs beyond the packet itself.
pub struct FilterContext<'a> {
    pub history: &'a HistoryDb,
    pub own_pos: Option<Position>,
    pub now: Tick,
    pub lastposition_storetime: Duration,
}

/// Evaluate a client's full filter (the OR of its terms) against one
/// packet. An empty term list always returns `false`.
pub fn evaluate(terms: &[FilterTerm], packet: &ParsedPacket, ctx: &FilterContext) -> bool {
    terms.iter().any(|term| evaluate_term(term, packet, ctx))
}

fn evaluate_term(term: &FilterTerm, packet: &ParsedPacket, ctx: &FilterContext) -> bool {
    match term {
        FilterTerm::Range { lat, lng, cos_lat, dist_km } => packet
            .pos
            .map(|p| law_of_cosines_km(*lat, *cos_lat, *lng, p.lat, p.cos_lat, p.lng) <= *dist_km)
            .unwrap_or(false),
        FilterTerm::Prefix(prefix) => packet.effective_src().to_ascii_uppercase().starts_with(prefix.as_str()),
        FilterTerm::Budlist(terms) => terms.iter().any(|t| t.matches(packet.effective_src())),
        FilterTerm::Types(flags) => packet.flags.intersects(*flags),
        FilterTerm::MessageDist(dist_km) => message_within_distance(*dist_km, packet, ctx),
        FilterTerm::Group(terms) => {
            terms.iter().any(|t| t.matches(packet.effective_src())) || terms.iter().any(|t| t.matches(&packet.dst))
        }
        FilterTerm::Unproto(terms) => terms.iter().any(|t| t.matches(&packet.dst)),
    }
}

fn message_within_distance(dist_km: f64, packet: &ParsedPacket, ctx: &FilterContext) -> bool {
    if !packet.flags.contains(TypeFlags::MESSAGE) {
        return false;
    }
    let Some(own) = ctx.own_pos else { return false };

    let near = |key: &str| {
        ctx.history
            .lookup(key, ctx.now, ctx.lastposition_storetime)
            .map(|e| law_of_cosines_km(own.lat, own.cos_lat, own.lng, e.lat, e.cos_lat, e.lng) <= dist_km)
            .unwrap_or(false)
    };

    if near(packet.effective_src()) {
        return true;
    }
    if let Some(recipient) = packet.dst_name.as_deref() {
        return near(recipient);
    }
    false
}
