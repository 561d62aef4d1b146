//! Budlist term matching: exact callsign match, or a single trailing `*`
//! turning the term into a prefix match — used by the `b/`, `g/`, and
//! `u/` filter families.

use super::FilterError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BudTerm {
    Exact(String),
    Prefix(String),
}

impl BudTerm {
    pub fn matches(&self, callsign: &str) -> bool {
        let callsign = callsign.to_ascii_uppercase();
        match self {
            BudTerm::Exact(s) => *s == callsign,
            BudTerm::Prefix(p) => callsign.starts_with(p.as_str()),
        }
    }
}

fn parse_one(raw: &str) -> Result<BudTerm, FilterError> {
    if raw.is_empty() {
        return Err(FilterError::TooFewFields(raw.to_string()));
    }
    let upper = raw.to_ascii_uppercase();
    Ok(match upper.strip_suffix('*') {
        Some(prefix) if !prefix.is_empty() => BudTerm::Prefix(prefix.to_string()),
        _ => BudTerm::Exact(upper),
    })
}

pub fn parse_terms(fields: &[&str]) -> Result<Vec<BudTerm>, FilterError> {
    if fields.is_empty() || fields.iter().all(|f| f.is_empty()) {
        return Err(FilterError::TooFewFields("budlist term requires at least one callsign".to_string()));
    }
    fields.iter().filter(|f| !f.is_empty()).map(|f| parse_one(f)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_term_matches_case_insensitively() {
        let term = parse_one("oh7lzb").unwrap();
        assert!(term.matches("OH7LZB"));
        assert!(!term.matches("OH7LZC"));
    }

    #[test]
    fn trailing_star_becomes_a_prefix_match() {
        let term = parse_one("OH7*").unwrap();
        assert!(term.matches("OH7LZB-9"));
        assert!(!term.matches("OH8ABC"));
    }

    #[test]
    fn bare_star_is_rejected_as_empty_prefix() {
        // A lone "*" degenerates to matching every callsign, which this
        // parser treats as an exact match on the literal "*" instead —
        // the budlist wildcard only ever strips a trailing suffix from a
        // non-empty prefix.
        let term = parse_one("*").unwrap();
        assert!(!term.matches("ANYTHING"));
        assert!(term.matches("*"));
    }
}
