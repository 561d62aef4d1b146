//! Q-construct path tagging.
//!
//! Every packet that enters the network through a client login gets a
//! `qA*,<server_id>` token appended to its path, recording how it got here.
//! Tagging is idempotent: a packet whose path already carries a `qA*` token
//! (e.g. it arrived from another server that already tagged it) is left
//! alone (SPEC_FULL §8 invariant 11).

/// Which `qA*` token to append, keyed by how the login that originated this
/// packet was verified. `qAC`, `qAS` and `qAo` are reserved for
/// server-to-server peer logins, which this core does not implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QConstruct {
    /// Verified client login (`qAR`).
    VerifiedClient,
    /// Unverified / read-only client login (`qAU`).
    UnverifiedClient,
    /// Malformed login credentials that were still allowed to pass traffic
    /// through (`qAX`).
    Malformed,
}

impl QConstruct {
    fn token(self) -> &'static str {
        match self {
            QConstruct::VerifiedClient => "qAR",
            QConstruct::UnverifiedClient => "qAU",
            QConstruct::Malformed => "qAX",
        }
    }
}

/// Does `path` already carry a Q-construct token?
pub fn already_tagged(path: &[String]) -> bool {
    path.iter().any(|hop| {
        let hop = hop.as_bytes();
        hop.len() >= 3 && hop[0] == b'q' && hop[1].eq_ignore_ascii_case(&b'A')
    })
}

/// Append the appropriate `qA*,<server_id>` pair to `path`, unless it's
/// already tagged. Returns whether a tag was added.
pub fn tag(path: &mut Vec<String>, kind: QConstruct, server_id: &str) -> bool {
    if already_tagged(path) {
        return false;
    }
    path.push(kind.token().to_string());
    path.push(server_id.to_string());
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_untagged_path() {
        let mut path = vec!["WIDE1-1".to_string()];
        assert!(tag(&mut path, QConstruct::VerifiedClient, "TESTSRV"));
        assert_eq!(path, vec!["WIDE1-1", "qAR", "TESTSRV"]);
    }

    #[test]
    fn is_idempotent_when_already_tagged() {
        let mut path = vec!["WIDE1-1".to_string(), "qAR".to_string(), "OTHERSRV".to_string()];
        let before = path.clone();
        assert!(!tag(&mut path, QConstruct::VerifiedClient, "TESTSRV"));
        assert_eq!(path, before);
    }

    #[test]
    fn detects_any_qa_token_case_insensitively() {
        assert!(already_tagged(&["qAo".to_string(), "SERVER".to_string()]));
        assert!(already_tagged(&["QAS".to_string()]));
        assert!(!already_tagged(&["WIDE2-2".to_string()]));
    }

    #[test]
    fn unverified_and_malformed_tokens() {
        let mut a = vec![];
        tag(&mut a, QConstruct::UnverifiedClient, "S1");
        assert_eq!(a, vec!["qAU", "S1"]);

        let mut b = vec![];
        tag(&mut b, QConstruct::Malformed, "S1");
        assert_eq!(b, vec!["qAX", "S1"]);
    }
}
