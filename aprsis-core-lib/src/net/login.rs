//! Login handshake line parsing: `user <callsign> pass <code> vers
//! <software> <version> [filter <expr>]`.

use crate::passcode::LoginVerdict;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub callsign: String,
    pub pass: String,
    pub software: String,
    pub version: String,
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    #[error("malformed login line")]
    Malformed,
}

pub fn parse_login(line: &str) -> Result<LoginRequest, LoginError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 6 {
        return Err(LoginError::Malformed);
    }
    if !tokens[0].eq_ignore_ascii_case("user") {
        return Err(LoginError::Malformed);
    }
    let callsign = tokens[1].to_string();
    if !tokens[2].eq_ignore_ascii_case("pass") {
        return Err(LoginError::Malformed);
    }
    let pass = tokens[3].to_string();
    if !tokens[4].eq_ignore_ascii_case("vers") {
        return Err(LoginError::Malformed);
    }
    let software = tokens.get(5).copied().unwrap_or("unknown").to_string();
    let version = tokens.get(6).copied().unwrap_or("0").to_string();

    let filter = tokens
        .iter()
        .position(|t| t.eq_ignore_ascii_case("filter"))
        .and_then(|pos| tokens.get(pos + 1..))
        .filter(|rest| !rest.is_empty())
        .map(|rest| rest.join(" "));

    Ok(LoginRequest { callsign, pass, software, version, filter })
}

/// Build the `# logresp` reply line for a login attempt.
pub fn logresp_line(callsign: &str, verdict: LoginVerdict, server_id: &str) -> String {
    let status = match verdict {
        LoginVerdict::Verified => "verified",
        LoginVerdict::ReadOnly | LoginVerdict::Unverified | LoginVerdict::Malformed => "unverified",
    };
    format!("# logresp {callsign} {status}, server {server_id}\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_login_line() {
        let req = parse_login("user N0CALL pass -1 vers myapp 1.0").unwrap();
        assert_eq!(req.callsign, "N0CALL");
        assert_eq!(req.pass, "-1");
        assert_eq!(req.software, "myapp");
        assert_eq!(req.version, "1.0");
        assert_eq!(req.filter, None);
    }

    #[test]
    fn parses_login_line_with_filter() {
        let req = parse_login("user N0CALL pass 13023 vers myapp 1.0 filter r/60.0/25.0/50").unwrap();
        assert_eq!(req.filter.as_deref(), Some("r/60.0/25.0/50"));
    }

    #[test]
    fn rejects_missing_keywords() {
        assert_eq!(parse_login("hello world"), Err(LoginError::Malformed));
        assert_eq!(parse_login("user N0CALL wrongkw -1 vers x 1"), Err(LoginError::Malformed));
    }

    #[test]
    fn logresp_reports_verified_status() {
        let line = logresp_line("N0CALL", LoginVerdict::Verified, "TESTSRV");
        assert!(line.contains("N0CALL verified"));
        assert!(line.contains("TESTSRV"));
    }

    #[test]
    fn logresp_reports_unverified_for_readonly_and_malformed() {
        assert!(logresp_line("N0CALL", LoginVerdict::ReadOnly, "S").contains("unverified"));
        assert!(logresp_line("N0CALL", LoginVerdict::Malformed, "S").contains("unverified"));
    }
}
