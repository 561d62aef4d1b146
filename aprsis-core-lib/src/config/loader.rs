use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{CoreError, Result};

use super::validator::validate_config;

/// Read, parse, and validate a TOML config file. Matches the teacher's
/// `load_from_path` shape: read-to-string, `toml::from_str`, then a
/// free-standing validation pass before the config is handed back.
pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(&p)
        .map_err(|e| CoreError::Config(format!("failed to read config file: {e}")))?;
    let cfg: Config = toml::from_str(&txt)
        .map_err(|e| CoreError::Config(format!("failed to parse config: {e}")))?;

    validate_config(&cfg)?;

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn tmp_path(name: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("aprsis-core-test-{nanos}-{name}.toml"))
    }

    #[test]
    fn loads_minimal_valid_config() {
        let path = tmp_path("minimal");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, r#"listen = "0.0.0.0:14580""#).unwrap();
        writeln!(f, r#"server_id = "TESTSRV""#).unwrap();
        writeln!(f, r#"server_callsign = "N0CALL""#).unwrap();

        let cfg = load_from_path(&path).expect("config should load");
        assert_eq!(cfg.dedup_window_secs, 30);
        assert_eq!(cfg.lastposition_storetime_secs, 1800);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn rejects_missing_file() {
        let err = load_from_path(tmp_path("does-not-exist"));
        assert!(err.is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        let path = tmp_path("malformed");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "this is not valid toml {{{{").unwrap();
        let err = load_from_path(&path);
        assert!(err.is_err());
        fs::remove_file(&path).ok();
    }
}
