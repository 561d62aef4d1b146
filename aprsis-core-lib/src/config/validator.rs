use crate::config::Config;
use crate::error::{CoreError, Result};

/// Free-standing validation pass run once after parsing, before any socket
/// is bound (SPEC_FULL §8 property 9).
pub fn validate_config(cfg: &Config) -> Result<()> {
    if let Some(status_listen) = cfg.status_listen {
        if status_listen == cfg.listen {
            return Err(CoreError::Config(format!(
                "status_listen ({status_listen}) must not collide with listen ({})",
                cfg.listen
            )));
        }
    }

    const VALIDITY_GRACE_SECS: u64 = 300;
    if cfg.lastposition_storetime_secs <= VALIDITY_GRACE_SECS {
        return Err(CoreError::Config(format!(
            "lastposition_storetime_secs ({}) must exceed the {VALIDITY_GRACE_SECS}s lookup validity grace",
            cfg.lastposition_storetime_secs
        )));
    }

    if cfg.dedup_window_secs == 0 {
        return Err(CoreError::Config("dedup_window_secs must be > 0".to_string()));
    }

    if cfg.max_packet_len == 0 {
        return Err(CoreError::Config("max_packet_len must be > 0".to_string()));
    }

    if let Some(parent) = cfg.live_upgrade_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CoreError::Config(format!(
                "live_upgrade_path parent directory does not exist: {}",
                parent.display()
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggingConfig;
    use std::path::PathBuf;

    fn base_config() -> Config {
        Config {
            listen: "0.0.0.0:14580".parse().unwrap(),
            server_id: "TESTSRV".to_string(),
            server_callsign: "N0CALL".to_string(),
            status_listen: None,
            dedup_window_secs: 30,
            lastposition_storetime_secs: 1800,
            idle_timeout_secs: 48 * 3600,
            max_write_queue_bytes: 256 * 1024,
            max_packet_len: 512,
            worker_threads: None,
            live_upgrade_path: PathBuf::from("./liveupgrade.json"),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn accepts_default_config() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn rejects_status_listen_colliding_with_listen() {
        let mut cfg = base_config();
        cfg.status_listen = Some(cfg.listen);
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn rejects_storetime_at_or_below_validity_grace() {
        let mut cfg = base_config();
        cfg.lastposition_storetime_secs = 300;
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn rejects_zero_dedup_window() {
        let mut cfg = base_config();
        cfg.dedup_window_secs = 0;
        assert!(validate_config(&cfg).is_err());
    }
}
