//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the shell starts with zero configuration.
//! Invalid values are logged and ignored.

use std::path::PathBuf;
use std::time::Duration;

use medicore_media::{FlowConfig, WaitingRoomConfig};
use medicore_shared::constants::{
    CALL_ENDED_DISPLAY_SECS, DEVICE_CHECK_ATTEMPTS, DEVICE_CHECK_TIMEOUT_SECS, DOCTOR_READY_SECS,
    LOGIN_LATENCY_MS, REGISTER_LATENCY_MS, RESET_PASSWORD_LATENCY_MS, SESSION_TTL_HOURS,
};

use crate::auth::{AuthConfig, PasswordPolicy};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// SQLite file backing the durable storage tier.
    /// Env: `MEDICORE_DB_PATH`
    /// Default: the platform data directory.
    pub db_path: Option<PathBuf>,

    /// Env: `MEDICORE_AUTH_LATENCY_MS` (applies to login, register and
    /// password reset alike)
    pub login_latency: Duration,
    pub register_latency: Duration,
    pub reset_latency: Duration,

    /// Env: `MEDICORE_PASSWORD_POLICY` (`any` / `verify`)
    /// Default: `any`
    pub password_policy: PasswordPolicy,

    /// Env: `MEDICORE_SESSION_TTL_HOURS`
    pub session_ttl_hours: i64,

    /// How long the simulated doctor takes to become ready.
    /// Env: `MEDICORE_DOCTOR_READY_SECS`
    pub doctor_ready: Duration,

    /// Env: `MEDICORE_CHECK_TIMEOUT_SECS`
    pub check_timeout: Duration,

    /// Env: `MEDICORE_CHECK_ATTEMPTS`
    pub check_attempts: u32,

    /// Env: `MEDICORE_ENDED_DISPLAY_SECS`
    pub ended_display: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            login_latency: Duration::from_millis(LOGIN_LATENCY_MS),
            register_latency: Duration::from_millis(REGISTER_LATENCY_MS),
            reset_latency: Duration::from_millis(RESET_PASSWORD_LATENCY_MS),
            password_policy: PasswordPolicy::AcceptAny,
            session_ttl_hours: SESSION_TTL_HOURS,
            doctor_ready: Duration::from_secs(DOCTOR_READY_SECS),
            check_timeout: Duration::from_secs(DEVICE_CHECK_TIMEOUT_SECS),
            check_attempts: DEVICE_CHECK_ATTEMPTS,
            ended_display: Duration::from_secs(CALL_ENDED_DISPLAY_SECS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("MEDICORE_DB_PATH") {
            if !path.trim().is_empty() {
                config.db_path = Some(PathBuf::from(path));
            }
        }

        if let Some(ms) = parse_var::<u64>(&lookup, "MEDICORE_AUTH_LATENCY_MS") {
            let latency = Duration::from_millis(ms);
            config.login_latency = latency;
            config.register_latency = latency;
            config.reset_latency = latency;
        }

        if let Some(policy) = parse_var::<PasswordPolicy>(&lookup, "MEDICORE_PASSWORD_POLICY") {
            config.password_policy = policy;
        }

        if let Some(hours) = parse_var::<i64>(&lookup, "MEDICORE_SESSION_TTL_HOURS") {
            if hours > 0 {
                config.session_ttl_hours = hours;
            } else {
                tracing::warn!(hours, "MEDICORE_SESSION_TTL_HOURS must be positive, using default");
            }
        }

        if let Some(secs) = parse_var::<u64>(&lookup, "MEDICORE_DOCTOR_READY_SECS") {
            config.doctor_ready = Duration::from_secs(secs);
        }

        if let Some(secs) = parse_var::<u64>(&lookup, "MEDICORE_CHECK_TIMEOUT_SECS") {
            config.check_timeout = Duration::from_secs(secs.max(1));
        }

        if let Some(n) = parse_var::<u32>(&lookup, "MEDICORE_CHECK_ATTEMPTS") {
            config.check_attempts = n.max(1);
        }

        if let Some(secs) = parse_var::<u64>(&lookup, "MEDICORE_ENDED_DISPLAY_SECS") {
            config.ended_display = Duration::from_secs(secs);
        }

        config
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            login_latency: self.login_latency,
            register_latency: self.register_latency,
            reset_latency: self.reset_latency,
            session_ttl: chrono::Duration::hours(self.session_ttl_hours),
            password_policy: self.password_policy,
        }
    }

    pub fn flow_config(&self) -> FlowConfig {
        FlowConfig {
            waiting_room: WaitingRoomConfig {
                check_timeout: self.check_timeout,
                max_attempts: self.check_attempts,
                ..WaitingRoomConfig::default()
            },
            ended_display: self.ended_display,
        }
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid value, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.login_latency, Duration::from_millis(1000));
        assert_eq!(config.register_latency, Duration::from_millis(1500));
        assert_eq!(config.password_policy, PasswordPolicy::AcceptAny);
        assert_eq!(config.session_ttl_hours, 24);
        assert!(config.db_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("MEDICORE_DB_PATH", "/tmp/medicore.db"),
            ("MEDICORE_AUTH_LATENCY_MS", "0"),
            ("MEDICORE_PASSWORD_POLICY", "verify"),
            ("MEDICORE_CHECK_ATTEMPTS", "3"),
            ("MEDICORE_ENDED_DISPLAY_SECS", "1"),
        ]);
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/medicore.db")));
        assert_eq!(config.reset_latency, Duration::ZERO);
        assert_eq!(config.password_policy, PasswordPolicy::Verify);

        let flow = config.flow_config();
        assert_eq!(flow.waiting_room.max_attempts, 3);
        assert_eq!(flow.ended_display, Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = config_from(&[
            ("MEDICORE_AUTH_LATENCY_MS", "soon"),
            ("MEDICORE_PASSWORD_POLICY", "strict"),
            ("MEDICORE_SESSION_TTL_HOURS", "-4"),
        ]);
        assert_eq!(config.login_latency, Duration::from_millis(1000));
        assert_eq!(config.password_policy, PasswordPolicy::AcceptAny);
        assert_eq!(config.auth_config().session_ttl, chrono::Duration::hours(24));
    }
}
