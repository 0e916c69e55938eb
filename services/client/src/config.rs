use callboard_core::{
    dispatcher::DispatchSettings,
    notification::{DEFAULT_SUMMARY_TOAST_DURATION, DEFAULT_TOAST_DURATION},
    reconciler::DEFAULT_TOOL_EVENT_WINDOW,
    session::SessionSettings,
    watchdog::DEFAULT_AGENT_JOIN_TIMEOUT,
};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub agent_join_timeout: Duration,
    pub tool_error_statuses: HashSet<String>,
    pub tool_event_window: usize,
    pub toast_duration: Duration,
    pub summary_toast_duration: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_level: Level::INFO,
            agent_join_timeout: DEFAULT_AGENT_JOIN_TIMEOUT,
            tool_error_statuses: DispatchSettings::default().error_statuses,
            tool_event_window: DEFAULT_TOOL_EVENT_WINDOW,
            toast_duration: DEFAULT_TOAST_DURATION,
            summary_toast_duration: DEFAULT_SUMMARY_TOAST_DURATION,
        }
    }
}

/// Reads an optional positive integer variable.
fn positive_var<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    let Ok(raw) = std::env::var(name) else {
        return Ok(None);
    };
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Ok(Some(value)),
        _ => Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("'{}' is not a positive integer", raw),
        )),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        let defaults = Self::default();

        let bind_address = match std::env::var("BIND_ADDRESS") {
            Ok(raw) => raw.parse::<SocketAddr>().map_err(|e| {
                ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
            })?,
            Err(_) => defaults.bind_address,
        };

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let agent_join_timeout = positive_var::<u64>("AGENT_JOIN_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.agent_join_timeout);

        let tool_error_statuses = match std::env::var("TOOL_ERROR_STATUSES") {
            Ok(raw) => {
                let statuses: HashSet<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
                if statuses.is_empty() {
                    return Err(ConfigError::InvalidValue(
                        "TOOL_ERROR_STATUSES".to_string(),
                        "at least one status is required".to_string(),
                    ));
                }
                statuses
            }
            Err(_) => defaults.tool_error_statuses,
        };

        let tool_event_window =
            positive_var::<usize>("TOOL_EVENT_WINDOW")?.unwrap_or(defaults.tool_event_window);

        let toast_duration = positive_var::<u64>("TOAST_DURATION_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.toast_duration);
        let summary_toast_duration = positive_var::<u64>("SUMMARY_TOAST_DURATION_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.summary_toast_duration);

        Ok(Self {
            bind_address,
            log_level,
            agent_join_timeout,
            tool_error_statuses,
            tool_event_window,
            toast_duration,
            summary_toast_duration,
        })
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            error_statuses: self.tool_error_statuses.clone(),
            toast_duration: self.toast_duration,
            summary_toast_duration: self.summary_toast_duration,
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            agent_join_timeout: self.agent_join_timeout,
            tool_event_window: self.tool_event_window,
            notice_duration: self.toast_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("RUST_LOG");
            env::remove_var("AGENT_JOIN_TIMEOUT_SECS");
            env::remove_var("TOOL_ERROR_STATUSES");
            env::remove_var("TOOL_EVENT_WINDOW");
            env::remove_var("TOAST_DURATION_MS");
            env::remove_var("SUMMARY_TOAST_DURATION_MS");
        }
    }

    #[test]
    fn test_config_error_display() {
        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        clear_env_vars();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.agent_join_timeout, Duration::from_secs(20));
        assert!(config.tool_error_statuses.contains("conflict"));
        assert!(config.tool_error_statuses.contains("not_found"));
        assert_eq!(config.tool_error_statuses.len(), 2);
        assert_eq!(config.tool_event_window, 6);
        assert_eq!(config.toast_duration, Duration::from_millis(4_000));
        assert_eq!(config.summary_toast_duration, Duration::from_millis(15_000));
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("RUST_LOG", "debug");
            env::set_var("AGENT_JOIN_TIMEOUT_SECS", "45");
            env::set_var("TOOL_ERROR_STATUSES", "conflict, rejected ,,");
            env::set_var("TOOL_EVENT_WINDOW", "10");
            env::set_var("TOAST_DURATION_MS", "2500");
            env::set_var("SUMMARY_TOAST_DURATION_MS", "30000");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.agent_join_timeout, Duration::from_secs(45));
        assert_eq!(
            config.tool_error_statuses,
            HashSet::from(["conflict".to_string(), "rejected".to_string()])
        );
        assert_eq!(config.tool_event_window, 10);

        let session = config.session_settings();
        assert_eq!(session.notice_duration, Duration::from_millis(2_500));
        let dispatch = config.dispatch_settings();
        assert_eq!(dispatch.summary_toast_duration, Duration::from_secs(30));
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }

        let err = Config::from_env().unwrap_err();
        let ConfigError::InvalidValue(var, _) = err;
        assert_eq!(var, "BIND_ADDRESS");
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        let ConfigError::InvalidValue(var, _) = err;
        assert_eq!(var, "RUST_LOG");
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_rejects_zero_timeout_and_empty_status_list() {
        clear_env_vars();
        unsafe {
            env::set_var("AGENT_JOIN_TIMEOUT_SECS", "0");
        }
        let ConfigError::InvalidValue(var, _) = Config::from_env().unwrap_err();
        assert_eq!(var, "AGENT_JOIN_TIMEOUT_SECS");

        clear_env_vars();
        unsafe {
            env::set_var("TOOL_ERROR_STATUSES", " , ");
        }
        let ConfigError::InvalidValue(var, detail) = Config::from_env().unwrap_err();
        assert_eq!(var, "TOOL_ERROR_STATUSES");
        assert!(detail.contains("at least one"));
        clear_env_vars();
    }
}
