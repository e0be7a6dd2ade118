use chrono::Duration;
use std::{env, path::PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required in production")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: Environment,
    pub data_path: Option<PathBuf>,
    pub session_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let environment = match lookup("SEITON_ENV").as_deref().map(str::trim) {
            None | Some("") | Some("development") | Some("dev") => Environment::Development,
            Some("production") | Some("prod") => Environment::Production,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "SEITON_ENV",
                    value: other.to_string(),
                });
            }
        };

        let port = match lookup("PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value,
            })?,
            None => 8080,
        };

        let data_path = lookup("SEITON_DATA_PATH")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        if data_path.is_none() && environment == Environment::Production {
            return Err(ConfigError::Missing("SEITON_DATA_PATH"));
        }

        let ttl_hours = match lookup("SEITON_SESSION_TTL_HOURS") {
            Some(value) => value
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|hours| (1..=24 * 365).contains(hours))
                .ok_or(ConfigError::Invalid {
                    key: "SEITON_SESSION_TTL_HOURS",
                    value,
                })?,
            None => 24 * 7,
        };

        Ok(Self {
            port,
            environment,
            data_path,
            session_ttl: Duration::hours(ttl_hours),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn development_defaults_without_backend() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.environment, Environment::Development);
        assert!(config.data_path.is_none());
        assert_eq!(config.session_ttl, Duration::hours(168));
    }

    #[test]
    fn production_requires_data_path() {
        assert_eq!(
            config(&[("SEITON_ENV", "production")]).unwrap_err(),
            ConfigError::Missing("SEITON_DATA_PATH")
        );
        let config = config(&[
            ("SEITON_ENV", "production"),
            ("SEITON_DATA_PATH", "/var/lib/seiton/state.json"),
            ("PORT", "9000"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.data_path, Some(PathBuf::from("/var/lib/seiton/state.json")));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            config(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));
        assert!(matches!(
            config(&[("SEITON_SESSION_TTL_HOURS", "0")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            config(&[("SEITON_ENV", "staging")]),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
