use serde::{Deserialize, Serialize};
use std::fs::File;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid value '{value}' for {key}")]
    InvalidEnv { key: &'static str, value: String },
    #[error("invalid engine config: {0}")]
    Invalid(String),
}

/// Tuning knobs of the recommendation engine. Defaults are the contract values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Persons scoring below this role match are not candidates at all.
    pub min_role_match_score: f64,
    /// Candidates shown per role in recommendations.
    pub candidate_display_limit: usize,
    /// Upper bound for a single requirement's weekly hours.
    pub max_requirement_hours: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_role_match_score: 25.0,
            candidate_display_limit: 5,
            max_requirement_hours: 80.0,
        }
    }
}

impl EngineConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: EngineConfig = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_role_match_score.is_finite() || self.min_role_match_score < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "min_role_match_score must be a non-negative number (got {})",
                self.min_role_match_score
            )));
        }
        if !self.max_requirement_hours.is_finite() || self.max_requirement_hours <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_requirement_hours must be positive (got {})",
                self.max_requirement_hours
            )));
        }
        Ok(())
    }
}

/// Settings for the HTTP binary, read from `TEAM_PLANNER_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub database: Option<PathBuf>,
    pub read_only: bool,
    pub engine_config: Option<PathBuf>,
    pub rate_limit: u32,
    pub rate_window_secs: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database: None,
            read_only: false,
            engine_config: None,
            rate_limit: 120,
            rate_window_secs: 60,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup("TEAM_PLANNER_HTTP_ADDR") {
            config.addr = parse_env("TEAM_PLANNER_HTTP_ADDR", &value)?;
        }
        if let Some(value) = lookup("TEAM_PLANNER_DB") {
            if !value.trim().is_empty() {
                config.database = Some(PathBuf::from(value.trim()));
            }
        }
        if let Some(value) = lookup("TEAM_PLANNER_READ_ONLY") {
            config.read_only = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "" | "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        key: "TEAM_PLANNER_READ_ONLY",
                        value,
                    });
                }
            };
        }
        if let Some(value) = lookup("TEAM_PLANNER_ENGINE_CONFIG") {
            if !value.trim().is_empty() {
                config.engine_config = Some(PathBuf::from(value.trim()));
            }
        }
        if let Some(value) = lookup("TEAM_PLANNER_RATE_LIMIT") {
            config.rate_limit = parse_env("TEAM_PLANNER_RATE_LIMIT", &value)?;
        }
        if let Some(value) = lookup("TEAM_PLANNER_RATE_WINDOW_SECS") {
            config.rate_window_secs = parse_env("TEAM_PLANNER_RATE_WINDOW_SECS", &value)?;
            if config.rate_window_secs <= 0 {
                return Err(ConfigError::InvalidEnv {
                    key: "TEAM_PLANNER_RATE_WINDOW_SECS",
                    value,
                });
            }
        }
        Ok(config)
    }

    pub fn load_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        match &self.engine_config {
            Some(path) => EngineConfig::from_json_file(path),
            None => Ok(EngineConfig::default()),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnv {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = ServerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn reads_all_variables() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("TEAM_PLANNER_HTTP_ADDR", "127.0.0.1:8080"),
            ("TEAM_PLANNER_DB", "/tmp/planner.db"),
            ("TEAM_PLANNER_READ_ONLY", "true"),
            ("TEAM_PLANNER_RATE_LIMIT", "10"),
            ("TEAM_PLANNER_RATE_WINDOW_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.database, Some(PathBuf::from("/tmp/planner.db")));
        assert!(config.read_only);
        assert_eq!(config.rate_limit, 10);
        assert_eq!(config.rate_window_secs, 30);
    }

    #[test]
    fn rejects_malformed_values() {
        let err = ServerConfig::from_lookup(lookup_from(&[("TEAM_PLANNER_READ_ONLY", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("TEAM_PLANNER_READ_ONLY"));
        assert!(
            ServerConfig::from_lookup(lookup_from(&[("TEAM_PLANNER_RATE_WINDOW_SECS", "0")]))
                .is_err()
        );
    }

    #[test]
    fn engine_config_partial_json_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"candidate_display_limit": 3}"#).unwrap();
        assert_eq!(config.candidate_display_limit, 3);
        assert_eq!(config.min_role_match_score, 25.0);
        assert_eq!(config.max_requirement_hours, 80.0);
    }
}
