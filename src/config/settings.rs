use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

use super::LoggingConfig;
use crate::session::SessionOptions;
use crate::strategy::StrategyRegistry;
use crate::{BargainError, BargainResult};

pub const ENV_STRATEGY: &str = "AGENT_STRATEGY";
pub const ENV_STRATEGY_LEGACY: &str = "AGENT_CLS_PATH";
pub const ENV_SERVER_URL: &str = "SERVER_URL";
pub const ENV_SERVER_PORT: &str = "SERVER_PORT";
pub const ENV_ROUTER_PORT_OFFSET: &str = "ROUTER_PORT_OFFSET";
pub const ENV_SETTLE_DELAY_MS: &str = "SETTLE_DELAY_MS";
pub const ENV_REPLY_TO_PING: &str = "REPLY_TO_PING";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

/// Client configuration: defaults, then config file, then environment, then CLI flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ClientSettings {
    /// Selector of the strategy to play with (see `StrategyRegistry`)
    #[validate(length(min = 1, message = "strategy selector must not be empty"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    #[validate(length(min = 1, message = "server url must not be empty"))]
    pub server_url: String,

    #[validate(range(min = 1, message = "server port must be non-zero"))]
    pub server_port: u16,

    /// The DEALER socket connects to `server_port + router_port_offset`
    pub router_port_offset: u16,

    #[validate(range(max = 10000, message = "settle delay must not exceed 10s"))]
    pub settle_delay_ms: u64,

    pub reply_to_ping: bool,

    pub log_level: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            strategy: None,
            server_url: "127.0.0.1".to_string(),
            server_port: 4181,
            router_port_offset: 1,
            settle_delay_ms: 300,
            reply_to_ping: false,
            log_level: "info".to_string(),
        }
    }
}

impl ClientSettings {
    /// Resolve settings from an optional config file and the process environment.
    ///
    /// Nothing is logged here; this runs before the subscriber is installed.
    pub fn load(config_path: Option<&Path>) -> BargainResult<Self> {
        let mut settings = match Self::resolve_file(config_path)? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        settings.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Config file [`ClientSettings::load`] reads. An explicit `config_path`
    /// must exist; otherwise the default location is used only when a file
    /// is present there.
    pub fn resolve_file(config_path: Option<&Path>) -> BargainResult<Option<PathBuf>> {
        match config_path {
            Some(path) if !path.exists() => Err(BargainError::configuration(format!(
                "Config file not found: {}",
                path.display()
            ))),
            Some(path) => Ok(Some(path.to_path_buf())),
            None => Ok(Self::config_path().filter(|path| path.exists())),
        }
    }

    pub fn from_file(path: &Path) -> BargainResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| match e {
            BargainError::Configuration { message } => {
                BargainError::configuration(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }

    pub fn from_toml(content: &str) -> BargainResult<Self> {
        toml::from_str(content).map_err(|e| BargainError::configuration(format!("invalid TOML: {}", e)))
    }

    pub fn to_toml(&self) -> BargainResult<String> {
        toml::to_string_pretty(self).map_err(|e| BargainError::configuration(e.to_string()))
    }

    /// Default config file location: `<config_dir>/bargain-client/config.toml`
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("bargain-client").join("config.toml"))
    }

    /// Apply overrides from an environment lookup. Unset variables are skipped,
    /// unparseable ones are configuration errors.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> BargainResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup(ENV_STRATEGY).or_else(|| lookup(ENV_STRATEGY_LEGACY)) {
            self.strategy = Some(val);
        }

        if let Some(val) = lookup(ENV_SERVER_URL) {
            self.server_url = val;
        }

        if let Some(val) = lookup(ENV_SERVER_PORT) {
            self.server_port = parse_env(ENV_SERVER_PORT, &val)?;
        }

        if let Some(val) = lookup(ENV_ROUTER_PORT_OFFSET) {
            self.router_port_offset = parse_env(ENV_ROUTER_PORT_OFFSET, &val)?;
        }

        if let Some(val) = lookup(ENV_SETTLE_DELAY_MS) {
            self.settle_delay_ms = parse_env(ENV_SETTLE_DELAY_MS, &val)?;
        }

        if let Some(val) = lookup(ENV_REPLY_TO_PING) {
            self.reply_to_ping = parse_flag(ENV_REPLY_TO_PING, &val)?;
        }

        if let Some(val) = lookup(ENV_LOG_LEVEL) {
            self.log_level = val;
        }

        Ok(())
    }

    /// Check field rules and that the strategy selector is set and registered
    pub fn validate_with(&self, registry: &StrategyRegistry) -> BargainResult<()> {
        self.validate()
            .map_err(|e| BargainError::configuration(format!("invalid settings: {}", e)))?;

        let selector = self.strategy.as_deref().ok_or_else(|| {
            BargainError::configuration(format!(
                "a strategy selector is required (set {} or pass --strategy)",
                ENV_STRATEGY
            ))
        })?;

        if !registry.contains(selector) {
            return Err(BargainError::UnknownStrategy(selector.to_string()));
        }

        self.endpoint().map(|_| ())
    }

    /// ZeroMQ endpoint of the server's ROUTER socket
    pub fn endpoint(&self) -> BargainResult<String> {
        let port = self
            .server_port
            .checked_add(self.router_port_offset)
            .ok_or_else(|| {
                BargainError::configuration(format!(
                    "server port {} + offset {} exceeds 65535",
                    self.server_port, self.router_port_offset
                ))
            })?;
        Ok(format!("tcp://{}:{}", self.server_url, port))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::new(self.log_level.clone())
    }

    /// Options for one session, with a fresh connection identity
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::new()
            .with_settle_delay(self.settle_delay())
            .with_reply_to_ping(self.reply_to_ping)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, val: &str) -> BargainResult<T>
where
    T::Err: std::fmt::Display,
{
    val.trim()
        .parse()
        .map_err(|e| BargainError::configuration(format!("{}='{}': {}", key, val, e)))
}

fn parse_flag(key: &str, val: &str) -> BargainResult<bool> {
    match val.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(BargainError::configuration(format!(
            "{}='{}': expected a boolean",
            key, val
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_resolve_file() {
        let file = NamedTempFile::new().unwrap();
        assert_eq!(
            ClientSettings::resolve_file(Some(file.path())).unwrap(),
            Some(file.path().to_path_buf())
        );

        let missing = Path::new("/nonexistent/bargain-client/config.toml");
        assert!(matches!(
            ClientSettings::resolve_file(Some(missing)),
            Err(BargainError::Configuration { .. })
        ));
    }

    #[test]
    fn test_defaults() {
        let settings = ClientSettings::default();
        assert_eq!(settings.strategy, None);
        assert_eq!(settings.endpoint().unwrap(), "tcp://127.0.0.1:4182");
        assert_eq!(settings.settle_delay(), Duration::from_millis(300));
        assert!(!settings.reply_to_ping);
    }

    #[test]
    fn test_missing_strategy_is_fatal() {
        let registry = StrategyRegistry::with_builtins();
        let err = ClientSettings::default().validate_with(&registry).unwrap_err();
        assert!(matches!(err, BargainError::Configuration { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = ClientSettings::default();
        settings
            .apply_env_overrides(env(&[
                (ENV_STRATEGY, "fair"),
                (ENV_SERVER_URL, "game.local"),
                (ENV_SERVER_PORT, "5000"),
                (ENV_REPLY_TO_PING, "yes"),
                (ENV_LOG_LEVEL, "debug"),
            ]))
            .unwrap();

        assert_eq!(settings.strategy.as_deref(), Some("fair"));
        assert_eq!(settings.endpoint().unwrap(), "tcp://game.local:5001");
        assert!(settings.reply_to_ping);
        assert_eq!(settings.logging_config().effective_level(), "debug");
        settings
            .validate_with(&StrategyRegistry::with_builtins())
            .unwrap();
    }

    #[test]
    fn test_legacy_strategy_variable() {
        let mut settings = ClientSettings::default();
        settings
            .apply_env_overrides(env(&[(ENV_STRATEGY_LEGACY, "agent.dummy.DummyAgent")]))
            .unwrap();
        settings
            .validate_with(&StrategyRegistry::with_builtins())
            .unwrap();

        let mut both = ClientSettings::default();
        both.apply_env_overrides(env(&[
            (ENV_STRATEGY, "fair"),
            (ENV_STRATEGY_LEGACY, "agent.dummy.DummyAgent"),
        ]))
        .unwrap();
        assert_eq!(both.strategy.as_deref(), Some("fair"));
    }

    #[test]
    fn test_bad_env_values() {
        let mut settings = ClientSettings::default();
        assert!(settings
            .apply_env_overrides(env(&[(ENV_SERVER_PORT, "not-a-port")]))
            .is_err());
        assert!(settings
            .apply_env_overrides(env(&[(ENV_REPLY_TO_PING, "maybe")]))
            .is_err());
    }

    #[test]
    fn test_field_validation() {
        let registry = StrategyRegistry::with_builtins();
        let mut settings = ClientSettings {
            strategy: Some("fair".to_string()),
            ..ClientSettings::default()
        };

        settings.server_port = 0;
        assert!(settings.validate_with(&registry).is_err());

        settings.server_port = 65535;
        assert!(settings.validate_with(&registry).is_err());

        settings.server_port = 4181;
        settings.settle_delay_ms = 60_000;
        assert!(settings.validate_with(&registry).is_err());

        settings.settle_delay_ms = 0;
        settings.strategy = Some("psychic".to_string());
        assert!(matches!(
            settings.validate_with(&registry),
            Err(BargainError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_toml_file_layer() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "strategy = \"minimal\"\nserver_port = 7000\nsettle_delay_ms = 0").unwrap();

        let settings = ClientSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.strategy.as_deref(), Some("minimal"));
        assert_eq!(settings.server_port, 7000);
        assert_eq!(settings.server_url, "127.0.0.1");
        assert_eq!(settings.settle_delay(), Duration::ZERO);

        let round_trip = ClientSettings::from_toml(&settings.to_toml().unwrap()).unwrap();
        assert_eq!(round_trip, settings);
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let err = ClientSettings::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.user_message().contains("Config file not found"));
    }

    #[test]
    fn test_invalid_toml() {
        let err = ClientSettings::from_toml("server_port = \"many\"").unwrap_err();
        assert!(matches!(err, BargainError::Configuration { .. }));
    }
}
