//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `coverctl.toml` in the working directory, or the file named by
//! `COVERCTL_CONFIG`. Every section has defaults so the file is optional, but
//! without `[[covers]]` nothing is automated. Environment variables take
//! precedence over file values.

use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use coverctl_app::controller::ControllerSettings;
use coverctl_domain::config::CoverConfig;
use coverctl_domain::id::EntityRef;
use coverctl_domain::site::{Location, Site};

const DEFAULT_PATH: &str = "coverctl.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub site: SiteConfig,
    pub engine: EngineConfig,
    /// One entry per cover, `[[covers]]` in TOML.
    pub covers: Vec<CoverConfig>,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Where the covers are installed.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// IANA zone name, e.g. `Europe/Berlin`.
    pub timezone: Tz,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Entity publishing the sun position.
    pub sun_entity: Option<EntityRef>,
    /// Compute the sun entity from the location instead of waiting for
    /// external updates.
    pub virtual_sun: bool,
}

/// Engine timing.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Automation switch at start-up.
    pub enabled: bool,
    pub safety_interval_secs: u64,
    pub actuator_timeout_secs: u64,
    /// How often the virtual sun publishes.
    pub sun_update_secs: u64,
}

impl Config {
    /// Load configuration from `COVERCTL_CONFIG` or `coverctl.toml` (if
    /// present) then apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("COVERCTL_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("COVERCTL_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("COVERCTL_PORT")
            && let Ok(port) = val.parse()
        {
            self.server.port = port;
        }
        if let Ok(val) = std::env::var("COVERCTL_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("COVERCTL_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.engine.safety_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "safety_interval_secs must be non-zero".to_string(),
            ));
        }
        if self.engine.actuator_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "actuator_timeout_secs must be non-zero".to_string(),
            ));
        }
        if self.site.latitude.is_some() != self.site.longitude.is_some() {
            return Err(ConfigError::Validation(
                "latitude and longitude must be set together".to_string(),
            ));
        }
        self.site()
            .validate()
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        for cover in &self.covers {
            cover
                .validate()
                .map_err(|err| ConfigError::Validation(format!("cover {}: {err}", cover.id)))?;
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    #[must_use]
    pub fn site(&self) -> Site {
        Site {
            timezone: self.site.timezone,
            location: self.location(),
            sun: self.site.sun_entity.clone().into(),
        }
    }

    #[must_use]
    pub fn location(&self) -> Option<Location> {
        Some(Location {
            latitude: self.site.latitude?,
            longitude: self.site.longitude?,
        })
    }

    #[must_use]
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            safety_interval: Duration::from_secs(self.engine.safety_interval_secs),
            actuator_timeout: Duration::from_secs(self.engine.actuator_timeout_secs),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "coverctld=info,coverctl=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            latitude: None,
            longitude: None,
            sun_entity: None,
            virtual_sun: true,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            safety_interval_secs: 60,
            actuator_timeout_secs: 30,
            sun_update_secs: 60,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use coverctl_domain::sensor::SensorSource;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.site.timezone, Tz::UTC);
        assert!(config.engine.enabled);
        assert!(config.covers.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.engine.safety_interval_secs, 60);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = r#"
            [server]
            host = "127.0.0.1"
            port = 9090

            [logging]
            filter = "debug"

            [site]
            timezone = "Europe/Berlin"
            latitude = 52.52
            longitude = 13.405
            sun_entity = "sun.sun"

            [engine]
            enabled = false
            safety_interval_secs = 30
            actuator_timeout_secs = 10

            [[covers]]
            id = "office"

            [[covers.closing]]
            start = "21:00"
            end = "07:00"

            [[covers]]
            id = "bedroom"
            vacation_keeps_closed = false
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:9090");
        assert_eq!(config.logging.filter, "debug");
        assert!(!config.engine.enabled);
        assert_eq!(
            config.controller_settings().safety_interval,
            Duration::from_secs(30)
        );

        let site = config.site();
        assert_eq!(site.timezone, chrono_tz::Europe::Berlin);
        assert!(site.location.is_some());
        assert_eq!(
            site.sun,
            SensorSource::Configured(EntityRef::new("sun.sun").unwrap())
        );

        assert_eq!(config.covers.len(), 2);
        assert_eq!(config.covers[0].closing.len(), 1);
        assert!(!config.covers[1].vacation_keeps_closed);
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_safety_interval() {
        let mut config = Config::default();
        config.engine.safety_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_latitude_without_longitude() {
        let mut config = Config::default();
        config.site.latitude = Some(48.0);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_reject_out_of_range_latitude() {
        let mut config = Config::default();
        config.site.latitude = Some(123.0);
        config.site.longitude = Some(10.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_invalid_cover() {
        let toml = r#"
            [[covers]]
            id = "office"

            [covers.positions]
            open = 140
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cover office"));
    }

    #[test]
    fn should_report_parse_error_for_unknown_timezone() {
        let result: Result<Config, _> = toml::from_str("[site]\ntimezone = \"Mars/Olympus\"");
        assert!(result.is_err());
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
