//! Layered settings for the tracker.
//!
//! Sources, highest priority first:
//! 1. Environment variables (`DATABASE_URL`, `LM_STUDIO_URL`, ...)
//! 2. `pokemon-todo.toml` in the working directory
//! 3. Built-in defaults
//!
//! `.env` is read with dotenvy by [`Settings::load_with_dotenv`] before the
//! environment layer is built.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

use crate::lm_studio::{DEFAULT_MODEL, LM_STUDIO_DEFAULT_URL};
use crate::power::DEFAULT_PREFERRED_MODEL;

pub const CONFIG_FILE: &str = "pokemon-todo.toml";

/// Environment keys the environment layer picks up
const ENV_KEYS: [&str; 10] = [
    "database_url",
    "lm_studio_url",
    "lm_studio_model",
    "preferred_model_hint",
    "cors_origins",
    "bind_addr",
    "app_env",
    "debug",
    "ai_timeout_secs",
    "ai_health_timeout_secs",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Figment(#[from] figment::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite file, optionally written as `sqlite:///path`
    pub database_url: String,
    pub lm_studio_url: String,
    pub lm_studio_model: String,
    /// Substring that marks the preferred model in the health check
    pub preferred_model_hint: String,
    /// Comma separated list of allowed origins
    pub cors_origins: String,
    pub bind_addr: String,
    pub app_env: String,
    pub debug: bool,
    pub ai_timeout_secs: u64,
    pub ai_health_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: "pokemon_todo.db".to_string(),
            lm_studio_url: LM_STUDIO_DEFAULT_URL.to_string(),
            lm_studio_model: DEFAULT_MODEL.to_string(),
            preferred_model_hint: DEFAULT_PREFERRED_MODEL.to_string(),
            cors_origins: "http://localhost:3000,http://localhost:5173".to_string(),
            bind_addr: "0.0.0.0:8000".to_string(),
            app_env: "development".to_string(),
            debug: false,
            ai_timeout_secs: 30,
            ai_health_timeout_secs: 5,
        }
    }
}

impl Settings {
    /// Defaults, then the TOML file, then the environment
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::raw().only(&ENV_KEYS))
    }

    pub fn load() -> Result<Self, ConfigError> {
        let settings: Settings = Self::figment().extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Like [`Settings::load`], with `.env` applied to the process first.
    /// A missing `.env` is not an error.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path().is_empty() {
            return Err(invalid("database_url", "must not be empty"));
        }
        if self.lm_studio_url.trim().is_empty() {
            return Err(invalid("lm_studio_url", "must not be empty"));
        }
        if !self.lm_studio_url.starts_with("http://") && !self.lm_studio_url.starts_with("https://") {
            return Err(invalid("lm_studio_url", "must start with http:// or https://"));
        }
        if self.ai_timeout_secs == 0 {
            return Err(invalid("ai_timeout_secs", "must be greater than 0"));
        }
        if self.ai_health_timeout_secs == 0 {
            return Err(invalid("ai_health_timeout_secs", "must be greater than 0"));
        }
        if self.ai_timeout_secs == self.ai_health_timeout_secs {
            return Err(invalid("ai_health_timeout_secs", "must differ from ai_timeout_secs"));
        }
        Ok(())
    }

    /// Filesystem path of the SQLite database
    pub fn database_path(&self) -> &str {
        let url = self.database_url.trim();
        url.strip_prefix("sqlite:///")
            .or_else(|| url.strip_prefix("sqlite://"))
            .unwrap_or(url)
    }

    pub fn cors_origins_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs)
    }

    pub fn ai_health_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_health_timeout_secs)
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    /// DEBUG only outside production
    pub fn log_level(&self) -> Level {
        if self.debug && !self.is_production() {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.database_path(), "pokemon_todo.db");
        assert_eq!(settings.lm_studio_url, "http://localhost:1234");
        assert_eq!(settings.ai_timeout(), Duration::from_secs(30));
        assert_eq!(settings.ai_health_timeout(), Duration::from_secs(5));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("LM_STUDIO_URL", "http://gpu-box:1234");
            jail.set_env("AI_TIMEOUT_SECS", "12");
            jail.set_env("DEBUG", "true");

            let settings = Settings::load().expect("settings load");
            assert_eq!(settings.lm_studio_url, "http://gpu-box:1234");
            assert_eq!(settings.ai_timeout_secs, 12);
            assert!(settings.debug);
            Ok(())
        });
    }

    #[test]
    fn test_toml_file_then_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                database_url = "sqlite:///data/todo.db"
                bind_addr = "127.0.0.1:9000"
                "#,
            )?;
            jail.set_env("BIND_ADDR", "127.0.0.1:9100");

            let settings = Settings::load().expect("settings load");
            assert_eq!(settings.database_path(), "data/todo.db");
            assert_eq!(settings.bind_addr, "127.0.0.1:9100");
            Ok(())
        });
    }

    #[test]
    fn test_zero_timeout_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("AI_HEALTH_TIMEOUT_SECS", "0");

            let err = Settings::load().unwrap_err();
            assert!(err.to_string().contains("ai_health_timeout_secs"));
            Ok(())
        });
    }

    #[test]
    fn test_equal_timeouts_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("AI_TIMEOUT_SECS", "5");

            let err = Settings::load().unwrap_err();
            assert!(err.to_string().contains("must differ"));
            Ok(())
        });
    }

    #[test]
    fn test_debug_logging_ignored_in_production() {
        Jail::expect_with(|jail| {
            jail.set_env("DEBUG", "true");
            assert_eq!(Settings::load().expect("settings load").log_level(), Level::DEBUG);

            jail.set_env("APP_ENV", "Production");
            let settings = Settings::load().expect("settings load");
            assert!(settings.is_production());
            assert_eq!(settings.log_level(), Level::INFO);
            Ok(())
        });
    }

    #[test]
    fn test_bad_url_rejected() {
        let settings = Settings {
            lm_studio_url: "localhost:1234".to_string(),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_cors_origins_list() {
        let settings = Settings {
            cors_origins: " http://a.test, ,http://b.test ".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.cors_origins_list(), vec!["http://a.test", "http://b.test"]);
    }
}
