//! Server configuration.
//!
//! Loaded from an optional TOML file; anything missing falls back to a
//! working default (dog and cat deworming engines, a daily pending pass,
//! and the log-only mail transport).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vet_reminders_core::engine::{EngineScope, EvaluationPolicy, ReminderSettings};
use vet_reminders_core::mail::MailSettings;

/// Engine name reserved by the pending-pass trigger route.
pub const PENDING_ENGINE: &str = "pending";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// One scheduled age-condition engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub name: String,
    pub species: String,
    #[serde(default = "default_category")]
    pub category: String,
    /// Six-field cron expression (seconds first), UTC
    pub cron: String,
}

impl EngineConfig {
    pub fn scope(&self) -> EngineScope {
        EngineScope::new(&self.name, &self.species, &self.category)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    pub database: PathBuf,
    pub dispatch_timeout_secs: u64,
    pub scheduler_enabled: bool,
    /// Cron for the daily pending-schedule pass
    pub pending_cron: String,
    pub policy: EvaluationPolicy,
    pub mail: MailSettings,
    pub engines: Vec<EngineConfig>,
}

fn default_category() -> String {
    "deworming".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
            database: PathBuf::from("vet-reminders.db"),
            dispatch_timeout_secs: 30,
            scheduler_enabled: true,
            pending_cron: "0 0 6 * * *".to_string(),
            policy: EvaluationPolicy::default(),
            mail: MailSettings::default(),
            // Distinct times so the engines never contend for the run-lock
            engines: vec![
                EngineConfig {
                    name: "dog".into(),
                    species: "dog".into(),
                    category: default_category(),
                    cron: "0 0 7 * * *".into(),
                },
                EngineConfig {
                    name: "cat".into(),
                    species: "cat".into(),
                    category: default_category(),
                    cron: "0 30 7 * * *".into(),
                },
            ],
        }
    }
}

impl ServerConfig {
    /// Load from `path`, or use defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatch_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "dispatch_timeout_secs must be positive".into(),
            ));
        }

        let mut names = HashSet::new();
        for engine in &self.engines {
            let name = engine.name.trim().to_lowercase();
            if name.is_empty() {
                return Err(ConfigError::Invalid("engine name is empty".into()));
            }
            if name == PENDING_ENGINE {
                return Err(ConfigError::Invalid(format!(
                    "engine name '{}' is reserved",
                    PENDING_ENGINE
                )));
            }
            if engine.species.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "engine '{}' has no species",
                    engine.name
                )));
            }
            if !names.insert(name) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate engine '{}'",
                    engine.name
                )));
            }
        }
        Ok(())
    }

    pub fn reminder_settings(&self) -> ReminderSettings {
        ReminderSettings {
            dispatch_timeout: Duration::from_secs(self.dispatch_timeout_secs),
            policy: self.policy,
            engines: self.engines.iter().map(EngineConfig::scope).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vet_reminders_core::engine::{DispatchPolicy, FailedAttemptPolicy};

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        config.validate().unwrap();

        let settings = config.reminder_settings();
        assert_eq!(settings.dispatch_timeout, Duration::from_secs(30));
        let names: Vec<&str> = settings.engines.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["dog", "cat"]);
    }

    #[test]
    fn test_parse_full_toml() {
        let config = ServerConfig::from_toml(
            r#"
            listen = "0.0.0.0:9000"
            database = "/var/lib/vet/reminders.db"
            dispatch_timeout_secs = 10

            [policy]
            failed_attempts = "allow-retry"
            dispatch = "all-due"

            [mail]
            kind = "http"
            endpoint = "https://relay.example.com/v1"
            from = "clinic@example.com"

            [[engines]]
            name = "rabbit"
            species = "rabbit"
            cron = "0 15 8 * * *"
            "#,
        )
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.listen, "0.0.0.0:9000");
        assert_eq!(config.policy.failed_attempts, FailedAttemptPolicy::AllowRetry);
        assert_eq!(config.policy.dispatch, DispatchPolicy::AllDue);
        assert_eq!(config.engines.len(), 1);
        assert_eq!(config.engines[0].category, "deworming");
        assert!(config.scheduler_enabled);
        assert!(matches!(config.mail, MailSettings::Http { .. }));
    }

    #[test]
    fn test_rejects_bad_engines() {
        let mut config = ServerConfig::default();
        config.engines[1].name = "DOG".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ServerConfig::default();
        config.engines[0].name = "pending".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ServerConfig::default();
        config.dispatch_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = ServerConfig::load(Some(Path::new("/nonexistent/vet-reminders.toml")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
