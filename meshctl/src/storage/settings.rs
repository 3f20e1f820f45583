//! Settings file management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::deploy::deployer::DeployOptions;
use crate::deploy::verifier::VerifyOptions;
use crate::logs::LogLevel;

/// meshctl settings, read from `.meshctl/settings.json` when present
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Command used to invoke the Adobe I/O CLI
    #[serde(default = "default_aio_command")]
    pub aio_command: String,

    /// Seconds before a single create/update command is killed
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Post-deploy polling configuration
    #[serde(default)]
    pub polling: PollingSettings,
}

fn default_aio_command() -> String {
    "aio".to_string()
}

fn default_command_timeout() -> u64 {
    300
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            aio_command: default_aio_command(),
            command_timeout_secs: default_command_timeout(),
            polling: PollingSettings::default(),
        }
    }
}

impl Settings {
    /// Verifier options derived from these settings
    pub fn verify_options(&self) -> VerifyOptions {
        VerifyOptions {
            initial_wait: Duration::from_secs(self.polling.initial_wait_secs),
            poll_interval: Duration::from_secs(self.polling.poll_interval_secs),
            max_retries: self.polling.max_retries,
            ..VerifyOptions::default()
        }
    }

    /// Deployer options derived from these settings
    pub fn deploy_options(&self) -> DeployOptions {
        DeployOptions {
            aio_command: self.aio_command.clone(),
            command_timeout: Some(Duration::from_secs(self.command_timeout_secs)),
            verify: self.verify_options(),
        }
    }
}

/// Status polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSettings {
    /// Seconds to wait before the first status check
    #[serde(default = "default_initial_wait")]
    pub initial_wait_secs: u64,

    /// Seconds between status checks
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Maximum status checks; derived from the long-operation ceiling
    /// when absent
    #[serde(default)]
    pub max_retries: Option<u32>,
}

fn default_initial_wait() -> u64 {
    5
}

fn default_poll_interval() -> u64 {
    10
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            initial_wait_secs: default_initial_wait(),
            poll_interval_secs: default_poll_interval(),
            max_retries: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults_from_empty_json() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.aio_command, "aio");
        assert_eq!(settings.command_timeout_secs, 300);
        assert_eq!(settings.polling.initial_wait_secs, 5);
        assert_eq!(settings.polling.poll_interval_secs, 10);
        assert_eq!(settings.polling.max_retries, None);
    }

    #[test]
    fn test_settings_partial_override() {
        let settings: Settings = serde_json::from_str(
            r#"{"aio_command": "npx aio", "polling": {"poll_interval_secs": 2}}"#,
        )
        .unwrap();
        assert_eq!(settings.aio_command, "npx aio");
        assert_eq!(settings.polling.poll_interval_secs, 2);
        assert_eq!(settings.polling.initial_wait_secs, 5);
    }

    #[test]
    fn test_verify_options_reflect_polling_settings() {
        let mut settings = Settings::default();
        settings.polling.initial_wait_secs = 1;
        settings.polling.poll_interval_secs = 3;
        settings.polling.max_retries = Some(7);

        let options = settings.verify_options();
        assert_eq!(options.initial_wait, Duration::from_secs(1));
        assert_eq!(options.poll_interval, Duration::from_secs(3));
        assert_eq!(options.max_retries, Some(7));
    }
}
