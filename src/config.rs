//! Configuration types for capsule sessions and reveal jobs.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CapsuleConfig {
    /// Interactive session settings.
    pub session: SessionConfig,
    /// Reveal and notification job settings.
    pub reveal: RevealConfig,
    /// Reveal date parsing behaviour.
    pub dates: DateConfig,
    /// Where capsules and jobs are persisted.
    pub storage: StorageConfig,
    /// Job runner settings.
    pub scheduler: SchedulerConfig,
}

/// Interactive session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long the burying animation runs before the success screen.
    pub burying_delay_ms: u64,
    /// Countdown refresh period while a teaser is shown.
    pub tick_interval_ms: u64,
    /// Community name shown on the main and confirmation screens.
    pub subreddit_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            burying_delay_ms: 3_500,
            tick_interval_ms: 1_000,
            subreddit_name: String::new(),
        }
    }
}

/// Reveal job configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Number of top-scored comments quoted as guesses in the reveal post.
    pub guess_count: usize,
    /// Minutes before the reveal at which the author is notified.
    pub notify_lead_minutes: i64,
    /// Subject line of every private message.
    pub message_subject: String,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            guess_count: 2,
            notify_lead_minutes: 10,
            message_subject: "Time Capsule Reveal".to_owned(),
        }
    }
}

impl RevealConfig {
    /// How long before the reveal the notification job fires.
    pub fn notify_lead(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.notify_lead_minutes)
    }
}

/// Reveal date parsing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DateConfig {
    /// Fall back to "now" instead of rejecting unparseable dates.
    pub lenient_parsing: bool,
}

/// Persistence locations. `None` keeps state in memory only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file backing the capsule key-value store.
    pub capsule_store_path: Option<PathBuf>,
    /// JSON file backing the reveal job queue.
    pub job_queue_path: Option<PathBuf>,
}

/// Job runner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between job runner ticks.
    pub tick_interval_secs: u64,
    /// Finished jobs kept in the queue file.
    pub history_limit: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 1,
            history_limit: 400,
        }
    }
}

impl CapsuleConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::CapsuleError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::CapsuleError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/timecapsule/config.toml`.
    ///
    /// `TIMECAPSULE_CONFIG_DIR` overrides the directory.
    pub fn default_config_path() -> PathBuf {
        let dir = std::env::var_os("TIMECAPSULE_CONFIG_DIR")
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|d| d.join("timecapsule")))
            .unwrap_or_else(|| std::env::temp_dir().join("timecapsule-config"));
        dir.join("config.toml")
    }

    /// Burying animation length as a chrono duration.
    pub fn burying_delay(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::try_from(self.session.burying_delay_ms).unwrap_or(i64::MAX))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = CapsuleConfig::default();
        assert_eq!(config.session.burying_delay_ms, 3_500);
        assert_eq!(config.session.tick_interval_ms, 1_000);
        assert_eq!(config.reveal.guess_count, 2);
        assert_eq!(config.reveal.notify_lead_minutes, 10);
        assert!(!config.dates.lenient_parsing);
        assert!(config.storage.capsule_store_path.is_none());
        assert!(config.scheduler.tick_interval_secs > 0);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = CapsuleConfig::default();
        config.session.subreddit_name = "AskHistory".to_owned();
        config.reveal.guess_count = 5;
        config.dates.lenient_parsing = true;
        config.storage.job_queue_path = Some(dir.path().join("jobs.json"));

        config.save_to_file(&path).unwrap();
        let loaded = CapsuleConfig::from_file(&path).unwrap();

        assert_eq!(loaded.session.subreddit_name, "AskHistory");
        assert_eq!(loaded.reveal.guess_count, 5);
        assert!(loaded.dates.lenient_parsing);
        assert_eq!(loaded.storage.job_queue_path, Some(dir.path().join("jobs.json")));
    }

    #[test]
    fn partial_file_uses_defaults() {
        let loaded: CapsuleConfig = toml::from_str("[reveal]\nguess_count = 3\n").unwrap();
        assert_eq!(loaded.reveal.guess_count, 3);
        assert_eq!(loaded.reveal.message_subject, "Time Capsule Reveal");
        assert_eq!(loaded.session.burying_delay_ms, 3_500);
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result = CapsuleConfig::from_file(std::path::Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();

        let result = CapsuleConfig::from_file(&path);
        assert!(matches!(result, Err(crate::CapsuleError::Config(_))));
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = CapsuleConfig::default_config_path();
        let path_str = path.to_string_lossy();
        assert!(path_str.ends_with("config.toml"));
        assert!(path_str.contains("timecapsule"));
    }

    #[test]
    fn durations_follow_settings() {
        let mut config = CapsuleConfig::default();
        assert_eq!(config.burying_delay(), chrono::Duration::milliseconds(3_500));
        config.reveal.notify_lead_minutes = 30;
        assert_eq!(config.reveal.notify_lead(), chrono::Duration::minutes(30));
    }
}
