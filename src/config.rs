//! Configuration types for the reminder core and data layer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PetCareConfig {
    /// Reminder reconciliation settings.
    pub reminders: ReminderConfig,
    /// Data layer settings.
    pub data: DataConfig,
    /// Log filter settings.
    pub logging: LoggingConfig,
}

/// Upper bound applied to `debounce_ms` (one minute).
pub const MAX_DEBOUNCE_MS: u64 = 60_000;

/// Upper bound applied to `resync_interval_secs` (one week).
pub const MAX_RESYNC_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Upper bound applied to `tolerance_ms` (one hour).
pub const MAX_TOLERANCE_MS: u64 = 60 * 60 * 1_000;

/// Reminder reconciliation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Quiet period after the last data change before a reconciliation pass runs.
    pub debounce_ms: u64,
    /// Maximum difference between an outstanding trigger and the desired one
    /// that still counts as a match.
    pub tolerance_ms: u64,
    /// Periodic resync nudge in seconds (0 = disabled).
    ///
    /// Retries soft failures even when no data changes arrive.
    pub resync_interval_secs: u64,
    /// Notification title shown for every appointment reminder.
    pub title: String,
    /// Platform notification channel used for reminders (Android).
    pub channel_id: String,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            tolerance_ms: 5_000,
            resync_interval_secs: 0,
            title: "Upcoming appointment".to_owned(),
            channel_id: "appointment-reminders".to_owned(),
        }
    }
}

impl ReminderConfig {
    /// Debounce window as a [`Duration`], capped at [`MAX_DEBOUNCE_MS`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.min(MAX_DEBOUNCE_MS))
    }

    /// Trigger match tolerance as a chrono duration.
    pub fn tolerance(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(
            i64::try_from(self.tolerance_ms.min(MAX_TOLERANCE_MS)).unwrap_or_default(),
        )
    }

    /// Resync interval, or `None` when disabled. Capped at [`MAX_RESYNC_INTERVAL_SECS`].
    pub fn resync_interval(&self) -> Option<Duration> {
        (self.resync_interval_secs > 0).then(|| {
            Duration::from_secs(self.resync_interval_secs.min(MAX_RESYNC_INTERVAL_SECS))
        })
    }
}

/// Data layer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Ensure a starter pet exists when a session starts.
    pub seed_starter_pet: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            seed_starter_pet: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "petcare=info".to_owned(),
        }
    }
}

impl PetCareConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::PetCareError::Config(e.to_string()))
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
            .map_err(|e| crate::error::PetCareError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path (`petcare_dirs::config_file()`).
    pub fn default_config_path() -> PathBuf {
        crate::petcare_dirs::config_file()
    }
}
