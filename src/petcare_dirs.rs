//! Centralized application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//! Set `PETCARE_CONFIG_DIR` to override [`config_dir`] for testing or custom
//! deployments.

use std::path::PathBuf;

/// Application config directory.
///
/// Resolves to `dirs::config_dir()/petcare/` by default.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("PETCARE_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("petcare"))
        .unwrap_or_else(|| PathBuf::from("/tmp/petcare-config"))
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_lives_in_config_dir() {
        assert_eq!(config_file().parent(), Some(config_dir().as_path()));
        assert!(config_file().ends_with("config.toml"));
    }
}
